//! DeploySure Core
//!
//! Shared domain types: warehouse values, validated identifiers and catalog
//! paths, tabular results with CSV export, and configuration.

pub mod value;
pub mod ident;
pub mod table;
pub mod config;

pub use value::{Value, Decimal};
pub use ident::{Ident, IdentError, SchemaPath, TablePath, string_literal};
pub use table::{ResultTable, Tabular, ExportError, export_file_name};
pub use config::{Config, ConfigError, ConnectionConfig, CatalogConfig, CatalogNames, QualityConfig, ExportConfig};
