//! Warehouse boundary and catalog browsing
//!
//! The warehouse is an opaque remote service: SQL text goes in, rows of
//! [`Value`](deploysure_core::Value)s come out. Everything else in DeploySure
//! talks to it through the [`Warehouse`] trait.
//!
//! ## Features
//!
//! - `snowflake` - compile the Snowflake client (`snowflake-api`)
//!
//! ## Example
//!
//! ```rust,ignore
//! use deploysure_catalog::{Credentials, SnowflakeWarehouse, Warehouse, browser};
//!
//! let credentials = Credentials::new("xy12345.us-east-1", "ANALYST", password)?;
//! let warehouse = SnowflakeWarehouse::builder(credentials)
//!     .with_warehouse("COMPUTE_WH")
//!     .build()?;
//! let databases = browser::list_databases(&warehouse).await;
//! ```

pub mod warehouse;
pub mod snowflake;
pub mod mock;
pub mod browser;

pub use warehouse::{Warehouse, QueryResult, Credentials, WarehouseError};
pub use snowflake::{SnowflakeWarehouse, SnowflakeWarehouseBuilder};
pub use mock::{MockWarehouse, MockWarehouseBuilder};
pub use browser::{ColumnDetail, ColumnCategories};
