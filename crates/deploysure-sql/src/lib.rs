//! SQL text for the warehouse
//!
//! - `statements`: builders for every templated statement, with identifiers
//!   quoted and literals escaped
//! - `qualify`: rewriting of table references inside stored SQL

pub mod statements;
pub mod qualify;

pub use qualify::{qualify_table, RewriteError};
