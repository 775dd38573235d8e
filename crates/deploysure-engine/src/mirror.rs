//! Schema mirroring
//!
//! Clones a schema with the warehouse's zero-copy `CREATE ... CLONE`, then
//! compares the table counts of the source and the clone.

use deploysure_catalog::{Warehouse, WarehouseError};
use deploysure_core::{Ident, IdentError, SchemaPath, Tabular};
use deploysure_sql::statements;
use std::fmt;

/// Suffix of the default clone name
pub const CLONE_SUFFIX: &str = "_CLONE";

/// Errors that stop a mirror before or during the clone
#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
    #[error("Please provide the {0}")]
    MissingInput(&'static str),

    #[error(transparent)]
    InvalidIdentifier(#[from] IdentError),

    #[error("Source and clone schema are both {0}")]
    SameSchema(String),

    #[error("Source schema {0} doesn't exist")]
    SourceMissing(String),

    #[error("Clone failed: {0}")]
    Warehouse(#[from] WarehouseError),
}

/// Whether the clone holds as many tables as the source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    Exact,
    /// The clone statement succeeded but the counts differ
    Partial,
}

impl fmt::Display for Parity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parity::Exact => write!(f, "Success"),
            Parity::Partial => write!(f, "Partial"),
        }
    }
}

/// Outcome of one mirror
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorSummary {
    pub source: SchemaPath,
    pub clone: SchemaPath,
    pub source_tables: usize,
    pub clone_tables: usize,
    pub parity: Parity,
}

impl Tabular for MirrorSummary {
    fn headers() -> Vec<&'static str> {
        vec!["Database", "Source Schema", "Clone Schema", "Source Tables", "Cloned Tables", "Status"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.source.database.as_str().to_string(),
            self.source.schema.as_str().to_string(),
            self.clone.schema.as_str().to_string(),
            self.source_tables.to_string(),
            self.clone_tables.to_string(),
            self.parity.to_string(),
        ]
    }
}

/// Validate operator input for a mirror
///
/// An empty or missing target defaults to `<source>_CLONE`.
pub fn mirror_request(
    database: &str,
    source: &str,
    target: Option<&str>,
) -> Result<(SchemaPath, Ident), MirrorError> {
    if database.trim().is_empty() {
        return Err(MirrorError::MissingInput("database"));
    }
    if source.trim().is_empty() {
        return Err(MirrorError::MissingInput("source schema"));
    }

    let source = SchemaPath::from_user_input(database, source)?;
    let target = match target.map(str::trim).filter(|t| !t.is_empty()) {
        Some(target) => Ident::from_user_input(target)?,
        None => default_clone_name(&source.schema)?,
    };

    Ok((source, target))
}

/// `<source>_CLONE`, keeping the source's exact spelling
pub fn default_clone_name(source: &Ident) -> Result<Ident, IdentError> {
    Ident::new(format!("{}{}", source.as_str(), CLONE_SUFFIX))
}

/// Clone `source` into `target` within the same database
///
/// Nothing is created when the source schema does not exist.
pub async fn mirror_schema(
    warehouse: &dyn Warehouse,
    source: &SchemaPath,
    target: &Ident,
) -> Result<MirrorSummary, MirrorError> {
    if &source.schema == target {
        return Err(MirrorError::SameSchema(source.to_string()));
    }

    let existing = warehouse
        .query(&statements::show_schemas_like(source))
        .await?
        .column_text(1);

    if !existing.iter().any(|name| name == source.schema.as_str()) {
        tracing::warn!(schema = %source, "Source schema not found, nothing cloned");
        return Err(MirrorError::SourceMissing(source.to_string()));
    }

    let clone = source.sibling(target.clone());
    warehouse
        .query(&statements::clone_schema(source, &clone))
        .await?;
    tracing::info!(source = %source, clone = %clone, "Schema cloned");

    let source_tables = warehouse.query(&statements::show_tables(source)).await?.rows.len();
    let clone_tables = warehouse.query(&statements::show_tables(&clone)).await?.rows.len();

    let parity = if source_tables == clone_tables {
        Parity::Exact
    } else {
        tracing::warn!(source_tables, clone_tables, "Clone table count differs from source");
        Parity::Partial
    };

    Ok(MirrorSummary {
        source: source.clone(),
        clone,
        source_tables,
        clone_tables,
        parity,
    })
}
