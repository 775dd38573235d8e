//! Schema drift comparison between two schemas of one database
//!
//! Three result sets:
//! - table diffs: tables present in only one schema
//! - column diffs: columns present on only one side of a common table
//! - type diffs: columns whose declared type differs
//!
//! Column maps come from two separate `DESCRIBE TABLE` calls per common
//! table. Tables, columns and types that match are never reported.

use deploysure_catalog::Warehouse;
use deploysure_core::{Ident, ResultTable, SchemaPath, Tabular};
use deploysure_sql::statements;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Which side a table or column is missing from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Side {
    /// Present only in the clone
    MissingInSource,
    /// Present only in the source
    MissingInClone,
}

impl Side {
    fn parse(text: &str) -> Option<Self> {
        match text {
            "Missing in source" => Some(Side::MissingInSource),
            "Missing in clone" => Some(Side::MissingInClone),
            _ => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::MissingInSource => write!(f, "Missing in source"),
            Side::MissingInClone => write!(f, "Missing in clone"),
        }
    }
}

/// A table present in exactly one schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDiff {
    pub table: String,
    pub difference: Side,
}

impl Tabular for TableDiff {
    fn headers() -> Vec<&'static str> {
        vec!["Table", "Difference"]
    }

    fn cells(&self) -> Vec<String> {
        vec![self.table.clone(), self.difference.to_string()]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnDifference {
    Missing(Side),
    /// The table could not be described on one side
    ScanError(String),
}

impl fmt::Display for ColumnDifference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnDifference::Missing(side) => write!(f, "{}", side),
            ColumnDifference::ScanError(msg) => write!(f, "Scan error: {}", msg),
        }
    }
}

/// A column present on one side of a common table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDiff {
    pub table: String,
    pub column: String,
    pub difference: ColumnDifference,
    pub source_type: Option<String>,
    pub clone_type: Option<String>,
}

impl Tabular for ColumnDiff {
    fn headers() -> Vec<&'static str> {
        vec!["Table", "Column", "Difference", "Source Type", "Clone Type"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.table.clone(),
            self.column.clone(),
            self.difference.to_string(),
            self.source_type.clone().unwrap_or_default(),
            self.clone_type.clone().unwrap_or_default(),
        ]
    }
}

/// A column whose declared type changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDiff {
    pub table: String,
    pub column: String,
    pub source_type: String,
    pub clone_type: String,
}

impl Tabular for TypeDiff {
    fn headers() -> Vec<&'static str> {
        vec!["Table", "Column", "Source Type", "Clone Type", "Difference"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.table.clone(),
            self.column.clone(),
            self.source_type.clone(),
            self.clone_type.clone(),
            "Type Changed".to_string(),
        ]
    }
}

/// All drift between two schemas
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaDrift {
    pub table_diffs: Vec<TableDiff>,
    pub column_diffs: Vec<ColumnDiff>,
    pub type_diffs: Vec<TypeDiff>,
}

impl SchemaDrift {
    pub fn has_drift(&self) -> bool {
        !self.table_diffs.is_empty() || !self.column_diffs.is_empty() || !self.type_diffs.is_empty()
    }

    /// Count of tables that could not be scanned
    pub fn scan_error_count(&self) -> usize {
        self.column_diffs
            .iter()
            .filter(|diff| matches!(diff.difference, ColumnDifference::ScanError(_)))
            .count()
    }

    pub fn table_diff_table(&self) -> ResultTable {
        ResultTable::from_rows("Table Differences", &self.table_diffs)
    }

    pub fn column_diff_table(&self) -> ResultTable {
        ResultTable::from_rows("Column Differences", &self.column_diffs)
    }

    pub fn type_diff_table(&self) -> ResultTable {
        ResultTable::from_rows("Data Type Differences", &self.type_diffs)
    }
}

/// Tables present in only one of the two schemas
///
/// Sorted by (classification, name). A failing query yields no rows.
pub async fn compare_tables(warehouse: &dyn Warehouse, source: &SchemaPath, clone: &SchemaPath) -> Vec<TableDiff> {
    let sql = statements::table_differences(&source.database, &source.schema, &clone.schema);

    let result = match warehouse.query(&sql).await {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!(error = %e, "Error comparing tables");
            return Vec::new();
        }
    };

    let mut diffs: Vec<TableDiff> = result
        .rows
        .iter()
        .filter_map(|row| {
            let table = row.first().filter(|v| !v.is_null())?.to_string();
            let label = row.get(1)?.to_string();
            match Side::parse(&label) {
                Some(difference) => Some(TableDiff { table, difference }),
                None => {
                    tracing::warn!(table = %table, label = %label, "Unexpected table difference");
                    None
                }
            }
        })
        .collect();

    diffs.sort_by(|a, b| {
        (a.difference.to_string(), &a.table).cmp(&(b.difference.to_string(), &b.table))
    });
    diffs
}

/// Column and type differences of the tables both schemas hold
///
/// Both sets are sorted by (table, column). A table that cannot be described
/// yields one scan error row and the scan moves on.
pub async fn compare_columns(
    warehouse: &dyn Warehouse,
    source: &SchemaPath,
    clone: &SchemaPath,
) -> (Vec<ColumnDiff>, Vec<TypeDiff>) {
    let sql = statements::common_tables(&source.database, &source.schema, &clone.schema);

    let common = match warehouse.query(&sql).await {
        Ok(result) => result.column_text(0),
        Err(e) => {
            tracing::warn!(error = %e, "Error listing common tables");
            return (Vec::new(), Vec::new());
        }
    };

    let mut column_diffs = Vec::new();
    let mut type_diffs = Vec::new();

    for table in common {
        match describe_pair(warehouse, source, clone, &table).await {
            Ok((source_cols, clone_cols)) => {
                let (columns, types) = diff_columns(&table, &source_cols, &clone_cols);
                column_diffs.extend(columns);
                type_diffs.extend(types);
            }
            Err(message) => {
                tracing::warn!(table = %table, error = %message, "Skipping table in drift scan");
                column_diffs.push(ColumnDiff {
                    table,
                    column: String::new(),
                    difference: ColumnDifference::ScanError(crate::excerpt(&message)),
                    source_type: None,
                    clone_type: None,
                });
            }
        }
    }

    column_diffs.sort_by(|a, b| (&a.table, &a.column).cmp(&(&b.table, &b.column)));
    type_diffs.sort_by(|a, b| (&a.table, &a.column).cmp(&(&b.table, &b.column)));

    (column_diffs, type_diffs)
}

/// Run the table and column comparisons
pub async fn compare_schemas(warehouse: &dyn Warehouse, source: &SchemaPath, clone: &SchemaPath) -> SchemaDrift {
    let table_diffs = compare_tables(warehouse, source, clone).await;
    let (column_diffs, type_diffs) = compare_columns(warehouse, source, clone).await;

    tracing::info!(
        tables = table_diffs.len(),
        columns = column_diffs.len(),
        types = type_diffs.len(),
        "Drift comparison finished"
    );

    SchemaDrift {
        table_diffs,
        column_diffs,
        type_diffs,
    }
}

/// Column name to declared type
pub type ColumnTypes = BTreeMap<String, String>;

async fn describe_pair(
    warehouse: &dyn Warehouse,
    source: &SchemaPath,
    clone: &SchemaPath,
    table: &str,
) -> Result<(ColumnTypes, ColumnTypes), String> {
    let name = Ident::new(table).map_err(|e| e.to_string())?;
    let source_cols = describe(warehouse, source, &name).await?;
    let clone_cols = describe(warehouse, clone, &name).await?;
    Ok((source_cols, clone_cols))
}

async fn describe(warehouse: &dyn Warehouse, schema: &SchemaPath, table: &Ident) -> Result<ColumnTypes, String> {
    let result = warehouse
        .query(&statements::describe_table(&schema.table(table.clone())))
        .await
        .map_err(|e| e.message().to_string())?;

    Ok(result
        .rows
        .iter()
        .filter_map(|row| {
            let name = row.first().filter(|v| !v.is_null())?;
            let data_type = row.get(1).map(|v| v.to_string()).unwrap_or_default();
            Some((name.to_string(), data_type))
        })
        .collect())
}

/// Classify the union of column names of one table
pub fn diff_columns(table: &str, source: &ColumnTypes, clone: &ColumnTypes) -> (Vec<ColumnDiff>, Vec<TypeDiff>) {
    let mut column_diffs = Vec::new();
    let mut type_diffs = Vec::new();

    let names: BTreeSet<&String> = source.keys().chain(clone.keys()).collect();

    for name in names {
        match (source.get(name), clone.get(name)) {
            (None, Some(clone_type)) => column_diffs.push(ColumnDiff {
                table: table.to_string(),
                column: name.clone(),
                difference: ColumnDifference::Missing(Side::MissingInSource),
                source_type: None,
                clone_type: Some(clone_type.clone()),
            }),
            (Some(source_type), None) => column_diffs.push(ColumnDiff {
                table: table.to_string(),
                column: name.clone(),
                difference: ColumnDifference::Missing(Side::MissingInClone),
                source_type: Some(source_type.clone()),
                clone_type: None,
            }),
            (Some(source_type), Some(clone_type)) if source_type != clone_type => {
                type_diffs.push(TypeDiff {
                    table: table.to_string(),
                    column: name.clone(),
                    source_type: source_type.clone(),
                    clone_type: clone_type.clone(),
                })
            }
            _ => {}
        }
    }

    (column_diffs, type_diffs)
}
