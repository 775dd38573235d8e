//! Catalog browsing
//!
//! Lists of databases, schemas, tables and columns. Browsing never fails:
//! any warehouse error is logged and yields an empty list, so a missing
//! privilege shows up as an empty picker rather than an error.

use crate::warehouse::Warehouse;
use deploysure_core::{CatalogNames, Ident, SchemaPath, TablePath};
use deploysure_sql::statements;

/// Position of the object name in `SHOW` output
const SHOW_NAME_COLUMN: usize = 1;

/// One column of a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDetail {
    pub name: String,

    /// Upper-cased warehouse data type
    pub data_type: String,
}

/// Column names grouped by data type family
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnCategories {
    pub numeric: Vec<String>,
    pub date: Vec<String>,
    pub string: Vec<String>,
    pub all: Vec<String>,
}

async fn show_names(warehouse: &dyn Warehouse, sql: &str, what: &str) -> Vec<String> {
    match warehouse.query(sql).await {
        Ok(result) => result.column_text(SHOW_NAME_COLUMN),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to list {}", what);
            Vec::new()
        }
    }
}

pub async fn list_databases(warehouse: &dyn Warehouse) -> Vec<String> {
    show_names(warehouse, &statements::show_databases(), "databases").await
}

pub async fn list_schemas(warehouse: &dyn Warehouse, database: &Ident) -> Vec<String> {
    show_names(warehouse, &statements::show_schemas(database), "schemas").await
}

/// Data tables of a schema; the catalog tables are left out
pub async fn list_tables(
    warehouse: &dyn Warehouse,
    schema: &SchemaPath,
    catalog: &CatalogNames,
) -> Vec<String> {
    show_names(warehouse, &statements::show_tables(schema), "tables")
        .await
        .into_iter()
        .filter(|table| !catalog.is_catalog_table(table))
        .collect()
}

pub async fn list_columns(warehouse: &dyn Warehouse, table: &TablePath) -> Vec<String> {
    column_details(warehouse, table)
        .await
        .into_iter()
        .map(|column| column.name)
        .collect()
}

/// Column names and data types in ordinal order
pub async fn column_details(warehouse: &dyn Warehouse, table: &TablePath) -> Vec<ColumnDetail> {
    let result = match warehouse.query(&statements::table_columns(table)).await {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!(table = %table, error = %e, "Failed to list columns");
            return Vec::new();
        }
    };

    result
        .rows
        .iter()
        .filter_map(|row| {
            let name = row.first().filter(|v| !v.is_null())?;
            let data_type = row.get(1).map(|v| v.to_string()).unwrap_or_default();
            Some(ColumnDetail {
                name: name.to_string(),
                data_type: data_type.to_uppercase(),
            })
        })
        .collect()
}

/// Group columns by type family
///
/// Matching is by substring of the data type, so `TIMESTAMP_NTZ` is a date
/// and `BIGINT` is numeric. Types outside the three families only appear in
/// `all`.
pub fn categorize_columns(columns: &[ColumnDetail]) -> ColumnCategories {
    let mut categories = ColumnCategories::default();

    for column in columns {
        let data_type = column.data_type.as_str();
        let has_any = |needles: &[&str]| needles.iter().any(|n| data_type.contains(n));

        if has_any(&["NUMBER", "INT", "FLOAT", "DOUBLE"]) {
            categories.numeric.push(column.name.clone());
        } else if has_any(&["DATE", "TIMESTAMP"]) {
            categories.date.push(column.name.clone());
        } else if has_any(&["VARCHAR", "TEXT", "STRING"]) {
            categories.string.push(column.name.clone());
        }

        categories.all.push(column.name.clone());
    }

    categories
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockWarehouseBuilder;
    use deploysure_core::Value;
    use pretty_assertions::assert_eq;

    fn schema() -> SchemaPath {
        SchemaPath::from_user_input("SALES", "PUBLIC").unwrap()
    }

    #[tokio::test]
    async fn tables_exclude_catalog() {
        let warehouse = MockWarehouseBuilder::new()
            .with_show_result(
                "SHOW TABLES IN SCHEMA",
                &["ORDER_DATA", "TEST_CASES", "order_kpis", "CUSTOMERS"],
            )
            .build();

        let tables = list_tables(&warehouse, &schema(), &CatalogNames::default()).await;
        assert_eq!(tables, vec!["ORDER_DATA", "CUSTOMERS"]);
    }

    #[tokio::test]
    async fn failures_degrade_to_empty() {
        let warehouse = MockWarehouseBuilder::new()
            .with_error("SHOW", "Insufficient privileges")
            .with_error("INFORMATION_SCHEMA", "Insufficient privileges")
            .build();

        assert!(list_databases(&warehouse).await.is_empty());
        assert!(list_schemas(&warehouse, &Ident::new("SALES").unwrap()).await.is_empty());

        let table = schema().table(Ident::new("ORDERS").unwrap());
        assert!(list_columns(&warehouse, &table).await.is_empty());
    }

    #[tokio::test]
    async fn column_details_in_ordinal_order() {
        let warehouse = MockWarehouseBuilder::new()
            .with_rows(
                "INFORMATION_SCHEMA.COLUMNS",
                &["COLUMN_NAME", "DATA_TYPE"],
                vec![
                    vec![Value::from("ID"), Value::from("number")],
                    vec![Value::from("CREATED"), Value::from("TIMESTAMP_NTZ")],
                ],
            )
            .build();

        let table = schema().table(Ident::new("ORDERS").unwrap());
        let details = column_details(&warehouse, &table).await;
        assert_eq!(
            details,
            vec![
                ColumnDetail { name: "ID".into(), data_type: "NUMBER".into() },
                ColumnDetail { name: "CREATED".into(), data_type: "TIMESTAMP_NTZ".into() },
            ]
        );
        assert!(warehouse.executed("WHERE TABLE_SCHEMA = 'PUBLIC' AND TABLE_NAME = 'ORDERS'").await);
    }

    #[test]
    fn categorize() {
        let detail = |name: &str, data_type: &str| ColumnDetail {
            name: name.to_string(),
            data_type: data_type.to_string(),
        };

        let categories = categorize_columns(&[
            detail("ID", "NUMBER"),
            detail("QTY", "BIGINT"),
            detail("PRICE", "FLOAT"),
            detail("SHIPPED", "DATE"),
            detail("UPDATED", "TIMESTAMP_LTZ"),
            detail("NOTE", "VARCHAR"),
            detail("FLAG", "BOOLEAN"),
        ]);

        assert_eq!(categories.numeric, vec!["ID", "QTY", "PRICE"]);
        assert_eq!(categories.date, vec!["SHIPPED", "UPDATED"]);
        assert_eq!(categories.string, vec!["NOTE"]);
        assert_eq!(categories.all.len(), 7);
    }
}
