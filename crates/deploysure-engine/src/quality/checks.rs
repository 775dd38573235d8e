//! Built-in quality checks

use super::{CheckResult, CheckStatus, ParamKind, ParamSpec, ParamValue, Params, QualityCheck};
use deploysure_catalog::{browser, Warehouse, WarehouseError};
use deploysure_core::{Ident, TablePath};
use deploysure_sql::statements;

pub const ROW_COUNT: &str = "row_count";
pub const DUPLICATE_ROWS: &str = "duplicate_rows";

/// Read a single count from a `SELECT COUNT(*)` statement
async fn scalar_count(warehouse: &dyn Warehouse, sql: &str) -> Result<i64, WarehouseError> {
    let result = warehouse.query(sql).await?;
    result
        .first_value()
        .and_then(|value| value.as_i64())
        .ok_or_else(|| WarehouseError::InvalidResponse("Expected a single count".to_string()))
}

/// Table holds at least `min_rows` rows
pub struct RowCountCheck;

#[async_trait::async_trait]
impl QualityCheck for RowCountCheck {
    fn name(&self) -> &'static str {
        ROW_COUNT
    }

    fn label(&self) -> &'static str {
        "Row Count"
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![ParamSpec {
            name: "min_rows",
            kind: ParamKind::Integer,
            default: ParamValue::Integer(1),
            min: Some(0),
        }]
    }

    async fn run(
        &self,
        warehouse: &dyn Warehouse,
        table: &TablePath,
        params: &Params,
    ) -> Result<CheckResult, WarehouseError> {
        let min_rows = params.integer("min_rows").unwrap_or(1);
        let count = scalar_count(warehouse, &statements::count_rows(table)).await?;

        Ok(CheckResult::judged(
            self.label(),
            "N/A",
            format!(">= {}", min_rows),
            count.to_string(),
            count >= min_rows,
            format!("Rows: {}", count),
        ))
    }
}

/// No full row occurs more than once
///
/// Groups by every column of the table; a table without discoverable
/// columns cannot be checked and is reported as not applicable.
pub struct DuplicateRowsCheck;

#[async_trait::async_trait]
impl QualityCheck for DuplicateRowsCheck {
    fn name(&self) -> &'static str {
        DUPLICATE_ROWS
    }

    fn label(&self) -> &'static str {
        "Duplicates"
    }

    async fn run(
        &self,
        warehouse: &dyn Warehouse,
        table: &TablePath,
        _params: &Params,
    ) -> Result<CheckResult, WarehouseError> {
        let details = browser::column_details(warehouse, table).await;

        if details.is_empty() {
            return Ok(CheckResult {
                check: self.label().to_string(),
                column: "All".to_string(),
                expected: "0".to_string(),
                actual: "N/A".to_string(),
                status: CheckStatus::NotApplicable,
                details: "No columns".to_string(),
            });
        }

        let columns = details
            .into_iter()
            .map(|column| Ident::new(column.name))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| WarehouseError::InvalidResponse(e.to_string()))?;

        let groups = scalar_count(warehouse, &statements::duplicate_row_groups(table, &columns)).await?;

        Ok(CheckResult::judged(
            self.label(),
            "All",
            "0",
            groups.to_string(),
            groups == 0,
            format!("Duplicates: {}", groups),
        ))
    }
}
