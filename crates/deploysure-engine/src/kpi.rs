//! KPI comparison between a source schema and its clone
//!
//! KPI definitions are SQL templates stored in the source schema's KPI
//! catalog table. Each template names the canonical source table; it is
//! qualified once per schema, both statements run, and the two scalars are
//! compared.
//!
//! - both numeric: `difference = source - target`, exact for integers and
//!   decimals, floating point once either side is a float; match iff zero
//! - otherwise: text equality, difference `N/A`
//! - a side whose query fails (or returns no row) reads as the text `ERROR`
//!   and takes the text path, so two failing sides match

use deploysure_catalog::{Warehouse, WarehouseError};
use deploysure_core::{CatalogNames, ResultTable, SchemaPath, Tabular, Value};
use deploysure_sql::{qualify_table, statements};
use std::fmt;

/// One row of the KPI catalog
///
/// `id` and `template` are `None` when the catalog cell is NULL; such a row
/// is still reported, with both sides measured as an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KpiDefinition {
    pub id: Option<String>,
    pub name: String,
    /// SQL template referring to the canonical source table
    pub template: Option<String>,
}

impl KpiDefinition {
    /// The template, or why this row cannot be measured
    pub fn sql(&self) -> Result<&str, String> {
        if self.id.is_none() {
            return Err("KPI definition has no KPI_ID".to_string());
        }
        self.template
            .as_deref()
            .ok_or_else(|| "KPI definition has no KPI_VALUE".to_string())
    }
}

/// The scalar a KPI query produced on one side
#[derive(Debug, Clone, PartialEq)]
pub enum Measurement {
    Value(Value),
    /// The query failed or returned no row
    Error(String),
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Measurement::Value(value) => write!(f, "{}", value),
            Measurement::Error(_) => write!(f, "ERROR"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KpiStatus {
    Match,
    Mismatch,
}

impl fmt::Display for KpiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KpiStatus::Match => write!(f, "Match"),
            KpiStatus::Mismatch => write!(f, "Mismatch"),
        }
    }
}

/// Comparison of one KPI across both schemas
#[derive(Debug, Clone, PartialEq)]
pub struct KpiComparison {
    pub kpi: String,
    pub source: Measurement,
    pub clone: Measurement,
    /// `None` when the values are not both numeric
    pub difference: Option<Value>,
    pub status: KpiStatus,
}

impl Tabular for KpiComparison {
    fn headers() -> Vec<&'static str> {
        vec!["KPI", "Source", "Clone", "Difference", "Status"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.kpi.clone(),
            self.source.to_string(),
            self.clone.to_string(),
            self.difference
                .as_ref()
                .map(Value::to_string)
                .unwrap_or_else(|| "N/A".to_string()),
            self.status.to_string(),
        ]
    }
}

/// Result of a KPI run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KpiRun {
    pub comparisons: Vec<KpiComparison>,
    /// Why the run has no rows, if it has none
    pub notice: Option<String>,
}

impl KpiRun {
    pub fn matches(&self) -> usize {
        self.comparisons
            .iter()
            .filter(|c| c.status == KpiStatus::Match)
            .count()
    }

    pub fn mismatches(&self) -> usize {
        self.comparisons.len() - self.matches()
    }

    pub fn to_table(&self) -> ResultTable {
        ResultTable::from_rows("KPI Results", &self.comparisons)
    }
}

/// Compare two measurements
pub fn compare_measurements(source: &Measurement, clone: &Measurement) -> (Option<Value>, KpiStatus) {
    match (source, clone) {
        (Measurement::Value(a), Measurement::Value(b)) => match a.numeric_difference(b) {
            Some(difference) => {
                let status = if difference.is_zero() { KpiStatus::Match } else { KpiStatus::Mismatch };
                (Some(difference), status)
            }
            None => (None, text_status(source, clone)),
        },
        _ => (None, text_status(source, clone)),
    }
}

/// Text path: an error side reads as `ERROR`
fn text_status(source: &Measurement, clone: &Measurement) -> KpiStatus {
    if source.to_string() == clone.to_string() {
        KpiStatus::Match
    } else {
        KpiStatus::Mismatch
    }
}

/// Read the KPI catalog of a schema, ordered by id
pub async fn load_kpis(
    warehouse: &dyn Warehouse,
    schema: &SchemaPath,
    names: &CatalogNames,
) -> Result<Vec<KpiDefinition>, WarehouseError> {
    let catalog = schema.table(names.kpis.clone());
    let result = warehouse.query(&statements::kpi_definitions(&catalog)).await?;

    Ok(result
        .rows
        .iter()
        .map(|row| {
            let text = |idx: usize| row.get(idx).filter(|v| !v.is_null()).map(Value::to_string);
            KpiDefinition {
                id: text(0),
                name: text(1).unwrap_or_default(),
                template: text(2),
            }
        })
        .collect())
}

async fn measure(warehouse: &dyn Warehouse, template: &str, source_table: &str, schema: &SchemaPath) -> Measurement {
    let sql = match qualify_table(template, source_table, schema) {
        Ok(sql) => sql,
        Err(e) => return Measurement::Error(e.to_string()),
    };

    match warehouse.query(&sql).await {
        Ok(result) => match result.first_value() {
            Some(value) => Measurement::Value(value.clone()),
            None => Measurement::Error("Query returned no rows".to_string()),
        },
        Err(e) => Measurement::Error(e.message().to_string()),
    }
}

/// Compare every KPI of `source` against the `target` schema
///
/// A missing or unreadable KPI catalog yields an empty run with a notice.
pub async fn compare_kpis(
    warehouse: &dyn Warehouse,
    source: &SchemaPath,
    target: &SchemaPath,
    names: &CatalogNames,
) -> KpiRun {
    let kpis = match load_kpis(warehouse, source, names).await {
        Ok(kpis) => kpis,
        Err(e) => {
            tracing::warn!(schema = %source, error = %e, "Failed to read KPI definitions");
            return KpiRun {
                comparisons: Vec::new(),
                notice: Some(format!("Failed to read KPI definitions: {}", e.message())),
            };
        }
    };

    if kpis.is_empty() {
        return KpiRun {
            comparisons: Vec::new(),
            notice: Some("No KPIs found".to_string()),
        };
    }

    let source_table = names.kpi_source.as_str();
    let mut comparisons = Vec::with_capacity(kpis.len());

    for kpi in kpis {
        let (source_value, clone_value) = match kpi.sql() {
            Ok(template) => (
                measure(warehouse, template, source_table, source).await,
                measure(warehouse, template, source_table, target).await,
            ),
            Err(msg) => (Measurement::Error(msg.clone()), Measurement::Error(msg)),
        };

        for (side, measurement) in [("source", &source_value), ("clone", &clone_value)] {
            if let Measurement::Error(msg) = measurement {
                tracing::warn!(kpi = %kpi.name, side, error = %msg, "KPI query failed");
            }
        }

        let (difference, status) = compare_measurements(&source_value, &clone_value);
        comparisons.push(KpiComparison {
            kpi: kpi.name,
            source: source_value,
            clone: clone_value,
            difference,
            status,
        });
    }

    tracing::info!(kpis = comparisons.len(), "KPI comparison finished");

    KpiRun {
        comparisons,
        notice: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deploysure_catalog::MockWarehouseBuilder;
    use deploysure_core::{Decimal, Ident};
    use pretty_assertions::assert_eq;

    fn schemas() -> (SchemaPath, SchemaPath) {
        let source = SchemaPath::from_user_input("SALES", "PUBLIC").unwrap();
        let target = source.sibling(Ident::new("PUBLIC_CLONE").unwrap());
        (source, target)
    }

    fn kpi_rows(kpis: &[(&str, &str, &str)]) -> Vec<Vec<Value>> {
        kpis.iter()
            .map(|(id, name, sql)| vec![Value::from(*id), Value::from(*name), Value::from(*sql)])
            .collect()
    }

    fn value(v: impl Into<Value>) -> Measurement {
        Measurement::Value(v.into())
    }

    #[test]
    fn identical_numbers_match() {
        let (difference, status) = compare_measurements(&value(100), &value(100));
        assert_eq!(difference, Some(Value::Int(0)));
        assert_eq!(status, KpiStatus::Match);
    }

    #[test]
    fn difference_is_source_minus_target() {
        assert_eq!(compare_measurements(&value(101), &value(100)), (Some(Value::Int(1)), KpiStatus::Mismatch));
        assert_eq!(compare_measurements(&value(100), &value(101)), (Some(Value::Int(-1)), KpiStatus::Mismatch));
    }

    #[test]
    fn decimals_subtract_exactly() {
        let source = value(Decimal::new(1030, 2));
        let target = value(Decimal::new(1010, 2));
        let (difference, status) = compare_measurements(&source, &target);
        assert_eq!(difference.map(|d| d.to_string()), Some("0.20".to_string()));
        assert_eq!(status, KpiStatus::Mismatch);
    }

    #[test]
    fn text_compares_by_equality() {
        assert_eq!(compare_measurements(&value("EUR"), &value("EUR")), (None, KpiStatus::Match));
        assert_eq!(compare_measurements(&value("EUR"), &value("USD")), (None, KpiStatus::Mismatch));
    }

    #[test]
    fn errors_on_both_sides_match() {
        let source = Measurement::Error("Object 'ORDER_DATA' does not exist".to_string());
        let clone = Measurement::Error("invalid identifier 'AMOUNT'".to_string());
        assert_eq!(compare_measurements(&source, &clone), (None, KpiStatus::Match));
    }

    #[test]
    fn error_on_one_side_is_a_mismatch() {
        let error = Measurement::Error("boom".to_string());
        assert_eq!(compare_measurements(&value(1), &error), (None, KpiStatus::Mismatch));
        assert_eq!(compare_measurements(&error, &value("EUR")), (None, KpiStatus::Mismatch));
    }

    #[tokio::test]
    async fn query_failing_on_both_schemas_matches() {
        let warehouse = MockWarehouseBuilder::new()
            .with_rows(
                "ORDER_KPIS",
                &["KPI_ID", "KPI_NAME", "KPI_VALUE"],
                kpi_rows(&[("1", "Broken", "SELECT MAX(BOGUS) FROM ORDER_DATA")]),
            )
            .with_error("MAX(BOGUS)", "invalid identifier 'BOGUS'")
            .build();

        let (source, target) = schemas();
        let run = compare_kpis(&warehouse, &source, &target, &CatalogNames::default()).await;
        assert_eq!(
            run.comparisons.iter().map(Tabular::cells).collect::<Vec<_>>(),
            vec![vec!["Broken", "ERROR", "ERROR", "N/A", "Match"]]
        );
    }

    #[tokio::test]
    async fn null_catalog_cells_are_error_rows() {
        let warehouse = MockWarehouseBuilder::new()
            .with_rows(
                "ORDER_KPIS",
                &["KPI_ID", "KPI_NAME", "KPI_VALUE"],
                vec![
                    vec![Value::from("1"), Value::from("No SQL"), Value::Null],
                    vec![Value::Null, Value::from("No id"), Value::from("SELECT COUNT(*) FROM ORDER_DATA")],
                    vec![Value::from("3"), Value::from("Count"), Value::from("SELECT COUNT(*) FROM ORDER_DATA")],
                ],
            )
            .with_scalar("COUNT(*) FROM \"SALES\"", 5)
            .build();

        let (source, target) = schemas();
        let definitions = load_kpis(&warehouse, &source, &CatalogNames::default()).await.unwrap();
        assert_eq!(definitions.len(), 3);
        assert_eq!(definitions[0].sql(), Err("KPI definition has no KPI_VALUE".to_string()));
        assert_eq!(definitions[1].sql(), Err("KPI definition has no KPI_ID".to_string()));

        let run = compare_kpis(&warehouse, &source, &target, &CatalogNames::default()).await;
        assert_eq!(
            run.comparisons.iter().map(Tabular::cells).collect::<Vec<_>>(),
            vec![
                vec!["No SQL", "ERROR", "ERROR", "N/A", "Match"],
                vec!["No id", "ERROR", "ERROR", "N/A", "Match"],
                vec!["Count", "5", "5", "0", "Match"],
            ]
        );
        assert!(matches!(&run.comparisons[0].source, Measurement::Error(msg) if msg.contains("KPI_VALUE")));
    }

    #[tokio::test]
    async fn compare_runs_each_template_on_both_schemas() {
        let warehouse = MockWarehouseBuilder::new()
            .with_rows(
                "FROM \"SALES\".\"PUBLIC\".\"ORDER_KPIS\"",
                &["KPI_ID", "KPI_NAME", "KPI_VALUE"],
                kpi_rows(&[
                    ("1", "Order count", "SELECT COUNT(*) FROM order_data"),
                    ("2", "Revenue", "SELECT SUM(amount) FROM ORDER_DATA WHERE status <> 'ORDER_DATA'"),
                ]),
            )
            .with_scalar("SELECT COUNT(*) FROM \"SALES\".\"PUBLIC\".order_data", 10)
            .with_scalar("SELECT COUNT(*) FROM \"SALES\".\"PUBLIC_CLONE\".order_data", 9)
            .with_scalar("SELECT SUM(amount) FROM \"SALES\".\"PUBLIC\".ORDER_DATA WHERE status <> 'ORDER_DATA'", Decimal::new(1050, 2))
            .with_error("SELECT SUM(amount) FROM \"SALES\".\"PUBLIC_CLONE\".ORDER_DATA", "Object 'ORDER_DATA' does not exist")
            .build();

        let (source, target) = schemas();
        let run = compare_kpis(&warehouse, &source, &target, &CatalogNames::default()).await;

        assert_eq!(run.notice, None);
        assert_eq!(
            run.comparisons.iter().map(Tabular::cells).collect::<Vec<_>>(),
            vec![
                vec!["Order count", "10", "9", "1", "Mismatch"],
                vec!["Revenue", "10.50", "ERROR", "N/A", "Mismatch"],
            ]
        );
        assert_eq!(run.mismatches(), 2);
    }

    #[tokio::test]
    async fn empty_result_is_an_error_value() {
        let warehouse = MockWarehouseBuilder::new()
            .with_rows(
                "ORDER_KPIS",
                &["KPI_ID", "KPI_NAME", "KPI_VALUE"],
                kpi_rows(&[("1", "Latest", "SELECT MAX(id) FROM ORDER_DATA GROUP BY 1")]),
            )
            .with_empty("\"PUBLIC\".ORDER_DATA GROUP BY 1")
            .with_scalar("\"PUBLIC_CLONE\".ORDER_DATA GROUP BY 1", 7)
            .build();

        let (source, target) = schemas();
        let run = compare_kpis(&warehouse, &source, &target, &CatalogNames::default()).await;
        assert_eq!(run.comparisons[0].cells(), vec!["Latest", "ERROR", "7", "N/A", "Mismatch"]);
    }

    #[tokio::test]
    async fn missing_catalog_is_an_empty_run() {
        let warehouse = MockWarehouseBuilder::new()
            .with_error("ORDER_KPIS", "Object 'SALES.PUBLIC.ORDER_KPIS' does not exist")
            .build();

        let (source, target) = schemas();
        let run = compare_kpis(&warehouse, &source, &target, &CatalogNames::default()).await;
        assert!(run.comparisons.is_empty());
        assert!(run.notice.unwrap().contains("does not exist"));

        let empty = MockWarehouseBuilder::new()
            .with_rows("ORDER_KPIS", &["KPI_ID", "KPI_NAME", "KPI_VALUE"], vec![])
            .build();
        let run = compare_kpis(&empty, &source, &target, &CatalogNames::default()).await;
        assert_eq!(run.notice.as_deref(), Some("No KPIs found"));
    }
}
