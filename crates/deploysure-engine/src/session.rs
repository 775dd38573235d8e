//! Session context
//!
//! A [`Session`] owns the warehouse connection for one operator and the last
//! result of each kind. Every operation takes `&mut self`, so at most one
//! operation is in flight per connection.

use crate::drift::{self, SchemaDrift};
use crate::kpi::{self, KpiRun};
use crate::mirror::{self, MirrorError, MirrorSummary};
use crate::quality::{self, CheckRegistry, QualityError, QualityPlan, QualityReport};
use crate::test_cases::{self, CaseFilter, TestCase, TestRun};
use deploysure_catalog::{browser, ColumnDetail, Warehouse, WarehouseError};
use deploysure_core::{CatalogNames, Ident, ResultTable, SchemaPath, TablePath};
use std::collections::BTreeMap;

/// Errors surfaced by session operations
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Connection failed: {0}")]
    Connection(WarehouseError),

    #[error(transparent)]
    Mirror(#[from] MirrorError),

    #[error(transparent)]
    Quality(#[from] QualityError),
}

/// Kinds of result a session keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResultKind {
    MirrorSummary,
    TableDiff,
    ColumnDiff,
    TypeDiff,
    KpiResults,
    TestResults,
    QualitySummary,
    QualityDetails,
}

impl ResultKind {
    /// File name prefix used when exporting
    pub fn export_prefix(&self) -> &'static str {
        match self {
            ResultKind::MirrorSummary => "mirror_summary",
            ResultKind::TableDiff => "table_diff",
            ResultKind::ColumnDiff => "col_diff",
            ResultKind::TypeDiff => "type_diff",
            ResultKind::KpiResults => "kpi_results",
            ResultKind::TestResults => "test_results",
            ResultKind::QualitySummary => "dq_summary",
            ResultKind::QualityDetails => "dq_report",
        }
    }
}

/// One operator's connection and results
pub struct Session {
    warehouse: Box<dyn Warehouse>,
    user: String,
    names: CatalogNames,
    registry: CheckRegistry,
    results: BTreeMap<ResultKind, ResultTable>,
}

impl Session {
    /// Test the connection and start a session
    ///
    /// This is the only operation whose failure blocks the operator.
    pub async fn connect(
        warehouse: Box<dyn Warehouse>,
        user: impl Into<String>,
        names: CatalogNames,
    ) -> Result<Self, SessionError> {
        let user = user.into();

        warehouse
            .test_connection()
            .await
            .map_err(SessionError::Connection)?;

        tracing::info!(user = %user, warehouse = warehouse.name(), "Connected");

        Ok(Self {
            warehouse,
            user,
            names,
            registry: CheckRegistry::builtin(),
            results: BTreeMap::new(),
        })
    }

    /// Replace the quality check registry
    pub fn with_registry(mut self, registry: CheckRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn catalog_names(&self) -> &CatalogNames {
        &self.names
    }

    pub fn warehouse(&self) -> &dyn Warehouse {
        self.warehouse.as_ref()
    }

    /// Last result of a kind, if computed in this session
    pub fn last_result(&self, kind: ResultKind) -> Option<&ResultTable> {
        self.results.get(&kind)
    }

    /// Every stored result
    pub fn results(&self) -> impl Iterator<Item = (ResultKind, &ResultTable)> {
        self.results.iter().map(|(kind, table)| (*kind, table))
    }

    fn store(&mut self, kind: ResultKind, table: ResultTable) {
        self.results.insert(kind, table);
    }

    pub async fn list_databases(&mut self) -> Vec<String> {
        browser::list_databases(self.warehouse()).await
    }

    pub async fn list_schemas(&mut self, database: &Ident) -> Vec<String> {
        browser::list_schemas(self.warehouse(), database).await
    }

    pub async fn list_tables(&mut self, schema: &SchemaPath) -> Vec<String> {
        browser::list_tables(self.warehouse(), schema, &self.names).await
    }

    pub async fn list_columns(&mut self, table: &TablePath) -> Vec<String> {
        browser::list_columns(self.warehouse(), table).await
    }

    pub async fn column_details(&mut self, table: &TablePath) -> Vec<ColumnDetail> {
        browser::column_details(self.warehouse(), table).await
    }

    pub async fn mirror_schema(
        &mut self,
        source: &SchemaPath,
        target: &Ident,
    ) -> Result<MirrorSummary, SessionError> {
        let summary = mirror::mirror_schema(self.warehouse(), source, target).await?;
        self.store(
            ResultKind::MirrorSummary,
            ResultTable::from_rows("Mirror Summary", std::slice::from_ref(&summary)),
        );
        Ok(summary)
    }

    pub async fn compare_schemas(&mut self, source: &SchemaPath, clone: &SchemaPath) -> SchemaDrift {
        let drift = drift::compare_schemas(self.warehouse(), source, clone).await;
        self.store(ResultKind::TableDiff, drift.table_diff_table());
        self.store(ResultKind::ColumnDiff, drift.column_diff_table());
        self.store(ResultKind::TypeDiff, drift.type_diff_table());
        drift
    }

    pub async fn compare_kpis(&mut self, source: &SchemaPath, target: &SchemaPath) -> KpiRun {
        let run = kpi::compare_kpis(self.warehouse(), source, target, &self.names).await;
        self.store(ResultKind::KpiResults, run.to_table());
        run
    }

    pub async fn test_categories(&mut self, schema: &SchemaPath) -> Vec<String> {
        test_cases::list_categories(self.warehouse(), schema, &self.names).await
    }

    pub async fn load_test_cases(&mut self, schema: &SchemaPath, filter: &CaseFilter) -> Vec<TestCase> {
        test_cases::load_test_cases(self.warehouse(), schema, &self.names, filter).await
    }

    pub async fn run_test_cases(&mut self, schema: &SchemaPath, cases: &[TestCase]) -> TestRun {
        let run = test_cases::run_test_cases(self.warehouse(), schema, cases).await;
        self.store(ResultKind::TestResults, run.to_table());
        run
    }

    pub async fn run_quality_checks(
        &mut self,
        table: &TablePath,
        plan: &QualityPlan,
    ) -> Result<QualityReport, SessionError> {
        let report = quality::run_quality_checks(self.warehouse(), &self.registry, table, plan).await?;
        self.store(ResultKind::QualitySummary, report.summary_table());
        self.store(ResultKind::QualityDetails, report.details_table());
        Ok(report)
    }

    /// Close the connection and end the session
    pub async fn disconnect(mut self) -> Result<(), WarehouseError> {
        tracing::info!(user = %self.user, "Disconnecting");
        self.warehouse.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deploysure_catalog::{MockWarehouse, MockWarehouseBuilder};
    use deploysure_core::Value;
    use pretty_assertions::assert_eq;

    async fn connect(warehouse: &MockWarehouse) -> Session {
        Session::connect(Box::new(warehouse.clone()), "ANALYST", CatalogNames::default())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn connection_failure_blocks() {
        let warehouse = MockWarehouse::new().with_connection_failure();
        let result = Session::connect(Box::new(warehouse), "ANALYST", CatalogNames::default()).await;
        assert!(matches!(result, Err(SessionError::Connection(_))));
    }

    #[tokio::test]
    async fn results_are_kept_per_kind() {
        let warehouse = MockWarehouseBuilder::new()
            .with_rows(
                "FULL OUTER JOIN",
                &["TABLE_NAME", "DIFFERENCE"],
                vec![vec![Value::from("LEGACY"), Value::from("Missing in clone")]],
            )
            .with_rows("JOIN \"SALES\".INFORMATION_SCHEMA.TABLES c", &["TABLE_NAME"], vec![])
            .build();

        let mut session = connect(&warehouse).await;
        assert_eq!(session.user(), "ANALYST");
        assert!(session.last_result(ResultKind::TableDiff).is_none());

        let source = SchemaPath::from_user_input("SALES", "PUBLIC").unwrap();
        let clone = SchemaPath::from_user_input("SALES", "PUBLIC_CLONE").unwrap();
        let drift = session.compare_schemas(&source, &clone).await;
        assert!(drift.has_drift());

        let table_diff = session.last_result(ResultKind::TableDiff).unwrap();
        assert_eq!(table_diff.rows, vec![vec!["LEGACY", "Missing in clone"]]);
        assert!(session.last_result(ResultKind::ColumnDiff).unwrap().is_empty());
        assert_eq!(session.results().count(), 3);
    }

    #[tokio::test]
    async fn invalid_quality_plan_is_an_error() {
        let warehouse = MockWarehouse::new();
        let mut session = connect(&warehouse).await;

        let table = SchemaPath::from_user_input("SALES", "PUBLIC")
            .unwrap()
            .table(Ident::new("ORDERS").unwrap());
        let plan = QualityPlan::new().with_check("regex_pattern");

        let result = session.run_quality_checks(&table, &plan).await;
        assert!(matches!(result, Err(SessionError::Quality(_))));
        assert!(session.last_result(ResultKind::QualityDetails).is_none());
    }

    #[tokio::test]
    async fn disconnect_closes_connection() {
        let warehouse = MockWarehouse::new();
        let session = connect(&warehouse).await;

        session.disconnect().await.unwrap();
        assert!(warehouse.is_closed());
    }

    #[test]
    fn export_prefixes() {
        assert_eq!(ResultKind::ColumnDiff.export_prefix(), "col_diff");
        assert_eq!(ResultKind::QualityDetails.export_prefix(), "dq_report");
        assert_eq!(ResultKind::MirrorSummary.export_prefix(), "mirror_summary");
    }
}
