//! Catalog-driven SQL test cases
//!
//! Each schema under test may hold a test case catalog table. A test case is
//! a query over one target table plus the scalar it is expected to return.
//! Before running, references to the target table are qualified with the
//! database and schema under test.

use deploysure_catalog::Warehouse;
use deploysure_core::{CatalogNames, ResultTable, SchemaPath, Tabular, Value};
use deploysure_sql::{qualify_table, statements};
use std::fmt;

/// Category meaning "no table restriction"
pub const ALL_CATEGORIES: &str = "All";

/// Actual value reported when a query returns no row
const NO_ROW_VALUE: &str = "0";

/// Which test cases to read from the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseFilter {
    All,
    /// Only the cases of one target table
    Table(String),
}

impl CaseFilter {
    /// `All` (or nothing) means every case; anything else names a table
    pub fn parse(category: &str) -> Self {
        let category = category.trim();
        if category.is_empty() || category == ALL_CATEGORIES {
            CaseFilter::All
        } else {
            CaseFilter::Table(category.to_string())
        }
    }
}

/// One row of the test case catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub id: String,
    pub abbreviation: String,
    /// Target table; cases without one run their SQL unmodified
    pub table_name: Option<String>,
    pub description: String,
    pub sql: String,
    pub expected: String,
}

impl Tabular for TestCase {
    fn headers() -> Vec<&'static str> {
        vec!["ID", "Test Case", "Category", "Description", "Expected"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.abbreviation.clone(),
            self.table_name.clone().unwrap_or_default(),
            self.description.clone(),
            self.expected.clone(),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseStatus {
    Pass,
    Fail,
    /// The query raised
    Error,
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaseStatus::Pass => write!(f, "PASS"),
            CaseStatus::Fail => write!(f, "FAIL"),
            CaseStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// Outcome of one test case
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCaseResult {
    pub test_case: String,
    pub category: String,
    pub expected: String,
    pub actual: String,
    pub status: CaseStatus,
}

impl Tabular for TestCaseResult {
    fn headers() -> Vec<&'static str> {
        vec!["Test Case", "Category", "Expected", "Actual", "Status"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.test_case.clone(),
            self.category.clone(),
            self.expected.clone(),
            self.actual.clone(),
            self.status.to_string(),
        ]
    }
}

/// Results of a batch of test cases
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestRun {
    pub results: Vec<TestCaseResult>,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
}

impl TestRun {
    fn record(&mut self, result: TestCaseResult) {
        match result.status {
            CaseStatus::Pass => self.passed += 1,
            CaseStatus::Fail => self.failed += 1,
            CaseStatus::Error => self.errors += 1,
        }
        self.results.push(result);
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0 && self.errors == 0
    }

    pub fn to_table(&self) -> ResultTable {
        ResultTable::from_rows("Test Results", &self.results)
    }
}

/// `All` followed by every target table named in the catalog
///
/// Without a readable catalog only `All` is offered.
pub async fn list_categories(
    warehouse: &dyn Warehouse,
    schema: &SchemaPath,
    names: &CatalogNames,
) -> Vec<String> {
    let mut categories = vec![ALL_CATEGORIES.to_string()];
    let catalog = schema.table(names.test_cases.clone());

    let exists = match warehouse.query(&statements::table_exists(&catalog)).await {
        Ok(result) => result.first_value().and_then(Value::as_i64).unwrap_or(0) > 0,
        Err(e) => {
            tracing::warn!(schema = %schema, error = %e, "Failed to look up test case catalog");
            false
        }
    };

    if !exists {
        return categories;
    }

    match warehouse.query(&statements::test_case_categories(&catalog)).await {
        Ok(result) => categories.extend(result.column_text(0)),
        Err(e) => tracing::warn!(schema = %schema, error = %e, "Failed to list test case categories"),
    }

    categories
}

/// Read test cases ordered by id; an unreadable catalog yields none
pub async fn load_test_cases(
    warehouse: &dyn Warehouse,
    schema: &SchemaPath,
    names: &CatalogNames,
    filter: &CaseFilter,
) -> Vec<TestCase> {
    let catalog = schema.table(names.test_cases.clone());
    let table_name = match filter {
        CaseFilter::All => None,
        CaseFilter::Table(name) => Some(name.as_str()),
    };

    let result = match warehouse.query(&statements::test_cases(&catalog, table_name)).await {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!(schema = %schema, error = %e, "Failed to read test cases");
            return Vec::new();
        }
    };

    result
        .rows
        .iter()
        .map(|row| {
            let text = |idx: usize| {
                row.get(idx)
                    .filter(|v| !v.is_null())
                    .map(Value::to_string)
            };
            TestCase {
                id: text(0).unwrap_or_default(),
                abbreviation: text(1).unwrap_or_default(),
                table_name: text(2),
                description: text(3).unwrap_or_default(),
                sql: text(4).unwrap_or_default(),
                expected: row.get(5).map(Value::to_string).unwrap_or_default(),
            }
        })
        .collect()
}

/// Keep the cases whose abbreviation is selected; no selection keeps all
pub fn select_cases(cases: Vec<TestCase>, selected: &[String]) -> Vec<TestCase> {
    if selected.is_empty() {
        return cases;
    }

    cases
        .into_iter()
        .filter(|case| selected.iter().any(|name| name == &case.abbreviation))
        .collect()
}

async fn run_case(warehouse: &dyn Warehouse, schema: &SchemaPath, case: &TestCase) -> Result<String, String> {
    let sql = match &case.table_name {
        Some(table) => qualify_table(&case.sql, table, schema).map_err(|e| e.to_string())?,
        None => case.sql.clone(),
    };

    let result = warehouse
        .query(&sql)
        .await
        .map_err(|e| e.message().to_string())?;

    Ok(result
        .first_value()
        .map(Value::to_string)
        .unwrap_or_else(|| NO_ROW_VALUE.to_string()))
}

/// Run test cases one after another against `schema`
///
/// A failing query becomes an `ERROR` row and the batch continues.
pub async fn run_test_cases(warehouse: &dyn Warehouse, schema: &SchemaPath, cases: &[TestCase]) -> TestRun {
    let mut run = TestRun::default();

    for case in cases {
        let expected = case.expected.trim().to_string();

        let (actual, status) = match run_case(warehouse, schema, case).await {
            Ok(actual) if actual == expected => (actual, CaseStatus::Pass),
            Ok(actual) => (actual, CaseStatus::Fail),
            Err(message) => {
                tracing::warn!(test_case = %case.abbreviation, error = %message, "Test case raised");
                (format!("ERROR: {}", crate::excerpt(&message)), CaseStatus::Error)
            }
        };

        run.record(TestCaseResult {
            test_case: case.abbreviation.clone(),
            category: case.table_name.clone().unwrap_or_default(),
            expected,
            actual,
            status,
        });
    }

    tracing::info!(
        passed = run.passed,
        failed = run.failed,
        errors = run.errors,
        "Test cases finished"
    );

    run
}
