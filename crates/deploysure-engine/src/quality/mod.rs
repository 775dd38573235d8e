//! Data quality checks over one table
//!
//! Checks are plugins kept in a [`CheckRegistry`], keyed by name. Each check
//! declares its parameters; a [`QualityPlan`] (ordered check names with
//! parameter values) is validated against those declarations before any SQL
//! runs. The report only folds check results into counts and a score and
//! does not depend on which checks exist.
//!
//! # Built-in checks
//!
//! - `row_count` - table holds at least `min_rows` rows (default 1)
//! - `duplicate_rows` - no full row occurs more than once
//!
//! # Scoring
//!
//! `score = passed / total * 100`, 0 for an empty battery. Not-applicable
//! results count toward the total but are not failures. A check whose query
//! raised is reported as `ERROR` and counts as failed in the summary.

pub mod checks;

pub use checks::{DuplicateRowsCheck, RowCountCheck};

use deploysure_catalog::{Warehouse, WarehouseError};
use deploysure_core::{QualityConfig, ResultTable, TablePath, Tabular};
use std::collections::BTreeMap;
use std::fmt;

/// Errors raised while validating a plan
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QualityError {
    #[error("Unknown quality check '{0}'")]
    UnknownCheck(String),

    #[error("Check '{check}' has no parameter '{param}'")]
    UnknownParameter { check: String, param: String },

    #[error("Parameter '{param}' of check '{check}' must be {expected}")]
    WrongType {
        check: String,
        param: String,
        expected: ParamKind,
    },

    #[error("Parameter '{param}' of check '{check}' must be at least {min}, got {value}")]
    OutOfRange {
        check: String,
        param: String,
        min: i64,
        value: i64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Integer,
    Boolean,
    Text,
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamKind::Integer => write!(f, "an integer"),
            ParamKind::Boolean => write!(f, "a boolean"),
            ParamKind::Text => write!(f, "text"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Integer(i64),
    Boolean(bool),
    Text(String),
}

impl ParamValue {
    pub fn kind(&self) -> ParamKind {
        match self {
            ParamValue::Integer(_) => ParamKind::Integer,
            ParamValue::Boolean(_) => ParamKind::Boolean,
            ParamValue::Text(_) => ParamKind::Text,
        }
    }
}

/// Declared parameter of a check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub default: ParamValue,
    /// Lower bound for integer parameters
    pub min: Option<i64>,
}

/// Resolved parameters handed to a check
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(BTreeMap<String, ParamValue>);

impl Params {
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        match self.0.get(name) {
            Some(ParamValue::Integer(v)) => Some(*v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Fail,
    NotApplicable,
    Error,
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckStatus::Pass => write!(f, "Pass"),
            CheckStatus::Fail => write!(f, "Fail"),
            CheckStatus::NotApplicable => write!(f, "N/A"),
            CheckStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// One row of the details table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub check: String,
    pub column: String,
    pub expected: String,
    pub actual: String,
    pub status: CheckStatus,
    pub details: String,
}

impl CheckResult {
    /// Pass iff `passed`
    pub fn judged(
        check: &str,
        column: &str,
        expected: impl Into<String>,
        actual: impl Into<String>,
        passed: bool,
        details: impl Into<String>,
    ) -> Self {
        Self {
            check: check.to_string(),
            column: column.to_string(),
            expected: expected.into(),
            actual: actual.into(),
            status: if passed { CheckStatus::Pass } else { CheckStatus::Fail },
            details: details.into(),
        }
    }
}

impl Tabular for CheckResult {
    fn headers() -> Vec<&'static str> {
        vec!["Check", "Column", "Expected", "Actual", "Status", "Details"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.check.clone(),
            self.column.clone(),
            self.expected.clone(),
            self.actual.clone(),
            self.status.to_string(),
            self.details.clone(),
        ]
    }
}

/// A data quality check plugin
#[async_trait::async_trait]
pub trait QualityCheck: Send + Sync {
    /// Registry key (e.g., "row_count")
    fn name(&self) -> &'static str;

    /// Label shown in the details table
    fn label(&self) -> &'static str;

    /// Declared parameters
    fn params(&self) -> Vec<ParamSpec> {
        Vec::new()
    }

    /// Run against one table
    ///
    /// A warehouse error is turned into an `ERROR` row by the caller.
    async fn run(
        &self,
        warehouse: &dyn Warehouse,
        table: &TablePath,
        params: &Params,
    ) -> Result<CheckResult, WarehouseError>;
}

/// Checks available by name
#[derive(Default)]
pub struct CheckRegistry {
    checks: Vec<Box<dyn QualityCheck>>,
}

impl CheckRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in checks
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(RowCountCheck));
        registry.register(Box::new(DuplicateRowsCheck));
        registry
    }

    /// Add a check, replacing one with the same name
    pub fn register(&mut self, check: Box<dyn QualityCheck>) {
        self.checks.retain(|existing| existing.name() != check.name());
        self.checks.push(check);
    }

    pub fn get(&self, name: &str) -> Option<&dyn QualityCheck> {
        self.checks
            .iter()
            .find(|check| check.name() == name)
            .map(|check| check.as_ref())
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.checks.iter().map(|check| check.name()).collect()
    }

    /// Resolve every step of a plan against the declared parameters
    pub fn resolve<'a>(
        &'a self,
        plan: &QualityPlan,
    ) -> Result<Vec<(&'a dyn QualityCheck, Params)>, QualityError> {
        plan.steps
            .iter()
            .map(|step| {
                let check = self
                    .get(&step.check)
                    .ok_or_else(|| QualityError::UnknownCheck(step.check.clone()))?;
                let params = resolve_params(check, &step.params)?;
                Ok((check, params))
            })
            .collect()
    }
}

fn resolve_params(
    check: &dyn QualityCheck,
    given: &BTreeMap<String, ParamValue>,
) -> Result<Params, QualityError> {
    let specs = check.params();

    if let Some(unknown) = given.keys().find(|name| !specs.iter().any(|spec| spec.name == name.as_str())) {
        return Err(QualityError::UnknownParameter {
            check: check.name().to_string(),
            param: unknown.clone(),
        });
    }

    let mut resolved = BTreeMap::new();
    for spec in specs {
        let value = given.get(spec.name).cloned().unwrap_or_else(|| spec.default.clone());

        if value.kind() != spec.kind {
            return Err(QualityError::WrongType {
                check: check.name().to_string(),
                param: spec.name.to_string(),
                expected: spec.kind,
            });
        }

        if let (ParamValue::Integer(v), Some(min)) = (&value, spec.min) {
            if *v < min {
                return Err(QualityError::OutOfRange {
                    check: check.name().to_string(),
                    param: spec.name.to_string(),
                    min,
                    value: *v,
                });
            }
        }

        resolved.insert(spec.name.to_string(), value);
    }

    Ok(Params(resolved))
}

/// One planned check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCheck {
    pub check: String,
    pub params: BTreeMap<String, ParamValue>,
}

/// Ordered checks to run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QualityPlan {
    pub steps: Vec<PlannedCheck>,
}

impl QualityPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a check with default parameters
    pub fn with_check(mut self, check: impl Into<String>) -> Self {
        self.steps.push(PlannedCheck {
            check: check.into(),
            params: BTreeMap::new(),
        });
        self
    }

    /// Set a parameter of the last added check
    pub fn with_param(mut self, name: impl Into<String>, value: ParamValue) -> Self {
        if let Some(step) = self.steps.last_mut() {
            step.params.insert(name.into(), value);
        }
        self
    }

    /// The default battery, as toggled in configuration
    pub fn from_config(config: &QualityConfig) -> Self {
        let mut plan = Self::new();

        if config.row_count {
            let min_rows = i64::try_from(config.min_rows).unwrap_or(i64::MAX);
            plan = plan
                .with_check(checks::ROW_COUNT)
                .with_param("min_rows", ParamValue::Integer(min_rows));
        }
        if config.duplicate_rows {
            plan = plan.with_check(checks::DUPLICATE_ROWS);
        }

        plan
    }
}

/// Quality band of a score
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grade {
    Good,
    Warning,
    Poor,
}

impl Grade {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            Grade::Good
        } else if score >= 50.0 {
            Grade::Warning
        } else {
            Grade::Poor
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Grade::Good => write!(f, "Good"),
            Grade::Warning => write!(f, "Warning"),
            Grade::Poor => write!(f, "Poor"),
        }
    }
}

/// Results of one battery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualityReport {
    pub table: TablePath,
    pub results: Vec<CheckResult>,
}

impl QualityReport {
    fn count(&self, status: CheckStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn passed(&self) -> usize {
        self.count(CheckStatus::Pass)
    }

    /// Failed and errored checks
    pub fn failed(&self) -> usize {
        self.count(CheckStatus::Fail) + self.errors()
    }

    pub fn not_applicable(&self) -> usize {
        self.count(CheckStatus::NotApplicable)
    }

    pub fn errors(&self) -> usize {
        self.count(CheckStatus::Error)
    }

    pub fn score(&self) -> f64 {
        if self.results.is_empty() {
            0.0
        } else {
            self.passed() as f64 / self.total() as f64 * 100.0
        }
    }

    /// Score with one decimal, e.g. `66.7%`
    pub fn score_display(&self) -> String {
        format!("{:.1}%", self.score())
    }

    pub fn grade(&self) -> Grade {
        Grade::from_score(self.score())
    }

    pub fn summary_table(&self) -> ResultTable {
        let mut table = ResultTable::new("Summary", vec!["Metric".to_string(), "Value".to_string()]);
        for (metric, value) in [
            ("Table", self.table.to_string()),
            ("Total Checks", self.total().to_string()),
            ("Passed", self.passed().to_string()),
            ("Failed", self.failed().to_string()),
            ("Score", self.score_display()),
        ] {
            table.push_row(vec![metric.to_string(), value]);
        }
        table
    }

    pub fn details_table(&self) -> ResultTable {
        ResultTable::from_rows("Details", &self.results)
    }
}

/// Validate `plan`, then run its checks in order against `table`
pub async fn run_quality_checks(
    warehouse: &dyn Warehouse,
    registry: &CheckRegistry,
    table: &TablePath,
    plan: &QualityPlan,
) -> Result<QualityReport, QualityError> {
    let steps = registry.resolve(plan)?;
    let mut results = Vec::with_capacity(steps.len());

    for (check, params) in steps {
        let result = match check.run(warehouse, table, &params).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(check = check.name(), table = %table, error = %e, "Quality check raised");
                CheckResult {
                    check: check.label().to_string(),
                    column: String::new(),
                    expected: String::new(),
                    actual: "ERROR".to_string(),
                    status: CheckStatus::Error,
                    details: crate::excerpt(e.message()),
                }
            }
        };
        results.push(result);
    }

    let report = QualityReport {
        table: table.clone(),
        results,
    };

    tracing::info!(table = %table, score = report.score(), "Quality checks finished");

    Ok(report)
}
