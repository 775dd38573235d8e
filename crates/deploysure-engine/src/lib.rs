//! DeploySure engine - comparison and validation operations
//!
//! This crate implements the operations run against a connected warehouse:
//! - Schema mirroring (zero-copy clone)
//! - Schema drift comparison
//! - KPI comparison between two schemas
//! - Catalog-driven SQL test cases
//! - Data quality checks
//!
//! Operations run sequentially against one [`Session`]. A failing item (one
//! KPI, one test case, one table of a drift scan) becomes an error-tagged row;
//! only connecting can fail outright.

pub mod mirror;
pub mod drift;
pub mod kpi;
pub mod test_cases;
pub mod quality;
pub mod session;

pub use mirror::{MirrorError, MirrorSummary, Parity};
pub use drift::{SchemaDrift, TableDiff, ColumnDiff, TypeDiff};
pub use kpi::{KpiComparison, KpiDefinition, KpiRun, KpiStatus, Measurement};
pub use test_cases::{CaseFilter, CaseStatus, TestCase, TestCaseResult, TestRun};
pub use quality::{CheckRegistry, CheckResult, CheckStatus, Grade, QualityError, QualityPlan, QualityReport};
pub use session::{ResultKind, Session, SessionError};

/// Longest warehouse message kept in a per-item row
pub const ERROR_EXCERPT_LEN: usize = 50;

/// First `ERROR_EXCERPT_LEN` characters of an error message
pub(crate) fn excerpt(message: &str) -> String {
    message.chars().take(ERROR_EXCERPT_LEN).collect()
}
