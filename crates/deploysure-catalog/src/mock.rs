//! Mock warehouse for testing
//!
//! This warehouse answers statements from a script instead of a live
//! session. It's useful for:
//! - Unit testing the engine without credentials
//! - Simulating failing statements and failed logins
//! - Asserting which statements an operation sent
//!
//! ## Matching
//!
//! A scripted response is keyed by a SQL fragment. Whitespace in both the
//! fragment and the statement is collapsed before matching, and the longest
//! fragment contained in the statement wins (ties go to the fragment scripted
//! last). A statement with no matching fragment fails with a query error.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use deploysure_catalog::{MockWarehouseBuilder, Warehouse};
//!
//! let warehouse = MockWarehouseBuilder::new()
//!     .with_show_result("SHOW DATABASES", &["SALES", "HR"])
//!     .with_scalar("SELECT COUNT(*) FROM \"SALES\".\"PUBLIC\".\"ORDERS\"", 42)
//!     .with_error("DESCRIBE TABLE", "Object does not exist")
//!     .build();
//!
//! let result = warehouse.query("SHOW DATABASES").await?;
//! ```

use crate::warehouse::{QueryResult, Warehouse, WarehouseError};
use deploysure_core::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

type Response = Result<QueryResult, WarehouseError>;

fn normalize(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Columns of `SHOW` output up to the object name
fn show_result(names: &[&str]) -> QueryResult {
    QueryResult::new(
        vec!["created_on".to_string(), "name".to_string()],
        names
            .iter()
            .map(|name| vec![Value::Null, Value::from(*name)])
            .collect(),
    )
}

/// Mock warehouse session
///
/// Clones share the script, the statement log and the closed flag, so a
/// test can keep a handle while the session itself is moved elsewhere.
#[derive(Clone)]
pub struct MockWarehouse {
    /// Scripted responses by normalized SQL fragment
    responses: Arc<RwLock<Vec<(String, Response)>>>,

    /// Every statement received, in order
    statements: Arc<RwLock<Vec<String>>>,

    /// Simulate a failed login
    fail_connection: bool,

    /// Simulate query latency (milliseconds)
    latency_ms: u64,

    closed: Arc<AtomicBool>,
}

impl MockWarehouse {
    /// Create a mock with an empty script
    pub fn new() -> Self {
        MockWarehouseBuilder::new().build()
    }

    /// Answer statements containing `fragment` with `result`
    pub async fn on_query(&self, fragment: &str, result: QueryResult) {
        self.responses.write().await.push((normalize(fragment), Ok(result)));
    }

    /// Fail statements containing `fragment` with `error`
    pub async fn on_error(&self, fragment: &str, error: WarehouseError) {
        self.responses.write().await.push((normalize(fragment), Err(error)));
    }

    /// Configure to fail all connection tests
    pub fn with_connection_failure(mut self) -> Self {
        self.fail_connection = true;
        self
    }

    /// Configure simulated latency for all operations
    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    /// Statements received so far, whitespace collapsed
    pub async fn statements(&self) -> Vec<String> {
        self.statements.read().await.clone()
    }

    /// Whether any received statement contains `fragment`
    pub async fn executed(&self, fragment: &str) -> bool {
        let fragment = normalize(fragment);
        self.statements
            .read()
            .await
            .iter()
            .any(|sql| sql.contains(&fragment))
    }

    /// Whether `close` has been called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn simulate_latency(&self) {
        if self.latency_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.latency_ms)).await;
        }
    }
}

impl Default for MockWarehouse {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Warehouse for MockWarehouse {
    fn name(&self) -> &'static str {
        "Mock"
    }

    async fn query(&self, sql: &str) -> Result<QueryResult, WarehouseError> {
        self.simulate_latency().await;

        let sql = normalize(sql);
        self.statements.write().await.push(sql.clone());

        let responses = self.responses.read().await;
        let mut best: Option<&(String, Response)> = None;
        for entry in responses.iter() {
            if !sql.contains(&entry.0) {
                continue;
            }
            if best.map_or(true, |(fragment, _)| entry.0.len() >= fragment.len()) {
                best = Some(entry);
            }
        }

        match best {
            Some((_, response)) => response.clone(),
            None => Err(WarehouseError::QueryError(format!(
                "No mock response for: {}",
                sql
            ))),
        }
    }

    async fn test_connection(&self) -> Result<(), WarehouseError> {
        self.simulate_latency().await;

        if self.fail_connection {
            Err(WarehouseError::AuthenticationError(
                "Simulated connection failure".to_string(),
            ))
        } else {
            Ok(())
        }
    }

    async fn close(&mut self) -> Result<(), WarehouseError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Builder for creating a MockWarehouse with a script
pub struct MockWarehouseBuilder {
    responses: Vec<(String, Response)>,
    fail_connection: bool,
    latency_ms: u64,
}

impl MockWarehouseBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            responses: Vec::new(),
            fail_connection: false,
            latency_ms: 0,
        }
    }

    /// Answer with a full result
    pub fn with_result(mut self, fragment: &str, result: QueryResult) -> Self {
        self.responses.push((normalize(fragment), Ok(result)));
        self
    }

    /// Answer with rows under the given column names
    pub fn with_rows(mut self, fragment: &str, columns: &[&str], rows: Vec<Vec<Value>>) -> Self {
        let columns = columns.iter().map(|c| c.to_string()).collect();
        self.responses.push((normalize(fragment), Ok(QueryResult::new(columns, rows))));
        self
    }

    /// Answer with a single value
    pub fn with_scalar(self, fragment: &str, value: impl Into<Value>) -> Self {
        self.with_rows(fragment, &["VALUE"], vec![vec![value.into()]])
    }

    /// Answer with `SHOW` output listing the given object names
    pub fn with_show_result(mut self, fragment: &str, names: &[&str]) -> Self {
        self.responses.push((normalize(fragment), Ok(show_result(names))));
        self
    }

    /// Answer with a statement that returns no rows
    pub fn with_empty(self, fragment: &str) -> Self {
        self.with_result(fragment, QueryResult::empty())
    }

    /// Fail with a query error carrying `message`
    pub fn with_error(mut self, fragment: &str, message: &str) -> Self {
        self.responses.push((
            normalize(fragment),
            Err(WarehouseError::QueryError(message.to_string())),
        ));
        self
    }

    /// Configure connection failure
    pub fn with_connection_failure(mut self) -> Self {
        self.fail_connection = true;
        self
    }

    /// Configure latency
    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    /// Build the MockWarehouse
    pub fn build(self) -> MockWarehouse {
        MockWarehouse {
            responses: Arc::new(RwLock::new(self.responses)),
            statements: Arc::new(RwLock::new(Vec::new())),
            fail_connection: self.fail_connection,
            latency_ms: self.latency_ms,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl Default for MockWarehouseBuilder {
    fn default() -> Self {
        Self::new()
    }
}
