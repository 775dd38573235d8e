//! Warehouse trait: the query/execute boundary

use deploysure_core::Value;
use std::fmt;

/// Rows returned by one statement
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    /// Column names, as reported by the warehouse
    pub columns: Vec<String>,

    /// Rows of cells
    pub rows: Vec<Vec<Value>>,
}

impl QueryResult {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    /// A statement that returned nothing
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First column of the first row
    pub fn first_value(&self) -> Option<&Value> {
        self.rows.first().and_then(|row| row.first())
    }

    /// Text of one column across all rows, skipping NULLs and short rows
    pub fn column_text(&self, idx: usize) -> Vec<String> {
        self.rows
            .iter()
            .filter_map(|row| row.get(idx))
            .filter(|value| !value.is_null())
            .map(Value::to_string)
            .collect()
    }
}

/// Login credentials, supplied per session and never persisted
#[derive(Clone)]
pub struct Credentials {
    pub account: String,
    pub user: String,
    password: String,
}

impl Credentials {
    /// Password login; all three fields are required
    pub fn new(
        account: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, WarehouseError> {
        let credentials = Self {
            account: account.into().trim().to_string(),
            user: user.into().trim().to_string(),
            password: password.into(),
        };

        credentials.require(&[
            ("account", &credentials.account),
            ("user", &credentials.user),
            ("password", &credentials.password),
        ])?;
        Ok(credentials)
    }

    /// Key-pair login; the private key is given to the session builder
    pub fn key_pair(account: impl Into<String>, user: impl Into<String>) -> Result<Self, WarehouseError> {
        let credentials = Self {
            account: account.into().trim().to_string(),
            user: user.into().trim().to_string(),
            password: String::new(),
        };

        credentials.require(&[("account", &credentials.account), ("user", &credentials.user)])?;
        Ok(credentials)
    }

    fn require(&self, fields: &[(&str, &String)]) -> Result<(), WarehouseError> {
        match fields.iter().find(|(_, value)| value.is_empty()) {
            Some((field, _)) => Err(WarehouseError::ConfigError(format!("Missing {}", field))),
            None => Ok(()),
        }
    }

    /// Empty for key-pair credentials
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("account", &self.account)
            .field("user", &self.user)
            .field("password", &"********")
            .finish()
    }
}

/// Errors surfaced by the warehouse
///
/// Messages are the warehouse's own text; callers surface them verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WarehouseError {
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Query failed: {0}")]
    QueryError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl WarehouseError {
    /// The message without the category prefix
    pub fn message(&self) -> &str {
        match self {
            WarehouseError::AuthenticationError(msg)
            | WarehouseError::QueryError(msg)
            | WarehouseError::InvalidResponse(msg)
            | WarehouseError::NetworkError(msg)
            | WarehouseError::ConfigError(msg) => msg,
        }
    }
}

/// A live warehouse session
///
/// Implementations are used by one operation at a time; a session is not
/// shared between concurrent callers.
#[async_trait::async_trait]
pub trait Warehouse: Send + Sync {
    /// Get the warehouse name (e.g., "Snowflake")
    fn name(&self) -> &'static str;

    /// Run one statement and collect its rows
    async fn query(&self, sql: &str) -> Result<QueryResult, WarehouseError>;

    /// Check the session is usable
    ///
    /// Called once before any other operation; this is the only failure
    /// that blocks the operator.
    async fn test_connection(&self) -> Result<(), WarehouseError>;

    /// End the session
    async fn close(&mut self) -> Result<(), WarehouseError>;
}
