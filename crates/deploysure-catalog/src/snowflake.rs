//! Snowflake warehouse session
//!
//! Statements are sent through `snowflake-api`. Query results arrive either
//! as Arrow record batches (SELECT) or as a JSON rowset (SHOW / DESCRIBE);
//! both are converted into [`QueryResult`] rows of [`Value`]s.
//!
//! Fixed-point columns keep their scale: an Arrow integer column carrying a
//! `scale` metadata entry becomes a [`Value::Decimal`], so a `NUMBER(10,2)`
//! KPI compares exactly.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let credentials = Credentials::new("xy12345.us-east-1", "ANALYST", password)?;
//! let warehouse = SnowflakeWarehouse::builder(credentials)
//!     .with_warehouse("COMPUTE_WH")
//!     .with_role("ANALYST")
//!     .build()?;
//! warehouse.test_connection().await?;
//! ```

use crate::warehouse::{Credentials, QueryResult, Warehouse, WarehouseError};
use deploysure_core::Value;

#[cfg(feature = "snowflake")]
use snowflake_api::SnowflakeApi;

#[cfg(not(feature = "snowflake"))]
const NOT_COMPILED: &str =
    "Snowflake support not compiled. Rebuild with: cargo build --features snowflake";

/// Builder for [`SnowflakeWarehouse`]
///
/// Without the `snowflake` feature the settings are collected but `build`
/// always fails.
#[cfg_attr(not(feature = "snowflake"), allow(dead_code))]
pub struct SnowflakeWarehouseBuilder {
    credentials: Credentials,
    private_key_pem: Option<String>,
    warehouse: Option<String>,
    role: Option<String>,
}

impl SnowflakeWarehouseBuilder {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            private_key_pem: None,
            warehouse: None,
            role: None,
        }
    }

    /// Set the virtual warehouse to use
    pub fn with_warehouse(mut self, warehouse: impl Into<String>) -> Self {
        self.warehouse = Some(warehouse.into());
        self
    }

    /// Set the role to use
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Authenticate with a PEM private key instead of the password
    pub fn with_private_key(mut self, private_key_pem: impl Into<String>) -> Self {
        self.private_key_pem = Some(private_key_pem.into());
        self
    }

    /// Build the session
    #[cfg(feature = "snowflake")]
    pub fn build(self) -> Result<SnowflakeWarehouse, WarehouseError> {
        let credentials = &self.credentials;

        // No default database: every statement is fully qualified
        let api = match &self.private_key_pem {
            None if credentials.password().is_empty() => {
                return Err(WarehouseError::ConfigError("Missing password".to_string()));
            }
            None => SnowflakeApi::with_password_auth(
                &credentials.account,
                self.warehouse.as_deref(),
                None,
                None,
                &credentials.user,
                self.role.as_deref(),
                credentials.password(),
            )
            .map_err(|e| WarehouseError::AuthenticationError(format!(
                "Failed to authenticate with Snowflake: {}",
                e
            )))?,
            Some(private_key_pem) => SnowflakeApi::with_certificate_auth(
                &credentials.account,
                self.warehouse.as_deref(),
                None,
                None,
                &credentials.user,
                self.role.as_deref(),
                private_key_pem,
            )
            .map_err(|e| WarehouseError::AuthenticationError(format!(
                "Failed to authenticate with key-pair: {}",
                e
            )))?,
        };

        tracing::debug!(account = %credentials.account, user = %credentials.user, "Snowflake session created");

        Ok(SnowflakeWarehouse {
            api: Some(api),
            account: self.credentials.account,
        })
    }

    /// Build without snowflake feature
    #[cfg(not(feature = "snowflake"))]
    pub fn build(self) -> Result<SnowflakeWarehouse, WarehouseError> {
        Err(WarehouseError::ConfigError(NOT_COMPILED.to_string()))
    }
}

/// Snowflake warehouse session
pub struct SnowflakeWarehouse {
    #[cfg(feature = "snowflake")]
    api: Option<SnowflakeApi>,

    account: String,
}

impl SnowflakeWarehouse {
    /// Builder pattern entry point
    pub fn builder(credentials: Credentials) -> SnowflakeWarehouseBuilder {
        SnowflakeWarehouseBuilder::new(credentials)
    }

    /// Account this session is logged into
    pub fn account(&self) -> &str {
        &self.account
    }

    #[cfg(feature = "snowflake")]
    fn api(&self) -> Result<&SnowflakeApi, WarehouseError> {
        self.api
            .as_ref()
            .ok_or_else(|| WarehouseError::ConfigError("Session is closed".to_string()))
    }
}

#[async_trait::async_trait]
impl Warehouse for SnowflakeWarehouse {
    fn name(&self) -> &'static str {
        "Snowflake"
    }

    #[cfg(feature = "snowflake")]
    async fn query(&self, sql: &str) -> Result<QueryResult, WarehouseError> {
        use snowflake_api::QueryResult as RawResult;

        tracing::debug!(sql = %sql.trim(), "Executing statement");

        let result = self
            .api()?
            .exec(sql)
            .await
            .map_err(|e| WarehouseError::QueryError(e.to_string()))?;

        match result {
            RawResult::Arrow(batches) => Ok(arrow_rows::collect(&batches)),
            RawResult::Json(json) => {
                let columns = json.schema.iter().map(|field| field.name.clone()).collect();
                let scales: Vec<Option<i64>> = json.schema.iter().map(|field| field.scale).collect();
                json_rows(columns, &scales, &json.value)
            }
            RawResult::Empty => Ok(QueryResult::empty()),
        }
    }

    #[cfg(not(feature = "snowflake"))]
    async fn query(&self, _sql: &str) -> Result<QueryResult, WarehouseError> {
        Err(WarehouseError::ConfigError(NOT_COMPILED.to_string()))
    }

    #[cfg(feature = "snowflake")]
    async fn test_connection(&self) -> Result<(), WarehouseError> {
        self.api()?
            .exec("SELECT 1")
            .await
            .map_err(|e| WarehouseError::AuthenticationError(format!("Connection test failed: {}", e)))?;
        Ok(())
    }

    #[cfg(not(feature = "snowflake"))]
    async fn test_connection(&self) -> Result<(), WarehouseError> {
        Err(WarehouseError::ConfigError(NOT_COMPILED.to_string()))
    }

    #[cfg(feature = "snowflake")]
    async fn close(&mut self) -> Result<(), WarehouseError> {
        if let Some(mut api) = self.api.take() {
            api.close_session()
                .await
                .map_err(|e| WarehouseError::NetworkError(e.to_string()))?;
            tracing::debug!(account = %self.account, "Snowflake session closed");
        }
        Ok(())
    }

    #[cfg(not(feature = "snowflake"))]
    async fn close(&mut self) -> Result<(), WarehouseError> {
        Ok(())
    }
}

/// Convert a JSON rowset
///
/// Every cell arrives as text or null. Columns with a scale are fixed-point
/// numbers; everything else stays text.
#[cfg(any(feature = "snowflake", test))]
pub(crate) fn json_rows(
    columns: Vec<String>,
    scales: &[Option<i64>],
    rowset: &serde_json::Value,
) -> Result<QueryResult, WarehouseError> {
    let rows = rowset
        .as_array()
        .ok_or_else(|| WarehouseError::InvalidResponse("Rowset is not an array".to_string()))?;

    let mut result = QueryResult::new(columns, Vec::with_capacity(rows.len()));

    for row in rows {
        let cells = row
            .as_array()
            .ok_or_else(|| WarehouseError::InvalidResponse("Row is not an array".to_string()))?;

        let values = cells
            .iter()
            .enumerate()
            .map(|(idx, cell)| json_cell(cell, scales.get(idx).copied().flatten()))
            .collect();

        result.rows.push(values);
    }

    Ok(result)
}

#[cfg(any(feature = "snowflake", test))]
fn json_cell(cell: &serde_json::Value, scale: Option<i64>) -> Value {
    use serde_json::Value as Json;

    match cell {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => n.as_f64().map(Value::Float).unwrap_or_else(|| Value::Text(n.to_string())),
        },
        Json::String(text) => match scale {
            Some(0) => text
                .parse::<i64>()
                .map(Value::Int)
                .ok()
                .or_else(|| Value::parse_decimal(text))
                .unwrap_or_else(|| Value::Text(text.clone())),
            Some(_) => Value::parse_decimal(text).unwrap_or_else(|| Value::Text(text.clone())),
            None => Value::Text(text.clone()),
        },
        other => Value::Text(other.to_string()),
    }
}

#[cfg(feature = "snowflake")]
mod arrow_rows {
    use super::*;
    use arrow_array::cast::AsArray;
    use arrow_array::types::{
        Date32Type, Decimal128Type, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type,
        Int8Type,
    };
    use arrow_array::{Array, ArrayRef, RecordBatch};
    use arrow_schema::{DataType, Field};

    const NANOS_DIGITS: u32 = 9;

    pub(super) fn collect(batches: &[RecordBatch]) -> QueryResult {
        let Some(first) = batches.first() else {
            return QueryResult::empty();
        };

        let columns = first
            .schema()
            .fields()
            .iter()
            .map(|field| field.name().clone())
            .collect();

        let mut result = QueryResult::new(columns, Vec::new());

        for batch in batches {
            let schema = batch.schema();
            for row in 0..batch.num_rows() {
                let values = batch
                    .columns()
                    .iter()
                    .zip(schema.fields().iter())
                    .map(|(array, field)| cell(array, field, row))
                    .collect();
                result.rows.push(values);
            }
        }

        result
    }

    fn cell(array: &ArrayRef, field: &Field, row: usize) -> Value {
        if array.is_null(row) {
            return Value::Null;
        }

        match array.data_type() {
            DataType::Boolean => Value::Bool(array.as_boolean().value(row)),
            DataType::Int8 => fixed(array.as_primitive::<Int8Type>().value(row).into(), field),
            DataType::Int16 => fixed(array.as_primitive::<Int16Type>().value(row).into(), field),
            DataType::Int32 => fixed(array.as_primitive::<Int32Type>().value(row).into(), field),
            DataType::Int64 => fixed(array.as_primitive::<Int64Type>().value(row), field),
            DataType::Float32 => Value::Float(array.as_primitive::<Float32Type>().value(row).into()),
            DataType::Float64 => Value::Float(array.as_primitive::<Float64Type>().value(row)),
            DataType::Decimal128(_, scale) => Value::from_scaled(
                array.as_primitive::<Decimal128Type>().value(row),
                (*scale).max(0) as u32,
            ),
            DataType::Utf8 => Value::Text(array.as_string::<i32>().value(row).to_string()),
            DataType::LargeUtf8 => Value::Text(array.as_string::<i64>().value(row).to_string()),
            DataType::Date32 => {
                let days = array.as_primitive::<Date32Type>().value(row);
                chrono::NaiveDate::from_num_days_from_ce_opt(days + 719_163)
                    .map(|date| Value::Text(date.to_string()))
                    .unwrap_or(Value::Int(days.into()))
            }
            DataType::Struct(_) => {
                let parts = array.as_struct();
                let epoch = parts
                    .column_by_name("epoch")
                    .and_then(|col| col.as_primitive_opt::<Int64Type>())
                    .map(|col| col.value(row));
                let fraction = parts
                    .column_by_name("fraction")
                    .and_then(|col| col.as_primitive_opt::<Int32Type>())
                    .map(|col| col.value(row))
                    .unwrap_or(0);

                match epoch.and_then(|secs| timestamp(secs, fraction.max(0) as u32)) {
                    Some(text) => Value::Text(text),
                    None => Value::Text(format!("<{}>", array.data_type())),
                }
            }
            other => Value::Text(format!("<{}>", other)),
        }
    }

    /// Snowflake FIXED and scaled TIMESTAMP columns are plain integers
    fn fixed(unscaled: i64, field: &Field) -> Value {
        let metadata = field.metadata();
        let scale = metadata
            .get("scale")
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(0);

        let logical_type = metadata.get("logicalType").map(String::as_str).unwrap_or("FIXED");

        if logical_type.starts_with("TIMESTAMP") && scale <= NANOS_DIGITS {
            let unit = 10_i64.pow(scale);
            let secs = unscaled.div_euclid(unit);
            let nanos = unscaled.rem_euclid(unit) * 10_i64.pow(NANOS_DIGITS - scale);
            if let Some(text) = timestamp(secs, nanos as u32) {
                return Value::Text(text);
            }
        }

        if scale == 0 {
            Value::Int(unscaled)
        } else {
            Value::from_scaled(unscaled.into(), scale)
        }
    }

    fn timestamp(secs: i64, nanos: u32) -> Option<String> {
        chrono::DateTime::from_timestamp(secs, nanos).map(|at| at.naive_utc().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deploysure_core::Decimal;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn json_rowset_typed_by_scale() {
        let result = json_rows(
            vec!["name".into(), "rows".into(), "amount".into()],
            &[None, Some(0), Some(2)],
            &json!([["ORDERS", "42", "10.50"], [null, null, "x"]]),
        )
        .unwrap();

        assert_eq!(result.columns, vec!["name", "rows", "amount"]);
        assert_eq!(
            result.rows[0],
            vec![
                Value::from("ORDERS"),
                Value::Int(42),
                Value::Decimal(Decimal::new(1050, 2)),
            ]
        );
        assert_eq!(result.rows[1], vec![Value::Null, Value::Null, Value::from("x")]);
    }

    #[test]
    fn json_rowset_must_be_an_array() {
        let result = json_rows(vec![], &[], &json!({"rows": 1}));
        assert!(matches!(result, Err(WarehouseError::InvalidResponse(_))));
    }

    #[test]
    fn key_pair_login_without_a_key_is_rejected() {
        let credentials = Credentials::key_pair("acct", "user").unwrap();
        let built = SnowflakeWarehouse::builder(credentials).build();
        assert!(matches!(built, Err(WarehouseError::ConfigError(_))));
    }

    #[test]
    fn build_requires_feature() {
        let credentials = Credentials::new("acct", "user", "secret").unwrap();
        let built = SnowflakeWarehouse::builder(credentials)
            .with_warehouse("COMPUTE_WH")
            .build();

        if cfg!(feature = "snowflake") {
            assert!(built.is_ok());
        } else {
            assert!(matches!(built, Err(WarehouseError::ConfigError(_))));
        }
    }
}
