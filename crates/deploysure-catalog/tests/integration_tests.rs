//! Integration tests for the warehouse boundary
//!
//! Tests requiring a live Snowflake account are marked with `#[ignore]`.
//!
//! ## Running Tests
//!
//! ```bash
//! # Run all non-ignored tests (no credentials required)
//! cargo test -p deploysure-catalog --test integration_tests
//!
//! # Run Snowflake integration tests
//! DEPLOYSURE_ACCOUNT=xy12345 \
//! DEPLOYSURE_USER=user \
//! DEPLOYSURE_PASSWORD=pass \
//! cargo test -p deploysure-catalog --features snowflake --test integration_tests -- --ignored
//! ```

mod fixtures;

use deploysure_catalog::{browser, Credentials, Warehouse, WarehouseError};
use deploysure_core::{CatalogNames, Ident, SchemaPath};
use pretty_assertions::assert_eq;

fn has_snowflake_credentials() -> bool {
    std::env::var("DEPLOYSURE_ACCOUNT").is_ok() && std::env::var("DEPLOYSURE_PASSWORD").is_ok()
}

// =============================================================================
// Catalog browsing against the mock
// =============================================================================

#[tokio::test]
async fn browse_down_to_columns() {
    let warehouse = fixtures::sales_catalog();

    let databases = browser::list_databases(&warehouse).await;
    assert_eq!(databases, vec!["SALES", "SNOWFLAKE_SAMPLE_DATA"]);

    let database = Ident::new(&databases[0]).unwrap();
    let schemas = browser::list_schemas(&warehouse, &database).await;
    assert!(schemas.contains(&"PUBLIC".to_string()));

    let schema = SchemaPath::new(database, Ident::new("PUBLIC").unwrap());
    let tables = browser::list_tables(&warehouse, &schema, &CatalogNames::default()).await;
    assert_eq!(tables, vec!["CUSTOMERS", "ORDER_DATA"]);

    let table = schema.table(Ident::new("ORDER_DATA").unwrap());
    let details = browser::column_details(&warehouse, &table).await;
    let categories = browser::categorize_columns(&details);
    assert_eq!(categories.numeric, vec!["ORDER_ID", "AMOUNT"]);
    assert_eq!(categories.date, vec!["ORDER_DATE"]);
    assert_eq!(categories.string, vec!["STATUS"]);
}

#[tokio::test]
async fn unknown_objects_browse_as_empty() {
    let warehouse = fixtures::sales_catalog();
    let schema = SchemaPath::from_user_input("SALES", "MISSING").unwrap();

    let tables = browser::list_tables(&warehouse, &schema, &CatalogNames::default()).await;
    assert!(tables.is_empty());
}

#[tokio::test]
async fn connection_failure_is_reported() {
    let warehouse = fixtures::sales_catalog().with_connection_failure();
    let result = warehouse.test_connection().await;
    assert!(matches!(result, Err(WarehouseError::AuthenticationError(_))));
}

// =============================================================================
// Live Snowflake tests (credentials required)
// =============================================================================

#[tokio::test]
#[ignore] // Run with: cargo test --features snowflake -- --ignored
async fn test_snowflake_connection() {
    if !has_snowflake_credentials() {
        eprintln!("Skipping Snowflake test: no credentials available");
        eprintln!("Set DEPLOYSURE_ACCOUNT, DEPLOYSURE_USER, and DEPLOYSURE_PASSWORD");
        return;
    }

    #[cfg(feature = "snowflake")]
    {
        use deploysure_catalog::SnowflakeWarehouse;

        let credentials = Credentials::new(
            std::env::var("DEPLOYSURE_ACCOUNT").unwrap_or_default(),
            std::env::var("DEPLOYSURE_USER").unwrap_or_default(),
            std::env::var("DEPLOYSURE_PASSWORD").unwrap_or_default(),
        )
        .expect("DEPLOYSURE_ACCOUNT, DEPLOYSURE_USER and DEPLOYSURE_PASSWORD must be set");

        let mut builder = SnowflakeWarehouse::builder(credentials);
        if let Ok(warehouse) = std::env::var("DEPLOYSURE_WAREHOUSE") {
            builder = builder.with_warehouse(warehouse);
        }
        if let Ok(role) = std::env::var("DEPLOYSURE_ROLE") {
            builder = builder.with_role(role);
        }

        let mut warehouse = builder.build().expect("Failed to create Snowflake session");
        warehouse.test_connection().await.expect("Connection test failed");

        let databases = browser::list_databases(&warehouse).await;
        println!("Snowflake connection successful, {} databases visible", databases.len());

        warehouse.close().await.expect("Failed to close session");
    }

    #[cfg(not(feature = "snowflake"))]
    {
        let _ = Credentials::new("unused", "unused", "unused");
        eprintln!("Snowflake feature not enabled. Rebuild with --features snowflake");
    }
}
