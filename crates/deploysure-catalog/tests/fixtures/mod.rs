//! Scripted catalog of a small SALES database

use deploysure_catalog::{MockWarehouse, MockWarehouseBuilder};
use deploysure_core::Value;

pub fn sales_catalog() -> MockWarehouse {
    MockWarehouseBuilder::new()
        .with_show_result("SHOW DATABASES", &["SALES", "SNOWFLAKE_SAMPLE_DATA"])
        .with_show_result("SHOW SCHEMAS IN DATABASE \"SALES\"", &["INFORMATION_SCHEMA", "PUBLIC", "PUBLIC_CLONE"])
        .with_show_result(
            "SHOW TABLES IN SCHEMA \"SALES\".\"PUBLIC\"",
            &["CUSTOMERS", "ORDER_DATA", "ORDER_KPIS", "TEST_CASES"],
        )
        .with_rows(
            "TABLE_SCHEMA = 'PUBLIC' AND TABLE_NAME = 'ORDER_DATA'",
            &["COLUMN_NAME", "DATA_TYPE"],
            vec![
                vec![Value::from("ORDER_ID"), Value::from("NUMBER")],
                vec![Value::from("ORDER_DATE"), Value::from("DATE")],
                vec![Value::from("STATUS"), Value::from("TEXT")],
                vec![Value::from("AMOUNT"), Value::from("FLOAT")],
            ],
        )
        .build()
}
