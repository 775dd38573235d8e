//! Statement builders
//!
//! Identifiers only enter SQL text through [`Ident::quoted`] and string
//! literals through [`Ident::literal`] / [`string_literal`]. Column positions
//! of `SHOW` output are those of Snowflake: the object name is column 1
//! (0-based).

use deploysure_core::{string_literal, Ident, SchemaPath, TablePath};

/// Columns of the test case catalog, in the order they are selected
pub const TEST_CASE_COLUMNS: [&str; 6] = [
    "TEST_CASE_ID",
    "TEST_ABBREVIATION",
    "TABLE_NAME",
    "TEST_DESCRIPTION",
    "SQL_CODE",
    "EXPECTED_RESULT",
];

/// Columns of the KPI catalog, in the order they are selected
pub const KPI_COLUMNS: [&str; 3] = ["KPI_ID", "KPI_NAME", "KPI_VALUE"];

pub fn show_databases() -> String {
    "SHOW DATABASES".to_string()
}

pub fn show_schemas(database: &Ident) -> String {
    format!("SHOW SCHEMAS IN DATABASE {}", database.quoted())
}

/// `SHOW SCHEMAS LIKE` narrowed to one name
///
/// `LIKE` is a case-insensitive pattern, so callers still compare the
/// returned names exactly.
pub fn show_schemas_like(schema: &SchemaPath) -> String {
    format!(
        "SHOW SCHEMAS LIKE {} IN DATABASE {}",
        schema.schema.literal(),
        schema.database.quoted()
    )
}

pub fn show_tables(schema: &SchemaPath) -> String {
    format!("SHOW TABLES IN SCHEMA {}", schema.fqn())
}

/// Column names and data types of a table, in ordinal order
pub fn table_columns(table: &TablePath) -> String {
    format!(
        r#"
        SELECT COLUMN_NAME, DATA_TYPE
        FROM {}.INFORMATION_SCHEMA.COLUMNS
        WHERE TABLE_SCHEMA = {} AND TABLE_NAME = {}
        ORDER BY ORDINAL_POSITION
        "#,
        table.database.quoted(),
        table.schema.literal(),
        table.table.literal()
    )
}

/// Zero-copy clone of a whole schema
pub fn clone_schema(source: &SchemaPath, target: &SchemaPath) -> String {
    format!(
        "CREATE OR REPLACE SCHEMA {} CLONE {}",
        target.fqn(),
        source.fqn()
    )
}

/// Tables present in exactly one of two schemas of the same database
pub fn table_differences(database: &Ident, source: &Ident, clone: &Ident) -> String {
    format!(
        r#"
        WITH source_tables AS (
            SELECT table_name FROM {db}.INFORMATION_SCHEMA.TABLES
            WHERE table_schema = {source}
        ),
        clone_tables AS (
            SELECT table_name FROM {db}.INFORMATION_SCHEMA.TABLES
            WHERE table_schema = {clone}
        )
        SELECT
            COALESCE(s.table_name, c.table_name) AS table_name,
            CASE
                WHEN s.table_name IS NULL THEN 'Missing in source'
                WHEN c.table_name IS NULL THEN 'Missing in clone'
                ELSE 'Present in both'
            END AS difference
        FROM source_tables s
        FULL OUTER JOIN clone_tables c ON s.table_name = c.table_name
        WHERE s.table_name IS NULL OR c.table_name IS NULL
        ORDER BY difference, table_name
        "#,
        db = database.quoted(),
        source = source.literal(),
        clone = clone.literal(),
    )
}

/// Tables present in both schemas
pub fn common_tables(database: &Ident, source: &Ident, clone: &Ident) -> String {
    format!(
        r#"
        SELECT s.table_name
        FROM {db}.INFORMATION_SCHEMA.TABLES s
        JOIN {db}.INFORMATION_SCHEMA.TABLES c ON s.table_name = c.table_name
        WHERE s.table_schema = {source} AND c.table_schema = {clone}
        ORDER BY s.table_name
        "#,
        db = database.quoted(),
        source = source.literal(),
        clone = clone.literal(),
    )
}

pub fn describe_table(table: &TablePath) -> String {
    format!("DESCRIBE TABLE {}", table.fqn())
}

pub fn count_rows(table: &TablePath) -> String {
    format!("SELECT COUNT(*) FROM {}", table.fqn())
}

/// Number of full-row groups with more than one member
pub fn duplicate_row_groups(table: &TablePath, columns: &[Ident]) -> String {
    let cols = columns
        .iter()
        .map(Ident::quoted)
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"
        SELECT COUNT(*) FROM (
            SELECT {cols} FROM {table}
            GROUP BY {cols} HAVING COUNT(*) > 1
        )
        "#,
        cols = cols,
        table = table.fqn(),
    )
}

/// Whether a table exists, as a count
pub fn table_exists(table: &TablePath) -> String {
    format!(
        r#"
        SELECT COUNT(*) FROM {}.INFORMATION_SCHEMA.TABLES
        WHERE TABLE_SCHEMA = {} AND TABLE_NAME = {}
        "#,
        table.database.quoted(),
        table.schema.literal(),
        table.table.literal()
    )
}

/// Distinct target tables named by the test case catalog
pub fn test_case_categories(catalog: &TablePath) -> String {
    format!(
        r#"
        SELECT DISTINCT TABLE_NAME FROM {}
        WHERE TABLE_NAME IS NOT NULL ORDER BY TABLE_NAME
        "#,
        catalog.fqn()
    )
}

/// Test cases, optionally restricted to one target table
pub fn test_cases(catalog: &TablePath, table_name: Option<&str>) -> String {
    let filter = match table_name {
        Some(name) => format!("WHERE TABLE_NAME = {} ", string_literal(name)),
        None => String::new(),
    };

    format!(
        "SELECT {} FROM {} {}ORDER BY TEST_CASE_ID",
        TEST_CASE_COLUMNS.join(", "),
        catalog.fqn(),
        filter
    )
}

pub fn kpi_definitions(catalog: &TablePath) -> String {
    format!(
        "SELECT {} FROM {} ORDER BY KPI_ID",
        KPI_COLUMNS.join(", "),
        catalog.fqn()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ident(name: &str) -> Ident {
        Ident::new(name).unwrap()
    }

    fn schema() -> SchemaPath {
        SchemaPath::new(ident("SALES"), ident("PUBLIC"))
    }

    #[test]
    fn show_statements_quote_identifiers() {
        assert_eq!(show_schemas(&ident("SALES")), "SHOW SCHEMAS IN DATABASE \"SALES\"");
        assert_eq!(show_tables(&schema()), "SHOW TABLES IN SCHEMA \"SALES\".\"PUBLIC\"");
        assert_eq!(
            show_schemas_like(&schema()),
            "SHOW SCHEMAS LIKE 'PUBLIC' IN DATABASE \"SALES\""
        );
    }

    #[test]
    fn clone_statement() {
        let target = schema().sibling(ident("PUBLIC_CLONE"));
        assert_eq!(
            clone_schema(&schema(), &target),
            "CREATE OR REPLACE SCHEMA \"SALES\".\"PUBLIC_CLONE\" CLONE \"SALES\".\"PUBLIC\""
        );
    }

    #[test]
    fn hostile_names_stay_inside_quotes() {
        let table = schema().table(ident("x\" ; DROP TABLE y; --"));
        assert_eq!(
            count_rows(&table),
            "SELECT COUNT(*) FROM \"SALES\".\"PUBLIC\".\"x\"\" ; DROP TABLE y; --\""
        );

        let hostile = SchemaPath::new(ident("SALES"), ident("a' OR '1'='1"));
        let sql = table_differences(&hostile.database, &hostile.schema, &ident("B"));
        assert!(sql.contains("table_schema = 'a'' OR ''1''=''1'"));
    }

    #[test]
    fn duplicate_query_groups_every_column() {
        let table = schema().table(ident("ORDERS"));
        let sql = duplicate_row_groups(&table, &[ident("ID"), ident("Amount")]);
        assert!(sql.contains("SELECT \"ID\", \"Amount\" FROM \"SALES\".\"PUBLIC\".\"ORDERS\""));
        assert!(sql.contains("GROUP BY \"ID\", \"Amount\" HAVING COUNT(*) > 1"));
    }

    #[test]
    fn test_case_filter() {
        let catalog = schema().table(ident("TEST_CASES"));
        assert_eq!(
            test_cases(&catalog, None),
            "SELECT TEST_CASE_ID, TEST_ABBREVIATION, TABLE_NAME, TEST_DESCRIPTION, SQL_CODE, EXPECTED_RESULT \
             FROM \"SALES\".\"PUBLIC\".\"TEST_CASES\" ORDER BY TEST_CASE_ID"
        );
        assert!(test_cases(&catalog, Some("ORDERS"))
            .ends_with("WHERE TABLE_NAME = 'ORDERS' ORDER BY TEST_CASE_ID"));
    }

    #[test]
    fn information_schema_uses_literals() {
        let table = schema().table(ident("ORDERS"));
        let sql = table_columns(&table);
        assert!(sql.contains("FROM \"SALES\".INFORMATION_SCHEMA.COLUMNS"));
        assert!(sql.contains("WHERE TABLE_SCHEMA = 'PUBLIC' AND TABLE_NAME = 'ORDERS'"));
    }
}
