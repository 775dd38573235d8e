//! Validated identifiers and catalog paths
//!
//! Every database, schema, table and column name that ends up in SQL text is
//! an [`Ident`]. An `Ident` holds the exact stored name; it is rendered
//! double-quoted in identifier position and as an escaped string literal when
//! compared against `INFORMATION_SCHEMA` columns.

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Longest identifier Snowflake accepts
const MAX_IDENT_LEN: usize = 255;

/// Errors raised while validating identifiers
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentError {
    #[error("Identifier is empty")]
    Empty,

    #[error("Identifier is longer than {MAX_IDENT_LEN} characters: {0}")]
    TooLong(String),

    #[error("Identifier contains a control character: {0:?}")]
    ControlCharacter(String),

    #[error("Invalid identifier '{0}': use letters, digits, '_' and '$', or wrap the name in double quotes")]
    Disallowed(String),
}

fn bare_identifier() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_$]*$").expect("identifier pattern is valid")
    })
}

/// A single validated identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ident(pub(crate) String);

impl Ident {
    /// Wrap an exact stored name, as returned by the catalog
    pub fn new(name: impl Into<String>) -> Result<Self, IdentError> {
        let name = name.into();
        if name.is_empty() {
            return Err(IdentError::Empty);
        }
        if name.chars().count() > MAX_IDENT_LEN {
            return Err(IdentError::TooLong(name));
        }
        if name.chars().any(char::is_control) {
            return Err(IdentError::ControlCharacter(name));
        }
        Ok(Self(name))
    }

    /// Interpret a name typed by an operator
    ///
    /// `"Mixed Case"` keeps its exact spelling. A bare name must be a plain
    /// identifier and is folded to upper case, as the warehouse folds
    /// unquoted identifiers.
    pub fn from_user_input(raw: &str) -> Result<Self, IdentError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(IdentError::Empty);
        }

        if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
            let inner = &raw[1..raw.len() - 1];
            if inner.replace("\"\"", "").contains('"') {
                return Err(IdentError::Disallowed(raw.to_string()));
            }
            return Self::new(inner.replace("\"\"", "\""));
        }

        if !bare_identifier().is_match(raw) {
            return Err(IdentError::Disallowed(raw.to_string()));
        }

        Self::new(raw.to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Double-quoted identifier for SQL text
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0.replace('"', "\"\""))
    }

    /// Escaped string literal holding the exact name
    pub fn literal(&self) -> String {
        string_literal(&self.0)
    }

    /// Case-insensitive name comparison
    pub fn eq_ignore_case(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.quoted())
    }
}

/// Render text as a single-quoted SQL string literal
///
/// Snowflake string literals treat backslash as an escape character, so both
/// `'` and `\` are doubled.
pub fn string_literal(text: &str) -> String {
    format!("'{}'", text.replace('\\', "\\\\").replace('\'', "''"))
}

/// A schema inside a database
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaPath {
    pub database: Ident,
    pub schema: Ident,
}

impl SchemaPath {
    pub fn new(database: Ident, schema: Ident) -> Self {
        Self { database, schema }
    }

    /// Build from operator input (see [`Ident::from_user_input`])
    pub fn from_user_input(database: &str, schema: &str) -> Result<Self, IdentError> {
        Ok(Self::new(Ident::from_user_input(database)?, Ident::from_user_input(schema)?))
    }

    /// Quoted `database.schema`
    pub fn fqn(&self) -> String {
        format!("{}.{}", self.database.quoted(), self.schema.quoted())
    }

    /// A table inside this schema
    pub fn table(&self, table: Ident) -> TablePath {
        TablePath {
            database: self.database.clone(),
            schema: self.schema.clone(),
            table,
        }
    }

    /// Same database, another schema
    pub fn sibling(&self, schema: Ident) -> SchemaPath {
        SchemaPath::new(self.database.clone(), schema)
    }
}

impl fmt::Display for SchemaPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database.as_str(), self.schema.as_str())
    }
}

/// A table inside a schema
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TablePath {
    pub database: Ident,
    pub schema: Ident,
    pub table: Ident,
}

impl TablePath {
    pub fn new(database: Ident, schema: Ident, table: Ident) -> Self {
        Self { database, schema, table }
    }

    pub fn schema_path(&self) -> SchemaPath {
        SchemaPath::new(self.database.clone(), self.schema.clone())
    }

    /// Quoted `database.schema.table`
    pub fn fqn(&self) -> String {
        format!(
            "{}.{}.{}",
            self.database.quoted(),
            self.schema.quoted(),
            self.table.quoted()
        )
    }
}

impl fmt::Display for TablePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}",
            self.database.as_str(),
            self.schema.as_str(),
            self.table.as_str()
        )
    }
}
