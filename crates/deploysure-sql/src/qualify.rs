//! Qualification of table references inside stored SQL
//!
//! Test cases and KPI templates are stored with a bare table name
//! (`SELECT COUNT(*) FROM ORDERS`). Before execution every reference to that
//! table is prefixed with the database and schema under test.
//!
//! The rewrite works on tokens, not on raw text: string literals, quoted
//! strings and comments are separate tokens and are never touched, and a
//! name only matches a whole identifier token. The tokenizer runs without
//! unescaping so untouched tokens render back to their original text.

use deploysure_core::SchemaPath;
use sqlparser::dialect::SnowflakeDialect;
use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::{Token, Tokenizer, Word};

/// Errors raised while rewriting SQL
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RewriteError {
    #[error("Cannot tokenize SQL: {0}")]
    Tokenize(String),
}

/// Prefix every reference to `table_name` with `schema`
///
/// - unquoted identifiers match case-insensitively, quoted ones exactly
/// - an identifier that follows a `.` is already qualified and is kept
/// - an identifier after `AS` is an alias and one after `:` a path element;
///   neither is a table reference
/// - the matched token is kept as written, so warehouse case folding of an
///   unquoted name still applies
pub fn qualify_table(sql: &str, table_name: &str, schema: &SchemaPath) -> Result<String, RewriteError> {
    let dialect = SnowflakeDialect {};
    let tokens = Tokenizer::new(&dialect, sql)
        .with_unescape(false)
        .tokenize()
        .map_err(|e| RewriteError::Tokenize(e.to_string()))?;

    let prefix = schema.fqn();
    let mut rewritten = String::with_capacity(sql.len() + prefix.len());
    let mut previous: Option<&Token> = None;

    for token in &tokens {
        let reference = !matches!(previous, Some(Token::Period | Token::Colon))
            && !matches!(previous, Some(Token::Word(w)) if w.keyword == Keyword::AS);

        match token {
            Token::Word(word) if reference && refers_to(word, table_name) => {
                rewritten.push_str(&prefix);
                rewritten.push('.');
                rewritten.push_str(&token.to_string());
            }
            _ => rewritten.push_str(&token.to_string()),
        }

        if !matches!(token, Token::Whitespace(_)) {
            previous = Some(token);
        }
    }

    Ok(rewritten)
}

fn refers_to(word: &Word, table_name: &str) -> bool {
    match word.quote_style {
        None => word.value.eq_ignore_ascii_case(table_name),
        Some('"') => word.value == table_name,
        Some(_) => false,
    }
}
