//! Raw SQL text plus bound parameters.

use rusqlite::types::Value;
use std::fmt::{Display, Formatter};

/// A query translated to the store's executable form.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatedQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

impl TranslatedQuery {
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

impl Display for TranslatedQuery {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -- params={}", self.sql, self.params.len())
    }
}

/// Quotes an identifier for SQLite, doubling embedded quotes.
pub(crate) fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// `alias."column"`
pub(crate) fn qualified(alias: &str, column: &str) -> String {
    format!("{alias}.{}", quote(column))
}

/// Binds window bounds as SQLite integers. Offsets past `i64::MAX` saturate,
/// which still selects no rows.
pub(crate) fn window_params(limit: u64, offset: u64) -> [Value; 2] {
    [
        Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)),
        Value::Integer(i64::try_from(offset).unwrap_or(i64::MAX)),
    ]
}
