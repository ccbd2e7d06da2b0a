//! Caller-built executable queries.
//!
//! The engine treats the SQL as opaque: filtering and ordering are the
//! caller's, and so is the count. The engine only appends the window.

use crate::pagination::Window;
use crate::query::{window_params, TranslatedQuery};
use rusqlite::types::Value;

/// Source of the total count for a [`PrebuiltQuery`].
#[derive(Debug, Clone, PartialEq)]
pub enum PrebuiltCount {
    /// Counts the caller query's rows: `SELECT COUNT(*) FROM (<sql>) AS subquery`.
    ///
    /// The caller's ORDER BY stays inside the subquery. SQLite accepts that;
    /// use [`PrebuiltQuery::with_count_sql`] for a leaner count of ordered SQL.
    WrapRows,
    /// Caller-supplied count query returning one integer.
    Sql(TranslatedQuery),
    /// Count already known to the caller.
    Known(u64),
}

/// Executable query owned entirely by the caller.
///
/// `sql` must select the root entity's columns, may carry its own ORDER BY,
/// and must not carry LIMIT/OFFSET.
#[derive(Debug, Clone, PartialEq)]
pub struct PrebuiltQuery {
    query: TranslatedQuery,
    count: PrebuiltCount,
}

impl PrebuiltQuery {
    /// Wraps caller SQL; trailing whitespace and `;` are dropped.
    ///
    /// The count defaults to [`PrebuiltCount::WrapRows`], which wraps the SQL
    /// as given, ordering included. Ordered queries over large tables should
    /// supply an unordered count through [`PrebuiltQuery::with_count_sql`].
    pub fn new(sql: impl Into<String>) -> Self {
        let sql: String = sql.into();
        let trimmed = sql.trim_end().trim_end_matches(';').trim_end().to_string();
        Self {
            query: TranslatedQuery::new(trimmed, Vec::new()),
            count: PrebuiltCount::WrapRows,
        }
    }

    /// Binds the next positional parameter of the row query.
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.query.params.push(value.into());
        self
    }

    pub fn with_count_sql(mut self, sql: impl Into<String>, params: Vec<Value>) -> Self {
        self.count = PrebuiltCount::Sql(TranslatedQuery::new(sql, params));
        self
    }

    pub fn with_known_count(mut self, total_count: u64) -> Self {
        self.count = PrebuiltCount::Known(total_count);
        self
    }

    pub fn sql(&self) -> &str {
        &self.query.sql
    }

    pub fn params(&self) -> &[Value] {
        &self.query.params
    }

    pub fn count(&self) -> &PrebuiltCount {
        &self.count
    }

    /// Row query with `LIMIT ? OFFSET ?` appended.
    pub(crate) fn windowed(&self, window: Window) -> TranslatedQuery {
        let mut params = self.query.params.clone();
        params.extend(window_params(window.limit, window.offset));
        TranslatedQuery::new(format!("{} LIMIT ? OFFSET ?", self.query.sql), params)
    }

    /// Count for the `WrapRows` source: the caller query's row count.
    pub(crate) fn rows_count_query(&self) -> TranslatedQuery {
        TranslatedQuery::new(
            format!("SELECT COUNT(*) FROM ({}) AS subquery", self.query.sql),
            self.query.params.clone(),
        )
    }
}
