//! Composable base query: which entities qualify, before sort and window.

use rusqlite::types::Value;

/// Comparison applied by a [`Condition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Like,
    IsNull,
    IsNotNull,
}

impl CompareOp {
    pub(crate) fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::Like => "LIKE",
            Self::IsNull => "IS NULL",
            Self::IsNotNull => "IS NOT NULL",
        }
    }

    pub(crate) fn takes_value(self) -> bool {
        !matches!(self, Self::IsNull | Self::IsNotNull)
    }
}

/// One predicate on a dotted field path. All conditions of a query are AND-ed.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub op: CompareOp,
    pub value: Value,
}

impl Condition {
    pub fn new(field: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, CompareOp::Eq, value)
    }

    pub fn not_eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, CompareOp::NotEq, value)
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, CompareOp::Lt, value)
    }

    pub fn lt_eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, CompareOp::LtEq, value)
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, CompareOp::Gt, value)
    }

    pub fn gt_eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, CompareOp::GtEq, value)
    }

    pub fn like(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::new(field, CompareOp::Like, Value::Text(pattern.into()))
    }

    pub fn is_null(field: impl Into<String>) -> Self {
        Self::new(field, CompareOp::IsNull, Value::Null)
    }

    pub fn is_not_null(field: impl Into<String>) -> Self {
        Self::new(field, CompareOp::IsNotNull, Value::Null)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

/// Explicitly requested relation join, e.g. `pets` or `address.country`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRequest {
    pub path: String,
    pub kind: JoinKind,
}

/// Unordered, unwindowed query over the repository's root entity.
///
/// A condition on a relation path (`pets.species`) inner-joins that path,
/// unless the path was requested with [`EntityQuery::left_join`].
/// Joins through to-many relations can yield several rows per entity; the
/// engine still counts and pages distinct entities.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityQuery {
    joins: Vec<JoinRequest>,
    conditions: Vec<Condition>,
}

impl EntityQuery {
    /// Matches every row of the root entity.
    pub fn all() -> Self {
        Self::default()
    }

    /// Inner-joins a relation path; entities without a match drop out.
    pub fn join(mut self, path: impl Into<String>) -> Self {
        self.joins.push(JoinRequest {
            path: path.into(),
            kind: JoinKind::Inner,
        });
        self
    }

    /// Left-joins a relation path; entities without a match stay in.
    ///
    /// Conditions on this path keep the join LEFT, so
    /// `left_join("pets").filter(Condition::is_null("pets.species"))` matches
    /// entities that have no pets.
    pub fn left_join(mut self, path: impl Into<String>) -> Self {
        self.joins.push(JoinRequest {
            path: path.into(),
            kind: JoinKind::Left,
        });
        self
    }

    pub fn filter(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn joins(&self) -> &[JoinRequest] {
        &self.joins
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }
}
