//! Resolved query plan and its SQL renderings.
//!
//! A plan is built from the base [`EntityQuery`] first. Counting renders the
//! plan at that point; ordering is appended afterwards, so ORDER BY never
//! reaches a count query.
//!
//! # Invariants
//! - The root table is always aliased `t0`; joins get `t1`, `t2`, ... in the
//!   order they are first needed.
//! - Each relation path is joined at most once.
//! - Joins added for ordering are LEFT joins and never change which entities
//!   qualify.
//! - A condition inner-joins a path unless the query left-joined it
//!   explicitly; then the join stays LEFT so `IS NULL` can match entities
//!   without a related row.

use super::filter::{CompareOp, EntityQuery, JoinKind};
use super::order::OrderClause;
use super::path::{resolve_field_path, resolve_relation_path, PathError, PathStep};
use super::sql::{qualified, quote, window_params, TranslatedQuery};
use crate::pagination::{SortDirection, Window};
use crate::repo::{RepoError, RepoResult};
use crate::schema::{EntityDescriptor, RelationKind, Schema};
use rusqlite::types::Value;

const ROOT_ALIAS: &str = "t0";

/// Why a join is needed. Decides the kind of a new join and whether an
/// existing one is upgraded to INNER.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JoinUse {
    Explicit(JoinKind),
    Filter,
    Order,
}

impl JoinUse {
    fn kind(self) -> JoinKind {
        match self {
            Self::Explicit(kind) => kind,
            Self::Filter => JoinKind::Inner,
            Self::Order => JoinKind::Left,
        }
    }
}

#[derive(Debug, Clone)]
struct PlannedJoin<'s> {
    path: String,
    alias: String,
    kind: JoinKind,
    to_many: bool,
    table: &'s str,
    parent_alias: String,
    parent_column: &'s str,
    column: &'s str,
}

#[derive(Debug, Clone)]
struct Predicate<'s> {
    alias: String,
    column: &'s str,
    op: CompareOp,
    value: Value,
}

#[derive(Debug, Clone)]
struct OrderTerm<'s> {
    alias: String,
    column: &'s str,
    direction: SortDirection,
    to_many: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct QueryPlan<'s> {
    root: &'s EntityDescriptor,
    joins: Vec<PlannedJoin<'s>>,
    predicates: Vec<Predicate<'s>>,
    order: Vec<OrderTerm<'s>>,
}

impl<'s> QueryPlan<'s> {
    /// Plan matching every row of `root`.
    pub(crate) fn all(root: &'s EntityDescriptor) -> Self {
        Self {
            root,
            joins: Vec::new(),
            predicates: Vec::new(),
            order: Vec::new(),
        }
    }

    /// Resolves joins and conditions of the base query.
    ///
    /// # Errors
    /// - `InvalidFilterField` when a join path or condition field does not
    ///   resolve against the schema.
    pub(crate) fn from_query(
        schema: &'s Schema,
        root: &'s EntityDescriptor,
        query: &EntityQuery,
    ) -> RepoResult<Self> {
        let mut plan = Self::all(root);

        for join in query.joins() {
            let steps =
                resolve_relation_path(schema, root, &join.path).map_err(filter_error)?;
            plan.ensure_joins(&steps, JoinUse::Explicit(join.kind));
        }

        for condition in query.conditions() {
            let path = resolve_field_path(schema, root, &condition.field).map_err(filter_error)?;
            let alias = plan.ensure_joins(&path.steps, JoinUse::Filter);
            plan.predicates.push(Predicate {
                alias,
                column: path.column,
                op: condition.op,
                value: condition.value.clone(),
            });
        }

        Ok(plan)
    }

    /// Appends ORDER BY terms. Must run after any count has been rendered.
    pub(crate) fn append_order(&mut self, clause: &OrderClause<'s>) {
        for term in clause.terms() {
            let alias = self.ensure_joins(&term.path.steps, JoinUse::Order);
            self.order.push(OrderTerm {
                alias,
                column: term.path.column,
                direction: term.direction,
                to_many: term.path.crosses_to_many(),
            });
        }
    }

    /// Joins every prefix of `steps` once and returns the alias of the last
    /// hop (`t0` when `steps` is empty). Only an explicit inner join
    /// upgrades an existing left join on the same path.
    fn ensure_joins(&mut self, steps: &[PathStep<'s>], usage: JoinUse) -> String {
        let kind = usage.kind();
        let mut parent_alias = ROOT_ALIAS.to_string();
        let mut path = String::new();

        for step in steps {
            if !path.is_empty() {
                path.push('.');
            }
            path.push_str(&step.relation.name);

            if let Some(existing) = self.joins.iter_mut().find(|join| join.path == path) {
                if usage == JoinUse::Explicit(JoinKind::Inner) {
                    existing.kind = JoinKind::Inner;
                }
                parent_alias = existing.alias.clone();
                continue;
            }

            let alias = format!("t{}", self.joins.len() + 1);
            let (parent_column, column) = match &step.relation.kind {
                RelationKind::ToOne { local_column } => {
                    (local_column.as_str(), step.target.primary_key_column())
                }
                RelationKind::ToMany { remote_column } => {
                    (step.source.primary_key_column(), remote_column.as_str())
                }
            };
            self.joins.push(PlannedJoin {
                path: path.clone(),
                alias: alias.clone(),
                kind,
                to_many: step.relation.is_to_many(),
                table: step.target.table(),
                parent_alias: parent_alias.clone(),
                parent_column,
                column,
            });
            parent_alias = alias;
        }

        parent_alias
    }

    fn fans_out(&self) -> bool {
        self.joins.iter().any(|join| join.to_many)
    }

    fn select_list(&self) -> String {
        self.root
            .select_columns()
            .into_iter()
            .map(|column| format!("{} AS {}", qualified(ROOT_ALIAS, column), quote(column)))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn from_clause(&self) -> String {
        let mut sql = format!("FROM {} AS {ROOT_ALIAS}", quote(self.root.table()));
        for join in &self.joins {
            let keyword = match join.kind {
                JoinKind::Inner => "INNER JOIN",
                JoinKind::Left => "LEFT JOIN",
            };
            sql.push_str(&format!(
                " {keyword} {} AS {} ON {} = {}",
                quote(join.table),
                join.alias,
                qualified(&join.alias, join.column),
                qualified(&join.parent_alias, join.parent_column),
            ));
        }
        sql
    }

    fn where_clause(&self, params: &mut Vec<Value>) -> String {
        if self.predicates.is_empty() {
            return String::new();
        }
        let terms = self
            .predicates
            .iter()
            .map(|predicate| {
                let target = qualified(&predicate.alias, predicate.column);
                if predicate.op.takes_value() {
                    params.push(predicate.value.clone());
                    format!("{target} {} ?", predicate.op.as_sql())
                } else {
                    format!("{target} {}", predicate.op.as_sql())
                }
            })
            .collect::<Vec<_>>();
        format!(" WHERE {}", terms.join(" AND "))
    }

    fn order_clause(&self, grouped: bool) -> String {
        if self.order.is_empty() {
            return String::new();
        }
        let terms = self
            .order
            .iter()
            .map(|term| {
                let target = qualified(&term.alias, term.column);
                let direction = term.direction.as_sql();
                match (grouped && term.to_many, term.direction) {
                    (true, SortDirection::Asc) => format!("MIN({target}) {direction}"),
                    (true, SortDirection::Desc) => format!("MAX({target}) {direction}"),
                    (false, _) => format!("{target} {direction}"),
                }
            })
            .collect::<Vec<_>>();
        format!(" ORDER BY {}", terms.join(", "))
    }

    /// Raw base form: root columns over joins and filters, no ordering, no
    /// de-duplication. Fan-out joins repeat root rows here.
    pub(crate) fn translate_base(&self) -> TranslatedQuery {
        let mut params = Vec::new();
        let where_sql = self.where_clause(&mut params);
        let sql = format!(
            "SELECT {} {}{where_sql}",
            self.select_list(),
            self.from_clause()
        );
        TranslatedQuery::new(sql, params)
    }

    /// `COUNT(DISTINCT pk)` composed into the plan's own FROM/WHERE.
    pub(crate) fn count_distinct(&self) -> TranslatedQuery {
        let mut params = Vec::new();
        let where_sql = self.where_clause(&mut params);
        let sql = format!(
            "SELECT COUNT(DISTINCT {}) {}{where_sql}",
            qualified(ROOT_ALIAS, self.root.primary_key_column()),
            self.from_clause()
        );
        TranslatedQuery::new(sql, params)
    }

    /// Counts distinct keys over the raw base form wrapped as a subquery.
    pub(crate) fn count_distinct_wrapped(&self) -> TranslatedQuery {
        let base = self.translate_base();
        let sql = format!(
            "SELECT COUNT(DISTINCT {}) FROM ({}) AS subquery",
            quote(self.root.primary_key_column()),
            base.sql
        );
        TranslatedQuery::new(sql, base.params)
    }

    /// One page of distinct root rows, ordered, with `LIMIT ? OFFSET ?`.
    pub(crate) fn select_window(&self, window: Window) -> TranslatedQuery {
        let mut params = Vec::new();
        let where_sql = self.where_clause(&mut params);
        let grouped = self.fans_out();
        let group_sql = if grouped {
            format!(
                " GROUP BY {}",
                qualified(ROOT_ALIAS, self.root.primary_key_column())
            )
        } else {
            String::new()
        };
        let sql = format!(
            "SELECT {} {}{where_sql}{group_sql}{} LIMIT ? OFFSET ?",
            self.select_list(),
            self.from_clause(),
            self.order_clause(grouped)
        );
        params.extend(window_params(window.limit, window.offset));
        TranslatedQuery::new(sql, params)
    }

    /// Unordered full scan of the root table.
    pub(crate) fn select_all(&self) -> TranslatedQuery {
        TranslatedQuery::new(
            format!("SELECT {} {}", self.select_list(), self.from_clause()),
            Vec::new(),
        )
    }

    /// Point lookup by primary key.
    pub(crate) fn select_by_key(&self, key: Value) -> TranslatedQuery {
        let sql = format!(
            "SELECT {} FROM {} AS {ROOT_ALIAS} WHERE {} = ?",
            self.select_list(),
            quote(self.root.table()),
            qualified(ROOT_ALIAS, self.root.primary_key_column())
        );
        TranslatedQuery::new(sql, vec![key])
    }

    /// Plain row count of the root table.
    pub(crate) fn count_rows(&self) -> TranslatedQuery {
        TranslatedQuery::new(
            format!("SELECT COUNT(*) FROM {}", quote(self.root.table())),
            Vec::new(),
        )
    }
}

fn filter_error(err: PathError) -> RepoError {
    RepoError::InvalidFilterField {
        field: err.path,
        reason: err.reason,
    }
}
