//! Distinct entity counting.
//!
//! Joins through to-many relations repeat root rows, so counting rows of the
//! base query would over-report. Both strategies count distinct primary keys
//! of the root entity over the unordered base plan.

use super::plan::QueryPlan;
use super::sql::TranslatedQuery;

/// How the distinct count query is produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CountStrategy {
    /// `COUNT(DISTINCT t0.pk)` over the plan's own joins and filters.
    #[default]
    Native,
    /// Translates the base plan to raw SQL and wraps it:
    /// `SELECT COUNT(DISTINCT "pk") FROM (<base>) AS subquery`.
    SubqueryWrap,
}

impl CountStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::SubqueryWrap => "subquery_wrap",
        }
    }
}

/// Renders the count query for a base plan that has no ordering appended.
pub(crate) fn distinct_count_query(plan: &QueryPlan<'_>, strategy: CountStrategy) -> TranslatedQuery {
    match strategy {
        CountStrategy::Native => plan.count_distinct(),
        CountStrategy::SubqueryWrap => plan.count_distinct_wrapped(),
    }
}
