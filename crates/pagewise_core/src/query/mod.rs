//! Query model, path resolution and SQL rendering.
//!
//! # Responsibility
//! - Express base filters as a composable [`EntityQuery`].
//! - Resolve dotted field paths across registered relations.
//! - Render count, ordered page and raw translation queries.
//!
//! # Invariants
//! - Count queries never contain ORDER BY.
//! - Identifiers reach SQL only after schema validation and quoting; values
//!   are always bound parameters.

mod count;
mod filter;
mod order;
mod path;
mod plan;
mod sql;

pub use count::CountStrategy;
pub use filter::{CompareOp, Condition, EntityQuery, JoinKind, JoinRequest};
pub use path::{resolve_field_path, resolve_relation_path, FieldPath, PathError, PathStep};
pub use sql::TranslatedQuery;

pub(crate) use count::distinct_count_query;
pub(crate) use order::OrderClause;
pub(crate) use plan::QueryPlan;
pub(crate) use sql::window_params;
