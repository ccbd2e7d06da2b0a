//! Paginated, sortable, accurately-counted query engine over SQLite.
//!
//! Lists any registered entity with page/size windowing and multi-field
//! sort. The reported total count is the number of distinct entities, even
//! when the base query joins to-many relations.

pub mod db;
pub mod logging;
pub mod pagination;
pub mod query;
pub mod repo;
pub mod schema;

pub use logging::{default_log_level, init_logging, logging_status, LoggingConfig, LoggingError};
pub use pagination::{
    Page, Pageable, SortDirection, SortSpec, Sortable, SortablePageRequest, DEFAULT_PAGE_SIZE,
};
pub use query::{CompareOp, Condition, CountStrategy, EntityQuery, TranslatedQuery};
pub use repo::{
    EngineOptions, FromRow, PrebuiltCount, PrebuiltQuery, QueryStage, ReadOnlyRepository,
    RepoError, RepoResult, SqliteReadOnlyRepository,
};
pub use schema::{EntityDescriptor, Schema, SchemaError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
