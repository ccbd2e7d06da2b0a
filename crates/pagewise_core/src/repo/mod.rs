//! Repository layer: the paginated query engine entry points.
//!
//! # Responsibility
//! - Expose read-only, use-case level access per entity type.
//! - Isolate SQLite execution details from callers.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`InvalidPagination`,
//!   `InvalidSortField`) in addition to store errors.
//! - "Not found" is `Ok(None)`, never an error and never an empty collection.

pub mod prebuilt;
pub mod read_only_repo;

pub use prebuilt::{PrebuiltCount, PrebuiltQuery};
pub use read_only_repo::{
    EngineOptions, FromRow, QueryStage, ReadOnlyRepository, RepoError, RepoResult,
    SqliteReadOnlyRepository,
};
