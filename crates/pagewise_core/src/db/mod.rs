//! SQLite connection bootstrap and unit-of-work acquisition.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the query engine.
//! - Apply caller-registered schema migrations in deterministic order.
//! - Hand out request-scoped units of work that release on drop.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - A unit of work is never shared between two engine calls.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;
pub mod provider;

pub use open::{open_db, open_db_in_memory, open_existing};
pub use provider::{
    ConnectionProvider, FileConnectionProvider, SharedConnectionProvider, UnitOfWork,
};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// Migration versions must start at 1 and strictly increase.
    MigrationOrder { version: u32, previous: u32 },
    /// A previous holder of a shared connection panicked mid-call.
    ConnectionPoisoned,
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::MigrationOrder { version, previous } => write!(
                f,
                "migration version {version} must be greater than previous version {previous}"
            ),
            Self::ConnectionPoisoned => write!(f, "shared connection lock is poisoned"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. }
            | Self::MigrationOrder { .. }
            | Self::ConnectionPoisoned => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
