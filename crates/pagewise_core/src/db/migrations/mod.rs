//! Schema migration runner for caller-owned tables.
//!
//! The engine owns no tables. Applications register their DDL as an ordered
//! `&[Migration]` slice and hand it to [`crate::db::open_db`].
//!
//! # Invariants
//! - `version` values start at 1 and strictly increase within one slice;
//!   other slices are rejected before anything runs.
//! - Applied migration version is mirrored to `PRAGMA user_version`.
//! - All pending migrations commit in one transaction or not at all.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

/// One versioned DDL batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Migration {
    pub version: u32,
    pub sql: &'static str,
}

impl Migration {
    pub const fn new(version: u32, sql: &'static str) -> Self {
        Self { version, sql }
    }
}

/// Returns the highest version in `migrations`, or 0 for an empty slice.
pub fn latest_version(migrations: &[Migration]) -> u32 {
    migrations.last().map_or(0, |migration| migration.version)
}

/// Applies every migration newer than the connection's `user_version`.
///
/// # Errors
/// - `MigrationOrder` when versions are not strictly increasing; nothing is
///   applied.
/// - `UnsupportedSchemaVersion` when the database is newer than the slice.
pub fn apply_migrations(conn: &mut Connection, migrations: &[Migration]) -> DbResult<()> {
    check_order(migrations)?;
    let current = schema_version(conn)?;
    let latest = latest_version(migrations);

    if current > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current,
            latest_supported: latest,
        });
    }
    if current == latest {
        return Ok(());
    }

    let tx = conn.transaction()?;
    let mut applied = 0usize;
    for migration in migrations.iter().filter(|m| m.version > current) {
        tx.execute_batch(migration.sql)?;
        tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))?;
        applied += 1;
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={} to_version={} applied={}",
        current, latest, applied
    );
    Ok(())
}

fn check_order(migrations: &[Migration]) -> DbResult<()> {
    let mut previous = 0u32;
    for migration in migrations {
        if migration.version <= previous {
            return Err(DbError::MigrationOrder {
                version: migration.version,
                previous,
            });
        }
        previous = migration.version;
    }
    Ok(())
}

/// Reads `PRAGMA user_version` from the connection.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}
