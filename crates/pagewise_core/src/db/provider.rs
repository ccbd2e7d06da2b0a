//! Request-scoped unit-of-work acquisition.
//!
//! Every engine call acquires exactly one [`UnitOfWork`] and drops it before
//! returning, on success and error paths alike.

use super::{open_existing, DbError, DbResult};
use log::{debug, error};
use rusqlite::Connection;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use uuid::Uuid;

/// Supplies one connection handle per engine call.
pub trait ConnectionProvider: Send + Sync {
    fn acquire(&self) -> DbResult<UnitOfWork<'_>>;
}

impl<P: ConnectionProvider + ?Sized> ConnectionProvider for Arc<P> {
    fn acquire(&self) -> DbResult<UnitOfWork<'_>> {
        (**self).acquire()
    }
}

impl<P: ConnectionProvider + ?Sized> ConnectionProvider for &P {
    fn acquire(&self) -> DbResult<UnitOfWork<'_>> {
        (**self).acquire()
    }
}

enum Handle<'a> {
    Owned(Connection),
    Shared(MutexGuard<'a, Connection>),
}

/// Connection handle bound to a single engine call.
///
/// Dereferences to the underlying [`Connection`]; releasing happens in `Drop`.
pub struct UnitOfWork<'a> {
    id: Uuid,
    started_at: Instant,
    handle: Handle<'a>,
}

impl<'a> UnitOfWork<'a> {
    fn new(handle: Handle<'a>) -> Self {
        let id = Uuid::new_v4();
        debug!("event=uow_acquire module=db status=ok uow_id={id}");
        Self {
            id,
            started_at: Instant::now(),
            handle,
        }
    }

    /// Correlation id for log lines emitted under this unit of work.
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl Deref for UnitOfWork<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        match &self.handle {
            Handle::Owned(conn) => conn,
            Handle::Shared(guard) => &**guard,
        }
    }
}

impl Drop for UnitOfWork<'_> {
    fn drop(&mut self) {
        debug!(
            "event=uow_release module=db status=ok uow_id={} held_ms={}",
            self.id,
            self.started_at.elapsed().as_millis()
        );
    }
}

/// Opens a fresh read-only connection to a database file per unit of work.
#[derive(Debug, Clone)]
pub struct FileConnectionProvider {
    path: PathBuf,
}

impl FileConnectionProvider {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConnectionProvider for FileConnectionProvider {
    fn acquire(&self) -> DbResult<UnitOfWork<'_>> {
        let conn = open_existing(&self.path).map_err(|err| {
            error!(
                "event=uow_acquire module=db status=error path={} error={}",
                self.path.display(),
                err
            );
            err
        })?;
        Ok(UnitOfWork::new(Handle::Owned(conn)))
    }
}

/// Serializes units of work over one long-lived connection.
///
/// Intended for in-memory databases, where every new connection would see
/// an empty store.
pub struct SharedConnectionProvider {
    conn: Mutex<Connection>,
}

impl SharedConnectionProvider {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Gives the connection back, e.g. to run writes between engine calls.
    pub fn into_inner(self) -> DbResult<Connection> {
        self.conn
            .into_inner()
            .map_err(|_| DbError::ConnectionPoisoned)
    }
}

impl ConnectionProvider for SharedConnectionProvider {
    fn acquire(&self) -> DbResult<UnitOfWork<'_>> {
        let guard = self.conn.lock().map_err(|_| DbError::ConnectionPoisoned)?;
        Ok(UnitOfWork::new(Handle::Shared(guard)))
    }
}
