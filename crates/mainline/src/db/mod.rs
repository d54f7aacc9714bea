//! `SQLite` storage layer for mainline.
//!
//! The database is the source of truth for the network and its derived graph.
//! Analyses never query it directly; they run over a [`GraphSnapshot`] loaded
//! from it (see `graph`).
//!
//! ## Module Structure
//!
//! - `schema` - Database schema (DDL)
//! - `helpers` - Row conversion and parsing utilities
//! - `network` - Pipe, service and building storage
//! - `graph` - Graph node/edge storage, criticality scores, snapshot loading
//! - `stats` - Aggregate network statistics
//!
//! [`GraphSnapshot`]: crate::graph::GraphSnapshot

mod graph;
mod helpers;
mod network;
mod schema;
mod stats;

pub use network::{validate_network, LoadSummary};
pub use stats::{AgeStats, ClassStats, MaterialStats, NetworkStats, NetworkTotals};

pub(crate) use helpers::{
    encode_geometry, row_to_building, row_to_edge, row_to_node, row_to_pipe, row_to_service,
    BUILDINGS_COLUMNS, EDGES_COLUMNS, NODES_COLUMNS, PIPES_COLUMNS, SERVICES_COLUMNS,
};
pub(crate) use schema::SCHEMA;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OpenFlags};

use crate::error::{Error, Result};

/// `SQLite` graph store.
///
/// The connection is wrapped in a `Mutex` so a single store can be shared by
/// the HTTP server's blocking tasks.
pub struct Store {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").field("path", &self.path).finish_non_exhaustive()
    }
}

impl Store {
    /// Open an existing store.
    ///
    /// # Errors
    ///
    /// Returns `Error::Connection` if the file does not exist or is not a
    /// usable `SQLite` database.
    pub fn open(path: &Path) -> Result<Self> {
        let connection_error = |source| Error::Connection {
            path: path.display().to_string(),
            source,
        };
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(connection_error)?;
        Self::init(&conn).map_err(connection_error)?;

        tracing::debug!(path = %path.display(), "Opened graph store");
        Ok(Self {
            conn: Mutex::new(conn),
            path: path.to_path_buf(),
        })
    }

    /// Open a store, creating the file and its parent directory if needed.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the directory cannot be created and
    /// `Error::Connection` if the database cannot be opened.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let connection_error = |source| Error::Connection {
            path: path.display().to_string(),
            source,
        };
        let conn = Connection::open(path).map_err(connection_error)?;
        Self::init(&conn).map_err(connection_error)?;

        tracing::info!(path = %path.display(), "Created graph store");
        Ok(Self {
            conn: Mutex::new(conn),
            path: path.to_path_buf(),
        })
    }

    /// A private in-memory store.
    ///
    /// # Errors
    ///
    /// Returns `Error::Database` if `SQLite` cannot allocate the database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: PathBuf::from(":memory:"),
        })
    }

    fn init(conn: &Connection) -> rusqlite::Result<()> {
        // Enable WAL mode and foreign keys
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)
    }

    /// Location of the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Change counter for commits made through other connections.
    ///
    /// The value moves whenever another connection (in this process or
    /// another) commits to the database; writes through this store leave it
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Returns `Error::Database` if the pragma cannot be read.
    pub fn data_version(&self) -> Result<i64> {
        let conn = self.connection()?;
        let version = conn.query_row("PRAGMA data_version", [], |row| row.get(0))?;
        Ok(version)
    }

    /// Acquire the connection lock.
    pub(crate) fn connection(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            Error::Internal(format!(
                "database connection mutex poisoned (a thread panicked while holding the lock): {e}"
            ))
        })
    }
}
