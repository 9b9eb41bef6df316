mod migration;
pub mod schema;


use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use rusqlite::Connection;

pub use migration::{MIGRATIONS, Migration, apply_pending_migrations, current_version};

/// How long a statement waits on a locked database before failing.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// How long one [`Database::bounded`] unit may keep SQLite executing.
pub const DEFAULT_STATEMENT_TIMEOUT: Duration = Duration::from_secs(30);

/// VM instructions between deadline checks.
const PROGRESS_OPS: i32 = 10_000;

#[derive(Debug)]
struct Deadline {
    limit: Duration,
    started: Option<Instant>,
}

impl Deadline {
    fn expired(&self) -> bool {
        self.started.is_some_and(|t| t.elapsed() > self.limit)
    }
}

/// Database wrapper providing connection management and schema initialization.
///
/// Two limits apply: `busy_timeout` bounds waits on another connection's
/// lock, and the statement timeout interrupts work inside
/// [`Database::bounded`] that runs past its deadline.
pub struct Database {
    conn: Connection,
    deadline: Arc<Mutex<Deadline>>,
}

impl Database {
    /// Opens an in-memory SQLite database.
    ///
    /// Automatically applies pending migrations on connection open.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::initialize(conn, DEFAULT_BUSY_TIMEOUT)
    }

    /// Opens a file-based SQLite database at the given path.
    ///
    /// Creates the database file if it does not exist.
    /// Automatically applies pending migrations on connection open.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    /// Like [`Database::open`] with an explicit busy timeout.
    pub fn open_with_timeout(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        Self::initialize(conn, busy_timeout)
    }

    fn initialize(mut conn: Connection, busy_timeout: Duration) -> Result<Self> {
        conn.busy_timeout(busy_timeout)?;
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        apply_pending_migrations(&mut conn)?;

        let deadline = Arc::new(Mutex::new(Deadline {
            limit: DEFAULT_STATEMENT_TIMEOUT,
            started: None,
        }));
        let watched = Arc::clone(&deadline);
        conn.progress_handler(
            PROGRESS_OPS,
            Some(move || watched.lock().map(|d| d.expired()).unwrap_or(false)),
        );

        Ok(Self { conn, deadline })
    }

    /// Returns a reference to the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Sets the limit used by later [`Database::bounded`] calls.
    pub fn set_statement_timeout(&self, limit: Duration) {
        if let Ok(mut deadline) = self.deadline.lock() {
            deadline.limit = limit;
        }
    }

    /// Runs `f` with the statement deadline armed.
    ///
    /// Once the limit has passed since `f` started, SQLite interrupts the
    /// statement it is executing and that statement fails with
    /// `SQLITE_INTERRUPT`. Nested calls share the outermost deadline.
    pub fn bounded<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let armed_here = match self.deadline.lock() {
            Ok(mut deadline) if deadline.started.is_none() => {
                deadline.started = Some(Instant::now());
                true
            }
            _ => false,
        };

        let result = f();

        if armed_here && let Ok(mut deadline) = self.deadline.lock() {
            deadline.started = None;
        }
        result
    }

    /// Highest applied schema version.
    pub fn schema_version(&self) -> Result<u32> {
        current_version(&self.conn)
    }
}

/// Runs `f` inside `BEGIN … COMMIT`, rolling back if it returns an error.
///
/// A failed `COMMIT` (typically `SQLITE_BUSY` once the busy timeout runs
/// out) leaves SQLite inside the transaction, so it is rolled back too and
/// the connection is back in autocommit mode whatever the outcome.
pub fn in_transaction<T>(conn: &Connection, f: impl FnOnce() -> Result<T>) -> Result<T> {
    conn.execute("BEGIN TRANSACTION", [])?;

    match f() {
        Ok(value) => match conn.execute("COMMIT", []) {
            Ok(_) => Ok(value),
            Err(e) => {
                conn.execute("ROLLBACK", []).ok();
                Err(anyhow::Error::new(e).context("Failed to commit transaction"))
            }
        },
        Err(e) => {
            conn.execute("ROLLBACK", []).ok();
            Err(e)
        }
    }
}

/// Runs `f` inside a named savepoint. On error only the work done since the
/// savepoint is undone; the enclosing transaction stays open.
pub fn in_savepoint<T>(conn: &Connection, name: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    // Outside a transaction the savepoint opens one, and releasing it commits.
    let undo = if conn.is_autocommit() {
        "ROLLBACK".to_string()
    } else {
        format!("ROLLBACK TO SAVEPOINT {name}; RELEASE SAVEPOINT {name}")
    };
    conn.execute_batch(&format!("SAVEPOINT {name}"))?;

    match f() {
        Ok(value) => match conn.execute_batch(&format!("RELEASE SAVEPOINT {name}")) {
            Ok(()) => Ok(value),
            Err(e) => {
                conn.execute_batch(&undo).ok();
                Err(anyhow::Error::new(e).context(format!("Failed to release savepoint {name}")))
            }
        },
        Err(e) => {
            conn.execute_batch(&undo).ok();
            Err(e)
        }
    }
}
