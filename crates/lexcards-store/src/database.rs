//! Database connection management.
//!
//! The [`Database`] struct owns a [`rusqlite::Connection`] and guarantees that
//! migrations are run before any other operation.  A handle is meant to be
//! owned by one worker at a time; workers that run in parallel open their own
//! handle on the same file and rely on WAL mode plus optimistic versioning.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;

use crate::config::StoreConfig;
use crate::error::Result;
use crate::migrations;

/// Number of SQLite VM steps between deadline checks.
const DEADLINE_CHECK_STEPS: i32 = 1_000;

/// Wrapper around a [`rusqlite::Connection`].
pub struct Database {
    conn: Connection,
    op_timeout: Duration,
}

impl Database {
    /// Open (or create) the database described by `config`.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        if let Some(dir) = config.db_path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }

        tracing::info!(path = %config.db_path.display(), "opening database");

        let conn = Connection::open(&config.db_path)?;

        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(config.op_timeout)?;
        register_functions(&conn)?;

        migrations::run_migrations(&conn)?;

        Ok(Self {
            conn,
            op_timeout: config.op_timeout,
        })
    }

    /// Open (or create) the platform default database, honouring any
    /// environment overrides.
    pub fn new() -> Result<Self> {
        Self::open(&StoreConfig::from_env())
    }

    /// Open (or create) a database at an explicit path with default settings.
    pub fn open_at(path: &Path) -> Result<Self> {
        Self::open(&StoreConfig {
            db_path: path.to_path_buf(),
            ..StoreConfig::default()
        })
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Return the filesystem path of the open database (if any).
    pub fn path(&self) -> Option<PathBuf> {
        self.conn.path().map(PathBuf::from)
    }

    pub fn timeout(&self) -> Duration {
        self.op_timeout
    }

    /// Change the per-operation deadline for this handle.
    pub fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.conn.busy_timeout(timeout)?;
        self.op_timeout = timeout;
        Ok(())
    }

    /// Run `op` against the connection with the operation deadline armed.
    ///
    /// A statement still running at the deadline is interrupted and surfaces
    /// as [`StoreError::Timeout`](crate::StoreError::Timeout); any transaction
    /// opened inside `op` rolls back when it is dropped.
    pub(crate) fn bounded<T>(&self, op: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let deadline = Instant::now() + self.op_timeout;
        self.conn
            .progress_handler(DEADLINE_CHECK_STEPS, Some(move || Instant::now() >= deadline));

        let result = op(&self.conn);

        self.conn.progress_handler(0, None::<fn() -> bool>);
        result
    }
}

/// Scalar functions the schema and queries rely on.  They must exist on
/// every connection before the expression indexes are touched.
///
/// `unicode_lower(x)` folds case across all of Unicode; SQLite's built-in
/// `LOWER()` only folds ASCII.
fn register_functions(conn: &Connection) -> Result<()> {
    conn.create_scalar_function(
        "unicode_lower",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let value: Option<String> = ctx.get(0)?;
            Ok(value.map(|s| s.to_lowercase()))
        },
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoreError;

    #[test]
    fn open_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");

        let db = Database::open_at(&path).expect("should open");
        assert!(db.path().is_some());
        assert_eq!(db.timeout(), Duration::from_secs(3));
    }

    #[test]
    fn open_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("cards.db");

        Database::open_at(&path).expect("should open");
        assert!(path.exists());
    }

    #[test]
    fn reopen_keeps_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");

        drop(Database::open_at(&path).unwrap());
        let db = Database::open_at(&path).unwrap();
        let version: u32 = db
            .conn()
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap();
        assert_eq!(version, migrations::CURRENT_VERSION);
    }

    #[test]
    fn unicode_lower_folds_non_ascii() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();

        let (folded, null): (String, Option<String>) = db
            .conn()
            .query_row("SELECT unicode_lower('ÉTAPE Ürteil'), unicode_lower(NULL)", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert_eq!(folded, "étape ürteil");
        assert_eq!(null, None);
    }

    #[test]
    fn expired_deadline_interrupts_statement() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = Database::open_at(&dir.path().join("test.db")).unwrap();
        db.set_timeout(Duration::ZERO).unwrap();

        let err = db
            .bounded(|conn| {
                let n: i64 = conn.query_row(
                    "WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c WHERE x < 10000000)
                     SELECT COUNT(*) FROM c",
                    [],
                    |row| row.get(0),
                )?;
                Ok(n)
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::Timeout));

        db.set_timeout(Duration::from_secs(3)).unwrap();
        let n: i64 = db
            .bounded(|conn| Ok(conn.query_row("SELECT 1", [], |row| row.get(0))?))
            .unwrap();
        assert_eq!(n, 1);
    }
}
