//! Store configuration loaded from environment variables.
//!
//! Every setting has a default so a host can open the store with zero
//! configuration during local development.

use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use lexcards_shared::constants::DEFAULT_OP_TIMEOUT_MS;

/// Store configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// SQLite database file.
    /// Env: `LEXCARDS_DB_PATH`
    /// Default: `lexcards.db` in the platform data directory
    /// (`~/.local/share/lexcards/lexcards.db` on Linux), or the working
    /// directory when no data directory can be determined.
    pub db_path: PathBuf,

    /// Upper bound for a single store operation, lock waits included.
    /// Env: `LEXCARDS_DB_TIMEOUT_MS`
    /// Default: 3 seconds.
    pub op_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            op_timeout: Duration::from_millis(DEFAULT_OP_TIMEOUT_MS),
        }
    }
}

impl StoreConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(path) = var("LEXCARDS_DB_PATH") {
            if !path.trim().is_empty() {
                config.db_path = PathBuf::from(path);
            }
        }

        if let Some(val) = var("LEXCARDS_DB_TIMEOUT_MS") {
            match val.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => config.op_timeout = Duration::from_millis(ms),
                _ => {
                    tracing::warn!(
                        value = %val,
                        "Invalid LEXCARDS_DB_TIMEOUT_MS, using default"
                    );
                }
            }
        }

        config
    }
}

fn default_db_path() -> PathBuf {
    ProjectDirs::from("dev", "lexcards", "lexcards")
        .map(|dirs| dirs.data_dir().join("lexcards.db"))
        .unwrap_or_else(|| PathBuf::from("lexcards.db"))
}
