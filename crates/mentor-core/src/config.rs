//! Shared configuration for the mentor.
//!
//! Locates the mentor's state directory and the files every interface
//! shares: the mistake memory log, the commit journal, the vector index
//! data, and the expert dataset.
//!
//! # Storage Structure
//!
//! ```text
//! ~/.dsa-mentor/
//! ├── mentor_memory.json   # Memory log (human-readable)
//! ├── db/
//! │   └── vectors/         # Local vector index, one file per corpus
//! ├── data/
//! │   └── problems.json    # Expert solution dataset
//! ├── config/
//! │   └── .env.local       # Secrets (API keys)
//! └── state/
//!     └── commit_journal.json
//! ```
//!
//! # Environment Variables
//!
//! - `MENTOR_STATE_DIR`: Override the base state directory
//! - `MENTOR_DB_DIR`: Override the database directory
//! - `MENTOR_DATASET`: Override the expert dataset path

use std::path::PathBuf;
use std::sync::OnceLock;

use tracing::debug;

/// Environment variable for custom state directory.
pub const STATE_DIR_ENV: &str = "MENTOR_STATE_DIR";

/// Environment variable for custom database directory.
pub const DB_DIR_ENV: &str = "MENTOR_DB_DIR";

/// Environment variable for the expert dataset path.
pub const DATASET_ENV: &str = "MENTOR_DATASET";

/// Default state directory name under home.
const DEFAULT_STATE_DIR: &str = ".dsa-mentor";

const DB_SUBDIR: &str = "db";
const DATA_SUBDIR: &str = "data";
const CONFIG_SUBDIR: &str = "config";
const STATE_SUBDIR: &str = "state";

const MEMORY_LOG_FILE: &str = "mentor_memory.json";
const JOURNAL_FILE: &str = "commit_journal.json";
const DATASET_FILE: &str = "problems.json";

static STATE_DIR_CACHE: OnceLock<PathBuf> = OnceLock::new();

/// Get the mentor state directory.
///
/// The state directory is determined by:
/// 1. `MENTOR_STATE_DIR` environment variable if set
/// 2. `~/.dsa-mentor` if home directory is available
/// 3. `.dsa-mentor` in current directory as fallback
pub fn state_dir() -> PathBuf {
    STATE_DIR_CACHE
        .get_or_init(|| {
            std::env::var(STATE_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    dirs::home_dir()
                        .map(|h| h.join(DEFAULT_STATE_DIR))
                        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR))
                })
        })
        .clone()
}

/// Get the database directory.
///
/// Defaults to `~/.dsa-mentor/db/` or `MENTOR_DB_DIR` env var.
pub fn db_dir() -> PathBuf {
    std::env::var(DB_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| state_dir().join(DB_SUBDIR))
}

/// Get the local vector index directory.
pub fn vector_dir() -> PathBuf {
    db_dir().join("vectors")
}

/// Get the data directory holding the expert dataset.
pub fn data_dir() -> PathBuf {
    state_dir().join(DATA_SUBDIR)
}

/// Get the expert dataset path.
///
/// Defaults to `~/.dsa-mentor/data/problems.json` or `MENTOR_DATASET` env var.
pub fn dataset_file() -> PathBuf {
    std::env::var(DATASET_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| data_dir().join(DATASET_FILE))
}

/// Get the user config directory.
pub fn config_dir() -> PathBuf {
    state_dir().join(CONFIG_SUBDIR)
}

/// Get the `.env.local` file path.
///
/// Environment file for secrets (API keys).
pub fn env_file() -> PathBuf {
    config_dir().join(".env.local")
}

/// Get the runtime state directory.
pub fn runtime_state_dir() -> PathBuf {
    state_dir().join(STATE_SUBDIR)
}

/// Get the memory log file path.
pub fn memory_log_file() -> PathBuf {
    state_dir().join(MEMORY_LOG_FILE)
}

/// Get the commit journal file path.
pub fn journal_file() -> PathBuf {
    runtime_state_dir().join(JOURNAL_FILE)
}

/// Load environment files.
///
/// Reads `.env.local` in the working directory first, then the one in the
/// config directory. Variables already set in the process win.
pub fn load_env() {
    if dotenvy::from_filename(".env.local").is_ok() {
        debug!("Loaded .env.local from working directory");
    }
    let file = env_file();
    if dotenvy::from_path(&file).is_ok() {
        debug!(path = %file.display(), "Loaded env file");
    }
}

/// Ensure the state directory and all subdirectories exist.
///
/// # Errors
/// Returns an error if any directory cannot be created.
pub fn ensure_all_dirs() -> std::io::Result<()> {
    std::fs::create_dir_all(state_dir())?;
    std::fs::create_dir_all(vector_dir())?;
    std::fs::create_dir_all(data_dir())?;
    std::fs::create_dir_all(config_dir())?;
    std::fs::create_dir_all(runtime_state_dir())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Env vars can't be isolated across parallel tests, so these check
    // file and directory names rather than full paths.

    #[test]
    fn test_state_dir() {
        let dir = state_dir();
        assert!(dir.is_absolute() || dir.ends_with(".dsa-mentor"));
    }

    #[test]
    fn test_vector_dir_name() {
        assert!(vector_dir().ends_with("vectors"));
    }

    #[test]
    fn test_memory_log_file_name() {
        assert!(memory_log_file().ends_with("mentor_memory.json"));
    }

    #[test]
    fn test_journal_file_name() {
        let file = journal_file();
        assert!(file.ends_with("commit_journal.json"));
        assert!(file.parent().is_some_and(|p| p.ends_with("state")));
    }

    #[test]
    fn test_env_file_name() {
        assert!(env_file().ends_with(".env.local"));
    }

    #[test]
    fn test_dataset_file_is_json() {
        let file = dataset_file();
        assert!(file.extension().is_some_and(|ext| ext == "json"));
    }
}
