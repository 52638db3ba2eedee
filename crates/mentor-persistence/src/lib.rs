//! Persistence layer for the mentor.
//!
//! This crate provides the durable, human-readable memory log of learner
//! mistakes, written with atomic file operations (write to temp file, then
//! rename) so a crash never leaves a half-written log behind.
//!
//! # Example
//!
//! ```no_run
//! use mentor_persistence::MemoryLog;
//!
//! let log = MemoryLog::new("/home/user/.dsa-mentor/mentor_memory.json");
//!
//! let id = log
//!     .create("Two Sum", "for i in ...", "Needs analysis", vec!["time-complexity".into()], "O(n^2) scan")
//!     .unwrap();
//!
//! assert_eq!(log.find_by_title("two sum"), Some(id));
//! ```

pub mod atomic;
pub mod error;
pub mod memory_log;

pub use error::{PersistenceError, Result};
pub use memory_log::{MemoryLog, MistakeMemory, MAX_USER_CODE_CHARS};
