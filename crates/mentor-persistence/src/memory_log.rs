//! Durable log of learner mistakes.
//!
//! The log is a single pretty-printed JSON array of [`MistakeMemory`]
//! entries, fully rewritten on every save. It is independent of the vector
//! index: entries here are looked up by exact problem title or by id, never
//! by similarity.
//!
//! Reads are deliberately forgiving. A missing, empty, or unparsable file
//! loads as an empty log (with a warning for the unparsable case) so a
//! damaged log never takes the pipeline down.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::atomic::{atomic_write_json, read_json_optional};
use crate::error::Result;

/// Maximum number of characters of submitted code kept per entry.
pub const MAX_USER_CODE_CHARS: usize = 500;

/// A persisted record of one diagnosed mistake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MistakeMemory {
    /// Opaque identifier, assigned at creation and never changed.
    pub memory_id: String,

    /// Creation or last-update instant.
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,

    /// Problem title; the case-insensitive lookup key.
    pub problem_title: String,

    /// Truncated snapshot of the submitted code.
    #[serde(default)]
    pub user_code: String,

    #[serde(default)]
    pub outcome: String,

    /// Short mistake tags. Updates merge into this set.
    #[serde(default)]
    pub error_patterns: BTreeSet<String>,

    #[serde(default)]
    pub notes: String,

    /// Starts at 1 and grows by one on every update.
    #[serde(default = "default_fix_attempts")]
    pub fix_attempts: u32,
}

fn default_fix_attempts() -> u32 {
    1
}

impl MistakeMemory {
    /// Build a fresh entry with a generated id.
    pub fn new(
        problem_title: impl Into<String>,
        user_code: &str,
        outcome: impl Into<String>,
        error_patterns: impl IntoIterator<Item = String>,
        notes: impl Into<String>,
    ) -> Self {
        Self::with_id(
            uuid::Uuid::new_v4().to_string(),
            problem_title,
            user_code,
            outcome,
            error_patterns,
            notes,
        )
    }

    /// Build a fresh entry with a caller-chosen id.
    ///
    /// Used when the id must be known before the entry is written, e.g. to
    /// link it with a vector record in the same commit.
    pub fn with_id(
        memory_id: impl Into<String>,
        problem_title: impl Into<String>,
        user_code: &str,
        outcome: impl Into<String>,
        error_patterns: impl IntoIterator<Item = String>,
        notes: impl Into<String>,
    ) -> Self {
        Self {
            memory_id: memory_id.into(),
            timestamp: Utc::now(),
            problem_title: problem_title.into(),
            user_code: truncate_chars(user_code, MAX_USER_CODE_CHARS),
            outcome: outcome.into(),
            error_patterns: error_patterns.into_iter().collect(),
            notes: notes.into(),
            fix_attempts: 1,
        }
    }

    /// Whether this entry's title matches `title`, ignoring case and
    /// surrounding whitespace.
    pub fn title_matches(&self, title: &str) -> bool {
        normalize_title(&self.problem_title) == normalize_title(title)
    }

    /// Merge new patterns and notes into this entry and count the attempt.
    fn apply_update(&mut self, new_error_patterns: Option<&[String]>, new_notes: Option<&str>) {
        if let Some(patterns) = new_error_patterns {
            self.error_patterns.extend(patterns.iter().cloned());
        }
        if let Some(notes) = new_notes.filter(|n| !n.trim().is_empty()) {
            self.notes = format!("{}\n{}", self.notes, notes).trim().to_string();
        }
        self.fix_attempts += 1;
        self.timestamp = Utc::now();
    }
}

/// File-backed log of [`MistakeMemory`] entries.
///
/// There is no file locking; callers that share a log across tasks must
/// serialize writers themselves.
#[derive(Debug, Clone)]
pub struct MemoryLog {
    path: PathBuf,
}

impl MemoryLog {
    /// Creates a log backed by the given file. The file need not exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads all entries.
    ///
    /// Never fails: a missing or empty file yields an empty list, and an
    /// unreadable or corrupted file is logged and also yields an empty list.
    pub fn load(&self) -> Vec<MistakeMemory> {
        match read_json_optional::<Vec<MistakeMemory>>(&self.path) {
            Ok(Some(memories)) => {
                debug!(count = memories.len(), path = %self.path.display(), "Loaded memory log");
                memories
            }
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Memory log is corrupted or unreadable, starting from an empty log"
                );
                Vec::new()
            }
        }
    }

    /// Replaces the whole log with `memories`.
    pub fn save(&self, memories: &[MistakeMemory]) -> Result<()> {
        atomic_write_json(&self.path, &memories)?;
        debug!(count = memories.len(), "Saved memory log");
        Ok(())
    }

    /// Creates a new entry and returns its id.
    ///
    /// `user_code` is truncated to [`MAX_USER_CODE_CHARS`] characters.
    pub fn create(
        &self,
        problem_title: &str,
        user_code: &str,
        outcome: &str,
        error_patterns: Vec<String>,
        notes: &str,
    ) -> Result<String> {
        let memory = MistakeMemory::new(problem_title, user_code, outcome, error_patterns, notes);
        let memory_id = memory.memory_id.clone();
        self.insert(memory)?;
        Ok(memory_id)
    }

    /// Appends a prepared entry.
    ///
    /// Returns `false` without writing if an entry with the same id is
    /// already present, so replaying an insert is harmless.
    pub fn insert(&self, memory: MistakeMemory) -> Result<bool> {
        let mut memories = self.load();
        if memories.iter().any(|m| m.memory_id == memory.memory_id) {
            debug!(memory_id = %memory.memory_id, "Memory already present, skipping insert");
            return Ok(false);
        }
        info!(
            memory_id = %memory.memory_id,
            problem_title = %memory.problem_title,
            "Creating mistake memory"
        );
        memories.push(memory);
        self.save(&memories)?;
        Ok(true)
    }

    /// Updates an existing entry in place.
    ///
    /// Patterns are merged as a set union, notes are appended on a new line,
    /// `fix_attempts` grows by one and the timestamp is refreshed. Returns
    /// `false` if no entry has `memory_id`.
    pub fn update(
        &self,
        memory_id: &str,
        new_error_patterns: Option<&[String]>,
        new_notes: Option<&str>,
    ) -> Result<bool> {
        let mut memories = self.load();
        let Some(memory) = memories.iter_mut().find(|m| m.memory_id == memory_id) else {
            debug!(memory_id = %memory_id, "No memory to update");
            return Ok(false);
        };

        memory.apply_update(new_error_patterns, new_notes);
        info!(
            memory_id = %memory_id,
            fix_attempts = memory.fix_attempts,
            "Updated mistake memory"
        );
        self.save(&memories)?;
        Ok(true)
    }

    /// Returns the id of the first entry whose title matches, ignoring case.
    pub fn find_by_title(&self, problem_title: &str) -> Option<String> {
        self.load()
            .into_iter()
            .find(|m| m.title_matches(problem_title))
            .map(|m| m.memory_id)
    }

    /// Returns the entry with the given id.
    pub fn get(&self, memory_id: &str) -> Option<MistakeMemory> {
        self.load().into_iter().find(|m| m.memory_id == memory_id)
    }

    /// Naive text search over the log.
    ///
    /// Matches entries whose title contains `problem_title` (case-insensitive)
    /// or whose error patterns include any of `keywords`.
    pub fn search_similar(&self, problem_title: &str, keywords: &[String]) -> Vec<MistakeMemory> {
        let needle = normalize_title(problem_title);
        self.load()
            .into_iter()
            .filter(|m| {
                (!needle.is_empty() && normalize_title(&m.problem_title).contains(&needle))
                    || keywords.iter().any(|k| m.error_patterns.contains(k))
            })
            .collect()
    }
}

fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Timestamps are written as RFC 3339. Older logs stored naive UTC ISO
/// strings without an offset; those are still accepted on read.
mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(parsed.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    fn create_test_log() -> (MemoryLog, TempDir) {
        let dir = tempdir().unwrap();
        let log = MemoryLog::new(dir.path().join("mentor_memory.json"));
        (log, dir)
    }

    #[test]
    fn test_load_missing_file() {
        let (log, _dir) = create_test_log();
        assert!(log.load().is_empty());
    }

    #[test]
    fn test_load_empty_file() {
        let (log, _dir) = create_test_log();
        fs::write(log.path(), "").unwrap();
        assert!(log.load().is_empty());
    }

    #[test]
    fn test_load_corrupted_file() {
        let (log, _dir) = create_test_log();
        fs::write(log.path(), "[{\"memory_id\": ").unwrap();
        assert!(log.load().is_empty());
    }

    #[test]
    fn test_create_then_find_by_title() {
        let (log, _dir) = create_test_log();

        let id = log
            .create("Two Sum", "def two_sum(): ...", "Needs analysis", vec![], "nested loops")
            .unwrap();

        assert_eq!(log.find_by_title("Two Sum"), Some(id.clone()));
        assert_eq!(log.find_by_title("  two sum "), Some(id));
        assert_eq!(log.find_by_title("Two"), None);
    }

    #[test]
    fn test_create_truncates_user_code() {
        let (log, _dir) = create_test_log();
        let code = "é".repeat(MAX_USER_CODE_CHARS + 50);

        let id = log.create("Long", &code, "", vec![], "").unwrap();
        let memory = log.get(&id).unwrap();

        assert_eq!(memory.user_code.chars().count(), MAX_USER_CODE_CHARS);
        assert_eq!(memory.fix_attempts, 1);
    }

    #[test]
    fn test_update_merges_patterns_as_set() {
        let (log, _dir) = create_test_log();
        let id = log
            .create("Two Sum", "code", "Needs analysis", vec!["p1".into()], "first")
            .unwrap();

        let updated = log
            .update(&id, Some(&["p1".to_string(), "p1".to_string()]), None)
            .unwrap();
        assert!(updated);

        let memory = log.get(&id).unwrap();
        assert_eq!(memory.error_patterns.iter().filter(|p| *p == "p1").count(), 1);
        assert_eq!(memory.error_patterns.len(), 1);
        assert_eq!(memory.fix_attempts, 2);
        assert_eq!(memory.notes, "first");
    }

    #[test]
    fn test_update_appends_notes() {
        let (log, _dir) = create_test_log();
        let id = log.create("Two Sum", "code", "", vec![], "first").unwrap();
        let before = log.get(&id).unwrap().timestamp;

        log.update(&id, Some(&["edge-case".to_string()]), Some("second"))
            .unwrap();

        let memory = log.get(&id).unwrap();
        assert_eq!(memory.notes, "first\nsecond");
        assert!(memory.error_patterns.contains("edge-case"));
        assert!(memory.timestamp >= before);
    }

    #[test]
    fn test_update_unknown_id() {
        let (log, _dir) = create_test_log();
        log.create("Two Sum", "code", "", vec![], "").unwrap();

        assert!(!log.update("missing", None, Some("note")).unwrap());
    }

    #[test]
    fn test_save_load_is_stable() {
        let (log, _dir) = create_test_log();
        log.create("Two Sum", "code", "Needs analysis", vec!["b".into(), "a".into()], "n")
            .unwrap();
        log.create("3Sum", "code", "Needs analysis", vec![], "").unwrap();

        let before = fs::read_to_string(log.path()).unwrap();
        log.save(&log.load()).unwrap();
        let after = fs::read_to_string(log.path()).unwrap();

        assert_eq!(before, after);
    }

    #[test]
    fn test_insert_is_idempotent() {
        let (log, _dir) = create_test_log();
        let memory = MistakeMemory::with_id("fixed-id", "Two Sum", "code", "", Vec::new(), "");

        assert!(log.insert(memory.clone()).unwrap());
        assert!(!log.insert(memory).unwrap());
        assert_eq!(log.load().len(), 1);
    }

    #[test]
    fn test_search_similar() {
        let (log, _dir) = create_test_log();
        log.create("Two Sum", "", "", vec!["time-complexity".into()], "").unwrap();
        log.create("Two Sum II", "", "", vec![], "").unwrap();
        log.create("Valid Parentheses", "", "", vec!["edge-case".into()], "").unwrap();

        let by_title = log.search_similar("two sum", &[]);
        assert_eq!(by_title.len(), 2);

        let by_keyword = log.search_similar("", &["edge-case".to_string()]);
        assert_eq!(by_keyword.len(), 1);
        assert_eq!(by_keyword[0].problem_title, "Valid Parentheses");
    }

    #[test]
    fn test_reads_legacy_entries() {
        let (log, _dir) = create_test_log();
        fs::write(
            log.path(),
            r#"[{
                "memory_id": "a1b2c3d4",
                "timestamp": "2025-03-01T10:15:30.123456",
                "problem_title": "Two Sum",
                "user_code": "x",
                "outcome": "Needs analysis",
                "error_patterns": ["p1", "p1"],
                "notes": "old"
            }]"#,
        )
        .unwrap();

        let memories = log.load();
        assert_eq!(memories.len(), 1);
        assert_eq!(memories[0].fix_attempts, 1);
        assert_eq!(memories[0].error_patterns.len(), 1);
    }
}
