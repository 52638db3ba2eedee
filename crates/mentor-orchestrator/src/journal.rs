//! Write-ahead journal for pipeline commits.
//!
//! A commit touches two stores: the memory log and the learner corpus of
//! the vector index. The journal records the full intent before either is
//! written, marks the log write, and drops the intent once the vector
//! record is stored. Anything still in the journal at startup is replayed
//! by [`CommitJournal::recover`].
//!
//! Every step is idempotent: inserts skip ids already present, updates are
//! skipped once `fix_attempts` has reached the expected value, and vector
//! upserts replace by id.

use std::path::{Path, PathBuf};

use mentor_memory::{Corpus, SemanticIndex, VectorRecord};
use mentor_persistence::atomic::{atomic_write_json, read_json_optional};
use mentor_persistence::{MemoryLog, MistakeMemory};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::Result;

/// How the memory log is changed by a commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommitMode {
    /// Append `memory` as a new entry.
    Create,
    /// Merge `memory`'s patterns and notes into the existing entry with the
    /// same id, which must end with `expected_fix_attempts`.
    Update { expected_fix_attempts: u32 },
}

/// Progress of an intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitStage {
    Pending,
    LogWritten,
}

/// One journaled commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitIntent {
    pub intent_id: String,
    /// Entry for this submission. For updates, only its patterns and notes
    /// are merged; the whole entry is inserted if the target has vanished.
    pub memory: MistakeMemory,
    pub mode: CommitMode,
    /// Learner vector record, already embedded and linked by `memory_id`.
    pub record: VectorRecord,
    pub stage: CommitStage,
}

impl CommitIntent {
    pub fn new(memory: MistakeMemory, mode: CommitMode, record: VectorRecord) -> Self {
        Self {
            intent_id: uuid::Uuid::new_v4().to_string(),
            memory,
            mode,
            record,
            stage: CommitStage::Pending,
        }
    }

    pub fn memory_id(&self) -> &str {
        &self.memory.memory_id
    }
}

/// File-backed list of unfinished commits.
#[derive(Debug, Clone)]
pub struct CommitJournal {
    path: PathBuf,
}

impl CommitJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Intents that have not completed, oldest first.
    pub fn pending(&self) -> Result<Vec<CommitIntent>> {
        Ok(read_json_optional(&self.path)?.unwrap_or_default())
    }

    /// Record an intent before any store is touched.
    pub fn begin(&self, intent: &CommitIntent) -> Result<()> {
        let mut intents = self.pending()?;
        intents.retain(|i| i.intent_id != intent.intent_id);
        intents.push(intent.clone());
        atomic_write_json(&self.path, &intents)?;
        debug!(intent_id = %intent.intent_id, memory_id = %intent.memory_id(), "Commit intent recorded");
        Ok(())
    }

    fn mark(&self, intent_id: &str, stage: CommitStage) -> Result<()> {
        let mut intents = self.pending()?;
        if let Some(intent) = intents.iter_mut().find(|i| i.intent_id == intent_id) {
            intent.stage = stage;
        }
        atomic_write_json(&self.path, &intents)?;
        Ok(())
    }

    fn complete(&self, intent_id: &str) -> Result<()> {
        let mut intents = self.pending()?;
        intents.retain(|i| i.intent_id != intent_id);
        atomic_write_json(&self.path, &intents)?;
        Ok(())
    }

    /// Carry an intent through both stores and drop it from the journal.
    pub async fn apply(
        &self,
        mut intent: CommitIntent,
        log: &MemoryLog,
        index: &SemanticIndex,
    ) -> Result<()> {
        if intent.stage == CommitStage::Pending {
            apply_to_log(&intent, log)?;
            intent.stage = CommitStage::LogWritten;
            self.mark(&intent.intent_id, intent.stage)?;
        }

        index
            .upsert(Corpus::LearnerMemories, vec![intent.record.clone()])
            .await?;
        self.complete(&intent.intent_id)?;

        info!(
            memory_id = %intent.memory_id(),
            vector_id = %intent.record.id(),
            "Commit complete"
        );
        Ok(())
    }

    /// Replay every unfinished intent. Returns how many were repaired.
    pub async fn recover(&self, log: &MemoryLog, index: &SemanticIndex) -> Result<usize> {
        let intents = self.pending()?;
        if intents.is_empty() {
            return Ok(0);
        }

        warn!(count = intents.len(), "Found unfinished commits, replaying");
        let count = intents.len();
        for intent in intents {
            info!(
                intent_id = %intent.intent_id,
                memory_id = %intent.memory_id(),
                stage = ?intent.stage,
                "Recovering commit"
            );
            self.apply(intent, log, index).await?;
        }
        Ok(count)
    }
}

fn apply_to_log(intent: &CommitIntent, log: &MemoryLog) -> Result<()> {
    let memory_id = intent.memory_id();
    match intent.mode {
        CommitMode::Create => {
            log.insert(intent.memory.clone())?;
        }
        CommitMode::Update {
            expected_fix_attempts,
        } => match log.get(memory_id) {
            Some(existing) if existing.fix_attempts >= expected_fix_attempts => {
                debug!(memory_id = %memory_id, "Update already applied");
            }
            Some(_) => {
                let patterns: Vec<String> = intent.memory.error_patterns.iter().cloned().collect();
                log.update(memory_id, Some(&patterns), Some(&intent.memory.notes))?;
            }
            None => {
                warn!(memory_id = %memory_id, "Memory to update is missing, recreating it");
                log.insert(intent.memory.clone())?;
            }
        },
    }
    Ok(())
}
