//! Mentoring pipeline.
//!
//! One review runs `Diagnose -> Retrieve -> BuildContext -> Feedback ->
//! Commit -> Done`. Diagnosis never fails on malformed model output and
//! retrieval degrades to empty lists; completion failures and commit
//! failures abort the review.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use mentor_agent::{
    diagnose, format_submission, generate_feedback, CompletionService, ContextBuilder, Diagnosis,
    DiagnosisOutcome, ModelConfig, Retriever,
};
use mentor_memory::{load_dataset, Corpus, Document, SemanticIndex, META_MEMORY_ID, META_PROBLEM_TITLE};
use mentor_persistence::{MemoryLog, MistakeMemory};

use crate::error::{OrchestratorError, Result};
use crate::journal::{CommitIntent, CommitJournal, CommitMode};

/// Outcome recorded for every reviewed submission.
pub const REVIEW_OUTCOME: &str = "Needs analysis";

/// Message for a submission without title or code.
pub const MISSING_INPUT_MESSAGE: &str = "Please provide both a problem title and your code.";

/// Pipeline states, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Diagnose,
    Retrieve,
    BuildContext,
    Feedback,
    Commit,
    Done,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Diagnose => "diagnose",
            Self::Retrieve => "retrieve",
            Self::BuildContext => "build_context",
            Self::Feedback => "feedback",
            Self::Commit => "commit",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// A learner's code submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub problem_title: String,
    pub language: String,
    pub code: String,
}

impl Submission {
    pub fn new(
        problem_title: impl Into<String>,
        language: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self {
            problem_title: problem_title.into(),
            language: language.into(),
            code: code.into(),
        }
    }

    /// Reject submissions without a title or without code.
    pub fn validate(&self) -> Result<()> {
        if self.problem_title.trim().is_empty() || self.code.trim().is_empty() {
            return Err(OrchestratorError::InvalidSubmission(MISSING_INPUT_MESSAGE.to_string()));
        }
        Ok(())
    }

    /// Diagnosis prompt for this submission.
    pub fn prompt(&self) -> String {
        format_submission(self.problem_title.trim(), &self.language, &self.code)
    }
}

/// What the commit did to the memory log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitAction {
    Created,
    Updated { fix_attempts: u32 },
}

/// Result of one review.
#[derive(Debug, Clone)]
pub struct MentorReport {
    /// Learner-facing feedback, exactly as generated.
    pub feedback: String,
    pub diagnosis: DiagnosisOutcome,
    pub memory_id: String,
    pub vector_id: String,
    pub action: CommitAction,
    /// Set when a retrieval query failed and was skipped.
    pub retrieval_degraded: bool,
}

/// The mentoring pipeline and the stores it commits to.
pub struct MentorPipeline {
    completions: Arc<dyn CompletionService>,
    model: ModelConfig,
    index: SemanticIndex,
    retriever: Retriever,
    context: ContextBuilder,
    log: MemoryLog,
    journal: CommitJournal,
    /// Serializes commits so concurrent reviews of one title cannot lose
    /// updates or reuse a vector ordinal.
    commit_lock: Mutex<()>,
}

impl MentorPipeline {
    pub fn new(
        completions: Arc<dyn CompletionService>,
        model: ModelConfig,
        index: SemanticIndex,
        log: MemoryLog,
        journal: CommitJournal,
    ) -> Self {
        let context = ContextBuilder::new(index.metric());
        Self {
            completions,
            model,
            retriever: Retriever::new(index.clone()),
            index,
            context,
            log,
            journal,
            commit_lock: Mutex::new(()),
        }
    }

    /// Replace the retriever, e.g. to change `top_k`.
    pub fn with_retriever(mut self, retriever: Retriever) -> Self {
        self.retriever = retriever;
        self
    }

    pub fn with_context_builder(mut self, context: ContextBuilder) -> Self {
        self.context = context;
        self
    }

    pub fn model(&self) -> &ModelConfig {
        &self.model
    }

    pub fn index(&self) -> &SemanticIndex {
        &self.index
    }

    pub fn log(&self) -> &MemoryLog {
        &self.log
    }

    pub fn journal(&self) -> &CommitJournal {
        &self.journal
    }

    /// Review a submission and commit what was learned from it.
    pub async fn review(&self, submission: &Submission) -> Result<MentorReport> {
        submission.validate()?;
        let title = submission.problem_title.trim();
        info!(problem_title = %title, language = %submission.language, "Reviewing submission");

        enter(PipelineState::Diagnose);
        let outcome = diagnose(self.completions.as_ref(), &self.model, &submission.prompt()).await?;
        let diagnosis = outcome.diagnosis();

        enter(PipelineState::Retrieve);
        let retrieved = self.retriever.retrieve(&diagnosis.mistake_summary).await;

        enter(PipelineState::BuildContext);
        let context = self.context.build(&retrieved, &diagnosis.mistake_summary);

        enter(PipelineState::Feedback);
        let feedback = generate_feedback(self.completions.as_ref(), &self.model, &context).await?;

        enter(PipelineState::Commit);
        let (memory_id, vector_id, action) = self.commit(title, &submission.code, &diagnosis).await?;

        enter(PipelineState::Done);
        Ok(MentorReport {
            feedback,
            diagnosis: outcome,
            memory_id,
            vector_id,
            action,
            retrieval_degraded: retrieved.degraded,
        })
    }

    /// Record a diagnosis in both stores.
    ///
    /// A title already in the log is updated (one memory per problem);
    /// otherwise a new memory is created. Each submission still adds its own
    /// learner vector record, linked to the memory by `memory_id`.
    async fn commit(
        &self,
        title: &str,
        code: &str,
        diagnosis: &Diagnosis,
    ) -> Result<(String, String, CommitAction)> {
        let _guard = self.commit_lock.lock().await;

        let patterns = diagnosis.issue_types();
        let existing = self
            .log
            .find_by_title(title)
            .and_then(|id| self.log.get(&id));

        let (memory, mode) = match existing {
            Some(current) => (
                MistakeMemory::with_id(
                    current.memory_id.clone(),
                    title,
                    code,
                    REVIEW_OUTCOME,
                    patterns,
                    diagnosis.mistake_summary.clone(),
                ),
                CommitMode::Update {
                    expected_fix_attempts: current.fix_attempts + 1,
                },
            ),
            None => (
                MistakeMemory::new(title, code, REVIEW_OUTCOME, patterns, diagnosis.mistake_summary.clone()),
                CommitMode::Create,
            ),
        };

        let ordinal = self.index.count(Corpus::LearnerMemories).await?;
        let vector_id = format!("{}_{}", title, ordinal);
        let document = format!(
            "Problem: {}\nMistake Summary: {}\nIssues: {}",
            title,
            diagnosis.mistake_summary,
            diagnosis.issues_line()
        );
        let record = self
            .index
            .prepare(
                Document::new(vector_id.clone(), document)
                    .with_metadata(META_MEMORY_ID, memory.memory_id.clone().into())
                    .with_metadata(META_PROBLEM_TITLE, title.into()),
            )
            .await?;

        let memory_id = memory.memory_id.clone();
        let intent = CommitIntent::new(memory, mode.clone(), record);
        self.journal.begin(&intent)?;
        self.journal.apply(intent, &self.log, &self.index).await?;

        let action = match mode {
            CommitMode::Create => CommitAction::Created,
            CommitMode::Update { .. } => CommitAction::Updated {
                fix_attempts: self.log.get(&memory_id).map_or(0, |m| m.fix_attempts),
            },
        };
        Ok((memory_id, vector_id, action))
    }

    /// Replay commits left unfinished by an earlier crash.
    pub async fn recover(&self) -> Result<usize> {
        let _guard = self.commit_lock.lock().await;
        self.journal.recover(&self.log, &self.index).await
    }
}

fn enter(state: PipelineState) {
    debug!(state = %state, "Pipeline state");
}

/// Bulk-load the expert corpus from a dataset file.
///
/// Returns the number of documents written. Ids are positional, so
/// reloading the same file replaces rather than duplicates.
pub async fn load_expert_corpus(index: &SemanticIndex, dataset: &Path) -> Result<usize> {
    let problems = load_dataset(dataset)?;
    let documents = problems
        .iter()
        .enumerate()
        .map(|(i, p)| p.to_document(i))
        .collect();
    let count = index.add_documents(Corpus::ExpertSolutions, documents).await?;
    info!(count, dataset = %dataset.display(), "Loaded expert corpus");
    Ok(count)
}
