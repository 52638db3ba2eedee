//! Orchestration layer for the DSA mentor.
//!
//! Wires the agent stages to the vector index and memory log, runs the
//! review pipeline, and keeps the two stores consistent through a commit
//! journal.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use mentor_agent::ChatClient;
//! use mentor_orchestrator::{MentorPipeline, Stores, Submission};
//!
//! # async fn example() -> mentor_orchestrator::Result<()> {
//! let stores = Stores::open().await?;
//! stores.recover().await?;
//! let client = ChatClient::from_env()?;
//! let model = client.config().model_config(None);
//! let pipeline = stores.into_pipeline(Arc::new(client), model);
//!
//! let report = pipeline
//!     .review(&Submission::new("Two Sum", "python", "for i in ...: for j in ...:"))
//!     .await?;
//! println!("{}", report.feedback);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod journal;
pub mod pipeline;

use std::sync::Arc;

use tracing::info;

use mentor_agent::{CompletionService, ModelConfig};
use mentor_memory::{open_index, Embedder, EmbeddingGenerator, SemanticIndex};
use mentor_persistence::MemoryLog;

pub use error::{OrchestratorError, Result};
pub use journal::{CommitIntent, CommitJournal, CommitMode, CommitStage};
pub use pipeline::{
    load_expert_corpus, CommitAction, MentorPipeline, MentorReport, PipelineState, Submission,
    MISSING_INPUT_MESSAGE, REVIEW_OUTCOME,
};

/// The stores a pipeline reads and commits to.
#[derive(Clone)]
pub struct Stores {
    pub index: SemanticIndex,
    pub log: MemoryLog,
    pub journal: CommitJournal,
}

impl Stores {
    /// Open the stores under the configured state directory.
    ///
    /// The embedder and vector backend are chosen from the environment.
    /// Call [`Stores::recover`] before committing to repair unfinished
    /// commits from an earlier run.
    pub async fn open() -> Result<Self> {
        mentor_core::config::ensure_all_dirs()
            .map_err(|e| OrchestratorError::Configuration(e.to_string()))?;

        let embedder: Arc<dyn Embedder> = Arc::new(EmbeddingGenerator::from_env());
        let index = open_index(mentor_core::config::vector_dir(), embedder.dimension()).await?;
        info!(model = %embedder.model_id(), "Opened vector index");

        Ok(Self {
            index: SemanticIndex::new(index, embedder),
            log: MemoryLog::new(mentor_core::config::memory_log_file()),
            journal: CommitJournal::new(mentor_core::config::journal_file()),
        })
    }

    /// Replay unfinished commits. Returns how many were repaired.
    pub async fn recover(&self) -> Result<usize> {
        self.journal.recover(&self.log, &self.index).await
    }

    /// Build a pipeline over these stores.
    pub fn into_pipeline(
        self,
        completions: Arc<dyn CompletionService>,
        model: ModelConfig,
    ) -> MentorPipeline {
        MentorPipeline::new(completions, model, self.index, self.log, self.journal)
    }
}
