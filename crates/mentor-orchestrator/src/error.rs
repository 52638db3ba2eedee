//! Error types for the orchestrator.

use thiserror::Error;

/// Orchestrator-specific errors.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Completion or stage error.
    #[error("Agent error: {0}")]
    Agent(#[from] mentor_agent::AgentError),

    /// Vector index or embedding error.
    #[error("Memory error: {0}")]
    Memory(#[from] mentor_memory::MemoryError),

    /// Memory log or journal error.
    #[error("Persistence error: {0}")]
    Persistence(#[from] mentor_persistence::PersistenceError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The submission cannot be reviewed.
    #[error("{0}")]
    InvalidSubmission(String),
}

/// Result type for orchestrator operations.
pub type Result<T> = std::result::Result<T, OrchestratorError>;
