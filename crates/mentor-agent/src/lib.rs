//! Model-facing stages of the DSA mentor.
//!
//! This crate holds the completion client and the four stages that turn a
//! submission into feedback:
//!
//! - [`diagnose`]: structured mistake extraction with a raw-text fallback
//! - [`Retriever`]: nearest learner memories and expert solutions
//! - [`ContextBuilder`]: one prompt-sized context block
//! - [`generate_feedback`]: mentor guidance that withholds the full solution
//!
//! Stages take their collaborators as arguments; nothing here holds global
//! client state.

pub mod client;
pub mod config;
pub mod context;
pub mod diagnosis;
pub mod error;
pub mod feedback;
pub mod prompts;
pub mod retrieval;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{ChatClient, ChatMessage, CompletionService};
pub use config::{ClientConfig, ModelConfig, Provider, DEFAULT_MODEL};
pub use context::ContextBuilder;
pub use diagnosis::{diagnose, parse_diagnosis, Diagnosis, DiagnosisOutcome, Issue};
pub use error::{AgentError, Result};
pub use feedback::generate_feedback;
pub use prompts::{format_submission, SYSTEM_PROMPT_DIAGNOSE, SYSTEM_PROMPT_FEEDBACK};
pub use retrieval::{Retrieved, Retriever, DEFAULT_TOP_K};
