//! Context builder.
//!
//! Merges the retrieved candidates and the current mistake summary into the
//! single text block handed to the feedback stage. Both lists keep retrieval
//! order so the most relevant entry survives if the model truncates input.

use mentor_memory::{DistanceMetric, QueryHit, META_PROBLEM_TITLE};

use crate::retrieval::Retrieved;

/// Default cap on learner memories shown.
pub const DEFAULT_TOP_N: usize = 3;

/// Default per-entry character budget for expert documents.
pub const DEFAULT_EXPERT_CHAR_BUDGET: usize = 1500;

const LEARNER_HEADER: &str = "Here are the user's most relevant past mistakes:";
const EXPERT_HEADER: &str = "Here are some relevant expert solutions from a trusted dataset:";
const NO_LEARNER: &str = "No similar past mistakes on record.";
const NO_EXPERT: &str = "No matching expert solutions found.";

/// Assembles the feedback context block.
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    top_n: usize,
    expert_char_budget: usize,
    metric: DistanceMetric,
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new(DistanceMetric::default())
    }
}

impl ContextBuilder {
    /// Builder for distances produced under `metric`.
    pub fn new(metric: DistanceMetric) -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            expert_char_budget: DEFAULT_EXPERT_CHAR_BUDGET,
            metric,
        }
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    pub fn with_expert_char_budget(mut self, budget: usize) -> Self {
        self.expert_char_budget = budget;
        self
    }

    /// Build the context block for `retrieved` and `mistake_summary`.
    pub fn build(&self, retrieved: &Retrieved, mistake_summary: &str) -> String {
        let mut context = String::new();

        context.push_str(LEARNER_HEADER);
        context.push_str("\n\n");
        let learner = self.learner_entries(&retrieved.learner);
        if learner.is_empty() {
            context.push_str(NO_LEARNER);
            context.push_str("\n\n");
        }
        let shown = learner.len();
        for (i, hit) in learner.into_iter().enumerate() {
            let rank = i + 1;
            let label = match self.metric.display_similarity(hit.distance) {
                Some(similarity) => format!("Memory {} (similarity: {:.2}):\n", rank, similarity),
                None => format!("Memory {} (rank {} of {}):\n", rank, rank, shown),
            };
            context.push_str(&label);
            context.push_str(&hit.document);
            context.push_str("\n\n");
        }

        context.push_str(EXPERT_HEADER);
        context.push_str("\n\n");
        if retrieved.expert.is_empty() {
            context.push_str(NO_EXPERT);
            context.push_str("\n\n");
        }
        for (i, hit) in retrieved.expert.iter().enumerate() {
            let title = hit.metadata_str(META_PROBLEM_TITLE).unwrap_or("Unknown");
            context.push_str(&format!("Expert Solution {}:\nProblem: {}\n", i + 1, title));
            context.push_str(truncate_chars(&hit.document, self.expert_char_budget));
            context.push_str("\n\n");
        }

        context.push_str("Use this information to tailor your feedback for the current problem.\n\n");
        context.push_str("User's current mistake summary:\n");
        context.push_str(mistake_summary);
        context
    }

    /// Learner hits capped at `top_n`, repeated documents shown once.
    fn learner_entries<'a>(&self, hits: &'a [QueryHit]) -> Vec<&'a QueryHit> {
        let mut entries: Vec<&QueryHit> = Vec::new();
        for hit in hits {
            if entries.len() == self.top_n {
                break;
            }
            if !entries.iter().any(|e| e.document == hit.document) {
                entries.push(hit);
            }
        }
        entries
    }
}

/// Longest prefix of `text` with at most `max_chars` characters.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
