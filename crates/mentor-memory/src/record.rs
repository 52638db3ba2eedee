//! Data model for the vector index.
//!
//! A [`VectorRecord`] pairs a document with the embedding computed from it.
//! Both fields are fixed at construction so the two can never drift apart;
//! changing the text means building a new record.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Metadata key linking a learner vector record to its memory log entry.
pub const META_MEMORY_ID: &str = "memory_id";

/// Metadata key holding the problem title.
pub const META_PROBLEM_TITLE: &str = "problem_title";

/// One of the two independent collections in the index.
///
/// Learner history only ranks against itself and expert material only
/// ranks against itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Corpus {
    /// The learner's own past mistakes.
    LearnerMemories,
    /// Curated expert solutions and explanations.
    ExpertSolutions,
}

impl Corpus {
    /// All corpora, in a fixed order.
    pub const ALL: [Corpus; 2] = [Corpus::LearnerMemories, Corpus::ExpertSolutions];

    /// Collection name used by storage backends.
    pub fn collection_name(&self) -> &'static str {
        match self {
            Self::LearnerMemories => "mentor_memory",
            Self::ExpertSolutions => "expert_solutions",
        }
    }
}

impl fmt::Display for Corpus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.collection_name())
    }
}

/// A document and its embedding, stored in one corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    id: String,
    document: String,
    embedding: Vec<f32>,
    #[serde(default)]
    metadata: HashMap<String, serde_json::Value>,
}

impl VectorRecord {
    /// Create a record. `embedding` must have been computed from `document`.
    pub fn new(id: impl Into<String>, document: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            document: document.into(),
            embedding,
            metadata: HashMap::new(),
        }
    }

    /// Add metadata to the record.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn document(&self) -> &str {
        &self.document
    }

    pub fn embedding(&self) -> &[f32] {
        &self.embedding
    }

    pub fn metadata(&self) -> &HashMap<String, serde_json::Value> {
        &self.metadata
    }

    /// Get a metadata value as a string.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(|v| v.as_str())
    }
}

/// A single query result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryHit {
    pub id: String,
    pub document: String,
    /// Dissimilarity to the query; smaller is more similar.
    pub distance: f32,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl QueryHit {
    /// Build a hit from a stored record.
    pub fn from_record(record: &VectorRecord, distance: f32) -> Self {
        Self {
            id: record.id.clone(),
            document: record.document.clone(),
            distance,
            metadata: record.metadata.clone(),
        }
    }

    /// Get a metadata value as a string.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(|v| v.as_str())
    }
}

/// Distance metric used by an index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// `1 - cosine_similarity`, in [0, 2].
    #[default]
    Cosine,
    /// Squared Euclidean distance, unbounded.
    SquaredL2,
}

impl DistanceMetric {
    /// Distance between two vectors under this metric.
    ///
    /// Vectors of different length are maximally distant.
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Self::Cosine => 1.0 - crate::embedding::cosine_similarity(a, b),
            Self::SquaredL2 => {
                if a.len() != b.len() {
                    return f32::INFINITY;
                }
                a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
            }
        }
    }

    /// Convert a distance to a `[0, 1]` similarity for display.
    ///
    /// Only defined for the cosine metric when the distance itself lies in
    /// `[0, 1]`; everything else returns `None` and callers fall back to
    /// showing the rank.
    pub fn display_similarity(&self, distance: f32) -> Option<f32> {
        match self {
            Self::Cosine if (0.0..=1.0).contains(&distance) => Some(1.0 - distance),
            _ => None,
        }
    }
}
