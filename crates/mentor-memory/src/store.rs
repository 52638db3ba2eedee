//! VectorIndex trait definition for vector database backends.
//!
//! An index holds independent corpora of [`VectorRecord`]s. Records are
//! only ever added or replaced by id; nothing in the mentor deletes them.

use async_trait::async_trait;

use crate::error::Result;
use crate::record::{Corpus, DistanceMetric, QueryHit, VectorRecord};

/// Trait for vector index backends.
///
/// All operations are async to support both local and remote backends.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Add records to a corpus, replacing any record with the same id.
    ///
    /// Every record must carry an embedding of the corpus dimension.
    async fn upsert(&self, corpus: Corpus, records: Vec<VectorRecord>) -> Result<()>;

    /// Find the records nearest to `embedding`.
    ///
    /// # Returns
    /// At most `top_k` hits ordered by ascending distance. An empty corpus
    /// yields an empty list, not an error.
    async fn query(&self, corpus: Corpus, embedding: &[f32], top_k: usize)
        -> Result<Vec<QueryHit>>;

    /// Get a specific record by id.
    async fn get(&self, corpus: Corpus, id: &str) -> Result<Option<VectorRecord>>;

    /// Number of records in a corpus.
    async fn count(&self, corpus: Corpus) -> Result<usize>;

    /// Metric the distances in [`QueryHit`] are expressed in.
    fn metric(&self) -> DistanceMetric;
}
