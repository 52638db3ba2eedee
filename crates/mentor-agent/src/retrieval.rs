//! Retrieval stage.
//!
//! Queries both corpora with the mistake summary. The expert query embeds
//! the summary explicitly and searches by vector, so it only depends on the
//! expert corpus having been embedded by the same model, not on how it was
//! loaded.

use mentor_memory::{Corpus, QueryHit, SemanticIndex};
use tracing::{debug, warn};

use crate::error::Result;

/// Default number of candidates per corpus.
pub const DEFAULT_TOP_K: usize = 3;

/// Ranked candidates from both corpora, most similar first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Retrieved {
    pub learner: Vec<QueryHit>,
    pub expert: Vec<QueryHit>,
    /// Set when a query failed and its list was left empty.
    pub degraded: bool,
}

/// Runs the two retrieval queries against a [`SemanticIndex`].
#[derive(Clone)]
pub struct Retriever {
    index: SemanticIndex,
    top_k: usize,
}

impl Retriever {
    pub fn new(index: SemanticIndex) -> Self {
        Self {
            index,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Past learner mistakes closest to `summary`.
    pub async fn learner_candidates(&self, summary: &str) -> Result<Vec<QueryHit>> {
        Ok(self
            .index
            .query_text(Corpus::LearnerMemories, summary, self.top_k)
            .await?)
    }

    /// Expert entries closest to `summary`.
    pub async fn expert_candidates(&self, summary: &str) -> Result<Vec<QueryHit>> {
        let embedding = self.index.embed(summary).await?;
        Ok(self
            .index
            .query_embedding(Corpus::ExpertSolutions, &embedding, self.top_k)
            .await?)
    }

    /// Query both corpora.
    ///
    /// A failing query leaves its list empty and marks the result degraded;
    /// the pipeline continues with whatever context is left.
    pub async fn retrieve(&self, summary: &str) -> Retrieved {
        let mut retrieved = Retrieved::default();

        match self.learner_candidates(summary).await {
            Ok(hits) => retrieved.learner = hits,
            Err(e) => {
                warn!(corpus = %Corpus::LearnerMemories, error = %e, "Retrieval failed, continuing without it");
                retrieved.degraded = true;
            }
        }
        match self.expert_candidates(summary).await {
            Ok(hits) => retrieved.expert = hits,
            Err(e) => {
                warn!(corpus = %Corpus::ExpertSolutions, error = %e, "Retrieval failed, continuing without it");
                retrieved.degraded = true;
            }
        }

        debug!(
            learner = retrieved.learner.len(),
            expert = retrieved.expert.len(),
            "Retrieval complete"
        );
        retrieved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mentor_memory::{Document, Embedder, EmbeddingGenerator, LocalIndex, MemoryError};
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn create_retriever() -> (Retriever, SemanticIndex, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let index = LocalIndex::new(temp_dir.path().to_path_buf()).await.unwrap();
        let semantic = SemanticIndex::new(Arc::new(index), Arc::new(EmbeddingGenerator::hashed(256)));
        (Retriever::new(semantic.clone()), semantic, temp_dir)
    }

    #[tokio::test]
    async fn test_empty_corpora_return_empty_lists() {
        let (retriever, _index, _dir) = create_retriever().await;
        let retrieved = retriever.retrieve("nested loops").await;
        assert!(retrieved.learner.is_empty());
        assert!(retrieved.expert.is_empty());
        assert!(!retrieved.degraded);
    }

    #[tokio::test]
    async fn test_corpora_are_queried_independently() {
        let (retriever, index, _dir) = create_retriever().await;
        index
            .add_documents(
                Corpus::ExpertSolutions,
                vec![
                    Document::new("expert_0", "hash map lookup of the complement"),
                    Document::new("expert_1", "stack for matching brackets"),
                    Document::new("expert_2", "binary search on sorted array"),
                    Document::new("expert_3", "sliding window over a string"),
                ],
            )
            .await
            .unwrap();
        index
            .add_documents(
                Corpus::LearnerMemories,
                vec![Document::new("Two Sum_0", "nested loops instead of hash map")],
            )
            .await
            .unwrap();

        let retrieved = retriever.retrieve("hash map complement").await;
        assert_eq!(retrieved.learner.len(), 1);
        assert_eq!(retrieved.expert.len(), 3);
        assert_eq!(retrieved.expert[0].id, "expert_0");
        assert!(retrieved
            .expert
            .windows(2)
            .all(|w| w[0].distance <= w[1].distance));
    }

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed(&self, _text: &str) -> mentor_memory::Result<Vec<f32>> {
            Err(MemoryError::EmbeddingError("service unavailable".into()))
        }

        async fn embed_batch(&self, _texts: &[&str]) -> mentor_memory::Result<Vec<Vec<f32>>> {
            Err(MemoryError::EmbeddingError("service unavailable".into()))
        }

        fn dimension(&self) -> usize {
            8
        }

        fn model_id(&self) -> String {
            "failing".into()
        }
    }

    #[tokio::test]
    async fn test_failures_degrade_to_empty() {
        let temp_dir = TempDir::new().unwrap();
        let index = LocalIndex::new(temp_dir.path().to_path_buf()).await.unwrap();
        let retriever = Retriever::new(SemanticIndex::new(Arc::new(index), Arc::new(FailingEmbedder)));

        let retrieved = retriever.retrieve("anything").await;
        assert!(retrieved.degraded);
        assert!(retrieved.learner.is_empty());
        assert!(retrieved.expert.is_empty());
    }
}
