//! Vector index with semantic search for the DSA mentor.
//!
//! Two independent corpora live in one index: the learner's own past
//! mistakes and a curated set of expert solutions. Each ranks only against
//! itself. Backends:
//!
//! - **LocalIndex**: File-based storage with brute-force search
//! - **QdrantIndex**: Qdrant vector database for larger collections
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use mentor_memory::{Corpus, Document, EmbeddingGenerator, LocalIndex, SemanticIndex};
//!
//! # async fn example() -> mentor_memory::Result<()> {
//! let index = LocalIndex::new("/tmp/mentor-vectors".into()).await?;
//! let semantic = SemanticIndex::new(Arc::new(index), Arc::new(EmbeddingGenerator::from_env()));
//!
//! semantic
//!     .add_documents(
//!         Corpus::ExpertSolutions,
//!         vec![Document::new("expert_0", "Two Sum: store seen values in a hash map")],
//!     )
//!     .await?;
//!
//! for hit in semantic.query_text(Corpus::ExpertSolutions, "nested loops are too slow", 3).await? {
//!     println!("{:.3} {}", hit.distance, hit.id);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Embedding Providers
//!
//! 1. **OpenAI** (set `OPENAI_API_KEY`): Uses `text-embedding-3-small`
//! 2. **OpenRouter** (set `OPENROUTER_API_KEY`): Uses `openai/text-embedding-3-small`
//! 3. **Hashed tokens** (no API key): local bag-of-words vectors

pub mod dataset;
pub mod embedding;
pub mod error;
pub mod local;
pub mod qdrant;
pub mod record;
pub mod semantic;
pub mod store;

pub use dataset::{load_dataset, ExpertSolution};
pub use embedding::{
    cosine_similarity, hashed_token_embedding, Embedder, EmbeddingGenerator, EmbeddingProvider,
    DEFAULT_EMBEDDING_DIM, HASHED_EMBEDDING_DIM,
};
pub use error::{MemoryError, Result};
pub use local::LocalIndex;
pub use qdrant::QdrantIndex;
pub use record::{Corpus, DistanceMetric, QueryHit, VectorRecord, META_MEMORY_ID, META_PROBLEM_TITLE};
pub use semantic::{Document, SemanticIndex};
pub use store::VectorIndex;

/// Open the vector index selected by the environment.
///
/// Uses Qdrant when `QDRANT_URL` is set, otherwise a [`LocalIndex`] in
/// `local_dir`.
pub async fn open_index(
    local_dir: std::path::PathBuf,
    dimension: usize,
) -> Result<std::sync::Arc<dyn VectorIndex>> {
    if std::env::var(qdrant::QDRANT_URL_ENV).is_ok() {
        tracing::info!("Using Qdrant vector index");
        return Ok(std::sync::Arc::new(QdrantIndex::from_env(dimension).await?));
    }
    tracing::info!(path = %local_dir.display(), "Using local vector index");
    Ok(std::sync::Arc::new(LocalIndex::new(local_dir).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_full_workflow() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let index = LocalIndex::new(temp_dir.path().to_path_buf()).await.unwrap();
        let semantic = SemanticIndex::new(Arc::new(index), Arc::new(EmbeddingGenerator::hashed(256)));

        let problems = vec![
            ExpertSolution {
                problem_title: "Two Sum".into(),
                optimized_explanation: "Store each value in a hash map and look up the complement.".into(),
                ..Default::default()
            },
            ExpertSolution {
                problem_title: "Valid Parentheses".into(),
                optimized_explanation: "Push opening brackets on a stack and pop on closing.".into(),
                ..Default::default()
            },
        ];
        let documents = problems
            .iter()
            .enumerate()
            .map(|(i, p)| p.to_document(i))
            .collect();
        semantic
            .add_documents(Corpus::ExpertSolutions, documents)
            .await
            .unwrap();

        let hits = semantic
            .query_text(Corpus::ExpertSolutions, "use a hash map for the complement", 3)
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].metadata_str(META_PROBLEM_TITLE), Some("Two Sum"));

        let learner = semantic
            .query_text(Corpus::LearnerMemories, "anything", 3)
            .await
            .unwrap();
        assert!(learner.is_empty());
    }
}
