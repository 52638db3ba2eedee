//! Text-level access to a vector index.
//!
//! [`SemanticIndex`] pairs an index with the one embedder allowed to write
//! to it. Records built here always carry the embedding of their own
//! document, and queries are embedded by the same model as the corpora.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::embedding::Embedder;
use crate::error::{MemoryError, Result};
use crate::record::{Corpus, DistanceMetric, QueryHit, VectorRecord};
use crate::store::VectorIndex;

/// A document waiting to be embedded and stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub text: String,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            metadata: HashMap::new(),
        }
    }

    /// Add metadata to the document.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    fn into_record(self, embedding: Vec<f32>) -> VectorRecord {
        self.metadata
            .into_iter()
            .fold(VectorRecord::new(self.id, self.text, embedding), |r, (k, v)| {
                r.with_metadata(k, v)
            })
    }
}

/// A vector index together with its embedder.
#[derive(Clone)]
pub struct SemanticIndex {
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
}

impl SemanticIndex {
    pub fn new(index: Arc<dyn VectorIndex>, embedder: Arc<dyn Embedder>) -> Self {
        Self { index, embedder }
    }

    /// The underlying index.
    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    /// The embedder every corpus in this index is embedded with.
    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    pub fn metric(&self) -> DistanceMetric {
        self.index.metric()
    }

    /// Embed a query or document text.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embedder.embed(text).await
    }

    /// Build a record for `document`, embedding its text.
    pub async fn prepare(&self, document: Document) -> Result<VectorRecord> {
        let embedding = self.embedder.embed(&document.text).await?;
        Ok(document.into_record(embedding))
    }

    /// Embed documents in one batch and upsert them into `corpus`.
    ///
    /// Returns the number of records written.
    pub async fn add_documents(&self, corpus: Corpus, documents: Vec<Document>) -> Result<usize> {
        if documents.is_empty() {
            return Ok(0);
        }
        let texts: Vec<&str> = documents.iter().map(|d| d.text.as_str()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != documents.len() {
            return Err(MemoryError::EmbeddingError(format!(
                "expected {} embeddings, got {}",
                documents.len(),
                embeddings.len()
            )));
        }

        let records: Vec<VectorRecord> = documents
            .into_iter()
            .zip(embeddings)
            .map(|(doc, embedding)| doc.into_record(embedding))
            .collect();
        let count = records.len();
        debug!(corpus = %corpus, count, model = %self.embedder.model_id(), "Adding documents");
        self.index.upsert(corpus, records).await?;
        Ok(count)
    }

    /// Query a corpus by text.
    pub async fn query_text(&self, corpus: Corpus, text: &str, top_k: usize) -> Result<Vec<QueryHit>> {
        let embedding = self.embedder.embed(text).await?;
        self.index.query(corpus, &embedding, top_k).await
    }

    /// Query a corpus with a precomputed embedding.
    pub async fn query_embedding(
        &self,
        corpus: Corpus,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<QueryHit>> {
        if embedding.len() != self.embedder.dimension() {
            return Err(MemoryError::DimensionMismatch {
                corpus: corpus.to_string(),
                expected: self.embedder.dimension(),
                actual: embedding.len(),
            });
        }
        self.index.query(corpus, embedding, top_k).await
    }

    pub async fn count(&self, corpus: Corpus) -> Result<usize> {
        self.index.count(corpus).await
    }

    pub async fn get(&self, corpus: Corpus, id: &str) -> Result<Option<VectorRecord>> {
        self.index.get(corpus, id).await
    }

    /// Upsert records that were prepared earlier by [`SemanticIndex::prepare`].
    pub async fn upsert(&self, corpus: Corpus, records: Vec<VectorRecord>) -> Result<()> {
        self.index.upsert(corpus, records).await
    }
}
