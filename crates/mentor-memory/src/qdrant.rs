//! Qdrant vector database backend.
//!
//! Each corpus maps to its own Qdrant collection. Qdrant point ids must be
//! UUIDs or integers, so record ids are mapped to name-based UUIDs and the
//! original id travels in the payload.
//!
//! Requires a running Qdrant server (local or remote). For local
//! development without a server, see the `local` module.

use async_trait::async_trait;
use qdrant_client::qdrant::{
    CountPointsBuilder, CreateCollectionBuilder, Distance, GetPointsBuilder, PointStruct,
    SearchPointsBuilder, UpsertPointsBuilder, Value, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::error::{MemoryError, Result};
use crate::record::{Corpus, DistanceMetric, QueryHit, VectorRecord};
use crate::store::VectorIndex;

/// Environment variable selecting the Qdrant server.
pub const QDRANT_URL_ENV: &str = "QDRANT_URL";

/// Environment variable for the Qdrant API key.
pub const QDRANT_API_KEY_ENV: &str = "QDRANT_API_KEY";

const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";

/// Payload field names.
const FIELD_RECORD_ID: &str = "record_id";
const FIELD_DOCUMENT: &str = "document";
const FIELD_METADATA: &str = "metadata";

/// Qdrant-based vector index.
///
/// Collections are created with cosine distance. Qdrant reports cosine
/// similarity as its score, which is turned back into `1 - score` so hits
/// compare the same way as with the local backend.
pub struct QdrantIndex {
    client: Qdrant,
    dimension: usize,
}

impl QdrantIndex {
    /// Connect to the specified URL and make sure both collections exist.
    pub async fn new(url: &str, api_key: Option<&str>, dimension: usize) -> Result<Self> {
        let mut builder = Qdrant::from_url(url);
        if let Some(key) = api_key {
            builder = builder.api_key(key);
        }

        let client = builder
            .build()
            .map_err(|e| MemoryError::DatabaseError(e.to_string()))?;

        let index = Self { client, dimension };
        for corpus in Corpus::ALL {
            index.ensure_collection(corpus).await?;
        }
        Ok(index)
    }

    /// Create an index from environment variables.
    ///
    /// Uses:
    /// - QDRANT_URL (default: http://localhost:6334)
    /// - QDRANT_API_KEY (optional)
    pub async fn from_env(dimension: usize) -> Result<Self> {
        let url = std::env::var(QDRANT_URL_ENV).unwrap_or_else(|_| DEFAULT_QDRANT_URL.to_string());
        let api_key = std::env::var(QDRANT_API_KEY_ENV).ok();
        Self::new(&url, api_key.as_deref(), dimension).await
    }

    async fn ensure_collection(&self, corpus: Corpus) -> Result<()> {
        let name = corpus.collection_name();
        let collections = self
            .client
            .list_collections()
            .await
            .map_err(|e| MemoryError::DatabaseError(e.to_string()))?;

        let exists = collections.collections.iter().any(|c| c.name == name);

        if !exists {
            info!(collection = %name, "Creating Qdrant collection");
            self.client
                .create_collection(CreateCollectionBuilder::new(name).vectors_config(
                    VectorParamsBuilder::new(self.dimension as u64, Distance::Cosine),
                ))
                .await
                .map_err(|e| MemoryError::DatabaseError(e.to_string()))?;
        }

        Ok(())
    }

    fn record_to_point(record: &VectorRecord) -> Result<PointStruct> {
        let mut payload: HashMap<String, Value> = HashMap::new();
        payload.insert(FIELD_RECORD_ID.to_string(), record.id().to_string().into());
        payload.insert(FIELD_DOCUMENT.to_string(), record.document().to_string().into());
        payload.insert(
            FIELD_METADATA.to_string(),
            serde_json::to_string(record.metadata())?.into(),
        );

        Ok(PointStruct::new(
            point_uuid(record.id()),
            record.embedding().to_vec(),
            payload,
        ))
    }
}

/// Stable UUID for a record id.
fn point_uuid(record_id: &str) -> String {
    uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_OID, record_id.as_bytes()).to_string()
}

fn payload_str(payload: &HashMap<String, Value>, field: &str) -> Option<String> {
    payload.get(field)?.as_str().map(|s| s.to_string())
}

fn payload_metadata(payload: &HashMap<String, Value>) -> HashMap<String, serde_json::Value> {
    payload
        .get(FIELD_METADATA)
        .and_then(|v| v.as_str())
        .and_then(|s| serde_json::from_str(s).ok())
        .unwrap_or_default()
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn upsert(&self, corpus: Corpus, records: Vec<VectorRecord>) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let points = records
            .iter()
            .map(|r| {
                if r.embedding().len() != self.dimension {
                    return Err(MemoryError::DimensionMismatch {
                        corpus: corpus.to_string(),
                        expected: self.dimension,
                        actual: r.embedding().len(),
                    });
                }
                Self::record_to_point(r)
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(corpus = %corpus, count = points.len(), "Upserting points");
        self.client
            .upsert_points(UpsertPointsBuilder::new(corpus.collection_name(), points).wait(true))
            .await
            .map_err(|e| MemoryError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn query(
        &self,
        corpus: Corpus,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<QueryHit>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let results = self
            .client
            .search_points(
                SearchPointsBuilder::new(corpus.collection_name(), embedding.to_vec(), top_k as u64)
                    .with_payload(true),
            )
            .await
            .map_err(|e| MemoryError::DatabaseError(e.to_string()))?;

        let mut hits: Vec<QueryHit> = results
            .result
            .iter()
            .filter_map(|point| {
                Some(QueryHit {
                    id: payload_str(&point.payload, FIELD_RECORD_ID)?,
                    document: payload_str(&point.payload, FIELD_DOCUMENT)?,
                    distance: 1.0 - point.score,
                    metadata: payload_metadata(&point.payload),
                })
            })
            .collect();
        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(hits)
    }

    async fn get(&self, corpus: Corpus, id: &str) -> Result<Option<VectorRecord>> {
        let result = self
            .client
            .get_points(
                GetPointsBuilder::new(corpus.collection_name(), vec![point_uuid(id).into()])
                    .with_payload(true)
                    .with_vectors(true),
            )
            .await
            .map_err(|e| MemoryError::DatabaseError(e.to_string()))?;

        let Some(point) = result.result.first() else {
            return Ok(None);
        };

        let embedding = point
            .vectors
            .as_ref()
            .and_then(|v| match &v.vectors_options {
                Some(qdrant_client::qdrant::vectors_output::VectorsOptions::Vector(vec)) => {
                    #[allow(deprecated)]
                    Some(vec.data.clone())
                }
                _ => None,
            })
            .unwrap_or_default();
        let Some(document) = payload_str(&point.payload, FIELD_DOCUMENT) else {
            return Ok(None);
        };

        let record = payload_metadata(&point.payload)
            .into_iter()
            .fold(VectorRecord::new(id, document, embedding), |r, (k, v)| {
                r.with_metadata(k, v)
            });
        Ok(Some(record))
    }

    async fn count(&self, corpus: Corpus) -> Result<usize> {
        let result = self
            .client
            .count(CountPointsBuilder::new(corpus.collection_name()).exact(true))
            .await
            .map_err(|e| MemoryError::DatabaseError(e.to_string()))?;

        Ok(result.result.map(|r| r.count as usize).unwrap_or(0))
    }

    fn metric(&self) -> DistanceMetric {
        DistanceMetric::Cosine
    }
}

// Integration tests need a running Qdrant server; only the pure helpers
// are covered here.
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_uuid_is_stable() {
        assert_eq!(point_uuid("Two Sum_0"), point_uuid("Two Sum_0"));
        assert_ne!(point_uuid("Two Sum_0"), point_uuid("Two Sum_1"));
        assert!(uuid::Uuid::parse_str(&point_uuid("expert_3")).is_ok());
    }

    #[test]
    fn test_record_to_point_payload() {
        let record = VectorRecord::new("expert_0", "Problem: Two Sum", vec![0.5; 4])
            .with_metadata("topic", serde_json::json!("arrays"));
        let point = QdrantIndex::record_to_point(&record).unwrap();

        assert_eq!(
            payload_str(&point.payload, FIELD_RECORD_ID).as_deref(),
            Some("expert_0")
        );
        let metadata = payload_metadata(&point.payload);
        assert_eq!(metadata.get("topic"), Some(&serde_json::json!("arrays")));
    }
}
