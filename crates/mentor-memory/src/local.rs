//! Local file-based vector index.
//!
//! Each corpus is persisted to its own JSON file and searched by brute
//! force, which is fine for the few thousand records a single learner and
//! a curated expert dataset produce. For larger collections use the Qdrant
//! backend.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{MemoryError, Result};
use crate::record::{Corpus, DistanceMetric, QueryHit, VectorRecord};
use crate::store::VectorIndex;

/// Local file-based vector index.
///
/// Records are cached in memory in insertion order; every write rewrites
/// the affected corpus file through a temp file and rename.
pub struct LocalIndex {
    storage_dir: PathBuf,
    metric: DistanceMetric,
    corpora: RwLock<HashMap<Corpus, Vec<VectorRecord>>>,
}

impl LocalIndex {
    /// Open (or create) an index in `storage_dir` using cosine distance.
    pub async fn new(storage_dir: PathBuf) -> Result<Self> {
        Self::with_metric(storage_dir, DistanceMetric::Cosine).await
    }

    /// Open (or create) an index with an explicit distance metric.
    pub async fn with_metric(storage_dir: PathBuf, metric: DistanceMetric) -> Result<Self> {
        std::fs::create_dir_all(&storage_dir)?;

        let index = Self {
            storage_dir,
            metric,
            corpora: RwLock::new(HashMap::new()),
        };

        index.load().await?;
        Ok(index)
    }

    fn data_file(&self, corpus: Corpus) -> PathBuf {
        self.storage_dir
            .join(format!("{}.json", corpus.collection_name()))
    }

    async fn load(&self) -> Result<()> {
        let mut corpora = self.corpora.write().await;
        for corpus in Corpus::ALL {
            let file = self.data_file(corpus);
            if !file.exists() {
                debug!(path = %file.display(), "No existing corpus file");
                continue;
            }

            let data = std::fs::read_to_string(&file)?;
            let records: Vec<VectorRecord> = if data.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&data).map_err(MemoryError::SerializationError)?
            };

            info!(corpus = %corpus, count = records.len(), "Loaded corpus from disk");
            corpora.insert(corpus, records);
        }
        Ok(())
    }

    fn save(&self, corpus: Corpus, records: &[VectorRecord]) -> Result<()> {
        let json = serde_json::to_string(records)?;

        let file = self.data_file(corpus);
        let temp_file = file.with_extension("json.tmp");
        std::fs::write(&temp_file, json)?;
        std::fs::rename(&temp_file, &file)?;

        debug!(corpus = %corpus, count = records.len(), "Saved corpus to disk");
        Ok(())
    }
}

fn check_dimension(corpus: Corpus, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(MemoryError::DimensionMismatch {
            corpus: corpus.to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}

#[async_trait]
impl VectorIndex for LocalIndex {
    async fn upsert(&self, corpus: Corpus, records: Vec<VectorRecord>) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut corpora = self.corpora.write().await;
        let stored = corpora.entry(corpus).or_default();

        let expected = stored
            .first()
            .map(|r| r.embedding().len())
            .unwrap_or_else(|| records[0].embedding().len());
        for record in &records {
            check_dimension(corpus, expected, record.embedding().len())?;
        }

        // Build the new state first so a failed save leaves the cache intact
        let mut updated = stored.clone();
        for record in records {
            debug!(corpus = %corpus, id = %record.id(), "Upserting vector record");
            match updated.iter_mut().find(|r| r.id() == record.id()) {
                Some(existing) => *existing = record,
                None => updated.push(record),
            }
        }

        self.save(corpus, &updated)?;
        *stored = updated;
        Ok(())
    }

    async fn query(
        &self,
        corpus: Corpus,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<QueryHit>> {
        let corpora = self.corpora.read().await;
        let Some(records) = corpora.get(&corpus).filter(|r| !r.is_empty()) else {
            return Ok(Vec::new());
        };
        if top_k == 0 {
            return Ok(Vec::new());
        }
        check_dimension(corpus, records[0].embedding().len(), embedding.len())?;

        let mut hits: Vec<QueryHit> = records
            .iter()
            .map(|r| QueryHit::from_record(r, self.metric.distance(embedding, r.embedding())))
            .collect();

        // Stable sort keeps insertion order among equal distances
        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(top_k);

        Ok(hits)
    }

    async fn get(&self, corpus: Corpus, id: &str) -> Result<Option<VectorRecord>> {
        let corpora = self.corpora.read().await;
        Ok(corpora
            .get(&corpus)
            .and_then(|records| records.iter().find(|r| r.id() == id))
            .cloned())
    }

    async fn count(&self, corpus: Corpus) -> Result<usize> {
        let corpora = self.corpora.read().await;
        Ok(corpora.get(&corpus).map_or(0, Vec::len))
    }

    fn metric(&self) -> DistanceMetric {
        self.metric
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_index() -> (LocalIndex, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let index = LocalIndex::new(temp_dir.path().to_path_buf()).await.unwrap();
        (index, temp_dir)
    }

    #[tokio::test]
    async fn test_query_empty_corpus() {
        let (index, _dir) = create_test_index().await;

        let hits = index
            .query(Corpus::LearnerMemories, &[1.0, 0.0, 0.0], 3)
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_query_orders_by_distance() {
        let (index, _dir) = create_test_index().await;

        index
            .upsert(
                Corpus::ExpertSolutions,
                vec![
                    VectorRecord::new("none", "no match", vec![0.0, 0.0, 1.0]),
                    VectorRecord::new("partial", "partial match", vec![0.7, 0.7, 0.0]),
                    VectorRecord::new("exact", "exact match", vec![1.0, 0.0, 0.0]),
                ],
            )
            .await
            .unwrap();

        let hits = index
            .query(Corpus::ExpertSolutions, &[1.0, 0.0, 0.0], 3)
            .await
            .unwrap();

        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].id, "exact");
        assert_eq!(hits[1].id, "partial");
        assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[tokio::test]
    async fn test_query_respects_top_k() {
        let (index, _dir) = create_test_index().await;
        let records = (0..5)
            .map(|i| VectorRecord::new(format!("r{}", i), "doc", vec![1.0, i as f32]))
            .collect();
        index.upsert(Corpus::LearnerMemories, records).await.unwrap();

        let hits = index
            .query(Corpus::LearnerMemories, &[1.0, 0.0], 3)
            .await
            .unwrap();
        assert_eq!(hits.len(), 3);
        assert!(index
            .query(Corpus::LearnerMemories, &[1.0, 0.0], 0)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_corpora_are_isolated() {
        let (index, _dir) = create_test_index().await;

        index
            .upsert(
                Corpus::LearnerMemories,
                vec![VectorRecord::new("mine", "my mistake", vec![1.0, 0.0])],
            )
            .await
            .unwrap();

        let expert_hits = index
            .query(Corpus::ExpertSolutions, &[1.0, 0.0], 3)
            .await
            .unwrap();
        assert!(expert_hits.is_empty());
        assert_eq!(index.count(Corpus::LearnerMemories).await.unwrap(), 1);
        assert_eq!(index.count(Corpus::ExpertSolutions).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_upsert_replaces_same_id() {
        let (index, _dir) = create_test_index().await;

        index
            .upsert(
                Corpus::LearnerMemories,
                vec![VectorRecord::new("a", "old", vec![1.0, 0.0])],
            )
            .await
            .unwrap();
        index
            .upsert(
                Corpus::LearnerMemories,
                vec![VectorRecord::new("a", "new", vec![0.0, 1.0])],
            )
            .await
            .unwrap();

        assert_eq!(index.count(Corpus::LearnerMemories).await.unwrap(), 1);
        let record = index.get(Corpus::LearnerMemories, "a").await.unwrap().unwrap();
        assert_eq!(record.document(), "new");
        assert_eq!(record.embedding(), [0.0f32, 1.0].as_slice());
    }

    #[tokio::test]
    async fn test_dimension_mismatch_rejected() {
        let (index, _dir) = create_test_index().await;

        index
            .upsert(
                Corpus::LearnerMemories,
                vec![VectorRecord::new("a", "doc", vec![1.0, 0.0])],
            )
            .await
            .unwrap();

        let result = index
            .upsert(
                Corpus::LearnerMemories,
                vec![VectorRecord::new("b", "doc", vec![1.0, 0.0, 0.0])],
            )
            .await;
        assert!(matches!(result, Err(MemoryError::DimensionMismatch { .. })));

        let result = index.query(Corpus::LearnerMemories, &[1.0], 1).await;
        assert!(matches!(result, Err(MemoryError::DimensionMismatch { .. })));
    }

    #[tokio::test]
    async fn test_persistence() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().to_path_buf();

        {
            let index = LocalIndex::new(path.clone()).await.unwrap();
            index
                .upsert(
                    Corpus::ExpertSolutions,
                    vec![VectorRecord::new("expert_0", "Two Sum", vec![0.1; 8])
                        .with_metadata("topic", serde_json::json!("arrays"))],
                )
                .await
                .unwrap();
        }

        {
            let index = LocalIndex::new(path).await.unwrap();
            let record = index
                .get(Corpus::ExpertSolutions, "expert_0")
                .await
                .unwrap()
                .unwrap();
            assert_eq!(record.document(), "Two Sum");
            assert_eq!(record.metadata_str("topic"), Some("arrays"));
        }
    }

    #[tokio::test]
    async fn test_l2_metric() {
        let temp_dir = TempDir::new().unwrap();
        let index = LocalIndex::with_metric(temp_dir.path().to_path_buf(), DistanceMetric::SquaredL2)
            .await
            .unwrap();
        index
            .upsert(
                Corpus::ExpertSolutions,
                vec![
                    VectorRecord::new("far", "far", vec![10.0, 0.0]),
                    VectorRecord::new("near", "near", vec![1.0, 1.0]),
                ],
            )
            .await
            .unwrap();

        let hits = index
            .query(Corpus::ExpertSolutions, &[1.0, 0.0], 2)
            .await
            .unwrap();
        assert_eq!(hits[0].id, "near");
        assert_eq!(hits[0].distance, 1.0);
        assert_eq!(index.metric(), DistanceMetric::SquaredL2);
    }
}
