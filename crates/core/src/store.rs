use crate::embeddings::Embedder;
use crate::error::{EmbedError, IngestError, QueryError, StoreError};
use crate::models::{DocumentChunk, DocumentFingerprint, IndexRecord, ScoredChunk};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

const INDEX_FILE: &str = "index.json";

pub const DEFAULT_TOP_K: usize = 4;

/// Persistent vector index: a directory holding one JSON file of
/// [`IndexRecord`]s. Repeated builds against the same location accumulate.
pub struct VectorStore {
    location: PathBuf,
    records: Vec<IndexRecord>,
}

impl VectorStore {
    /// Reopen an existing index without re-embedding anything. A location
    /// with no index file loads as an empty store.
    pub fn load(location: &Path) -> Result<Self, StoreError> {
        let index_path = location.join(INDEX_FILE);
        if !index_path.exists() {
            return Ok(Self {
                location: location.to_path_buf(),
                records: Vec::new(),
            });
        }

        let raw = fs::read_to_string(&index_path)?;
        let records = serde_json::from_str(&raw).map_err(|error| StoreError::Corrupt {
            path: index_path.display().to_string(),
            details: error.to_string(),
        })?;

        Ok(Self {
            location: location.to_path_buf(),
            records,
        })
    }

    /// Embed `chunks` and append the resulting records to whatever is
    /// already persisted at `location`, then write the index back out.
    pub async fn build(
        chunks: &[DocumentChunk],
        embedder: &dyn Embedder,
        location: &Path,
        fingerprint: &DocumentFingerprint,
    ) -> Result<Self, IngestError> {
        let mut store = Self::load(location)?;

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let embeddings = embedder.embed_batch(&texts).await?;

        if embeddings.len() != chunks.len() {
            return Err(IngestError::Embed(EmbedError::BackendResponse {
                backend: "embeddings".to_string(),
                details: format!(
                    "embedding count {} doesn't match chunk count {}",
                    embeddings.len(),
                    chunks.len()
                ),
            }));
        }

        for (chunk, embedding) in chunks.iter().zip(embeddings) {
            store.records.push(IndexRecord {
                record_id: Uuid::new_v4().to_string(),
                source_path: fingerprint.source_path.clone(),
                source_checksum: fingerprint.checksum.clone(),
                chunk_index: chunk.index,
                text: chunk.text.clone(),
                embedding,
                ingested_at: fingerprint.ingested_at,
            });
        }

        store.persist()?;
        Ok(store)
    }

    fn persist(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.location)?;
        let payload = serde_json::to_string(&self.records)?;

        // Write through a temp file so a crash never leaves a torn index.
        let tmp_path = self.location.join(format!("{INDEX_FILE}.tmp"));
        fs::write(&tmp_path, payload)?;
        fs::rename(&tmp_path, self.location.join(INDEX_FILE))?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Wrap the store in a retriever that embeds queries with `embedder`
    /// and answers with the `top_k` most similar chunks by cosine distance.
    pub fn into_retriever(self, embedder: Arc<dyn Embedder>, top_k: usize) -> Retriever {
        Retriever {
            store: self,
            embedder,
            top_k,
        }
    }
}

/// Maps a query to its top-k nearest stored chunks by vector similarity.
pub struct Retriever {
    store: VectorStore,
    embedder: Arc<dyn Embedder>,
    top_k: usize,
}

impl Retriever {
    pub async fn retrieve(&self, query: &str) -> Result<Vec<ScoredChunk>, QueryError> {
        let query_vector = self.embedder.embed_query(query).await?;

        let mut hits: Vec<ScoredChunk> = self
            .store
            .records
            .iter()
            .map(|record| ScoredChunk {
                text: record.text.clone(),
                source_path: record.source_path.clone(),
                score: cosine_similarity(&query_vector, &record.embedding),
            })
            .collect();

        hits.sort_by(|left, right| right.score.total_cmp(&left.score));
        hits.truncate(self.top_k);
        Ok(hits)
    }
}

fn cosine_similarity(left: &[f32], right: &[f32]) -> f32 {
    if left.len() != right.len() || left.is_empty() {
        return 0.0;
    }

    let dot: f32 = left.iter().zip(right).map(|(a, b)| a * b).sum();
    let left_norm: f32 = left.iter().map(|value| value * value).sum::<f32>().sqrt();
    let right_norm: f32 = right.iter().map(|value| value * value).sum::<f32>().sqrt();

    if left_norm < f32::EPSILON || right_norm < f32::EPSILON {
        return 0.0;
    }

    dot / (left_norm * right_norm)
}

#[cfg(test)]
mod tests {
    use super::{cosine_similarity, VectorStore};
    use crate::embeddings::{Embedder, HashEmbedder};
    use crate::models::{DocumentChunk, DocumentFingerprint};
    use chrono::Utc;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn fingerprint(source: &str) -> DocumentFingerprint {
        DocumentFingerprint {
            source_path: source.to_string(),
            checksum: "checksum".to_string(),
            ingested_at: Utc::now(),
        }
    }

    fn chunks(texts: &[&str]) -> Vec<DocumentChunk> {
        texts
            .iter()
            .enumerate()
            .map(|(index, text)| DocumentChunk {
                index,
                text: (*text).to_string(),
            })
            .collect()
    }

    #[test]
    fn cosine_of_identical_vectors_is_one() {
        let vector = [0.3f32, 0.4, 0.5];
        assert!((cosine_similarity(&vector, &vector) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_handles_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[tokio::test]
    async fn build_then_load_round_trips() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let embedder = HashEmbedder::default();

        let built = VectorStore::build(
            &chunks(&["pump maintenance", "valve clearances"]),
            &embedder,
            dir.path(),
            &fingerprint("/tmp/manual.txt"),
        )
        .await?;
        assert_eq!(built.len(), 2);

        let loaded = VectorStore::load(dir.path())?;
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.records[0].text, "pump maintenance");
        assert_eq!(
            loaded.records[0].embedding.len(),
            embedder.dimensions()
        );
        Ok(())
    }

    #[tokio::test]
    async fn repeated_builds_accumulate() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let embedder = HashEmbedder::default();

        VectorStore::build(
            &chunks(&["first document"]),
            &embedder,
            dir.path(),
            &fingerprint("/tmp/first.txt"),
        )
        .await?;
        let second = VectorStore::build(
            &chunks(&["second document"]),
            &embedder,
            dir.path(),
            &fingerprint("/tmp/second.txt"),
        )
        .await?;

        assert_eq!(second.len(), 2);
        Ok(())
    }

    #[test]
    fn missing_index_loads_empty() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let store = VectorStore::load(dir.path())?;
        assert!(store.is_empty());
        Ok(())
    }

    #[test]
    fn corrupt_index_is_an_error() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        std::fs::write(dir.path().join("index.json"), "{not json")?;
        assert!(VectorStore::load(dir.path()).is_err());
        Ok(())
    }

    #[tokio::test]
    async fn retriever_ranks_the_matching_chunk_first() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let embedder = HashEmbedder::default();

        let store = VectorStore::build(
            &chunks(&[
                "hydraulic pump pressure limits and relief settings",
                "cafeteria opening hours and menu rotation",
                "hydraulic pump impeller replacement procedure",
            ]),
            &embedder,
            dir.path(),
            &fingerprint("/tmp/manual.txt"),
        )
        .await?;

        let retriever = store.into_retriever(Arc::new(embedder), 2);
        let hits = retriever.retrieve("hydraulic pump pressure").await?;

        assert_eq!(hits.len(), 2);
        assert!(hits[0].score >= hits[1].score);
        assert!(hits[0].text.contains("hydraulic pump"));
        Ok(())
    }
}
