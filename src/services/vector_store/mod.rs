//! Vector persistence.
//!
//! [`VectorIndex`] is the seam over the vector engine; [`QdrantIndex`]
//! is the production backend. [`DocumentStore`] layers the write policy
//! on top: collection lifecycle plus near-duplicate suppression.

mod qdrant;

pub use qdrant::QdrantIndex;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::VectorStoreError;
use crate::models::DocumentVector;

/// How many neighbors the near-duplicate probe inspects.
const DEDUP_PROBE_LIMIT: u64 = 5;

/// A stored vector paired with the engine's similarity score for a
/// search it matched.
#[derive(Debug, Clone)]
pub struct ScoredVector {
    pub document: DocumentVector,
    pub score: f32,
}

/// Opaque pagination cursor handed back by the engine. The engine
/// signals exhaustion by returning none.
pub type ScrollCursor = String;

/// One page of a full-collection scroll.
#[derive(Debug, Clone, Default)]
pub struct ScrollPage {
    pub documents: Vec<DocumentVector>,
    pub next: Option<ScrollCursor>,
}

/// Engine seam: the four operations the pipeline needs from a vector
/// database.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Creates the collection if absent, sized for `vector_size`
    /// dimensions with cosine distance. An "already exists" conflict
    /// from the engine counts as success.
    async fn ensure_collection(&self, vector_size: u64) -> Result<(), VectorStoreError>;

    /// Inserts one point under `document.metadata.id`.
    async fn upsert(&self, document: &DocumentVector) -> Result<(), VectorStoreError>;

    /// Top-`limit` nearest neighbors of `embedding`, best first.
    async fn nearest(
        &self,
        embedding: &[f32],
        limit: u64,
    ) -> Result<Vec<ScoredVector>, VectorStoreError>;

    /// One page of a full scroll; pass the previous page's cursor to
    /// continue.
    async fn scroll(
        &self,
        limit: u32,
        cursor: Option<ScrollCursor>,
    ) -> Result<ScrollPage, VectorStoreError>;
}

/// What [`DocumentStore::save`] did with a submitted vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// A new point was written.
    Stored,
    /// An existing neighbor was similar enough; nothing was written.
    SkippedDuplicate,
}

/// Write path over a [`VectorIndex`].
pub struct DocumentStore {
    index: Arc<dyn VectorIndex>,
    similarity_threshold: f32,
}

impl DocumentStore {
    pub fn new(index: Arc<dyn VectorIndex>, similarity_threshold: f32) -> Self {
        Self {
            index,
            similarity_threshold,
        }
    }

    /// Persists one document vector.
    ///
    /// Near-neighbor dedup rather than content hashing: re-scanned and
    /// overlapping pages are typically near- rather than byte-identical
    /// duplicates. The probe and the upsert are not atomic — two
    /// near-duplicates saved concurrently can both land; the cost is a
    /// redundant point, not corruption (see DESIGN.md).
    pub async fn save(&self, mut document: DocumentVector) -> Result<SaveOutcome, VectorStoreError> {
        let vector_size = document.embedding.len() as u64;
        self.index.ensure_collection(vector_size).await?;

        let neighbors = self
            .index
            .nearest(&document.embedding, DEDUP_PROBE_LIMIT)
            .await?;
        if let Some(best) = neighbors.first()
            && best.score >= self.similarity_threshold
        {
            info!(
                url = %document.metadata.url,
                score = best.score,
                "vector too similar to an existing point, skipping save"
            );
            return Ok(SaveOutcome::SkippedDuplicate);
        }

        document.metadata.id = Uuid::new_v4();
        self.index.upsert(&document).await?;
        debug!(
            url = %document.metadata.url,
            id = %document.metadata.id,
            "stored document vector"
        );
        Ok(SaveOutcome::Stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DocumentMetadata, SourceKind};
    use crate::utils::cosine_similarity;
    use chrono::Utc;
    use std::sync::Mutex;

    /// In-memory engine ranking neighbors by real cosine similarity.
    struct MemoryIndex {
        points: Mutex<Vec<DocumentVector>>,
    }

    impl MemoryIndex {
        fn new() -> Self {
            Self {
                points: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl VectorIndex for MemoryIndex {
        async fn ensure_collection(&self, _vector_size: u64) -> Result<(), VectorStoreError> {
            Ok(())
        }

        async fn upsert(&self, document: &DocumentVector) -> Result<(), VectorStoreError> {
            self.points.lock().unwrap().push(document.clone());
            Ok(())
        }

        async fn nearest(
            &self,
            embedding: &[f32],
            limit: u64,
        ) -> Result<Vec<ScoredVector>, VectorStoreError> {
            let mut scored: Vec<ScoredVector> = self
                .points
                .lock()
                .unwrap()
                .iter()
                .map(|document| ScoredVector {
                    score: cosine_similarity(embedding, &document.embedding),
                    document: document.clone(),
                })
                .collect();
            scored.sort_by(|a, b| b.score.total_cmp(&a.score));
            scored.truncate(limit as usize);
            Ok(scored)
        }

        async fn scroll(
            &self,
            limit: u32,
            cursor: Option<ScrollCursor>,
        ) -> Result<ScrollPage, VectorStoreError> {
            let points = self.points.lock().unwrap();
            let start: usize = cursor.map(|c| c.parse().unwrap_or(0)).unwrap_or(0);
            let end = (start + limit as usize).min(points.len());
            let documents = points[start..end].to_vec();
            let next = (end < points.len()).then(|| end.to_string());
            Ok(ScrollPage { documents, next })
        }
    }

    fn sample_vector(embedding: Vec<f32>) -> DocumentVector {
        DocumentVector {
            metadata: DocumentMetadata {
                id: Uuid::nil(),
                url: "http://example.com/a".to_string(),
                source_kind: SourceKind::Html,
                title: "A".to_string(),
                content: "content".to_string(),
                scraped_at: Utc::now(),
            },
            embedding,
        }
    }

    #[tokio::test]
    async fn test_first_save_stores() {
        let index = Arc::new(MemoryIndex::new());
        let store = DocumentStore::new(index.clone(), 0.95);

        let outcome = store.save(sample_vector(vec![1.0, 0.0])).await.unwrap();
        assert_eq!(outcome, SaveOutcome::Stored);
        assert_eq!(index.points.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_identical_second_save_is_skipped() {
        let index = Arc::new(MemoryIndex::new());
        let store = DocumentStore::new(index.clone(), 0.95);

        store.save(sample_vector(vec![1.0, 0.0])).await.unwrap();
        let outcome = store.save(sample_vector(vec![1.0, 0.0])).await.unwrap();

        assert_eq!(outcome, SaveOutcome::SkippedDuplicate);
        assert_eq!(index.points.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_dissimilar_save_stores_both() {
        let index = Arc::new(MemoryIndex::new());
        let store = DocumentStore::new(index.clone(), 0.95);

        store.save(sample_vector(vec![1.0, 0.0])).await.unwrap();
        let outcome = store.save(sample_vector(vec![0.0, 1.0])).await.unwrap();

        assert_eq!(outcome, SaveOutcome::Stored);
        assert_eq!(index.points.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_save_assigns_fresh_id() {
        let index = Arc::new(MemoryIndex::new());
        let store = DocumentStore::new(index.clone(), 0.95);

        store.save(sample_vector(vec![1.0, 0.0])).await.unwrap();
        let stored_id = index.points.lock().unwrap()[0].metadata.id;
        assert_ne!(stored_id, Uuid::nil());
    }

    #[tokio::test]
    async fn test_threshold_above_self_similarity_stores_again() {
        // A threshold the engine score can never reach disables dedup.
        let index = Arc::new(MemoryIndex::new());
        let store = DocumentStore::new(index.clone(), 1.01);

        store.save(sample_vector(vec![1.0, 0.0])).await.unwrap();
        let outcome = store.save(sample_vector(vec![1.0, 0.0])).await.unwrap();

        assert_eq!(outcome, SaveOutcome::Stored);
        assert_eq!(index.points.lock().unwrap().len(), 2);
    }
}
