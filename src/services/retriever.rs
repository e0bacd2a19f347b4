//! Read path: full-collection scrolls and query-time retrieval.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::RetrieveError;
use crate::models::{DocumentVector, SearchConfig};
use crate::services::embedding::Embedder;
use crate::services::vector_store::VectorIndex;
use crate::utils::load::LoadProbe;

/// Retrieval over a [`VectorIndex`] with load-adaptive sizing.
pub struct Retriever {
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
    probe: Arc<dyn LoadProbe>,
    config: SearchConfig,
}

impl Retriever {
    pub fn new(
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn Embedder>,
        probe: Arc<dyn LoadProbe>,
        config: SearchConfig,
    ) -> Self {
        Self {
            index,
            embedder,
            probe,
            config,
        }
    }

    /// Everything in the collection, paginated. Stops when the engine
    /// reports exhaustion or the absolute safety cap is reached.
    pub async fn retrieve_all(&self) -> Result<Vec<DocumentVector>, RetrieveError> {
        let limit = self.scroll_limit();
        let cap = self.config.max_top_k as usize * 100;
        debug!(limit, cap, "scrolling full collection");

        let mut documents = Vec::new();
        let mut cursor = None;

        loop {
            let page = self.index.scroll(limit, cursor).await?;
            let exhausted = page.documents.is_empty();
            documents.extend(page.documents);

            if documents.len() >= cap {
                info!(count = documents.len(), "reached retrieval cap, stopping scroll");
                documents.truncate(cap);
                break;
            }

            match page.next {
                Some(next) if !exhausted => cursor = Some(next),
                _ => break,
            }
        }

        Ok(documents)
    }

    /// Top candidates for a query, already nearest-neighbor filtered by
    /// the engine. Embedding failure propagates; an empty result set is
    /// a valid success.
    pub async fn retrieve_by_query(
        &self,
        query: &str,
    ) -> Result<Vec<DocumentVector>, RetrieveError> {
        let embedding = self.embedder.embed(query).await?;

        let top_k = self.adaptive_top_k();
        debug!(top_k, "searching nearest neighbors");

        let scored = self.index.nearest(&embedding, u64::from(top_k)).await?;
        Ok(scored.into_iter().map(|hit| hit.document).collect())
    }

    fn adaptive_top_k(&self) -> u32 {
        let sample = self.probe.sample();
        if sample.under_load() {
            warn!(
                cpu = sample.cpu_percent,
                memory = sample.memory_percent,
                "system under load, reducing top-k"
            );
            (self.config.default_top_k / 2).max(3)
        } else {
            self.config.default_top_k
        }
    }

    fn scroll_limit(&self) -> u32 {
        let sample = self.probe.sample();
        if sample.under_load() {
            (self.config.default_top_k * 5).max(100)
        } else {
            self.config.default_top_k * 10
        }
    }
}
