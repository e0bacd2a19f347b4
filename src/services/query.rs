//! Query-time pipeline: retrieve candidates, re-embed the query, and
//! re-rank locally.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::SearchError;
use crate::models::RagSearchResult;
use crate::services::embedding::Embedder;
use crate::services::retriever::Retriever;
use crate::utils::cosine_similarity;

/// Shortest query accepted.
pub const MIN_QUERY_LEN: usize = 3;

/// Longest query accepted.
pub const MAX_QUERY_LEN: usize = 512;

/// Answers search requests against the ingested index.
pub struct QueryPipeline {
    retriever: Retriever,
    embedder: Arc<dyn Embedder>,
}

impl QueryPipeline {
    pub fn new(retriever: Retriever, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            retriever,
            embedder,
        }
    }

    /// Top-`top_k` documents for `query`, descending by cosine
    /// similarity recomputed locally against each candidate's stored
    /// embedding. Candidates whose stored embedding is incomparable
    /// (missing or mismatched dimensions) score `0.0` and rank last.
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<RagSearchResult>, SearchError> {
        validate_query(query, top_k)?;
        debug!(query, top_k, "handling search request");

        let candidates = self.retriever.retrieve_by_query(query).await?;
        if candidates.is_empty() {
            info!("no candidate documents for query");
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query).await?;

        let mut results: Vec<RagSearchResult> = candidates
            .into_iter()
            .map(|document| RagSearchResult {
                id: document.metadata.id,
                score: cosine_similarity(&query_embedding, &document.embedding),
                content: document.metadata.content,
                url: document.metadata.url,
                title: document.metadata.title,
            })
            .collect();

        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(top_k);
        Ok(results)
    }
}

fn validate_query(query: &str, top_k: usize) -> Result<(), SearchError> {
    let length = query.trim().chars().count();
    if length < MIN_QUERY_LEN {
        return Err(SearchError::InvalidQuery(format!(
            "query must be at least {} characters",
            MIN_QUERY_LEN
        )));
    }
    if length > MAX_QUERY_LEN {
        return Err(SearchError::InvalidQuery(format!(
            "query must be at most {} characters",
            MAX_QUERY_LEN
        )));
    }
    if top_k == 0 {
        return Err(SearchError::InvalidTopK);
    }
    Ok(())
}
