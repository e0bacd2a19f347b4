//! Search result models.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single ranked search hit.
///
/// `score` is cosine similarity recomputed locally against the stored
/// embedding, in `[-1, 1]`; it is not necessarily identical to the
/// engine's own score for the same point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagSearchResult {
    pub id: Uuid,
    pub content: String,
    pub url: String,
    pub title: String,
    pub score: f32,
}
