//! Web and PDF ingestion pipeline with deduplicated vector storage and
//! semantic retrieval.
//!
//! The pipeline fetches arbitrary URLs, extracts plain text (one blob
//! per HTML page, one per PDF page), embeds each page through a remote
//! embedding model, and persists the vectors to Qdrant with
//! near-duplicate suppression. Ingestion runs as background jobs
//! tracked in a durable SQLite state machine; queries are answered by
//! nearest-neighbor retrieval followed by local cosine re-ranking.
//!
//! Transport, authentication, and the LLM chat layer are external
//! collaborators; this crate is the ingestion-and-retrieval core only.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod utils;

pub use error::AppError;
pub use models::{Config, JobRecord, JobState, RagSearchResult};
pub use pipeline::Pipeline;
pub use services::{QueryPipeline, ScanService};
