mod config;
mod document;
mod job;
mod search;

pub use config::{
    Config, DEFAULT_COLLECTION, DEFAULT_EMBEDDING_ENDPOINT, DEFAULT_EMBEDDING_MODEL,
    DEFAULT_QDRANT_URL, EmbeddingConfig, FetcherConfig, JobsConfig, ScanConfig, SearchConfig,
    VectorStoreConfig,
};
pub use document::{DocumentContent, DocumentMetadata, DocumentVector, ScrapedDocument, SourceKind};
pub use job::{JobRecord, JobState};
pub use search::RagSearchResult;
