//! Error types for the ragscan pipeline.

use thiserror::Error;

/// Errors raised while fetching a URL.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Errors raised while extracting text from a fetched document.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("document carries no content bytes")]
    MissingBytes,

    #[error("document carries no text body")]
    MissingText,
}

/// Errors raised by the embedding client.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("failed to build embedding client: {0}")]
    Connection(String),

    #[error("embedding request failed with status {status}: {body}")]
    RequestFailed { status: u16, body: String },

    #[error("failed to decode embedding response: {0}")]
    DecodeFailed(String),

    #[error("embedding response contains no data")]
    Empty,

    #[error("embedding transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Errors raised by the vector engine.
#[derive(Debug, Error)]
pub enum VectorStoreError {
    #[error("failed to connect to vector engine: {0}")]
    Connection(String),

    #[error("collection error: {0}")]
    Collection(String),

    #[error("upsert error: {0}")]
    Upsert(String),

    #[error("search error: {0}")]
    Search(String),

    #[error("scroll error: {0}")]
    Scroll(String),
}

/// Errors raised on the retrieval path.
#[derive(Debug, Error)]
pub enum RetrieveError {
    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("vector store error: {0}")]
    VectorStore(#[from] VectorStoreError),
}

/// Errors raised by the job store.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("no URLs provided")]
    NoUrls,

    #[error("job store error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("failed to encode job record: {0}")]
    Encoding(String),
}

/// Errors raised when accepting a scan request.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("no URLs provided for scanning")]
    NoUrls,

    #[error("invalid URL `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("job error: {0}")]
    Job(#[from] JobError),
}

/// Errors raised when answering a search request.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("topK must be a positive integer")]
    InvalidTopK,

    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("retrieval error: {0}")]
    Retrieve(#[from] RetrieveError),
}

/// Errors related to configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    #[error("path error: {0}")]
    PathError(String),
}

/// Application-level errors that wrap domain errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("extraction error: {0}")]
    Extract(#[from] ExtractError),

    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("vector store error: {0}")]
    VectorStore(#[from] VectorStoreError),

    #[error("retrieval error: {0}")]
    Retrieve(#[from] RetrieveError),

    #[error("job error: {0}")]
    Job(#[from] JobError),

    #[error("scan error: {0}")]
    Scan(#[from] ScanError),

    #[error("search error: {0}")]
    Search(#[from] SearchError),
}
