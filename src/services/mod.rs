mod embedding;
mod extractor;
mod fetcher;
mod jobs;
mod query;
mod retriever;
mod scanner;
mod vector_store;

pub use embedding::{Embedder, EmbeddingClient};
pub use extractor::{extract_pages, html_text, html_title, pdf_pages};
pub use fetcher::{Fetcher, is_pdf_media_type};
pub use jobs::JobStore;
pub use query::{MAX_QUERY_LEN, MIN_QUERY_LEN, QueryPipeline};
pub use retriever::Retriever;
pub use scanner::{JobScheduler, MAX_URL_LEN, ScanJob, ScanService, TokioScheduler};
pub use vector_store::{
    DocumentStore, QdrantIndex, SaveOutcome, ScoredVector, ScrollCursor, ScrollPage, VectorIndex,
};
