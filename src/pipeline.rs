//! Wiring: builds the full ingestion and query pipeline from one
//! [`Config`].

use std::sync::Arc;

use crate::error::AppError;
use crate::models::Config;
use crate::services::{
    DocumentStore, Embedder, EmbeddingClient, Fetcher, JobStore, QdrantIndex, QueryPipeline,
    Retriever, ScanJob, ScanService, TokioScheduler, VectorIndex,
};
use crate::utils::load::{LoadProbe, SystemProbe};

/// The assembled pipeline. Construct once at startup and share.
pub struct Pipeline {
    pub scans: ScanService,
    pub queries: QueryPipeline,
    pub jobs: Arc<JobStore>,
}

impl Pipeline {
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let index: Arc<dyn VectorIndex> = Arc::new(QdrantIndex::new(&config.vector_store)?);
        let embedder: Arc<dyn Embedder> = Arc::new(EmbeddingClient::new(&config.embedding)?);
        let probe: Arc<dyn LoadProbe> = Arc::new(SystemProbe::new());
        let fetcher = Fetcher::new(&config.fetcher)?;

        let jobs = Arc::new(match config.jobs.resolved_path() {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)
                        .map_err(crate::error::ConfigError::IoError)?;
                }
                JobStore::open(&path)?
            }
            None => JobStore::open_in_memory()?,
        });

        let store = DocumentStore::new(
            Arc::clone(&index),
            config.vector_store.similarity_threshold,
        );
        let retriever = Retriever::new(
            Arc::clone(&index),
            Arc::clone(&embedder),
            Arc::clone(&probe),
            config.search.clone(),
        );

        let job = Arc::new(ScanJob::new(
            fetcher,
            Arc::clone(&embedder),
            store,
            Arc::clone(&jobs),
            probe,
            config.scan.clone(),
        ));

        Ok(Self {
            scans: ScanService::new(job, Arc::clone(&jobs), Arc::new(TokioScheduler)),
            queries: QueryPipeline::new(retriever, embedder),
            jobs,
        })
    }
}
