use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const DEFAULT_EMBEDDING_ENDPOINT: &str = "http://localhost:11434/v1";
pub const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";
pub const DEFAULT_COLLECTION: &str = "ragscan_documents";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub vector_store: VectorStoreConfig,

    #[serde(default)]
    pub fetcher: FetcherConfig,

    #[serde(default)]
    pub jobs: JobsConfig,

    #[serde(default)]
    pub scan: ScanConfig,

    #[serde(default)]
    pub search: SearchConfig,
}

impl Config {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("ragscan").join("config.toml"))
    }

    /// Loads the configuration from disk, falling back to defaults.
    /// API keys can be supplied through the environment
    /// (`RAGSCAN_EMBEDDING_API_KEY`, `RAGSCAN_QDRANT_API_KEY`), which
    /// takes precedence over the file.
    pub fn load() -> Result<Self, crate::error::ConfigError> {
        dotenvy::dotenv().ok();

        let mut config = Self::default();
        if let Some(path) = Self::config_path()
            && path.exists()
        {
            let content = std::fs::read_to_string(&path)?;
            config = toml::from_str(&content)?;
        }

        if let Ok(key) = std::env::var("RAGSCAN_EMBEDDING_API_KEY") {
            config.embedding.api_key = Some(key);
        }
        if let Ok(key) = std::env::var("RAGSCAN_QDRANT_API_KEY") {
            config.vector_store.api_key = Some(key);
        }

        Ok(config)
    }

    pub fn save(&self) -> Result<(), crate::error::ConfigError> {
        let path = Self::config_path().ok_or_else(|| {
            crate::error::ConfigError::PathError("could not determine config directory".to_string())
        })?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Base URL of an OpenAI-compatible embedding API.
    #[serde(default = "default_embedding_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub api_key: Option<String>,

    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

fn default_embedding_endpoint() -> String {
    DEFAULT_EMBEDDING_ENDPOINT.to_string()
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_embedding_timeout() -> u64 {
    120
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoint: default_embedding_endpoint(),
            model: default_embedding_model(),
            api_key: None,
            timeout_secs: default_embedding_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    #[serde(default = "default_qdrant_url")]
    pub url: String,

    #[serde(default = "default_collection")]
    pub collection: String,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub api_key: Option<String>,

    /// Nearest-neighbor score at or above which a new vector is treated
    /// as a near-duplicate and not stored.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,
}

fn default_qdrant_url() -> String {
    DEFAULT_QDRANT_URL.to_string()
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_string()
}

fn default_similarity_threshold() -> f32 {
    0.95
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            url: default_qdrant_url(),
            collection: default_collection(),
            api_key: None,
            similarity_threshold: default_similarity_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetcherConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36"
        .to_string()
}

fn default_fetch_timeout() -> u64 {
    30
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_fetch_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct JobsConfig {
    /// Path of the SQLite job database. Defaults to the platform data
    /// directory when unset.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub path: Option<PathBuf>,
}

impl JobsConfig {
    pub fn resolved_path(&self) -> Option<PathBuf> {
        self.path
            .clone()
            .or_else(|| dirs::data_dir().map(|p| p.join("ragscan").join("jobs.db")))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Upper bound on concurrent embed+save page tasks within one job.
    #[serde(default = "default_max_concurrent_pages")]
    pub max_concurrent_pages: usize,
}

fn default_max_concurrent_pages() -> usize {
    8
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_concurrent_pages: default_max_concurrent_pages(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_top_k")]
    pub default_top_k: u32,

    #[serde(default = "default_max_top_k")]
    pub max_top_k: u32,
}

fn default_top_k() -> u32 {
    10
}

fn default_max_top_k() -> u32 {
    50
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_top_k: default_top_k(),
            max_top_k: default_max_top_k(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.embedding.endpoint, DEFAULT_EMBEDDING_ENDPOINT);
        assert_eq!(config.vector_store.url, DEFAULT_QDRANT_URL);
        assert_eq!(config.vector_store.collection, DEFAULT_COLLECTION);
        assert_eq!(config.vector_store.similarity_threshold, 0.95);
    }

    #[test]
    fn test_embedding_config_default() {
        let config = EmbeddingConfig::default();
        assert_eq!(config.model, DEFAULT_EMBEDDING_MODEL);
        assert_eq!(config.timeout_secs, 120);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_search_config_default() {
        let config = SearchConfig::default();
        assert_eq!(config.default_top_k, 10);
        assert_eq!(config.max_top_k, 50);
    }

    #[test]
    fn test_partial_toml_uses_field_defaults() {
        let config: Config = toml::from_str(
            r#"
            [vector_store]
            similarity_threshold = 0.8
            "#,
        )
        .unwrap();
        assert_eq!(config.vector_store.similarity_threshold, 0.8);
        assert_eq!(config.vector_store.url, DEFAULT_QDRANT_URL);
        assert_eq!(config.search.default_top_k, 10);
    }
}
