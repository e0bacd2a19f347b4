//! Document models flowing through the ingestion pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Raw capture of one URL. Produced by the fetcher, consumed once by the
/// extractor, never persisted.
#[derive(Debug, Clone)]
pub struct ScrapedDocument {
    pub url: String,
    /// Raw body bytes; populated for PDFs, empty for HTML.
    pub content_bytes: Vec<u8>,
    /// Decoded body text; populated for HTML, `None` for PDFs.
    pub content_text: Option<String>,
    pub is_pdf: bool,
    pub scraped_at: DateTime<Utc>,
}

impl ScrapedDocument {
    pub fn source_kind(&self) -> SourceKind {
        if self.is_pdf {
            SourceKind::Pdf
        } else {
            SourceKind::Html
        }
    }
}

/// One extracted page of plain text. `index` is the 0-based page number
/// within the source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentContent {
    pub content: String,
    pub index: usize,
}

impl DocumentContent {
    pub fn new(content: impl Into<String>, index: usize) -> Self {
        Self {
            content: content.into(),
            index,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// Where a stored document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Html,
    Pdf,
}

impl std::str::FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "html" => Ok(SourceKind::Html),
            "pdf" => Ok(SourceKind::Pdf),
            _ => Err(format!("unknown source kind: {}", s)),
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Html => write!(f, "html"),
            SourceKind::Pdf => write!(f, "pdf"),
        }
    }
}

/// Payload stored alongside each vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Point id; assigned at persist time.
    pub id: Uuid,
    pub url: String,
    pub source_kind: SourceKind,
    pub title: String,
    pub content: String,
    pub scraped_at: DateTime<Utc>,
}

/// A document page paired with its embedding.
#[derive(Debug, Clone)]
pub struct DocumentVector {
    pub metadata: DocumentMetadata,
    pub embedding: Vec<f32>,
}
