//! Scan orchestration.
//!
//! [`ScanJob`] drives one ingestion job end to end; [`ScanService`]
//! validates requests, allocates the job record, and hands the work to
//! a [`JobScheduler`] so the caller returns immediately.

use std::sync::Arc;

use futures_util::{StreamExt, stream};
use tracing::{error, info};
use url::Url;
use uuid::Uuid;

use crate::error::ScanError;
use crate::models::{
    DocumentContent, DocumentMetadata, DocumentVector, JobState, ScanConfig, ScrapedDocument,
};
use crate::services::embedding::Embedder;
use crate::services::extractor;
use crate::services::fetcher::Fetcher;
use crate::services::jobs::JobStore;
use crate::services::vector_store::{DocumentStore, SaveOutcome};
use crate::utils::load::LoadProbe;

/// Longest URL accepted in a scan request.
pub const MAX_URL_LEN: usize = 2048;

enum PageOutcome {
    Stored,
    Skipped,
    Failed,
}

/// One ingestion job: fetch, extract, embed, save, with every failure
/// scoped to a single URL or page.
pub struct ScanJob {
    fetcher: Fetcher,
    embedder: Arc<dyn Embedder>,
    store: DocumentStore,
    jobs: Arc<JobStore>,
    probe: Arc<dyn LoadProbe>,
    config: ScanConfig,
}

impl ScanJob {
    pub fn new(
        fetcher: Fetcher,
        embedder: Arc<dyn Embedder>,
        store: DocumentStore,
        jobs: Arc<JobStore>,
        probe: Arc<dyn LoadProbe>,
        config: ScanConfig,
    ) -> Self {
        Self {
            fetcher,
            embedder,
            store,
            jobs,
            probe,
            config,
        }
    }

    /// Drives one job end to end. The job fails only when nothing at
    /// all was fetched; page-level failures are tallied into the
    /// completion message instead.
    pub async fn process(&self, job_id: &str, urls: &[String]) {
        self.update(job_id, JobState::InProgress, Some("Processing"));

        let documents = self.fetcher.fetch_all(urls).await;
        if documents.is_empty() {
            self.update(job_id, JobState::Failed, Some("Nothing scraped."));
            return;
        }

        let pages = self.collect_pages(&documents);
        let concurrency = self.page_concurrency();

        let outcomes: Vec<PageOutcome> = stream::iter(pages)
            .map(|(index, page)| self.process_page(&documents[index], page))
            .buffer_unordered(concurrency)
            .collect()
            .await;

        let stored = outcomes
            .iter()
            .filter(|o| matches!(o, PageOutcome::Stored))
            .count();
        let skipped = outcomes
            .iter()
            .filter(|o| matches!(o, PageOutcome::Skipped))
            .count();
        let failed = outcomes
            .iter()
            .filter(|o| matches!(o, PageOutcome::Failed))
            .count();

        info!(job_id, stored, skipped, failed, "scan job finished");
        let message =
            format!("Completed: {stored} pages stored, {skipped} duplicates skipped, {failed} failed");
        self.update(job_id, JobState::Completed, Some(&message));
    }

    /// Extracts the non-blank pages of every document. An extraction
    /// failure aborts that one document, not its siblings.
    fn collect_pages(&self, documents: &[ScrapedDocument]) -> Vec<(usize, DocumentContent)> {
        let mut pages = Vec::new();
        for (index, document) in documents.iter().enumerate() {
            match extractor::extract_pages(document) {
                Ok(contents) => pages.extend(
                    contents
                        .into_iter()
                        .filter(|content| !content.is_blank())
                        .map(|content| (index, content)),
                ),
                Err(err) => {
                    error!(url = %document.url, error = %err, "content extraction failed")
                }
            }
        }
        pages
    }

    async fn process_page(
        &self,
        document: &ScrapedDocument,
        page: DocumentContent,
    ) -> PageOutcome {
        let embedding = match self.embedder.embed(&page.content).await {
            Ok(embedding) => embedding,
            Err(err) => {
                error!(url = %document.url, page = page.index, error = %err, "embedding failed");
                return PageOutcome::Failed;
            }
        };

        let metadata = DocumentMetadata {
            id: Uuid::nil(),
            url: document.url.clone(),
            source_kind: document.source_kind(),
            title: page_title(document, &page),
            content: page.content,
            scraped_at: document.scraped_at,
        };

        match self.store.save(DocumentVector { metadata, embedding }).await {
            Ok(SaveOutcome::Stored) => PageOutcome::Stored,
            Ok(SaveOutcome::SkippedDuplicate) => PageOutcome::Skipped,
            Err(err) => {
                error!(url = %document.url, page = page.index, error = %err, "save failed");
                PageOutcome::Failed
            }
        }
    }

    fn page_concurrency(&self) -> usize {
        let max = self.config.max_concurrent_pages.max(1);
        if self.probe.sample().under_load() {
            (max / 2).max(2).min(max)
        } else {
            max
        }
    }

    fn update(&self, job_id: &str, state: JobState, message: Option<&str>) {
        if let Err(err) = self.jobs.update_job(job_id, state, message) {
            error!(job_id, error = %err, "failed to update job status");
        }
    }
}

/// Page 0 of an HTML document is titled from its `<title>`; everything
/// else gets a synthesized page label.
fn page_title(document: &ScrapedDocument, page: &DocumentContent) -> String {
    if page.index == 0 && !document.is_pdf {
        document
            .content_text
            .as_deref()
            .map(extractor::html_title)
            .unwrap_or_else(|| "Untitled".to_string())
    } else {
        format!("Page {}", page.index + 1)
    }
}

/// Hands a created job to the background.
pub trait JobScheduler: Send + Sync {
    fn schedule(&self, job: Arc<ScanJob>, job_id: String, urls: Vec<String>);
}

/// Spawns jobs onto the tokio runtime, decoupled from the request that
/// created them.
pub struct TokioScheduler;

impl JobScheduler for TokioScheduler {
    fn schedule(&self, job: Arc<ScanJob>, job_id: String, urls: Vec<String>) {
        tokio::spawn(async move {
            job.process(&job_id, &urls).await;
        });
    }
}

/// Accepts scan requests.
pub struct ScanService {
    job: Arc<ScanJob>,
    jobs: Arc<JobStore>,
    scheduler: Arc<dyn JobScheduler>,
}

impl ScanService {
    pub fn new(job: Arc<ScanJob>, jobs: Arc<JobStore>, scheduler: Arc<dyn JobScheduler>) -> Self {
        Self {
            job,
            jobs,
            scheduler,
        }
    }

    /// Validates the request, creates the job record, and schedules the
    /// work. The returned job id acknowledges acceptance only — content
    /// success is reported through the job record.
    pub fn start_scan(&self, urls: &[String]) -> Result<String, ScanError> {
        validate_urls(urls)?;

        let job_id = self.jobs.create_job(urls)?;
        self.scheduler
            .schedule(Arc::clone(&self.job), job_id.clone(), urls.to_vec());
        Ok(job_id)
    }
}

/// Rejects bad requests before any I/O: the list must be non-empty and
/// every entry a length-bounded http(s) URL.
fn validate_urls(urls: &[String]) -> Result<(), ScanError> {
    if urls.is_empty() {
        return Err(ScanError::NoUrls);
    }

    for raw in urls {
        if raw.len() > MAX_URL_LEN {
            return Err(ScanError::InvalidUrl {
                url: raw.chars().take(64).collect(),
                reason: "exceeds maximum length".to_string(),
            });
        }

        let parsed = Url::parse(raw).map_err(|err| ScanError::InvalidUrl {
            url: raw.clone(),
            reason: err.to_string(),
        })?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ScanError::InvalidUrl {
                url: raw.clone(),
                reason: "only http and https URLs are supported".to_string(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn html_document(url: &str, html: &str) -> ScrapedDocument {
        ScrapedDocument {
            url: url.to_string(),
            content_bytes: Vec::new(),
            content_text: Some(html.to_string()),
            is_pdf: false,
            scraped_at: Utc::now(),
        }
    }

    #[test]
    fn test_validate_urls_rejects_empty_list() {
        assert!(matches!(validate_urls(&[]), Err(ScanError::NoUrls)));
    }

    #[test]
    fn test_validate_urls_rejects_bad_scheme() {
        let urls = vec!["ftp://example.com/file".to_string()];
        assert!(matches!(
            validate_urls(&urls),
            Err(ScanError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_validate_urls_rejects_unparsable() {
        let urls = vec!["not a url".to_string()];
        assert!(validate_urls(&urls).is_err());
    }

    #[test]
    fn test_validate_urls_rejects_overlong() {
        let urls = vec![format!("http://example.com/{}", "a".repeat(MAX_URL_LEN))];
        assert!(validate_urls(&urls).is_err());
    }

    #[test]
    fn test_validate_urls_accepts_http_and_https() {
        let urls = vec![
            "http://example.com/a".to_string(),
            "https://example.com/b?x=1".to_string(),
        ];
        assert!(validate_urls(&urls).is_ok());
    }

    #[test]
    fn test_page_title_html_first_page() {
        let document = html_document(
            "http://example.com",
            "<html><head><title>Docs</title></head><body></body></html>",
        );
        let title = page_title(&document, &DocumentContent::new("text", 0));
        assert_eq!(title, "Docs");
    }

    #[test]
    fn test_page_title_untitled_html() {
        let document = html_document("http://example.com", "<html><body></body></html>");
        let title = page_title(&document, &DocumentContent::new("text", 0));
        assert_eq!(title, "Untitled");
    }

    #[test]
    fn test_page_title_pdf_pages() {
        let document = ScrapedDocument {
            url: "http://example.com/doc.pdf".to_string(),
            content_bytes: vec![1],
            content_text: None,
            is_pdf: true,
            scraped_at: Utc::now(),
        };
        assert_eq!(page_title(&document, &DocumentContent::new("t", 0)), "Page 1");
        assert_eq!(page_title(&document, &DocumentContent::new("t", 4)), "Page 5");
    }
}
