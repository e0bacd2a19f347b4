//! Concurrent URL capture with browser-like request headers.

use std::time::Duration;

use chrono::Utc;
use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONNECTION, CONTENT_TYPE, HeaderMap, HeaderValue};
use tracing::{debug, error};

use crate::error::FetchError;
use crate::models::{FetcherConfig, ScrapedDocument};

/// Classifies a declared media type. Only the `application/pdf` essence
/// (case-insensitive, parameters such as `; charset=...` ignored) is a
/// PDF; everything else flows down the HTML/text path. No content
/// sniffing happens beyond this.
pub fn is_pdf_media_type(media_type: &str) -> bool {
    media_type
        .split(';')
        .next()
        .map(str::trim)
        .is_some_and(|essence| essence.eq_ignore_ascii_case("application/pdf"))
}

/// HTTP capture of web pages and PDFs.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(config: &FetcherConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "application/pdf, application/xhtml+xml, text/html;q=0.9, */*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client })
    }

    /// Fetches every URL concurrently. A failing URL is logged and
    /// dropped from the batch; its siblings are unaffected.
    pub async fn fetch_all(&self, urls: &[String]) -> Vec<ScrapedDocument> {
        let mut in_flight: FuturesUnordered<_> = urls
            .iter()
            .map(|url| async move { (url, self.fetch_one(url).await) })
            .collect();

        let mut documents = Vec::with_capacity(urls.len());
        while let Some((url, result)) = in_flight.next().await {
            match result {
                Ok(document) => documents.push(document),
                Err(err) => error!(url = %url, error = %err, "failed to fetch URL"),
            }
        }
        documents
    }

    /// Captures a single URL. Any non-2xx response is a total failure
    /// for that URL.
    pub async fn fetch_one(&self, url: &str) -> Result<ScrapedDocument, FetchError> {
        let response = self.client.get(url).send().await?.error_for_status()?;

        let media_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let is_pdf = is_pdf_media_type(&media_type);
        debug!(url, media_type, is_pdf, "fetched URL");

        if is_pdf {
            let content_bytes = Self::read_streamed(response).await?;
            Ok(ScrapedDocument {
                url: url.to_string(),
                content_bytes,
                content_text: None,
                is_pdf: true,
                scraped_at: Utc::now(),
            })
        } else {
            let content_text = response.text().await?;
            Ok(ScrapedDocument {
                url: url.to_string(),
                content_bytes: Vec::new(),
                content_text: Some(content_text),
                is_pdf: false,
                scraped_at: Utc::now(),
            })
        }
    }

    /// Chunked body copy so large PDFs never sit in the response buffer
    /// twice.
    async fn read_streamed(response: reqwest::Response) -> Result<Vec<u8>, FetchError> {
        let mut body = match response.content_length() {
            Some(length) => Vec::with_capacity(length as usize),
            None => Vec::new(),
        };

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            body.extend_from_slice(&chunk?);
        }

        Ok(body)
    }
}
