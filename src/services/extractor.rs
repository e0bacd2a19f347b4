//! HTML and PDF text extraction.
//!
//! HTML goes through `scraper` (servo's html5ever): visible text nodes
//! under `<body>` are collected one line per node, with `script`,
//! `style`, and `noscript` subtrees skipped. PDFs go through
//! `pdf-extract`, which returns all pages as a single string with form
//! feeds between pages.

use ego_tree::NodeRef;
use scraper::node::Node;
use scraper::{Html, Selector};

use crate::error::ExtractError;
use crate::models::{DocumentContent, ScrapedDocument};

/// Tags whose text never renders.
const HIDDEN_TAGS: &[&str] = &["script", "style", "noscript"];

/// Extracts the per-page plain text of a fetched document: a single
/// page at index 0 for HTML, one page per non-blank PDF page otherwise.
pub fn extract_pages(document: &ScrapedDocument) -> Result<Vec<DocumentContent>, ExtractError> {
    if document.is_pdf {
        pdf_pages(&document.content_bytes)
    } else {
        let text = document
            .content_text
            .as_deref()
            .ok_or(ExtractError::MissingText)?;
        Ok(vec![DocumentContent::new(html_text(text), 0)])
    }
}

/// Visible text of an HTML document, one line per text node, entity
/// decoded by the parser, blank lines dropped.
pub fn html_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let body_selector = Selector::parse("body").expect("static selector must parse");

    let Some(body) = document.select(&body_selector).next() else {
        return String::new();
    };

    let mut lines: Vec<String> = Vec::new();
    collect_visible_text(*body, &mut lines);
    lines.join("\n")
}

fn collect_visible_text(node: NodeRef<'_, Node>, out: &mut Vec<String>) {
    for child in node.children() {
        match child.value() {
            Node::Element(element) if HIDDEN_TAGS.contains(&element.name()) => {}
            Node::Text(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    out.push(trimmed.to_string());
                }
            }
            _ => collect_visible_text(child, out),
        }
    }
}

/// The document's `<title>`, or `"Untitled"` when absent or empty.
pub fn html_title(html: &str) -> String {
    let document = Html::parse_document(html);
    let title_selector = Selector::parse("title").expect("static selector must parse");

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| "Untitled".to_string())
}

/// One plain-text string per PDF page, words joined by single spaces,
/// fully blank pages filtered out. Page indices reflect the original
/// page numbers, so filtering leaves gaps rather than renumbering.
pub fn pdf_pages(bytes: &[u8]) -> Result<Vec<DocumentContent>, ExtractError> {
    if bytes.is_empty() {
        return Err(ExtractError::MissingBytes);
    }

    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|err| ExtractError::Pdf(err.to_string()))?;

    Ok(split_pdf_text(&text))
}

/// Splits extracted PDF text into pages on the form feeds `pdf-extract`
/// inserts between pages, falling back to triple newlines for output
/// that carries none.
fn split_pdf_text(text: &str) -> Vec<DocumentContent> {
    let raw_pages: Vec<&str> = if text.contains('\x0C') {
        text.split('\x0C').collect()
    } else {
        text.split("\n\n\n").collect()
    };

    raw_pages
        .iter()
        .enumerate()
        .filter_map(|(index, page)| {
            let words: Vec<&str> = page.split_whitespace().collect();
            if words.is_empty() {
                None
            } else {
                Some(DocumentContent::new(words.join(" "), index))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_html_text_skips_hidden_tags() {
        let html = r#"
        <html>
        <head><title>Test</title><style>p { color: red; }</style></head>
        <body>
            <script>var hidden = 1;</script>
            <noscript>enable javascript</noscript>
            <p>First paragraph.</p>
            <div><span>Nested text.</span></div>
        </body>
        </html>"#;

        let text = html_text(html);
        assert!(text.contains("First paragraph."));
        assert!(text.contains("Nested text."));
        assert!(!text.contains("hidden"));
        assert!(!text.contains("enable javascript"));
        assert!(!text.contains("color: red"));
    }

    #[test]
    fn test_html_text_one_line_per_node() {
        let html = "<html><body><p>one</p><p>two</p><p>  </p></body></html>";
        assert_eq!(html_text(html), "one\ntwo");
    }

    #[test]
    fn test_html_text_decodes_entities() {
        let html = "<html><body><p>fish &amp; chips</p></body></html>";
        assert_eq!(html_text(html), "fish & chips");
    }

    #[test]
    fn test_html_title() {
        let html = "<html><head><title> My Page </title></head><body></body></html>";
        assert_eq!(html_title(html), "My Page");
        assert_eq!(html_title("<html><body></body></html>"), "Untitled");
        assert_eq!(
            html_title("<html><head><title></title></head></html>"),
            "Untitled"
        );
    }

    #[test]
    fn test_pdf_pages_rejects_invalid_bytes() {
        assert!(matches!(pdf_pages(&[]), Err(ExtractError::MissingBytes)));
        assert!(matches!(
            pdf_pages(b"this is not a PDF"),
            Err(ExtractError::Pdf(_))
        ));
    }

    #[test]
    fn test_split_pdf_text_on_form_feeds() {
        let pages = split_pdf_text("alpha  beta\x0C\x0Cgamma\ndelta");
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0], DocumentContent::new("alpha beta", 0));
        // The blank middle page is filtered; the original index survives.
        assert_eq!(pages[1], DocumentContent::new("gamma delta", 2));
    }

    #[test]
    fn test_split_pdf_text_is_deterministic() {
        let text = "one\x0Ctwo\x0Cthree";
        assert_eq!(split_pdf_text(text), split_pdf_text(text));
    }

    #[test]
    fn test_extract_pages_html() {
        let document = ScrapedDocument {
            url: "http://example.com".to_string(),
            content_bytes: Vec::new(),
            content_text: Some("<html><body><p>hello</p></body></html>".to_string()),
            is_pdf: false,
            scraped_at: Utc::now(),
        };

        let pages = extract_pages(&document).unwrap();
        assert_eq!(pages, vec![DocumentContent::new("hello", 0)]);
    }

    #[test]
    fn test_extract_pages_html_without_body_text() {
        let document = ScrapedDocument {
            url: "http://example.com".to_string(),
            content_bytes: Vec::new(),
            content_text: None,
            is_pdf: false,
            scraped_at: Utc::now(),
        };

        assert!(matches!(
            extract_pages(&document),
            Err(ExtractError::MissingText)
        ));
    }
}
