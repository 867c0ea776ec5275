//! Web page fetching and cleaning.
//!
//! This is a collaborator adapter, not part of the retrieval core: it turns a
//! URL into best-effort plain text. Fetch failures degrade to a
//! human-readable fallback message so the chunker always has something to
//! ingest; only URL validation is reported as an error to the caller.

use std::time::Duration;

use reqwest::Client;
use scraper::{Html, Node};
use tracing::{debug, warn};
use url::Url;

use crate::types::RagError;

/// Elements whose text is navigation or machinery, not document content.
const EXCLUDED_TAGS: &[&str] = &[
    "script", "style", "nav", "footer", "header", "aside", "form", "iframe", "noscript",
];

/// Lines at or below this length are treated as navigation/UI fragments.
const MIN_LINE_CHARS: usize = 10;

/// Cleaned pages are truncated past this many characters.
const MAX_FETCH_CHARS: usize = 50_000;

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/120.0.0.0 Safari/537.36";

/// Builds the HTTP client used for page fetches, with a bounded timeout so a
/// stalled server surfaces as a failure instead of hanging the ingestion.
pub fn http_client(timeout: Duration) -> Result<Client, RagError> {
    Ok(Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()?)
}

/// Validates a caller-supplied URL string before any network work.
pub fn validate_url(raw: &str) -> Result<Url, RagError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(RagError::Validation("URL cannot be empty".into()));
    }
    let url = Url::parse(trimmed)
        .map_err(|err| RagError::Validation(format!("invalid URL '{trimmed}': {err}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(RagError::Validation(
            "URL must start with http:// or https://".into(),
        ));
    }
    Ok(url)
}

/// Fetches `url` and reduces it to readable plain text.
///
/// Never fails: any network or extraction problem is logged and replaced
/// with a fallback message that downstream chunking treats as ordinary
/// content.
pub async fn fetch_clean_text(client: &Client, url: &Url) -> String {
    match try_fetch(client, url).await {
        Ok(text) => {
            debug!(url = %url, chars = text.len(), "fetched page content");
            text
        }
        Err(err) => {
            warn!(url = %url, error = %err, "page fetch failed, using fallback text");
            fallback_text(url, &err)
        }
    }
}

async fn try_fetch(client: &Client, url: &Url) -> Result<String, RagError> {
    let body = client
        .get(url.clone())
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    let cleaned = clean_html(&body);
    if cleaned.trim().is_empty() {
        return Err(RagError::Extraction(format!(
            "page at {url} produced no readable text"
        )));
    }
    Ok(cleaned)
}

/// Strips markup and boilerplate from an HTML document.
pub fn clean_html(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut raw = String::new();
    collect_text(document.tree.root(), &mut raw);

    let mut cleaned: String = raw
        .lines()
        .map(str::trim)
        .filter(|line| line.chars().count() > MIN_LINE_CHARS)
        .collect::<Vec<_>>()
        .join("\n");

    if cleaned.chars().count() > MAX_FETCH_CHARS {
        cleaned = cleaned.chars().take(MAX_FETCH_CHARS).collect();
        cleaned.push_str("\n[Content truncated due to length]");
    }
    cleaned
}

fn collect_text(node: ego_tree::NodeRef<'_, Node>, out: &mut String) {
    if let Node::Element(element) = node.value() {
        if EXCLUDED_TAGS.contains(&element.name()) {
            return;
        }
    }
    if let Node::Text(text) = node.value() {
        out.push_str(&text);
        out.push('\n');
    }
    for child in node.children() {
        collect_text(child, out);
    }
}

fn fallback_text(url: &Url, err: &RagError) -> String {
    format!(
        "Unable to fetch content from {url}.\n\n\
         The request failed with: {err}.\n\n\
         The site may be blocking automated requests or temporarily unreachable. \
         Try a different URL from the same site, or paste the content into a text \
         document and ingest that instead."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_non_http_urls() {
        assert!(matches!(
            validate_url("   "),
            Err(RagError::Validation(_))
        ));
        assert!(matches!(
            validate_url("ftp://example.com/file"),
            Err(RagError::Validation(_))
        ));
        assert!(validate_url("https://example.com/docs").is_ok());
    }

    #[test]
    fn clean_html_strips_scripts_and_short_lines() {
        let html = r#"<html><head><style>body { color: red; }</style></head>
            <body>
                <nav>Home | About</nav>
                <script>console.log("tracking");</script>
                <p>This paragraph carries the actual document content.</p>
                <p>ok</p>
                <footer>Copyright notice belongs in the footer element.</footer>
            </body></html>"#;

        let cleaned = clean_html(html);
        assert!(cleaned.contains("actual document content"));
        assert!(!cleaned.contains("color: red"));
        assert!(!cleaned.contains("console.log"));
        assert!(!cleaned.contains("Copyright"));
        // "ok" is below the line-length floor
        assert!(!cleaned.lines().any(|line| line == "ok"));
    }

    #[test]
    fn clean_html_truncates_very_long_pages() {
        let body: String = (0..5_000)
            .map(|i| format!("<p>Paragraph number {i} with plenty of text in it.</p>"))
            .collect();
        let cleaned = clean_html(&format!("<html><body>{body}</body></html>"));
        assert!(cleaned.ends_with("[Content truncated due to length]"));
        assert!(cleaned.chars().count() <= MAX_FETCH_CHARS + 40);
    }
}
