//! Network and parsing seams
//!
//! `Fetcher` and `HtmlParser` are implemented by the browser host
//! (`window.fetch`, `DOMParser`) and by in-memory fakes in tests.

use futures::future::LocalBoxFuture;
use regex::Regex;
use std::sync::OnceLock;
use url::Url;

use crate::error::FetchError;
use crate::hast::{visit, Element, Node};

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    /// Final URL after any HTTP redirects
    pub url: Url,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl FetchResponse {
    pub fn html(url: Url, body: impl Into<String>) -> Self {
        Self {
            url,
            status: 200,
            content_type: Some("text/html; charset=utf-8".to_string()),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// MIME type without parameters, lowercased
    pub fn mime(&self) -> Option<String> {
        self.content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .map(|m| m.trim().to_ascii_lowercase())
    }

    pub fn is_html(&self) -> bool {
        self.mime().as_deref() == Some("text/html")
    }
}

/// A parsed HTML document
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Document {
    pub head: Element,
    pub body: Element,
}

impl Document {
    /// Text of `<title>`
    pub fn title(&self) -> Option<String> {
        visit::find(&self.head.children, &|el| el.is("title"))
            .map(|el| el.text_content().trim().to_string())
            .filter(|t| !t.is_empty())
    }

    /// Text of the first `<h1>` in the body
    pub fn first_h1(&self) -> Option<String> {
        visit::find(&self.body.children, &|el| el.is("h1"))
            .map(|el| el.text_content().trim().to_string())
            .filter(|t| !t.is_empty())
    }
}

pub trait Fetcher {
    fn fetch(&self, url: Url) -> LocalBoxFuture<'static, Result<FetchResponse, FetchError>>;
}

pub trait HtmlParser {
    fn parse(&self, html: &str) -> Result<Document, FetchError>;
}

/// A fetched, parsed document with relative URLs made absolute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedDocument {
    pub url: Url,
    pub document: Document,
}

// =============================================================================
// Canonical redirects
// =============================================================================

static CANONICAL: OnceLock<Regex> = OnceLock::new();

fn canonical_marker() -> &'static Regex {
    CANONICAL.get_or_init(|| {
        Regex::new(r#"<link rel="canonical" href="([^"]*)">"#).expect("static pattern")
    })
}

/// Fetch `url`, following one level of canonical-link redirect. The marker
/// is found by scanning the raw body so redirect stubs never reach the parser.
pub async fn fetch_canonical(fetcher: &dyn Fetcher, url: Url) -> Result<FetchResponse, FetchError> {
    let response = fetcher.fetch(url.clone()).await?;
    ensure_success(&response)?;
    if !response.is_html() {
        return Ok(response);
    }

    let Some(redirect) = canonical_marker()
        .captures(&response.body)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
    else {
        return Ok(response);
    };

    let target = response.url.join(&redirect)?;
    if same_document(&target, &response.url) {
        return Ok(response);
    }

    tracing::debug!(from = %url, to = %target, "following canonical redirect");
    let redirected = fetcher.fetch(target).await?;
    ensure_success(&redirected)?;
    Ok(redirected)
}

fn ensure_success(response: &FetchResponse) -> Result<(), FetchError> {
    if response.is_success() {
        Ok(())
    } else {
        Err(FetchError::Status {
            url: response.url.to_string(),
            status: response.status,
        })
    }
}

fn same_document(a: &Url, b: &Url) -> bool {
    a.origin() == b.origin() && a.path() == b.path()
}

/// Fetch, parse, and absolutize an HTML page. Non-HTML responses are
/// reported as `UnsupportedContentType`.
pub async fn load_document(
    fetcher: &dyn Fetcher,
    parser: &dyn HtmlParser,
    url: Url,
) -> Result<LoadedDocument, FetchError> {
    let response = fetch_canonical(fetcher, url).await?;
    if !response.is_html() {
        return Err(FetchError::UnsupportedContentType(
            response.mime().unwrap_or_default(),
        ));
    }

    let mut document = parser.parse(&response.body)?;
    rewrite_relative_urls(&mut document.head.children, &response.url);
    rewrite_relative_urls(&mut document.body.children, &response.url);
    Ok(LoadedDocument {
        url: response.url,
        document,
    })
}

/// Make every relative `href`/`src` absolute against `base`. Fragment-only
/// links stay as they are.
pub fn rewrite_relative_urls(nodes: &mut [Node], base: &Url) {
    visit::walk_mut(nodes, &mut |el| {
        for attr in ["href", "src"] {
            let Some(value) = el.attr(attr) else { continue };
            if value.is_empty() || value.starts_with('#') {
                continue;
            }
            if let Err(url::ParseError::RelativeUrlWithoutBase) = Url::parse(value) {
                if let Ok(absolute) = base.join(value) {
                    el.set_attr(attr, absolute.to_string());
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{html_response, FakeFetcher, JsonParser};

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_mime_parsing() {
        let mut res = FetchResponse::html(url("https://g.test/a"), "");
        assert!(res.is_html());
        res.content_type = Some("Image/PNG".into());
        assert_eq!(res.mime().as_deref(), Some("image/png"));
        assert!(!res.is_html());
    }

    #[test]
    fn test_follows_one_canonical_redirect() {
        let fetcher = FakeFetcher::new();
        fetcher.insert_raw(
            "https://g.test/old",
            r#"<html><head><link rel="canonical" href="/new"></head></html>"#,
        );
        fetcher.insert(html_response("https://g.test/new", "new", "New"));

        let res = futures::executor::block_on(fetch_canonical(&fetcher, url("https://g.test/old"))).unwrap();
        assert_eq!(res.url.as_str(), "https://g.test/new");
        assert_eq!(fetcher.requests(), 2);
    }

    #[test]
    fn test_self_canonical_is_not_refetched() {
        let fetcher = FakeFetcher::new();
        fetcher.insert_raw(
            "https://g.test/a",
            r#"<link rel="canonical" href="https://g.test/a">"#,
        );
        let res = futures::executor::block_on(fetch_canonical(&fetcher, url("https://g.test/a"))).unwrap();
        assert_eq!(res.url.as_str(), "https://g.test/a");
        assert_eq!(fetcher.requests(), 1);
    }

    #[test]
    fn test_non_2xx_is_error() {
        let fetcher = FakeFetcher::new();
        let err = futures::executor::block_on(fetch_canonical(&fetcher, url("https://g.test/missing")))
            .unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
    }

    #[test]
    fn test_load_document_rejects_non_html() {
        let fetcher = FakeFetcher::new();
        fetcher.insert(FetchResponse {
            url: url("https://g.test/file.pdf"),
            status: 200,
            content_type: Some("application/pdf".into()),
            body: String::new(),
        });
        let err = futures::executor::block_on(load_document(
            &fetcher,
            &JsonParser,
            url("https://g.test/file.pdf"),
        ))
        .unwrap_err();
        assert_eq!(err, FetchError::UnsupportedContentType("application/pdf".into()));
    }

    #[test]
    fn test_rewrite_relative_urls() {
        let mut nodes: Vec<Node> = vec![Element::new("div")
            .with_child(Element::new("a").with_attr("href", "../b"))
            .with_child(Element::new("a").with_attr("href", "#frag"))
            .with_child(Element::new("a").with_attr("href", "mailto:x@y.z"))
            .with_child(Element::new("img").with_attr("src", "./img.png"))
            .into()];
        rewrite_relative_urls(&mut nodes, &url("https://g.test/notes/a"));

        let hrefs: Vec<String> = visit::find_all(&nodes, &|el| el.has_attr("href") || el.has_attr("src"))
            .into_iter()
            .map(|el| el.attr("href").or(el.attr("src")).unwrap_or("").to_string())
            .collect();
        assert_eq!(
            hrefs,
            vec![
                "https://g.test/b",
                "#frag",
                "mailto:x@y.z",
                "https://g.test/notes/img.png"
            ]
        );
    }
}
