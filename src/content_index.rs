//! Content index: per-page metadata emitted at build time
//!
//! Fetched once per session and shared by every consumer through a
//! memoized future. A failed load is logged and yields an empty index.

use chrono::{DateTime, NaiveDate, Utc};
use futures::future::{FutureExt, LocalBoxFuture, Shared};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use url::Url;

use crate::error::IndexError;
use crate::slug::Slug;
use crate::store::{fetch_canonical, Fetcher};

// =============================================================================
// Types
// =============================================================================

/// Page layout; unknown names fall back to `Default`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ContentLayout {
    #[default]
    Default,
    Letter,
    Technical,
    Reflection,
}

impl From<String> for ContentLayout {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "letter" => ContentLayout::Letter,
            "technical" => ContentLayout::Technical,
            "reflection" => ContentLayout::Reflection,
            _ => ContentLayout::Default,
        }
    }
}

impl From<ContentLayout> for String {
    fn from(layout: ContentLayout) -> Self {
        match layout {
            ContentLayout::Default => "default",
            ContentLayout::Letter => "letter",
            ContentLayout::Technical => "technical",
            ContentLayout::Reflection => "reflection",
        }
        .to_string()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadingTime {
    pub minutes: f64,
    pub words: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContentDetails {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub aliases: Vec<String>,
    pub links: Vec<String>,
    pub layout: ContentLayout,
    pub file_path: Option<String>,
    pub description: Option<String>,
    /// ISO-8601 date or datetime
    pub date: Option<String>,
    pub reading_time: Option<ReadingTime>,
}

impl ContentDetails {
    pub fn parsed_date(&self) -> Option<DateTime<Utc>> {
        parse_date(self.date.as_deref()?)
    }
}

pub type ContentIndex = HashMap<Slug, ContentDetails>;

pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

pub fn parse_index(json: &str) -> Result<ContentIndex, IndexError> {
    serde_json::from_str(json).map_err(|e| IndexError::Json(e.to_string()))
}

// =============================================================================
// Loader
// =============================================================================

type PendingIndex = Shared<LocalBoxFuture<'static, Rc<ContentIndex>>>;

pub struct ContentIndexLoader {
    fetcher: Rc<dyn Fetcher>,
    url: Url,
    pending: RefCell<Option<PendingIndex>>,
}

impl ContentIndexLoader {
    pub fn new(fetcher: Rc<dyn Fetcher>, url: Url) -> Self {
        Self {
            fetcher,
            url,
            pending: RefCell::new(None),
        }
    }

    pub fn load(&self) -> PendingIndex {
        if let Some(pending) = self.pending.borrow().as_ref() {
            return pending.clone();
        }

        let fetcher = Rc::clone(&self.fetcher);
        let url = self.url.clone();
        let pending = async move {
            match fetch_index(&*fetcher, url).await {
                Ok(index) => {
                    tracing::debug!(pages = index.len(), "content index loaded");
                    Rc::new(index)
                }
                Err(err) => {
                    tracing::warn!(%err, "content index unavailable");
                    Rc::new(ContentIndex::new())
                }
            }
        }
        .boxed_local()
        .shared();

        *self.pending.borrow_mut() = Some(pending.clone());
        pending
    }

    /// Index if it has already resolved
    pub fn get_loaded(&self) -> Option<Rc<ContentIndex>> {
        self.pending.borrow().as_ref()?.peek().cloned()
    }
}

async fn fetch_index(fetcher: &dyn Fetcher, url: Url) -> Result<ContentIndex, IndexError> {
    let response = fetch_canonical(fetcher, url).await?;
    parse_index(&response.body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FetchResponse;
    use crate::testing::FakeFetcher;
    use futures::executor::block_on;

    const INDEX: &str = r#"{
        "notes/a": {
            "title": "Alpha",
            "content": "alpha text",
            "tags": ["seed"],
            "links": ["notes/b"],
            "layout": "technical",
            "date": "2024-03-05T10:00:00Z",
            "readingTime": { "minutes": 3, "words": 600 }
        },
        "notes/b": { "title": "Beta", "layout": "something-new" }
    }"#;

    fn index_response(url: &str, body: &str) -> FetchResponse {
        FetchResponse {
            url: Url::parse(url).unwrap(),
            status: 200,
            content_type: Some("application/json".into()),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_parse_index() {
        let index = parse_index(INDEX).unwrap();
        let a = &index[&Slug::new("notes/a")];
        assert_eq!(a.layout, ContentLayout::Technical);
        assert_eq!(a.reading_time.map(|r| r.words), Some(600));
        assert_eq!(a.parsed_date().map(|d| d.to_rfc3339()).as_deref(), Some("2024-03-05T10:00:00+00:00"));

        let b = &index[&Slug::new("notes/b")];
        assert_eq!(b.layout, ContentLayout::Default);
        assert!(b.reading_time.is_none());
    }

    #[test]
    fn test_parse_plain_date() {
        let dt = parse_date("2023-12-01").unwrap();
        assert_eq!(dt.format("%Y-%m-%d %H:%M").to_string(), "2023-12-01 00:00");
        assert!(parse_date("yesterday").is_none());
    }

    #[test]
    fn test_loader_fetches_once() {
        let fetcher = Rc::new(FakeFetcher::new());
        fetcher.insert(index_response("https://g.test/static/contentIndex.json", INDEX));
        let loader = ContentIndexLoader::new(
            fetcher.clone(),
            Url::parse("https://g.test/static/contentIndex.json").unwrap(),
        );

        assert!(loader.get_loaded().is_none());
        let first = block_on(loader.load());
        let second = block_on(loader.load());
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(first.len(), 2);
        assert_eq!(fetcher.requests(), 1);
        assert!(loader.get_loaded().is_some());
    }

    #[test]
    fn test_loader_failure_is_empty() {
        let fetcher = Rc::new(FakeFetcher::new());
        let loader = ContentIndexLoader::new(
            fetcher,
            Url::parse("https://g.test/static/contentIndex.json").unwrap(),
        );
        assert!(block_on(loader.load()).is_empty());
    }
}
