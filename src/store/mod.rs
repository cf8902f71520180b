//! Page Content Store
//!
//! Lazily populated cache from slug to the content roots of that page.
//! Navigation, stacked notes and previews all read through it.
//!
//! - in-flight requests are memoized, so concurrent callers for one slug
//!   share a single network fetch
//! - successful results are kept for the session
//! - failures are logged, evicted, and reported as `None`

pub mod fetch;

use futures::future::{FutureExt, LocalBoxFuture, Shared};
use serde::Serialize;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use url::Url;

use crate::error::FetchError;
use crate::hast::{visit, Element};
use crate::slug::Slug;

pub use fetch::{
    fetch_canonical, load_document, rewrite_relative_urls, Document, FetchResponse, Fetcher,
    HtmlParser, LoadedDocument,
};

// =============================================================================
// PageFragmentSet
// =============================================================================

/// Content roots of one page plus its derived title
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageFragmentSet {
    pub contents: Vec<Element>,
    pub title: String,
}

impl PageFragmentSet {
    /// Extract the content roots of `document`. Title is the first `<h1>` in
    /// the content, then `<title>`, then the slug. Returns `None` when the
    /// page has no usable content.
    pub fn extract(document: &Document, slug: &Slug, content_root_class: &str) -> Option<Self> {
        let contents: Vec<Element> =
            visit::find_outermost(&document.body.children, &|el| el.has_class(content_root_class))
                .into_iter()
                .filter(|el| !(el.has_class("page-footer") && el.is_blank()))
                .cloned()
                .collect();
        if contents.is_empty() {
            return None;
        }

        let title = contents
            .iter()
            .find_map(|root| {
                if root.is("h1") {
                    return Some(root.text_content());
                }
                visit::find(&root.children, &|el| el.is("h1")).map(Element::text_content)
            })
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .or_else(|| document.title())
            .unwrap_or_else(|| slug.to_string());

        Some(Self { contents, title })
    }

    #[cfg(test)]
    pub(crate) fn titled(title: &str) -> Self {
        Self {
            contents: vec![Element::new("article")
                .with_class("popover-hint")
                .with_child(Element::new("h1").with_text(title))],
            title: title.to_string(),
        }
    }
}

// =============================================================================
// ContentStore
// =============================================================================

type PendingFetch = Shared<LocalBoxFuture<'static, Option<PageFragmentSet>>>;

/// A cache slot, tagged so a failed fetch only evicts its own slot
struct Entry {
    id: u64,
    pending: PendingFetch,
}

pub struct ContentStore {
    fetcher: Rc<dyn Fetcher>,
    parser: Rc<dyn HtmlParser>,
    content_root_class: String,
    entries: Rc<RefCell<HashMap<Slug, Entry>>>,
    next_id: Cell<u64>,
    misses: Cell<usize>,
}

impl ContentStore {
    pub fn new(
        fetcher: Rc<dyn Fetcher>,
        parser: Rc<dyn HtmlParser>,
        content_root_class: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            parser,
            content_root_class: content_root_class.into(),
            entries: Rc::new(RefCell::new(HashMap::new())),
            next_id: Cell::new(0),
            misses: Cell::new(0),
        }
    }

    /// Content roots for the page at `url`. A cache hit resolves on first
    /// poll; a miss shares the in-flight request with concurrent callers.
    pub fn fetch(&self, url: &Url) -> PendingFetch {
        let slug = Slug::from_url(url);
        if let Some(entry) = self.entries.borrow().get(&slug) {
            tracing::debug!(%slug, "content cache hit");
            return entry.pending.clone();
        }

        self.misses.set(self.misses.get() + 1);
        tracing::debug!(%slug, "content cache miss");

        let mut target = url.clone();
        target.set_fragment(None);
        target.set_query(None);

        let fetcher = Rc::clone(&self.fetcher);
        let parser = Rc::clone(&self.parser);
        let class = self.content_root_class.clone();
        let entries = Rc::downgrade(&self.entries);
        let key = slug.clone();
        let id = self.allocate_id();

        let pending = async move {
            let result = load_fragments(&*fetcher, &*parser, target, &key, &class).await;
            match result {
                Ok(set) => Some(set),
                Err(err) => {
                    tracing::warn!(slug = %key, %err, "no usable content");
                    if let Some(shared) = entries.upgrade() {
                        let mut entries = shared.borrow_mut();
                        // a seed inserted meanwhile owns the slot now
                        if entries.get(&key).is_some_and(|entry| entry.id == id) {
                            entries.remove(&key);
                        }
                    }
                    None
                }
            }
        }
        .boxed_local()
        .shared();

        self.entries.borrow_mut().insert(
            slug,
            Entry {
                id,
                pending: pending.clone(),
            },
        );
        pending
    }

    fn allocate_id(&self) -> u64 {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        id
    }

    /// Completed result for `slug`, if any, without waiting.
    pub fn get_cached(&self, slug: &Slug) -> Option<PageFragmentSet> {
        self.entries.borrow().get(slug)?.pending.peek().cloned().flatten()
    }

    /// Seed the cache with content that is already on screen.
    pub fn insert(&self, slug: Slug, set: PageFragmentSet) {
        let ready = futures::future::ready(Some(set)).boxed_local().shared();
        let id = self.allocate_id();
        self.entries
            .borrow_mut()
            .insert(slug, Entry { id, pending: ready });
    }

    pub fn contains(&self, slug: &Slug) -> bool {
        self.entries.borrow().contains_key(slug)
    }

    /// Number of fetches started because of a cache miss
    pub fn miss_count(&self) -> usize {
        self.misses.get()
    }

    pub fn fetcher(&self) -> Rc<dyn Fetcher> {
        Rc::clone(&self.fetcher)
    }

    pub fn parser(&self) -> Rc<dyn HtmlParser> {
        Rc::clone(&self.parser)
    }

    pub fn content_root_class(&self) -> &str {
        &self.content_root_class
    }
}

async fn load_fragments(
    fetcher: &dyn Fetcher,
    parser: &dyn HtmlParser,
    url: Url,
    slug: &Slug,
    class: &str,
) -> Result<PageFragmentSet, FetchError> {
    let loaded = load_document(fetcher, parser, url).await?;
    PageFragmentSet::extract(&loaded.document, slug, class)
        .ok_or_else(|| FetchError::EmptyContent(loaded.url.to_string()))
}
