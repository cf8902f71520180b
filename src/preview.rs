//! Hover previews
//!
//! One preview request is active at a time. Starting a preview of another
//! page aborts the one in flight; an aborted request resolves to `None`.
//! HTML pages go through the content store so a preview also warms the
//! cache for a later navigation.

use futures::future::{AbortHandle, Abortable};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use url::Url;

use crate::error::FetchError;
use crate::hast::{visit, Element};
use crate::slug::Slug;
use crate::store::{fetch_canonical, rewrite_relative_urls, ContentStore, FetchResponse, PageFragmentSet};

const ID_PREFIX: &str = "popover-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewKind {
    Html,
    Image,
    Pdf,
    Xml,
}

/// Rendered preview body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    pub kind: PreviewKind,
    pub contents: Vec<Element>,
    /// Element id to scroll the preview to
    pub scroll_target: Option<String>,
}

struct ActiveRequest {
    id: u64,
    page: Url,
    handle: AbortHandle,
}

pub struct PreviewController {
    store: Rc<ContentStore>,
    active: RefCell<Option<ActiveRequest>>,
    next_id: Cell<u64>,
}

impl PreviewController {
    pub fn new(store: Rc<ContentStore>) -> Self {
        Self {
            store,
            active: RefCell::new(None),
            next_id: Cell::new(0),
        }
    }

    /// Preview of the page at `url`, or `None` when there is nothing to
    /// show or a newer preview took over.
    pub async fn preview(&self, url: Url) -> Option<Preview> {
        let page = without_fragment(&url);
        let (handle, registration) = AbortHandle::new_pair();
        let id = self.next_id.get() + 1;
        self.next_id.set(id);

        let previous = self.active.replace(Some(ActiveRequest {
            id,
            page: page.clone(),
            handle,
        }));
        if let Some(previous) = previous {
            if previous.page != page {
                tracing::debug!(from = %previous.page, to = %page, "aborting previous preview");
                previous.handle.abort();
            }
        }

        let result = Abortable::new(self.load(page), registration).await;

        let finished_active = self.active.borrow().as_ref().is_some_and(|a| a.id == id);
        if finished_active {
            self.active.borrow_mut().take();
        }

        let mut preview = match result {
            Ok(Ok(preview)) => preview,
            Ok(Err(err)) => {
                tracing::debug!(%url, %err, "nothing to preview");
                return None;
            }
            Err(_aborted) => return None,
        };
        preview.scroll_target = url
            .fragment()
            .filter(|f| !f.is_empty())
            .map(|f| format!("{}{}", ID_PREFIX, decode(f)));
        Some(preview)
    }

    /// Abort the active request, if any.
    pub fn dismiss(&self) {
        if let Some(active) = self.active.borrow_mut().take() {
            active.handle.abort();
        }
    }

    pub fn is_loading(&self) -> bool {
        self.active.borrow().is_some()
    }

    async fn load(&self, page: Url) -> Result<Preview, FetchError> {
        let slug = Slug::from_url(&page);
        // completed or still in flight: share the store's request
        if self.store.contains(&slug) {
            if let Some(set) = self.store.fetch(&page).await {
                return Ok(html_preview(&set));
            }
        }

        let fetcher = self.store.fetcher();
        let response = fetch_canonical(&*fetcher, page.clone()).await?;
        let mime = response.mime().unwrap_or_default();

        match mime.as_str() {
            m if m.starts_with("image/") => Ok(media(PreviewKind::Image, &page)),
            "application/pdf" => Ok(media(PreviewKind::Pdf, &page)),
            "application/xml" | "text/xml" | "application/rss+xml" => Ok(xml(&response)),
            "text/html" => {
                let set = self.parse_html(&response, &slug)?;
                self.store.insert(slug, set.clone());
                Ok(html_preview(&set))
            }
            other => Err(FetchError::UnsupportedContentType(other.to_string())),
        }
    }

    fn parse_html(&self, response: &FetchResponse, slug: &Slug) -> Result<PageFragmentSet, FetchError> {
        let mut document = self.store.parser().parse(&response.body)?;
        rewrite_relative_urls(&mut document.body.children, &response.url);
        PageFragmentSet::extract(&document, slug, self.store.content_root_class())
            .ok_or_else(|| FetchError::EmptyContent(response.url.to_string()))
    }
}

/// Content roots with ids moved out of the host page's namespace and
/// reference sections dropped.
fn html_preview(set: &PageFragmentSet) -> Preview {
    let contents = set
        .contents
        .iter()
        .map(|root| {
            let mut root = root.clone();
            visit::retain(&mut root.children, &mut |el| !skipped_in_preview(el));
            prefix_id(&mut root);
            visit::walk_mut(&mut root.children, &mut prefix_id);
            root
        })
        .collect();
    Preview {
        kind: PreviewKind::Html,
        contents,
        scroll_target: None,
    }
}

fn skipped_in_preview(el: &Element) -> bool {
    (el.is("section") && (el.has_attr("data-references") || el.has_attr("data-footnotes")))
        || el.has_attr("data-skip-preview")
}

fn prefix_id(el: &mut Element) {
    if let Some(id) = el.id().map(|id| format!("{}{}", ID_PREFIX, id)) {
        el.set_attr("id", id);
    }
}

fn media(kind: PreviewKind, page: &Url) -> Preview {
    let element = match kind {
        PreviewKind::Image => Element::new("img")
            .with_attr("src", page.as_str())
            .with_attr("alt", page.path()),
        _ => Element::new("iframe").with_attr("src", page.as_str()),
    };
    Preview {
        kind,
        contents: vec![element],
        scroll_target: None,
    }
}

fn xml(response: &FetchResponse) -> Preview {
    Preview {
        kind: PreviewKind::Xml,
        contents: vec![Element::new("pre")
            .with_class("rss-viewer")
            .with_text(response.body.clone())],
        scroll_target: None,
    }
}

fn without_fragment(url: &Url) -> Url {
    let mut page = url.clone();
    page.set_fragment(None);
    page.set_query(None);
    page
}

fn decode(fragment: &str) -> String {
    percent_encoding::percent_decode_str(fragment)
        .decode_utf8_lossy()
        .into_owned()
}
