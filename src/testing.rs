//! In-memory hosts for tests.
//!
//! `FakeFetcher` serves canned responses (404 for anything unknown) and can
//! hold a response back until a gate is released. `JsonParser` treats a
//! response body as a JSON-serialized `Document`, so fixtures stay typed.

use futures::channel::oneshot;
use futures::future::{FutureExt, LocalBoxFuture};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use url::Url;

use crate::config::{RouterConfig, StackedConfig};
use crate::content_index::ContentIndexLoader;
use crate::error::{FetchError, HostError};
use crate::hast::{apply, Element, Patch};
use crate::lifecycle::{CleanupRegistry, EventBus, LifecycleEvent};
use crate::router::{Browser, Router};
use crate::slug::Slug;
use crate::stacked::{NoteColumn, PanelRect, PanelState, StackedNotes};
use crate::store::{ContentStore, Document, FetchResponse, Fetcher, HtmlParser};

// =============================================================================
// Fixtures
// =============================================================================

/// `<title>{title} | Garden</title>` + `article.popover-hint > h1, p`
pub fn page_document(title: &str, text: &str) -> Document {
    Document {
        head: Element::new("head")
            .with_child(Element::new("title").with_text(format!("{} | Garden", title)))
            .with_child(Element::new("meta").with_attr("charset", "utf-8")),
        body: Element::new("body").with_child(
            Element::new("article")
                .with_class("popover-hint")
                .with_child(Element::new("h1").with_text(title))
                .with_child(Element::new("p").with_text(text)),
        ),
    }
}

pub fn html_response(url: &str, title: &str, text: &str) -> FetchResponse {
    document_response(url, &page_document(title, text))
}

pub fn document_response(url: &str, document: &Document) -> FetchResponse {
    FetchResponse::html(
        Url::parse(url).expect("fixture url"),
        serde_json::to_string(document).expect("fixture document"),
    )
}

fn key(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.to_string()
}

// =============================================================================
// Fetcher / parser
// =============================================================================

#[derive(Default)]
pub struct FakeFetcher {
    responses: RefCell<HashMap<String, FetchResponse>>,
    gates: RefCell<HashMap<String, oneshot::Receiver<()>>>,
    requests: Cell<usize>,
    log: RefCell<Vec<String>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, response: FetchResponse) {
        self.responses.borrow_mut().insert(key(&response.url), response);
    }

    pub fn insert_raw(&self, url: &str, body: &str) {
        self.insert(FetchResponse::html(Url::parse(url).expect("fixture url"), body));
    }

    pub fn insert_document(&self, url: &str, document: &Document) {
        self.insert(document_response(url, document));
    }

    /// Hold the next response for `url` until the sender fires.
    pub fn gate(&self, url: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        let url = Url::parse(url).expect("fixture url");
        self.gates.borrow_mut().insert(key(&url), rx);
        tx
    }

    pub fn requests(&self) -> usize {
        self.requests.get()
    }

    pub fn log(&self) -> Vec<String> {
        self.log.borrow().clone()
    }
}

impl Fetcher for FakeFetcher {
    fn fetch(&self, url: Url) -> LocalBoxFuture<'static, Result<FetchResponse, FetchError>> {
        self.requests.set(self.requests.get() + 1);
        let key = key(&url);
        self.log.borrow_mut().push(key.clone());

        let response = self
            .responses
            .borrow()
            .get(&key)
            .cloned()
            .unwrap_or_else(|| FetchResponse {
                url: url.clone(),
                status: 404,
                content_type: Some("text/html".into()),
                body: String::new(),
            });

        match self.gates.borrow_mut().remove(&key) {
            Some(gate) => async move {
                let _ = gate.await;
                Ok(response)
            }
            .boxed_local(),
            None => futures::future::ready(Ok(response)).boxed_local(),
        }
    }
}

pub struct JsonParser;

impl HtmlParser for JsonParser {
    fn parse(&self, html: &str) -> Result<Document, FetchError> {
        serde_json::from_str(html).map_err(|e| FetchError::Parse(e.to_string()))
    }
}

// =============================================================================
// Browser
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserCall {
    Assign(String),
    Push(String),
    Replace(String),
    ScrollTo(String),
    ScrollTop,
    Loading,
    Title(String),
    Announce(String),
    Patch(usize),
    Head,
}

pub struct FakeBrowser {
    location: RefCell<Url>,
    document: RefCell<Document>,
    calls: RefCell<Vec<BrowserCall>>,
    pub fail_patch: Cell<bool>,
}

impl FakeBrowser {
    pub fn new(location: &str, document: Document) -> Self {
        Self {
            location: RefCell::new(Url::parse(location).expect("fixture url")),
            document: RefCell::new(document),
            calls: RefCell::new(Vec::new()),
            fail_patch: Cell::new(false),
        }
    }

    pub fn calls(&self) -> Vec<BrowserCall> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    pub fn set_location(&self, url: &str) {
        *self.location.borrow_mut() = Url::parse(url).expect("fixture url");
    }

    pub fn body(&self) -> Element {
        self.document.borrow().body.clone()
    }

    pub fn head(&self) -> Element {
        self.document.borrow().head.clone()
    }

    fn record(&self, call: BrowserCall) {
        self.calls.borrow_mut().push(call);
    }
}

impl Browser for FakeBrowser {
    fn location(&self) -> Url {
        self.location.borrow().clone()
    }

    fn assign(&self, url: &Url) {
        self.record(BrowserCall::Assign(url.to_string()));
    }

    fn push_state(&self, url: &Url) -> Result<(), HostError> {
        *self.location.borrow_mut() = url.clone();
        self.record(BrowserCall::Push(url.to_string()));
        Ok(())
    }

    fn replace_state(&self, url: &Url) -> Result<(), HostError> {
        *self.location.borrow_mut() = url.clone();
        self.record(BrowserCall::Replace(url.to_string()));
        Ok(())
    }

    fn scroll_to_fragment(&self, id: &str) {
        self.record(BrowserCall::ScrollTo(id.to_string()));
    }

    fn scroll_to_top(&self) {
        self.record(BrowserCall::ScrollTop);
    }

    fn start_loading(&self) {
        self.record(BrowserCall::Loading);
    }

    fn set_title(&self, title: &str) {
        self.record(BrowserCall::Title(title.to_string()));
    }

    fn announce(&self, message: &str) {
        self.record(BrowserCall::Announce(message.to_string()));
    }

    fn document(&self) -> Result<Document, HostError> {
        Ok(self.document.borrow().clone())
    }

    fn patch_body(&self, patches: &[Patch]) -> Result<(), HostError> {
        if self.fail_patch.get() {
            return Err(HostError::from("patch rejected"));
        }
        self.record(BrowserCall::Patch(patches.len()));
        apply(&mut self.document.borrow_mut().body, patches).map_err(|e| HostError(e.to_string()))
    }

    fn replace_head(&self, head: &Element, preserve_attr: &str) -> Result<(), HostError> {
        self.record(BrowserCall::Head);
        let mut document = self.document.borrow_mut();
        document
            .head
            .children
            .retain(|node| node.as_element().is_some_and(|el| el.has_attr(preserve_attr)));
        let incoming = head
            .children
            .iter()
            .filter(|node| !node.as_element().is_some_and(|el| el.has_attr(preserve_attr)))
            .cloned();
        document.head.children.extend(incoming);
        Ok(())
    }
}

// =============================================================================
// Note column
// =============================================================================

pub struct FakeColumn {
    pub viewport: Cell<f64>,
    pub active: Cell<bool>,
    panels: RefCell<Vec<Element>>,
    rights: RefCell<HashMap<Slug, f64>>,
    pub width: Cell<f64>,
    focused: RefCell<Vec<Slug>>,
    fragment_scrolls: RefCell<Vec<(Slug, String)>>,
    pub scrolled_to_end: Cell<usize>,
    frames: RefCell<Vec<Box<dyn FnOnce()>>>,
    states: RefCell<Vec<PanelState>>,
    marked: RefCell<Vec<Slug>>,
    /// Rects reported for mounted panels; defaults to side by side
    pub rects: RefCell<Option<Vec<PanelRect>>>,
}

impl FakeColumn {
    pub fn new(viewport: f64) -> Self {
        Self {
            viewport: Cell::new(viewport),
            active: Cell::new(false),
            panels: RefCell::new(Vec::new()),
            rights: RefCell::new(HashMap::new()),
            width: Cell::new(0.0),
            focused: RefCell::new(Vec::new()),
            fragment_scrolls: RefCell::new(Vec::new()),
            scrolled_to_end: Cell::new(0),
            frames: RefCell::new(Vec::new()),
            states: RefCell::new(Vec::new()),
            marked: RefCell::new(Vec::new()),
            rects: RefCell::new(None),
        }
    }

    pub fn panels(&self) -> Vec<Element> {
        self.panels.borrow().clone()
    }

    pub fn right_of(&self, slug: &str) -> Option<f64> {
        self.rights.borrow().get(&Slug::new(slug)).copied()
    }

    pub fn focused(&self) -> Vec<Slug> {
        self.focused.borrow().clone()
    }

    pub fn fragment_scrolls(&self) -> Vec<(Slug, String)> {
        self.fragment_scrolls.borrow().clone()
    }

    pub fn states(&self) -> Vec<PanelState> {
        self.states.borrow().clone()
    }

    pub fn marked(&self) -> Vec<Slug> {
        self.marked.borrow().clone()
    }

    pub fn pending_frames(&self) -> usize {
        self.frames.borrow().len()
    }

    /// Run every queued animation-frame callback.
    pub fn run_frames(&self) {
        let frames = std::mem::take(&mut *self.frames.borrow_mut());
        for frame in frames {
            frame();
        }
    }
}

impl NoteColumn for FakeColumn {
    fn viewport_width(&self) -> f64 {
        self.viewport.get()
    }

    fn client_width(&self) -> f64 {
        self.viewport.get()
    }

    fn set_active(&self, active: bool) {
        self.active.set(active);
    }

    fn mounted(&self) -> Vec<Slug> {
        self.panels
            .borrow()
            .iter()
            .filter_map(|p| p.attr("data-slug").map(Slug::new))
            .collect()
    }

    fn mount(&self, panel: &Element) -> Result<(), HostError> {
        self.panels.borrow_mut().push(panel.clone());
        Ok(())
    }

    fn unmount(&self, slug: &Slug) {
        self.panels
            .borrow_mut()
            .retain(|p| p.attr("data-slug") != Some(slug.as_str()));
    }

    fn clear(&self) {
        self.panels.borrow_mut().clear();
        self.rights.borrow_mut().clear();
    }

    fn set_column_width(&self, px: f64) {
        self.width.set(px);
    }

    fn set_panel_right(&self, slug: &Slug, px: f64) {
        self.rights.borrow_mut().insert(slug.clone(), px);
    }

    fn scroll_to_end(&self) {
        self.scrolled_to_end.set(self.scrolled_to_end.get() + 1);
    }

    fn scroll_panel_to(&self, slug: &Slug, fragment: &str, _buffer: f64) {
        self.fragment_scrolls
            .borrow_mut()
            .push((slug.clone(), fragment.to_string()));
    }

    fn focus_panel(&self, slug: &Slug, _highlight_ms: u32) {
        self.focused.borrow_mut().push(slug.clone());
    }

    fn mark_links(&self, open: &[Slug]) {
        *self.marked.borrow_mut() = open.to_vec();
    }

    fn panel_rects(&self) -> Vec<PanelRect> {
        if let Some(rects) = self.rects.borrow().as_ref() {
            return rects.clone();
        }
        (0..self.panels.borrow().len())
            .map(|i| PanelRect {
                left: i as f64 * 620.0,
                right: (i + 1) as f64 * 620.0,
            })
            .collect()
    }

    fn apply_states(&self, states: &[PanelState]) {
        *self.states.borrow_mut() = states.to_vec();
    }

    fn request_frame(&self, f: Box<dyn FnOnce()>) {
        self.frames.borrow_mut().push(f);
    }
}

// =============================================================================
// Harness
// =============================================================================

pub const INDEX_URL: &str = "https://g.test/static/contentIndex.json";

/// Router and stacked manager wired to fakes, as a session would wire them
pub struct Harness {
    pub browser: Rc<FakeBrowser>,
    pub column: Rc<FakeColumn>,
    pub fetcher: Rc<FakeFetcher>,
    pub store: Rc<ContentStore>,
    pub bus: EventBus,
    pub cleanup: CleanupRegistry,
    pub stacked: Rc<StackedNotes>,
    pub router: Router,
    log: Rc<RefCell<Vec<String>>>,
}

impl Harness {
    pub fn new(location: &str, document: Document) -> Self {
        Self::with_viewport(location, document, 1600.0)
    }

    pub fn with_viewport(location: &str, document: Document, viewport: f64) -> Self {
        let browser = Rc::new(FakeBrowser::new(location, document));
        let column = Rc::new(FakeColumn::new(viewport));
        let fetcher = Rc::new(FakeFetcher::new());
        let store = Rc::new(ContentStore::new(
            fetcher.clone(),
            Rc::new(JsonParser),
            "popover-hint",
        ));
        let index = Rc::new(ContentIndexLoader::new(
            fetcher.clone(),
            Url::parse(INDEX_URL).expect("fixture url"),
        ));
        let bus = EventBus::new();
        let cleanup = CleanupRegistry::new();

        let stacked = Rc::new(StackedNotes::new(
            browser.clone(),
            column.clone(),
            Rc::clone(&store),
            index,
            bus.clone(),
            cleanup.clone(),
            StackedConfig::default(),
        ));
        let router = Router::new(
            browser.clone(),
            Rc::clone(&store),
            Rc::clone(&stacked),
            bus.clone(),
            cleanup.clone(),
            RouterConfig::default(),
        );

        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        bus.subscribe(move |event| {
            let entry = match event {
                LifecycleEvent::PreNavigation => "prenav".to_string(),
                LifecycleEvent::Navigation { slug } => format!("nav:{}", slug),
            };
            sink.borrow_mut().push(entry);
        })
        .forget();

        Self {
            browser,
            column,
            fetcher,
            store,
            bus,
            cleanup,
            stacked,
            router,
            log,
        }
    }

    /// Register a cleanup that records itself in the event log
    pub fn add_cleanup(&self, name: &str) {
        let sink = Rc::clone(&self.log);
        let entry = format!("cleanup:{}", name);
        self.cleanup.add_fn(move || sink.borrow_mut().push(entry));
    }

    /// Lifecycle events and cleanups in the order they happened
    pub fn log(&self) -> Vec<String> {
        self.log.borrow().clone()
    }

    pub fn clear_log(&self) {
        self.log.borrow_mut().clear();
    }

    pub fn page(&self, url: &str, title: &str, text: &str) {
        self.fetcher.insert(html_response(url, title, text));
    }
}
