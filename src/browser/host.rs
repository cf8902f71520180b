//! `web-sys` implementations of the fetch, parse and browser seams.

use futures::future::{FutureExt, LocalBoxFuture};
use std::cell::RefCell;
use url::Url;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Document as DomDocument, Response, Window};

use crate::config::RouterConfig;
use crate::error::{FetchError, HostError};
use crate::hast::{Element, Patch};
use crate::router::Browser;
use crate::store::{Document, FetchResponse, Fetcher, HtmlParser};

use super::dom;

fn describe(err: JsValue) -> String {
    err.as_string()
        .or_else(|| {
            err.dyn_ref::<js_sys::Error>()
                .map(|e| String::from(e.message()))
        })
        .unwrap_or_else(|| format!("{:?}", err))
}

fn host_err(err: JsValue) -> HostError {
    HostError(describe(err))
}

pub(crate) fn window() -> Result<Window, HostError> {
    web_sys::window().ok_or_else(|| HostError::from("no window"))
}

// =============================================================================
// Fetch
// =============================================================================

pub struct WebFetcher;

impl Fetcher for WebFetcher {
    fn fetch(&self, url: Url) -> LocalBoxFuture<'static, Result<FetchResponse, FetchError>> {
        async move { fetch_response(url).await }.boxed_local()
    }
}

async fn fetch_response(url: Url) -> Result<FetchResponse, FetchError> {
    let network = |err: JsValue| FetchError::Network(describe(err));
    let window = window().map_err(|e| FetchError::Network(e.0))?;

    let response: Response = JsFuture::from(window.fetch_with_str(url.as_str()))
        .await
        .map_err(network)?
        .dyn_into()
        .map_err(network)?;

    // Response.url is empty for synthesized responses
    let final_url = Url::parse(&response.url()).unwrap_or(url);
    let content_type = response.headers().get("content-type").map_err(network)?;
    let body = JsFuture::from(response.text().map_err(network)?)
        .await
        .map_err(network)?
        .as_string()
        .unwrap_or_default();

    Ok(FetchResponse {
        url: final_url,
        status: response.status(),
        content_type,
        body,
    })
}

pub struct WebParser;

impl HtmlParser for WebParser {
    fn parse(&self, html: &str) -> Result<Document, FetchError> {
        dom::parse_document(html).map_err(|e| FetchError::Parse(describe(e)))
    }
}

// =============================================================================
// Browser
// =============================================================================

pub struct WebBrowser {
    window: Window,
    document: DomDocument,
    config: RouterConfig,
    /// Last location that parsed, for the odd `about:` or opaque origin
    last_location: RefCell<Option<Url>>,
}

impl WebBrowser {
    pub fn new(config: RouterConfig) -> Result<Self, HostError> {
        let window = window()?;
        let document = window
            .document()
            .ok_or_else(|| HostError::from("no document"))?;
        Ok(Self {
            window,
            document,
            config,
            last_location: RefCell::new(None),
        })
    }

    pub fn dom(&self) -> &DomDocument {
        &self.document
    }

    fn body(&self) -> Result<web_sys::HtmlElement, HostError> {
        self.document
            .body()
            .ok_or_else(|| HostError::from("document has no <body>"))
    }

    fn announcer(&self) -> Result<web_sys::Element, JsValue> {
        if let Some(existing) = self.document.get_element_by_id(&self.config.announcer_id) {
            return Ok(existing);
        }
        let el = self.document.create_element("route-announcer")?;
        el.set_id(&self.config.announcer_id);
        el.set_attribute("aria-live", "assertive")?;
        el.set_attribute("aria-atomic", "true")?;
        el.set_attribute(
            "style",
            "position: absolute; left: 0; top: 0; clip: rect(0 0 0 0); clip-path: inset(50%); overflow: hidden; white-space: nowrap; width: 1px; height: 1px",
        )?;
        el.set_attribute(&self.config.persist_attr, "")?;
        if let Some(body) = self.document.body() {
            body.append_child(&el)?;
        }
        Ok(el)
    }
}

impl Browser for WebBrowser {
    fn location(&self) -> Url {
        let href = self.window.location().href().ok();
        match href.as_deref().map(Url::parse) {
            Some(Ok(url)) => {
                *self.last_location.borrow_mut() = Some(url.clone());
                url
            }
            _ => self
                .last_location
                .borrow()
                .clone()
                .or_else(|| self.document.url().ok().and_then(|u| Url::parse(&u).ok()))
                .unwrap_or_else(|| Url::parse("about:blank").expect("static url")),
        }
    }

    fn assign(&self, url: &Url) {
        if let Err(err) = self.window.location().assign(url.as_str()) {
            web_sys::console::error_1(&format!("[WebBrowser] assign failed: {}", describe(err)).into());
        }
    }

    fn push_state(&self, url: &Url) -> Result<(), HostError> {
        self.window
            .history()
            .map_err(host_err)?
            .push_state_with_url(&JsValue::NULL, "", Some(url.as_str()))
            .map_err(host_err)
    }

    fn replace_state(&self, url: &Url) -> Result<(), HostError> {
        self.window
            .history()
            .map_err(host_err)?
            .replace_state_with_url(&JsValue::NULL, "", Some(url.as_str()))
            .map_err(host_err)
    }

    fn scroll_to_fragment(&self, id: &str) {
        if let Some(el) = self.document.get_element_by_id(id) {
            el.scroll_into_view();
        }
    }

    fn scroll_to_top(&self) {
        let opts = web_sys::ScrollToOptions::new();
        opts.set_top(0.0);
        opts.set_behavior(web_sys::ScrollBehavior::Smooth);
        self.window.scroll_to_with_scroll_to_options(&opts);
    }

    fn start_loading(&self) {
        let result = (|| -> Result<(), JsValue> {
            let bar = self
                .document
                .create_element("div")?
                .dyn_into::<web_sys::HtmlElement>()?;
            bar.set_class_name("navigation-progress");
            bar.style().set_property("width", "0")?;
            if let Some(body) = self.document.body() {
                body.append_child(&bar)?;
            }
            // grows on the next frame so the transition runs
            let grow = wasm_bindgen::closure::Closure::once_into_js(move || {
                let _ = bar.style().set_property("width", "100%");
            });
            self.window
                .request_animation_frame(grow.unchecked_ref())
                .map(|_| ())
        })();
        if let Err(err) = result {
            tracing::debug!(err = %describe(err), "progress bar unavailable");
        }
    }

    fn set_title(&self, title: &str) {
        self.document.set_title(title);
    }

    fn announce(&self, message: &str) {
        match self.announcer() {
            Ok(el) => el.set_text_content(Some(message)),
            Err(err) => {
                web_sys::console::error_1(&format!("[WebBrowser] announcer: {}", describe(err)).into())
            }
        }
    }

    fn document(&self) -> Result<Document, HostError> {
        dom::snapshot(&self.document).map_err(host_err)
    }

    fn patch_body(&self, patches: &[Patch]) -> Result<(), HostError> {
        dom::apply_patches(&self.body()?, patches).map_err(host_err)
    }

    fn replace_head(&self, head: &Element, preserve_attr: &str) -> Result<(), HostError> {
        let live = self
            .document
            .head()
            .ok_or_else(|| HostError::from("document has no <head>"))?;

        let stale = live
            .query_selector_all(&format!(":scope > :not([{}])", preserve_attr))
            .map_err(host_err)?;
        for i in 0..stale.length() {
            if let Some(node) = stale.item(i) {
                live.remove_child(&node).map_err(host_err)?;
            }
        }

        for child in head.element_children() {
            if child.has_attr(preserve_attr) {
                continue;
            }
            let node = dom::element_to_dom(&self.document, child).map_err(host_err)?;
            live.append_child(&node).map_err(host_err)?;
        }
        Ok(())
    }
}
