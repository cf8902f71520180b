//! Browser runtime (wasm32 only)
//!
//! `GardenRuntime` wires a `Session` to the live page: `web-sys` hosts for
//! fetching, parsing, history and the stacked column, plus the document
//! listeners that feed clicks and history traversal into the router.
//! Lifecycle events are re-dispatched as DOM `CustomEvent`s so page scripts
//! can listen for `prenav` and `nav`.

pub mod column;
pub mod dom;
pub mod host;

use js_sys::{Function, Object, Promise, Reflect};
use std::rc::Rc;
use url::Url;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{future_to_promise, spawn_local};
use web_sys::{CustomEvent, CustomEventInit, Event, EventTarget, HtmlAnchorElement, MouseEvent};

use crate::config::{GardenConfig, RouterConfig};
use crate::lifecycle::{Disposer, LifecycleEvent};
use crate::router::{LinkClick, Modifiers, NavigationOutcome};
use crate::session::Session;
use crate::slug::Slug;
use crate::stacked::PANEL_CLASS;

pub use column::WebColumn;
pub use host::{WebBrowser, WebFetcher, WebParser};

fn log(msg: &str) {
    web_sys::console::log_1(&format!("[GardenRuntime] {}", msg).into());
}

// =============================================================================
// Event listeners
// =============================================================================

/// An event listener removed from its target on drop
struct Listener {
    target: EventTarget,
    kind: &'static str,
    callback: Closure<dyn FnMut(Event)>,
}

impl Listener {
    fn new(
        target: &EventTarget,
        kind: &'static str,
        f: impl FnMut(Event) + 'static,
    ) -> Result<Self, JsValue> {
        let callback = Closure::<dyn FnMut(Event)>::new(f);
        target.add_event_listener_with_callback(kind, callback.as_ref().unchecked_ref())?;
        Ok(Self {
            target: target.clone(),
            kind,
            callback,
        })
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        let _ = self
            .target
            .remove_event_listener_with_callback(self.kind, self.callback.as_ref().unchecked_ref());
    }
}

/// Facts about a click on (or inside) a link
fn link_click(event: &MouseEvent, config: &RouterConfig) -> Option<LinkClick> {
    let target = event.target()?.dyn_into::<web_sys::Element>().ok()?;
    let anchor = target
        .closest("a")
        .ok()??
        .dyn_into::<HtmlAnchorElement>()
        .ok()?;
    let origin_panel = anchor
        .closest(&format!(".{}", PANEL_CLASS))
        .ok()
        .flatten()
        .and_then(|panel| panel.get_attribute("data-slug"))
        .map(|slug| Slug::new(&slug));

    Some(LinkClick {
        href: anchor.href(),
        button: event.button(),
        target_blank: anchor.target() == "_blank",
        router_ignore: anchor.has_attribute(&config.router_ignore_attr),
        no_scroll: anchor.has_attribute(&config.no_scroll_attr),
        modifiers: Modifiers {
            ctrl: event.ctrl_key(),
            meta: event.meta_key(),
            alt: event.alt_key(),
            shift: event.shift_key(),
        },
        origin_panel,
    })
}

fn dispatch_lifecycle(document: &web_sys::Document, event: &LifecycleEvent) -> Result<(), JsValue> {
    let init = CustomEventInit::new();
    if let LifecycleEvent::Navigation { slug } = event {
        let detail = Object::new();
        Reflect::set(&detail, &"url".into(), &slug.as_str().into())?;
        init.set_detail(&detail);
    }
    let dom_event = CustomEvent::new_with_event_init_dict(event.name(), &init)?;
    document.dispatch_event(&dom_event).map(|_| ())
}

fn outcome_to_js(outcome: &NavigationOutcome) -> JsValue {
    let label = match outcome {
        NavigationOutcome::Morphed { .. } => "morphed",
        NavigationOutcome::InPage => "in-page",
        NavigationOutcome::Stacked { .. } => "stacked",
        NavigationOutcome::FullReload => "full-reload",
        NavigationOutcome::Superseded => "superseded",
        NavigationOutcome::Ignored => "ignored",
    };
    JsValue::from_str(label)
}

// =============================================================================
// GardenRuntime Handle
// =============================================================================

#[wasm_bindgen]
pub struct GardenRuntime {
    session: Rc<Session>,
    _listeners: Vec<Listener>,
    _bridge: Disposer,
}

#[wasm_bindgen]
impl GardenRuntime {
    /// Take over navigation on the current page.
    ///
    /// `config` is a (partial) garden config object; `undefined` keeps the
    /// defaults. Requires the stacked-notes container in the page layout.
    #[wasm_bindgen]
    pub fn mount(config: JsValue) -> Result<GardenRuntime, JsValue> {
        let config: GardenConfig = if config.is_undefined() || config.is_null() {
            GardenConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config).map_err(|e| JsValue::from_str(&e.to_string()))?
        };
        crate::logging::init_console(crate::logging::parse_level(&config.log_level));
        let js_err = |e: crate::error::HostError| JsValue::from_str(&e.to_string());

        let window = host::window().map_err(js_err)?;
        let browser = Rc::new(WebBrowser::new(config.router.clone()).map_err(js_err)?);
        let document = browser.dom().clone();
        let column = Rc::new(WebColumn::find(window.clone()).map_err(js_err)?);
        let scroller: EventTarget = column.scroller().clone().into();

        let router_config = config.router.clone();
        let session = Rc::new(
            Session::new(
                browser,
                column,
                Rc::new(WebFetcher),
                Rc::new(WebParser),
                config,
            )
            .map_err(|e| JsValue::from_str(&e.to_string()))?,
        );

        let bridge = {
            let document = document.clone();
            session.subscribe(move |event| {
                if let Err(err) = dispatch_lifecycle(&document, event) {
                    web_sys::console::error_1(&err);
                }
            })
        };

        let mut listeners = Vec::new();

        let click_session = Rc::clone(&session);
        listeners.push(Listener::new(&document, "click", move |event: Event| {
            let Some(event) = event.dyn_ref::<MouseEvent>() else {
                return;
            };
            let Some(click) = link_click(event, &router_config) else {
                return;
            };
            let action = click_session.router().classify(&click);
            if !action.is_handled() {
                return;
            }
            event.prevent_default();
            let session = Rc::clone(&click_session);
            spawn_local(async move {
                session.router().follow(action).await;
            });
        })?);

        let pop_session = Rc::clone(&session);
        listeners.push(Listener::new(&window, "popstate", move |_| {
            let session = Rc::clone(&pop_session);
            spawn_local(async move {
                session.popstate().await;
            });
        })?);

        let layout_session = Rc::clone(&session);
        listeners.push(Listener::new(&scroller, "scroll", move |_| {
            layout_session.stacked().schedule_layout();
        })?);

        let resize_session = Rc::clone(&session);
        listeners.push(Listener::new(&window, "resize", move |_| {
            let session = Rc::clone(&resize_session);
            spawn_local(async move {
                session.stacked().render().await;
            });
        })?);

        let start_session = Rc::clone(&session);
        spawn_local(async move {
            if start_session.start().await {
                log("restored stacked notes from URL");
            }
        });

        log("mounted");
        Ok(GardenRuntime {
            session,
            _listeners: listeners,
            _bridge: bridge,
        })
    }

    /// Navigate to `href` (relative to the current page). Resolves to the
    /// outcome label.
    #[wasm_bindgen]
    pub fn navigate(&self, href: String) -> Promise {
        let session = Rc::clone(&self.session);
        future_to_promise(async move {
            let outcome = session.navigate(&href).await;
            Ok(outcome_to_js(&outcome))
        })
    }

    /// Enter or leave stacked mode. Resolves to whether it is now active.
    #[wasm_bindgen(js_name = toggleStacked)]
    pub fn toggle_stacked(&self) -> Promise {
        let session = Rc::clone(&self.session);
        future_to_promise(async move { Ok(JsValue::from_bool(session.toggle_stacked().await)) })
    }

    /// Register `f` to run when the current page is torn down.
    #[wasm_bindgen(js_name = addCleanup)]
    pub fn add_cleanup(&self, f: Function) {
        self.session.add_cleanup(Disposer::new(move || {
            if let Err(err) = f.call0(&JsValue::NULL) {
                web_sys::console::error_1(&err);
            }
        }));
    }

    /// Preview of `href`: `{ kind, html, scrollTarget }`, or `undefined`
    /// when there is nothing to show or a newer preview took over.
    #[wasm_bindgen]
    pub fn preview(&self, href: String) -> Promise {
        let session = Rc::clone(&self.session);
        future_to_promise(async move {
            let url: Url = session
                .router()
                .current()
                .join(&href)
                .map_err(|e| JsValue::from_str(&e.to_string()))?;
            let Some(preview) = session.preview(url).await else {
                return Ok(JsValue::UNDEFINED);
            };
            let html: String = preview.contents.iter().map(|el| el.to_html()).collect();
            let out = Object::new();
            Reflect::set(&out, &"kind".into(), &format!("{:?}", preview.kind).to_lowercase().into())?;
            Reflect::set(&out, &"html".into(), &html.into())?;
            if let Some(target) = preview.scroll_target {
                Reflect::set(&out, &"scrollTarget".into(), &target.into())?;
            }
            Ok(out.into())
        })
    }

    #[wasm_bindgen(js_name = dismissPreview)]
    pub fn dismiss_preview(&self) {
        self.session.previews().dismiss();
    }

    /// `stackedNotes=<hash>` pairs for the open notes, joined by `&`
    #[wasm_bindgen(js_name = stackedChain)]
    pub fn stacked_chain(&self) -> String {
        self.session.stacked().chain()
    }

    #[wasm_bindgen(js_name = isStacked)]
    pub fn is_stacked(&self) -> bool {
        self.session.stacked().is_active()
    }

    #[wasm_bindgen(js_name = currentSlug)]
    pub fn current_slug(&self) -> String {
        self.session.router().current_slug().to_string()
    }
}
