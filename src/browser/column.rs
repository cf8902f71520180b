//! The stacked-notes column on the live page.
//!
//! ```text
//! #stacked-notes-container          (.active while stacked mode is on)
//!   #stacked-notes-main             (horizontal scroll container)
//!     .stacked-notes-column         (panels, width = count * content width)
//!       div.stacked-note[data-slug] ...
//! ```

use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{HtmlElement, ScrollBehavior, ScrollToOptions, Window};

use crate::error::HostError;
use crate::hast::Element;
use crate::slug::Slug;
use crate::stacked::{NoteColumn, PanelRect, PanelState, PANEL_CLASS};

use super::dom;

pub const CONTAINER_ID: &str = "stacked-notes-container";
pub const MAIN_ID: &str = "stacked-notes-main";
pub const COLUMN_CLASS: &str = "stacked-notes-column";

pub struct WebColumn {
    window: Window,
    document: web_sys::Document,
    container: HtmlElement,
    main: HtmlElement,
    column: HtmlElement,
}

fn html_element(el: Option<web_sys::Element>, what: &str) -> Result<HtmlElement, HostError> {
    el.ok_or_else(|| HostError(format!("{} not found", what)))?
        .dyn_into::<HtmlElement>()
        .map_err(|_| HostError(format!("{} is not an HTML element", what)))
}

fn log_err(context: &str, err: JsValue) {
    web_sys::console::error_1(&format!("[WebColumn] {}: {:?}", context, err).into());
}

impl WebColumn {
    pub fn find(window: Window) -> Result<Self, HostError> {
        let document = window
            .document()
            .ok_or_else(|| HostError::from("no document"))?;
        let container = html_element(document.get_element_by_id(CONTAINER_ID), CONTAINER_ID)?;
        let main = html_element(document.get_element_by_id(MAIN_ID), MAIN_ID)?;
        let column = html_element(
            main.query_selector(&format!(".{}", COLUMN_CLASS))
                .map_err(|e| HostError(format!("{:?}", e)))?,
            COLUMN_CLASS,
        )?;
        Ok(Self {
            window,
            document,
            container,
            main,
            column,
        })
    }

    /// Scroll container, for attaching the layout listener
    pub fn scroller(&self) -> &HtmlElement {
        &self.main
    }

    fn panels(&self) -> Vec<HtmlElement> {
        let Ok(list) = self
            .column
            .query_selector_all(&format!(":scope > .{}", PANEL_CLASS))
        else {
            return Vec::new();
        };
        (0..list.length())
            .filter_map(|i| list.item(i))
            .filter_map(|node| node.dyn_into::<HtmlElement>().ok())
            .collect()
    }

    fn panel(&self, slug: &Slug) -> Option<HtmlElement> {
        self.panels()
            .into_iter()
            .find(|p| p.get_attribute("data-slug").as_deref() == Some(slug.as_str()))
    }

    fn scroll_smooth(el: &HtmlElement, left: Option<f64>, top: Option<f64>) {
        let opts = ScrollToOptions::new();
        if let Some(left) = left {
            opts.set_left(left);
        }
        if let Some(top) = top {
            opts.set_top(top);
        }
        opts.set_behavior(ScrollBehavior::Smooth);
        el.scroll_to_with_scroll_to_options(&opts);
    }
}

impl NoteColumn for WebColumn {
    fn viewport_width(&self) -> f64 {
        self.window
            .inner_width()
            .ok()
            .and_then(|w| w.as_f64())
            .unwrap_or(0.0)
    }

    fn client_width(&self) -> f64 {
        self.main.client_width() as f64
    }

    fn set_active(&self, active: bool) {
        let _ = self.container.class_list().toggle_with_force("active", active);
        if let Some(body) = self.document.body() {
            let _ = body.class_list().toggle_with_force("stack-mode", active);
        }
    }

    fn mounted(&self) -> Vec<Slug> {
        self.panels()
            .iter()
            .filter_map(|p| p.get_attribute("data-slug"))
            .map(|slug| Slug::new(&slug))
            .collect()
    }

    fn mount(&self, panel: &Element) -> Result<(), HostError> {
        let node = dom::element_to_dom(&self.document, panel).map_err(|e| HostError(format!("{:?}", e)))?;
        self.column
            .append_child(&node)
            .map(|_| ())
            .map_err(|e| HostError(format!("{:?}", e)))
    }

    fn unmount(&self, slug: &Slug) {
        if let Some(panel) = self.panel(slug) {
            panel.remove();
        }
    }

    fn clear(&self) {
        self.column.set_inner_html("");
    }

    fn set_column_width(&self, px: f64) {
        if let Err(err) = self.column.style().set_property("width", &format!("{}px", px)) {
            log_err("column width", err);
        }
    }

    fn set_panel_right(&self, slug: &Slug, px: f64) {
        if let Some(panel) = self.panel(slug) {
            if let Err(err) = panel.style().set_property("right", &format!("{}px", px)) {
                log_err("panel offset", err);
            }
        }
    }

    fn scroll_to_end(&self) {
        let left = (self.column.scroll_width() - self.main.client_width()).max(0) as f64;
        Self::scroll_smooth(&self.main, Some(left), None);
    }

    fn scroll_panel_to(&self, slug: &Slug, fragment: &str, buffer: f64) {
        let Some(panel) = self.panel(slug) else {
            return;
        };
        let target = panel
            .query_selector(&format!("[id=\"{}\"]", fragment.replace('"', "\\\"")))
            .ok()
            .flatten()
            .and_then(|el| el.dyn_into::<HtmlElement>().ok());
        if let Some(target) = target {
            let top = (target.offset_top() as f64 - buffer).max(0.0);
            Self::scroll_smooth(&panel, None, Some(top));
        }
    }

    fn focus_panel(&self, slug: &Slug, highlight_ms: u32) {
        let Some(panel) = self.panel(slug) else {
            return;
        };
        Self::scroll_smooth(&self.main, Some(panel.offset_left() as f64), None);

        let classes = panel.class_list();
        if classes.add_1("highlights").is_err() {
            return;
        }
        let unhighlight = Closure::once_into_js(move || {
            let _ = classes.remove_1("highlights");
        });
        if let Err(err) = self
            .window
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                unhighlight.unchecked_ref(),
                highlight_ms as i32,
            )
        {
            log_err("highlight timer", err);
        }
    }

    fn mark_links(&self, open: &[Slug]) {
        let Ok(links) = self.column.query_selector_all("a.internal[data-slug]") else {
            return;
        };
        for i in 0..links.length() {
            let Some(link) = links.item(i).and_then(|n| n.dyn_into::<web_sys::Element>().ok())
            else {
                continue;
            };
            let is_open = link
                .get_attribute("data-slug")
                .is_some_and(|s| open.contains(&Slug::new(&s)));
            let _ = link.class_list().toggle_with_force("dag", is_open);
        }
    }

    fn panel_rects(&self) -> Vec<PanelRect> {
        self.panels()
            .iter()
            .map(|p| {
                let rect = p.get_bounding_client_rect();
                PanelRect {
                    left: rect.left(),
                    right: rect.right(),
                }
            })
            .collect()
    }

    fn apply_states(&self, states: &[PanelState]) {
        for (panel, state) in self.panels().iter().zip(states) {
            let classes = panel.class_list();
            let _ = classes.toggle_with_force("collapsed", state.collapsed);
            let _ = classes.toggle_with_force("overlay", state.overlay);
        }
    }

    fn request_frame(&self, f: Box<dyn FnOnce()>) {
        let callback = Closure::once_into_js(move || f());
        if let Err(err) = self.window.request_animation_frame(callback.unchecked_ref()) {
            log_err("animation frame", err);
        }
    }
}
