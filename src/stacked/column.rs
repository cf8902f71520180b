//! The DOM column that hosts stacked panels.

use crate::error::HostError;
use crate::hast::Element;
use crate::slug::Slug;

use super::layout::{PanelRect, PanelState};

pub trait NoteColumn {
    fn viewport_width(&self) -> f64;

    /// Width of the scroll container
    fn client_width(&self) -> f64;

    /// Toggle the container's active state (and the page's normal layout)
    fn set_active(&self, active: bool);

    /// `data-slug` of every mounted panel, in DOM order
    fn mounted(&self) -> Vec<Slug>;

    /// Append a rendered panel
    fn mount(&self, panel: &Element) -> Result<(), HostError>;

    fn unmount(&self, slug: &Slug);

    fn clear(&self);

    fn set_column_width(&self, px: f64);

    fn set_panel_right(&self, slug: &Slug, px: f64);

    /// Smooth-scroll the column so the rightmost panel is visible
    fn scroll_to_end(&self);

    /// Scroll a panel's content so the element `fragment` sits `buffer` px
    /// below the top
    fn scroll_panel_to(&self, slug: &Slug, fragment: &str, buffer: f64);

    /// Scroll the panel into view and highlight it for `highlight_ms`
    fn focus_panel(&self, slug: &Slug, highlight_ms: u32);

    /// Add the `dag` class to internal links pointing at open notes and
    /// remove it from the rest
    fn mark_links(&self, open: &[Slug]);

    fn panel_rects(&self) -> Vec<PanelRect>;

    /// Apply collision states to mounted panels, in DOM order
    fn apply_states(&self, states: &[PanelState]);

    /// Run `f` on the next animation frame
    fn request_frame(&self, f: Box<dyn FnOnce()>);
}
