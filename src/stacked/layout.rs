//! Panel geometry and collision rules, kept free of any DOM access.

use std::cell::Cell;
use std::rc::Rc;

use super::column::NoteColumn;

/// Horizontal extent of a mounted panel, in viewport px
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelRect {
    pub left: f64,
    pub right: f64,
}

/// Collision classes for one panel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PanelState {
    /// Title strip only
    pub collapsed: bool,
    /// Sliding over its left neighbour
    pub overlay: bool,
}

/// Sticky offsets for one panel, in px
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelOffset {
    pub left: f64,
    pub right: f64,
}

pub fn is_mobile(viewport_width: f64, breakpoint: f64) -> bool {
    viewport_width <= breakpoint
}

/// Each panel sticks one title width further right than its predecessor on
/// the left, and one title width further left than its successor on the
/// right, so only the rightmost panel shows at full width.
pub fn panel_offsets(count: usize, title_width: f64, content_width: f64) -> Vec<PanelOffset> {
    (0..count)
        .map(|i| PanelOffset {
            left: i as f64 * title_width,
            right: -(content_width - title_width) + (count - i - 1) as f64 * title_width,
        })
        .collect()
}

pub fn column_width(count: usize, content_width: f64) -> f64 {
    count as f64 * content_width
}

/// Collision states for panels in column order.
///
/// A panel collapses once its successor's left edge is within one title
/// width of its own left edge; the successor overlays it once that edge
/// crosses its right edge. The last panel collapses when it sits within
/// `collapse_edge` of the viewport's right side.
pub fn panel_states(
    rects: &[PanelRect],
    client_width: f64,
    title_width: f64,
    collapse_edge: f64,
) -> Vec<PanelState> {
    let mut states = vec![PanelState::default(); rects.len()];
    for (i, rect) in rects.iter().enumerate() {
        match rects.get(i + 1) {
            Some(next) => {
                states[i + 1].overlay = next.left < rect.right;
                states[i].collapsed = next.left <= rect.left + title_width;
            }
            None => {
                states[i].collapsed = client_width - rect.left <= collapse_edge;
            }
        }
    }
    states
}

// =============================================================================
// Frame scheduling
// =============================================================================

/// Coalesces scroll/resize bursts into one collision pass per animation frame
pub struct LayoutScheduler {
    column: Rc<dyn NoteColumn>,
    pending: Rc<Cell<bool>>,
    title_width: f64,
    collapse_edge: f64,
}

impl LayoutScheduler {
    pub fn new(column: Rc<dyn NoteColumn>, title_width: f64, collapse_edge: f64) -> Self {
        Self {
            column,
            pending: Rc::new(Cell::new(false)),
            title_width,
            collapse_edge,
        }
    }

    /// Request a collision pass on the next frame. Returns false if one is
    /// already queued.
    pub fn schedule(&self) -> bool {
        if self.pending.get() {
            return false;
        }
        self.pending.set(true);

        let column = Rc::clone(&self.column);
        let pending = Rc::clone(&self.pending);
        let (title_width, collapse_edge) = (self.title_width, self.collapse_edge);
        self.column.request_frame(Box::new(move || {
            pending.set(false);
            update_states(&*column, title_width, collapse_edge);
        }));
        true
    }

    pub fn is_pending(&self) -> bool {
        self.pending.get()
    }
}

pub fn update_states(column: &dyn NoteColumn, title_width: f64, collapse_edge: f64) {
    let rects = column.panel_rects();
    if rects.is_empty() {
        return;
    }
    let states = panel_states(&rects, column.client_width(), title_width, collapse_edge);
    column.apply_states(&states);
}
