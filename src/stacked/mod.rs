//! Stacked Note Manager
//!
//! Shows the open notes side by side as a horizontally scrolling column.
//! The open set lives in a `HistoryDag`; the URL carries it as repeated
//! `stackedNotes=<hash>` parameters so a stack can be bookmarked and
//! restored.
//!
//! State is only touched synchronously between awaits, so a DAG mutation
//! is never observed half-done.

pub mod column;
pub mod layout;
pub mod panel;

use futures::future::join_all;
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use url::Url;

use crate::config::StackedConfig;
use crate::content_index::ContentIndexLoader;
use crate::dag::{DagNode, HistoryDag};
use crate::hash::CanonicalHash;
use crate::lifecycle::{CleanupRegistry, EventBus};
use crate::router::{AddMode, Browser};
use crate::slug::Slug;
use crate::store::{ContentStore, PageFragmentSet};

pub use column::NoteColumn;
pub use layout::{LayoutScheduler, PanelOffset, PanelRect, PanelState};
pub use panel::PANEL_CLASS;

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// A new panel was appended
    Added,
    /// The note was already open and got focused
    Focused,
    /// Stacked mode was switched on with the current page as root
    Opened,
    /// Nothing could be fetched; the stack is unchanged past truncation
    Failed,
}

#[derive(Default)]
struct StackedState {
    active: bool,
    dag: HistoryDag,
}

// =============================================================================
// StackedNotes
// =============================================================================

pub struct StackedNotes {
    browser: Rc<dyn Browser>,
    column: Rc<dyn NoteColumn>,
    store: Rc<ContentStore>,
    index: Rc<ContentIndexLoader>,
    bus: EventBus,
    cleanup: CleanupRegistry,
    config: StackedConfig,
    scheduler: LayoutScheduler,
    state: RefCell<StackedState>,
}

impl StackedNotes {
    pub fn new(
        browser: Rc<dyn Browser>,
        column: Rc<dyn NoteColumn>,
        store: Rc<ContentStore>,
        index: Rc<ContentIndexLoader>,
        bus: EventBus,
        cleanup: CleanupRegistry,
        config: StackedConfig,
    ) -> Self {
        let scheduler =
            LayoutScheduler::new(Rc::clone(&column), config.title_width, config.collapse_edge);
        Self {
            browser,
            column,
            store,
            index,
            bus,
            cleanup,
            config,
            scheduler,
            state: RefCell::new(StackedState::default()),
        }
    }

    pub fn is_active(&self) -> bool {
        self.state.borrow().active
    }

    pub fn ordered_slugs(&self) -> Vec<Slug> {
        self.state.borrow().dag.ordered_slugs()
    }

    pub fn has(&self, slug: &Slug) -> bool {
        self.state.borrow().dag.has(slug)
    }

    // -------------------------------------------------------------------------
    // Activation
    // -------------------------------------------------------------------------

    /// Switch stacked mode on with the current page as the root note, then
    /// restore any notes listed in the URL.
    pub async fn open(&self) -> bool {
        let location = self.browser.location();
        let document = match self.browser.document() {
            Ok(document) => document,
            Err(err) => {
                tracing::warn!(%err, "cannot read current page");
                return false;
            }
        };

        let root_slug = Slug::for_stack(&location);
        let Some(contents) =
            PageFragmentSet::extract(&document, &root_slug, self.store.content_root_class())
        else {
            tracing::warn!(slug = %root_slug, "current page has no content roots");
            return false;
        };
        self.store.insert(Slug::from_url(&location), contents.clone());

        {
            let mut state = self.state.borrow_mut();
            state.dag.clear();
            state.dag.add_node(DagNode::new(root_slug.clone(), contents));
            state.active = true;
        }
        self.column.set_active(true);

        self.init_from_params(&location).await;
        self.update_url();
        self.render().await;
        self.bus.notify_nav(root_slug);
        true
    }

    /// Append every note named by a `stackedNotes` parameter. Fetches run
    /// together; insertion follows parameter order.
    pub async fn init_from_params(&self, location: &Url) -> usize {
        let mut queued: Vec<Slug> = Vec::new();
        for (key, token) in location.query_pairs() {
            if key != self.config.query_param.as_str() {
                continue;
            }
            let Some(slug) = CanonicalHash::decode(&token) else {
                continue;
            };
            if self.has(&slug) {
                self.bus.notify_nav(slug);
                continue;
            }
            if !queued.contains(&slug) {
                queued.push(slug);
            }
        }

        let mut fetches = Vec::with_capacity(queued.len());
        for slug in &queued {
            match slug.to_url(location) {
                Ok(url) => fetches.push(self.store.fetch(&url)),
                Err(err) => tracing::warn!(%slug, %err, "cannot build note URL"),
            }
        }
        let results = join_all(fetches).await;

        let mut added = 0;
        let mut state = self.state.borrow_mut();
        for (slug, result) in queued.into_iter().zip(results) {
            match result {
                Some(contents) => {
                    state.dag.add_node(DagNode::new(slug, contents));
                    added += 1;
                }
                None => tracing::warn!(%slug, "skipping stacked note without content"),
            }
        }
        added
    }

    /// Leave stacked mode and tear down everything it registered.
    pub fn destroy(&self) {
        {
            let mut state = self.state.borrow_mut();
            state.active = false;
            state.dag.clear();
        }
        self.column.clear();
        self.column.set_active(false);

        let mut url = self.browser.location();
        strip_param(&mut url, &self.config.query_param);
        if let Err(err) = self.browser.replace_state(&url) {
            tracing::warn!(%err, "replaceState failed");
        }

        let drained = self.cleanup.drain();
        tracing::debug!(drained, "stacked notes destroyed");
    }

    /// Toggle between stacked and normal mode.
    pub async fn toggle(&self) -> bool {
        if self.is_active() {
            self.destroy();
            false
        } else {
            self.open().await
        }
    }

    // -------------------------------------------------------------------------
    // Navigation
    // -------------------------------------------------------------------------

    /// Router entry point: activate if needed, then add and re-render.
    pub async fn navigate(&self, url: Url, origin: Option<Slug>, mode: AddMode) -> AddOutcome {
        if !self.is_active() {
            if !self.open().await {
                return AddOutcome::Failed;
            }
            if self.has(&Slug::for_stack(&url)) {
                return AddOutcome::Opened;
            }
        }
        let outcome = self.add(url, origin, mode).await;
        self.render().await;
        outcome
    }

    /// Open `url` as a new panel.
    ///
    /// An already-open note is focused instead. In `Branch` mode everything
    /// after `origin` is dropped first, so the stack stays the path from the
    /// root to the note being branched from.
    pub async fn add(&self, url: Url, origin: Option<Slug>, mode: AddMode) -> AddOutcome {
        let slug = Slug::for_stack(&url);

        if self.has(&slug) {
            self.bus.notify_nav(slug.clone());
            self.focus(&slug);
            return AddOutcome::Focused;
        }

        if mode == AddMode::Branch {
            if let Some(origin) = &origin {
                let mut state = self.state.borrow_mut();
                if state.dag.has(origin) {
                    state.dag.truncate_after(origin);
                }
            }
        }

        let Some(contents) = self.store.fetch(&url).await else {
            return AddOutcome::Failed;
        };

        {
            let mut state = self.state.borrow_mut();
            if state.dag.has(&slug) {
                // opened by a concurrent add while fetching
                return AddOutcome::Focused;
            }
            let fragment = url.fragment().filter(|f| !f.is_empty()).map(str::to_string);
            state.dag.add_node(
                DagNode::new(slug, contents)
                    .with_anchor(url.as_str())
                    .with_hash(fragment),
            );
        }

        self.sync_panels().await;
        self.update_url();
        self.bus.notify_nav(Slug::from_url(&url));
        AddOutcome::Added
    }

    pub fn focus(&self, slug: &Slug) {
        self.column.focus_panel(slug, self.config.focus_highlight_ms);
    }

    // -------------------------------------------------------------------------
    // URL persistence
    // -------------------------------------------------------------------------

    /// Rewrite the `stackedNotes` parameters to match the open stack.
    pub fn update_url(&self) {
        let hashes = self.hashes();
        let mut url = self.browser.location();
        url.set_fragment(None);
        strip_param(&mut url, &self.config.query_param);
        if !hashes.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for hash in &hashes {
                pairs.append_pair(&self.config.query_param, hash.as_str());
            }
        }
        if let Err(err) = self.browser.replace_state(&url) {
            tracing::warn!(%err, "replaceState failed");
        }
        self.apply_offsets();
        self.column.mark_links(&self.ordered_slugs());
    }

    /// `stackedNotes=<hash>` for every open note, joined by `&`
    pub fn chain(&self) -> String {
        self.hashes()
            .iter()
            .map(|hash| {
                let encoded: String =
                    url::form_urlencoded::byte_serialize(hash.as_str().as_bytes()).collect();
                format!("{}={}", self.config.query_param, encoded)
            })
            .collect::<Vec<_>>()
            .join("&")
    }

    fn hashes(&self) -> Vec<CanonicalHash> {
        self.state
            .borrow()
            .dag
            .ordered_nodes()
            .into_iter()
            .map(DagNode::canonical_hash)
            .collect()
    }

    // -------------------------------------------------------------------------
    // Rendering
    // -------------------------------------------------------------------------

    /// Reconcile mounted panels with the DAG, lay them out, and reveal the
    /// rightmost one.
    pub async fn render(&self) {
        if !self.is_active() {
            return;
        }

        if layout::is_mobile(self.column.viewport_width(), self.config.mobile_breakpoint) {
            self.render_mobile().await;
            return;
        }

        self.sync_panels().await;
        self.apply_offsets();

        let (count, tail) = {
            let state = self.state.borrow();
            let tail = state.dag.tail().map(|n| (n.slug.clone(), n.hash.clone()));
            (state.dag.len(), tail)
        };
        self.column
            .set_column_width(layout::column_width(count, self.config.content_width));
        if let Some((slug, Some(fragment))) = &tail {
            self.column
                .scroll_panel_to(slug, fragment, self.config.heading_scroll_buffer);
        }
        self.column.mark_links(&self.ordered_slugs());

        let column = Rc::clone(&self.column);
        self.column.request_frame(Box::new(move || column.scroll_to_end()));
        self.schedule_layout();
    }

    async fn render_mobile(&self) {
        let tail = self.state.borrow().dag.tail().cloned();
        let Some(tail) = tail else {
            return;
        };
        for slug in self.column.mounted() {
            if slug != tail.slug {
                self.column.unmount(&slug);
            }
        }
        if self.column.mounted().is_empty() {
            let index = self.index.load().await;
            let offset = PanelOffset {
                left: 0.0,
                right: 0.0,
            };
            let panel =
                panel::build_panel(&tail, offset, index.get(&tail.slug), &self.ordered_slugs());
            if let Err(err) = self.column.mount(&panel) {
                tracing::warn!(%err, slug = %tail.slug, "cannot mount panel");
            }
        }
    }

    /// Unmount panels whose note is gone; mount panels for new notes.
    async fn sync_panels(&self) {
        let open = self.ordered_slugs();
        let wanted: HashSet<&Slug> = open.iter().collect();
        let mut mounted: HashSet<Slug> = HashSet::new();
        for slug in self.column.mounted() {
            if wanted.contains(&slug) {
                mounted.insert(slug);
            } else {
                self.column.unmount(&slug);
            }
        }
        if mounted.len() == open.len() {
            return;
        }

        let index = self.index.load().await;
        let nodes: Vec<DagNode> = {
            let state = self.state.borrow();
            state.dag.ordered_nodes().into_iter().cloned().collect()
        };
        let offsets = layout::panel_offsets(
            nodes.len(),
            self.config.title_width,
            self.config.content_width,
        );
        for (node, offset) in nodes.iter().zip(offsets) {
            if mounted.contains(&node.slug) {
                continue;
            }
            let panel = panel::build_panel(node, offset, index.get(&node.slug), &open);
            if let Err(err) = self.column.mount(&panel) {
                tracing::warn!(%err, slug = %node.slug, "cannot mount panel");
            }
        }
    }

    fn apply_offsets(&self) {
        let slugs = self.ordered_slugs();
        let offsets =
            layout::panel_offsets(slugs.len(), self.config.title_width, self.config.content_width);
        for (slug, offset) in slugs.iter().zip(offsets) {
            self.column.set_panel_right(slug, offset.right);
        }
    }

    /// Scroll/resize hook: recompute collision states on the next frame.
    pub fn schedule_layout(&self) -> bool {
        self.scheduler.schedule()
    }
}

/// Remove every `param` pair from the query, keeping the others in order.
fn strip_param(url: &mut Url, param: &str) {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != param)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    url.set_query(None);
    if !kept.is_empty() {
        url.query_pairs_mut().extend_pairs(kept);
    }
}

#[cfg(test)]
mod tests;
