//! Navigation Router
//!
//! Owns the current route and mediates every transition to it:
//! - same-page fragment links scroll locally and push history
//! - when stacked mode is active, links are handed to `StackedNotes`
//! - otherwise the target document is fetched, the live body is morphed
//!   to match it, the head is swapped, and history is updated
//!
//! Every failure on the morph path ends in a full browser navigation.
//! Navigations are numbered; one whose fetch resolves after a newer
//! navigation has started is dropped instead of applied.

pub mod host;
pub mod links;

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use url::Url;

use crate::config::RouterConfig;
use crate::error::NavigationError;
use crate::hast::morph;
use crate::lifecycle::{CleanupRegistry, EventBus, LifecycleEvent};
use crate::slug::Slug;
use crate::stacked::{AddOutcome, StackedNotes};
use crate::store::{load_document, ContentStore};

pub use host::Browser;
pub use links::{classify, is_same_page, AddMode, ClickAction, LinkClick, Modifiers};

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// Body morphed in place; route is now `slug`
    Morphed { slug: Slug },
    /// Scrolled to a fragment on the current page
    InPage,
    /// Handled by the stacked-notes manager
    Stacked { slug: Slug, outcome: AddOutcome },
    /// Fell back to a full browser navigation
    FullReload,
    /// A newer navigation started before this one finished
    Superseded,
    /// Nothing to do
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigateOptions {
    /// Replaying a back/forward entry: no scrolling, no new history entry
    pub is_back: bool,
    /// Scroll to the fragment or the top after morphing
    pub scroll: bool,
}

impl Default for NavigateOptions {
    fn default() -> Self {
        Self {
            is_back: false,
            scroll: true,
        }
    }
}

// =============================================================================
// Router
// =============================================================================

pub struct Router {
    browser: Rc<dyn Browser>,
    store: Rc<ContentStore>,
    stacked: Rc<StackedNotes>,
    bus: EventBus,
    cleanup: CleanupRegistry,
    config: RouterConfig,
    generation: Cell<u64>,
    current: RefCell<Url>,
}

impl Router {
    pub fn new(
        browser: Rc<dyn Browser>,
        store: Rc<ContentStore>,
        stacked: Rc<StackedNotes>,
        bus: EventBus,
        cleanup: CleanupRegistry,
        config: RouterConfig,
    ) -> Self {
        let current = browser.location();
        Self {
            browser,
            store,
            stacked,
            bus,
            cleanup,
            config,
            generation: Cell::new(0),
            current: RefCell::new(current),
        }
    }

    /// Classify a click against the current location.
    pub fn classify(&self, click: &LinkClick) -> ClickAction {
        classify(click, &self.browser.location(), self.stacked.is_active())
    }

    /// Carry out a classified click.
    pub async fn follow(&self, action: ClickAction) -> NavigationOutcome {
        match action {
            ClickAction::Ignore => NavigationOutcome::Ignored,
            ClickAction::InPage { url } => self.scroll_in_page(&url),
            ClickAction::Navigate { url, scroll } => {
                self.navigate_with(
                    url,
                    NavigateOptions {
                        is_back: false,
                        scroll,
                    },
                )
                .await
            }
            ClickAction::Stacked { url, origin, mode } => {
                let slug = Slug::for_stack(&url);
                let outcome = self.stacked.navigate(url, origin, mode).await;
                NavigationOutcome::Stacked { slug, outcome }
            }
        }
    }

    pub async fn navigate(&self, url: Url, is_back: bool) -> NavigationOutcome {
        self.navigate_with(
            url,
            NavigateOptions {
                is_back,
                ..NavigateOptions::default()
            },
        )
        .await
    }

    pub async fn navigate_with(&self, url: Url, opts: NavigateOptions) -> NavigationOutcome {
        if self.stacked.is_active() {
            let slug = Slug::for_stack(&url);
            let outcome = self.stacked.navigate(url, None, AddMode::Branch).await;
            return NavigationOutcome::Stacked { slug, outcome };
        }

        let generation = self.generation.get() + 1;
        self.generation.set(generation);
        let started = instant::Instant::now();

        match self.try_navigate(url.clone(), opts, generation).await {
            Ok(outcome) => {
                tracing::debug!(
                    %url,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    ?outcome,
                    "navigation finished"
                );
                outcome
            }
            Err(err) => {
                tracing::warn!(%url, %err, "falling back to full navigation");
                self.browser.assign(&url);
                NavigationOutcome::FullReload
            }
        }
    }

    async fn try_navigate(
        &self,
        url: Url,
        opts: NavigateOptions,
        generation: u64,
    ) -> Result<NavigationOutcome, NavigationError> {
        self.browser.start_loading();

        let fetcher = self.store.fetcher();
        let parser = self.store.parser();
        let loaded = load_document(&*fetcher, &*parser, url.clone()).await?;

        if generation != self.generation.get() {
            tracing::debug!(%url, "dropping superseded navigation");
            return Ok(NavigationOutcome::Superseded);
        }

        // no await past this point: the swap below is not interleaved
        self.bus.emit(&LifecycleEvent::PreNavigation);
        let drained = self.cleanup.drain();
        tracing::debug!(drained, "previous page cleaned up");

        let document = loaded.document;
        let doc_title = document.title();
        let title = doc_title
            .clone()
            .or_else(|| document.first_h1())
            .unwrap_or_else(|| url.path().to_string());
        if let Some(doc_title) = &doc_title {
            self.browser.set_title(doc_title);
        }

        let live = self.browser.document()?;
        let patches = morph(&live.body, &document.body, &self.config.persist_attr);
        self.browser
            .patch_body(&patches)
            .map_err(|e| NavigationError::Morph(e.0))?;
        self.browser.announce(&title);

        if !opts.is_back && opts.scroll {
            match url.fragment().filter(|f| !f.is_empty()) {
                Some(fragment) => self.browser.scroll_to_fragment(&decode_fragment(fragment)),
                None => self.browser.scroll_to_top(),
            }
        }

        self.browser
            .replace_head(&document.head, &self.config.head_preserve_attr)?;

        if !opts.is_back {
            self.browser.push_state(&url)?;
        }

        let slug = Slug::from_url(&url);
        *self.current.borrow_mut() = url;
        self.bus.notify_nav(slug.clone());
        Ok(NavigationOutcome::Morphed { slug })
    }

    /// Scroll to a fragment on the current page and record it in history.
    pub fn scroll_in_page(&self, url: &Url) -> NavigationOutcome {
        if let Some(fragment) = url.fragment() {
            self.browser.scroll_to_fragment(&decode_fragment(fragment));
        }
        if let Err(err) = self.browser.push_state(url) {
            tracing::warn!(%err, "pushState failed");
        }
        *self.current.borrow_mut() = url.clone();
        NavigationOutcome::InPage
    }

    /// Back/forward: replay the entry without pushing history. A fragment
    /// change on the current page only scrolls.
    pub async fn on_popstate(&self) -> NavigationOutcome {
        let location = self.browser.location();
        let fragment_only = {
            let current = self.current.borrow();
            location.fragment().is_some_and(|f| !f.is_empty()) && is_same_page(&location, &current)
        };
        if fragment_only {
            if let Some(fragment) = location.fragment() {
                self.browser.scroll_to_fragment(&decode_fragment(fragment));
            }
            *self.current.borrow_mut() = location;
            return NavigationOutcome::InPage;
        }
        self.navigate(location, true).await
    }

    /// Navigate to `href` resolved against the current location.
    pub async fn go(&self, href: &str) -> NavigationOutcome {
        match self.browser.location().join(href) {
            Ok(url) => self.navigate(url, false).await,
            Err(err) => {
                tracing::warn!(href, %err, "cannot resolve navigation target");
                NavigationOutcome::Ignored
            }
        }
    }

    pub fn current(&self) -> Url {
        self.current.borrow().clone()
    }

    pub fn current_slug(&self) -> Slug {
        Slug::from_url(&self.current.borrow())
    }
}

fn decode_fragment(fragment: &str) -> String {
    percent_encoding::percent_decode_str(fragment)
        .decode_utf8_lossy()
        .into_owned()
}
