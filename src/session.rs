//! Session
//!
//! One per page load. Builds the store, index loader, stacked manager,
//! router and preview controller around the host seams it is given and
//! hands out references to them; there is no global instance.

use std::rc::Rc;
use url::Url;

use crate::config::GardenConfig;
use crate::content_index::ContentIndexLoader;
use crate::error::FetchError;
use crate::lifecycle::{CleanupRegistry, Disposer, EventBus, LifecycleEvent};
use crate::preview::{Preview, PreviewController};
use crate::router::{Browser, LinkClick, NavigationOutcome, Router};
use crate::slug::Slug;
use crate::stacked::{NoteColumn, StackedNotes};
use crate::store::{ContentStore, Fetcher, HtmlParser, PageFragmentSet};

pub struct Session {
    config: GardenConfig,
    browser: Rc<dyn Browser>,
    store: Rc<ContentStore>,
    index: Rc<ContentIndexLoader>,
    bus: EventBus,
    cleanup: CleanupRegistry,
    stacked: Rc<StackedNotes>,
    router: Router,
    previews: PreviewController,
}

impl Session {
    pub fn new(
        browser: Rc<dyn Browser>,
        column: Rc<dyn NoteColumn>,
        fetcher: Rc<dyn Fetcher>,
        parser: Rc<dyn HtmlParser>,
        config: GardenConfig,
    ) -> Result<Self, FetchError> {
        let index_url = browser
            .location()
            .join(&format!("/{}", config.content_index_path.trim_start_matches('/')))?;

        let store = Rc::new(ContentStore::new(
            Rc::clone(&fetcher),
            parser,
            config.router.content_root_class.clone(),
        ));
        let index = Rc::new(ContentIndexLoader::new(fetcher, index_url));
        let bus = EventBus::new();
        let cleanup = CleanupRegistry::new();

        let stacked = Rc::new(StackedNotes::new(
            Rc::clone(&browser),
            column,
            Rc::clone(&store),
            Rc::clone(&index),
            bus.clone(),
            cleanup.clone(),
            config.stacked.clone(),
        ));
        let router = Router::new(
            Rc::clone(&browser),
            Rc::clone(&store),
            Rc::clone(&stacked),
            bus.clone(),
            cleanup.clone(),
            config.router.clone(),
        );
        let previews = PreviewController::new(Rc::clone(&store));

        Ok(Self {
            config,
            browser,
            store,
            index,
            bus,
            cleanup,
            stacked,
            router,
            previews,
        })
    }

    /// First page of the session: cache what is on screen, restore stacked
    /// mode when the URL carries open notes, and announce the page.
    /// Returns whether stacked mode was restored.
    pub async fn start(&self) -> bool {
        let location = self.browser.location();
        self.seed_current(&location);

        let has_stack = location
            .query_pairs()
            .any(|(key, _)| key == self.config.stacked.query_param.as_str());
        if has_stack && self.stacked.open().await {
            return true;
        }

        self.bus.notify_nav(Slug::from_url(&location));
        false
    }

    fn seed_current(&self, location: &Url) {
        let slug = Slug::from_url(location);
        let document = match self.browser.document() {
            Ok(document) => document,
            Err(err) => {
                tracing::warn!(%err, "cannot read current page");
                return;
            }
        };
        if let Some(set) =
            PageFragmentSet::extract(&document, &slug, self.store.content_root_class())
        {
            self.store.insert(slug, set);
        }
    }

    // -------------------------------------------------------------------------
    // Navigation
    // -------------------------------------------------------------------------

    /// Classify and carry out a link click.
    pub async fn click(&self, click: &LinkClick) -> NavigationOutcome {
        let action = self.router.classify(click);
        self.router.follow(action).await
    }

    pub async fn navigate(&self, href: &str) -> NavigationOutcome {
        self.router.go(href).await
    }

    pub async fn popstate(&self) -> NavigationOutcome {
        self.router.on_popstate().await
    }

    pub async fn toggle_stacked(&self) -> bool {
        self.stacked.toggle().await
    }

    pub async fn preview(&self, url: Url) -> Option<Preview> {
        self.previews.preview(url).await
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Listen to lifecycle events for the rest of the session.
    pub fn subscribe(&self, listener: impl Fn(&LifecycleEvent) + 'static) -> Disposer {
        self.bus.subscribe(listener)
    }

    /// Register teardown for the current page; runs on the next transition.
    pub fn add_cleanup(&self, disposer: Disposer) {
        self.cleanup.add(disposer);
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn config(&self) -> &GardenConfig {
        &self.config
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn stacked(&self) -> &StackedNotes {
        &self.stacked
    }

    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    pub fn index(&self) -> &ContentIndexLoader {
        &self.index
    }

    pub fn previews(&self) -> &PreviewController {
        &self.previews
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn cleanup(&self) -> &CleanupRegistry {
        &self.cleanup
    }
}
