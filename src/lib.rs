//! GardenCore: SPA navigation, stacked notes and transclusion engine
//!
//! A Rust/WASM implementation of the digital-garden page runtime.
//!
//! # Architecture
//!
//! ## Runtime (browser)
//! - `store/` - Page Content Store: single-flight memoized fetch of content roots
//! - `dag/` - History DAG: ordered open set of stacked notes
//! - `router/` - Navigation Router: click classification, fetch + morph, history
//! - `stacked/` - Stacked Note Manager: panels, layout math, URL persistence
//! - `preview.rs` - Hover previews with single active request cancellation
//! - `lifecycle.rs` - `prenav`/`nav` events and the disposer registry
//! - `logging.rs` - `tracing` subscriber that writes to the browser console
//! - `session.rs` - The injected session object that owns all of the above
//! - `browser/` - `web-sys` implementations of the host seams (wasm32 only)
//!
//! ## Build time (native or WASM)
//! - `hast/` - Owned hypertext tree, serializer and morph diff
//! - `transclude/` - Transclusion, collapsible headers, footnote/bibliography merge
//!
//! # Usage (WASM)
//! ```javascript,ignore
//! import init, { GardenRuntime, transcludePage } from 'gardencore';
//!
//! await init();
//!
//! // Browser: take over link clicks and history
//! const runtime = GardenRuntime.mount({ stacked: { title_width: 40 } });
//! document.addEventListener("nav", (e) => console.log(e.detail.url));
//!
//! // Build: resolve transclusions in a page tree
//! const out = transcludePage(pageData, allPages, { dynalist: true });
//! console.log(out.tree, out.readingTime);
//! ```

pub mod config;
pub mod content_index;
pub mod dag;
pub mod error;
pub mod hash;
pub mod hast;
pub mod lifecycle;
pub mod logging;
pub mod preview;
pub mod router;
pub mod session;
pub mod slug;
pub mod stacked;
pub mod store;
pub mod transclude;
pub mod wasm;

#[cfg(target_arch = "wasm32")]
pub mod browser;

#[cfg(test)]
pub(crate) mod testing;

// Public exports
pub use config::GardenConfig;
pub use dag::{DagNode, HistoryDag};
pub use error::{ConfigError, FetchError, HashError, NavigationError};
pub use hash::CanonicalHash;
pub use hast::{Element, Node, Root};
pub use lifecycle::{CleanupRegistry, Disposer, EventBus, LifecycleEvent};
pub use router::{NavigationOutcome, Router};
pub use session::Session;
pub use slug::Slug;
pub use stacked::StackedNotes;
pub use store::{ContentStore, PageFragmentSet};

use wasm_bindgen::prelude::*;

// When the `wee_alloc` feature is enabled, use `wee_alloc` as the global
// allocator for smaller WASM bundle size.
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Get version information
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
