//! The browser surface the router and stacked manager drive.
//!
//! Implemented with `web-sys` in `browser::host` and by a recording fake in
//! tests. Every method is synchronous: the only suspension points in the
//! runtime are network fetches.

use url::Url;

use crate::error::HostError;
use crate::hast::{Element, Patch};
use crate::store::Document;

pub trait Browser {
    /// Current `window.location`
    fn location(&self) -> Url;

    /// Full, non-SPA navigation
    fn assign(&self, url: &Url);

    fn push_state(&self, url: &Url) -> Result<(), HostError>;

    fn replace_state(&self, url: &Url) -> Result<(), HostError>;

    /// Scroll the element with this (decoded) id into view, if it exists
    fn scroll_to_fragment(&self, id: &str);

    fn scroll_to_top(&self);

    /// Show the navigation progress indicator
    fn start_loading(&self);

    fn set_title(&self, title: &str);

    /// Write `message` into the accessibility live region, creating it
    /// (marked persistent) if needed
    fn announce(&self, message: &str);

    /// Snapshot of the live document
    fn document(&self) -> Result<Document, HostError>;

    /// Replay morph patches on the live `<body>`
    fn patch_body(&self, patches: &[Patch]) -> Result<(), HostError>;

    /// Replace every head child lacking `preserve_attr` with the children of
    /// `head` that lack it
    fn replace_head(&self, head: &Element, preserve_attr: &str) -> Result<(), HostError>;
}
