//! Link-click classification
//!
//! Decides, from the facts of a click, whether the router takes it over and
//! how. Pure, so the browser listener only gathers the facts.

use url::Url;

use crate::slug::Slug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub meta: bool,
    pub alt: bool,
    pub shift: bool,
}

/// What the browser knows about an activated link
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkClick {
    /// Resolved `href` of the closest `<a>`
    pub href: String,
    /// Mouse button, 0 = primary
    pub button: i16,
    pub target_blank: bool,
    /// Link carries the router-ignore attribute
    pub router_ignore: bool,
    /// Link carries the no-scroll attribute
    pub no_scroll: bool,
    pub modifiers: Modifiers,
    /// Slug of the stacked panel containing the link
    pub origin_panel: Option<Slug>,
}

/// How a stacked-mode click extends the open stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddMode {
    /// Truncate after the originating panel, then append
    Branch,
    /// Append to the tail without truncating
    Append,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickAction {
    /// Leave the click to the browser
    Ignore,
    /// Same page, only the fragment differs
    InPage { url: Url },
    /// Classic fetch-and-morph navigation
    Navigate { url: Url, scroll: bool },
    /// Hand the link to the stacked-notes manager
    Stacked {
        url: Url,
        origin: Option<Slug>,
        mode: AddMode,
    },
}

impl ClickAction {
    pub fn is_handled(&self) -> bool {
        !matches!(self, ClickAction::Ignore)
    }
}

pub fn classify(click: &LinkClick, current: &Url, stacked_active: bool) -> ClickAction {
    if click.button != 0 || click.target_blank || click.router_ignore {
        return ClickAction::Ignore;
    }
    let Ok(url) = current.join(&click.href) else {
        return ClickAction::Ignore;
    };
    if url.origin() != current.origin() {
        return ClickAction::Ignore;
    }

    let mods = click.modifiers;
    if mods.ctrl || mods.meta {
        return ClickAction::Ignore;
    }

    if is_same_page(&url, current) && url.fragment().is_some_and(|f| !f.is_empty()) {
        if mods.alt || mods.shift {
            return ClickAction::Ignore;
        }
        return ClickAction::InPage { url };
    }

    if stacked_active {
        if mods.shift {
            return ClickAction::Ignore;
        }
        if mods.alt {
            // append-without-truncation only makes sense from inside a panel
            return match click.origin_panel {
                Some(_) => ClickAction::Stacked {
                    url,
                    origin: click.origin_panel.clone(),
                    mode: AddMode::Append,
                },
                None => ClickAction::Ignore,
            };
        }
        return ClickAction::Stacked {
            url,
            origin: click.origin_panel.clone(),
            mode: AddMode::Branch,
        };
    }

    if mods.alt {
        return ClickAction::Ignore;
    }
    ClickAction::Navigate {
        url,
        scroll: !click.no_scroll,
    }
}

pub fn is_same_page(a: &Url, b: &Url) -> bool {
    a.origin() == b.origin() && a.path() == b.path()
}
