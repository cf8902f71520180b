//! Configuration types and defaults for the garden runtime.
//!
//! Every section deserializes with `#[serde(default)]`, so a partial JSON
//! object only overrides the keys it names.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// =============================================================================
// Stacked Notes
// =============================================================================

/// Geometry and URL settings for stacked-notes mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackedConfig {
    /// Width of a collapsed panel's title strip in px. Default: 40
    pub title_width: f64,
    /// Width of an expanded panel in px. Default: 620
    pub content_width: f64,
    /// Viewports at or below this width only show the tail note. Default: 800
    pub mobile_breakpoint: f64,
    /// The last panel collapses when it is this close to the viewport edge. Default: 50
    pub collapse_edge: f64,
    /// Space kept above a heading scrolled into view. Default: 12
    pub heading_scroll_buffer: f64,
    /// Duration of the focus highlight in ms. Default: 500
    pub focus_highlight_ms: u32,
    /// Repeated query parameter holding the open stack. Default: "stackedNotes"
    pub query_param: String,
}

impl Default for StackedConfig {
    fn default() -> Self {
        Self {
            title_width: 40.0,
            content_width: 620.0,
            mobile_breakpoint: 800.0,
            collapse_edge: 50.0,
            heading_scroll_buffer: 12.0,
            focus_highlight_ms: 500,
            query_param: "stackedNotes".to_string(),
        }
    }
}

// =============================================================================
// Router
// =============================================================================

/// DOM markers the router reads and writes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Class flagging content-root elements. Default: "popover-hint"
    pub content_root_class: String,
    /// Attribute marking body elements the morph must keep. Default: "data-persist"
    pub persist_attr: String,
    /// Attribute marking head elements kept across navigations. Default: "spa-preserve"
    pub head_preserve_attr: String,
    /// Links carrying this attribute are left to the browser. Default: "data-router-ignore"
    pub router_ignore_attr: String,
    /// Links carrying this attribute do not scroll after navigating. Default: "data-router-noscroll"
    pub no_scroll_attr: String,
    /// Id of the accessibility live region. Default: "route-announcer"
    pub announcer_id: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            content_root_class: "popover-hint".to_string(),
            persist_attr: "data-persist".to_string(),
            head_preserve_attr: "spa-preserve".to_string(),
            router_ignore_attr: "data-router-ignore".to_string(),
            no_scroll_attr: "data-router-noscroll".to_string(),
            announcer_id: "route-announcer".to_string(),
        }
    }
}

// =============================================================================
// Transclusion
// =============================================================================

/// Per-page transclusion behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscludeOptions {
    /// Wrap headings into collapsible sections. Default: true
    pub dynalist: bool,
    /// Emit synthesized titles and source metadata blocks. Default: true
    pub title: bool,
}

impl Default for TranscludeOptions {
    fn default() -> Self {
        Self {
            dynalist: true,
            title: true,
        }
    }
}

/// Partial options as found in page frontmatter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscludeOverrides {
    pub dynalist: Option<bool>,
    pub title: Option<bool>,
}

impl TranscludeOptions {
    /// Apply the overrides that are set, keeping the rest.
    pub fn overlay(self, overrides: &TranscludeOverrides) -> Self {
        Self {
            dynalist: overrides.dynalist.unwrap_or(self.dynalist),
            title: overrides.title.unwrap_or(self.title),
        }
    }
}

/// User-facing strings emitted into rendered markup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Labels {
    pub link_to_original: String,
    /// `{slug}` is replaced by the transcluded page's slug
    pub transclude_title: String,
    pub footnotes: String,
    pub bibliography: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            link_to_original: "Link to original".to_string(),
            transclude_title: "Transclude of {slug}".to_string(),
            footnotes: "Footnotes".to_string(),
            bibliography: "Bibliography".to_string(),
        }
    }
}

impl Labels {
    pub fn transclude_title_for(&self, slug: &str) -> String {
        self.transclude_title.replace("{slug}", slug)
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GardenConfig {
    pub stacked: StackedConfig,
    pub router: RouterConfig,
    pub transclude: TranscludeOptions,
    pub labels: Labels,
    /// Site-relative path of the content index JSON
    pub content_index_path: String,
    /// Most verbose level written to the browser console. Default: "info"
    pub log_level: String,
}

impl Default for GardenConfig {
    fn default() -> Self {
        Self {
            stacked: StackedConfig::default(),
            router: RouterConfig::default(),
            transclude: TranscludeOptions::default(),
            labels: Labels::default(),
            content_index_path: "static/contentIndex.json".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl GardenConfig {
    /// Parse a (possibly partial) JSON config.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Preset for build-time rendering without collapsible headers.
    pub fn linear() -> Self {
        Self {
            transclude: TranscludeOptions {
                dynalist: false,
                title: true,
            },
            ..Self::default()
        }
    }
}
