//! WASM API for the build-time engines
//!
//! Exposes hashing, transclusion, reference merging, collapsible headers
//! and the reader view to JavaScript. Trees cross the boundary as plain
//! hast-shaped objects.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use wasm_bindgen::prelude::*;

use crate::config::{GardenConfig, Labels, TranscludeOptions};
use crate::hash::CanonicalHash;
use crate::hast::Root;
use crate::slug::Slug;
use crate::transclude::{self, MergeSummary, PageData};

// =============================================================================
// Conversion
// =============================================================================

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    // plain objects rather than JS Maps for attribute tables
    let serializer = serde_wasm_bindgen::Serializer::json_compatible();
    value
        .serialize(&serializer)
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

fn from_js<T: DeserializeOwned>(value: JsValue) -> Result<T, JsValue> {
    serde_wasm_bindgen::from_value(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// `undefined` and `null` become the default
fn from_js_or_default<T: DeserializeOwned + Default>(value: JsValue) -> Result<T, JsValue> {
    if value.is_undefined() || value.is_null() {
        Ok(T::default())
    } else {
        from_js(value)
    }
}

// =============================================================================
// Hashing
// =============================================================================

/// Canonical hash of a slug for the `stackedNotes` parameter
#[wasm_bindgen(js_name = encodeHash)]
pub fn encode_hash(slug: &str) -> String {
    CanonicalHash::encode(&Slug::new(slug)).to_string()
}

/// Slug for a hash, or `undefined` when the token is malformed
#[wasm_bindgen(js_name = decodeHash)]
pub fn decode_hash(token: &str) -> Option<String> {
    CanonicalHash::decode(token).map(String::from)
}

// =============================================================================
// One-shot functions
// =============================================================================

/// Resolve every transclusion in `host` against `pages`.
///
/// # Returns
/// `{ tree, readingTime: { minutes, words }, resolved }`
#[wasm_bindgen(js_name = transcludePage)]
pub fn transclude_page(
    host: JsValue,
    pages: JsValue,
    options: JsValue,
    labels: JsValue,
) -> Result<JsValue, JsValue> {
    let host: PageData = from_js(host)?;
    let pages: Vec<PageData> = from_js(pages)?;
    let options: TranscludeOptions = from_js_or_default(options)?;
    let labels: Labels = from_js_or_default(labels)?;
    to_js(&transclude::transclude_page(&host, &pages, options, &labels))
}

#[derive(Serialize)]
struct MergeResult {
    tree: Root,
    summary: MergeSummary,
}

/// Merge footnote and bibliography sections.
///
/// # Returns
/// `{ tree, summary: { citations, footnotes } }`
#[wasm_bindgen(js_name = mergeIsomorphic)]
pub fn merge_isomorphic(tree: JsValue, suffix: Option<String>) -> Result<JsValue, JsValue> {
    let mut tree: Root = from_js(tree)?;
    let summary = transclude::merge_isomorphic(&mut tree, suffix.as_deref());
    to_js(&MergeResult { tree, summary })
}

#[wasm_bindgen(js_name = wrapCollapsibleHeaders)]
pub fn wrap_collapsible_headers(tree: JsValue) -> Result<JsValue, JsValue> {
    let tree: Root = from_js(tree)?;
    to_js(&Root::new(transclude::wrap_collapsible_headers(tree.children)))
}

#[wasm_bindgen(js_name = readerView)]
pub fn reader_view(tree: JsValue) -> Result<JsValue, JsValue> {
    let tree: Root = from_js(tree)?;
    to_js(&transclude::reader_view(&tree))
}

// =============================================================================
// TranscludeIndex Handle
// =============================================================================

#[derive(Default, Deserialize)]
#[serde(default)]
struct BuildConfig {
    transclude: TranscludeOptions,
    labels: Labels,
}

/// Page index kept on the WASM side for a whole build, so every page is
/// transcluded without re-sending the site.
#[wasm_bindgen]
pub struct TranscludeIndex {
    pages: Vec<PageData>,
    positions: HashMap<Slug, usize>,
    options: TranscludeOptions,
    labels: Labels,
}

#[wasm_bindgen]
impl TranscludeIndex {
    /// `config` takes the `transclude` and `labels` sections of the garden
    /// config; missing keys keep their defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<TranscludeIndex, JsValue> {
        let config: BuildConfig = from_js_or_default(config)?;
        Ok(Self {
            pages: Vec::new(),
            positions: HashMap::new(),
            options: config.transclude,
            labels: config.labels,
        })
    }

    /// Build-time preset without collapsible headers
    #[wasm_bindgen(js_name = linear)]
    pub fn linear() -> TranscludeIndex {
        let config = GardenConfig::linear();
        Self {
            pages: Vec::new(),
            positions: HashMap::new(),
            options: config.transclude,
            labels: config.labels,
        }
    }

    /// Add or replace pages. Returns the index size.
    #[wasm_bindgen(js_name = addPages)]
    pub fn add_pages(&mut self, pages: JsValue) -> Result<usize, JsValue> {
        let pages: Vec<PageData> = from_js(pages)?;
        for page in pages {
            match self.positions.get(&page.slug) {
                Some(&i) => self.pages[i] = page,
                None => {
                    self.positions.insert(page.slug.clone(), self.pages.len());
                    self.pages.push(page);
                }
            }
        }
        Ok(self.pages.len())
    }

    /// Transclude the indexed page `slug`.
    #[wasm_bindgen]
    pub fn transclude(&self, slug: &str) -> Result<JsValue, JsValue> {
        let slug = Slug::new(slug);
        let &i = self
            .positions
            .get(&slug)
            .ok_or_else(|| JsValue::from_str(&format!("unknown page: {}", slug)))?;
        to_js(&transclude::transclude_page(
            &self.pages[i],
            &self.pages,
            self.options,
            &self.labels,
        ))
    }

    #[wasm_bindgen]
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    #[wasm_bindgen(js_name = isEmpty)]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}
