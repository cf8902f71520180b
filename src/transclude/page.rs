//! Page model handed over by the markdown pipeline

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use unicode_segmentation::UnicodeSegmentation;

use crate::config::TranscludeOverrides;
use crate::content_index::{ContentLayout, ReadingTime};
use crate::hast::{Element, Root};
use crate::slug::Slug;

const WORDS_PER_MINUTE: f64 = 200.0;

/// One rendered page plus the frontmatter the engine reads
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageData {
    pub slug: Slug,
    pub file_path: Option<String>,
    /// Frontmatter title
    pub title: Option<String>,
    pub description: Option<String>,
    pub page_layout: ContentLayout,
    pub poem: bool,
    pub menu: bool,
    /// Per-page option overrides
    pub transclude: TranscludeOverrides,
    pub reading_time: Option<ReadingTime>,
    /// Indexed `^block` ids
    pub blocks: HashMap<String, Element>,
    /// Rendered body
    pub tree: Option<Root>,
}

impl PageData {
    pub fn new(slug: impl Into<Slug>, tree: Root) -> Self {
        Self {
            slug: slug.into(),
            tree: Some(tree),
            ..Self::default()
        }
    }

    /// Pages that opt out of transclusion entirely
    pub fn skips_transclusion(&self) -> bool {
        self.poem || self.menu
    }

    /// Stored reading time, else counted from the rendered text
    pub fn reading_time_or_count(&self) -> ReadingTime {
        if let Some(rt) = self.reading_time {
            return rt;
        }
        let words = self
            .tree
            .as_ref()
            .map(|tree| tree.text_content().unicode_words().count() as u64)
            .unwrap_or(0);
        ReadingTime {
            minutes: words as f64 / WORDS_PER_MINUTE,
            words,
        }
    }

    /// Key used to count a source once
    fn source_key(&self) -> String {
        self.file_path
            .clone()
            .unwrap_or_else(|| self.slug.to_string())
    }
}

/// Reading time across a host page and every distinct transcluded source
#[derive(Debug, Clone, Default)]
pub struct ReadingStats {
    pub words: u64,
    pub minutes: f64,
    sources: HashSet<String>,
}

impl ReadingStats {
    pub fn for_host(host: &PageData) -> Self {
        let mut stats = Self::default();
        stats.count(host);
        stats
    }

    /// Add `page` unless its source was already counted.
    pub fn count(&mut self, page: &PageData) -> bool {
        if !self.sources.insert(page.source_key()) {
            return false;
        }
        let rt = page.reading_time_or_count();
        self.words += rt.words;
        self.minutes += rt.minutes;
        true
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn reading_time(&self) -> ReadingTime {
        ReadingTime {
            minutes: self.minutes,
            words: self.words,
        }
    }
}
