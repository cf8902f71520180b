//! Transclusion & Merge Engine
//!
//! Build-time rewrite of one rendered page:
//! 1. every `blockquote.transclude` placeholder is replaced by the content
//!    it points at (whole page, `#heading` range or `#^block`), recursively
//! 2. headings are wrapped into collapsible sections
//! 3. footnote and bibliography sections are merged
//!
//! Unresolvable placeholders stay as they are. Reading time is summed over
//! the host and every distinct transcluded source.

pub mod headers;
pub mod merge;
pub mod normalize;
pub mod page;
pub mod reader;

use serde::Serialize;
use std::collections::HashMap;

use crate::config::{Labels, TranscludeOptions};
use crate::content_index::{ContentLayout, ReadingTime};
use crate::hast::{visit, Element, Node, Root};
use crate::slug::Slug;

pub use headers::wrap_collapsible_headers;
pub use merge::{merge_isomorphic, MergeSummary};
pub use normalize::{normalize_element, normalize_node};
pub use page::{PageData, ReadingStats};
pub use reader::reader_view;

use merge::{find_entry, ListKind, BIBLIOGRAPHY, FOOTNOTES};

const PLACEHOLDER_CLASS: &str = "transclude";
const BLOCK_MARKER: &str = "#^";
const HEADING_MARKER: &str = "#";

// =============================================================================
// Output
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscludeOutput {
    pub tree: Root,
    pub reading_time: ReadingTime,
    /// Placeholders that were replaced, nested ones included
    pub resolved: usize,
}

/// Kind of a placeholder's reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    Page,
    Heading(String),
    Block(String),
}

impl Reference {
    pub fn parse(block: Option<&str>) -> Self {
        match block {
            Some(b) if b.starts_with(BLOCK_MARKER) => Reference::Block(b[BLOCK_MARKER.len()..].to_string()),
            Some(b) if b.starts_with(HEADING_MARKER) && b.len() > 1 => {
                Reference::Heading(b[HEADING_MARKER.len()..].to_string())
            }
            _ => Reference::Page,
        }
    }
}

// =============================================================================
// Entry point
// =============================================================================

/// Resolve every transclusion in `host`, then wrap headers and merge
/// references. `options` are the user options (already over defaults); the
/// host's frontmatter overrides them.
pub fn transclude_page(
    host: &PageData,
    pages: &[PageData],
    options: TranscludeOptions,
    labels: &Labels,
) -> TranscludeOutput {
    let mut tree = host.tree.clone().unwrap_or_default();

    if host.skips_transclusion() {
        return TranscludeOutput {
            tree,
            reading_time: host.reading_time_or_count(),
            resolved: 0,
        };
    }

    let options = options.overlay(&host.transclude);
    let mut engine = Engine {
        host,
        pages: pages.iter().map(|p| (&p.slug, p)).collect(),
        options,
        labels,
        stats: ReadingStats::for_host(host),
        expanding: vec![host.slug.clone()],
        footnotes: Vec::new(),
        citations: Vec::new(),
        resolved: 0,
    };
    engine.expand(&mut tree.children);
    engine.relocate_references(&mut tree);

    if options.dynalist && !host.slug.has_segment("posts") {
        tree.children = wrap_collapsible_headers(std::mem::take(&mut tree.children));
    }
    merge_isomorphic(&mut tree, None);

    tracing::debug!(
        slug = %host.slug,
        resolved = engine.resolved,
        sources = engine.stats.source_count(),
        "transclusion finished"
    );

    TranscludeOutput {
        tree,
        reading_time: engine.stats.reading_time(),
        resolved: engine.resolved,
    }
}

/// Top-level slice of `tree` covered by the heading with `id`: from that
/// heading up to the next heading of the same or shallower rank.
pub fn heading_range<'a>(tree: &'a Root, id: &str) -> Option<&'a [Node]> {
    let mut start: Option<(usize, u8)> = None;
    for (i, node) in tree.children.iter().enumerate() {
        let Some(rank) = node.as_element().and_then(Element::heading_rank) else {
            continue;
        };
        match start {
            None => {
                if node.as_element().and_then(Element::id) == Some(id) {
                    start = Some((i, rank));
                }
            }
            Some((from, depth)) if rank <= depth => return Some(&tree.children[from..i]),
            Some(_) => {}
        }
    }
    start.map(|(from, _)| &tree.children[from..])
}

fn is_reference_section(el: &Element) -> bool {
    merge::is_footnote_section(el) || merge::is_bibliography_section(el)
}

pub fn is_placeholder(el: &Element) -> bool {
    el.is("blockquote") && el.has_class(PLACEHOLDER_CLASS)
}

// =============================================================================
// Engine
// =============================================================================

struct Engine<'a> {
    host: &'a PageData,
    pages: HashMap<&'a Slug, &'a PageData>,
    options: TranscludeOptions,
    labels: &'a Labels,
    stats: ReadingStats,
    /// Slugs whose content is being expanded, outermost first
    expanding: Vec<Slug>,
    footnotes: Vec<Element>,
    citations: Vec<Element>,
    resolved: usize,
}

impl<'a> Engine<'a> {
    fn expand(&mut self, nodes: &mut [Node]) {
        for node in nodes.iter_mut() {
            let Node::Element(el) = node else { continue };
            if !is_placeholder(el) {
                self.expand(&mut el.children);
                continue;
            }
            if let Some((target, children)) = self.resolve(el) {
                el.children = children;
                self.expanding.push(target);
                self.expand(&mut el.children);
                self.expanding.pop();
            }
        }
    }

    /// Replacement children for a placeholder, or `None` to leave it.
    fn resolve(&mut self, placeholder: &Element) -> Option<(Slug, Vec<Node>)> {
        let inner = placeholder.element_children().next();
        let target = inner
            .and_then(|a| a.attr("data-slug"))
            .or_else(|| placeholder.attr("data-url"))
            .map(Slug::new)?;

        if self.expanding.contains(&target) {
            tracing::debug!(%target, "transclusion cycle left as placeholder");
            return None;
        }
        let Some(&page) = self.pages.get(&target) else {
            tracing::debug!(%target, "transclusion target not found");
            return None;
        };

        let body: Vec<Node> = match Reference::parse(placeholder.attr("data-block")) {
            Reference::Block(id) => {
                let block = page.blocks.get(&id)?;
                let block = if block.is("li") {
                    Element::new("ul").with_child(block.clone())
                } else {
                    block.clone()
                };
                vec![normalize_element(&block, &self.host.slug, &target).into()]
            }
            Reference::Heading(id) => {
                let range = heading_range(page.tree.as_ref()?, &id)?;
                self.collect_references(range, page);
                range
                    .iter()
                    .filter(|n| !n.as_element().is_some_and(is_reference_section))
                    .map(|n| normalize_node(n, &self.host.slug, &target))
                    .collect()
            }
            Reference::Page => {
                let tree = page.tree.as_ref()?;
                let mut body: Vec<Node> = Vec::with_capacity(tree.children.len() + 1);
                if self.options.overlay(&page.transclude).title {
                    let title = page
                        .title
                        .clone()
                        .unwrap_or_else(|| self.labels.transclude_title_for(target.as_str()));
                    body.push(Element::new("h1").with_text(title).into());
                }
                body.extend(
                    tree.children
                        .iter()
                        .map(|n| normalize_node(n, &self.host.slug, &target)),
                );
                body
            }
        };

        let href = inner.and_then(|a| a.attr("href")).unwrap_or_default();
        let mut children: Vec<Node> = Vec::with_capacity(body.len() + 2);
        if self.options.overlay(&page.transclude).title {
            let url = placeholder.attr("data-url").unwrap_or(target.as_str());
            let description = placeholder
                .attr("data-embed-alias")
                .filter(|alias| !alias.is_empty() && *alias != "undefined")
                .or(page.description.as_deref());
            children.push(metadata_block(href, url, description).into());
        }
        children.extend(body);
        if self.host.page_layout != ContentLayout::Reflection {
            children.push(
                Element::new("a")
                    .with_attr("href", href)
                    .with_class("internal")
                    .with_class("transclude-src")
                    .with_text(self.labels.link_to_original.clone())
                    .into(),
            );
        }

        self.stats.count(page);
        self.resolved += 1;
        Some((target, children))
    }

    /// Queue the footnotes and citations referenced from a heading range for
    /// relocation into the host's sections.
    fn collect_references(&mut self, range: &[Node], page: &PageData) {
        let Some(tree) = page.tree.as_ref() else { return };

        let mut wanted: Vec<(ListKind, String)> = Vec::new();
        visit::walk(range, &mut |el| {
            let kind = if merge::is_footnote_ref(el) {
                FOOTNOTES
            } else if merge::is_citation(el) {
                BIBLIOGRAPHY
            } else {
                return;
            };
            if let Some(id) = el.attr("href").and_then(|h| h.strip_prefix('#')) {
                wanted.push((kind, id.to_string()));
            }
        });

        for (kind, id) in wanted {
            let Some(entry) = find_entry(&tree.children, kind, &id) else {
                continue;
            };
            let entry = normalize_element(entry, &self.host.slug, &page.slug);
            if kind.list_tag == FOOTNOTES.list_tag {
                self.footnotes.push(entry);
            } else {
                self.citations.push(entry);
            }
        }
    }

    /// Append queued entries to the host's first footnote/bibliography
    /// section, creating the section when the host has none.
    fn relocate_references(&mut self, tree: &mut Root) {
        let footnotes = std::mem::take(&mut self.footnotes);
        if !footnotes.is_empty() {
            append_entries(tree, FOOTNOTES, footnotes, || footnote_section(self.labels));
        }
        let citations = std::mem::take(&mut self.citations);
        if !citations.is_empty() {
            append_entries(tree, BIBLIOGRAPHY, citations, || bibliography_section(self.labels));
        }
    }
}

fn append_entries(
    tree: &mut Root,
    kind: ListKind,
    entries: Vec<Element>,
    create: impl FnOnce() -> Element,
) {
    let entries = entries.into_iter().map(Node::Element);
    match visit::find_mut(&mut tree.children, &kind.is_section) {
        Some(section) => match section.child_mut(kind.list_tag) {
            Some(list) => list.children.extend(entries),
            None => section
                .children
                .push(Element::new(kind.list_tag).with_children(entries).into()),
        },
        None => {
            let mut section = create();
            if let Some(list) = section.child_mut(kind.list_tag) {
                list.children.extend(entries);
            }
            tree.children.push(section.into());
        }
    }
}

// =============================================================================
// Markup
// =============================================================================

/// Shortens `a/b/c/d` to `a/.../d`
fn truncate_url(url: &str) -> String {
    let parts: Vec<&str> = url.split('/').collect();
    if parts.len() > 3 {
        format!("{}/.../{}", parts[0], parts[parts.len() - 1])
    } else {
        url.to_string()
    }
}

fn metadata_block(href: &str, url: &str, description: Option<&str>) -> Element {
    let mut metadata = Element::new("ul").with_class("metadata").with_child(
        Element::new("li")
            .with_attr("style", "font-style: italic; color: var(--gray);")
            .with_text(format!("url: {}", truncate_url(url))),
    );
    if let Some(description) = description {
        metadata.children.push(
            Element::new("li")
                .with_child(
                    Element::new("span")
                        .with_attr("style", "text-decoration: underline;")
                        .with_text("description"),
                )
                .with_text(format!(": {}", description))
                .into(),
        );
    }

    Element::new("div")
        .with_class("transclude-ref")
        .with_attr("data-href", href)
        .with_child(metadata)
        .with_child(
            Element::new("button")
                .with_class("transclude-title-link")
                .with_attr("type", "button")
                .with_attr("aria-label", "Go to original link")
                .with_child(
                    Element::new("svg")
                        .with_class("blockquote-link")
                        .with_attr("fill", "none")
                        .with_attr("stroke", "currentColor")
                        .with_attr("stroke-width", "2")
                        .with_child(Element::new("use").with_attr("href", "#github-anchor")),
                ),
        )
}

fn footnote_section(labels: &Labels) -> Element {
    Element::new("section")
        .with_class("footnotes")
        .with_class("main-col")
        .with_attr("data-footnotes", "")
        .with_attr("data-transclude", "")
        .with_child(
            Element::new("h2")
                .with_class("sr-only")
                .with_attr("id", "footnote-label")
                .with_attr("dir", "auto")
                .with_child(
                    Element::new("span")
                        .with_class("highlight-span")
                        .with_text(labels.footnotes.clone()),
                ),
        )
        .with_child(Element::new("ol").with_attr("dir", "auto"))
}

fn bibliography_section(labels: &Labels) -> Element {
    Element::new("section")
        .with_class("bibliography")
        .with_class("main-col")
        .with_attr("data-references", "")
        .with_attr("data-transclude", "")
        .with_child(
            Element::new("h2")
                .with_attr("id", "reference-label")
                .with_attr("dir", "auto")
                .with_child(
                    Element::new("span")
                        .with_class("highlight-span")
                        .with_text(labels.bibliography.clone()),
                ),
        )
        .with_child(Element::new("ul").with_attr("dir", "auto"))
}

#[cfg(test)]
mod tests;
