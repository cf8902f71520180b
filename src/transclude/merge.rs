//! Footnote and bibliography merging
//!
//! After transclusion a page can hold several footnote and bibliography
//! sections, one per source. `merge_isomorphic` folds each kind into its last
//! section, keeps only referenced entries in first-reference order and
//! renumbers the references from 1.
//!
//! The tree is indexed in one read-only pass (reference order, id -> entry)
//! before anything is mutated.

use serde::Serialize;
use std::collections::HashMap;

use crate::hast::{visit, Element, Node, Root};

pub fn is_footnote_ref(el: &Element) -> bool {
    el.is("a") && el.has_attr("data-footnote-ref")
}

pub fn is_footnote_section(el: &Element) -> bool {
    el.is("section") && el.has_attr("data-footnotes")
}

pub fn is_citation(el: &Element) -> bool {
    el.is("a") && el.attr("href").is_some_and(|href| href.starts_with("#bib"))
}

pub fn is_bibliography_section(el: &Element) -> bool {
    el.is("section") && el.attr("data-references") == Some("")
}

#[derive(Clone, Copy)]
enum Numbering {
    /// Reference text becomes the number
    Text,
    /// Number goes into `data-index`; the citation label stays
    Attribute,
}

#[derive(Clone, Copy)]
pub(crate) struct ListKind {
    pub(crate) is_section: fn(&Element) -> bool,
    pub(crate) is_reference: fn(&Element) -> bool,
    pub(crate) list_tag: &'static str,
    numbering: Numbering,
}

pub(crate) const FOOTNOTES: ListKind = ListKind {
    is_section: is_footnote_section,
    is_reference: is_footnote_ref,
    list_tag: "ol",
    numbering: Numbering::Text,
};

pub(crate) const BIBLIOGRAPHY: ListKind = ListKind {
    is_section: is_bibliography_section,
    is_reference: is_citation,
    list_tag: "ul",
    numbering: Numbering::Attribute,
};

/// Entries kept by one merge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeSummary {
    pub citations: usize,
    pub footnotes: usize,
}

/// Merge bibliography and footnote sections in place. `suffix` is appended
/// (as `-{suffix}`) to every retained entry id and every reference to it.
pub fn merge_isomorphic(root: &mut Root, suffix: Option<&str>) -> MergeSummary {
    MergeSummary {
        citations: merge_kind(&mut root.children, BIBLIOGRAPHY, suffix),
        footnotes: merge_kind(&mut root.children, FOOTNOTES, suffix),
    }
}

/// Entry of `kind` with `id` inside any of its sections.
pub(crate) fn find_entry<'a>(nodes: &'a [Node], kind: ListKind, id: &str) -> Option<&'a Element> {
    visit::find_outermost(nodes, &kind.is_section)
        .into_iter()
        .filter_map(|section| section.element_children().find(|c| c.is(kind.list_tag)))
        .flat_map(|list| list.element_children())
        .find(|entry| entry.id() == Some(id))
}

fn reference_target(el: &Element) -> Option<String> {
    el.attr("href")
        .and_then(|href| href.strip_prefix('#'))
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

fn merge_kind(nodes: &mut Vec<Node>, kind: ListKind, suffix: Option<&str>) -> usize {
    // index
    let mut order: Vec<String> = Vec::new();
    visit::walk(nodes, &mut |el| {
        if (kind.is_reference)(el) {
            if let Some(target) = reference_target(el) {
                if !order.contains(&target) {
                    order.push(target);
                }
            }
        }
    });

    let sections = visit::find_outermost(nodes, &kind.is_section);
    let mut entries: HashMap<String, Element> = HashMap::new();
    for list in sections
        .iter()
        .filter_map(|s| s.element_children().find(|c| c.is(kind.list_tag)))
    {
        for entry in list.element_children() {
            if let Some(id) = entry.id() {
                entries
                    .entry(id.to_string())
                    .or_insert_with(|| entry.clone());
            }
        }
    }
    let section_count = sections.len();

    if order.is_empty() || section_count == 0 {
        return 0;
    }

    let tagged = |id: &str| match suffix {
        Some(suffix) => format!("{}-{}", id, suffix),
        None => id.to_string(),
    };

    // references
    visit::walk_mut(nodes, &mut |el| {
        if !(kind.is_reference)(el) {
            return;
        }
        let Some(target) = reference_target(el) else { return };
        let Some(position) = order.iter().position(|t| *t == target) else { return };
        el.set_attr("href", format!("#{}", tagged(target.as_str())));
        if let Some(id) = el.id().map(&tagged) {
            el.set_attr("id", id);
        }
        let number = (position + 1).to_string();
        match kind.numbering {
            Numbering::Text => el.children = vec![Node::text(number)],
            Numbering::Attribute => el.set_attr("data-index", number),
        }
    });

    // entries
    let merged: Vec<Element> = order
        .iter()
        .filter_map(|id| entries.get(id).map(|entry| (id, entry)))
        .map(|(id, entry)| {
            let mut entry = entry.clone();
            entry.set_attr("id", tagged(id.as_str()));
            visit::walk_mut(&mut entry.children, &mut |el| {
                if el.is("a") && el.has_attr("data-footnote-backref") {
                    if let Some(href) = el.attr("href").map(&tagged) {
                        el.set_attr("href", href);
                    }
                }
            });
            entry
        })
        .collect();

    let mut seen = 0;
    rebuild_sections(nodes, kind, &mut seen, section_count - 1, &merged);
    merged.len()
}

/// Drop every section of `kind` but the one numbered `keep`, whose list is
/// replaced by `merged`.
fn rebuild_sections(
    nodes: &mut Vec<Node>,
    kind: ListKind,
    seen: &mut usize,
    keep: usize,
    merged: &[Element],
) {
    let mut i = 0;
    while i < nodes.len() {
        let is_section = matches!(&nodes[i], Node::Element(el) if (kind.is_section)(el));
        if is_section {
            let ordinal = *seen;
            *seen += 1;
            if ordinal != keep {
                nodes.remove(i);
                continue;
            }
            if let Node::Element(section) = &mut nodes[i] {
                replace_list(section, kind.list_tag, merged);
            }
        } else if let Node::Element(el) = &mut nodes[i] {
            rebuild_sections(&mut el.children, kind, seen, keep, merged);
        }
        i += 1;
    }
}

fn replace_list(section: &mut Element, list_tag: &str, merged: &[Element]) {
    let entries: Vec<Node> = merged.iter().cloned().map(Node::Element).collect();
    match section.child_mut(list_tag) {
        Some(list) => list.children = entries,
        None => section
            .children
            .push(Element::new(list_tag).with_children(entries).into()),
    }
}
