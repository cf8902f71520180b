//! Owned hypertext tree (hast-shaped)
//!
//! Both the build-time transclusion engine and the runtime operate on this
//! model: the build side receives it as JSON from the markdown pipeline, the
//! runtime converts live DOM into it (`browser::dom`) before diffing.
//!
//! Properties are keyed by their HTML attribute name (`class`, `data-slug`,
//! `aria-expanded`) and always hold a string; boolean markers such as
//! `data-footnotes` carry the empty string.

pub mod html;
pub mod morph;
pub mod visit;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use morph::{apply, morph, MorphError, Patch};

// =============================================================================
// Types
// =============================================================================

/// A node in the tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Node {
    Element(Element),
    Text { value: String },
    Comment { value: String },
}

/// An element node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    pub tag_name: String,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    #[serde(default)]
    pub children: Vec<Node>,
}

/// Top-level document fragment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Root {
    #[serde(default)]
    pub children: Vec<Node>,
}

// =============================================================================
// Node
// =============================================================================

impl Node {
    pub fn text(value: impl Into<String>) -> Self {
        Node::Text {
            value: value.into(),
        }
    }

    pub fn comment(value: impl Into<String>) -> Self {
        Node::Comment {
            value: value.into(),
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn text_content(&self) -> String {
        match self {
            Node::Text { value } => value.clone(),
            Node::Element(el) => el.text_content(),
            Node::Comment { .. } => String::new(),
        }
    }
}

impl From<Element> for Node {
    fn from(el: Element) -> Self {
        Node::Element(el)
    }
}

// =============================================================================
// Element
// =============================================================================

impl Element {
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            properties: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    // ----- builders -----

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.add_class(class);
        self
    }

    pub fn with_child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::text(text));
        self
    }

    // ----- attributes -----

    pub fn is(&self, tag: &str) -> bool {
        self.tag_name.eq_ignore_ascii_case(tag)
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(name.into(), value.into());
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        self.properties.remove(name)
    }

    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    pub fn add_class(&mut self, class: &str) {
        if self.has_class(class) {
            return;
        }
        let joined = match self.attr("class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {}", existing.trim(), class),
            _ => class.to_string(),
        };
        self.set_attr("class", joined);
    }

    pub fn remove_class(&mut self, class: &str) {
        let kept: Vec<&str> = self.classes().filter(|c| *c != class).collect();
        if kept.is_empty() {
            self.remove_attr("class");
        } else {
            let joined = kept.join(" ");
            self.set_attr("class", joined);
        }
    }

    // ----- structure -----

    /// Rank of an `h1`..`h6` element
    pub fn heading_rank(&self) -> Option<u8> {
        let tag = self.tag_name.as_bytes();
        if tag.len() == 2 && (tag[0] == b'h' || tag[0] == b'H') && (b'1'..=b'6').contains(&tag[1]) {
            Some(tag[1] - b'0')
        } else {
            None
        }
    }

    pub fn element_children(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    pub fn element_children_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(Node::as_element_mut)
    }

    /// First direct child with `tag`
    pub fn child_mut(&mut self, tag: &str) -> Option<&mut Element> {
        self.children
            .iter_mut()
            .filter_map(Node::as_element_mut)
            .find(|c| c.is(tag))
    }

    /// Concatenated text of every descendant text node
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }

    /// True when the element has no children, or only whitespace text
    pub fn is_blank(&self) -> bool {
        self.children.iter().all(|child| match child {
            Node::Text { value } => value.trim().is_empty(),
            Node::Comment { .. } => true,
            Node::Element(_) => false,
        })
    }

    pub fn to_html(&self) -> String {
        html::element_to_html(self)
    }
}

fn collect_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text { value } => out.push_str(value),
            Node::Element(el) => collect_text(&el.children, out),
            Node::Comment { .. } => {}
        }
    }
}

// =============================================================================
// Root
// =============================================================================

impl Root {
    pub fn new(children: Vec<Node>) -> Self {
        Self { children }
    }

    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }

    pub fn to_html(&self) -> String {
        html::to_html(&self.children)
    }
}
