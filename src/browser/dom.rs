//! Live DOM <-> hast conversion and patch replay
//!
//! Child indices of a converted tree match `childNodes` indices of the live
//! node, which is what lets `morph` paths address live nodes directly.

use wasm_bindgen::{JsCast, JsValue};
use web_sys::{DomParser, SupportedType};

use crate::hast::{Element, Node, Patch};
use crate::store::Document;

const SVG_NS: &str = "http://www.w3.org/2000/svg";

// =============================================================================
// DOM -> hast
// =============================================================================

pub fn element_to_hast(el: &web_sys::Element) -> Element {
    let mut out = Element::new(el.local_name());
    for name in el.get_attribute_names().iter() {
        let Some(name) = name.as_string() else { continue };
        if let Some(value) = el.get_attribute(&name) {
            out.properties.insert(name, value);
        }
    }
    out.children = children_to_hast(el);
    out
}

fn children_to_hast(node: &web_sys::Node) -> Vec<Node> {
    let list = node.child_nodes();
    (0..list.length())
        .filter_map(|i| list.item(i))
        .filter_map(|child| node_to_hast(&child))
        .collect()
}

pub fn node_to_hast(node: &web_sys::Node) -> Option<Node> {
    match node.node_type() {
        web_sys::Node::ELEMENT_NODE => node
            .dyn_ref::<web_sys::Element>()
            .map(|el| Node::Element(element_to_hast(el))),
        web_sys::Node::TEXT_NODE => Some(Node::text(node.text_content().unwrap_or_default())),
        web_sys::Node::COMMENT_NODE => {
            Some(Node::comment(node.text_content().unwrap_or_default()))
        }
        _ => None,
    }
}

/// Snapshot of a document's head and body
pub fn snapshot(document: &web_sys::Document) -> Result<Document, JsValue> {
    let head = document
        .head()
        .ok_or_else(|| JsValue::from_str("document has no <head>"))?;
    let body = document
        .body()
        .ok_or_else(|| JsValue::from_str("document has no <body>"))?;
    Ok(Document {
        head: element_to_hast(&head),
        body: element_to_hast(&body),
    })
}

pub fn parse_document(html: &str) -> Result<Document, JsValue> {
    let parsed = DomParser::new()?.parse_from_string(html, SupportedType::TextHtml)?;
    snapshot(&parsed)
}

// =============================================================================
// hast -> DOM
// =============================================================================

pub fn to_dom(
    document: &web_sys::Document,
    node: &Node,
    in_svg: bool,
) -> Result<web_sys::Node, JsValue> {
    match node {
        Node::Text { value } => Ok(document.create_text_node(value).into()),
        Node::Comment { value } => Ok(document.create_comment(value).into()),
        Node::Element(el) => {
            let svg = in_svg || el.tag_name == "svg";
            let created = if svg {
                document.create_element_ns(Some(SVG_NS), &el.tag_name)?
            } else {
                document.create_element(&el.tag_name)?
            };
            for (name, value) in &el.properties {
                created.set_attribute(name, value)?;
            }
            let svg_children = svg && el.tag_name != "foreignObject";
            for child in &el.children {
                created.append_child(&to_dom(document, child, svg_children)?)?;
            }
            Ok(created.into())
        }
    }
}

pub fn element_to_dom(document: &web_sys::Document, el: &Element) -> Result<web_sys::Element, JsValue> {
    to_dom(document, &Node::Element(el.clone()), false)?
        .dyn_into::<web_sys::Element>()
        .map_err(|_| JsValue::from_str("created node is not an element"))
}

// =============================================================================
// Patches
// =============================================================================

/// Replay morph patches, in order, under `root`.
pub fn apply_patches(root: &web_sys::Element, patches: &[Patch]) -> Result<(), JsValue> {
    let document = root
        .owner_document()
        .ok_or_else(|| JsValue::from_str("root is detached"))?;

    for patch in patches {
        match patch {
            Patch::SetText { path, value } => {
                resolve(root, path)?.set_text_content(Some(value));
            }
            Patch::SetAttr { path, name, value } => {
                as_element(resolve(root, path)?)?.set_attribute(name, value)?;
            }
            Patch::RemoveAttr { path, name } => {
                as_element(resolve(root, path)?)?.remove_attribute(name)?;
            }
            Patch::Replace { path, node } => {
                let old = resolve(root, path)?;
                let parent = old
                    .parent_node()
                    .ok_or_else(|| JsValue::from_str("replaced node has no parent"))?;
                let replacement = to_dom(&document, node, is_svg(&parent))?;
                parent.replace_child(&replacement, &old)?;
            }
            Patch::Insert { parent, index, node } => {
                let parent = resolve(root, parent)?;
                let next = parent.child_nodes().item(*index as u32);
                let child = to_dom(&document, node, is_svg(&parent))?;
                parent.insert_before(&child, next.as_ref())?;
            }
            Patch::Remove { parent, index } => {
                let parent_node = resolve(root, parent)?;
                let child = parent_node
                    .child_nodes()
                    .item(*index as u32)
                    .ok_or_else(|| missing(parent, Some(*index)))?;
                parent_node.remove_child(&child)?;
            }
        }
    }
    Ok(())
}

fn resolve(root: &web_sys::Element, path: &[usize]) -> Result<web_sys::Node, JsValue> {
    let mut node: web_sys::Node = root.clone().into();
    for &i in path {
        node = node
            .child_nodes()
            .item(i as u32)
            .ok_or_else(|| missing(path, None))?;
    }
    Ok(node)
}

fn missing(path: &[usize], index: Option<usize>) -> JsValue {
    JsValue::from_str(&format!("no node at path {:?} (child {:?})", path, index))
}

fn as_element(node: web_sys::Node) -> Result<web_sys::Element, JsValue> {
    node.dyn_into::<web_sys::Element>()
        .map_err(|_| JsValue::from_str("patch target is not an element"))
}

fn is_svg(node: &web_sys::Node) -> bool {
    node.dyn_ref::<web_sys::Element>().is_some_and(|el| {
        el.namespace_uri().as_deref() == Some(SVG_NS) && el.local_name() != "foreignObject"
    })
}
