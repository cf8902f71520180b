//! Minimal patch set between two element trees
//!
//! `morph(old, new)` computes the edits that turn `old` into `new`; `apply`
//! replays them on a tree. The browser host replays the same patches on the
//! live DOM, so unchanged subtrees (and their listeners) are never touched.
//!
//! Contract:
//! - morphing a tree into itself yields no patches
//! - children of `old` that carry the persist attribute are never removed
//!   or modified
//! - every patch's path is valid at the moment the patch is applied, so the
//!   list must be applied in order

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Element, Node};

/// Index path from the morphed element; `[]` is the element itself.
pub type Path = Vec<usize>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Patch {
    SetText { path: Path, value: String },
    SetAttr { path: Path, name: String, value: String },
    RemoveAttr { path: Path, name: String },
    Replace { path: Path, node: Node },
    /// Insert `node` into the children of the element at `parent`
    Insert { parent: Path, index: usize, node: Node },
    /// Remove the child at `index` from the element at `parent`
    Remove { parent: Path, index: usize },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MorphError {
    #[error("no node at path {0:?}")]
    MissingNode(Path),

    #[error("node at path {0:?} is not an element")]
    NotAnElement(Path),

    #[error("node at path {0:?} is not text")]
    NotText(Path),
}

// =============================================================================
// Diff
// =============================================================================

pub fn morph(old: &Element, new: &Element, persist_attr: &str) -> Vec<Patch> {
    let mut patches = Vec::new();
    let mut path = Vec::new();
    if old.tag_name == new.tag_name {
        diff_element(old, new, &mut path, persist_attr, &mut patches);
    } else {
        patches.push(Patch::Replace {
            path,
            node: Node::Element(new.clone()),
        });
    }
    patches
}

fn diff_element(
    old: &Element,
    new: &Element,
    path: &mut Path,
    persist_attr: &str,
    out: &mut Vec<Patch>,
) {
    for name in old.properties.keys() {
        if !new.properties.contains_key(name) {
            out.push(Patch::RemoveAttr {
                path: path.clone(),
                name: name.clone(),
            });
        }
    }
    for (name, value) in &new.properties {
        if old.properties.get(name) != Some(value) {
            out.push(Patch::SetAttr {
                path: path.clone(),
                name: name.clone(),
                value: value.clone(),
            });
        }
    }
    diff_children(&old.children, &new.children, path, persist_attr, out);
}

fn diff_children(
    old: &[Node],
    new: &[Node],
    parent: &mut Path,
    persist_attr: &str,
    out: &mut Vec<Patch>,
) {
    // `None` marks a node inserted by this diff
    let mut live: Vec<Option<&Node>> = old.iter().map(Some).collect();
    let mut pos = 0;

    for next in new {
        while let Some(Some(current)) = live.get(pos) {
            if is_persistent(current, persist_attr) && !same_persistent(current, next) {
                pos += 1;
            } else {
                break;
            }
        }

        match live.get(pos).copied() {
            Some(Some(current)) => {
                if !is_persistent(current, persist_attr) {
                    parent.push(pos);
                    diff_node(current, next, parent, persist_attr, out);
                    parent.pop();
                }
                pos += 1;
            }
            _ => {
                out.push(Patch::Insert {
                    parent: parent.clone(),
                    index: pos,
                    node: next.clone(),
                });
                live.insert(pos, None);
                pos += 1;
            }
        }
    }

    for index in (pos..live.len()).rev() {
        let keep = matches!(live[index], Some(node) if is_persistent(node, persist_attr));
        if !keep {
            out.push(Patch::Remove {
                parent: parent.clone(),
                index,
            });
        }
    }
}

fn diff_node(old: &Node, new: &Node, path: &mut Path, persist_attr: &str, out: &mut Vec<Patch>) {
    match (old, new) {
        (Node::Text { value: a }, Node::Text { value: b }) => {
            if a != b {
                out.push(Patch::SetText {
                    path: path.clone(),
                    value: b.clone(),
                });
            }
        }
        (Node::Element(a), Node::Element(b)) if a.tag_name == b.tag_name => {
            diff_element(a, b, path, persist_attr, out);
        }
        _ if old == new => {}
        _ => out.push(Patch::Replace {
            path: path.clone(),
            node: new.clone(),
        }),
    }
}

fn is_persistent(node: &Node, persist_attr: &str) -> bool {
    matches!(node, Node::Element(el) if el.has_attr(persist_attr))
}

fn same_persistent(old: &Node, new: &Node) -> bool {
    match (old, new) {
        (Node::Element(a), Node::Element(b)) => {
            a.tag_name == b.tag_name && ((a.id().is_some() && a.id() == b.id()) || a == b)
        }
        _ => false,
    }
}

// =============================================================================
// Apply
// =============================================================================

pub fn apply(target: &mut Element, patches: &[Patch]) -> Result<(), MorphError> {
    for patch in patches {
        apply_one(target, patch)?;
    }
    Ok(())
}

fn apply_one(target: &mut Element, patch: &Patch) -> Result<(), MorphError> {
    match patch {
        Patch::SetText { path, value } => match node_at(target, path)? {
            Slot::Node(Node::Text { value: text }) => {
                *text = value.clone();
                Ok(())
            }
            _ => Err(MorphError::NotText(path.clone())),
        },
        Patch::SetAttr { path, name, value } => {
            element_at(target, path)?.set_attr(name.clone(), value.clone());
            Ok(())
        }
        Patch::RemoveAttr { path, name } => {
            element_at(target, path)?.remove_attr(name);
            Ok(())
        }
        Patch::Replace { path, node } => match node_at(target, path)? {
            Slot::Root(el) => match node {
                Node::Element(replacement) => {
                    *el = replacement.clone();
                    Ok(())
                }
                _ => Err(MorphError::NotAnElement(path.clone())),
            },
            Slot::Node(slot) => {
                *slot = node.clone();
                Ok(())
            }
        },
        Patch::Insert {
            parent,
            index,
            node,
        } => {
            let children = &mut element_at(target, parent)?.children;
            if *index > children.len() {
                let mut missing = parent.clone();
                missing.push(*index);
                return Err(MorphError::MissingNode(missing));
            }
            children.insert(*index, node.clone());
            Ok(())
        }
        Patch::Remove { parent, index } => {
            let children = &mut element_at(target, parent)?.children;
            if *index >= children.len() {
                let mut missing = parent.clone();
                missing.push(*index);
                return Err(MorphError::MissingNode(missing));
            }
            children.remove(*index);
            Ok(())
        }
    }
}

enum Slot<'a> {
    Root(&'a mut Element),
    Node(&'a mut Node),
}

fn node_at<'a>(target: &'a mut Element, path: &[usize]) -> Result<Slot<'a>, MorphError> {
    let Some((last, parents)) = path.split_last() else {
        return Ok(Slot::Root(target));
    };
    let parent = element_at(target, parents)?;
    parent
        .children
        .get_mut(*last)
        .map(Slot::Node)
        .ok_or_else(|| MorphError::MissingNode(path.to_vec()))
}

fn element_at<'a>(target: &'a mut Element, path: &[usize]) -> Result<&'a mut Element, MorphError> {
    let mut current = target;
    for (depth, index) in path.iter().enumerate() {
        current = match current.children.get_mut(*index) {
            Some(Node::Element(el)) => el,
            Some(_) => return Err(MorphError::NotAnElement(path[..=depth].to_vec())),
            None => return Err(MorphError::MissingNode(path[..=depth].to_vec())),
        };
    }
    Ok(current)
}
