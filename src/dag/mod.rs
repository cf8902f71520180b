//! History DAG for stacked notes
//!
//! The open notes form a single linear path from the root note to the tail.
//! Nodes live in a petgraph `StableDiGraph` so indices survive truncation;
//! each edge records which note a node was opened from.
//!
//! Invariants:
//! - a slug appears at most once
//! - insertion order is column order
//! - `truncate_after` and `clear` are the only removals, and both are
//!   applied in one step

// Use petgraph from rustworkx-core to ensure version compatibility
use rustworkx_core::petgraph::stable_graph::{NodeIndex, StableDiGraph};
use rustworkx_core::petgraph::Direction;
use std::collections::HashMap;

use crate::hash::CanonicalHash;
use crate::slug::Slug;
use crate::store::PageFragmentSet;

// =============================================================================
// Types
// =============================================================================

/// One open note
#[derive(Debug, Clone, PartialEq)]
pub struct DagNode {
    pub slug: Slug,
    pub title: String,
    pub contents: PageFragmentSet,
    /// Href of the link the note was opened from
    pub anchor: Option<String>,
    /// Fragment to scroll to once the panel is mounted
    pub hash: Option<String>,
}

impl DagNode {
    pub fn new(slug: Slug, contents: PageFragmentSet) -> Self {
        Self {
            slug,
            title: contents.title.clone(),
            contents,
            anchor: None,
            hash: None,
        }
    }

    pub fn with_anchor(mut self, anchor: impl Into<String>) -> Self {
        self.anchor = Some(anchor.into());
        self
    }

    pub fn with_hash(mut self, hash: Option<String>) -> Self {
        self.hash = hash;
        self
    }

    /// URL token for this note
    pub fn canonical_hash(&self) -> CanonicalHash {
        CanonicalHash::encode(&self.slug)
    }
}

/// Edge from the note a node was opened from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenedFrom;

// =============================================================================
// HistoryDag
// =============================================================================

#[derive(Debug, Default)]
pub struct HistoryDag {
    graph: StableDiGraph<DagNode, OpenedFrom>,
    order: Vec<NodeIndex>,
    index: HashMap<Slug, NodeIndex>,
}

impl HistoryDag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `node` unless its slug is already open. Returns the node that
    /// ends up in the DAG for that slug.
    pub fn add_node(&mut self, node: DagNode) -> &DagNode {
        if let Some(&existing) = self.index.get(&node.slug) {
            return &self.graph[existing];
        }

        let slug = node.slug.clone();
        let tail = self.order.last().copied();
        let idx = self.graph.add_node(node);
        if let Some(tail) = tail {
            self.graph.add_edge(tail, idx, OpenedFrom);
        }
        self.order.push(idx);
        self.index.insert(slug, idx);
        tracing::debug!(len = self.order.len(), "dag node added");
        &self.graph[idx]
    }

    /// Drop every node opened after `slug`. No-op when `slug` is absent.
    pub fn truncate_after(&mut self, slug: &Slug) {
        let Some(&idx) = self.index.get(slug) else {
            return;
        };
        let Some(pos) = self.order.iter().position(|&i| i == idx) else {
            return;
        };

        let removed: Vec<NodeIndex> = self.order.split_off(pos + 1);
        for idx in removed {
            if let Some(node) = self.graph.remove_node(idx) {
                self.index.remove(&node.slug);
            }
        }
        tracing::debug!(len = self.order.len(), "dag truncated");
    }

    pub fn has(&self, slug: &Slug) -> bool {
        self.index.contains_key(slug)
    }

    pub fn get(&self, slug: &Slug) -> Option<&DagNode> {
        self.index.get(slug).map(|&idx| &self.graph[idx])
    }

    pub fn get_mut(&mut self, slug: &Slug) -> Option<&mut DagNode> {
        let idx = *self.index.get(slug)?;
        self.graph.node_weight_mut(idx)
    }

    /// Open notes, left to right
    pub fn ordered_nodes(&self) -> Vec<&DagNode> {
        self.order.iter().map(|&idx| &self.graph[idx]).collect()
    }

    pub fn ordered_slugs(&self) -> Vec<Slug> {
        self.order
            .iter()
            .map(|&idx| self.graph[idx].slug.clone())
            .collect()
    }

    pub fn tail(&self) -> Option<&DagNode> {
        self.order.last().map(|&idx| &self.graph[idx])
    }

    /// Note that `slug` was opened from
    pub fn parent(&self, slug: &Slug) -> Option<&DagNode> {
        let idx = *self.index.get(slug)?;
        self.graph
            .neighbors_directed(idx, Direction::Incoming)
            .next()
            .map(|parent| &self.graph[parent])
    }

    pub fn position(&self, slug: &Slug) -> Option<usize> {
        let idx = self.index.get(slug)?;
        self.order.iter().position(|i| i == idx)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn clear(&mut self) {
        self.graph.clear();
        self.order.clear();
        self.index.clear();
    }
}

#[cfg(test)]
mod tests;
