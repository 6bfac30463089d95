// SPDX-License-Identifier: MIT

//! Node tree: rendered frames as a DOM-like structure with stable identity.
//!
//! The tree is deliberately shallow: one container root whose children are
//! text nodes, one per rendered line. What matters is identity, not depth.
//! Nodes are held in an arena keyed by numeric id, and the per-frame diff
//! reassigns ids so that a line whose content survives a redraw keeps its
//! id. Repeated queries for the same logical element therefore return
//! handles that refer to the same node, and an element found once stays
//! usable for event dispatch across redraws.

use serde::Serialize;

use crate::screen::Frame;

/// Stable identifier for a node, unique within one render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NodeKind {
    Container,
    Text,
}

/// One logical element of terminal output.
#[derive(Debug, Clone, Serialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    /// Rendered text, trailing whitespace stripped.
    pub text: String,
}

/// A single structural or textual change, delivered in debounced batches.
#[derive(Debug, Clone, Serialize)]
pub struct Mutation {
    pub kind: MutationKind,
    /// The node the change happened on; the root for adds/removes.
    pub target: NodeId,
    pub added: Vec<NodeId>,
    pub removed: Vec<NodeId>,
    pub previous_sibling: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
    pub attribute: Option<&'static str>,
    pub old_value: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MutationKind {
    Added,
    Removed,
    Text,
    Attribute,
}

impl Mutation {
    fn base(kind: MutationKind, target: NodeId) -> Self {
        Mutation {
            kind,
            target,
            added: Vec::new(),
            removed: Vec::new(),
            previous_sibling: None,
            next_sibling: None,
            attribute: None,
            old_value: None,
        }
    }

    pub(crate) fn attribute(target: NodeId, name: &'static str, old_value: Option<String>) -> Self {
        Mutation {
            attribute: Some(name),
            old_value,
            ..Mutation::base(MutationKind::Attribute, target)
        }
    }
}

/// The document tree for one render.
pub struct Tree {
    root: NodeId,
    next_id: u64,
    /// Root's children in document order.
    lines: Vec<Node>,
}

impl Tree {
    pub fn new() -> Self {
        Tree {
            root: NodeId(0),
            next_id: 1,
            lines: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Text nodes in document order.
    pub fn nodes(&self) -> &[Node] {
        &self.lines
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.lines.iter().find(|n| n.id == id)
    }

    /// Side-effect-free traversal in document order.
    pub fn query<'a>(&'a self, predicate: impl Fn(&Node) -> bool) -> Vec<&'a Node> {
        self.lines.iter().filter(|n| predicate(n)).collect()
    }

    /// Full rendered text, for diagnostics.
    pub fn text(&self) -> String {
        let lines: Vec<&str> = self.lines.iter().map(|n| n.text.as_str()).collect();
        lines.join("\n")
    }

    /// Reconcile the tree against a new frame, producing the minimal set of
    /// mutations describing the difference.
    ///
    /// Matching is two-pass. First, lines whose content is unchanged keep
    /// their node: each new line, in document order, pairs with the first
    /// still-unmatched old node of equal content (the tie-break for
    /// duplicate text). Second, leftover old and new lines pair up
    /// positionally as text changes, reusing the old node's id. Anything
    /// left after that is an addition or a removal.
    pub fn sync(&mut self, frame: &Frame) -> Vec<Mutation> {
        let new_lines = &frame.lines;
        let old = std::mem::take(&mut self.lines);

        let mut old_taken = vec![false; old.len()];
        let mut paired: Vec<Option<usize>> = vec![None; new_lines.len()];

        // Pass 1: unchanged content, document order.
        for (ni, line) in new_lines.iter().enumerate() {
            for (oi, node) in old.iter().enumerate() {
                if !old_taken[oi] && node.text == *line {
                    old_taken[oi] = true;
                    paired[ni] = Some(oi);
                    break;
                }
            }
        }

        // Pass 2: positional pairing of leftovers as text changes.
        let leftovers: Vec<usize> = (0..old.len()).filter(|&i| !old_taken[i]).collect();
        let mut leftover_iter = leftovers.into_iter();
        let mut text_changed: Vec<bool> = vec![false; new_lines.len()];
        for ni in 0..new_lines.len() {
            if paired[ni].is_none() {
                if let Some(oi) = leftover_iter.next() {
                    old_taken[oi] = true;
                    paired[ni] = Some(oi);
                    text_changed[ni] = true;
                }
            }
        }

        // Rebuild children and collect mutations.
        let mut mutations = Vec::new();
        let mut fresh: Vec<usize> = Vec::new();
        for (ni, line) in new_lines.iter().enumerate() {
            match paired[ni] {
                Some(oi) => {
                    let old_node = &old[oi];
                    if text_changed[ni] {
                        mutations.push(Mutation {
                            old_value: Some(old_node.text.clone()),
                            ..Mutation::base(MutationKind::Text, old_node.id)
                        });
                    }
                    self.lines.push(Node {
                        id: old_node.id,
                        kind: NodeKind::Text,
                        text: line.clone(),
                    });
                }
                None => {
                    let id = NodeId(self.next_id);
                    self.next_id += 1;
                    fresh.push(ni);
                    self.lines.push(Node {
                        id,
                        kind: NodeKind::Text,
                        text: line.clone(),
                    });
                }
            }
        }

        for ni in fresh {
            let id = self.lines[ni].id;
            let previous_sibling = ni.checked_sub(1).map(|i| self.lines[i].id);
            let next_sibling = self.lines.get(ni + 1).map(|n| n.id);
            mutations.push(Mutation {
                added: vec![id],
                previous_sibling,
                next_sibling,
                ..Mutation::base(MutationKind::Added, self.root)
            });
        }

        for (oi, node) in old.iter().enumerate() {
            if !old_taken[oi] {
                mutations.push(Mutation {
                    removed: vec![node.id],
                    old_value: Some(node.text.clone()),
                    ..Mutation::base(MutationKind::Removed, self.root)
                });
            }
        }

        mutations
    }
}

impl Default for Tree {
    fn default() -> Self {
        Tree::new()
    }
}

#[cfg(test)]
#[path = "tree_tests.rs"]
mod tests;
