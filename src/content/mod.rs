//! Content tree the narrator reads from
//!
//! Nodes live in a flat arena and are addressed by [`NodeId`]. A node is either
//! a structural element, a raw text run, or a [`NodeKind::Word`]: the
//! addressable handle the segmenter wraps around every speakable word so a
//! rendering layer can highlight it later.
//!
//! Trees come from HTML (see [`ContentTree::from_html`]) or are assembled by
//! hand through the builder methods.

mod html;

use serde::Serialize;

/// Handle to a node in a [`ContentTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub u32);

impl NodeId {
    const fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Structural role of an element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ElementKind {
    /// `<table>`
    Table,
    /// `<thead>`, `<tbody>`, `<tfoot>`
    TableSection,
    /// `<tr>`
    TableRow,
    /// `<td>`, `<th>`
    TableCell,
    /// `<h1>` through `<h6>`
    Heading(u8),
    /// `<ul>`, `<ol>`, `<dl>`
    List,
    /// `<li>`, `<dt>`, `<dd>`
    ListItem,
    /// `<p>`, `<caption>`, `<figcaption>`, `<pre>`
    Paragraph,
    /// `<blockquote>`
    BlockQuote,
    /// Generic block container (`<div>`, `<section>`, unknown tags)
    Container,
    /// Phrasing content (`<span>`, `<em>`, `<a>`, ...)
    Inline,
    /// Never read: `<script>`, `<style>`, `<template>`, ...
    Skipped,
}

impl ElementKind {
    /// Whether this element starts a new block in reading order
    #[must_use]
    pub const fn is_block(self) -> bool {
        !matches!(self, Self::Inline | Self::Skipped)
    }
}

/// What a node holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Structural element
    Element(ElementKind),
    /// Raw text run
    Text(String),
    /// Wrapped word, the addressable unit for highlighting
    Word(String),
}

/// A node in the content arena
#[derive(Debug, Clone)]
pub struct Node {
    /// Node payload
    pub kind: NodeKind,
    /// Parent node, `None` for the root and detached nodes
    pub parent: Option<NodeId>,
    /// Children in document order
    pub children: Vec<NodeId>,
    /// Explicitly not displayed (`hidden` attribute or `display: none`)
    pub hidden: bool,
    /// Already tokenized by a segmentation pass
    pub processed: bool,
}

impl Node {
    const fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            hidden: false,
            processed: false,
        }
    }

    /// Element role, if this node is an element
    #[must_use]
    pub const fn element(&self) -> Option<ElementKind> {
        match self.kind {
            NodeKind::Element(kind) => Some(kind),
            _ => None,
        }
    }

    /// Whether this node starts a new block in reading order
    #[must_use]
    pub const fn is_block(&self) -> bool {
        match self.kind {
            NodeKind::Element(kind) => kind.is_block(),
            _ => false,
        }
    }

    /// Whether this node and its subtree are excluded from reading
    #[must_use]
    pub const fn is_skipped(&self) -> bool {
        self.hidden || matches!(self.kind, NodeKind::Element(ElementKind::Skipped))
    }
}

/// Arena-backed tree of content nodes
#[derive(Debug, Clone)]
pub struct ContentTree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl ContentTree {
    /// Create a tree with a single root element
    #[must_use]
    pub fn new(root: ElementKind) -> Self {
        Self {
            nodes: vec![Node::new(NodeKind::Element(root))],
            root: NodeId(0),
        }
    }

    /// Root node
    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes in the arena, detached ones included
    #[must_use]
    pub const fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena is empty (never true for a constructed tree)
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look up a node
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Children of a node, empty for unknown ids
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map_or(&[], |n| n.children.as_slice())
    }

    /// Append an element under `parent`
    pub fn append_element(&mut self, parent: NodeId, kind: ElementKind) -> NodeId {
        self.append(parent, NodeKind::Element(kind))
    }

    /// Append a text run under `parent`
    pub fn append_text(&mut self, parent: NodeId, text: impl Into<String>) -> NodeId {
        self.append(parent, NodeKind::Text(text.into()))
    }

    /// Mark a node as not displayed
    pub fn set_hidden(&mut self, id: NodeId, hidden: bool) {
        if let Some(node) = self.nodes.get_mut(id.index()) {
            node.hidden = hidden;
        }
    }

    /// Whether a node was tokenized by a previous segmentation pass
    #[must_use]
    pub fn is_processed(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(|n| n.processed)
    }

    /// Text of a word handle
    #[must_use]
    pub fn word(&self, id: NodeId) -> Option<&str> {
        match &self.node(id)?.kind {
            NodeKind::Word(text) => Some(text),
            _ => None,
        }
    }

    /// Concatenated visible text of a subtree
    ///
    /// Hidden nodes and skipped elements contribute nothing.
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.node(id) else {
            return;
        };
        if node.is_skipped() {
            return;
        }
        match &node.kind {
            NodeKind::Text(text) | NodeKind::Word(text) => out.push_str(text),
            NodeKind::Element(_) => {
                for &child in &node.children {
                    self.collect_text(child, out);
                }
            }
        }
    }

    /// Word handles of a subtree in document order
    #[must_use]
    pub fn words(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_words(id, &mut out);
        out
    }

    fn collect_words(&self, id: NodeId, out: &mut Vec<NodeId>) {
        let Some(node) = self.node(id) else {
            return;
        };
        if node.is_skipped() {
            return;
        }
        if matches!(node.kind, NodeKind::Word(_)) {
            out.push(id);
        }
        for &child in &node.children {
            self.collect_words(child, out);
        }
    }

    fn append(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = self.push_detached(kind);
        self.nodes[id.index()].parent = Some(parent);
        if let Some(p) = self.nodes.get_mut(parent.index()) {
            p.children.push(id);
        }
        id
    }

    pub(crate) fn push_detached(&mut self, kind: NodeKind) -> NodeId {
        #[allow(clippy::cast_possible_truncation)]
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(kind));
        id
    }

    /// Replace `parent.children[range]` with `replacement`, reparenting it
    pub(crate) fn splice_children(
        &mut self,
        parent: NodeId,
        range: std::ops::Range<usize>,
        replacement: &[NodeId],
    ) {
        for &child in replacement {
            if let Some(node) = self.nodes.get_mut(child.index()) {
                node.parent = Some(parent);
            }
        }
        let Some(p) = self.nodes.get_mut(parent.index()) else {
            return;
        };
        let removed: Vec<NodeId> = p
            .children
            .splice(range, replacement.iter().copied())
            .collect();
        for old in removed {
            if replacement.contains(&old) {
                continue;
            }
            if let Some(node) = self.nodes.get_mut(old.index()) {
                node.parent = None;
            }
        }
    }

    pub(crate) fn mark_processed(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.get_mut(id.index()) {
            node.processed = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_links_parents_and_children() {
        let mut tree = ContentTree::new(ElementKind::Container);
        let p = tree.append_element(tree.root(), ElementKind::Paragraph);
        let t = tree.append_text(p, "hello");

        assert_eq!(tree.children(tree.root()), &[p]);
        assert_eq!(tree.node(t).and_then(|n| n.parent), Some(p));
        assert_eq!(tree.text_content(tree.root()), "hello");
    }

    #[test]
    fn text_content_skips_hidden_and_scripts() {
        let mut tree = ContentTree::new(ElementKind::Paragraph);
        let root = tree.root();
        tree.append_text(root, "shown ");
        let hidden = tree.append_element(root, ElementKind::Inline);
        tree.append_text(hidden, "secret ");
        tree.set_hidden(hidden, true);
        let script = tree.append_element(root, ElementKind::Skipped);
        tree.append_text(script, "var x = 1;");
        tree.append_text(root, "text");

        assert_eq!(tree.text_content(root), "shown text");
    }

    #[test]
    fn splice_replaces_and_reparents() {
        let mut tree = ContentTree::new(ElementKind::Paragraph);
        let root = tree.root();
        let a = tree.append_text(root, "a");
        let b = tree.append_text(root, "b");
        let w = tree.push_detached(NodeKind::Word("ab".into()));

        tree.splice_children(root, 0..2, &[w]);

        assert_eq!(tree.children(root), &[w]);
        assert_eq!(tree.node(w).and_then(|n| n.parent), Some(root));
        assert_eq!(tree.node(a).and_then(|n| n.parent), None);
        assert_eq!(tree.node(b).and_then(|n| n.parent), None);
        assert_eq!(tree.words(root), vec![w]);
    }

    #[test]
    fn inline_and_skipped_are_not_blocks() {
        assert!(!ElementKind::Inline.is_block());
        assert!(!ElementKind::Skipped.is_block());
        assert!(ElementKind::Heading(2).is_block());
        assert!(ElementKind::TableCell.is_block());
    }
}
