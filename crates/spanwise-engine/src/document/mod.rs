//! # Document Tree
//!
//! The engine owns the node tree of the page it edits. Nodes live in an
//! arena and refer to each other through [`NodeId`]s, so ids handed to the
//! host stay valid for the lifetime of the [`Document`].
//!
//! Every node carries an explicit [`NodeKind`]:
//!
//! - **Container**: a tagged element with ordered children and no text
//! - **Fragment**: an atomic leaf owning exactly one contiguous text run
//! - **Text**: a raw text run, only present before normalization and after
//!   cleanup
//!
//! Removing a node detaches it instead of freeing it. A detached node is no
//! longer reachable from [`Document::root`], which is how stale host
//! references are told apart from live ones.

mod markup;

pub use markup::{DEFAULT_FRAGMENT_TAG, render_markup};

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Index of a node in its [`Document`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    /// Raw arena index
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Attributes are kept sorted so markup output is deterministic.
pub type Attributes = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub attributes: Attributes,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Attributes::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment {
    pub attributes: Attributes,
    pub text: String,
}

impl Fragment {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            attributes: Attributes::new(),
            text: text.into(),
        }
    }

    /// A fragment with no markup of its own beyond its default form.
    pub fn is_empty_shell(&self) -> bool {
        self.attributes.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Container(Element),
    Fragment(Fragment),
    Text(String),
}

impl NodeKind {
    /// Text run carried by this node, if it is a text-bearing leaf.
    pub fn text(&self) -> Option<&str> {
        match self {
            NodeKind::Container(_) => None,
            NodeKind::Fragment(fragment) => Some(&fragment.text),
            NodeKind::Text(text) => Some(text),
        }
    }

    pub fn is_text_bearing(&self) -> bool {
        self.text().is_some()
    }

    /// Containers and fragments are elements; raw text runs are not.
    pub fn is_element(&self) -> bool {
        !matches!(self, NodeKind::Text(_))
    }

    pub fn attributes(&self) -> Option<&Attributes> {
        match self {
            NodeKind::Container(element) => Some(&element.attributes),
            NodeKind::Fragment(fragment) => Some(&fragment.attributes),
            NodeKind::Text(_) => None,
        }
    }

    fn attributes_mut(&mut self) -> Option<&mut Attributes> {
        match self {
            NodeKind::Container(element) => Some(&mut element.attributes),
            NodeKind::Fragment(fragment) => Some(&mut fragment.attributes),
            NodeKind::Text(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena-backed node tree rooted at a page container.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new("body")
    }
}

impl Document {
    pub fn new(root_tag: &str) -> Self {
        let root = Node {
            kind: NodeKind::Container(Element::new(root_tag)),
            parent: None,
            children: Vec::new(),
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Whether `id` was minted by this document.
    pub fn exists(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    fn try_node_mut(&mut self, id: NodeId) -> Result<&mut Node, EngineError> {
        self.nodes
            .get_mut(id.0)
            .ok_or(EngineError::UnknownNode { node: id })
    }

    /// Kind of a node. Panics for ids that were not created by this document;
    /// use [`Document::get`] for ids of unknown origin.
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    pub fn get(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(id.0).map(|node| &node.kind)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|node| node.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.0)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(|&child| self.kind(child).is_element())
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&child| child == id)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        self.children(parent).get(index + 1).copied()
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        index
            .checked_sub(1)
            .and_then(|previous| self.children(parent).get(previous).copied())
    }

    pub fn next_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let mut current = self.next_sibling(id);
        while let Some(sibling) = current {
            if self.kind(sibling).is_element() {
                return Some(sibling);
            }
            current = self.next_sibling(sibling);
        }
        None
    }

    pub fn previous_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let mut current = self.previous_sibling(id);
        while let Some(sibling) = current {
            if self.kind(sibling).is_element() {
                return Some(sibling);
            }
            current = self.previous_sibling(sibling);
        }
        None
    }

    /// Inclusive containment: a node contains itself.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        if !self.exists(ancestor) || !self.exists(node) {
            return false;
        }
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.node(id).parent;
        }
        false
    }

    pub fn is_attached(&self, id: NodeId) -> bool {
        self.contains(self.root, id)
    }

    /// Pre-order walk of `id` and everything below it.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        let stack = if self.exists(id) { vec![id] } else { Vec::new() };
        Descendants {
            document: self,
            stack,
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(id.0).and_then(|node| node.kind.text())
    }

    /// Length of a node's text in characters; zero for containers.
    pub fn text_len(&self, id: NodeId) -> usize {
        self.text(id).map_or(0, char_len)
    }

    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) -> Result<(), EngineError> {
        match &mut self.try_node_mut(id)?.kind {
            NodeKind::Fragment(fragment) => fragment.text = text.into(),
            NodeKind::Text(existing) => *existing = text.into(),
            NodeKind::Container(_) => return Err(EngineError::NotTextBearing { node: id }),
        }
        Ok(())
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.get(id)?
            .attributes()
            .and_then(|attributes| attributes.get(name))
            .map(String::as_str)
    }

    pub fn set_attribute(
        &mut self,
        id: NodeId,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), EngineError> {
        let attributes = self
            .try_node_mut(id)?
            .kind
            .attributes_mut()
            .ok_or(EngineError::NotAContainer { node: id })?;
        attributes.insert(name.into(), value.into());
        Ok(())
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Option<String> {
        self.nodes
            .get_mut(id.0)?
            .kind
            .attributes_mut()
            .and_then(|attributes| attributes.remove(name))
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Create a detached container.
    pub fn create_container(&mut self, tag: impl Into<String>) -> NodeId {
        self.push(NodeKind::Container(Element::new(tag)))
    }

    /// Create a detached fragment.
    pub fn create_fragment(&mut self, fragment: Fragment) -> NodeId {
        self.push(NodeKind::Fragment(fragment))
    }

    /// Create a detached raw text run.
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeKind::Text(text.into()))
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), EngineError> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` under `parent` before `reference`, or at the end when
    /// `reference` is `None`. The child is detached from its old parent first.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), EngineError> {
        self.check_insertable(parent, child)?;
        if let Some(reference) = reference {
            if reference == child || self.parent(reference) != Some(parent) {
                return Err(EngineError::NotAChild { parent, reference });
            }
        }

        self.remove(child);
        let index = match reference {
            Some(reference) => self.index_in_parent(reference).unwrap_or(0),
            None => self.children(parent).len(),
        };
        self.node_mut(parent).children.insert(index, child);
        self.node_mut(child).parent = Some(parent);
        Ok(())
    }

    /// Detach a node from its parent. The subtree below it is kept intact.
    pub fn remove(&mut self, id: NodeId) {
        if let Some(parent) = self.parent(id) {
            self.node_mut(parent).children.retain(|&child| child != id);
            self.node_mut(id).parent = None;
        }
    }

    /// Replace `node` in its parent with `replacements`, spliced in order at
    /// the same position. `node` ends up detached.
    pub fn replace_with(
        &mut self,
        node: NodeId,
        replacements: &[NodeId],
    ) -> Result<(), EngineError> {
        let parent = self.parent(node).ok_or(EngineError::Detached { node })?;
        for &replacement in replacements {
            if replacement == node {
                return Err(EngineError::HierarchyCycle {
                    parent,
                    child: replacement,
                });
            }
            self.check_insertable(parent, replacement)?;
        }

        for &replacement in replacements {
            self.remove(replacement);
        }
        let index = self
            .index_in_parent(node)
            .ok_or(EngineError::Detached { node })?;
        self.node_mut(parent)
            .children
            .splice(index..=index, replacements.iter().copied());
        for &replacement in replacements {
            self.node_mut(replacement).parent = Some(parent);
        }
        self.node_mut(node).parent = None;
        Ok(())
    }

    fn check_insertable(&self, parent: NodeId, child: NodeId) -> Result<(), EngineError> {
        for node in [parent, child] {
            if !self.exists(node) {
                return Err(EngineError::UnknownNode { node });
            }
        }
        if !matches!(self.kind(parent), NodeKind::Container(_)) {
            return Err(EngineError::NotAContainer { node: parent });
        }
        if self.contains(child, parent) {
            return Err(EngineError::HierarchyCycle { parent, child });
        }
        Ok(())
    }

    /// Turn a raw text run into a fragment in place, keeping its id.
    pub(crate) fn wrap_text(&mut self, id: NodeId) -> bool {
        let Some(node) = self.nodes.get_mut(id.0) else {
            return false;
        };
        let NodeKind::Text(text) = &mut node.kind else {
            return false;
        };
        let text = std::mem::take(text);
        node.kind = NodeKind::Fragment(Fragment::new(text));
        true
    }

    /// Turn a fragment back into a raw text run in place, dropping its markup.
    pub(crate) fn unwrap_fragment(&mut self, id: NodeId) -> bool {
        let Some(node) = self.nodes.get_mut(id.0) else {
            return false;
        };
        let NodeKind::Fragment(fragment) = &mut node.kind else {
            return false;
        };
        let text = std::mem::take(&mut fragment.text);
        node.kind = NodeKind::Text(text);
        true
    }

    /// Markup of a subtree using the default fragment tag.
    pub fn to_markup(&self, id: NodeId) -> String {
        render_markup(self, id, DEFAULT_FRAGMENT_TAG)
    }
}

/// Pre-order iterator returned by [`Document::descendants`].
#[derive(Debug)]
pub struct Descendants<'a> {
    document: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.document.children(id).iter().rev().copied());
        Some(id)
    }
}

/// Number of characters (Unicode scalar values) in `text`.
pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Split `text` after `at` characters; `at` past the end yields `(text, "")`.
pub(crate) fn split_at_char(text: &str, at: usize) -> (&str, &str) {
    let byte = text
        .char_indices()
        .nth(at)
        .map_or(text.len(), |(index, _)| index);
    text.split_at(byte)
}
