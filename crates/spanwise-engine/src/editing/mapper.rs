//! Conversion between Linear Offsets and Tree Positions.
//!
//! The coordinate basis is the ordered list of text-bearing leaves under the
//! editable surface. A [`CoordinateMap`] snapshots that list and borrows the
//! document immutably, so the document cannot be mutated while a map built
//! from it is still in use.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::document::{Document, NodeId};

/// A text-bearing leaf plus a character offset inside its text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TreePosition {
    pub leaf: NodeId,
    pub offset: usize,
}

impl TreePosition {
    pub fn new(leaf: NodeId, offset: usize) -> Self {
        Self { leaf, offset }
    }
}

/// An ordered selection range with both coordinate systems filled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundaries {
    pub start: TreePosition,
    pub end: TreePosition,
    pub start_offset: usize,
    pub end_offset: usize,
    /// The host reported the focus before the anchor.
    pub reversed: bool,
}

impl Boundaries {
    pub fn is_collapsed(&self) -> bool {
        self.start_offset == self.end_offset
    }
}

/// Text-bearing leaves below `root` in document order.
pub fn text_leaves(document: &Document, root: NodeId) -> Vec<NodeId> {
    document
        .descendants(root)
        .filter(|&id| document.kind(id).is_text_bearing())
        .collect()
}

/// Snapshot of the leaf sequence used to translate coordinates.
#[derive(Debug)]
pub struct CoordinateMap<'a> {
    document: &'a Document,
    leaves: Vec<NodeId>,
    lengths: Vec<usize>,
}

impl<'a> CoordinateMap<'a> {
    pub fn new(document: &'a Document, root: NodeId) -> Self {
        let leaves = text_leaves(document, root);
        let lengths = leaves.iter().map(|&leaf| document.text_len(leaf)).collect();
        Self {
            document,
            leaves,
            lengths,
        }
    }

    pub fn document(&self) -> &'a Document {
        self.document
    }

    pub fn leaves(&self) -> &[NodeId] {
        &self.leaves
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Character count of the whole surface.
    pub fn total_len(&self) -> usize {
        self.lengths.iter().sum()
    }

    pub fn leaf_index(&self, leaf: NodeId) -> Option<usize> {
        self.leaves.iter().position(|&candidate| candidate == leaf)
    }

    fn len_at(&self, index: usize) -> usize {
        self.lengths.get(index).copied().unwrap_or(0)
    }

    /// Linear Offset of a Tree Position. `None` when the leaf is not part of
    /// this map or the local offset runs past the leaf's text.
    pub fn position_to_offset(&self, position: TreePosition) -> Option<usize> {
        let index = self.leaf_index(position.leaf)?;
        if position.offset > self.len_at(index) {
            return None;
        }
        Some(self.lengths[..index].iter().sum::<usize>() + position.offset)
    }

    /// Tree Position of a Linear Offset.
    ///
    /// At a boundary between two leaves the earlier leaf wins (its full
    /// length). Offsets at or past the end of the surface land on the last
    /// leaf at its full length.
    pub fn offset_to_position(&self, offset: usize) -> Option<TreePosition> {
        let mut total = 0;
        for (&leaf, &len) in self.leaves.iter().zip(&self.lengths) {
            total += len;
            if total >= offset {
                return Some(TreePosition::new(leaf, len - (total - offset)));
            }
        }
        // Ran out of leaves: clamp to the end of the document.
        let (&leaf, &len) = self.leaves.last().zip(self.lengths.last())?;
        Some(TreePosition::new(leaf, len))
    }

    /// Document order of two positions: leaf order first, then local offset.
    pub fn compare(&self, a: TreePosition, b: TreePosition) -> Option<Ordering> {
        let a_index = self.leaf_index(a.leaf)?;
        let b_index = self.leaf_index(b.leaf)?;
        Some(a_index.cmp(&b_index).then(a.offset.cmp(&b.offset)))
    }

    /// Order a host anchor/focus pair and compute its Linear Offsets.
    ///
    /// One ordering rule (tree order) drives both the node order and the
    /// offsets. A non-collapsed range is canonicalised so it starts inside
    /// the first leaf contributing a selected character and ends inside the
    /// last one.
    pub fn resolve_boundaries(
        &self,
        anchor: TreePosition,
        focus: TreePosition,
    ) -> Option<Boundaries> {
        let anchor = self.clamp(anchor)?;
        let focus = self.clamp(focus)?;
        let reversed = self.compare(anchor, focus)? == Ordering::Greater;
        let (start, end) = if reversed {
            (focus, anchor)
        } else {
            (anchor, focus)
        };

        let start_offset = self.position_to_offset(start)?;
        let end_offset = self.position_to_offset(end)?;
        let (start, end) = if start_offset == end_offset {
            (start, end)
        } else {
            self.canonicalise(start, end)?
        };

        Some(Boundaries {
            start,
            end,
            start_offset,
            end_offset,
            reversed,
        })
    }

    fn clamp(&self, position: TreePosition) -> Option<TreePosition> {
        let index = self.leaf_index(position.leaf)?;
        Some(TreePosition::new(
            position.leaf,
            position.offset.min(self.len_at(index)),
        ))
    }

    fn canonicalise(
        &self,
        mut start: TreePosition,
        mut end: TreePosition,
    ) -> Option<(TreePosition, TreePosition)> {
        let mut start_index = self.leaf_index(start.leaf)?;
        let mut end_index = self.leaf_index(end.leaf)?;

        while start_index < end_index && start.offset == self.len_at(start_index) {
            start_index += 1;
            start = TreePosition::new(self.leaves[start_index], 0);
        }
        while end_index > start_index && end.offset == 0 {
            end_index -= 1;
            end = TreePosition::new(self.leaves[end_index], self.len_at(end_index));
        }
        Some((start, end))
    }
}
