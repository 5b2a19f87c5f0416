//! Span resolution: which formatting nodes a selection touches, and how to
//! split boundary leaves so the selection starts and ends on node edges.

use log::debug;

use crate::document::{Attributes, Document, Fragment, NodeId, NodeKind, split_at_char};
use crate::editing::mapper::{Boundaries, TreePosition};
use crate::error::EngineError;

/// The formatting node that owns a leaf's text: the fragment itself, or the
/// container holding a raw text run.
pub fn enclosing_element(document: &Document, leaf: NodeId) -> Option<NodeId> {
    if !document.exists(leaf) {
        return None;
    }
    match document.kind(leaf) {
        NodeKind::Fragment(_) => Some(leaf),
        NodeKind::Text(_) => document.parent(leaf),
        NodeKind::Container(_) => None,
    }
}

/// Nearest node, starting from `start` and walking up, that contains `end`.
pub fn common_ancestor(document: &Document, start: NodeId, end: NodeId) -> Option<NodeId> {
    let mut current = Some(start);
    while let Some(node) = current {
        if document.contains(node, end) {
            return Some(node);
        }
        current = document.parent(node);
    }
    None
}

/// Ancestor of `node` (inclusive) whose parent is `ancestor`.
fn child_towards(document: &Document, ancestor: NodeId, node: NodeId) -> Option<NodeId> {
    let mut current = node;
    loop {
        let parent = document.parent(current)?;
        if parent == ancestor {
            return Some(current);
        }
        current = parent;
    }
}

fn following_elements(document: &Document, node: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut current = document.next_element_sibling(node);
    while let Some(sibling) = current {
        out.push(sibling);
        current = document.next_element_sibling(sibling);
    }
    out
}

/// Preceding element siblings, nearest first.
fn preceding_elements(document: &Document, node: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut current = document.previous_element_sibling(node);
    while let Some(sibling) = current {
        out.push(sibling);
        current = document.previous_element_sibling(sibling);
    }
    out
}

/// Ordered formatting nodes between two boundary nodes, both included.
///
/// The result is the start run (the start node and everything after it up to
/// the common ancestor's child level), the whole children of the common
/// ancestor in between, and the end run built the same way backwards.
/// Partially covered ancestors are never included.
pub fn selected_nodes(document: &Document, start: NodeId, end: NodeId) -> Vec<NodeId> {
    if start == end || document.contains(start, end) {
        return vec![start];
    }
    if document.contains(end, start) {
        return vec![end];
    }

    if document.parent(start).is_some() && document.parent(start) == document.parent(end) {
        let mut nodes = vec![start];
        let mut current = start;
        while let Some(next) = document.next_element_sibling(current) {
            nodes.push(next);
            if next == end {
                break;
            }
            current = next;
        }
        return nodes;
    }

    let Some(common) = common_ancestor(document, start, end) else {
        return Vec::new();
    };
    let (Some(start_child), Some(end_child)) = (
        child_towards(document, common, start),
        child_towards(document, common, end),
    ) else {
        return Vec::new();
    };

    let mut nodes = start_run(document, start, start_child);
    nodes.extend(middle_run(document, common, start_child, end_child));
    nodes.extend(end_run(document, end, end_child));
    nodes
}

fn start_run(document: &Document, start: NodeId, start_child: NodeId) -> Vec<NodeId> {
    let mut run = vec![start];
    let mut node = start;
    while node != start_child {
        run.extend(following_elements(document, node));
        match document.parent(node) {
            Some(parent) => node = parent,
            None => break,
        }
    }
    run
}

fn middle_run(
    document: &Document,
    common: NodeId,
    start_child: NodeId,
    end_child: NodeId,
) -> Vec<NodeId> {
    let children = document.children(common);
    let position = |target| children.iter().position(|&child| child == target);
    let (Some(from), Some(to)) = (position(start_child), position(end_child)) else {
        return Vec::new();
    };
    if to <= from + 1 {
        return Vec::new();
    }
    children[from + 1..to]
        .iter()
        .copied()
        .filter(|&child| document.kind(child).is_element())
        .collect()
}

fn end_run(document: &Document, end: NodeId, end_child: NodeId) -> Vec<NodeId> {
    let mut run = vec![end];
    let mut node = end;
    while node != end_child {
        run.extend(preceding_elements(document, node));
        match document.parent(node) {
            Some(parent) => node = parent,
            None => break,
        }
    }
    run.reverse();
    run
}

/// Boundary nodes after [`wrap_partial`], plus the fragments it created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedBoundary {
    pub start: NodeId,
    pub end: NodeId,
    pub created: Vec<NodeId>,
}

/// Split the boundary leaves of `bounds` so the selection begins and ends
/// exactly on fragment edges.
///
/// Replacement fragments take the attributes of the fragment they replace and
/// are spliced into its parent; empty pieces are never created. Leaf ids in
/// `bounds` are stale afterwards, Linear Offsets are not.
pub fn wrap_partial(
    document: &mut Document,
    bounds: &Boundaries,
) -> Result<WrappedBoundary, EngineError> {
    let TreePosition { leaf: start_leaf, offset: start_offset } = bounds.start;
    let TreePosition { leaf: end_leaf, offset: end_offset } = bounds.end;

    if start_leaf == end_leaf {
        return wrap_single(document, start_leaf, start_offset, end_offset);
    }

    let mut created = Vec::new();

    let start = if start_offset == 0 {
        enclosing(document, start_leaf)?
    } else {
        let (before, selected) = split_text(document, start_leaf, start_offset)?;
        let pieces = splice(document, start_leaf, &[before.as_str(), selected.as_str()])?;
        let selected = pieces[pieces.len() - 1];
        created.extend(pieces);
        selected
    };

    let end = if end_offset >= document.text_len(end_leaf) {
        enclosing(document, end_leaf)?
    } else {
        let (selected, after) = split_text(document, end_leaf, end_offset)?;
        let pieces = splice(document, end_leaf, &[selected.as_str(), after.as_str()])?;
        let selected = pieces[0];
        created.extend(pieces);
        selected
    };

    debug!(
        "wrapped selection {}..{} into {} new fragments",
        bounds.start_offset,
        bounds.end_offset,
        created.len()
    );
    Ok(WrappedBoundary {
        start,
        end,
        created,
    })
}

fn wrap_single(
    document: &mut Document,
    leaf: NodeId,
    from: usize,
    to: usize,
) -> Result<WrappedBoundary, EngineError> {
    let len = document.text_len(leaf);
    if from >= to || (from == 0 && to >= len) {
        let node = enclosing(document, leaf)?;
        return Ok(WrappedBoundary {
            start: node,
            end: node,
            created: Vec::new(),
        });
    }

    let (before, rest) = split_text(document, leaf, from)?;
    let (selected, after) = split_at_char(&rest, to - from);
    let (selected, after) = (selected.to_string(), after.to_string());

    let attributes = inherited_attributes(document, leaf);
    let mut pieces = Vec::new();
    let mut middle = None;
    for (text, is_selection) in [
        (before.as_str(), false),
        (selected.as_str(), true),
        (after.as_str(), false),
    ] {
        if text.is_empty() && !is_selection {
            continue;
        }
        let node = document.create_fragment(Fragment {
            attributes: attributes.clone(),
            text: text.to_string(),
        });
        if is_selection {
            middle = Some(node);
        }
        pieces.push(node);
    }
    document.replace_with(leaf, &pieces)?;

    let middle = middle.ok_or(EngineError::NotTextBearing { node: leaf })?;
    debug!("split {leaf} into {} fragments", pieces.len());
    Ok(WrappedBoundary {
        start: middle,
        end: middle,
        created: pieces,
    })
}

fn enclosing(document: &Document, leaf: NodeId) -> Result<NodeId, EngineError> {
    enclosing_element(document, leaf).ok_or(EngineError::NotTextBearing { node: leaf })
}

fn inherited_attributes(document: &Document, leaf: NodeId) -> Attributes {
    match document.kind(leaf) {
        NodeKind::Fragment(fragment) => fragment.attributes.clone(),
        _ => Attributes::new(),
    }
}

fn split_text(
    document: &Document,
    leaf: NodeId,
    at: usize,
) -> Result<(String, String), EngineError> {
    let text = document
        .text(leaf)
        .ok_or(EngineError::NotTextBearing { node: leaf })?;
    let (before, after) = split_at_char(text, at);
    Ok((before.to_string(), after.to_string()))
}

/// Replace `leaf` with one fragment per non-empty text, returning the new ids.
fn splice(
    document: &mut Document,
    leaf: NodeId,
    texts: &[&str],
) -> Result<Vec<NodeId>, EngineError> {
    let attributes = inherited_attributes(document, leaf);
    let pieces: Vec<NodeId> = texts
        .iter()
        .filter(|text| !text.is_empty())
        .map(|text| {
            document.create_fragment(Fragment {
                attributes: attributes.clone(),
                text: text.to_string(),
            })
        })
        .collect();
    if pieces.is_empty() {
        return Err(EngineError::NotTextBearing { node: leaf });
    }
    document.replace_with(leaf, &pieces)?;
    Ok(pieces)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::mapper::CoordinateMap;
    use crate::tests::{nested_surface, two_leaf_surface};
    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;

    fn bounds_for(document: &Document, surface: NodeId, from: usize, to: usize) -> Boundaries {
        let map = CoordinateMap::new(document, surface);
        let anchor = map.offset_to_position(from).unwrap();
        let focus = map.offset_to_position(to).unwrap();
        map.resolve_boundaries(anchor, focus).unwrap()
    }

    #[test]
    fn test_enclosing_element() {
        let mut doc = Document::default();
        let p = doc.create_container("p");
        let raw = doc.create_text("raw");
        let fragment = doc.create_fragment(Fragment::new("wrapped"));
        doc.append_child(doc.root(), p).unwrap();
        doc.append_child(p, raw).unwrap();
        doc.append_child(p, fragment).unwrap();

        assert_eq!(enclosing_element(&doc, raw), Some(p));
        assert_eq!(enclosing_element(&doc, fragment), Some(fragment));
        assert_eq!(enclosing_element(&doc, p), None);
    }

    #[test]
    fn test_common_ancestor() {
        let fixture = nested_surface();
        let doc = &fixture.document;
        let [one, two, _, four, _, six] = fixture.leaves[..] else {
            panic!("fixture shape changed");
        };

        assert_eq!(common_ancestor(doc, one, two), doc.parent(one));
        assert_eq!(common_ancestor(doc, two, six), Some(fixture.surface));
        assert_eq!(common_ancestor(doc, four, four), Some(four));
    }

    #[test]
    fn test_selected_nodes_identical_and_nested() {
        let fixture = nested_surface();
        let doc = &fixture.document;
        let two = fixture.leaves[1];
        let em = doc.parent(two).unwrap();

        assert_eq!(selected_nodes(doc, two, two), vec![two]);
        assert_eq!(selected_nodes(doc, em, two), vec![em]);
        assert_eq!(selected_nodes(doc, two, em), vec![em]);
    }

    #[test]
    fn test_selected_nodes_siblings_walk_forward() {
        let fixture = nested_surface();
        let doc = &fixture.document;
        let [one, two, three] = fixture.leaves[..3] else {
            panic!("fixture shape changed");
        };
        let em = doc.parent(two).unwrap();

        assert_eq!(selected_nodes(doc, one, three), vec![one, em, three]);
    }

    #[test]
    fn test_selected_nodes_across_blocks() {
        let fixture = nested_surface();
        let doc = &fixture.document;
        let [_, two, three, four, five, six] = fixture.leaves[..] else {
            panic!("fixture shape changed");
        };
        let li_four = doc.parent(four).unwrap();
        let strong = doc.parent(six).unwrap();

        // em > "two" ... li > strong > "six"
        let nodes = selected_nodes(doc, two, six);

        assert_eq!(nodes, vec![two, three, li_four, five, six]);
        assert!(!nodes.contains(&strong));
    }

    #[test]
    fn test_selected_nodes_include_whole_middle_blocks() {
        let mut fixture = nested_surface();
        let doc = &mut fixture.document;
        let quote = doc.create_container("blockquote");
        let quoted = doc.create_fragment(Fragment::new("quoted"));
        doc.append_child(quote, quoted).unwrap();
        let ul = doc.children(fixture.surface)[1];
        doc.insert_before(fixture.surface, quote, Some(ul)).unwrap();
        let doc = &fixture.document;
        let [one, .., four, _, _] = fixture.leaves[..] else {
            panic!("fixture shape changed");
        };

        let nodes = selected_nodes(doc, one, four);

        let em = doc.parent(fixture.leaves[1]).unwrap();
        let three = fixture.leaves[2];
        assert_eq!(nodes, vec![one, em, three, quote, four]);
    }

    #[test]
    fn test_selected_nodes_have_no_duplicates() {
        let fixture = nested_surface();
        let doc = &fixture.document;

        for &start in &fixture.leaves {
            for &end in &fixture.leaves {
                let nodes = selected_nodes(doc, start, end);
                let mut deduped = nodes.clone();
                deduped.sort();
                deduped.dedup();
                assert_eq!(deduped.len(), nodes.len(), "{start} .. {end}: {nodes:?}");
            }
        }
    }

    #[test]
    fn test_wrap_full_leaf_does_not_split() {
        let fixture = two_leaf_surface();
        let mut doc = fixture.document.clone();
        let bounds = bounds_for(&doc, fixture.surface, 0, 6);

        let wrapped = wrap_partial(&mut doc, &bounds).unwrap();

        assert_eq!(wrapped.start, fixture.leaves[0]);
        assert_eq!(wrapped.end, fixture.leaves[0]);
        assert!(wrapped.created.is_empty());
        assert_eq!(
            doc.to_markup(fixture.surface),
            fixture.document.to_markup(fixture.surface)
        );
    }

    #[test]
    fn test_wrap_inside_one_leaf_makes_three_pieces() {
        let fixture = two_leaf_surface();
        let mut doc = fixture.document.clone();
        let bounds = bounds_for(&doc, fixture.surface, 1, 4);

        let wrapped = wrap_partial(&mut doc, &bounds).unwrap();

        assert_eq!(wrapped.created.len(), 3);
        assert_eq!(wrapped.start, wrapped.end);
        assert_eq!(doc.text(wrapped.start), Some("ell"));
        assert_snapshot!(
            doc.to_markup(fixture.surface),
            @"<div><p><text-fragment>H</text-fragment><text-fragment>ell</text-fragment><text-fragment>o </text-fragment><b><text-fragment>world</text-fragment></b></p></div>"
        );
    }

    #[test]
    fn test_wrap_leaf_prefix_omits_empty_piece() {
        let fixture = two_leaf_surface();
        let mut doc = fixture.document.clone();
        let bounds = bounds_for(&doc, fixture.surface, 0, 2);

        let wrapped = wrap_partial(&mut doc, &bounds).unwrap();

        assert_eq!(wrapped.created.len(), 2);
        assert_eq!(doc.text(wrapped.start), Some("He"));
    }

    #[test]
    fn test_wrap_across_leaves_splits_both_ends() {
        let fixture = two_leaf_surface();
        let mut doc = fixture.document.clone();
        let bounds = bounds_for(&doc, fixture.surface, 3, 8);

        let wrapped = wrap_partial(&mut doc, &bounds).unwrap();

        assert_eq!(wrapped.created.len(), 4);
        assert_eq!(doc.text(wrapped.start), Some("lo "));
        assert_eq!(doc.text(wrapped.end), Some("wo"));
        assert_eq!(
            selected_nodes(&doc, wrapped.start, wrapped.end),
            vec![wrapped.start, wrapped.end]
        );
        assert_snapshot!(
            doc.to_markup(fixture.surface),
            @"<div><p><text-fragment>Hel</text-fragment><text-fragment>lo </text-fragment><b><text-fragment>wo</text-fragment><text-fragment>rld</text-fragment></b></p></div>"
        );
    }

    #[test]
    fn test_wrap_reuses_aligned_side() {
        let fixture = two_leaf_surface();
        let mut doc = fixture.document.clone();
        let bounds = bounds_for(&doc, fixture.surface, 0, 8);

        let wrapped = wrap_partial(&mut doc, &bounds).unwrap();

        assert_eq!(wrapped.start, fixture.leaves[0]);
        assert_eq!(wrapped.created.len(), 2);
        assert_eq!(doc.text(wrapped.end), Some("wo"));
    }

    #[test]
    fn test_wrap_preserves_fragment_attributes() {
        let fixture = two_leaf_surface();
        let mut doc = fixture.document.clone();
        let world = fixture.leaves[1];
        doc.set_attribute(world, "class", "accent").unwrap();
        let bounds = bounds_for(&doc, fixture.surface, 7, 9);

        let wrapped = wrap_partial(&mut doc, &bounds).unwrap();

        for piece in wrapped.created {
            assert_eq!(doc.attribute(piece, "class"), Some("accent"));
        }
    }

    #[test]
    fn test_wrap_keeps_linear_text_intact() {
        let fixture = nested_surface();
        let before: String = fixture
            .leaves
            .iter()
            .filter_map(|&leaf| fixture.document.text(leaf))
            .collect();

        let mut doc = fixture.document.clone();
        let bounds = bounds_for(&doc, fixture.surface, 2, 17);
        wrap_partial(&mut doc, &bounds).unwrap();

        let map = CoordinateMap::new(&doc, fixture.surface);
        let after: String = map
            .leaves()
            .iter()
            .filter_map(|&leaf| doc.text(leaf))
            .collect();
        assert_eq!(after, before);
    }
}
