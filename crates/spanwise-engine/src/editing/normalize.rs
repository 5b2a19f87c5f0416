//! Fragment normalization and its inverse.
//!
//! After [`normalize`] every non-blank raw text run under a container is a
//! [`Fragment`](crate::document::Fragment), which is what the mapper and the
//! span resolver rely on. [`cleanup`] undoes that for bare fragments when the
//! editor is torn down.

use log::{debug, trace};

use crate::document::{Document, NodeId, NodeKind};

fn containers(document: &Document, surface: NodeId) -> Vec<NodeId> {
    document
        .descendants(surface)
        .filter(|&id| matches!(document.kind(id), NodeKind::Container(_)))
        .collect()
}

/// Wrap every non-blank raw text child of every container in the surface
/// (the surface included) into a fragment, and drop whitespace-only runs.
/// Returns the number of runs wrapped.
pub fn normalize(document: &mut Document, surface: NodeId) -> usize {
    let mut wrapped = 0;
    let mut dropped = 0;
    for container in containers(document, surface) {
        for child in document.children(container).to_vec() {
            let NodeKind::Text(text) = document.kind(child) else {
                continue;
            };
            if text.trim().is_empty() {
                document.remove(child);
                dropped += 1;
            } else if document.wrap_text(child) {
                wrapped += 1;
            }
        }
    }
    debug!("normalize: wrapped {wrapped} text runs, dropped {dropped} blank runs");
    wrapped
}

/// Unwrap bare fragments back into raw text, then merge adjacent text runs.
///
/// Unwrapping proceeds in document order and stops at the first fragment
/// that carries attributes or has no text; later fragments stay as they are.
/// Raw runs unwrapped before the stop are still merged, so an early stop
/// leaves `[a, b, c.class]` as `"ab"` followed by the attributed fragment.
pub fn cleanup(document: &mut Document, surface: NodeId) {
    loop {
        let first = document
            .descendants(surface)
            .find(|&id| matches!(document.kind(id), NodeKind::Fragment(_)));
        let Some(id) = first else {
            break;
        };
        let NodeKind::Fragment(fragment) = document.kind(id) else {
            break;
        };
        if !fragment.is_empty_shell() || fragment.text.is_empty() {
            debug!("cleanup stopped at fragment {id}");
            break;
        }
        trace!("cleanup: unwrapping {id}");
        document.unwrap_fragment(id);
    }
    coalesce_text(document, surface);
}

/// Merge adjacent raw text siblings and drop empty ones.
fn coalesce_text(document: &mut Document, surface: NodeId) {
    for container in containers(document, surface) {
        let mut run_head: Option<NodeId> = None;
        for child in document.children(container).to_vec() {
            let NodeKind::Text(text) = document.kind(child) else {
                run_head = None;
                continue;
            };
            if text.is_empty() {
                document.remove(child);
                continue;
            }
            let Some(head) = run_head else {
                run_head = Some(child);
                continue;
            };
            let merged = format!("{}{}", document.text(head).unwrap_or_default(), text);
            if document.set_text(head, merged).is_ok() {
                document.remove(child);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Fragment;
    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;

    fn raw_surface() -> (Document, NodeId) {
        let mut doc = Document::default();
        let surface = doc.create_container("div");
        let p = doc.create_container("p");
        let bold = doc.create_container("b");
        let hello = doc.create_text("Hello ");
        let blank = doc.create_text("  \n ");
        let world = doc.create_text("world");
        let tail = doc.create_text("!");
        doc.append_child(doc.root(), surface).unwrap();
        doc.append_child(surface, p).unwrap();
        doc.append_child(surface, blank).unwrap();
        doc.append_child(p, hello).unwrap();
        doc.append_child(p, bold).unwrap();
        doc.append_child(bold, world).unwrap();
        doc.append_child(p, tail).unwrap();
        (doc, surface)
    }

    #[test]
    fn test_normalize_wraps_runs_and_drops_blanks() {
        let (mut doc, surface) = raw_surface();

        let wrapped = normalize(&mut doc, surface);

        assert_eq!(wrapped, 3);
        assert_snapshot!(
            doc.to_markup(surface),
            @"<div><p><text-fragment>Hello </text-fragment><b><text-fragment>world</text-fragment></b><text-fragment>!</text-fragment></p></div>"
        );
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let (mut doc, surface) = raw_surface();
        normalize(&mut doc, surface);
        let once = doc.to_markup(surface);

        assert_eq!(normalize(&mut doc, surface), 0);
        assert_eq!(doc.to_markup(surface), once);
    }

    #[test]
    fn test_normalize_leaves_outside_text_alone() {
        let (mut doc, surface) = raw_surface();
        let outside = doc.create_text("chrome");
        doc.append_child(doc.root(), outside).unwrap();

        normalize(&mut doc, surface);

        assert_eq!(doc.kind(outside), &NodeKind::Text("chrome".to_string()));
    }

    #[test]
    fn test_cleanup_restores_raw_text() {
        let (mut doc, surface) = raw_surface();
        normalize(&mut doc, surface);

        cleanup(&mut doc, surface);

        assert_snapshot!(doc.to_markup(surface), @"<div><p>Hello <b>world</b>!</p></div>");
    }

    #[test]
    fn test_cleanup_merges_split_runs() {
        let mut doc = Document::default();
        let surface = doc.create_container("div");
        doc.append_child(doc.root(), surface).unwrap();
        for piece in ["Hel", "lo ", "world"] {
            let fragment = doc.create_fragment(Fragment::new(piece));
            doc.append_child(surface, fragment).unwrap();
        }

        cleanup(&mut doc, surface);

        assert_eq!(doc.children(surface).len(), 1);
        assert_eq!(doc.text(doc.children(surface)[0]), Some("Hello world"));
    }

    #[test]
    fn test_cleanup_stops_at_attributed_fragment() {
        let mut doc = Document::default();
        let surface = doc.create_container("div");
        doc.append_child(doc.root(), surface).unwrap();
        let plain = doc.create_fragment(Fragment::new("plain "));
        let mut styled = Fragment::new("styled");
        styled
            .attributes
            .insert("class".to_string(), "accent".to_string());
        let styled = doc.create_fragment(styled);
        let later = doc.create_fragment(Fragment::new(" later"));
        for node in [plain, styled, later] {
            doc.append_child(surface, node).unwrap();
        }

        cleanup(&mut doc, surface);

        assert_snapshot!(
            doc.to_markup(surface),
            @r#"<div>plain <text-fragment class="accent">styled</text-fragment><text-fragment> later</text-fragment></div>"#
        );
    }

    #[test]
    fn test_cleanup_merges_runs_unwrapped_before_stop() {
        let mut doc = Document::default();
        let surface = doc.create_container("div");
        doc.append_child(doc.root(), surface).unwrap();
        let mut styled = Fragment::new("c");
        styled
            .attributes
            .insert("class".to_string(), "accent".to_string());
        let nodes = [
            doc.create_fragment(Fragment::new("a")),
            doc.create_fragment(Fragment::new("b")),
            doc.create_fragment(styled),
        ];
        for node in nodes {
            doc.append_child(surface, node).unwrap();
        }

        cleanup(&mut doc, surface);

        assert_eq!(doc.children(surface), &[nodes[0], nodes[2]]);
        assert_snapshot!(
            doc.to_markup(surface),
            @r#"<div>ab<text-fragment class="accent">c</text-fragment></div>"#
        );
    }

    #[test]
    fn test_cleanup_stops_at_empty_fragment() {
        let mut doc = Document::default();
        let surface = doc.create_container("div");
        doc.append_child(doc.root(), surface).unwrap();
        let empty = doc.create_fragment(Fragment::new(""));
        let after = doc.create_fragment(Fragment::new("after"));
        doc.append_child(surface, empty).unwrap();
        doc.append_child(surface, after).unwrap();

        cleanup(&mut doc, surface);

        assert!(matches!(doc.kind(empty), NodeKind::Fragment(_)));
        assert!(matches!(doc.kind(after), NodeKind::Fragment(_)));
    }

    #[test]
    fn test_cleanup_is_idempotent() {
        let (mut doc, surface) = raw_surface();
        normalize(&mut doc, surface);
        cleanup(&mut doc, surface);
        let once = doc.to_markup(surface);

        cleanup(&mut doc, surface);

        assert_eq!(doc.to_markup(surface), once);
    }
}
