//! Shared document fixtures for unit tests.
//!
//! Fixtures are already normalized: every text run is a fragment.

use crate::document::{Document, Fragment, NodeId};

/// A document with one editable surface and its text leaves in order.
#[derive(Debug, Clone)]
pub struct Fixture {
    pub document: Document,
    pub surface: NodeId,
    pub leaves: Vec<NodeId>,
}

fn surface(document: &mut Document) -> NodeId {
    let surface = document.create_container("div");
    let root = document.root();
    document.append_child(root, surface).unwrap();
    surface
}

fn leaf(document: &mut Document, parent: NodeId, text: &str) -> NodeId {
    let fragment = document.create_fragment(Fragment::new(text));
    document.append_child(parent, fragment).unwrap();
    fragment
}

fn container(document: &mut Document, parent: NodeId, tag: &str) -> NodeId {
    let node = document.create_container(tag);
    document.append_child(parent, node).unwrap();
    node
}

/// `<div><p>"Hello " <b>"world"</b></p></div>`
pub fn two_leaf_surface() -> Fixture {
    let mut document = Document::default();
    let surface = surface(&mut document);
    let p = container(&mut document, surface, "p");
    let hello = leaf(&mut document, p, "Hello ");
    let bold = container(&mut document, p, "b");
    let world = leaf(&mut document, bold, "world");
    Fixture {
        document,
        surface,
        leaves: vec![hello, world],
    }
}

/// Two blocks with inline formatting at several depths:
///
/// ```text
/// div
/// ├── p: "One " <em>"two"</em> " three"
/// └── ul
///     ├── li: "four"
///     └── li: "five " <strong>"six"</strong>
/// ```
pub fn nested_surface() -> Fixture {
    let mut document = Document::default();
    let surface = surface(&mut document);

    let p = container(&mut document, surface, "p");
    let one = leaf(&mut document, p, "One ");
    let em = container(&mut document, p, "em");
    let two = leaf(&mut document, em, "two");
    let three = leaf(&mut document, p, " three");

    let ul = container(&mut document, surface, "ul");
    let first_item = container(&mut document, ul, "li");
    let four = leaf(&mut document, first_item, "four");
    let second_item = container(&mut document, ul, "li");
    let five = leaf(&mut document, second_item, "five ");
    let strong = container(&mut document, second_item, "strong");
    let six = leaf(&mut document, strong, "six");

    Fixture {
        document,
        surface,
        leaves: vec![one, two, three, four, five, six],
    }
}
