//! HTML-like serialisation of a subtree.
//!
//! Used to compare trees structurally and to hand markup back to a host
//! renderer. Text and attribute values are escaped; attributes come out in
//! sorted order.

use std::fmt::Write;

use super::{Attributes, Document, NodeId, NodeKind};

/// Tag emitted for fragments unless the surface config overrides it.
pub const DEFAULT_FRAGMENT_TAG: &str = "text-fragment";

pub fn render_markup(document: &Document, node: NodeId, fragment_tag: &str) -> String {
    let mut out = String::new();
    if document.exists(node) {
        write_node(document, node, fragment_tag, &mut out);
    }
    out
}

fn write_node(document: &Document, node: NodeId, fragment_tag: &str, out: &mut String) {
    match document.kind(node) {
        NodeKind::Container(element) => {
            open_tag(out, &element.tag, &element.attributes);
            for &child in document.children(node) {
                write_node(document, child, fragment_tag, out);
            }
            close_tag(out, &element.tag);
        }
        NodeKind::Fragment(fragment) => {
            open_tag(out, fragment_tag, &fragment.attributes);
            out.push_str(&html_escape::encode_text(&fragment.text));
            close_tag(out, fragment_tag);
        }
        NodeKind::Text(text) => out.push_str(&html_escape::encode_text(text)),
    }
}

fn open_tag(out: &mut String, tag: &str, attributes: &Attributes) {
    out.push('<');
    out.push_str(tag);
    for (name, value) in attributes {
        // Writing into a String cannot fail
        let _ = write!(
            out,
            " {name}=\"{}\"",
            html_escape::encode_double_quoted_attribute(value)
        );
    }
    out.push('>');
}

fn close_tag(out: &mut String, tag: &str) {
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}
