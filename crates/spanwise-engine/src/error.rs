use thiserror::Error;

use crate::document::NodeId;

/// Errors raised by tree edits and editor lifecycle operations.
///
/// Selections that fall outside the editable surface are not errors; they
/// surface as `None` from [`crate::editing::Editor::get_selection`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("node {node} cannot hold children")]
    NotAContainer { node: NodeId },

    #[error("node {node} does not carry text")]
    NotTextBearing { node: NodeId },

    #[error("node {node} does not belong to this document")]
    UnknownNode { node: NodeId },

    #[error("node {node} has no parent")]
    Detached { node: NodeId },

    #[error("inserting {child} under {parent} would create a cycle")]
    HierarchyCycle { parent: NodeId, child: NodeId },

    #[error("reference node {reference} is not a child of {parent}")]
    NotAChild { parent: NodeId, reference: NodeId },

    #[error("surface {surface} is not a container")]
    SurfaceNotContainer { surface: NodeId },

    #[error("surface {surface} is the document root; the menu overlay needs room outside it")]
    SurfaceIsRoot { surface: NodeId },

    #[error("surface {surface} is not attached to the document root")]
    SurfaceDetached { surface: NodeId },

    #[error("surface {surface} is already managed by an editor")]
    SurfaceAlreadyEditable { surface: NodeId },

    #[error("menu content {node} would swallow the editable surface")]
    InvalidMenuContent { node: NodeId },

    #[error("no selection inside the editable surface")]
    NoSelection,

    #[error("a formatting menu is already open")]
    MenuAlreadyOpen,
}
