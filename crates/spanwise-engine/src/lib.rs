pub mod document;
pub mod editing;
pub mod error;

#[cfg(test)]
pub mod tests;

// Re-export key types for easier usage
pub use document::{Document, Element, Fragment, NodeId, NodeKind};
pub use editing::{Editor, EditorEvent, EditorState, Host, MemoryHost, SelectionResult, TreePosition};
pub use error::EngineError;
pub use spanwise_config::{Config, MenuReopenPolicy};
