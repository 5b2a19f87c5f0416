/*!
 * # Editing Core
 *
 * Selection handling for an in-place rich-text surface. The surface is a
 * container inside an engine-owned [`Document`](crate::document::Document);
 * its text lives in **fragments**, atomic leaves that each own one text run.
 *
 * ## Coordinate systems
 *
 * - **Linear Offset**: a character count over every text leaf of the surface
 *   in document order. This is what callers store and hand back.
 * - **Tree Position**: a `(leaf, offset)` pair. This is what the host reports
 *   for its anchor and focus and what it accepts when a selection is installed.
 *
 * [`mapper`] converts between the two, [`span`] turns an ordered range into the
 * list of formatting nodes it covers (splitting boundary leaves on request),
 * and [`normalize`] keeps the fragment invariant the other two depend on.
 *
 * ## Module Structure
 *
 * - **`normalize`**: wrapping raw text into fragments and unwrapping it again
 * - **`mapper`**: `CoordinateMap`, offset <-> position conversion and ordering
 * - **`span`**: common ancestor, selected nodes and partial-leaf wrapping
 * - **`host`**: the `Host` trait plus the headless `MemoryHost`
 * - **`menu`**: formatting menu placement
 * - **`editor`**: `Editor`, the per-surface state machine
 *
 * ## Usage Pattern
 *
 * ```rust
 * use spanwise_engine::document::Document;
 * use spanwise_engine::editing::{Editor, MemoryHost};
 *
 * let mut document = Document::default();
 * let surface = document.create_container("div");
 * let text = document.create_text("Hello world");
 * document.append_child(document.root(), surface).unwrap();
 * document.append_child(surface, text).unwrap();
 *
 * let mut editor = Editor::with_defaults(document, surface, MemoryHost::new(600.0)).unwrap();
 * editor.set_selection(0, 5);
 *
 * let selection = editor.get_selection(false).unwrap();
 * assert_eq!((selection.start_offset, selection.end_offset), (0, 5));
 * ```
 */

pub mod editor;
pub mod host;
pub mod mapper;
pub mod menu;
pub mod normalize;
pub mod span;

pub use editor::{Editor, EditorEvent, EditorState, ListenerId, SelectionResult};
pub use host::{Host, HostEvent, HostSelection, MemoryHost, Rect, Subscription};
pub use mapper::{Boundaries, CoordinateMap, TreePosition, text_leaves};
pub use menu::{Menu, MenuPlacement, place_menu};
pub use normalize::{cleanup, normalize};
pub use span::{WrappedBoundary, common_ancestor, enclosing_element, selected_nodes, wrap_partial};
