//! Selection orchestration for one editable surface.
//!
//! [`Editor`] owns the document and the host. It turns host pointer events
//! into cached [`SelectionResult`]s, installs programmatic selections and
//! manages the lifecycle of the formatting menu overlay.

use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};
use spanwise_config::{Config, MenuReopenPolicy};

use crate::document::{Document, NodeId, NodeKind, render_markup};
use crate::editing::host::{Host, HostEvent, Subscription};
use crate::editing::mapper::{Boundaries, CoordinateMap, TreePosition, text_leaves};
use crate::editing::menu::{Menu, MenuPlacement, place_menu};
use crate::editing::normalize;
use crate::editing::span::{enclosing_element, selected_nodes, wrap_partial};
use crate::error::EngineError;

/// Selection snapshot handed to listeners and cached as "last selected".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionResult {
    pub start_offset: usize,
    pub end_offset: usize,
    /// Formatting nodes spanned by the selection, in document order.
    pub selected_nodes: Vec<NodeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditorEvent {
    Select,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorState {
    /// No selection inside the surface.
    Idle,
    Selected,
    MenuOpen,
}

type Listener = Box<dyn FnMut(Option<&SelectionResult>)>;

pub struct Editor<H: Host> {
    document: Document,
    surface: NodeId,
    host: H,
    config: Config,
    last_selected: Option<SelectionResult>,
    menu: Option<Menu>,
    listeners: Vec<(ListenerId, EditorEvent, Listener)>,
    next_listener: u64,
    pointer_up: Subscription,
}

impl<H: Host> Editor<H> {
    /// Take over `surface`: mark it editable, subscribe to pointer-up and
    /// normalize its text runs into fragments.
    pub fn new(
        mut document: Document,
        surface: NodeId,
        mut host: H,
        config: Config,
    ) -> Result<Self, EngineError> {
        if !document.exists(surface) || !matches!(document.kind(surface), NodeKind::Container(_))
        {
            return Err(EngineError::SurfaceNotContainer { surface });
        }
        if surface == document.root() {
            return Err(EngineError::SurfaceIsRoot { surface });
        }
        if !document.is_attached(surface) {
            return Err(EngineError::SurfaceDetached { surface });
        }
        let attribute = config.surface.editable_attribute.as_str();
        if document.attribute(surface, attribute).is_some() {
            return Err(EngineError::SurfaceAlreadyEditable { surface });
        }

        document.set_attribute(surface, attribute, "true")?;
        normalize::normalize(&mut document, surface);
        let pointer_up = host.subscribe(HostEvent::PointerUp);
        debug!("editor attached to surface {surface}");

        Ok(Self {
            document,
            surface,
            host,
            config,
            last_selected: None,
            menu: None,
            listeners: Vec::new(),
            next_listener: 0,
            pointer_up,
        })
    }

    pub fn with_defaults(document: Document, surface: NodeId, host: H) -> Result<Self, EngineError> {
        Self::new(document, surface, host, Config::default())
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Mutable access for embedders editing the tree directly. Cached
    /// selections are not revalidated; call [`Editor::normalize`] afterwards
    /// if raw text was added.
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn surface(&self) -> NodeId {
        self.surface
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn last_selected(&self) -> Option<&SelectionResult> {
        self.last_selected.as_ref()
    }

    pub fn menu(&self) -> Option<&Menu> {
        self.menu.as_ref()
    }

    pub fn state(&self) -> EditorState {
        if self.menu.is_some() {
            EditorState::MenuOpen
        } else if self.last_selected.is_some() {
            EditorState::Selected
        } else {
            EditorState::Idle
        }
    }

    pub fn normalize(&mut self) -> usize {
        normalize::normalize(&mut self.document, self.surface)
    }

    pub fn cleanup(&mut self) {
        normalize::cleanup(&mut self.document, self.surface);
    }

    /// Markup of the surface using the configured fragment tag.
    pub fn markup(&self) -> String {
        render_markup(
            &self.document,
            self.surface,
            &self.config.surface.fragment_tag,
        )
    }

    pub fn on(
        &mut self,
        event: EditorEvent,
        listener: impl FnMut(Option<&SelectionResult>) + 'static,
    ) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, event, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` if it was already removed.
    pub fn off(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener, _, _)| *listener != id);
        self.listeners.len() != before
    }

    fn fire(&mut self, event: EditorEvent) {
        trace!("firing {event:?} to {} listeners", self.listeners.len());
        for (_, registered, listener) in &mut self.listeners {
            if *registered == event {
                listener(self.last_selected.as_ref());
            }
        }
    }

    /// Resolve the host selection against the surface, or `None` when either
    /// end lies outside it.
    fn boundaries(&self) -> Option<Boundaries> {
        let Some(selection) = self.host.selection() else {
            debug!("no host selection");
            return None;
        };
        for position in [selection.anchor, selection.focus] {
            if !self.document.contains(self.surface, position.leaf) {
                debug!("selection endpoint {} is outside the surface", position.leaf);
                return None;
            }
        }
        let map = CoordinateMap::new(&self.document, self.surface);
        let bounds = map.resolve_boundaries(selection.anchor, selection.focus);
        if bounds.is_none() {
            debug!("selection endpoints are not text leaves");
        }
        bounds
    }

    /// Enclosing elements of the current selection's start and end.
    fn boundary_elements(&self) -> Option<(NodeId, NodeId)> {
        let bounds = self.boundaries()?;
        Some((
            enclosing_element(&self.document, bounds.start.leaf)?,
            enclosing_element(&self.document, bounds.end.leaf)?,
        ))
    }

    fn resolve_selection(&self) -> Option<SelectionResult> {
        let bounds = self.boundaries()?;
        let start = enclosing_element(&self.document, bounds.start.leaf)?;
        let end = enclosing_element(&self.document, bounds.end.leaf)?;
        Some(SelectionResult {
            start_offset: bounds.start_offset,
            end_offset: bounds.end_offset,
            selected_nodes: selected_nodes(&self.document, start, end),
        })
    }

    /// Current selection inside the surface.
    ///
    /// With `wrap_partial` set and a non-collapsed selection, boundary text
    /// runs are split first so the selection starts and ends on fragment
    /// edges, and the same offsets are installed again against the new tree.
    pub fn get_selection(&mut self, wrap_partial_leaves: bool) -> Option<SelectionResult> {
        if !wrap_partial_leaves {
            return self.resolve_selection();
        }
        let bounds = self.boundaries()?;
        if bounds.is_collapsed() {
            return self.resolve_selection();
        }

        if let Err(err) = wrap_partial(&mut self.document, &bounds) {
            warn!("failed to wrap selection boundaries: {err}");
            return None;
        }
        self.install_offsets(bounds.start_offset, bounds.end_offset);
        let result = self.resolve_selection();
        self.last_selected = result.clone();
        result
    }

    fn install_offsets(&mut self, start: usize, end: usize) {
        let map = CoordinateMap::new(&self.document, self.surface);
        let (Some(start), Some(end)) = (map.offset_to_position(start), map.offset_to_position(end))
        else {
            debug!("surface has no text to select");
            return;
        };
        self.host.install_selection(start, end);
    }

    /// Select `start..end` (in either order) by Linear Offset and refresh the
    /// cached selection.
    pub fn set_selection(&mut self, start: usize, end: usize) {
        self.install_offsets(start.min(end), start.max(end));
        self.last_selected = self.resolve_selection();
    }

    /// Select from the start of the first node to the end of the last one.
    pub fn select_nodes(&mut self, nodes: &[NodeId]) {
        let (Some(&first), Some(&last)) = (nodes.first(), nodes.last()) else {
            return;
        };
        if !self.document.contains(self.surface, first) || !self.document.contains(self.surface, last)
        {
            debug!("select_nodes: {first}..{last} is outside the surface");
            return;
        }
        let start = text_leaves(&self.document, first).first().copied();
        let end = text_leaves(&self.document, last).last().copied();
        let (Some(start), Some(end)) = (start, end) else {
            debug!("select_nodes: no text under {first}..{last}");
            return;
        };
        let end = TreePosition::new(end, self.document.text_len(end));
        self.host.install_selection(TreePosition::new(start, 0), end);
        self.last_selected = self.resolve_selection();
    }

    fn menu_contains(&self, target: NodeId) -> bool {
        self.menu
            .as_ref()
            .is_some_and(|menu| self.document.contains(menu.node(), target))
    }

    /// Host pointer-up at `target`.
    pub fn handle_pointer_up(&mut self, target: NodeId) {
        trace!("pointer-up at {target}");
        if self.menu_contains(target) {
            if let Some(last) = &self.last_selected {
                let (start, end) = (last.start_offset, last.end_offset);
                self.install_offsets(start, end);
            }
            return;
        }
        self.last_selected = self.resolve_selection();
        debug!("selection is now {:?}", self.last_selected);
        self.fire(EditorEvent::Select);
    }

    /// Host pointer-down at `target`; closes the menu when outside it.
    pub fn handle_pointer_down(&mut self, target: NodeId) {
        trace!("pointer-down at {target}");
        if self.menu.is_none() {
            warn!("pointer-down delivered with no open menu");
            return;
        }
        if !self.menu_contains(target) {
            self.close_menu();
        }
    }

    /// Host scroll; keeps the menu attached to the selection.
    pub fn handle_scroll(&mut self) {
        trace!("scroll");
        if self.menu.is_none() {
            warn!("scroll delivered with no open menu");
            return;
        }
        let placement = self.placement();
        if let (Some(menu), Some(placement)) = (self.menu.as_mut(), placement) {
            menu.set_placement(placement);
            let node = menu.node();
            if let Err(err) = self.document.set_attribute(node, "style", placement.style()) {
                warn!("failed to move menu {node}: {err}");
            }
        }
    }

    fn placement(&self) -> Option<MenuPlacement> {
        let menu = self.menu.as_ref()?;
        let (start, end) = self.boundary_elements()?;
        Some(place_menu(
            self.host.bounding_rect(start),
            self.host.bounding_rect(end),
            menu.height(),
            self.host.viewport_height(),
        ))
    }

    /// Show `content` in a fixed-position overlay next to the selection.
    ///
    /// The overlay closes itself on the next pointer-down outside it. A
    /// rejected call leaves any open menu in place.
    pub fn insert_menu(&mut self, content: NodeId) -> Result<(), EngineError> {
        if self.menu.is_some() && self.config.menu.reopen == MenuReopenPolicy::Reject {
            return Err(EngineError::MenuAlreadyOpen);
        }
        if !self.document.exists(content)
            || self.document.contains(content, self.surface)
            || self.document.contains(self.surface, content)
        {
            return Err(EngineError::InvalidMenuContent { node: content });
        }
        let (start, end) = self.boundary_elements().ok_or(EngineError::NoSelection)?;
        if self.close_menu() {
            debug!("replaced open menu");
        }

        let node = self.document.create_container(self.config.menu.tag.as_str());
        self.document.append_child(node, content)?;
        let root = self.document.root();
        self.document.append_child(root, node)?;

        let height = self.host.bounding_rect(node).height();
        let placement = place_menu(
            self.host.bounding_rect(start),
            self.host.bounding_rect(end),
            height,
            self.host.viewport_height(),
        );
        self.document.set_attribute(node, "style", placement.style())?;

        let pointer_down = self.host.subscribe(HostEvent::PointerDown);
        let scroll = self.host.subscribe(HostEvent::Scroll);
        debug!("menu {node} opened at {placement:?}");
        self.menu = Some(Menu::new(node, height, placement, pointer_down, scroll));
        Ok(())
    }

    /// Remove the menu and release its subscriptions. Returns `false` when no
    /// menu was open.
    pub fn close_menu(&mut self) -> bool {
        let Some(menu) = self.menu.take() else {
            return false;
        };
        let node = menu.node();
        self.host.unsubscribe(menu.pointer_down);
        self.host.unsubscribe(menu.scroll);
        self.document.remove(node);
        debug!("menu {node} closed");
        true
    }

    /// Detach from the surface and hand back the document and host.
    pub fn destroy(mut self) -> (Document, H) {
        self.close_menu();
        let Self {
            mut document,
            surface,
            mut host,
            config,
            pointer_up,
            ..
        } = self;
        host.unsubscribe(pointer_up);
        document.remove_attribute(surface, &config.surface.editable_attribute);
        normalize::cleanup(&mut document, surface);
        debug!("editor detached from surface {surface}");
        (document, host)
    }
}
