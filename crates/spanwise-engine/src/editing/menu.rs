//! Formatting menu overlay placement.

use serde::{Deserialize, Serialize};

use crate::document::NodeId;
use crate::editing::host::{Rect, Subscription};

/// Fixed-position offsets of the menu overlay, in viewport pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MenuPlacement {
    pub left: f32,
    pub top: f32,
}

impl MenuPlacement {
    /// Inline style applied to the overlay container.
    pub fn style(&self) -> String {
        format!(
            "position: fixed; left: {}px; top: {}px",
            self.left, self.top
        )
    }
}

/// Place a menu of `menu_height` next to a selection.
///
/// Prefers the space above the start element, then the space below the end
/// element, and falls back to the top of the viewport.
pub fn place_menu(
    start: Rect,
    end: Rect,
    menu_height: f32,
    viewport_height: f32,
) -> MenuPlacement {
    let top = if start.top > menu_height {
        start.top - menu_height
    } else if viewport_height - end.bottom > menu_height {
        end.bottom
    } else {
        0.0
    };
    MenuPlacement {
        left: start.left,
        top,
    }
}

/// The open formatting menu and the host subscriptions it holds.
#[derive(Debug)]
pub struct Menu {
    node: NodeId,
    height: f32,
    placement: MenuPlacement,
    pub(crate) pointer_down: Subscription,
    pub(crate) scroll: Subscription,
}

impl Menu {
    pub(crate) fn new(
        node: NodeId,
        height: f32,
        placement: MenuPlacement,
        pointer_down: Subscription,
        scroll: Subscription,
    ) -> Self {
        Self {
            node,
            height,
            placement,
            pointer_down,
            scroll,
        }
    }

    /// Overlay container that wraps the caller's content.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Height measured when the menu was inserted.
    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn placement(&self) -> MenuPlacement {
        self.placement
    }

    pub(crate) fn set_placement(&mut self, placement: MenuPlacement) {
        self.placement = placement;
    }
}
