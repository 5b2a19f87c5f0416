//! The rendering surface the engine is embedded in.
//!
//! A [`Host`] owns the user-visible selection, geometry and event delivery.
//! The engine never reaches into a renderer directly. [`MemoryHost`] is the
//! headless implementation used in tests.

use std::collections::{BTreeMap, HashMap};

use log::{trace, warn};
use serde::{Deserialize, Serialize};

use crate::document::NodeId;
use crate::editing::mapper::TreePosition;

/// Host notifications the editor can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HostEvent {
    PointerUp,
    PointerDown,
    Scroll,
}

/// Handle for one active host subscription.
///
/// Not `Clone`: releasing a subscription consumes its handle, so each
/// `subscribe` is matched by exactly one `unsubscribe`.
#[derive(Debug, PartialEq, Eq)]
pub struct Subscription {
    id: u64,
    event: HostEvent,
}

impl Subscription {
    pub fn new(id: u64, event: HostEvent) -> Self {
        Self { id, event }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn event(&self) -> HostEvent {
        self.event
    }
}

/// The host's user-selected range, in the order the user made it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostSelection {
    pub anchor: TreePosition,
    pub focus: TreePosition,
}

/// Viewport-relative bounding box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub top: f32,
    pub left: f32,
    pub bottom: f32,
    pub right: f32,
}

impl Rect {
    pub fn new(top: f32, left: f32, bottom: f32, right: f32) -> Self {
        Self {
            top,
            left,
            bottom,
            right,
        }
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }
}

pub trait Host {
    /// Current selection, or `None` when nothing is selected.
    fn selection(&self) -> Option<HostSelection>;

    /// Replace the current selection with `start..end`.
    fn install_selection(&mut self, start: TreePosition, end: TreePosition);

    fn bounding_rect(&self, node: NodeId) -> Rect;

    fn viewport_height(&self) -> f32;

    fn subscribe(&mut self, event: HostEvent) -> Subscription;

    fn unsubscribe(&mut self, subscription: Subscription);
}

/// Headless host that keeps selection and geometry in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryHost {
    selection: Option<HostSelection>,
    rects: HashMap<NodeId, Rect>,
    viewport_height: f32,
    subscriptions: BTreeMap<u64, HostEvent>,
    next_subscription: u64,
    installs: usize,
}

impl MemoryHost {
    pub fn new(viewport_height: f32) -> Self {
        Self {
            viewport_height,
            ..Self::default()
        }
    }

    /// Simulate the user dragging from `anchor` to `focus`.
    pub fn select(&mut self, anchor: TreePosition, focus: TreePosition) {
        self.selection = Some(HostSelection { anchor, focus });
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    pub fn set_rect(&mut self, node: NodeId, rect: Rect) {
        self.rects.insert(node, rect);
    }

    pub fn set_viewport_height(&mut self, height: f32) {
        self.viewport_height = height;
    }

    pub fn active_subscriptions(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_subscribed(&self, event: HostEvent) -> bool {
        self.subscriptions.values().any(|&active| active == event)
    }

    /// How many times a selection was installed by the engine.
    pub fn install_count(&self) -> usize {
        self.installs
    }
}

impl Host for MemoryHost {
    fn selection(&self) -> Option<HostSelection> {
        self.selection
    }

    fn install_selection(&mut self, start: TreePosition, end: TreePosition) {
        self.installs += 1;
        self.selection = Some(HostSelection {
            anchor: start,
            focus: end,
        });
    }

    fn bounding_rect(&self, node: NodeId) -> Rect {
        self.rects.get(&node).copied().unwrap_or_default()
    }

    fn viewport_height(&self) -> f32 {
        self.viewport_height
    }

    fn subscribe(&mut self, event: HostEvent) -> Subscription {
        let id = self.next_subscription;
        self.next_subscription += 1;
        self.subscriptions.insert(id, event);
        trace!("subscribed {event:?} as {id}");
        Subscription::new(id, event)
    }

    fn unsubscribe(&mut self, subscription: Subscription) {
        if self.subscriptions.remove(&subscription.id()).is_none() {
            warn!(
                "unsubscribe for unknown {:?} subscription {}",
                subscription.event(),
                subscription.id()
            );
        }
    }
}
