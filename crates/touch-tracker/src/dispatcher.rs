//! Listener registry and event fan-out
//!
//! The dispatcher is an ordinary value owned by the engine. Listeners are
//! registered as `Arc<dyn TouchListener>` handles and receive their own copy
//! of every event.

use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;
use touch_core::{CoordinateSpace, TouchEvent, TouchEventKind};
use tracing::{debug, trace};

/// Broadcast channel capacity used by [`BroadcastListener::default`]
const BROADCAST_CAPACITY: usize = 1024;

/// Receiver of contact lifecycle notifications.
///
/// Calibrated notifications are always delivered. Raw notifications are only
/// delivered while a calibration session is active and default to no-ops.
#[cfg_attr(test, mockall::automock)]
pub trait TouchListener: Send + Sync {
    fn touch_arrived(&self, event: TouchEvent);
    fn touch_moved(&self, event: TouchEvent);
    fn touch_held(&self, event: TouchEvent);
    fn touch_departed(&self, event: TouchEvent);

    fn raw_touch_arrived(&self, _event: TouchEvent) {}
    fn raw_touch_moved(&self, _event: TouchEvent) {}
    fn raw_touch_held(&self, _event: TouchEvent) {}
    fn raw_touch_departed(&self, _event: TouchEvent) {}
}

/// Handle returned by [`EventDispatcher::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// Fans events out to registered listeners in registration order
#[derive(Default)]
pub struct EventDispatcher {
    listeners: Vec<(ListenerId, Arc<dyn TouchListener>)>,
    next_id: u64,
    published: u64,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener
    pub fn subscribe(&mut self, listener: Arc<dyn TouchListener>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, listener));
        debug!("Registered {}, total: {}", id, self.listeners.len());
        id
    }

    /// Remove a listener; returns false if the handle was unknown
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        let removed = self.listeners.len() != before;
        if removed {
            debug!("Unregistered {}, total: {}", id, self.listeners.len());
        }
        removed
    }

    /// Deliver one event to every listener
    pub fn publish(&mut self, event: &TouchEvent) {
        trace!(
            "Publishing {:?} {} for {} to {} listeners",
            event.space,
            event.kind,
            event.contact.id,
            self.listeners.len()
        );

        for (_, listener) in &self.listeners {
            let copy = event.clone();
            match (event.space, event.kind) {
                (CoordinateSpace::Calibrated, TouchEventKind::Arrived) => listener.touch_arrived(copy),
                (CoordinateSpace::Calibrated, TouchEventKind::Moved) => listener.touch_moved(copy),
                (CoordinateSpace::Calibrated, TouchEventKind::Held) => listener.touch_held(copy),
                (CoordinateSpace::Calibrated, TouchEventKind::Departed) => listener.touch_departed(copy),
                (CoordinateSpace::Raw, TouchEventKind::Arrived) => listener.raw_touch_arrived(copy),
                (CoordinateSpace::Raw, TouchEventKind::Moved) => listener.raw_touch_moved(copy),
                (CoordinateSpace::Raw, TouchEventKind::Held) => listener.raw_touch_held(copy),
                (CoordinateSpace::Raw, TouchEventKind::Departed) => listener.raw_touch_departed(copy),
            }
        }

        self.published += 1;
    }

    /// Deliver events in order
    pub fn publish_batch(&mut self, events: &[TouchEvent]) {
        for event in events {
            self.publish(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Events published since creation
    pub fn events_published(&self) -> u64 {
        self.published
    }
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("listeners", &self.listeners.len())
            .field("published", &self.published)
            .finish()
    }
}

// ============================================================================
// BROADCAST BRIDGE
// ============================================================================

/// Listener that forwards events into a tokio broadcast channel so async
/// consumers can follow the stream.
pub struct BroadcastListener {
    sender: broadcast::Sender<TouchEvent>,
    include_raw: bool,
}

impl BroadcastListener {
    /// Create a bridge with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            include_raw: false,
        }
    }

    /// Also forward raw events while calibrating
    pub fn with_raw(mut self) -> Self {
        self.include_raw = true;
        self
    }

    /// Subscribe to forwarded events
    pub fn subscribe(&self) -> broadcast::Receiver<TouchEvent> {
        self.sender.subscribe()
    }

    /// Number of live receivers
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }

    fn forward(&self, event: TouchEvent) {
        // No receivers is not an error for a fire-and-forget bridge
        let _ = self.sender.send(event);
    }

    fn forward_raw(&self, event: TouchEvent) {
        if self.include_raw {
            self.forward(event);
        }
    }
}

impl Default for BroadcastListener {
    fn default() -> Self {
        Self::new(BROADCAST_CAPACITY)
    }
}

impl TouchListener for BroadcastListener {
    fn touch_arrived(&self, event: TouchEvent) {
        self.forward(event);
    }

    fn touch_moved(&self, event: TouchEvent) {
        self.forward(event);
    }

    fn touch_held(&self, event: TouchEvent) {
        self.forward(event);
    }

    fn touch_departed(&self, event: TouchEvent) {
        self.forward(event);
    }

    fn raw_touch_arrived(&self, event: TouchEvent) {
        self.forward_raw(event);
    }

    fn raw_touch_moved(&self, event: TouchEvent) {
        self.forward_raw(event);
    }

    fn raw_touch_held(&self, event: TouchEvent) {
        self.forward_raw(event);
    }

    fn raw_touch_departed(&self, event: TouchEvent) {
        self.forward_raw(event);
    }
}

// ============================================================================
// TESTS
// ============================================================================
