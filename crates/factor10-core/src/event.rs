//! Presentation notifications.
//!
//! The simulation never talks to a renderer directly. Construction, per-tick
//! visual state and item movements are emitted as [`Event`]s into an
//! [`EventBus`], buffered, and delivered in batch to passive listeners at the
//! end of each tick or compile. Delivery is fire-and-forget: listeners cannot
//! influence the simulation.
//!
//! # Suppression
//!
//! Event kinds can be suppressed via [`EventBus::suppress`]. Suppressed
//! events are dropped at emit time and cost nothing to buffer. Headless runs
//! typically suppress everything.

use crate::entity::{AssetPlacement, Position};
use crate::fixed::Ticks;
use crate::id::{EntityId, LinkId, ProductId};
use crate::link::PathPoint;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// Per-tick visual state of a source.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceVisual {
    pub entity: EntityId,
    pub product_name: String,
    pub duration: Ticks,
    /// Production progress in `[0, 1]`.
    pub progress: f64,
    /// Repair progress in `[0, 1]`.
    pub repair: f64,
    pub broken: bool,
}

/// Per-tick visual state of a sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkVisual {
    pub entity: EntityId,
    pub product_name: String,
    pub stock: u64,
    pub capacity: u64,
    pub fail: u64,
    pub loss: u64,
}

/// A presentation notification.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Drop everything previously drawn.
    SceneCleared,

    // -- Construction --
    NodeCreated {
        entity: EntityId,
        position: Position,
    },
    NodeMoved {
        entity: EntityId,
        position: Position,
    },
    NodeAssetAdded {
        entity: EntityId,
        asset: AssetPlacement,
    },

    // -- Finalize --
    SourceConfigured {
        entity: EntityId,
        product_name: String,
        duration: Ticks,
    },
    SinkConfigured {
        entity: EntityId,
        product_name: String,
    },
    LinkPathCreated {
        link: LinkId,
        path: Vec<PathPoint>,
        volume: u32,
    },

    // -- Per tick --
    SourceUpdated(SourceVisual),
    SinkUpdated(SinkVisual),
    ItemTransported {
        link: LinkId,
        product: ProductId,
        is_fail: bool,
        is_pull: bool,
        delay_offset: f64,
    },
}

/// Discriminant tag for event types, used for suppression and subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    SceneCleared,
    NodeCreated,
    NodeMoved,
    NodeAssetAdded,
    SourceConfigured,
    SinkConfigured,
    LinkPathCreated,
    SourceUpdated,
    SinkUpdated,
    ItemTransported,
}

/// Total number of event kinds.
const EVENT_KIND_COUNT: usize = 10;

impl EventKind {
    pub const ALL: [EventKind; EVENT_KIND_COUNT] = [
        EventKind::SceneCleared,
        EventKind::NodeCreated,
        EventKind::NodeMoved,
        EventKind::NodeAssetAdded,
        EventKind::SourceConfigured,
        EventKind::SinkConfigured,
        EventKind::LinkPathCreated,
        EventKind::SourceUpdated,
        EventKind::SinkUpdated,
        EventKind::ItemTransported,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

impl Event {
    /// Get the discriminant kind for this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::SceneCleared => EventKind::SceneCleared,
            Event::NodeCreated { .. } => EventKind::NodeCreated,
            Event::NodeMoved { .. } => EventKind::NodeMoved,
            Event::NodeAssetAdded { .. } => EventKind::NodeAssetAdded,
            Event::SourceConfigured { .. } => EventKind::SourceConfigured,
            Event::SinkConfigured { .. } => EventKind::SinkConfigured,
            Event::LinkPathCreated { .. } => EventKind::LinkPathCreated,
            Event::SourceUpdated(_) => EventKind::SourceUpdated,
            Event::SinkUpdated(_) => EventKind::SinkUpdated,
            Event::ItemTransported { .. } => EventKind::ItemTransported,
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// A passive listener receives events read-only.
pub type PassiveListener = Box<dyn FnMut(&Event)>;

/// Buffers events and delivers them to per-kind listeners.
pub struct EventBus {
    /// Events emitted since the last delivery, in emission order.
    pending: Vec<Event>,

    /// Suppressed event kinds. Suppressed events are never buffered.
    suppressed: [bool; EVENT_KIND_COUNT],

    /// Listeners indexed by event kind, in registration order.
    listeners: [Vec<PassiveListener>; EVENT_KIND_COUNT],

    /// Total events accepted since creation.
    total_emitted: u64,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let listener_count: usize = self.listeners.iter().map(Vec::len).sum();
        f.debug_struct("EventBus")
            .field("pending", &self.pending.len())
            .field("suppressed", &self.suppressed)
            .field("listeners", &listener_count)
            .field("total_emitted", &self.total_emitted)
            .finish()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            suppressed: [false; EVENT_KIND_COUNT],
            listeners: std::array::from_fn(|_| Vec::new()),
            total_emitted: 0,
        }
    }

    /// Suppress an event kind. Already-buffered events of that kind are
    /// dropped as well.
    pub fn suppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = true;
        self.pending.retain(|e| e.kind() != kind);
    }

    /// Suppress every event kind.
    pub fn suppress_all(&mut self) {
        for kind in EventKind::ALL {
            self.suppress(kind);
        }
    }

    /// Check if an event kind is suppressed.
    pub fn is_suppressed(&self, kind: EventKind) -> bool {
        self.suppressed[kind.index()]
    }

    /// Buffer an event. No-ops if the kind is suppressed.
    pub fn emit(&mut self, event: Event) {
        if self.suppressed[event.kind().index()] {
            return;
        }
        self.total_emitted += 1;
        self.pending.push(event);
    }

    /// Buffer a batch of events, preserving their order.
    pub fn emit_all(&mut self, events: impl IntoIterator<Item = Event>) {
        for event in events {
            self.emit(event);
        }
    }

    /// Register a passive listener for an event kind.
    pub fn on_passive(&mut self, kind: EventKind, listener: PassiveListener) {
        self.listeners[kind.index()].push(listener);
    }

    /// Deliver all buffered events to listeners in emission order, then
    /// clear the buffer.
    pub fn deliver(&mut self) {
        let events = std::mem::take(&mut self.pending);
        for event in &events {
            for listener in &mut self.listeners[event.kind().index()] {
                listener(event);
            }
        }
    }

    /// Take the buffered events without delivering them.
    pub fn drain(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.pending)
    }

    /// Events buffered since the last delivery.
    pub fn pending(&self) -> &[Event] {
        &self.pending
    }

    /// Total events accepted since creation (suppressed ones excluded).
    pub fn total_emitted(&self) -> u64 {
        self.total_emitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn moved(id: u32) -> Event {
        Event::NodeMoved {
            entity: EntityId(id),
            position: Position::new(1.0, 2.0),
        }
    }

    #[test]
    fn kinds_cover_all_indices() {
        for (i, kind) in EventKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
    }

    #[test]
    fn deliver_calls_listeners_in_order_and_clears() {
        let mut bus = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        bus.on_passive(
            EventKind::NodeMoved,
            Box::new(move |e| {
                if let Event::NodeMoved { entity, .. } = e {
                    sink.borrow_mut().push(entity.0);
                }
            }),
        );

        bus.emit(moved(1));
        bus.emit(Event::SceneCleared);
        bus.emit(moved(2));
        bus.deliver();

        assert_eq!(*seen.borrow(), vec![1, 2]);
        assert!(bus.pending().is_empty());
        assert_eq!(bus.total_emitted(), 3);
    }

    #[test]
    fn suppressed_events_are_not_buffered() {
        let mut bus = EventBus::new();
        bus.emit(moved(0));
        bus.suppress(EventKind::NodeMoved);
        assert!(bus.is_suppressed(EventKind::NodeMoved));
        assert!(bus.pending().is_empty());

        bus.emit(moved(1));
        bus.emit(Event::SceneCleared);
        assert_eq!(bus.pending(), &[Event::SceneCleared]);
    }

    #[test]
    fn suppress_all_blocks_everything() {
        let mut bus = EventBus::new();
        bus.suppress_all();
        bus.emit(Event::SceneCleared);
        bus.emit(moved(3));
        assert_eq!(bus.total_emitted(), 0);
    }

    #[test]
    fn drain_returns_without_delivering() {
        let mut bus = EventBus::new();
        let hits = Rc::new(RefCell::new(0));
        let counter = hits.clone();
        bus.on_passive(
            EventKind::SceneCleared,
            Box::new(move |_| *counter.borrow_mut() += 1),
        );
        bus.emit(Event::SceneCleared);
        let drained = bus.drain();
        assert_eq!(drained.len(), 1);
        bus.deliver();
        assert_eq!(*hits.borrow(), 0);
    }
}
