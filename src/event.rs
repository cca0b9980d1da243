/// Event records for the simulation kernel.
///
/// Every pending effect is an `Event`: either a message on its way to a
/// node or an alarm waiting to go off. Events are placed on the
/// scheduler's queue and dispatched in `(scheduled_at, id)` order.

use crate::message::Message;
use crate::node::{AlarmHandle, NodeId};
use crate::time::VirtualTime;

// ── Event ID ──────────────────────────────────────────────────────────

/// A unique, strictly-increasing event identifier.
///
/// Two events scheduled for the same `VirtualTime` are ordered by their
/// `EventId`, which is the order in which they were enqueued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct EventId(u64);

impl EventId {
    /// Wrap a raw u64 into an `EventId`.
    #[inline]
    pub fn new(raw: u64) -> Self {
        EventId(raw)
    }

    /// Return the raw value.
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "E#{}", self.0)
    }
}

// ── Event ID Generator ───────────────────────────────────────────────

/// Deterministic event-ID generator. Each scheduler owns exactly one.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct EventIdGen {
    next: u64,
}

impl EventIdGen {
    /// Create a generator starting at 0.
    pub fn new() -> Self {
        EventIdGen { next: 0 }
    }

    /// Mint the next event ID.
    pub fn next_id(&mut self) -> EventId {
        let id = EventId(self.next);
        self.next += 1;
        id
    }
}

// ── Event Type ────────────────────────────────────────────────────────

/// What happens when an event is popped.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum EventType {
    /// A message reaches its destination node.
    Deliver(Message),

    /// An alarm owned by `node` is due.
    ///
    /// The queue only refers to the alarm; whether it is still armed is
    /// decided by the owning node when the event is popped.
    Alarm { node: NodeId, alarm: AlarmHandle },
}

impl EventType {
    /// The node this event will be dispatched to.
    pub fn target(&self) -> NodeId {
        match self {
            EventType::Deliver(message) => message.destination(),
            EventType::Alarm { node, .. } => *node,
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventType::Deliver(message) => write!(f, "Deliver({})", message),
            EventType::Alarm { node, alarm } => write!(f, "Alarm({}, {})", node, alarm),
        }
    }
}

// ── Event ─────────────────────────────────────────────────────────────

/// A single popped simulation event.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Event {
    /// Unique identifier (monotonically increasing).
    pub id: EventId,

    /// The virtual time at which this event is dispatched.
    pub scheduled_at: VirtualTime,

    /// The event payload.
    pub payload: EventType,
}

impl Event {
    /// Convenience constructor.
    pub fn new(id: EventId, scheduled_at: VirtualTime, payload: EventType) -> Self {
        Event {
            id,
            scheduled_at,
            payload,
        }
    }

    /// The queue key of this event.
    #[inline]
    pub fn key(&self) -> (VirtualTime, EventId) {
        (self.scheduled_at, self.id)
    }
}
