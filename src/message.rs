//! Messages and the read-only view actions get of them.

use serde_json::Value;

use crate::node::{AlarmHandle, NeighborLabel, NodeId};
use crate::time::VirtualTime;

/// Header used when a message is sent without one.
pub const NO_HEADER: &str = "NO HEADER";

/// Meta header: which family of actions a message triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum MessageKind {
    /// Sent by an action to a neighbor.
    Normal,
    /// The spontaneous impulse that wakes up an initiator.
    Initialization,
    /// An alarm going off.
    Alarm,
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MessageKind::Normal => "normal",
            MessageKind::Initialization => "initialization",
            MessageKind::Alarm => "alarm",
        };
        f.write_str(name)
    }
}

/// Unique, increasing message identifier within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct MessageId(u64);

impl MessageId {
    #[inline]
    pub fn new(raw: u64) -> Self {
        MessageId(raw)
    }

    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "M#{}", self.0)
    }
}

/// A message envelope.
///
/// Built by the simulation when something is sent and never modified
/// afterwards: the delivery time is fixed by the network behavior model
/// before the message is handed over to the event queue.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Message {
    id: MessageId,
    kind: MessageKind,
    source: Option<NodeId>,
    destination: NodeId,
    header: String,
    payload: Value,
    sent_at: VirtualTime,
    deliver_at: VirtualTime,
}

impl Message {
    pub(crate) fn new(
        id: MessageId,
        kind: MessageKind,
        source: Option<NodeId>,
        destination: NodeId,
        header: String,
        payload: Value,
        sent_at: VirtualTime,
    ) -> Self {
        Message {
            id,
            kind,
            source,
            destination,
            header,
            payload,
            sent_at,
            deliver_at: sent_at,
        }
    }

    /// Seal the envelope with its delivery time.
    pub(crate) fn deliver_at(mut self, at: VirtualTime) -> Self {
        self.deliver_at = at;
        self
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    /// Sending node; `None` for spontaneous impulses.
    pub fn source(&self) -> Option<NodeId> {
        self.source
    }

    pub fn destination(&self) -> NodeId {
        self.destination
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn sent_at(&self) -> VirtualTime {
        self.sent_at
    }

    /// When the message reaches (or would have reached) its destination.
    pub fn delivery_time(&self) -> VirtualTime {
        self.deliver_at
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.source {
            Some(source) => write!(
                f,
                "{} {} → {} '{}'",
                self.id, source, self.destination, self.header
            ),
            None => write!(f, "{} ⟳ {} '{}'", self.id, self.destination, self.header),
        }
    }
}

// ── Incoming view ─────────────────────────────────────────────────────

/// What an action sees of the message that triggered it.
///
/// The sender appears only as a [`NeighborLabel`] local to the receiving
/// node; alarm-triggered actions additionally see the alarm's handle.
#[derive(Debug, Clone, Copy)]
pub struct IncomingMessage<'a> {
    kind: MessageKind,
    header: &'a str,
    payload: &'a Value,
    source: Option<NeighborLabel>,
    sent_at: VirtualTime,
    alarm: Option<AlarmHandle>,
}

impl<'a> IncomingMessage<'a> {
    pub(crate) fn new(
        kind: MessageKind,
        header: &'a str,
        payload: &'a Value,
        source: Option<NeighborLabel>,
        sent_at: VirtualTime,
        alarm: Option<AlarmHandle>,
    ) -> Self {
        IncomingMessage {
            kind,
            header,
            payload,
            source,
            sent_at,
            alarm,
        }
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn header(&self) -> &'a str {
        self.header
    }

    pub fn payload(&self) -> &'a Value {
        self.payload
    }

    /// The neighbor that sent this message, as labelled by the receiver.
    /// `None` for spontaneous impulses and alarms.
    pub fn source(&self) -> Option<NeighborLabel> {
        self.source
    }

    pub fn sent_at(&self) -> VirtualTime {
        self.sent_at
    }

    /// The alarm that produced this event, if any.
    pub fn alarm(&self) -> Option<AlarmHandle> {
        self.alarm
    }
}
