//! TraceEntry: records every event dispatched to a node.

use crate::event::EventId;
use crate::message::MessageKind;
use crate::time::VirtualTime;

use super::id::NodeId;

/// What the dispatcher did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum DispatchOutcome {
    /// A bound action (or a default) ran.
    Handled,
    /// No action matched; the node was left untouched.
    Unimplemented,
}

/// A record of a single event dispatched to a node.
///
/// The simulation appends one entry per dispatch. Two runs with the same
/// seed and configuration produce identical traces, which is what replay
/// checks compare.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct TraceEntry {
    /// Virtual time at which the event was dispatched.
    pub time: VirtualTime,
    /// The scheduler's unique ID for this event.
    pub event_id: EventId,
    /// The node that received the event.
    pub node: NodeId,
    pub kind: MessageKind,
    pub header: String,
    pub outcome: DispatchOutcome,
}

impl std::fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[T={} E=#{} N={}] {} '{}'",
            self.time.ticks(),
            self.event_id.raw(),
            self.node,
            self.kind,
            self.header,
        )?;
        if self.outcome == DispatchOutcome::Unimplemented {
            write!(f, " (unimplemented)")?;
        }
        Ok(())
    }
}
