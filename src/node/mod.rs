//! Nodes and the restricted views algorithms get of them.
//!
//! A node holds its status, private memory and alarms. Algorithms never
//! touch a [`Node`] directly: during an action they get a [`NodeAccess`]
//! scoped to the node being dispatched to, and they see neighbors only
//! through [`NeighborLabel`]s.
//!
//! # Module structure
//!
//! | Sub-module | Contents |
//! |---|---|
//! | [`id`] | [`NodeId`] newtype |
//! | [`label`] | [`NeighborLabel`] |
//! | [`memory`] | [`Memory`] key/value store |
//! | [`alarm`] | [`Alarm`], [`AlarmHandle`], [`AlarmState`] |
//! | [`access`] | [`NodeAccess`] view |
//! | [`trace`] | [`TraceEntry`] struct |

pub mod access;
pub mod alarm;
pub mod id;
pub mod label;
pub mod memory;
pub mod trace;

use std::collections::BTreeMap;

use serde_json::Value;

use crate::time::VirtualTime;

pub use access::NodeAccess;
pub use alarm::{Alarm, AlarmHandle, AlarmState};
pub use id::NodeId;
pub use label::NeighborLabel;
pub use memory::Memory;
pub use trace::{DispatchOutcome, TraceEntry};

/// Engine-side state of one node.
#[derive(Debug, Clone, PartialEq)]
pub struct Node<S> {
    id: NodeId,
    status: S,
    memory: Memory,
    alarms: BTreeMap<AlarmHandle, Alarm>,
}

impl<S: Copy> Node<S> {
    pub(crate) fn new(id: NodeId, status: S) -> Self {
        Node {
            id,
            status,
            memory: Memory::new(),
            alarms: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn status(&self) -> S {
        self.status
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Every alarm this node ever set, fired and cancelled ones included.
    pub fn alarms(&self) -> impl Iterator<Item = &Alarm> {
        self.alarms.values()
    }

    /// Alarms that have not gone off yet.
    pub fn pending_alarms(&self) -> impl Iterator<Item = &Alarm> {
        self.alarms.values().filter(|a| a.is_scheduled())
    }

    pub fn alarm(&self, handle: AlarmHandle) -> Option<&Alarm> {
        self.alarms.get(&handle)
    }

    pub(crate) fn set_status(&mut self, status: S) {
        self.status = status;
    }

    pub(crate) fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    pub(crate) fn alarm_mut(&mut self, handle: AlarmHandle) -> Option<&mut Alarm> {
        self.alarms.get_mut(&handle)
    }

    pub(crate) fn arm(
        &mut self,
        handle: AlarmHandle,
        now: VirtualTime,
        fire_at: VirtualTime,
        header: String,
        payload: Value,
    ) {
        let alarm = Alarm::new(handle, self.id, now, fire_at, header, payload);
        self.alarms.insert(handle, alarm);
    }

    pub(crate) fn cancel_alarm(&mut self, handle: AlarmHandle) -> bool {
        self.alarms.get_mut(&handle).is_some_and(Alarm::cancel)
    }

    pub(crate) fn retime_alarm(
        &mut self,
        handle: AlarmHandle,
        now: VirtualTime,
        delta: i64,
    ) -> bool {
        self.alarms
            .get_mut(&handle)
            .is_some_and(|a| a.retime(now, delta))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alarm_bookkeeping() {
        let mut node = Node::new(NodeId::new(0), 'a');
        let h = AlarmHandle::new(0);
        node.arm(h, VirtualTime::ZERO, VirtualTime::new(5), "T".into(), Value::Null);
        assert_eq!(node.pending_alarms().count(), 1);

        assert!(node.cancel_alarm(h));
        assert!(!node.cancel_alarm(h));
        assert!(!node.retime_alarm(h, VirtualTime::ZERO, 3));
        assert_eq!(node.pending_alarms().count(), 0);
        assert_eq!(node.alarms().count(), 1);
        assert_eq!(node.alarm(h).map(Alarm::state), Some(AlarmState::Cancelled));

        // Unknown handles are ignored.
        assert!(!node.cancel_alarm(AlarmHandle::new(9)));
    }
}
