//! Alarms: per-node timers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::event::EventId;
use crate::time::VirtualTime;

use super::id::NodeId;

/// Handle to an alarm, returned by `set_alarm`.
///
/// Handles are unique for the whole run and serializable, so an action
/// can park one in node memory and disable or move the alarm later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlarmHandle(u64);

impl AlarmHandle {
    #[inline]
    pub fn new(raw: u64) -> Self {
        AlarmHandle(raw)
    }

    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for AlarmHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "A#{}", self.0)
    }
}

/// Lifecycle of an alarm: `Scheduled → Fired | Cancelled`.
///
/// Both end states are final. Moving a fired or cancelled alarm is a
/// no-op; a new `set_alarm` call is needed instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum AlarmState {
    Scheduled,
    Fired,
    Cancelled,
}

/// A timer owned by a node.
///
/// The event queue only holds `(node, handle)`; the record here is the
/// source of truth, so cancelling never has to touch the queue.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Alarm {
    handle: AlarmHandle,
    owner: NodeId,
    set_at: VirtualTime,
    fire_at: VirtualTime,
    header: String,
    payload: Value,
    state: AlarmState,
    /// Key of the queue entry currently standing for this alarm.
    pub(crate) queued: Option<(VirtualTime, EventId)>,
}

impl Alarm {
    pub(crate) fn new(
        handle: AlarmHandle,
        owner: NodeId,
        set_at: VirtualTime,
        fire_at: VirtualTime,
        header: String,
        payload: Value,
    ) -> Self {
        Alarm {
            handle,
            owner,
            set_at,
            fire_at,
            header,
            payload,
            state: AlarmState::Scheduled,
            queued: None,
        }
    }

    pub fn handle(&self) -> AlarmHandle {
        self.handle
    }

    pub fn owner(&self) -> NodeId {
        self.owner
    }

    pub fn set_at(&self) -> VirtualTime {
        self.set_at
    }

    pub fn fire_at(&self) -> VirtualTime {
        self.fire_at
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn state(&self) -> AlarmState {
        self.state
    }

    pub fn is_scheduled(&self) -> bool {
        self.state == AlarmState::Scheduled
    }

    /// Ticks until the alarm goes off, or `None` once it fired or was cancelled.
    pub fn ticks_left(&self, now: VirtualTime) -> Option<u64> {
        if !self.is_scheduled() {
            return None;
        }
        Some(self.fire_at.duration_since(now).unwrap_or(0))
    }

    pub(crate) fn fire(&mut self) -> bool {
        self.transition(AlarmState::Fired)
    }

    pub(crate) fn cancel(&mut self) -> bool {
        self.transition(AlarmState::Cancelled)
    }

    fn transition(&mut self, to: AlarmState) -> bool {
        if !self.is_scheduled() {
            return false;
        }
        self.state = to;
        true
    }

    /// Move the fire time by `delta` ticks.
    ///
    /// A fire time that would land at or before `now` is pulled up to
    /// `now`, so the alarm goes off at the next processing boundary.
    pub(crate) fn retime(&mut self, now: VirtualTime, delta: i64) -> bool {
        if !self.is_scheduled() {
            return false;
        }
        let moved = self
            .fire_at
            .shifted(delta)
            .unwrap_or(VirtualTime::new(u64::MAX));
        self.fire_at = moved.max(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alarm(fire_at: u64) -> Alarm {
        Alarm::new(
            AlarmHandle::new(1),
            NodeId::new(0),
            VirtualTime::ZERO,
            VirtualTime::new(fire_at),
            "TICK".into(),
            Value::Null,
        )
    }

    #[test]
    fn test_fires_once() {
        let mut a = alarm(10);
        assert!(a.fire());
        assert!(!a.fire());
        assert!(!a.cancel());
        assert_eq!(a.state(), AlarmState::Fired);
        assert_eq!(a.ticks_left(VirtualTime::ZERO), None);
    }

    #[test]
    fn test_cancel_is_final() {
        let mut a = alarm(10);
        assert!(a.cancel());
        assert!(!a.cancel());
        assert!(!a.fire());
        assert!(!a.retime(VirtualTime::ZERO, 5));
        assert_eq!(a.fire_at(), VirtualTime::new(10));
    }

    #[test]
    fn test_retime_forward_and_back() {
        let mut a = alarm(10);
        assert!(a.retime(VirtualTime::new(2), 5));
        assert_eq!(a.fire_at(), VirtualTime::new(15));
        assert!(a.retime(VirtualTime::new(2), -3));
        assert_eq!(a.fire_at(), VirtualTime::new(12));
        assert_eq!(a.ticks_left(VirtualTime::new(2)), Some(10));
    }

    #[test]
    fn test_retime_underflow_clamps_to_now() {
        let mut a = alarm(10);
        assert!(a.retime(VirtualTime::new(4), -100));
        assert_eq!(a.fire_at(), VirtualTime::new(4));
        assert_eq!(a.ticks_left(VirtualTime::new(4)), Some(0));
    }

    #[test]
    fn test_handle_serializes_as_integer() {
        let v = serde_json::to_value(AlarmHandle::new(12)).unwrap();
        assert_eq!(v, serde_json::json!(12));
        assert_eq!(AlarmHandle::new(12).to_string(), "A#12");
    }
}
