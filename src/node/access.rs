//! `NodeAccess`: what an action may do to the world.

use serde_json::Value;
use tracing::{debug, warn};

use crate::message::NO_HEADER;
use crate::network::Network;
use crate::time::{steps_to_ticks, VirtualTime};

use super::alarm::AlarmHandle;
use super::label::NeighborLabel;
use super::memory::Memory;
use super::Node;

/// Something an action asked for that the simulation carries out once
/// the action returns, in the order it was requested.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Effect {
    Send {
        to: super::NodeId,
        header: String,
        payload: Value,
    },
    AlarmSet(AlarmHandle),
    AlarmMoved(AlarmHandle),
    AlarmCancelled(AlarmHandle),
}

/// The view of one node handed to an action for the duration of a call.
///
/// Reads and writes the node's own status and memory, reads its local
/// clock, and sends messages or sets alarms. It cannot reach other nodes,
/// the network registry or the event queue.
pub struct NodeAccess<'a, S> {
    node: &'a mut Node<S>,
    network: &'a Network,
    now: VirtualTime,
    clock_rate: f64,
    next_alarm: &'a mut u64,
    effects: Vec<Effect>,
}

impl<'a, S: Copy> NodeAccess<'a, S> {
    pub(crate) fn new(
        node: &'a mut Node<S>,
        network: &'a Network,
        now: VirtualTime,
        clock_rate: f64,
        next_alarm: &'a mut u64,
    ) -> Self {
        NodeAccess {
            node,
            network,
            now,
            clock_rate,
            next_alarm,
            effects: Vec::new(),
        }
    }

    pub(crate) fn into_effects(self) -> Vec<Effect> {
        self.effects
    }

    // ── Status & memory ───────────────────────────────────────────

    pub fn status(&self) -> S {
        self.node.status()
    }

    pub fn set_status(&mut self, status: S) {
        self.node.set_status(status);
    }

    pub fn memory(&self) -> &Memory {
        self.node.memory()
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        self.node.memory_mut()
    }

    /// The node's local clock, in its own steps.
    pub fn clock(&self) -> u64 {
        self.now.local_steps(self.clock_rate)
    }

    // ── Neighborhood ──────────────────────────────────────────────

    /// Labels of the neighbors this node can send to.
    pub fn neighbors(&self) -> Vec<NeighborLabel> {
        self.network.out_labels(self.node.id())
    }

    /// Labels of the neighbors that can send to this node.
    pub fn in_neighbors(&self) -> Vec<NeighborLabel> {
        self.network.in_labels(self.node.id())
    }

    pub fn can_send_to(&self, label: NeighborLabel) -> bool {
        self.network
            .resolve(self.node.id(), label)
            .is_some_and(|to| self.network.has_edge(self.node.id(), to))
    }

    // ── Sending ───────────────────────────────────────────────────

    /// Send to one neighbor.
    ///
    /// A label that is not an out-neighbor of this node is logged and
    /// ignored; no message is created.
    pub fn send(&mut self, to: NeighborLabel, header: impl Into<String>, payload: Value) {
        let me = self.node.id();
        match self.network.resolve(me, to) {
            Some(target) if self.network.has_edge(me, target) => {
                self.effects.push(Effect::Send {
                    to: target,
                    header: header.into(),
                    payload,
                });
            }
            _ => warn!(
                node = %me,
                label = %to,
                "send to a label that is not an out-neighbor; ignored"
            ),
        }
    }

    /// Send the same message to several neighbors, in the given order.
    pub fn send_many(&mut self, to: &[NeighborLabel], header: &str, payload: &Value) {
        for &label in to {
            self.send(label, header, payload.clone());
        }
    }

    /// Send to every out-neighbor.
    pub fn send_to_all(&mut self, header: &str, payload: Value) {
        let targets = self.neighbors();
        self.send_many(&targets, header, &payload);
    }

    /// Send to every out-neighbor except `skip`.
    pub fn send_to_all_except(&mut self, skip: NeighborLabel, header: &str, payload: Value) {
        let targets: Vec<_> = self
            .neighbors()
            .into_iter()
            .filter(|&label| label != skip)
            .collect();
        self.send_many(&targets, header, &payload);
    }

    // ── Alarms ────────────────────────────────────────────────────

    /// Wake this node up after `steps` of its own clock.
    pub fn set_alarm(&mut self, steps: u64) -> AlarmHandle {
        self.set_alarm_with(steps, NO_HEADER, Value::Null)
    }

    /// Like [`set_alarm`](Self::set_alarm), carrying a header and payload.
    pub fn set_alarm_with(
        &mut self,
        steps: u64,
        header: impl Into<String>,
        payload: Value,
    ) -> AlarmHandle {
        let handle = AlarmHandle::new(*self.next_alarm);
        *self.next_alarm += 1;
        let fire_at = self
            .now
            .plus(steps_to_ticks(steps, self.clock_rate))
            .unwrap_or(VirtualTime::new(u64::MAX));
        self.node.arm(handle, self.now, fire_at, header.into(), payload);
        self.effects.push(Effect::AlarmSet(handle));
        handle
    }

    /// Cancel one of this node's alarms. Returns `false` (and does
    /// nothing) if it already fired, was cancelled, or is not ours.
    pub fn disable_alarm(&mut self, handle: AlarmHandle) -> bool {
        if self.node.cancel_alarm(handle) {
            self.effects.push(Effect::AlarmCancelled(handle));
            true
        } else {
            debug!(
                node = %self.node.id(),
                alarm = %handle,
                "disable on an inactive alarm; ignored"
            );
            false
        }
    }

    /// Cancel every pending alarm of this node.
    pub fn disable_all_alarms(&mut self) {
        for handle in self.pending_alarms() {
            self.disable_alarm(handle);
        }
    }

    /// Move an alarm by `delta` steps of this node's clock. Moving it into
    /// the past makes it go off at the next processing boundary.
    pub fn update_alarm_time(&mut self, handle: AlarmHandle, delta: i64) -> bool {
        let ticks = scale_delta(delta, self.clock_rate);
        if self.node.retime_alarm(handle, self.now, ticks) {
            self.effects.push(Effect::AlarmMoved(handle));
            true
        } else {
            debug!(node = %self.node.id(), alarm = %handle, "update on an inactive alarm; ignored");
            false
        }
    }

    /// Local steps until the alarm goes off.
    pub fn alarm_time_left(&self, handle: AlarmHandle) -> Option<u64> {
        let ticks = self.node.alarm(handle)?.ticks_left(self.now)?;
        Some((ticks as f64 / self.clock_rate).ceil() as u64)
    }

    pub fn pending_alarms(&self) -> Vec<AlarmHandle> {
        self.node.pending_alarms().map(|a| a.handle()).collect()
    }
}

/// Convert a signed number of local steps into ticks.
pub(crate) fn scale_delta(delta: i64, rate: f64) -> i64 {
    if delta == 0 {
        return 0;
    }
    let ticks = steps_to_ticks(delta.unsigned_abs(), rate).min(i64::MAX as u64) as i64;
    if delta < 0 {
        -ticks
    } else {
        ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeId;
    use serde_json::json;

    fn star_center() -> (Network, Node<u8>) {
        let mut net = Network::with_nodes(4);
        net.add_link(NodeId::new(0), NodeId::new(1)).unwrap();
        net.add_link(NodeId::new(0), NodeId::new(2)).unwrap();
        // N3 can only talk to N0, not the other way round.
        net.add_edge(NodeId::new(3), NodeId::new(0)).unwrap();
        (net, Node::new(NodeId::new(0), 0))
    }

    #[test]
    fn test_send_records_effects_in_order() {
        let (net, mut node) = star_center();
        let mut next_alarm = 0;
        let mut access = NodeAccess::new(&mut node, &net, VirtualTime::ZERO, 1.0, &mut next_alarm);

        let labels = access.neighbors();
        assert_eq!(labels.len(), 2);
        assert_eq!(access.in_neighbors().len(), 3);

        access.send_to_all_except(labels[0], "HELLO", json!(1));
        let effects = access.into_effects();
        assert_eq!(
            effects,
            vec![Effect::Send {
                to: NodeId::new(2),
                header: "HELLO".into(),
                payload: json!(1),
            }]
        );
    }

    #[test]
    fn test_send_to_in_only_neighbor_is_ignored() {
        let (net, mut node) = star_center();
        let mut next_alarm = 0;
        let mut access = NodeAccess::new(&mut node, &net, VirtualTime::ZERO, 1.0, &mut next_alarm);

        let in_only = access
            .in_neighbors()
            .into_iter()
            .find(|&l| !access.can_send_to(l))
            .unwrap();
        access.send(in_only, "X", Value::Null);
        access.send(NeighborLabel::from_port(17), "X", Value::Null);
        assert!(access.into_effects().is_empty());
    }

    #[test]
    fn test_alarm_scaled_by_clock_rate() {
        let (net, mut node) = star_center();
        let mut next_alarm = 5;
        let mut access =
            NodeAccess::new(&mut node, &net, VirtualTime::new(10), 2.0, &mut next_alarm);

        assert_eq!(access.clock(), 5);
        let h = access.set_alarm(3);
        assert_eq!(h, AlarmHandle::new(5));
        assert_eq!(access.alarm_time_left(h), Some(3));
        assert!(access.update_alarm_time(h, -1));
        assert_eq!(access.alarm_time_left(h), Some(2));
        assert!(access.disable_alarm(h));
        assert!(!access.disable_alarm(h));
        assert_eq!(access.alarm_time_left(h), None);

        let effects = access.into_effects();
        assert_eq!(
            effects,
            vec![
                Effect::AlarmSet(h),
                Effect::AlarmMoved(h),
                Effect::AlarmCancelled(h)
            ]
        );
        assert_eq!(next_alarm, 6);
        assert_eq!(node.alarm(h).map(|a| a.fire_at()), Some(VirtualTime::new(14)));
    }

    #[test]
    fn test_disable_all_alarms() {
        let (net, mut node) = star_center();
        let mut next_alarm = 0;
        let mut access = NodeAccess::new(&mut node, &net, VirtualTime::ZERO, 1.0, &mut next_alarm);
        access.set_alarm(1);
        access.set_alarm(2);
        access.disable_all_alarms();
        assert!(access.pending_alarms().is_empty());
    }

    #[test]
    fn test_scale_delta() {
        assert_eq!(scale_delta(0, 3.0), 0);
        assert_eq!(scale_delta(4, 0.5), 2);
        assert_eq!(scale_delta(-4, 2.0), -8);
    }
}
