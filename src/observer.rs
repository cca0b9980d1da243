//! Observer bus: how the outside world watches a run.
//!
//! The simulation publishes a fixed vocabulary of [`ObservedKind`]s,
//! each with a small JSON payload map. Subscribers receive events
//! synchronously, by shared reference, right after the state change they
//! describe; they have no way back into the simulation.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::time::VirtualTime;

// ── Vocabulary ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum ObservedKind {
    MessageSent,
    MessageDelivered,
    MessageDropped,
    AlarmSet,
    AlarmFired,
    AlarmCancelled,
    StatusChanged,
    RestrictionViolated,
    StepCompleted,
    ActionNotImplemented,
    AlgorithmStarted,
    AlgorithmFinished,
}

impl ObservedKind {
    pub const ALL: [ObservedKind; 12] = [
        ObservedKind::MessageSent,
        ObservedKind::MessageDelivered,
        ObservedKind::MessageDropped,
        ObservedKind::AlarmSet,
        ObservedKind::AlarmFired,
        ObservedKind::AlarmCancelled,
        ObservedKind::StatusChanged,
        ObservedKind::RestrictionViolated,
        ObservedKind::StepCompleted,
        ObservedKind::ActionNotImplemented,
        ObservedKind::AlgorithmStarted,
        ObservedKind::AlgorithmFinished,
    ];

    /// Stable snake_case name, for subscribing by name.
    pub fn name(self) -> &'static str {
        match self {
            ObservedKind::MessageSent => "message_sent",
            ObservedKind::MessageDelivered => "message_delivered",
            ObservedKind::MessageDropped => "message_dropped",
            ObservedKind::AlarmSet => "alarm_set",
            ObservedKind::AlarmFired => "alarm_fired",
            ObservedKind::AlarmCancelled => "alarm_cancelled",
            ObservedKind::StatusChanged => "status_changed",
            ObservedKind::RestrictionViolated => "restriction_violated",
            ObservedKind::StepCompleted => "step_completed",
            ObservedKind::ActionNotImplemented => "action_not_implemented",
            ObservedKind::AlgorithmStarted => "algorithm_started",
            ObservedKind::AlgorithmFinished => "algorithm_finished",
        }
    }

    pub fn from_name(name: &str) -> Option<ObservedKind> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

impl fmt::Display for ObservedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub type Payload = BTreeMap<&'static str, Value>;

/// One published notification.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservedEvent {
    pub kind: ObservedKind,
    pub time: VirtualTime,
    pub payload: Payload,
}

// ── Observer ──────────────────────────────────────────────────────────

/// A subscriber.
pub trait Observer {
    fn notify(&mut self, event: &ObservedEvent);
}

/// Closures are observers, handy for tests and one-off probes.
impl<F> Observer for F
where
    F: FnMut(&ObservedEvent),
{
    fn notify(&mut self, event: &ObservedEvent) {
        (self)(event);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

struct Subscriber {
    id: SubscriptionId,
    /// `None` means every kind.
    kinds: Option<BTreeSet<ObservedKind>>,
    observer: Box<dyn Observer>,
}

impl Subscriber {
    fn wants(&self, kind: ObservedKind) -> bool {
        self.kinds.as_ref().map_or(true, |k| k.contains(&kind))
    }
}

/// The list of subscribers a simulation publishes to.
#[derive(Default)]
pub struct ObserverBus {
    subscribers: Vec<Subscriber>,
    next_id: u64,
}

impl ObserverBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to the given kinds only.
    pub fn subscribe(
        &mut self,
        kinds: &[ObservedKind],
        observer: impl Observer + 'static,
    ) -> SubscriptionId {
        self.add(Some(kinds.iter().copied().collect()), Box::new(observer))
    }

    /// Subscribe to everything.
    pub fn subscribe_all(&mut self, observer: impl Observer + 'static) -> SubscriptionId {
        self.add(None, Box::new(observer))
    }

    fn add(
        &mut self,
        kinds: Option<BTreeSet<ObservedKind>>,
        observer: Box<dyn Observer>,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push(Subscriber { id, kinds, observer });
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);
        self.subscribers.len() != before
    }

    pub fn wants(&self, kind: ObservedKind) -> bool {
        self.subscribers.iter().any(|s| s.wants(kind))
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Publish an event. The payload is only built if someone listens.
    pub fn emit(
        &mut self,
        kind: ObservedKind,
        time: VirtualTime,
        payload: impl FnOnce() -> Payload,
    ) {
        if !self.wants(kind) {
            return;
        }
        let event = ObservedEvent {
            kind,
            time,
            payload: payload(),
        };
        for subscriber in self.subscribers.iter_mut().filter(|s| s.wants(kind)) {
            subscriber.observer.notify(&event);
        }
    }
}

impl fmt::Debug for ObserverBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverBus")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

// ── Built-in observers ────────────────────────────────────────────────

/// Keeps every event it sees. Clones share the same log, so keep one
/// clone and subscribe the other.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    events: Rc<RefCell<Vec<ObservedEvent>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ObservedEvent> {
        self.events.borrow().clone()
    }

    pub fn of_kind(&self, kind: ObservedKind) -> Vec<ObservedEvent> {
        self.events
            .borrow()
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl Observer for Recorder {
    fn notify(&mut self, event: &ObservedEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

/// Counts events per kind. Clones share the same counters.
#[derive(Debug, Clone, Default)]
pub struct Counter {
    counts: Rc<RefCell<BTreeMap<ObservedKind, u64>>>,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: ObservedKind) -> u64 {
        self.counts.borrow().get(&kind).copied().unwrap_or(0)
    }

    pub fn snapshot(&self) -> BTreeMap<ObservedKind, u64> {
        self.counts.borrow().clone()
    }
}

impl Observer for Counter {
    fn notify(&mut self, event: &ObservedEvent) {
        *self.counts.borrow_mut().entry(event.kind).or_insert(0) += 1;
    }
}

/// Turns observed events into `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn notify(&mut self, event: &ObservedEvent) {
        let payload = serde_json::to_string(&event.payload).unwrap_or_default();
        match event.kind {
            ObservedKind::RestrictionViolated => {
                warn!(kind = %event.kind, time = %event.time, %payload, "observed")
            }
            ObservedKind::AlgorithmStarted | ObservedKind::AlgorithmFinished => {
                info!(kind = %event.kind, time = %event.time, %payload, "observed")
            }
            _ => debug!(kind = %event.kind, time = %event.time, %payload, "observed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(n: u64) -> Payload {
        BTreeMap::from([("n", json!(n))])
    }

    #[test]
    fn test_filtered_subscription() {
        let mut bus = ObserverBus::new();
        let sent = Recorder::new();
        let all = Recorder::new();
        bus.subscribe(&[ObservedKind::MessageSent], sent.clone());
        bus.subscribe_all(all.clone());

        bus.emit(ObservedKind::MessageSent, VirtualTime::ZERO, || payload(1));
        bus.emit(ObservedKind::AlarmSet, VirtualTime::new(2), || payload(2));

        assert_eq!(sent.len(), 1);
        assert_eq!(all.len(), 2);
        assert_eq!(all.of_kind(ObservedKind::AlarmSet)[0].payload["n"], 2);
    }

    #[test]
    fn test_payload_not_built_without_listeners() {
        let mut bus = ObserverBus::new();
        bus.subscribe(&[ObservedKind::AlarmFired], |_: &ObservedEvent| {});
        bus.emit(ObservedKind::MessageSent, VirtualTime::ZERO, || {
            panic!("payload built for an unwatched kind")
        });
    }

    #[test]
    fn test_unsubscribe() {
        let mut bus = ObserverBus::new();
        let counter = Counter::new();
        let id = bus.subscribe_all(counter.clone());
        bus.emit(ObservedKind::StepCompleted, VirtualTime::ZERO, Payload::new);
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.emit(ObservedKind::StepCompleted, VirtualTime::ZERO, Payload::new);
        assert_eq!(counter.get(ObservedKind::StepCompleted), 1);
        assert!(bus.is_empty());
    }

    #[test]
    fn test_kind_names_round_trip() {
        for kind in ObservedKind::ALL {
            assert_eq!(ObservedKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ObservedKind::from_name("nope"), None);
    }
}
