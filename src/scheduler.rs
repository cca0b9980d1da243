/// Deterministic event scheduler.
///
/// Pending events live in an ordered map keyed by
/// `(scheduled_at, event_id)`. Event IDs are strictly increasing, so the
/// key is a total order and the first entry is always the next event to
/// dispatch. Keeping the key explicit lets an entry be moved without
/// leaving a stale duplicate behind.

use std::collections::BTreeMap;

use crate::event::{Event, EventId, EventIdGen, EventType};
use crate::time::VirtualTime;

/// The core deterministic scheduler.
///
/// Owns the event queue and the ID generator. All scheduling goes through
/// this struct to ensure monotonic IDs and deterministic ordering.
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    queue: BTreeMap<(VirtualTime, EventId), EventType>,

    /// Monotonic event-ID generator.
    id_gen: EventIdGen,
}

impl Scheduler {
    /// Create a new, empty scheduler.
    pub fn new() -> Self {
        Scheduler {
            queue: BTreeMap::new(),
            id_gen: EventIdGen::new(),
        }
    }

    /// Schedule a new event at the given virtual time.
    ///
    /// Returns the `EventId` assigned to this event.
    pub fn schedule(&mut self, at: VirtualTime, payload: EventType) -> EventId {
        let id = self.id_gen.next_id();
        self.queue.insert((at, id), payload);
        id
    }

    /// Move a pending event to `at`.
    ///
    /// The old entry is removed and the event is re-inserted with a fresh
    /// ID, so it sorts after everything already queued for `at`. Returns
    /// the new ID, or `None` if no event is queued under `key`.
    pub fn reschedule(&mut self, key: (VirtualTime, EventId), at: VirtualTime) -> Option<EventId> {
        let payload = self.queue.remove(&key)?;
        Some(self.schedule(at, payload))
    }

    /// Drop a pending event. Returns `true` if it was queued.
    pub fn remove(&mut self, key: (VirtualTime, EventId)) -> bool {
        self.queue.remove(&key).is_some()
    }

    /// Pop the next event (earliest time, lowest ID).
    ///
    /// Returns `None` when the queue is empty.
    pub fn pop_next(&mut self) -> Option<Event> {
        self.queue
            .pop_first()
            .map(|((at, id), payload)| Event::new(id, at, payload))
    }

    /// Time of the next event without removing it.
    pub fn peek_time(&self) -> Option<VirtualTime> {
        self.queue.keys().next().map(|(at, _)| *at)
    }

    /// Returns `true` if the event queue is empty.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Returns the number of pending events.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Iterate over pending events in dispatch order.
    pub fn pending(&self) -> impl Iterator<Item = (VirtualTime, EventId, &EventType)> {
        self.queue.iter().map(|((at, id), payload)| (*at, *id, payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{AlarmHandle, NodeId};

    fn drain(sched: &mut Scheduler) -> Vec<Event> {
        std::iter::from_fn(|| sched.pop_next()).collect()
    }

    fn alarm(n: u64) -> EventType {
        EventType::Alarm {
            node: NodeId::new(n),
            alarm: AlarmHandle::new(n),
        }
    }

    #[test]
    fn test_fifo_at_same_time() {
        let mut sched = Scheduler::new();

        sched.schedule(VirtualTime::new(10), alarm(1));
        sched.schedule(VirtualTime::new(10), alarm(2));
        sched.schedule(VirtualTime::new(10), alarm(3));

        let e1 = sched.pop_next().unwrap();
        let e2 = sched.pop_next().unwrap();
        let e3 = sched.pop_next().unwrap();

        // Same time → ordered by ascending event ID (creation order).
        assert!(e1.id < e2.id);
        assert!(e2.id < e3.id);
        assert_eq!(e1.payload, alarm(1));
        assert_eq!(e2.payload, alarm(2));
        assert_eq!(e3.payload, alarm(3));
    }

    #[test]
    fn test_time_ordering() {
        let mut sched = Scheduler::new();

        sched.schedule(VirtualTime::new(30), alarm(1));
        sched.schedule(VirtualTime::new(10), alarm(2));
        sched.schedule(VirtualTime::new(20), alarm(3));

        assert_eq!(sched.peek_time(), Some(VirtualTime::new(10)));
        let times: Vec<_> = drain(&mut sched).iter().map(|e| e.scheduled_at).collect();
        assert_eq!(
            times,
            vec![VirtualTime::new(10), VirtualTime::new(20), VirtualTime::new(30)]
        );
    }

    #[test]
    fn test_reschedule_leaves_no_duplicate() {
        let mut sched = Scheduler::new();
        let id = sched.schedule(VirtualTime::new(50), alarm(1));
        sched.schedule(VirtualTime::new(10), alarm(2));

        let moved = sched.reschedule((VirtualTime::new(50), id), VirtualTime::new(10));
        assert!(moved.is_some());
        assert_eq!(sched.len(), 2);

        // The moved event sorts after the one already queued at T=10.
        let events = drain(&mut sched);
        assert_eq!(events[0].payload, alarm(2));
        assert_eq!(events[1].payload, alarm(1));
        assert_eq!(events[1].id, moved.unwrap());
    }

    #[test]
    fn test_reschedule_missing_key() {
        let mut sched = Scheduler::new();
        assert!(sched
            .reschedule((VirtualTime::new(1), EventId::new(9)), VirtualTime::new(2))
            .is_none());
        assert!(!sched.remove((VirtualTime::new(1), EventId::new(9))));
    }

    #[test]
    fn test_empty_scheduler() {
        let mut sched = Scheduler::new();
        assert!(sched.is_empty());
        assert_eq!(sched.len(), 0);
        assert!(sched.pop_next().is_none());
        assert!(sched.peek_time().is_none());
    }

    #[test]
    fn test_determinism_across_runs() {
        fn build_schedule() -> Vec<Event> {
            let mut sched = Scheduler::new();
            sched.schedule(VirtualTime::new(5), alarm(0));
            sched.schedule(VirtualTime::new(3), alarm(1));
            sched.schedule(VirtualTime::new(5), alarm(2));
            sched.schedule(VirtualTime::new(1), alarm(3));
            sched.schedule(VirtualTime::new(3), alarm(4));
            drain(&mut sched)
        }

        assert_eq!(build_schedule(), build_schedule());
    }
}
