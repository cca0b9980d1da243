//! The simulation driver.
//!
//! Owns the network, the node arena, the event queue and the RNG, and
//! runs the algorithm's actions one event at a time. The loop is purely
//! synchronous and single-threaded: with a fixed seed and behavior model
//! every run dispatches the same events in the same order.
//!
//! ```text
//!   start()  initializer ─► INI impulses ─► pre-run restrictions
//!   step()   pop (time, seq) ─► skip stale alarm ─► lookup action
//!            ─► NodeAccess ─► apply sends / alarms ─► every-step checks
//! ```

pub mod pipeline;
pub mod report;
pub mod snapshot;


use std::collections::{BTreeMap, BTreeSet};

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{json, Value};
use tracing::{debug, info, trace, warn};

use crate::algorithm::{Action, ActionTable, Initializer, NodeAlgorithm};
use crate::behavior::{DecisionContext, NetworkBehaviorModel, OrderingMode};
use crate::config::SimulationConfig;
use crate::error::{SimError, SimResult};
use crate::event::{EventId, EventType};
use crate::message::{IncomingMessage, Message, MessageId, MessageKind, NO_HEADER};
use crate::network::Network;
use crate::node::access::{scale_delta, Effect};
use crate::node::{AlarmHandle, DispatchOutcome, Memory, Node, NodeAccess, NodeId, TraceEntry};
use crate::observer::{Observer, ObserverBus, ObservedKind, SubscriptionId};
use crate::restriction::{
    Checkpoint, FiniteCommunicationDelays, LocalOrientation, NetworkView, Restriction, Verdict,
};
use crate::scheduler::Scheduler;
use crate::time::{steps_to_ticks, VirtualTime};

pub use pipeline::{NetworkAccess, NetworkAlgorithm, Pipeline, StageReport};
pub use report::{Halt, RunReport, Stats};
pub use snapshot::Snapshot;

/// A dispatched event's trace entry and the effects its action buffered.
type Dispatched = (TraceEntry, Vec<Effect>);

// ── Run state ─────────────────────────────────────────────────────────

/// Everything that changes while the simulation runs.
#[derive(Debug, Clone)]
pub(crate) struct RunState<S> {
    pub(crate) now: VirtualTime,
    scheduler: Scheduler,
    pub(crate) nodes: Vec<Node<S>>,
    rng: StdRng,
    /// Latest delivery time per (sender, receiver), for ordered delivery.
    watermarks: BTreeMap<(NodeId, NodeId), VirtualTime>,
    initiators: BTreeSet<NodeId>,
    alarm_owner: BTreeMap<AlarmHandle, NodeId>,
    next_message: u64,
    next_alarm: u64,
    in_flight: usize,
    pub(crate) stats: Stats,
    dropped: Vec<Message>,
    trace: Vec<TraceEntry>,
    pub(crate) steps: u64,
    started: bool,
    finished: bool,
    halted: Option<String>,
}

impl<S: Copy> RunState<S> {
    fn new(network: &Network, status: S, seed: u64) -> Self {
        RunState {
            now: VirtualTime::ZERO,
            scheduler: Scheduler::new(),
            nodes: network.nodes().map(|id| Node::new(id, status)).collect(),
            rng: StdRng::seed_from_u64(seed),
            watermarks: BTreeMap::new(),
            initiators: BTreeSet::new(),
            alarm_owner: BTreeMap::new(),
            next_message: 0,
            next_alarm: 0,
            in_flight: 0,
            stats: Stats::default(),
            dropped: Vec::new(),
            trace: Vec::new(),
            steps: 0,
            started: false,
            finished: false,
            halted: None,
        }
    }

    fn next_message_id(&mut self) -> MessageId {
        let id = MessageId::new(self.next_message);
        self.next_message += 1;
        id
    }

    /// `false` for queue entries left behind by a cancelled, fired or
    /// moved alarm.
    fn is_live(&self, key: (VirtualTime, EventId), payload: &EventType) -> bool {
        match payload {
            EventType::Deliver(_) => true,
            EventType::Alarm { node, alarm } => self
                .nodes
                .get(node.index())
                .and_then(|n| n.alarm(*alarm))
                .is_some_and(|a| a.is_scheduled() && a.queued == Some(key)),
        }
    }

    /// Drop stale entries from the head of the queue, so the next entry
    /// is one that will be dispatched.
    fn discard_stale(&mut self) {
        loop {
            let head = self
                .scheduler
                .pending()
                .next()
                .map(|(at, id, payload)| {
                    ((at, id), payload.target(), self.is_live((at, id), payload))
                });
            match head {
                Some((key, node, false)) => {
                    trace!(event = %key.1, %node, "stale alarm entry skipped");
                    self.scheduler.remove(key);
                }
                _ => break,
            }
        }
    }
}

// ── Simulation ────────────────────────────────────────────────────────

/// A run of algorithm `A` on one network under one behavior model.
///
/// Call [`start`](Self::start) (or just [`step`](Self::step) /
/// [`run`](Self::run), which start on demand), then drive it one event at
/// a time or until the queue drains.
pub struct Simulation<A: NodeAlgorithm> {
    algorithm: A,
    table: ActionTable<A>,
    restrictions: Vec<Box<dyn Restriction<A::Status>>>,
    network: Network,
    behavior: NetworkBehaviorModel,
    config: SimulationConfig,
    state: RunState<A::Status>,
    observers: ObserverBus,
}

impl<A: NodeAlgorithm> Simulation<A> {
    /// Build a simulation, validating the configuration, the behavior
    /// model and the algorithm's action table.
    ///
    /// The model's axioms are checked ahead of the algorithm's own
    /// restrictions.
    pub fn new(
        network: Network,
        behavior: NetworkBehaviorModel,
        algorithm: A,
        config: SimulationConfig,
    ) -> SimResult<Self> {
        config.validate()?;
        behavior.validate(&network)?;

        let mut table = ActionTable::new();
        algorithm.actions(&mut table);
        table.validate(&algorithm.initial_statuses(), &algorithm.terminal_statuses())?;

        let mut restrictions: Vec<Box<dyn Restriction<A::Status>>> =
            vec![Box::new(FiniteCommunicationDelays), Box::new(LocalOrientation)];
        restrictions.extend(algorithm.restrictions());

        let state = RunState::new(&network, algorithm.initial_status(), config.seed);
        debug!(
            algorithm = algorithm.name(),
            nodes = network.node_count(),
            edges = network.edge_count(),
            seed = config.seed,
            "simulation built"
        );

        Ok(Simulation {
            algorithm,
            table,
            restrictions,
            network,
            behavior,
            config,
            state,
            observers: ObserverBus::new(),
        })
    }

    // ── Accessors ─────────────────────────────────────────────────

    pub fn now(&self) -> VirtualTime {
        self.state.now
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn behavior(&self) -> &NetworkBehaviorModel {
        &self.behavior
    }

    pub fn algorithm(&self) -> &A {
        &self.algorithm
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn node(&self, id: NodeId) -> Option<&Node<A::Status>> {
        self.state.nodes.get(id.index())
    }

    pub fn nodes(&self) -> &[Node<A::Status>] {
        &self.state.nodes
    }

    pub fn node_status(&self, id: NodeId) -> Option<A::Status> {
        self.node(id).map(Node::status)
    }

    pub fn node_memory(&self, id: NodeId) -> Option<&Memory> {
        self.node(id).map(Node::memory)
    }

    /// Nodes that received a spontaneous impulse.
    pub fn initiators(&self) -> &BTreeSet<NodeId> {
        &self.state.initiators
    }

    pub fn stats(&self) -> Stats {
        self.state.stats
    }

    /// Every dispatched event, in dispatch order.
    pub fn trace(&self) -> &[TraceEntry] {
        &self.state.trace
    }

    /// Messages the behavior model decided to lose.
    pub fn dropped(&self) -> &[Message] {
        &self.state.dropped
    }

    /// Total events dispatched so far.
    pub fn steps(&self) -> u64 {
        self.state.steps
    }

    /// Entries in the event queue, stale alarm entries included.
    pub fn pending_events(&self) -> usize {
        self.state.scheduler.len()
    }

    /// `true` once nothing is left that would be dispatched.
    pub fn is_idle(&self) -> bool {
        self.state.started
            && !self
                .state
                .scheduler
                .pending()
                .any(|(at, id, payload)| self.state.is_live((at, id), payload))
    }

    pub fn is_started(&self) -> bool {
        self.state.started
    }

    /// Why the run was aborted, if it was.
    pub fn halt_reason(&self) -> Option<&str> {
        self.state.halted.as_deref()
    }

    // ── Observers ─────────────────────────────────────────────────

    pub fn subscribe(
        &mut self,
        kinds: &[ObservedKind],
        observer: impl Observer + 'static,
    ) -> SubscriptionId {
        self.observers.subscribe(kinds, observer)
    }

    pub fn subscribe_all(&mut self, observer: impl Observer + 'static) -> SubscriptionId {
        self.observers.subscribe_all(observer)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    // ── Run control ───────────────────────────────────────────────

    /// Run the initializer, queue the spontaneous impulses and evaluate
    /// the pre-run restrictions. Idempotent.
    pub fn start(&mut self) -> SimResult<()> {
        self.ensure_live()?;
        if self.state.started {
            return Ok(());
        }
        self.state.started = true;

        {
            let RunState { nodes, initiators, .. } = &mut self.state;
            let mut init = Initializer::new(nodes, initiators);
            self.algorithm.initialize(&mut init);
        }

        let initiators: Vec<NodeId> = self.state.initiators.iter().copied().collect();
        for &node in &initiators {
            let id = self.state.next_message_id();
            let impulse = Message::new(
                id,
                MessageKind::Initialization,
                None,
                node,
                NO_HEADER.to_owned(),
                Value::Null,
                self.state.now,
            );
            self.state
                .scheduler
                .schedule(self.state.now, EventType::Deliver(impulse));
        }

        info!(
            algorithm = self.algorithm.name(),
            initiators = initiators.len(),
            "algorithm started"
        );
        let algorithm = self.algorithm.name().to_owned();
        let node_count = self.state.nodes.len();
        self.observers
            .emit(ObservedKind::AlgorithmStarted, self.state.now, || {
                BTreeMap::from([
                    ("algorithm", json!(algorithm)),
                    ("nodes", json!(node_count)),
                    (
                        "initiators",
                        json!(initiators.iter().map(|n| n.raw()).collect::<Vec<_>>()),
                    ),
                ])
            });

        if self.config.check_restrictions {
            self.check_restrictions(Checkpoint::PreRun)?;
        }
        Ok(())
    }

    /// Dispatch the next event.
    ///
    /// Returns the trace entry of the dispatched event, or `None` once
    /// nothing is left.
    pub fn step(&mut self) -> SimResult<Option<TraceEntry>> {
        self.start()?;

        self.state.discard_stale();
        let Some(event) = self.state.scheduler.pop_next() else {
            return Ok(None);
        };

        debug_assert!(event.scheduled_at >= self.state.now, "time went backward");
        self.state.now = event.scheduled_at;
        self.state.steps += 1;

        let dispatched = match event.payload {
            EventType::Deliver(message) => self.deliver(event.id, message),
            EventType::Alarm { node, alarm } => self.fire_alarm(event.id, node, alarm),
        };
        let (entry, effects) = dispatched.map_err(|error| self.abort(error))?;
        trace!(%entry, "dispatched");
        self.state.trace.push(entry.clone());
        self.apply_effects(entry.node, effects)?;

        let (step, node) = (self.state.steps, entry.node);
        self.observers
            .emit(ObservedKind::StepCompleted, self.state.now, || {
                BTreeMap::from([("step", json!(step)), ("node", json!(node.raw()))])
            });

        if self.config.check_restrictions {
            self.check_restrictions(Checkpoint::EveryStep)?;
        }
        Ok(Some(entry))
    }

    /// Run within the configured step and time budgets.
    pub fn run(&mut self) -> SimResult<RunReport> {
        self.run_with(self.config.max_steps, self.config.max_time)
    }

    /// Dispatch at most `steps` events.
    pub fn run_steps(&mut self, steps: u64) -> SimResult<RunReport> {
        self.run_with(Some(steps), self.config.max_time)
    }

    /// Run until the queue drains, ignoring the configured budgets.
    pub fn run_until_idle(&mut self) -> SimResult<RunReport> {
        self.run_with(None, None)
    }

    fn run_with(&mut self, max_steps: Option<u64>, max_time: Option<u64>) -> SimResult<RunReport> {
        self.start()?;
        let mut steps = 0u64;
        let halt = loop {
            if max_steps.is_some_and(|max| steps >= max) {
                break Halt::StepBudget;
            }
            self.state.discard_stale();
            if let (Some(max), Some(next)) = (max_time, self.state.scheduler.peek_time()) {
                if next.ticks() > max {
                    break Halt::TimeBudget;
                }
            }
            if self.step()?.is_none() {
                break Halt::Idle;
            }
            steps += 1;
        };

        if halt == Halt::Idle && !self.state.finished {
            self.state.finished = true;
            info!(time = %self.state.now, steps = self.state.steps, "algorithm finished");
            let stats = self.state.stats;
            let total = self.state.steps;
            self.observers
                .emit(ObservedKind::AlgorithmFinished, self.state.now, || {
                    BTreeMap::from([
                        ("steps", json!(total)),
                        ("messages_sent", json!(stats.messages_sent)),
                        ("messages_dropped", json!(stats.messages_dropped)),
                    ])
                });
        }

        Ok(RunReport {
            steps,
            time: self.state.now,
            halt,
        })
    }

    /// Throw away all run state. Observers stay subscribed.
    pub fn reset(&mut self) {
        let status = self.algorithm.initial_status();
        self.state = RunState::new(&self.network, status, self.config.seed);
        debug!("simulation reset");
    }

    pub fn snapshot(&self) -> Snapshot<A::Status> {
        Snapshot {
            state: self.state.clone(),
        }
    }

    /// Continue from a snapshot taken on this simulation.
    pub fn restore(&mut self, snapshot: &Snapshot<A::Status>) -> SimResult<()> {
        if snapshot.node_count() != self.network.node_count() {
            return Err(SimError::InvalidConfig(format!(
                "snapshot has {} nodes, network has {}",
                snapshot.node_count(),
                self.network.node_count()
            )));
        }
        self.state = snapshot.state.clone();
        Ok(())
    }

    // ── Pipeline hooks ────────────────────────────────────────────

    /// Seed node memory ahead of [`start`](Self::start), so the run picks
    /// up what an earlier algorithm left behind.
    pub(crate) fn load_memories(&mut self, memories: &[Memory]) {
        for (node, memory) in self.state.nodes.iter_mut().zip(memories) {
            *node.memory_mut() = memory.clone();
        }
    }

    pub(crate) fn memories(&self) -> Vec<Memory> {
        self.state.nodes.iter().map(|n| n.memory().clone()).collect()
    }

    pub(crate) fn swap_observers(&mut self, observers: &mut ObserverBus) {
        std::mem::swap(&mut self.observers, observers);
    }

    // ── Algorithm checks ──────────────────────────────────────────

    /// Every node is in one of the algorithm's initial statuses.
    pub fn check_initialization(&self) -> SimResult<()> {
        self.check_statuses(&self.algorithm.initial_statuses(), "initial")
    }

    /// Every node is in one of the algorithm's terminal statuses.
    pub fn check_termination(&self) -> SimResult<()> {
        self.check_statuses(&self.algorithm.terminal_statuses(), "terminal")
    }

    fn check_statuses(&self, allowed: &[A::Status], what: &str) -> SimResult<()> {
        match self.state.nodes.iter().find(|n| !allowed.contains(&n.status())) {
            Some(node) => Err(SimError::AlgorithmCheck(format!(
                "{} is in {:?}, outside the {} statuses",
                node.id(),
                node.status(),
                what
            ))),
            None => Ok(()),
        }
    }

    // ── External operations ───────────────────────────────────────

    /// Send a message from `source` to each of `destinations`, as if
    /// `source` had sent it from an action.
    pub fn send(
        &mut self,
        source: NodeId,
        destinations: &[NodeId],
        header: impl Into<String>,
        payload: Value,
    ) -> SimResult<()> {
        self.ensure_live()?;
        self.ensure_node(source)?;
        for &to in destinations {
            self.ensure_node(to)?;
            if !self.network.has_edge(source, to) {
                return Err(SimError::NotANeighbor { from: source, to });
            }
        }
        let header = header.into();
        for &to in destinations {
            self.post(source, to, header.clone(), payload.clone())?;
        }
        Ok(())
    }

    /// Set an alarm on `node` going off after `steps` of its local clock.
    pub fn set_alarm(
        &mut self,
        node: NodeId,
        steps: u64,
        payload: Option<Value>,
    ) -> SimResult<AlarmHandle> {
        self.ensure_live()?;
        self.ensure_node(node)?;
        let rate = self.behavior.clock_rate(node, &self.network);
        let now = self.state.now;
        let fire_at = now
            .plus(steps_to_ticks(steps, rate))
            .ok_or(SimError::TimeOverflow)?;

        let handle = AlarmHandle::new(self.state.next_alarm);
        self.state.next_alarm += 1;
        self.state.nodes[node.index()].arm(
            handle,
            now,
            fire_at,
            NO_HEADER.to_owned(),
            payload.unwrap_or(Value::Null),
        );
        self.alarm_effect(node, Effect::AlarmSet(handle));
        Ok(handle)
    }

    /// Cancel an alarm. A no-op returning `false` if it already fired,
    /// was cancelled, or does not exist.
    pub fn disable_alarm(&mut self, handle: AlarmHandle) -> bool {
        let Some(&owner) = self.state.alarm_owner.get(&handle) else {
            return false;
        };
        if !self.state.nodes[owner.index()].cancel_alarm(handle) {
            debug!(alarm = %handle, "disable on an inactive alarm; ignored");
            return false;
        }
        self.alarm_effect(owner, Effect::AlarmCancelled(handle));
        true
    }

    /// Move an alarm by `delta` steps of its owner's clock. A fire time in
    /// the past makes it go off at the next processing boundary.
    pub fn update_alarm_time(&mut self, handle: AlarmHandle, delta: i64) -> bool {
        let Some(&owner) = self.state.alarm_owner.get(&handle) else {
            return false;
        };
        let rate = self.behavior.clock_rate(owner, &self.network);
        let ticks = scale_delta(delta, rate);
        if !self.state.nodes[owner.index()].retime_alarm(handle, self.state.now, ticks) {
            debug!(alarm = %handle, "update on an inactive alarm; ignored");
            return false;
        }
        self.alarm_effect(owner, Effect::AlarmMoved(handle));
        true
    }

    /// Local steps of the owner's clock until the alarm goes off.
    pub fn alarm_time_left(&self, handle: AlarmHandle) -> Option<u64> {
        let owner = *self.state.alarm_owner.get(&handle)?;
        let ticks = self.node(owner)?.alarm(handle)?.ticks_left(self.state.now)?;
        let rate = self.behavior.clock_rate(owner, &self.network);
        Some((ticks as f64 / rate).ceil() as u64)
    }

    // ── Dispatch ──────────────────────────────────────────────────

    fn deliver(&mut self, event_id: EventId, message: Message) -> SimResult<Dispatched> {
        let to = message.destination();
        if message.kind() == MessageKind::Normal {
            self.state.in_flight = self.state.in_flight.saturating_sub(1);
            self.state.stats.messages_delivered += 1;
            let (id, from) = (message.id(), message.source());
            self.observers
                .emit(ObservedKind::MessageDelivered, self.state.now, || {
                    BTreeMap::from([
                        ("message", json!(id.raw())),
                        ("from", json!(from.map(NodeId::raw))),
                        ("to", json!(to.raw())),
                    ])
                });
        }

        let source = message
            .source()
            .and_then(|from| self.network.label_of(to, from));
        let incoming = IncomingMessage::new(
            message.kind(),
            message.header(),
            message.payload(),
            source,
            message.sent_at(),
            None,
        );
        self.dispatch(event_id, to, &incoming)
    }

    fn fire_alarm(
        &mut self,
        event_id: EventId,
        node: NodeId,
        handle: AlarmHandle,
    ) -> SimResult<Dispatched> {
        let (header, payload, set_at) = {
            let alarm = self
                .state
                .nodes
                .get_mut(node.index())
                .and_then(|n| n.alarm_mut(handle))
                .ok_or(SimError::NodeNotFound(node))?;
            alarm.fire();
            alarm.queued = None;
            (alarm.header().to_owned(), alarm.payload().clone(), alarm.set_at())
        };

        self.state.stats.alarms_fired += 1;
        self.observers
            .emit(ObservedKind::AlarmFired, self.state.now, || {
                BTreeMap::from([("alarm", json!(handle.raw())), ("node", json!(node.raw()))])
            });

        let incoming =
            IncomingMessage::new(MessageKind::Alarm, &header, &payload, None, set_at, Some(handle));
        self.dispatch(event_id, node, &incoming)
    }

    /// Run the bound action. Its sends and alarm changes come back
    /// unapplied.
    fn dispatch(
        &mut self,
        event_id: EventId,
        to: NodeId,
        incoming: &IncomingMessage<'_>,
    ) -> SimResult<Dispatched> {
        let status = self.node_status(to).ok_or(SimError::NodeNotFound(to))?;
        let action = Action::for_kind(incoming.kind());

        let mut handler = self.table.lookup(status, action, incoming.header());
        let mut delivered = *incoming;
        if handler.is_none() && action == Action::Alarm {
            // No alarm action: the alarm arrives as an empty self-message.
            handler = self.table.lookup(status, Action::Receiving, incoming.header());
            delivered = IncomingMessage::new(
                MessageKind::Normal,
                incoming.header(),
                incoming.payload(),
                None,
                incoming.sent_at(),
                incoming.alarm(),
            );
        }

        let (outcome, effects) = match handler {
            Some(handler) => {
                let rate = self.behavior.clock_rate(to, &self.network);
                let node = &mut self.state.nodes[to.index()];
                let next_alarm = &mut self.state.next_alarm;
                let mut access =
                    NodeAccess::new(node, &self.network, self.state.now, rate, next_alarm);
                handler(&self.algorithm, &mut access, &delivered);
                let effects = access.into_effects();
                self.state.stats.actions_dispatched += 1;

                let after = self.state.nodes[to.index()].status();
                if after != status {
                    debug!(node = %to, from = ?status, to = ?after, "status changed");
                    self.observers
                        .emit(ObservedKind::StatusChanged, self.state.now, || {
                            BTreeMap::from([
                                ("node", json!(to.raw())),
                                ("from", json!(format!("{:?}", status))),
                                ("to", json!(format!("{:?}", after))),
                            ])
                        });
                }
                (DispatchOutcome::Handled, effects)
            }
            None => {
                warn!(
                    node = %to,
                    status = ?status,
                    action = ?action,
                    header = incoming.header(),
                    "no action bound; event ignored"
                );
                self.state.stats.unimplemented_actions += 1;
                let header = incoming.header();
                self.observers
                    .emit(ObservedKind::ActionNotImplemented, self.state.now, || {
                        BTreeMap::from([
                            ("node", json!(to.raw())),
                            ("status", json!(format!("{:?}", status))),
                            ("action", json!(format!("{:?}", action))),
                            ("header", json!(header)),
                        ])
                    });
                (DispatchOutcome::Unimplemented, Vec::new())
            }
        };

        let entry = TraceEntry {
            time: self.state.now,
            event_id,
            node: to,
            kind: incoming.kind(),
            header: incoming.header().to_owned(),
            outcome,
        };
        Ok((entry, effects))
    }

    fn apply_effects(&mut self, from: NodeId, effects: Vec<Effect>) -> SimResult<()> {
        for effect in effects {
            match effect {
                Effect::Send { to, header, payload } => self.post(from, to, header, payload)?,
                other => self.alarm_effect(from, other),
            }
        }
        Ok(())
    }

    /// Queue bookkeeping for an alarm whose record has already changed.
    fn alarm_effect(&mut self, node: NodeId, effect: Effect) {
        let now = self.state.now;
        match effect {
            Effect::AlarmSet(handle) => {
                self.state.alarm_owner.insert(handle, node);
                self.queue_alarm(node, handle);
                self.state.stats.alarms_set += 1;
                let fire_at = self
                    .node(node)
                    .and_then(|n| n.alarm(handle))
                    .map(|a| a.fire_at().ticks());
                self.observers.emit(ObservedKind::AlarmSet, now, || {
                    BTreeMap::from([
                        ("alarm", json!(handle.raw())),
                        ("node", json!(node.raw())),
                        ("fire_at", json!(fire_at)),
                    ])
                });
            }
            Effect::AlarmMoved(handle) => {
                self.queue_alarm(node, handle);
                trace!(alarm = %handle, "alarm moved");
            }
            Effect::AlarmCancelled(handle) => {
                self.state.stats.alarms_cancelled += 1;
                self.observers.emit(ObservedKind::AlarmCancelled, now, || {
                    BTreeMap::from([("alarm", json!(handle.raw())), ("node", json!(node.raw()))])
                });
            }
            Effect::Send { .. } => {}
        }
    }

    /// Make the queue hold exactly one entry for a scheduled alarm, at its
    /// fire time or `now`, whichever is later. An entry already at that
    /// time keeps its place among same-time peers.
    fn queue_alarm(&mut self, node: NodeId, handle: AlarmHandle) {
        let now = self.state.now;
        let RunState { nodes, scheduler, .. } = &mut self.state;
        let Some(alarm) = nodes.get_mut(node.index()).and_then(|n| n.alarm_mut(handle)) else {
            return;
        };
        if !alarm.is_scheduled() {
            if let Some(old) = alarm.queued.take() {
                scheduler.remove(old);
            }
            return;
        }
        let at = alarm.fire_at().max(now);
        let moved = match alarm.queued {
            Some((queued_at, _)) if queued_at == at => return,
            Some(old) => scheduler.reschedule(old, at),
            None => None,
        };
        let id = moved
            .unwrap_or_else(|| scheduler.schedule(at, EventType::Alarm { node, alarm: handle }));
        alarm.queued = Some((at, id));
    }

    /// Hand one message to the behavior model and queue or drop it.
    fn post(&mut self, from: NodeId, to: NodeId, header: String, payload: Value) -> SimResult<()> {
        let now = self.state.now;
        let id = self.state.next_message_id();
        let message = Message::new(id, MessageKind::Normal, Some(from), to, header, payload, now);

        let last = self.state.watermarks.get(&(from, to)).copied();
        let decision = {
            let mut ctx = DecisionContext::new(
                &self.network,
                now,
                self.state.in_flight,
                self.config.min_delay,
                last,
                &mut self.state.rng,
            );
            self.behavior.decide(&message, &mut ctx)
        };
        let decision = decision.map_err(|error| self.abort(error))?;
        let message = message.deliver_at(decision.deliver_at);

        self.state.stats.messages_sent += 1;
        let deliver_at = decision.deliver_at.ticks();
        let header = message.header();
        self.observers.emit(ObservedKind::MessageSent, now, || {
            BTreeMap::from([
                ("message", json!(id.raw())),
                ("from", json!(from.raw())),
                ("to", json!(to.raw())),
                ("header", json!(header)),
                ("deliver_at", json!(deliver_at)),
            ])
        });

        if decision.dropped {
            debug!(%message, "message dropped");
            self.state.stats.messages_dropped += 1;
            self.observers.emit(ObservedKind::MessageDropped, now, || {
                BTreeMap::from([
                    ("message", json!(id.raw())),
                    ("from", json!(from.raw())),
                    ("to", json!(to.raw())),
                ])
            });
            self.state.dropped.push(message);
            return Ok(());
        }

        if self.behavior.ordering() == OrderingMode::Ordered {
            self.state.watermarks.insert((from, to), decision.deliver_at);
        }
        self.state.in_flight += 1;
        trace!(%message, at = %decision.deliver_at, "message queued");
        self.state
            .scheduler
            .schedule(decision.deliver_at, EventType::Deliver(message));
        Ok(())
    }

    // ── Restrictions ──────────────────────────────────────────────

    /// Evaluate the restrictions declared for `checkpoint`, in order, and
    /// abort the run on the first one that fails.
    fn check_restrictions(&mut self, checkpoint: Checkpoint) -> SimResult<()> {
        let view = NetworkView {
            network: &self.network,
            behavior: &self.behavior,
            nodes: &self.state.nodes,
            initiators: &self.state.initiators,
            now: self.state.now,
            min_delay: self.config.min_delay,
        };
        let failure = self
            .restrictions
            .iter()
            .filter(|r| r.checkpoint() == checkpoint)
            .find_map(|r| match r.check(&view) {
                Verdict::Satisfied => None,
                Verdict::Violated(reason) => Some(SimError::RestrictionViolated {
                    restriction: r.name().to_owned(),
                    checkpoint,
                    reason,
                }),
                Verdict::Unresolvable(reason) => Some(SimError::UnresolvableRestriction {
                    restriction: r.name().to_owned(),
                    reason,
                }),
            });

        match failure {
            Some(error) => Err(self.abort(error)),
            None => Ok(()),
        }
    }

    fn abort(&mut self, error: SimError) -> SimError {
        warn!(time = %self.state.now, %error, "run aborted");
        if let SimError::RestrictionViolated {
            restriction,
            checkpoint,
            reason,
        } = &error
        {
            self.observers
                .emit(ObservedKind::RestrictionViolated, self.state.now, || {
                    BTreeMap::from([
                        ("restriction", json!(restriction)),
                        ("checkpoint", json!(checkpoint.to_string())),
                        ("reason", json!(reason)),
                    ])
                });
        }
        self.state.halted = Some(error.to_string());
        error
    }

    fn ensure_live(&self) -> SimResult<()> {
        match &self.state.halted {
            Some(reason) => Err(SimError::Halted(reason.clone())),
            None => Ok(()),
        }
    }

    fn ensure_node(&self, id: NodeId) -> SimResult<()> {
        if self.network.contains(id) {
            Ok(())
        } else {
            Err(SimError::NodeNotFound(id))
        }
    }
}
