/// Network behavior model: delay, loss, ordering and clock drift.
///
/// A [`NetworkBehaviorModel`] is an immutable bundle of four policies.
/// For each message the simulation asks it for a [`Decision`]; all
/// randomness comes from the simulation's seeded RNG, threaded in through
/// [`DecisionContext`], so a fixed seed gives a fixed sequence of
/// decisions. Presets are plain constructor functions returning values;
/// a new preset is just another value.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::Rng;

use crate::error::{SimError, SimResult};
use crate::message::Message;
use crate::network::Network;
use crate::node::NodeId;
use crate::time::VirtualTime;

pub type DelayFn = Rc<dyn Fn(&Message, &mut DecisionContext<'_>) -> u64>;
pub type LossFn = Rc<dyn Fn(&Message, &mut DecisionContext<'_>) -> bool>;
pub type ClockFn = Rc<dyn Fn(NodeId, &Network) -> f64>;

// ── Policies ──────────────────────────────────────────────────────────

/// Whether messages on one (sender, receiver) pair keep their send order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum OrderingMode {
    Ordered,
    Unordered,
}

/// How long a message travels, in ticks.
#[derive(Clone)]
pub enum DelayPolicy {
    /// No extra delay beyond the configured minimum.
    None,
    Constant(u64),
    /// As many ticks as there are nodes.
    NetworkSize,
    /// Uniform in `0..=node_count`.
    RandomUpToNetworkSize,
    /// Messages in flight divided by node count, rounded.
    NetworkUsage,
    /// Uniform in `min..=max`.
    Uniform { min: u64, max: u64 },
    Custom(DelayFn),
}

impl DelayPolicy {
    pub fn custom(f: impl Fn(&Message, &mut DecisionContext<'_>) -> u64 + 'static) -> Self {
        DelayPolicy::Custom(Rc::new(f))
    }
}

impl fmt::Debug for DelayPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DelayPolicy::None => write!(f, "None"),
            DelayPolicy::Constant(d) => write!(f, "Constant({})", d),
            DelayPolicy::NetworkSize => write!(f, "NetworkSize"),
            DelayPolicy::RandomUpToNetworkSize => write!(f, "RandomUpToNetworkSize"),
            DelayPolicy::NetworkUsage => write!(f, "NetworkUsage"),
            DelayPolicy::Uniform { min, max } => write!(f, "Uniform({}..={})", min, max),
            DelayPolicy::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// Whether a message is lost.
#[derive(Clone)]
pub enum LossPolicy {
    None,
    /// Each message is lost independently with this probability.
    Probability(f64),
    Custom(LossFn),
}

impl LossPolicy {
    pub fn custom(f: impl Fn(&Message, &mut DecisionContext<'_>) -> bool + 'static) -> Self {
        LossPolicy::Custom(Rc::new(f))
    }
}

impl fmt::Debug for LossPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LossPolicy::None => write!(f, "None"),
            LossPolicy::Probability(p) => write!(f, "Probability({})", p),
            LossPolicy::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// Simulated ticks per local step, per node.
#[derive(Clone)]
pub enum ClockPolicy {
    /// Every clock runs at rate 1.
    Synchronized,
    Uniform(f64),
    PerNode { rates: BTreeMap<NodeId, f64>, default: f64 },
    Custom(ClockFn),
}

impl ClockPolicy {
    pub fn custom(f: impl Fn(NodeId, &Network) -> f64 + 'static) -> Self {
        ClockPolicy::Custom(Rc::new(f))
    }
}

impl fmt::Debug for ClockPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClockPolicy::Synchronized => write!(f, "Synchronized"),
            ClockPolicy::Uniform(r) => write!(f, "Uniform({})", r),
            ClockPolicy::PerNode { rates, default } => f
                .debug_struct("PerNode")
                .field("rates", rates)
                .field("default", default)
                .finish(),
            ClockPolicy::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

// ── Decision ──────────────────────────────────────────────────────────

/// What a policy may look at when deciding the fate of a message.
pub struct DecisionContext<'a> {
    network: &'a Network,
    now: VirtualTime,
    in_flight: usize,
    min_delay: u64,
    last_delivery: Option<VirtualTime>,
    rng: &'a mut StdRng,
}

impl<'a> DecisionContext<'a> {
    pub(crate) fn new(
        network: &'a Network,
        now: VirtualTime,
        in_flight: usize,
        min_delay: u64,
        last_delivery: Option<VirtualTime>,
        rng: &'a mut StdRng,
    ) -> Self {
        DecisionContext {
            network,
            now,
            in_flight,
            min_delay,
            last_delivery,
            rng,
        }
    }

    pub fn network(&self) -> &Network {
        self.network
    }

    pub fn now(&self) -> VirtualTime {
        self.now
    }

    /// Messages accepted but not yet delivered.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn rng(&mut self) -> &mut StdRng {
        self.rng
    }
}

/// The outcome of running a message through the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub deliver_at: VirtualTime,
    pub dropped: bool,
}

// ── Model ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct NetworkBehaviorModel {
    ordering: OrderingMode,
    delay: DelayPolicy,
    loss: LossPolicy,
    clock: ClockPolicy,
}

impl Default for NetworkBehaviorModel {
    fn default() -> Self {
        Self::ideal()
    }
}

impl NetworkBehaviorModel {
    pub fn new(
        ordering: OrderingMode,
        delay: DelayPolicy,
        loss: LossPolicy,
        clock: ClockPolicy,
    ) -> Self {
        NetworkBehaviorModel {
            ordering,
            delay,
            loss,
            clock,
        }
    }

    // ── Presets ───────────────────────────────────────────────────

    /// Ordered, no delay, no loss, synchronized clocks.
    pub fn ideal() -> Self {
        Self::new(
            OrderingMode::Ordered,
            DelayPolicy::None,
            LossPolicy::None,
            ClockPolicy::Synchronized,
        )
    }

    pub fn unordered() -> Self {
        Self::ideal().with_ordering(OrderingMode::Unordered)
    }

    /// Delay grows with the number of messages in flight.
    pub fn throttled() -> Self {
        Self::ideal().with_delay(DelayPolicy::NetworkUsage)
    }

    pub fn unordered_throttled() -> Self {
        Self::throttled().with_ordering(OrderingMode::Unordered)
    }

    /// Random delay up to the network size.
    pub fn random_delay() -> Self {
        Self::ideal().with_delay(DelayPolicy::RandomUpToNetworkSize)
    }

    pub fn unordered_random_delay() -> Self {
        Self::random_delay().with_ordering(OrderingMode::Unordered)
    }

    /// Ideal, except every message is lost with probability `p`.
    pub fn lossy(p: f64) -> Self {
        Self::ideal().with_loss(LossPolicy::Probability(p))
    }

    pub fn unlikely_loss() -> Self {
        Self::lossy(0.1)
    }

    pub fn likely_loss() -> Self {
        Self::lossy(0.9)
    }

    // ── Builders ──────────────────────────────────────────────────

    pub fn with_ordering(mut self, ordering: OrderingMode) -> Self {
        self.ordering = ordering;
        self
    }

    pub fn with_delay(mut self, delay: DelayPolicy) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_loss(mut self, loss: LossPolicy) -> Self {
        self.loss = loss;
        self
    }

    pub fn with_clock(mut self, clock: ClockPolicy) -> Self {
        self.clock = clock;
        self
    }

    pub fn ordering(&self) -> OrderingMode {
        self.ordering
    }

    pub fn delay(&self) -> &DelayPolicy {
        &self.delay
    }

    pub fn loss(&self) -> &LossPolicy {
        &self.loss
    }

    pub fn clock(&self) -> &ClockPolicy {
        &self.clock
    }

    // ── Decisions ─────────────────────────────────────────────────

    /// Raw delay the policy assigns to `message`, before the minimum.
    pub fn delay_for(&self, message: &Message, ctx: &mut DecisionContext<'_>) -> u64 {
        let n = ctx.network.node_count() as u64;
        match &self.delay {
            DelayPolicy::None => 0,
            DelayPolicy::Constant(d) => *d,
            DelayPolicy::NetworkSize => n,
            DelayPolicy::RandomUpToNetworkSize => ctx.rng.gen_range(0..=n),
            DelayPolicy::NetworkUsage => {
                if n == 0 {
                    0
                } else {
                    (ctx.in_flight as f64 / n as f64).round() as u64
                }
            }
            DelayPolicy::Uniform { min, max } => ctx.rng.gen_range(*min..=*max),
            DelayPolicy::Custom(f) => f(message, ctx),
        }
    }

    pub fn is_lost(&self, message: &Message, ctx: &mut DecisionContext<'_>) -> bool {
        match &self.loss {
            LossPolicy::None => false,
            LossPolicy::Probability(p) => ctx.rng.gen::<f64>() < *p,
            LossPolicy::Custom(f) => f(message, ctx),
        }
    }

    /// Decide when `message` arrives and whether it is lost.
    ///
    /// The delay is never shorter than the context's minimum. In ordered
    /// mode the delivery time is also never earlier than the last delivery
    /// on the same (sender, receiver) pair.
    pub fn decide(&self, message: &Message, ctx: &mut DecisionContext<'_>) -> SimResult<Decision> {
        let delay = self.delay_for(message, ctx).max(ctx.min_delay);
        let mut deliver_at = ctx.now.plus(delay).ok_or(SimError::TimeOverflow)?;
        if self.ordering == OrderingMode::Ordered {
            if let Some(last) = ctx.last_delivery {
                deliver_at = deliver_at.max(last);
            }
        }
        let dropped = self.is_lost(message, ctx);
        Ok(Decision { deliver_at, dropped })
    }

    /// Ticks per local step for `node`.
    pub fn clock_rate(&self, node: NodeId, network: &Network) -> f64 {
        match &self.clock {
            ClockPolicy::Synchronized => 1.0,
            ClockPolicy::Uniform(r) => *r,
            ClockPolicy::PerNode { rates, default } => {
                rates.get(&node).copied().unwrap_or(*default)
            }
            ClockPolicy::Custom(f) => f(node, network),
        }
    }

    /// A static bound on the policy delay, when there is one.
    pub fn delay_upper_bound(&self, network: &Network) -> Option<u64> {
        let n = network.node_count() as u64;
        match &self.delay {
            DelayPolicy::None => Some(0),
            DelayPolicy::Constant(d) => Some(*d),
            DelayPolicy::NetworkSize | DelayPolicy::RandomUpToNetworkSize => Some(n),
            DelayPolicy::Uniform { max, .. } => Some(*max),
            DelayPolicy::NetworkUsage | DelayPolicy::Custom(_) => None,
        }
    }

    /// `Some(true)` if no message can ever be lost, `Some(false)` if some
    /// may be, `None` when a custom policy makes it unknowable.
    pub fn is_reliable(&self) -> Option<bool> {
        match &self.loss {
            LossPolicy::None => Some(true),
            LossPolicy::Probability(p) => Some(*p <= 0.0),
            LossPolicy::Custom(_) => None,
        }
    }

    /// Reject parameters no run could use. Custom clocks are evaluated
    /// for every node of `network`.
    pub fn validate(&self, network: &Network) -> SimResult<()> {
        if let LossPolicy::Probability(p) = self.loss {
            if !(0.0..=1.0).contains(&p) {
                return Err(SimError::InvalidBehaviorModel(format!(
                    "loss probability {} is outside [0, 1]",
                    p
                )));
            }
        }
        if let DelayPolicy::Uniform { min, max } = self.delay {
            if min > max {
                return Err(SimError::InvalidBehaviorModel(format!(
                    "uniform delay range {}..={} is empty",
                    min, max
                )));
            }
        }
        for node in network.nodes() {
            let rate = self.clock_rate(node, network);
            if !rate.is_finite() || rate <= 0.0 {
                return Err(SimError::InvalidBehaviorModel(format!(
                    "clock rate {} for {} must be finite and positive",
                    rate, node
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{MessageId, MessageKind};
    use crate::network::ring;
    use rand::SeedableRng;
    use serde_json::Value;

    fn msg() -> Message {
        Message::new(
            MessageId::new(0),
            MessageKind::Normal,
            Some(NodeId::new(0)),
            NodeId::new(1),
            "M".into(),
            Value::Null,
            VirtualTime::new(10),
        )
    }

    fn decide(
        model: &NetworkBehaviorModel,
        net: &Network,
        rng: &mut StdRng,
        last: Option<VirtualTime>,
    ) -> Decision {
        let mut ctx = DecisionContext::new(net, VirtualTime::new(10), 0, 1, last, rng);
        model.decide(&msg(), &mut ctx).unwrap()
    }

    #[test]
    fn test_ideal_delivers_after_min_delay() {
        let net = ring(3);
        let mut rng = StdRng::seed_from_u64(1);
        let d = decide(&NetworkBehaviorModel::ideal(), &net, &mut rng, None);
        assert_eq!(d, Decision { deliver_at: VirtualTime::new(11), dropped: false });
    }

    #[test]
    fn test_ordered_clamps_to_last_delivery() {
        let net = ring(3);
        let mut rng = StdRng::seed_from_u64(1);
        let last = Some(VirtualTime::new(40));

        let ordered = decide(&NetworkBehaviorModel::ideal(), &net, &mut rng, last);
        assert_eq!(ordered.deliver_at, VirtualTime::new(40));

        let unordered = decide(&NetworkBehaviorModel::unordered(), &net, &mut rng, last);
        assert_eq!(unordered.deliver_at, VirtualTime::new(11));
    }

    #[test]
    fn test_network_size_delay() {
        let net = ring(5);
        let mut rng = StdRng::seed_from_u64(1);
        let model = NetworkBehaviorModel::ideal().with_delay(DelayPolicy::NetworkSize);
        assert_eq!(decide(&model, &net, &mut rng, None).deliver_at, VirtualTime::new(15));
    }

    #[test]
    fn test_throttled_uses_in_flight() {
        let net = ring(4);
        let mut rng = StdRng::seed_from_u64(1);
        let mut ctx = DecisionContext::new(&net, VirtualTime::new(10), 10, 1, None, &mut rng);
        // 10 in flight over 4 nodes rounds to 3.
        let d = NetworkBehaviorModel::throttled().decide(&msg(), &mut ctx).unwrap();
        assert_eq!(d.deliver_at, VirtualTime::new(13));
    }

    #[test]
    fn test_random_delay_is_bounded_and_seeded() {
        let net = ring(6);
        let model = NetworkBehaviorModel::random_delay();
        let sample = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..50)
                .map(|_| decide(&model, &net, &mut rng, None).deliver_at.ticks())
                .collect::<Vec<_>>()
        };
        let a = sample(7);
        assert_eq!(a, sample(7));
        assert!(a.iter().all(|&t| (11..=16).contains(&t)));
        assert_eq!(model.delay_upper_bound(&net), Some(6));
    }

    #[test]
    fn test_loss_extremes() {
        let net = ring(3);
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..20 {
            assert!(decide(&NetworkBehaviorModel::lossy(1.0), &net, &mut rng, None).dropped);
            assert!(!decide(&NetworkBehaviorModel::lossy(0.0), &net, &mut rng, None).dropped);
        }
    }

    #[test]
    fn test_likely_loss_drops_most() {
        let net = ring(3);
        let mut rng = StdRng::seed_from_u64(11);
        let dropped = (0..1000)
            .filter(|_| decide(&NetworkBehaviorModel::likely_loss(), &net, &mut rng, None).dropped)
            .count();
        assert!(dropped > 800, "dropped {}", dropped);
    }

    #[test]
    fn test_custom_policies() {
        let net = ring(3);
        let mut rng = StdRng::seed_from_u64(0);
        let model = NetworkBehaviorModel::ideal()
            .with_delay(DelayPolicy::custom(|m, _| if m.header() == "M" { 7 } else { 0 }))
            .with_loss(LossPolicy::custom(|m, ctx| {
                ctx.network().has_edge(m.source().unwrap(), m.destination())
            }));
        let d = decide(&model, &net, &mut rng, None);
        assert_eq!(d.deliver_at, VirtualTime::new(17));
        assert!(d.dropped);
        assert_eq!(model.is_reliable(), None);
        assert_eq!(model.delay_upper_bound(&net), None);
    }

    #[test]
    fn test_clock_rates() {
        let net = ring(3);
        let mut rates = BTreeMap::new();
        rates.insert(NodeId::new(1), 2.5);
        let model =
            NetworkBehaviorModel::ideal().with_clock(ClockPolicy::PerNode { rates, default: 1.0 });
        assert_eq!(model.clock_rate(NodeId::new(0), &net), 1.0);
        assert_eq!(model.clock_rate(NodeId::new(1), &net), 2.5);
    }

    #[test]
    fn test_validate() {
        let net = ring(3);
        assert!(NetworkBehaviorModel::ideal().validate(&net).is_ok());
        assert!(NetworkBehaviorModel::lossy(1.5).validate(&net).is_err());
        assert!(NetworkBehaviorModel::ideal()
            .with_delay(DelayPolicy::Uniform { min: 5, max: 2 })
            .validate(&net)
            .is_err());
        let bad_clock = NetworkBehaviorModel::ideal()
            .with_clock(ClockPolicy::custom(|n, _| if n.raw() == 2 { 0.0 } else { 1.0 }));
        assert!(matches!(
            bad_clock.validate(&net),
            Err(SimError::InvalidBehaviorModel(_))
        ));
    }
}
