//! Restrictions: the assumptions an algorithm makes about its world.
//!
//! A restriction is a named, side-effect-free check over a
//! [`NetworkView`]. Algorithms list the restrictions they rely on; the
//! simulation evaluates them in that order at each restriction's
//! [`Checkpoint`] and stops at the first one that fails.
//!
//! | Sub-module | Contents |
//! |---|---|
//! | [`axioms`] | always-true axioms of the model |
//! | [`topological`] | connectivity, initiators, graph shapes |
//! | [`communication`] | ordering and link reciprocity |
//! | [`reliability`] | message loss |
//! | [`knowledge`] | a-priori knowledge held in node memory |
//! | [`timing`] | delay bounds, clocks, start times |

pub mod axioms;
pub mod communication;
pub mod knowledge;
pub mod reliability;
pub mod timing;
pub mod topological;

use std::collections::BTreeSet;
use std::fmt;

use crate::algorithm::Status;
use crate::behavior::NetworkBehaviorModel;
use crate::network::Network;
use crate::node::{Memory, Node, NodeId};
use crate::time::VirtualTime;

pub use axioms::{FiniteCommunicationDelays, LocalOrientation};
pub use communication::{BidirectionalLinks, MessageOrdering, ReciprocalCommunication};
pub use knowledge::{InitialDistinctValues, NetworkSize};
pub use reliability::{GuaranteedDelivery, TotalReliability};
pub use timing::{
    BoundedCommunicationDelays, SimultaneousStart, SynchronizedClocks, UnitaryCommunicationDelays,
};
pub use topological::{
    CompleteGraph, Connectivity, CycleGraph, RingGraph, StarGraph, TreeGraph, UniqueInitiator,
};

/// When a restriction is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum Checkpoint {
    /// Once, after initialization and before the first event.
    PreRun,
    /// After every dispatched event.
    EveryStep,
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Checkpoint::PreRun => f.write_str("pre-run"),
            Checkpoint::EveryStep => f.write_str("every step"),
        }
    }
}

/// Result of a check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Satisfied,
    Violated(String),
    /// The check cannot be decided for this setup. Treated as a
    /// configuration error.
    Unresolvable(String),
}

impl Verdict {
    pub fn check(ok: bool, reason: impl FnOnce() -> String) -> Verdict {
        if ok {
            Verdict::Satisfied
        } else {
            Verdict::Violated(reason())
        }
    }

    pub fn is_satisfied(&self) -> bool {
        matches!(self, Verdict::Satisfied)
    }
}

/// A named check over the simulated world.
pub trait Restriction<S: Status> {
    fn name(&self) -> &str;

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint::PreRun
    }

    fn check(&self, view: &NetworkView<'_, S>) -> Verdict;
}

// ── View ──────────────────────────────────────────────────────────────

/// Read-only snapshot of everything a restriction may inspect.
pub struct NetworkView<'a, S> {
    pub(crate) network: &'a Network,
    pub(crate) behavior: &'a NetworkBehaviorModel,
    pub(crate) nodes: &'a [Node<S>],
    pub(crate) initiators: &'a BTreeSet<NodeId>,
    pub(crate) now: VirtualTime,
    pub(crate) min_delay: u64,
}

impl<'a, S: Copy> NetworkView<'a, S> {
    pub fn network(&self) -> &'a Network {
        self.network
    }

    pub fn behavior(&self) -> &'a NetworkBehaviorModel {
        self.behavior
    }

    pub fn nodes(&self) -> &'a [Node<S>] {
        self.nodes
    }

    pub fn status(&self, id: NodeId) -> Option<S> {
        self.nodes.get(id.index()).map(Node::status)
    }

    pub fn memory(&self, id: NodeId) -> Option<&'a Memory> {
        self.nodes.get(id.index()).map(Node::memory)
    }

    /// Nodes that received the spontaneous impulse.
    pub fn initiators(&self) -> &'a BTreeSet<NodeId> {
        self.initiators
    }

    pub fn now(&self) -> VirtualTime {
        self.now
    }

    /// Shortest transit time of any message.
    pub fn min_delay(&self) -> u64 {
        self.min_delay
    }
}

// ── Invariant ─────────────────────────────────────────────────────────

type InvariantFn<S> = Box<dyn Fn(&NetworkView<'_, S>) -> Result<(), String>>;

/// A runtime restriction: a closure re-checked after every event.
pub struct Invariant<S> {
    name: String,
    check: InvariantFn<S>,
}

impl<S: Status> Invariant<S> {
    pub fn new(
        name: impl Into<String>,
        check: impl Fn(&NetworkView<'_, S>) -> Result<(), String> + 'static,
    ) -> Self {
        Invariant {
            name: name.into(),
            check: Box::new(check),
        }
    }
}

impl<S: Status> Restriction<S> for Invariant<S> {
    fn name(&self) -> &str {
        &self.name
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint::EveryStep
    }

    fn check(&self, view: &NetworkView<'_, S>) -> Verdict {
        match (self.check)(view) {
            Ok(()) => Verdict::Satisfied,
            Err(reason) => Verdict::Violated(reason),
        }
    }
}

#[cfg(test)]
pub(crate) mod fixture {
    use super::*;

    /// Owns what a [`NetworkView`] borrows.
    pub(crate) struct World {
        pub network: Network,
        pub behavior: NetworkBehaviorModel,
        pub nodes: Vec<Node<u8>>,
        pub initiators: BTreeSet<NodeId>,
    }

    impl World {
        pub fn new(network: Network) -> Self {
            let nodes = network.nodes().map(|id| Node::new(id, 0)).collect();
            World {
                network,
                behavior: NetworkBehaviorModel::ideal(),
                nodes,
                initiators: BTreeSet::from([NodeId::new(0)]),
            }
        }

        pub fn check(&self, restriction: &dyn Restriction<u8>) -> Verdict {
            let view = NetworkView {
                network: &self.network,
                behavior: &self.behavior,
                nodes: &self.nodes,
                initiators: &self.initiators,
                now: VirtualTime::ZERO,
                min_delay: 1,
            };
            restriction.check(&view)
        }
    }

    impl Status for u8 {
        fn all() -> &'static [Self] {
            &[0, 1, 2]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixture::World;
    use super::*;
    use crate::network::ring;

    #[test]
    fn test_invariant_reports_reason() {
        let mut world = World::new(ring(3));
        let at_most_one_done = Invariant::new("at most one 2", |view: &NetworkView<'_, u8>| {
            let done = view.nodes().iter().filter(|n| n.status() == 2).count();
            if done <= 1 {
                Ok(())
            } else {
                Err(format!("{} nodes in status 2", done))
            }
        });
        assert_eq!(Restriction::<u8>::checkpoint(&at_most_one_done), Checkpoint::EveryStep);
        assert!(world.check(&at_most_one_done).is_satisfied());

        world.nodes[0].set_status(2);
        world.nodes[1].set_status(2);
        assert_eq!(
            world.check(&at_most_one_done),
            Verdict::Violated("2 nodes in status 2".into())
        );
    }

    #[test]
    fn test_verdict_check() {
        assert_eq!(Verdict::check(true, || unreachable!()), Verdict::Satisfied);
        assert_eq!(Verdict::check(false, || "no".into()), Verdict::Violated("no".into()));
        assert_eq!(Checkpoint::PreRun.to_string(), "pre-run");
    }
}
