//! Restrictions on the shape of the communication graph.
//!
//! Shape checks look at the underlying undirected graph and do not
//! imply connectivity unless the shape itself does; pair them with
//! [`Connectivity`] when it matters.

use super::{NetworkView, Restriction, Verdict};
use crate::algorithm::Status;
use crate::network::Network;

/// The graph is strongly connected.
#[derive(Debug, Clone, Copy, Default)]
pub struct Connectivity;

impl<S: Status> Restriction<S> for Connectivity {
    fn name(&self) -> &str {
        "Connectivity"
    }

    fn check(&self, view: &NetworkView<'_, S>) -> Verdict {
        Verdict::check(view.network().is_strongly_connected(), || {
            "the network is not strongly connected".into()
        })
    }
}

/// Exactly one node receives the spontaneous impulse.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniqueInitiator;

impl<S: Status> Restriction<S> for UniqueInitiator {
    fn name(&self) -> &str {
        "UniqueInitiator"
    }

    fn check(&self, view: &NetworkView<'_, S>) -> Verdict {
        let count = view.initiators().len();
        Verdict::check(count == 1, || format!("found {} initiators", count))
    }
}

/// Every node has an edge to every other node.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompleteGraph;

impl<S: Status> Restriction<S> for CompleteGraph {
    fn name(&self) -> &str {
        "CompleteGraph"
    }

    fn check(&self, view: &NetworkView<'_, S>) -> Verdict {
        let net = view.network();
        let others = net.node_count().saturating_sub(1);
        let short = net.nodes().find(|&id| net.out_neighbors(id).count() != others);
        Verdict::check(short.is_none(), || {
            format!(
                "{} does not reach every other node",
                short.map(|id| id.to_string()).unwrap_or_default()
            )
        })
    }
}

/// The graph is a single cycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct CycleGraph;

/// Another name for [`CycleGraph`].
pub use self::CycleGraph as RingGraph;

impl<S: Status> Restriction<S> for CycleGraph {
    fn name(&self) -> &str {
        "CycleGraph"
    }

    fn check(&self, view: &NetworkView<'_, S>) -> Verdict {
        let net = view.network();
        if let Some(id) = net.nodes().find(|&id| net.adjacent(id).len() != 2) {
            return Verdict::Violated(format!("{} has {} neighbors", id, net.adjacent(id).len()));
        }
        Verdict::check(net.is_weakly_connected(), || {
            "the network has more than one component".into()
        })
    }
}

/// The graph is a tree: connected with exactly `n - 1` links.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeGraph;

impl<S: Status> Restriction<S> for TreeGraph {
    fn name(&self) -> &str {
        "TreeGraph"
    }

    fn check(&self, view: &NetworkView<'_, S>) -> Verdict {
        let net = view.network();
        Verdict::check(is_tree(net), || {
            format!("{} nodes and {} links do not form a tree", net.node_count(), net.link_count())
        })
    }
}

fn is_tree(net: &Network) -> bool {
    net.node_count() > 0 && net.link_count() == net.node_count() - 1 && net.is_weakly_connected()
}

/// One center adjacent to every other node, every other node adjacent to
/// the center only. Networks of one or two nodes are stars.
#[derive(Debug, Clone, Copy, Default)]
pub struct StarGraph;

impl<S: Status> Restriction<S> for StarGraph {
    fn name(&self) -> &str {
        "StarGraph"
    }

    fn check(&self, view: &NetworkView<'_, S>) -> Verdict {
        let net = view.network();
        let n = net.node_count();
        if n <= 2 {
            return Verdict::Satisfied;
        }
        let centers = net.nodes().filter(|&id| net.adjacent(id).len() == n - 1).count();
        let leaves = net.nodes().filter(|&id| net.adjacent(id).len() == 1).count();
        Verdict::check(centers == 1 && leaves == n - 1, || {
            format!("{} centers and {} leaves", centers, leaves)
        })
    }
}
