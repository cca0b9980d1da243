//! Restrictions on how messages travel.

use super::{NetworkView, Restriction, Verdict};
use crate::algorithm::Status;
use crate::behavior::OrderingMode;

/// Messages on one link arrive in the order they were sent.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageOrdering;

impl<S: Status> Restriction<S> for MessageOrdering {
    fn name(&self) -> &str {
        "MessageOrdering"
    }

    fn check(&self, view: &NetworkView<'_, S>) -> Verdict {
        Verdict::check(view.behavior().ordering() == OrderingMode::Ordered, || {
            "the behavior model does not keep send order".into()
        })
    }
}

/// Every node's out-neighbors are exactly its in-neighbors.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReciprocalCommunication;

impl<S: Status> Restriction<S> for ReciprocalCommunication {
    fn name(&self) -> &str {
        "ReciprocalCommunication"
    }

    fn check(&self, view: &NetworkView<'_, S>) -> Verdict {
        let net = view.network();
        let lopsided = net
            .nodes()
            .find(|&id| !net.out_neighbors(id).eq(net.in_neighbors(id)));
        match lopsided {
            None => Verdict::Satisfied,
            Some(id) => Verdict::Violated(format!("{} has different in- and out-neighbors", id)),
        }
    }
}

/// Every link can be used in both directions, and a node knows which
/// outgoing edge pairs with which incoming one.
///
/// Labels already name a neighbor rather than an edge, so the pairing is
/// given; what is checked is that each edge has its reverse.
#[derive(Debug, Clone, Copy, Default)]
pub struct BidirectionalLinks;

impl<S: Status> Restriction<S> for BidirectionalLinks {
    fn name(&self) -> &str {
        "BidirectionalLinks"
    }

    fn check(&self, view: &NetworkView<'_, S>) -> Verdict {
        match view.network().first_one_way_edge() {
            None => Verdict::Satisfied,
            Some((from, to)) => {
                Verdict::Violated(format!("edge {} -> {} has no reverse", from, to))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::NetworkBehaviorModel;
    use crate::network::{line, EdgeList, Network};
    use crate::restriction::fixture::World;

    #[test]
    fn test_message_ordering_follows_model() {
        let mut world = World::new(line(2));
        assert!(world.check(&MessageOrdering).is_satisfied());
        world.behavior = NetworkBehaviorModel::unordered();
        assert!(!world.check(&MessageOrdering).is_satisfied());
    }

    #[test]
    fn test_bidirectional_names_the_edge() {
        let t = EdgeList::new(3).link(0, 1).edge(1, 2);
        let world = World::new(Network::from_topology(&t).unwrap());
        assert_eq!(
            world.check(&BidirectionalLinks),
            Verdict::Violated("edge N1 -> N2 has no reverse".into())
        );
        assert_eq!(
            world.check(&ReciprocalCommunication),
            Verdict::Violated("N1 has different in- and out-neighbors".into())
        );
    }

    #[test]
    fn test_reciprocal_line() {
        let world = World::new(line(4));
        assert!(world.check(&BidirectionalLinks).is_satisfied());
        assert!(world.check(&ReciprocalCommunication).is_satisfied());
    }
}
