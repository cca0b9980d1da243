//! Restrictions on time: delays, clocks and start.

use super::{NetworkView, Restriction, Verdict};
use crate::algorithm::Status;

/// Effective upper bound of any message delay, if one is known.
fn delay_bound<S: Copy>(view: &NetworkView<'_, S>) -> Option<u64> {
    view.behavior()
        .delay_upper_bound(view.network())
        .map(|bound| bound.max(view.min_delay()))
}

/// No message takes longer than `T` ticks.
#[derive(Debug, Clone, Copy)]
pub struct BoundedCommunicationDelays(pub u64);

impl<S: Status> Restriction<S> for BoundedCommunicationDelays {
    fn name(&self) -> &str {
        "BoundedCommunicationDelays"
    }

    fn check(&self, view: &NetworkView<'_, S>) -> Verdict {
        match delay_bound(view) {
            Some(bound) => Verdict::check(bound <= self.0, || {
                format!("delays may reach {} ticks, more than {}", bound, self.0)
            }),
            None => Verdict::Unresolvable("the delay policy has no static bound".into()),
        }
    }
}

/// Every message takes exactly one tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnitaryCommunicationDelays;

impl<S: Status> Restriction<S> for UnitaryCommunicationDelays {
    fn name(&self) -> &str {
        "UnitaryCommunicationDelays"
    }

    fn check(&self, view: &NetworkView<'_, S>) -> Verdict {
        match delay_bound(view) {
            Some(bound) => Verdict::check(bound == 1 && view.min_delay() == 1, || {
                format!("delays range up to {} ticks", bound)
            }),
            None => Verdict::Unresolvable("the delay policy has no static bound".into()),
        }
    }
}

/// All local clocks tick at the same rate.
#[derive(Debug, Clone, Copy, Default)]
pub struct SynchronizedClocks;

impl<S: Status> Restriction<S> for SynchronizedClocks {
    fn name(&self) -> &str {
        "SynchronizedClocks"
    }

    fn check(&self, view: &NetworkView<'_, S>) -> Verdict {
        let net = view.network();
        let mut rates = net.nodes().map(|id| (id, view.behavior().clock_rate(id, net)));
        let Some((_, first)) = rates.next() else {
            return Verdict::Satisfied;
        };
        match rates.find(|&(_, r)| r != first) {
            None => Verdict::Satisfied,
            Some((id, r)) => Verdict::Violated(format!("{} runs at rate {}, not {}", id, r, first)),
        }
    }
}

/// Every node is an initiator.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimultaneousStart;

impl<S: Status> Restriction<S> for SimultaneousStart {
    fn name(&self) -> &str {
        "SimultaneousStart"
    }

    fn check(&self, view: &NetworkView<'_, S>) -> Verdict {
        let missing = view
            .network()
            .nodes()
            .find(|id| !view.initiators().contains(id));
        match missing {
            None => Verdict::Satisfied,
            Some(id) => Verdict::Violated(format!("{} does not start spontaneously", id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::{ClockPolicy, DelayPolicy, NetworkBehaviorModel};
    use crate::network::ring;
    use crate::restriction::fixture::World;

    #[test]
    fn test_delay_bounds() {
        let mut world = World::new(ring(4));
        assert!(world.check(&UnitaryCommunicationDelays).is_satisfied());
        assert!(world.check(&BoundedCommunicationDelays(1)).is_satisfied());

        world.behavior = NetworkBehaviorModel::random_delay();
        assert!(!world.check(&UnitaryCommunicationDelays).is_satisfied());
        assert!(world.check(&BoundedCommunicationDelays(4)).is_satisfied());
        assert!(!world.check(&BoundedCommunicationDelays(3)).is_satisfied());

        world.behavior = NetworkBehaviorModel::ideal().with_delay(DelayPolicy::NetworkUsage);
        assert!(matches!(
            world.check(&BoundedCommunicationDelays(10)),
            Verdict::Unresolvable(_)
        ));
    }

    #[test]
    fn test_synchronized_clocks() {
        let mut world = World::new(ring(3));
        assert!(world.check(&SynchronizedClocks).is_satisfied());
        world.behavior = NetworkBehaviorModel::ideal().with_clock(ClockPolicy::Uniform(3.0));
        assert!(world.check(&SynchronizedClocks).is_satisfied());
        world.behavior =
            NetworkBehaviorModel::ideal()
                .with_clock(ClockPolicy::custom(|id, _| 1.0 + id.raw() as f64));
        assert_eq!(
            world.check(&SynchronizedClocks),
            Verdict::Violated("N1 runs at rate 2, not 1".into())
        );
    }

    #[test]
    fn test_simultaneous_start() {
        let mut world = World::new(ring(2));
        assert!(!world.check(&SimultaneousStart).is_satisfied());
        world.initiators.insert(crate::node::NodeId::new(1));
        assert!(world.check(&SimultaneousStart).is_satisfied());
    }
}
