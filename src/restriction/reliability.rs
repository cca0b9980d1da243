//! Restrictions on faults.
//!
//! The engine models no node or link failures, so reliability comes down
//! to the loss policy of the behavior model. A custom loss policy cannot
//! be inspected and makes these checks unresolvable.

use super::{NetworkView, Restriction, Verdict};
use crate::algorithm::Status;

fn no_loss<S: Copy>(view: &NetworkView<'_, S>) -> Verdict {
    match view.behavior().is_reliable() {
        Some(true) => Verdict::Satisfied,
        Some(false) => Verdict::Violated("the behavior model may lose messages".into()),
        None => Verdict::Unresolvable("a custom loss policy cannot be inspected".into()),
    }
}

/// No failure has happened and none will.
#[derive(Debug, Clone, Copy, Default)]
pub struct TotalReliability;

impl<S: Status> Restriction<S> for TotalReliability {
    fn name(&self) -> &str {
        "TotalReliability"
    }

    fn check(&self, view: &NetworkView<'_, S>) -> Verdict {
        no_loss(view)
    }
}

/// Every message sent is received, uncorrupted.
#[derive(Debug, Clone, Copy, Default)]
pub struct GuaranteedDelivery;

impl<S: Status> Restriction<S> for GuaranteedDelivery {
    fn name(&self) -> &str {
        "GuaranteedDelivery"
    }

    fn check(&self, view: &NetworkView<'_, S>) -> Verdict {
        no_loss(view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::{LossPolicy, NetworkBehaviorModel};
    use crate::network::ring;
    use crate::restriction::fixture::World;

    #[test]
    fn test_follows_loss_policy() {
        let mut world = World::new(ring(3));
        assert!(world.check(&TotalReliability).is_satisfied());

        world.behavior = NetworkBehaviorModel::lossy(0.0);
        assert!(world.check(&GuaranteedDelivery).is_satisfied());

        world.behavior = NetworkBehaviorModel::unlikely_loss();
        assert!(matches!(world.check(&TotalReliability), Verdict::Violated(_)));

        world.behavior = NetworkBehaviorModel::ideal().with_loss(LossPolicy::custom(|_, _| false));
        assert!(matches!(world.check(&GuaranteedDelivery), Verdict::Unresolvable(_)));
    }
}
