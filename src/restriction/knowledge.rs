//! Restrictions on what nodes know before the run.
//!
//! The knowledge itself lives in node memory; the initializer can grant
//! it with [`Initializer::assign_distinct_values`] and
//! [`Initializer::share_network_size`].
//!
//! [`Initializer::assign_distinct_values`]: crate::algorithm::Initializer::assign_distinct_values
//! [`Initializer::share_network_size`]: crate::algorithm::Initializer::share_network_size

use std::collections::BTreeMap;

use super::{NetworkView, Restriction, Verdict};
use crate::algorithm::init::{NETWORK_SIZE_KEY, UNIQUE_VALUE_KEY};
use crate::algorithm::Status;

/// Every node holds a value under `unique_value`, and no two are equal.
#[derive(Debug, Clone, Copy, Default)]
pub struct InitialDistinctValues;

impl<S: Status> Restriction<S> for InitialDistinctValues {
    fn name(&self) -> &str {
        "InitialDistinctValues"
    }

    fn check(&self, view: &NetworkView<'_, S>) -> Verdict {
        let mut seen = BTreeMap::new();
        for node in view.nodes() {
            let Some(value) = node.memory().get(UNIQUE_VALUE_KEY) else {
                return Verdict::Violated(format!("{} has no '{}'", node.id(), UNIQUE_VALUE_KEY));
            };
            if let Some(other) = seen.insert(value.to_string(), node.id()) {
                return Verdict::Violated(format!(
                    "{} and {} share the value {}",
                    other,
                    node.id(),
                    value
                ));
            }
        }
        Verdict::Satisfied
    }
}

/// Every node knows how many nodes the network has.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetworkSize;

impl<S: Status> Restriction<S> for NetworkSize {
    fn name(&self) -> &str {
        "NetworkSize"
    }

    fn check(&self, view: &NetworkView<'_, S>) -> Verdict {
        let n = view.network().node_count() as u64;
        let wrong = view
            .nodes()
            .iter()
            .find(|node| node.memory().get_as::<u64>(NETWORK_SIZE_KEY) != Some(n));
        match wrong {
            None => Verdict::Satisfied,
            Some(node) => Verdict::Violated(format!(
                "{} does not know the network has {} nodes",
                node.id(),
                n
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::Initializer;
    use crate::network::ring;
    use crate::restriction::fixture::World;

    #[test]
    fn test_knowledge_granted_by_initializer() {
        let mut world = World::new(ring(4));
        assert!(!world.check(&InitialDistinctValues).is_satisfied());
        assert!(!world.check(&NetworkSize).is_satisfied());

        let mut init = Initializer::new(&mut world.nodes, &mut world.initiators);
        init.assign_distinct_values();
        init.share_network_size();

        assert!(world.check(&InitialDistinctValues).is_satisfied());
        assert!(world.check(&NetworkSize).is_satisfied());
    }

    #[test]
    fn test_duplicate_values_reported() {
        let mut world = World::new(ring(3));
        for node in world.nodes.iter_mut() {
            node.memory_mut().set(UNIQUE_VALUE_KEY, 7);
        }
        assert_eq!(
            world.check(&InitialDistinctValues),
            Verdict::Violated("N0 and N1 share the value 7".into())
        );
    }
}
