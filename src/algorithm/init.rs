//! Run initialization.

use std::collections::BTreeSet;

use serde_json::json;

use crate::node::{Memory, Node, NodeId};

/// Memory key written by [`Initializer::assign_distinct_values`].
pub const UNIQUE_VALUE_KEY: &str = "unique_value";

/// Memory key written by [`Initializer::share_network_size`].
pub const NETWORK_SIZE_KEY: &str = "network_node_count";

/// Setup-time view of every node.
///
/// Handed to [`NodeAlgorithm::initialize`](super::NodeAlgorithm::initialize)
/// once, before any event is dispatched. Unlike an action it sees the
/// whole network: it assigns starting statuses and memory and chooses
/// which nodes receive the spontaneous impulse.
pub struct Initializer<'a, S> {
    nodes: &'a mut [Node<S>],
    initiators: &'a mut BTreeSet<NodeId>,
}

impl<'a, S: Copy> Initializer<'a, S> {
    pub(crate) fn new(nodes: &'a mut [Node<S>], initiators: &'a mut BTreeSet<NodeId>) -> Self {
        Initializer { nodes, initiators }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len() as u64).map(NodeId::new)
    }

    pub fn status(&self, id: NodeId) -> Option<S> {
        self.nodes.get(id.index()).map(Node::status)
    }

    /// Returns `false` for an unknown node.
    pub fn set_status(&mut self, id: NodeId, status: S) -> bool {
        match self.nodes.get_mut(id.index()) {
            Some(node) => {
                node.set_status(status);
                true
            }
            None => false,
        }
    }

    pub fn set_all(&mut self, status: S) {
        for node in self.nodes.iter_mut() {
            node.set_status(status);
        }
    }

    pub fn memory_mut(&mut self, id: NodeId) -> Option<&mut Memory> {
        self.nodes.get_mut(id.index()).map(Node::memory_mut)
    }

    /// Schedule a spontaneous impulse for `id` at the start of the run.
    /// Returns `false` for an unknown node.
    pub fn mark_initiator(&mut self, id: NodeId) -> bool {
        if id.index() >= self.nodes.len() {
            return false;
        }
        self.initiators.insert(id);
        true
    }

    pub fn initiators(&self) -> &BTreeSet<NodeId> {
        &*self.initiators
    }

    /// Give every node a distinct integer under [`UNIQUE_VALUE_KEY`].
    pub fn assign_distinct_values(&mut self) {
        for (i, node) in self.nodes.iter_mut().enumerate() {
            node.memory_mut().set(UNIQUE_VALUE_KEY, json!(i));
        }
    }

    /// Tell every node how many nodes there are, under [`NETWORK_SIZE_KEY`].
    pub fn share_network_size(&mut self) {
        let n = self.nodes.len();
        for node in self.nodes.iter_mut() {
            node.memory_mut().set(NETWORK_SIZE_KEY, json!(n));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nodes(n: u64) -> Vec<Node<u8>> {
        (0..n).map(|i| Node::new(NodeId::new(i), 0)).collect()
    }

    #[test]
    fn test_statuses_and_initiators() {
        let mut nodes = nodes(3);
        let mut initiators = BTreeSet::new();
        let mut init = Initializer::new(&mut nodes, &mut initiators);

        init.set_all(1);
        assert!(init.set_status(NodeId::new(2), 9));
        assert!(!init.set_status(NodeId::new(7), 9));
        assert!(init.mark_initiator(NodeId::new(1)));
        assert!(!init.mark_initiator(NodeId::new(3)));
        assert_eq!(init.status(NodeId::new(2)), Some(9));
        assert_eq!(init.node_count(), 3);

        assert_eq!(nodes.iter().map(|n| n.status()).collect::<Vec<_>>(), vec![1, 1, 9]);
        assert_eq!(initiators.into_iter().collect::<Vec<_>>(), vec![NodeId::new(1)]);
    }

    #[test]
    fn test_knowledge_helpers() {
        let mut nodes = nodes(3);
        let mut initiators = BTreeSet::new();
        let mut init = Initializer::new(&mut nodes, &mut initiators);
        init.assign_distinct_values();
        init.share_network_size();
        if let Some(memory) = init.memory_mut(NodeId::new(0)) {
            memory.set("extra", true);
        }

        assert_eq!(nodes[2].memory().get_as::<u64>(UNIQUE_VALUE_KEY), Some(2));
        assert_eq!(nodes[1].memory().get_as::<u64>(NETWORK_SIZE_KEY), Some(3));
        assert!(nodes[0].memory().contains("extra"));
    }
}
