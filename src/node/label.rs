//! Neighbor labels: local names for adjacent nodes.

use serde::{Deserialize, Serialize};

/// "This neighbor, as seen by this node."
///
/// A label is a port number on the node that holds it. Ports are assigned in
/// the order the node's links were added to the network, so a label carries
/// no network-wide identity: the same neighbor has unrelated labels at two
/// different nodes, and a label only means something to the node it was
/// handed to. Labels are serializable so algorithms can keep them in node
/// memory (a parent pointer, a list of children, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NeighborLabel(u32);

impl NeighborLabel {
    #[inline]
    pub(crate) fn from_port(port: usize) -> Self {
        NeighborLabel(port as u32)
    }

    #[inline]
    pub(crate) fn port(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NeighborLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "port#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_survives_memory_round_trip() {
        let label = NeighborLabel::from_port(3);
        let stored = serde_json::to_value(label).unwrap();
        assert_eq!(stored, serde_json::json!(3));
        let back: NeighborLabel = serde_json::from_value(stored).unwrap();
        assert_eq!(back, label);
    }

    #[test]
    fn test_display() {
        assert_eq!(NeighborLabel::from_port(0).to_string(), "port#0");
    }
}
