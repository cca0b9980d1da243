/// Network topology owned by a simulation.
///
/// An adjacency index over densely numbered nodes. The engine asks it
/// three things: who is adjacent to a node, whether a directed edge
/// exists, and how a node's [`NeighborLabel`]s map back to node IDs.
/// Topologies are built elsewhere and handed over through [`Topology`].

use std::collections::{BTreeSet, VecDeque};

use crate::error::{SimError, SimResult};
use crate::node::{NeighborLabel, NodeId};

// ── Topology provider ─────────────────────────────────────────────────

/// Anything that can describe a directed graph by node index.
pub trait Topology {
    fn node_count(&self) -> usize;

    /// Directed edges `(from, to)`, by node index.
    fn edges(&self) -> Vec<(usize, usize)>;
}

/// A plain edge list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeList {
    nodes: usize,
    edges: Vec<(usize, usize)>,
}

impl EdgeList {
    pub fn new(nodes: usize) -> Self {
        EdgeList {
            nodes,
            edges: Vec::new(),
        }
    }

    /// Add a one-way edge.
    pub fn edge(mut self, from: usize, to: usize) -> Self {
        self.edges.push((from, to));
        self
    }

    /// Add an edge in both directions.
    pub fn link(mut self, a: usize, b: usize) -> Self {
        self.edges.push((a, b));
        self.edges.push((b, a));
        self
    }
}

impl Topology for EdgeList {
    fn node_count(&self) -> usize {
        self.nodes
    }

    fn edges(&self) -> Vec<(usize, usize)> {
        self.edges.clone()
    }
}

// ── Network ───────────────────────────────────────────────────────────

/// Directed graph with per-node ports.
///
/// Every node numbers the nodes adjacent to it (in either direction) in
/// the order the connecting edges were added; the position is the port,
/// and the port is what algorithms see as a [`NeighborLabel`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Network {
    ports: Vec<Vec<NodeId>>,
    edges: BTreeSet<(NodeId, NodeId)>,
}

impl Network {
    pub fn new() -> Self {
        Network::default()
    }

    /// A network of `n` isolated nodes.
    pub fn with_nodes(n: usize) -> Self {
        Network {
            ports: vec![Vec::new(); n],
            edges: BTreeSet::new(),
        }
    }

    /// Copy a topology from a provider.
    pub fn from_topology<T: Topology + ?Sized>(topology: &T) -> SimResult<Self> {
        let mut network = Network::with_nodes(topology.node_count());
        for (from, to) in topology.edges() {
            network.add_edge(NodeId::new(from as u64), NodeId::new(to as u64))?;
        }
        Ok(network)
    }

    pub fn add_node(&mut self) -> NodeId {
        self.ports.push(Vec::new());
        NodeId::new(self.ports.len() as u64 - 1)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.ports.len()
    }

    fn ensure(&self, id: NodeId) -> SimResult<()> {
        if self.contains(id) {
            Ok(())
        } else {
            Err(SimError::NodeNotFound(id))
        }
    }

    /// Add a directed edge. Returns `false` if it already existed.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId) -> SimResult<bool> {
        self.ensure(from)?;
        self.ensure(to)?;
        if from == to {
            return Err(SimError::InvalidTopology(format!("self-loop on {}", from)));
        }
        if !self.edges.insert((from, to)) {
            return Ok(false);
        }
        if !self.ports[from.index()].contains(&to) {
            self.ports[from.index()].push(to);
        }
        if !self.ports[to.index()].contains(&from) {
            self.ports[to.index()].push(from);
        }
        Ok(true)
    }

    /// Add an edge in both directions.
    pub fn add_link(&mut self, a: NodeId, b: NodeId) -> SimResult<()> {
        self.add_edge(a, b)?;
        self.add_edge(b, a)?;
        Ok(())
    }

    #[inline]
    pub fn has_edge(&self, from: NodeId, to: NodeId) -> bool {
        self.edges.contains(&(from, to))
    }

    pub fn node_count(&self) -> usize {
        self.ports.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> {
        (0..self.ports.len() as u64).map(NodeId::new)
    }

    /// All directed edges, sorted.
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.edges.iter().copied()
    }

    /// Nodes adjacent to `id` in either direction, in port order.
    pub fn adjacent(&self, id: NodeId) -> &[NodeId] {
        self.ports.get(id.index()).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn out_neighbors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.adjacent(id)
            .iter()
            .copied()
            .filter(move |&n| self.has_edge(id, n))
    }

    pub fn in_neighbors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.adjacent(id)
            .iter()
            .copied()
            .filter(move |&n| self.has_edge(n, id))
    }

    // ── Labels ────────────────────────────────────────────────────

    /// How `at` labels `other`, if they are adjacent.
    pub(crate) fn label_of(&self, at: NodeId, other: NodeId) -> Option<NeighborLabel> {
        self.adjacent(at)
            .iter()
            .position(|&n| n == other)
            .map(NeighborLabel::from_port)
    }

    /// The node behind one of `at`'s labels.
    pub(crate) fn resolve(&self, at: NodeId, label: NeighborLabel) -> Option<NodeId> {
        self.adjacent(at).get(label.port()).copied()
    }

    pub(crate) fn out_labels(&self, at: NodeId) -> Vec<NeighborLabel> {
        self.labels_where(at, |n| self.has_edge(at, n))
    }

    pub(crate) fn in_labels(&self, at: NodeId) -> Vec<NeighborLabel> {
        self.labels_where(at, |n| self.has_edge(n, at))
    }

    fn labels_where(&self, at: NodeId, keep: impl Fn(NodeId) -> bool) -> Vec<NeighborLabel> {
        self.adjacent(at)
            .iter()
            .enumerate()
            .filter(|(_, &n)| keep(n))
            .map(|(port, _)| NeighborLabel::from_port(port))
            .collect()
    }

    // ── Shape queries ─────────────────────────────────────────────

    /// The first edge (in sorted order) whose reverse is missing.
    pub fn first_one_way_edge(&self) -> Option<(NodeId, NodeId)> {
        self.edges().find(|&(a, b)| !self.has_edge(b, a))
    }

    /// Every edge has its reverse.
    pub fn is_reciprocal(&self) -> bool {
        self.first_one_way_edge().is_none()
    }

    /// Number of adjacent node pairs, ignoring direction.
    pub fn link_count(&self) -> usize {
        self.ports.iter().map(Vec::len).sum::<usize>() / 2
    }

    /// Every node reaches every other node along directed edges.
    pub fn is_strongly_connected(&self) -> bool {
        let Some(root) = self.nodes().next() else {
            return true;
        };
        let n = self.node_count();
        self.reach(root, |id| self.out_neighbors(id).collect()) == n
            && self.reach(root, |id| self.in_neighbors(id).collect()) == n
    }

    /// Every node reaches every other node, ignoring direction.
    pub fn is_weakly_connected(&self) -> bool {
        let Some(root) = self.nodes().next() else {
            return true;
        };
        self.reach(root, |id| self.adjacent(id).to_vec()) == self.node_count()
    }

    fn reach(&self, root: NodeId, next: impl Fn(NodeId) -> Vec<NodeId>) -> usize {
        let mut seen = vec![false; self.node_count()];
        let mut queue = VecDeque::from([root]);
        seen[root.index()] = true;
        let mut count = 1;
        while let Some(id) = queue.pop_front() {
            for n in next(id) {
                if !seen[n.index()] {
                    seen[n.index()] = true;
                    count += 1;
                    queue.push_back(n);
                }
            }
        }
        count
    }
}

impl Topology for Network {
    fn node_count(&self) -> usize {
        self.ports.len()
    }

    fn edges(&self) -> Vec<(usize, usize)> {
        self.edges
            .iter()
            .map(|(a, b)| (a.index(), b.index()))
            .collect()
    }
}

#[cfg(test)]
pub(crate) fn ring(n: usize) -> Network {
    let mut topology = EdgeList::new(n);
    for i in 0..n {
        topology = topology.link(i, (i + 1) % n);
    }
    Network::from_topology(&topology).unwrap()
}

#[cfg(test)]
pub(crate) fn line(n: usize) -> Network {
    let mut topology = EdgeList::new(n);
    for i in 1..n {
        topology = topology.link(i - 1, i);
    }
    Network::from_topology(&topology).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(i: u64) -> NodeId {
        NodeId::new(i)
    }

    #[test]
    fn test_add_edge_and_queries() {
        let mut net = Network::with_nodes(3);
        assert!(net.add_edge(n(0), n(1)).unwrap());
        assert!(!net.add_edge(n(0), n(1)).unwrap());
        net.add_edge(n(2), n(0)).unwrap();

        assert!(net.has_edge(n(0), n(1)));
        assert!(!net.has_edge(n(1), n(0)));
        assert_eq!(net.edge_count(), 2);
        assert_eq!(net.out_neighbors(n(0)).collect::<Vec<_>>(), vec![n(1)]);
        assert_eq!(net.in_neighbors(n(0)).collect::<Vec<_>>(), vec![n(2)]);
        assert_eq!(net.adjacent(n(0)), &[n(1), n(2)]);
    }

    #[test]
    fn test_rejects_self_loop_and_unknown_nodes() {
        let mut net = Network::with_nodes(2);
        assert!(matches!(
            net.add_edge(n(1), n(1)),
            Err(SimError::InvalidTopology(_))
        ));
        assert_eq!(net.add_edge(n(0), n(5)), Err(SimError::NodeNotFound(n(5))));
    }

    #[test]
    fn test_labels_are_local_ports() {
        let mut net = Network::with_nodes(3);
        net.add_link(n(0), n(2)).unwrap();
        net.add_link(n(0), n(1)).unwrap();

        // N0 met N2 first, so N2 sits on port 0 and N1 on port 1.
        assert_eq!(net.label_of(n(0), n(2)), Some(NeighborLabel::from_port(0)));
        assert_eq!(net.label_of(n(0), n(1)), Some(NeighborLabel::from_port(1)));
        // The same label means something else at another node.
        assert_eq!(net.resolve(n(1), NeighborLabel::from_port(0)), Some(n(0)));
        assert_eq!(net.resolve(n(1), NeighborLabel::from_port(1)), None);
        assert_eq!(net.label_of(n(1), n(2)), None);
    }

    #[test]
    fn test_out_and_in_labels_follow_direction() {
        let mut net = Network::with_nodes(3);
        net.add_edge(n(0), n(1)).unwrap();
        net.add_edge(n(2), n(0)).unwrap();
        assert_eq!(net.out_labels(n(0)), vec![NeighborLabel::from_port(0)]);
        assert_eq!(net.in_labels(n(0)), vec![NeighborLabel::from_port(1)]);
    }

    #[test]
    fn test_reciprocity() {
        let mut net = line(3);
        assert!(net.is_reciprocal());
        net.add_node();
        net.add_edge(n(2), n(3)).unwrap();
        assert_eq!(net.first_one_way_edge(), Some((n(2), n(3))));
    }

    #[test]
    fn test_connectivity() {
        assert!(ring(5).is_strongly_connected());
        assert!(Network::new().is_strongly_connected());

        let mut net = Network::with_nodes(3);
        net.add_edge(n(0), n(1)).unwrap();
        net.add_edge(n(1), n(2)).unwrap();
        assert!(!net.is_strongly_connected());
        assert!(net.is_weakly_connected());
        net.add_edge(n(2), n(0)).unwrap();
        assert!(net.is_strongly_connected());
    }

    #[test]
    fn test_link_count() {
        assert_eq!(ring(4).link_count(), 4);
        assert_eq!(line(4).link_count(), 3);
    }

    #[test]
    fn test_from_topology_round_trip() {
        let net = ring(4);
        let copy = Network::from_topology(&net).unwrap();
        assert_eq!(copy.edge_count(), net.edge_count());
        assert!(copy.edges().eq(net.edges()));
    }
}
