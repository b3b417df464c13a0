//! Input line networks.
//!
//! A [`Network`] is the read-only input to the skeleton and collar builders:
//! nodes with 3D positions connected by undirected straight branches. Node
//! roles are derived from degree: a node of degree 1 is a *leaf*, a node of
//! degree 2 or more a *joint*.
//!
//! Each node carries its neighbors in a deterministic cyclic order. The
//! order defaults to edge insertion order; an external angular-sorting
//! service can install a proper cyclic order through
//! [`Network::set_neighbor_cycle`]. The builders never mutate a network.

use std::collections::HashMap;
use std::fmt::{self, Debug};

use nalgebra::Point3;

use crate::error::{Result, SkeletonError};

/// Coordinates closer than this are welded to one node by
/// [`Network::from_lines`].
const WELD_PRECISION: f64 = 1e-6;

/// A type-safe network node index.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct NodeId(u32);

impl NodeId {
    /// Create a new index from a raw value.
    #[inline]
    pub fn new(index: usize) -> Self {
        debug_assert!(index < u32::MAX as usize, "index {} too large", index);
        Self(index as u32)
    }

    /// Get the raw index value.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "N({})", self.index())
    }
}

/// An undirected graph of 3D points and straight connections.
#[derive(Debug, Clone, Default)]
pub struct Network {
    positions: Vec<Point3<f64>>,
    adjacency: Vec<Vec<NodeId>>,
}

impl Network {
    /// Create a new empty network.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a network from line segments, welding shared endpoints.
    ///
    /// Endpoints within [`WELD_PRECISION`] of each other map to one node, so
    /// a raw line soup classifies into joints and leaves without caller-side
    /// bookkeeping.
    pub fn from_lines(lines: &[[Point3<f64>; 2]]) -> Self {
        let mut network = Self::new();
        let mut keys: HashMap<(i64, i64, i64), NodeId> = HashMap::new();

        let mut node_for = |network: &mut Network, p: Point3<f64>| {
            let key = (
                (p.x / WELD_PRECISION).round() as i64,
                (p.y / WELD_PRECISION).round() as i64,
                (p.z / WELD_PRECISION).round() as i64,
            );
            *keys.entry(key).or_insert_with(|| network.add_node(p))
        };

        for line in lines {
            let a = node_for(&mut network, line[0]);
            let b = node_for(&mut network, line[1]);
            network.add_edge(a, b);
        }

        network
    }

    /// Add a node and return its ID.
    pub fn add_node(&mut self, position: Point3<f64>) -> NodeId {
        let id = NodeId::new(self.positions.len());
        self.positions.push(position);
        self.adjacency.push(Vec::new());
        id
    }

    /// Add an undirected edge between two nodes.
    ///
    /// Self-loops and duplicate edges are ignored.
    pub fn add_edge(&mut self, a: NodeId, b: NodeId) {
        if a == b || self.adjacency[a.index()].contains(&b) {
            return;
        }
        self.adjacency[a.index()].push(b);
        self.adjacency[b.index()].push(a);
    }

    /// Get the number of nodes.
    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.positions.len()
    }

    /// Get the number of undirected edges.
    pub fn num_edges(&self) -> usize {
        self.adjacency.iter().map(Vec::len).sum::<usize>() / 2
    }

    /// Get the position of a node.
    #[inline]
    pub fn position(&self, n: NodeId) -> Point3<f64> {
        self.positions[n.index()]
    }

    /// Get the degree of a node.
    #[inline]
    pub fn degree(&self, n: NodeId) -> usize {
        self.adjacency[n.index()].len()
    }

    /// Check whether a node is a leaf (degree 1).
    #[inline]
    pub fn is_leaf(&self, n: NodeId) -> bool {
        self.degree(n) == 1
    }

    /// The neighbors of a node in its stored cyclic order.
    #[inline]
    pub fn neighbors(&self, n: NodeId) -> &[NodeId] {
        &self.adjacency[n.index()]
    }

    /// Install the cyclic neighbor order produced by an external angular
    /// sorting service.
    ///
    /// The new cycle must be a permutation of the node's current neighbors.
    pub fn set_neighbor_cycle(&mut self, n: NodeId, cycle: &[NodeId]) -> Result<()> {
        let mut current = self.adjacency[n.index()].clone();
        let mut proposed = cycle.to_vec();
        current.sort_unstable();
        proposed.sort_unstable();
        if current != proposed {
            return Err(SkeletonError::InvalidNeighborCycle { node: n });
        }
        self.adjacency[n.index()] = cycle.to_vec();
        Ok(())
    }

    /// Iterate over all node IDs.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.positions.len()).map(NodeId::new)
    }

    /// Iterate over undirected edges, each reported once.
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.nodes().flat_map(move |u| {
            self.neighbors(u)
                .iter()
                .filter(move |v| u < **v)
                .map(move |&v| (u, v))
        })
    }

    /// Compute the length of the edge between two nodes.
    pub fn edge_length(&self, a: NodeId, b: NodeId) -> f64 {
        (self.position(b) - self.position(a)).norm()
    }
}
