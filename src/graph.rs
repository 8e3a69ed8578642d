//! Graph adapter trait and the mutable adjacency structure the engines own.
//!
//! Node ids live in `1..=node_count`; id `0` is reserved as "absent" and never carries
//! edges. Every per-node buffer in this crate is sized `node_count + 1` so that ids index
//! directly.

use std::collections::HashMap;

use crate::growable::GrowableArray;

/// A graph view that can return **borrowed** neighbor slices.
///
/// Propagation only ever walks out-neighborhoods, so this is the whole contract.
pub trait GraphRef {
    /// Largest valid node id (ids are `1..=node_count`).
    fn node_count(&self) -> usize;
    fn neighbors_ref(&self, node: usize) -> &[usize];
    fn out_degree(&self, node: usize) -> usize {
        self.neighbors_ref(node).len()
    }
    fn is_dangling(&self, node: usize) -> bool {
        self.out_degree(node) == 0
    }
}

/// Evolvable directed graph with O(1) amortized edge insertion and deletion.
///
/// Per node we keep the out-neighbors in a [`GrowableArray`] plus a `neighbor -> position`
/// map. The two agree exactly after every public operation. A neighbor's position (its
/// "edge sequence number") is stable only until the next deletion on the same node,
/// because deletion moves the last neighbor into the freed slot.
#[derive(Debug, Clone)]
pub struct DynamicGraph {
    node_count: usize,
    edge_count: usize,
    adjacency: Vec<GrowableArray<usize>>,
    positions: Vec<HashMap<usize, usize>>,
}

impl DynamicGraph {
    pub fn new(node_count: usize) -> Self {
        Self {
            node_count,
            edge_count: 0,
            adjacency: vec![GrowableArray::new(); node_count + 1],
            positions: vec![HashMap::new(); node_count + 1],
        }
    }

    /// Build from a 1-based edge list. Undirected graphs materialize both `(u, v)` and
    /// `(v, u)`; self-loops are stored once. Duplicates are ignored (with a warning).
    pub fn from_edges(node_count: usize, edges: &[(usize, usize)], directed: bool) -> Self {
        let mut g = Self::new(node_count);
        for &(u, v) in edges {
            g.insert_edge(u, v);
            if !directed && u != v {
                g.insert_edge(v, u);
            }
        }
        g
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn degree(&self, v: usize) -> usize {
        self.adjacency[v].len()
    }

    pub fn neighbors(&self, v: usize) -> &[usize] {
        self.adjacency[v].as_slice()
    }

    pub fn neighbor(&self, v: usize, pos: usize) -> usize {
        self.adjacency[v][pos]
    }

    pub fn edge_position(&self, u: usize, v: usize) -> Option<usize> {
        self.positions[u].get(&v).copied()
    }

    pub fn has_edge(&self, u: usize, v: usize) -> bool {
        self.positions[u].contains_key(&v)
    }

    /// Append `v` to `u`'s out-neighbors and return its position, or `None` (no state
    /// change) when the edge already exists.
    pub fn insert_edge(&mut self, u: usize, v: usize) -> Option<usize> {
        if self.positions[u].contains_key(&v) {
            log::warn!("edge <{u}, {v}> already exists");
            return None;
        }
        let pos = self.adjacency[u].push(v);
        log::trace!("insert {v} as {u}'s neighbour at {pos}");
        self.positions[u].insert(v, pos);
        self.edge_count += 1;
        Some(pos)
    }

    /// Remove `(u, v)` by swap-removal and return the freed position, or `None` (no state
    /// change) when the edge does not exist.
    pub fn delete_edge(&mut self, u: usize, v: usize) -> Option<usize> {
        let Some(pos) = self.positions[u].remove(&v) else {
            log::warn!("edge <{u}, {v}> does not exist");
            return None;
        };
        log::trace!("delete {u}'s neighbour {v} at {pos}");
        let table = &mut self.positions[u];
        self.adjacency[u].swap_remove_with(pos, |&moved| {
            table.insert(moved, pos);
        });
        self.edge_count -= 1;
        Some(pos)
    }

    /// Exchange the neighbors stored at positions `i` and `j` of node `u`.
    pub fn swap_edges(&mut self, u: usize, i: usize, j: usize) {
        let table = &mut self.positions[u];
        self.adjacency[u].swap_with(i, j, |&at_i, &at_j| {
            table.insert(at_i, i);
            table.insert(at_j, j);
        });
    }
}

impl GraphRef for DynamicGraph {
    fn node_count(&self) -> usize {
        self.node_count
    }

    fn neighbors_ref(&self, node: usize) -> &[usize] {
        self.adjacency[node].as_slice()
    }

    fn out_degree(&self, node: usize) -> usize {
        self.adjacency[node].len()
    }
}
