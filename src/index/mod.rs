//! Random-walk index schemes.
//!
//! Forward push leaves a small residual at many nodes. Each scheme provides sampled walk
//! endpoints for those nodes so the residual can be spread statistically instead of pushed
//! further. The schemes differ only in how they keep stored walks valid while the graph
//! changes:
//!
//! | scheme | storage | on update |
//! |---|---|---|
//! | [`RealtimeIndex`] | none | nothing; every sample is a fresh walk |
//! | [`EagerIndex`] | endpoints | rebuild every walk |
//! | [`IncrementalIndex`] | full walk paths | repair exactly the walks that used the edge |
//! | [`LazyIndex`] | endpoints + staleness bound | defer; regenerate inside `adapt` when needed |
//!
//! A scheme is chosen once per engine and never mixed at runtime.

mod eager;
mod incremental;
mod lazy;
mod realtime;

pub use eager::EagerIndex;
pub use incremental::IncrementalIndex;
pub use lazy::{LazyIndex, RelaxedLazyIndex, StrictLazyIndex};
pub use realtime::RealtimeIndex;

use crate::config::{IndexParams, PprConfig};
use crate::graph::DynamicGraph;
use crate::sparse::SparseVector;

/// Read access to a residual vector, whatever its layout.
pub trait ResidualView {
    /// Call `f(node, residual)` for every node with non-zero residual.
    fn for_each_nonzero(&self, f: &mut dyn FnMut(usize, f64));
}

impl ResidualView for [f64] {
    fn for_each_nonzero(&self, f: &mut dyn FnMut(usize, f64)) {
        for (v, &r) in self.iter().enumerate().skip(1) {
            if r != 0.0 {
                f(v, r);
            }
        }
    }
}

impl ResidualView for Vec<f64> {
    fn for_each_nonzero(&self, f: &mut dyn FnMut(usize, f64)) {
        self.as_slice().for_each_nonzero(f)
    }
}

impl ResidualView for SparseVector {
    fn for_each_nonzero(&self, f: &mut dyn FnMut(usize, f64)) {
        for v in self.iter() {
            let r = self[v];
            if r != 0.0 {
                f(v, r);
            }
        }
    }
}

/// Capability shared by all index schemes.
///
/// Update hooks run **after** the graph mutation: `graph` already reflects the new
/// topology and `pos` is the position the graph confirmed for the edge (the appended slot
/// on insert, the freed slot on delete).
pub trait WalkIndex: Sized {
    fn build(graph: &mut DynamicGraph, directed: bool, config: &PprConfig) -> Self;

    fn params(&self) -> &IndexParams;

    /// Endpoint of the `slot`-th sampled walk from `source` (`source` is not dangling).
    fn endpoint(&mut self, graph: &DynamicGraph, source: usize, slot: usize) -> usize;

    /// Called once per evaluation round, before the residual is combined.
    fn adapt<R: ResidualView + ?Sized>(&mut self, graph: &DynamicGraph, residual: &R, delta: f64) {
        let _ = (graph, residual, delta);
    }

    fn on_insert(&mut self, graph: &mut DynamicGraph, u: usize, v: usize, pos: usize);

    fn on_delete(&mut self, graph: &mut DynamicGraph, u: usize, v: usize, pos: usize);

    /// Total number of stored walks.
    fn stored_walks(&self) -> usize {
        0
    }
}
