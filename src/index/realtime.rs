use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::WalkIndex;
use crate::config::{IndexParams, PprConfig};
use crate::graph::{DynamicGraph, GraphRef};
use crate::random_walk::walk_endpoint;

/// No stored walks: every endpoint request simulates a fresh walk.
#[derive(Debug, Clone)]
pub struct RealtimeIndex {
    params: IndexParams,
    rng: ChaCha8Rng,
}

impl WalkIndex for RealtimeIndex {
    fn build(graph: &mut DynamicGraph, _directed: bool, config: &PprConfig) -> Self {
        Self {
            params: IndexParams::new(config, graph.node_count()),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
        }
    }

    fn params(&self) -> &IndexParams {
        &self.params
    }

    fn endpoint(&mut self, graph: &DynamicGraph, source: usize, _slot: usize) -> usize {
        walk_endpoint(graph, source, self.params.alpha, &mut self.rng)
    }

    fn on_insert(&mut self, _graph: &mut DynamicGraph, _u: usize, _v: usize, _pos: usize) {}

    fn on_delete(&mut self, _graph: &mut DynamicGraph, _u: usize, _v: usize, _pos: usize) {}
}
