use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::WalkIndex;
use crate::config::{IndexParams, PprConfig};
use crate::graph::{DynamicGraph, GraphRef};
use crate::random_walk::walk_endpoint;

/// Flat endpoint table, rebuilt from scratch on every topology change.
///
/// Walks of node `v` occupy `endpoints[offsets[v]..offsets[v + 1]]`.
#[derive(Debug, Clone)]
pub struct EagerIndex {
    params: IndexParams,
    directed: bool,
    rng: ChaCha8Rng,
    offsets: Vec<usize>,
    endpoints: Vec<usize>,
}

impl EagerIndex {
    fn rebuild(&mut self, graph: &DynamicGraph) {
        log::debug!("reconstructing random walks");
        self.endpoints.clear();
        let n = graph.node_count();
        for v in 1..=n {
            self.offsets[v] = self.endpoints.len();
            for _ in 0..self.params.index_size(graph.out_degree(v)) {
                let t = walk_endpoint(graph, v, self.params.alpha, &mut self.rng);
                self.endpoints.push(t);
            }
        }
        self.offsets[n + 1] = self.endpoints.len();
        log::debug!("reconstructed {} random walks", self.endpoints.len());
    }
}

impl WalkIndex for EagerIndex {
    fn build(graph: &mut DynamicGraph, directed: bool, config: &PprConfig) -> Self {
        let n = graph.node_count();
        let mut index = Self {
            params: IndexParams::new(config, n),
            directed,
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            offsets: vec![0; n + 2],
            endpoints: Vec::new(),
        };
        index.rebuild(graph);
        index
    }

    fn params(&self) -> &IndexParams {
        &self.params
    }

    fn endpoint(&mut self, _graph: &DynamicGraph, source: usize, slot: usize) -> usize {
        let lo = self.offsets[source];
        let count = self.offsets[source + 1] - lo;
        // Rounding in the sample count can ask for one walk past the pool.
        self.endpoints[lo + slot % count]
    }

    fn on_insert(&mut self, graph: &mut DynamicGraph, u: usize, v: usize, _pos: usize) {
        // Undirected updates arrive as two halves; rebuild once, after the second.
        if !self.directed && u != v && !graph.has_edge(v, u) {
            return;
        }
        self.rebuild(graph);
    }

    fn on_delete(&mut self, graph: &mut DynamicGraph, u: usize, v: usize, _pos: usize) {
        if !self.directed && u != v && graph.has_edge(v, u) {
            return;
        }
        self.rebuild(graph);
    }

    fn stored_walks(&self) -> usize {
        self.endpoints.len()
    }
}
