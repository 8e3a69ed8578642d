use std::collections::BinaryHeap;

use ordered_float::OrderedFloat;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::{ResidualView, WalkIndex};
use crate::config::{IndexParams, PprConfig};
use crate::graph::{DynamicGraph, GraphRef};
use crate::queue::DedupQueue;
use crate::random_walk::walk_endpoint;

/// Endpoint table with deferred, budgeted regeneration.
///
/// Updates never resample walks rooted elsewhere. Instead each node `v` carries `sigma[v]`,
/// a bound on how much a unit of residual at `v` can be misattributed by its stale walks,
/// refreshed by a reverse push from the updated edge's tail. During [`WalkIndex::adapt`]
/// the nodes contributing most inaccuracy per stored walk are regenerated until the
/// projected error fits in `(1 - theta) * eps * delta`.
///
/// With `STRICT`, propagation itself runs at `theta * eps` so the two error budgets add up
/// to `eps`; the relaxed variant keeps the full `eps` for propagation.
#[derive(Debug, Clone)]
pub struct LazyIndex<const STRICT: bool> {
    params: IndexParams,
    directed: bool,
    /// Accuracy budget reserved for stale walks.
    eps_stale: f64,
    rng: ChaCha8Rng,
    reverse: DynamicGraph,
    sigma: Vec<f64>,
    sigma_sum: f64,
    endpoints: Vec<Vec<usize>>,
    backward: Vec<f64>,
    inaccuracy: Vec<f64>,
    queue: DedupQueue,
}

/// Error budgets sum to `eps`.
pub type StrictLazyIndex = LazyIndex<true>;
/// Propagation keeps the full `eps`.
pub type RelaxedLazyIndex = LazyIndex<false>;

impl<const STRICT: bool> LazyIndex<STRICT> {
    pub fn sigma_sum(&self) -> f64 {
        self.sigma_sum
    }

    fn fresh_walks(&mut self, graph: &DynamicGraph, v: usize) {
        let alpha = self.params.alpha;
        for slot in 0..self.endpoints[v].len() {
            self.endpoints[v][slot] = walk_endpoint(graph, v, alpha, &mut self.rng);
        }
    }

    /// Reverse push from `t` after one of its out-edges changed; `removed` is 1 for a
    /// deletion (the old degree was one higher) and 0 for an insertion.
    fn update_inaccuracy(&mut self, graph: &DynamicGraph, t: usize, removed: usize) {
        log::debug!("updating inaccuracy from {t}");
        let alpha = self.params.alpha;
        let n = graph.node_count();
        let deg_t = (graph.out_degree(t) + removed) as f64;
        let bound = if self.directed {
            1.0 / n as f64
        } else {
            2.0 * deg_t / (graph.edge_count() + 2 * removed) as f64
        };

        self.backward.fill(0.0);
        self.backward[t] = 1.0;
        if self.backward[t] > bound {
            self.queue.push(t);
        }
        while let Some(u) = self.queue.pop() {
            let mass = std::mem::take(&mut self.backward[u]);
            self.sigma[u] += mass / deg_t;
            for &w in self.reverse.neighbors(u) {
                self.backward[w] += (1.0 - alpha) * mass / graph.out_degree(w) as f64;
                if self.backward[w] > bound {
                    self.queue.push(w);
                }
            }
        }

        let floor = bound / (alpha * deg_t);
        self.sigma_sum = 0.0;
        for v in 1..=n {
            self.sigma[v] += floor;
            self.sigma_sum += self.sigma[v];
        }
    }
}

impl<const STRICT: bool> WalkIndex for LazyIndex<STRICT> {
    fn build(graph: &mut DynamicGraph, directed: bool, config: &PprConfig) -> Self {
        let n = graph.node_count();
        let base = IndexParams::new(config, n);
        let params = if STRICT { base.with_eps(config.theta * config.eps) } else { base };

        let mut reverse = DynamicGraph::new(n);
        for u in 1..=n {
            for &v in graph.neighbors(u) {
                reverse.insert_edge(v, u);
            }
        }

        let mut index = Self {
            params,
            directed,
            eps_stale: (1.0 - config.theta) * config.eps,
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            reverse,
            sigma: vec![0.0; n + 1],
            sigma_sum: 0.0,
            endpoints: vec![Vec::new(); n + 1],
            backward: vec![0.0; n + 1],
            inaccuracy: vec![0.0; n + 1],
            queue: DedupQueue::new(n + 1),
        };
        for v in 1..=n {
            let size = index.params.index_size(graph.out_degree(v));
            index.endpoints[v].resize(size, 0);
            index.fresh_walks(graph, v);
        }
        index
    }

    fn params(&self) -> &IndexParams {
        &self.params
    }

    fn endpoint(&mut self, _graph: &DynamicGraph, source: usize, slot: usize) -> usize {
        let walks = &self.endpoints[source];
        walks[slot % walks.len()]
    }

    fn adapt<R: ResidualView + ?Sized>(&mut self, graph: &DynamicGraph, residual: &R, delta: f64) {
        let budget = self.eps_stale * delta;
        log::debug!("checking stale random walks, budget = {budget:e}");
        if self.sigma_sum <= budget {
            return;
        }

        self.inaccuracy.fill(0.0);
        let mut heap: BinaryHeap<(OrderedFloat<f64>, usize)> = BinaryHeap::new();
        let mut total = 0.0;
        {
            let sigma = &self.sigma;
            let endpoints = &self.endpoints;
            let inaccuracy = &mut self.inaccuracy;
            residual.for_each_nonzero(&mut |v, r| {
                if sigma[v] == 0.0 || endpoints[v].is_empty() {
                    return;
                }
                inaccuracy[v] = r * sigma[v];
                total += inaccuracy[v];
                heap.push((OrderedFloat(inaccuracy[v] / endpoints[v].len() as f64), v));
            });
        }

        let mut regenerated = 0usize;
        while total > budget {
            let Some((_, v)) = heap.pop() else { break };
            log::trace!("regenerating random walks from {v}");
            self.fresh_walks(graph, v);
            self.sigma_sum -= self.sigma[v];
            self.sigma[v] = 0.0;
            total -= self.inaccuracy[v];
            regenerated += 1;
        }
        log::debug!("regenerated walks of {regenerated} node(s)");
    }

    fn on_insert(&mut self, graph: &mut DynamicGraph, u: usize, v: usize, _pos: usize) {
        self.reverse.insert_edge(v, u);
        self.update_inaccuracy(graph, u, 0);
        let size = self.params.index_size(graph.out_degree(u));
        while self.endpoints[u].len() < size {
            log::trace!("add random walk at {u}");
            let t = walk_endpoint(graph, u, self.params.alpha, &mut self.rng);
            self.endpoints[u].push(t);
        }
    }

    fn on_delete(&mut self, graph: &mut DynamicGraph, u: usize, v: usize, _pos: usize) {
        self.reverse.delete_edge(v, u);
        self.update_inaccuracy(graph, u, 1);
        let size = self.params.index_size(graph.out_degree(u));
        self.endpoints[u].truncate(size);
    }

    fn stored_walks(&self) -> usize {
        self.endpoints.iter().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cycle_with_tail() -> DynamicGraph {
        DynamicGraph::from_edges(4, &[(1, 2), (2, 3), (3, 1), (3, 4)], true)
    }

    #[test]
    fn strict_mode_spends_theta_of_eps_on_propagation() {
        let cfg = PprConfig { eps: 0.4, theta: 0.25, ..PprConfig::default() };
        let mut g = cycle_with_tail();
        let strict = StrictLazyIndex::build(&mut g, true, &cfg);
        let relaxed = RelaxedLazyIndex::build(&mut g, true, &cfg);
        assert!((strict.params().eps - 0.1).abs() < 1e-12);
        assert!((relaxed.params().eps - 0.4).abs() < 1e-12);
        assert!((strict.eps_stale - 0.3).abs() < 1e-12);
    }

    #[test]
    fn updates_accumulate_inaccuracy_and_adapt_clears_it() {
        let cfg = PprConfig::default();
        let mut g = cycle_with_tail();
        let mut idx = RelaxedLazyIndex::build(&mut g, true, &cfg);
        assert_eq!(idx.sigma_sum(), 0.0);

        let pos = g.insert_edge(4, 1).unwrap();
        idx.on_insert(&mut g, 4, 1, pos);
        assert!(idx.sigma_sum() > 0.0);
        assert_eq!(idx.endpoints[4].len(), idx.params().index_size(1));

        // Residual everywhere, zero budget: every node with stale walks is refreshed.
        let residual = vec![0.0, 0.25, 0.25, 0.25, 0.25];
        idx.adapt(&g, &residual, 0.0);
        for v in 1..=4 {
            assert_eq!(idx.sigma[v], 0.0, "node {v}");
        }
        assert!(idx.sigma_sum().abs() < 1e-9);
    }

    #[test]
    fn delete_trims_walks_to_new_degree() {
        let cfg = PprConfig { beta: 3.0, ..PprConfig::default() };
        let mut g = cycle_with_tail();
        let mut idx = StrictLazyIndex::build(&mut g, true, &cfg);
        assert_eq!(idx.endpoints[3].len(), 5); // ceil(3 * 0.8 * 2)

        let pos = g.delete_edge(3, 4).unwrap();
        idx.on_delete(&mut g, 3, 4, pos);
        assert_eq!(idx.endpoints[3].len(), 3); // ceil(3 * 0.8 * 1)
        assert!(!idx.reverse.has_edge(4, 3));
        // Remaining walks from 3 can only go through 1.
        assert!(idx.endpoints[3].iter().all(|&t| (1..=4).contains(&t)));
    }
}
