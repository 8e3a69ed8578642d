//! Full-vector forward push at the base threshold.

use std::time::Instant;

use crate::graph::{DynamicGraph, GraphRef};
use crate::index::WalkIndex;
use crate::queue::DedupQueue;
use crate::timer::{Phase, PhaseTimers};

/// Reusable dense buffers for [`FullPush::evaluate`].
#[derive(Debug, Clone)]
pub(super) struct FullPush {
    reserve: Vec<f64>,
    residual: Vec<f64>,
    queue: DedupQueue,
}

impl FullPush {
    pub(super) fn new(node_count: usize) -> Self {
        Self {
            reserve: vec![0.0; node_count + 1],
            residual: vec![0.0; node_count + 1],
            queue: DedupQueue::new(node_count + 1),
        }
    }

    /// Estimate the PPR vector of `source`; the result is indexed by node id.
    pub(super) fn evaluate<I: WalkIndex>(
        &mut self,
        graph: &DynamicGraph,
        index: &mut I,
        source: usize,
        timers: &mut PhaseTimers,
    ) -> &[f64] {
        self.reserve.fill(0.0);
        self.residual.fill(0.0);
        let det = index.params().det;

        log::debug!("forward pushing from {source}");
        let start = Instant::now();
        self.push(graph, index, source);
        timers.stop(Phase::Push, start);

        log::debug!("adjusting index");
        let start = Instant::now();
        index.adapt(graph, &self.residual, det);
        timers.stop(Phase::Adapt, start);

        log::debug!("refining estimation");
        let start = Instant::now();
        self.combine(graph, index);
        timers.stop(Phase::Refine, start);

        &self.reserve
    }

    fn push<I: WalkIndex>(&mut self, graph: &DynamicGraph, index: &I, source: usize) {
        let params = index.params();
        let alpha = params.alpha;
        let rmax = params.rmax(params.det);

        if graph.is_dangling(source) {
            self.reserve[source] = 1.0;
            return;
        }
        self.residual[source] = 1.0;
        if rmax * graph.out_degree(source) as f64 <= 1.0 {
            self.queue.push(source);
        }

        while let Some(u) = self.queue.pop() {
            // Dangling nodes never enter the queue.
            let r = std::mem::take(&mut self.residual[u]);
            self.reserve[u] += alpha * r;
            let share = (1.0 - alpha) * r / graph.out_degree(u) as f64;
            log::trace!("on node {u}, residual = {r:e}, increment = {share:e}");

            for &v in graph.neighbors(u) {
                if graph.is_dangling(v) {
                    self.reserve[v] += share;
                } else {
                    self.residual[v] += share;
                    let rv = self.residual[v];
                    if rv > 0.0 && rv >= rmax * graph.out_degree(v) as f64 {
                        self.queue.push(v);
                    }
                }
            }
        }
    }

    fn combine<I: WalkIndex>(&mut self, graph: &DynamicGraph, index: &mut I) {
        let params = *index.params();
        for v in 1..=graph.node_count() {
            let r = self.residual[v];
            if r == 0.0 {
                continue;
            }
            if graph.is_dangling(v) {
                self.reserve[v] += r;
                continue;
            }
            let samples = params.num_samples(r, params.det);
            if samples == 0 {
                self.reserve[v] += r;
                continue;
            }
            self.reserve[v] += params.alpha * r;
            let weight = (1.0 - params.alpha) * r / samples as f64;
            for slot in 0..samples {
                let t = index.endpoint(graph, v, slot);
                self.reserve[t] += weight;
            }
        }
    }
}
