//! Top-k forward push with threshold refinement.
//!
//! Rounds run at thresholds `det0 >= det1 >= ... >= det`, quartering each time. Residual
//! carries over between rounds: a node whose residual sits between the current push
//! bound and the base bound waits in the frontier until a lower threshold reaches it.

use std::time::Instant;

use crate::graph::{DynamicGraph, GraphRef};
use crate::index::WalkIndex;
use crate::queue::DedupQueue;
use crate::sparse::SparseVector;
use crate::timer::{Phase, PhaseTimers};
use crate::topk::top_k_by;

#[derive(Debug, Clone)]
pub(super) struct TopkPush {
    reserve: SparseVector,
    residual: SparseVector,
    estimate: SparseVector,
    /// Nodes with residual above the base bound, waiting for a lower threshold.
    frontier: DedupQueue,
    /// Frontier entries found during the current round's sweep.
    deferred: DedupQueue,
    queue: DedupQueue,
    thresholds: Vec<f64>,
    ranked: Vec<usize>,
}

impl TopkPush {
    pub(super) fn new(node_count: usize) -> Self {
        Self {
            reserve: SparseVector::new(node_count + 1),
            residual: SparseVector::new(node_count + 1),
            estimate: SparseVector::new(node_count + 1),
            frontier: DedupQueue::new(node_count + 1),
            deferred: DedupQueue::new(node_count + 1),
            queue: DedupQueue::new(node_count + 1),
            thresholds: Vec::new(),
            ranked: Vec::new(),
        }
    }

    /// Thresholds visited by the last evaluation, in order.
    pub(super) fn thresholds(&self) -> &[f64] {
        &self.thresholds
    }

    /// Refine the estimate of `source` until its top `k` are settled; see [`TopkPush::rank`].
    pub(super) fn evaluate<I: WalkIndex>(
        &mut self,
        graph: &DynamicGraph,
        index: &mut I,
        source: usize,
        k: usize,
        timers: &mut PhaseTimers,
    ) {
        self.reserve.clear();
        self.residual.clear();
        self.thresholds.clear();
        self.refine(graph, index, source, k, timers);
    }

    /// Up to `k` nodes of the last estimate, highest score first.
    pub(super) fn rank(&mut self, k: usize) -> &[usize] {
        let scored = self.estimate.iter().map(|v| (v, self.estimate[v]));
        self.ranked.clear();
        self.ranked.extend(top_k_by(scored, k).into_iter().map(|(v, _)| v));
        &self.ranked
    }

    fn refine<I: WalkIndex>(
        &mut self,
        graph: &DynamicGraph,
        index: &mut I,
        source: usize,
        k: usize,
        timers: &mut PhaseTimers,
    ) {
        if k == 0 {
            self.estimate.clear();
            return;
        }
        if graph.is_dangling(source) {
            self.estimate.clear();
            self.estimate.update(source, 1.0);
            self.estimate.iterize();
            return;
        }
        self.residual.update(source, 1.0);
        self.frontier.push(source);

        let base = index.params().det;
        let eps = index.params().eps;
        let n = graph.node_count() as f64;
        let m = graph.edge_count() as f64;
        let dfac = 1.0 / (n.ln_1p() + m.ln_1p() + 1.0);
        let mut det = base.max(dfac / k as f64);

        loop {
            log::debug!("push round {}, det = {det:e}", self.thresholds.len());
            self.thresholds.push(det);

            let start = Instant::now();
            self.push(graph, index, det);
            timers.stop(Phase::Push, start);

            let start = Instant::now();
            index.adapt(graph, &self.residual, det);
            timers.stop(Phase::Adapt, start);

            let start = Instant::now();
            self.combine(graph, index, det);
            timers.stop(Phase::Refine, start);

            let start = Instant::now();
            let done = self.has_top_k((1.0 + eps) * det, k);
            timers.stop(Phase::CheckTopk, start);

            if done || det <= base {
                break;
            }
            det = base.max(det / 4.0);
        }
        self.frontier.clear();
    }

    fn push<I: WalkIndex>(&mut self, graph: &DynamicGraph, index: &I, det: f64) {
        let params = index.params();
        let alpha = params.alpha;
        let rmax = params.rmax(det);
        let rmax_base = params.rmax(params.det);

        // Dangling nodes never enter the frontier.
        while let Some(u) = self.frontier.pop() {
            let bound = graph.out_degree(u) as f64;
            let r = self.residual[u];
            if r <= 0.0 {
                continue;
            }
            if r >= rmax * bound {
                self.queue.push(u);
            } else if r >= rmax_base * bound {
                self.deferred.push(u);
            }
        }

        while let Some(u) = self.queue.pop() {
            let r = self.residual[u];
            self.reserve.accumulate(u, alpha * r);
            let share = (1.0 - alpha) * r / graph.out_degree(u) as f64;
            log::trace!("on node {u}, residual = {r:e}, increment = {share:e}");
            self.residual.update(u, 0.0);

            for &v in graph.neighbors(u) {
                if graph.is_dangling(v) {
                    self.reserve.accumulate(v, share);
                    continue;
                }
                self.residual.accumulate(v, share);
                let (rv, bound) = (self.residual[v], graph.out_degree(v) as f64);
                if rv <= 0.0 {
                    continue;
                }
                if rv >= rmax * bound {
                    self.queue.push(v);
                } else if rv >= rmax_base * bound {
                    self.frontier.push(v);
                }
            }
        }
        while let Some(u) = self.deferred.pop() {
            self.frontier.push(u);
        }

        self.reserve.iterize();
        self.residual.iterize();
    }

    fn combine<I: WalkIndex>(&mut self, graph: &DynamicGraph, index: &mut I, det: f64) {
        let params = *index.params();
        self.estimate.copy_from(&self.reserve);
        for v in self.residual.iter() {
            let r = self.residual[v];
            if r == 0.0 {
                continue;
            }
            if graph.is_dangling(v) {
                self.estimate.accumulate(v, r);
                continue;
            }
            let samples = params.num_samples(r, det);
            if samples == 0 {
                self.estimate.accumulate(v, r);
                continue;
            }
            self.estimate.accumulate(v, params.alpha * r);
            let weight = (1.0 - params.alpha) * r / samples as f64;
            for slot in 0..samples {
                let t = index.endpoint(graph, v, slot);
                self.estimate.accumulate(t, weight);
            }
        }
        self.estimate.iterize();
    }

    fn has_top_k(&self, limit: f64, k: usize) -> bool {
        if self.estimate.len() < k {
            return false;
        }
        self.estimate.iter().filter(|&v| self.estimate[v] >= limit).take(k).count() == k
    }
}
