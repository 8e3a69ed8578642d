//! Round-bounded exact propagation, the ground truth the approximate engines are measured
//! against.
//!
//! After `round` rounds the unpropagated residual is at most `(1 - alpha)^round`, so the
//! reserve vector is within that L1 distance of the true PPR vector.

use std::time::Instant;

use crate::config::PprConfig;
use crate::engine::{check_node, ExperimentConfigs, PprEngine};
use crate::graph::{DynamicGraph, GraphRef};
use crate::queue::DedupQueue;
use crate::timer::{Phase, PhaseTimers};
use crate::topk::top_k;
use crate::Result;

/// Reusable buffers for synchronous push rounds over any [`GraphRef`].
#[derive(Debug, Clone)]
pub struct ExactPropagation {
    reserve: Vec<f64>,
    residual: Vec<f64>,
    queue: DedupQueue,
    next: DedupQueue,
}

impl ExactPropagation {
    pub fn new(node_count: usize) -> Self {
        Self {
            reserve: vec![0.0; node_count + 1],
            residual: vec![0.0; node_count + 1],
            queue: DedupQueue::new(node_count + 1),
            next: DedupQueue::new(node_count + 1),
        }
    }

    /// Run `rounds` rounds from `source`. Each round every node holding residual pushes
    /// all of it; dangling nodes absorb theirs.
    pub fn run<G: GraphRef + ?Sized>(&mut self, graph: &G, alpha: f64, source: usize, rounds: usize) {
        self.reserve.fill(0.0);
        self.residual.fill(0.0);
        self.queue.clear();
        self.next.clear();

        self.residual[source] = 1.0;
        self.queue.push(source);
        for round in 0..rounds {
            log::trace!("exact round {round}: {} active node(s)", self.queue.len());
            while let Some(u) = self.queue.pop() {
                let r = std::mem::take(&mut self.residual[u]);
                let nbrs = graph.neighbors_ref(u);
                if nbrs.is_empty() {
                    self.reserve[u] += r;
                    continue;
                }
                self.reserve[u] += alpha * r;
                let share = (1.0 - alpha) * r / nbrs.len() as f64;
                for &v in nbrs {
                    self.residual[v] += share;
                    self.next.push(v);
                }
            }
            std::mem::swap(&mut self.queue, &mut self.next);
        }
    }

    pub fn reserve(&self) -> &[f64] {
        &self.reserve
    }

    /// Mass not yet propagated after the last run.
    pub fn residual(&self) -> &[f64] {
        &self.residual
    }
}

/// Exact PPR engine: no index, full propagation for a fixed number of rounds.
#[derive(Debug, Clone)]
pub struct ExactPpr {
    directed: bool,
    alpha: f64,
    round: usize,
    graph: DynamicGraph,
    propagation: ExactPropagation,
    ranked: Vec<usize>,
    timers: PhaseTimers,
}

impl ExactPpr {
    pub fn new(directed: bool, node_count: usize, edges: &[(usize, usize)], config: &PprConfig) -> Result<Self> {
        for &(u, v) in edges {
            check_node(u, node_count)?;
            check_node(v, node_count)?;
        }
        let graph = DynamicGraph::from_edges(node_count, edges, directed);
        log::info!(
            "built exact engine: {} nodes, {} edges, {} rounds",
            node_count,
            graph.edge_count(),
            config.round
        );
        Ok(Self {
            directed,
            alpha: config.alpha,
            round: config.round,
            graph,
            propagation: ExactPropagation::new(node_count),
            ranked: Vec::new(),
            timers: PhaseTimers::default(),
        })
    }

    pub fn graph(&self) -> &DynamicGraph {
        &self.graph
    }

    fn evaluate(&mut self, source: usize) {
        let start = Instant::now();
        self.propagation.run(&self.graph, self.alpha, source, self.round);
        let spent = start.elapsed();
        self.timers.record(Phase::Evaluate, spent);
        self.timers.record(Phase::Push, spent);
    }
}

impl PprEngine for ExactPpr {
    fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    fn evaluate_full(&mut self, source: usize, sink: &mut dyn FnMut(&[f64])) -> Result<()> {
        check_node(source, self.graph.node_count())?;
        self.evaluate(source);
        let start = Instant::now();
        sink(self.propagation.reserve());
        self.timers.stop(Phase::Output, start);
        Ok(())
    }

    fn evaluate_topk(&mut self, source: usize, k: usize, sink: &mut dyn FnMut(&[usize])) -> Result<()> {
        check_node(source, self.graph.node_count())?;
        self.evaluate(source);
        let start = Instant::now();
        self.ranked.clear();
        self.ranked.extend(top_k(self.propagation.reserve(), k).into_iter().map(|(v, _)| v));
        sink(&self.ranked);
        self.timers.stop(Phase::Output, start);
        Ok(())
    }

    fn insert_edge(&mut self, u: usize, v: usize) -> Result<bool> {
        let n = self.graph.node_count();
        check_node(u, n)?;
        check_node(v, n)?;
        let start = Instant::now();
        let inserted = self.graph.insert_edge(u, v).is_some();
        if inserted && !self.directed && u != v && self.graph.insert_edge(v, u).is_none() {
            log::error!("failed to insert mirror edge <{v}, {u}>");
            panic!("undirected graph diverged: mirror edge <{v}, {u}> already present");
        }
        self.timers.stop(Phase::Update, start);
        Ok(inserted)
    }

    fn delete_edge(&mut self, u: usize, v: usize) -> Result<bool> {
        let n = self.graph.node_count();
        check_node(u, n)?;
        check_node(v, n)?;
        let start = Instant::now();
        let deleted = self.graph.delete_edge(u, v).is_some();
        if deleted && !self.directed && u != v && self.graph.delete_edge(v, u).is_none() {
            log::error!("failed to delete mirror edge <{v}, {u}>");
            panic!("undirected graph diverged: mirror edge <{v}, {u}> missing");
        }
        self.timers.stop(Phase::Update, start);
        Ok(deleted)
    }

    fn experiment_configs(&self) -> ExperimentConfigs {
        ExperimentConfigs {
            alpha: self.alpha,
            epsilon: (1.0 - self.alpha).powf(self.round as f64),
            delta: 0.0,
            pf: 0.0,
        }
    }

    fn timers(&self) -> &PhaseTimers {
        &self.timers
    }

    fn reset_timers(&mut self) {
        self.timers.reset();
    }
}
