//! FORA: forward push corrected by random-walk samples from a [`WalkIndex`].
//!
//! [`Fora`] owns the graph, one index scheme and the propagation scratch buffers. Scratch
//! is reused across calls, so one instance serves one caller at a time; run independent
//! instances for concurrent sources.

mod full;
mod topk;

use std::time::Instant;

use crate::config::PprConfig;
use crate::engine::{check_node, ExperimentConfigs, PprEngine};
use crate::graph::{DynamicGraph, GraphRef};
use crate::index::WalkIndex;
use crate::timer::{Phase, PhaseTimers};
use crate::Result;

use full::FullPush;
use topk::TopkPush;

#[derive(Debug, Clone)]
pub struct Fora<I: WalkIndex> {
    directed: bool,
    graph: DynamicGraph,
    index: I,
    full: FullPush,
    topk: TopkPush,
    timers: PhaseTimers,
}

impl<I: WalkIndex> Fora<I> {
    /// Build the graph from a 1-based edge list, then the index over it.
    pub fn new(directed: bool, node_count: usize, edges: &[(usize, usize)], config: &PprConfig) -> Result<Self> {
        for &(u, v) in edges {
            check_node(u, node_count)?;
            check_node(v, node_count)?;
        }
        let mut graph = DynamicGraph::from_edges(node_count, edges, directed);
        let index = I::build(&mut graph, directed, config);
        log::info!(
            "built {} graph: {} nodes, {} edges, {} stored walks",
            if directed { "directed" } else { "undirected" },
            node_count,
            graph.edge_count(),
            index.stored_walks(),
        );
        Ok(Self {
            directed,
            graph,
            index,
            full: FullPush::new(node_count),
            topk: TopkPush::new(node_count),
            timers: PhaseTimers::default(),
        })
    }

    pub fn graph(&self) -> &DynamicGraph {
        &self.graph
    }

    pub fn index(&self) -> &I {
        &self.index
    }

    pub fn is_directed(&self) -> bool {
        self.directed
    }

    /// Thresholds visited by the most recent top-k evaluation.
    pub fn last_topk_thresholds(&self) -> &[f64] {
        self.topk.thresholds()
    }

    fn insert_half(&mut self, u: usize, v: usize) -> bool {
        match self.graph.insert_edge(u, v) {
            Some(pos) => {
                self.index.on_insert(&mut self.graph, u, v, pos);
                true
            }
            None => false,
        }
    }

    fn delete_half(&mut self, u: usize, v: usize) -> bool {
        match self.graph.delete_edge(u, v) {
            Some(pos) => {
                self.index.on_delete(&mut self.graph, u, v, pos);
                true
            }
            None => false,
        }
    }
}

impl<I: WalkIndex> PprEngine for Fora<I> {
    fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    fn evaluate_full(&mut self, source: usize, sink: &mut dyn FnMut(&[f64])) -> Result<()> {
        check_node(source, self.graph.node_count())?;
        let start = Instant::now();
        let ppr = self.full.evaluate(&self.graph, &mut self.index, source, &mut self.timers);
        self.timers.stop(Phase::Evaluate, start);

        let start = Instant::now();
        sink(ppr);
        self.timers.stop(Phase::Output, start);
        Ok(())
    }

    fn evaluate_topk(&mut self, source: usize, k: usize, sink: &mut dyn FnMut(&[usize])) -> Result<()> {
        check_node(source, self.graph.node_count())?;
        let start = Instant::now();
        self.topk.evaluate(&self.graph, &mut self.index, source, k, &mut self.timers);
        self.timers.stop(Phase::Evaluate, start);

        let start = Instant::now();
        sink(self.topk.rank(k));
        self.timers.stop(Phase::Output, start);
        Ok(())
    }

    fn insert_edge(&mut self, u: usize, v: usize) -> Result<bool> {
        let n = self.graph.node_count();
        check_node(u, n)?;
        check_node(v, n)?;
        let start = Instant::now();
        let inserted = self.insert_half(u, v);
        if inserted && !self.directed && u != v && !self.insert_half(v, u) {
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
        let deleted = self.delete_half(u, v);
        if deleted && !self.directed && u != v && !self.delete_half(v, u) {
            log::error!("failed to delete mirror edge <{v}, {u}>");
            panic!("undirected graph diverged: mirror edge <{v}, {u}> missing");
        }
        self.timers.stop(Phase::Update, start);
        Ok(deleted)
    }

    fn experiment_configs(&self) -> ExperimentConfigs {
        let p = self.index.params();
        ExperimentConfigs { alpha: p.alpha, epsilon: p.eps, delta: p.det, pf: p.pf }
    }

    fn timers(&self) -> &PhaseTimers {
        &self.timers
    }

    fn reset_timers(&mut self) {
        self.timers.reset();
    }
}
