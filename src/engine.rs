//! The common engine interface, algorithm selection, and update-stream execution.

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use crate::config::PprConfig;
use crate::exact::ExactPpr;
use crate::fora::Fora;
use crate::index::{EagerIndex, IncrementalIndex, RealtimeIndex, RelaxedLazyIndex, StrictLazyIndex};
use crate::timer::{Phase, PhaseTimers};
use crate::{Error, Result};

pub(crate) fn check_node(node: usize, node_count: usize) -> Result<()> {
    if node == 0 || node > node_count {
        return Err(Error::NodeOutOfRange { node, node_count });
    }
    Ok(())
}

/// Accuracy parameters an engine actually runs with.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExperimentConfigs {
    pub alpha: f64,
    pub epsilon: f64,
    pub delta: f64,
    pub pf: f64,
}

/// A PPR engine over an evolving graph.
///
/// Engines own reusable scratch state and are not reentrant: callers serialize every
/// operation on one instance. Node ids are `1..=node_count()`; out-of-range ids are
/// rejected before any state changes.
pub trait PprEngine {
    fn node_count(&self) -> usize;

    /// Hand the estimated PPR vector of `source` (indexed by node id, entry 0 unused) to
    /// `sink`.
    fn evaluate_full(&mut self, source: usize, sink: &mut dyn FnMut(&[f64])) -> Result<()>;

    /// Hand up to `k` node ids, highest estimated score first, to `sink`.
    fn evaluate_topk(&mut self, source: usize, k: usize, sink: &mut dyn FnMut(&[usize])) -> Result<()>;

    /// Insert `(u, v)` (and `(v, u)` on undirected graphs). `Ok(false)` if already present.
    fn insert_edge(&mut self, u: usize, v: usize) -> Result<bool>;

    /// Delete `(u, v)` (and `(v, u)` on undirected graphs). `Ok(false)` if absent.
    fn delete_edge(&mut self, u: usize, v: usize) -> Result<bool>;

    fn experiment_configs(&self) -> ExperimentConfigs;

    fn timers(&self) -> &PhaseTimers;

    fn reset_timers(&mut self);

    /// Owned copy of [`PprEngine::evaluate_full`]'s output.
    fn ppr(&mut self, source: usize) -> Result<Vec<f64>> {
        let mut out = Vec::new();
        self.evaluate_full(source, &mut |ppr| out.extend_from_slice(ppr))?;
        Ok(out)
    }

    /// Owned copy of [`PprEngine::evaluate_topk`]'s output.
    fn topk(&mut self, source: usize, k: usize) -> Result<Vec<usize>> {
        let mut out = Vec::new();
        self.evaluate_topk(source, k, &mut |top| out.extend_from_slice(top))?;
        Ok(out)
    }
}

/// Engine variants, selected once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Algorithm {
    /// Round-bounded exact propagation (`exact`).
    Exact,
    /// FORA with fresh walks per query (`fora`).
    Realtime,
    /// FORA with an index rebuilt on every update (`fora+`).
    Eager,
    /// Lazy index, error budgets summing to `eps` (`agenda`).
    LazyStrict,
    /// Lazy index, full `eps` for propagation (`agenda*`).
    LazyRelaxed,
    /// Exactly maintained walk paths (`firm`).
    Incremental,
}

impl Algorithm {
    pub const ALL: [Algorithm; 6] = [
        Algorithm::Exact,
        Algorithm::Realtime,
        Algorithm::Eager,
        Algorithm::LazyStrict,
        Algorithm::LazyRelaxed,
        Algorithm::Incremental,
    ];

    /// Short name accepted by [`FromStr`].
    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Exact => "exact",
            Algorithm::Realtime => "fora",
            Algorithm::Eager => "fora+",
            Algorithm::LazyStrict => "agenda",
            Algorithm::LazyRelaxed => "agenda*",
            Algorithm::Incremental => "firm",
        }
    }

    /// Build an engine; configuration is assumed valid.
    pub fn build(
        self,
        directed: bool,
        node_count: usize,
        edges: &[(usize, usize)],
        config: &PprConfig,
    ) -> Result<Box<dyn PprEngine>> {
        let (n, e, c) = (node_count, edges, config);
        Ok(match self {
            Algorithm::Exact => Box::new(ExactPpr::new(directed, n, e, c)?),
            Algorithm::Realtime => Box::new(Fora::<RealtimeIndex>::new(directed, n, e, c)?),
            Algorithm::Eager => Box::new(Fora::<EagerIndex>::new(directed, n, e, c)?),
            Algorithm::LazyStrict => Box::new(Fora::<StrictLazyIndex>::new(directed, n, e, c)?),
            Algorithm::LazyRelaxed => Box::new(Fora::<RelaxedLazyIndex>::new(directed, n, e, c)?),
            Algorithm::Incremental => Box::new(Fora::<IncrementalIndex>::new(directed, n, e, c)?),
        })
    }

    /// [`Algorithm::build`] after [`PprConfig::validate`].
    pub fn build_checked(
        self,
        directed: bool,
        node_count: usize,
        edges: &[(usize, usize)],
        config: &PprConfig,
    ) -> Result<Box<dyn PprEngine>> {
        config.validate()?;
        self.build(directed, node_count, edges, config)
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_lowercase().as_str() {
            "exact" | "exact_ppr" => Ok(Algorithm::Exact),
            "fora" | "realtime" => Ok(Algorithm::Realtime),
            "fora+" | "eager" => Ok(Algorithm::Eager),
            "agenda" | "lazy" | "lazy_strict" => Ok(Algorithm::LazyStrict),
            "agenda*" | "lazy_relaxed" => Ok(Algorithm::LazyRelaxed),
            "firm" | "incremental" => Ok(Algorithm::Incremental),
            _ => Err(Error::UnknownAlgorithm(value.to_string())),
        }
    }
}

/// One item of an update workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Update {
    /// `k == 0` asks for the full vector, `k > 0` for the top-k list.
    Query { source: usize, k: usize },
    Insert(usize, usize),
    Delete(usize, usize),
}

/// Consumer of query results produced by [`run_updates`].
pub trait ResultSink {
    fn full(&mut self, source: usize, ppr: &[f64]);
    fn topk(&mut self, source: usize, k: usize, nodes: &[usize]);
}

/// Apply `updates` in order, routing query results to `sink`.
///
/// Stops at the first out-of-range id; everything before it has been applied.
pub fn run_updates<E, S>(engine: &mut E, updates: &[Update], sink: &mut S) -> Result<()>
where
    E: PprEngine + ?Sized,
    S: ResultSink + ?Sized,
{
    let start = Instant::now();
    for (i, update) in updates.iter().enumerate() {
        log::debug!("update {i}: {update:?}");
        match *update {
            Update::Query { source, k: 0 } => {
                engine.evaluate_full(source, &mut |ppr| sink.full(source, ppr))?;
            }
            Update::Query { source, k } => {
                engine.evaluate_topk(source, k, &mut |top| sink.topk(source, k, top))?;
            }
            Update::Insert(u, v) => {
                engine.insert_edge(u, v)?;
            }
            Update::Delete(u, v) => {
                engine.delete_edge(u, v)?;
            }
        }
    }
    let timers = engine.timers();
    log::info!(
        "ran {} update(s) in {:?} (update {:?}, evaluate {:?})",
        updates.len(),
        start.elapsed(),
        timers.elapsed(Phase::Update),
        timers.elapsed(Phase::Evaluate),
    );
    Ok(())
}

/// Full vectors for many sources at once, one engine clone per worker thread.
#[cfg(feature = "parallel")]
pub fn evaluate_full_parallel<E>(engine: &E, sources: &[usize]) -> Result<Vec<Vec<f64>>>
where
    E: PprEngine + Clone + Send + Sync,
{
    use rayon::prelude::*;

    sources
        .par_iter()
        .map_init(|| engine.clone(), |local, &s| local.ppr(s))
        .collect()
}
