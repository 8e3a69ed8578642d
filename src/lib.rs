//! `dynppr`: Personalized PageRank on graphs whose edges change over time.
//!
//! Queries run FORA-style forward push and correct the unpushed residual with sampled
//! random walks. The walks come from one of four index schemes that differ only in how
//! they stay valid under edge updates (see [`index`]). [`ExactPpr`] is the round-bounded
//! ground truth.
//!
//! Public invariants (must not drift):
//! - **Node ids**: `1..=n`; id `0` is reserved and every vector is indexed by id (entry 0
//!   unused).
//! - **Update order**: the graph is mutated first, then the index is told the edge's
//!   final position.
//! - **Determinism**: every engine is deterministic given identical inputs, config and seed.
//! - **Not reentrant**: engines reuse scratch buffers; serialize calls on one instance.
//!
//! Swappable (allowed to change without breaking the contract):
//! - the walk index scheme behind a [`Fora`] engine
//! - internal data structures (so long as invariants hold)

pub mod config;
pub mod engine;
pub mod exact;
pub mod fora;
pub mod graph;
pub mod growable;
pub mod index;
pub mod queue;
pub mod random_walk;
pub mod sparse;
pub mod timer;
pub mod topk;

pub use config::{IndexParams, PprConfig};
#[cfg(feature = "parallel")]
pub use engine::evaluate_full_parallel;
pub use engine::{run_updates, Algorithm, ExperimentConfigs, PprEngine, ResultSink, Update};
pub use exact::{ExactPpr, ExactPropagation};
pub use fora::Fora;
pub use graph::{DynamicGraph, GraphRef};
pub use growable::GrowableArray;
pub use index::{
    EagerIndex, IncrementalIndex, LazyIndex, RealtimeIndex, RelaxedLazyIndex, ResidualView,
    StrictLazyIndex, WalkIndex,
};
pub use queue::DedupQueue;
pub use sparse::SparseVector;
pub use timer::{Phase, PhaseTimers};
pub use topk::{top_k, top_k_by};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("node {node} out of range 1..={node_count}")]
    NodeOutOfRange { node: usize, node_count: usize },
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("unknown algorithm: {0}")]
    UnknownAlgorithm(String),
    #[error("inconsistent index: {0}")]
    Inconsistent(String),
}

pub type Result<T> = std::result::Result<T, Error>;
