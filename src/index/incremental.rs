//! Exact incremental maintenance of stored walks.
//!
//! Every walk is kept as an explicit path. Each step after the source is recorded in one
//! back-reference table:
//!
//! - a **hitting** table per `(node, out-edge)` for steps that traversed that edge, or
//! - a **hanging** table per node for steps that could not leave a dangling node.
//!
//! Tables hold `(walk, step)` pairs; a path step holds the index of its own record, and
//! the two always agree. A node's out-edges with at least one hitting record form a
//! contiguous *active* prefix of its adjacency, so a random hitting record can be found
//! without scanning dead edges.
//!
//! On an edge change only walks touching that edge are reverted and resimulated, which
//! keeps every stored walk an exact sample under the current topology.

use std::collections::BTreeMap;

use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::WalkIndex;
use crate::config::{IndexParams, PprConfig};
use crate::graph::{DynamicGraph, GraphRef};
use crate::growable::GrowableArray;
use crate::random_walk::{binomial, walk_length};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Record {
    walk: usize,
    step: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Step {
    /// Node reached at this step; `0` when the walk hung here.
    node: usize,
    /// Index of this step's record in its table, `None` if the step is not live.
    record: Option<usize>,
}

#[derive(Debug, Clone, Default)]
struct Walk {
    source: usize,
    /// Position in `roots[source]` / `endpoints[source]`.
    slot: usize,
    /// `steps[0]` is the source; a full walk has `len()` further steps.
    steps: Vec<Step>,
}

impl Walk {
    fn len(&self) -> usize {
        self.steps.len() - 1
    }
}

/// Free-list backed walk storage. Ids are stable for a walk's lifetime.
#[derive(Debug, Clone, Default)]
struct WalkPool {
    walks: Vec<Walk>,
    free: Vec<usize>,
}

impl WalkPool {
    fn alloc(&mut self, source: usize, slot: usize, len: usize) -> usize {
        let mut steps = vec![Step::default(); len + 1];
        steps[0] = Step { node: source, record: None };
        let walk = Walk { source, slot, steps };
        match self.free.pop() {
            Some(id) => {
                self.walks[id] = walk;
                id
            }
            None => {
                self.walks.push(walk);
                self.walks.len() - 1
            }
        }
    }

    fn release(&mut self, id: usize) {
        self.walks[id] = Walk::default();
        self.free.push(id);
    }
}

impl std::ops::Index<usize> for WalkPool {
    type Output = Walk;

    fn index(&self, id: usize) -> &Walk {
        &self.walks[id]
    }
}

impl std::ops::IndexMut<usize> for WalkPool {
    fn index_mut(&mut self, id: usize) -> &mut Walk {
        &mut self.walks[id]
    }
}

type RecordTable = GrowableArray<Record>;

fn append_record(table: &mut RecordTable, pool: &mut WalkPool, walk: usize, step: usize) {
    let idx = table.push(Record { walk, step });
    pool[walk].steps[step].record = Some(idx);
}

fn remove_record(table: &mut RecordTable, pool: &mut WalkPool, idx: usize) {
    let rec = table[idx];
    debug_assert_eq!(pool[rec.walk].steps[rec.step].record, Some(idx));
    pool[rec.walk].steps[rec.step].record = None;
    table.swap_remove_with(idx, |moved| {
        pool[moved.walk].steps[moved.step].record = Some(idx);
    });
}

fn keep_earliest(pending: &mut BTreeMap<usize, usize>, walk: usize, step: usize) {
    pending.entry(walk).and_modify(|s| *s = (*s).min(step)).or_insert(step);
}

#[derive(Debug, Clone)]
pub struct IncrementalIndex {
    params: IndexParams,
    rng: ChaCha8Rng,
    pool: WalkPool,
    /// Walk ids rooted at each node.
    roots: Vec<Vec<usize>>,
    /// Endpoint of each rooted walk (same layout as `roots`); `0` while unresolved.
    endpoints: Vec<Vec<usize>>,
    /// Size of each node's active out-edge prefix.
    active: Vec<usize>,
    /// Live steps at a node from which the walk continues (hitting + hanging records out of it).
    visits: Vec<usize>,
    hanging: Vec<RecordTable>,
    /// Parallel to the graph's adjacency: `hitting[u][pos]` belongs to `u`'s `pos`-th edge.
    hitting: Vec<GrowableArray<RecordTable>>,
}

impl IncrementalIndex {
    fn set_endpoint(&mut self, walk: usize, node: usize) {
        let w = &self.pool[walk];
        self.endpoints[w.source][w.slot] = node;
    }

    fn hit_node(&mut self, walk: usize, step: usize, v: usize) {
        let w = &mut self.pool[walk];
        w.steps[step].node = v;
        if step < w.len() {
            self.visits[v] += 1;
        } else {
            self.set_endpoint(walk, v);
        }
    }

    fn unhit_node(&mut self, walk: usize, step: usize) {
        let w = &self.pool[walk];
        let v = w.steps[step].node;
        if step < w.len() {
            self.visits[v] -= 1;
        } else {
            self.set_endpoint(walk, 0);
        }
    }

    fn swap_edges(&mut self, graph: &mut DynamicGraph, u: usize, i: usize, j: usize) {
        if i == j {
            return;
        }
        graph.swap_edges(u, i, j);
        self.hitting[u].swap_with(i, j, |_, _| {});
    }

    fn hit_edge(&mut self, graph: &mut DynamicGraph, walk: usize, step: usize, u: usize, pos: usize) {
        let v = graph.neighbor(u, pos);
        append_record(&mut self.hitting[u][pos], &mut self.pool, walk, step);
        let first_hit = self.hitting[u][pos].len() == 1;
        self.hit_node(walk, step, v);

        if first_hit {
            debug_assert!(pos >= self.active[u]);
            self.active[u] += 1;
            let last = self.active[u] - 1;
            self.swap_edges(graph, u, pos, last);
        }
    }

    fn unhit_edge(&mut self, graph: &mut DynamicGraph, u: usize, pos: usize, idx: usize) {
        let rec = self.hitting[u][pos][idx];
        self.unhit_node(rec.walk, rec.step);
        remove_record(&mut self.hitting[u][pos], &mut self.pool, idx);

        if self.hitting[u][pos].is_empty() {
            debug_assert!(pos < self.active[u]);
            self.active[u] -= 1;
            let first_inactive = self.active[u];
            self.swap_edges(graph, u, pos, first_inactive);
        }
    }

    /// Draw steps `from..=len` of `walk`; step `from - 1` must already be placed.
    fn simulate(&mut self, graph: &mut DynamicGraph, walk: usize, from: usize) {
        debug_assert!(from > 0);
        let len = self.pool[walk].len();
        for step in from..=len {
            let u = self.pool[walk].steps[step - 1].node;
            let degree = graph.out_degree(u);
            if degree == 0 {
                log::trace!("walk {walk} hung on {u} at step {step}");
                self.pool[walk].steps[step].node = 0;
                append_record(&mut self.hanging[u], &mut self.pool, walk, step);
                self.set_endpoint(walk, u);
                return;
            }
            let pos = self.rng.random_range(0..degree);
            self.hit_edge(graph, walk, step, u, pos);
        }
    }

    /// Undo every live step of `walk` from its tail back to `from`.
    fn revert(&mut self, graph: &mut DynamicGraph, walk: usize, from: usize) {
        debug_assert!(from > 0);
        let len = self.pool[walk].len();
        for step in (from..=len).rev() {
            let (u, v, record) = {
                let w = &self.pool[walk];
                (w.steps[step - 1].node, w.steps[step].node, w.steps[step].record)
            };
            let Some(idx) = record else { continue };
            log::trace!("walk {walk} reverted at step {step}");
            if v == 0 {
                self.set_endpoint(walk, 0);
                remove_record(&mut self.hanging[u], &mut self.pool, idx);
            } else {
                let Some(pos) = graph.edge_position(u, v) else {
                    panic!("walk {walk} records step {step} over missing edge <{u}, {v}>");
                };
                self.unhit_edge(graph, u, pos, idx);
            }
        }
    }

    fn append_walk(&mut self, graph: &mut DynamicGraph, v: usize) {
        let len = walk_length(self.params.alpha, &mut self.rng);
        let slot = self.roots[v].len();
        let walk = self.pool.alloc(v, slot, len);
        log::trace!("add walk {walk} of length {len} at {v}");
        self.roots[v].push(walk);
        self.endpoints[v].push(0);
        self.hit_node(walk, 0, v);
        self.simulate(graph, walk, 1);
    }

    fn remove_walk(&mut self, graph: &mut DynamicGraph, v: usize) {
        let Some(&walk) = self.roots[v].last() else { return };
        log::trace!("remove walk {walk} at {v}");
        self.revert(graph, walk, 1);
        self.unhit_node(walk, 0);
        self.roots[v].pop();
        self.endpoints[v].pop();
        self.pool.release(walk);
    }

    /// Verify every structural invariant of the pool against `graph`.
    pub fn check_invariants(&self, graph: &DynamicGraph) -> Result<()> {
        let fail = |msg: String| Err(Error::Inconsistent(msg));
        let n = graph.node_count();
        let mut visits = vec![0usize; n + 1];
        let mut live_records = 0usize;

        for v in 1..=n {
            let want = self.params.index_size(graph.out_degree(v));
            if self.roots[v].len() != want || self.endpoints[v].len() != want {
                return fail(format!(
                    "node {v} stores {} walks, index size is {want}",
                    self.roots[v].len()
                ));
            }
            for (slot, &id) in self.roots[v].iter().enumerate() {
                let w = &self.pool[id];
                if w.source != v || w.slot != slot || w.steps.first().map(|s| s.node) != Some(v) {
                    return fail(format!("walk {id} does not belong to slot {slot} of {v}"));
                }
                if w.len() > 0 {
                    visits[v] += 1;
                }
                let mut end = if w.len() == 0 { Some(v) } else { None };
                let mut step = 1;
                while step <= w.len() {
                    let u = w.steps[step - 1].node;
                    let s = w.steps[step];
                    let Some(idx) = s.record else {
                        return fail(format!("walk {id} step {step} is not recorded"));
                    };
                    live_records += 1;
                    if s.node == 0 {
                        if !graph.is_dangling(u) {
                            return fail(format!("walk {id} hangs at non-dangling {u}"));
                        }
                        if self.hanging[u].get(idx) != Some(&Record { walk: id, step }) {
                            return fail(format!("walk {id} step {step} hanging record mismatch"));
                        }
                        end = Some(u);
                        break;
                    }
                    let Some(pos) = graph.edge_position(u, s.node) else {
                        return fail(format!("walk {id} step {step} uses missing edge <{u}, {}>", s.node));
                    };
                    if pos >= self.active[u] {
                        return fail(format!("walk {id} uses inactive edge <{u}, {}>", s.node));
                    }
                    if self.hitting[u][pos].get(idx) != Some(&Record { walk: id, step }) {
                        return fail(format!("walk {id} step {step} hitting record mismatch"));
                    }
                    if step < w.len() {
                        visits[s.node] += 1;
                    } else {
                        end = Some(s.node);
                    }
                    step += 1;
                }
                for tail in step + 1..=w.len() {
                    if w.steps[tail].record.is_some() {
                        return fail(format!("walk {id} has a record past its end at step {tail}"));
                    }
                }
                if end != Some(self.endpoints[v][slot]) {
                    return fail(format!(
                        "walk {id} ends at {end:?}, endpoint table says {}",
                        self.endpoints[v][slot]
                    ));
                }
            }
        }

        let mut table_records = 0usize;
        for u in 1..=n {
            if visits[u] != self.visits[u] {
                return fail(format!("node {u} visit count {} != {}", self.visits[u], visits[u]));
            }
            if !self.hanging[u].is_empty() && !graph.is_dangling(u) {
                return fail(format!("non-dangling node {u} has hanging records"));
            }
            let degree = graph.out_degree(u);
            if self.hitting[u].len() != degree || self.active[u] > degree {
                return fail(format!("node {u} edge tables out of step with adjacency"));
            }
            for pos in 0..degree {
                let used = !self.hitting[u][pos].is_empty();
                if used != (pos < self.active[u]) {
                    return fail(format!("node {u} edge {pos} breaks the active prefix"));
                }
                table_records += self.hitting[u][pos].len();
            }
            table_records += self.hanging[u].len();
        }
        if table_records != live_records {
            return fail(format!("{table_records} table records for {live_records} live steps"));
        }
        Ok(())
    }

    #[cfg(debug_assertions)]
    fn debug_check(&self, graph: &DynamicGraph, what: &str, u: usize, v: usize) {
        if let Err(err) = self.check_invariants(graph) {
            panic!("walk index diverged after {what} <{u}, {v}>: {err}");
        }
    }

    #[cfg(not(debug_assertions))]
    fn debug_check(&self, _graph: &DynamicGraph, _what: &str, _u: usize, _v: usize) {}
}

impl WalkIndex for IncrementalIndex {
    fn build(graph: &mut DynamicGraph, _directed: bool, config: &PprConfig) -> Self {
        let n = graph.node_count();
        let mut hitting = Vec::with_capacity(n + 1);
        for v in 0..=n {
            let mut tables = GrowableArray::new();
            for _ in 0..graph.out_degree(v) {
                tables.push(RecordTable::new());
            }
            hitting.push(tables);
        }
        let mut index = Self {
            params: IndexParams::new(config, n),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            pool: WalkPool::default(),
            roots: vec![Vec::new(); n + 1],
            endpoints: vec![Vec::new(); n + 1],
            active: vec![0; n + 1],
            visits: vec![0; n + 1],
            hanging: vec![RecordTable::new(); n + 1],
            hitting,
        };
        for v in 1..=n {
            for _ in 0..index.params.index_size(graph.out_degree(v)) {
                index.append_walk(graph, v);
            }
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

    fn on_insert(&mut self, graph: &mut DynamicGraph, u: usize, v: usize, pos: usize) {
        self.hitting[u].push(RecordTable::new());
        let degree = graph.out_degree(u);
        debug_assert_eq!(pos, degree - 1);
        let visits = self.visits[u];
        let mut pending = BTreeMap::new();

        if degree == 1 {
            // Every visit was stuck here; the new edge is the only way on.
            debug_assert_eq!(self.hanging[u].len(), visits);
            log::debug!("resuming {visits} hung walk(s) at {u}");
            while let Some(&rec) = self.hanging[u].last() {
                let idx = self.hanging[u].len() - 1;
                keep_earliest(&mut pending, rec.walk, rec.step);
                self.set_endpoint(rec.walk, 0);
                remove_record(&mut self.hanging[u], &mut self.pool, idx);
            }
        } else if visits > 0 {
            // Each existing step out of `u` would have picked the new edge w.p. 1/degree.
            debug_assert!(self.hanging[u].is_empty());
            let picks = binomial(visits, 1.0 / degree as f64, &mut self.rng);
            let mut chosen = sample(&mut self.rng, visits, picks).into_vec();
            chosen.sort_unstable();

            let mut selected = Vec::with_capacity(picks);
            let mut next = chosen.into_iter().peekable();
            let mut base = 0;
            for p in 0..self.active[u] {
                let table = &self.hitting[u][p];
                while let Some(&k) = next.peek() {
                    if k >= base + table.len() {
                        break;
                    }
                    selected.push(table[k - base]);
                    next.next();
                }
                base += table.len();
            }
            log::debug!("migrating {} of {visits} step(s) out of {u}", selected.len());

            for rec in selected {
                keep_earliest(&mut pending, rec.walk, rec.step);
                let s = self.pool[rec.walk].steps[rec.step];
                let (Some(idx), Some(p)) = (s.record, graph.edge_position(u, s.node)) else {
                    panic!("sampled step {} of walk {} is not live", rec.step, rec.walk);
                };
                self.unhit_edge(graph, u, p, idx);
            }
            for (&walk, &step) in &pending {
                self.revert(graph, walk, step);
            }
        }

        for (&walk, &step) in &pending {
            // The new edge may have been moved into the active prefix by an earlier walk.
            let Some(p) = graph.edge_position(u, v) else {
                panic!("inserted edge <{u}, {v}> missing from graph");
            };
            self.hit_edge(graph, walk, step, u, p);
            self.simulate(graph, walk, step + 1);
        }

        while self.roots[u].len() < self.params.index_size(degree) {
            self.append_walk(graph, u);
        }
        self.debug_check(graph, "inserting", u, v);
    }

    fn on_delete(&mut self, graph: &mut DynamicGraph, u: usize, v: usize, pos: usize) {
        let mut pending = BTreeMap::new();
        log::debug!("tracing {} walk step(s) over <{u}, {v}>", self.hitting[u][pos].len());
        while let Some(&rec) = self.hitting[u][pos].last() {
            let idx = self.hitting[u][pos].len() - 1;
            keep_earliest(&mut pending, rec.walk, rec.step);
            self.unhit_node(rec.walk, rec.step);
            remove_record(&mut self.hitting[u][pos], &mut self.pool, idx);
        }
        // Mirror the graph's swap-removal.
        self.hitting[u].swap_remove_with(pos, |_| {});

        let degree = graph.out_degree(u);
        debug_assert!(self.active[u] <= degree + 1);
        if self.active[u] == degree + 1 {
            self.active[u] -= 1;
        } else if pos < self.active[u] {
            // An inactive edge was moved into the active prefix; push it back out.
            self.active[u] -= 1;
            let first_inactive = self.active[u];
            self.swap_edges(graph, u, pos, first_inactive);
        }

        for (&walk, &step) in &pending {
            self.revert(graph, walk, step);
            self.simulate(graph, walk, step);
        }

        while self.roots[u].len() > self.params.index_size(degree) {
            self.remove_walk(graph, u);
        }
        self.debug_check(graph, "deleting", u, v);
    }

    fn stored_walks(&self) -> usize {
        self.roots.iter().map(Vec::len).sum()
    }
}
