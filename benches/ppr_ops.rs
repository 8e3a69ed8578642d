//! Benchmarks for queries and edge updates across engine variants.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::prelude::*;
use rand::SeedableRng;
use std::hint::black_box;

use dynppr::{Algorithm, PprConfig, PprEngine};

/// Undirected edge lists over node ids `1..=n`.
struct EdgeList;

impl EdgeList {
    fn ring(n: usize) -> Vec<(usize, usize)> {
        (1..=n).map(|v| (v, v % n + 1)).collect()
    }

    /// Preferential attachment graph (Barabási–Albert) with `m` edges per new node.
    ///
    /// This yields a heavy-tailed degree distribution that’s closer to many real graphs
    /// than a ring.
    fn barabasi_albert(n: usize, m: usize, seed: u64) -> Vec<(usize, usize)> {
        assert!(n > m && m >= 1);
        let mut rng = StdRng::seed_from_u64(seed);
        let mut edges = Vec::new();
        let mut targets: Vec<usize> = Vec::new(); // node ids repeated by degree

        // Start with a clique of size m+1.
        let init = m + 1;
        for i in 1..=init {
            for j in (i + 1)..=init {
                edges.push((i, j));
                targets.push(i);
                targets.push(j);
            }
        }
        for v in (init + 1)..=n {
            let mut chosen: Vec<usize> = Vec::with_capacity(m);
            while chosen.len() < m {
                let u = targets[rng.random_range(0..targets.len())];
                if !chosen.contains(&u) {
                    chosen.push(u);
                }
            }
            for &u in &chosen {
                edges.push((u, v));
                targets.push(u);
                targets.push(v);
            }
        }
        edges
    }

    /// Simple stochastic block model: `blocks` equal-sized communities.
    fn sbm(n: usize, blocks: usize, p_in: f64, p_out: f64, seed: u64) -> Vec<(usize, usize)> {
        let mut rng = StdRng::seed_from_u64(seed);
        let bsz = n.div_ceil(blocks);
        let mut edges = Vec::new();
        for i in 1..=n {
            for j in (i + 1)..=n {
                let same = (i - 1) / bsz == (j - 1) / bsz;
                let p = if same { p_in } else { p_out };
                if rng.random::<f64>() < p {
                    edges.push((i, j));
                }
            }
        }
        edges
    }
}

const VARIANTS: [Algorithm; 5] = [
    Algorithm::Realtime,
    Algorithm::Eager,
    Algorithm::LazyStrict,
    Algorithm::LazyRelaxed,
    Algorithm::Incremental,
];

fn bench_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("query");
    let cfg = PprConfig::default();

    for n in [1_000usize, 10_000] {
        let graphs = [
            ("ring", EdgeList::ring(n)),
            ("ba_m4", EdgeList::barabasi_albert(n, 4, 123)),
            ("sbm4", EdgeList::sbm(n, 4, 0.02, 0.002, 123)),
        ];
        for (name, edges) in &graphs {
            for alg in VARIANTS {
                let mut engine = alg.build(false, n, edges, &cfg).unwrap();
                group.bench_with_input(BenchmarkId::new(format!("{name}/{alg}/full"), n), &n, |b, _| {
                    b.iter(|| engine.evaluate_full(black_box(1), &mut |ppr| {
                        black_box(ppr);
                    }))
                });
                group.bench_with_input(BenchmarkId::new(format!("{name}/{alg}/top50"), n), &n, |b, _| {
                    b.iter(|| engine.evaluate_topk(black_box(1), 50, &mut |top| {
                        black_box(top);
                    }))
                });
            }
        }
    }

    group.finish();
}

fn bench_updates(c: &mut Criterion) {
    let mut group = c.benchmark_group("update");
    let cfg = PprConfig::default();
    let n = 5_000usize;
    let edges = EdgeList::barabasi_albert(n, 4, 7);

    for alg in VARIANTS {
        // Delete-then-reinsert keeps the graph stationary across iterations.
        let mut engine = alg.build(false, n, &edges, &cfg).unwrap();
        let mut rng = StdRng::seed_from_u64(99);
        group.bench_function(BenchmarkId::new("ba_m4", alg), |b| {
            b.iter(|| {
                let (u, v) = edges[rng.random_range(0..edges.len())];
                engine.delete_edge(u, v).unwrap();
                engine.insert_edge(u, v).unwrap();
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_queries, bench_updates);
criterion_main!(benches);
