use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;
use stepwise_astar::{SearchEngine, SearchRequest};

fn random_grid_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("random grid search");
    for n in [16, 64, 128] {
        let requests = (0..16)
            .map(|seed| {
                SearchRequest::new(n, n)
                    .with_block_probability(0.25)
                    .with_seed(seed)
            })
            .collect::<Vec<_>>();
        let grids = requests
            .iter()
            .map(|r| r.build_grid().unwrap())
            .collect::<Vec<_>>();
        group.bench_with_input(BenchmarkId::new("run_to_completion", n), &grids, |b, grids| {
            b.iter(|| {
                let mut engine = SearchEngine::new();
                for grid in grids {
                    engine.start(grid.clone());
                    black_box(engine.run_to_completion().unwrap());
                }
            })
        });
        group.bench_with_input(BenchmarkId::new("build_grid", n), &requests, |b, requests| {
            b.iter(|| {
                for request in requests {
                    black_box(request.build_grid().unwrap());
                }
            })
        });
    }
    group.finish();
}

criterion_group!(benches, random_grid_bench);
criterion_main!(benches);
