use contact_score::grid::SpatialIndex;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nalgebra::Vector3;

/// Deterministic cloud with roughly protein-like density inside a 40 Å box
fn point_cloud(n: usize) -> Vec<Vector3<f64>> {
    let mut state: u64 = 0x2545_f491_4f6c_dd1d;
    let mut next = move || {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (state >> 11) as f64 / (1u64 << 53) as f64 * 40.0
    };
    (0..n).map(|_| Vector3::new(next(), next(), next())).collect()
}

fn bench_index_build(c: &mut Criterion) {
    let points = point_cloud(5000);

    c.bench_function("index_build", |b| {
        b.iter(|| black_box(SpatialIndex::build(&points)))
    });
}

fn bench_neighbor_query(c: &mut Criterion) {
    let points = point_cloud(5000);
    let index = SpatialIndex::build(&points);
    let query = Vector3::new(20.0, 20.0, 20.0);

    c.bench_function("neighbors_8A", |b| {
        b.iter(|| black_box(index.neighbors(&query, 8.0)))
    });

    c.bench_function("neighbors_15A", |b| {
        b.iter(|| black_box(index.neighbors(&query, 15.0)))
    });
}

criterion_group!(grid_benches, bench_index_build, bench_neighbor_query);
criterion_main!(grid_benches);
