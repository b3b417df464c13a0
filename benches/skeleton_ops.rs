//! Benchmarks for skeleton and hull construction.

use criterion::{criterion_group, criterion_main, Criterion};

use armature::prelude::*;
use nalgebra::Point3;

fn star_lines(k: usize) -> Vec<[Point3<f64>; 2]> {
    let o = Point3::origin();
    (0..k)
        .map(|i| {
            let angle = std::f64::consts::TAU * i as f64 / k as f64;
            [o, Point3::new(angle.cos(), angle.sin(), 0.0)]
        })
        .collect()
}

/// Deterministic points spiralling over the unit sphere.
fn sphere_points(n: usize) -> Vec<Point3<f64>> {
    let golden = std::f64::consts::PI * (3.0 - 5.0_f64.sqrt());
    (0..n)
        .map(|i| {
            let y = 1.0 - 2.0 * (i as f64 + 0.5) / n as f64;
            let r = (1.0 - y * y).sqrt();
            let theta = golden * i as f64;
            Point3::new(r * theta.cos(), y, r * theta.sin())
        })
        .collect()
}

fn bench_skeleton_build(c: &mut Criterion) {
    let lines = star_lines(64);
    c.bench_function("skeleton_star_64", |b| {
        b.iter(|| Skeleton::from_lines(&lines).unwrap())
    });
}

fn bench_width_update(c: &mut Criterion) {
    let mut skeleton = Skeleton::from_lines(&star_lines(64)).unwrap();
    c.bench_function("width_update_star_64", |b| {
        b.iter(|| {
            skeleton.set_node_width(0.3);
            skeleton.update_mesh_vertices().unwrap();
        })
    });
}

fn bench_convex_hull(c: &mut Criterion) {
    let points = sphere_points(256);
    c.bench_function("convex_hull_sphere_256", |b| {
        b.iter(|| convex_hull(&points, &[]).unwrap())
    });
}

criterion_group!(
    benches,
    bench_skeleton_build,
    bench_width_update,
    bench_convex_hull
);
criterion_main!(benches);
