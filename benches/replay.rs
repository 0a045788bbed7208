//! Benchmarks for timeline replay and checkpoint lookup.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use reelbox::{
    Frame, Sandbox, SandboxConfig, Seed,
    engine::{CheckpointStore, CompressionType},
};

const ORBITS: &str = r#"
    fn init() {
        this.phase = rand(0.0, 6.28);
    }
    fn update(dt) {
        this.phase += 0.05 * dt;
    }
    fn draw(surface) {
        surface.clear(0.05, 0.05, 0.1);
        for i in 0..8 {
            let a = this.phase + i * 0.785;
            surface.color(0.5 + 0.5 * a.sin(), 0.4, 0.9);
            surface.circle(3.0 * a.cos(), 3.0 * a.sin(), 0.4);
        }
    }
"#;

fn sandbox(size: usize) -> Sandbox<reelbox::Canvas> {
    let config = SandboxConfig {
        width: size,
        height: size,
        ..SandboxConfig::default()
    };
    let mut sandbox = Sandbox::scripted_with_seed(config, Seed::from(0.5)).unwrap();
    sandbox.load(ORBITS).unwrap();
    sandbox
}

fn bench_simulate_to(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulate_to");
    group.sample_size(20);

    for target in [10.0, 100.0, 500.0] {
        let mut sandbox = sandbox(128);
        group.bench_with_input(BenchmarkId::from_parameter(target), &target, |b, &t| {
            b.iter(|| sandbox.seek_to(black_box(t)).unwrap());
        });
    }

    group.finish();
}

fn bench_surface_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("replay_100_steps");
    group.sample_size(10);

    for size in [64, 256, 1024] {
        let mut sandbox = sandbox(size);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}x{}", size, size)),
            &size,
            |b, _| {
                b.iter(|| sandbox.seek_to(100.0).unwrap());
            },
        );
    }

    group.finish();
}

fn bench_checkpoint_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("nearest_prior");

    for count in [10, 100, 1000] {
        let mut store = CheckpointStore::new(CompressionType::None);
        let frame = Frame::blank(8, 8);
        for i in 0..count {
            store.record(i as f64 * 10.0, i * 10, frame.clone());
        }
        let query = count as f64 * 5.0 + 3.0;
        group.bench_with_input(BenchmarkId::from_parameter(count), &query, |b, &q| {
            b.iter(|| black_box(store.nearest_prior_or_equal(black_box(q)).map(|c| c.time())));
        });
    }

    group.finish();
}

fn bench_export(c: &mut Criterion) {
    let mut sandbox = sandbox(512);
    sandbox.seek_to(50.0).unwrap();
    c.bench_function("export_png_512", |b| {
        b.iter(|| black_box(sandbox.export_png().unwrap()));
    });
}

criterion_group!(
    benches,
    bench_simulate_to,
    bench_surface_size,
    bench_checkpoint_lookup,
    bench_export
);
criterion_main!(benches);
