use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tower_climb::generation::{GenerationConfig, MapGenerator, TopologyType};
use tower_climb::player::StaticProfile;
use tower_climb::progress::MemoryStore;
use tower_climb::{TowerConfig, TowerManager};

fn bench_topologies(c: &mut Criterion) {
    let generator = MapGenerator::new();
    let mut group = c.benchmark_group("generate_topology");
    for topology_type in TopologyType::ALL {
        let config = GenerationConfig::default()
            .with_topology(topology_type)
            .with_seed(42);
        group.bench_with_input(
            BenchmarkId::from_parameter(topology_type.as_str()),
            &config,
            |b, config| b.iter(|| generator.generate(black_box(config))),
        );
    }
    group.finish();
}

fn bench_large_network(c: &mut Criterion) {
    let generator = MapGenerator::new();
    let config = GenerationConfig::default()
        .with_topology(TopologyType::Network)
        .with_layers(12, 5)
        .with_seed(7);
    c.bench_function("generate_network_12x5", |b| {
        b.iter(|| generator.generate(black_box(&config)))
    });
}

fn bench_validation(c: &mut Criterion) {
    let topology = MapGenerator::new().generate(
        &GenerationConfig::default()
            .with_topology(TopologyType::Grid)
            .with_seed(9),
    );
    c.bench_function("validate_grid", |b| {
        b.iter(|| black_box(&topology).validate())
    });
}

fn bench_enter_floor(c: &mut Criterion) {
    c.bench_function("manager_enter_floor_1", |b| {
        b.iter(|| {
            let mut manager = TowerManager::new(
                TowerConfig {
                    tower_seed: 42,
                    ..TowerConfig::default()
                },
                Box::new(MemoryStore::default()),
                Box::new(StaticProfile::default()),
            );
            manager.enter_floor(black_box(1));
            manager.drain_events()
        })
    });
}

criterion_group!(
    benches,
    bench_topologies,
    bench_large_network,
    bench_validation,
    bench_enter_floor,
);
criterion_main!(benches);
