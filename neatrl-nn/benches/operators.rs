use criterion::{black_box, criterion_group, criterion_main, Criterion};
use neatrl_nn::genomics::{ActivationType, GeneticConfig, History, NNGenome};
use neatrl_nn::networks::Network;

use std::num::NonZeroUsize;

fn config() -> GeneticConfig {
    GeneticConfig {
        input_count: NonZeroUsize::new(8).unwrap(),
        output_count: NonZeroUsize::new(2).unwrap(),
        bias: true,
        activation_types: vec![ActivationType::Tanh, ActivationType::ReLU],
        initial_connection_density: 1.0,
        weight_init_range: 1.0,
        weight_bound: 5.0,
        weight_perturb_chance: 0.8,
        weight_perturb_power: 0.5,
        weight_replace_chance: 0.1,
        disable_inherited_chance: 0.75,
        edge_addition_chance: 0.5,
        node_addition_chance: 0.2,
        max_edge_addition_attempts: 20,
        recurrence_chance: 0.2,
        excess_coefficient: 1.0,
        disjoint_coefficient: 1.0,
        weight_coefficient: 0.5,
        distance_normalization_threshold: 20,
        ..GeneticConfig::zero()
    }
}

/// Grows a genome through a few hundred mutations.
fn grown(config: &GeneticConfig, history: &mut History) -> NNGenome {
    let mut genome = NNGenome::new(config);
    for _ in 0..300 {
        genome.mutate(history, config);
    }
    genome
}

fn bench(bench: &mut Criterion) {
    let config = config();
    let mut history = History::new(&config);
    let left = grown(&config, &mut history);
    let right = grown(&config, &mut history);

    bench.bench_function("genome-mutate", |b| {
        b.iter(|| left.clone().mutate(&mut history, &config))
    });
    bench.bench_function("genome-crossover", |b| {
        b.iter(|| NNGenome::crossover(black_box(&left), black_box(&right), &config))
    });
    bench.bench_function("genome-distance", |b| {
        b.iter(|| NNGenome::compatibility_distance(black_box(&left), black_box(&right), &config))
    });
    bench.bench_function("network-build", |b| b.iter(|| Network::new(black_box(&left))));

    let mut network = Network::new(&left);
    let inputs = [0.7, 0.3, -0.2, 0.0, 1.0, -1.0, 0.5, 0.25];
    bench.bench_function("network-activate", |b| {
        b.iter(|| network.activate(black_box(&inputs)))
    });
}

criterion_group!(
  name = benches;
  config = Criterion::default().sample_size(50).significance_level(0.1);
  targets = bench
);
criterion_main!(benches);
