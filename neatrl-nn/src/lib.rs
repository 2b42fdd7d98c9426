//! # neatrl-nn
//! A neural network-based implementation of the `neatrl` crate's `Genome` trait.
//!
//! Provides an [`NNGenome`] type usable in `neatrl` `Population`s, its
//! shared innovation [`History`], and a [`Network`] phenotype which can be
//! generated from an [`NNGenome`]. Networks keep the values of recurrent
//! connections between activations, which suits real-time control tasks
//! with a new observation at every time-step, and act as `neatrl` `Policy`s.
//!
//! [`NNGenome`]: crate::genomics::NNGenome
//! [`History`]: crate::genomics::History
//! [`Network`]: crate::networks::Network
//!
//! # Example usage: Evolution of XOR function approximator
//! ```
//! use neatrl::{Population, PopulationConfig};
//! use neatrl_nn::{
//!     genomics::{ActivationType, GeneticConfig, NNGenome},
//!     networks::Network,
//! };
//! use std::num::NonZeroUsize;
//!
//! fn evaluate_xor(genome: &NNGenome) -> f32 {
//!     let mut network = Network::new(genome);
//!
//!     let values = [
//!         ([0.0, 0.0], 0.0),
//!         ([0.0, 1.0], 1.0),
//!         ([1.0, 0.0], 1.0),
//!         ([1.0, 1.0], 0.0),
//!     ];
//!
//!     let mut error = 0.0;
//!     for (input, output) in values.iter() {
//!         network.clear_state();
//!         error += (network.activate(input)[0] - output).powi(2);
//!     }
//!     4.0 - error
//! }
//!
//! let genetic_config = GeneticConfig {
//!     input_count: NonZeroUsize::new(2).unwrap(),
//!     output_count: NonZeroUsize::new(1).unwrap(),
//!     bias: true,
//!     activation_types: vec![ActivationType::Sigmoid],
//!     output_activation_types: vec![ActivationType::Sigmoid],
//!     initial_connection_density: 1.0,
//!     weight_init_range: 1.0,
//!     weight_bound: 8.0,
//!     weight_perturb_chance: 0.8,
//!     weight_perturb_power: 0.5,
//!     weight_replace_chance: 0.1,
//!     disable_inherited_chance: 0.75,
//!     edge_addition_chance: 0.3,
//!     node_addition_chance: 0.03,
//!     max_edge_addition_attempts: 20,
//!     excess_coefficient: 1.0,
//!     disjoint_coefficient: 1.0,
//!     weight_coefficient: 0.5,
//!     distance_normalization_threshold: 20,
//!     ..GeneticConfig::zero()
//! };
//!
//! let population_config = PopulationConfig {
//!     size: NonZeroUsize::new(150).unwrap(),
//!     distance_threshold: 3.0,
//!     elitism: 1,
//!     survival_threshold: 0.2,
//!     crossover_chance: 0.75,
//!     interspecies_mating_chance: 0.001,
//!     stagnation_limit: 15,
//!     min_fitness_range: 1.0,
//!     ..PopulationConfig::zero()
//! };
//!
//! let mut population = Population::<_, _, NNGenome>::new(population_config, genetic_config)
//!     .unwrap();
//! for _ in 0..20 {
//!     population.evaluate_fitness(evaluate_xor);
//!     if population.champion().unwrap().fitness() > 3.9 {
//!         println!("Solution found!: {}", serde_json::to_string(population.champion().unwrap()).unwrap());
//!         break;
//!     }
//!     if let Err(e) = population.evolve() {
//!         eprintln!("{}", e);
//!         break;
//!     }
//! }
//! ```

pub mod genomics;
pub mod networks;

/// Identifier type used to designate historically
/// identical mutations for the purposes of
/// genome comparison and genetic tracking.
pub type Innovation = usize;
