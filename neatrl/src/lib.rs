//! An implementation of NeuroEvolution of Augmenting Topologies
//! for reinforcement-learning control tasks, following the 2002 paper:
//! <http://nn.cs.utexas.edu/keyword?stanley:ec02>
//!
//! The engine is generic over the genome representation through the
//! [`Genome`] trait: speciation, fitness sharing, stagnation tracking
//! and reproduction never look inside a genome. A neural-network
//! genome, as in the original algorithm, is supplied by the
//! `neatrl-nn` crate.
//!
//! Genomes are scored either by a plain evaluation closure or by
//! playing episodes in an [`Environment`], with a [`Policy`] built
//! from each genome.
//!
//! # Example usage: balancing an output around a target
//! ```
//! use neatrl::{Population, PopulationConfig, Termination};
//! use neatrl_nn::genomics::{ActivationType, GeneticConfig, NNGenome};
//! use std::num::NonZeroUsize;
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
//!     edge_addition_chance: 0.2,
//!     node_addition_chance: 0.05,
//!     max_edge_addition_attempts: 20,
//!     excess_coefficient: 1.0,
//!     disjoint_coefficient: 1.0,
//!     weight_coefficient: 0.5,
//!     distance_normalization_threshold: 20,
//!     ..GeneticConfig::zero()
//! };
//! let population_config = PopulationConfig {
//!     size: NonZeroUsize::new(30).unwrap(),
//!     distance_threshold: 3.0,
//!     elitism: 1,
//!     survival_threshold: 0.2,
//!     crossover_chance: 0.75,
//!     stagnation_limit: 15,
//!     min_fitness_range: 1.0,
//!     generation_budget: NonZeroUsize::new(10).unwrap(),
//!     fitness_threshold: Some(0.99),
//!     ..PopulationConfig::zero()
//! };
//!
//! let mut population = Population::<_, _, NNGenome>::new(population_config, genetic_config)
//!     .expect("valid configuration");
//!
//! // Reward outputs close to 0.75.
//! let termination = population
//!     .run(|genome| 1.0 - (genome.evaluate(&[0.5, -0.5])[0] - 0.75).abs())
//!     .expect("evolution succeeds");
//!
//! match termination {
//!     Termination::Solved { generation, fitness } => {
//!         println!("solved in generation {} with fitness {}", generation, fitness)
//!     }
//!     Termination::BudgetExhausted { .. } => println!("not solved"),
//! }
//! assert!(population.best_genome().is_some());
//! ```
mod environment;
mod errors;
mod genome;
mod populations;

pub use environment::{mean_episode_reward, run_episode, Environment, Policy, Step};
pub use errors::{check_probability, ConfigurationError, EnvironmentError, EvolutionError};
pub use genome::{Genome, InnovationHistory};
pub use populations::{
    logging, Population, PopulationConfig, SelectionPolicy, Species, SpeciesID, SpeciesRegistry,
    Termination,
};
