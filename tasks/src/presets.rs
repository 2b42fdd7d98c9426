//! Hyperparameter presets for the bundled tasks.
use neatrl::{PopulationConfig, SelectionPolicy};
use neatrl_nn::genomics::{ActivationType, GeneticConfig};

use std::num::NonZeroUsize;

/// Everything needed to run a task.
#[derive(Clone, Debug)]
pub struct Preset {
    pub name: &'static str,
    pub population: PopulationConfig,
    pub genetic: GeneticConfig,
    /// Steps per episode.
    pub step_limit: usize,
}

fn genetic_defaults(inputs: usize, outputs: usize) -> GeneticConfig {
    GeneticConfig {
        input_count: NonZeroUsize::new(inputs).unwrap_or(NonZeroUsize::MIN),
        output_count: NonZeroUsize::new(outputs).unwrap_or(NonZeroUsize::MIN),
        bias: true,
        activation_types: vec![
            ActivationType::Sigmoid,
            ActivationType::Tanh,
            ActivationType::ReLU,
            ActivationType::Abs,
            ActivationType::Identity,
            ActivationType::Gaussian,
            ActivationType::Sinusoidal,
        ],
        output_activation_types: vec![ActivationType::Sigmoid; outputs],
        initial_connection_density: 1.0,
        weight_init_range: 1.0,
        weight_bound: 8.0,
        weight_perturb_chance: 0.8,
        weight_perturb_power: 0.5,
        weight_replace_chance: 0.1,
        enabled_toggle_chance: 0.01,
        disable_inherited_chance: 0.75,
        edge_addition_chance: 0.3,
        node_addition_chance: 0.3,
        edge_deletion_chance: 0.2,
        node_deletion_chance: 0.2,
        activation_mutation_chance: 0.2,
        max_edge_addition_attempts: 20,
        recurrence_chance: 0.0,
        excess_coefficient: 1.0,
        disjoint_coefficient: 1.0,
        weight_coefficient: 0.5,
        distance_normalization_threshold: 20,
    }
}

fn population_defaults(size: usize) -> PopulationConfig {
    PopulationConfig {
        size: NonZeroUsize::new(size).unwrap_or(NonZeroUsize::MIN),
        distance_threshold: 3.0,
        elitism: 2,
        elitism_min_species_size: 2,
        survival_threshold: 0.2,
        selection: SelectionPolicy::Truncation,
        crossover_chance: 1.0,
        interspecies_mating_chance: 0.0,
        stagnation_limit: 15,
        min_fitness_range: 1.0,
        episodes: NonZeroUsize::MIN,
        generation_budget: NonZeroUsize::new(200).unwrap_or(NonZeroUsize::MIN),
        fitness_threshold: None,
    }
}

/// Two inputs, one output, solved at an episode return of 4 - 1e-3.
pub fn xor() -> Preset {
    Preset {
        name: "xor",
        population: PopulationConfig {
            fitness_threshold: Some(crate::xor::MAX_REWARD - 1e-3),
            ..population_defaults(250)
        },
        genetic: genetic_defaults(2, 1),
        step_limit: 4,
    }
}

/// Four observations, one push direction, averaged over five episodes.
pub fn cartpole() -> Preset {
    Preset {
        name: "cartpole",
        population: PopulationConfig {
            episodes: NonZeroUsize::new(5).unwrap_or(NonZeroUsize::MIN),
            fitness_threshold: Some(475.0),
            ..population_defaults(250)
        },
        genetic: GeneticConfig {
            recurrence_chance: 0.2,
            ..genetic_defaults(4, 1)
        },
        step_limit: 500,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_valid() {
        for preset in [xor(), cartpole()] {
            assert_eq!(preset.population.validate(), Ok(()), "{}", preset.name);
            assert_eq!(preset.genetic.validate(), Ok(()), "{}", preset.name);
        }
    }

    #[test]
    fn cartpole_matches_environment_shape() {
        let preset = cartpole();
        assert_eq!(preset.genetic.input_count.get(), 4);
        assert_eq!(preset.genetic.output_count.get(), 1);
        assert_eq!(preset.population.episodes.get(), 5);
    }
}
