use crate::errors::check_probability;
use crate::ConfigurationError;

use serde::{Deserialize, Serialize};

use std::num::NonZeroUsize;

/// How parents are drawn from a species' selection pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionPolicy {
    /// Uniform choice among the pool.
    Truncation,
    /// Choice weighted by (shifted) raw fitness.
    FitnessProportionate,
}

/// Configuration data for population generation
/// and evolution.
///
/// # Note
/// All quantities expressing probabilities
/// should be in the range [0.0, 1.0]. This is
/// checked by [`validate`] when a population is
/// created.
///
/// [`validate`]: PopulationConfig::validate
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Size of the population.
    pub size: NonZeroUsize,
    /// Compatibility distance threshold, at or beyond
    /// which genomes belong to different species.
    pub distance_threshold: f32,
    /// Top n of each species which is copied
    /// as-is to the next generation.
    pub elitism: usize,
    /// Species must have more members than this
    /// for their elite to be copied.
    pub elitism_min_species_size: usize,
    /// Top % of each species which can participate
    /// in mating.
    pub survival_threshold: f32,
    /// Parent selection policy within the surviving fraction.
    pub selection: SelectionPolicy,
    /// Chance that offspring will be the result
    /// of crossover (as opposed to cloning).
    pub crossover_chance: f32,
    /// Chance that the second parent is drawn
    /// from a different species.
    pub interspecies_mating_chance: f32,
    /// Number of generations without improvement
    /// a species may go through before it is
    /// denied offspring.
    pub stagnation_limit: usize,
    /// Lower bound on the fitness range used to
    /// normalize fitnesses before sharing.
    pub min_fitness_range: f32,
    /// Episodes averaged per genome when evaluating
    /// in an environment.
    pub episodes: NonZeroUsize,
    /// Maximum number of evaluated generations in a run.
    pub generation_budget: NonZeroUsize,
    /// Best-ever fitness at which a run is solved.
    pub fitness_threshold: Option<f32>,
}

impl PopulationConfig {
    /// Returns a "zero-valued" default configuration.
    /// All values are 0, empty, `None`, or in the
    /// case of `NonZeroUsize`s, 1.
    ///
    /// # Note
    /// This value is not suitable for use in most experiments.
    /// It is meant as a way to abbreviate configuration
    /// instantiation, or to fill in unused values.
    ///
    /// # Examples
    /// ```
    /// use neatrl::PopulationConfig;
    ///
    /// let cfg1 = PopulationConfig::zero();
    ///
    /// let cfg2 = PopulationConfig {
    ///     // Specify some values here...
    ///     crossover_chance: 0.75,
    ///     // Default the rest...
    ///     ..PopulationConfig::zero()
    /// };
    /// ```
    pub const fn zero() -> PopulationConfig {
        PopulationConfig {
            size: NonZeroUsize::MIN,
            distance_threshold: 0.0,
            elitism: 0,
            elitism_min_species_size: 0,
            survival_threshold: 0.0,
            selection: SelectionPolicy::Truncation,
            crossover_chance: 0.0,
            interspecies_mating_chance: 0.0,
            stagnation_limit: 0,
            min_fitness_range: 0.0,
            episodes: NonZeroUsize::MIN,
            generation_budget: NonZeroUsize::MIN,
            fitness_threshold: None,
        }
    }

    /// Checks that all values are in range.
    ///
    /// # Errors
    /// Returns the first offending value found.
    ///
    /// # Examples
    /// ```
    /// use neatrl::{ConfigurationError, PopulationConfig};
    ///
    /// let config = PopulationConfig {
    ///     survival_threshold: 1.2,
    ///     ..PopulationConfig::zero()
    /// };
    ///
    /// assert!(matches!(
    ///     config.validate(),
    ///     Err(ConfigurationError::ProbabilityOutOfRange { name: "survival_threshold", .. })
    /// ));
    /// ```
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        check_probability("survival_threshold", self.survival_threshold)?;
        check_probability("crossover_chance", self.crossover_chance)?;
        check_probability(
            "interspecies_mating_chance",
            self.interspecies_mating_chance,
        )?;
        if self.distance_threshold.is_nan() || self.distance_threshold <= 0.0 {
            return Err(ConfigurationError::NonPositive {
                name: "distance_threshold",
                value: self.distance_threshold,
            });
        }
        if self.min_fitness_range.is_nan() || self.min_fitness_range < 0.0 {
            return Err(ConfigurationError::Negative {
                name: "min_fitness_range",
                value: self.min_fitness_range,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> PopulationConfig {
        PopulationConfig {
            distance_threshold: 3.0,
            survival_threshold: 0.2,
            crossover_chance: 0.75,
            min_fitness_range: 1.0,
            ..PopulationConfig::zero()
        }
    }

    #[test]
    fn valid_config_passes() {
        assert_eq!(valid().validate(), Ok(()));
    }

    #[test]
    fn rejects_bad_probabilities() {
        let config = PopulationConfig {
            crossover_chance: -0.5,
            ..valid()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigurationError::ProbabilityOutOfRange {
                name: "crossover_chance",
                value: -0.5
            })
        );
    }

    #[test]
    fn rejects_non_positive_threshold() {
        let config = PopulationConfig {
            distance_threshold: 0.0,
            ..valid()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::NonPositive {
                name: "distance_threshold",
                ..
            })
        ));
    }

    #[test]
    fn rejects_negative_fitness_range() {
        let config = PopulationConfig {
            min_fitness_range: -1.0,
            ..valid()
        };
        assert!(config.validate().is_err());
    }
}
