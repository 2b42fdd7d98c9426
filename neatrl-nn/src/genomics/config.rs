use crate::genomics::ActivationType;

use neatrl::{check_probability, ConfigurationError};
use serde::{Deserialize, Serialize};

use std::num::NonZeroUsize;

/// Configuration data for genome generation
/// and inter-genome operations.
///
/// # Note
/// All quantities expressing probabilities
/// should be in the range [0.0, 1.0]; this is
/// checked by [`validate`] when a population
/// is created.
///
/// [`validate`]: GeneticConfig::validate
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeneticConfig {
    /// Number of inputs in a genome.
    pub input_count: NonZeroUsize,
    /// Number of outputs in a genome.
    pub output_count: NonZeroUsize,
    /// Whether genomes carry a bias node, which
    /// constantly outputs 1.
    pub bias: bool,
    /// Possible activation types for hidden nodes.
    /// If an empty vector is given, nodes will default
    /// to [`Sigmoid`].
    ///
    /// [`Sigmoid`]: crate::genomics::ActivationType
    pub activation_types: Vec<ActivationType>,
    /// Activation types of output nodes in a genome.
    /// If fewer than [`output_count`] are specified,
    /// the default is [`Sigmoid`].
    ///
    /// [`output_count`]: GeneticConfig::output_count
    /// [`Sigmoid`]: crate::genomics::ActivationType
    pub output_activation_types: Vec<ActivationType>,
    /// Chance that an edge between a source-output node pair
    /// is created during initial genome generation.
    pub initial_connection_density: f32,
    /// Bound of the uniform distribution new weights are drawn from.
    pub weight_init_range: f32,
    /// Maximum magnitude of an edge's weight after perturbation.
    pub weight_bound: f32,
    /// Chance, per edge, of a weight perturbation.
    pub weight_perturb_chance: f32,
    /// Standard deviation of the gaussian weight perturbation.
    pub weight_perturb_power: f32,
    /// Chance, per edge not perturbed, of the weight being redrawn.
    pub weight_replace_chance: f32,
    /// Chance of one random edge having its enabled flag toggled.
    pub enabled_toggle_chance: f32,
    /// Chance that an edge disabled in either parent
    /// is disabled in their child.
    pub disable_inherited_chance: f32,
    /// Chance of an edge addition mutation.
    pub edge_addition_chance: f32,
    /// Chance of a node addition mutation.
    pub node_addition_chance: f32,
    /// Chance of an edge deletion mutation.
    pub edge_deletion_chance: f32,
    /// Chance of a node deletion mutation.
    pub node_deletion_chance: f32,
    /// Chance of a hidden node switching activation function.
    pub activation_mutation_chance: f32,
    /// Maximum number of source nodes tried during edge addition
    /// before the mutation returns with failure.
    pub max_edge_addition_attempts: usize,
    /// Chance that an edge closing a cycle is kept, tagged as
    /// recurrent, instead of being rejected.
    pub recurrence_chance: f32,
    /// Weight of excess edges in compatibility distance.
    pub excess_coefficient: f32,
    /// Weight of disjoint edges in compatibility distance.
    pub disjoint_coefficient: f32,
    /// Weight of the mean matching-edge weight difference
    /// in compatibility distance.
    pub weight_coefficient: f32,
    /// Genomes with fewer edges than this are not
    /// size-normalized in compatibility distance.
    pub distance_normalization_threshold: usize,
}

impl GeneticConfig {
    /// Returns a "zero-valued" default configuration.
    /// All values are 0, empty, false, or in the case of
    /// `NonZeroUsize`s, 1.
    ///
    /// # Note
    /// This value is not suitable for use in most experiments.
    /// It is meant as a way to fill in unused values during
    /// configuration instantiation.
    ///
    /// # Examples
    /// ```
    /// use neatrl_nn::genomics::GeneticConfig;
    ///
    /// let cfg1 = GeneticConfig::zero();
    ///
    /// let cfg2 = GeneticConfig {
    ///     // Specify some values here...
    ///     recurrence_chance: 1.0,
    ///     edge_addition_chance: 1.0,
    ///     // Default the rest...
    ///     ..GeneticConfig::zero()
    /// };
    /// ```
    pub const fn zero() -> GeneticConfig {
        GeneticConfig {
            input_count: NonZeroUsize::MIN,
            output_count: NonZeroUsize::MIN,
            bias: false,
            activation_types: vec![],
            output_activation_types: vec![],
            initial_connection_density: 0.0,
            weight_init_range: 0.0,
            weight_bound: 0.0,
            weight_perturb_chance: 0.0,
            weight_perturb_power: 0.0,
            weight_replace_chance: 0.0,
            enabled_toggle_chance: 0.0,
            disable_inherited_chance: 0.0,
            edge_addition_chance: 0.0,
            node_addition_chance: 0.0,
            edge_deletion_chance: 0.0,
            node_deletion_chance: 0.0,
            activation_mutation_chance: 0.0,
            max_edge_addition_attempts: 0,
            recurrence_chance: 0.0,
            excess_coefficient: 0.0,
            disjoint_coefficient: 0.0,
            weight_coefficient: 0.0,
            distance_normalization_threshold: 0,
        }
    }

    /// Number of source nodes: the inputs plus the bias node.
    pub fn source_count(&self) -> usize {
        self.input_count.get() + usize::from(self.bias)
    }

    /// Checks that every hyperparameter is in range.
    ///
    /// # Errors
    ///
    /// Returns the first offending value found.
    ///
    /// # Examples
    /// ```
    /// use neatrl::ConfigurationError;
    /// use neatrl_nn::genomics::GeneticConfig;
    ///
    /// assert!(GeneticConfig::zero().validate().is_ok());
    ///
    /// let config = GeneticConfig {
    ///     weight_init_range: 2.0,
    ///     weight_bound: 1.0,
    ///     ..GeneticConfig::zero()
    /// };
    /// assert_eq!(
    ///     config.validate(),
    ///     Err(ConfigurationError::WeightRange { init: 2.0, bound: 1.0 })
    /// );
    /// ```
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for (name, value) in [
            ("initial_connection_density", self.initial_connection_density),
            ("weight_perturb_chance", self.weight_perturb_chance),
            ("weight_replace_chance", self.weight_replace_chance),
            ("enabled_toggle_chance", self.enabled_toggle_chance),
            ("disable_inherited_chance", self.disable_inherited_chance),
            ("edge_addition_chance", self.edge_addition_chance),
            ("node_addition_chance", self.node_addition_chance),
            ("edge_deletion_chance", self.edge_deletion_chance),
            ("node_deletion_chance", self.node_deletion_chance),
            ("activation_mutation_chance", self.activation_mutation_chance),
            ("recurrence_chance", self.recurrence_chance),
        ] {
            check_probability(name, value)?;
        }

        for (name, value) in [
            ("weight_init_range", self.weight_init_range),
            ("weight_bound", self.weight_bound),
            ("weight_perturb_power", self.weight_perturb_power),
            ("excess_coefficient", self.excess_coefficient),
            ("disjoint_coefficient", self.disjoint_coefficient),
            ("weight_coefficient", self.weight_coefficient),
        ] {
            if value.is_nan() || value < 0.0 {
                return Err(ConfigurationError::Negative { name, value });
            }
        }

        if self.weight_init_range > self.weight_bound {
            return Err(ConfigurationError::WeightRange {
                init: self.weight_init_range,
                bound: self.weight_bound,
            });
        }

        if self.node_addition_chance > 0.0 && self.activation_types.is_empty() {
            return Err(ConfigurationError::EmptyActivationSet);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probabilities_are_checked() {
        let config = GeneticConfig {
            recurrence_chance: 1.5,
            ..GeneticConfig::zero()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigurationError::ProbabilityOutOfRange {
                name: "recurrence_chance",
                value: 1.5
            })
        );
    }

    #[test]
    fn negative_magnitudes_are_rejected() {
        let config = GeneticConfig {
            weight_perturb_power: -0.5,
            ..GeneticConfig::zero()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::Negative {
                name: "weight_perturb_power",
                ..
            })
        ));

        let config = GeneticConfig {
            weight_coefficient: f32::NAN,
            ..GeneticConfig::zero()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn node_addition_needs_activations() {
        let config = GeneticConfig {
            node_addition_chance: 0.1,
            ..GeneticConfig::zero()
        };
        assert_eq!(config.validate(), Err(ConfigurationError::EmptyActivationSet));

        let config = GeneticConfig {
            activation_types: vec![ActivationType::Tanh],
            ..config
        };
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn bias_counts_as_source() {
        let config = GeneticConfig {
            input_count: NonZeroUsize::new(4).unwrap(),
            bias: true,
            ..GeneticConfig::zero()
        };
        assert_eq!(config.source_count(), 5);
        assert_eq!(GeneticConfig::zero().source_count(), 1);
    }
}
