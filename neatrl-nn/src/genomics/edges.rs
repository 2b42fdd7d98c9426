use crate::genomics::GeneticConfig;
use crate::Innovation;

use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use std::fmt;

/// Edges are the principal components of genomes.
/// They are created between two nodes, and become
/// network connections in the genome's phenotype.
///
/// Recurrent edges carry the previous activation of
/// their source node; they are the only edges allowed
/// to close cycles.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Edge {
    innovation: Innovation,
    from: Innovation,
    to: Innovation,
    weight: f32,
    enabled: bool,
    recurrent: bool,
}

impl Edge {
    /// Returns a new _enabled_, non-recurrent edge
    /// with the specified parameters.
    ///
    /// # Examples
    /// ```
    /// use neatrl_nn::genomics::Edge;
    ///
    /// let edge = Edge::new(42, 3, 9, 2.0);
    ///
    /// assert_eq!(edge.innovation(), 42);
    /// assert_eq!(edge.endpoints(), (3, 9));
    /// assert_eq!(edge.weight(), 2.0);
    /// assert!(edge.enabled());
    /// assert!(!edge.is_recurrent());
    /// ```
    pub fn new(innovation: Innovation, from: Innovation, to: Innovation, weight: f32) -> Edge {
        Edge {
            innovation,
            from,
            to,
            weight,
            enabled: true,
            recurrent: false,
        }
    }

    /// Returns a new _enabled_, recurrent edge.
    pub fn new_recurrent(
        innovation: Innovation,
        from: Innovation,
        to: Innovation,
        weight: f32,
    ) -> Edge {
        Edge {
            recurrent: true,
            ..Edge::new(innovation, from, to, weight)
        }
    }

    /// Returns a random initial weight, drawn uniformly
    /// from ±[`weight_init_range`].
    ///
    /// [`weight_init_range`]: GeneticConfig::weight_init_range
    pub(super) fn random_weight(config: &GeneticConfig, rng: &mut impl Rng) -> f32 {
        rng.gen_range(-config.weight_init_range..=config.weight_init_range)
    }

    /// Adds gaussian noise of standard deviation
    /// [`weight_perturb_power`] to the weight, which is
    /// then clamped to ±[`weight_bound`].
    ///
    /// [`weight_perturb_power`]: GeneticConfig::weight_perturb_power
    /// [`weight_bound`]: GeneticConfig::weight_bound
    pub(super) fn perturb_weight(&mut self, config: &GeneticConfig, rng: &mut impl Rng) {
        let noise: f32 = rng.sample(StandardNormal);
        self.weight = (self.weight + noise * config.weight_perturb_power)
            .clamp(-config.weight_bound, config.weight_bound);
    }

    /// Replaces the weight with a fresh random one.
    pub(super) fn replace_weight(&mut self, config: &GeneticConfig, rng: &mut impl Rng) {
        self.weight = Self::random_weight(config, rng);
    }

    /// Returns the edge's innovation number.
    pub fn innovation(&self) -> Innovation {
        self.innovation
    }

    /// Returns the id of the edge's source node.
    pub fn from(&self) -> Innovation {
        self.from
    }

    /// Returns the id of the edge's target node.
    pub fn to(&self) -> Innovation {
        self.to
    }

    /// Returns the edge's source and target node ids.
    pub fn endpoints(&self) -> (Innovation, Innovation) {
        (self.from, self.to)
    }

    pub fn weight(&self) -> f32 {
        self.weight
    }

    /// Sets the edge's weight.
    ///
    /// # Examples
    /// ```
    /// use neatrl_nn::genomics::Edge;
    ///
    /// let mut edge = Edge::new(42, 3, 9, 2.0);
    /// edge.set_weight(-5.0);
    ///
    /// assert_eq!(edge.weight(), -5.0);
    /// ```
    pub fn set_weight(&mut self, weight: f32) {
        self.weight = weight;
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Enables or disables the edge. Disabled edges
    /// are kept in the genome but not expressed in
    /// its network.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_recurrent(&self) -> bool {
        self.recurrent
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{:?}[{:?}{}{:?}, {:.3}]{}",
            if self.enabled { "" } else { "(" },
            self.innovation,
            self.from,
            if self.recurrent { "~>" } else { "->" },
            self.to,
            self.weight,
            if self.enabled { "" } else { ")" },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perturbation_stays_within_bound() {
        let config = GeneticConfig {
            weight_perturb_power: 10.0,
            weight_bound: 1.5,
            ..GeneticConfig::zero()
        };
        let mut rng = rand::thread_rng();
        let mut edge = Edge::new(0, 0, 1, 1.0);
        for _ in 0..100 {
            edge.perturb_weight(&config, &mut rng);
            assert!(edge.weight().abs() <= 1.5);
        }
    }

    #[test]
    fn zero_power_perturbation_keeps_weight() {
        let config = GeneticConfig {
            weight_bound: 5.0,
            ..GeneticConfig::zero()
        };
        let mut edge = Edge::new(0, 0, 1, 1.25);
        edge.perturb_weight(&config, &mut rand::thread_rng());
        assert_eq!(edge.weight(), 1.25);
    }

    #[test]
    fn replacement_draws_from_init_range() {
        let config = GeneticConfig {
            weight_init_range: 0.5,
            ..GeneticConfig::zero()
        };
        let mut rng = rand::thread_rng();
        let mut edge = Edge::new(0, 0, 1, 4.0);
        for _ in 0..100 {
            edge.replace_weight(&config, &mut rng);
            assert!(edge.weight().abs() <= 0.5);
        }
    }

    #[test]
    fn display_marks_disabled_and_recurrent() {
        let mut edge = Edge::new_recurrent(4, 2, 2, 0.5);
        assert_eq!(edge.to_string(), "4[2~>2, 0.500]");
        edge.set_enabled(false);
        assert_eq!(edge.to_string(), "(4[2~>2, 0.500])");
    }
}
