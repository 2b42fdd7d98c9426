use crate::ConfigurationError;

/// An interface for genomes that can be evolved by a [`Population`].
///
/// The population only ever handles genomes through this trait;
/// their structure, and the meaning of their configuration, is
/// left to the implementor.
///
/// [`Population`]: crate::Population
pub trait Genome {
    type Config;
    type InnovationHistory: InnovationHistory<Config = Self::Config>;

    /// Returns a minimal seed genome.
    fn new(config: &Self::Config) -> Self;

    /// Checks a configuration before any genome is built from it.
    fn check_config(_config: &Self::Config) -> Result<(), ConfigurationError> {
        Ok(())
    }

    /// Returns the compatibility distance between two genomes.
    ///
    /// Must be symmetric, and zero when a genome is
    /// compared against itself.
    fn compatibility_distance(first: &Self, second: &Self, config: &Self::Config) -> f32;

    /// Combines two genomes and returns their child.
    fn crossover(parent1: &Self, parent2: &Self, config: &Self::Config) -> Self;

    /// Mutates the genome in place. New structure is
    /// registered in (and numbered by) `history`.
    fn mutate(&mut self, history: &mut Self::InnovationHistory, config: &Self::Config);

    /// Sets the genome's fitness value.
    fn set_fitness(&mut self, fitness: f32);

    /// Returns the genome's fitness value.
    fn fitness(&self) -> f32;
}

/// An Innovation History is used to keep track
/// of genetic innovations throughout a run, so that
/// identical mutations in different genomes are
/// numbered identically.
///
/// One history belongs to one population; histories
/// are never shared between independent runs.
pub trait InnovationHistory {
    type Config;

    fn new(config: &Self::Config) -> Self;
}
