use crate::Genome;

use serde::{Deserialize, Serialize};

/// Species identifier. Specifies
/// the generation in which the species
/// was born, and the count of other species
/// born in the _same generation_ before
/// the one identified (i.e, if it was the
/// third species born in generation 5, it
/// will be species [5, 2]).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SpeciesID(pub usize, pub usize);

/// Species are collections of genomes within a
/// [compatibility distance] of a _representative_.
/// Membership is recomputed every generation; the
/// representative is carried over between generations
/// as the first genome that joined the species in
/// the previous round.
///
/// A species stagnates while its best fitness fails
/// to improve on its best ever, and is denied offspring
/// once it has stagnated for longer than the
/// [`stagnation_limit`], unless it holds the
/// population's best genome.
///
/// [compatibility distance]: crate::PopulationConfig::distance_threshold
/// [`stagnation_limit`]: crate::PopulationConfig::stagnation_limit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Species<G> {
    id: SpeciesID,
    representative: G,
    pub(super) members: Vec<usize>,
    best_fitness_ever: Option<f32>,
    generations_since_improvement: usize,
    max_fitness: f32,
    adjusted_fitness: f32,
}

impl<G: Genome + Clone> Species<G> {
    /// Creates a new, memberless species with the
    /// specified ID and representative.
    ///
    /// # Examples
    /// ```
    /// use neatrl::{Species, SpeciesID};
    /// use neatrl_nn::genomics::{GeneticConfig, NNGenome};
    ///
    /// let species = Species::new(SpeciesID(1, 0), NNGenome::new(&GeneticConfig::zero()));
    ///
    /// assert_eq!(species.id(), SpeciesID(1, 0));
    /// assert_eq!(species.len(), 0);
    /// ```
    pub fn new(id: SpeciesID, representative: G) -> Species<G> {
        Species {
            id,
            representative,
            members: vec![],
            best_fitness_ever: None,
            generations_since_improvement: 0,
            max_fitness: 0.0,
            adjusted_fitness: 0.0,
        }
    }

    /// Returns the species' ID.
    pub fn id(&self) -> SpeciesID {
        self.id
    }

    /// Returns the species' representative.
    pub fn representative(&self) -> &G {
        &self.representative
    }

    pub(super) fn set_representative(&mut self, representative: G) {
        self.representative = representative;
    }

    /// Returns the compatibility distance between the
    /// species' representative and `other`.
    ///
    /// # Examples
    /// ```
    /// use neatrl::{Species, SpeciesID};
    /// use neatrl_nn::genomics::{GeneticConfig, NNGenome};
    ///
    /// let config = GeneticConfig {
    ///     initial_connection_density: 1.0,
    ///     weight_init_range: 1.0,
    ///     weight_bound: 1.0,
    ///     excess_coefficient: 1.0,
    ///     disjoint_coefficient: 1.0,
    ///     weight_coefficient: 0.4,
    ///     ..GeneticConfig::zero()
    /// };
    /// let representative = NNGenome::new(&config);
    /// let species = Species::new(SpeciesID(1, 0), representative.clone());
    ///
    /// assert_eq!(species.distance_to(&representative, &config), 0.0);
    /// ```
    pub fn distance_to<C>(&self, other: &G, config: &C) -> f32
    where
        G: Genome<Config = C>,
    {
        G::compatibility_distance(&self.representative, other, config)
    }

    /// Returns the population indices of the
    /// species' current members.
    pub fn members(&self) -> &[usize] {
        &self.members
    }

    /// Returns the number of current members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns whether the species has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Returns the best raw fitness the species has
    /// ever reached, if it has been evaluated.
    pub fn best_fitness_ever(&self) -> Option<f32> {
        self.best_fitness_ever
    }

    /// Returns the number of consecutive generations
    /// without an improvement of the species' best fitness.
    pub fn generations_since_improvement(&self) -> usize {
        self.generations_since_improvement
    }

    /// Returns the highest raw fitness among current members.
    pub fn max_fitness(&self) -> f32 {
        self.max_fitness
    }

    /// Returns the species' shared fitness: the sum of its
    /// members' adjusted fitnesses, i.e. their mean
    /// normalized fitness.
    pub fn adjusted_fitness(&self) -> f32 {
        self.adjusted_fitness
    }

    /// Records the species' fitness for this generation,
    /// updating its stagnation counter.
    pub(super) fn record_fitness(&mut self, max_fitness: f32, adjusted_fitness: f32) {
        self.max_fitness = max_fitness;
        self.adjusted_fitness = adjusted_fitness;
        match self.best_fitness_ever {
            Some(best) if max_fitness <= best => self.generations_since_improvement += 1,
            _ => {
                self.best_fitness_ever = Some(max_fitness);
                self.generations_since_improvement = 0;
            }
        }
    }

    /// Returns the species' members sorted by
    /// decreasing fitness.
    pub(super) fn ranked_members<'a>(&self, genomes: &'a [G]) -> Vec<&'a G> {
        let mut ranked: Vec<&G> = self.members.iter().map(|i| &genomes[*i]).collect();
        ranked.sort_by(|g1, g2| g2.fitness().total_cmp(&g1.fitness()));
        ranked
    }

    /// Returns the species' best current member.
    pub fn champion<'a>(&self, genomes: &'a [G]) -> Option<&'a G> {
        self.members
            .iter()
            .map(|i| &genomes[*i])
            .max_by(|g1, g2| g1.fitness().total_cmp(&g2.fitness()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::populations::tests::Dummy;

    #[test]
    fn first_record_sets_best() {
        let mut species = Species::new(SpeciesID(0, 0), Dummy::with_fitness(0, 0.0));
        assert_eq!(species.best_fitness_ever(), None);
        species.record_fitness(3.0, 1.0);
        assert_eq!(species.best_fitness_ever(), Some(3.0));
        assert_eq!(species.generations_since_improvement(), 0);
    }

    #[test]
    fn stagnation_counts_and_resets() {
        let mut species = Species::new(SpeciesID(0, 0), Dummy::with_fitness(0, 0.0));
        species.record_fitness(3.0, 1.0);
        species.record_fitness(3.0, 1.0);
        species.record_fitness(2.0, 1.0);
        assert_eq!(species.generations_since_improvement(), 2);
        assert_eq!(species.best_fitness_ever(), Some(3.0));
        species.record_fitness(3.5, 1.0);
        assert_eq!(species.generations_since_improvement(), 0);
        assert_eq!(species.best_fitness_ever(), Some(3.5));
    }

    #[test]
    fn ranks_members_by_decreasing_fitness() {
        let genomes = vec![
            Dummy::with_fitness(0, 1.0),
            Dummy::with_fitness(0, 5.0),
            Dummy::with_fitness(0, 3.0),
        ];
        let mut species = Species::new(SpeciesID(0, 0), genomes[0].clone());
        species.members = vec![0, 1, 2];
        let fitnesses: Vec<f32> = species
            .ranked_members(&genomes)
            .iter()
            .map(|g| g.fitness())
            .collect();
        assert_eq!(fitnesses, [5.0, 3.0, 1.0]);
        assert_eq!(species.champion(&genomes).map(|g| g.fitness()), Some(5.0));
    }
}
