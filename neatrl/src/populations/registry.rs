use super::{PopulationConfig, Species, SpeciesID};
use crate::{EvolutionError, Genome};

use serde::{Deserialize, Serialize};

/// The set of species in a population.
///
/// The registry clusters genomes by compatibility
/// distance, applies fitness sharing, tracks stagnation,
/// and turns shared fitness into offspring quotas.
/// Genomes are referred to by their index in the
/// population.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeciesRegistry<G> {
    species: Vec<Species<G>>,
    historical_species_count: usize,
}

impl<G: Genome + Clone> SpeciesRegistry<G> {
    /// Creates an empty registry.
    pub fn new() -> SpeciesRegistry<G> {
        SpeciesRegistry {
            species: vec![],
            historical_species_count: 0,
        }
    }

    /// Assigns every genome to a species.
    ///
    /// Each genome joins the first species whose representative
    /// is closer than the [distance threshold]; if there is none,
    /// it founds a new species and becomes its representative.
    /// Species left without members are removed, and every
    /// remaining species takes its first member of this round
    /// as representative for the next one.
    ///
    /// Which species a genome near the boundary of two species
    /// joins depends on processing order.
    ///
    /// [distance threshold]: PopulationConfig::distance_threshold
    pub fn speciate<C>(
        &mut self,
        genomes: &[G],
        generation: usize,
        genetic_config: &C,
        population_config: &PopulationConfig,
    ) where
        G: Genome<Config = C>,
    {
        for species in &mut self.species {
            species.members.clear();
        }

        let mut new_species_count = 0;
        for (index, genome) in genomes.iter().enumerate() {
            match self.species.iter_mut().find(|s| {
                s.distance_to(genome, genetic_config) < population_config.distance_threshold
            }) {
                Some(species) => species.members.push(index),
                None => {
                    let mut species =
                        Species::new(SpeciesID(generation, new_species_count), genome.clone());
                    species.members.push(index);
                    log::debug!("species {:?} founded", species.id());
                    self.species.push(species);
                    new_species_count += 1;
                }
            }
        }
        self.historical_species_count += new_species_count;

        self.species.retain(|s| {
            if s.is_empty() {
                log::debug!("species {:?} went extinct", s.id());
            }
            !s.is_empty()
        });
        for species in &mut self.species {
            let first = species.members[0];
            species.set_representative(genomes[first].clone());
        }
    }

    /// Applies explicit fitness sharing.
    ///
    /// Raw fitnesses are first normalized against the whole
    /// population, as `(f - min) / max(max - min, min_fitness_range)`,
    /// so that negative rewards are handled. Each member's adjusted
    /// fitness is its normalized fitness divided by its species'
    /// size, and a species' adjusted fitness is the sum over its
    /// members. Each species' maximum raw fitness is recorded
    /// for stagnation tracking.
    ///
    /// # Errors
    /// Returns an error if any genome's fitness is NaN.
    pub fn adjust_fitness(
        &mut self,
        genomes: &[G],
        config: &PopulationConfig,
    ) -> Result<(), EvolutionError> {
        if let Some(g) = genomes.iter().find(|g| g.fitness().is_nan()) {
            return Err(EvolutionError::InvalidFitness {
                fitness: g.fitness(),
            });
        }
        let (min, max) = genomes
            .iter()
            .map(|g| g.fitness())
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), f| {
                (lo.min(f), hi.max(f))
            });
        let range = (max - min).max(config.min_fitness_range);

        for species in &mut self.species {
            let size = species.len() as f32;
            let mut species_max = f32::NEG_INFINITY;
            let mut shared = 0.0;
            for genome in species.members.iter().map(|i| &genomes[*i]) {
                let fitness = genome.fitness();
                species_max = species_max.max(fitness);
                if range > 0.0 {
                    shared += (fitness - min) / range / size;
                }
            }
            species.record_fitness(species_max, shared);
        }
        Ok(())
    }

    /// Computes each species' offspring quota, in registry order.
    ///
    /// Quotas are proportional to the species' adjusted fitness
    /// and always sum to `total`. Species stagnated for longer than
    /// the [stagnation limit] get nothing, unless they hold the
    /// best current fitness. When no eligible species has any
    /// adjusted fitness, slots are split evenly between them.
    ///
    /// [stagnation limit]: PopulationConfig::stagnation_limit
    ///
    /// # Errors
    /// Returns an error if the registry is empty.
    pub fn allocate_offspring(
        &self,
        total: usize,
        config: &PopulationConfig,
    ) -> Result<Vec<usize>, EvolutionError> {
        let best = self
            .species
            .iter()
            .enumerate()
            .max_by(|(_, s1), (_, s2)| s1.max_fitness().total_cmp(&s2.max_fitness()))
            .map(|(i, _)| i)
            .ok_or(EvolutionError::DegeneratePopulation)?;

        let eligible: Vec<bool> = self
            .species
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let stagnant = s.generations_since_improvement() > config.stagnation_limit;
                if stagnant && i != best {
                    log::debug!(
                        "species {:?} stagnant for {} generations, denied offspring",
                        s.id(),
                        s.generations_since_improvement()
                    );
                }
                !stagnant || i == best
            })
            .collect();

        let scores: Vec<f32> = self
            .species
            .iter()
            .zip(&eligible)
            .map(|(s, e)| if *e { s.adjusted_fitness() } else { 0.0 })
            .collect();
        let score_sum: f32 = scores.iter().sum();

        let shares: Vec<f32> = if score_sum > 0.0 {
            scores
                .iter()
                .map(|s| s / score_sum * total as f32)
                .collect()
        } else {
            let eligible_count = eligible.iter().filter(|e| **e).count();
            eligible
                .iter()
                .map(|e| {
                    if *e {
                        total as f32 / eligible_count as f32
                    } else {
                        0.0
                    }
                })
                .collect()
        };

        Ok(round_retain_sum(&shares, total))
    }

    /// Removes every species allotted no offspring, given
    /// quotas in registry order as returned by
    /// [`allocate_offspring`](SpeciesRegistry::allocate_offspring).
    /// Their lineages end here, so they can no longer take in
    /// the next generation's genomes.
    pub fn retain_reproducing(&mut self, allotted: &[usize]) {
        let mut quotas = allotted.iter();
        self.species.retain(|s| {
            let reproducing = quotas.next().map_or(false, |q| *q > 0);
            if !reproducing {
                log::debug!("species {:?} produced no offspring, removed", s.id());
            }
            reproducing
        });
    }

    /// Returns an iterator over all current species.
    pub fn species(&self) -> impl Iterator<Item = &Species<G>> {
        self.species.iter()
    }

    pub(super) fn species_slice(&self) -> &[Species<G>] {
        &self.species
    }

    /// Returns the number of current species.
    pub fn len(&self) -> usize {
        self.species.len()
    }

    /// Returns whether there are no species.
    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }

    /// Returns the total number of species ever founded.
    pub fn historical_species_count(&self) -> usize {
        self.historical_species_count
    }

    /// Returns the species the genome at `index` belongs to.
    pub fn species_of(&self, index: usize) -> Option<SpeciesID> {
        self.species
            .iter()
            .find(|s| s.members.contains(&index))
            .map(|s| s.id())
    }
}

impl<G: Genome + Clone> Default for SpeciesRegistry<G> {
    fn default() -> Self {
        Self::new()
    }
}

/// Rounds all values to whole numbers summing to `total`,
/// while preserving their order. The remainder left after
/// flooring goes to the values with the largest fractional
/// parts, which minimizes the average error to the original
/// set of values.
fn round_retain_sum(values: &[f32], total: usize) -> Vec<usize> {
    let mut truncated: Vec<(usize, usize, f32)> = values
        .iter()
        .enumerate()
        .map(|(i, f)| {
            let u = f.max(0.0).floor();
            let e = f - u;
            (i, u as usize, e)
        })
        .collect();
    let truncated_sum: usize = truncated.iter().map(|(_, u, _)| *u).sum();
    let remainder = total.saturating_sub(truncated_sum).min(truncated.len());
    // Sort in decreasing order of error
    truncated.sort_by(|a, b| b.2.total_cmp(&a.2));
    for (_, u, _) in &mut truncated[..remainder] {
        *u += 1;
    }
    truncated.sort_by_key(|(i, ..)| *i);
    truncated.iter().map(|(_, u, _)| *u).collect()
}
