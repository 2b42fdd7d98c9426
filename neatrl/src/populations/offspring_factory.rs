use super::{PopulationConfig, SelectionPolicy, Species};
use crate::Genome;

use rand::distributions::{Distribution, WeightedIndex};
use rand::prelude::{IteratorRandom, Rng};

/// Auxiliary type for offspring generation.
/// Handles all the tasks of generating a population's
/// offspring according to the specified configs
/// and allotted offspring.
pub(super) struct OffspringFactory<'a, G: Genome> {
    species: &'a [Species<G>],
    genomes: &'a [G],
    history: &'a mut G::InnovationHistory,
    genetic_config: &'a G::Config,
    population_config: &'a PopulationConfig,
}

impl<'a, G: Genome + Clone> OffspringFactory<'a, G> {
    pub(super) fn new(
        species: &'a [Species<G>],
        genomes: &'a [G],
        history: &'a mut G::InnovationHistory,
        genetic_config: &'a G::Config,
        population_config: &'a PopulationConfig,
    ) -> OffspringFactory<'a, G> {
        OffspringFactory {
            species,
            genomes,
            history,
            genetic_config,
            population_config,
        }
    }

    /// Generate the allotted offspring, species by species.
    pub(super) fn generate_offspring(&mut self, allotted_offspring: &[usize]) -> Vec<G> {
        let mut offspring = Vec::with_capacity(allotted_offspring.iter().sum());

        for (species_index, allotted) in allotted_offspring.iter().copied().enumerate() {
            if allotted == 0 {
                continue;
            }
            let ranked = self.species[species_index].ranked_members(self.genomes);
            let elite = self.count_elite(ranked.len(), allotted);
            let survivors = self.count_survivors(ranked.len());

            offspring.extend(ranked[..elite].iter().map(|g| (*g).clone()));
            for _ in elite..allotted {
                let child = self.breed(species_index, &ranked[..survivors]);
                offspring.push(child);
            }
            log::trace!(
                "species {:?}: {} elite, {} bred",
                self.species[species_index].id(),
                elite,
                allotted - elite
            );
        }

        offspring
    }

    /// Number of champions copied unchanged. Only species
    /// above the minimum size keep their elite.
    fn count_elite(&self, species_size: usize, allotted: usize) -> usize {
        if species_size > self.population_config.elitism_min_species_size {
            self.population_config
                .elitism
                .min(species_size)
                .min(allotted)
        } else {
            0
        }
    }

    /// Size of the selection pool: the top fraction
    /// of the species, and never less than one genome.
    fn count_survivors(&self, species_size: usize) -> usize {
        ((species_size as f32 * self.population_config.survival_threshold).ceil() as usize)
            .clamp(1, species_size)
    }

    /// Produces a single mutated child, by crossover
    /// or by cloning a selected parent.
    fn breed(&mut self, species_index: usize, pool: &[&'a G]) -> G {
        let mut rng = rand::thread_rng();
        let parent1 = self.select(pool, &mut rng);

        let mut child = if self.species[species_index].len() >= 2
            && rng.gen::<f32>() < self.population_config.crossover_chance
        {
            let parent2 = self.choose_mate(species_index, pool, &mut rng);
            G::crossover(parent1, parent2, self.genetic_config)
        } else {
            parent1.clone()
        };

        child.mutate(self.history, self.genetic_config);
        child
    }

    /// Picks a parent from the pool according to
    /// the configured selection policy.
    fn select(&self, pool: &[&'a G], rng: &mut impl Rng) -> &'a G {
        match self.population_config.selection {
            SelectionPolicy::Truncation => pool[rng.gen_range(0..pool.len())],
            SelectionPolicy::FitnessProportionate => {
                // Shift fitnesses so that negative rewards
                // still yield valid weights.
                let min = pool
                    .iter()
                    .map(|g| g.fitness())
                    .fold(f32::INFINITY, f32::min);
                match WeightedIndex::new(pool.iter().map(|g| g.fitness() - min)) {
                    Ok(weights) => pool[weights.sample(rng)],
                    // All weights zero: every candidate is equally fit.
                    Err(_) => pool[rng.gen_range(0..pool.len())],
                }
            }
        }
    }

    /// Chooses the second parent, usually from the same
    /// selection pool, but occasionally from another species.
    fn choose_mate(&self, species_index: usize, pool: &[&'a G], rng: &mut impl Rng) -> &'a G {
        if self.species.len() > 1
            && rng.gen::<f32>() < self.population_config.interspecies_mating_chance
        {
            let genomes = self.genomes;
            let foreign = self
                .species
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != species_index)
                .flat_map(|(_, s)| s.members())
                .choose(rng);
            if let Some(index) = foreign {
                return &genomes[*index];
            }
        }
        self.select(pool, rng)
    }
}
