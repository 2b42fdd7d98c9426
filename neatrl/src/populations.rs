//! A Population is a collection of genomes.
//! These are grouped into species, which can
//! be evolved using a genome evaluation function
//! or an environment as the source of selective
//! pressure.
mod config;
pub mod logging;
mod offspring_factory;
mod registry;
mod species;

use crate::environment::mean_episode_reward;
use crate::{
    ConfigurationError, Environment, EnvironmentError, EvolutionError, Genome, InnovationHistory,
    Policy,
};
pub use config::{PopulationConfig, SelectionPolicy};
use offspring_factory::OffspringFactory;
pub use registry::SpeciesRegistry;
pub use species::{Species, SpeciesID};

use serde::{Deserialize, Serialize};

/// The reason a run stopped.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Termination {
    /// The best genome reached the fitness threshold.
    Solved { generation: usize, fitness: f32 },
    /// The generation budget was spent without solving the task.
    BudgetExhausted { generation: usize },
}

/// A population of genomes.
///
/// The whole population, innovation history included,
/// can be serialized between generations and resumed later.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Population<C, H, G> {
    genomes: Vec<G>,
    registry: SpeciesRegistry<G>,
    history: H,
    generation: usize,
    best: Option<G>,
    population_config: PopulationConfig,
    genetic_config: C,
}

impl<C, H, G> Population<C, H, G>
where
    G: Genome<InnovationHistory = H, Config = C> + Clone,
    H: InnovationHistory<Config = C>,
{
    /// Creates a new population using the passed configurations.
    /// All genomes are minimal seeds, speciated before the first
    /// evaluation.
    ///
    /// The type of `genetic_config` depends on the implementation
    /// of [`Genome`], and is effectively opaque to the population.
    ///
    /// # Errors
    /// Returns an error if either configuration is invalid.
    ///
    /// # Examples
    /// ```
    /// # use neatrl_nn::genomics::{GeneticConfig, NNGenome as G};
    /// use neatrl::{Population, PopulationConfig};
    ///
    /// let pop_config = PopulationConfig {
    ///     size: std::num::NonZeroUsize::new(10).unwrap(),
    ///     distance_threshold: 3.0,
    ///     ..PopulationConfig::zero()
    /// };
    /// # let genetic_config = GeneticConfig::zero();
    ///
    /// // With `G` a suitable type implementing `Genome`...
    /// let population = Population::<_, _, G>::new(pop_config, genetic_config).unwrap();
    /// assert_eq!(population.genomes().len(), 10);
    /// ```
    pub fn new(
        population_config: PopulationConfig,
        genetic_config: C,
    ) -> Result<Population<C, H, G>, ConfigurationError> {
        population_config.validate()?;
        G::check_config(&genetic_config)?;
        Ok(Population::seed(population_config, genetic_config))
    }

    fn seed(population_config: PopulationConfig, genetic_config: C) -> Population<C, H, G> {
        let genomes: Vec<G> = (0..population_config.size.get())
            .map(|_| G::new(&genetic_config))
            .collect();
        let mut registry = SpeciesRegistry::new();
        registry.speciate(&genomes, 0, &genetic_config, &population_config);
        Population {
            genomes,
            registry,
            history: H::new(&genetic_config),
            generation: 0,
            best: None,
            population_config,
            genetic_config,
        }
    }

    /// Evaluates the fitness of each genome in the
    /// population using the passed evaluator.
    ///
    /// # Examples
    /// ```
    /// # use neatrl_nn::genomics::{GeneticConfig, NNGenome as G};
    /// use neatrl::{Population, PopulationConfig};
    ///
    /// # let genetic_config = GeneticConfig::zero();
    /// let mut population = Population::<_, _, G>::new(
    ///     PopulationConfig {
    ///         distance_threshold: 3.0,
    ///         ..PopulationConfig::zero()
    ///     },
    ///     genetic_config,
    /// )
    /// .unwrap();
    ///
    /// population.evaluate_fitness(|g| {
    ///     // Networks with outputs closer to 0 are given higher scores.
    ///     1.0 - g.evaluate(&[1.0])[0].abs()
    /// });
    /// ```
    pub fn evaluate_fitness<E>(&mut self, mut evaluator: E)
    where
        E: FnMut(&G) -> f32,
    {
        self.evaluate_with(|g| Ok(evaluator(g)));
    }

    /// Evaluates the fitness of each genome using a fallible
    /// evaluator.
    ///
    /// A genome whose evaluation fails is given the worst
    /// fitness of the generation: the lowest successfully
    /// evaluated fitness, or `0.0` if every evaluation failed.
    pub fn evaluate_with<E>(&mut self, mut evaluator: E)
    where
        E: FnMut(&G) -> Result<f32, EnvironmentError>,
    {
        let results: Vec<Result<f32, EnvironmentError>> =
            self.genomes.iter().map(|g| evaluator(g)).collect();
        let worst = results
            .iter()
            .filter_map(|r| r.as_ref().ok())
            .copied()
            .reduce(f32::min)
            .unwrap_or(0.0);

        for (index, (genome, result)) in self.genomes.iter_mut().zip(results).enumerate() {
            let fitness = result.unwrap_or_else(|e| {
                log::warn!(
                    "evaluation of genome {} failed ({}), assigning fitness {}",
                    index,
                    e,
                    worst
                );
                worst
            });
            genome.set_fitness(fitness);
        }

        self.update_best();
        self.log_generation();
    }

    /// Evaluates each genome in an environment, as the mean
    /// return over the configured number of [`episodes`].
    /// `build_policy` turns a genome into something that acts,
    /// typically a network.
    ///
    /// [`episodes`]: PopulationConfig::episodes
    pub fn evaluate_in<E, P, B>(&mut self, environment: &mut E, mut build_policy: B)
    where
        E: Environment + ?Sized,
        P: Policy,
        B: FnMut(&G) -> P,
    {
        let episodes = self.population_config.episodes.get();
        self.evaluate_with(|g| mean_episode_reward(environment, &mut build_policy(g), episodes));
    }

    /// Evolves the population by mating the best performing
    /// genomes of each species, and re-speciating the offspring.
    ///
    /// Expects every genome to have been evaluated.
    ///
    /// # Errors
    /// Returns an error if a genome's fitness is NaN, or the
    /// population has become degenerate.
    pub fn evolve(&mut self) -> Result<(), EvolutionError> {
        self.registry
            .adjust_fitness(&self.genomes, &self.population_config)?;
        let allotted_offspring = self
            .registry
            .allocate_offspring(self.population_config.size.get(), &self.population_config)?;

        let offspring = OffspringFactory::new(
            self.registry.species_slice(),
            &self.genomes,
            &mut self.history,
            &self.genetic_config,
            &self.population_config,
        )
        .generate_offspring(&allotted_offspring);
        self.genomes = offspring;
        self.registry.retain_reproducing(&allotted_offspring);

        self.generation += 1;
        self.registry.speciate(
            &self.genomes,
            self.generation,
            &self.genetic_config,
            &self.population_config,
        );
        Ok(())
    }

    /// Runs the evaluate-evolve loop until the best genome
    /// reaches the [fitness threshold] or [generation budget]
    /// generations have been evaluated. The budget counts from
    /// generation 0, so a resumed population only runs the
    /// generations it has left.
    ///
    /// [fitness threshold]: PopulationConfig::fitness_threshold
    /// [generation budget]: PopulationConfig::generation_budget
    ///
    /// # Examples
    /// ```
    /// # use neatrl_nn::genomics::{GeneticConfig, NNGenome as G};
    /// use neatrl::{Population, PopulationConfig, Termination};
    /// use std::num::NonZeroUsize;
    ///
    /// # let genetic_config = GeneticConfig::zero();
    /// let mut population = Population::<_, _, G>::new(
    ///     PopulationConfig {
    ///         distance_threshold: 3.0,
    ///         survival_threshold: 1.0,
    ///         generation_budget: NonZeroUsize::new(5).unwrap(),
    ///         ..PopulationConfig::zero()
    ///     },
    ///     genetic_config,
    /// )
    /// .unwrap();
    ///
    /// let termination = population.run(|_| 1.0).unwrap();
    /// assert_eq!(termination, Termination::BudgetExhausted { generation: 4 });
    /// ```
    pub fn run<E>(&mut self, mut evaluator: E) -> Result<Termination, EvolutionError>
    where
        E: FnMut(&G) -> f32,
    {
        self.run_with(|g| Ok(evaluator(g)))
    }

    /// Like [`run`](Population::run), with a fallible evaluator.
    pub fn run_with<E>(&mut self, mut evaluator: E) -> Result<Termination, EvolutionError>
    where
        E: FnMut(&G) -> Result<f32, EnvironmentError>,
    {
        loop {
            self.evaluate_with(&mut evaluator);
            if let Some(termination) = self.solved().or_else(|| self.exhausted()) {
                return Ok(termination);
            }
            self.evolve()?;
        }
    }

    /// Like [`run`](Population::run), evaluating genomes in
    /// an environment as [`evaluate_in`](Population::evaluate_in) does.
    pub fn run_in<E, P, B>(
        &mut self,
        environment: &mut E,
        mut build_policy: B,
    ) -> Result<Termination, EvolutionError>
    where
        E: Environment + ?Sized,
        P: Policy,
        B: FnMut(&G) -> P,
    {
        let episodes = self.population_config.episodes.get();
        self.run_with(|g| mean_episode_reward(environment, &mut build_policy(g), episodes))
    }

    /// Returns [`Termination::Solved`] if the best genome of
    /// the run has reached the [fitness threshold].
    ///
    /// [fitness threshold]: PopulationConfig::fitness_threshold
    pub fn solved(&self) -> Option<Termination> {
        let threshold = self.population_config.fitness_threshold?;
        let fitness = self.best.as_ref()?.fitness();
        if fitness >= threshold {
            log::debug!(
                "fitness threshold {} reached at generation {}",
                threshold,
                self.generation
            );
            Some(Termination::Solved {
                generation: self.generation,
                fitness,
            })
        } else {
            None
        }
    }

    /// Returns [`Termination::BudgetExhausted`] once the current
    /// generation is the last one the [generation budget] allows.
    ///
    /// [generation budget]: PopulationConfig::generation_budget
    pub fn exhausted(&self) -> Option<Termination> {
        let budget = self.population_config.generation_budget.get();
        if self.generation + 1 >= budget {
            log::debug!(
                "generation budget of {} exhausted at generation {}",
                budget,
                self.generation
            );
            Some(Termination::BudgetExhausted {
                generation: self.generation,
            })
        } else {
            None
        }
    }

    fn update_best(&mut self) {
        let improved = self
            .champion()
            .filter(|c| {
                self.best
                    .as_ref()
                    .map_or(true, |best| c.fitness() > best.fitness())
            })
            .cloned();
        if let Some(champion) = improved {
            self.best = Some(champion);
        }
    }

    fn log_generation(&self) {
        let mean = self.genomes.iter().map(|g| g.fitness()).sum::<f32>() / self.genomes.len() as f32;
        log::info!(
            "generation {}: {} species, max fitness {:.4}, mean fitness {:.4}, best ever {:.4}",
            self.generation,
            self.registry.len(),
            self.champion().map_or(f32::NAN, |c| c.fitness()),
            mean,
            self.best.as_ref().map_or(f32::NAN, |b| b.fitness()),
        );
    }

    /// Resets the population to an initial randomized state,
    /// with a fresh innovation history.
    ///
    /// # Examples
    /// ```
    /// # use neatrl_nn::genomics::{GeneticConfig, NNGenome as G};
    /// use neatrl::{Population, PopulationConfig};
    ///
    /// # let genetic_config = GeneticConfig::zero();
    /// let mut population = Population::<_, _, G>::new(
    ///     PopulationConfig {
    ///         distance_threshold: 3.0,
    ///         ..PopulationConfig::zero()
    ///     },
    ///     genetic_config,
    /// )
    /// .unwrap();
    ///
    /// population.evaluate_fitness(|_| 1.0);
    /// population.evolve().unwrap();
    /// population.reset();
    /// assert_eq!(population.generation(), 0);
    /// assert!(population.best_genome().is_none());
    /// ```
    pub fn reset(&mut self)
    where
        C: Clone,
    {
        *self = Population::seed(self.population_config.clone(), self.genetic_config.clone());
    }

    /// Returns the best-performing genome of the
    /// current generation, ignoring NaN fitnesses.
    pub fn champion(&self) -> Option<&G> {
        self.genomes
            .iter()
            .filter(|g| !g.fitness().is_nan())
            .max_by(|g1, g2| g1.fitness().total_cmp(&g2.fitness()))
    }

    /// Returns the best genome evaluated during the run,
    /// or `None` before the first evaluation.
    pub fn best_genome(&self) -> Option<&G> {
        self.best.as_ref()
    }

    /// Returns all current genomes.
    pub fn genomes(&self) -> &[G] {
        &self.genomes
    }

    /// Returns an iterator over all current species.
    pub fn species(&self) -> impl Iterator<Item = &Species<G>> {
        self.registry.species()
    }

    /// Returns the species registry.
    pub fn registry(&self) -> &SpeciesRegistry<G> {
        &self.registry
    }

    /// Returns the current generation number.
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Returns the population's innovation history.
    pub fn history(&self) -> &H {
        &self.history
    }

    pub fn population_config(&self) -> &PopulationConfig {
        &self.population_config
    }

    pub fn genetic_config(&self) -> &C {
        &self.genetic_config
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use std::num::NonZeroUsize;

    /// A genome reduced to a position on a line. Its distance
    /// to another is the distance between positions, and it
    /// counts the mutations it has undergone.
    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub(crate) struct Dummy {
        pub(crate) kind: usize,
        pub(crate) fitness: f32,
        pub(crate) mutations: usize,
    }

    impl Dummy {
        pub(crate) fn with_fitness(kind: usize, fitness: f32) -> Dummy {
            Dummy {
                kind,
                fitness,
                mutations: 0,
            }
        }
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub(crate) struct DummyConfig;

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub(crate) struct DummyHistory;

    impl InnovationHistory for DummyHistory {
        type Config = DummyConfig;

        fn new(_: &DummyConfig) -> DummyHistory {
            DummyHistory
        }
    }

    impl Genome for Dummy {
        type Config = DummyConfig;
        type InnovationHistory = DummyHistory;

        fn new(_: &DummyConfig) -> Dummy {
            Dummy::with_fitness(0, 0.0)
        }

        fn compatibility_distance(first: &Dummy, second: &Dummy, _: &DummyConfig) -> f32 {
            first.kind.abs_diff(second.kind) as f32
        }

        fn crossover(parent1: &Dummy, _: &Dummy, _: &DummyConfig) -> Dummy {
            parent1.clone()
        }

        fn mutate(&mut self, _: &mut DummyHistory, _: &DummyConfig) {
            self.mutations += 1;
        }

        fn set_fitness(&mut self, fitness: f32) {
            self.fitness = fitness;
        }

        fn fitness(&self) -> f32 {
            self.fitness
        }
    }

    type DummyPopulation = Population<DummyConfig, DummyHistory, Dummy>;

    fn config(size: usize) -> PopulationConfig {
        PopulationConfig {
            size: NonZeroUsize::new(size).unwrap(),
            distance_threshold: 1.0,
            survival_threshold: 1.0,
            stagnation_limit: 15,
            min_fitness_range: 1.0,
            ..PopulationConfig::zero()
        }
    }

    /// Assigns fitness 1, 2, 3... in population order.
    fn ascending(population: &mut DummyPopulation) {
        let mut next = 0.0;
        population.evaluate_fitness(|_| {
            next += 1.0;
            next
        });
    }

    #[test]
    fn invalid_config_is_rejected() {
        let result = DummyPopulation::new(
            PopulationConfig {
                crossover_chance: 2.0,
                ..config(5)
            },
            DummyConfig,
        );
        assert!(matches!(
            result,
            Err(ConfigurationError::ProbabilityOutOfRange { .. })
        ));
    }

    #[test]
    fn seed_population_is_speciated() {
        let population = DummyPopulation::new(config(10), DummyConfig).unwrap();
        assert_eq!(population.genomes().len(), 10);
        assert_eq!(population.registry().len(), 1);
        assert_eq!(population.species().next().unwrap().len(), 10);
    }

    #[test]
    fn evolution_keeps_population_size() {
        let mut population = DummyPopulation::new(config(13), DummyConfig).unwrap();
        for _ in 0..5 {
            ascending(&mut population);
            population.evolve().unwrap();
            assert_eq!(population.genomes().len(), 13);
        }
        assert_eq!(population.generation(), 5);
    }

    #[test]
    fn elites_are_copied_unchanged() {
        let mut population = DummyPopulation::new(
            PopulationConfig {
                elitism: 1,
                ..config(6)
            },
            DummyConfig,
        )
        .unwrap();
        ascending(&mut population);
        population.evolve().unwrap();

        let unmutated: Vec<&Dummy> = population
            .genomes()
            .iter()
            .filter(|g| g.mutations == 0)
            .collect();
        assert_eq!(unmutated.len(), 1);
        assert_eq!(unmutated[0].fitness, 6.0);
    }

    #[test]
    fn small_species_keep_no_elite() {
        let mut population = DummyPopulation::new(
            PopulationConfig {
                elitism: 1,
                elitism_min_species_size: 6,
                ..config(6)
            },
            DummyConfig,
        )
        .unwrap();
        ascending(&mut population);
        population.evolve().unwrap();
        assert!(population.genomes().iter().all(|g| g.mutations == 1));
    }

    #[test]
    fn only_the_selection_pool_breeds() {
        let mut population = DummyPopulation::new(
            PopulationConfig {
                survival_threshold: 0.25,
                ..config(8)
            },
            DummyConfig,
        )
        .unwrap();
        ascending(&mut population);
        population.evolve().unwrap();
        // ceil(8 * 0.25) = 2: only the two fittest are parents.
        assert!(population.genomes().iter().all(|g| g.fitness >= 7.0));
    }

    #[test]
    fn fitness_proportionate_selection_handles_equal_fitness() {
        let mut population = DummyPopulation::new(
            PopulationConfig {
                selection: SelectionPolicy::FitnessProportionate,
                crossover_chance: 1.0,
                ..config(8)
            },
            DummyConfig,
        )
        .unwrap();
        population.evaluate_fitness(|_| -3.0);
        population.evolve().unwrap();
        assert_eq!(population.genomes().len(), 8);
    }

    #[test]
    fn failed_evaluations_get_worst_fitness() {
        let mut population = DummyPopulation::new(config(6), DummyConfig).unwrap();
        let mut calls = 0;
        population.evaluate_with(|_| {
            calls += 1;
            if calls % 2 == 0 {
                Err(EnvironmentError::Reset("unavailable".into()))
            } else {
                Ok(calls as f32 * 10.0)
            }
        });
        let fitnesses: Vec<f32> = population.genomes().iter().map(|g| g.fitness).collect();
        assert_eq!(fitnesses, [10.0, 10.0, 30.0, 10.0, 50.0, 10.0]);
    }

    #[test]
    fn all_failed_evaluations_get_zero() {
        let mut population = DummyPopulation::new(config(3), DummyConfig).unwrap();
        population.evaluate_with(|_| {
            Err(EnvironmentError::Step {
                step: 0,
                reason: "diverged".into(),
            })
        });
        assert!(population.genomes().iter().all(|g| g.fitness == 0.0));
    }

    #[test]
    fn best_genome_is_kept_across_generations() {
        let mut population = DummyPopulation::new(config(4), DummyConfig).unwrap();
        assert!(population.best_genome().is_none());
        population.evaluate_fitness(|_| 5.0);
        population.evolve().unwrap();
        population.evaluate_fitness(|_| 1.0);
        assert_eq!(population.champion().map(|g| g.fitness), Some(1.0));
        assert_eq!(population.best_genome().map(|g| g.fitness), Some(5.0));
    }

    #[test]
    fn run_stops_when_solved() {
        let mut population = DummyPopulation::new(
            PopulationConfig {
                fitness_threshold: Some(3.0),
                generation_budget: NonZeroUsize::new(10).unwrap(),
                ..config(2)
            },
            DummyConfig,
        )
        .unwrap();
        let mut calls = 0.0;
        let termination = population
            .run(|_| {
                calls += 1.0;
                calls
            })
            .unwrap();
        assert_eq!(
            termination,
            Termination::Solved {
                generation: 1,
                fitness: 4.0
            }
        );
    }

    #[test]
    fn resumed_run_only_spends_remaining_budget() {
        let mut population = DummyPopulation::new(
            PopulationConfig {
                generation_budget: NonZeroUsize::new(5).unwrap(),
                ..config(4)
            },
            DummyConfig,
        )
        .unwrap();
        for _ in 0..3 {
            population.evaluate_fitness(|_| 1.0);
            population.evolve().unwrap();
        }

        let mut evaluations = 0;
        let termination = population
            .run(|_| {
                evaluations += 1;
                1.0
            })
            .unwrap();
        assert_eq!(termination, Termination::BudgetExhausted { generation: 4 });
        assert_eq!(evaluations, 2 * 4);
    }

    #[test]
    fn run_stops_when_budget_is_spent() {
        let mut population = DummyPopulation::new(
            PopulationConfig {
                fitness_threshold: Some(100.0),
                generation_budget: NonZeroUsize::new(3).unwrap(),
                ..config(4)
            },
            DummyConfig,
        )
        .unwrap();
        let mut evaluations = 0;
        let termination = population
            .run(|_| {
                evaluations += 1;
                1.0
            })
            .unwrap();
        assert_eq!(termination, Termination::BudgetExhausted { generation: 2 });
        assert_eq!(evaluations, 12);
    }

    #[test]
    fn nan_fitness_stops_evolution() {
        let mut population = DummyPopulation::new(config(3), DummyConfig).unwrap();
        population.evaluate_fitness(|_| f32::NAN);
        assert!(matches!(
            population.evolve(),
            Err(EvolutionError::InvalidFitness { .. })
        ));
        assert!(population.best_genome().is_none());
    }

    #[test]
    fn serialized_population_resumes() {
        let mut population = DummyPopulation::new(config(5), DummyConfig).unwrap();
        ascending(&mut population);
        population.evolve().unwrap();

        let json = serde_json::to_string(&population).unwrap();
        let mut resumed: DummyPopulation = serde_json::from_str(&json).unwrap();
        assert_eq!(resumed.generation(), 1);
        assert_eq!(resumed.genomes(), population.genomes());
        assert_eq!(resumed.best_genome(), population.best_genome());

        ascending(&mut resumed);
        resumed.evolve().unwrap();
        assert_eq!(resumed.generation(), 2);
        assert_eq!(resumed.genomes().len(), 5);
    }
}
