mod cartpole;
mod checkpoint;
mod presets;
mod xor;

use cartpole::CartPole;
use presets::Preset;
use xor::Xor;

use neatrl::logging::{EvolutionLogger, ReportingLevel, Stats};
use neatrl::{Population, Termination};
use neatrl_nn::genomics::{GeneticConfig, History, NNGenome};
use neatrl_nn::networks::Network;

use rayon::prelude::*;

use std::error::Error;
use std::fs;
use std::path::Path;

type NNPopulation = Population<GeneticConfig, History, NNGenome>;
type BoxError = Box<dyn Error + Send + Sync>;

const XOR_TRIALS: usize = 20;
const CHECKPOINT_INTERVAL: usize = 10;

fn main() {
    env_logger::init();

    if let Err(e) = xor_trials(&presets::xor(), XOR_TRIALS) {
        log::error!("xor trials failed: {}", e);
        std::process::exit(1);
    }
    if let Err(e) = cartpole_run(&presets::cartpole()) {
        log::error!("cart-pole run failed: {}", e);
        std::process::exit(1);
    }
}

/// Runs independent XOR populations in parallel and
/// summarises how many generations they needed.
fn xor_trials(preset: &Preset, trials: usize) -> Result<(), BoxError> {
    let terminations = (0..trials)
        .into_par_iter()
        .map(|_| -> Result<Termination, BoxError> {
            let mut population = NNPopulation::new(preset.population.clone(), preset.genetic.clone())?;
            let termination = population.run_in(&mut Xor::new(), Network::new)?;
            Ok(termination)
        })
        .collect::<Result<Vec<Termination>, BoxError>>()?;

    let solved_at = terminations.iter().filter_map(|t| match t {
        Termination::Solved { generation, .. } => Some(*generation as f32),
        Termination::BudgetExhausted { .. } => None,
    });
    let failures = terminations
        .iter()
        .filter(|t| matches!(t, Termination::BudgetExhausted { .. }))
        .count();

    match Stats::from_samples(solved_at) {
        Some(stats) => println!("{}: solved at generation {}", preset.name, stats),
        None => println!("{}: never solved", preset.name),
    }
    println!(
        "{}: {}% failure rate over {} trials",
        preset.name,
        failures as f32 * 100.0 / trials as f32,
        trials
    );
    Ok(())
}

/// Evolves a cart-pole controller, checkpointing the
/// population so an interrupted run can be resumed.
fn cartpole_run(preset: &Preset) -> Result<(), BoxError> {
    let checkpoint_path = format!("{}-population.ron", preset.name);
    let checkpoint_path = Path::new(&checkpoint_path);

    let mut population: NNPopulation = match checkpoint::load(checkpoint_path)? {
        Some(population) => population,
        None => NNPopulation::new(preset.population.clone(), preset.genetic.clone())?,
    };
    let mut environment = CartPole::new(preset.step_limit);
    let mut logger = EvolutionLogger::new(ReportingLevel::PopulationChampion);

    let budget = preset.population.generation_budget.get();
    let termination = loop {
        population.evaluate_in(&mut environment, Network::new);
        logger.log(&population);

        if let Some(termination) = population.solved().or_else(|| population.exhausted()) {
            break termination;
        }
        population.evolve()?;
        if population.generation() % CHECKPOINT_INTERVAL == 0 {
            checkpoint::save(checkpoint_path, &population)?;
        }
    };

    match termination {
        Termination::Solved {
            generation,
            fitness,
        } => println!(
            "{}: solved at generation {} with mean return {:.1}",
            preset.name, generation, fitness
        ),
        Termination::BudgetExhausted { generation } => println!(
            "{}: unsolved after generation {} of {}",
            preset.name, generation, budget
        ),
    }
    if let Some(log) = logger.iter().last() {
        println!("{}", log);
    }
    if let Some(best) = population.best_genome() {
        let dot_path = format!("{}-champion.dot", preset.name);
        fs::write(&dot_path, best.to_dot())?;
        println!("{}: champion written to {}", preset.name, dot_path);
        println!("{}", ron::to_string(best)?);
    }
    checkpoint::save(checkpoint_path, &population)?;
    Ok(())
}
