//! Saving and resuming whole populations as RON files.
use neatrl::Population;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

use std::fs;
use std::io;
use std::path::Path;

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint i/o failed: {0}")]
    Io(#[from] io::Error),
    #[error("malformed checkpoint: {0}")]
    Format(#[from] ron::Error),
}

/// Writes a population to `path`, replacing any previous checkpoint.
pub fn save<C, H, G>(path: &Path, population: &Population<C, H, G>) -> Result<(), CheckpointError>
where
    Population<C, H, G>: Serialize,
{
    let text = ron::ser::to_string_pretty(population, ron::ser::PrettyConfig::new())?;
    fs::write(path, text)?;
    log::debug!("saved generation checkpoint to {}", path.display());
    Ok(())
}

/// Reads a population from `path`, or `None` if there is no checkpoint.
pub fn load<C, H, G>(path: &Path) -> Result<Option<Population<C, H, G>>, CheckpointError>
where
    Population<C, H, G>: DeserializeOwned,
{
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let population = ron::from_str(&text)?;
    log::info!("resuming from checkpoint {}", path.display());
    Ok(Some(population))
}

#[cfg(test)]
mod tests {
    use super::*;
    use neatrl::PopulationConfig;
    use neatrl_nn::genomics::{GeneticConfig, History, NNGenome};

    use std::num::NonZeroUsize;

    type NNPopulation = Population<GeneticConfig, History, NNGenome>;

    fn scratch_file(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("neatrl-{}-{}.ron", name, std::process::id()))
    }

    #[test]
    fn round_trip_resumes_evolution() {
        let genetic_config = GeneticConfig {
            input_count: NonZeroUsize::new(2).unwrap(),
            initial_connection_density: 1.0,
            weight_init_range: 1.0,
            weight_bound: 2.0,
            weight_perturb_chance: 0.5,
            weight_perturb_power: 0.3,
            ..GeneticConfig::zero()
        };
        let mut population = NNPopulation::new(
            PopulationConfig {
                size: NonZeroUsize::new(12).unwrap(),
                distance_threshold: 1.0,
                survival_threshold: 0.5,
                ..PopulationConfig::zero()
            },
            genetic_config,
        )
        .unwrap();
        population.evaluate_fitness(|g| g.evaluate(&[1.0, 0.5])[0]);
        population.evolve().unwrap();

        let path = scratch_file("round-trip");
        save(&path, &population).unwrap();
        let mut resumed: NNPopulation = load(&path).unwrap().unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(resumed.generation(), 1);
        assert_eq!(resumed.genomes(), population.genomes());
        assert_eq!(resumed.history(), population.history());

        resumed.evaluate_fitness(|g| g.evaluate(&[1.0, 0.5])[0]);
        resumed.evolve().unwrap();
        assert_eq!(resumed.generation(), 2);
    }

    #[test]
    fn missing_checkpoint_is_none() {
        let path = scratch_file("missing");
        assert!(load::<GeneticConfig, History, NNGenome>(&path)
            .unwrap()
            .is_none());
    }

    #[test]
    fn garbage_is_a_format_error() {
        let path = scratch_file("garbage");
        fs::write(&path, "Population(").unwrap();
        let result = load::<GeneticConfig, History, NNGenome>(&path);
        fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(CheckpointError::Format(_))));
    }
}
