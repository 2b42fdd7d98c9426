use thiserror::Error;

/// An error type indicating an invalid
/// hyperparameter combination. Detected when a
/// population is created, and always fatal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    /// A probability was outside of `[0.0, 1.0]`.
    #[error("{name} must be a probability in [0, 1], found {value}")]
    ProbabilityOutOfRange { name: &'static str, value: f32 },
    /// A quantity that must be strictly positive was not.
    #[error("{name} must be positive, found {value}")]
    NonPositive { name: &'static str, value: f32 },
    /// A quantity that must not be negative was.
    #[error("{name} must not be negative, found {value}")]
    Negative { name: &'static str, value: f32 },
    /// Hidden nodes could be created but no activation was allowed for them.
    #[error("node addition is enabled but no hidden activation types are configured")]
    EmptyActivationSet,
    /// The initial weight range exceeds the weight bound.
    #[error("initial weight range {init} exceeds weight bound {bound}")]
    WeightRange { init: f32, bound: f32 },
}

/// An error type indicating a failure of the
/// environment collaborator during an episode.
///
/// The population driver never aborts on these:
/// the affected genome is given the worst fitness
/// of its generation instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EnvironmentError {
    /// The environment could not be reset.
    #[error("environment reset failed: {0}")]
    Reset(String),
    /// The environment failed while stepping.
    #[error("environment step {step} failed: {reason}")]
    Step { step: usize, reason: String },
    /// The action or observation had the wrong dimension.
    #[error("expected a vector of {expected} values, found {found}")]
    Dimension { expected: usize, found: usize },
}

/// An error type indicating that a population
/// cannot be evolved any further.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvolutionError {
    /// A genome was assigned a NaN fitness.
    #[error("invalid genome fitness detected: {fitness}")]
    InvalidFitness { fitness: f32 },
    /// No species are left to reproduce.
    #[error("attempted evolution on degenerate population")]
    DegeneratePopulation,
}

/// Returns an error unless `value` lies in `[0, 1]`.
///
/// # Examples
/// ```
/// use neatrl::{check_probability, ConfigurationError};
///
/// assert!(check_probability("crossover_chance", 0.75).is_ok());
/// assert!(matches!(
///     check_probability("crossover_chance", -0.1),
///     Err(ConfigurationError::ProbabilityOutOfRange { .. })
/// ));
/// ```
pub fn check_probability(name: &'static str, value: f32) -> Result<(), ConfigurationError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigurationError::ProbabilityOutOfRange { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probability_bounds() {
        assert!(check_probability("p", 0.0).is_ok());
        assert!(check_probability("p", 1.0).is_ok());
        assert_eq!(
            check_probability("p", 1.5),
            Err(ConfigurationError::ProbabilityOutOfRange {
                name: "p",
                value: 1.5
            })
        );
        assert!(check_probability("p", f32::NAN).is_err());
    }

    #[test]
    fn display_messages() {
        let e = EnvironmentError::Step {
            step: 7,
            reason: "simulator diverged".into(),
        };
        assert_eq!(e.to_string(), "environment step 7 failed: simulator diverged");
        assert_eq!(
            EvolutionError::DegeneratePopulation.to_string(),
            "attempted evolution on degenerate population"
        );
    }
}
