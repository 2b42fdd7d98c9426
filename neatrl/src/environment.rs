//! The contract between the evolutionary engine and
//! the reinforcement-learning environment that scores
//! genomes.
//!
//! An [`Environment`] supplies observations and rewards,
//! a [`Policy`] (typically a network built from a genome)
//! turns observations into actions, and [`run_episode`]
//! plays one bounded episode between the two.
use crate::EnvironmentError;

/// The result of a single environment step.
#[derive(Clone, Debug, PartialEq)]
pub struct Step<I> {
    /// Observation after the action was applied.
    pub observation: Vec<f32>,
    /// Reward obtained by the action.
    pub reward: f32,
    /// Whether the episode has ended.
    pub done: bool,
    /// Environment-specific diagnostic data.
    pub info: I,
}

/// An episodic control task.
pub trait Environment {
    /// Diagnostic data returned with every step.
    type Info;

    /// Starts a new episode and returns its initial observation.
    fn reset(&mut self) -> Result<Vec<f32>, EnvironmentError>;

    /// Applies an action to the environment.
    fn step(&mut self, action: &[f32]) -> Result<Step<Self::Info>, EnvironmentError>;

    /// Maximum number of steps in an episode.
    fn step_limit(&self) -> usize;
}

/// Something that acts in an environment.
pub trait Policy {
    /// Clears any state carried between steps.
    fn reset(&mut self);

    /// Returns the action for an observation.
    fn act(&mut self, observation: &[f32]) -> Vec<f32>;
}

impl<F> Policy for F
where
    F: FnMut(&[f32]) -> Vec<f32>,
{
    fn reset(&mut self) {}

    fn act(&mut self, observation: &[f32]) -> Vec<f32> {
        self(observation)
    }
}

/// Plays one episode and returns the accumulated reward.
///
/// The episode ends when the environment reports `done`,
/// or after [`Environment::step_limit`] steps.
///
/// # Errors
/// Propagates any error raised by the environment.
///
/// # Examples
/// ```
/// use neatrl::{run_episode, Environment, EnvironmentError, Step};
///
/// // Rewards actions close to the observed value.
/// struct Echo(f32);
///
/// impl Environment for Echo {
///     type Info = ();
///
///     fn reset(&mut self) -> Result<Vec<f32>, EnvironmentError> {
///         self.0 = 0.5;
///         Ok(vec![self.0])
///     }
///
///     fn step(&mut self, action: &[f32]) -> Result<Step<()>, EnvironmentError> {
///         let reward = 1.0 - (action[0] - self.0).abs();
///         Ok(Step { observation: vec![self.0], reward, done: false, info: () })
///     }
///
///     fn step_limit(&self) -> usize {
///         10
///     }
/// }
///
/// let mut identity = |observation: &[f32]| observation.to_vec();
/// assert_eq!(run_episode(&mut Echo(0.0), &mut identity).unwrap(), 10.0);
/// ```
pub fn run_episode<E, P>(environment: &mut E, policy: &mut P) -> Result<f32, EnvironmentError>
where
    E: Environment + ?Sized,
    P: Policy + ?Sized,
{
    policy.reset();
    let mut observation = environment.reset()?;
    let mut total_reward = 0.0;
    for _ in 0..environment.step_limit() {
        let action = policy.act(&observation);
        let step = environment.step(&action)?;
        total_reward += step.reward;
        if step.done {
            break;
        }
        observation = step.observation;
    }
    Ok(total_reward)
}

/// Plays `episodes` episodes and returns the mean
/// accumulated reward, smoothing out noise from
/// stochastic environments.
///
/// # Errors
/// Fails as soon as any episode fails.
pub fn mean_episode_reward<E, P>(
    environment: &mut E,
    policy: &mut P,
    episodes: usize,
) -> Result<f32, EnvironmentError>
where
    E: Environment + ?Sized,
    P: Policy + ?Sized,
{
    let episodes = episodes.max(1);
    let mut sum = 0.0;
    for _ in 0..episodes {
        sum += run_episode(environment, policy)?;
    }
    Ok(sum / episodes as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Counts down from `start`, ending the episode at zero.
    struct Countdown {
        start: usize,
        remaining: usize,
        limit: usize,
        fail_at: Option<usize>,
        steps: usize,
    }

    impl Countdown {
        fn new(start: usize, limit: usize) -> Countdown {
            Countdown {
                start,
                remaining: start,
                limit,
                fail_at: None,
                steps: 0,
            }
        }
    }

    impl Environment for Countdown {
        type Info = usize;

        fn reset(&mut self) -> Result<Vec<f32>, EnvironmentError> {
            self.remaining = self.start;
            self.steps = 0;
            Ok(vec![self.remaining as f32])
        }

        fn step(&mut self, action: &[f32]) -> Result<Step<usize>, EnvironmentError> {
            if Some(self.steps) == self.fail_at {
                return Err(EnvironmentError::Step {
                    step: self.steps,
                    reason: "scripted failure".into(),
                });
            }
            self.steps += 1;
            self.remaining -= 1;
            Ok(Step {
                observation: vec![self.remaining as f32],
                reward: action[0],
                done: self.remaining == 0,
                info: self.steps,
            })
        }

        fn step_limit(&self) -> usize {
            self.limit
        }
    }

    #[test]
    fn episode_ends_when_done() {
        let mut env = Countdown::new(3, 100);
        let mut policy = |_: &[f32]| vec![2.0];
        assert_eq!(run_episode(&mut env, &mut policy), Ok(6.0));
    }

    #[test]
    fn episode_ends_at_step_limit() {
        let mut env = Countdown::new(50, 4);
        let mut policy = |_: &[f32]| vec![1.0];
        assert_eq!(run_episode(&mut env, &mut policy), Ok(4.0));
    }

    #[test]
    fn policy_sees_latest_observation() {
        let mut env = Countdown::new(3, 100);
        let mut seen = vec![];
        let mut policy = |o: &[f32]| {
            seen.push(o[0]);
            vec![0.0]
        };
        run_episode(&mut env, &mut policy).unwrap();
        assert_eq!(seen, [3.0, 2.0, 1.0]);
    }

    #[test]
    fn episode_failure_propagates() {
        let mut env = Countdown::new(5, 100);
        env.fail_at = Some(2);
        let mut policy = |_: &[f32]| vec![1.0];
        assert!(matches!(
            run_episode(&mut env, &mut policy),
            Err(EnvironmentError::Step { step: 2, .. })
        ));
    }

    #[test]
    fn mean_over_episodes() {
        let mut env = Countdown::new(2, 100);
        let mut calls = 0.0;
        let mut policy = |_: &[f32]| {
            calls += 1.0;
            vec![calls]
        };
        // Episodes return 1+2, 3+4 and 5+6.
        assert_eq!(mean_episode_reward(&mut env, &mut policy, 3), Ok(7.0));
    }
}
