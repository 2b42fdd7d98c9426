//! XOR as an episodic task: each episode presents the four
//! input patterns in turn and rewards `1 - error²` for each,
//! so a perfect answer scores 4.
use neatrl::{Environment, EnvironmentError, Step};

const PATTERNS: [([f32; 2], f32); 4] = [
    ([0.0, 0.0], 0.0),
    ([0.0, 1.0], 1.0),
    ([1.0, 0.0], 1.0),
    ([1.0, 1.0], 0.0),
];

/// Highest reachable episode return.
pub const MAX_REWARD: f32 = PATTERNS.len() as f32;

#[derive(Debug, Default)]
pub struct Xor {
    pattern: usize,
}

impl Xor {
    pub fn new() -> Xor {
        Xor::default()
    }
}

impl Environment for Xor {
    /// Squared error of the answer.
    type Info = f32;

    fn reset(&mut self) -> Result<Vec<f32>, EnvironmentError> {
        self.pattern = 0;
        Ok(PATTERNS[0].0.to_vec())
    }

    fn step(&mut self, action: &[f32]) -> Result<Step<f32>, EnvironmentError> {
        let (_, expected) = PATTERNS.get(self.pattern).ok_or(EnvironmentError::Step {
            step: self.pattern,
            reason: "episode already finished".into(),
        })?;
        let answer = action.first().ok_or(EnvironmentError::Dimension {
            expected: 1,
            found: 0,
        })?;

        let error = (answer - expected).powi(2);
        self.pattern += 1;
        let observation = PATTERNS
            .get(self.pattern)
            .map_or_else(Vec::new, |(inputs, _)| inputs.to_vec());

        Ok(Step {
            observation,
            reward: 1.0 - error,
            done: self.pattern == PATTERNS.len(),
            info: error,
        })
    }

    fn step_limit(&self) -> usize {
        PATTERNS.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neatrl::run_episode;

    #[test]
    fn exact_answers_score_maximum() {
        let mut xor = |o: &[f32]| vec![if o[0] != o[1] { 1.0 } else { 0.0 }];
        assert_eq!(run_episode(&mut Xor::new(), &mut xor), Ok(MAX_REWARD));
    }

    #[test]
    fn constant_answer_is_penalized() {
        let mut half = |_: &[f32]| vec![0.5];
        assert_eq!(run_episode(&mut Xor::new(), &mut half), Ok(4.0 - 4.0 * 0.25));
    }

    #[test]
    fn stepping_past_the_end_fails() {
        let mut env = Xor::new();
        env.reset().unwrap();
        for _ in 0..4 {
            env.step(&[0.0]).unwrap();
        }
        assert!(matches!(env.step(&[0.0]), Err(EnvironmentError::Step { step: 4, .. })));
    }

    #[test]
    fn missing_answer_is_rejected() {
        let mut env = Xor::new();
        env.reset().unwrap();
        assert_eq!(
            env.step(&[]),
            Err(EnvironmentError::Dimension {
                expected: 1,
                found: 0
            })
        );
    }
}
