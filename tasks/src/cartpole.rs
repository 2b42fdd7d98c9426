//! The classic cart-pole balancing task, with the
//! dynamics and termination bounds of gym's `CartPole-v1`.
use neatrl::{Environment, EnvironmentError, Step};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const GRAVITY: f32 = 9.8;
const CART_MASS: f32 = 1.0;
const POLE_MASS: f32 = 0.1;
const TOTAL_MASS: f32 = CART_MASS + POLE_MASS;
/// Half the pole's length.
const POLE_LENGTH: f32 = 0.5;
const POLE_MASS_LENGTH: f32 = POLE_MASS * POLE_LENGTH;
const FORCE: f32 = 10.0;
/// Seconds between state updates.
const TAU: f32 = 0.02;

const X_LIMIT: f32 = 2.4;
const THETA_LIMIT: f32 = 12.0 * 2.0 * std::f32::consts::PI / 360.0;

/// Cart position and velocity, pole angle and angular velocity.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CartState {
    pub x: f32,
    pub x_dot: f32,
    pub theta: f32,
    pub theta_dot: f32,
}

impl CartState {
    fn observation(&self) -> Vec<f32> {
        vec![self.x, self.x_dot, self.theta, self.theta_dot]
    }

    fn out_of_bounds(&self) -> bool {
        self.x.abs() > X_LIMIT || self.theta.abs() > THETA_LIMIT
    }

    /// Advances the state by one Euler step under
    /// a horizontal force on the cart.
    fn advance(&mut self, force: f32) {
        let (sin, cos) = self.theta.sin_cos();
        let temp = (force + POLE_MASS_LENGTH * self.theta_dot * self.theta_dot * sin) / TOTAL_MASS;
        let theta_acc = (GRAVITY * sin - cos * temp)
            / (POLE_LENGTH * (4.0 / 3.0 - POLE_MASS * cos * cos / TOTAL_MASS));
        let x_acc = temp - POLE_MASS_LENGTH * theta_acc * cos / TOTAL_MASS;

        self.x += TAU * self.x_dot;
        self.x_dot += TAU * x_acc;
        self.theta += TAU * self.theta_dot;
        self.theta_dot += TAU * theta_acc;
    }
}

/// Keep a pole upright on a cart by pushing it left or right.
///
/// Each step survived is worth a reward of 1. An action
/// whose first value exceeds 0.5 pushes right, anything else
/// pushes left. Episodes start from a small random
/// perturbation of the upright state.
pub struct CartPole {
    state: CartState,
    steps: usize,
    step_limit: usize,
    rng: StdRng,
}

impl CartPole {
    /// Creates a cart-pole with entropy-seeded initial states.
    pub fn new(step_limit: usize) -> CartPole {
        CartPole::with_rng(step_limit, StdRng::from_entropy())
    }

    /// Creates a cart-pole with reproducible initial states.
    #[cfg(test)]
    pub fn seeded(step_limit: usize, seed: u64) -> CartPole {
        CartPole::with_rng(step_limit, StdRng::seed_from_u64(seed))
    }

    fn with_rng(step_limit: usize, rng: StdRng) -> CartPole {
        CartPole {
            state: CartState::default(),
            steps: 0,
            step_limit,
            rng,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> CartState {
        self.state
    }
}

impl Environment for CartPole {
    type Info = CartState;

    fn reset(&mut self) -> Result<Vec<f32>, EnvironmentError> {
        let mut sample = || self.rng.gen_range(-0.05..0.05);
        self.state = CartState {
            x: sample(),
            x_dot: sample(),
            theta: sample(),
            theta_dot: sample(),
        };
        self.steps = 0;
        Ok(self.state.observation())
    }

    fn step(&mut self, action: &[f32]) -> Result<Step<CartState>, EnvironmentError> {
        let push = match action.first() {
            Some(push) => *push,
            None => {
                return Err(EnvironmentError::Dimension {
                    expected: 1,
                    found: 0,
                })
            }
        };
        if !push.is_finite() {
            return Err(EnvironmentError::Step {
                step: self.steps,
                reason: format!("non-finite action {}", push),
            });
        }

        self.state.advance(if push > 0.5 { FORCE } else { -FORCE });
        self.steps += 1;

        Ok(Step {
            observation: self.state.observation(),
            reward: 1.0,
            done: self.state.out_of_bounds(),
            info: self.state,
        })
    }

    fn step_limit(&self) -> usize {
        self.step_limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neatrl::run_episode;

    #[test]
    fn reset_starts_near_upright() {
        let mut env = CartPole::seeded(500, 7);
        for _ in 0..20 {
            let observation = env.reset().unwrap();
            assert_eq!(observation.len(), 4);
            assert!(observation.iter().all(|v| v.abs() <= 0.05));
        }
    }

    #[test]
    fn constant_push_topples_the_pole() {
        let mut env = CartPole::seeded(500, 1);
        let mut push_right = |_: &[f32]| vec![1.0];
        let reward = run_episode(&mut env, &mut push_right).unwrap();
        assert!(reward > 1.0 && reward < 100.0, "{}", reward);
        assert!(env.state().theta < -THETA_LIMIT || env.state().x > X_LIMIT);
    }

    #[test]
    fn balancing_policy_survives_longer() {
        // Push towards the side the pole is falling to.
        let mut balance = |o: &[f32]| vec![if o[2] + 0.5 * o[3] > 0.0 { 1.0 } else { 0.0 }];
        let mut constant = |_: &[f32]| vec![0.0];

        let balanced = run_episode(&mut CartPole::seeded(200, 3), &mut balance).unwrap();
        let toppled = run_episode(&mut CartPole::seeded(200, 3), &mut constant).unwrap();
        assert!(balanced > 2.0 * toppled, "{} vs {}", balanced, toppled);
    }

    #[test]
    fn empty_action_is_rejected() {
        let mut env = CartPole::seeded(10, 0);
        env.reset().unwrap();
        assert_eq!(
            env.step(&[]),
            Err(EnvironmentError::Dimension {
                expected: 1,
                found: 0
            })
        );
    }

    #[test]
    fn gravity_pulls_a_tilted_pole_down() {
        let mut state = CartState {
            theta: 0.1,
            ..CartState::default()
        };
        state.advance(0.0);
        state.advance(0.0);
        assert!(state.theta_dot > 0.0);
        assert!(state.theta > 0.1);
        // The cart recoils from the falling pole.
        assert!(state.x_dot < 0.0);
    }
}
