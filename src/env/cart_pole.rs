use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::warn;

use super::errors::EnvError;
use super::traits::Env;
use super::types::{EnvMetadata, RenderMode, Space, Transition};

const GRAVITY: f64 = 9.8;
const MASS_CART: f64 = 1.0;
const MASS_POLE: f64 = 0.1;
const TOTAL_MASS: f64 = MASS_CART + MASS_POLE;
// half the pole's length
const LENGTH: f64 = 0.5;
const POLE_MASS_LENGTH: f64 = MASS_POLE * LENGTH;
const FORCE_MAG: f64 = 10.0;
const TAU: f64 = 0.02;
const X_THRESHOLD: f64 = 2.4;
const THETA_THRESHOLD: f64 = 12.0 * 2.0 * std::f64::consts::PI / 360.0;

const RENDER_WIDTH: usize = 61;

#[derive(Debug, Clone, Copy, PartialEq)]
struct State {
    x: f64,
    x_dot: f64,
    theta: f64,
    theta_dot: f64,
}

impl State {
    fn to_obs(self) -> Vec<f64> {
        vec![self.x, self.x_dot, self.theta, self.theta_dot]
    }

    fn is_terminal(&self) -> bool {
        self.x < -X_THRESHOLD
            || self.x > X_THRESHOLD
            || self.theta < -THETA_THRESHOLD
            || self.theta > THETA_THRESHOLD
    }
}

/// A pole hinged on a cart moving along a frictionless track. Action 0 pushes
/// the cart left, action 1 pushes it right; every step the pole stays up earns
/// a reward of 1.
pub struct CartPole {
    rng: StdRng,
    state: Option<State>,
    steps_beyond_terminated: Option<usize>,
    render_mode: RenderMode,
    closed: bool,
}

impl CartPole {
    pub fn new(render_mode: RenderMode, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            state: None,
            steps_beyond_terminated: None,
            render_mode,
            closed: false,
        }
    }

    fn advance(state: State, action: usize) -> State {
        let force = if action == 1 { FORCE_MAG } else { -FORCE_MAG };
        let (sin_theta, cos_theta) = state.theta.sin_cos();

        let temp =
            (force + POLE_MASS_LENGTH * state.theta_dot * state.theta_dot * sin_theta) / TOTAL_MASS;
        let theta_acc = (GRAVITY * sin_theta - cos_theta * temp)
            / (LENGTH * (4.0 / 3.0 - MASS_POLE * cos_theta * cos_theta / TOTAL_MASS));
        let x_acc = temp - POLE_MASS_LENGTH * theta_acc * cos_theta / TOTAL_MASS;

        State {
            x: state.x + TAU * state.x_dot,
            x_dot: state.x_dot + TAU * x_acc,
            theta: state.theta + TAU * state.theta_dot,
            theta_dot: state.theta_dot + TAU * theta_acc,
        }
    }
}

impl Env for CartPole {
    type Obs = Vec<f64>;
    type Act = usize;

    fn reset(&mut self) -> Result<Self::Obs, EnvError> {
        if self.closed {
            return Err(EnvError::Closed);
        }
        let state = State {
            x: self.rng.gen_range(-0.05..0.05),
            x_dot: self.rng.gen_range(-0.05..0.05),
            theta: self.rng.gen_range(-0.05..0.05),
            theta_dot: self.rng.gen_range(-0.05..0.05),
        };
        self.state = Some(state);
        self.steps_beyond_terminated = None;
        Ok(state.to_obs())
    }

    fn step(&mut self, act: Self::Act) -> Result<Transition<Self::Obs>, EnvError> {
        if self.closed {
            return Err(EnvError::Closed);
        }
        if !self.action_space().contains_action(act) {
            return Err(EnvError::InvalidAction { action: act, n: 2 });
        }
        let state = self.state.ok_or(EnvError::NeedsReset)?;

        let next = Self::advance(state, act);
        self.state = Some(next);
        let terminated = next.is_terminal();

        let reward = if !terminated {
            1.0
        } else {
            match self.steps_beyond_terminated.as_mut() {
                None => {
                    // pole just fell
                    self.steps_beyond_terminated = Some(0);
                    1.0
                }
                Some(beyond) => {
                    if *beyond == 0 {
                        warn!(
                            "step() called after the episode terminated; reset() the environment first"
                        );
                    }
                    *beyond += 1;
                    0.0
                }
            }
        };

        Ok(Transition {
            obs: next.to_obs(),
            reward,
            terminated,
            truncated: false,
        })
    }

    fn render(&self) -> Result<Option<String>, EnvError> {
        if self.render_mode == RenderMode::None {
            return Ok(None);
        }
        let state = self.state.ok_or(EnvError::NeedsReset)?;

        let scale = (RENDER_WIDTH - 1) as f64 / (2.0 * X_THRESHOLD);
        let cart = ((state.x + X_THRESHOLD) * scale)
            .round()
            .clamp(0.0, (RENDER_WIDTH - 1) as f64) as usize;
        let pole = if state.theta > 0.05 {
            '/'
        } else if state.theta < -0.05 {
            '\\'
        } else {
            '|'
        };

        let mut pole_row = vec![' '; RENDER_WIDTH];
        pole_row[cart] = pole;
        let mut cart_row = vec![' '; RENDER_WIDTH];
        cart_row[cart] = '#';
        if cart > 0 {
            cart_row[cart - 1] = '[';
        }
        if cart + 1 < RENDER_WIDTH {
            cart_row[cart + 1] = ']';
        }

        let frame = format!(
            "{}\n{}\n{}\nx={:+.3} theta={:+.3}",
            pole_row.into_iter().collect::<String>(),
            cart_row.into_iter().collect::<String>(),
            "=".repeat(RENDER_WIDTH),
            state.x,
            state.theta,
        );
        Ok(Some(frame))
    }

    fn close(&mut self) -> Result<(), EnvError> {
        self.closed = true;
        self.state = None;
        Ok(())
    }

    fn action_space(&self) -> Space {
        Space::Discrete(2)
    }

    fn observation_space(&self) -> Space {
        let high = vec![X_THRESHOLD * 2.0, f64::MAX, THETA_THRESHOLD * 2.0, f64::MAX];
        Space::Box {
            low: high.iter().map(|h| -h).collect(),
            high,
        }
    }

    fn metadata(&self) -> EnvMetadata {
        EnvMetadata { render_fps: 50 }
    }
}
