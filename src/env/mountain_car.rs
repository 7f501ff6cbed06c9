use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::errors::EnvError;
use super::traits::Env;
use super::types::{EnvMetadata, RenderMode, Space, Transition};

const MIN_POSITION: f64 = -1.2;
const MAX_POSITION: f64 = 0.6;
const MAX_SPEED: f64 = 0.07;
const GOAL_POSITION: f64 = 0.5;
const GOAL_VELOCITY: f64 = 0.0;
const FORCE: f64 = 0.001;
const GRAVITY: f64 = 0.0025;

const RENDER_WIDTH: usize = 61;

/// An underpowered car in a valley that must rock back and forth to reach the
/// flag on the right hill. Actions: 0 accelerate left, 1 coast, 2 accelerate
/// right. Every step costs -1.
pub struct MountainCar {
    rng: StdRng,
    // (position, velocity)
    state: Option<(f64, f64)>,
    render_mode: RenderMode,
    closed: bool,
}

impl MountainCar {
    pub fn new(render_mode: RenderMode, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            state: None,
            render_mode,
            closed: false,
        }
    }

    fn column(position: f64) -> usize {
        let scale = (RENDER_WIDTH - 1) as f64 / (MAX_POSITION - MIN_POSITION);
        ((position - MIN_POSITION) * scale)
            .round()
            .clamp(0.0, (RENDER_WIDTH - 1) as f64) as usize
    }
}

impl Env for MountainCar {
    type Obs = Vec<f64>;
    type Act = usize;

    fn reset(&mut self) -> Result<Self::Obs, EnvError> {
        if self.closed {
            return Err(EnvError::Closed);
        }
        let position = self.rng.gen_range(-0.6..-0.4);
        self.state = Some((position, 0.0));
        Ok(vec![position, 0.0])
    }

    fn step(&mut self, act: Self::Act) -> Result<Transition<Self::Obs>, EnvError> {
        if self.closed {
            return Err(EnvError::Closed);
        }
        if !self.action_space().contains_action(act) {
            return Err(EnvError::InvalidAction { action: act, n: 3 });
        }
        let (mut position, mut velocity) = self.state.ok_or(EnvError::NeedsReset)?;

        velocity += (act as f64 - 1.0) * FORCE + (3.0 * position).cos() * (-GRAVITY);
        velocity = velocity.clamp(-MAX_SPEED, MAX_SPEED);
        position += velocity;
        position = position.clamp(MIN_POSITION, MAX_POSITION);
        if position == MIN_POSITION && velocity < 0.0 {
            velocity = 0.0;
        }

        let terminated = position >= GOAL_POSITION && velocity >= GOAL_VELOCITY;
        self.state = Some((position, velocity));

        Ok(Transition {
            obs: vec![position, velocity],
            reward: -1.0,
            terminated,
            truncated: false,
        })
    }

    fn render(&self) -> Result<Option<String>, EnvError> {
        if self.render_mode == RenderMode::None {
            return Ok(None);
        }
        let (position, velocity) = self.state.ok_or(EnvError::NeedsReset)?;

        let mut row = vec!['_'; RENDER_WIDTH];
        row[Self::column(GOAL_POSITION)] = 'F';
        row[Self::column(position)] = 'o';

        Ok(Some(format!(
            "{}\nposition={:+.3} velocity={:+.4}",
            row.into_iter().collect::<String>(),
            position,
            velocity,
        )))
    }

    fn close(&mut self) -> Result<(), EnvError> {
        self.closed = true;
        self.state = None;
        Ok(())
    }

    fn action_space(&self) -> Space {
        Space::Discrete(3)
    }

    fn observation_space(&self) -> Space {
        Space::Box {
            low: vec![MIN_POSITION, -MAX_SPEED],
            high: vec![MAX_POSITION, MAX_SPEED],
        }
    }

    fn metadata(&self) -> EnvMetadata {
        EnvMetadata { render_fps: 30 }
    }
}
