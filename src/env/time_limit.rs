use super::errors::EnvError;
use super::traits::Env;
use super::types::{EnvMetadata, Space, Transition};

/// Truncates episodes after `max_episode_steps` steps.
pub struct TimeLimit<E> {
    env: E,
    max_episode_steps: usize,
    elapsed_steps: usize,
}

impl<E: Env> TimeLimit<E> {
    pub fn new(env: E, max_episode_steps: usize) -> Self {
        Self {
            env,
            max_episode_steps,
            elapsed_steps: 0,
        }
    }

    pub fn elapsed_steps(&self) -> usize {
        self.elapsed_steps
    }
}

impl<E: Env> Env for TimeLimit<E> {
    type Obs = E::Obs;
    type Act = E::Act;

    fn reset(&mut self) -> Result<Self::Obs, EnvError> {
        self.elapsed_steps = 0;
        self.env.reset()
    }

    fn step(&mut self, act: Self::Act) -> Result<Transition<Self::Obs>, EnvError> {
        let mut transition = self.env.step(act)?;
        self.elapsed_steps += 1;
        if self.elapsed_steps >= self.max_episode_steps {
            transition.truncated = true;
        }
        Ok(transition)
    }

    fn render(&self) -> Result<Option<String>, EnvError> {
        self.env.render()
    }

    fn close(&mut self) -> Result<(), EnvError> {
        self.env.close()
    }

    fn action_space(&self) -> Space {
        self.env.action_space()
    }

    fn observation_space(&self) -> Space {
        self.env.observation_space()
    }

    fn metadata(&self) -> EnvMetadata {
        self.env.metadata()
    }
}
