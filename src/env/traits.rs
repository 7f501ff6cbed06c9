use super::errors::EnvError;
use super::types::{EnvMetadata, Space, Transition};

/// Gym-style environment: reset, step until terminated or truncated, close.
pub trait Env: Send {
    type Obs: Send + Clone + 'static;
    type Act: Send + Clone + 'static;

    fn reset(&mut self) -> Result<Self::Obs, EnvError>;
    fn step(&mut self, act: Self::Act) -> Result<Transition<Self::Obs>, EnvError>;
    /// Text frame of the current state; `None` when not rendering.
    fn render(&self) -> Result<Option<String>, EnvError>;
    fn close(&mut self) -> Result<(), EnvError>;

    fn action_space(&self) -> Space;
    fn observation_space(&self) -> Space;
    fn metadata(&self) -> EnvMetadata;
}

impl<E: Env + ?Sized> Env for Box<E> {
    type Obs = E::Obs;
    type Act = E::Act;

    fn reset(&mut self) -> Result<Self::Obs, EnvError> {
        (**self).reset()
    }

    fn step(&mut self, act: Self::Act) -> Result<Transition<Self::Obs>, EnvError> {
        (**self).step(act)
    }

    fn render(&self) -> Result<Option<String>, EnvError> {
        (**self).render()
    }

    fn close(&mut self) -> Result<(), EnvError> {
        (**self).close()
    }

    fn action_space(&self) -> Space {
        (**self).action_space()
    }

    fn observation_space(&self) -> Space {
        (**self).observation_space()
    }

    fn metadata(&self) -> EnvMetadata {
        (**self).metadata()
    }
}

/// Environment with vector observations and discrete actions, the shape every
/// registered environment has.
pub type BoxedEnv = Box<dyn Env<Obs = Vec<f64>, Act = usize>>;
