use super::cart_pole::CartPole;
use super::errors::EnvError;
use super::mountain_car::MountainCar;
use super::time_limit::TimeLimit;
use super::traits::BoxedEnv;
use super::types::RenderMode;

/// Registered environment ids with their default episode limit.
pub const REGISTERED: &[(&str, usize)] = &[
    ("CartPole-v0", 200),
    ("CartPole-v1", 500),
    ("MountainCar-v0", 200),
];

#[derive(Debug, Clone, Default)]
pub struct MakeOptions {
    pub render_mode: RenderMode,
    pub seed: Option<u64>,
    /// Overrides the registered episode limit.
    pub max_episode_steps: Option<usize>,
}

impl MakeOptions {
    pub fn render_mode(mut self, render_mode: RenderMode) -> Self {
        self.render_mode = render_mode;
        self
    }

    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }
}

/// Builds a registered environment by id, wrapped in its time limit.
pub fn make(id: &str, options: MakeOptions) -> Result<BoxedEnv, EnvError> {
    let (_, default_limit) = REGISTERED
        .iter()
        .find(|(name, _)| *name == id)
        .ok_or_else(|| EnvError::UnknownEnvironment(id.to_string()))?;
    let limit = options.max_episode_steps.unwrap_or(*default_limit);

    let env: BoxedEnv = match id {
        "CartPole-v0" | "CartPole-v1" => Box::new(TimeLimit::new(
            CartPole::new(options.render_mode, options.seed),
            limit,
        )),
        "MountainCar-v0" => Box::new(TimeLimit::new(
            MountainCar::new(options.render_mode, options.seed),
            limit,
        )),
        other => return Err(EnvError::UnknownEnvironment(other.to_string())),
    };
    Ok(env)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{Env, Space};

    #[test]
    fn test_make_known_environments() {
        let pole = make("CartPole-v1", MakeOptions::default()).unwrap();
        assert_eq!(pole.action_space(), Space::Discrete(2));
        assert_eq!(pole.observation_space().dim(), 4);

        let car = make("MountainCar-v0", MakeOptions::default()).unwrap();
        assert_eq!(car.action_space(), Space::Discrete(3));
        assert_eq!(car.observation_space().dim(), 2);
    }

    #[test]
    fn test_unknown_environment() {
        let err = make("Pong-v5", MakeOptions::default()).err().unwrap();
        assert!(matches!(err, EnvError::UnknownEnvironment(ref id) if id == "Pong-v5"));
    }

    #[test]
    fn test_cart_pole_v1_truncates_at_500() {
        let mut env = make("CartPole-v1", MakeOptions::default().seed(Some(0))).unwrap();
        env.reset().unwrap();

        // Alternating pushes keep the pole up far longer than a constant push;
        // whatever happens the episode must end by the limit.
        let mut steps = 0;
        loop {
            let t = env.step(steps % 2).unwrap();
            steps += 1;
            if t.done() {
                break;
            }
        }
        assert!(steps <= 500);
    }

    #[test]
    fn test_episode_limit_override() {
        let options = MakeOptions {
            max_episode_steps: Some(4),
            ..MakeOptions::default()
        };
        let mut env = make("MountainCar-v0", options).unwrap();
        env.reset().unwrap();
        let mut steps = 0;
        while !env.step(1).unwrap().done() {
            steps += 1;
        }
        assert_eq!(steps + 1, 4);
    }
}
