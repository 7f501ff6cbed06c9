use tracing::debug;

use super::errors::DriverError;
use crate::env::{self, BoxedEnv, Env, EnvError, MakeOptions};
use crate::neat::{Activate, FitnessEvaluator, Genome, GenomeKey};

/// Opens a fresh environment for one evaluation pass.
pub trait EnvFactory {
    fn make_env(&mut self) -> Result<BoxedEnv, EnvError>;
}

impl<F> EnvFactory for F
where
    F: FnMut() -> Result<BoxedEnv, EnvError>,
{
    fn make_env(&mut self) -> Result<BoxedEnv, EnvError> {
        self()
    }
}

/// Builds a registered environment by name. With a seed, every environment
/// made gets the next seed in sequence so runs stay reproducible without
/// replaying identical episodes each generation.
#[derive(Debug, Clone)]
pub struct NamedEnv {
    name: String,
    seed: Option<u64>,
    made: u64,
}

impl NamedEnv {
    pub fn new(name: impl Into<String>, seed: Option<u64>) -> Self {
        Self {
            name: name.into(),
            seed,
            made: 0,
        }
    }
}

impl EnvFactory for NamedEnv {
    fn make_env(&mut self) -> Result<BoxedEnv, EnvError> {
        let seed = self.seed.map(|s| s.wrapping_add(self.made));
        self.made += 1;
        env::make(&self.name, MakeOptions::default().seed(seed))
    }
}

/// Scores each genome by its average total reward over a fixed number of
/// capped episodes.
pub struct EpisodeEvaluator<F> {
    factory: F,
    num_episodes: usize,
    episode_duration: usize,
}

impl<F: EnvFactory> EpisodeEvaluator<F> {
    pub fn new(factory: F, num_episodes: usize, episode_duration: usize) -> Result<Self, DriverError> {
        if num_episodes == 0 {
            return Err(DriverError::InvalidEpisodeCount(num_episodes));
        }
        Ok(Self {
            factory,
            num_episodes,
            episode_duration,
        })
    }

    pub fn num_episodes(&self) -> usize {
        self.num_episodes
    }

    pub fn episode_duration(&self) -> usize {
        self.episode_duration
    }
}

impl<G, F> FitnessEvaluator<G> for EpisodeEvaluator<F>
where
    G: Genome,
    F: EnvFactory,
{
    type Error = DriverError;

    fn evaluate(
        &mut self,
        genomes: &mut [(GenomeKey, &mut G)],
        config: &G::Config,
    ) -> Result<(), DriverError> {
        let mut env = self.factory.make_env()?;
        for (key, genome) in genomes.iter_mut() {
            let mut total = 0.0;
            for _ in 0..self.num_episodes {
                let mut network = genome.network(config)?;
                total += run_episode(&mut env, &mut network, self.episode_duration)?;
            }
            let fitness = total / self.num_episodes as f64;
            genome.set_fitness(fitness);
            debug!(genome = *key, fitness, "genome evaluated");
        }
        env.close()?;
        Ok(())
    }
}

/// Plays one episode of at most `max_steps` steps, always taking the
/// network's highest-scoring action. Returns the summed reward.
pub fn run_episode<E, N>(env: &mut E, network: &mut N, max_steps: usize) -> Result<f64, DriverError>
where
    E: Env<Obs = Vec<f64>, Act = usize> + ?Sized,
    N: Activate + ?Sized,
{
    let mut obs = env.reset()?;
    let mut total_reward = 0.0;
    for _ in 0..max_steps {
        let action = argmax(&network.activate(&obs)?).ok_or(DriverError::EmptyNetworkOutput)?;
        let transition = env.step(action)?;
        total_reward += transition.reward;
        if transition.done() {
            break;
        }
        obs = transition.obs;
    }
    Ok(total_reward)
}

/// Index of the first maximum. NaN entries are skipped; a slice holding only
/// NaN picks index 0. `None` for an empty slice.
pub fn argmax(values: &[f64]) -> Option<usize> {
    if values.is_empty() {
        return None;
    }
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        if best.is_none_or(|(_, b)| v > b) {
            best = Some((i, v));
        }
    }
    Some(best.map_or(0, |(i, _)| i))
}
