//! Command-line surface of the `neuroevolution` binary.

use std::path::PathBuf;

use clap::Parser;

use crate::evolution::RunSettings;

pub const POLE_CONFIG: &str = "config/config-pole.toml";
pub const MOUNTAIN_CAR_CONFIG: &str = "config/config-mountain-car.toml";

/// Run NEAT on a game environment.
#[derive(Parser, Debug, Clone)]
#[command(name = "neuroevolution")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// The game environment to use
    #[arg(long, default_value = "CartPole-v1")]
    pub env: String,

    /// Number of generations to run
    #[arg(long, default_value_t = 100)]
    pub generations: usize,

    /// Maximum steps of each episode
    #[arg(long = "episodeDuration", default_value_t = 500)]
    pub episode_duration: usize,

    /// Number of episodes to average fitness over
    #[arg(long = "numEpisodes", default_value_t = 5)]
    pub num_episodes: usize,

    /// Path to the NEAT configuration file; empty picks the bundled one
    #[arg(long = "configPath", default_value = "")]
    pub config_path: String,

    /// Seed for the population and environments
    #[arg(long)]
    pub seed: Option<u64>,

    /// Directory the plots are written to
    #[arg(long = "outputDir", default_value = ".")]
    pub output_dir: PathBuf,

    /// Skip replaying the winner
    #[arg(long = "noReplay")]
    pub no_replay: bool,

    /// Also write per-generation statistics as JSON
    #[arg(long = "statsPath")]
    pub stats_path: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }

    pub fn settings(&self) -> RunSettings {
        RunSettings {
            env: self.env.clone(),
            generations: self.generations,
            episode_duration: self.episode_duration,
            num_episodes: self.num_episodes,
            config_path: resolve_config_path(&self.env, &self.config_path),
            seed: self.seed,
            output_dir: self.output_dir.clone(),
            replay: !self.no_replay,
            stats_path: self.stats_path.clone(),
            frame_interval: None,
        }
    }
}

/// An empty `config_path` falls back to the pole config for `CartPole-v1`
/// and to the mountain car config for every other environment.
pub fn resolve_config_path(env: &str, config_path: &str) -> PathBuf {
    if !config_path.is_empty() {
        return PathBuf::from(config_path);
    }
    if env == "CartPole-v1" {
        PathBuf::from(POLE_CONFIG)
    } else {
        PathBuf::from(MOUNTAIN_CAR_CONFIG)
    }
}
