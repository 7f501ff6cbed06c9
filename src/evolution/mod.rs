//! Evolution driver: scores genomes by playing episodes, runs the population
//! and replays the winner.

mod errors;
mod evaluator;
mod replay;
mod runner;

pub use errors::DriverError;
pub use evaluator::{EnvFactory, EpisodeEvaluator, NamedEnv, argmax, run_episode};
pub use replay::{ReplaySummary, replay};
pub use runner::{FITNESS_PLOT, RunContext, RunOutcome, RunSettings, SPECIES_PLOT, run};
