use std::path::PathBuf;

use thiserror::Error;

use crate::env::EnvError;
use crate::neat::NeatError;
use crate::visualize::VisualizeError;

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("environment error: {0}")]
    Env(#[from] EnvError),

    #[error("neat error: {0}")]
    Neat(#[from] NeatError),

    #[error("plotting failed: {0}")]
    Visualize(#[from] VisualizeError),

    #[error("network produced no outputs")]
    EmptyNetworkOutput,

    #[error("num_episodes must be at least 1, got {0}")]
    InvalidEpisodeCount(usize),

    #[error("failed to write replay frame: {0}")]
    Replay(#[source] std::io::Error),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
