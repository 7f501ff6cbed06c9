use std::path::PathBuf;

use thiserror::Error;

use super::GenomeKey;

#[derive(Error, Debug)]
pub enum NeatError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Config(String),

    #[error("expected {expected} inputs, got {got}")]
    InputMismatch { expected: usize, got: usize },

    #[error("genome {0} was not assigned a fitness")]
    FitnessNotAssigned(GenomeKey),

    #[error("all species went extinct")]
    CompleteExtinction,

    #[error("cannot run without a generation limit when fitness termination is disabled")]
    Unbounded,

    #[error("no generation was evaluated")]
    NoWinner,

    #[error("fitness evaluation failed: {0}")]
    Evaluation(Box<dyn std::error::Error + Send + Sync>),

    #[error("failed to write statistics {path}: {source}")]
    WriteStatistics {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write statistics: {0}")]
    Statistics(#[from] serde_json::Error),
}
