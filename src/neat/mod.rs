//! NEAT backend: configuration, genomes, feed-forward networks, speciation
//! and the generational run loop.

use std::collections::BTreeMap;

mod activation;
pub(crate) mod config;
mod errors;
mod genome;
mod network;
mod population;
mod reporting;
mod reproduction;
mod species;
mod stagnation;
mod traits;

pub type NodeKey = i64;
pub type GenomeKey = u64;
pub type ConnectionKey = (NodeKey, NodeKey);
pub type SpeciesKey = u64;
pub type Genomes = BTreeMap<GenomeKey, DefaultGenome>;

pub use activation::{Activation, Aggregation};
pub use config::{
    FitnessCriterion, FloatAttribute, GenomeConfig, InitialConnection, NeatConfig,
    ReproductionConfig, RunConfig, SpeciesFitnessFunc, SpeciesSetConfig, StagnationConfig,
};
pub use errors::NeatError;
pub use genome::{ConnectionGene, DefaultGenome, NodeGene, NodeIndexer};
pub use network::{FeedForwardNetwork, creates_cycle, feed_forward_layers, required_for_output};
pub use population::Population;
pub use reporting::{Reporter, ReporterSet, StatisticsReporter, StdOutReporter};
pub use reproduction::Reproduction;
pub use species::{DistanceCache, Species, SpeciesSet};
pub use stagnation::update as update_stagnation;
pub use traits::{Activate, FitnessEvaluator, Genome, PopulationEvolver};
