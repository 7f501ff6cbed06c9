use std::fmt;

use super::GenomeKey;
use super::errors::NeatError;
use super::reporting::ReporterSet;

/// A candidate solution the evolver owns. Drivers only touch its fitness and
/// build networks from it.
pub trait Genome: Clone + fmt::Display {
    type Config;
    type Network: Activate;

    fn key(&self) -> GenomeKey;
    fn fitness(&self) -> Option<f64>;
    fn set_fitness(&mut self, fitness: f64);
    fn network(&self, config: &Self::Config) -> Result<Self::Network, NeatError>;
}

/// A network that maps an input vector to an output vector.
pub trait Activate {
    fn activate(&mut self, inputs: &[f64]) -> Result<Vec<f64>, NeatError>;
}

/// Assigns a fitness to every genome of a generation. Called once per
/// generation with the genomes in key order.
pub trait FitnessEvaluator<G: Genome> {
    type Error: std::error::Error + Send + Sync + 'static;

    fn evaluate(
        &mut self,
        genomes: &mut [(GenomeKey, &mut G)],
        config: &G::Config,
    ) -> Result<(), Self::Error>;
}

/// Drives generations of evaluation and reproduction and returns the best
/// genome seen.
pub trait PopulationEvolver {
    type Genome: Genome;

    /// Runs up to `generations` generations, or until the fitness threshold
    /// is met when `None`.
    fn run<E>(
        &mut self,
        evaluator: &mut E,
        generations: Option<usize>,
        reporters: &mut ReporterSet<'_>,
    ) -> Result<Self::Genome, NeatError>
    where
        E: FitnessEvaluator<Self::Genome>;
}
