use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::debug;

use super::config::NeatConfig;
use super::errors::NeatError;
use super::genome::DefaultGenome;
use super::reporting::ReporterSet;
use super::reproduction::Reproduction;
use super::species::SpeciesSet;
use super::traits::{FitnessEvaluator, PopulationEvolver};
use super::{GenomeKey, Genomes};

/// A NEAT population: the current genomes, their species and the breeding
/// state carried across generations.
pub struct Population {
    config: NeatConfig,
    population: Genomes,
    species: SpeciesSet,
    reproduction: Reproduction,
    generation: usize,
    best_genome: Option<DefaultGenome>,
    rng: StdRng,
}

impl Population {
    /// Creates `pop_size` fresh genomes and speciates them as generation 0.
    /// A `seed` makes the whole run reproducible.
    pub fn new(config: NeatConfig, seed: Option<u64>) -> Self {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut reproduction = Reproduction::new(&config.genome);
        let population = reproduction.create_new(&config.genome, config.neat.pop_size, &mut rng);
        let mut species = SpeciesSet::new();
        species.speciate(&config, &population, 0);
        debug!(
            pop_size = population.len(),
            species = species.species.len(),
            "initial population created"
        );

        Self {
            config,
            population,
            species,
            reproduction,
            generation: 0,
            best_genome: None,
            rng,
        }
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn population(&self) -> &Genomes {
        &self.population
    }

    pub fn species(&self) -> &SpeciesSet {
        &self.species
    }

    /// Fittest genome seen across all evaluated generations.
    pub fn best_genome(&self) -> Option<&DefaultGenome> {
        self.best_genome.as_ref()
    }

    fn evaluate<E>(&mut self, evaluator: &mut E) -> Result<(), NeatError>
    where
        E: FitnessEvaluator<DefaultGenome>,
    {
        let mut genomes: Vec<(GenomeKey, &mut DefaultGenome)> = self
            .population
            .iter_mut()
            .map(|(key, genome)| (*key, genome))
            .collect();
        evaluator
            .evaluate(&mut genomes, &self.config)
            .map_err(|e| NeatError::Evaluation(Box::new(e)))
    }

    /// Fittest genome of the current generation; the first one wins ties.
    fn generation_best(&self) -> Result<DefaultGenome, NeatError> {
        let mut best: Option<(&DefaultGenome, f64)> = None;
        for genome in self.population.values() {
            let fitness = genome
                .fitness
                .ok_or(NeatError::FitnessNotAssigned(genome.key))?;
            if best.is_none_or(|(_, f)| fitness > f) {
                best = Some((genome, fitness));
            }
        }
        best.map(|(genome, _)| genome.clone())
            .ok_or(NeatError::CompleteExtinction)
    }
}

impl PopulationEvolver for Population {
    type Genome = DefaultGenome;

    fn run<E>(
        &mut self,
        evaluator: &mut E,
        generations: Option<usize>,
        reporters: &mut ReporterSet<'_>,
    ) -> Result<DefaultGenome, NeatError>
    where
        E: FitnessEvaluator<DefaultGenome>,
    {
        let no_fitness_termination = self.config.neat.no_fitness_termination;
        if generations.is_none() && no_fitness_termination {
            return Err(NeatError::Unbounded);
        }

        let mut completed = 0;
        while generations.is_none_or(|limit| completed < limit) {
            completed += 1;
            reporters.start_generation(self.generation);

            self.evaluate(evaluator)?;
            let best = self.generation_best()?;
            reporters.post_evaluate(&self.config, &self.population, &self.species, &best);

            if self
                .best_genome
                .as_ref()
                .is_none_or(|current| best.fitness > current.fitness)
            {
                self.best_genome = Some(best.clone());
            }

            if !no_fitness_termination {
                let fitnesses: Vec<f64> =
                    self.population.values().filter_map(|g| g.fitness).collect();
                let criterion = self.config.neat.fitness_criterion.apply(&fitnesses);
                if criterion >= self.config.neat.fitness_threshold {
                    reporters.found_solution(&self.config, self.generation, &best);
                    break;
                }
            }

            self.population = self.reproduction.reproduce(
                &self.config,
                &mut self.species,
                &self.population,
                self.generation,
                reporters,
                &mut self.rng,
            );
            reporters.post_reproduction(&self.config, &self.population, &self.species);

            if self.species.species.is_empty() {
                reporters.complete_extinction();
                if !self.config.neat.reset_on_extinction {
                    return Err(NeatError::CompleteExtinction);
                }
                self.population = self.reproduction.create_new(
                    &self.config.genome,
                    self.config.neat.pop_size,
                    &mut self.rng,
                );
            }

            self.species
                .speciate(&self.config, &self.population, self.generation);
            reporters.end_generation(&self.config, &self.population, &self.species);
            self.generation += 1;
        }

        if no_fitness_termination {
            if let Some(best) = &self.best_genome {
                reporters.found_solution(&self.config, self.generation, best);
            }
        }

        self.best_genome.clone().ok_or(NeatError::NoWinner)
    }
}
