use std::collections::HashMap;

use rand::Rng;
use rand::seq::SliceRandom;

use super::activation::mean;
use super::config::{GenomeConfig, NeatConfig};
use super::genome::{DefaultGenome, NodeIndexer};
use super::reporting::ReporterSet;
use super::species::SpeciesSet;
use super::stagnation;
use super::{GenomeKey, Genomes};

/// Creates genomes and breeds each generation from the surviving species.
#[derive(Debug, Clone)]
pub struct Reproduction {
    next_genome_key: GenomeKey,
    node_indexer: NodeIndexer,
    ancestors: HashMap<GenomeKey, (GenomeKey, GenomeKey)>,
}

impl Reproduction {
    pub fn new(config: &GenomeConfig) -> Self {
        Self {
            next_genome_key: 1,
            node_indexer: NodeIndexer::new(config),
            ancestors: HashMap::new(),
        }
    }

    fn next_key(&mut self) -> GenomeKey {
        let key = self.next_genome_key;
        self.next_genome_key += 1;
        key
    }

    /// Parents of a genome bred by crossover.
    pub fn ancestors(&self, key: GenomeKey) -> Option<(GenomeKey, GenomeKey)> {
        self.ancestors.get(&key).copied()
    }

    pub fn create_new<R: Rng + ?Sized>(
        &mut self,
        config: &GenomeConfig,
        count: usize,
        rng: &mut R,
    ) -> Genomes {
        let mut genomes = Genomes::new();
        for _ in 0..count {
            let key = self.next_key();
            let mut genome = DefaultGenome::new(key);
            genome.configure_new(config, rng);
            genomes.insert(key, genome);
        }
        genomes
    }

    /// Number of offspring per species, proportional to adjusted fitness and
    /// moved halfway from the previous size, then normalized to `pop_size`.
    pub fn compute_spawn(
        adjusted_fitness: &[f64],
        previous_sizes: &[usize],
        pop_size: usize,
        min_species_size: usize,
    ) -> Vec<usize> {
        let af_sum: f64 = adjusted_fitness.iter().sum();

        let spawn_amounts: Vec<f64> = adjusted_fitness
            .iter()
            .zip(previous_sizes)
            .map(|(&af, &ps)| {
                let target = if af_sum > 0.0 {
                    (af / af_sum * pop_size as f64).max(min_species_size as f64)
                } else {
                    min_species_size as f64
                };
                let ps = ps as f64;
                let d = (target - ps) * 0.5;
                let c = d.round_ties_even();
                if c.abs() > 0.0 {
                    ps + c
                } else if d > 0.0 {
                    ps + 1.0
                } else if d < 0.0 {
                    ps - 1.0
                } else {
                    ps
                }
            })
            .collect();

        let total: f64 = spawn_amounts.iter().sum();
        let norm = if total > 0.0 {
            pop_size as f64 / total
        } else {
            1.0
        };
        spawn_amounts
            .into_iter()
            .map(|n| ((n * norm).round_ties_even().max(0.0) as usize).max(min_species_size))
            .collect()
    }

    /// Breeds the next generation. Stagnant species are dropped; when none
    /// survive the species set is emptied and an empty population returned.
    pub fn reproduce<R: Rng + ?Sized>(
        &mut self,
        config: &NeatConfig,
        species_set: &mut SpeciesSet,
        population: &Genomes,
        generation: usize,
        reporters: &mut ReporterSet<'_>,
        rng: &mut R,
    ) -> Genomes {
        let mut all_fitnesses = Vec::new();
        let mut remaining = Vec::new();
        for (sid, stagnant) in
            stagnation::update(&config.stagnation, species_set, population, generation)
        {
            let species = &species_set.species[&sid];
            if stagnant {
                reporters.species_stagnant(sid, species);
            } else {
                all_fitnesses.extend(species.member_fitnesses(population));
                remaining.push(sid);
            }
        }

        if remaining.is_empty() {
            species_set.species.clear();
            return Genomes::new();
        }

        let min_fitness = all_fitnesses.iter().copied().fold(f64::INFINITY, f64::min);
        let max_fitness = all_fitnesses
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        let fitness_range = (max_fitness - min_fitness).max(1.0);

        let mut adjusted = Vec::with_capacity(remaining.len());
        let mut previous_sizes = Vec::with_capacity(remaining.len());
        for sid in &remaining {
            if let Some(species) = species_set.species.get_mut(sid) {
                let msf = mean(&species.member_fitnesses(population));
                let af = (msf - min_fitness) / fitness_range;
                species.adjusted_fitness = Some(af);
                adjusted.push(af);
                previous_sizes.push(species.members.len());
            }
        }
        reporters.info(&format!(
            "Average adjusted fitness: {:.3}",
            mean(&adjusted)
        ));

        let elitism = config.reproduction.elitism;
        let min_species_size = config.reproduction.min_species_size.max(elitism);
        let spawn_amounts = Self::compute_spawn(
            &adjusted,
            &previous_sizes,
            config.neat.pop_size,
            min_species_size,
        );

        let mut survivors = std::mem::take(&mut species_set.species);
        let mut offspring = Genomes::new();
        for (sid, spawn) in remaining.into_iter().zip(spawn_amounts) {
            let Some(mut species) = survivors.remove(&sid) else {
                continue;
            };
            let mut spawn = spawn.max(elitism);

            let mut old_members: Vec<&DefaultGenome> = species
                .members
                .iter()
                .filter_map(|k| population.get(k))
                .collect();
            species.members.clear();
            species_set.species.insert(sid, species);

            old_members.sort_by(|a, b| {
                let fa = a.fitness.unwrap_or(f64::NEG_INFINITY);
                let fb = b.fitness.unwrap_or(f64::NEG_INFINITY);
                fb.total_cmp(&fa)
            });

            for elite in old_members.iter().take(elitism) {
                offspring.insert(elite.key, (*elite).clone());
                spawn = spawn.saturating_sub(1);
            }
            if spawn == 0 {
                continue;
            }

            let cutoff = ((config.reproduction.survival_threshold * old_members.len() as f64)
                .ceil() as usize)
                .max(2);
            old_members.truncate(cutoff);

            for _ in 0..spawn {
                let (Some(parent1), Some(parent2)) =
                    (old_members.choose(rng), old_members.choose(rng))
                else {
                    break;
                };
                let key = self.next_key();
                let mut child = DefaultGenome::crossover(key, parent1, parent2, rng);
                child.mutate(&config.genome, &mut self.node_indexer, rng);
                self.ancestors.insert(key, (parent1.key, parent2.key));
                offspring.insert(key, child);
            }
        }
        offspring
    }
}
