use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use serde::Serialize;

use super::activation::{mean, median, stdev};
use super::config::NeatConfig;
use super::errors::NeatError;
use super::genome::DefaultGenome;
use super::species::{Species, SpeciesSet};
use super::{GenomeKey, Genomes, SpeciesKey};

/// Hooks into the run loop. Every method defaults to a no-op.
pub trait Reporter {
    fn start_generation(&mut self, _generation: usize) {}

    fn end_generation(&mut self, _config: &NeatConfig, _population: &Genomes, _species: &SpeciesSet) {
    }

    fn post_evaluate(
        &mut self,
        _config: &NeatConfig,
        _population: &Genomes,
        _species: &SpeciesSet,
        _best: &DefaultGenome,
    ) {
    }

    fn post_reproduction(
        &mut self,
        _config: &NeatConfig,
        _population: &Genomes,
        _species: &SpeciesSet,
    ) {
    }

    fn complete_extinction(&mut self) {}

    fn found_solution(&mut self, _config: &NeatConfig, _generation: usize, _best: &DefaultGenome) {}

    fn species_stagnant(&mut self, _key: SpeciesKey, _species: &Species) {}

    fn info(&mut self, _message: &str) {}
}

/// Reporters attached to one run, borrowed for its duration so the caller can
/// read them back afterwards.
#[derive(Default)]
pub struct ReporterSet<'a> {
    reporters: Vec<&'a mut dyn Reporter>,
}

impl<'a> ReporterSet<'a> {
    pub fn new() -> Self {
        Self {
            reporters: Vec::new(),
        }
    }

    pub fn add(&mut self, reporter: &'a mut dyn Reporter) {
        self.reporters.push(reporter);
    }

    pub fn len(&self) -> usize {
        self.reporters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reporters.is_empty()
    }

    pub fn start_generation(&mut self, generation: usize) {
        for r in self.reporters.iter_mut() {
            r.start_generation(generation);
        }
    }

    pub fn end_generation(&mut self, config: &NeatConfig, population: &Genomes, species: &SpeciesSet) {
        for r in self.reporters.iter_mut() {
            r.end_generation(config, population, species);
        }
    }

    pub fn post_evaluate(
        &mut self,
        config: &NeatConfig,
        population: &Genomes,
        species: &SpeciesSet,
        best: &DefaultGenome,
    ) {
        for r in self.reporters.iter_mut() {
            r.post_evaluate(config, population, species, best);
        }
    }

    pub fn post_reproduction(
        &mut self,
        config: &NeatConfig,
        population: &Genomes,
        species: &SpeciesSet,
    ) {
        for r in self.reporters.iter_mut() {
            r.post_reproduction(config, population, species);
        }
    }

    pub fn complete_extinction(&mut self) {
        for r in self.reporters.iter_mut() {
            r.complete_extinction();
        }
    }

    pub fn found_solution(&mut self, config: &NeatConfig, generation: usize, best: &DefaultGenome) {
        for r in self.reporters.iter_mut() {
            r.found_solution(config, generation, best);
        }
    }

    pub fn species_stagnant(&mut self, key: SpeciesKey, species: &Species) {
        for r in self.reporters.iter_mut() {
            r.species_stagnant(key, species);
        }
    }

    pub fn info(&mut self, message: &str) {
        for r in self.reporters.iter_mut() {
            r.info(message);
        }
    }
}

/// Human-readable progress lines, one block per generation.
pub struct StdOutReporter<W: Write = io::Stdout> {
    out: W,
    show_species_detail: bool,
    generation: usize,
    generation_start: Option<Instant>,
    generation_times: VecDeque<f64>,
    num_extinctions: usize,
}

impl StdOutReporter {
    pub fn new(show_species_detail: bool) -> Self {
        Self::with_writer(io::stdout(), show_species_detail)
    }
}

impl<W: Write> StdOutReporter<W> {
    pub fn with_writer(out: W, show_species_detail: bool) -> Self {
        Self {
            out,
            show_species_detail,
            generation: 0,
            generation_start: None,
            generation_times: VecDeque::with_capacity(10),
            num_extinctions: 0,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

// Progress output is best effort; a closed stdout must not abort the run.
impl<W: Write> Reporter for StdOutReporter<W> {
    fn start_generation(&mut self, generation: usize) {
        self.generation = generation;
        let _ = writeln!(self.out, "\n ****** Running generation {generation} ****** \n");
        self.generation_start = Some(Instant::now());
    }

    fn end_generation(&mut self, _config: &NeatConfig, population: &Genomes, species: &SpeciesSet) {
        let ng = population.len();
        let ns = species.species.len();
        if self.show_species_detail {
            let _ = writeln!(self.out, "Population of {ng} members in {ns} species:");
            let _ = writeln!(self.out, "   ID   age  size   fitness   adj fit  stag");
            let _ = writeln!(self.out, "  ====  ===  ====  =========  =======  ====");
            for (sid, s) in &species.species {
                let age = self.generation.saturating_sub(s.created);
                let size = s.members.len();
                let fitness = s.fitness.map_or("--".to_string(), |f| format!("{f:.1}"));
                let adjusted = s
                    .adjusted_fitness
                    .map_or("--".to_string(), |f| format!("{f:.3}"));
                let stag = self.generation.saturating_sub(s.last_improved);
                let _ = writeln!(
                    self.out,
                    "  {sid:>4}  {age:>3}  {size:>4}  {fitness:>9}  {adjusted:>7}  {stag:>4}"
                );
            }
        } else {
            let _ = writeln!(self.out, "Population of {ng} members in {ns} species");
        }

        let elapsed = self
            .generation_start
            .map_or(0.0, |start| start.elapsed().as_secs_f64());
        if self.generation_times.len() == 10 {
            self.generation_times.pop_front();
        }
        self.generation_times.push_back(elapsed);
        let average =
            self.generation_times.iter().sum::<f64>() / self.generation_times.len() as f64;

        let _ = writeln!(self.out, "Total extinctions: {}", self.num_extinctions);
        if self.generation_times.len() > 1 {
            let _ = writeln!(
                self.out,
                "Generation time: {elapsed:.3} sec ({average:.3} average)"
            );
        } else {
            let _ = writeln!(self.out, "Generation time: {elapsed:.3} sec");
        }
    }

    fn post_evaluate(
        &mut self,
        _config: &NeatConfig,
        population: &Genomes,
        species: &SpeciesSet,
        best: &DefaultGenome,
    ) {
        let fitnesses: Vec<f64> = population.values().filter_map(|g| g.fitness).collect();
        let fit_mean = mean(&fitnesses);
        let fit_std = stdev(&fitnesses);
        let best_species = species
            .species_id(best.key)
            .map_or("--".to_string(), |sid| sid.to_string());
        let _ = writeln!(
            self.out,
            "Population's average fitness: {fit_mean:3.5} stdev: {fit_std:3.5}"
        );
        let _ = writeln!(
            self.out,
            "Best fitness: {:3.5} - size: {:?} - species {} - id {}",
            best.fitness.unwrap_or(f64::NAN),
            best.size(),
            best_species,
            best.key
        );
    }

    fn complete_extinction(&mut self) {
        self.num_extinctions += 1;
        let _ = writeln!(self.out, "All species extinct.");
    }

    fn found_solution(&mut self, _config: &NeatConfig, generation: usize, best: &DefaultGenome) {
        let _ = writeln!(
            self.out,
            "\nBest individual in generation {generation} meets fitness threshold - complexity: {:?}",
            best.size()
        );
    }

    fn species_stagnant(&mut self, key: SpeciesKey, species: &Species) {
        if self.show_species_detail {
            let _ = writeln!(
                self.out,
                "\nSpecies {key} with {} members is stagnated: removing it",
                species.members.len()
            );
        }
    }

    fn info(&mut self, message: &str) {
        let _ = writeln!(self.out, "{message}");
    }
}

/// Per-generation record of the best genome and every species' member
/// fitnesses, kept for plotting after the run.
#[derive(Debug, Clone, Default)]
pub struct StatisticsReporter {
    most_fit_genomes: Vec<DefaultGenome>,
    generation_statistics: Vec<BTreeMap<SpeciesKey, BTreeMap<GenomeKey, f64>>>,
}

#[derive(Debug, Serialize)]
struct GenerationSummary {
    generation: usize,
    best_key: GenomeKey,
    best_fitness: Option<f64>,
    best_size: (usize, usize),
    fitness_mean: f64,
    fitness_stdev: f64,
    fitness_median: f64,
    species_sizes: Vec<usize>,
}

impl StatisticsReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generations(&self) -> usize {
        self.generation_statistics.len()
    }

    pub fn most_fit_genomes(&self) -> &[DefaultGenome] {
        &self.most_fit_genomes
    }

    fn fitness_stat(&self, f: impl Fn(&[f64]) -> f64) -> Vec<f64> {
        self.generation_statistics
            .iter()
            .map(|species| {
                let scores: Vec<f64> = species
                    .values()
                    .flat_map(|members| members.values().copied())
                    .collect();
                f(&scores)
            })
            .collect()
    }

    pub fn fitness_mean(&self) -> Vec<f64> {
        self.fitness_stat(mean)
    }

    pub fn fitness_stdev(&self) -> Vec<f64> {
        self.fitness_stat(stdev)
    }

    pub fn fitness_median(&self) -> Vec<f64> {
        self.fitness_stat(median)
    }

    /// Best fitness recorded in each generation.
    pub fn best_fitness(&self) -> Vec<f64> {
        self.most_fit_genomes
            .iter()
            .map(|g| g.fitness.unwrap_or(f64::NAN))
            .collect()
    }

    fn by_fitness_desc(&self) -> Vec<&DefaultGenome> {
        let mut genomes: Vec<&DefaultGenome> = self.most_fit_genomes.iter().collect();
        genomes.sort_by(|a, b| {
            let fa = a.fitness.unwrap_or(f64::NEG_INFINITY);
            let fb = b.fitness.unwrap_or(f64::NEG_INFINITY);
            fb.total_cmp(&fa)
        });
        genomes
    }

    pub fn best_genome(&self) -> Option<&DefaultGenome> {
        self.by_fitness_desc().into_iter().next()
    }

    pub fn best_genomes(&self, n: usize) -> Vec<&DefaultGenome> {
        self.by_fitness_desc().into_iter().take(n).collect()
    }

    /// Like [`best_genomes`](Self::best_genomes) but each genome key at most
    /// once.
    pub fn best_unique_genomes(&self, n: usize) -> Vec<&DefaultGenome> {
        let mut seen = BTreeSet::new();
        self.by_fitness_desc()
            .into_iter()
            .filter(|g| seen.insert(g.key))
            .take(n)
            .collect()
    }

    /// Member count of species `1..=max_species_id` for every generation.
    pub fn species_sizes(&self) -> Vec<Vec<usize>> {
        let max_species = self
            .generation_statistics
            .iter()
            .flat_map(|gen_data| gen_data.keys().copied())
            .max()
            .unwrap_or(0);
        self.generation_statistics
            .iter()
            .map(|gen_data| {
                (1..=max_species)
                    .map(|sid| gen_data.get(&sid).map_or(0, |m| m.len()))
                    .collect()
            })
            .collect()
    }

    /// Mean member fitness of species `1..=max_species_id` per generation,
    /// `None` where the species did not exist.
    pub fn species_fitness(&self) -> Vec<Vec<Option<f64>>> {
        let max_species = self
            .generation_statistics
            .iter()
            .flat_map(|gen_data| gen_data.keys().copied())
            .max()
            .unwrap_or(0);
        self.generation_statistics
            .iter()
            .map(|gen_data| {
                (1..=max_species)
                    .map(|sid| {
                        gen_data
                            .get(&sid)
                            .filter(|m| !m.is_empty())
                            .map(|m| mean(&m.values().copied().collect::<Vec<_>>()))
                    })
                    .collect()
            })
            .collect()
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<(), NeatError> {
        let path = path.as_ref();
        let means = self.fitness_mean();
        let stdevs = self.fitness_stdev();
        let medians = self.fitness_median();
        let sizes = self.species_sizes();

        let summaries: Vec<GenerationSummary> = self
            .most_fit_genomes
            .iter()
            .enumerate()
            .map(|(generation, best)| GenerationSummary {
                generation,
                best_key: best.key,
                best_fitness: best.fitness,
                best_size: best.size(),
                fitness_mean: means[generation],
                fitness_stdev: stdevs[generation],
                fitness_median: medians[generation],
                species_sizes: sizes[generation].clone(),
            })
            .collect();

        let file = File::create(path).map_err(|source| NeatError::WriteStatistics {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::to_writer_pretty(BufWriter::new(file), &summaries)?;
        Ok(())
    }
}

impl Reporter for StatisticsReporter {
    fn post_evaluate(
        &mut self,
        _config: &NeatConfig,
        population: &Genomes,
        species: &SpeciesSet,
        best: &DefaultGenome,
    ) {
        self.most_fit_genomes.push(best.clone());

        let species_stats = species
            .species
            .iter()
            .map(|(sid, s)| {
                let members = s
                    .members
                    .iter()
                    .filter_map(|k| population.get(k).and_then(|g| g.fitness.map(|f| (*k, f))))
                    .collect();
                (*sid, members)
            })
            .collect();
        self.generation_statistics.push(species_stats);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neat::config::tests::pole_config;

    fn genome(key: GenomeKey, fitness: f64) -> DefaultGenome {
        let mut g = DefaultGenome::new(key);
        g.fitness = Some(fitness);
        g
    }

    fn generation(fitnesses: &[(GenomeKey, f64)], species_of: &[SpeciesKey]) -> (Genomes, SpeciesSet) {
        let population: Genomes = fitnesses.iter().map(|&(k, f)| (k, genome(k, f))).collect();
        let mut set = SpeciesSet::new();
        for (&(key, _), &sid) in fitnesses.iter().zip(species_of) {
            set.species
                .entry(sid)
                .or_insert_with(|| Species::new(sid, 0, genome(key, 0.0)))
                .members
                .push(key);
        }
        (population, set)
    }

    #[test]
    fn test_statistics_track_each_generation() {
        let config = pole_config();
        let mut stats = StatisticsReporter::new();

        let (pop, set) = generation(&[(1, 1.0), (2, 3.0)], &[1, 1]);
        stats.post_evaluate(&config, &pop, &set, &pop[&2]);
        let (pop, set) = generation(&[(3, 2.0), (4, 6.0), (5, 4.0)], &[1, 2, 2]);
        stats.post_evaluate(&config, &pop, &set, &pop[&4]);

        assert_eq!(stats.generations(), 2);
        assert_eq!(stats.fitness_mean(), vec![2.0, 4.0]);
        assert_eq!(stats.fitness_median(), vec![2.0, 4.0]);
        assert_eq!(stats.best_fitness(), vec![3.0, 6.0]);
        assert_eq!(stats.species_sizes(), vec![vec![2, 0], vec![1, 2]]);
        assert_eq!(
            stats.species_fitness(),
            vec![vec![Some(2.0), None], vec![Some(2.0), Some(5.0)]]
        );
        assert_eq!(stats.best_genome().map(|g| g.key), Some(4));
    }

    #[test]
    fn test_best_unique_genomes_skips_repeats() {
        let config = pole_config();
        let mut stats = StatisticsReporter::new();
        let (pop, set) = generation(&[(1, 5.0)], &[1]);
        stats.post_evaluate(&config, &pop, &set, &pop[&1]);
        stats.post_evaluate(&config, &pop, &set, &pop[&1]);
        let (pop, set) = generation(&[(2, 3.0)], &[1]);
        stats.post_evaluate(&config, &pop, &set, &pop[&2]);

        assert_eq!(stats.best_genomes(2).len(), 2);
        let unique: Vec<_> = stats.best_unique_genomes(5).iter().map(|g| g.key).collect();
        assert_eq!(unique, vec![1, 2]);
    }

    #[test]
    fn test_stdout_reporter_lines() {
        let config = pole_config();
        let (pop, set) = generation(&[(1, 1.0), (2, 3.0)], &[1, 1]);
        let mut reporter = StdOutReporter::with_writer(Vec::new(), true);

        reporter.start_generation(0);
        reporter.post_evaluate(&config, &pop, &set, &pop[&2]);
        reporter.end_generation(&config, &pop, &set);
        reporter.found_solution(&config, 0, &pop[&2]);

        let text = String::from_utf8(reporter.into_inner()).unwrap();
        assert!(text.contains(" ****** Running generation 0 ****** "));
        assert!(text.contains("Population's average fitness: 2.00000 stdev: 1.00000"));
        assert!(text.contains("Best fitness: 3.00000 - size: (0, 0) - species -- - id 2"));
        assert!(text.contains("Population of 2 members in 1 species:"));
        assert!(text.contains("Total extinctions: 0"));
        assert!(text.contains("meets fitness threshold - complexity: (0, 0)"));
    }

    #[test]
    fn test_save_json_writes_one_entry_per_generation() {
        let config = pole_config();
        let mut stats = StatisticsReporter::new();
        let (pop, set) = generation(&[(1, 1.0), (2, 3.0)], &[1, 1]);
        stats.post_evaluate(&config, &pop, &set, &pop[&2]);

        let path = std::env::temp_dir().join(format!("stats-{}.json", uuid::Uuid::new_v4()));
        stats.save_json(&path).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written.as_array().map(|a| a.len()), Some(1));
        assert_eq!(written[0]["best_key"], 2);
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_save_json_into_missing_directory() {
        let stats = StatisticsReporter::new();
        let path = std::env::temp_dir()
            .join(uuid::Uuid::new_v4().to_string())
            .join("stats.json");

        let err = stats.save_json(&path).unwrap_err();

        assert!(matches!(err, NeatError::WriteStatistics { path: ref p, .. } if *p == path));
        let message = err.to_string();
        assert!(message.starts_with("failed to write statistics"));
        assert!(!message.contains("config"));
    }
}
