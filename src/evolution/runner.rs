use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::info;
use uuid::Uuid;

use super::errors::DriverError;
use super::evaluator::{EpisodeEvaluator, NamedEnv};
use super::replay::replay;
use crate::env::{self, MakeOptions, RenderMode};
use crate::neat::{
    DefaultGenome, FitnessEvaluator, Genome, NeatConfig, NeatError, Population, PopulationEvolver,
    ReporterSet, StatisticsReporter, StdOutReporter,
};
use crate::visualize;

pub const FITNESS_PLOT: &str = "avg_fitness.svg";
pub const SPECIES_PLOT: &str = "speciation.svg";

/// Everything one evolution run needs.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub env: String,
    pub generations: usize,
    pub episode_duration: usize,
    pub num_episodes: usize,
    pub config_path: PathBuf,
    pub seed: Option<u64>,
    pub output_dir: PathBuf,
    pub replay: bool,
    pub stats_path: Option<PathBuf>,
    /// Overrides the environment's render rate during replay.
    pub frame_interval: Option<Duration>,
}

#[derive(Debug)]
pub struct RunOutcome {
    pub winner: DefaultGenome,
    pub statistics: StatisticsReporter,
    pub plots: Vec<PathBuf>,
}

/// State shared by the phases of one run: the loaded config and the
/// reporters that outlive the population.
pub struct RunContext<W: Write = io::Stdout> {
    pub run_id: Uuid,
    pub config: NeatConfig,
    pub statistics: StatisticsReporter,
    progress: StdOutReporter<W>,
}

impl RunContext {
    pub fn new(config: NeatConfig) -> Self {
        Self::with_output(config, io::stdout())
    }
}

impl<W: Write> RunContext<W> {
    pub fn with_output(config: NeatConfig, out: W) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            config,
            statistics: StatisticsReporter::new(),
            progress: StdOutReporter::with_writer(out, true),
        }
    }

    /// Runs `generations` generations from a fresh population and returns
    /// the best genome seen.
    pub fn evolve<E>(
        &mut self,
        evaluator: &mut E,
        generations: usize,
        seed: Option<u64>,
    ) -> Result<DefaultGenome, DriverError>
    where
        E: FitnessEvaluator<DefaultGenome>,
    {
        let mut population = Population::new(self.config.clone(), seed);
        let mut reporters = ReporterSet::new();
        reporters.add(&mut self.progress);
        reporters.add(&mut self.statistics);

        population
            .run(evaluator, Some(generations), &mut reporters)
            .map_err(|e| match e {
                // surface the evaluator's own error instead of the wrapper
                NeatError::Evaluation(inner) => match inner.downcast::<DriverError>() {
                    Ok(driver) => *driver,
                    Err(other) => DriverError::Neat(NeatError::Evaluation(other)),
                },
                other => DriverError::Neat(other),
            })
    }

    /// Writes the fitness and speciation plots into `output_dir`.
    pub fn plot(&self, output_dir: &Path) -> Result<Vec<PathBuf>, DriverError> {
        std::fs::create_dir_all(output_dir).map_err(|source| DriverError::Io {
            path: output_dir.to_path_buf(),
            source,
        })?;
        let fitness = output_dir.join(FITNESS_PLOT);
        visualize::plot_stats(&self.statistics, &fitness, false)?;
        let species = output_dir.join(SPECIES_PLOT);
        visualize::plot_species(&self.statistics, &species)?;
        Ok(vec![fitness, species])
    }

    pub fn into_statistics(self) -> StatisticsReporter {
        self.statistics
    }
}

/// Loads the config, evolves a population against `settings.env`, prints and
/// replays the winner, then writes the plots.
pub async fn run(settings: &RunSettings) -> Result<RunOutcome, DriverError> {
    info!(
        env = %settings.env,
        config = %settings.config_path.display(),
        "initializing"
    );
    let config = NeatConfig::load(&settings.config_path)?;
    let mut evaluator = EpisodeEvaluator::new(
        NamedEnv::new(&settings.env, settings.seed),
        settings.num_episodes,
        settings.episode_duration,
    )?;
    let mut ctx = RunContext::new(config);

    info!(
        run_id = %ctx.run_id,
        generations = settings.generations,
        num_episodes = evaluator.num_episodes(),
        episode_duration = evaluator.episode_duration(),
        "running generations"
    );
    let winner = ctx.evolve(&mut evaluator, settings.generations, settings.seed)?;
    info!(run_id = %ctx.run_id, key = winner.key, fitness = ?winner.fitness, "evolution completed");

    println!("\nBest genome:\n{winner}");

    if settings.replay {
        info!(run_id = %ctx.run_id, "replaying winner");
        let env = env::make(
            &settings.env,
            MakeOptions::default()
                .render_mode(RenderMode::Human)
                .seed(settings.seed),
        )?;
        let mut network = winner.network(&ctx.config)?;
        let summary = replay(env, &mut network, settings.frame_interval, &mut io::stdout()).await?;
        info!(steps = summary.steps, reward = summary.reward, "replay finished");
    }

    info!(run_id = %ctx.run_id, dir = %settings.output_dir.display(), "plotting");
    let plots = ctx.plot(&settings.output_dir)?;
    if let Some(path) = &settings.stats_path {
        ctx.statistics.save_json(path)?;
    }

    info!(run_id = %ctx.run_id, "done");
    Ok(RunOutcome {
        winner,
        statistics: ctx.into_statistics(),
        plots,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neat::GenomeKey;

    const POLE_CONFIG: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/config/config-pole.toml");

    /// Counts calls to the wrapped evaluator.
    struct Counting<E> {
        inner: E,
        calls: usize,
        sizes: Vec<usize>,
        all_finite: bool,
    }

    impl<E: FitnessEvaluator<DefaultGenome>> FitnessEvaluator<DefaultGenome> for Counting<E> {
        type Error = E::Error;

        fn evaluate(
            &mut self,
            genomes: &mut [(GenomeKey, &mut DefaultGenome)],
            config: &NeatConfig,
        ) -> Result<(), E::Error> {
            self.calls += 1;
            self.sizes.push(genomes.len());
            self.inner.evaluate(genomes, config)?;
            self.all_finite = genomes
                .iter()
                .all(|(_, g)| g.fitness.is_some_and(f64::is_finite));
            Ok(())
        }
    }

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("neuroevolution-{}", Uuid::new_v4()))
    }

    #[test]
    fn test_cart_pole_single_generation_end_to_end() {
        let config = NeatConfig::load(POLE_CONFIG).unwrap();
        let pop_size = config.neat.pop_size;
        let mut ctx = RunContext::with_output(config, Vec::new());
        let mut evaluator = Counting {
            inner: EpisodeEvaluator::new(NamedEnv::new("CartPole-v1", Some(5)), 2, 10).unwrap(),
            calls: 0,
            sizes: Vec::new(),
            all_finite: false,
        };

        let winner = ctx.evolve(&mut evaluator, 1, Some(5)).unwrap();

        assert_eq!(evaluator.calls, 1);
        assert_eq!(evaluator.sizes, vec![pop_size]);
        assert!(evaluator.all_finite);
        let fitness = winner.fitness.unwrap();
        assert!(fitness.is_finite());
        assert!(fitness <= 10.0);

        let stats = &ctx.statistics;
        assert_eq!(stats.generations(), 1);
        assert_eq!(stats.most_fit_genomes().len(), 1);
        assert_eq!(stats.most_fit_genomes()[0].key, winner.key);
        assert!(stats.fitness_mean().iter().all(|f| f.is_finite()));
    }

    #[test]
    fn test_evaluator_errors_surface_unwrapped() {
        let config = NeatConfig::load(POLE_CONFIG).unwrap();
        let mut ctx = RunContext::with_output(config, Vec::new());
        let mut evaluator = EpisodeEvaluator::new(NamedEnv::new("Pong-v5", None), 1, 10).unwrap();

        let err = ctx.evolve(&mut evaluator, 1, Some(1)).unwrap_err();
        assert!(matches!(
            err,
            DriverError::Env(env::EnvError::UnknownEnvironment(_))
        ));
    }

    #[test]
    fn test_plot_writes_both_files() {
        let config = NeatConfig::load(POLE_CONFIG).unwrap();
        let mut ctx = RunContext::with_output(config, Vec::new());
        let mut evaluator =
            EpisodeEvaluator::new(NamedEnv::new("CartPole-v1", Some(2)), 1, 5).unwrap();
        ctx.evolve(&mut evaluator, 2, Some(2)).unwrap();

        let dir = scratch_dir();
        let plots = ctx.plot(&dir).unwrap();
        assert_eq!(plots, vec![dir.join(FITNESS_PLOT), dir.join(SPECIES_PLOT)]);
        assert!(plots.iter().all(|p| p.exists()));
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn test_run_without_replay() {
        let dir = scratch_dir();
        let settings = RunSettings {
            env: "CartPole-v1".into(),
            generations: 1,
            episode_duration: 10,
            num_episodes: 2,
            config_path: POLE_CONFIG.into(),
            seed: Some(9),
            output_dir: dir.clone(),
            replay: false,
            stats_path: Some(dir.join("stats.json")),
            frame_interval: None,
        };

        let outcome = run(&settings).await.unwrap();

        assert!(outcome.winner.fitness.is_some_and(f64::is_finite));
        assert_eq!(outcome.statistics.generations(), 1);
        assert_eq!(outcome.plots.len(), 2);
        assert!(dir.join("stats.json").exists());
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn test_missing_config_fails_before_running() {
        let settings = RunSettings {
            env: "CartPole-v1".into(),
            generations: 1,
            episode_duration: 10,
            num_episodes: 1,
            config_path: "does/not/exist.toml".into(),
            seed: None,
            output_dir: scratch_dir(),
            replay: false,
            stats_path: None,
            frame_interval: None,
        };
        let err = run(&settings).await.unwrap_err();
        assert!(matches!(err, DriverError::Neat(NeatError::Io { .. })));
    }
}
