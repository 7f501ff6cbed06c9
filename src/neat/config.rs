//! NEAT configuration, loaded from a TOML file with one table per
//! collaborator: `[neat]`, `[genome]`, `[species_set]`, `[stagnation]` and
//! `[reproduction]`.

use std::path::Path;

use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use super::NodeKey;
use super::activation::{Activation, Aggregation, mean, median};
use super::errors::NeatError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeatConfig {
    pub neat: RunConfig,
    pub genome: GenomeConfig,
    pub species_set: SpeciesSetConfig,
    pub stagnation: StagnationConfig,
    pub reproduction: ReproductionConfig,
}

impl NeatConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, NeatError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| NeatError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, NeatError> {
        let config: NeatConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), NeatError> {
        if self.neat.pop_size < 2 {
            return Err(NeatError::Config("pop_size must be at least 2".into()));
        }
        self.genome.validate()?;
        if self.species_set.compatibility_threshold <= 0.0 {
            return Err(NeatError::Config(
                "compatibility_threshold must be positive".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.reproduction.survival_threshold) {
            return Err(NeatError::Config(
                "survival_threshold must be within 0..=1".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitnessCriterion {
    Max,
    Min,
    Mean,
}

impl FitnessCriterion {
    pub fn apply(self, values: &[f64]) -> f64 {
        match self {
            FitnessCriterion::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            FitnessCriterion::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            FitnessCriterion::Mean => mean(values),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub fitness_criterion: FitnessCriterion,
    pub fitness_threshold: f64,
    pub pop_size: usize,
    #[serde(default)]
    pub reset_on_extinction: bool,
    #[serde(default)]
    pub no_fitness_termination: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitialConnection {
    Unconnected,
    /// One random input wired to every hidden and output node.
    FsNeat,
    /// Inputs to hidden, hidden to outputs; inputs to outputs only when there
    /// are no hidden nodes.
    Full,
    FullDirect,
    Partial,
    PartialDirect,
}

/// Initialization and mutation parameters for a float gene attribute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FloatAttribute {
    pub init_mean: f64,
    pub init_stdev: f64,
    pub min_value: f64,
    pub max_value: f64,
    pub mutate_power: f64,
    pub mutate_rate: f64,
    pub replace_rate: f64,
}

impl FloatAttribute {
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min_value, self.max_value)
    }

    pub fn init_value<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let z: f64 = rng.sample(StandardNormal);
        self.clamp(self.init_mean + z * self.init_stdev)
    }

    pub fn mutate_value<R: Rng + ?Sized>(&self, value: f64, rng: &mut R) -> f64 {
        let r: f64 = rng.r#gen();
        if r < self.mutate_rate {
            let z: f64 = rng.sample(StandardNormal);
            return self.clamp(value + z * self.mutate_power);
        }
        if r < self.replace_rate + self.mutate_rate {
            return self.init_value(rng);
        }
        value
    }

    fn validate(&self, name: &str) -> Result<(), NeatError> {
        if self.min_value > self.max_value {
            return Err(NeatError::Config(format!(
                "{name}: min_value exceeds max_value"
            )));
        }
        if self.init_stdev < 0.0 || self.mutate_power < 0.0 {
            return Err(NeatError::Config(format!(
                "{name}: init_stdev and mutate_power must be non-negative"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenomeConfig {
    pub num_inputs: usize,
    pub num_outputs: usize,
    #[serde(default)]
    pub num_hidden: usize,
    pub feed_forward: bool,
    pub initial_connection: InitialConnection,
    #[serde(default)]
    pub connection_fraction: Option<f64>,

    pub compatibility_disjoint_coefficient: f64,
    pub compatibility_weight_coefficient: f64,

    pub conn_add_prob: f64,
    pub conn_delete_prob: f64,
    pub node_add_prob: f64,
    pub node_delete_prob: f64,
    #[serde(default)]
    pub single_structural_mutation: bool,
    #[serde(default)]
    pub structural_mutation_surer: bool,

    pub enabled_default: bool,
    pub enabled_mutate_rate: f64,

    pub activation_default: Activation,
    pub activation_options: Vec<Activation>,
    pub activation_mutate_rate: f64,
    pub aggregation_default: Aggregation,
    pub aggregation_options: Vec<Aggregation>,
    pub aggregation_mutate_rate: f64,

    pub bias: FloatAttribute,
    pub response: FloatAttribute,
    pub weight: FloatAttribute,
}

impl GenomeConfig {
    /// Input nodes are keyed `-1, -2, ..`.
    pub fn input_keys(&self) -> Vec<NodeKey> {
        (1..=self.num_inputs as NodeKey).map(|k| -k).collect()
    }

    /// Output nodes are keyed `0, 1, ..`.
    pub fn output_keys(&self) -> Vec<NodeKey> {
        (0..self.num_outputs as NodeKey).collect()
    }

    fn validate(&self) -> Result<(), NeatError> {
        if self.num_inputs == 0 || self.num_outputs == 0 {
            return Err(NeatError::Config(
                "num_inputs and num_outputs must be positive".into(),
            ));
        }
        if !self.feed_forward {
            return Err(NeatError::Config(
                "only feed_forward = true networks are supported".into(),
            ));
        }
        match self.initial_connection {
            InitialConnection::Partial | InitialConnection::PartialDirect => {
                match self.connection_fraction {
                    Some(f) if (0.0..=1.0).contains(&f) => {}
                    _ => {
                        return Err(NeatError::Config(
                            "partial initial connection needs connection_fraction within 0..=1"
                                .into(),
                        ));
                    }
                }
            }
            _ => {}
        }
        if self.activation_options.is_empty() || self.aggregation_options.is_empty() {
            return Err(NeatError::Config(
                "activation_options and aggregation_options must not be empty".into(),
            ));
        }
        self.bias.validate("bias")?;
        self.response.validate("response")?;
        self.weight.validate("weight")?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeciesSetConfig {
    pub compatibility_threshold: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeciesFitnessFunc {
    Max,
    Min,
    Mean,
    Median,
}

impl SpeciesFitnessFunc {
    pub fn apply(self, values: &[f64]) -> f64 {
        match self {
            SpeciesFitnessFunc::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            SpeciesFitnessFunc::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            SpeciesFitnessFunc::Mean => mean(values),
            SpeciesFitnessFunc::Median => median(values),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagnationConfig {
    pub species_fitness_func: SpeciesFitnessFunc,
    pub max_stagnation: usize,
    pub species_elitism: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReproductionConfig {
    pub elitism: usize,
    pub survival_threshold: f64,
    pub min_species_size: usize,
}
