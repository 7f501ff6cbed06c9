use std::collections::BTreeMap;
use std::fmt;

use rand::Rng;
use rand::seq::SliceRandom;

use super::activation::{Activation, Aggregation};
use super::config::{GenomeConfig, InitialConnection, NeatConfig};
use super::errors::NeatError;
use super::network::{FeedForwardNetwork, creates_cycle};
use super::traits::Genome;
use super::{ConnectionKey, GenomeKey, NodeKey};

#[derive(Debug, Clone, PartialEq)]
pub struct NodeGene {
    pub key: NodeKey,
    pub bias: f64,
    pub response: f64,
    pub activation: Activation,
    pub aggregation: Aggregation,
}

impl NodeGene {
    pub fn new<R: Rng + ?Sized>(key: NodeKey, config: &GenomeConfig, rng: &mut R) -> Self {
        Self {
            key,
            bias: config.bias.init_value(rng),
            response: config.response.init_value(rng),
            activation: config.activation_default,
            aggregation: config.aggregation_default,
        }
    }

    fn mutate<R: Rng + ?Sized>(&mut self, config: &GenomeConfig, rng: &mut R) {
        self.bias = config.bias.mutate_value(self.bias, rng);
        self.response = config.response.mutate_value(self.response, rng);
        if config.activation_mutate_rate > 0.0 && rng.r#gen::<f64>() < config.activation_mutate_rate
        {
            if let Some(choice) = config.activation_options.choose(rng) {
                self.activation = *choice;
            }
        }
        if config.aggregation_mutate_rate > 0.0
            && rng.r#gen::<f64>() < config.aggregation_mutate_rate
        {
            if let Some(choice) = config.aggregation_options.choose(rng) {
                self.aggregation = *choice;
            }
        }
    }

    fn distance(&self, other: &NodeGene, config: &GenomeConfig) -> f64 {
        let mut d = (self.bias - other.bias).abs() + (self.response - other.response).abs();
        if self.activation != other.activation {
            d += 1.0;
        }
        if self.aggregation != other.aggregation {
            d += 1.0;
        }
        d * config.compatibility_weight_coefficient
    }

    /// Each attribute comes from either parent with equal probability.
    fn crossover<R: Rng + ?Sized>(&self, other: &NodeGene, rng: &mut R) -> NodeGene {
        NodeGene {
            key: self.key,
            bias: pick(self.bias, other.bias, rng),
            response: pick(self.response, other.response, rng),
            activation: pick(self.activation, other.activation, rng),
            aggregation: pick(self.aggregation, other.aggregation, rng),
        }
    }
}

impl fmt::Display for NodeGene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "NodeGene(key={}, bias={:.5}, response={:.5}, activation={}, aggregation={})",
            self.key, self.bias, self.response, self.activation, self.aggregation
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionGene {
    pub key: ConnectionKey,
    pub weight: f64,
    pub enabled: bool,
}

impl ConnectionGene {
    pub fn new<R: Rng + ?Sized>(key: ConnectionKey, config: &GenomeConfig, rng: &mut R) -> Self {
        Self {
            key,
            weight: config.weight.init_value(rng),
            enabled: config.enabled_default,
        }
    }

    fn mutate<R: Rng + ?Sized>(&mut self, config: &GenomeConfig, rng: &mut R) {
        self.weight = config.weight.mutate_value(self.weight, rng);
        if rng.r#gen::<f64>() < config.enabled_mutate_rate {
            self.enabled = rng.r#gen::<bool>();
        }
    }

    fn distance(&self, other: &ConnectionGene, config: &GenomeConfig) -> f64 {
        let mut d = (self.weight - other.weight).abs();
        if self.enabled != other.enabled {
            d += 1.0;
        }
        d * config.compatibility_weight_coefficient
    }

    fn crossover<R: Rng + ?Sized>(&self, other: &ConnectionGene, rng: &mut R) -> ConnectionGene {
        ConnectionGene {
            key: self.key,
            weight: pick(self.weight, other.weight, rng),
            enabled: pick(self.enabled, other.enabled, rng),
        }
    }
}

impl fmt::Display for ConnectionGene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ConnectionGene(key=({}, {}), weight={:.5}, enabled={})",
            self.key.0, self.key.1, self.weight, self.enabled
        )
    }
}

fn pick<T, R: Rng + ?Sized>(a: T, b: T, rng: &mut R) -> T {
    if rng.r#gen::<bool>() { a } else { b }
}

/// Hands out keys for nodes created by structural mutation. Keys are shared by
/// the whole population so the same split in two genomes lines up only when it
/// comes from a common ancestor.
#[derive(Debug, Clone)]
pub struct NodeIndexer {
    next: NodeKey,
}

impl NodeIndexer {
    pub fn new(config: &GenomeConfig) -> Self {
        Self {
            next: (config.num_outputs + config.num_hidden) as NodeKey,
        }
    }

    pub fn next_key(&mut self, nodes: &BTreeMap<NodeKey, NodeGene>) -> NodeKey {
        while nodes.contains_key(&self.next) {
            self.next += 1;
        }
        let key = self.next;
        self.next += 1;
        key
    }
}

/// A network encoding: node genes for outputs and hidden nodes (inputs are
/// implicit) plus connection genes keyed by `(from, to)`.
#[derive(Debug, Clone, PartialEq)]
pub struct DefaultGenome {
    pub key: GenomeKey,
    pub nodes: BTreeMap<NodeKey, NodeGene>,
    pub connections: BTreeMap<ConnectionKey, ConnectionGene>,
    pub fitness: Option<f64>,
}

impl DefaultGenome {
    pub fn new(key: GenomeKey) -> Self {
        Self {
            key,
            nodes: BTreeMap::new(),
            connections: BTreeMap::new(),
            fitness: None,
        }
    }

    /// Fresh genome: output and initial hidden nodes, wired according to
    /// `initial_connection`.
    pub fn configure_new<R: Rng + ?Sized>(&mut self, config: &GenomeConfig, rng: &mut R) {
        for key in config.output_keys() {
            self.nodes.insert(key, NodeGene::new(key, config, rng));
        }
        let first_hidden = config.num_outputs as NodeKey;
        for key in first_hidden..first_hidden + config.num_hidden as NodeKey {
            self.nodes.insert(key, NodeGene::new(key, config, rng));
        }

        let keys = match config.initial_connection {
            InitialConnection::Unconnected => Vec::new(),
            InitialConnection::FsNeat => {
                let inputs = config.input_keys();
                match inputs.choose(rng) {
                    Some(&input) => self.nodes.keys().map(|&node| (input, node)).collect(),
                    None => Vec::new(),
                }
            }
            InitialConnection::Full => self.full_connections(config, false),
            InitialConnection::FullDirect => self.full_connections(config, true),
            InitialConnection::Partial | InitialConnection::PartialDirect => {
                let direct = config.initial_connection == InitialConnection::PartialDirect;
                let mut all = self.full_connections(config, direct);
                all.shuffle(rng);
                let fraction = config.connection_fraction.unwrap_or(0.0);
                let keep = (all.len() as f64 * fraction).round() as usize;
                all.truncate(keep);
                all
            }
        };

        for key in keys {
            self.connections
                .insert(key, ConnectionGene::new(key, config, rng));
        }
    }

    fn full_connections(&self, config: &GenomeConfig, direct: bool) -> Vec<ConnectionKey> {
        let inputs = config.input_keys();
        let outputs = config.output_keys();
        let hidden: Vec<NodeKey> = self
            .nodes
            .keys()
            .copied()
            .filter(|k| !outputs.contains(k))
            .collect();

        let mut keys = Vec::new();
        if !hidden.is_empty() {
            for &i in &inputs {
                keys.extend(hidden.iter().map(|&h| (i, h)));
            }
            for &h in &hidden {
                keys.extend(outputs.iter().map(|&o| (h, o)));
            }
        }
        if direct || hidden.is_empty() {
            for &i in &inputs {
                keys.extend(outputs.iter().map(|&o| (i, o)));
            }
        }
        keys
    }

    /// Child of two parents. Genes present in the fitter parent are
    /// inherited; matching genes mix attributes from both.
    pub fn crossover<R: Rng + ?Sized>(
        key: GenomeKey,
        a: &DefaultGenome,
        b: &DefaultGenome,
        rng: &mut R,
    ) -> DefaultGenome {
        let fitness = |g: &DefaultGenome| g.fitness.unwrap_or(f64::NEG_INFINITY);
        let (fitter, other) = if fitness(a) > fitness(b) { (a, b) } else { (b, a) };

        let mut child = DefaultGenome::new(key);
        for (k, cg1) in &fitter.connections {
            let gene = match other.connections.get(k) {
                Some(cg2) => cg1.crossover(cg2, rng),
                None => cg1.clone(),
            };
            child.connections.insert(*k, gene);
        }
        for (k, ng1) in &fitter.nodes {
            let gene = match other.nodes.get(k) {
                Some(ng2) => ng1.crossover(ng2, rng),
                None => ng1.clone(),
            };
            child.nodes.insert(*k, gene);
        }
        child
    }

    pub fn mutate<R: Rng + ?Sized>(
        &mut self,
        config: &GenomeConfig,
        indexer: &mut NodeIndexer,
        rng: &mut R,
    ) {
        if config.single_structural_mutation {
            let total = config.node_add_prob
                + config.node_delete_prob
                + config.conn_add_prob
                + config.conn_delete_prob;
            let div = total.max(1.0);
            let r: f64 = rng.r#gen();
            if r < config.node_add_prob / div {
                self.mutate_add_node(config, indexer, rng);
            } else if r < (config.node_add_prob + config.node_delete_prob) / div {
                self.mutate_delete_node(config, rng);
            } else if r
                < (config.node_add_prob + config.node_delete_prob + config.conn_add_prob) / div
            {
                self.mutate_add_connection(config, rng);
            } else if r < total / div {
                self.mutate_delete_connection(rng);
            }
        } else {
            if rng.r#gen::<f64>() < config.node_add_prob {
                self.mutate_add_node(config, indexer, rng);
            }
            if rng.r#gen::<f64>() < config.node_delete_prob {
                self.mutate_delete_node(config, rng);
            }
            if rng.r#gen::<f64>() < config.conn_add_prob {
                self.mutate_add_connection(config, rng);
            }
            if rng.r#gen::<f64>() < config.conn_delete_prob {
                self.mutate_delete_connection(rng);
            }
        }

        for gene in self.connections.values_mut() {
            gene.mutate(config, rng);
        }
        for gene in self.nodes.values_mut() {
            gene.mutate(config, rng);
        }
    }

    /// Splits a random connection `a -> b` into `a -> new` (weight 1) and
    /// `new -> b` (old weight), disabling the original.
    pub fn mutate_add_node<R: Rng + ?Sized>(
        &mut self,
        config: &GenomeConfig,
        indexer: &mut NodeIndexer,
        rng: &mut R,
    ) {
        let keys: Vec<ConnectionKey> = self.connections.keys().copied().collect();
        let Some(&split) = keys.choose(rng) else {
            if config.structural_mutation_surer {
                self.mutate_add_connection(config, rng);
            }
            return;
        };

        let new_key = indexer.next_key(&self.nodes);
        self.nodes
            .insert(new_key, NodeGene::new(new_key, config, rng));

        let old_weight = match self.connections.get_mut(&split) {
            Some(gene) => {
                gene.enabled = false;
                gene.weight
            }
            None => return,
        };
        let (from, to) = split;
        self.add_connection((from, new_key), 1.0, true);
        self.add_connection((new_key, to), old_weight, true);
    }

    fn add_connection(&mut self, key: ConnectionKey, weight: f64, enabled: bool) {
        self.connections.insert(
            key,
            ConnectionGene {
                key,
                weight,
                enabled,
            },
        );
    }

    pub fn mutate_add_connection<R: Rng + ?Sized>(&mut self, config: &GenomeConfig, rng: &mut R) {
        let possible_outputs: Vec<NodeKey> = self.nodes.keys().copied().collect();
        let Some(&to) = possible_outputs.choose(rng) else {
            return;
        };
        let mut possible_inputs = possible_outputs.clone();
        possible_inputs.extend(config.input_keys());
        let Some(&from) = possible_inputs.choose(rng) else {
            return;
        };

        let key = (from, to);
        if let Some(existing) = self.connections.get_mut(&key) {
            if config.structural_mutation_surer {
                existing.enabled = true;
            }
            return;
        }

        let outputs = config.output_keys();
        if outputs.contains(&from) && outputs.contains(&to) {
            return;
        }
        if config.feed_forward && creates_cycle(self.connections.keys().copied(), key) {
            return;
        }
        self.connections
            .insert(key, ConnectionGene::new(key, config, rng));
    }

    /// Removes a random hidden node and every connection touching it.
    pub fn mutate_delete_node<R: Rng + ?Sized>(&mut self, config: &GenomeConfig, rng: &mut R) {
        let outputs = config.output_keys();
        let available: Vec<NodeKey> = self
            .nodes
            .keys()
            .copied()
            .filter(|k| !outputs.contains(k))
            .collect();
        let Some(&doomed) = available.choose(rng) else {
            return;
        };
        self.connections
            .retain(|&(from, to), _| from != doomed && to != doomed);
        self.nodes.remove(&doomed);
    }

    pub fn mutate_delete_connection<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let keys: Vec<ConnectionKey> = self.connections.keys().copied().collect();
        if let Some(key) = keys.choose(rng) {
            self.connections.remove(key);
        }
    }

    /// Genetic distance used for speciation.
    pub fn distance(&self, other: &DefaultGenome, config: &GenomeConfig) -> f64 {
        let disjoint_coef = config.compatibility_disjoint_coefficient;

        let mut node_distance = 0.0;
        if !self.nodes.is_empty() || !other.nodes.is_empty() {
            let mut disjoint = other
                .nodes
                .keys()
                .filter(|k| !self.nodes.contains_key(k))
                .count();
            for (k, n1) in &self.nodes {
                match other.nodes.get(k) {
                    Some(n2) => node_distance += n1.distance(n2, config),
                    None => disjoint += 1,
                }
            }
            let max_nodes = self.nodes.len().max(other.nodes.len()) as f64;
            node_distance = (node_distance + disjoint_coef * disjoint as f64) / max_nodes;
        }

        let mut connection_distance = 0.0;
        if !self.connections.is_empty() || !other.connections.is_empty() {
            let mut disjoint = other
                .connections
                .keys()
                .filter(|k| !self.connections.contains_key(k))
                .count();
            for (k, c1) in &self.connections {
                match other.connections.get(k) {
                    Some(c2) => connection_distance += c1.distance(c2, config),
                    None => disjoint += 1,
                }
            }
            let max_conn = self.connections.len().max(other.connections.len()) as f64;
            connection_distance =
                (connection_distance + disjoint_coef * disjoint as f64) / max_conn;
        }

        node_distance + connection_distance
    }

    /// (number of nodes, number of enabled connections)
    pub fn size(&self) -> (usize, usize) {
        let enabled = self.connections.values().filter(|c| c.enabled).count();
        (self.nodes.len(), enabled)
    }
}

impl fmt::Display for DefaultGenome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Key: {}", self.key)?;
        match self.fitness {
            Some(fitness) => writeln!(f, "Fitness: {fitness}")?,
            None => writeln!(f, "Fitness: None")?,
        }
        write!(f, "Nodes:")?;
        for (k, node) in &self.nodes {
            write!(f, "\n\t{k} {node}")?;
        }
        write!(f, "\nConnections:")?;
        for connection in self.connections.values() {
            write!(f, "\n\t{connection}")?;
        }
        Ok(())
    }
}

impl Genome for DefaultGenome {
    type Config = NeatConfig;
    type Network = FeedForwardNetwork;

    fn key(&self) -> GenomeKey {
        self.key
    }

    fn fitness(&self) -> Option<f64> {
        self.fitness
    }

    fn set_fitness(&mut self, fitness: f64) {
        self.fitness = Some(fitness);
    }

    fn network(&self, config: &NeatConfig) -> Result<FeedForwardNetwork, NeatError> {
        Ok(FeedForwardNetwork::create(self, &config.genome))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::neat::config::tests::pole_config;
    use crate::neat::traits::Activate;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn fresh(key: GenomeKey, rng: &mut StdRng) -> DefaultGenome {
        let config = pole_config();
        let mut genome = DefaultGenome::new(key);
        genome.configure_new(&config.genome, rng);
        genome
    }

    #[test]
    fn test_full_initial_connection() {
        let mut rng = StdRng::seed_from_u64(1);
        let genome = fresh(1, &mut rng);

        assert_eq!(genome.nodes.len(), 2);
        assert_eq!(genome.connections.len(), 8);
        assert!(genome.connections.contains_key(&(-1, 0)));
        assert!(genome.connections.contains_key(&(-4, 1)));
        assert_eq!(genome.size(), (2, 8));
    }

    #[test]
    fn test_full_direct_with_hidden_nodes() {
        let mut config = pole_config().genome;
        config.num_hidden = 1;
        config.initial_connection = InitialConnection::FullDirect;
        let mut rng = StdRng::seed_from_u64(1);
        let mut genome = DefaultGenome::new(1);
        genome.configure_new(&config, &mut rng);

        // 4 inputs -> hidden, hidden -> 2 outputs, 4 x 2 direct
        assert_eq!(genome.connections.len(), 4 + 2 + 8);
        assert!(genome.nodes.contains_key(&2));
    }

    #[test]
    fn test_unconnected_has_no_connections() {
        let mut config = pole_config().genome;
        config.initial_connection = InitialConnection::Unconnected;
        let mut rng = StdRng::seed_from_u64(1);
        let mut genome = DefaultGenome::new(1);
        genome.configure_new(&config, &mut rng);
        assert!(genome.connections.is_empty());
    }

    #[test]
    fn test_fs_neat_wires_a_single_input() {
        let mut config = pole_config().genome;
        config.num_hidden = 1;
        config.initial_connection = InitialConnection::FsNeat;
        let mut rng = StdRng::seed_from_u64(11);
        let mut genome = DefaultGenome::new(1);
        genome.configure_new(&config, &mut rng);

        // one input to both outputs and the hidden node
        assert_eq!(genome.connections.len(), 3);
        let sources: BTreeSet<NodeKey> = genome.connections.keys().map(|&(from, _)| from).collect();
        assert_eq!(sources.len(), 1);
        assert!(sources.iter().all(|k| config.input_keys().contains(k)));
        let targets: BTreeSet<NodeKey> = genome.connections.keys().map(|&(_, to)| to).collect();
        let nodes: BTreeSet<NodeKey> = genome.nodes.keys().copied().collect();
        assert_eq!(targets, nodes);
    }

    #[test]
    fn test_partial_keeps_rounded_fraction() {
        let mut config = pole_config().genome;
        config.initial_connection = InitialConnection::Partial;
        config.connection_fraction = Some(0.5);
        let mut rng = StdRng::seed_from_u64(12);
        let mut genome = DefaultGenome::new(1);
        genome.configure_new(&config, &mut rng);

        assert_eq!(genome.connections.len(), 4);
        assert!(genome.connections.keys().all(|&(from, to)| from < 0 && to >= 0));
    }

    #[test]
    fn test_partial_direct_samples_from_direct_set() {
        let mut config = pole_config().genome;
        config.num_hidden = 1;
        config.initial_connection = InitialConnection::PartialDirect;
        config.connection_fraction = Some(0.3);
        let mut rng = StdRng::seed_from_u64(13);
        let mut genome = DefaultGenome::new(1);
        genome.configure_new(&config, &mut rng);

        let mut full = config.clone();
        full.initial_connection = InitialConnection::FullDirect;
        let mut reference = DefaultGenome::new(2);
        reference.configure_new(&full, &mut rng);

        // round(14 * 0.3)
        assert_eq!(genome.connections.len(), 4);
        assert!(genome
            .connections
            .keys()
            .all(|k| reference.connections.contains_key(k)));
    }

    #[test]
    fn test_single_structural_mutation_applies_one_change() {
        let mut config = pole_config().genome;
        config.single_structural_mutation = true;
        config.node_add_prob = 1.0;
        config.node_delete_prob = 0.0;
        config.conn_add_prob = 0.0;
        config.conn_delete_prob = 1.0;
        config.enabled_mutate_rate = 0.0;

        let mut seen = BTreeSet::new();
        for seed in 0..40 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut indexer = NodeIndexer::new(&config);
            let mut genome = fresh(1, &mut rng);
            genome.mutate(&config, &mut indexer, &mut rng);
            seen.insert((genome.nodes.len(), genome.connections.len()));
        }

        // split a connection, or drop one; never both
        let expected: BTreeSet<(usize, usize)> = [(3, 10), (2, 7)].into_iter().collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_surer_add_node_falls_back_to_add_connection() {
        let mut config = pole_config().genome;
        config.num_inputs = 1;
        config.num_outputs = 1;
        config.initial_connection = InitialConnection::Unconnected;
        let mut rng = StdRng::seed_from_u64(14);
        let mut indexer = NodeIndexer::new(&config);
        let mut genome = DefaultGenome::new(1);
        genome.configure_new(&config, &mut rng);

        for _ in 0..32 {
            genome.mutate_add_node(&config, &mut indexer, &mut rng);
        }
        assert!(genome.connections.is_empty());
        assert_eq!(genome.nodes.len(), 1);

        config.structural_mutation_surer = true;
        for _ in 0..32 {
            genome.mutate_add_node(&config, &mut indexer, &mut rng);
        }
        assert!(genome.connections.contains_key(&(-1, 0)));
    }

    #[test]
    fn test_surer_add_connection_reenables_existing() {
        let mut config = pole_config().genome;
        config.num_inputs = 1;
        config.num_outputs = 1;
        let mut rng = StdRng::seed_from_u64(15);
        let mut genome = DefaultGenome::new(1);
        genome.configure_new(&config, &mut rng);
        assert_eq!(genome.connections.len(), 1);
        if let Some(gene) = genome.connections.get_mut(&(-1, 0)) {
            gene.enabled = false;
        }

        for _ in 0..32 {
            genome.mutate_add_connection(&config, &mut rng);
        }
        assert!(!genome.connections[&(-1, 0)].enabled);

        config.structural_mutation_surer = true;
        for _ in 0..32 {
            genome.mutate_add_connection(&config, &mut rng);
        }
        assert_eq!(genome.connections.len(), 1);
        assert!(genome.connections[&(-1, 0)].enabled);
    }

    #[test]
    fn test_add_node_splits_a_connection() {
        let config = pole_config().genome;
        let mut rng = StdRng::seed_from_u64(2);
        let mut genome = fresh(1, &mut rng);
        let mut indexer = NodeIndexer::new(&config);

        genome.mutate_add_node(&config, &mut indexer, &mut rng);

        assert_eq!(genome.nodes.len(), 3);
        assert_eq!(genome.connections.len(), 10);
        let disabled: Vec<_> = genome.connections.values().filter(|c| !c.enabled).collect();
        assert_eq!(disabled.len(), 1);
        let (from, to) = disabled[0].key;
        assert_eq!(genome.connections[&(from, 2)].weight, 1.0);
        assert_eq!(genome.connections[&(2, to)].weight, disabled[0].weight);
    }

    #[test]
    fn test_delete_node_keeps_outputs() {
        let config = pole_config().genome;
        let mut rng = StdRng::seed_from_u64(3);
        let mut genome = fresh(1, &mut rng);
        let mut indexer = NodeIndexer::new(&config);
        genome.mutate_add_node(&config, &mut indexer, &mut rng);

        genome.mutate_delete_node(&config, &mut rng);
        genome.mutate_delete_node(&config, &mut rng);

        assert_eq!(genome.nodes.len(), 2);
        assert!(genome.nodes.contains_key(&0) && genome.nodes.contains_key(&1));
        assert!(genome.connections.keys().all(|&(a, b)| a != 2 && b != 2));
    }

    #[test]
    fn test_distance_to_self_is_zero() {
        let config = pole_config().genome;
        let mut rng = StdRng::seed_from_u64(4);
        let a = fresh(1, &mut rng);
        let b = fresh(2, &mut rng);

        assert_eq!(a.distance(&a, &config), 0.0);
        assert!(a.distance(&b, &config) > 0.0);
        assert!((a.distance(&b, &config) - b.distance(&a, &config)).abs() < 1e-12);
    }

    #[test]
    fn test_crossover_inherits_structure_of_fitter_parent() {
        let config = pole_config().genome;
        let mut rng = StdRng::seed_from_u64(5);
        let mut indexer = NodeIndexer::new(&config);
        let mut fit = fresh(1, &mut rng);
        fit.mutate_add_node(&config, &mut indexer, &mut rng);
        fit.fitness = Some(10.0);
        let mut weak = fresh(2, &mut rng);
        weak.fitness = Some(1.0);

        let child = DefaultGenome::crossover(3, &weak, &fit, &mut rng);

        assert_eq!(child.key, 3);
        assert_eq!(child.fitness, None);
        assert_eq!(
            child.connections.keys().collect::<Vec<_>>(),
            fit.connections.keys().collect::<Vec<_>>()
        );
        assert_eq!(
            child.nodes.keys().collect::<Vec<_>>(),
            fit.nodes.keys().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_repeated_mutation_stays_feed_forward() {
        let config = pole_config().genome;
        let mut rng = StdRng::seed_from_u64(6);
        let mut indexer = NodeIndexer::new(&config);
        let mut genome = fresh(1, &mut rng);

        for _ in 0..200 {
            genome.mutate(&config, &mut indexer, &mut rng);
        }

        let mut net = FeedForwardNetwork::create(&genome, &config);
        let out = net.activate(&[0.1, -0.2, 0.3, -0.4]).unwrap();
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_display_lists_genes() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut genome = fresh(42, &mut rng);
        genome.fitness = Some(12.5);

        let text = genome.to_string();
        assert!(text.starts_with("Key: 42\nFitness: 12.5\nNodes:"));
        assert!(text.contains("ConnectionGene(key=(-4, 0)"));
    }
}
