use std::collections::{BTreeMap, BTreeSet};

use super::activation::{Activation, Aggregation};
use super::config::GenomeConfig;
use super::errors::NeatError;
use super::genome::DefaultGenome;
use super::traits::Activate;
use super::{ConnectionKey, NodeKey};

/// Whether adding `test` to a feed-forward graph made of `connections` would
/// close a cycle.
pub fn creates_cycle(
    connections: impl IntoIterator<Item = ConnectionKey>,
    test: ConnectionKey,
) -> bool {
    let (from, to) = test;
    if from == to {
        return true;
    }
    let connections: Vec<ConnectionKey> = connections.into_iter().collect();

    let mut visited = BTreeSet::from([to]);
    loop {
        let mut added = 0;
        for &(a, b) in &connections {
            if visited.contains(&a) && !visited.contains(&b) {
                if b == from {
                    return true;
                }
                visited.insert(b);
                added += 1;
            }
        }
        if added == 0 {
            return false;
        }
    }
}

/// Non-input nodes whose value can reach an output.
pub fn required_for_output(
    inputs: &[NodeKey],
    outputs: &[NodeKey],
    connections: &[ConnectionKey],
) -> BTreeSet<NodeKey> {
    let mut required: BTreeSet<NodeKey> = outputs.iter().copied().collect();
    let mut seen = required.clone();
    loop {
        let frontier: BTreeSet<NodeKey> = connections
            .iter()
            .filter(|(a, b)| seen.contains(b) && !seen.contains(a))
            .map(|&(a, _)| a)
            .collect();
        if frontier.is_empty() {
            break;
        }
        let layer: BTreeSet<NodeKey> = frontier
            .iter()
            .copied()
            .filter(|n| !inputs.contains(n))
            .collect();
        if layer.is_empty() {
            break;
        }
        required.extend(layer);
        seen.extend(frontier);
    }
    required
}

/// Groups required nodes into layers that can be evaluated in order: every
/// node's inputs sit in earlier layers.
pub fn feed_forward_layers(
    inputs: &[NodeKey],
    outputs: &[NodeKey],
    connections: &[ConnectionKey],
) -> Vec<BTreeSet<NodeKey>> {
    let required = required_for_output(inputs, outputs, connections);

    let mut layers = Vec::new();
    let mut seen: BTreeSet<NodeKey> = inputs.iter().copied().collect();
    loop {
        let candidates: BTreeSet<NodeKey> = connections
            .iter()
            .filter(|(a, b)| seen.contains(a) && !seen.contains(b))
            .map(|&(_, b)| b)
            .collect();
        let layer: BTreeSet<NodeKey> = candidates
            .into_iter()
            .filter(|n| {
                required.contains(n)
                    && connections
                        .iter()
                        .filter(|(_, b)| b == n)
                        .all(|(a, _)| seen.contains(a))
            })
            .collect();
        if layer.is_empty() {
            break;
        }
        seen.extend(layer.iter().copied());
        layers.push(layer);
    }
    layers
}

#[derive(Debug, Clone)]
struct NodeEval {
    node: NodeKey,
    activation: Activation,
    aggregation: Aggregation,
    bias: f64,
    response: f64,
    links: Vec<(NodeKey, f64)>,
}

/// Phenotype of a [`DefaultGenome`]: nodes evaluated layer by layer over the
/// enabled connections.
#[derive(Debug, Clone)]
pub struct FeedForwardNetwork {
    input_nodes: Vec<NodeKey>,
    output_nodes: Vec<NodeKey>,
    node_evals: Vec<NodeEval>,
    values: BTreeMap<NodeKey, f64>,
}

impl FeedForwardNetwork {
    pub fn create(genome: &DefaultGenome, config: &GenomeConfig) -> Self {
        let connections: Vec<ConnectionKey> = genome
            .connections
            .values()
            .filter(|c| c.enabled)
            .map(|c| c.key)
            .collect();
        let input_nodes = config.input_keys();
        let output_nodes = config.output_keys();

        let mut node_evals = Vec::new();
        for layer in feed_forward_layers(&input_nodes, &output_nodes, &connections) {
            for node in layer {
                let Some(gene) = genome.nodes.get(&node) else {
                    continue;
                };
                let links = connections
                    .iter()
                    .filter(|(_, to)| *to == node)
                    .map(|key| (key.0, genome.connections[key].weight))
                    .collect();
                node_evals.push(NodeEval {
                    node,
                    activation: gene.activation,
                    aggregation: gene.aggregation,
                    bias: gene.bias,
                    response: gene.response,
                    links,
                });
            }
        }

        let values = input_nodes
            .iter()
            .chain(output_nodes.iter())
            .map(|&k| (k, 0.0))
            .collect();
        Self {
            input_nodes,
            output_nodes,
            node_evals,
            values,
        }
    }
}

impl Activate for FeedForwardNetwork {
    fn activate(&mut self, inputs: &[f64]) -> Result<Vec<f64>, NeatError> {
        if inputs.len() != self.input_nodes.len() {
            return Err(NeatError::InputMismatch {
                expected: self.input_nodes.len(),
                got: inputs.len(),
            });
        }
        for (&key, &value) in self.input_nodes.iter().zip(inputs) {
            self.values.insert(key, value);
        }

        for eval in &self.node_evals {
            let weighted: Vec<f64> = eval
                .links
                .iter()
                .map(|(from, w)| self.values.get(from).copied().unwrap_or(0.0) * w)
                .collect();
            let s = eval.aggregation.apply(&weighted);
            let value = eval.activation.apply(eval.bias + eval.response * s);
            self.values.insert(eval.node, value);
        }

        Ok(self
            .output_nodes
            .iter()
            .map(|k| self.values.get(k).copied().unwrap_or(0.0))
            .collect())
    }
}
