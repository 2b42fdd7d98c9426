//! A Network is the phenotype of a genome: disabled
//! edges are dropped, enabled edges become connections,
//! and genome nodes become network nodes.
//!
//! Non-recurrent connections are evaluated in topological
//! order within a single activation. Recurrent connections
//! read their source's value from the previous activation,
//! so a network keeps state between calls to
//! [`Network::activate`] until [`Network::clear_state`].
mod connection;

use crate::genomics::{ActivationType, GeneticConfig, NNGenome, NodeRole};
use crate::Innovation;
use connection::Connection;

use ahash::RandomState;
use neatrl::Policy;
use thiserror::Error;

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::fmt;

/// An error type describing a genome whose
/// graph cannot be evaluated as intended.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MalformedGraphError {
    /// The genome has a different number of inputs than configured.
    #[error("genome has {found} input nodes, expected {expected}")]
    InputCount { expected: usize, found: usize },
    /// An edge refers to a node absent in the genome.
    #[error("edge {edge} refers to a missing node")]
    MissingEndpoint { edge: Innovation },
    /// Non-recurrent edges form a cycle.
    #[error("non-recurrent edges form a cycle")]
    UntaggedCycle,
    /// An output cannot be reached from any input or bias node.
    #[error("output node {node} is unreachable from the inputs")]
    UnreachableOutput { node: Innovation },
}

/// An arbitrarily-structured neural network.
#[derive(Clone, Debug)]
pub struct Network {
    input_count: usize,
    source_count: usize,
    output_count: usize,
    node_ids: Box<[Innovation]>,
    activation_functions: Box<[ActivationType]>,
    connections: Box<[Box<[Connection]>]>,
    evaluation_order: Box<[usize]>,
    values: Box<[f32]>,
    previous_values: Box<[f32]>,
}

impl Network {
    /// Generates a new network from the passed genome.
    ///
    /// # Examples
    /// ```
    /// use neatrl_nn::{genomics::{GeneticConfig, NNGenome}, networks::Network};
    /// use std::num::NonZeroUsize;
    ///
    /// let genome = NNGenome::new(&GeneticConfig {
    ///     input_count: NonZeroUsize::new(3).unwrap(),
    ///     output_count: NonZeroUsize::new(2).unwrap(),
    ///     initial_connection_density: 1.0,
    ///     weight_init_range: 1.0,
    ///     ..GeneticConfig::zero()
    /// });
    ///
    /// let mut network = Network::new(&genome);
    /// assert_eq!(network.activate(&[0.1, 0.2, 0.3]).len(), 2);
    /// ```
    pub fn new(genome: &NNGenome) -> Network {
        let mut input_nodes = vec![];
        let mut bias_nodes = vec![];
        let mut output_nodes = vec![];
        let mut hidden_nodes = vec![];

        // Genome nodes iterate in id order, so each
        // group is already sorted.
        for node in genome.nodes() {
            match node.role() {
                NodeRole::Input => &mut input_nodes,
                NodeRole::Bias => &mut bias_nodes,
                NodeRole::Output => &mut output_nodes,
                NodeRole::Hidden => &mut hidden_nodes,
            }
            .push((node.id(), node.activation()));
        }
        let (node_ids, activation_functions): (Vec<_>, Vec<_>) = input_nodes
            .iter()
            .chain(&bias_nodes)
            .chain(&output_nodes)
            .chain(&hidden_nodes)
            .copied()
            .unzip();
        let node_count = node_ids.len();
        let source_count = input_nodes.len() + bias_nodes.len();

        let node_index_from_id: HashMap<_, _, RandomState> = node_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (*id, i))
            .collect();

        let mut connections = vec![vec![]; node_count];
        let mut successors = vec![vec![]; node_count];
        let mut all_successors = vec![vec![]; node_count];
        for edge in genome.edges().filter(|e| e.enabled()) {
            let (from, to) = match (
                node_index_from_id.get(&edge.from()),
                node_index_from_id.get(&edge.to()),
            ) {
                (Some(from), Some(to)) => (*from, *to),
                _ => continue,
            };
            connections[to].push(Connection::new(from, edge.weight(), edge.is_recurrent()));
            all_successors[from].push(to);
            if !edge.is_recurrent() {
                successors[from].push(to);
            }
        }

        let reachable = reachable_from(0..source_count, &all_successors);
        let evaluation_order = topological_order(&successors)
            .into_iter()
            .filter(|i| *i >= source_count && reachable[*i])
            .collect::<Vec<_>>();

        Network {
            input_count: input_nodes.len(),
            source_count,
            output_count: output_nodes.len(),
            node_ids: node_ids.into(),
            activation_functions: activation_functions.into(),
            connections: connections.into_iter().map(|v| v.into()).collect(),
            evaluation_order: evaluation_order.into(),
            values: vec![0.0; node_count].into(),
            previous_values: vec![0.0; node_count].into(),
        }
    }

    /// Sets the inputs, computes every node's value and
    /// returns the output values.
    ///
    /// Missing inputs are read as 0 and extra ones are ignored.
    /// Outputs unreachable from any input or bias node are 0.
    ///
    /// # Examples
    /// ```
    /// use neatrl_nn::{
    ///     genomics::{ActivationType, GeneticConfig, NNGenome},
    ///     networks::Network,
    /// };
    /// use std::num::NonZeroUsize;
    ///
    /// let mut genome = NNGenome::new(&GeneticConfig {
    ///     input_count: NonZeroUsize::new(2).unwrap(),
    ///     output_count: NonZeroUsize::new(1).unwrap(),
    ///     output_activation_types: vec![ActivationType::ReLU],
    ///     ..GeneticConfig::zero()
    /// });
    /// genome.add_edge(0, 0, 2, 2.5).unwrap();
    /// genome.add_edge(1, 1, 2, -2.5).unwrap();
    ///
    /// let mut network = Network::new(&genome);
    ///
    /// assert_eq!(network.activate(&[1.0, 0.5])[0], (1.0f32 * 2.5 + 0.5 * (-2.5)).max(0.0));
    /// ```
    pub fn activate(&mut self, inputs: &[f32]) -> Vec<f32> {
        self.previous_values.copy_from_slice(&self.values);
        for (i, value) in self.values[..self.input_count].iter_mut().enumerate() {
            *value = inputs.get(i).copied().unwrap_or(0.0);
        }
        for value in &mut self.values[self.input_count..self.source_count] {
            *value = 1.0;
        }

        for &node in self.evaluation_order.iter() {
            let sum: f32 = self.connections[node]
                .iter()
                .map(|c| {
                    let source = if c.recurrent {
                        self.previous_values[c.source]
                    } else {
                        self.values[c.source]
                    };
                    c.weight * source
                })
                .sum();
            self.values[node] = self.activation_functions[node].apply(sum);
        }

        self.outputs()
    }

    /// Clears the activation state of all nodes.
    ///
    /// # Examples
    /// ```
    /// use neatrl_nn::{genomics::{GeneticConfig, NNGenome}, networks::Network};
    ///
    /// let mut genome = NNGenome::new(&GeneticConfig::zero());
    /// genome.add_edge(0, 0, 1, 1.0).unwrap();
    /// genome.add_recurrent_edge(1, 1, 1, 1.0).unwrap();
    ///
    /// let mut network = Network::new(&genome);
    /// let first = network.activate(&[1.0]);
    /// assert_ne!(network.activate(&[1.0]), first);
    ///
    /// network.clear_state();
    ///
    /// assert_eq!(network.activate(&[1.0]), first);
    /// ```
    pub fn clear_state(&mut self) {
        self.values.iter_mut().for_each(|v| *v = 0.0);
        self.previous_values.iter_mut().for_each(|v| *v = 0.0);
    }

    /// Returns the current output node values.
    pub fn outputs(&self) -> Vec<f32> {
        self.values[self.source_count..self.source_count + self.output_count].to_vec()
    }

    /// Returns the number of input nodes.
    pub fn input_count(&self) -> usize {
        self.input_count
    }

    /// Returns the number of output nodes.
    pub fn output_count(&self) -> usize {
        self.output_count
    }

    /// Checks a genome for structural problems that would
    /// make its network misbehave. Genomes only modified
    /// through their own operators are never malformed,
    /// though their outputs may be unreachable.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    ///
    /// # Examples
    /// ```
    /// use neatrl_nn::{genomics::{GeneticConfig, NNGenome}, networks::{MalformedGraphError, Network}};
    ///
    /// let config = GeneticConfig::zero();
    /// let mut genome = NNGenome::new(&config);
    /// assert_eq!(
    ///     Network::diagnose(&genome, &config),
    ///     Err(MalformedGraphError::UnreachableOutput { node: 1 })
    /// );
    ///
    /// genome.add_edge(0, 0, 1, 1.0).unwrap();
    /// assert_eq!(Network::diagnose(&genome, &config), Ok(()));
    /// ```
    pub fn diagnose(genome: &NNGenome, config: &GeneticConfig) -> Result<(), MalformedGraphError> {
        let found = genome
            .nodes()
            .filter(|n| n.role() == NodeRole::Input)
            .count();
        if found != config.input_count.get() {
            return Err(MalformedGraphError::InputCount {
                expected: config.input_count.get(),
                found,
            });
        }

        let node_ids: Vec<Innovation> = genome.nodes().map(|n| n.id()).collect();
        let index_of: HashMap<_, _, RandomState> =
            node_ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();

        let mut successors = vec![vec![]; node_ids.len()];
        let mut enabled_successors = vec![vec![]; node_ids.len()];
        for edge in genome.edges() {
            let (from, to) = match (index_of.get(&edge.from()), index_of.get(&edge.to())) {
                (Some(from), Some(to)) => (*from, *to),
                _ => {
                    return Err(MalformedGraphError::MissingEndpoint {
                        edge: edge.innovation(),
                    })
                }
            };
            if !edge.is_recurrent() {
                successors[from].push(to);
            }
            if edge.enabled() {
                enabled_successors[from].push(to);
            }
        }

        if topological_order(&successors).len() < node_ids.len() {
            return Err(MalformedGraphError::UntaggedCycle);
        }

        let sources = genome
            .nodes()
            .enumerate()
            .filter(|(_, n)| n.role().is_source())
            .map(|(i, _)| i);
        let reachable = reachable_from(sources, &enabled_successors);
        match genome
            .nodes()
            .enumerate()
            .find(|(i, n)| n.role() == NodeRole::Output && !reachable[*i])
        {
            Some((_, node)) => Err(MalformedGraphError::UnreachableOutput { node: node.id() }),
            None => Ok(()),
        }
    }
}

/// Kahn's algorithm, always taking the lowest ready index.
/// Nodes on a cycle are left out of the order.
fn topological_order(successors: &[Vec<usize>]) -> Vec<usize> {
    let mut in_degree = vec![0usize; successors.len()];
    for targets in successors {
        for &t in targets {
            in_degree[t] += 1;
        }
    }
    let mut ready: BinaryHeap<Reverse<usize>> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, d)| **d == 0)
        .map(|(i, _)| Reverse(i))
        .collect();

    let mut order = Vec::with_capacity(successors.len());
    while let Some(Reverse(node)) = ready.pop() {
        order.push(node);
        for &t in &successors[node] {
            in_degree[t] -= 1;
            if in_degree[t] == 0 {
                ready.push(Reverse(t));
            }
        }
    }
    order
}

fn reachable_from(sources: impl IntoIterator<Item = usize>, successors: &[Vec<usize>]) -> Vec<bool> {
    let mut reachable = vec![false; successors.len()];
    let mut stack: Vec<usize> = sources.into_iter().collect();
    while let Some(node) = stack.pop() {
        if !reachable[node] {
            reachable[node] = true;
            stack.extend(successors[node].iter().copied());
        }
    }
    reachable
}

impl Policy for Network {
    fn reset(&mut self) {
        self.clear_state();
    }

    fn act(&mut self, observation: &[f32]) -> Vec<f32> {
        self.activate(observation)
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Network {{")?;
        for (i, id) in self.node_ids.iter().enumerate() {
            writeln!(
                f,
                "\t{} {:?} <- {:?}",
                id, self.activation_functions[i], self.connections[i]
            )?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroUsize;

    fn sigmoid(x: f32) -> f32 {
        ActivationType::Sigmoid.apply(x)
    }

    #[test]
    fn from() {
        let config = GeneticConfig {
            input_count: NonZeroUsize::new(2).unwrap(),
            output_count: NonZeroUsize::new(2).unwrap(),
            bias: true,
            output_activation_types: vec![ActivationType::Sigmoid, ActivationType::Gaussian],
            ..GeneticConfig::zero()
        };
        let mut genome = NNGenome::new(&config);
        genome.add_node(5, ActivationType::Tanh).unwrap();
        genome.add_edge(0, 0, 5, 1.0).unwrap();
        genome.add_edge(1, 5, 3, 1.0).unwrap();
        genome.add_edge(2, 2, 4, 0.5).unwrap();
        // Disabled edge shouldn't be expressed in network.
        genome.add_edge(3, 1, 3, -1.0).unwrap().set_enabled(false);

        let network = Network::new(&genome);
        assert_eq!(network.input_count, 2);
        assert_eq!(network.source_count, 3);
        assert_eq!(network.output_count, 2);
        assert_eq!(&*network.node_ids, &[0, 1, 2, 3, 4, 5]);
        assert_eq!(network.activation_functions[4], ActivationType::Gaussian);
        assert_eq!(network.activation_functions[5], ActivationType::Tanh);
        assert_eq!(&*network.connections[3], &[Connection::new(5, 1.0, false)]);
        assert_eq!(&*network.evaluation_order, &[4, 5, 3]);
    }

    #[test]
    fn activate_unreachable_outputs_zero() {
        let config = GeneticConfig {
            output_count: NonZeroUsize::new(2).unwrap(),
            ..GeneticConfig::zero()
        };
        let mut genome = NNGenome::new(&config);
        genome.add_edge(0, 0, 1, 1.0).unwrap();
        genome.add_recurrent_edge(1, 2, 2, 1.0).unwrap();
        let mut network = Network::new(&genome);
        for _ in 0..3 {
            let outputs = network.activate(&[0.4]);
            assert_eq!(outputs, vec![sigmoid(0.4), 0.0]);
        }
    }

    #[test]
    fn activate_single() {
        let mut genome = NNGenome::new(&GeneticConfig::zero());
        genome.add_edge(0, 0, 1, 1.0).unwrap();
        let mut network = Network::new(&genome);
        for input in -20..=20 {
            let input = input as f32 / 10.0;
            assert_eq!(network.activate(&[input])[0], sigmoid(input))
        }
    }

    #[test]
    fn activate_single_recurrent() {
        let mut genome = NNGenome::new(&GeneticConfig::zero());
        genome.add_edge(0, 0, 1, 1.0).unwrap();
        genome.add_recurrent_edge(1, 1, 1, -1.0).unwrap();
        let mut network = Network::new(&genome);
        let mut prev_output = 0.0;
        for input in -20..=20 {
            let input = input as f32 / 10.0;
            let output = network.activate(&[input])[0];
            assert_eq!(output, sigmoid(input - prev_output));
            prev_output = output;
        }
    }

    #[test]
    fn activate_chain_in_one_step() {
        let mut genome = NNGenome::new(&GeneticConfig::zero());
        genome.add_node(2, ActivationType::Sigmoid).unwrap();
        genome.add_edge(0, 0, 2, 1.0).unwrap();
        genome.add_edge(1, 2, 1, 1.0).unwrap();
        let mut network = Network::new(&genome);
        for input in -20..=20 {
            let input = input as f32 / 10.0;
            assert_eq!(network.activate(&[input])[0], sigmoid(sigmoid(input)))
        }
    }

    #[test]
    fn activate_multiple_inputs_and_bias() {
        let config = GeneticConfig {
            input_count: NonZeroUsize::new(3).unwrap(),
            bias: true,
            ..GeneticConfig::zero()
        };
        let mut genome = NNGenome::new(&config);
        genome.add_edge(0, 0, 4, -1.0).unwrap();
        genome.add_edge(1, 1, 4, 1.0).unwrap();
        genome.add_edge(2, 2, 4, 0.5).unwrap();
        genome.add_edge(3, 3, 4, 0.25).unwrap();
        let mut network = Network::new(&genome);
        for ((x, y), z) in (-20..=20).zip(-20..=20).zip(-20..=20) {
            let (x, y, z) = (x as f32 / 10.0, y as f32 / 10.0, z as f32 / 10.0);
            assert_eq!(
                network.activate(&[x, y, z])[0],
                sigmoid(-x + y + 0.5 * z + 0.25),
                "{} {} {}",
                x,
                y,
                z
            );
        }
    }

    #[test]
    fn mismatched_input_lengths() {
        let config = GeneticConfig {
            input_count: NonZeroUsize::new(2).unwrap(),
            output_activation_types: vec![ActivationType::Identity],
            ..GeneticConfig::zero()
        };
        let mut genome = NNGenome::new(&config);
        genome.add_edge(0, 0, 2, 1.0).unwrap();
        genome.add_edge(1, 1, 2, 2.0).unwrap();
        let mut network = Network::new(&genome);
        assert_eq!(network.activate(&[3.0]), vec![3.0]);
        assert_eq!(network.activate(&[3.0, 1.0, 7.0]), vec![5.0]);
    }

    #[test]
    fn evaluation_is_deterministic() {
        let config = GeneticConfig {
            input_count: NonZeroUsize::new(4).unwrap(),
            output_count: NonZeroUsize::new(2).unwrap(),
            bias: true,
            activation_types: vec![ActivationType::Tanh, ActivationType::ReLU],
            initial_connection_density: 1.0,
            weight_init_range: 2.0,
            recurrence_chance: 0.5,
            max_edge_addition_attempts: 10,
            ..GeneticConfig::zero()
        };
        let mut history = crate::genomics::History::new(&config);
        let mut genome = NNGenome::new(&config);
        for _ in 0..20 {
            let _ = genome.mutate_add_node(&mut history, &config);
            let _ = genome.mutate_add_edge(&mut history, &config);
        }
        let inputs = [0.3, -1.2, 0.7, 2.0];
        let first = genome.evaluate(&inputs);
        for _ in 0..10 {
            let again = genome.evaluate(&inputs);
            assert!(first
                .iter()
                .zip(&again)
                .all(|(a, b)| a.to_bits() == b.to_bits()));
        }
        assert_ne!(
            Network::diagnose(&genome, &config),
            Err(MalformedGraphError::UntaggedCycle)
        );
    }

    #[test]
    fn diagnose_reports_malformed_genomes() {
        let config = GeneticConfig::zero();
        let mut genome = NNGenome::new(&config);
        genome.add_node(2, ActivationType::ReLU).unwrap();
        genome.add_edge(0, 0, 1, 1.0).unwrap();
        genome.add_edge(1, 1, 2, 1.0).unwrap();
        assert_eq!(Network::diagnose(&genome, &config), Ok(()));

        let wider = GeneticConfig {
            input_count: NonZeroUsize::new(2).unwrap(),
            ..GeneticConfig::zero()
        };
        assert_eq!(
            Network::diagnose(&genome, &wider),
            Err(MalformedGraphError::InputCount {
                expected: 2,
                found: 1
            })
        );

        let mut value = serde_json::to_value(&genome).unwrap();
        value["edges"]["7"] = serde_json::json!({
            "innovation": 7, "from": 2, "to": 1,
            "weight": 1.0, "enabled": false, "recurrent": false
        });
        let cyclic: NNGenome = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(
            Network::diagnose(&cyclic, &config),
            Err(MalformedGraphError::UntaggedCycle)
        );

        value["edges"]["8"] = serde_json::json!({
            "innovation": 8, "from": 9, "to": 1,
            "weight": 1.0, "enabled": true, "recurrent": false
        });
        let dangling: NNGenome = serde_json::from_value(value).unwrap();
        assert_eq!(
            Network::diagnose(&dangling, &config),
            Err(MalformedGraphError::MissingEndpoint { edge: 8 })
        );
    }
}
