//! Genomes are the focus of evolution in NEAT.
//! They are a collection of edges and nodes that can be instantiated
//! as a phenotype (a neural network). Genomes can be progressively mutated,
//! thus adding complexity and functionality.

mod config;
mod dot;
mod edges;
mod errors;
mod history;
mod nodes;

pub use config::GeneticConfig;
pub use dot::DotGraph;
pub use edges::Edge;
pub use errors::{EdgeValidityError, InvalidMutationError, NodeValidityError};
pub use history::History;
pub use nodes::{ActivationType, Node, NodeRole};

use crate::networks::Network;
use crate::Innovation;

use ahash::RandomState;
use neatrl::{ConfigurationError, Genome};
use rand::prelude::{IteratorRandom, Rng, SliceRandom};
use serde::{Deserialize, Serialize};

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

/// A mutable collection of edges and nodes.
///
/// Nodes and edges are kept in maps ordered by id, so that
/// iteration over them (and everything derived from it,
/// such as network evaluation order) is deterministic.
///
/// The non-recurrent edges of a genome, enabled or not,
/// always form a directed acyclic graph.
///
/// Suports Serde for convenient genome saving and loading.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct NNGenome {
    edges: BTreeMap<Innovation, Edge>,
    nodes: BTreeMap<Innovation, Node>,
    node_pairings: HashSet<(Innovation, Innovation), RandomState>,
    fitness: f32,
}

impl NNGenome {
    /// Create a new genome with the specified configuration.
    ///
    /// Inputs are numbered `0..input_count`, followed by the
    /// bias node if [`config.bias`] is set, and then the outputs.
    /// Initially generated edges are given the innovation number
    /// `o + s ⨯ output_count`, where `s` is the id of their source
    /// node and `o` the index of their output.
    ///
    /// [`config.bias`]: GeneticConfig::bias
    ///
    /// # Examples
    /// ```
    /// use neatrl_nn::genomics::{GeneticConfig, NNGenome, NodeRole};
    /// use std::num::NonZeroUsize;
    ///
    /// let config = GeneticConfig {
    ///     input_count: NonZeroUsize::new(3).unwrap(),
    ///     output_count: NonZeroUsize::new(2).unwrap(),
    ///     bias: true,
    ///     initial_connection_density: 1.0,
    ///     weight_init_range: 1.0,
    ///     weight_bound: 5.0,
    ///     ..GeneticConfig::zero()
    /// };
    ///
    /// let genome = NNGenome::new(&config);
    ///
    /// // As configured, the genome should have 3 inputs + 1 bias + 2 outputs.
    /// assert_eq!(genome.nodes().count(), 3 + 1 + 2);
    /// assert_eq!(genome.nodes().filter(|n| n.role() == NodeRole::Input).count(), 3);
    /// assert_eq!(genome.nodes().filter(|n| n.role() == NodeRole::Output).count(), 2);
    ///
    /// // With an initial_connection_density of 1, every source feeds every output.
    /// assert_eq!(genome.edges().count(), 4 * 2);
    ///
    /// // All edges have weights within the initial range.
    /// assert!(genome.edges().all(|e| e.weight().abs() <= config.weight_init_range));
    /// ```
    pub fn new(config: &GeneticConfig) -> NNGenome {
        let mut genome = NNGenome {
            edges: BTreeMap::new(),
            nodes: Self::generate_nodes(config),
            node_pairings: HashSet::default(),
            fitness: 0.0,
        };
        genome.generate_initial_edges(config);
        genome
    }

    fn generate_nodes(config: &GeneticConfig) -> BTreeMap<Innovation, Node> {
        let input_count = config.input_count.get();
        let source_count = config.source_count();
        let mut nodes = BTreeMap::new();

        for i in 0..input_count {
            nodes.insert(i, Node::new(i, NodeRole::Input, ActivationType::Identity));
        }
        if config.bias {
            nodes.insert(
                input_count,
                Node::new(input_count, NodeRole::Bias, ActivationType::Identity),
            );
        }
        for o in 0..config.output_count.get() {
            let id = source_count + o;
            let activation = config
                .output_activation_types
                .get(o)
                .copied()
                .unwrap_or(ActivationType::Sigmoid);
            nodes.insert(id, Node::new(id, NodeRole::Output, activation));
        }

        nodes
    }

    fn generate_initial_edges(&mut self, config: &GeneticConfig) {
        if config.initial_connection_density == 0.0 {
            return;
        }
        let source_count = config.source_count();
        let output_count = config.output_count.get();
        let mut rng = rand::thread_rng();
        for s in 0..source_count {
            for o in 0..output_count {
                if rng.gen::<f32>() < config.initial_connection_density {
                    let weight = Edge::random_weight(config, &mut rng);
                    self.insert_edge_unchecked(Edge::new(
                        o + s * output_count,
                        s,
                        source_count + o,
                        weight,
                    ));
                }
            }
        }
    }

    /// Add a new, non-recurrent edge to the genome.
    /// Returns a reference to the new edge.
    ///
    /// # Errors
    ///
    /// Returns an error if an edge with the same id or
    /// the same endpoints already exists, if either endpoint
    /// is absent, if the target is an input or bias node, or
    /// if the edge would close a cycle (self-loops included).
    ///
    /// # Examples
    /// ```
    /// use neatrl_nn::genomics::{ActivationType, EdgeValidityError, GeneticConfig, NNGenome};
    /// use std::num::NonZeroUsize;
    ///
    /// let config = GeneticConfig {
    ///     input_count: NonZeroUsize::new(3).unwrap(),
    ///     output_count: NonZeroUsize::new(2).unwrap(),
    ///     ..GeneticConfig::zero()
    /// };
    ///
    /// let mut genome = NNGenome::new(&config);
    ///
    /// // The genome is initially empty.
    /// assert_eq!(genome.edges().count(), 0);
    ///
    /// let inserted_edge = genome.add_edge(42, 2, 4, 2.5).unwrap().clone();
    ///
    /// // The genome now contains an edge with the specified characteristics.
    /// assert_eq!(&inserted_edge, genome.edges().next().unwrap());
    /// assert_eq!(inserted_edge.endpoints(), (2, 4));
    /// assert_eq!(inserted_edge.weight(), 2.5);
    ///
    /// // Going around in a circle needs a recurrent edge.
    /// genome.add_node(5, ActivationType::Tanh).unwrap();
    /// genome.add_edge(43, 4, 5, -3.0).unwrap();
    /// assert_eq!(
    ///     genome.add_edge(44, 5, 4, 1.0).unwrap_err(),
    ///     EdgeValidityError::UntaggedCycle(5, 4)
    /// );
    /// genome.add_recurrent_edge(44, 5, 4, 1.0).unwrap();
    /// ```
    pub fn add_edge(
        &mut self,
        innovation: Innovation,
        from: Innovation,
        to: Innovation,
        weight: f32,
    ) -> Result<&mut Edge, EdgeValidityError> {
        self.check_edge_validity(innovation, from, to, false)?;
        Ok(self.insert_edge_unchecked(Edge::new(innovation, from, to, weight)))
    }

    /// Add a new recurrent edge to the genome. Recurrent edges
    /// may close cycles, and are the only kind of self-loop.
    ///
    /// # Errors
    ///
    /// As [`add_edge`], except that cycles are allowed.
    ///
    /// [`add_edge`]: NNGenome::add_edge
    pub fn add_recurrent_edge(
        &mut self,
        innovation: Innovation,
        from: Innovation,
        to: Innovation,
        weight: f32,
    ) -> Result<&mut Edge, EdgeValidityError> {
        self.check_edge_validity(innovation, from, to, true)?;
        Ok(self.insert_edge_unchecked(Edge::new_recurrent(innovation, from, to, weight)))
    }

    /// Inserts an edge, updating its endpoints' adjacency.
    /// Assumes that the edge is valid for the genome.
    fn insert_edge_unchecked(&mut self, edge: Edge) -> &mut Edge {
        let innovation = edge.innovation();
        let (from, to) = edge.endpoints();
        if let Some(node) = self.nodes.get_mut(&from) {
            node.add_output_edge(innovation);
        }
        if let Some(node) = self.nodes.get_mut(&to) {
            node.add_input_edge(innovation);
        }
        self.node_pairings.insert((from, to));
        self.edges.entry(innovation).or_insert(edge)
    }

    fn check_edge_validity(
        &self,
        innovation: Innovation,
        from: Innovation,
        to: Innovation,
        recurrent: bool,
    ) -> Result<(), EdgeValidityError> {
        use EdgeValidityError::*;
        let target = match (self.nodes.contains_key(&from), self.nodes.get(&to)) {
            (true, Some(target)) => target,
            _ => return Err(NonexistentEndpoints(from, to)),
        };
        if self.edges.contains_key(&innovation) {
            Err(DuplicateEdgeID(innovation))
        } else if self.node_pairings.contains(&(from, to)) {
            Err(DuplicateEndpoints {
                id: innovation,
                from,
                to,
            })
        } else if target.role().is_source() {
            Err(SourceTarget(to))
        } else if !recurrent && from == to {
            Err(UntaggedSelfLoop(from))
        } else if !recurrent && self.path_exists(to, from) {
            Err(UntaggedCycle(from, to))
        } else {
            Ok(())
        }
    }

    /// Whether `goal` can be reached from `start`
    /// following non-recurrent edges, enabled or not.
    fn path_exists(&self, start: Innovation, goal: Innovation) -> bool {
        let mut visited: HashSet<Innovation, RandomState> = HashSet::default();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            if id == goal {
                return true;
            }
            if !visited.insert(id) {
                continue;
            }
            if let Some(node) = self.nodes.get(&id) {
                stack.extend(
                    node.output_edges()
                        .filter_map(|e| self.edges.get(e))
                        .filter(|e| !e.is_recurrent())
                        .map(Edge::to),
                );
            }
        }
        false
    }

    /// Add a new, unconnected hidden node to the genome.
    /// Returns a reference to the newly created node.
    ///
    /// # Errors
    ///
    /// Returns an error if a node with the same id
    /// already exists in the genome.
    ///
    /// # Examples
    /// ```
    /// use neatrl_nn::genomics::{ActivationType, GeneticConfig, NNGenome, NodeRole};
    ///
    /// let mut genome = NNGenome::new(&GeneticConfig::zero());
    ///
    /// let inserted_node = genome.add_node(42, ActivationType::Sigmoid).unwrap().clone();
    ///
    /// assert_eq!(genome.nodes().count(), 1 + 1 + 1);
    /// assert_eq!(inserted_node.id(), 42);
    /// assert_eq!(inserted_node.role(), NodeRole::Hidden);
    ///
    /// assert!(genome.add_node(42, ActivationType::ReLU).is_err());
    /// ```
    pub fn add_node(
        &mut self,
        id: Innovation,
        activation: ActivationType,
    ) -> Result<&mut Node, NodeValidityError> {
        if self.nodes.contains_key(&id) {
            return Err(NodeValidityError::DuplicateNodeID(id));
        }
        Ok(self
            .nodes
            .entry(id)
            .or_insert_with(|| Node::new(id, NodeRole::Hidden, activation)))
    }

    /// Removes an edge from the genome and returns it.
    ///
    /// # Errors
    ///
    /// Returns an error if no edge has the given innovation number.
    pub fn remove_edge(&mut self, innovation: Innovation) -> Result<Edge, EdgeValidityError> {
        let edge = self
            .edges
            .remove(&innovation)
            .ok_or(EdgeValidityError::AbsentEdge(innovation))?;
        let (from, to) = edge.endpoints();
        if let Some(node) = self.nodes.get_mut(&from) {
            node.remove_output_edge(innovation);
        }
        if let Some(node) = self.nodes.get_mut(&to) {
            node.remove_input_edge(innovation);
        }
        self.node_pairings.remove(&(from, to));
        Ok(edge)
    }

    /// Removes a hidden node and all of its incident edges.
    /// Returns the node and the removed edges, in
    /// innovation order.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not exist or
    /// is not a hidden node.
    pub fn remove_node(&mut self, id: Innovation) -> Result<(Node, Vec<Edge>), NodeValidityError> {
        let node = self
            .nodes
            .get(&id)
            .ok_or(NodeValidityError::AbsentNode(id))?;
        if node.role() != NodeRole::Hidden {
            return Err(NodeValidityError::NotHidden(id));
        }
        let incident: BTreeSet<Innovation> = node
            .input_edges()
            .chain(node.output_edges())
            .copied()
            .collect();
        let edges = incident
            .into_iter()
            .filter_map(|innovation| self.remove_edge(innovation).ok())
            .collect();
        let node = self
            .nodes
            .remove(&id)
            .ok_or(NodeValidityError::AbsentNode(id))?;
        Ok((node, edges))
    }

    /// Induces a _weight mutation_ in the genome.
    ///
    /// Each edge is perturbed with probability
    /// [`weight_perturb_chance`], gaussian noise being added
    /// and the result clamped to `[-weight_bound, weight_bound]`;
    /// edges not perturbed have their weight redrawn with
    /// probability [`weight_replace_chance`].
    ///
    /// [`weight_perturb_chance`]: GeneticConfig::weight_perturb_chance
    /// [`weight_replace_chance`]: GeneticConfig::weight_replace_chance
    ///
    /// # Examples
    /// ```
    /// use neatrl_nn::genomics::{GeneticConfig, NNGenome};
    ///
    /// let config = GeneticConfig {
    ///     initial_connection_density: 1.0,
    ///     weight_init_range: 1.0,
    ///     weight_bound: 5.0,
    ///     weight_perturb_power: 2.5,
    ///     weight_perturb_chance: 1.0,
    ///     ..GeneticConfig::zero()
    /// };
    ///
    /// let mut genome = NNGenome::new(&config);
    /// genome.mutate_weights(&config);
    ///
    /// // The edge's weight is still within the weight bounds.
    /// assert!(genome.edges().all(|e| e.weight().abs() <= config.weight_bound));
    /// ```
    pub fn mutate_weights(&mut self, config: &GeneticConfig) {
        let mut rng = rand::thread_rng();
        for edge in self.edges.values_mut() {
            if rng.gen::<f32>() < config.weight_perturb_chance {
                edge.perturb_weight(config, &mut rng);
            } else if rng.gen::<f32>() < config.weight_replace_chance {
                edge.replace_weight(config, &mut rng);
            }
        }
    }

    /// Toggles the enabled flag of a randomly chosen edge.
    ///
    /// # Errors
    ///
    /// Returns an error if the genome has no edges.
    pub fn mutate_toggle_enabled(&mut self) -> Result<&Edge, InvalidMutationError> {
        let edge = self
            .edges
            .values_mut()
            .choose(&mut rand::thread_rng())
            .ok_or(InvalidMutationError::NoEdges)?;
        edge.set_enabled(!edge.enabled());
        Ok(edge)
    }

    /// Induces an _edge addition mutation_ in the genome.
    /// If successful, returns the newly added edge.
    ///
    /// Edges never target input or bias nodes, nor connect two
    /// distinct output nodes. An edge that would close a cycle
    /// (self-loops included) is tagged recurrent with probability
    /// [`recurrence_chance`], and rejected otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if no viable pair of nodes
    /// exists or [too many] attempts have failed.
    ///
    /// [`recurrence_chance`]: GeneticConfig::recurrence_chance
    /// [too many]: GeneticConfig::max_edge_addition_attempts
    ///
    /// # Examples
    /// ```
    /// use neatrl_nn::genomics::{GeneticConfig, History, NNGenome};
    ///
    /// let config = GeneticConfig {
    ///     max_edge_addition_attempts: 2,
    ///     ..GeneticConfig::zero()
    /// };
    ///
    /// let mut genome = NNGenome::new(&config);
    ///
    /// // The genome is initially empty.
    /// assert_eq!(genome.edges().count(), 0);
    ///
    /// genome.mutate_add_edge(&mut History::new(&config), &config).unwrap();
    ///
    /// // The genome now has its only legal non-recurrent edge.
    /// assert_eq!(genome.edges().next().unwrap().endpoints(), (0, 1));
    /// ```
    pub fn mutate_add_edge(
        &mut self,
        history: &mut History,
        config: &GeneticConfig,
    ) -> Result<&Edge, InvalidMutationError> {
        let targets: Vec<Innovation> = self
            .nodes
            .values()
            .filter(|n| !n.role().is_source())
            .map(Node::id)
            .collect();
        let mut sources: Vec<Innovation> = self
            .nodes
            .keys()
            .copied()
            .filter(|s| self.candidate_targets(*s, &targets).next().is_some())
            .collect();

        if sources.is_empty() {
            return Err(InvalidMutationError::GenomeFullyConnected);
        }

        let mut rng = rand::thread_rng();
        sources.shuffle(&mut rng);

        let pair = sources
            .iter()
            .take(config.max_edge_addition_attempts)
            .filter_map(|from| {
                let to = self.candidate_targets(*from, &targets).choose(&mut rng)?;
                let recurrent = *from == to || self.path_exists(to, *from);
                if recurrent && rng.gen::<f32>() >= config.recurrence_chance {
                    None
                } else {
                    Some((*from, to, recurrent))
                }
            })
            .next();

        match pair {
            Some((from, to, recurrent)) => {
                let innovation = history.register_edge(from, to);
                self.check_edge_validity(innovation, from, to, recurrent)?;
                let weight = Edge::random_weight(config, &mut rng);
                let edge = if recurrent {
                    Edge::new_recurrent(innovation, from, to, weight)
                } else {
                    Edge::new(innovation, from, to, weight)
                };
                Ok(self.insert_edge_unchecked(edge))
            }
            None => Err(InvalidMutationError::NoViablePair),
        }
    }

    /// Nodes `from` may still be connected to.
    fn candidate_targets<'a>(
        &'a self,
        from: Innovation,
        targets: &'a [Innovation],
    ) -> impl Iterator<Item = Innovation> + 'a {
        let from_output = self.nodes.get(&from).map(Node::role) == Some(NodeRole::Output);
        targets.iter().copied().filter(move |to| {
            !self.node_pairings.contains(&(from, *to))
                && !(from_output
                    && from != *to
                    && self.nodes.get(to).map(Node::role) == Some(NodeRole::Output))
        })
    }

    /// Induces a _node addition mutation_ in the genome.
    /// If successful, returns the triplet (_incoming edge_, _new node_,
    /// _outgoing edge_) as a tuple of references.
    ///
    /// A random enabled, non-recurrent edge `a -> b` is disabled and
    /// replaced by `a -> n -> b`, where `a -> n` has weight 1 and
    /// `n -> b` the weight of the split edge.
    ///
    /// # Errors
    ///
    /// This function returns an error if there are no edges in
    /// the genome that could be split.
    ///
    /// # Examples
    /// ```
    /// use neatrl_nn::genomics::{ActivationType, GeneticConfig, History, NNGenome, NodeRole};
    ///
    /// let config = GeneticConfig {
    ///     initial_connection_density: 1.0,
    ///     weight_init_range: 1.0,
    ///     weight_bound: 1.0,
    ///     activation_types: vec![ActivationType::ReLU],
    ///     ..GeneticConfig::zero()
    /// };
    ///
    /// let mut genome = NNGenome::new(&config);
    ///
    /// // The genome starts with a single edge, an input and an output node.
    /// assert_eq!(genome.edges().count(), 1);
    /// assert_eq!(genome.nodes().count(), 1 + 1);
    ///
    /// let split_edge = genome.edges().next().unwrap().clone();
    ///
    /// let (in_edge, new_node, out_edge) =
    ///     genome.mutate_add_node(&mut History::new(&config), &config).unwrap();
    ///
    /// assert_eq!(in_edge.to(), new_node.id());
    /// assert_eq!(in_edge.weight(), 1.0);
    ///
    /// assert_eq!(out_edge.from(), new_node.id());
    /// assert_eq!(out_edge.weight(), split_edge.weight());
    ///
    /// assert_eq!(new_node.activation(), ActivationType::ReLU);
    /// assert_eq!(new_node.role(), NodeRole::Hidden);
    ///
    /// assert_eq!(genome.edges().count(), 1 + 2);
    /// assert_eq!(genome.nodes().count(), 1 + 1 + 1);
    ///
    /// // The split edge is disabled.
    /// assert!(!genome.edge(split_edge.innovation()).unwrap().enabled());
    /// ```
    pub fn mutate_add_node(
        &mut self,
        history: &mut History,
        config: &GeneticConfig,
    ) -> Result<(&Edge, &Node, &Edge), InvalidMutationError> {
        let mut rng = rand::thread_rng();
        let split = self
            .edges
            .values()
            .filter(|e| e.enabled() && !e.is_recurrent())
            .choose(&mut rng)
            .ok_or(InvalidMutationError::NoSplittableEdge)?;
        let (split, (from, to), weight) = (split.innovation(), split.endpoints(), split.weight());

        // A genome splitting the same edge twice gets fresh numbers.
        let (in_edge, node, out_edge) = match history.split_record(split) {
            Some(record) if !self.nodes.contains_key(&record.1) => record,
            _ => history.mint_split(split, from, to),
        };

        let activation = config
            .activation_types
            .choose(&mut rng)
            .copied()
            .unwrap_or(ActivationType::Sigmoid);

        if let Some(edge) = self.edges.get_mut(&split) {
            edge.set_enabled(false);
        }
        self.nodes.insert(node, Node::new(node, NodeRole::Hidden, activation));
        self.insert_edge_unchecked(Edge::new(in_edge, from, node, 1.0));
        self.insert_edge_unchecked(Edge::new(out_edge, node, to, weight));

        Ok((&self.edges[&in_edge], &self.nodes[&node], &self.edges[&out_edge]))
    }

    /// Deletes a randomly-chosen edge from the genome.
    ///
    /// # Errors
    ///
    /// Returns an error if the genome has no edges.
    ///
    /// # Examples
    /// ```
    /// use neatrl_nn::genomics::{GeneticConfig, NNGenome};
    /// use std::num::NonZeroUsize;
    ///
    /// let config = GeneticConfig {
    ///     input_count: NonZeroUsize::new(2).unwrap(),
    ///     initial_connection_density: 1.0,
    ///     ..GeneticConfig::zero()
    /// };
    /// let mut genome = NNGenome::new(&config);
    ///
    /// let initial_edge_count = genome.edges().count();
    ///
    /// genome.mutate_delete_edge().unwrap();
    ///
    /// assert_eq!(genome.edges().count(), initial_edge_count - 1);
    /// ```
    pub fn mutate_delete_edge(&mut self) -> Result<Edge, InvalidMutationError> {
        let innovation = self
            .edges
            .keys()
            .copied()
            .choose(&mut rand::thread_rng())
            .ok_or(InvalidMutationError::NoEdges)?;
        Ok(self.remove_edge(innovation)?)
    }

    /// Deletes a randomly-chosen hidden node, and all
    /// incident edges, from the genome.
    ///
    /// # Errors
    ///
    /// Returns an error if the genome has no hidden nodes.
    ///
    /// # Examples
    /// ```
    /// use neatrl_nn::genomics::{ActivationType, GeneticConfig, NNGenome};
    ///
    /// let mut genome = NNGenome::new(&GeneticConfig::zero());
    /// genome.add_node(42, ActivationType::Sigmoid).unwrap();
    /// genome.add_edge(16, 0, 42, 1.0).unwrap();
    /// genome.add_edge(17, 42, 1, 1.0).unwrap();
    ///
    /// let (removed_node, removed_edges) = genome.mutate_delete_node().unwrap();
    ///
    /// assert_eq!(removed_node.id(), 42);
    /// assert_eq!(removed_edges[0].innovation(), 16);
    /// assert_eq!(removed_edges[1].innovation(), 17);
    ///
    /// assert_eq!(genome.nodes().count(), 2);
    /// assert_eq!(genome.edges().count(), 0);
    /// ```
    pub fn mutate_delete_node(&mut self) -> Result<(Node, Vec<Edge>), InvalidMutationError> {
        let id = self
            .random_hidden_node()
            .ok_or(InvalidMutationError::NoHiddenNode)?;
        self.remove_node(id)
            .map_err(|_| InvalidMutationError::NoHiddenNode)
    }

    /// Switches a randomly-chosen hidden node to a random
    /// activation function among [`activation_types`].
    ///
    /// # Errors
    ///
    /// Returns an error if the genome has no hidden nodes.
    ///
    /// [`activation_types`]: GeneticConfig::activation_types
    pub fn mutate_activation(
        &mut self,
        config: &GeneticConfig,
    ) -> Result<&Node, InvalidMutationError> {
        let mut rng = rand::thread_rng();
        let id = self
            .random_hidden_node()
            .ok_or(InvalidMutationError::NoHiddenNode)?;
        let activation = config
            .activation_types
            .choose(&mut rng)
            .copied()
            .unwrap_or(ActivationType::Sigmoid);
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or(InvalidMutationError::NoHiddenNode)?;
        node.set_activation(activation);
        Ok(node)
    }

    fn random_hidden_node(&self) -> Option<Innovation> {
        self.nodes
            .values()
            .filter(|n| n.role() == NodeRole::Hidden)
            .map(Node::id)
            .choose(&mut rand::thread_rng())
    }

    /// Performs all mutations on the genome, each
    /// with its configured probability. Mutations with
    /// nothing to act on are skipped.
    ///
    /// # Examples
    /// ```
    /// use neatrl_nn::genomics::{ActivationType, GeneticConfig, History, NNGenome};
    ///
    /// let config = GeneticConfig {
    ///     initial_connection_density: 1.0,
    ///     activation_types: vec![ActivationType::Tanh],
    ///     node_addition_chance: 1.0,
    ///     ..GeneticConfig::zero()
    /// };
    /// let mut history = History::new(&config);
    /// let mut genome = NNGenome::new(&config);
    ///
    /// genome.mutate(&mut history, &config);
    ///
    /// assert_eq!(genome.nodes().count(), 3);
    /// ```
    pub fn mutate(&mut self, history: &mut History, config: &GeneticConfig) {
        let mut rng = rand::thread_rng();
        if rng.gen::<f32>() < config.node_deletion_chance {
            skip_failed("node deletion", self.mutate_delete_node());
        }
        if rng.gen::<f32>() < config.edge_deletion_chance {
            skip_failed("edge deletion", self.mutate_delete_edge());
        }
        self.mutate_weights(config);
        if rng.gen::<f32>() < config.enabled_toggle_chance {
            skip_failed("enabled toggle", self.mutate_toggle_enabled());
        }
        if rng.gen::<f32>() < config.node_addition_chance {
            skip_failed("node addition", self.mutate_add_node(history, config));
        }
        if rng.gen::<f32>() < config.edge_addition_chance {
            skip_failed("edge addition", self.mutate_add_edge(history, config));
        }
        if rng.gen::<f32>() < config.activation_mutation_chance {
            skip_failed("activation mutation", self.mutate_activation(config));
        }
    }

    /// Combines two genomes and returns their _child_ genome.
    ///
    /// Edges are aligned by innovation number. The child inherits the
    /// structure of the fitter parent (chosen at random on a tie);
    /// matching edges take their weight from either parent with equal
    /// probability, and if disabled in either parent they are disabled
    /// with probability [`disable_inherited_chance`]. Input, bias and
    /// output nodes are always kept; hidden nodes only if an inherited
    /// edge touches them.
    ///
    /// [`disable_inherited_chance`]: GeneticConfig::disable_inherited_chance
    ///
    /// # Examples
    /// ```
    /// use neatrl_nn::genomics::{GeneticConfig, NNGenome};
    /// use std::num::NonZeroUsize;
    ///
    /// let config = GeneticConfig {
    ///     input_count: NonZeroUsize::new(3).unwrap(),
    ///     output_count: NonZeroUsize::new(2).unwrap(),
    ///     initial_connection_density: 0.5,
    ///     weight_init_range: 1.0,
    ///     ..GeneticConfig::zero()
    /// };
    ///
    /// let mut fitter = NNGenome::new(&config);
    /// fitter.set_fitness(10.0);
    /// let other = NNGenome::new(&config);
    ///
    /// let child = NNGenome::crossover(&fitter, &other, &config);
    ///
    /// // The child has the structure of the fitter parent.
    /// assert!(child.edges().map(|e| e.innovation()).eq(fitter.edges().map(|e| e.innovation())));
    /// ```
    pub fn crossover(parent1: &NNGenome, parent2: &NNGenome, config: &GeneticConfig) -> NNGenome {
        let mut rng = rand::thread_rng();
        let (fitter, other) = if parent1.fitness > parent2.fitness
            || (parent1.fitness == parent2.fitness && rng.gen::<bool>())
        {
            (parent1, parent2)
        } else {
            (parent2, parent1)
        };

        let mut child = NNGenome {
            edges: BTreeMap::new(),
            nodes: BTreeMap::new(),
            node_pairings: HashSet::default(),
            fitness: 0.0,
        };

        let referenced: BTreeSet<Innovation> = fitter
            .edges
            .values()
            .flat_map(|e| {
                let (from, to) = e.endpoints();
                [from, to]
            })
            .collect();
        for (id, node) in &fitter.nodes {
            if node.role() == NodeRole::Hidden && !referenced.contains(id) {
                continue;
            }
            let contributor = match other.nodes.get(id) {
                Some(matching) if rng.gen::<bool>() => matching,
                _ => node,
            };
            child.nodes.insert(*id, contributor.unconnected());
        }

        for (id, edge) in &fitter.edges {
            let mut inherited = edge.clone();
            if let Some(matching) = other.edges.get(id) {
                if rng.gen::<bool>() {
                    inherited.set_weight(matching.weight());
                }
                let disabled_in_parent = !edge.enabled() || !matching.enabled();
                inherited.set_enabled(
                    !(disabled_in_parent && rng.gen::<f32>() < config.disable_inherited_chance),
                );
            }
            child.insert_edge_unchecked(inherited);
        }

        child
    }

    /// Calculates the _compatibility distance_ between two genomes,
    /// `c1·E/N + c2·D/N + c3·W`, where `E` counts excess edges, `D`
    /// disjoint edges, `W` is the mean weight difference of matching
    /// edges, and `N` the edge count of the larger genome (or 1 if
    /// both are smaller than [`distance_normalization_threshold`]).
    ///
    /// [`distance_normalization_threshold`]: GeneticConfig::distance_normalization_threshold
    ///
    /// # Examples
    /// ```
    /// use neatrl_nn::genomics::{ActivationType, GeneticConfig, NNGenome};
    /// use std::num::NonZeroUsize;
    ///
    /// let config = GeneticConfig {
    ///     input_count: NonZeroUsize::new(2).unwrap(),
    ///     excess_coefficient: 1.5,
    ///     disjoint_coefficient: 0.5,
    ///     weight_coefficient: 0.25,
    ///     distance_normalization_threshold: 20,
    ///     ..GeneticConfig::zero()
    /// };
    ///
    /// let mut genome1 = NNGenome::new(&config);
    /// let mut genome2 = NNGenome::new(&config);
    ///
    /// // Matching edge, weight difference of 2.0.
    /// genome1.add_edge(0, 0, 2, 1.0).unwrap();
    /// genome2.add_edge(0, 0, 2, -1.0).unwrap();
    ///
    /// // Disjoint edge.
    /// genome1.add_edge(1, 1, 2, 3.0).unwrap();
    ///
    /// // Excess edge.
    /// genome2.add_recurrent_edge(4, 2, 2, 1.0).unwrap();
    ///
    /// assert_eq!(
    ///     NNGenome::compatibility_distance(&genome1, &genome2, &config),
    ///     1.5 * 1.0 + 0.5 * 1.0 + 0.25 * 2.0
    /// );
    /// ```
    pub fn compatibility_distance(
        first: &NNGenome,
        second: &NNGenome,
        config: &GeneticConfig,
    ) -> f32 {
        let (excess_first, disjoint_first) = first.count_unmatched(second);
        let (excess_second, disjoint_second) = second.count_unmatched(first);
        let excess = (excess_first + excess_second) as f32;
        let disjoint = (disjoint_first + disjoint_second) as f32;

        let weight_differences: Vec<f32> = first
            .edges
            .iter()
            .filter_map(|(id, e)| second.edges.get(id).map(|o| (e.weight() - o.weight()).abs()))
            .collect();
        let mean_weight_difference = if weight_differences.is_empty() {
            0.0
        } else {
            weight_differences.iter().sum::<f32>() / weight_differences.len() as f32
        };

        let larger = first.edges.len().max(second.edges.len());
        let normalization = if larger < config.distance_normalization_threshold {
            1.0
        } else {
            larger.max(1) as f32
        };

        config.excess_coefficient * excess / normalization
            + config.disjoint_coefficient * disjoint / normalization
            + config.weight_coefficient * mean_weight_difference
    }

    /// Counts this genome's edges absent in `other`, as
    /// `(excess, disjoint)` relative to `other`'s innovation range.
    fn count_unmatched(&self, other: &NNGenome) -> (usize, usize) {
        let other_max = other.edges.keys().next_back().copied();
        self.edges
            .keys()
            .filter(|id| !other.edges.contains_key(id))
            .fold((0, 0), |(excess, disjoint), id| match other_max {
                Some(max) if *id < max => (excess, disjoint + 1),
                _ => (excess + 1, disjoint),
            })
    }

    /// Evaluates the genome's network once, from a
    /// cleared state, on the given inputs.
    ///
    /// # Examples
    /// ```
    /// use neatrl_nn::genomics::{ActivationType, GeneticConfig, NNGenome};
    ///
    /// let config = GeneticConfig {
    ///     output_activation_types: vec![ActivationType::Identity],
    ///     ..GeneticConfig::zero()
    /// };
    /// let mut genome = NNGenome::new(&config);
    /// genome.add_edge(0, 0, 1, -2.0).unwrap();
    ///
    /// assert_eq!(genome.evaluate(&[1.5]), vec![-3.0]);
    /// ```
    pub fn evaluate(&self, inputs: &[f32]) -> Vec<f32> {
        Network::new(self).activate(inputs)
    }

    /// Returns an iterator over the genome's edges,
    /// in innovation order.
    ///
    /// # Examples
    /// ```
    /// use neatrl_nn::genomics::{GeneticConfig, NNGenome};
    /// use std::num::NonZeroUsize;
    ///
    /// let config = GeneticConfig {
    ///     input_count: NonZeroUsize::new(3).unwrap(),
    ///     output_count: NonZeroUsize::new(2).unwrap(),
    ///     initial_connection_density: 1.0,
    ///     ..GeneticConfig::zero()
    /// };
    ///
    /// let genome = NNGenome::new(&config);
    ///
    /// for edge in genome.edges() {
    ///     println!("edge: {}", edge);
    /// }
    /// ```
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    /// Returns an iterator over the genome's nodes, in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Returns the edge with the given innovation number.
    pub fn edge(&self, innovation: Innovation) -> Option<&Edge> {
        self.edges.get(&innovation)
    }

    /// Returns a mutable reference to the edge with the
    /// given innovation number. Only weights and enabled
    /// flags can be changed through it.
    pub fn edge_mut(&mut self, innovation: Innovation) -> Option<&mut Edge> {
        self.edges.get_mut(&innovation)
    }

    /// Returns the node with the given id, if present.
    pub fn node(&self, id: Innovation) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Sets the genome's fitness to the value passed.
    ///
    /// # Examples
    /// ```
    /// use neatrl_nn::genomics::{GeneticConfig, NNGenome};
    ///
    /// let mut genome = NNGenome::new(&GeneticConfig::zero());
    ///
    /// assert_eq!(genome.fitness(), 0.0);
    ///
    /// // Negative rewards are fine.
    /// genome.set_fitness(-32.0);
    ///
    /// assert_eq!(genome.fitness(), -32.0);
    /// ```
    pub fn set_fitness(&mut self, fitness: f32) {
        self.fitness = fitness;
    }

    /// Returns the genome's last assigned fitness.
    pub fn fitness(&self) -> f32 {
        self.fitness
    }

    /// Returns a Graphviz rendering of the genome.
    ///
    /// # Examples
    /// ```
    /// use neatrl_nn::genomics::{GeneticConfig, NNGenome};
    ///
    /// let genome = NNGenome::new(&GeneticConfig::zero());
    ///
    /// assert!(genome.to_dot().starts_with("digraph"));
    /// ```
    pub fn to_dot(&self) -> String {
        DotGraph(self).to_string()
    }
}

fn skip_failed<T>(mutation: &str, result: Result<T, InvalidMutationError>) {
    if let Err(e) = result {
        log::trace!("skipped {}: {}", mutation, e);
    }
}

impl Genome for NNGenome {
    type Config = GeneticConfig;
    type InnovationHistory = History;

    fn new(config: &GeneticConfig) -> NNGenome {
        Self::new(config)
    }

    fn check_config(config: &GeneticConfig) -> Result<(), ConfigurationError> {
        config.validate()
    }

    fn compatibility_distance(first: &NNGenome, second: &NNGenome, config: &GeneticConfig) -> f32 {
        Self::compatibility_distance(first, second, config)
    }

    fn crossover(parent1: &NNGenome, parent2: &NNGenome, config: &GeneticConfig) -> NNGenome {
        Self::crossover(parent1, parent2, config)
    }

    fn mutate(&mut self, history: &mut History, config: &GeneticConfig) {
        Self::mutate(self, history, config)
    }

    fn set_fitness(&mut self, fitness: f32) {
        Self::set_fitness(self, fitness)
    }

    fn fitness(&self) -> f32 {
        Self::fitness(self)
    }
}

impl fmt::Display for NNGenome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "NNGenome (fitness {}) {{", self.fitness)?;
        for node in self.nodes.values() {
            writeln!(f, "\t{}", node)?;
        }
        for edge in self.edges.values() {
            writeln!(f, "\t{}", edge)?;
        }
        write!(f, "}}")
    }
}
