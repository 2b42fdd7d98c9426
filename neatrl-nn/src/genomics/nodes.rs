use crate::Innovation;

use ahash::RandomState;
use serde::{Deserialize, Serialize};

use std::collections::HashSet;
use std::f32::consts::PI;
use std::fmt;

/// An ActivationType represents the type
/// of activation function the node's network
/// equivalent will use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ActivationType {
    // 1 / (1 + exp(-z)), z = clamp(2.5x, ±60)
    Sigmoid,
    // tanh(z), z = clamp(2.5x, ±60)
    Tanh,
    // max(x, 0)
    ReLU,
    // |x|
    Abs,
    // x
    Identity,
    // exp(-x²)
    Gaussian,
    // sin(πx)
    Sinusoidal,
}

impl ActivationType {
    /// Applies the activation function to a weighted input sum.
    ///
    /// # Examples
    /// ```
    /// use neatrl_nn::genomics::ActivationType;
    ///
    /// assert_eq!(ActivationType::Sigmoid.apply(0.0), 0.5);
    /// assert_eq!(ActivationType::ReLU.apply(-3.0), 0.0);
    /// assert_eq!(ActivationType::Abs.apply(-3.0), 3.0);
    /// assert_eq!(ActivationType::Sigmoid.apply(1e9), 1.0);
    /// ```
    pub fn apply(self, x: f32) -> f32 {
        match self {
            ActivationType::Sigmoid => 1.0 / (1.0 + (-(2.5 * x).clamp(-60.0, 60.0)).exp()),
            ActivationType::Tanh => (2.5 * x).clamp(-60.0, 60.0).tanh(),
            ActivationType::ReLU => x.max(0.0),
            ActivationType::Abs => x.abs(),
            ActivationType::Identity => x,
            ActivationType::Gaussian => (-x * x).exp(),
            ActivationType::Sinusoidal => (PI * x).sin(),
        }
    }
}

/// A NodeRole indicates the function of
/// the node's network equivalent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeRole {
    /// Input nodes, set from observations.
    Input,
    /// The bias node, constantly outputting 1.
    Bias,
    /// Hidden nodes.
    Hidden,
    /// Output nodes, read as actions.
    Output,
}

impl NodeRole {
    /// Whether nodes of this role feed values into
    /// the network, and so cannot receive edges.
    pub fn is_source(self) -> bool {
        matches!(self, NodeRole::Input | NodeRole::Bias)
    }
}

/// Nodes are the structural elements of genomes
/// between which edges are created.
///
/// Each node keeps the innovation numbers of
/// its incoming and outgoing edges.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Node {
    id: Innovation,
    inputs: HashSet<Innovation, RandomState>,
    outputs: HashSet<Innovation, RandomState>,
    role: NodeRole,
    activation: ActivationType,
}

impl Node {
    /// Generate a new, unconnected node with the passed parameters.
    ///
    /// # Examples
    /// ```
    /// use neatrl_nn::genomics::{ActivationType, Node, NodeRole};
    ///
    /// let node = Node::new(5, NodeRole::Hidden, ActivationType::Tanh);
    ///
    /// assert_eq!(node.id(), 5);
    /// assert_eq!(node.role(), NodeRole::Hidden);
    /// assert_eq!(node.activation(), ActivationType::Tanh);
    /// assert_eq!(node.input_edges().count(), 0);
    /// ```
    pub fn new(id: Innovation, role: NodeRole, activation: ActivationType) -> Node {
        Node {
            id,
            inputs: HashSet::default(),
            outputs: HashSet::default(),
            role,
            activation,
        }
    }

    /// Returns a copy of the node without any connections.
    pub(super) fn unconnected(&self) -> Node {
        Node::new(self.id, self.role, self.activation)
    }

    pub(super) fn add_input_edge(&mut self, edge: Innovation) {
        self.inputs.insert(edge);
    }

    pub(super) fn remove_input_edge(&mut self, edge: Innovation) {
        self.inputs.remove(&edge);
    }

    pub(super) fn add_output_edge(&mut self, edge: Innovation) {
        self.outputs.insert(edge);
    }

    pub(super) fn remove_output_edge(&mut self, edge: Innovation) {
        self.outputs.remove(&edge);
    }

    pub(super) fn set_activation(&mut self, activation: ActivationType) {
        self.activation = activation;
    }

    /// Returns the node's id.
    pub fn id(&self) -> Innovation {
        self.id
    }

    /// Returns an iterator over the innovation
    /// numbers of the node's incoming edges.
    /// No ordering is guaranteed.
    pub fn input_edges(&self) -> impl Iterator<Item = &Innovation> {
        self.inputs.iter()
    }

    /// Returns an iterator over the innovation
    /// numbers of the node's outgoing edges.
    /// No ordering is guaranteed.
    pub fn output_edges(&self) -> impl Iterator<Item = &Innovation> {
        self.outputs.iter()
    }

    pub fn role(&self) -> NodeRole {
        self.role
    }

    pub fn activation(&self) -> ActivationType {
        self.activation
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut inputs: Vec<_> = self.inputs.iter().collect();
        let mut outputs: Vec<_> = self.outputs.iter().collect();
        inputs.sort_unstable();
        outputs.sort_unstable();
        write!(
            f,
            "{:?}[{:?}, {:?}, IN: {:?}, OUT: {:?}]",
            self.id, self.role, self.activation, inputs, outputs,
        )
    }
}
