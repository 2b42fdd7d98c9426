use crate::Innovation;

use thiserror::Error;

/// An error type indicating that a mutation
/// operator found nothing to act on.
///
/// These are expected during evolution and are
/// skipped by [`NNGenome::mutate`].
///
/// [`NNGenome::mutate`]: crate::genomics::NNGenome
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidMutationError {
    /// Every legal pair of nodes is already connected.
    #[error("edge addition on fully-connected genome")]
    GenomeFullyConnected,
    /// No pair was accepted within the attempt limit.
    #[error("no viable source-target pair found for edge addition")]
    NoViablePair,
    /// There is no enabled, non-recurrent edge to split.
    #[error("node addition on genome without splittable edges")]
    NoSplittableEdge,
    /// There is no hidden node to act on.
    #[error("node mutation on genome without hidden nodes")]
    NoHiddenNode,
    /// The genome has no edges.
    #[error("edge mutation on genome without edges")]
    NoEdges,
    /// The mutation produced an edge the genome rejected.
    #[error(transparent)]
    InvalidEdge(#[from] EdgeValidityError),
}

/// An error type indicating the edge being
/// added to a genome is invalid.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EdgeValidityError {
    #[error("duplicate edge insertion with id {0}")]
    DuplicateEdgeID(Innovation),
    #[error("edge insertion between nonexistent endpoint(s) {0} -> {1}")]
    NonexistentEndpoints(Innovation, Innovation),
    #[error("edge insertion with id {id} shadows edge with endpoints {from} -> {to}")]
    DuplicateEndpoints {
        id: Innovation,
        from: Innovation,
        to: Innovation,
    },
    #[error("edge insertion targets source node {0}")]
    SourceTarget(Innovation),
    #[error("self-loop on node {0} must be recurrent")]
    UntaggedSelfLoop(Innovation),
    #[error("edge {0} -> {1} closes a cycle and must be recurrent")]
    UntaggedCycle(Innovation, Innovation),
    #[error("no edge with id {0} in genome")]
    AbsentEdge(Innovation),
}

/// An error type indicating the node being
/// added to or removed from a genome is invalid.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NodeValidityError {
    #[error("duplicate node insertion with id {0}")]
    DuplicateNodeID(Innovation),
    #[error("no node with id {0} in genome")]
    AbsentNode(Innovation),
    #[error("node {0} is not a hidden node")]
    NotHidden(Innovation),
}
