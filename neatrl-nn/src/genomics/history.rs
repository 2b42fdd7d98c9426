use crate::genomics::GeneticConfig;
use crate::Innovation;

use ahash::RandomState;
use neatrl::InnovationHistory;
use serde::{Deserialize, Serialize};

use std::collections::hash_map::{Entry, HashMap};

/// A `History` keeps track of edge and node innovations in a
/// population, in order to make sure identical mutations
/// are assigned the same innovation numbers.
///
/// For edge innovations the source and target nodes are used to
/// identify identical mutations. For node innovations the split
/// edge is used, and the innovation numbers for the corresponding
/// incoming edge, new node, and outgoing edge are recorded,
/// in that order.
///
/// Edge innovation numbers are dense: every number below
/// [`next_edge_innovation`] names exactly one node pair.
///
/// [`next_edge_innovation`]: History::next_edge_innovation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "HistoryRecord", into = "HistoryRecord")]
pub struct History {
    next_node_innovation: Innovation,
    edge_innovations: HashMap<(Innovation, Innovation), Innovation, RandomState>,
    edge_endpoints: Vec<(Innovation, Innovation)>,
    node_innovations: HashMap<Innovation, (Innovation, Innovation, Innovation), RandomState>,
}

/// Serialized form of a [`History`]. The pair-keyed
/// lookup table is rebuilt from the endpoint list.
#[derive(Serialize, Deserialize)]
struct HistoryRecord {
    next_node_innovation: Innovation,
    edge_endpoints: Vec<(Innovation, Innovation)>,
    node_innovations: Vec<(Innovation, (Innovation, Innovation, Innovation))>,
}

impl From<HistoryRecord> for History {
    fn from(record: HistoryRecord) -> History {
        History {
            next_node_innovation: record.next_node_innovation,
            edge_innovations: record
                .edge_endpoints
                .iter()
                .enumerate()
                .map(|(innovation, endpoints)| (*endpoints, innovation))
                .collect(),
            edge_endpoints: record.edge_endpoints,
            node_innovations: record.node_innovations.into_iter().collect(),
        }
    }
}

impl From<History> for HistoryRecord {
    fn from(history: History) -> HistoryRecord {
        let mut node_innovations: Vec<_> = history.node_innovations.into_iter().collect();
        node_innovations.sort_unstable();
        HistoryRecord {
            next_node_innovation: history.next_node_innovation,
            edge_endpoints: history.edge_endpoints,
            node_innovations,
        }
    }
}

impl InnovationHistory for History {
    type Config = GeneticConfig;

    fn new(config: &GeneticConfig) -> History {
        Self::new(config)
    }
}

impl History {
    /// Creates a new History using the specified configuration.
    ///
    /// Source nodes (inputs, then the bias node if any) are
    /// numbered `0..S` and outputs `S..S + O`. Initial edges
    /// are given the innovation number `o + s ⨯ O`, where `s`
    /// is their source node and `o` the index of their output.
    /// Thus, the first fresh edge innovation number is `S ⨯ O`
    /// and the first fresh node is `S + O`.
    ///
    /// # Examples
    /// ```
    /// use neatrl_nn::genomics::{GeneticConfig, History};
    /// use std::num::NonZeroUsize;
    ///
    /// let config = GeneticConfig {
    ///     input_count: NonZeroUsize::new(2).unwrap(),
    ///     output_count: NonZeroUsize::new(3).unwrap(),
    ///     bias: true,
    ///     ..GeneticConfig::zero()
    /// };
    /// let history = History::new(&config);
    ///
    /// assert_eq!(history.next_edge_innovation(), 3 * 3);
    /// assert_eq!(history.next_node_innovation(), 3 + 3);
    /// // Bias node 2 to output index 1 (node 4).
    /// assert_eq!(history.edge_innovation(2, 4), Some(1 + 2 * 3));
    /// ```
    pub fn new(config: &GeneticConfig) -> History {
        let sources = config.source_count();
        let outputs = config.output_count.get();
        let edge_endpoints: Vec<_> = (0..sources)
            .flat_map(|s| (0..outputs).map(move |o| (s, sources + o)))
            .collect();
        History {
            next_node_innovation: sources + outputs,
            edge_innovations: edge_endpoints
                .iter()
                .enumerate()
                .map(|(innovation, endpoints)| (*endpoints, innovation))
                .collect(),
            edge_endpoints,
            node_innovations: HashMap::default(),
        }
    }

    /// Returns the innovation number of the edge between
    /// `from` and `to`, minting a new one if the pair
    /// has never been connected in this run.
    pub fn register_edge(&mut self, from: Innovation, to: Innovation) -> Innovation {
        let next = self.edge_endpoints.len();
        match self.edge_innovations.entry((from, to)) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => {
                entry.insert(next);
                self.edge_endpoints.push((from, to));
                next
            }
        }
    }

    /// Returns the innovation number previously
    /// assigned to the edge between `from` and `to`.
    pub fn edge_innovation(&self, from: Innovation, to: Innovation) -> Option<Innovation> {
        self.edge_innovations.get(&(from, to)).copied()
    }

    /// Returns the endpoints of the edge with the given
    /// innovation number, if it has been assigned.
    pub fn edge_endpoints(&self, innovation: Innovation) -> Option<(Innovation, Innovation)> {
        self.edge_endpoints.get(innovation).copied()
    }

    /// Returns the `(incoming edge, new node, outgoing edge)`
    /// triplet recorded for a split of `split_edge`.
    pub fn split_record(&self, split_edge: Innovation) -> Option<(Innovation, Innovation, Innovation)> {
        self.node_innovations.get(&split_edge).copied()
    }

    /// Mints a fresh node splitting the edge `from -> to`
    /// with innovation number `split_edge`, and returns the
    /// `(incoming edge, new node, outgoing edge)` triplet.
    ///
    /// The first triplet minted for an edge is the one
    /// returned by later calls to [`split_record`]; genomes
    /// splitting the same edge twice get fresh numbers
    /// without overwriting it.
    ///
    /// [`split_record`]: History::split_record
    pub fn mint_split(
        &mut self,
        split_edge: Innovation,
        from: Innovation,
        to: Innovation,
    ) -> (Innovation, Innovation, Innovation) {
        let node = self.next_node_innovation;
        self.next_node_innovation += 1;
        let record = (
            self.register_edge(from, node),
            node,
            self.register_edge(node, to),
        );
        self.node_innovations.entry(split_edge).or_insert(record);
        record
    }

    /// Returns the next edge innovation number to be minted.
    pub fn next_edge_innovation(&self) -> Innovation {
        self.edge_endpoints.len()
    }

    /// Returns the next node innovation number to be minted.
    pub fn next_node_innovation(&self) -> Innovation {
        self.next_node_innovation
    }

    /// Returns the highest edge innovation number generated.
    ///
    /// # Examples
    /// ```
    /// use neatrl_nn::genomics::{GeneticConfig, History};
    ///
    /// let history = History::new(&GeneticConfig::zero());
    ///
    /// assert_eq!(history.max_edge_innovation(), 0);
    /// ```
    pub fn max_edge_innovation(&self) -> Innovation {
        self.edge_endpoints.len() - 1
    }

    /// Returns the highest node innovation number generated.
    ///
    /// # Examples
    /// ```
    /// use neatrl_nn::genomics::{GeneticConfig, History};
    ///
    /// let history = History::new(&GeneticConfig::zero());
    ///
    /// assert_eq!(history.max_node_innovation(), 1);
    /// ```
    pub fn max_node_innovation(&self) -> Innovation {
        self.next_node_innovation - 1
    }

    /// Returns an iterator over the complete record of
    /// edge innovations, in the format
    /// `((source node, target node), edge innovation)`,
    /// ordered by innovation number.
    pub fn edge_innovation_history(
        &self,
    ) -> impl Iterator<Item = ((Innovation, Innovation), Innovation)> + '_ {
        self.edge_endpoints
            .iter()
            .enumerate()
            .map(|(innovation, endpoints)| (*endpoints, innovation))
    }

    /// Returns an iterator over the complete record of
    /// node innovations, in the format
    /// `(split edge, (incoming edge, new node, outgoing edge))`.
    /// No ordering is guaranteed.
    ///
    /// # Examples
    /// ```
    /// use neatrl_nn::genomics::{GeneticConfig, History, NNGenome};
    ///
    /// let config = GeneticConfig {
    ///     initial_connection_density: 1.0,
    ///     ..GeneticConfig::zero()
    /// };
    /// let mut history = History::new(&config);
    ///
    /// // Add mutations to the history through genome mutation.
    /// NNGenome::new(&config).mutate_add_node(&mut history, &config).unwrap();
    ///
    /// for (split_edge, (in_edge, new_node, out_edge)) in history.node_innovation_history() {
    ///     println!("edge {} split into edges {} and {} with node {} in between",
    ///         split_edge, in_edge, out_edge, new_node);
    /// }
    /// ```
    pub fn node_innovation_history(
        &self,
    ) -> impl Iterator<Item = (&Innovation, &(Innovation, Innovation, Innovation))> {
        self.node_innovations.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::num::NonZeroUsize;

    fn config() -> GeneticConfig {
        GeneticConfig {
            input_count: NonZeroUsize::new(2).unwrap(),
            output_count: NonZeroUsize::new(2).unwrap(),
            ..GeneticConfig::zero()
        }
    }

    #[test]
    fn initial_edges_are_preallocated() {
        let history = History::new(&config());
        let pairs: Vec<_> = history.edge_innovation_history().collect();
        assert_eq!(
            pairs,
            [((0, 2), 0), ((0, 3), 1), ((1, 2), 2), ((1, 3), 3)]
        );
        assert_eq!(history.next_node_innovation(), 4);
    }

    #[test]
    fn same_pair_gets_same_innovation() {
        let mut history = History::new(&config());
        let first = history.register_edge(3, 2);
        let second = history.register_edge(3, 3);
        assert_eq!(first, 4);
        assert_eq!(second, 5);
        assert_eq!(history.register_edge(3, 2), first);
        assert_eq!(history.register_edge(0, 2), 0);
        assert_eq!(history.edge_endpoints(5), Some((3, 3)));
        assert_eq!(history.max_edge_innovation(), 5);
    }

    #[test]
    fn first_split_record_is_kept() {
        let mut history = History::new(&config());
        let first = history.mint_split(1, 0, 3);
        assert_eq!(first, (4, 4, 5));
        assert_eq!(history.split_record(1), Some(first));

        let again = history.mint_split(1, 0, 3);
        assert_eq!(again, (6, 5, 7));
        assert_eq!(history.split_record(1), Some(first));
        assert_eq!(history.split_record(0), None);
    }

    #[test]
    fn serde_rebuilds_pair_lookup() {
        let mut history = History::new(&config());
        history.mint_split(2, 1, 2);
        history.register_edge(4, 3);

        let json = serde_json::to_string(&history).unwrap();
        let restored: History = serde_json::from_str(&json).unwrap();

        assert_eq!(restored, history);
        assert_eq!(restored.edge_innovation(4, 3), history.edge_innovation(4, 3));
    }
}
