use super::{NNGenome, NodeRole};

use std::fmt;

/// Graphviz DOT rendering of a genome, for external
/// visualization tools.
///
/// Source nodes are ranked first and outputs last.
/// Enabled edges are drawn as arcs labelled with their
/// weight, disabled edges dashed and recurrent ones blue.
///
/// # Examples
/// ```
/// use neatrl_nn::genomics::{DotGraph, GeneticConfig, NNGenome};
///
/// let config = GeneticConfig {
///     initial_connection_density: 1.0,
///     ..GeneticConfig::zero()
/// };
/// let genome = NNGenome::new(&config);
///
/// let dot = DotGraph(&genome).to_string();
/// assert!(dot.contains("0 -> 1"));
/// ```
pub struct DotGraph<'a>(pub &'a NNGenome);

impl fmt::Display for DotGraph<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let genome = self.0;
        writeln!(f, "digraph genome {{")?;
        writeln!(f, "  rankdir=LR;")?;

        for (rank, roles) in [
            ("source", &[NodeRole::Input, NodeRole::Bias][..]),
            ("sink", &[NodeRole::Output][..]),
        ] {
            write!(f, "  {{ rank={};", rank)?;
            for node in genome.nodes().filter(|n| roles.contains(&n.role())) {
                write!(f, " {};", node.id())?;
            }
            writeln!(f, " }}")?;
        }

        for node in genome.nodes() {
            let shape = match node.role() {
                NodeRole::Input => "box",
                NodeRole::Bias => "diamond",
                NodeRole::Hidden => "circle",
                NodeRole::Output => "doublecircle",
            };
            writeln!(
                f,
                "  {} [shape={}, label=\"{}\\n{:?}\"];",
                node.id(),
                shape,
                node.id(),
                node.activation()
            )?;
        }

        for edge in genome.edges() {
            let mut style = String::new();
            if !edge.enabled() {
                style.push_str(", style=dashed");
            }
            if edge.is_recurrent() {
                style.push_str(", color=blue");
            }
            writeln!(
                f,
                "  {} -> {} [label=\"{:.3}\"{}];",
                edge.from(),
                edge.to(),
                edge.weight(),
                style
            )?;
        }

        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomics::{ActivationType, GeneticConfig};

    #[test]
    fn disabled_and_recurrent_edges_are_styled() {
        let config = GeneticConfig {
            bias: true,
            ..GeneticConfig::zero()
        };
        let mut genome = NNGenome::new(&config);
        genome.add_node(3, ActivationType::ReLU).unwrap();
        genome.add_edge(0, 0, 2, 0.5).unwrap().set_enabled(false);
        genome.add_recurrent_edge(5, 2, 2, -1.0).unwrap();

        let dot = genome.to_dot();
        assert!(dot.contains("{ rank=source; 0; 1; }"));
        assert!(dot.contains("{ rank=sink; 2; }"));
        assert!(dot.contains("1 [shape=diamond"));
        assert!(dot.contains("3 [shape=circle, label=\"3\\nReLU\"];"));
        assert!(dot.contains("0 -> 2 [label=\"0.500\", style=dashed];"));
        assert!(dot.contains("2 -> 2 [label=\"-1.000\", color=blue];"));
        assert!(dot.ends_with('}'));
    }
}
