//! Graphviz DOT rendering of a fitted decision tree.

use std::fmt::Write;

use crate::node::{Node, SplitRule};
use crate::tree::DecisionTree;

const CLASS_ZERO_FILL: &str = "#e5f5e0";
const CLASS_ONE_FILL: &str = "#ffe6e6";

impl DecisionTree {
    /// Render the tree as a Graphviz DOT digraph.
    ///
    /// Leaves are coloured by predicted class and carry their training
    /// sample count; interior nodes show the feature name (`Feat {i}` when
    /// no name is available), the split condition and the sample count.
    /// Left edges are labelled `True`, right edges `False`.
    #[must_use]
    pub fn to_dot(&self, feature_names: &[String]) -> String {
        let mut out = String::from("digraph DecisionTree {\n");
        out.push_str("  node [shape=box, fontname=\"Arial\"];\n");
        let mut next_id = 0usize;
        write_node(self, 0, &mut out, &mut next_id, feature_names);
        out.push_str("}\n");
        out
    }
}

/// Emit `node_idx` and its subtree, returning the DOT id assigned to it.
fn write_node(
    tree: &DecisionTree,
    node_idx: usize,
    out: &mut String,
    next_id: &mut usize,
    feature_names: &[String],
) -> usize {
    let my_id = *next_id;
    *next_id += 1;

    match &tree.nodes[node_idx] {
        Node::Leaf {
            prediction,
            n_samples,
        } => {
            let fill = if *prediction == 0 {
                CLASS_ZERO_FILL
            } else {
                CLASS_ONE_FILL
            };
            let _ = writeln!(
                out,
                "  {my_id} [label=\"Class {prediction}\\n(n={n_samples})\", style=filled, fillcolor=\"{fill}\"];"
            );
        }
        Node::Split {
            feature,
            rule,
            left,
            right,
            n_samples,
        } => {
            let name = match feature_names.get(feature.index()) {
                Some(name) => name.clone(),
                None => format!("Feat {}", feature.index()),
            };
            let condition = match rule {
                SplitRule::Threshold(t) => format!("<= {t:.3}"),
                SplitRule::Categories(left_categories) => {
                    let ids: Vec<String> =
                        left_categories.iter().map(ToString::to_string).collect();
                    format!("in {{{}}}", ids.join(","))
                }
            };
            let _ = writeln!(
                out,
                "  {my_id} [label=\"{name}\\n{condition}\\n(n={n_samples})\"];"
            );

            let left_id = write_node(tree, left.index(), out, next_id, feature_names);
            let _ = writeln!(out, "  {my_id} -> {left_id} [label=\"True\", fontsize=10];");

            let right_id = write_node(tree, right.index(), out, next_id, feature_names);
            let _ = writeln!(out, "  {my_id} -> {right_id} [label=\"False\", fontsize=10];");
        }
    }

    my_id
}
