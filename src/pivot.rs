use crate::graph_ast::GraphDiagram;
use crate::graph_parser::parse_graph;

/// Which part of the chart the query was found in.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchSource {
    Node,
    /// The query matched this edge label; the pivot is the edge's target.
    EdgeLabel(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PivotMatch {
    /// Display label of the node the next chart should start from.
    pub label: String,
    pub node_id: String,
    /// Labels of nodes one hop away from the pivot, in either direction.
    pub context_labels: Vec<String>,
    pub source: MatchSource,
}

/// Finds the chart element a user's "next move" text refers to.
///
/// Nodes are checked before edge labels, each in document order, with a
/// case-insensitive substring match. The first hit wins. `None` means the move
/// is not in the chart and the caller should keep its current state.
pub fn resolve_pivot(text: &str, query: &str) -> Option<PivotMatch> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return None;
    }
    let diagram = parse_graph(text);

    if let Some(node) = diagram
        .nodes
        .iter()
        .find(|n| n.label.to_lowercase().contains(&query))
    {
        tracing::debug!(node = %node.id, label = %node.label, "move matched a node");
        return Some(PivotMatch {
            label: node.label.clone(),
            node_id: node.id.clone(),
            context_labels: context_labels(&diagram, &node.id),
            source: MatchSource::Node,
        });
    }

    let edge = diagram.edges.iter().find(|e| {
        e.label
            .as_deref()
            .is_some_and(|l| l.to_lowercase().contains(&query))
    })?;
    let edge_label = edge.label.clone().unwrap_or_default();
    tracing::debug!(edge = %edge_label, target = %edge.to, "move matched an edge label");
    Some(PivotMatch {
        label: diagram.label_of(&edge.to).to_string(),
        node_id: edge.to.clone(),
        context_labels: context_labels(&diagram, &edge.to),
        source: MatchSource::EdgeLabel(edge_label),
    })
}

/// Labels of every node with an edge into or out of `id`, first seen first.
pub fn context_labels(diagram: &GraphDiagram, id: &str) -> Vec<String> {
    let own = diagram.label_of(id);
    let mut labels: Vec<String> = Vec::new();
    for edge in &diagram.edges {
        let neighbour = if edge.from == id {
            &edge.to
        } else if edge.to == id {
            &edge.from
        } else {
            continue;
        };
        let label = diagram.label_of(neighbour);
        if label != own && !labels.iter().any(|l| l == label) {
            labels.push(label.to_string());
        }
    }
    labels
}

/// Up to `limit` distinct labelled nodes to suggest as moves, skipping `exclude`.
pub fn chart_examples(text: &str, exclude: &str, limit: usize) -> Vec<String> {
    let diagram = parse_graph(text);
    let mut examples: Vec<String> = Vec::new();
    for node in diagram.nodes.iter().filter(|n| n.explicit) {
        if examples.len() >= limit {
            break;
        }
        if node.label.eq_ignore_ascii_case(exclude.trim()) || examples.contains(&node.label) {
            continue;
        }
        examples.push(node.label.clone());
    }
    examples
}
