use flowroll::pivot::{MatchSource, chart_examples, resolve_pivot};
use flowroll::sanitize_graph;
use pretty_assertions::assert_eq;

const CHART: &str = "graph LR
    A[\"Closed Guard\"] -->|\"Hip bump sweep\"| B[\"Mount\"]
    A -->|\"Break posture\"| C[\"Triangle\"]
    B -->|\"Mount to armbar\"| D[\"Armbar\"]
    C --> D
    E[\"Guard Pull\"] --> A";

// =============================================================================
// Match order
// =============================================================================

#[test]
fn nodes_are_checked_before_edges() {
    // "armbar" is a node label and also part of an edge label
    let found = resolve_pivot(CHART, "armbar").unwrap();
    assert_eq!(found.source, MatchSource::Node);
    assert_eq!(found.label, "Armbar");
    assert_eq!(found.node_id, "D");
}

#[test]
fn first_node_in_document_order_wins() {
    let found = resolve_pivot(CHART, "guard").unwrap();
    assert_eq!(found.label, "Closed Guard");
}

#[test]
fn edge_label_resolves_to_target() {
    let found = resolve_pivot(CHART, "hip BUMP").unwrap();
    assert_eq!(found.label, "Mount");
    assert_eq!(found.source, MatchSource::EdgeLabel("Hip bump sweep".into()));
}

#[test]
fn query_is_trimmed() {
    assert_eq!(resolve_pivot(CHART, "  triangle \n").unwrap().label, "Triangle");
}

#[test]
fn miss_returns_none() {
    assert_eq!(resolve_pivot(CHART, "heel hook"), None);
    assert_eq!(resolve_pivot(CHART, ""), None);
}

// =============================================================================
// Context labels
// =============================================================================

#[test]
fn context_covers_inbound_and_outbound_neighbours() {
    let found = resolve_pivot(CHART, "closed guard").unwrap();
    assert_eq!(found.context_labels, vec!["Mount", "Triangle", "Guard Pull"]);
}

#[test]
fn context_is_deduplicated() {
    let chart = "graph TD\n    A[Mount] --> B[Armbar]\n    A -->|again| B\n    B --> A";
    let found = resolve_pivot(chart, "armbar").unwrap();
    assert_eq!(found.context_labels, vec!["Mount"]);
}

// =============================================================================
// Tolerance
// =============================================================================

#[test]
fn unsanitized_text_still_resolves() {
    let raw = "graph TD\nA[Guard --> B(Sweep\nB -->|to mount C\nC --> Z";
    assert_eq!(resolve_pivot(raw, "sweep").unwrap().label, "Sweep");
    assert_eq!(resolve_pivot(raw, "to mount").unwrap().label, "C");
    assert_eq!(resolve_pivot(raw, "z").unwrap().label, "Z");
}

#[test]
fn sanitized_and_raw_agree() {
    let raw = "```mermaid\ngraph TD\nA[Side Control] -->|Apply pressure| B[Mount]\n```";
    let sanitized = sanitize_graph(raw);
    assert_eq!(resolve_pivot(raw, "pressure"), resolve_pivot(&sanitized, "pressure"));
}

#[test]
fn examples_exclude_current_position() {
    assert_eq!(
        chart_examples(CHART, "Closed Guard", 3),
        vec!["Mount", "Triangle", "Armbar"]
    );
}
