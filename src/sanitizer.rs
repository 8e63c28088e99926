//! Normalises model output into canonical Mermaid text.
//!
//! The steps run in order, each only when its trigger is present:
//!
//! 1. [`strip_debug_preamble`] drops everything up to a `MERMAID:`/`RESPONSE:` delimiter.
//! 2. [`strip_fences`] removes markdown code fences.
//! 3. [`locate_declaration`] finds where the diagram starts; with no declaration at all the
//!    result is [`FALLBACK_GRAPH`].
//! 4. The diagram is re-emitted one statement per line, indented by [`INDENT`], with every
//!    node label and edge label quoted exactly once.
//!
//! [`sanitize_graph`] never fails and is idempotent.

use crate::display_width::{preview, truncate};
use crate::graph_ast::{Direction, DiagramKind, Statement};
use crate::graph_parser::{
    classify_statement, drop_unlinked_bare_nodes, parse_declaration, repair_dangling_link,
    split_statements, strip_list_marker,
};

/// Returned when no diagram can be found in the input.
pub const FALLBACK_GRAPH: &str = "graph TD
    A[\"Starting Position\"] --> B[\"Position 1\"]
    A --> C[\"Position 2\"]
    B --> D[\"Submission 1\"]
    C --> E[\"Submission 2\"]";

pub const INDENT: &str = "    ";

/// Markers that separate a debug section from the diagram that follows it.
pub const DEBUG_DELIMITERS: &[&str] = &["MERMAID:", "RESPONSE:"];

pub fn sanitize_graph(text: &str) -> String {
    let text = strip_debug_preamble(text);
    let text = strip_fences(text);
    match locate_declaration(&text) {
        Some(start) => reemit(&text[start..]),
        None => {
            tracing::warn!(reply = %preview(&text), "no diagram declaration found, using fallback chart");
            FALLBACK_GRAPH.to_string()
        }
    }
}

/// True when `text` contains something the sanitizer can treat as a diagram.
pub fn has_declaration(text: &str) -> bool {
    locate_declaration(&strip_fences(strip_debug_preamble(text))).is_some()
}

/// Keeps only what follows the last debug delimiter that has a diagram after it.
///
/// Debug preambles may echo a cut-off copy of the reply, so a declaration before
/// the delimiter never counts. Without any such delimiter the text is unchanged,
/// which leaves a `RESPONSE:` inside a label alone.
pub fn strip_debug_preamble(text: &str) -> &str {
    let cut = DEBUG_DELIMITERS
        .iter()
        .flat_map(|d| text.match_indices(d).map(|(at, found)| at + found.len()))
        .filter(|&end| locate_declaration(&text[end..]).is_some())
        .max();
    match cut {
        Some(end) => &text[end..],
        None => text,
    }
}

pub fn strip_fences(text: &str) -> String {
    let mut out = text.to_string();
    while out.contains("```") {
        out = out.replace("```mermaid", "").replace("```", "");
    }
    out
}

/// Byte offset where the diagram starts: the first line opening with a declaration
/// keyword, or failing that an inline `graph <dir>` / `flowchart <dir>` inside prose.
pub fn locate_declaration(text: &str) -> Option<usize> {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let trimmed = line.trim_start();
        if starts_with_declaration(trimmed) {
            return Some(offset + line.len() - trimmed.len());
        }
        offset += line.len();
    }
    inline_graph_declaration(text)
}

fn starts_with_declaration(line: &str) -> bool {
    let keyword = line
        .split(|c: char| c.is_whitespace() || c == ';')
        .next()
        .unwrap_or("");
    DiagramKind::from_keyword(keyword).is_some()
}

fn inline_graph_declaration(text: &str) -> Option<usize> {
    ["graph", "flowchart"]
        .iter()
        .flat_map(|kw| text.match_indices(kw).map(move |(at, _)| (at, kw.len())))
        .filter(|&(at, len)| {
            let boundary = text[..at]
                .chars()
                .next_back()
                .is_none_or(|c| !c.is_alphanumeric());
            let after = &text[at + len..];
            let token = after.split_whitespace().next().unwrap_or("");
            boundary
                && after.starts_with(char::is_whitespace)
                && Direction::from_token(token.trim_end_matches(';')).is_some()
        })
        .map(|(at, _)| at)
        .min()
}

fn reemit(body: &str) -> String {
    let mut lines = body.lines().map(str::trim).filter(|l| !l.is_empty());
    let Some(first) = lines.next() else {
        return FALLBACK_GRAPH.to_string();
    };
    let head = split_statements(first).into_iter().next().unwrap_or(first);
    let Some((decl, _)) = parse_declaration(head) else {
        return FALLBACK_GRAPH.to_string();
    };
    if decl.kind() != DiagramKind::Flowchart {
        return reemit_verbatim(first, lines);
    }

    let mut seen_header = false;
    let mut statements: Vec<Statement> = Vec::new();
    for segment in std::iter::once(first).chain(lines).flat_map(split_statements) {
        let segment = match parse_declaration(segment) {
            Some((decl, rest)) => {
                if seen_header {
                    tracing::debug!(declaration = %decl, "dropping repeated declaration");
                }
                seen_header = true;
                if rest.is_empty() {
                    continue;
                }
                rest
            }
            None => segment,
        };
        statements.extend(statement_or_repair(segment));
    }
    drop_unlinked_bare_nodes(&mut statements);

    std::iter::once(decl.to_string())
        .chain(statements.iter().map(|stmt| format!("{INDENT}{stmt}")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Diagram kinds other than flowcharts keep their statements as written.
fn reemit_verbatim<'a>(first: &str, rest: impl Iterator<Item = &'a str>) -> String {
    std::iter::once(first.to_string())
        .chain(rest.map(|line| format!("{INDENT}{line}")))
        .collect::<Vec<_>>()
        .join("\n")
}

fn statement_or_repair(segment: &str) -> Option<Statement> {
    match classify_statement(segment) {
        Ok(stmt) => Some(stmt),
        Err(err) => {
            let repaired = repair_statement(segment);
            let line = truncate(&err.line, 60);
            match &repaired {
                Some(stmt) => tracing::debug!(%line, repaired = %stmt, "repaired graph statement"),
                None => tracing::debug!(%line, "dropping non-diagram line"),
            }
            repaired
        }
    }
}

/// Tries each repair in turn: a leading list marker, then a trailing link with no target.
pub fn repair_statement(segment: &str) -> Option<Statement> {
    if let Some(stripped) = strip_list_marker(segment) {
        return classify_statement(stripped)
            .ok()
            .or_else(|| repair_dangling_link(stripped));
    }
    repair_dangling_link(segment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn strip_debug_preamble_cuts_at_delimiter() {
        let text = "DEBUG INFO:\nmeasurables: tall\n\nMERMAID:\ngraph TD\nA-->B";
        assert_eq!(strip_debug_preamble(text), "\ngraph TD\nA-->B");
    }

    #[test]
    fn strip_debug_preamble_leaves_delimiter_inside_label() {
        let text = "graph TD\nA[RESPONSE: fast] --> B";
        assert_eq!(strip_debug_preamble(text), text);
    }

    #[test]
    fn strip_debug_preamble_ignores_echoed_reply() {
        let text = "Response received from API: ```mermaid\ngraph TD\nA-->B[Side Con...\nMERMAID:\ngraph TD\nA-->B";
        assert_eq!(strip_debug_preamble(text), "\ngraph TD\nA-->B");
    }

    #[test]
    fn reemit_drops_unlinked_single_words() {
        let out = sanitize_graph("graph TD\nA[Guard] --> B[Sweep]\n\nEnjoy\nThanks");
        assert_eq!(out, "graph TD\n    A[\"Guard\"] --> B[\"Sweep\"]");
    }

    #[test]
    fn strip_fences_removes_nested_runs() {
        assert_eq!(strip_fences("```mermaid\ngraph TD\n```"), "\ngraph TD\n");
        assert_eq!(strip_fences("``````` x"), "` x");
    }

    #[test]
    fn locate_declaration_prefers_line_start() {
        let text = "Here is the chart\ngraph LR\nA-->B";
        assert_eq!(locate_declaration(text), Some(18));
    }

    #[test]
    fn locate_declaration_inline() {
        let text = "Sure! graph TD A-->B";
        assert_eq!(locate_declaration(text), Some(6));
    }

    #[test]
    fn locate_declaration_ignores_words_containing_keyword() {
        assert_eq!(locate_declaration("see the paragraph TD above"), None);
        assert_eq!(locate_declaration("this graph shows moves"), None);
    }

    #[test]
    fn fallback_is_canonical() {
        assert_eq!(sanitize_graph(FALLBACK_GRAPH), FALLBACK_GRAPH);
    }

    #[test]
    fn reemit_quotes_labels() {
        let out = sanitize_graph("graph LR\nA[Guard] -->|pass| B(Mount)");
        assert_eq!(out, "graph LR\n    A[\"Guard\"] -->|\"pass\"| B(\"Mount\")");
    }

    #[test]
    fn reemit_drops_repeated_declaration() {
        let out = sanitize_graph("graph TD\ngraph LR\nA --> B");
        assert_eq!(out, "graph TD\n    A --> B");
    }

    #[test]
    fn reemit_defaults_missing_direction() {
        assert_eq!(sanitize_graph("graph\nA --> B"), "graph TD\n    A --> B");
        assert_eq!(sanitize_graph("flowchart A --> B"), "flowchart TD\n    A --> B");
        assert_eq!(sanitize_graph("graph;A-->B"), "graph TD\n    A-->B");
    }

    #[test]
    fn reemit_keeps_other_diagram_kinds_verbatim() {
        let out = sanitize_graph("```\nsequenceDiagram\n  Alice->>Bob: Armbar\n```");
        assert_eq!(out, "sequenceDiagram\n    Alice->>Bob: Armbar");
    }

    #[test]
    fn repair_statement_strips_list_markers() {
        let stmt = repair_statement("- A[Guard] --> B").unwrap();
        assert_eq!(stmt.to_string(), "A[\"Guard\"] --> B");
        assert!(repair_statement("- just some prose").is_none());
    }

    #[test]
    fn has_declaration_checks() {
        assert!(has_declaration("```mermaid\ngraph TD\nA-->B\n```"));
        assert!(!has_declaration("1. Underhook\n2. Frame"));
    }
}
