use std::collections::HashSet;

use winnow::prelude::*;
use winnow::ascii::{space0, space1};
use winnow::combinator::{alt, eof, opt, preceded, repeat, separated, terminated};
use winnow::error::ParserError;
use winnow::token::{take_until, take_while};

use crate::display_width::truncate;
use crate::error::MalformedStatement;
use crate::graph_ast::*;

const DIRECTIVE_KEYWORDS: &[&str] = &[
    "end",
    "style",
    "classDef",
    "class",
    "linkStyle",
    "click",
    "direction",
];

/// Arrow heads that may not appear inside an unquoted node label.
const LINK_MARKERS: &[&str] = &["-->", "---", "==>", "===", "-.-"];

/// Reads every statement it can out of `input`. Unreadable lines are skipped, never fatal.
pub fn parse_graph(input: &str) -> GraphDiagram {
    let mut diagram = GraphDiagram {
        declaration: None,
        nodes: Vec::new(),
        edges: Vec::new(),
        statements: Vec::new(),
    };

    for line in input.lines() {
        for segment in split_statements(line) {
            let segment = match parse_declaration(segment) {
                Some((decl, rest)) => {
                    if diagram.declaration.is_none() {
                        diagram.declaration = Some(decl);
                    }
                    if rest.is_empty() {
                        continue;
                    }
                    rest
                }
                None => segment,
            };
            match classify_statement(segment) {
                Ok(stmt) => diagram.statements.push(stmt),
                Err(err) => {
                    tracing::debug!(line = %truncate(&err.line, 60), "skipping unreadable graph statement");
                }
            }
        }
    }

    drop_unlinked_bare_nodes(&mut diagram.statements);
    for stmt in &diagram.statements {
        collect_statement(stmt, &mut diagram.nodes, &mut diagram.edges);
    }
    diagram
}

/// Removes lone bare ids that no edge mentions, such as a trailing "Thanks" or "Enjoy".
/// A node with a label or a class is always kept.
pub(crate) fn drop_unlinked_bare_nodes(statements: &mut Vec<Statement>) {
    let linked: HashSet<String> = statements
        .iter()
        .filter_map(|stmt| match stmt {
            Statement::Edge(chain) => Some(chain),
            _ => None,
        })
        .flat_map(|chain| {
            chain
                .start
                .iter()
                .chain(chain.hops.iter().flat_map(|hop| hop.targets.iter()))
        })
        .map(|node| node.id.clone())
        .collect();

    statements.retain(|stmt| match stmt {
        Statement::Node(node)
            if node.label.is_none() && node.class.is_none() && !linked.contains(&node.id) =>
        {
            tracing::debug!(word = %node.id, "dropping unlinked bare word");
            false
        }
        _ => true,
    });
}

/// Splits a source line on `;` separators that sit outside quotes, brackets and pipes.
pub fn split_statements(line: &str) -> Vec<&str> {
    let line = line.trim();
    if line.is_empty() {
        return Vec::new();
    }
    if line.starts_with("%%") {
        return vec![line];
    }

    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut in_quote = false;
    let mut in_pipe = false;
    let mut start = 0;
    for (i, c) in line.char_indices() {
        match c {
            '"' => in_quote = !in_quote,
            '[' | '(' | '{' if !in_quote => depth += 1,
            ']' | ')' | '}' if !in_quote => depth = depth.saturating_sub(1),
            '|' if !in_quote && depth == 0 => in_pipe = !in_pipe,
            ';' if !in_quote && depth == 0 && !in_pipe => {
                segments.push(&line[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    segments.push(&line[start..]);
    segments
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Recognises a diagram declaration. Returns it with whatever statement text trails it
/// on the same line. A graph declaration with a missing or unknown direction reads as `TD`.
pub fn parse_declaration(segment: &str) -> Option<(Declaration, &str)> {
    let segment = segment.trim();
    let keyword_end = segment.find(char::is_whitespace).unwrap_or(segment.len());
    let keyword = &segment[..keyword_end];
    let kind = DiagramKind::from_keyword(keyword)?;
    if kind != DiagramKind::Flowchart {
        let decl = Declaration::Other {
            kind,
            header: segment.to_string(),
        };
        return Some((decl, ""));
    }

    let flowchart = keyword == "flowchart";
    let rest = segment[keyword_end..].trim_start();
    let token_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
    match Direction::from_token(&rest[..token_end]) {
        Some(direction) => Some((
            Declaration::Graph {
                flowchart,
                direction,
            },
            rest[token_end..].trim_start(),
        )),
        None => Some((
            Declaration::Graph {
                flowchart,
                direction: Direction::TopDown,
            },
            rest,
        )),
    }
}

pub(crate) fn classify_statement(segment: &str) -> Result<Statement, MalformedStatement> {
    let segment = segment.trim();
    let mut input = segment;
    statement(&mut input).map_err(|_| MalformedStatement {
        line: segment.to_string(),
    })
}

/// Strips a leading list marker (`- `, `* `, `• `, `1. `, `2) `) some models put before statements.
pub(crate) fn strip_list_marker(segment: &str) -> Option<&str> {
    let trimmed = segment.trim_start();
    let rest = match trimmed.strip_prefix(['-', '*', '•']) {
        Some(rest) => rest,
        None => {
            let digits = trimmed.len()
                - trimmed
                    .trim_start_matches(|c: char| c.is_ascii_digit())
                    .len();
            if digits == 0 {
                return None;
            }
            trimmed[digits..].strip_prefix(['.', ')'])?
        }
    };
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(rest.trim_start())
}

/// Keeps the readable part of a statement whose last link has no target: `A[Guard] -->|pass|`.
pub(crate) fn repair_dangling_link(segment: &str) -> Option<Statement> {
    let mut input = segment.trim();
    let start = node_group.parse_next(&mut input).ok()?;
    let hops: Vec<Hop> = repeat(0.., hop).parse_next(&mut input).ok()?;
    (link, eof).parse_next(&mut input).ok()?;

    if !hops.is_empty() {
        return Some(Statement::Edge(EdgeChain { start, hops }));
    }
    match <[NodeRef; 1]>::try_from(start) {
        Ok([node]) => Some(Statement::Node(node)),
        Err(_) => None,
    }
}

fn collect_statement(stmt: &Statement, nodes: &mut Vec<NodeDecl>, edges: &mut Vec<Edge>) {
    match stmt {
        Statement::Node(node) => add_node(nodes, node),
        Statement::Edge(chain) => {
            for node in &chain.start {
                add_node(nodes, node);
            }
            let mut sources = &chain.start;
            for hop in &chain.hops {
                for node in &hop.targets {
                    add_node(nodes, node);
                }
                for from in sources {
                    for to in &hop.targets {
                        edges.push(Edge {
                            from: from.id.clone(),
                            to: to.id.clone(),
                            edge_type: hop.link.edge_type,
                            label: hop.link.label.clone(),
                        });
                    }
                }
                sources = &hop.targets;
            }
        }
        Statement::Declaration(_) | Statement::Subgraph { .. } | Statement::Directive(_) => {}
    }
}

/// First labelled definition wins; a bare reference never shadows a later label.
fn add_node(nodes: &mut Vec<NodeDecl>, node: &NodeRef) {
    match nodes.iter_mut().find(|n| n.id == node.id) {
        Some(existing) => {
            if !existing.explicit {
                if let Some(label) = &node.label {
                    existing.label = label.clone();
                    existing.explicit = true;
                }
            }
        }
        None => nodes.push(NodeDecl {
            id: node.id.clone(),
            label: node.display_label().to_string(),
            explicit: node.label.is_some(),
        }),
    }
}

fn statement(input: &mut &str) -> winnow::Result<Statement> {
    alt((
        directive,
        subgraph_header,
        terminated(edge_chain, (space0, eof)).map(Statement::Edge),
        terminated(node_ref, (space0, eof)).map(Statement::Node),
    ))
    .parse_next(input)
}

fn directive(input: &mut &str) -> winnow::Result<Statement> {
    let full: &str = *input;
    let line = full.trim();
    let keyword = line.split_whitespace().next().unwrap_or("");
    if line.starts_with("%%") || DIRECTIVE_KEYWORDS.contains(&keyword) {
        *input = &full[full.len()..];
        Ok(Statement::Directive(line.to_string()))
    } else {
        Err(ParserError::from_input(input))
    }
}

fn subgraph_header(input: &mut &str) -> winnow::Result<Statement> {
    "subgraph".parse_next(input)?;
    space1.parse_next(input)?;
    let full: &str = *input;
    let rest = full.trim();
    *input = &full[full.len()..];

    match titled_subgraph.parse(rest) {
        Ok((id, title)) if !title.is_empty() => Ok(Statement::Subgraph {
            header: id.to_string(),
            title: Some(title),
        }),
        Ok((id, _)) => Ok(Statement::Subgraph {
            header: id.to_string(),
            title: None,
        }),
        Err(_) => Ok(Statement::Subgraph {
            header: rest.to_string(),
            title: None,
        }),
    }
}

fn titled_subgraph<'s>(input: &mut &'s str) -> winnow::Result<(&'s str, String)> {
    let id = identifier.parse_next(input)?;
    space0.parse_next(input)?;
    let title = preceded('[', label_body("[", "]")).parse_next(input)?;
    space0.parse_next(input)?;
    Ok((id, title))
}

fn identifier<'s>(input: &mut &'s str) -> winnow::Result<&'s str> {
    take_while(1.., |c: char| c.is_alphanumeric() || c == '_').parse_next(input)
}

fn node_ref(input: &mut &str) -> winnow::Result<NodeRef> {
    let id = identifier.parse_next(input)?;
    let shaped = opt(preceded(space0, shape_label)).parse_next(input)?;
    let class = opt(preceded(":::", identifier)).parse_next(input)?;
    let (shape, label) = match shaped {
        Some((shape, label)) if !label.is_empty() => (shape, Some(label)),
        _ => (NodeShape::Box, None),
    };
    Ok(NodeRef {
        id: id.to_string(),
        label,
        shape,
        class: class.map(str::to_string),
    })
}

fn node_group(input: &mut &str) -> winnow::Result<Vec<NodeRef>> {
    separated(1.., node_ref, (space0, '&', space0)).parse_next(input)
}

fn shape_label(input: &mut &str) -> winnow::Result<(NodeShape, String)> {
    alt((
        preceded("((", label_body("((", "))")).map(|l| (NodeShape::Circle, l)),
        preceded('(', label_body("(", ")")).map(|l| (NodeShape::Round, l)),
        preceded('{', label_body("{", "}")).map(|l| (NodeShape::Diamond, l)),
        preceded('[', label_body("[", "]")).map(|l| (NodeShape::Box, l)),
    ))
    .parse_next(input)
}

/// Reads label text up to `close`, quoted or not. A missing closer ends the label
/// at the next arrow or at the end of the statement.
fn label_body(
    open: &'static str,
    close: &'static str,
) -> impl FnMut(&mut &str) -> winnow::Result<String> {
    move |input: &mut &str| {
        let full: &str = *input;
        let text = full.trim_start_matches(' ');
        let skipped = full.len() - text.len();
        let (label, used) = match text.strip_prefix('"') {
            Some(quoted) => {
                let (label, used) = quoted_until(quoted, close)
                    .unwrap_or_else(|| bare_until(quoted, open, close));
                (label, used + 1)
            }
            None => bare_until(text, open, close),
        };
        *input = &full[skipped + used..];
        Ok(normalize_label(label))
    }
}

fn pipe_label(input: &mut &str) -> winnow::Result<String> {
    '|'.parse_next(input)?;
    let full: &str = *input;
    let text = full.trim_start_matches(' ');
    let skipped = full.len() - text.len();

    if let Some(quoted) = text.strip_prefix('"') {
        if let Some((label, used)) = quoted_until(quoted, "|") {
            *input = &full[skipped + 1 + used..];
            return Ok(normalize_label(label));
        }
    }
    if let Some(end) = text.find('|') {
        *input = &full[skipped + end + 1..];
        return Ok(normalize_label(&text[..end]));
    }
    // unterminated: the label runs up to the node group that ends the statement
    match unterminated_label_end(text) {
        Some(end) => {
            *input = &full[skipped + end..];
            Ok(normalize_label(&text[..end]))
        }
        None => Err(ParserError::from_input(input)),
    }
}

fn unterminated_label_end(text: &str) -> Option<usize> {
    let mut prev_space = false;
    for (i, c) in text.char_indices() {
        if prev_space && !c.is_whitespace() && (node_group, space0).parse(&text[i..]).is_ok() {
            return Some(i);
        }
        prev_space = c.is_whitespace();
    }
    None
}

/// Finds the quote that closes a quoted label: a `"` followed (after spaces) by `close`.
fn quoted_until<'s>(text: &'s str, close: &str) -> Option<(&'s str, usize)> {
    text.match_indices('"').find_map(|(idx, _)| {
        let after = &text[idx + 1..];
        let trimmed = after.trim_start_matches(' ');
        trimmed.starts_with(close).then(|| {
            let used = idx + 1 + (after.len() - trimmed.len()) + close.len();
            (&text[..idx], used)
        })
    })
}

fn bare_until<'s>(text: &'s str, open: &str, close: &str) -> (&'s str, usize) {
    let closing = find_closer(text, open, close);
    let arrow = LINK_MARKERS.iter().filter_map(|m| text.find(m)).min();
    match (closing, arrow) {
        (Some(end), Some(arrow)) if arrow < end => cut_before(text, arrow),
        (Some(end), _) => (&text[..end], end + close.len()),
        (None, Some(arrow)) => cut_before(text, arrow),
        (None, None) => (text, text.len()),
    }
}

/// Leaves the whitespace before an arrow for the link parser to see.
fn cut_before(text: &str, arrow: usize) -> (&str, usize) {
    let end = text[..arrow].trim_end().len();
    (&text[..end], end)
}

fn find_closer(text: &str, open: &str, close: &str) -> Option<usize> {
    let mut open_chars = open.chars();
    let mut close_chars = close.chars();
    match (open_chars.next(), open_chars.next(), close_chars.next(), close_chars.next()) {
        (Some(o), None, Some(c), None) => {
            let mut depth = 0usize;
            for (i, ch) in text.char_indices() {
                if ch == o {
                    depth += 1;
                } else if ch == c {
                    if depth == 0 {
                        return Some(i);
                    }
                    depth -= 1;
                }
            }
            None
        }
        _ => text.find(close),
    }
}

/// Trims, drops stray surrounding quotes and turns inner double quotes into single ones.
pub fn normalize_label(raw: &str) -> String {
    raw.trim().trim_matches('"').replace('"', "'").trim().to_string()
}

fn edge_type(input: &mut &str) -> winnow::Result<EdgeType> {
    alt((
        "-.->".value(EdgeType::DottedArrow),
        "-.-".value(EdgeType::DottedLink),
        "===>".value(EdgeType::ThickArrow),
        "==>".value(EdgeType::ThickArrow),
        "===".value(EdgeType::ThickLink),
        "--->".value(EdgeType::Arrow),
        "-->".value(EdgeType::Arrow),
        "---".value(EdgeType::OpenLink),
    ))
    .parse_next(input)
}

fn link(input: &mut &str) -> winnow::Result<Link> {
    let before = space0.parse_next(input)?;
    let (edge_type, label) = alt((piped_link, text_link)).parse_next(input)?;
    let after = space0.parse_next(input)?;
    Ok(Link {
        edge_type,
        label,
        spaced_before: !before.is_empty(),
        spaced_after: !after.is_empty(),
    })
}

fn piped_link(input: &mut &str) -> winnow::Result<(EdgeType, Option<String>)> {
    let et = edge_type.parse_next(input)?;
    let label = opt(preceded(space0, pipe_label)).parse_next(input)?;
    Ok((et, label.filter(|l| !l.is_empty())))
}

/// `A -- text --> B` and `A -- text --- B`.
fn text_link(input: &mut &str) -> winnow::Result<(EdgeType, Option<String>)> {
    "--".parse_next(input)?;
    space1.parse_next(input)?;
    let (label_text, et) = alt((
        (take_until(1.., " -->"), " -->".value(EdgeType::Arrow)),
        (take_until(1.., " ---"), " ---".value(EdgeType::OpenLink)),
    ))
    .parse_next(input)?;
    let label = normalize_label(label_text);
    Ok((et, Some(label).filter(|l| !l.is_empty())))
}

fn hop(input: &mut &str) -> winnow::Result<Hop> {
    let link = link.parse_next(input)?;
    let targets = node_group.parse_next(input)?;
    Ok(Hop { link, targets })
}

fn edge_chain(input: &mut &str) -> winnow::Result<EdgeChain> {
    let start = node_group.parse_next(input)?;
    let hops: Vec<Hop> = repeat(1.., hop).parse_next(input)?;
    Ok(EdgeChain { start, hops })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_direction_tokens() {
        assert_eq!(Direction::from_token("TD"), Some(Direction::TopDown));
        assert_eq!(Direction::from_token("TB"), Some(Direction::TopDown));
        assert_eq!(Direction::from_token("LR"), Some(Direction::LeftRight));
        assert_eq!(Direction::from_token("rl"), Some(Direction::RightLeft));
        assert_eq!(Direction::from_token("XY"), None);
    }

    #[test]
    fn parse_node_ref_with_label() {
        let mut input = "A[Start]";
        let n = node_ref(&mut input).unwrap();
        assert_eq!(n.id, "A");
        assert_eq!(n.label.as_deref(), Some("Start"));
    }

    #[test]
    fn parse_node_ref_without_label() {
        let mut input = "A rest";
        let n = node_ref(&mut input).unwrap();
        assert_eq!(n.id, "A");
        assert_eq!(n.label, None);
        assert_eq!(n.display_label(), "A");
        assert_eq!(input, " rest");
    }

    #[test]
    fn parse_node_ref_shapes() {
        let cases = [
            ("A(Round)", NodeShape::Round, "Round"),
            ("A{Diamond}", NodeShape::Diamond, "Diamond"),
            ("A((Circle))", NodeShape::Circle, "Circle"),
            ("A[Box]", NodeShape::Box, "Box"),
        ];
        for (text, shape, label) in cases {
            let mut input = text;
            let n = node_ref(&mut input).unwrap();
            assert_eq!(n.shape, shape, "{text}");
            assert_eq!(n.label.as_deref(), Some(label), "{text}");
            assert_eq!(input, "", "{text}");
        }
    }

    #[test]
    fn parse_node_ref_trims_padding_inside_brackets() {
        let mut input = "A[ Half Guard ]";
        assert_eq!(node_ref(&mut input).unwrap().label.as_deref(), Some("Half Guard"));
    }

    #[test]
    fn parse_node_ref_nested_brackets() {
        let mut input = "A(Guard (closed))";
        let n = node_ref(&mut input).unwrap();
        assert_eq!(n.label.as_deref(), Some("Guard (closed)"));
        assert_eq!(input, "");
    }

    #[test]
    fn parse_node_ref_with_class() {
        let mut input = "A[Mount]:::hot";
        let n = node_ref(&mut input).unwrap();
        assert_eq!(n.class.as_deref(), Some("hot"));
    }

    #[test]
    fn parse_edge_types() {
        let cases = [
            ("-->rest", EdgeType::Arrow),
            ("--->rest", EdgeType::Arrow),
            ("---rest", EdgeType::OpenLink),
            ("-.->rest", EdgeType::DottedArrow),
            ("-.-rest", EdgeType::DottedLink),
            ("==>rest", EdgeType::ThickArrow),
            ("===rest", EdgeType::ThickLink),
        ];
        for (text, expected) in cases {
            let mut input = text;
            assert_eq!(edge_type(&mut input).unwrap(), expected, "{text}");
            assert_eq!(input, "rest", "{text}");
        }
    }

    #[test]
    fn parse_simple_td_graph() {
        let diagram = parse_graph("graph TD\n    A[Start] --> B[End]\n");
        assert_eq!(diagram.direction(), Direction::TopDown);
        assert_eq!(diagram.nodes.len(), 2);
        assert_eq!(diagram.nodes[0].label, "Start");
        assert_eq!(diagram.nodes[1].label, "End");
        assert_eq!(diagram.edges.len(), 1);
        assert_eq!(diagram.edges[0].from, "A");
        assert_eq!(diagram.edges[0].to, "B");
        assert_eq!(diagram.edges[0].edge_type, EdgeType::Arrow);
    }

    #[test]
    fn parse_lr_flowchart() {
        let diagram = parse_graph("flowchart LR\n    A --> B\n");
        assert_eq!(diagram.direction(), Direction::LeftRight);
        assert_eq!(
            diagram.declaration,
            Some(Declaration::Graph {
                flowchart: true,
                direction: Direction::LeftRight
            })
        );
    }

    #[test]
    fn parse_edge_labels() {
        let diagram = parse_graph("graph TD\n    A -->|yes| B\n    B ---|\"text\"| C\n    C --> D\n");
        assert_eq!(diagram.edges[0].label.as_deref(), Some("yes"));
        assert_eq!(diagram.edges[1].label.as_deref(), Some("text"));
        assert_eq!(diagram.edges[2].label, None);
    }

    #[test]
    fn parse_alt_label_arrow() {
        let diagram = parse_graph("graph TD\n    A -- hello world --> B\n");
        assert_eq!(diagram.edges.len(), 1);
        assert_eq!(diagram.edges[0].edge_type, EdgeType::Arrow);
        assert_eq!(diagram.edges[0].label.as_deref(), Some("hello world"));
        assert_eq!(diagram.edges[0].to, "B");
    }

    #[test]
    fn parse_chain_and_fan_out() {
        let diagram = parse_graph("graph TD\n    A --> B & C --> D\n");
        let pairs: Vec<(&str, &str)> = diagram
            .edges
            .iter()
            .map(|e| (e.from.as_str(), e.to.as_str()))
            .collect();
        assert_eq!(pairs, vec![("A", "B"), ("A", "C"), ("B", "D"), ("C", "D")]);
    }

    #[test]
    fn parse_first_label_wins() {
        let diagram = parse_graph("graph TD\n    A[First] --> B\n    A[Second] --> C\n");
        assert_eq!(diagram.nodes.len(), 3);
        assert_eq!(diagram.nodes[0].label, "First");
    }

    #[test]
    fn parse_bare_reference_does_not_shadow_later_label() {
        let diagram = parse_graph("graph TD\n    A --> B\n    B[Mount] --> C\n");
        assert_eq!(diagram.label_of("B"), "Mount");
        assert_eq!(diagram.nodes[1].id, "B");
    }

    #[test]
    fn parse_quoted_bracket_label() {
        let diagram = parse_graph("graph TD\n    A[\"[NOTE] Hello World\"] --> B\n");
        assert_eq!(diagram.nodes[0].label, "[NOTE] Hello World");
    }

    #[test]
    fn parse_semicolon_separated_statements() {
        let diagram = parse_graph("graph TD; A[Guard]-->B[Mount]; B-->C[\"Armbar; tight\"]");
        assert_eq!(diagram.edges.len(), 2);
        assert_eq!(diagram.label_of("C"), "Armbar; tight");
    }

    #[test]
    fn parse_skips_prose_lines() {
        let diagram = parse_graph("graph TD\nHere is your chart:\nA[Guard] --> B[Mount]\nHope this helps!\n");
        assert_eq!(diagram.statements.len(), 1);
        assert_eq!(diagram.edges.len(), 1);
    }

    #[test]
    fn parse_ignores_trailing_single_words() {
        let diagram = parse_graph("graph TD\nA[Guard] --> B[Sweep]\n\nEnjoy\nC[Mount]\nB");
        let ids: Vec<&str> = diagram.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
        assert_eq!(diagram.statements.len(), 3);
    }

    #[test]
    fn parse_tolerates_missing_closing_bracket() {
        let diagram = parse_graph("graph TD\n    A[Guard --> B[Mount]\n");
        assert_eq!(diagram.label_of("A"), "Guard");
        assert_eq!(diagram.label_of("B"), "Mount");
        assert_eq!(diagram.edges.len(), 1);
    }

    #[test]
    fn parse_tolerates_missing_closing_pipe() {
        let diagram = parse_graph("graph TD\n    A -->|pass the guard B[Side Control]\n");
        assert_eq!(diagram.edges[0].label.as_deref(), Some("pass the guard"));
        assert_eq!(diagram.label_of("B"), "Side Control");
    }

    #[test]
    fn parse_dangling_reference_keeps_id_as_label() {
        let diagram = parse_graph("graph LR\n    A[Guard] --> Z\n");
        assert_eq!(diagram.label_of("Z"), "Z");
        assert_eq!(diagram.label_of("missing"), "missing");
    }

    #[test]
    fn parse_declaration_defaults_direction() {
        let (decl, rest) = parse_declaration("graph").unwrap();
        assert_eq!(
            decl,
            Declaration::Graph {
                flowchart: false,
                direction: Direction::TopDown
            }
        );
        assert_eq!(rest, "");

        let (_, rest) = parse_declaration("graph TB A-->B").unwrap();
        assert_eq!(rest, "A-->B");
        assert!(parse_declaration("graphs are fun").is_none());
    }

    #[test]
    fn parse_subgraph_headers() {
        assert_eq!(
            classify_statement("subgraph top [Top Game]").unwrap(),
            Statement::Subgraph {
                header: "top".into(),
                title: Some("Top Game".into())
            }
        );
        assert_eq!(
            classify_statement("subgraph Bottom Game").unwrap(),
            Statement::Subgraph {
                header: "Bottom Game".into(),
                title: None
            }
        );
        assert_eq!(
            classify_statement("end").unwrap(),
            Statement::Directive("end".into())
        );
    }

    #[test]
    fn split_keeps_separators_inside_labels() {
        assert_eq!(
            split_statements("A[\"x;y\"] --> B; B -->|a;b| C;"),
            vec!["A[\"x;y\"] --> B", "B -->|a;b| C"]
        );
        assert_eq!(split_statements("%% note; kept"), vec!["%% note; kept"]);
    }

    #[test]
    fn repair_drops_dangling_link() {
        let stmt = repair_dangling_link("A[Guard] -->|pass|").unwrap();
        assert_eq!(stmt.to_string(), "A[\"Guard\"]");
        let stmt = repair_dangling_link("A --> B -->").unwrap();
        assert_eq!(stmt.to_string(), "A --> B");
        assert!(repair_dangling_link("Hope this helps").is_none());
    }

    #[test]
    fn strip_list_marker_variants() {
        assert_eq!(strip_list_marker("- A --> B"), Some("A --> B"));
        assert_eq!(strip_list_marker("2) A --> B"), Some("A --> B"));
        assert_eq!(strip_list_marker("• A"), Some("A"));
        assert_eq!(strip_list_marker("-->B"), None);
        assert_eq!(strip_list_marker("A --> B"), None);
    }

    #[test]
    fn normalize_label_replaces_inner_quotes() {
        assert_eq!(normalize_label(" \"say \"hi\" now\" "), "say 'hi' now");
    }
}
