use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    TopDown,
    LeftRight,
    RightLeft,
    BottomTop,
}

impl Direction {
    /// Reads a direction token. `TB` is an alias of `TD`.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_uppercase().as_str() {
            "TD" | "TB" => Some(Direction::TopDown),
            "LR" => Some(Direction::LeftRight),
            "RL" => Some(Direction::RightLeft),
            "BT" => Some(Direction::BottomTop),
            _ => None,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            Direction::TopDown => "TD",
            Direction::LeftRight => "LR",
            Direction::RightLeft => "RL",
            Direction::BottomTop => "BT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagramKind {
    Flowchart,
    Sequence,
    Class,
    State,
    Gantt,
    Pie,
}

impl DiagramKind {
    /// Maps the first token of a declaration line to its diagram kind.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "graph" | "flowchart" => Some(DiagramKind::Flowchart),
            "sequenceDiagram" => Some(DiagramKind::Sequence),
            "classDiagram" | "classDiagram-v2" => Some(DiagramKind::Class),
            "stateDiagram" | "stateDiagram-v2" => Some(DiagramKind::State),
            "gantt" => Some(DiagramKind::Gantt),
            "pie" => Some(DiagramKind::Pie),
            _ => None,
        }
    }
}

/// The first line of a diagram.
#[derive(Debug, Clone, PartialEq)]
pub enum Declaration {
    /// `graph <dir>` or `flowchart <dir>`.
    Graph { flowchart: bool, direction: Direction },
    /// Any other diagram kind, kept as its trimmed header line.
    Other { kind: DiagramKind, header: String },
}

impl Declaration {
    pub fn kind(&self) -> DiagramKind {
        match self {
            Declaration::Graph { .. } => DiagramKind::Flowchart,
            Declaration::Other { kind, .. } => *kind,
        }
    }

    pub fn direction(&self) -> Option<Direction> {
        match self {
            Declaration::Graph { direction, .. } => Some(*direction),
            Declaration::Other { .. } => None,
        }
    }
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Declaration::Graph {
                flowchart,
                direction,
            } => {
                let keyword = if *flowchart { "flowchart" } else { "graph" };
                write!(f, "{keyword} {}", direction.token())
            }
            Declaration::Other { header, .. } => f.write_str(header),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeShape {
    Box,
    Round,
    Diamond,
    Circle,
}

impl NodeShape {
    pub fn delimiters(self) -> (&'static str, &'static str) {
        match self {
            NodeShape::Box => ("[", "]"),
            NodeShape::Round => ("(", ")"),
            NodeShape::Diamond => ("{", "}"),
            NodeShape::Circle => ("((", "))"),
        }
    }
}

/// A node as written inside a statement: `A`, `A[Guard]`, `B1(("Mount")):::hot`.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRef {
    pub id: String,
    pub label: Option<String>,
    pub shape: NodeShape,
    pub class: Option<String>,
}

impl NodeRef {
    /// The label shown for this node; the raw id when no text was given.
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.id)
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)?;
        if let Some(label) = &self.label {
            let (open, close) = self.shape.delimiters();
            write!(f, "{open}\"{}\"{close}", quote_safe(label))?;
        }
        if let Some(class) = &self.class {
            write!(f, ":::{class}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeType {
    Arrow,
    OpenLink,
    DottedArrow,
    DottedLink,
    ThickArrow,
    ThickLink,
}

impl EdgeType {
    pub fn token(self) -> &'static str {
        match self {
            EdgeType::Arrow => "-->",
            EdgeType::OpenLink => "---",
            EdgeType::DottedArrow => "-.->",
            EdgeType::DottedLink => "-.-",
            EdgeType::ThickArrow => "==>",
            EdgeType::ThickLink => "===",
        }
    }
}

/// The connector between two node groups, with the spacing it was written with.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub edge_type: EdgeType,
    pub label: Option<String>,
    pub spaced_before: bool,
    pub spaced_after: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Hop {
    pub link: Link,
    pub targets: Vec<NodeRef>,
}

/// `A --> B & C -->|x| D`: a start group followed by one or more hops.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeChain {
    pub start: Vec<NodeRef>,
    pub hops: Vec<Hop>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Declaration(Declaration),
    Node(NodeRef),
    Edge(EdgeChain),
    Subgraph { header: String, title: Option<String> },
    /// `end`, `style`, `classDef`, `click`, `%%` comments and friends, kept verbatim.
    Directive(String),
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Declaration(decl) => write!(f, "{decl}"),
            Statement::Node(node) => write!(f, "{node}"),
            Statement::Edge(chain) => {
                write_group(f, &chain.start)?;
                for hop in &chain.hops {
                    let link = &hop.link;
                    if link.spaced_before {
                        f.write_str(" ")?;
                    }
                    f.write_str(link.edge_type.token())?;
                    if let Some(label) = &link.label {
                        write!(f, "|\"{}\"|", quote_safe(label))?;
                    }
                    if link.spaced_after {
                        f.write_str(" ")?;
                    }
                    write_group(f, &hop.targets)?;
                }
                Ok(())
            }
            Statement::Subgraph { header, title } => match title {
                Some(title) => write!(f, "subgraph {header}[\"{}\"]", quote_safe(title)),
                None => write!(f, "subgraph {header}"),
            },
            Statement::Directive(raw) => f.write_str(raw),
        }
    }
}

fn write_group(f: &mut fmt::Formatter<'_>, group: &[NodeRef]) -> fmt::Result {
    for (i, node) in group.iter().enumerate() {
        if i > 0 {
            f.write_str(" & ")?;
        }
        write!(f, "{node}")?;
    }
    Ok(())
}

fn quote_safe(label: &str) -> String {
    label.replace('"', "'")
}

/// A node after deduplication across the whole diagram.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDecl {
    pub id: String,
    pub label: String,
    /// False when the node was only ever referenced by its bare id.
    pub explicit: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub edge_type: EdgeType,
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphDiagram {
    pub declaration: Option<Declaration>,
    pub nodes: Vec<NodeDecl>,
    pub edges: Vec<Edge>,
    pub statements: Vec<Statement>,
}

impl GraphDiagram {
    pub fn direction(&self) -> Direction {
        self.declaration
            .as_ref()
            .and_then(Declaration::direction)
            .unwrap_or(Direction::TopDown)
    }

    pub fn node(&self, id: &str) -> Option<&NodeDecl> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Display label for an id, falling back to the id for dangling references.
    pub fn label_of<'a>(&'a self, id: &'a str) -> &'a str {
        self.node(id).map(|n| n.label.as_str()).unwrap_or(id)
    }
}
