pub mod config;
pub mod display_width;
pub mod error;
pub mod gateway;
pub mod graph_ast;
pub mod graph_parser;
pub mod html;
pub mod media;
pub mod observability;
pub mod personas;
pub mod pivot;
pub mod prompt;
pub mod sanitizer;
pub mod session;
pub mod strategy;

pub use error::{FlowError, MediaError, ProviderError};
pub use pivot::{PivotMatch, resolve_pivot};
pub use prompt::{PromptKind, PromptRequest, Ruleset, build_prompt};
pub use sanitizer::sanitize_graph;
pub use session::{FlowEngine, FlowSession};
pub use strategy::format_strategy;
