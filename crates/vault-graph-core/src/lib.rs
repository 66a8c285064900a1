//! # Vault Graph Core
//!
//! Pure, I/O-free logic for vault-graph: the note model, frontmatter
//! splitting, the link parser and its mention matchers, the domain table,
//! graph assembly, statistics, and the suggestion engine.
//!
//! This crate never touches the filesystem. The calling application loads
//! note text, hands it over as [`models::Note`] values, and writes back
//! whatever [`edit`] produces.
//!
//! ```text
//! Note text ──▶ LinkParser ──▶ GraphBuilder ──▶ VaultGraph
//!                                                 │
//!                               ┌─────────────────┤
//!                               ▼                 ▼
//!                          GraphStats     SuggestionEngine
//! ```

pub mod domain;
pub mod edit;
pub mod error;
pub mod frontmatter;
pub mod graph;
pub mod matcher;
pub mod models;
pub mod parser;
pub mod stats;
pub mod suggest;

pub use domain::{DomainSpec, DomainTable, LinkingRule, RulePriority};
pub use error::CoreError;
pub use graph::{BuildOptions, GraphBuilder, VaultGraph};
pub use models::{Link, LinkKind, Note, NoteId, Suggestion};
pub use parser::LinkParser;
pub use stats::{compute_stats, GraphStats};
pub use suggest::{SuggestParams, SuggestionEngine};
