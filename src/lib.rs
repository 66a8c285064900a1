//! # vault-graph
//!
//! Link-graph analysis and domain-aware link suggestions for a vault of
//! Markdown notes.
//!
//! vault-graph loads every note of a vault once, builds a directed graph
//! from its `[[wiki-links]]`, and reports structural statistics (orphans,
//! most-connected notes, per-domain health) together with ranked link
//! suggestions. Accepted suggestions can be written back into the notes
//! as an idempotent batch.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌─────────────┐   ┌────────────┐
//! │  Store   │──▶│  Parser  │──▶│    Graph    │──▶│ Statistics │
//! │ (walk FS)│   │ matchers │   │   Builder   │   │ Suggestions│
//! └──────────┘   └──────────┘   └─────────────┘   └─────┬──────┘
//!                                                       │
//!                                  ┌────────────────────┤
//!                                  ▼                    ▼
//!                             ┌──────────┐        ┌──────────┐
//!                             │  Report  │        │ Applier  │
//!                             │ md/html/ │        │ (writes) │
//!                             │   json   │        └──────────┘
//!                             └──────────┘
//! ```
//!
//! Parsing, graph building, statistics, and suggestion passes are pure
//! and live in [`vault_graph_core`]. This crate adds the filesystem, the
//! configuration file, report rendering, and the `vg` binary.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and lookup |
//! | [`store`] | Vault walking and snapshot loading |
//! | [`pipeline`] | One analysis run |
//! | [`report`] | Markdown, restricted HTML, and JSON rendering |
//! | [`apply`] | Batch link insertion |
//! | [`logging`] | Logger setup |

pub mod apply;
pub mod config;
pub mod logging;
pub mod pipeline;
pub mod report;
pub mod store;
