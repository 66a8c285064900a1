//! One analysis run: load the snapshot, build the graph, compute
//! statistics and suggestions.
//!
//! A load failure aborts the run before anything is computed, so no
//! command ever prints numbers for a partial vault.

use anyhow::{Context, Result};
use std::path::PathBuf;
use vault_graph_core::{
    compute_stats, DomainTable, GraphBuilder, GraphStats, Suggestion, SuggestionEngine, VaultGraph,
};

use crate::config::Config;
use crate::store::load_vault;

/// Everything a report needs from one run.
pub struct Analysis {
    pub root: PathBuf,
    pub fingerprint: String,
    pub domains: DomainTable,
    pub graph: VaultGraph,
    pub stats: GraphStats,
    /// Ranked; `vg add --index N` refers to positions in this list.
    pub suggestions: Vec<Suggestion>,
}

pub fn analyze(config: &Config) -> Result<Analysis> {
    let domains = config.domain_table()?;
    let snapshot = load_vault(&config.vault, &domains)
        .with_context(|| format!("Failed to load vault at {}", config.vault.root.display()))?;

    let graph = GraphBuilder::new(config.suggest.build_options()).build(snapshot.notes);
    let stats = compute_stats(&graph);

    let suggestions = {
        let engine = SuggestionEngine::new(&domains, config.suggest.params())
            .context("Invalid [suggest] configuration")?;
        engine.suggest(&graph)
    };

    log::info!(
        "{} notes, {} links, {} orphans, {} suggestions",
        stats.total_notes,
        stats.total_links,
        stats.orphans.len(),
        suggestions.len()
    );

    Ok(Analysis {
        root: snapshot.root,
        fingerprint: snapshot.fingerprint,
        domains,
        graph,
        stats,
        suggestions,
    })
}
