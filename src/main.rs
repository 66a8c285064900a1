//! # vault-graph CLI (`vg`)
//!
//! The `vg` binary analyzes a vault of Markdown notes and proposes links
//! between them.
//!
//! ## Usage
//!
//! ```bash
//! vg --vault ~/notes <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `vg analyze` | Statistics, orphans, and suggestions grouped by note |
//! | `vg orphans` | Notes with no incoming or outgoing links |
//! | `vg suggest` | Ranked, numbered list of link suggestions |
//! | `vg add --index N` | Write suggestions back into their source notes |
//!
//! ## Examples
//!
//! ```bash
//! # Full report as JSON
//! vg --vault ~/notes --format json analyze
//!
//! # Preview, then apply the first two suggestions
//! vg --vault ~/notes suggest
//! vg --vault ~/notes add --index 0 --index 1 --dry-run
//! vg --vault ~/notes add --index 0 --index 1
//! ```

use anyhow::{bail, Result};
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use vault_graph::apply::{apply_suggestions, Selection};
use vault_graph::config::resolve_config;
use vault_graph::logging;
use vault_graph::pipeline::analyze;
use vault_graph::report::{render_apply, OutputFormat, Report};

/// vault-graph: link-graph analysis for Markdown note vaults.
///
/// Configuration is read from `--config`, else `<vault>/.vault-graph.toml`,
/// else built-in defaults.
#[derive(Parser)]
#[command(
    name = "vg",
    about = "Link-graph analysis and link suggestions for Markdown note vaults",
    version
)]
struct Cli {
    /// Path to a configuration file (TOML). Must exist when given.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Vault root. Overrides `vault.root` from the configuration.
    #[arg(long, global = true)]
    vault: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Output format.
    #[arg(long, global = true, value_enum, default_value = "markdown")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Full report: statistics, orphans, and suggestions grouped by note.
    Analyze,

    /// List notes with no incoming or outgoing links.
    Orphans,

    /// List ranked link suggestions with their indices.
    Suggest,

    /// Insert suggested links into their source notes.
    ///
    /// Indices refer to the list printed by `vg suggest` for the same
    /// vault contents. Individual failures are reported and do not change
    /// the exit status.
    Add {
        /// Suggestion index (0-based); repeatable.
        #[arg(long = "index", value_name = "N")]
        indices: Vec<usize>,

        /// Apply every suggestion.
        #[arg(long, conflicts_with = "indices")]
        all: bool,

        /// Report what would change without writing.
        #[arg(long)]
        dry_run: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = resolve_config(cli.config.as_deref(), cli.vault.as_deref())?;
    let analysis = analyze(&config)?;

    let output = match cli.command {
        Commands::Analyze => Report::analyze(&analysis).render(cli.format)?,
        Commands::Orphans => Report::orphans(&analysis).render(cli.format)?,
        Commands::Suggest => Report::suggestions(&analysis).render(cli.format)?,
        Commands::Add {
            indices,
            all,
            dry_run,
        } => {
            let selection = if all {
                Selection::All
            } else if indices.is_empty() {
                bail!("nothing to add: pass --index N (repeatable) or --all");
            } else {
                Selection::Indices(indices)
            };
            let report = apply_suggestions(&analysis, &selection, dry_run);
            render_apply(&report, cli.format)?
        }
    };

    print!("{}", output);
    Ok(())
}
