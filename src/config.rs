//! Configuration parsing and validation.
//!
//! vault-graph is configured through a TOML file with three parts:
//!
//! ```toml
//! [vault]
//! root = "~/notes"
//! include_globs = ["**/*.md"]
//! exclude_globs = ["templates/**"]
//!
//! [suggest]
//! temporal_window_days = 3
//! bridge_threshold = 0.5
//!
//! [[domains]]
//! name = "daily"
//! purpose = "Daily journal entries"
//!
//! [[domains.rules]]
//! to = "thoughts/*"
//! priority = "daily-to-thought"
//! ```
//!
//! Every section is optional. A config without `[[domains]]` uses the
//! default domain table (`daily`, `thoughts/*`, `goals`, `MOC`,
//! `projects`).
//!
//! Lookup order: `--config <path>` (must exist), then
//! `<vault>/.vault-graph.toml`, then built-in defaults.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use vault_graph_core::{BuildOptions, DomainSpec, DomainTable, SuggestParams};

/// Config file looked up in the vault root when `--config` is not given.
pub const VAULT_CONFIG_FILE: &str = ".vault-graph.toml";

/// Top-level configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub vault: VaultConfig,
    #[serde(default)]
    pub suggest: SuggestConfig,
    #[serde(default = "default_domains")]
    pub domains: Vec<DomainSpec>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct VaultConfig {
    #[serde(default = "default_root")]
    pub root: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    /// Added to the built-in excludes (`.git`, `node_modules`, `target`,
    /// dot-directories).
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
            follow_symlinks: false,
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*.md".to_string()]
}

/// Suggestion engine and graph builder tuning.
#[derive(Debug, Deserialize, Clone)]
pub struct SuggestConfig {
    #[serde(default = "default_temporal_window_days")]
    pub temporal_window_days: u32,
    #[serde(default = "default_temporal_decay_days")]
    pub temporal_decay_days: u32,
    #[serde(default = "default_bridge_threshold")]
    pub bridge_threshold: f64,
    #[serde(default = "default_entity_confidence_cap")]
    pub entity_confidence_cap: f64,
    #[serde(default = "default_min_title_len")]
    pub min_title_len: usize,
    #[serde(default = "default_max_suggestions")]
    pub max_suggestions: usize,
    #[serde(default = "default_moc_domain")]
    pub moc_domain: String,
    #[serde(default = "default_tag_target_domains")]
    pub tag_target_domains: Vec<String>,
}

impl Default for SuggestConfig {
    fn default() -> Self {
        Self {
            temporal_window_days: default_temporal_window_days(),
            temporal_decay_days: default_temporal_decay_days(),
            bridge_threshold: default_bridge_threshold(),
            entity_confidence_cap: default_entity_confidence_cap(),
            min_title_len: default_min_title_len(),
            max_suggestions: default_max_suggestions(),
            moc_domain: default_moc_domain(),
            tag_target_domains: default_tag_target_domains(),
        }
    }
}

fn default_temporal_window_days() -> u32 {
    3
}
fn default_temporal_decay_days() -> u32 {
    4
}
fn default_bridge_threshold() -> f64 {
    0.5
}
fn default_entity_confidence_cap() -> f64 {
    0.9
}
fn default_min_title_len() -> usize {
    3
}
fn default_max_suggestions() -> usize {
    50
}
fn default_moc_domain() -> String {
    "MOC".to_string()
}
fn default_tag_target_domains() -> Vec<String> {
    vec!["MOC".to_string(), "projects".to_string()]
}

fn default_domains() -> Vec<DomainSpec> {
    DomainTable::default_table().specs().to_vec()
}

impl SuggestConfig {
    pub fn params(&self) -> SuggestParams {
        SuggestParams {
            temporal_window_days: self.temporal_window_days,
            temporal_decay_days: self.temporal_decay_days,
            bridge_threshold: self.bridge_threshold,
            entity_confidence_cap: self.entity_confidence_cap,
            max_suggestions: self.max_suggestions,
            moc_domain: self.moc_domain.clone(),
        }
    }

    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            min_title_len: self.min_title_len,
            tag_target_domains: self.tag_target_domains.clone(),
        }
    }
}

impl Config {
    /// Built-in defaults for a vault at `root`.
    pub fn default_for(root: &Path) -> Self {
        Self {
            vault: VaultConfig {
                root: root.to_path_buf(),
                ..VaultConfig::default()
            },
            suggest: SuggestConfig::default(),
            domains: default_domains(),
        }
    }

    /// Validated, immutable domain table.
    pub fn domain_table(&self) -> Result<DomainTable> {
        DomainTable::new(self.domains.clone()).context("Invalid [[domains]] configuration")
    }
}

/// Read, parse, and validate a config file. A relative `vault.root` is
/// resolved against the file's directory.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    if config.vault.root.is_relative() {
        if let Some(dir) = path.parent() {
            config.vault.root = dir.join(&config.vault.root);
        }
    }

    validate(&config)?;
    Ok(config)
}

/// Resolve the configuration for one run.
///
/// `vault` (from `--vault`) always wins over `vault.root` in the file.
pub fn resolve_config(explicit: Option<&Path>, vault: Option<&Path>) -> Result<Config> {
    let mut config = match explicit {
        Some(path) => load_config(path)?,
        None => {
            let root = vault.unwrap_or_else(|| Path::new("."));
            let candidate = root.join(VAULT_CONFIG_FILE);
            if candidate.is_file() {
                log::info!("using config {}", candidate.display());
                load_config(&candidate)?
            } else {
                log::debug!("no {} in {}; using defaults", VAULT_CONFIG_FILE, root.display());
                Config::default_for(root)
            }
        }
    };

    if let Some(root) = vault {
        config.vault.root = root.to_path_buf();
    }
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    // Validate vault
    if config.vault.include_globs.is_empty() {
        bail!("vault.include_globs must not be empty");
    }

    // Validate suggest
    let s = &config.suggest;
    if !(0.0..=1.0).contains(&s.bridge_threshold) {
        bail!(
            "suggest.bridge_threshold must be in [0.0, 1.0], got {}",
            s.bridge_threshold
        );
    }
    if !(s.entity_confidence_cap > 0.0 && s.entity_confidence_cap <= 1.0) {
        bail!(
            "suggest.entity_confidence_cap must be in (0.0, 1.0], got {}",
            s.entity_confidence_cap
        );
    }
    if s.min_title_len == 0 {
        bail!("suggest.min_title_len must be >= 1");
    }
    if s.moc_domain.trim().is_empty() {
        bail!("suggest.moc_domain must not be empty");
    }

    // Validate domains
    config.domain_table()?;
    Ok(())
}
