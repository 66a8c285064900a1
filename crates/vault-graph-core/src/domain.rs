//! Domain table: how notes are partitioned by path and which linking rules
//! apply between partitions.
//!
//! A domain name doubles as its path prefix. A trailing `/*` turns every
//! direct sub-folder into its own domain, so with `thoughts/*` configured
//! the note `thoughts/ideas/rust.md` belongs to `thoughts/ideas` while
//! `thoughts/loose.md` belongs to `thoughts`. Notes outside every prefix
//! land in [`UNCATEGORIZED`].
//!
//! The table is built once at startup and shared by reference; it is never
//! mutated afterwards.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::CoreError;

/// Domain assigned to notes that match no configured prefix.
pub const UNCATEGORIZED: &str = "uncategorized";

/// Which way a rule proposes links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// From the rule's source domain to its target domain.
    #[default]
    Forward,
    /// From the target domain back to the source domain.
    Backward,
    /// Both ways.
    Both,
}

impl Direction {
    /// Orient a `(from, to)` pair according to this direction.
    pub fn orient<'a>(&self, from: &'a str, to: &'a str) -> Vec<(&'a str, &'a str)> {
        match self {
            Direction::Forward => vec![(from, to)],
            Direction::Backward => vec![(to, from)],
            Direction::Both => vec![(from, to), (to, from)],
        }
    }
}

/// Tie-break order for ranked suggestions. Declaration order is priority
/// order: earlier variants sort first when confidences are equal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum RulePriority {
    OrphanToMoc,
    DailyToThought,
    ThoughtToGoal,
    CrossDomain,
    Mention,
}

impl RulePriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            RulePriority::OrphanToMoc => "orphan-to-moc",
            RulePriority::DailyToThought => "daily-to-thought",
            RulePriority::ThoughtToGoal => "thought-to-goal",
            RulePriority::CrossDomain => "cross-domain",
            RulePriority::Mention => "mention",
        }
    }
}

fn default_rule_priority() -> RulePriority {
    RulePriority::CrossDomain
}

/// A typed linking rule between two domain patterns.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LinkingRule {
    /// Source domain pattern. Defaults to the owning domain's name.
    #[serde(default)]
    pub from: Option<String>,
    /// Target domain pattern.
    pub to: String,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default = "default_rule_priority")]
    pub priority: RulePriority,
}

/// One configured domain.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DomainSpec {
    pub name: String,
    #[serde(default)]
    pub purpose: String,
    /// Temporal window override for daily-to-thought rules sourced here.
    #[serde(default)]
    pub window_days: Option<u32>,
    /// Extra words matched against MOC titles for notes in this domain.
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub rules: Vec<LinkingRule>,
}

impl DomainSpec {
    pub fn new(name: &str, purpose: &str) -> Self {
        Self {
            name: name.to_string(),
            purpose: purpose.to_string(),
            window_days: None,
            keywords: Vec::new(),
            rules: Vec::new(),
        }
    }

    pub fn with_rule(mut self, to: &str, priority: RulePriority) -> Self {
        self.rules.push(LinkingRule {
            from: None,
            to: to.to_string(),
            direction: Direction::Forward,
            priority,
        });
        self
    }

    pub fn with_keywords(mut self, words: &[&str]) -> Self {
        self.keywords = words.iter().map(|w| w.to_string()).collect();
        self
    }

    /// Path prefix this domain claims, without the `/*` suffix.
    fn prefix(&self) -> &str {
        self.name.strip_suffix("/*").unwrap_or(&self.name)
    }

    fn is_wildcard(&self) -> bool {
        self.name.ends_with("/*")
    }
}

/// A linking rule with its source pattern filled in.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRule<'a> {
    pub owner: &'a DomainSpec,
    pub from: &'a str,
    pub to: &'a str,
    pub direction: Direction,
    pub priority: RulePriority,
}

/// The immutable, validated domain configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainTable {
    domains: Vec<DomainSpec>,
}

impl DomainTable {
    /// Validate and build a table.
    pub fn new(domains: Vec<DomainSpec>) -> Result<Self, CoreError> {
        let mut seen = BTreeSet::new();
        for spec in &domains {
            let prefix = spec.prefix().trim_matches('/');
            if prefix.is_empty() {
                return Err(CoreError::EmptyDomainName);
            }
            if !seen.insert(spec.name.to_lowercase()) {
                return Err(CoreError::DuplicateDomain(spec.name.clone()));
            }
        }

        let table = Self { domains };
        for spec in &table.domains {
            for rule in &spec.rules {
                if !table.pattern_is_known(&rule.to) {
                    return Err(CoreError::UnknownRuleTarget {
                        domain: spec.name.clone(),
                        pattern: rule.to.clone(),
                    });
                }
            }
        }
        Ok(table)
    }

    /// The documented default domain set.
    pub fn default_table() -> Self {
        Self {
            domains: vec![
                DomainSpec::new("daily", "Daily journal entries")
                    .with_rule("thoughts/*", RulePriority::DailyToThought)
                    .with_keywords(&["journal"]),
                DomainSpec::new("thoughts/*", "Ideas, learnings, and reflections")
                    .with_rule("goals", RulePriority::ThoughtToGoal)
                    .with_rule("projects", RulePriority::CrossDomain)
                    .with_keywords(&["ideas", "learnings", "reflections"]),
                DomainSpec::new("goals", "Goals and intentions")
                    .with_rule("projects", RulePriority::CrossDomain),
                DomainSpec::new("MOC", "Maps of content that index other notes"),
                DomainSpec::new("projects", "Active and archived projects")
                    .with_rule("goals", RulePriority::CrossDomain),
            ],
        }
    }

    pub fn specs(&self) -> &[DomainSpec] {
        &self.domains
    }

    /// Classify a note id into its domain. The longest matching prefix
    /// wins; matching ignores ASCII case but the configured casing is
    /// returned.
    pub fn classify(&self, note_id: &str) -> String {
        let best = self
            .domains
            .iter()
            .filter_map(|spec| {
                let prefix = spec.prefix().trim_matches('/');
                strip_dir_prefix(note_id, prefix).map(|rest| (spec, prefix, rest))
            })
            .max_by_key(|(_, prefix, _)| prefix.len());

        match best {
            None => UNCATEGORIZED.to_string(),
            Some((spec, prefix, rest)) => match rest.split_once('/') {
                Some((sub, _)) if spec.is_wildcard() => format!("{}/{}", prefix, sub),
                _ => prefix.to_string(),
            },
        }
    }

    /// The spec that owns a classified domain name.
    pub fn spec_for(&self, domain: &str) -> Option<&DomainSpec> {
        self.domains
            .iter()
            .filter(|spec| domain_matches(&spec.name, domain))
            .max_by_key(|spec| spec.prefix().len())
    }

    /// All rules with their source pattern resolved, in table order.
    pub fn rules(&self) -> Vec<ResolvedRule<'_>> {
        self.domains
            .iter()
            .flat_map(|spec| {
                spec.rules.iter().map(move |rule| ResolvedRule {
                    owner: spec,
                    from: rule.from.as_deref().unwrap_or(&spec.name),
                    to: &rule.to,
                    direction: rule.direction,
                    priority: rule.priority,
                })
            })
            .collect()
    }

    fn pattern_is_known(&self, pattern: &str) -> bool {
        self.domains.iter().any(|spec| {
            let prefix = spec.prefix();
            domain_matches(pattern, prefix)
                || domain_matches(&spec.name, pattern.strip_suffix("/*").unwrap_or(pattern))
        })
    }
}

impl Default for DomainTable {
    fn default() -> Self {
        Self::default_table()
    }
}

/// Does a domain pattern (`goals`, `thoughts/*`) match a classified
/// domain name (`goals`, `thoughts/ideas`)? ASCII case-insensitive.
pub fn domain_matches(pattern: &str, domain: &str) -> bool {
    match pattern.strip_suffix("/*") {
        Some(prefix) => {
            domain.eq_ignore_ascii_case(prefix) || strip_dir_prefix(domain, prefix).is_some()
        }
        None => domain.eq_ignore_ascii_case(pattern),
    }
}

/// Strip `prefix/` from `path`, ignoring ASCII case.
fn strip_dir_prefix<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    let head = path.get(..prefix.len())?;
    if !head.eq_ignore_ascii_case(prefix) {
        return None;
    }
    path[prefix.len()..].strip_prefix('/')
}
