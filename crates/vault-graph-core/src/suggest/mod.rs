//! Suggestion engine: rule passes over the built graph, merged and ranked.
//!
//! # Passes
//!
//! | Pass | Kind | Rule | Signal |
//! |------|------|------|--------|
//! | [`CategoryPass`] | `category` | `orphan-to-moc` | note keywords in MOC titles |
//! | [`TemporalPass`] | `temporal` | `daily-to-thought` | shared topics within a date window |
//! | [`BridgePass`] | `cross-domain` | rule's own | under-connected domain pairs |
//! | [`EntityPass`] | `entity` | `mention` | `@name`, `#tag`, and title mentions |
//!
//! Passes are independent and run in parallel. Their output is then:
//!
//! 1. filtered (no self-links, nothing that is already an explicit edge),
//! 2. merged per `(source, target)`: maximum confidence, rationales joined
//!    in rule-priority order, kind and rule from the highest-priority
//!    contributor,
//! 3. ranked by confidence descending, then rule priority, then source id,
//!    then target id,
//! 4. truncated to `max_suggestions` (0 keeps everything).
//!
//! The engine never touches note files.

mod bridge;
mod category;
mod entity;
mod temporal;

pub use bridge::BridgePass;
pub use category::CategoryPass;
pub use entity::EntityPass;
pub use temporal::TemporalPass;

use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::domain::DomainTable;
use crate::error::CoreError;
use crate::graph::VaultGraph;
use crate::models::Suggestion;

/// Tunable parameters for the rule passes.
#[derive(Debug, Clone, PartialEq)]
pub struct SuggestParams {
    /// Days after a daily note during which temporal links get full
    /// confidence. Domains may override this with `window_days`.
    pub temporal_window_days: u32,
    /// Days past the window over which confidence decays to zero.
    pub temporal_decay_days: u32,
    /// Connected-source ratio below which a domain pair is bridged.
    pub bridge_threshold: f64,
    pub entity_confidence_cap: f64,
    /// 0 keeps every suggestion.
    pub max_suggestions: usize,
    /// Domain pattern holding the maps of content.
    pub moc_domain: String,
}

impl Default for SuggestParams {
    fn default() -> Self {
        Self {
            temporal_window_days: 3,
            temporal_decay_days: 4,
            bridge_threshold: 0.5,
            entity_confidence_cap: 0.9,
            max_suggestions: 50,
            moc_domain: "MOC".to_string(),
        }
    }
}

impl SuggestParams {
    pub fn validate(&self) -> Result<(), CoreError> {
        if !(0.0..=1.0).contains(&self.bridge_threshold) {
            return Err(CoreError::InvalidParameter {
                name: "bridge_threshold",
                reason: format!("{} is outside [0, 1]", self.bridge_threshold),
            });
        }
        if !(self.entity_confidence_cap > 0.0 && self.entity_confidence_cap <= 1.0) {
            return Err(CoreError::InvalidParameter {
                name: "entity_confidence_cap",
                reason: format!("{} is outside (0, 1]", self.entity_confidence_cap),
            });
        }
        if self.moc_domain.trim().is_empty() {
            return Err(CoreError::InvalidParameter {
                name: "moc_domain",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Read-only inputs shared by every pass.
pub struct PassContext<'a> {
    pub graph: &'a VaultGraph,
    pub domains: &'a DomainTable,
    pub params: &'a SuggestParams,
}

/// One independent source of suggestions.
pub trait SuggestionPass: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn run(&self, ctx: &PassContext<'_>) -> Vec<Suggestion>;
}

pub struct SuggestionEngine<'a> {
    domains: &'a DomainTable,
    params: SuggestParams,
    passes: Vec<Box<dyn SuggestionPass>>,
}

impl<'a> SuggestionEngine<'a> {
    /// Engine with all four passes.
    pub fn new(domains: &'a DomainTable, params: SuggestParams) -> Result<Self, CoreError> {
        params.validate()?;
        Ok(Self {
            domains,
            params,
            passes: vec![
                Box::new(CategoryPass),
                Box::new(TemporalPass),
                Box::new(BridgePass),
                Box::new(EntityPass),
            ],
        })
    }

    /// Replace the pass list, e.g. to test one pass in isolation.
    pub fn with_passes(mut self, passes: Vec<Box<dyn SuggestionPass>>) -> Self {
        self.passes = passes;
        self
    }

    pub fn params(&self) -> &SuggestParams {
        &self.params
    }

    /// Run every pass and return the ranked suggestion list.
    pub fn suggest(&self, graph: &VaultGraph) -> Vec<Suggestion> {
        let ctx = PassContext {
            graph,
            domains: self.domains,
            params: &self.params,
        };

        let raw: Vec<Suggestion> = self
            .passes
            .par_iter()
            .map(|pass| {
                let found = pass.run(&ctx);
                log::debug!("{} pass: {} candidates", pass.name(), found.len());
                found
            })
            .collect::<Vec<_>>()
            .into_iter()
            .flatten()
            .filter(|s| {
                s.source() != s.target()
                    && graph.note(s.target()).is_some()
                    && !graph.has_edge(s.source(), s.target())
            })
            .collect();

        let mut ranked = merge(raw);
        rank(&mut ranked);
        if self.params.max_suggestions > 0 {
            ranked.truncate(self.params.max_suggestions);
        }
        log::debug!("{} suggestions after merge and ranking", ranked.len());
        ranked
    }
}

/// Merge suggestions that share a `(source, target)` pair.
pub fn merge(suggestions: Vec<Suggestion>) -> Vec<Suggestion> {
    let mut groups: BTreeMap<(String, String), Vec<Suggestion>> = BTreeMap::new();
    for s in suggestions {
        groups
            .entry((s.source().to_string(), s.target().to_string()))
            .or_default()
            .push(s);
    }

    groups
        .into_values()
        .filter_map(|mut group| {
            group.sort_by_key(|s| s.rule());
            let confidence = group
                .iter()
                .map(Suggestion::confidence)
                .fold(0.0_f64, f64::max);
            let mut rationales: Vec<&str> = Vec::new();
            for s in &group {
                if !rationales.contains(&s.rationale()) {
                    rationales.push(s.rationale());
                }
            }
            let rationale = rationales.join("; ");
            let lead = group.first()?;
            Some(Suggestion::new(
                lead.source(),
                lead.target(),
                lead.kind(),
                lead.rule(),
                confidence,
                rationale,
            ))
        })
        .collect()
}

/// Sort into the documented ranking order.
pub fn rank(suggestions: &mut [Suggestion]) {
    suggestions.sort_by(|a, b| {
        b.confidence()
            .partial_cmp(&a.confidence())
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.rule().cmp(&b.rule()))
            .then_with(|| a.source().cmp(b.source()))
            .then_with(|| a.target().cmp(b.target()))
    });
}

/// Suggestion overlay grouped by source note, preserving rank order.
pub fn by_source(suggestions: &[Suggestion]) -> BTreeMap<&str, Vec<&Suggestion>> {
    let mut overlay: BTreeMap<&str, Vec<&Suggestion>> = BTreeMap::new();
    for s in suggestions {
        overlay.entry(s.source()).or_default().push(s);
    }
    overlay
}

/// Lowercased words of at least three characters.
pub(crate) fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 3)
        .map(str::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RulePriority;
    use crate::graph::tests::{build, note};
    use crate::models::LinkKind;

    fn s(src: &str, dst: &str, rule: RulePriority, conf: f64, why: &str) -> Suggestion {
        let kind = match rule {
            RulePriority::OrphanToMoc => LinkKind::Category,
            RulePriority::DailyToThought => LinkKind::Temporal,
            RulePriority::Mention => LinkKind::Entity,
            _ => LinkKind::CrossDomain,
        };
        Suggestion::new(src, dst, kind, rule, conf, why)
    }

    struct Fixed(Vec<Suggestion>);

    impl SuggestionPass for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn run(&self, _ctx: &PassContext<'_>) -> Vec<Suggestion> {
            self.0.clone()
        }
    }

    #[test]
    fn test_rank_confidence_first() {
        let mut list = vec![
            s("a", "b", RulePriority::OrphanToMoc, 0.4, "low"),
            s("z", "y", RulePriority::Mention, 0.9, "high"),
        ];
        rank(&mut list);
        assert_eq!(list[0].confidence(), 0.9);
        assert_eq!(list[0].rule(), RulePriority::Mention);
    }

    #[test]
    fn test_rank_ties_by_rule_then_source() {
        let mut list = vec![
            s("b", "x", RulePriority::Mention, 0.5, ""),
            s("c", "x", RulePriority::ThoughtToGoal, 0.5, ""),
            s("a", "x", RulePriority::Mention, 0.5, ""),
        ];
        rank(&mut list);
        let order: Vec<&str> = list.iter().map(|s| s.source()).collect();
        assert_eq!(order, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_merge_keeps_max_and_priority_lead() {
        let merged = merge(vec![
            s("a", "b", RulePriority::Mention, 0.8, "mentioned twice"),
            s("a", "b", RulePriority::OrphanToMoc, 0.6, "MOC match"),
            s("a", "c", RulePriority::Mention, 0.5, "other"),
        ]);
        assert_eq!(merged.len(), 2);
        let ab = &merged[0];
        assert_eq!(ab.confidence(), 0.8);
        assert_eq!(ab.rule(), RulePriority::OrphanToMoc);
        assert_eq!(ab.kind(), LinkKind::Category);
        assert_eq!(ab.rationale(), "MOC match; mentioned twice");
    }

    #[test]
    fn test_engine_filters_existing_and_self_links() {
        let g = build(vec![
            note("a.md", "[[b]]"),
            note("b.md", ""),
            note("c.md", ""),
        ]);
        let table = DomainTable::default_table();
        let engine = SuggestionEngine::new(&table, SuggestParams::default())
            .unwrap()
            .with_passes(vec![Box::new(Fixed(vec![
                s("a", "b", RulePriority::Mention, 0.9, "exists"),
                s("a", "a", RulePriority::Mention, 0.9, "self"),
                s("a", "missing", RulePriority::Mention, 0.9, "no such note"),
                s("a", "c", RulePriority::Mention, 0.5, "new"),
            ]))]);
        let out = engine.suggest(&g);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].target(), "c");
    }

    #[test]
    fn test_engine_truncates() {
        let g = build(vec![note("a.md", ""), note("b.md", ""), note("c.md", "")]);
        let table = DomainTable::default_table();
        let params = SuggestParams {
            max_suggestions: 1,
            ..Default::default()
        };
        let engine = SuggestionEngine::new(&table, params)
            .unwrap()
            .with_passes(vec![Box::new(Fixed(vec![
                s("a", "b", RulePriority::Mention, 0.4, ""),
                s("a", "c", RulePriority::Mention, 0.7, ""),
            ]))]);
        let out = engine.suggest(&g);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].target(), "c");
    }

    #[test]
    fn test_invalid_params_rejected() {
        let table = DomainTable::default_table();
        let params = SuggestParams {
            bridge_threshold: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            SuggestionEngine::new(&table, params),
            Err(CoreError::InvalidParameter { name: "bridge_threshold", .. })
        ));
        let params = SuggestParams {
            entity_confidence_cap: 0.0,
            ..Default::default()
        };
        assert!(SuggestionEngine::new(&table, params).is_err());
    }

    #[test]
    fn test_deterministic_across_runs() {
        let notes = || {
            vec![
                note("daily/2024-01-01.md", "Thinking about Compiler work with @ann #rust"),
                note("thoughts/ideas/Compiler.md", "---\ndate: 2024-01-02\n---\n#rust ideas"),
                note("thoughts/ideas/Parser.md", "Compiler front end"),
                note("goals/Ship Compiler.md", "compiler"),
                note("projects/rust.md", ""),
                note("people/ann.md", ""),
                note("MOC/Ideas MOC.md", ""),
            ]
        };
        let table = DomainTable::default_table();
        let engine = SuggestionEngine::new(&table, SuggestParams::default()).unwrap();
        let first = engine.suggest(&build(notes()));
        let second = engine.suggest(&build(notes()));
        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn test_by_source_overlay() {
        let list = vec![
            s("b", "x", RulePriority::Mention, 0.9, ""),
            s("a", "x", RulePriority::Mention, 0.8, ""),
            s("b", "y", RulePriority::Mention, 0.7, ""),
        ];
        let overlay = by_source(&list);
        assert_eq!(overlay.keys().copied().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(overlay["b"].len(), 2);
        assert_eq!(overlay["b"][0].target(), "x");
    }

    #[test]
    fn test_tokens() {
        assert_eq!(tokens("Ship the Compiler-v2 at"), vec!["ship", "the", "compiler"]);
    }
}
