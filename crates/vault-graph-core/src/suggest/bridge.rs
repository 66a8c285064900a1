use std::collections::BTreeSet;

use crate::domain::{ResolvedRule, RulePriority};
use crate::models::{LinkKind, NoteId, Suggestion};

use super::{tokens, PassContext, SuggestionPass};

const BASE: f64 = 0.3;
const PER_OVERLAP: f64 = 0.1;
const MAX_CONFIDENCE: f64 = 0.6;

/// Proposes links across domain pairs that the configured rules say should
/// be connected but mostly are not.
///
/// For each non-temporal rule and each direction it allows, a writing note
/// counts as connected when any of its explicit links lands in the
/// receiving domain. If the connected share
/// of writers is below `bridge_threshold`, every unconnected writer gets
/// one suggestion: the target note it overlaps with most (shared topics
/// plus shared title words, ties by id). No overlap, no suggestion.
pub struct BridgePass;

impl SuggestionPass for BridgePass {
    fn name(&self) -> &'static str {
        "bridge"
    }

    fn run(&self, ctx: &PassContext<'_>) -> Vec<Suggestion> {
        ctx.domains
            .rules()
            .iter()
            .filter(|r| r.priority != RulePriority::DailyToThought)
            .flat_map(|rule| run_rule(ctx, rule))
            .collect()
    }
}

fn run_rule(ctx: &PassContext<'_>, rule: &ResolvedRule<'_>) -> Vec<Suggestion> {
    rule.direction
        .orient(rule.from, rule.to)
        .into_iter()
        .flat_map(|(writers, receivers)| bridge(ctx, rule, writers, receivers))
        .collect()
}

/// Bridge notes matching `writers` to notes matching `receivers`, measuring
/// connectivity along the same direction the links would be written.
fn bridge(
    ctx: &PassContext<'_>,
    rule: &ResolvedRule<'_>,
    writers: &str,
    receivers: &str,
) -> Vec<Suggestion> {
    let graph = ctx.graph;
    let sources = graph.notes_matching(writers);
    let targets: BTreeSet<&NoteId> = graph
        .notes_matching(receivers)
        .into_iter()
        .filter(|id| !sources.contains(id))
        .collect();
    if sources.is_empty() || targets.is_empty() {
        return Vec::new();
    }

    let unconnected: Vec<&NoteId> = sources
        .iter()
        .copied()
        .filter(|s| !graph.outgoing(s).iter().any(|t| targets.contains(t)))
        .collect();
    let connected = sources.len() - unconnected.len();
    let ratio = connected as f64 / sources.len() as f64;
    if ratio >= ctx.params.bridge_threshold {
        return Vec::new();
    }
    log::debug!(
        "{} -> {}: {}/{} sources linked ({:.2} < {:.2})",
        writers,
        receivers,
        connected,
        sources.len(),
        ratio,
        ctx.params.bridge_threshold
    );

    let mut out = Vec::new();
    for source in unconnected {
        let mut best: Option<(&NoteId, usize)> = None;
        for target in &targets {
            let score = overlap(ctx, source, target);
            if score > 0 && best.map_or(true, |(_, b)| score > b) {
                best = Some((*target, score));
            }
        }
        let Some((target, score)) = best else {
            continue;
        };

        let confidence = (BASE + PER_OVERLAP * score as f64).min(MAX_CONFIDENCE);
        let rationale = format!(
            "{} -> {} under-connected ({}/{} linked); {} shared topic{}",
            writers,
            receivers,
            connected,
            sources.len(),
            score,
            if score == 1 { "" } else { "s" }
        );
        out.push(Suggestion::new(
            source,
            target,
            LinkKind::CrossDomain,
            rule.priority,
            confidence,
            rationale,
        ));
    }
    out
}

/// Shared topics plus shared title words.
fn overlap(ctx: &PassContext<'_>, a: &str, b: &str) -> usize {
    let graph = ctx.graph;
    let topics = match (graph.topics(a), graph.topics(b)) {
        (Some(x), Some(y)) => x.intersection(y).count(),
        _ => 0,
    };
    let title_words = |id: &str| -> BTreeSet<String> {
        graph
            .note(id)
            .map(|n| tokens(&n.title).into_iter().collect())
            .unwrap_or_default()
    };
    topics + title_words(a).intersection(&title_words(b)).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Direction, DomainSpec, DomainTable, LinkingRule};
    use crate::graph::{BuildOptions, GraphBuilder};
    use crate::models::Note;
    use crate::suggest::SuggestParams;

    fn run_with(table: &DomainTable, notes: Vec<(&str, &str)>) -> Vec<Suggestion> {
        let notes: Vec<Note> = notes
            .into_iter()
            .map(|(p, b)| Note::from_text(p, b.to_string(), None, table))
            .collect();
        let graph = GraphBuilder::new(BuildOptions::default()).build(notes);
        let params = SuggestParams::default();
        BridgePass.run(&PassContext {
            graph: &graph,
            domains: table,
            params: &params,
        })
    }

    fn goals_table(direction: Direction) -> DomainTable {
        let mut thoughts = DomainSpec::new("thoughts", "");
        thoughts.rules.push(LinkingRule {
            from: None,
            to: "goals".to_string(),
            direction,
            priority: RulePriority::ThoughtToGoal,
        });
        DomainTable::new(vec![thoughts, DomainSpec::new("goals", "")]).unwrap()
    }

    #[test]
    fn test_under_connected_pair_is_bridged() {
        let out = run_with(
            &goals_table(Direction::Forward),
            vec![
                ("thoughts/marathon training.md", "#running"),
                ("thoughts/other.md", "#cooking"),
                ("goals/Run a marathon.md", "#running"),
                ("goals/Eat well.md", ""),
            ],
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].source(), "thoughts/marathon training");
        assert_eq!(out[0].target(), "goals/Run a marathon");
        // #running plus the title word "marathon"
        assert!((out[0].confidence() - 0.5).abs() < 1e-9);
        assert_eq!(out[0].rule(), RulePriority::ThoughtToGoal);
        assert_eq!(out[0].kind(), LinkKind::CrossDomain);
    }

    #[test]
    fn test_well_connected_pair_is_left_alone() {
        let out = run_with(
            &goals_table(Direction::Forward),
            vec![
                ("thoughts/a.md", "[[g]] #running"),
                ("thoughts/b.md", "#running"),
                ("goals/g.md", "#running"),
            ],
        );
        assert!(out.is_empty());
    }

    #[test]
    fn test_backward_and_both_directions() {
        let notes = vec![("thoughts/t.md", "#x"), ("goals/g.md", "#x")];
        let back = run_with(&goals_table(Direction::Backward), notes.clone());
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].source(), "goals/g");
        assert_eq!(back[0].target(), "thoughts/t");

        let both = run_with(&goals_table(Direction::Both), notes);
        assert_eq!(both.len(), 2);
    }

    #[test]
    fn test_backward_rule_measures_links_it_would_write() {
        // t already links g, but g has no link back to t.
        let notes = vec![("thoughts/t.md", "[[g]] #x"), ("goals/g.md", "#x")];
        let back = run_with(&goals_table(Direction::Backward), notes.clone());
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].source(), "goals/g");
        assert_eq!(back[0].target(), "thoughts/t");
        assert!(back[0].rationale().starts_with("goals -> thoughts"));

        assert!(run_with(&goals_table(Direction::Forward), notes).is_empty());
    }

    #[test]
    fn test_confidence_capped() {
        let out = run_with(
            &goals_table(Direction::Forward),
            vec![
                ("thoughts/t.md", "#a #b #c #d #e"),
                ("goals/g.md", "#a #b #c #d #e"),
            ],
        );
        assert!((out[0].confidence() - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_temporal_rules_are_not_bridged() {
        let out = run_with(
            &DomainTable::new(vec![
                DomainSpec::new("daily", "").with_rule("thoughts", RulePriority::DailyToThought),
                DomainSpec::new("thoughts", ""),
            ])
            .unwrap(),
            vec![("daily/d.md", "#x"), ("thoughts/t.md", "#x")],
        );
        assert!(out.is_empty());
    }
}
