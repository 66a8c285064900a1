use crate::domain::{ResolvedRule, RulePriority};
use crate::models::{LinkKind, NoteId, Suggestion};

use super::{PassContext, SuggestionPass};

const BASE: f64 = 0.7;
const PER_EXTRA_TOPIC: f64 = 0.05;
const MAX_CONFIDENCE: f64 = 0.9;

/// Links daily notes to thoughts written shortly after them about the same
/// topics.
///
/// Driven by every `daily-to-thought` rule. With `d` the number of days
/// from the daily note to the thought, confidence is the full base inside
/// the window, decays linearly over the following `temporal_decay_days`,
/// and is suppressed past that. Thoughts dated before the daily note and
/// pairs without a shared topic are skipped.
pub struct TemporalPass;

impl SuggestionPass for TemporalPass {
    fn name(&self) -> &'static str {
        "temporal"
    }

    fn run(&self, ctx: &PassContext<'_>) -> Vec<Suggestion> {
        ctx.domains
            .rules()
            .iter()
            .filter(|r| r.priority == RulePriority::DailyToThought)
            .flat_map(|rule| run_rule(ctx, rule))
            .collect()
    }
}

fn run_rule(ctx: &PassContext<'_>, rule: &ResolvedRule<'_>) -> Vec<Suggestion> {
    let graph = ctx.graph;
    let window = i64::from(rule.owner.window_days.unwrap_or(ctx.params.temporal_window_days));
    let decay = i64::from(ctx.params.temporal_decay_days);

    let thoughts: Vec<(&NoteId, chrono::NaiveDate)> = graph
        .notes_matching(rule.to)
        .into_iter()
        .filter_map(|id| graph.note_date(id).map(|d| (id, d)))
        .collect();

    let mut out = Vec::new();
    for daily in graph.notes_matching(rule.from) {
        let Some(day) = graph.note_date(daily) else {
            log::trace!("{}: no date, skipped for temporal links", daily);
            continue;
        };
        let Some(daily_topics) = graph.topics(daily) else {
            continue;
        };

        for (thought, date) in &thoughts {
            if *thought == daily {
                continue;
            }
            let d = (*date - day).num_days();
            if d < 0 || d > window + decay {
                continue;
            }
            let shared = graph
                .topics(thought)
                .map_or(0, |t| t.intersection(daily_topics).count());
            if shared == 0 {
                continue;
            }

            let base = (BASE + PER_EXTRA_TOPIC * (shared as f64 - 1.0)).min(MAX_CONFIDENCE);
            let confidence = if d <= window {
                base
            } else {
                base * (1.0 - (d - window) as f64 / (decay + 1) as f64)
            };
            let rationale = format!(
                "{} shared topic{}, written {} day{} after {}",
                shared,
                if shared == 1 { "" } else { "s" },
                d,
                if d == 1 { "" } else { "s" },
                day
            );
            for (source, target) in rule.direction.orient(daily, thought) {
                out.push(Suggestion::new(
                    source,
                    target,
                    LinkKind::Temporal,
                    RulePriority::DailyToThought,
                    confidence,
                    rationale.clone(),
                ));
            }
        }
    }
    out
}
