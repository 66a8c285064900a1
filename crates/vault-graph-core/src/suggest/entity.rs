use crate::domain::RulePriority;
use crate::matcher::MentionKind;
use crate::models::{LinkKind, Suggestion};

use super::{PassContext, SuggestionPass};

/// Links notes to the notes they mention without linking.
///
/// Confidence starts at 0.5 for a single mention and grows by 0.1 for each
/// repeat, up to `entity_confidence_cap`.
pub struct EntityPass;

impl SuggestionPass for EntityPass {
    fn name(&self) -> &'static str {
        "entity"
    }

    fn run(&self, ctx: &PassContext<'_>) -> Vec<Suggestion> {
        let cap = ctx.params.entity_confidence_cap;
        let mut out = Vec::new();

        for note in ctx.graph.notes() {
            for mention in ctx.graph.entities(&note.id) {
                if ctx.graph.has_edge(&note.id, &mention.target) {
                    continue;
                }
                let Some(target) = ctx.graph.note(&mention.target) else {
                    continue;
                };
                let confidence = (0.5 + 0.1 * (mention.count as f64 - 1.0)).min(cap);
                let via: Vec<&str> = mention.kinds.iter().map(describe).collect();
                let rationale = format!(
                    "mentions {} {} time{} ({})",
                    target.title,
                    mention.count,
                    if mention.count == 1 { "" } else { "s" },
                    via.join(", ")
                );
                out.push(Suggestion::new(
                    note.id.clone(),
                    target.id.clone(),
                    LinkKind::Entity,
                    RulePriority::Mention,
                    confidence,
                    rationale,
                ));
            }
        }
        out
    }
}

fn describe(kind: &MentionKind) -> &'static str {
    match kind {
        MentionKind::Person => "@mention",
        MentionKind::Tag => "#tag",
        MentionKind::Title => "title",
        MentionKind::WikiLink => "link",
        MentionKind::Date => "date",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DomainTable;
    use crate::graph::tests::{build, note};
    use crate::suggest::SuggestParams;

    fn run(notes: Vec<crate::models::Note>, params: SuggestParams) -> Vec<Suggestion> {
        let graph = build(notes);
        let domains = DomainTable::default_table();
        EntityPass.run(&PassContext {
            graph: &graph,
            domains: &domains,
            params: &params,
        })
    }

    #[test]
    fn test_confidence_scales_with_count() {
        let out = run(
            vec![
                note("daily/d.md", "@ann\n@ann\n@ann"),
                note("people/ann.md", ""),
                note("projects/Compiler.md", ""),
                note("daily/e.md", "the compiler"),
            ],
            SuggestParams::default(),
        );
        let ann = out.iter().find(|s| s.target() == "people/ann").unwrap();
        assert!((ann.confidence() - 0.7).abs() < 1e-9);
        assert_eq!(ann.rationale(), "mentions ann 3 times (@mention)");
        let compiler = out.iter().find(|s| s.source() == "daily/e").unwrap();
        assert!((compiler.confidence() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_confidence_capped() {
        let body = "@ann ".repeat(20);
        let params = SuggestParams {
            entity_confidence_cap: 0.8,
            ..Default::default()
        };
        let out = run(vec![note("a.md", &body), note("people/ann.md", "")], params);
        assert_eq!(out.len(), 1);
        assert!((out[0].confidence() - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_already_linked_is_skipped() {
        let out = run(
            vec![note("a.md", "[[ann]] and @ann"), note("people/ann.md", "")],
            SuggestParams::default(),
        );
        assert!(out.is_empty());
    }

    #[test]
    fn test_unresolved_sigil_yields_nothing() {
        let out = run(
            vec![note("a.md", "@nobody and #nothing"), note("b.md", "")],
            SuggestParams::default(),
        );
        assert!(out.is_empty());
    }
}
