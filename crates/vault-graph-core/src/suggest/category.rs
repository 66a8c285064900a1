use std::collections::BTreeSet;

use crate::domain::{domain_matches, RulePriority};
use crate::models::{LinkKind, Note, Suggestion};

use super::{PassContext, SuggestionPass};

const FULL_ORPHAN: f64 = 0.75;
const PARTIAL_ORPHAN: f64 = 0.55;
const PER_EXTRA_KEYWORD: f64 = 0.05;
const MAX_CONFIDENCE: f64 = 0.9;

/// Links notes with no outgoing edge into the MOC domain to the MOC whose
/// title best matches the note's domain, folders, and domain keywords.
/// Never invents a target: no match, no suggestion.
pub struct CategoryPass;

impl SuggestionPass for CategoryPass {
    fn name(&self) -> &'static str {
        "category"
    }

    fn run(&self, ctx: &PassContext<'_>) -> Vec<Suggestion> {
        let moc_pattern = ctx.params.moc_domain.as_str();
        let mocs: Vec<(&Note, String)> = ctx
            .graph
            .notes_matching(moc_pattern)
            .into_iter()
            .filter_map(|id| ctx.graph.note(id))
            .map(|n| (n, n.title.to_lowercase()))
            .collect();
        if mocs.is_empty() {
            return Vec::new();
        }

        let mut out = Vec::new();
        for note in ctx.graph.notes() {
            if domain_matches(moc_pattern, &note.domain) {
                continue;
            }
            let linked_to_moc = ctx.graph.outgoing(&note.id).iter().any(|t| {
                ctx.graph
                    .note(t)
                    .map_or(false, |n| domain_matches(moc_pattern, &n.domain))
            });
            if linked_to_moc {
                continue;
            }

            let words = keywords(ctx, note);
            let mut best: Option<(&Note, Vec<&String>)> = None;
            for (moc, title) in &mocs {
                let hits: Vec<&String> = words
                    .iter()
                    .filter(|w| title.contains(w.as_str()))
                    .collect();
                if hits.is_empty() {
                    continue;
                }
                if best.as_ref().map_or(true, |(_, b)| hits.len() > b.len()) {
                    best = Some((*moc, hits));
                }
            }

            let Some((moc, hits)) = best else {
                log::trace!("{}: no MOC matches {:?}", note.id, words);
                continue;
            };
            let base = if ctx.graph.degree(&note.id) == 0 {
                FULL_ORPHAN
            } else {
                PARTIAL_ORPHAN
            };
            let confidence =
                (base + PER_EXTRA_KEYWORD * (hits.len() as f64 - 1.0)).min(MAX_CONFIDENCE);
            let matched: Vec<&str> = hits.iter().map(|h| h.as_str()).collect();
            out.push(Suggestion::new(
                note.id.clone(),
                moc.id.clone(),
                LinkKind::Category,
                RulePriority::OrphanToMoc,
                confidence,
                format!("not in any MOC; '{}' matches {}", moc.title, matched.join(", ")),
            ));
        }
        out
    }
}

/// Lowercased words describing where a note lives: domain segments,
/// folder names, and the owning domain's configured keywords.
fn keywords(ctx: &PassContext<'_>, note: &Note) -> BTreeSet<String> {
    let mut words = BTreeSet::new();
    let folders = note.id.rsplit_once('/').map_or("", |(dir, _)| dir);
    for part in note.domain.split('/').chain(folders.split('/')) {
        words.insert(part.to_lowercase());
    }
    if let Some(spec) = ctx.domains.spec_for(&note.domain) {
        words.extend(spec.keywords.iter().map(|k| k.to_lowercase()));
    }
    words.retain(|w| w.chars().count() >= 3);
    words
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DomainTable;
    use crate::graph::tests::{build, note};
    use crate::suggest::SuggestParams;

    fn run(notes: Vec<Note>) -> Vec<Suggestion> {
        let graph = build(notes);
        let domains = DomainTable::default_table();
        let params = SuggestParams::default();
        CategoryPass.run(&PassContext {
            graph: &graph,
            domains: &domains,
            params: &params,
        })
    }

    #[test]
    fn test_orphan_linked_to_matching_moc() {
        let out = run(vec![
            note("thoughts/ideas/rust.md", ""),
            note("MOC/Ideas MOC.md", ""),
            note("MOC/Goals MOC.md", ""),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].source(), "thoughts/ideas/rust");
        assert_eq!(out[0].target(), "MOC/Ideas MOC");
        assert!((out[0].confidence() - 0.75).abs() < 1e-9);
        assert_eq!(out[0].kind(), LinkKind::Category);
    }

    #[test]
    fn test_no_match_no_suggestion() {
        let out = run(vec![
            note("daily/A.md", "[[B]]"),
            note("thoughts/B.md", ""),
            note("MOC/C.md", ""),
        ]);
        assert!(out.is_empty());
    }

    #[test]
    fn test_matching_moc_for_linked_notes() {
        let out = run(vec![
            note("daily/A.md", "[[B]]"),
            note("thoughts/B.md", ""),
            note("MOC/Daily Journal.md", ""),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].source(), "daily/A");
        // partial orphan, two keywords (daily, journal)
        assert!((out[0].confidence() - 0.6).abs() < 1e-9);
        assert!(out[0].rationale().contains("daily, journal"));
    }

    #[test]
    fn test_note_already_in_moc_skipped() {
        let out = run(vec![
            note("goals/run.md", "[[Goals MOC]]"),
            note("MOC/Goals MOC.md", ""),
        ]);
        assert!(out.is_empty());
    }

    #[test]
    fn test_ties_go_to_smallest_moc_id() {
        let out = run(vec![
            note("projects/x.md", ""),
            note("MOC/projects b.md", ""),
            note("MOC/projects a.md", ""),
        ]);
        assert_eq!(out[0].target(), "MOC/projects a");
    }
}
