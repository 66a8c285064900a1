//! Batch applier: writes accepted suggestions back into source notes.
//!
//! Each suggestion becomes a `- [[Target]]` line under the source note's
//! `## Related` section. Before every write the file is re-read and
//! re-parsed; if it already links to the target (by title, alias, or id)
//! the suggestion is reported as [`ApplyOutcome::AlreadyPresent`] and the
//! file is left alone, so running the same batch twice leaves the notes
//! byte-identical to running it once.
//!
//! Suggestions are grouped by source note. Groups are applied in parallel;
//! suggestions within a group are applied one after another, so no note is
//! ever written by two threads at once. A failure affects only its own
//! suggestion.

use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use vault_graph_core::edit::{insert_related_link, link_markup};
use vault_graph_core::{LinkParser, Note, Suggestion};

use crate::pipeline::Analysis;
use crate::store::read_note;

/// Which suggestions to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    All,
    /// Positions in the ranked suggestion list; duplicates are ignored.
    Indices(Vec<usize>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "kebab-case")]
pub enum ApplyOutcome {
    Applied,
    AlreadyPresent,
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplyResult {
    pub index: usize,
    /// Empty when the index did not name a suggestion.
    pub source: String,
    pub target: String,
    /// Wiki-link text inserted (or that would be inserted).
    pub link: String,
    pub outcome: ApplyOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplyReport {
    pub dry_run: bool,
    /// In index order.
    pub results: Vec<ApplyResult>,
}

impl ApplyReport {
    pub fn count(&self, pred: impl Fn(&ApplyOutcome) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.outcome)).count()
    }

    pub fn applied(&self) -> usize {
        self.count(|o| *o == ApplyOutcome::Applied)
    }

    pub fn already_present(&self) -> usize {
        self.count(|o| *o == ApplyOutcome::AlreadyPresent)
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, ApplyOutcome::Failed(_)))
    }
}

/// Apply the selected suggestions from `analysis`.
///
/// With `dry_run`, every check runs but nothing is written; suggestions
/// that would be written are reported as `Applied`.
pub fn apply_suggestions(analysis: &Analysis, selection: &Selection, dry_run: bool) -> ApplyReport {
    let total = analysis.suggestions.len();
    let indices: BTreeSet<usize> = match selection {
        Selection::All => (0..total).collect(),
        Selection::Indices(list) => list.iter().copied().collect(),
    };

    let mut results = Vec::new();
    let mut groups: BTreeMap<&str, Vec<(usize, &Suggestion)>> = BTreeMap::new();
    for index in indices {
        match analysis.suggestions.get(index) {
            Some(s) => groups.entry(s.source()).or_default().push((index, s)),
            None => results.push(ApplyResult {
                index,
                source: String::new(),
                target: String::new(),
                link: String::new(),
                outcome: ApplyOutcome::Failed(format!(
                    "no suggestion #{} (list has {})",
                    index, total
                )),
            }),
        }
    }

    let applier = Applier { analysis, dry_run };
    let applied: Vec<ApplyResult> = groups
        .into_par_iter()
        .flat_map_iter(|(_, group)| {
            group
                .into_iter()
                .map(|(index, s)| applier.apply_one(index, s))
                .collect::<Vec<_>>()
        })
        .collect();
    results.extend(applied);
    results.sort_by_key(|r| r.index);

    ApplyReport { dry_run, results }
}

struct Applier<'a> {
    analysis: &'a Analysis,
    dry_run: bool,
}

impl Applier<'_> {
    fn apply_one(&self, index: usize, s: &Suggestion) -> ApplyResult {
        let graph = &self.analysis.graph;
        let link = graph
            .note(s.target())
            .map(|t| link_markup(&t.title, &t.id, graph.is_ambiguous(&t.title)))
            .unwrap_or_default();

        let outcome = match self.write_link(s, &link) {
            Ok(outcome) => outcome,
            Err(reason) => {
                log::warn!("{} -> {}: {}", s.source(), s.target(), reason);
                ApplyOutcome::Failed(reason)
            }
        };

        ApplyResult {
            index,
            source: s.source().to_string(),
            target: s.target().to_string(),
            link,
            outcome,
        }
    }

    fn write_link(&self, s: &Suggestion, link: &str) -> Result<ApplyOutcome, String> {
        let graph = &self.analysis.graph;
        let source = graph
            .note(s.source())
            .ok_or_else(|| format!("source note '{}' is not in the snapshot", s.source()))?;
        let target = graph
            .note(s.target())
            .ok_or_else(|| format!("target note '{}' is not in the snapshot", s.target()))?;
        let path = self.path_of(source);

        let current = self.reread(source)?;
        if links_to(&current.body, target) {
            log::debug!("{} already links to {}", source.id, target.id);
            return Ok(ApplyOutcome::AlreadyPresent);
        }

        let updated = insert_related_link(&current.body, link);
        if self.dry_run {
            log::info!("would add {} to {}", link, path.display());
            return Ok(ApplyOutcome::Applied);
        }

        std::fs::write(&path, &updated)
            .map_err(|e| format!("failed to write {}: {}", path.display(), e))?;

        let written = self.reread(source)?;
        if !links_to(&written.body, target) {
            return Err(format!(
                "{} does not register as a link after writing {}",
                link,
                path.display()
            ));
        }
        log::info!("added {} to {}", link, path.display());
        Ok(ApplyOutcome::Applied)
    }

    fn path_of(&self, note: &Note) -> PathBuf {
        self.analysis.root.join(&note.path)
    }

    fn reread(&self, note: &Note) -> Result<Note, String> {
        read_note(&self.path_of(note), &note.path, &self.analysis.domains)
            .map_err(|e| format!("{:#}", anyhow::Error::new(e)))
    }
}

/// Does `body` contain an explicit link naming `target`?
fn links_to(body: &str, target: &Note) -> bool {
    let mut names = target.names();
    names.push(target.id.clone());
    let names: Vec<&str> = names.iter().map(String::as_str).collect();
    LinkParser::links_only().parse(body).links_to_any(&names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::pipeline::analyze;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn vault(files: &[(&str, &str)]) -> TempDir {
        let tmp = TempDir::new().unwrap();
        for (rel, body) in files {
            let path = tmp.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, body).unwrap();
        }
        tmp
    }

    fn run(root: &Path) -> Analysis {
        analyze(&Config::default_for(root)).unwrap()
    }

    fn mention_vault() -> TempDir {
        vault(&[
            ("daily/2024-01-01.md", "Lunch with @ann, then @ann again.\n"),
            ("people/ann.md", "Ann\n"),
        ])
    }

    fn index_of(analysis: &Analysis, source: &str, target: &str) -> usize {
        analysis
            .suggestions
            .iter()
            .position(|s| s.source() == source && s.target() == target)
            .unwrap()
    }

    #[test]
    fn test_apply_inserts_related_link() {
        let tmp = mention_vault();
        let analysis = run(tmp.path());
        let i = index_of(&analysis, "daily/2024-01-01", "people/ann");

        let report = apply_suggestions(&analysis, &Selection::Indices(vec![i]), false);
        assert_eq!(report.applied(), 1);
        assert_eq!(report.results[0].link, "[[ann]]");

        let text = fs::read_to_string(tmp.path().join("daily/2024-01-01.md")).unwrap();
        assert_eq!(
            text,
            "Lunch with @ann, then @ann again.\n\n## Related\n\n- [[ann]]\n"
        );
        let again = run(tmp.path());
        assert!(again.graph.has_edge("daily/2024-01-01", "people/ann"));
    }

    #[test]
    fn test_apply_twice_is_byte_identical() {
        let tmp = mention_vault();
        let analysis = run(tmp.path());
        let path = tmp.path().join("daily/2024-01-01.md");

        let first = apply_suggestions(&analysis, &Selection::All, false);
        assert!(first.applied() >= 1);
        let after_first = fs::read(&path).unwrap();

        let second = apply_suggestions(&analysis, &Selection::All, false);
        assert_eq!(second.applied(), 0);
        assert_eq!(second.already_present(), first.applied());
        assert_eq!(fs::read(&path).unwrap(), after_first);
    }

    #[test]
    fn test_same_source_suggestions_share_related_section() {
        let tmp = vault(&[
            ("daily/2024-01-01.md", "Met @ann and @bob.\n"),
            ("people/ann.md", ""),
            ("people/bob.md", ""),
        ]);
        let analysis = run(tmp.path());
        let path = tmp.path().join("daily/2024-01-01.md");

        let first = apply_suggestions(&analysis, &Selection::All, false);
        let outcomes: Vec<&ApplyOutcome> = first
            .results
            .iter()
            .filter(|r| r.source == "daily/2024-01-01")
            .map(|r| &r.outcome)
            .collect();
        assert_eq!(outcomes, vec![&ApplyOutcome::Applied, &ApplyOutcome::Applied]);
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "Met @ann and @bob.\n\n## Related\n\n- [[ann]]\n- [[bob]]\n"
        );

        let second = apply_suggestions(&analysis, &Selection::All, false);
        assert_eq!(second.applied(), 0);
        assert_eq!(fs::read_to_string(&path).unwrap(), text);
        let again = run(tmp.path());
        assert!(again.suggestions.iter().all(|s| s.source() != "daily/2024-01-01"));
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let tmp = mention_vault();
        let analysis = run(tmp.path());
        let path = tmp.path().join("daily/2024-01-01.md");
        let before = fs::read(&path).unwrap();

        let report = apply_suggestions(&analysis, &Selection::All, true);
        assert!(report.dry_run);
        assert!(report.applied() >= 1);
        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[test]
    fn test_missing_file_fails_without_aborting_batch() {
        let tmp = vault(&[
            ("daily/2024-01-01.md", "@ann\n"),
            ("daily/2024-01-02.md", "@ann\n"),
            ("people/ann.md", ""),
        ]);
        let analysis = run(tmp.path());
        fs::remove_file(tmp.path().join("daily/2024-01-01.md")).unwrap();

        let report = apply_suggestions(&analysis, &Selection::All, false);
        let gone = report
            .results
            .iter()
            .find(|r| r.source == "daily/2024-01-01")
            .unwrap();
        assert!(matches!(gone.outcome, ApplyOutcome::Failed(_)));
        let kept = report
            .results
            .iter()
            .find(|r| r.source == "daily/2024-01-02" && r.target == "people/ann")
            .unwrap();
        assert_eq!(kept.outcome, ApplyOutcome::Applied);
    }

    #[test]
    fn test_out_of_range_index_is_a_failure() {
        let tmp = mention_vault();
        let analysis = run(tmp.path());
        let report = apply_suggestions(&analysis, &Selection::Indices(vec![999, 999]), false);
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.results[0].index, 999);
    }

    #[test]
    fn test_link_added_since_snapshot_is_already_present() {
        let tmp = mention_vault();
        let analysis = run(tmp.path());
        let path = tmp.path().join("daily/2024-01-01.md");
        fs::write(&path, "Lunch with @ann. See [[people/ann]].\n").unwrap();

        let i = index_of(&analysis, "daily/2024-01-01", "people/ann");
        let report = apply_suggestions(&analysis, &Selection::Indices(vec![i]), false);
        assert_eq!(report.results[0].outcome, ApplyOutcome::AlreadyPresent);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "Lunch with @ann. See [[people/ann]].\n"
        );
    }

    #[test]
    fn test_ambiguous_title_links_by_id() {
        let tmp = vault(&[
            ("daily/2024-01-01.md", "Met @ann twice, @ann.\n"),
            ("people/ann.md", ""),
            ("projects/ann.md", ""),
        ]);
        let analysis = run(tmp.path());
        let report = apply_suggestions(&analysis, &Selection::All, false);
        let row = report
            .results
            .iter()
            .find(|r| r.source == "daily/2024-01-01")
            .unwrap();
        assert_eq!(row.outcome, ApplyOutcome::Applied);
        assert_eq!(row.link, format!("[[{}]]", row.target));
    }

    #[test]
    fn test_appends_to_existing_related_section() {
        let tmp = vault(&[
            (
                "daily/2024-01-01.md",
                "@ann\n\n## Related\n\n- [[Other]]\n\n## Log\n\ntext\n",
            ),
            ("people/ann.md", ""),
        ]);
        let analysis = run(tmp.path());
        let i = index_of(&analysis, "daily/2024-01-01", "people/ann");
        apply_suggestions(&analysis, &Selection::Indices(vec![i]), false);
        assert_eq!(
            fs::read_to_string(tmp.path().join("daily/2024-01-01.md")).unwrap(),
            "@ann\n\n## Related\n\n- [[Other]]\n- [[ann]]\n\n## Log\n\ntext\n"
        );
    }
}
