//! Core data models used throughout vault-graph.
//!
//! These types represent the notes, links, suggestions, and diagnostics
//! that flow from the note store through the graph and suggestion engine.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::domain::{DomainTable, RulePriority};
use crate::frontmatter::Frontmatter;

/// Path-derived note identifier: the vault-relative path without the
/// `.md` extension, always `/`-separated (e.g. `thoughts/ideas/rust-tips`).
pub type NoteId = String;

/// A single note from the vault snapshot.
#[derive(Debug, Clone)]
pub struct Note {
    pub id: NoteId,
    /// File stem; the name wiki-links use.
    pub title: String,
    pub domain: String,
    /// Vault-relative path including the extension.
    pub path: String,
    /// Raw file text, frontmatter included.
    pub body: String,
    pub frontmatter: Frontmatter,
    pub modified: Option<DateTime<Utc>>,
}

impl Note {
    /// Build a note from its vault-relative path and raw text.
    pub fn from_text(
        rel_path: &str,
        body: String,
        modified: Option<DateTime<Utc>>,
        domains: &DomainTable,
    ) -> Self {
        let id = note_id_from_path(rel_path);
        let title = id.rsplit('/').next().unwrap_or(&id).to_string();
        let domain = domains.classify(&id);
        let frontmatter = Frontmatter::parse(&body);
        Self {
            id,
            title,
            domain,
            path: rel_path.replace('\\', "/"),
            body,
            frontmatter,
            modified,
        }
    }

    /// Every name this note answers to: its title, a frontmatter `title`
    /// if different, and frontmatter `aliases`.
    pub fn names(&self) -> Vec<String> {
        let mut names = vec![self.title.clone()];
        if let Some(t) = self.frontmatter.scalar("title") {
            if !t.eq_ignore_ascii_case(&self.title) && !t.is_empty() {
                names.push(t.to_string());
            }
        }
        for alias in self.frontmatter.list("aliases") {
            if !names.iter().any(|n| n.eq_ignore_ascii_case(&alias)) {
                names.push(alias);
            }
        }
        names
    }

    /// The date this note is about: frontmatter `date`/`created`, else a
    /// `YYYY-MM-DD` title.
    pub fn declared_date(&self) -> Option<NaiveDate> {
        ["date", "created"]
            .iter()
            .filter_map(|key| self.frontmatter.scalar(key))
            .find_map(parse_date_prefix)
            .or_else(|| parse_date_prefix(&self.title))
    }
}

/// Derive a [`NoteId`] from a vault-relative path.
pub fn note_id_from_path(rel_path: &str) -> NoteId {
    let normalized = rel_path.replace('\\', "/");
    let trimmed = normalized.trim_start_matches("./");
    match trimmed.strip_suffix(".md") {
        Some(stem) => stem.to_string(),
        None => trimmed.to_string(),
    }
}

/// Parse a leading `YYYY-MM-DD` (so `2024-03-01T10:00` works too).
pub fn parse_date_prefix(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    let head = s.get(..10)?;
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

/// Kind of a link. Only `Explicit` links exist in note text. Every other
/// kind names the pass that suggested the link; once applied it is explicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkKind {
    Explicit,
    Entity,
    Category,
    Temporal,
    CrossDomain,
}

impl LinkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkKind::Explicit => "explicit",
            LinkKind::Entity => "entity",
            LinkKind::Category => "category",
            LinkKind::Temporal => "temporal",
            LinkKind::CrossDomain => "cross-domain",
        }
    }
}

/// A directed edge between two notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub source: NoteId,
    pub target: NoteId,
    pub kind: LinkKind,
}

/// A proposed, unapplied link.
///
/// Suggestions are value objects: the engine creates them and nothing
/// mutates them afterwards. Merging produces a new value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    link: Link,
    rationale: String,
    confidence: f64,
    rule: RulePriority,
}

impl Suggestion {
    /// Create a suggestion. Confidence is clamped to `[0.0, 1.0]`.
    pub fn new(
        source: impl Into<NoteId>,
        target: impl Into<NoteId>,
        kind: LinkKind,
        rule: RulePriority,
        confidence: f64,
        rationale: impl Into<String>,
    ) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self {
            link: Link {
                source: source.into(),
                target: target.into(),
                kind,
            },
            rationale: rationale.into(),
            confidence,
            rule,
        }
    }

    pub fn source(&self) -> &str {
        &self.link.source
    }

    pub fn target(&self) -> &str {
        &self.link.target
    }

    pub fn kind(&self) -> LinkKind {
        self.link.kind
    }

    pub fn link(&self) -> &Link {
        &self.link
    }

    pub fn rationale(&self) -> &str {
        &self.rationale
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn rule(&self) -> RulePriority {
        self.rule
    }
}

/// Why a span of note text was skipped by the link parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WarningReason {
    UnclosedLink,
    EmptyLinkTarget,
}

impl WarningReason {
    pub fn describe(&self) -> &'static str {
        match self {
            WarningReason::UnclosedLink => "unclosed [[ link",
            WarningReason::EmptyLinkTarget => "empty link target",
        }
    }
}

/// Malformed link syntax in one note. Non-fatal; the span is excluded
/// from the note's links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseWarning {
    /// Filled in by the graph builder; empty straight out of the parser.
    pub note: NoteId,
    pub line: usize,
    pub excerpt: String,
    pub reason: WarningReason,
}

/// A link whose target is not in the snapshot. Data, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DanglingReference {
    pub source: NoteId,
    pub target: String,
}

/// A link name that several notes answer to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AmbiguousTitle {
    pub name: String,
    pub candidates: Vec<NoteId>,
    /// The candidate links resolve to (smallest id).
    pub resolved_to: NoteId,
}

/// Non-fatal findings collected while building the graph.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    pub parse_warnings: Vec<ParseWarning>,
    pub dangling: Vec<DanglingReference>,
    pub ambiguous: Vec<AmbiguousTitle>,
}

impl Diagnostics {
    pub fn is_empty(&self) -> bool {
        self.parse_warnings.is_empty() && self.dangling.is_empty() && self.ambiguous.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_id_from_path() {
        assert_eq!(note_id_from_path("daily/2024-01-02.md"), "daily/2024-01-02");
        assert_eq!(note_id_from_path("thoughts\\ideas\\x.md"), "thoughts/ideas/x");
        assert_eq!(note_id_from_path("./root.md"), "root");
    }

    #[test]
    fn test_note_from_text() {
        let domains = DomainTable::default_table();
        let note = Note::from_text(
            "thoughts/ideas/Rust Tips.md",
            "---\naliases: [rt, Rust tricks]\n---\nbody".to_string(),
            None,
            &domains,
        );
        assert_eq!(note.id, "thoughts/ideas/Rust Tips");
        assert_eq!(note.title, "Rust Tips");
        assert_eq!(note.domain, "thoughts/ideas");
        assert_eq!(note.names(), vec!["Rust Tips", "rt", "Rust tricks"]);
    }

    #[test]
    fn test_declared_date() {
        let domains = DomainTable::default_table();
        let daily = Note::from_text("daily/2024-03-05.md", String::new(), None, &domains);
        assert_eq!(daily.declared_date(), NaiveDate::from_ymd_opt(2024, 3, 5));

        let dated = Note::from_text(
            "thoughts/x.md",
            "---\ncreated: 2024-03-07T09:00\n---\n".to_string(),
            None,
            &domains,
        );
        assert_eq!(dated.declared_date(), NaiveDate::from_ymd_opt(2024, 3, 7));

        let undated = Note::from_text("goals/run.md", String::new(), None, &domains);
        assert_eq!(undated.declared_date(), None);
    }

    #[test]
    fn test_link_kind_names_match_serialized_form() {
        let kinds = [
            LinkKind::Explicit,
            LinkKind::Entity,
            LinkKind::Category,
            LinkKind::Temporal,
            LinkKind::CrossDomain,
        ];
        for kind in kinds {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn test_suggestion_clamps_confidence() {
        let s = Suggestion::new("a", "b", LinkKind::Entity, RulePriority::Mention, 1.7, "r");
        assert_eq!(s.confidence(), 1.0);
        let s = Suggestion::new("a", "b", LinkKind::Entity, RulePriority::Mention, -0.2, "r");
        assert_eq!(s.confidence(), 0.0);
    }
}
