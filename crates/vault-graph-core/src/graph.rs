//! Graph builder: turns a note snapshot into the directed link graph.
//!
//! # Algorithm
//!
//! 1. Sort notes by id and index every name they answer to (title,
//!    frontmatter title, aliases), case-insensitively.
//! 2. Parse every note in parallel. Results are collected in note-id order
//!    so everything downstream is independent of thread scheduling.
//! 3. Resolve each explicit link: exact id (for `folder/note` targets),
//!    then name. Unresolved targets become dangling references; names
//!    shared by several notes resolve to the smallest id and are reported.
//! 4. Resolve entity mentions (`@name`, `#tag`, title mentions) to notes,
//!    dropping the ones that match nothing.
//! 5. Derive reverse adjacency and the domain index from scratch.
//!
//! The graph is rebuilt on every run; nothing is cached between runs.

use chrono::NaiveDate;
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

use crate::domain::domain_matches;
use crate::matcher::{MentionKind, TitleMatcher};
use crate::models::{AmbiguousTitle, DanglingReference, Diagnostics, Note, NoteId};
use crate::parser::{LinkParser, ParsedBody};

/// Tuning for graph assembly, decoupled from application config.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Names shorter than this are not matched as plain-text mentions.
    pub min_title_len: usize,
    /// Domains whose notes win when a `#tag` names several notes.
    pub tag_target_domains: Vec<String>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            min_title_len: 3,
            tag_target_domains: vec!["MOC".to_string(), "projects".to_string()],
        }
    }
}

/// A resolved entity mention: how often a note mentions another one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityMention {
    pub target: NoteId,
    pub count: usize,
    pub kinds: BTreeSet<MentionKind>,
}

/// Outcome of looking a link name up in the snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Unique(NoteId),
    Ambiguous { chosen: NoteId, candidates: Vec<NoteId> },
    Missing,
}

impl Resolution {
    pub fn id(&self) -> Option<&NoteId> {
        match self {
            Resolution::Unique(id) => Some(id),
            Resolution::Ambiguous { chosen, .. } => Some(chosen),
            Resolution::Missing => None,
        }
    }
}

/// Case-insensitive lookup from names and ids to notes.
#[derive(Debug, Clone, Default)]
pub struct NameIndex {
    by_name: BTreeMap<String, BTreeSet<NoteId>>,
    by_id: BTreeMap<String, NoteId>,
}

impl NameIndex {
    pub fn new<'a>(notes: impl IntoIterator<Item = &'a Note>) -> Self {
        let mut index = Self::default();
        for note in notes {
            index.by_id.insert(note.id.to_lowercase(), note.id.clone());
            for name in note.names() {
                index
                    .by_name
                    .entry(name.to_lowercase())
                    .or_default()
                    .insert(note.id.clone());
            }
        }
        index
    }

    /// Resolve a link target as written (`Note`, `folder/Note`).
    pub fn resolve(&self, target: &str) -> Resolution {
        let key = target.trim().to_lowercase();
        if key.contains('/') {
            if let Some(id) = self.by_id.get(&key) {
                return Resolution::Unique(id.clone());
            }
        }
        let name = key.rsplit('/').next().unwrap_or(&key);
        self.resolve_name(name)
    }

    /// Resolve a bare name.
    pub fn resolve_name(&self, name: &str) -> Resolution {
        let Some(ids) = self.by_name.get(&name.trim().to_lowercase()) else {
            return Resolution::Missing;
        };
        let mut iter = ids.iter();
        match (iter.next(), ids.len()) {
            (Some(id), 1) => Resolution::Unique(id.clone()),
            (Some(id), _) => Resolution::Ambiguous {
                chosen: id.clone(),
                candidates: ids.iter().cloned().collect(),
            },
            (None, _) => Resolution::Missing,
        }
    }

    /// All notes answering to `name`.
    pub fn candidates(&self, name: &str) -> Vec<&NoteId> {
        self.by_name
            .get(&name.trim().to_lowercase())
            .map(|ids| ids.iter().collect())
            .unwrap_or_default()
    }
}

/// The built link graph over one snapshot.
#[derive(Debug, Clone, Default)]
pub struct VaultGraph {
    notes: BTreeMap<NoteId, Note>,
    outgoing: BTreeMap<NoteId, Vec<NoteId>>,
    incoming: BTreeMap<NoteId, BTreeSet<NoteId>>,
    dangling_out: BTreeMap<NoteId, usize>,
    domains: BTreeMap<String, BTreeSet<NoteId>>,
    entities: BTreeMap<NoteId, Vec<EntityMention>>,
    topics: BTreeMap<NoteId, BTreeSet<String>>,
    first_dates: BTreeMap<NoteId, NaiveDate>,
    names: NameIndex,
    diagnostics: Diagnostics,
}

impl VaultGraph {
    pub fn note_count(&self) -> usize {
        self.notes.len()
    }

    pub fn notes(&self) -> impl Iterator<Item = &Note> {
        self.notes.values()
    }

    pub fn note(&self, id: &str) -> Option<&Note> {
        self.notes.get(id)
    }

    /// Resolved explicit targets of `id`, in first-occurrence order.
    pub fn outgoing(&self, id: &str) -> &[NoteId] {
        self.outgoing.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Notes that link to `id`, in id order.
    pub fn incoming(&self, id: &str) -> impl Iterator<Item = &NoteId> {
        self.incoming.get(id).into_iter().flatten()
    }

    pub fn in_degree(&self, id: &str) -> usize {
        self.incoming.get(id).map_or(0, BTreeSet::len)
    }

    /// Explicit links out of `id`, dangling ones included.
    pub fn out_degree(&self, id: &str) -> usize {
        self.outgoing(id).len() + self.dangling_out.get(id).copied().unwrap_or(0)
    }

    pub fn degree(&self, id: &str) -> usize {
        self.in_degree(id) + self.out_degree(id)
    }

    pub fn has_edge(&self, source: &str, target: &str) -> bool {
        self.outgoing(source).iter().any(|t| t == target)
    }

    /// Total explicit edges, dangling ones included.
    pub fn edge_count(&self) -> usize {
        self.outgoing.values().map(Vec::len).sum::<usize>() + self.dangling_count()
    }

    pub fn dangling_count(&self) -> usize {
        self.diagnostics.dangling.len()
    }

    /// Domain index: domain name to member ids.
    pub fn domains(&self) -> &BTreeMap<String, BTreeSet<NoteId>> {
        &self.domains
    }

    /// Ids of notes whose domain matches `pattern`, in id order.
    pub fn notes_matching(&self, pattern: &str) -> Vec<&NoteId> {
        let mut ids: Vec<&NoteId> = self
            .domains
            .iter()
            .filter(|(domain, _)| domain_matches(pattern, domain))
            .flat_map(|(_, ids)| ids.iter())
            .collect();
        ids.sort();
        ids
    }

    /// Resolved entity mentions of `id`, in target order.
    pub fn entities(&self, id: &str) -> &[EntityMention] {
        self.entities.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Lowercased topic keys of a note: its own id, everything it links
    /// to or mentions, and its raw `#tag`/`@name` sigils.
    pub fn topics(&self, id: &str) -> Option<&BTreeSet<String>> {
        self.topics.get(id)
    }

    /// First `YYYY-MM-DD` written in the note body.
    pub fn first_date(&self, id: &str) -> Option<NaiveDate> {
        self.first_dates.get(id).copied()
    }

    /// Best date for a note: declared, else first in the body, else the
    /// file's modification time.
    pub fn note_date(&self, id: &str) -> Option<NaiveDate> {
        let note = self.notes.get(id)?;
        note.declared_date()
            .or_else(|| self.first_date(id))
            .or_else(|| note.modified.map(|m| m.date_naive()))
    }

    pub fn names(&self) -> &NameIndex {
        &self.names
    }

    /// Is `title` shared by more than one note?
    pub fn is_ambiguous(&self, title: &str) -> bool {
        self.names.candidates(title).len() > 1
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }
}

/// Builds a [`VaultGraph`] from a note snapshot.
pub struct GraphBuilder {
    options: BuildOptions,
}

impl GraphBuilder {
    pub fn new(options: BuildOptions) -> Self {
        Self { options }
    }

    pub fn build(&self, notes: Vec<Note>) -> VaultGraph {
        let notes: BTreeMap<NoteId, Note> = notes.into_iter().map(|n| (n.id.clone(), n)).collect();
        let names = NameIndex::new(notes.values());

        let titles = TitleMatcher::new(
            notes.values().map(|n| (n.id.clone(), n.names())),
            self.options.min_title_len,
        );
        let parser = LinkParser::new().with_matcher(Box::new(titles));

        let ordered: Vec<&Note> = notes.values().collect();
        let parsed: Vec<(NoteId, ParsedBody)> = ordered
            .par_iter()
            .map(|note| (note.id.clone(), parser.parse(&note.body)))
            .collect();

        let mut graph = VaultGraph {
            names,
            ..Default::default()
        };
        let mut ambiguous: BTreeMap<String, AmbiguousTitle> = BTreeMap::new();

        for (id, body) in parsed {
            let mut targets: Vec<NoteId> = Vec::new();
            let mut dangling: BTreeSet<String> = BTreeSet::new();
            let mut topics: BTreeSet<String> = BTreeSet::new();
            topics.insert(id.to_lowercase());

            for link in &body.links {
                let resolution = graph.names.resolve(&link.target);
                if let Resolution::Ambiguous { chosen, candidates } = &resolution {
                    ambiguous
                        .entry(link.target.to_lowercase())
                        .or_insert_with(|| AmbiguousTitle {
                            name: link.target.clone(),
                            candidates: candidates.clone(),
                            resolved_to: chosen.clone(),
                        });
                }
                match resolution.id() {
                    Some(target) if *target == id => {}
                    Some(target) => {
                        topics.insert(target.to_lowercase());
                        if !targets.contains(target) {
                            targets.push(target.clone());
                        }
                    }
                    None => {
                        topics.insert(link.target.to_lowercase());
                        if dangling.insert(link.target.to_lowercase()) {
                            graph.diagnostics.dangling.push(DanglingReference {
                                source: id.clone(),
                                target: link.target.clone(),
                            });
                        }
                    }
                }
            }

            let mut counts: BTreeMap<NoteId, EntityMention> = BTreeMap::new();
            for mention in &body.mentions {
                let target = match mention.kind {
                    MentionKind::Date => {
                        if let Ok(date) = NaiveDate::parse_from_str(&mention.value, "%Y-%m-%d") {
                            graph.first_dates.entry(id.clone()).or_insert(date);
                        }
                        continue;
                    }
                    MentionKind::Title => Some(mention.value.clone()),
                    MentionKind::Person => {
                        topics.insert(format!("@{}", mention.value.to_lowercase()));
                        graph.names.resolve_name(&mention.value).id().cloned()
                    }
                    MentionKind::Tag => {
                        topics.insert(format!("#{}", mention.value.to_lowercase()));
                        self.resolve_tag(&graph.names, &notes, &mention.value)
                    }
                    MentionKind::WikiLink => None,
                };
                let Some(target) = target else {
                    log::trace!("{}: unresolved {:?} '{}'", id, mention.kind, mention.value);
                    continue;
                };
                if target == id {
                    continue;
                }
                topics.insert(target.to_lowercase());
                let entry = counts.entry(target.clone()).or_insert_with(|| EntityMention {
                    target,
                    count: 0,
                    kinds: BTreeSet::new(),
                });
                entry.count += 1;
                entry.kinds.insert(mention.kind);
            }

            for mut warning in body.warnings {
                log::warn!(
                    "{}:{}: {} ({})",
                    id,
                    warning.line,
                    warning.reason.describe(),
                    warning.excerpt
                );
                warning.note = id.clone();
                graph.diagnostics.parse_warnings.push(warning);
            }

            for target in &targets {
                graph
                    .incoming
                    .entry(target.clone())
                    .or_default()
                    .insert(id.clone());
            }
            if !dangling.is_empty() {
                graph.dangling_out.insert(id.clone(), dangling.len());
            }
            if !counts.is_empty() {
                graph
                    .entities
                    .insert(id.clone(), counts.into_values().collect());
            }
            graph.topics.insert(id.clone(), topics);
            graph.outgoing.insert(id, targets);
        }

        for amb in ambiguous.values() {
            log::warn!(
                "'{}' names {} notes; links resolve to {}",
                amb.name,
                amb.candidates.len(),
                amb.resolved_to
            );
        }
        graph.diagnostics.ambiguous = ambiguous.into_values().collect();

        for note in notes.values() {
            graph
                .domains
                .entry(note.domain.clone())
                .or_default()
                .insert(note.id.clone());
        }
        graph.notes = notes;

        log::debug!(
            "graph built: {} notes, {} edges, {} dangling, {} domains",
            graph.note_count(),
            graph.edge_count(),
            graph.dangling_count(),
            graph.domains.len()
        );
        graph
    }

    /// `#tag` resolution: prefer notes in a tag-target domain, then any
    /// note with that name.
    fn resolve_tag(
        &self,
        names: &NameIndex,
        notes: &BTreeMap<NoteId, Note>,
        tag: &str,
    ) -> Option<NoteId> {
        let candidates = names.candidates(tag);
        let preferred = candidates.iter().find(|id| {
            notes.get(id.as_str()).map_or(false, |n| {
                self.options
                    .tag_target_domains
                    .iter()
                    .any(|d| domain_matches(d, &n.domain))
            })
        });
        preferred
            .or_else(|| candidates.first())
            .map(|id| (*id).clone())
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new(BuildOptions::default())
    }
}
