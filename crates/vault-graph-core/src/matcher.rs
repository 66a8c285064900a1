//! Mention matchers.
//!
//! Each matcher recognizes one kind of reference in a single line of note
//! text and appends what it finds to a shared [`Findings`] buffer. The
//! [`LinkParser`](crate::parser::LinkParser) owns an ordered set of them;
//! adding a new mention kind means adding a matcher, not touching the
//! existing ones.
//!
//! | Matcher | Recognizes | Kind |
//! |---------|------------|------|
//! | [`WikiLinkMatcher`] | `[[target]]`, `[[target\|display]]`, `![[embed]]` | `WikiLink` |
//! | [`SigilMatcher`] | `@name`, `#tag` | `Person`, `Tag` |
//! | [`TitleMatcher`] | whole-word mentions of known note names | `Title` |
//! | [`DateMatcher`] | `YYYY-MM-DD` | `Date` |

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use std::collections::HashMap;

use crate::models::{NoteId, ParseWarning, WarningReason};

static SIGIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[\s(\[,;])([@#])([A-Za-z][A-Za-z0-9_/-]*)").expect("valid sigil regex")
});
static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{4}-\d{2}-\d{2})\b").expect("valid date regex"));

const EXCERPT_CHARS: usize = 40;
const TITLE_REGEX_SIZE_LIMIT: usize = 64 << 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MentionKind {
    WikiLink,
    Person,
    Tag,
    Title,
    Date,
}

/// One reference found in note text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mention {
    pub kind: MentionKind,
    /// Link target, sigil name, resolved note id (titles), or ISO date.
    pub value: String,
    /// Display text of an aliased wiki-link.
    pub display: Option<String>,
    /// 1-based line number.
    pub line: usize,
}

impl Mention {
    fn new(kind: MentionKind, value: impl Into<String>, line: usize) -> Self {
        Self {
            kind,
            value: value.into(),
            display: None,
            line,
        }
    }
}

/// Accumulates matcher output for one note.
#[derive(Debug, Default)]
pub struct Findings {
    pub mentions: Vec<Mention>,
    pub warnings: Vec<ParseWarning>,
}

impl Findings {
    fn warn(&mut self, line: usize, excerpt: &str, reason: WarningReason) {
        self.warnings.push(ParseWarning {
            note: NoteId::new(),
            line,
            excerpt: excerpt.chars().take(EXCERPT_CHARS).collect(),
            reason,
        });
    }
}

/// A strategy for finding one kind of mention in a line of text.
pub trait MentionMatcher: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Scan one line (without its terminator) and record findings.
    fn find(&self, line: &str, line_no: usize, out: &mut Findings);
}

/// `[[target]]`, `[[target|display]]`, and `![[embed]]`.
///
/// Heading (`#`) and block (`^`) suffixes are stripped, as is a trailing
/// `.md`. A `[[` with no `]]` on the same line, or with another `[[`
/// before its `]]`, is recorded as a warning and skipped.
pub struct WikiLinkMatcher;

impl MentionMatcher for WikiLinkMatcher {
    fn name(&self) -> &'static str {
        "wikilink"
    }

    fn find(&self, line: &str, line_no: usize, out: &mut Findings) {
        let mut rest = line;
        while let Some(start) = rest.find("[[") {
            let after = &rest[start + 2..];
            let close = after.find("]]");
            let reopen = after.find("[[");

            match close {
                Some(end) if reopen.map_or(true, |r| r > end) => {
                    let inner = &after[..end];
                    match split_wikilink(inner) {
                        WikiTarget::Note { target, display } => {
                            let mut mention = Mention::new(MentionKind::WikiLink, target, line_no);
                            mention.display = display;
                            out.mentions.push(mention);
                        }
                        WikiTarget::SameNote => {}
                        WikiTarget::Empty => {
                            out.warn(line_no, &rest[start..], WarningReason::EmptyLinkTarget)
                        }
                    }
                    rest = &after[end + 2..];
                }
                _ => {
                    out.warn(line_no, &rest[start..], WarningReason::UnclosedLink);
                    rest = after;
                }
            }
        }
    }
}

enum WikiTarget {
    Note {
        target: String,
        display: Option<String>,
    },
    /// `[[#Heading]]`: an anchor inside the same note.
    SameNote,
    Empty,
}

fn split_wikilink(inner: &str) -> WikiTarget {
    if inner.trim().is_empty() {
        return WikiTarget::Empty;
    }
    let (raw_target, display) = match inner.split_once('|') {
        Some((t, d)) => (t, Some(d.trim().to_string()).filter(|d| !d.is_empty())),
        None => (inner, None),
    };
    // Inside Markdown tables the alias pipe is written as `\|`.
    let raw_target = raw_target.trim().trim_end_matches('\\').trim_end();
    if raw_target.is_empty() {
        return WikiTarget::Empty;
    }
    let target = raw_target
        .split(|c: char| c == '#' || c == '^')
        .next()
        .unwrap_or_default()
        .trim();
    let target = target.strip_suffix(".md").unwrap_or(target).trim();
    if target.is_empty() {
        return WikiTarget::SameNote;
    }
    WikiTarget::Note {
        target: target.to_string(),
        display,
    }
}

/// `@person` and `#tag` sigils outside wiki-links. Headings (`# Title`),
/// issue numbers (`#12`), and `[[#Heading]]` anchors are not tags.
pub struct SigilMatcher;

impl MentionMatcher for SigilMatcher {
    fn name(&self) -> &'static str {
        "sigil"
    }

    fn find(&self, line: &str, line_no: usize, out: &mut Findings) {
        let masked = mask_wikilinks(line);
        for caps in SIGIL_RE.captures_iter(&masked) {
            let kind = match &caps[1] {
                "@" => MentionKind::Person,
                _ => MentionKind::Tag,
            };
            let name = caps[2].trim_end_matches(|c: char| c == '/' || c == '-');
            if !name.is_empty() {
                out.mentions.push(Mention::new(kind, name, line_no));
            }
        }
    }
}

/// Whole-word, case-insensitive mentions of known note names.
///
/// Every name of the snapshot is compiled into one alternation, longest
/// names first, so a line is scanned once no matter how many notes exist.
/// The recorded value is the resolved [`NoteId`]. Names shorter than
/// `min_len` characters are ignored. Text inside `[[...]]` and words
/// carrying a `@`/`#` sigil are left to the other matchers.
pub struct TitleMatcher {
    pattern: Option<Regex>,
    owners: HashMap<String, Vec<NoteId>>,
}

impl TitleMatcher {
    /// `names` pairs each note id with every name it answers to.
    pub fn new(names: impl IntoIterator<Item = (NoteId, Vec<String>)>, min_len: usize) -> Self {
        let mut owners: HashMap<String, Vec<NoteId>> = HashMap::new();
        for (id, names) in names {
            for name in names {
                let name = name.trim().to_lowercase();
                if name.chars().count() < min_len {
                    continue;
                }
                let ids = owners.entry(name).or_default();
                if !ids.contains(&id) {
                    ids.push(id.clone());
                }
            }
        }

        let mut ordered: Vec<&String> = owners.keys().collect();
        ordered.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        let alternatives: Vec<String> = ordered.iter().map(|name| word_pattern(name)).collect();

        let pattern = if alternatives.is_empty() {
            None
        } else {
            match RegexBuilder::new(&alternatives.join("|"))
                .size_limit(TITLE_REGEX_SIZE_LIMIT)
                .build()
            {
                Ok(re) => Some(re),
                Err(e) => {
                    log::warn!("title matching disabled: {}", e);
                    None
                }
            }
        };
        Self { pattern, owners }
    }
}

impl MentionMatcher for TitleMatcher {
    fn name(&self) -> &'static str {
        "title"
    }

    fn find(&self, line: &str, line_no: usize, out: &mut Findings) {
        let Some(pattern) = &self.pattern else {
            return;
        };
        let lowered = mask_wikilinks(&line.to_lowercase());
        for m in pattern.find_iter(&lowered) {
            let sigil = lowered[..m.start()]
                .chars()
                .next_back()
                .map_or(false, |c| c == '@' || c == '#');
            if sigil {
                continue;
            }
            for id in self.owners.get(m.as_str()).into_iter().flatten() {
                out.mentions
                    .push(Mention::new(MentionKind::Title, id.clone(), line_no));
            }
        }
    }
}

/// ISO dates (`2024-03-05`). Invalid calendar dates are ignored.
pub struct DateMatcher;

impl MentionMatcher for DateMatcher {
    fn name(&self) -> &'static str {
        "date"
    }

    fn find(&self, line: &str, line_no: usize, out: &mut Findings) {
        for caps in DATE_RE.captures_iter(line) {
            let raw = &caps[1];
            if NaiveDate::parse_from_str(raw, "%Y-%m-%d").is_ok() {
                out.mentions
                    .push(Mention::new(MentionKind::Date, raw, line_no));
            }
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn mask_wikilinks(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut rest = line;
    while let Some(start) = rest.find("[[") {
        let Some(len) = rest[start..].find("]]") else {
            break;
        };
        out.push_str(&rest[..start]);
        out.push(' ');
        rest = &rest[start + len + 2..];
    }
    out.push_str(rest);
    out
}

/// Escaped `name` with word boundaries on its word-character edges.
fn word_pattern(name: &str) -> String {
    let open = if name.chars().next().map_or(false, is_word_char) {
        r"\b"
    } else {
        ""
    };
    let close = if name.chars().next_back().map_or(false, is_word_char) {
        r"\b"
    } else {
        ""
    };
    format!("{}{}{}", open, regex::escape(name), close)
}
