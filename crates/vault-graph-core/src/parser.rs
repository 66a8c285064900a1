//! Link parser: runs the configured [`MentionMatcher`]s over a note body.
//!
//! The parser walks the text line by line, skipping the frontmatter block
//! and fenced code blocks, and hands each line to every matcher in order. Wiki-links become the
//! note's explicit links (de-duplicated case-insensitively, first
//! occurrence wins); everything else is kept as entity mentions for the
//! suggestion engine.
//!
//! Parsing never fails. Malformed spans come back as
//! [`ParseWarning`]s alongside the best-effort results.
//!
//! # Example
//!
//! ```rust
//! use vault_graph_core::parser::LinkParser;
//!
//! let parsed = LinkParser::new().parse("See [[Alpha]], [[alpha|again]] and #rust");
//! assert_eq!(parsed.links.len(), 1);
//! assert_eq!(parsed.links[0].target, "Alpha");
//! assert_eq!(parsed.mentions.len(), 1);
//! ```

use std::collections::HashSet;

use crate::frontmatter::split_frontmatter;
use crate::matcher::{
    DateMatcher, Findings, Mention, MentionKind, MentionMatcher, SigilMatcher, WikiLinkMatcher,
};
use crate::models::ParseWarning;

/// An explicit link as written in the note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikiLink {
    pub target: String,
    pub display: Option<String>,
    pub line: usize,
}

/// Everything the parser extracted from one note body.
#[derive(Debug, Clone, Default)]
pub struct ParsedBody {
    /// Explicit link targets in first-occurrence order, no duplicates.
    pub links: Vec<WikiLink>,
    /// Non-link mentions (people, tags, titles, dates) in text order.
    pub mentions: Vec<Mention>,
    pub warnings: Vec<ParseWarning>,
}

impl ParsedBody {
    /// Number of malformed spans that were skipped.
    pub fn skipped(&self) -> usize {
        self.warnings.len()
    }

    /// Does this body already link to any of `names` (case-insensitive)?
    pub fn links_to_any(&self, names: &[&str]) -> bool {
        self.links
            .iter()
            .any(|l| names.iter().any(|n| l.target.eq_ignore_ascii_case(n)))
    }
}

/// An ordered set of matchers.
pub struct LinkParser {
    matchers: Vec<Box<dyn MentionMatcher>>,
}

impl LinkParser {
    /// Parser with the wiki-link, sigil, and date matchers.
    pub fn new() -> Self {
        Self {
            matchers: vec![
                Box::new(WikiLinkMatcher),
                Box::new(SigilMatcher),
                Box::new(DateMatcher),
            ],
        }
    }

    /// Parser with only the wiki-link matcher.
    pub fn links_only() -> Self {
        Self {
            matchers: vec![Box::new(WikiLinkMatcher)],
        }
    }

    /// Append another matcher.
    pub fn with_matcher(mut self, matcher: Box<dyn MentionMatcher>) -> Self {
        self.matchers.push(matcher);
        self
    }

    pub fn matcher_names(&self) -> Vec<&'static str> {
        self.matchers.iter().map(|m| m.name()).collect()
    }

    pub fn parse(&self, text: &str) -> ParsedBody {
        let mut findings = Findings::default();
        let mut fence: Option<&str> = None;
        let header_lines = split_frontmatter(text).map_or(0, |(yaml, _)| yaml.lines().count() + 2);

        for (idx, line) in text.lines().enumerate().skip(header_lines) {
            let trimmed = line.trim_start();
            if let Some(marker) = fence {
                if trimmed.starts_with(marker) {
                    fence = None;
                }
                continue;
            }
            if trimmed.starts_with("```") {
                fence = Some("```");
                continue;
            }
            if trimmed.starts_with("~~~") {
                fence = Some("~~~");
                continue;
            }

            for matcher in &self.matchers {
                matcher.find(line, idx + 1, &mut findings);
            }
        }

        let mut seen = HashSet::new();
        let mut links = Vec::new();
        let mut mentions = Vec::new();
        for mention in findings.mentions {
            if mention.kind == MentionKind::WikiLink {
                if seen.insert(mention.value.to_lowercase()) {
                    links.push(WikiLink {
                        target: mention.value,
                        display: mention.display,
                        line: mention.line,
                    });
                }
            } else {
                mentions.push(mention);
            }
        }
        mentions.sort_by_key(|m| m.line);

        ParsedBody {
            links,
            mentions,
            warnings: findings.warnings,
        }
    }
}

impl Default for LinkParser {
    fn default() -> Self {
        Self::new()
    }
}
