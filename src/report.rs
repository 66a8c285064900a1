//! Report rendering for the read-only commands.
//!
//! A [`Report`] is assembled from an [`Analysis`] and rendered in one of
//! three formats:
//!
//! - **markdown**: plain text with `[[wiki-links]]`, for pasting into the
//!   vault itself;
//! - **html**: a restricted subset (`<b>`, `<i>`, `<code>` only) for chat
//!   front ends that reject anything richer;
//! - **json**: the full structure via `serde_json`, for scripting.
//!
//! Every report ends with the diagnostics section and the snapshot
//! fingerprint.

use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;
use std::collections::HashMap;
use vault_graph_core::models::Diagnostics;
use vault_graph_core::suggest::by_source;
use vault_graph_core::{GraphStats, LinkKind, NoteId, RulePriority, Suggestion};

use crate::apply::{ApplyOutcome, ApplyReport};
use crate::pipeline::Analysis;

/// Output format for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Markdown,
    Html,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    Analyze,
    Orphans,
    Suggest,
}

/// One ranked suggestion with its position in the list.
#[derive(Debug, Serialize)]
pub struct SuggestionRow<'a> {
    pub index: usize,
    pub source: &'a str,
    pub target: &'a str,
    pub kind: LinkKind,
    pub rule: RulePriority,
    pub confidence: f64,
    pub rationale: &'a str,
}

impl<'a> SuggestionRow<'a> {
    fn new(index: usize, s: &'a Suggestion) -> Self {
        Self {
            index,
            source: s.source(),
            target: s.target(),
            kind: s.kind(),
            rule: s.rule(),
            confidence: s.confidence(),
            rationale: s.rationale(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub kind: ReportKind,
    pub vault: String,
    pub snapshot: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<&'a GraphStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orphans: Option<&'a [NoteId]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<SuggestionRow<'a>>>,
    pub diagnostics: &'a Diagnostics,
    #[serde(skip)]
    ranked: &'a [Suggestion],
}

impl<'a> Report<'a> {
    fn base(kind: ReportKind, analysis: &'a Analysis) -> Self {
        Self {
            kind,
            vault: analysis.root.display().to_string(),
            snapshot: &analysis.fingerprint,
            stats: None,
            orphans: None,
            suggestions: None,
            diagnostics: analysis.graph.diagnostics(),
            ranked: &analysis.suggestions,
        }
    }

    fn rows(analysis: &'a Analysis) -> Vec<SuggestionRow<'a>> {
        analysis
            .suggestions
            .iter()
            .enumerate()
            .map(|(i, s)| SuggestionRow::new(i, s))
            .collect()
    }

    /// Full report: statistics, orphans, and suggestions.
    pub fn analyze(analysis: &'a Analysis) -> Self {
        Self {
            stats: Some(&analysis.stats),
            orphans: Some(analysis.stats.orphans.as_slice()),
            suggestions: Some(Self::rows(analysis)),
            ..Self::base(ReportKind::Analyze, analysis)
        }
    }

    pub fn orphans(analysis: &'a Analysis) -> Self {
        Self {
            orphans: Some(analysis.stats.orphans.as_slice()),
            ..Self::base(ReportKind::Orphans, analysis)
        }
    }

    pub fn suggestions(analysis: &'a Analysis) -> Self {
        Self {
            suggestions: Some(Self::rows(analysis)),
            ..Self::base(ReportKind::Suggest, analysis)
        }
    }

    pub fn render(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(self)? + "\n"),
            OutputFormat::Markdown => Ok(self.render_with(&Markdown)),
            OutputFormat::Html => Ok(self.render_with(&RestrictedHtml)),
        }
    }

    fn render_with(&self, m: &dyn Markup) -> String {
        let mut out: Vec<String> = Vec::new();
        let title = match self.kind {
            ReportKind::Analyze => "Vault Analysis",
            ReportKind::Orphans => "Orphan Notes",
            ReportKind::Suggest => "Link Suggestions",
        };
        out.push(m.title(title));
        out.push(String::new());

        if let Some(stats) = self.stats {
            self.render_stats(m, stats, &mut out);
        }
        if let Some(orphans) = self.orphans {
            out.push(m.heading(&format!("Orphans ({})", orphans.len())));
            if orphans.is_empty() {
                out.push(m.italic("No orphan notes."));
            }
            for id in orphans {
                out.push(m.item(&m.note(id)));
            }
            out.push(String::new());
        }
        if let Some(rows) = &self.suggestions {
            out.push(m.heading(&format!("Suggestions ({})", rows.len())));
            if rows.is_empty() {
                out.push(m.italic("No suggestions."));
            }
            if self.kind == ReportKind::Analyze {
                self.render_grouped(m, &mut out);
            } else {
                for row in rows {
                    out.push(m.item(&suggestion_line(m, row)));
                }
            }
            out.push(String::new());
        }

        self.render_diagnostics(m, &mut out);
        out.push(String::new());
        out.push(format!(
            "{} {}",
            m.bold("Snapshot:"),
            m.code(&self.snapshot[..self.snapshot.len().min(12)])
        ));
        out.join("\n") + "\n"
    }

    fn render_stats(&self, m: &dyn Markup, stats: &GraphStats, out: &mut Vec<String>) {
        out.push(format!("{} {}", m.bold("Notes:"), stats.total_notes));
        out.push(format!(
            "{} {} ({} dangling)",
            m.bold("Links:"),
            stats.total_links,
            stats.dangling_links
        ));
        if let Some(top) = stats.most_connected.first() {
            let tied: Vec<String> = stats.top_notes().into_iter().map(|id| m.note(id)).collect();
            out.push(format!(
                "{} {} ({} link{})",
                m.bold("Most connected:"),
                tied.join(", "),
                top.degree,
                if top.degree == 1 { "" } else { "s" }
            ));
        }
        if let Some(weakest) = &stats.weakest_domain {
            let avg = stats
                .domains
                .iter()
                .find(|d| &d.domain == weakest)
                .map_or(0.0, |d| d.avg_degree);
            out.push(format!(
                "{} {} (avg {:.2})",
                m.bold("Weakest domain:"),
                m.code(weakest),
                avg
            ));
        }
        out.push(String::new());

        out.push(m.heading("Domains"));
        for d in &stats.domains {
            out.push(m.item(&format!(
                "{}: {} note{}, {} links, avg {:.2}",
                m.code(&d.domain),
                d.notes,
                if d.notes == 1 { "" } else { "s" },
                d.total_degree,
                d.avg_degree
            )));
        }
        out.push(String::new());

        if stats.most_connected.len() > 1 {
            out.push(m.heading("Most Connected"));
            for n in &stats.most_connected {
                out.push(m.item(&format!("{} ({})", m.note(&n.id), n.degree)));
            }
            out.push(String::new());
        }
    }

    /// Suggestions grouped under their source note, keeping rank order
    /// and list positions.
    fn render_grouped(&self, m: &dyn Markup, out: &mut Vec<String>) {
        let positions: HashMap<(&str, &str), usize> = self
            .ranked
            .iter()
            .enumerate()
            .map(|(i, s)| ((s.source(), s.target()), i))
            .collect();
        for (source, group) in by_source(self.ranked) {
            out.push(m.bold(&m.note(source)));
            for s in group {
                let index = positions.get(&(s.source(), s.target())).copied().unwrap_or(0);
                out.push(m.item(&format!(
                    "{} {} {} ({}, {:.2}): {}",
                    m.code(&format!("#{}", index)),
                    ARROW,
                    m.note(s.target()),
                    s.kind().as_str(),
                    s.confidence(),
                    m.escape(s.rationale())
                )));
            }
        }
    }

    fn render_diagnostics(&self, m: &dyn Markup, out: &mut Vec<String>) {
        let d = self.diagnostics;
        out.push(m.heading("Diagnostics"));
        if d.is_empty() {
            out.push(m.italic("No issues found."));
            return;
        }
        if !d.parse_warnings.is_empty() {
            out.push(format!("{} {}", m.bold("Malformed links:"), d.parse_warnings.len()));
            for w in &d.parse_warnings {
                out.push(m.item(&format!(
                    "{} line {}: {} {}",
                    m.note(&w.note),
                    w.line,
                    w.reason.describe(),
                    m.code(&w.excerpt)
                )));
            }
        }
        if !d.dangling.is_empty() {
            out.push(format!("{} {}", m.bold("Dangling links:"), d.dangling.len()));
            for r in &d.dangling {
                out.push(m.item(&format!(
                    "{} {} {}",
                    m.note(&r.source),
                    ARROW,
                    m.code(&r.target)
                )));
            }
        }
        if !d.ambiguous.is_empty() {
            out.push(format!("{} {}", m.bold("Ambiguous titles:"), d.ambiguous.len()));
            for a in &d.ambiguous {
                let candidates: Vec<String> = a.candidates.iter().map(|c| m.code(c)).collect();
                out.push(m.item(&format!(
                    "{} matches {}; using {}",
                    m.code(&a.name),
                    candidates.join(", "),
                    m.note(&a.resolved_to)
                )));
            }
        }
    }
}

const ARROW: &str = "→";

/// Per-suggestion results of `vg add`.
pub fn render_apply(report: &ApplyReport, format: OutputFormat) -> Result<String> {
    let m: &dyn Markup = match format {
        OutputFormat::Json => return Ok(serde_json::to_string_pretty(report)? + "\n"),
        OutputFormat::Markdown => &Markdown,
        OutputFormat::Html => &RestrictedHtml,
    };

    let mut out = vec![
        m.title(if report.dry_run {
            "Link Changes (dry run)"
        } else {
            "Link Changes"
        }),
        String::new(),
    ];
    for r in &report.results {
        let status = match &r.outcome {
            ApplyOutcome::Applied if report.dry_run => "would add".to_string(),
            ApplyOutcome::Applied => "added".to_string(),
            ApplyOutcome::AlreadyPresent => "already present".to_string(),
            ApplyOutcome::Failed(reason) => format!("failed: {}", m.escape(reason)),
        };
        let line = if r.source.is_empty() {
            format!("{} {}", m.code(&format!("#{}", r.index)), status)
        } else {
            format!(
                "{} {} {} {}: {}",
                m.code(&format!("#{}", r.index)),
                m.note(&r.source),
                ARROW,
                m.code(&r.link),
                status
            )
        };
        out.push(m.item(&line));
    }
    out.push(String::new());
    out.push(format!(
        "{} {} {}, {} already present, {} failed",
        m.bold("Summary:"),
        report.applied(),
        if report.dry_run { "to add" } else { "added" },
        report.already_present(),
        report.failed()
    ));
    Ok(out.join("\n") + "\n")
}

fn suggestion_line(m: &dyn Markup, row: &SuggestionRow<'_>) -> String {
    format!(
        "{} {} {} {} ({}, {:.2}): {}",
        m.code(&format!("#{}", row.index)),
        m.note(row.source),
        ARROW,
        m.note(row.target),
        row.kind.as_str(),
        row.confidence,
        m.escape(row.rationale)
    )
}

/// Inline formatting for one output flavour. Only `code`, `note`, and
/// `escape` receive raw note data; the other methods wrap text that is
/// already formatted.
trait Markup {
    fn title(&self, text: &str) -> String;
    fn heading(&self, text: &str) -> String;
    fn bold(&self, text: &str) -> String;
    fn italic(&self, text: &str) -> String;
    fn code(&self, text: &str) -> String;
    fn item(&self, text: &str) -> String;
    fn escape(&self, text: &str) -> String;

    /// Reference to a note.
    fn note(&self, id: &str) -> String;
}

struct Markdown;

impl Markup for Markdown {
    fn title(&self, text: &str) -> String {
        format!("# {}", text)
    }
    fn heading(&self, text: &str) -> String {
        format!("## {}", text)
    }
    fn bold(&self, text: &str) -> String {
        format!("**{}**", text)
    }
    fn italic(&self, text: &str) -> String {
        format!("_{}_", text)
    }
    fn code(&self, text: &str) -> String {
        format!("`{}`", text.replace('`', "'"))
    }
    fn item(&self, text: &str) -> String {
        format!("- {}", text)
    }
    fn escape(&self, text: &str) -> String {
        text.to_string()
    }
    fn note(&self, id: &str) -> String {
        format!("[[{}]]", id)
    }
}

struct RestrictedHtml;

impl Markup for RestrictedHtml {
    fn title(&self, text: &str) -> String {
        format!("<b>{}</b>", text)
    }
    fn heading(&self, text: &str) -> String {
        format!("<b>{}</b>", text)
    }
    fn bold(&self, text: &str) -> String {
        format!("<b>{}</b>", text)
    }
    fn italic(&self, text: &str) -> String {
        format!("<i>{}</i>", text)
    }
    fn code(&self, text: &str) -> String {
        format!("<code>{}</code>", html_escape(text))
    }
    fn item(&self, text: &str) -> String {
        format!("• {}", text)
    }
    fn escape(&self, text: &str) -> String {
        html_escape(text)
    }
    fn note(&self, id: &str) -> String {
        format!("<i>{}</i>", html_escape(id))
    }
}

fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
