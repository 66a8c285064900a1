//! Statistics over a built [`VaultGraph`].
//!
//! Everything here is computed in one pass from a single graph snapshot,
//! so the numbers are consistent with each other and reproducible.

use serde::Serialize;

use crate::graph::VaultGraph;
use crate::models::NoteId;

/// How many entries the most-connected list keeps.
pub const TOP_CONNECTED: usize = 10;

/// A note and its total degree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteDegree {
    pub id: NoteId,
    pub degree: usize,
}

/// Connectivity of one domain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainStats {
    pub domain: String,
    pub notes: usize,
    pub total_degree: usize,
    pub avg_degree: f64,
}

/// Aggregate graph statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphStats {
    pub total_notes: usize,
    pub total_links: usize,
    pub dangling_links: usize,
    /// Notes with no incoming and no outgoing explicit links, in id order.
    pub orphans: Vec<NoteId>,
    /// Top notes by degree, ties by id. The first entry is the most
    /// connected note.
    pub most_connected: Vec<NoteDegree>,
    /// Per-domain connectivity, in domain-name order.
    pub domains: Vec<DomainStats>,
    /// Domain with the lowest average degree (ties by name).
    pub weakest_domain: Option<String>,
}

impl GraphStats {
    /// All notes sharing the maximum degree.
    pub fn top_notes(&self) -> Vec<&NoteId> {
        let Some(first) = self.most_connected.first() else {
            return Vec::new();
        };
        self.most_connected
            .iter()
            .take_while(|n| n.degree == first.degree)
            .map(|n| &n.id)
            .collect()
    }
}

pub fn compute_stats(graph: &VaultGraph) -> GraphStats {
    let mut degrees: Vec<NoteDegree> = graph
        .notes()
        .map(|n| NoteDegree {
            id: n.id.clone(),
            degree: graph.degree(&n.id),
        })
        .collect();

    let orphans: Vec<NoteId> = degrees
        .iter()
        .filter(|d| d.degree == 0)
        .map(|d| d.id.clone())
        .collect();

    let domains: Vec<DomainStats> = graph
        .domains()
        .iter()
        .map(|(domain, ids)| {
            let total_degree: usize = ids.iter().map(|id| graph.degree(id)).sum();
            let notes = ids.len();
            DomainStats {
                domain: domain.clone(),
                notes,
                total_degree,
                avg_degree: if notes == 0 {
                    0.0
                } else {
                    total_degree as f64 / notes as f64
                },
            }
        })
        .collect();

    let weakest_domain = domains
        .iter()
        .min_by(|a, b| {
            a.avg_degree
                .partial_cmp(&b.avg_degree)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.domain.cmp(&b.domain))
        })
        .map(|d| d.domain.clone());

    degrees.sort_by(|a, b| b.degree.cmp(&a.degree).then_with(|| a.id.cmp(&b.id)));
    degrees.truncate(TOP_CONNECTED);

    GraphStats {
        total_notes: graph.note_count(),
        total_links: graph.edge_count(),
        dangling_links: graph.dangling_count(),
        orphans,
        most_connected: degrees,
        domains,
        weakest_domain,
    }
}
