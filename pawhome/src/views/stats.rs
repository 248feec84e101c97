//! One-pass aggregate statistics over the entity store.
//!
//! Unlike the O(1) counters adjusted by lifecycle transitions, these reports
//! are recomputed from scratch on demand and never hand-mutated.

use std::collections::HashMap;

use serde::Serialize;

use crate::model::{AdoptionRequest, Listing, RequestStatus};
use crate::store::Collection;

/// Frequency histogram preserving first-encounter key order, so ranking
/// ties break deterministically by encounter order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Histogram {
    entries: Vec<(String, u64)>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl Histogram {
    pub fn bump(&mut self, key: &str) {
        match self.index.get(key) {
            Some(&i) => self.entries[i].1 += 1,
            None => {
                self.index.insert(key.to_string(), self.entries.len());
                self.entries.push((key.to_string(), 1));
            }
        }
    }

    pub fn count(&self, key: &str) -> u64 {
        self.index.get(key).map(|&i| self.entries[i].1).unwrap_or(0)
    }

    /// Entries in first-encounter order.
    pub fn entries(&self) -> &[(String, u64)] {
        &self.entries
    }

    /// Keys ranked by descending frequency; ties keep encounter order.
    pub fn ranked(&self) -> Vec<(String, u64)> {
        let mut ranked = self.entries.clone();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
    }

    /// The `n` most frequent keys.
    pub fn top(&self, n: usize) -> Vec<String> {
        self.ranked().into_iter().take(n).map(|(key, _)| key).collect()
    }
}

/// Derived statistics snapshot. Not authoritative: recompute via
/// [`aggregate`] whenever fresh numbers are needed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatsReport {
    pub listings_total: u64,
    pub listings_by_status: Histogram,
    pub listings_by_species: Histogram,
    pub listings_by_city: Histogram,
    pub requests_total: u64,
    pub requests_by_status: Histogram,
    /// `completed / (completed + rejected)`; `None` until either terminal
    /// outcome has occurred.
    pub success_rate: Option<f64>,
    pub tag_frequency: Histogram,
}

impl StatsReport {
    pub fn top_species(&self, n: usize) -> Vec<String> {
        self.listings_by_species.top(n)
    }

    pub fn top_tags(&self, n: usize) -> Vec<String> {
        self.tag_frequency.top(n)
    }
}

/// Walk both collections once and produce the full report.
pub fn aggregate(listings: &Collection<Listing>, requests: &Collection<AdoptionRequest>) -> StatsReport {
    let mut report = StatsReport::default();

    for listing in listings.iter() {
        report.listings_total += 1;
        report.listings_by_status.bump(listing.status.as_str());
        report.listings_by_species.bump(listing.species.label());
        report.listings_by_city.bump(&listing.location.city);
        for tag in &listing.tags {
            report.tag_frequency.bump(tag);
        }
    }

    for request in requests.iter() {
        report.requests_total += 1;
        report.requests_by_status.bump(request.status.as_str());
    }

    let completed = report.requests_by_status.count(RequestStatus::Completed.as_str());
    let rejected = report.requests_by_status.count(RequestStatus::Rejected.as_str());
    if completed + rejected > 0 {
        report.success_rate = Some(completed as f64 / (completed + rejected) as f64);
    }

    report
}
