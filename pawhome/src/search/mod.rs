//! Search composition over the derived view engine.
//!
//! Free-text search is not a separate code path: [`compose`] folds the query
//! into the structured criteria and the view engine evaluates the combined
//! predicate, so search results always honor active filters.

use std::sync::Arc;

use chrono::{DateTime, Duration};

use crate::cache::clock::Clock;
use crate::errors::CoreResult;
use crate::model::Listing;
use crate::store::Collection;
use crate::views::{self, ListingCriteria, PageRequest, Paginated, SortSpec};

/// Merge a free-text query into filter criteria. A blank query clears any
/// previous one.
pub fn compose(query: &str, criteria: &ListingCriteria) -> ListingCriteria {
    let mut composed = criteria.clone();
    let trimmed = query.trim();
    composed.query = if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    };
    composed
}

/// Build a predicate closing over the composed criteria, for callers that
/// filter listings outside the view engine.
pub fn predicate(query: &str, criteria: &ListingCriteria) -> impl Fn(&Listing) -> bool + use<> {
    let composed = compose(query, criteria);
    move |listing: &Listing| views::matches(listing, &composed)
}

/// Evaluate a free-text search constrained by the active filters.
pub fn search(
    listings: &Collection<Listing>,
    query: &str,
    criteria: &ListingCriteria,
    sort: SortSpec,
    page: PageRequest,
) -> CoreResult<Paginated<Listing>> {
    views::evaluate(listings, &compose(query, criteria), sort, page)
}

/// Deterministic memoization key for one evaluated view. Criteria, sort and
/// page serialize with fixed field order, so equal inputs yield equal keys.
pub fn cache_key(criteria: &ListingCriteria, sort: SortSpec, page: PageRequest) -> String {
    let encoded = serde_json::to_string(&(criteria, sort, page)).unwrap_or_default();
    format!("listings:{encoded}")
}

/// Bounded, debounced history of search queries.
///
/// Rapid re-submissions of the same query within the debounce window are
/// collapsed into one entry; distinct queries always record immediately.
pub struct RecentQueries {
    clock: Arc<dyn Clock>,
    debounce: Duration,
    max_len: usize,
    queries: Vec<String>,
    last_observed: Option<(String, DateTime<chrono::Utc>)>,
}

impl RecentQueries {
    pub fn new(clock: Arc<dyn Clock>, debounce: Duration, max_len: usize) -> Self {
        Self {
            clock,
            debounce,
            max_len,
            queries: Vec::new(),
            last_observed: None,
        }
    }

    /// Record a query. Returns `false` when it was debounced or blank.
    pub fn observe(&mut self, query: &str) -> bool {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return false;
        }
        let now = self.clock.now();
        if let Some((last, at)) = &self.last_observed
            && last == trimmed
            && now - *at < self.debounce
        {
            self.last_observed = Some((trimmed.to_string(), now));
            return false;
        }
        self.last_observed = Some((trimmed.to_string(), now));

        // Move-to-front dedupe, newest first.
        self.queries.retain(|existing| existing != trimmed);
        self.queries.insert(0, trimmed.to_string());
        self.queries.truncate(self.max_len);
        true
    }

    /// Recorded queries, newest first.
    pub fn recent(&self) -> &[String] {
        &self.queries
    }
}
