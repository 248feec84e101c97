//! Derived view engine: pure projections over a store snapshot.
//!
//! [`evaluate`] applies filter criteria, a sort spec, and a page spec to a
//! listing collection in a fixed order: base status filter, categorical
//! allow-lists, numeric ranges, boolean exact matches, location substring,
//! free-text terms, urgency. Sorting is stable so ties keep their prior
//! relative order, and pagination is derived from the filtered length.

pub mod stats;

use serde::{Deserialize, Serialize};

use crate::errors::{CoreError, CoreResult, ValidationError, ValidationIssue};
use crate::model::{Listing, ListingStatus, Sex, SizeClass, Species};
use crate::store::Collection;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_PAGE_SIZE: u64 = 25;
pub const MAX_PAGE_SIZE: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Sortable listing attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Name,
    AgeMonths,
    #[default]
    CreatedAt,
    ViewCount,
    FavoriteCount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SortSpec {
    pub key: SortKey,
    pub order: SortOrder,
}

impl SortSpec {
    pub fn new(key: SortKey, order: SortOrder) -> Self {
        Self { key, order }
    }
}

/// Requested page of a derived view. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u64,
    pub page_size: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    pub fn new(page: u64, page_size: u64) -> Self {
        Self { page, page_size }
    }

    /// Reject malformed specs: page and size must be positive, size capped.
    pub fn validate(&self) -> CoreResult<()> {
        let mut issues = Vec::new();
        if self.page == 0 {
            issues.push(ValidationIssue::new("page", "validation.range", "page must be at least 1"));
        }
        if self.page_size == 0 {
            issues.push(ValidationIssue::new(
                "page_size",
                "validation.range",
                "page size must be at least 1",
            ));
        }
        if self.page_size > MAX_PAGE_SIZE {
            issues.push(ValidationIssue::new(
                "page_size",
                "validation.range",
                format!("page size must be at most {MAX_PAGE_SIZE}"),
            ));
        }
        if issues.is_empty() {
            Ok(())
        } else {
            Err(CoreError::Validation(ValidationError::new(issues)))
        }
    }

    #[inline]
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1) * self.page_size
    }
}

/// Structured filter criteria for listings. Empty allow-lists and `None`
/// bounds impose no constraint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListingCriteria {
    pub species: Vec<Species>,
    pub sizes: Vec<SizeClass>,
    pub sexes: Vec<Sex>,
    pub tags: Vec<String>,
    pub age_min: Option<u32>,
    pub age_max: Option<u32>,
    pub vaccinated: Option<bool>,
    pub sterilized: Option<bool>,
    pub special_needs: Option<bool>,
    pub location: Option<String>,
    pub query: Option<String>,
    pub urgent_only: bool,
}

impl ListingCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn with_species(mut self, species: impl IntoIterator<Item = Species>) -> Self {
        self.species = species.into_iter().collect();
        self
    }

    #[inline]
    pub fn with_sizes(mut self, sizes: impl IntoIterator<Item = SizeClass>) -> Self {
        self.sizes = sizes.into_iter().collect();
        self
    }

    #[inline]
    pub fn with_sexes(mut self, sexes: impl IntoIterator<Item = Sex>) -> Self {
        self.sexes = sexes.into_iter().collect();
        self
    }

    #[inline]
    pub fn with_tags<S: Into<String>>(mut self, tags: impl IntoIterator<Item = S>) -> Self {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    #[inline]
    pub fn with_age_range(mut self, min: Option<u32>, max: Option<u32>) -> Self {
        self.age_min = min;
        self.age_max = max;
        self
    }

    #[inline]
    pub fn with_vaccinated(mut self, value: bool) -> Self {
        self.vaccinated = Some(value);
        self
    }

    #[inline]
    pub fn with_sterilized(mut self, value: bool) -> Self {
        self.sterilized = Some(value);
        self
    }

    #[inline]
    pub fn with_special_needs(mut self, value: bool) -> Self {
        self.special_needs = Some(value);
        self
    }

    #[inline]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    #[inline]
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    #[inline]
    pub fn with_urgent_only(mut self, urgent_only: bool) -> Self {
        self.urgent_only = urgent_only;
        self
    }

    fn query_terms(&self) -> Vec<String> {
        self.query
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
            .map(str::to_lowercase)
            .collect()
    }

    fn has_query(&self) -> bool {
        self.query.as_deref().is_some_and(|q| !q.trim().is_empty())
    }
}

/// Whether `listing` satisfies every active predicate of `criteria`.
///
/// Stage order is fixed and observable through short-circuiting only; the
/// result is the AND of all stages.
pub fn matches(listing: &Listing, criteria: &ListingCriteria) -> bool {
    // 1. Base status filter: only available listings unless an explicit
    //    search query makes all statuses eligible.
    if !criteria.has_query() && listing.status != ListingStatus::Available {
        return false;
    }

    // 2. Categorical allow-lists.
    if !criteria.species.is_empty() && !criteria.species.contains(&listing.species) {
        return false;
    }
    if !criteria.sizes.is_empty() && !criteria.sizes.contains(&listing.size) {
        return false;
    }
    if !criteria.sexes.is_empty() && !criteria.sexes.contains(&listing.sex) {
        return false;
    }
    if !criteria.tags.is_empty() {
        let any_tag = listing
            .tags
            .iter()
            .any(|tag| criteria.tags.iter().any(|want| want.eq_ignore_ascii_case(tag)));
        if !any_tag {
            return false;
        }
    }

    // 3. Numeric ranges, inclusive.
    if criteria.age_min.is_some_and(|min| listing.age_months < min) {
        return false;
    }
    if criteria.age_max.is_some_and(|max| listing.age_months > max) {
        return false;
    }

    // 4. Boolean exact matches.
    if criteria.vaccinated.is_some_and(|want| listing.vaccinated != want) {
        return false;
    }
    if criteria.sterilized.is_some_and(|want| listing.sterilized != want) {
        return false;
    }
    if criteria
        .special_needs
        .is_some_and(|want| listing.special_needs.is_some() != want)
    {
        return false;
    }

    // 5. Location substring, case-insensitive, city or region.
    if let Some(location) = criteria.location.as_deref() {
        let needle = location.to_lowercase();
        if !needle.is_empty()
            && !listing.location.city.to_lowercase().contains(&needle)
            && !listing.location.region.to_lowercase().contains(&needle)
        {
            return false;
        }
    }

    // 6. Free text: every term must match at least one field.
    for term in criteria.query_terms() {
        if !text_term_matches(listing, &term) {
            return false;
        }
    }

    // 7. Urgency.
    if criteria.urgent_only && !listing.urgent {
        return false;
    }

    true
}

/// Case-insensitive substring match of one lowercased term against name,
/// breed, species label, description, and tags.
pub fn text_term_matches(listing: &Listing, term: &str) -> bool {
    listing.name.to_lowercase().contains(term)
        || listing.breed.to_lowercase().contains(term)
        || listing.species.label().contains(term)
        || listing.description.to_lowercase().contains(term)
        || listing.tags.iter().any(|tag| tag.to_lowercase().contains(term))
}

/// One page of a derived view, with pagination facts computed from the
/// filtered length rather than the unfiltered collection.
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub total_pages: u64,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

/// Filter, sort, and paginate a listing collection.
pub fn evaluate(
    listings: &Collection<Listing>,
    criteria: &ListingCriteria,
    sort: SortSpec,
    page: PageRequest,
) -> CoreResult<Paginated<Listing>> {
    page.validate()?;

    let mut filtered: Vec<&Listing> = listings.iter().filter(|l| matches(l, criteria)).collect();
    sort_listings(&mut filtered, sort);

    let total = filtered.len() as u64;
    let total_pages = total.div_ceil(page.page_size);
    let start = page.offset().min(total) as usize;
    let end = (page.offset() + page.page_size).min(total) as usize;
    let items = filtered[start..end].iter().map(|l| (*l).clone()).collect();

    Ok(Paginated {
        items,
        total,
        page: page.page,
        page_size: page.page_size,
        total_pages,
        has_next_page: page.page < total_pages,
        has_previous_page: page.page > 1 && total > 0,
    })
}

/// Filtered and sorted ids, unpaginated. Drives the derived search-result
/// id list kept alongside the snapshot.
pub fn evaluate_ids(listings: &Collection<Listing>, criteria: &ListingCriteria, sort: SortSpec) -> Vec<String> {
    let mut filtered: Vec<&Listing> = listings.iter().filter(|l| matches(l, criteria)).collect();
    sort_listings(&mut filtered, sort);
    filtered.into_iter().map(|l| l.id.clone()).collect()
}

fn sort_listings(listings: &mut [&Listing], sort: SortSpec) {
    // Stable sort: ties keep the prior relative order.
    listings.sort_by(|a, b| {
        let ordering = match sort.key {
            SortKey::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            SortKey::AgeMonths => a.age_months.cmp(&b.age_months),
            SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
            SortKey::ViewCount => a.view_count.cmp(&b.view_count),
            SortKey::FavoriteCount => a.favorite_count.cmp(&b.favorite_count),
        };
        match sort.order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn listing(id: &str, name: &str, species: Species, age: u32) -> Listing {
        Listing::new(id, name, species, "user_1", Utc::now()).with_age_months(age)
    }

    #[test]
    fn page_zero_is_rejected() {
        let coll = Collection::from_entities([listing("a", "Rex", Species::Dog, 4)]);
        let err = evaluate(
            &coll,
            &ListingCriteria::new(),
            SortSpec::default(),
            PageRequest::new(0, 10),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn reserved_listings_hidden_without_query() {
        let mut reserved = listing("a", "Rex", Species::Dog, 4);
        reserved.status = ListingStatus::Reserved;
        let criteria = ListingCriteria::new();
        assert!(!matches(&reserved, &criteria));
        let with_query = ListingCriteria::new().with_query("rex");
        assert!(matches(&reserved, &with_query));
    }

    #[test]
    fn all_query_terms_must_match_some_field() {
        let l = listing("a", "Rex", Species::Dog, 4).with_description("gentle giant");
        assert!(matches(&l, &ListingCriteria::new().with_query("rex gentle")));
        assert!(!matches(&l, &ListingCriteria::new().with_query("rex grumpy")));
    }
}
