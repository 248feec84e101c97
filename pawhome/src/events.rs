//! Top-level event reduction.
//!
//! [`reduce`] folds one [`AppEvent`] into an [`AppState`], returning the next
//! state plus [`Intent`]s describing side effects for the embedding shell to
//! carry out (persistence, notifications). The reducer itself performs no IO.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::errors::CoreResult;
use crate::lifecycle::{self, LifecycleEvent};
use crate::model::{AdoptionRequest, Listing, ListingStatus};
use crate::store::Snapshot;
use crate::views::{self, ListingCriteria, PageRequest, SortSpec};

/// The closed set of events the application reduces over.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// A lifecycle transition or sub-record mutation.
    Lifecycle(LifecycleEvent),

    /// Replace the listing collection with a full query result.
    ListingsLoaded { listings: Vec<Listing> },
    /// Merge a partial query result into the loaded listings.
    ListingsMerged { listings: Vec<Listing> },
    ListingRemoved { listing_id: String },
    /// Replace the request collection with a full query result.
    RequestsLoaded { requests: Vec<AdoptionRequest> },

    ListingViewed { listing_id: String },
    ListingFavorited { listing_id: String },

    /// Replace the active filter criteria; resets to page 1.
    FiltersChanged { criteria: ListingCriteria },
    FiltersCleared,
    SortChanged { sort: SortSpec },
    /// Page moves keep criteria and sort; the page spec is validated.
    PageChanged { page: PageRequest },
    /// Fold a free-text query into the active criteria; resets to page 1.
    SearchSubmitted { query: String },
}

/// Side effect requested by the reducer, executed by the embedding shell.
#[derive(Debug, Clone)]
pub enum Intent {
    PersistListing(Listing),
    PersistRequest(AdoptionRequest),
    Notify { recipient_id: String, message: String },
}

/// Derived view settings and the ids they currently select.
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    pub criteria: ListingCriteria,
    pub sort: SortSpec,
    pub page: PageRequest,
    /// Filtered, sorted listing ids; recomputed whenever listings, criteria
    /// or sort change.
    pub result_ids: Vec<String>,
}

impl ViewState {
    fn recompute(&mut self, snapshot: &Snapshot) {
        self.result_ids = views::evaluate_ids(&snapshot.listings, &self.criteria, self.sort);
    }
}

/// Whole application state: the entity snapshot plus derived view state.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub snapshot: Snapshot,
    pub view: ViewState,
}

/// The outcome of reducing one event.
#[derive(Debug, Clone)]
pub struct Reduction {
    pub state: AppState,
    pub intents: Vec<Intent>,
}

/// Reduce one event at the current wall-clock instant.
pub fn reduce(state: &AppState, event: AppEvent) -> CoreResult<Reduction> {
    reduce_at(state, event, Utc::now())
}

/// Reduce one event at an explicit instant.
pub fn reduce_at(state: &AppState, event: AppEvent, now: DateTime<Utc>) -> CoreResult<Reduction> {
    match event {
        AppEvent::Lifecycle(event) => reduce_lifecycle(state, event, now),

        AppEvent::ListingsLoaded { listings } => {
            let snapshot = Snapshot {
                listings: state.snapshot.listings.set_all(listings),
                requests: state.snapshot.requests.clone(),
                stats: state.snapshot.stats,
            };
            Ok(with_snapshot(state, snapshot))
        }
        AppEvent::ListingsMerged { listings } => {
            let snapshot = Snapshot {
                listings: state.snapshot.listings.upsert_many(listings),
                requests: state.snapshot.requests.clone(),
                stats: state.snapshot.stats,
            };
            Ok(with_snapshot(state, snapshot))
        }
        AppEvent::ListingRemoved { listing_id } => {
            // Reserved and adopted listings stay for audit; only available
            // ones may be deleted.
            let removable = state
                .snapshot
                .listings
                .get(&listing_id)
                .is_some_and(|l| l.status == ListingStatus::Available);
            if !removable {
                debug!(%listing_id, "removal skipped for non-available listing");
                return Ok(Reduction {
                    state: state.clone(),
                    intents: Vec::new(),
                });
            }
            let snapshot = Snapshot {
                listings: state.snapshot.listings.remove_one(&listing_id),
                requests: state.snapshot.requests.clone(),
                stats: state.snapshot.stats,
            };
            Ok(with_snapshot(state, snapshot))
        }
        AppEvent::RequestsLoaded { requests } => {
            // Requests do not feed the listing view; no recompute needed.
            let mut next = state.clone();
            next.snapshot.requests = state.snapshot.requests.set_all(requests);
            Ok(Reduction {
                state: next,
                intents: Vec::new(),
            })
        }

        AppEvent::ListingViewed { listing_id } => {
            let snapshot = Snapshot {
                listings: state.snapshot.listings.update_one(&listing_id, |l| l.record_view()),
                requests: state.snapshot.requests.clone(),
                stats: state.snapshot.stats,
            };
            Ok(with_snapshot(state, snapshot))
        }
        AppEvent::ListingFavorited { listing_id } => {
            let snapshot = Snapshot {
                listings: state.snapshot.listings.update_one(&listing_id, |l| l.record_favorite()),
                requests: state.snapshot.requests.clone(),
                stats: state.snapshot.stats,
            };
            Ok(with_snapshot(state, snapshot))
        }

        AppEvent::FiltersChanged { criteria } => {
            let mut next = state.clone();
            next.view.criteria = criteria;
            next.view.page = PageRequest::new(views::DEFAULT_PAGE, next.view.page.page_size);
            next.view.recompute(&next.snapshot);
            debug!(results = next.view.result_ids.len(), "filters changed");
            Ok(Reduction {
                state: next,
                intents: Vec::new(),
            })
        }
        AppEvent::FiltersCleared => {
            let mut next = state.clone();
            next.view.criteria = ListingCriteria::new();
            next.view.page = PageRequest::new(views::DEFAULT_PAGE, next.view.page.page_size);
            next.view.recompute(&next.snapshot);
            Ok(Reduction {
                state: next,
                intents: Vec::new(),
            })
        }
        AppEvent::SortChanged { sort } => {
            let mut next = state.clone();
            next.view.sort = sort;
            next.view.recompute(&next.snapshot);
            Ok(Reduction {
                state: next,
                intents: Vec::new(),
            })
        }
        AppEvent::PageChanged { page } => {
            page.validate()?;
            let mut next = state.clone();
            next.view.page = page;
            Ok(Reduction {
                state: next,
                intents: Vec::new(),
            })
        }
        AppEvent::SearchSubmitted { query } => {
            let mut next = state.clone();
            next.view.criteria = crate::search::compose(&query, &state.view.criteria);
            next.view.page = PageRequest::new(views::DEFAULT_PAGE, next.view.page.page_size);
            next.view.recompute(&next.snapshot);
            debug!(results = next.view.result_ids.len(), "search submitted");
            Ok(Reduction {
                state: next,
                intents: Vec::new(),
            })
        }
    }
}

fn reduce_lifecycle(state: &AppState, event: LifecycleEvent, now: DateTime<Utc>) -> CoreResult<Reduction> {
    let request_id = event_request_id(&event).to_string();
    let notification = notification_for(&state.snapshot, &event);

    let snapshot = lifecycle::apply(&state.snapshot, event, now)?;

    let mut intents = Vec::new();
    if let Some(request) = snapshot.requests.get(&request_id) {
        intents.push(Intent::PersistRequest(request.clone()));
        let listing_id = &request.listing_id;
        let listing_changed = match (state.snapshot.listings.get(listing_id), snapshot.listings.get(listing_id)) {
            (Some(before), Some(after)) => before.status != after.status,
            _ => false,
        };
        if listing_changed && let Some(listing) = snapshot.listings.get(listing_id) {
            intents.push(Intent::PersistListing(listing.clone()));
        }
    }
    if let Some((recipient_id, message)) = notification {
        intents.push(Intent::Notify { recipient_id, message });
    }

    let mut next = AppState {
        snapshot,
        view: state.view.clone(),
    };
    next.view.recompute(&next.snapshot);
    Ok(Reduction { state: next, intents })
}

fn event_request_id(event: &LifecycleEvent) -> &str {
    match event {
        LifecycleEvent::Submit { request } => &request.id,
        LifecycleEvent::Approve { request_id, .. }
        | LifecycleEvent::Reject { request_id, .. }
        | LifecycleEvent::Cancel { request_id, .. }
        | LifecycleEvent::ScheduleMeeting { request_id, .. }
        | LifecycleEvent::RescheduleMeeting { request_id, .. }
        | LifecycleEvent::CancelMeeting { request_id, .. }
        | LifecycleEvent::CompleteMeeting { request_id, .. }
        | LifecycleEvent::UploadDocument { request_id, .. }
        | LifecycleEvent::VerifyDocument { request_id, .. }
        | LifecycleEvent::DeleteDocument { request_id, .. }
        | LifecycleEvent::AddNote { request_id, .. }
        | LifecycleEvent::UpdateNote { request_id, .. }
        | LifecycleEvent::DeleteNote { request_id, .. }
        | LifecycleEvent::StartProcess { request_id }
        | LifecycleEvent::CompletePhase { request_id, .. }
        | LifecycleEvent::ConfirmDelivery { request_id, .. }
        | LifecycleEvent::Complete { request_id, .. }
        | LifecycleEvent::ScheduleFollowUp { request_id, .. }
        | LifecycleEvent::CompleteFollowUp { request_id, .. } => request_id,
    }
}

/// Who to tell about a status change, resolved against the pre-transition
/// snapshot. Sub-record mutations notify nobody.
fn notification_for(snapshot: &Snapshot, event: &LifecycleEvent) -> Option<(String, String)> {
    match event {
        LifecycleEvent::Submit { request } => snapshot.listings.get(&request.listing_id).map(|listing| {
            (
                listing.owner_id.clone(),
                format!("New adoption request for '{}'", listing.name),
            )
        }),
        LifecycleEvent::Approve { request_id, .. } => snapshot.requests.get(request_id).map(|request| {
            (
                request.applicant_id.clone(),
                "Your adoption request was approved".to_string(),
            )
        }),
        LifecycleEvent::Reject { request_id, reason, .. } => snapshot.requests.get(request_id).map(|request| {
            (
                request.applicant_id.clone(),
                format!("Your adoption request was rejected: {reason}"),
            )
        }),
        LifecycleEvent::Cancel { request_id, .. } => snapshot
            .requests
            .get(request_id)
            .and_then(|request| snapshot.listings.get(&request.listing_id))
            .map(|listing| {
                (
                    listing.owner_id.clone(),
                    format!("An adoption request for '{}' was cancelled", listing.name),
                )
            }),
        LifecycleEvent::Complete { request_id, .. } => snapshot.requests.get(request_id).map(|request| {
            (
                request.applicant_id.clone(),
                "Adoption complete. Congratulations!".to_string(),
            )
        }),
        _ => None,
    }
}

fn with_snapshot(state: &AppState, snapshot: Snapshot) -> Reduction {
    let mut next = AppState {
        snapshot,
        view: state.view.clone(),
    };
    next.view.recompute(&next.snapshot);
    Reduction {
        state: next,
        intents: Vec::new(),
    }
}
