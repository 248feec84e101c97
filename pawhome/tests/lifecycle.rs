//! End-to-end tests of the adoption-request lifecycle.
//!
//! These drive full request histories through the reducer and assert the
//! resulting snapshots: statuses, listing side effects, counters, and the
//! audit timeline.

use chrono::{DateTime, Duration, Utc};
use pawhome::lifecycle::{self, LifecycleEvent};
use pawhome::model::{
    AdoptionRequest, DocumentKind, ListingStatus, MeetingOutcome, Party, PhaseKind, Questionnaire, RequestStatus,
};
use pawhome::store::{Collection, Snapshot};
use pawhome::{CoreError, Listing, Species};

// ============================================================================
// Fixtures
// ============================================================================

fn t0() -> DateTime<Utc> {
    Utc::now()
}

fn seeded() -> Snapshot {
    Snapshot {
        listings: Collection::from_entities([
            Listing::new("lst_rex", "Rex", Species::Dog, "owner_1", t0()),
            Listing::new("lst_misu", "Misu", Species::Cat, "owner_2", t0()),
        ]),
        requests: Collection::new(),
        stats: Default::default(),
    }
}

fn request(id: &str, listing_id: &str) -> AdoptionRequest {
    AdoptionRequest::new(id, listing_id, "applicant_1", "owner_1", Questionnaire::default(), t0())
}

fn submit(snapshot: &Snapshot, id: &str, listing_id: &str) -> Snapshot {
    lifecycle::apply(
        snapshot,
        LifecycleEvent::Submit {
            request: request(id, listing_id),
        },
        t0(),
    )
    .unwrap()
}

fn approve(snapshot: &Snapshot, id: &str) -> Snapshot {
    lifecycle::apply(
        snapshot,
        LifecycleEvent::Approve {
            request_id: id.into(),
            actor_id: "owner_1".into(),
            note: None,
        },
        t0(),
    )
    .unwrap()
}

/// Drive one request through the full happy path up to `Approved` with
/// everything completion requires.
fn ready_to_complete(snapshot: &Snapshot, id: &str) -> Snapshot {
    let mut snapshot = approve(&submit(snapshot, id, "lst_rex"), id);
    snapshot = lifecycle::apply(&snapshot, LifecycleEvent::StartProcess { request_id: id.into() }, t0()).unwrap();
    for phase in PhaseKind::REQUIRED {
        snapshot = lifecycle::apply(
            &snapshot,
            LifecycleEvent::CompletePhase {
                request_id: id.into(),
                phase,
                note: None,
            },
            t0(),
        )
        .unwrap();
    }
    for party in [Party::Owner, Party::Applicant] {
        snapshot = lifecycle::apply(
            &snapshot,
            LifecycleEvent::ConfirmDelivery {
                request_id: id.into(),
                party,
            },
            t0(),
        )
        .unwrap();
    }
    snapshot
}

// ============================================================================
// Happy path
// ============================================================================

#[test]
fn full_adoption_runs_submit_to_completed() {
    let snapshot = ready_to_complete(&seeded(), "req_1");
    assert_eq!(snapshot.listings.get("lst_rex").unwrap().status, ListingStatus::Reserved);

    let done = lifecycle::apply(
        &snapshot,
        LifecycleEvent::Complete {
            request_id: "req_1".into(),
            actor_id: "owner_1".into(),
            note: Some("handover went well".into()),
        },
        t0(),
    )
    .unwrap();

    let req = done.requests.get("req_1").unwrap();
    assert_eq!(req.status, RequestStatus::Completed);
    assert_eq!(done.listings.get("lst_rex").unwrap().status, ListingStatus::Adopted);
    assert_eq!(done.stats.total_requests, 1);
    assert_eq!(done.stats.approved_requests, 0);
    assert_eq!(done.stats.completed_adoptions, 1);

    // Timeline records submission, approval, completion, in order.
    let transitions: Vec<RequestStatus> = req.timeline.iter().map(|entry| entry.to).collect();
    assert_eq!(
        transitions,
        [RequestStatus::Pending, RequestStatus::Approved, RequestStatus::Completed]
    );
    assert_eq!(req.timeline[0].from, None);
    assert_eq!(req.timeline[2].from, Some(RequestStatus::Approved));
}

#[test]
fn completion_without_a_process_needs_only_both_confirmations() {
    let mut snapshot = approve(&submit(&seeded(), "req_1", "lst_rex"), "req_1");
    for party in [Party::Owner, Party::Applicant] {
        snapshot = lifecycle::apply(
            &snapshot,
            LifecycleEvent::ConfirmDelivery {
                request_id: "req_1".into(),
                party,
            },
            t0(),
        )
        .unwrap();
    }
    let done = lifecycle::apply(
        &snapshot,
        LifecycleEvent::Complete {
            request_id: "req_1".into(),
            actor_id: "owner_1".into(),
            note: None,
        },
        t0(),
    )
    .unwrap();
    assert_eq!(done.requests.get("req_1").unwrap().status, RequestStatus::Completed);
    assert_eq!(done.listings.get("lst_rex").unwrap().status, ListingStatus::Adopted);
    assert_eq!(done.stats.completed_adoptions, snapshot.stats.completed_adoptions + 1);
    assert_eq!(done.stats.approved_requests, snapshot.stats.approved_requests - 1);
}

#[test]
fn submit_bumps_inquiry_count_and_counters() {
    let snapshot = submit(&seeded(), "req_1", "lst_rex");
    assert_eq!(snapshot.listings.get("lst_rex").unwrap().inquiry_count, 1);
    assert_eq!(snapshot.stats.total_requests, 1);
    assert_eq!(snapshot.stats.pending_requests, 1);
    // Submission alone leaves the listing available.
    assert_eq!(snapshot.listings.get("lst_rex").unwrap().status, ListingStatus::Available);
}

#[test]
fn approve_does_not_touch_the_listing() {
    let snapshot = approve(&submit(&seeded(), "req_1", "lst_rex"), "req_1");
    assert_eq!(snapshot.listings.get("lst_rex").unwrap().status, ListingStatus::Available);
    assert_eq!(snapshot.stats.pending_requests, 0);
    assert_eq!(snapshot.stats.approved_requests, 1);
}

#[test]
fn start_process_reserves_the_listing_once() {
    let snapshot = approve(&submit(&seeded(), "req_1", "lst_rex"), "req_1");
    let started = lifecycle::apply(
        &snapshot,
        LifecycleEvent::StartProcess {
            request_id: "req_1".into(),
        },
        t0(),
    )
    .unwrap();
    assert_eq!(started.listings.get("lst_rex").unwrap().status, ListingStatus::Reserved);

    let again = lifecycle::apply(
        &started,
        LifecycleEvent::StartProcess {
            request_id: "req_1".into(),
        },
        t0(),
    );
    assert!(matches!(again, Err(CoreError::InvalidRequest { .. })));
}

// ============================================================================
// Rejection and cancellation
// ============================================================================

#[test]
fn rejected_request_is_terminal() {
    let snapshot = submit(&seeded(), "req_1", "lst_rex");
    let rejected = lifecycle::apply(
        &snapshot,
        LifecycleEvent::Reject {
            request_id: "req_1".into(),
            actor_id: "owner_1".into(),
            reason: "home not suitable".into(),
            note: None,
        },
        t0(),
    )
    .unwrap();
    assert_eq!(rejected.requests.get("req_1").unwrap().status, RequestStatus::Rejected);
    assert_eq!(rejected.stats.rejected_requests, 1);
    assert_eq!(rejected.stats.pending_requests, 0);

    let err = lifecycle::apply(
        &rejected,
        LifecycleEvent::Approve {
            request_id: "req_1".into(),
            actor_id: "owner_1".into(),
            note: None,
        },
        t0(),
    )
    .unwrap_err();
    match err {
        CoreError::IllegalTransition {
            request_id,
            from,
            attempted,
        } => {
            assert_eq!(request_id, "req_1");
            assert_eq!(from, RequestStatus::Rejected);
            assert_eq!(attempted, "approve");
        }
        other => panic!("expected IllegalTransition, got {other:?}"),
    }
}

#[test]
fn cancelling_an_approved_request_releases_the_reservation() {
    let snapshot = approve(&submit(&seeded(), "req_1", "lst_rex"), "req_1");
    let started = lifecycle::apply(
        &snapshot,
        LifecycleEvent::StartProcess {
            request_id: "req_1".into(),
        },
        t0(),
    )
    .unwrap();
    assert_eq!(started.listings.get("lst_rex").unwrap().status, ListingStatus::Reserved);

    let cancelled = lifecycle::apply(
        &started,
        LifecycleEvent::Cancel {
            request_id: "req_1".into(),
            actor_id: "applicant_1".into(),
            reason: "changed my mind".into(),
        },
        t0(),
    )
    .unwrap();
    assert_eq!(cancelled.requests.get("req_1").unwrap().status, RequestStatus::Cancelled);
    assert_eq!(cancelled.listings.get("lst_rex").unwrap().status, ListingStatus::Available);
    assert_eq!(cancelled.stats.approved_requests, 0);
    assert_eq!(cancelled.stats.cancelled_requests, 1);
}

#[test]
fn cancelling_a_pending_request_adjusts_pending_counter() {
    let snapshot = submit(&seeded(), "req_1", "lst_rex");
    let cancelled = lifecycle::apply(
        &snapshot,
        LifecycleEvent::Cancel {
            request_id: "req_1".into(),
            actor_id: "applicant_1".into(),
            reason: "found another pet".into(),
        },
        t0(),
    )
    .unwrap();
    assert_eq!(cancelled.stats.pending_requests, 0);
    assert_eq!(cancelled.stats.cancelled_requests, 1);
}

// ============================================================================
// Completion guards
// ============================================================================

#[test]
fn completion_requires_both_delivery_confirmations() {
    let mut snapshot = approve(&submit(&seeded(), "req_1", "lst_rex"), "req_1");
    snapshot = lifecycle::apply(
        &snapshot,
        LifecycleEvent::ConfirmDelivery {
            request_id: "req_1".into(),
            party: Party::Owner,
        },
        t0(),
    )
    .unwrap();

    let err = lifecycle::apply(
        &snapshot,
        LifecycleEvent::Complete {
            request_id: "req_1".into(),
            actor_id: "owner_1".into(),
            note: None,
        },
        t0(),
    )
    .unwrap_err();
    assert!(matches!(err, CoreError::InvalidRequest { .. }));
}

#[test]
fn completion_requires_all_phases_when_a_process_exists() {
    let mut snapshot = approve(&submit(&seeded(), "req_1", "lst_rex"), "req_1");
    snapshot = lifecycle::apply(
        &snapshot,
        LifecycleEvent::StartProcess {
            request_id: "req_1".into(),
        },
        t0(),
    )
    .unwrap();
    for party in [Party::Owner, Party::Applicant] {
        snapshot = lifecycle::apply(
            &snapshot,
            LifecycleEvent::ConfirmDelivery {
                request_id: "req_1".into(),
                party,
            },
            t0(),
        )
        .unwrap();
    }
    // Phases untouched.
    let err = lifecycle::apply(
        &snapshot,
        LifecycleEvent::Complete {
            request_id: "req_1".into(),
            actor_id: "owner_1".into(),
            note: None,
        },
        t0(),
    )
    .unwrap_err();
    assert!(matches!(err, CoreError::InvalidRequest { .. }));
}

#[test]
fn submitting_against_a_missing_listing_is_not_found() {
    let err = lifecycle::apply(
        &seeded(),
        LifecycleEvent::Submit {
            request: request("req_1", "lst_ghost"),
        },
        t0(),
    )
    .unwrap_err();
    assert!(matches!(err, CoreError::NotFound { entity_id } if entity_id == "lst_ghost"));
}

#[test]
fn acting_on_a_missing_request_is_not_found() {
    let err = lifecycle::apply(
        &seeded(),
        LifecycleEvent::Approve {
            request_id: "req_ghost".into(),
            actor_id: "owner_1".into(),
            note: None,
        },
        t0(),
    )
    .unwrap_err();
    assert!(matches!(err, CoreError::NotFound { .. }));
}

// ============================================================================
// Meetings, documents, notes
// ============================================================================

#[test]
fn meetings_follow_schedule_reschedule_complete() {
    let snapshot = submit(&seeded(), "req_1", "lst_rex");
    let scheduled = lifecycle::apply(
        &snapshot,
        LifecycleEvent::ScheduleMeeting {
            request_id: "req_1".into(),
            scheduled_for: t0() + Duration::days(2),
            location: "City Shelter".into(),
        },
        t0(),
    )
    .unwrap();
    let meeting_id = scheduled.requests.get("req_1").unwrap().meetings[0].id.clone();
    assert!(meeting_id.starts_with("mtg_"));

    let moved = lifecycle::apply(
        &scheduled,
        LifecycleEvent::RescheduleMeeting {
            request_id: "req_1".into(),
            meeting_id: meeting_id.clone(),
            scheduled_for: t0() + Duration::days(5),
        },
        t0(),
    )
    .unwrap();
    let done = lifecycle::apply(
        &moved,
        LifecycleEvent::CompleteMeeting {
            request_id: "req_1".into(),
            meeting_id: meeting_id.clone(),
            outcome_notes: Some("great match".into()),
        },
        t0(),
    )
    .unwrap();
    let meeting = done.requests.get("req_1").unwrap().meeting(&meeting_id).unwrap();
    assert_eq!(meeting.outcome, MeetingOutcome::Completed);
    assert_eq!(meeting.outcome_notes.as_deref(), Some("great match"));
}

#[test]
fn meetings_are_illegal_once_the_request_is_terminal() {
    let snapshot = submit(&seeded(), "req_1", "lst_rex");
    let rejected = lifecycle::apply(
        &snapshot,
        LifecycleEvent::Reject {
            request_id: "req_1".into(),
            actor_id: "owner_1".into(),
            reason: "no".into(),
            note: None,
        },
        t0(),
    )
    .unwrap();
    let err = lifecycle::apply(
        &rejected,
        LifecycleEvent::ScheduleMeeting {
            request_id: "req_1".into(),
            scheduled_for: t0() + Duration::days(1),
            location: "anywhere".into(),
        },
        t0(),
    )
    .unwrap_err();
    assert!(matches!(err, CoreError::IllegalTransition { attempted: "schedule_meeting", .. }));
}

#[test]
fn documents_upload_verify_delete() {
    let snapshot = submit(&seeded(), "req_1", "lst_rex");
    let uploaded = lifecycle::apply(
        &snapshot,
        LifecycleEvent::UploadDocument {
            request_id: "req_1".into(),
            kind: DocumentKind::VetReference,
        },
        t0(),
    )
    .unwrap();
    let doc_id = uploaded.requests.get("req_1").unwrap().documents[0].id.clone();
    assert!(!uploaded.requests.get("req_1").unwrap().documents[0].verified);

    let verified = lifecycle::apply(
        &uploaded,
        LifecycleEvent::VerifyDocument {
            request_id: "req_1".into(),
            document_id: doc_id.clone(),
        },
        t0(),
    )
    .unwrap();
    assert!(verified.requests.get("req_1").unwrap().document(&doc_id).unwrap().verified);

    let deleted = lifecycle::apply(
        &verified,
        LifecycleEvent::DeleteDocument {
            request_id: "req_1".into(),
            document_id: doc_id.clone(),
        },
        t0(),
    )
    .unwrap();
    assert!(deleted.requests.get("req_1").unwrap().document(&doc_id).is_none());

    let err = lifecycle::apply(
        &deleted,
        LifecycleEvent::VerifyDocument {
            request_id: "req_1".into(),
            document_id: doc_id,
        },
        t0(),
    )
    .unwrap_err();
    assert!(matches!(err, CoreError::NotFound { .. }));
}

#[test]
fn note_edits_touch_only_the_body() {
    let snapshot = submit(&seeded(), "req_1", "lst_rex");
    let added = lifecycle::apply(
        &snapshot,
        LifecycleEvent::AddNote {
            request_id: "req_1".into(),
            author_id: "owner_1".into(),
            body: "first impression: lovely family".into(),
        },
        t0(),
    )
    .unwrap();
    let note = added.requests.get("req_1").unwrap().notes[0].clone();

    let edited = lifecycle::apply(
        &added,
        LifecycleEvent::UpdateNote {
            request_id: "req_1".into(),
            note_id: note.id.clone(),
            body: "second visit confirmed it".into(),
        },
        t0() + Duration::hours(1),
    )
    .unwrap();
    let updated = edited.requests.get("req_1").unwrap().note(&note.id).unwrap();
    assert_eq!(updated.body, "second visit confirmed it");
    assert_eq!(updated.author_id, note.author_id);
    assert_eq!(updated.created_at, note.created_at);
}

// ============================================================================
// Follow-ups
// ============================================================================

#[test]
fn follow_ups_run_after_completion_with_valid_scores() {
    let snapshot = ready_to_complete(&seeded(), "req_1");
    let done = lifecycle::apply(
        &snapshot,
        LifecycleEvent::Complete {
            request_id: "req_1".into(),
            actor_id: "owner_1".into(),
            note: None,
        },
        t0(),
    )
    .unwrap();

    let scheduled = lifecycle::apply(
        &done,
        LifecycleEvent::ScheduleFollowUp {
            request_id: "req_1".into(),
            due_on: t0() + Duration::days(30),
        },
        t0(),
    )
    .unwrap();
    let follow_up_id = scheduled.requests.get("req_1").unwrap().process.as_ref().unwrap().follow_ups[0]
        .id
        .clone();

    let out_of_range = lifecycle::apply(
        &scheduled,
        LifecycleEvent::CompleteFollowUp {
            request_id: "req_1".into(),
            follow_up_id: follow_up_id.clone(),
            wellbeing: 0,
            satisfaction: 6,
            notes: None,
        },
        t0(),
    )
    .unwrap_err();
    assert!(matches!(out_of_range, CoreError::Validation(_)));

    let completed = lifecycle::apply(
        &scheduled,
        LifecycleEvent::CompleteFollowUp {
            request_id: "req_1".into(),
            follow_up_id: follow_up_id.clone(),
            wellbeing: 5,
            satisfaction: 4,
            notes: Some("settled in well".into()),
        },
        t0(),
    )
    .unwrap();
    let follow_up = completed.requests.get("req_1").unwrap().process.as_ref().unwrap().follow_ups[0].clone();
    assert!(follow_up.completed);
    assert_eq!(follow_up.wellbeing, Some(5));
    assert_eq!(follow_up.satisfaction, Some(4));
}

#[test]
fn follow_ups_are_illegal_before_completion() {
    let snapshot = approve(&submit(&seeded(), "req_1", "lst_rex"), "req_1");
    let err = lifecycle::apply(
        &snapshot,
        LifecycleEvent::ScheduleFollowUp {
            request_id: "req_1".into(),
            due_on: t0() + Duration::days(30),
        },
        t0(),
    )
    .unwrap_err();
    assert!(matches!(err, CoreError::IllegalTransition { attempted: "schedule_follow_up", .. }));
}

// ============================================================================
// Purity
// ============================================================================

#[test]
fn apply_leaves_the_input_snapshot_untouched() {
    let snapshot = seeded();
    let before = snapshot.listings.get("lst_rex").unwrap().clone();
    let _next = submit(&snapshot, "req_1", "lst_rex");
    assert_eq!(snapshot.listings.get("lst_rex").unwrap(), &before);
    assert!(snapshot.requests.is_empty());
    assert_eq!(snapshot.stats.total_requests, 0);
}
