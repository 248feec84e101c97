//! Adoption-request lifecycle state machine.
//!
//! [`apply`] is the single reduction entry point: it takes the current
//! snapshot and one [`LifecycleEvent`], checks the transition is legal from
//! the request's current state, and returns a new snapshot with every side
//! effect (request, listing, process, counters, timeline) folded in. On
//! error the input snapshot is untouched.
//!
//! Legal status flow: `Pending → Approved | Rejected | Cancelled` and
//! `Approved → Completed | Cancelled`. `Rejected`, `Cancelled` and
//! `Completed` are terminal.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::errors::{CoreError, CoreResult, ValidationError, ValidationIssue};
use crate::id::{RecordKind, generate_record_id};
use crate::model::{
    AdoptionDocument, AdoptionMeeting, AdoptionProcess, AdoptionRequest, DocumentKind, FollowUp, ListingStatus,
    MeetingOutcome, Party, PhaseKind, RequestNote, RequestStatus, TimelineEntry,
};
use crate::store::Snapshot;

/// The closed set of lifecycle events. Dispatch is an exhaustive match, so
/// adding a variant forces every reducer site to handle it.
#[derive(Debug, Clone)]
pub enum LifecycleEvent {
    /// Create a request in `Pending`; the listing must exist.
    Submit { request: AdoptionRequest },
    Approve {
        request_id: String,
        actor_id: String,
        note: Option<String>,
    },
    Reject {
        request_id: String,
        actor_id: String,
        reason: String,
        note: Option<String>,
    },
    Cancel {
        request_id: String,
        actor_id: String,
        reason: String,
    },
    ScheduleMeeting {
        request_id: String,
        scheduled_for: DateTime<Utc>,
        location: String,
    },
    RescheduleMeeting {
        request_id: String,
        meeting_id: String,
        scheduled_for: DateTime<Utc>,
    },
    CancelMeeting {
        request_id: String,
        meeting_id: String,
    },
    CompleteMeeting {
        request_id: String,
        meeting_id: String,
        outcome_notes: Option<String>,
    },
    UploadDocument {
        request_id: String,
        kind: DocumentKind,
    },
    VerifyDocument {
        request_id: String,
        document_id: String,
    },
    DeleteDocument {
        request_id: String,
        document_id: String,
    },
    AddNote {
        request_id: String,
        author_id: String,
        body: String,
    },
    UpdateNote {
        request_id: String,
        note_id: String,
        body: String,
    },
    DeleteNote {
        request_id: String,
        note_id: String,
    },
    /// Start the post-approval workstream; reserves the listing.
    StartProcess { request_id: String },
    CompletePhase {
        request_id: String,
        phase: PhaseKind,
        note: Option<String>,
    },
    ConfirmDelivery {
        request_id: String,
        party: Party,
    },
    /// `Approved → Completed`; requires both delivery confirmations and,
    /// when a process exists, every required phase complete. Flips the
    /// listing to `Adopted`.
    Complete {
        request_id: String,
        actor_id: String,
        note: Option<String>,
    },
    ScheduleFollowUp {
        request_id: String,
        due_on: DateTime<Utc>,
    },
    CompleteFollowUp {
        request_id: String,
        follow_up_id: String,
        wellbeing: u8,
        satisfaction: u8,
        notes: Option<String>,
    },
}

/// Reduce one lifecycle event against the snapshot.
pub fn apply(snapshot: &Snapshot, event: LifecycleEvent, now: DateTime<Utc>) -> CoreResult<Snapshot> {
    match event {
        LifecycleEvent::Submit { request } => submit(snapshot, request, now),
        LifecycleEvent::Approve {
            request_id,
            actor_id,
            note,
        } => approve(snapshot, &request_id, actor_id, note, now),
        LifecycleEvent::Reject {
            request_id,
            actor_id,
            reason,
            note,
        } => reject(snapshot, &request_id, actor_id, reason, note, now),
        LifecycleEvent::Cancel {
            request_id,
            actor_id,
            reason,
        } => cancel(snapshot, &request_id, actor_id, reason, now),
        LifecycleEvent::ScheduleMeeting {
            request_id,
            scheduled_for,
            location,
        } => schedule_meeting(snapshot, &request_id, scheduled_for, location, now),
        LifecycleEvent::RescheduleMeeting {
            request_id,
            meeting_id,
            scheduled_for,
        } => reschedule_meeting(snapshot, &request_id, &meeting_id, scheduled_for, now),
        LifecycleEvent::CancelMeeting { request_id, meeting_id } => {
            set_meeting_outcome(snapshot, &request_id, &meeting_id, MeetingOutcome::Cancelled, None, now, "cancel_meeting")
        }
        LifecycleEvent::CompleteMeeting {
            request_id,
            meeting_id,
            outcome_notes,
        } => set_meeting_outcome(
            snapshot,
            &request_id,
            &meeting_id,
            MeetingOutcome::Completed,
            outcome_notes,
            now,
            "complete_meeting",
        ),
        LifecycleEvent::UploadDocument { request_id, kind } => upload_document(snapshot, &request_id, kind, now),
        LifecycleEvent::VerifyDocument {
            request_id,
            document_id,
        } => verify_document(snapshot, &request_id, &document_id, now),
        LifecycleEvent::DeleteDocument {
            request_id,
            document_id,
        } => delete_document(snapshot, &request_id, &document_id, now),
        LifecycleEvent::AddNote {
            request_id,
            author_id,
            body,
        } => add_note(snapshot, &request_id, author_id, body, now),
        LifecycleEvent::UpdateNote {
            request_id,
            note_id,
            body,
        } => update_note(snapshot, &request_id, &note_id, body, now),
        LifecycleEvent::DeleteNote { request_id, note_id } => delete_note(snapshot, &request_id, &note_id, now),
        LifecycleEvent::StartProcess { request_id } => start_process(snapshot, &request_id, now),
        LifecycleEvent::CompletePhase {
            request_id,
            phase,
            note,
        } => complete_phase(snapshot, &request_id, phase, note, now),
        LifecycleEvent::ConfirmDelivery { request_id, party } => confirm_delivery(snapshot, &request_id, party, now),
        LifecycleEvent::Complete {
            request_id,
            actor_id,
            note,
        } => complete(snapshot, &request_id, actor_id, note, now),
        LifecycleEvent::ScheduleFollowUp { request_id, due_on } => {
            schedule_follow_up(snapshot, &request_id, due_on, now)
        }
        LifecycleEvent::CompleteFollowUp {
            request_id,
            follow_up_id,
            wellbeing,
            satisfaction,
            notes,
        } => complete_follow_up(snapshot, &request_id, &follow_up_id, wellbeing, satisfaction, notes, now),
    }
}

// ========== Lookup and guard helpers ==========

fn get_request<'a>(snapshot: &'a Snapshot, request_id: &str) -> CoreResult<&'a AdoptionRequest> {
    snapshot.requests.get(request_id).ok_or_else(|| CoreError::NotFound {
        entity_id: request_id.to_string(),
    })
}

fn illegal(request: &AdoptionRequest, attempted: &'static str) -> CoreError {
    CoreError::IllegalTransition {
        request_id: request.id.clone(),
        from: request.status,
        attempted,
    }
}

/// Meetings may only be touched while the parent request is active.
fn ensure_meeting_window(request: &AdoptionRequest, attempted: &'static str) -> CoreResult<()> {
    match request.status {
        RequestStatus::Pending | RequestStatus::Approved => Ok(()),
        _ => Err(illegal(request, attempted)),
    }
}

fn transition_status(
    request: &mut AdoptionRequest,
    to: RequestStatus,
    actor_id: String,
    note: Option<String>,
    now: DateTime<Utc>,
) {
    let from = request.status;
    request.timeline.push(TimelineEntry {
        at: now,
        actor_id,
        from: Some(from),
        to,
        note,
    });
    request.status = to;
    request.updated_at = now;
    debug!(request_id = %request.id, from = %from, to = %to, "request transitioned");
}

// ========== Status transitions ==========

fn submit(snapshot: &Snapshot, mut request: AdoptionRequest, now: DateTime<Utc>) -> CoreResult<Snapshot> {
    if !snapshot.listings.contains(&request.listing_id) {
        return Err(CoreError::NotFound {
            entity_id: request.listing_id.clone(),
        });
    }
    if snapshot.requests.contains(&request.id) {
        return Err(CoreError::invalid(format!("request '{}' already exists", request.id)));
    }

    request.status = RequestStatus::Pending;
    request.updated_at = now;
    request.timeline.push(TimelineEntry {
        at: now,
        actor_id: request.applicant_id.clone(),
        from: None,
        to: RequestStatus::Pending,
        note: None,
    });

    let listing_id = request.listing_id.clone();
    let listings = snapshot.listings.update_one(&listing_id, |listing| listing.record_inquiry());
    let requests = snapshot.requests.add_one(request);
    let mut stats = snapshot.stats;
    stats.total_requests += 1;
    stats.pending_requests += 1;

    Ok(Snapshot {
        listings,
        requests,
        stats,
    })
}

fn approve(
    snapshot: &Snapshot,
    request_id: &str,
    actor_id: String,
    note: Option<String>,
    now: DateTime<Utc>,
) -> CoreResult<Snapshot> {
    let request = get_request(snapshot, request_id)?;
    if request.status != RequestStatus::Pending {
        return Err(illegal(request, "approve"));
    }

    let requests = snapshot
        .requests
        .update_one(request_id, |req| transition_status(req, RequestStatus::Approved, actor_id, note, now));
    let mut stats = snapshot.stats;
    stats.pending_requests = stats.pending_requests.saturating_sub(1);
    stats.approved_requests += 1;

    Ok(Snapshot {
        listings: snapshot.listings.clone(),
        requests,
        stats,
    })
}

fn reject(
    snapshot: &Snapshot,
    request_id: &str,
    actor_id: String,
    reason: String,
    note: Option<String>,
    now: DateTime<Utc>,
) -> CoreResult<Snapshot> {
    let request = get_request(snapshot, request_id)?;
    if request.status != RequestStatus::Pending {
        return Err(illegal(request, "reject"));
    }

    let entry_note = Some(match note {
        Some(note) => format!("{reason}: {note}"),
        None => reason,
    });
    let requests = snapshot
        .requests
        .update_one(request_id, |req| transition_status(req, RequestStatus::Rejected, actor_id, entry_note, now));
    let mut stats = snapshot.stats;
    stats.pending_requests = stats.pending_requests.saturating_sub(1);
    stats.rejected_requests += 1;

    Ok(Snapshot {
        listings: snapshot.listings.clone(),
        requests,
        stats,
    })
}

fn cancel(
    snapshot: &Snapshot,
    request_id: &str,
    actor_id: String,
    reason: String,
    now: DateTime<Utc>,
) -> CoreResult<Snapshot> {
    let request = get_request(snapshot, request_id)?;
    let from = request.status;
    if !matches!(from, RequestStatus::Pending | RequestStatus::Approved) {
        return Err(illegal(request, "cancel"));
    }

    let listing_id = request.listing_id.clone();
    let requests = snapshot
        .requests
        .update_one(request_id, |req| transition_status(req, RequestStatus::Cancelled, actor_id, Some(reason), now));
    let mut stats = snapshot.stats;
    stats.cancelled_requests += 1;
    // Cancelling an approved request releases the reservation.
    let listings = match from {
        RequestStatus::Pending => {
            stats.pending_requests = stats.pending_requests.saturating_sub(1);
            snapshot.listings.clone()
        }
        _ => {
            stats.approved_requests = stats.approved_requests.saturating_sub(1);
            snapshot.listings.update_one(&listing_id, |listing| {
                if listing.status == ListingStatus::Reserved {
                    listing.status = ListingStatus::Available;
                }
            })
        }
    };

    Ok(Snapshot {
        listings,
        requests,
        stats,
    })
}

// ========== Meetings ==========

fn schedule_meeting(
    snapshot: &Snapshot,
    request_id: &str,
    scheduled_for: DateTime<Utc>,
    location: String,
    now: DateTime<Utc>,
) -> CoreResult<Snapshot> {
    let request = get_request(snapshot, request_id)?;
    ensure_meeting_window(request, "schedule_meeting")?;

    let meeting = AdoptionMeeting {
        id: generate_record_id(RecordKind::Meeting),
        scheduled_for,
        location,
        outcome: MeetingOutcome::Pending,
        outcome_notes: None,
    };
    let requests = snapshot.requests.update_one(request_id, |req| {
        req.meetings.push(meeting);
        req.updated_at = now;
    });

    Ok(with_requests(snapshot, requests))
}

fn reschedule_meeting(
    snapshot: &Snapshot,
    request_id: &str,
    meeting_id: &str,
    scheduled_for: DateTime<Utc>,
    now: DateTime<Utc>,
) -> CoreResult<Snapshot> {
    let request = get_request(snapshot, request_id)?;
    ensure_meeting_window(request, "reschedule_meeting")?;
    if request.meeting(meeting_id).is_none() {
        return Err(CoreError::NotFound {
            entity_id: meeting_id.to_string(),
        });
    }

    let meeting_id = meeting_id.to_string();
    let requests = snapshot.requests.update_one(request_id, |req| {
        if let Some(meeting) = req.meeting_mut(&meeting_id) {
            meeting.scheduled_for = scheduled_for;
            meeting.outcome = MeetingOutcome::Pending;
        }
        req.updated_at = now;
    });

    Ok(with_requests(snapshot, requests))
}

fn set_meeting_outcome(
    snapshot: &Snapshot,
    request_id: &str,
    meeting_id: &str,
    outcome: MeetingOutcome,
    outcome_notes: Option<String>,
    now: DateTime<Utc>,
    attempted: &'static str,
) -> CoreResult<Snapshot> {
    let request = get_request(snapshot, request_id)?;
    ensure_meeting_window(request, attempted)?;
    if request.meeting(meeting_id).is_none() {
        return Err(CoreError::NotFound {
            entity_id: meeting_id.to_string(),
        });
    }

    let meeting_id = meeting_id.to_string();
    let requests = snapshot.requests.update_one(request_id, |req| {
        if let Some(meeting) = req.meeting_mut(&meeting_id) {
            meeting.outcome = outcome;
            meeting.outcome_notes = outcome_notes;
        }
        req.updated_at = now;
    });

    Ok(with_requests(snapshot, requests))
}

// ========== Documents ==========

fn upload_document(snapshot: &Snapshot, request_id: &str, kind: DocumentKind, now: DateTime<Utc>) -> CoreResult<Snapshot> {
    get_request(snapshot, request_id)?;

    let document = AdoptionDocument {
        id: generate_record_id(RecordKind::Document),
        kind,
        verified: false,
        uploaded_at: now,
    };
    let requests = snapshot.requests.update_one(request_id, |req| {
        req.documents.push(document);
        req.updated_at = now;
    });

    Ok(with_requests(snapshot, requests))
}

fn verify_document(snapshot: &Snapshot, request_id: &str, document_id: &str, now: DateTime<Utc>) -> CoreResult<Snapshot> {
    let request = get_request(snapshot, request_id)?;
    if request.document(document_id).is_none() {
        return Err(CoreError::NotFound {
            entity_id: document_id.to_string(),
        });
    }

    let document_id = document_id.to_string();
    let requests = snapshot.requests.update_one(request_id, |req| {
        if let Some(document) = req.document_mut(&document_id) {
            document.verified = true;
        }
        req.updated_at = now;
    });

    Ok(with_requests(snapshot, requests))
}

fn delete_document(snapshot: &Snapshot, request_id: &str, document_id: &str, now: DateTime<Utc>) -> CoreResult<Snapshot> {
    let request = get_request(snapshot, request_id)?;
    if request.document(document_id).is_none() {
        return Err(CoreError::NotFound {
            entity_id: document_id.to_string(),
        });
    }

    let document_id = document_id.to_string();
    let requests = snapshot.requests.update_one(request_id, |req| {
        req.documents.retain(|d| d.id != document_id);
        req.updated_at = now;
    });

    Ok(with_requests(snapshot, requests))
}

// ========== Notes ==========

fn add_note(snapshot: &Snapshot, request_id: &str, author_id: String, body: String, now: DateTime<Utc>) -> CoreResult<Snapshot> {
    get_request(snapshot, request_id)?;

    let note = RequestNote {
        id: generate_record_id(RecordKind::Note),
        author_id,
        body,
        created_at: now,
    };
    let requests = snapshot.requests.update_one(request_id, |req| {
        req.notes.push(note);
        req.updated_at = now;
    });

    Ok(with_requests(snapshot, requests))
}

fn update_note(snapshot: &Snapshot, request_id: &str, note_id: &str, body: String, now: DateTime<Utc>) -> CoreResult<Snapshot> {
    let request = get_request(snapshot, request_id)?;
    if request.note(note_id).is_none() {
        return Err(CoreError::NotFound {
            entity_id: note_id.to_string(),
        });
    }

    let note_id = note_id.to_string();
    // Only the body is editable; author and created_at stay as recorded.
    let requests = snapshot.requests.update_one(request_id, |req| {
        if let Some(note) = req.note_mut(&note_id) {
            note.body = body;
        }
        req.updated_at = now;
    });

    Ok(with_requests(snapshot, requests))
}

fn delete_note(snapshot: &Snapshot, request_id: &str, note_id: &str, now: DateTime<Utc>) -> CoreResult<Snapshot> {
    let request = get_request(snapshot, request_id)?;
    if request.note(note_id).is_none() {
        return Err(CoreError::NotFound {
            entity_id: note_id.to_string(),
        });
    }

    let note_id = note_id.to_string();
    let requests = snapshot.requests.update_one(request_id, |req| {
        req.notes.retain(|n| n.id != note_id);
        req.updated_at = now;
    });

    Ok(with_requests(snapshot, requests))
}

// ========== Post-approval process ==========

fn start_process(snapshot: &Snapshot, request_id: &str, now: DateTime<Utc>) -> CoreResult<Snapshot> {
    let request = get_request(snapshot, request_id)?;
    if request.status != RequestStatus::Approved {
        return Err(illegal(request, "start_process"));
    }
    if request.process.is_some() {
        return Err(CoreError::invalid(format!(
            "process already started for request '{request_id}'"
        )));
    }

    let listing_id = request.listing_id.clone();
    let requests = snapshot.requests.update_one(request_id, |req| {
        req.process = Some(AdoptionProcess::start(now));
        req.updated_at = now;
    });
    // Starting the workstream reserves the pet.
    let listings = snapshot.listings.update_one(&listing_id, |listing| {
        if listing.status == ListingStatus::Available {
            listing.status = ListingStatus::Reserved;
        }
    });

    Ok(Snapshot {
        listings,
        requests,
        stats: snapshot.stats,
    })
}

fn complete_phase(
    snapshot: &Snapshot,
    request_id: &str,
    phase: PhaseKind,
    note: Option<String>,
    now: DateTime<Utc>,
) -> CoreResult<Snapshot> {
    let request = get_request(snapshot, request_id)?;
    if request.status != RequestStatus::Approved {
        return Err(illegal(request, "complete_phase"));
    }
    if request.process.is_none() {
        return Err(CoreError::invalid(format!(
            "process not started for request '{request_id}'"
        )));
    }

    let requests = snapshot.requests.update_one(request_id, |req| {
        if let Some(process) = req.process.as_mut() {
            process.complete_phase(phase, now, note);
        }
        req.updated_at = now;
    });

    Ok(with_requests(snapshot, requests))
}

fn confirm_delivery(snapshot: &Snapshot, request_id: &str, party: Party, now: DateTime<Utc>) -> CoreResult<Snapshot> {
    let request = get_request(snapshot, request_id)?;
    if request.status != RequestStatus::Approved {
        return Err(illegal(request, "confirm_delivery"));
    }

    let requests = snapshot.requests.update_one(request_id, |req| {
        match party {
            Party::Owner => req.owner_confirmed_delivery = true,
            Party::Applicant => req.applicant_confirmed_delivery = true,
        }
        req.updated_at = now;
    });

    Ok(with_requests(snapshot, requests))
}

fn complete(
    snapshot: &Snapshot,
    request_id: &str,
    actor_id: String,
    note: Option<String>,
    now: DateTime<Utc>,
) -> CoreResult<Snapshot> {
    let request = get_request(snapshot, request_id)?;
    if request.status != RequestStatus::Approved {
        return Err(illegal(request, "complete"));
    }
    if !request.delivery_confirmed() {
        return Err(CoreError::invalid(format!(
            "completion of request '{request_id}' requires delivery confirmation from both parties"
        )));
    }
    if let Some(process) = &request.process
        && !process.all_phases_complete()
    {
        return Err(CoreError::invalid(format!(
            "completion of request '{request_id}' requires all process phases complete"
        )));
    }
    let listing_id = request.listing_id.clone();
    if !snapshot.listings.contains(&listing_id) {
        return Err(CoreError::NotFound { entity_id: listing_id });
    }

    let requests = snapshot
        .requests
        .update_one(request_id, |req| transition_status(req, RequestStatus::Completed, actor_id, note, now));
    let listings = snapshot
        .listings
        .update_one(&listing_id, |listing| listing.status = ListingStatus::Adopted);
    let mut stats = snapshot.stats;
    stats.approved_requests = stats.approved_requests.saturating_sub(1);
    stats.completed_adoptions += 1;

    Ok(Snapshot {
        listings,
        requests,
        stats,
    })
}

// ========== Follow-ups ==========

fn schedule_follow_up(snapshot: &Snapshot, request_id: &str, due_on: DateTime<Utc>, now: DateTime<Utc>) -> CoreResult<Snapshot> {
    let request = get_request(snapshot, request_id)?;
    if request.status != RequestStatus::Completed {
        return Err(illegal(request, "schedule_follow_up"));
    }
    if request.process.is_none() {
        return Err(CoreError::invalid(format!(
            "process not started for request '{request_id}'"
        )));
    }

    let follow_up = FollowUp {
        id: generate_record_id(RecordKind::FollowUp),
        due_on,
        completed: false,
        wellbeing: None,
        satisfaction: None,
        notes: None,
    };
    let requests = snapshot.requests.update_one(request_id, |req| {
        if let Some(process) = req.process.as_mut() {
            process.follow_ups.push(follow_up);
        }
        req.updated_at = now;
    });

    Ok(with_requests(snapshot, requests))
}

fn complete_follow_up(
    snapshot: &Snapshot,
    request_id: &str,
    follow_up_id: &str,
    wellbeing: u8,
    satisfaction: u8,
    notes: Option<String>,
    now: DateTime<Utc>,
) -> CoreResult<Snapshot> {
    let request = get_request(snapshot, request_id)?;
    if request.status != RequestStatus::Completed {
        return Err(illegal(request, "complete_follow_up"));
    }
    let known = request
        .process
        .as_ref()
        .is_some_and(|p| p.follow_ups.iter().any(|f| f.id == follow_up_id));
    if !known {
        return Err(CoreError::NotFound {
            entity_id: follow_up_id.to_string(),
        });
    }
    let mut issues = Vec::new();
    if !(1..=5).contains(&wellbeing) {
        issues.push(ValidationIssue::new("wellbeing", "validation.range", "score must be 1-5"));
    }
    if !(1..=5).contains(&satisfaction) {
        issues.push(ValidationIssue::new("satisfaction", "validation.range", "score must be 1-5"));
    }
    if !issues.is_empty() {
        return Err(CoreError::Validation(ValidationError::new(issues)));
    }

    let follow_up_id = follow_up_id.to_string();
    let requests = snapshot.requests.update_one(request_id, |req| {
        if let Some(follow_up) = req.process.as_mut().and_then(|p| p.follow_up_mut(&follow_up_id)) {
            follow_up.completed = true;
            follow_up.wellbeing = Some(wellbeing);
            follow_up.satisfaction = Some(satisfaction);
            follow_up.notes = notes;
        }
        req.updated_at = now;
    });

    Ok(with_requests(snapshot, requests))
}

fn with_requests(snapshot: &Snapshot, requests: crate::store::Collection<AdoptionRequest>) -> Snapshot {
    Snapshot {
        listings: snapshot.listings.clone(),
        requests,
        stats: snapshot.stats,
    }
}
