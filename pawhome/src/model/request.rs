use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::process::AdoptionProcess;

/// Status of an adoption request.
///
/// `Rejected`, `Cancelled` and `Completed` are terminal: no further status
/// transition is legal from them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
    Completed,
}

impl RequestStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
            RequestStatus::Cancelled => "cancelled",
            RequestStatus::Completed => "completed",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            RequestStatus::Rejected | RequestStatus::Cancelled | RequestStatus::Completed
        )
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Housing situation declared by the applicant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HousingType {
    Apartment,
    House,
    Farm,
    Other,
}

/// Structured questionnaire answers collected at submission time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Questionnaire {
    pub housing: HousingType,
    pub hours_alone_daily: u8,
    pub prior_experience: bool,
    pub allergies_in_household: bool,
    pub other_pets: Vec<String>,
    pub household_agrees: bool,
}

impl Default for Questionnaire {
    fn default() -> Self {
        Self {
            housing: HousingType::Apartment,
            hours_alone_daily: 0,
            prior_experience: false,
            allergies_in_household: false,
            other_pets: Vec::new(),
            household_agrees: true,
        }
    }
}

/// One status-change entry in a request's audit timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub at: DateTime<Utc>,
    pub actor_id: String,
    pub from: Option<RequestStatus>,
    pub to: RequestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Outcome of a scheduled meeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeetingOutcome {
    Pending,
    Completed,
    Cancelled,
}

/// A scheduled or completed in-person encounter tied to one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdoptionMeeting {
    pub id: String,
    pub scheduled_for: DateTime<Utc>,
    pub location: String,
    pub outcome: MeetingOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome_notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Identification,
    ProofOfResidence,
    LandlordPermission,
    VetReference,
    Other,
}

/// A document attached to a request, pending or passed verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdoptionDocument {
    pub id: String,
    pub kind: DocumentKind,
    pub verified: bool,
    pub uploaded_at: DateTime<Utc>,
}

/// A free-text note on a request. Author and timestamp are immutable once
/// recorded; only the body may be edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestNote {
    pub id: String,
    pub author_id: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// The two parties to an adoption, used for delivery confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Party {
    Owner,
    Applicant,
}

/// A single adopter's application against one listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdoptionRequest {
    pub id: String,
    pub listing_id: String,
    pub applicant_id: String,
    pub owner_id: String,
    pub questionnaire: Questionnaire,
    pub status: RequestStatus,
    pub timeline: Vec<TimelineEntry>,
    pub notes: Vec<RequestNote>,
    pub documents: Vec<AdoptionDocument>,
    pub meetings: Vec<AdoptionMeeting>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process: Option<AdoptionProcess>,
    pub owner_confirmed_delivery: bool,
    pub applicant_confirmed_delivery: bool,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AdoptionRequest {
    /// Create a new `Pending` request draft.
    pub fn new(
        id: impl Into<String>,
        listing_id: impl Into<String>,
        applicant_id: impl Into<String>,
        owner_id: impl Into<String>,
        questionnaire: Questionnaire,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            listing_id: listing_id.into(),
            applicant_id: applicant_id.into(),
            owner_id: owner_id.into(),
            questionnaire,
            status: RequestStatus::Pending,
            timeline: Vec::new(),
            notes: Vec::new(),
            documents: Vec::new(),
            meetings: Vec::new(),
            process: None,
            owner_confirmed_delivery: false,
            applicant_confirmed_delivery: false,
            submitted_at,
            updated_at: submitted_at,
        }
    }

    pub fn meeting(&self, meeting_id: &str) -> Option<&AdoptionMeeting> {
        self.meetings.iter().find(|m| m.id == meeting_id)
    }

    pub fn meeting_mut(&mut self, meeting_id: &str) -> Option<&mut AdoptionMeeting> {
        self.meetings.iter_mut().find(|m| m.id == meeting_id)
    }

    pub fn document(&self, document_id: &str) -> Option<&AdoptionDocument> {
        self.documents.iter().find(|d| d.id == document_id)
    }

    pub fn document_mut(&mut self, document_id: &str) -> Option<&mut AdoptionDocument> {
        self.documents.iter_mut().find(|d| d.id == document_id)
    }

    pub fn note(&self, note_id: &str) -> Option<&RequestNote> {
        self.notes.iter().find(|n| n.id == note_id)
    }

    pub fn note_mut(&mut self, note_id: &str) -> Option<&mut RequestNote> {
        self.notes.iter_mut().find(|n| n.id == note_id)
    }

    /// Both parties have confirmed handover of the pet.
    pub fn delivery_confirmed(&self) -> bool {
        self.owner_confirmed_delivery && self.applicant_confirmed_delivery
    }
}
