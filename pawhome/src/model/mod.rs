//! Domain records for the adoption marketplace.
//!
//! - [`Listing`] - a pet available for adoption
//! - [`AdoptionRequest`] - one applicant's application against one listing
//! - [`AdoptionProcess`] - the post-approval workstream for a request

mod listing;
mod process;
mod request;

pub use listing::{Listing, ListingImage, ListingStatus, Location, Sex, SizeClass, Species};
pub use process::{AdoptionProcess, FollowUp, PhaseKind, ProcessPhase};
pub use request::{
    AdoptionDocument, AdoptionMeeting, AdoptionRequest, DocumentKind, HousingType, MeetingOutcome, Party,
    Questionnaire, RequestNote, RequestStatus, TimelineEntry,
};
