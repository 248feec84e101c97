//! PawHome coordination core.
//!
//! Pure, IO-free application core for a pet-adoption marketplace client:
//! a normalized entity store, a derived view engine with filtering, sorting
//! and pagination, the adoption-request lifecycle state machine, a TTL cache
//! for memoized queries, and the top-level event reducer. Embedding shells
//! own all IO and execute the [`events::Intent`]s the reducer emits.

pub mod cache;
pub mod errors;
pub mod events;
pub mod id;
pub mod lifecycle;
pub mod model;
pub mod search;
pub mod store;
pub mod views;

pub use errors::{CoreError, CoreResult, ValidationError, ValidationIssue};
pub use events::{AppEvent, AppState, Intent, Reduction, ViewState, reduce, reduce_at};
pub use lifecycle::LifecycleEvent;
pub use model::{
    AdoptionProcess, AdoptionRequest, Listing, ListingStatus, Party, PhaseKind, RequestStatus, Species,
};
pub use store::{Collection, Snapshot, StatsCounters, StoreEntity};
pub use views::{
    DEFAULT_PAGE, DEFAULT_PAGE_SIZE, ListingCriteria, MAX_PAGE_SIZE, PageRequest, Paginated, SortKey, SortOrder,
    SortSpec,
};
