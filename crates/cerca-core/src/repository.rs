//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Every mutation of a service request
//! is a conditional write on its current status; implementations return
//! `Ok(None)` when the guard does not match instead of an error, and the
//! booking layer turns that into `InvalidState`.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::CercaResult;
use crate::models::{
    profile::{CreateProfile, Profile, ProfileQuery},
    review::{CreateReviewPrompt, ReviewPrompt},
    service_request::{
        CreateOutcome, CreateServiceRequest, Party, RequestStatus, ServiceRequest, StatusChange,
    },
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

/// Filter for a party's request history.
#[derive(Debug, Clone, Default)]
pub struct RequestFilter {
    /// Restrict to requests where the user is on this side.
    pub role: Option<Party>,
    pub status: Option<RequestStatus>,
}

// ---------------------------------------------------------------------------
// Profiles (read mostly; owned by the profile-editing surface)
// ---------------------------------------------------------------------------

pub trait ProfileRepository: Send + Sync {
    fn create(&self, input: CreateProfile) -> impl Future<Output = CercaResult<Profile>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = CercaResult<Profile>> + Send;
    /// Candidate set for discovery, newest activity first.
    fn list_candidates(
        &self,
        query: ProfileQuery,
    ) -> impl Future<Output = CercaResult<Vec<Profile>>> + Send;
    fn record_activity(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> impl Future<Output = CercaResult<()>> + Send;
}

// ---------------------------------------------------------------------------
// Service requests
// ---------------------------------------------------------------------------

pub trait ServiceRequestRepository: Send + Sync {
    /// Insert a `Requested` request unless the pair already has an open
    /// one, in which case that one is returned unchanged.
    fn create_unless_open(
        &self,
        input: CreateServiceRequest,
    ) -> impl Future<Output = CercaResult<CreateOutcome>> + Send;

    fn get_by_id(&self, id: Uuid) -> impl Future<Output = CercaResult<ServiceRequest>> + Send;

    /// A user's requests, newest first.
    fn list_for_user(
        &self,
        user_id: Uuid,
        filter: RequestFilter,
        pagination: Pagination,
    ) -> impl Future<Output = CercaResult<PaginatedResult<ServiceRequest>>> + Send;

    /// Apply `change` only if the stored status equals `change.expected`.
    /// Releases the pair slot when the target is terminal.
    fn transition(
        &self,
        id: Uuid,
        change: StatusChange,
    ) -> impl Future<Output = CercaResult<Option<ServiceRequest>>> + Send;

    /// `Active -> Finished`, increment the professional's
    /// `completed_services` and create the client's review prompt as one
    /// atomic unit. `Ok(None)` when the request was not `Active`.
    fn complete(
        &self,
        id: Uuid,
        professional_id: Uuid,
        prompt: CreateReviewPrompt,
    ) -> impl Future<Output = CercaResult<Option<(ServiceRequest, ReviewPrompt)>>> + Send;

    /// Store the client's tags and answer the pending prompt, only if the
    /// request is `Finished` and has no tags yet.
    fn record_review_tags(
        &self,
        id: Uuid,
        tags: Vec<String>,
    ) -> impl Future<Output = CercaResult<Option<ServiceRequest>>> + Send;
}

// ---------------------------------------------------------------------------
// Review prompts
// ---------------------------------------------------------------------------

pub trait ReviewPromptRepository: Send + Sync {
    fn list_pending(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = CercaResult<Vec<ReviewPrompt>>> + Send;
    fn get_by_request(
        &self,
        request_id: Uuid,
    ) -> impl Future<Output = CercaResult<ReviewPrompt>> + Send;
}
