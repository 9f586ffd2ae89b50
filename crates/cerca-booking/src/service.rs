//! Booking service: validation, authorization, guarded writes and fan-out.

use std::sync::Arc;

use cerca_core::error::CercaResult;
use cerca_core::models::event::HubEvent;
use cerca_core::models::review::{CreateReviewPrompt, ReviewPrompt};
use cerca_core::models::service_request::{
    BookingAction, CreateOutcome, CreateServiceRequest, NegotiatedTerms, Party, RequestStatus,
    ServiceRequest, StatusChange,
};
use cerca_core::repository::{
    PaginatedResult, Pagination, ProfileRepository, RequestFilter, ReviewPromptRepository,
    ServiceRequestRepository,
};
use cerca_hub::Hub;
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use uuid::Uuid;

use crate::config::BookingConfig;
use crate::error::BookingError;

/// Input for `create_request`. The client is the caller.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRequestInput {
    pub professional_id: Uuid,
    pub requested_date: NaiveDate,
    pub requested_time: NaiveTime,
    pub agreed_location: String,
    pub client_comment: Option<String>,
}

/// Terms the professional offers when approving.
#[derive(Debug, Clone, Deserialize)]
pub struct ApproveInput {
    pub price_amount: u64,
    pub duration_minutes: u32,
    pub provider_note: Option<String>,
}

/// Successful finish: the finished request and the client's review prompt,
/// which carries the quick-review tag set.
#[derive(Debug, Clone)]
pub struct FinishOutput {
    pub request: ServiceRequest,
    pub prompt: ReviewPrompt,
}

/// Booking service.
///
/// Generic over repository implementations so that the booking layer has
/// no dependency on the database crate. The hub is shared with the
/// transport that drains it.
pub struct BookingService<S, P, V>
where
    S: ServiceRequestRepository,
    P: ProfileRepository,
    V: ReviewPromptRepository,
{
    request_repo: S,
    profile_repo: P,
    prompt_repo: V,
    hub: Arc<dyn Hub>,
    config: BookingConfig,
}

impl<S, P, V> BookingService<S, P, V>
where
    S: ServiceRequestRepository,
    P: ProfileRepository,
    V: ReviewPromptRepository,
{
    pub fn new(
        request_repo: S,
        profile_repo: P,
        prompt_repo: V,
        hub: Arc<dyn Hub>,
        config: BookingConfig,
    ) -> Self {
        Self {
            request_repo,
            profile_repo,
            prompt_repo,
            hub,
            config,
        }
    }

    pub fn config(&self) -> &BookingConfig {
        &self.config
    }

    /// Create a request from `client_id` to a professional. If the pair
    /// already has an open request, that one is returned unchanged and no
    /// event is pushed.
    pub async fn create_request(
        &self,
        client_id: Uuid,
        input: CreateRequestInput,
    ) -> CercaResult<ServiceRequest> {
        if client_id == input.professional_id {
            return Err(BookingError::SelfRequest.into());
        }

        let agreed_location = input.agreed_location.trim();
        if agreed_location.is_empty() {
            return Err(BookingError::BlankLocation.into());
        }
        check_len("agreed_location", agreed_location, self.config.max_location_chars)?;

        let client_comment = non_blank(input.client_comment);
        if let Some(comment) = &client_comment {
            check_len("client_comment", comment, self.config.max_comment_chars)?;
        }

        // Unknown professionals surface as NotFound.
        self.profile_repo.get_by_id(input.professional_id).await?;

        let outcome = self
            .request_repo
            .create_unless_open(CreateServiceRequest {
                client_id,
                professional_id: input.professional_id,
                requested_date: input.requested_date,
                requested_time: input.requested_time,
                agreed_location: agreed_location.to_string(),
                client_comment,
            })
            .await?;

        match outcome {
            CreateOutcome::Created(request) => {
                tracing::info!(
                    request_id = %request.id,
                    %client_id,
                    professional_id = %request.professional_id,
                    "service request created"
                );
                self.notify_parties(&request, HubEvent::request_created(&request));
                Ok(request)
            }
            CreateOutcome::Existing(request) => {
                tracing::debug!(
                    request_id = %request.id,
                    %client_id,
                    status = %request.status,
                    "open request already exists for pair"
                );
                Ok(request)
            }
        }
    }

    /// Professional accepts the request with price and duration.
    pub async fn approve(
        &self,
        request_id: Uuid,
        actor_id: Uuid,
        input: ApproveInput,
    ) -> CercaResult<ServiceRequest> {
        let terms = self.validate_terms(input)?;
        self.apply(
            request_id,
            actor_id,
            BookingAction::Approve,
            RequestStatus::Requested,
            Some(terms),
        )
        .await
    }

    /// Reject a request the professional saw in state `seen`, either
    /// `Requested` or `Approved`. A request that has moved on since is
    /// `InvalidState`.
    pub async fn reject(
        &self,
        request_id: Uuid,
        actor_id: Uuid,
        seen: RequestStatus,
    ) -> CercaResult<ServiceRequest> {
        self.apply(request_id, actor_id, BookingAction::Reject, seen, None)
            .await
    }

    pub async fn client_confirm(
        &self,
        request_id: Uuid,
        actor_id: Uuid,
    ) -> CercaResult<ServiceRequest> {
        self.apply(
            request_id,
            actor_id,
            BookingAction::ClientConfirm,
            RequestStatus::Approved,
            None,
        )
        .await
    }

    pub async fn client_cancel(
        &self,
        request_id: Uuid,
        actor_id: Uuid,
    ) -> CercaResult<ServiceRequest> {
        self.apply(
            request_id,
            actor_id,
            BookingAction::ClientCancel,
            RequestStatus::Approved,
            None,
        )
        .await
    }

    /// `Active -> Finished`. The status write, the professional's
    /// `completed_services` increment and the client's review prompt are
    /// one atomic unit.
    pub async fn finish(&self, request_id: Uuid, actor_id: Uuid) -> CercaResult<FinishOutput> {
        let action = BookingAction::Finish;
        let current = self.request_repo.get_by_id(request_id).await?;
        authorize(&current, actor_id, action)?;
        ensure_legal(&current, action)?;

        let prompt = CreateReviewPrompt {
            user_id: current.client_id,
            tags: self.config.review_tags.clone(),
        };
        let Some((request, prompt)) = self
            .request_repo
            .complete(request_id, current.professional_id, prompt)
            .await?
        else {
            tracing::debug!(%request_id, %action, "lost transition race");
            return Err(BookingError::LostRace { action }.into());
        };

        tracing::info!(
            %request_id,
            from = %current.status,
            to = %request.status,
            professional_id = %request.professional_id,
            "service request finished"
        );
        self.notify_parties(&request, HubEvent::request_updated(&request));
        self.notify(
            &[request.client_id],
            HubEvent::review_tags_requested(&prompt),
        );

        Ok(FinishOutput { request, prompt })
    }

    /// Client tags a finished service. Accepted once; tags must be a
    /// non-empty subset of the configured set and duplicates collapse.
    pub async fn submit_review_tags(
        &self,
        request_id: Uuid,
        actor_id: Uuid,
        tags: Vec<String>,
    ) -> CercaResult<ServiceRequest> {
        let tags = self.normalize_tags(tags)?;

        let current = self.request_repo.get_by_id(request_id).await?;
        match current.party_of(actor_id) {
            Some(Party::Client) => {}
            Some(Party::Professional) => return Err(BookingError::NotTheClient.into()),
            None => return Err(BookingError::NotAParty.into()),
        }
        if current.status != RequestStatus::Finished || current.review_tags.is_some() {
            return Err(BookingError::TagsClosed.into());
        }

        let Some(request) = self
            .request_repo
            .record_review_tags(request_id, tags)
            .await?
        else {
            tracing::debug!(%request_id, "review tags already recorded");
            return Err(BookingError::TagsClosed.into());
        };

        tracing::info!(%request_id, tags = ?request.review_tags, "review tags recorded");
        self.notify_parties(&request, HubEvent::request_updated(&request));
        Ok(request)
    }

    /// Re-fetch path after an `InvalidState`/`Forbidden` outcome. Only the
    /// two parties may read a request.
    pub async fn get_request(
        &self,
        request_id: Uuid,
        actor_id: Uuid,
    ) -> CercaResult<ServiceRequest> {
        let request = self.request_repo.get_by_id(request_id).await?;
        if request.party_of(actor_id).is_none() {
            return Err(BookingError::NotAParty.into());
        }
        Ok(request)
    }

    /// The actor's request history, newest first.
    pub async fn list_requests(
        &self,
        actor_id: Uuid,
        filter: RequestFilter,
        pagination: Pagination,
    ) -> CercaResult<PaginatedResult<ServiceRequest>> {
        let pagination = Pagination {
            offset: pagination.offset,
            limit: pagination.limit.clamp(1, self.config.max_list_limit),
        };
        self.request_repo
            .list_for_user(actor_id, filter, pagination)
            .await
    }

    /// Unanswered review prompts for `user_id`.
    pub async fn pending_prompts(&self, user_id: Uuid) -> CercaResult<Vec<ReviewPrompt>> {
        self.prompt_repo.list_pending(user_id).await
    }

    /// The write is guarded on `from`, the state the actor acted on.
    async fn apply(
        &self,
        request_id: Uuid,
        actor_id: Uuid,
        action: BookingAction,
        from: RequestStatus,
        terms: Option<NegotiatedTerms>,
    ) -> CercaResult<ServiceRequest> {
        let current = self.request_repo.get_by_id(request_id).await?;
        authorize(&current, actor_id, action)?;

        let change = StatusChange::plan(from, action, terms).ok_or(
            BookingError::TransitionRejected {
                action,
                status: from,
            },
        )?;
        if current.status != from {
            return Err(BookingError::TransitionRejected {
                action,
                status: current.status,
            }
            .into());
        }

        let Some(request) = self.request_repo.transition(request_id, change).await? else {
            tracing::debug!(%request_id, %action, expected = %from, "lost transition race");
            return Err(BookingError::LostRace { action }.into());
        };

        tracing::info!(
            %request_id,
            %action,
            from = %from,
            to = %request.status,
            "service request transitioned"
        );
        self.notify_parties(&request, HubEvent::request_updated(&request));
        Ok(request)
    }

    fn validate_terms(&self, input: ApproveInput) -> Result<NegotiatedTerms, BookingError> {
        if input.price_amount == 0 {
            return Err(BookingError::InvalidPrice);
        }
        if !self.config.is_allowed_duration(input.duration_minutes) {
            return Err(BookingError::UnsupportedDuration(input.duration_minutes));
        }
        let provider_note = non_blank(input.provider_note);
        if let Some(note) = &provider_note {
            check_len("provider_note", note, self.config.max_note_chars)?;
        }
        Ok(NegotiatedTerms {
            price_amount: input.price_amount,
            duration_minutes: input.duration_minutes,
            provider_note,
        })
    }

    fn normalize_tags(&self, tags: Vec<String>) -> Result<Vec<String>, BookingError> {
        let mut unique: Vec<String> = Vec::with_capacity(tags.len());
        for tag in tags {
            let tag = tag.trim();
            if !self.config.is_known_tag(tag) {
                return Err(BookingError::UnknownTag(tag.to_string()));
            }
            if !unique.iter().any(|t| t == tag) {
                unique.push(tag.to_string());
            }
        }
        if unique.is_empty() {
            return Err(BookingError::EmptyTags);
        }
        Ok(unique)
    }

    fn notify_parties(
        &self,
        request: &ServiceRequest,
        event: Result<HubEvent, serde_json::Error>,
    ) {
        self.notify(&request.participants(), event);
    }

    /// Fire-and-forget. Delivery never affects the outcome of the
    /// transition that triggered it.
    fn notify(&self, users: &[Uuid], event: Result<HubEvent, serde_json::Error>) {
        let event = match event {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode hub event");
                return;
            }
        };
        for user_id in users {
            self.hub.push(*user_id, event.clone());
        }
    }
}

fn authorize(
    request: &ServiceRequest,
    actor_id: Uuid,
    action: BookingAction,
) -> Result<(), BookingError> {
    let required = action.actor();
    match request.party_of(actor_id) {
        None => Err(BookingError::NotAParty),
        Some(party) if party != required => Err(BookingError::WrongParty { action, required }),
        Some(_) => Ok(()),
    }
}

fn ensure_legal(request: &ServiceRequest, action: BookingAction) -> Result<(), BookingError> {
    match request.status.apply(action) {
        Some(_) => Ok(()),
        None => Err(BookingError::TransitionRejected {
            action,
            status: request.status,
        }),
    }
}

fn check_len(field: &'static str, value: &str, max: usize) -> Result<(), BookingError> {
    if value.chars().count() > max {
        return Err(BookingError::TooLong { field, max });
    }
    Ok(())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
