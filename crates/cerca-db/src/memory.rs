//! In-process store implementing every repository trait.
//!
//! One mutex guards all tables, so each guarded write, and `complete` with
//! its counter and prompt, is applied atomically. Used for single-node
//! development and for concurrency tests that need exact race outcomes.

use std::collections::HashMap;
use std::sync::Arc;

use cerca_core::error::{CercaError, CercaResult};
use cerca_core::models::profile::{CreateProfile, Profile, ProfileQuery};
use cerca_core::models::review::{CreateReviewPrompt, PromptStatus, ReviewPrompt};
use cerca_core::models::service_request::{
    CreateOutcome, CreateServiceRequest, Party, RequestStatus, ServiceRequest, StatusChange,
};
use cerca_core::repository::{
    PaginatedResult, Pagination, ProfileRepository, RequestFilter, ReviewPromptRepository,
    ServiceRequestRepository,
};
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    profiles: HashMap<Uuid, Profile>,
    requests: HashMap<Uuid, ServiceRequest>,
    /// (client, professional) -> open request id
    open_slots: HashMap<(Uuid, Uuid), Uuid>,
    /// request id -> prompt
    prompts: HashMap<Uuid, ReviewPrompt>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored requests for a pair, open or not.
    pub async fn request_count(&self, client_id: Uuid, professional_id: Uuid) -> usize {
        self.tables
            .lock()
            .await
            .requests
            .values()
            .filter(|r| r.client_id == client_id && r.professional_id == professional_id)
            .count()
    }
}

fn request_not_found(id: Uuid) -> CercaError {
    CercaError::not_found("service_request", id)
}

impl ProfileRepository for MemoryStore {
    async fn create(&self, input: CreateProfile) -> CercaResult<Profile> {
        let now = Utc::now();
        let profile = Profile {
            id: Uuid::new_v4(),
            display_name: input.display_name,
            kind: input.kind,
            latitude: input.latitude,
            longitude: input.longitude,
            tier: input.tier,
            last_active_at: input.last_active_at,
            available_until: input.available_until,
            profile_views: 0,
            completed_services: 0,
            created_at: now,
            updated_at: now,
        };
        self.tables
            .lock()
            .await
            .profiles
            .insert(profile.id, profile.clone());
        Ok(profile)
    }

    async fn get_by_id(&self, id: Uuid) -> CercaResult<Profile> {
        self.tables
            .lock()
            .await
            .profiles
            .get(&id)
            .cloned()
            .ok_or_else(|| CercaError::not_found("profile", id))
    }

    async fn list_candidates(&self, query: ProfileQuery) -> CercaResult<Vec<Profile>> {
        let tables = self.tables.lock().await;
        let mut candidates: Vec<Profile> = tables
            .profiles
            .values()
            .filter(|p| query.matches(p))
            .cloned()
            .collect();
        candidates.sort_by(|a, b| b.last_active_at.cmp(&a.last_active_at));
        candidates.truncate(usize::try_from(query.limit).unwrap_or(usize::MAX));
        Ok(candidates)
    }

    async fn record_activity(&self, id: Uuid, at: DateTime<Utc>) -> CercaResult<()> {
        let mut tables = self.tables.lock().await;
        let profile = tables
            .profiles
            .get_mut(&id)
            .ok_or_else(|| CercaError::not_found("profile", id))?;
        profile.last_active_at = Some(at);
        profile.updated_at = Utc::now();
        Ok(())
    }
}

impl ServiceRequestRepository for MemoryStore {
    async fn create_unless_open(&self, input: CreateServiceRequest) -> CercaResult<CreateOutcome> {
        let mut tables = self.tables.lock().await;
        let slot = (input.client_id, input.professional_id);

        if let Some(existing) = tables.open_slots.get(&slot) {
            let existing = tables
                .requests
                .get(existing)
                .cloned()
                .ok_or_else(|| CercaError::Internal("open slot points at missing request".into()))?;
            return Ok(CreateOutcome::Existing(existing));
        }

        let now = Utc::now();
        let request = ServiceRequest {
            id: Uuid::new_v4(),
            client_id: input.client_id,
            professional_id: input.professional_id,
            status: RequestStatus::Requested,
            terms: None,
            requested_date: input.requested_date,
            requested_time: input.requested_time,
            agreed_location: input.agreed_location,
            client_comment: input.client_comment,
            review_tags: None,
            created_at: now,
            updated_at: now,
        };
        tables.open_slots.insert(slot, request.id);
        tables.requests.insert(request.id, request.clone());
        Ok(CreateOutcome::Created(request))
    }

    async fn get_by_id(&self, id: Uuid) -> CercaResult<ServiceRequest> {
        self.tables
            .lock()
            .await
            .requests
            .get(&id)
            .cloned()
            .ok_or_else(|| request_not_found(id))
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        filter: RequestFilter,
        pagination: Pagination,
    ) -> CercaResult<PaginatedResult<ServiceRequest>> {
        let tables = self.tables.lock().await;
        let mut matching: Vec<ServiceRequest> = tables
            .requests
            .values()
            .filter(|r| match filter.role {
                Some(Party::Client) => r.client_id == user_id,
                Some(Party::Professional) => r.professional_id == user_id,
                None => r.party_of(user_id).is_some(),
            })
            .filter(|r| filter.status.is_none_or(|s| r.status == s))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(usize::try_from(pagination.offset).unwrap_or(usize::MAX))
            .take(usize::try_from(pagination.limit).unwrap_or(usize::MAX))
            .collect();

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn transition(
        &self,
        id: Uuid,
        change: StatusChange,
    ) -> CercaResult<Option<ServiceRequest>> {
        let mut tables = self.tables.lock().await;
        let request = tables
            .requests
            .get_mut(&id)
            .ok_or_else(|| request_not_found(id))?;

        if request.status != change.expected {
            return Ok(None);
        }

        request.status = change.target;
        request.terms = change.resulting_terms(request.terms.take());
        request.updated_at = Utc::now();
        let updated = request.clone();

        if change.target.is_terminal() {
            tables
                .open_slots
                .remove(&(updated.client_id, updated.professional_id));
        }
        Ok(Some(updated))
    }

    async fn complete(
        &self,
        id: Uuid,
        professional_id: Uuid,
        prompt: CreateReviewPrompt,
    ) -> CercaResult<Option<(ServiceRequest, ReviewPrompt)>> {
        let mut tables = self.tables.lock().await;

        let status = tables
            .requests
            .get(&id)
            .map(|r| r.status)
            .ok_or_else(|| request_not_found(id))?;
        if status != RequestStatus::Active {
            return Ok(None);
        }
        // Check everything before mutating anything.
        if !tables.profiles.contains_key(&professional_id) {
            return Err(CercaError::not_found("profile", professional_id));
        }

        let now = Utc::now();
        let Tables {
            profiles,
            requests,
            open_slots,
            prompts,
        } = &mut *tables;

        let request = requests.get_mut(&id).ok_or_else(|| request_not_found(id))?;
        request.status = RequestStatus::Finished;
        request.updated_at = now;
        let finished = request.clone();

        if let Some(profile) = profiles.get_mut(&professional_id) {
            profile.completed_services += 1;
            profile.updated_at = now;
        }

        let review_prompt = ReviewPrompt {
            id: Uuid::new_v4(),
            request_id: id,
            user_id: prompt.user_id,
            tags: prompt.tags,
            status: PromptStatus::Pending,
            created_at: now,
            answered_at: None,
        };
        prompts.insert(id, review_prompt.clone());
        open_slots.remove(&(finished.client_id, finished.professional_id));

        Ok(Some((finished, review_prompt)))
    }

    async fn record_review_tags(
        &self,
        id: Uuid,
        tags: Vec<String>,
    ) -> CercaResult<Option<ServiceRequest>> {
        let mut tables = self.tables.lock().await;
        let now = Utc::now();

        let request = tables
            .requests
            .get_mut(&id)
            .ok_or_else(|| request_not_found(id))?;
        if request.status != RequestStatus::Finished || request.review_tags.is_some() {
            return Ok(None);
        }
        request.review_tags = Some(tags);
        request.updated_at = now;
        let updated = request.clone();

        if let Some(prompt) = tables.prompts.get_mut(&id) {
            if prompt.status == PromptStatus::Pending {
                prompt.status = PromptStatus::Answered;
                prompt.answered_at = Some(now);
            }
        }
        Ok(Some(updated))
    }
}

impl ReviewPromptRepository for MemoryStore {
    async fn list_pending(&self, user_id: Uuid) -> CercaResult<Vec<ReviewPrompt>> {
        let tables = self.tables.lock().await;
        let mut pending: Vec<ReviewPrompt> = tables
            .prompts
            .values()
            .filter(|p| p.user_id == user_id && p.status == PromptStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(pending)
    }

    async fn get_by_request(&self, request_id: Uuid) -> CercaResult<ReviewPrompt> {
        self.tables
            .lock()
            .await
            .prompts
            .get(&request_id)
            .cloned()
            .ok_or_else(|| CercaError::not_found("review_prompt", format!("request_id={request_id}")))
    }
}
