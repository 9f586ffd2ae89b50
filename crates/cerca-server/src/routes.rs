//! JSON endpoints for the booking and discovery operations.

use axum::Json;
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use cerca_booking::{ApproveInput, CreateRequestInput};
use cerca_core::error::CercaError;
use cerca_core::geo::Coordinates;
use cerca_core::models::profile::{ProfileKind, Tier};
use cerca_core::models::review::ReviewPrompt;
use cerca_core::models::service_request::{Party, RequestStatus, ServiceRequest};
use cerca_core::repository::{PaginatedResult, Pagination, RequestFilter};
use cerca_discovery::{DiscoveryFilters, DiscoveryPage};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::events::events_handler;
use crate::identity::Actor;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz_handler))
        .route("/v1/events", get(events_handler))
        .route("/v1/discover", get(discover_handler))
        .route("/v1/requests", post(create_handler).get(list_handler))
        .route("/v1/requests/{id}", get(get_handler))
        .route("/v1/requests/{id}/approve", post(approve_handler))
        .route("/v1/requests/{id}/reject", post(reject_handler))
        .route("/v1/requests/{id}/confirm", post(confirm_handler))
        .route("/v1/requests/{id}/cancel", post(cancel_handler))
        .route("/v1/requests/{id}/finish", post(finish_handler))
        .route("/v1/requests/{id}/review-tags", post(review_tags_handler))
        .route("/v1/review-prompts", get(pending_prompts_handler))
        .with_state(state)
}

async fn healthz_handler() -> &'static str {
    "ok"
}

async fn create_handler(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(input): Json<CreateRequestInput>,
) -> ApiResult<Json<ServiceRequest>> {
    Ok(Json(state.booking.create_request(actor, input).await?))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    role: Option<Party>,
    status: Option<RequestStatus>,
    #[serde(default)]
    offset: u64,
    limit: Option<u64>,
}

#[derive(Debug, Serialize)]
struct ListResponse {
    items: Vec<ServiceRequest>,
    total: u64,
    offset: u64,
    limit: u64,
}

impl From<PaginatedResult<ServiceRequest>> for ListResponse {
    fn from(page: PaginatedResult<ServiceRequest>) -> Self {
        Self {
            items: page.items,
            total: page.total,
            offset: page.offset,
            limit: page.limit,
        }
    }
}

async fn list_handler(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<ListResponse>> {
    let filter = RequestFilter {
        role: query.role,
        status: query.status,
    };
    let pagination = Pagination {
        offset: query.offset,
        limit: query.limit.unwrap_or(Pagination::default().limit),
    };
    let page = state
        .booking
        .list_requests(actor, filter, pagination)
        .await?;
    Ok(Json(page.into()))
}

async fn get_handler(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ServiceRequest>> {
    Ok(Json(state.booking.get_request(id, actor).await?))
}

async fn approve_handler(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
    Json(input): Json<ApproveInput>,
) -> ApiResult<Json<ServiceRequest>> {
    Ok(Json(state.booking.approve(id, actor, input).await?))
}

/// The status the professional saw when deciding to reject.
#[derive(Debug, Deserialize)]
struct RejectBody {
    expected_status: RequestStatus,
}

async fn reject_handler(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
    Json(body): Json<RejectBody>,
) -> ApiResult<Json<ServiceRequest>> {
    Ok(Json(
        state
            .booking
            .reject(id, actor, body.expected_status)
            .await?,
    ))
}

async fn confirm_handler(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ServiceRequest>> {
    Ok(Json(state.booking.client_confirm(id, actor).await?))
}

async fn cancel_handler(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ServiceRequest>> {
    Ok(Json(state.booking.client_cancel(id, actor).await?))
}

#[derive(Debug, Serialize)]
struct FinishResponse {
    request: ServiceRequest,
    review_prompt: ReviewPrompt,
}

async fn finish_handler(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<FinishResponse>> {
    let finished = state.booking.finish(id, actor).await?;
    Ok(Json(FinishResponse {
        request: finished.request,
        review_prompt: finished.prompt,
    }))
}

#[derive(Debug, Deserialize)]
struct ReviewTagsBody {
    tags: Vec<String>,
}

async fn review_tags_handler(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
    Json(body): Json<ReviewTagsBody>,
) -> ApiResult<Json<ServiceRequest>> {
    Ok(Json(
        state
            .booking
            .submit_review_tags(id, actor, body.tags)
            .await?,
    ))
}

async fn pending_prompts_handler(
    State(state): State<AppState>,
    Actor(actor): Actor,
) -> ApiResult<Json<Vec<ReviewPrompt>>> {
    Ok(Json(state.booking.pending_prompts(actor).await?))
}

#[derive(Debug, Deserialize)]
struct DiscoverQuery {
    lat: Option<f64>,
    lng: Option<f64>,
    kind: Option<ProfileKind>,
    min_tier: Option<Tier>,
    #[serde(default)]
    available_now: bool,
    max_distance_km: Option<f64>,
    #[serde(default)]
    offset: u64,
    limit: Option<u64>,
}

/// Anonymous browsing is allowed; no identity required.
async fn discover_handler(
    State(state): State<AppState>,
    Query(query): Query<DiscoverQuery>,
) -> ApiResult<Json<DiscoveryPage>> {
    let viewer = match (query.lat, query.lng) {
        (Some(lat), Some(lng)) => Some(Coordinates::new(lat, lng)),
        (None, None) => None,
        _ => {
            return Err(CercaError::invalid_input("lat and lng must be given together").into());
        }
    };
    let filters = DiscoveryFilters {
        kind: query.kind,
        min_tier: query.min_tier,
        available_now: query.available_now,
        max_distance_km: query.max_distance_km,
        offset: query.offset,
        limit: query.limit,
    };
    Ok(Json(state.discovery.discover(viewer, filters).await?))
}
