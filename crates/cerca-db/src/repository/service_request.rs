//! SurrealDB implementation of [`ServiceRequestRepository`].
//!
//! Every mutation is an `UPDATE ... WHERE status = $expected`. Each write
//! stamps a fresh `transition_token`; follow-up statements in the same
//! transaction run only when the stored token is ours, so a caller whose
//! guard matched nothing never applies side effects.
//!
//! If the store aborts a transaction (write conflict with a concurrent
//! caller) the current status is re-read: a status that moved away from the
//! expected one means we lost the race, reported as `Ok(None)`.

use cerca_core::error::CercaResult;
use cerca_core::models::review::{CreateReviewPrompt, ReviewPrompt};
use cerca_core::models::service_request::{
    CreateOutcome, CreateServiceRequest, NegotiatedTerms, Party, RequestStatus, ServiceRequest,
    StatusChange, TermsChange,
};
use cerca_core::repository::{
    PaginatedResult, Pagination, ReviewPromptRepository, RequestFilter, ServiceRequestRepository,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;

use super::review_prompt::SurrealReviewPromptRepository;
use super::{open_slot_key, parse_uuid};
use crate::error::DbError;

const TIME_FORMAT: &str = "%H:%M:%S";

// `BEGIN TRANSACTION` takes result slot 0, so statement N inside a
// transaction is read back with `take(N)`.
const CREATED_REQUEST_SLOT: usize = 2;
const GUARDED_UPDATE_SLOT: usize = 1;

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct ServiceRequestRow {
    client_id: String,
    professional_id: String,
    status: String,
    price_amount: Option<u64>,
    duration_minutes: Option<u32>,
    provider_note: Option<String>,
    requested_date: String,
    requested_time: String,
    agreed_location: String,
    client_comment: Option<String>,
    review_tags: Option<Vec<String>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct ServiceRequestRowWithId {
    record_id: String,
    client_id: String,
    professional_id: String,
    status: String,
    price_amount: Option<u64>,
    duration_minutes: Option<u32>,
    provider_note: Option<String>,
    requested_date: String,
    requested_time: String,
    agreed_location: String,
    client_comment: Option<String>,
    review_tags: Option<Vec<String>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct StatusRow {
    status: String,
}

#[derive(Debug, SurrealValue)]
struct SlotRow {
    request_id: String,
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

impl ServiceRequestRow {
    fn into_request(self, id: Uuid) -> Result<ServiceRequest, DbError> {
        let status: RequestStatus = self
            .status
            .parse()
            .map_err(|e| DbError::decode("request status", e))?;

        let terms = match (self.price_amount, self.duration_minutes) {
            (Some(price_amount), Some(duration_minutes)) => Some(NegotiatedTerms {
                price_amount,
                duration_minutes,
                provider_note: self.provider_note,
            }),
            (None, None) => None,
            _ => return Err(DbError::Decode(format!("request {id} has partial terms"))),
        };
        if terms.is_some() != status.carries_terms() {
            return Err(DbError::Decode(format!(
                "request {id} in {status} has terms: {}",
                terms.is_some()
            )));
        }

        Ok(ServiceRequest {
            id,
            client_id: parse_uuid("client", &self.client_id)?,
            professional_id: parse_uuid("professional", &self.professional_id)?,
            status,
            terms,
            requested_date: self
                .requested_date
                .parse::<NaiveDate>()
                .map_err(|e| DbError::decode("requested_date", e))?,
            requested_time: NaiveTime::parse_from_str(&self.requested_time, TIME_FORMAT)
                .map_err(|e| DbError::decode("requested_time", e))?,
            agreed_location: self.agreed_location,
            client_comment: self.client_comment,
            review_tags: self.review_tags,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl ServiceRequestRowWithId {
    fn try_into_request(self) -> Result<ServiceRequest, DbError> {
        let id = parse_uuid("service_request", &self.record_id)?;
        ServiceRequestRow {
            client_id: self.client_id,
            professional_id: self.professional_id,
            status: self.status,
            price_amount: self.price_amount,
            duration_minutes: self.duration_minutes,
            provider_note: self.provider_note,
            requested_date: self.requested_date,
            requested_time: self.requested_time,
            agreed_location: self.agreed_location,
            client_comment: self.client_comment,
            review_tags: self.review_tags,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .into_request(id)
    }
}

fn first_request(
    rows: Vec<ServiceRequestRow>,
    id: Uuid,
) -> Result<Option<ServiceRequest>, DbError> {
    rows.into_iter()
        .next()
        .map(|row| row.into_request(id))
        .transpose()
}

/// SurrealDB implementation of the ServiceRequest repository.
#[derive(Clone)]
pub struct SurrealServiceRequestRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealServiceRequestRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn current_status(&self, id: Uuid) -> Result<Option<RequestStatus>, DbError> {
        let mut result = self
            .db
            .query("SELECT status FROM type::record('service_request', $id)")
            .bind(("id", id.to_string()))
            .await?;
        let rows: Vec<StatusRow> = result.take(0)?;
        rows.into_iter()
            .next()
            .map(|row| {
                row.status
                    .parse::<RequestStatus>()
                    .map_err(|e| DbError::decode("request status", e))
            })
            .transpose()
    }

    /// Decide what an aborted guarded write means: a lost race when the
    /// status has moved on, otherwise a genuine store failure.
    async fn resolve_aborted(
        &self,
        id: Uuid,
        expected: RequestStatus,
        err: String,
    ) -> Result<(), DbError> {
        match self.current_status(id).await? {
            None => Err(DbError::NotFound {
                entity: "service_request".into(),
                id: id.to_string(),
            }),
            Some(status) if status != expected => {
                debug!(request_id = %id, %expected, %status, "guarded write lost race");
                Ok(())
            }
            Some(_) => Err(DbError::Query(err)),
        }
    }

    async fn open_request_for_slot(&self, slot: &str) -> Result<Option<Uuid>, DbError> {
        let mut result = self
            .db
            .query("SELECT request_id FROM type::record('open_request', $slot)")
            .bind(("slot", slot.to_string()))
            .await?;
        let rows: Vec<SlotRow> = result.take(0)?;
        rows.into_iter()
            .next()
            .map(|row| parse_uuid("open_request.request_id", &row.request_id))
            .transpose()
    }
}

impl<C: Connection> ServiceRequestRepository for SurrealServiceRequestRepository<C> {
    async fn create_unless_open(&self, input: CreateServiceRequest) -> CercaResult<CreateOutcome> {
        let slot = open_slot_key(input.client_id, input.professional_id);

        if let Some(existing) = self.open_request_for_slot(&slot).await? {
            return Ok(CreateOutcome::Existing(self.get_by_id(existing).await?));
        }

        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let response = self
            .db
            .query(
                "BEGIN TRANSACTION; \
                 CREATE type::record('open_request', $slot) SET request_id = $id; \
                 CREATE type::record('service_request', $id) SET \
                 client_id = $client_id, professional_id = $professional_id, \
                 status = 'Requested', \
                 requested_date = $requested_date, \
                 requested_time = $requested_time, \
                 agreed_location = $agreed_location, \
                 client_comment = $client_comment; \
                 COMMIT TRANSACTION;",
            )
            .bind(("slot", slot.clone()))
            .bind(("id", id_str.clone()))
            .bind(("client_id", input.client_id.to_string()))
            .bind(("professional_id", input.professional_id.to_string()))
            .bind(("requested_date", input.requested_date.to_string()))
            .bind((
                "requested_time",
                input.requested_time.format(TIME_FORMAT).to_string(),
            ))
            .bind(("agreed_location", input.agreed_location))
            .bind(("client_comment", input.client_comment))
            .await
            .map_err(DbError::from)?;

        match response.check() {
            Ok(mut result) => {
                let rows: Vec<ServiceRequestRow> = result
                    .take(CREATED_REQUEST_SLOT)
                    .map_err(DbError::from)?;
                let created = first_request(rows, id)?.ok_or_else(|| DbError::NotFound {
                    entity: "service_request".into(),
                    id: id_str,
                })?;
                Ok(CreateOutcome::Created(created))
            }
            Err(err) => {
                // Another creation for the same pair won the slot.
                match self.open_request_for_slot(&slot).await? {
                    Some(existing) if existing != id => {
                        debug!(request_id = %existing, "duplicate request collapsed onto open one");
                        Ok(CreateOutcome::Existing(self.get_by_id(existing).await?))
                    }
                    _ => Err(DbError::Query(err.to_string()).into()),
                }
            }
        }
    }

    async fn get_by_id(&self, id: Uuid) -> CercaResult<ServiceRequest> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('service_request', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ServiceRequestRow> = result.take(0).map_err(DbError::from)?;
        let request = first_request(rows, id)?.ok_or_else(|| DbError::NotFound {
            entity: "service_request".into(),
            id: id_str,
        })?;
        Ok(request)
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        filter: RequestFilter,
        pagination: Pagination,
    ) -> CercaResult<PaginatedResult<ServiceRequest>> {
        let mut conditions = vec![match filter.role {
            Some(Party::Client) => "client_id = $user_id",
            Some(Party::Professional) => "professional_id = $user_id",
            None => "(client_id = $user_id OR professional_id = $user_id)",
        }];
        if filter.status.is_some() {
            conditions.push("status = $status");
        }
        let where_clause = conditions.join(" AND ");
        let status = filter.status.map(|s| s.as_str().to_string());

        let mut count_result = self
            .db
            .query(format!(
                "SELECT count() AS total FROM service_request \
                 WHERE {where_clause} GROUP ALL"
            ))
            .bind(("user_id", user_id.to_string()))
            .bind(("status", status.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(format!(
                "SELECT meta::id(id) AS record_id, * FROM service_request \
                 WHERE {where_clause} \
                 ORDER BY created_at DESC \
                 LIMIT $limit START $offset"
            ))
            .bind(("user_id", user_id.to_string()))
            .bind(("status", status))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ServiceRequestRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(ServiceRequestRowWithId::try_into_request)
            .collect::<Result<Vec<_>, DbError>>()?;

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
        let mut sets = vec!["status = $target"];
        match &change.terms {
            TermsChange::Keep => {}
            TermsChange::Set(_) => sets.extend([
                "price_amount = $price_amount",
                "duration_minutes = $duration_minutes",
                "provider_note = $provider_note",
            ]),
            TermsChange::Clear => sets.extend([
                "price_amount = NONE",
                "duration_minutes = NONE",
                "provider_note = NONE",
            ]),
        }
        sets.extend(["transition_token = $guard_token", "updated_at = time::now()"]);

        // Terminal targets free the pair for a new request.
        let release = if change.target.is_terminal() {
            "IF (SELECT VALUE transition_token FROM ONLY \
             type::record('service_request', $id)) = $guard_token { \
             DELETE type::record('open_request', $slot); \
             };"
        } else {
            ""
        };

        let sql = format!(
            "BEGIN TRANSACTION; \
             UPDATE type::record('service_request', $id) SET {} \
             WHERE status = $expected; \
             {release} \
             COMMIT TRANSACTION;",
            sets.join(", ")
        );

        let current = self.get_by_id(id).await?;
        let slot = open_slot_key(current.client_id, current.professional_id);

        let mut builder = self
            .db
            .query(&sql)
            .bind(("id", id.to_string()))
            .bind(("expected", change.expected.as_str().to_string()))
            .bind(("target", change.target.as_str().to_string()))
            .bind(("guard_token", Uuid::new_v4().to_string()))
            .bind(("slot", slot));
        if let TermsChange::Set(terms) = &change.terms {
            builder = builder
                .bind(("price_amount", terms.price_amount))
                .bind(("duration_minutes", terms.duration_minutes))
                .bind(("provider_note", terms.provider_note.clone()));
        }

        let response = builder.await.map_err(DbError::from)?;
        match response.check() {
            Ok(mut result) => {
                let rows: Vec<ServiceRequestRow> = result
                    .take(GUARDED_UPDATE_SLOT)
                    .map_err(DbError::from)?;
                Ok(first_request(rows, id)?)
            }
            Err(err) => {
                self.resolve_aborted(id, change.expected, err.to_string())
                    .await?;
                Ok(None)
            }
        }
    }

    async fn complete(
        &self,
        id: Uuid,
        professional_id: Uuid,
        prompt: CreateReviewPrompt,
    ) -> CercaResult<Option<(ServiceRequest, ReviewPrompt)>> {
        let current = self.get_by_id(id).await?;
        let slot = open_slot_key(current.client_id, current.professional_id);

        let response = self
            .db
            .query(
                "BEGIN TRANSACTION; \
                 UPDATE type::record('service_request', $id) SET \
                 status = 'Finished', transition_token = $guard_token, \
                 updated_at = time::now() \
                 WHERE status = 'Active'; \
                 IF (SELECT VALUE transition_token FROM ONLY \
                 type::record('service_request', $id)) = $guard_token { \
                 IF (SELECT * FROM type::record('profile', $professional_id)) = [] { \
                 THROW 'professional profile missing'; \
                 }; \
                 UPDATE type::record('profile', $professional_id) SET \
                 completed_services += 1, updated_at = time::now(); \
                 CREATE type::record('review_prompt', $prompt_id) SET \
                 request_id = $id, user_id = $user_id, tags = $tags, \
                 status = 'Pending'; \
                 DELETE type::record('open_request', $slot); \
                 }; \
                 COMMIT TRANSACTION;",
            )
            .bind(("id", id.to_string()))
            .bind(("guard_token", Uuid::new_v4().to_string()))
            .bind(("professional_id", professional_id.to_string()))
            .bind(("prompt_id", Uuid::new_v4().to_string()))
            .bind(("user_id", prompt.user_id.to_string()))
            .bind(("tags", prompt.tags))
            .bind(("slot", slot))
            .await
            .map_err(DbError::from)?;

        let finished = match response.check() {
            Ok(mut result) => {
                let rows: Vec<ServiceRequestRow> = result
                    .take(GUARDED_UPDATE_SLOT)
                    .map_err(DbError::from)?;
                first_request(rows, id)?
            }
            Err(err) => {
                self.resolve_aborted(id, RequestStatus::Active, err.to_string())
                    .await?;
                None
            }
        };

        let Some(finished) = finished else {
            return Ok(None);
        };
        let prompt = SurrealReviewPromptRepository::new(self.db.clone())
            .get_by_request(id)
            .await?;
        Ok(Some((finished, prompt)))
    }

    async fn record_review_tags(
        &self,
        id: Uuid,
        tags: Vec<String>,
    ) -> CercaResult<Option<ServiceRequest>> {
        let response = self
            .db
            .query(
                "BEGIN TRANSACTION; \
                 UPDATE type::record('service_request', $id) SET \
                 review_tags = $tags, transition_token = $guard_token, \
                 updated_at = time::now() \
                 WHERE status = 'Finished' AND review_tags = NONE; \
                 IF (SELECT VALUE transition_token FROM ONLY \
                 type::record('service_request', $id)) = $guard_token { \
                 UPDATE review_prompt SET status = 'Answered', \
                 answered_at = time::now() \
                 WHERE request_id = $id AND status = 'Pending'; \
                 }; \
                 COMMIT TRANSACTION;",
            )
            .bind(("id", id.to_string()))
            .bind(("tags", tags))
            .bind(("guard_token", Uuid::new_v4().to_string()))
            .await
            .map_err(DbError::from)?;

        match response.check() {
            Ok(mut result) => {
                let rows: Vec<ServiceRequestRow> = result
                    .take(GUARDED_UPDATE_SLOT)
                    .map_err(DbError::from)?;
                Ok(first_request(rows, id)?)
            }
            Err(err) => {
                // A concurrent submission may have tagged it first.
                let current = self.get_by_id(id).await?;
                if current.review_tags.is_some() {
                    Ok(None)
                } else {
                    Err(DbError::Query(err.to_string()).into())
                }
            }
        }
    }
}
