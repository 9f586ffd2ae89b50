//! SurrealDB implementation of [`ReviewPromptRepository`].
//!
//! Prompts are only created by [`super::SurrealServiceRequestRepository`]
//! as part of finishing a request.

use cerca_core::error::CercaResult;
use cerca_core::models::review::ReviewPrompt;
use cerca_core::repository::ReviewPromptRepository;
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::parse_uuid;
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct ReviewPromptRowWithId {
    record_id: String,
    request_id: String,
    user_id: String,
    tags: Vec<String>,
    status: String,
    created_at: DateTime<Utc>,
    answered_at: Option<DateTime<Utc>>,
}

impl ReviewPromptRowWithId {
    fn try_into_prompt(self) -> Result<ReviewPrompt, DbError> {
        Ok(ReviewPrompt {
            id: parse_uuid("review_prompt", &self.record_id)?,
            request_id: parse_uuid("request", &self.request_id)?,
            user_id: parse_uuid("user", &self.user_id)?,
            tags: self.tags,
            status: self
                .status
                .parse()
                .map_err(|e| DbError::decode("prompt status", e))?,
            created_at: self.created_at,
            answered_at: self.answered_at,
        })
    }
}

/// SurrealDB implementation of the ReviewPrompt repository.
#[derive(Clone)]
pub struct SurrealReviewPromptRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealReviewPromptRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> ReviewPromptRepository for SurrealReviewPromptRepository<C> {
    async fn list_pending(&self, user_id: Uuid) -> CercaResult<Vec<ReviewPrompt>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM review_prompt \
                 WHERE user_id = $user_id AND status = 'Pending' \
                 ORDER BY created_at DESC",
            )
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ReviewPromptRowWithId> = result.take(0).map_err(DbError::from)?;
        let prompts = rows
            .into_iter()
            .map(ReviewPromptRowWithId::try_into_prompt)
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(prompts)
    }

    async fn get_by_request(&self, request_id: Uuid) -> CercaResult<ReviewPrompt> {
        let request_id_str = request_id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM review_prompt \
                 WHERE request_id = $request_id",
            )
            .bind(("request_id", request_id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ReviewPromptRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "review_prompt".into(),
            id: format!("request_id={request_id_str}"),
        })?;
        Ok(row.try_into_prompt()?)
    }
}
