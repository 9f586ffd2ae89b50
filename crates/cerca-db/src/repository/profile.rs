//! SurrealDB implementation of [`ProfileRepository`].

use cerca_core::error::CercaResult;
use cerca_core::models::profile::{CreateProfile, Profile, ProfileQuery, Tier};
use cerca_core::repository::ProfileRepository;
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::parse_uuid;
use crate::error::DbError;

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct ProfileRow {
    display_name: String,
    kind: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    tier: String,
    last_active_at: Option<DateTime<Utc>>,
    available_until: Option<DateTime<Utc>>,
    profile_views: u64,
    completed_services: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct ProfileRowWithId {
    record_id: String,
    display_name: String,
    kind: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    tier: String,
    last_active_at: Option<DateTime<Utc>>,
    available_until: Option<DateTime<Utc>>,
    profile_views: u64,
    completed_services: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProfileRow {
    fn into_profile(self, id: Uuid) -> Result<Profile, DbError> {
        Ok(Profile {
            id,
            display_name: self.display_name,
            kind: self.kind.parse().map_err(|e| DbError::decode("profile kind", e))?,
            latitude: self.latitude,
            longitude: self.longitude,
            tier: self.tier.parse().map_err(|e| DbError::decode("profile tier", e))?,
            last_active_at: self.last_active_at,
            available_until: self.available_until,
            profile_views: self.profile_views,
            completed_services: self.completed_services,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl ProfileRowWithId {
    fn try_into_profile(self) -> Result<Profile, DbError> {
        let id = parse_uuid("profile", &self.record_id)?;
        ProfileRow {
            display_name: self.display_name,
            kind: self.kind,
            latitude: self.latitude,
            longitude: self.longitude,
            tier: self.tier,
            last_active_at: self.last_active_at,
            available_until: self.available_until,
            profile_views: self.profile_views,
            completed_services: self.completed_services,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .into_profile(id)
    }
}

/// SurrealDB implementation of the Profile repository.
#[derive(Clone)]
pub struct SurrealProfileRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealProfileRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> ProfileRepository for SurrealProfileRepository<C> {
    async fn create(&self, input: CreateProfile) -> CercaResult<Profile> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('profile', $id) SET \
                 display_name = $display_name, kind = $kind, \
                 latitude = $latitude, longitude = $longitude, \
                 tier = $tier, \
                 last_active_at = $last_active_at, \
                 available_until = $available_until, \
                 profile_views = 0, completed_services = 0",
            )
            .bind(("id", id_str.clone()))
            .bind(("display_name", input.display_name))
            .bind(("kind", input.kind.as_str().to_string()))
            .bind(("latitude", input.latitude))
            .bind(("longitude", input.longitude))
            .bind(("tier", input.tier.as_str().to_string()))
            .bind(("last_active_at", input.last_active_at))
            .bind(("available_until", input.available_until))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<ProfileRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "profile".into(),
            id: id_str,
        })?;

        Ok(row.into_profile(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> CercaResult<Profile> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('profile', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ProfileRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "profile".into(),
            id: id_str,
        })?;

        Ok(row.into_profile(id)?)
    }

    async fn list_candidates(&self, query: ProfileQuery) -> CercaResult<Vec<Profile>> {
        let mut conditions = Vec::new();
        if query.kind.is_some() {
            conditions.push("kind = $kind");
        }
        if query.min_tier.is_some() {
            conditions.push("tier IN $tiers");
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let sql = format!(
            "SELECT meta::id(id) AS record_id, * FROM profile {where_clause} \
             ORDER BY last_active_at DESC LIMIT $limit"
        );

        let mut builder = self.db.query(&sql).bind(("limit", query.limit));
        if let Some(kind) = query.kind {
            builder = builder.bind(("kind", kind.as_str().to_string()));
        }
        if let Some(min_tier) = query.min_tier {
            let tiers: Vec<String> = Tier::ALL
                .iter()
                .filter(|t| **t >= min_tier)
                .map(|t| t.as_str().to_string())
                .collect();
            builder = builder.bind(("tiers", tiers));
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<ProfileRowWithId> = result.take(0).map_err(DbError::from)?;

        let profiles = rows
            .into_iter()
            .map(ProfileRowWithId::try_into_profile)
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(profiles)
    }

    async fn record_activity(&self, id: Uuid, at: DateTime<Utc>) -> CercaResult<()> {
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "UPDATE type::record('profile', $id) SET \
                 last_active_at = $at, updated_at = time::now()",
            )
            .bind(("id", id_str.clone()))
            .bind(("at", at))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        // UPDATE on a missing record id matches nothing.
        let rows: Vec<ProfileRow> = result.take(0).map_err(DbError::from)?;
        if rows.is_empty() {
            return Err(DbError::NotFound {
                entity: "profile".into(),
                id: id_str,
            }
            .into());
        }
        Ok(())
    }
}
