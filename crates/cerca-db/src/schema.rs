//! Schema definitions and migration runner for SurrealDB.
//!
//! All tables are SCHEMAFULL. UUIDs are stored as strings, enums as strings
//! with ASSERT constraints. `open_request` holds one record per
//! (client, professional) pair with an open booking; its deterministic
//! record id is what makes duplicate creation fail inside a transaction.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Profiles (professionals, venues, shops)
-- =======================================================================
DEFINE TABLE profile SCHEMAFULL;
DEFINE FIELD display_name ON TABLE profile TYPE string;
DEFINE FIELD kind ON TABLE profile TYPE string \
    ASSERT $value IN ['Professional', 'Venue', 'Shop'];
DEFINE FIELD latitude ON TABLE profile TYPE option<float>;
DEFINE FIELD longitude ON TABLE profile TYPE option<float>;
DEFINE FIELD tier ON TABLE profile TYPE string \
    ASSERT $value IN ['Silver', 'Gold', 'Platinum'];
DEFINE FIELD last_active_at ON TABLE profile TYPE option<datetime>;
DEFINE FIELD available_until ON TABLE profile TYPE option<datetime>;
DEFINE FIELD profile_views ON TABLE profile TYPE int DEFAULT 0;
DEFINE FIELD completed_services ON TABLE profile TYPE int DEFAULT 0;
DEFINE FIELD created_at ON TABLE profile TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE profile TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_profile_kind ON TABLE profile COLUMNS kind;

-- =======================================================================
-- Service requests (never deleted)
-- =======================================================================
DEFINE TABLE service_request SCHEMAFULL;
DEFINE FIELD client_id ON TABLE service_request TYPE string;
DEFINE FIELD professional_id ON TABLE service_request TYPE string;
DEFINE FIELD status ON TABLE service_request TYPE string \
    ASSERT $value IN ['Requested', 'Approved', 'Active', 'Finished', \
    'Rejected', 'ClientCancelled'];
DEFINE FIELD price_amount ON TABLE service_request TYPE option<int> \
    ASSERT $value = NONE OR $value > 0;
DEFINE FIELD duration_minutes ON TABLE service_request TYPE option<int>;
DEFINE FIELD provider_note ON TABLE service_request TYPE option<string>;
DEFINE FIELD requested_date ON TABLE service_request TYPE string;
DEFINE FIELD requested_time ON TABLE service_request TYPE string;
DEFINE FIELD agreed_location ON TABLE service_request TYPE string;
DEFINE FIELD client_comment ON TABLE service_request TYPE option<string>;
DEFINE FIELD review_tags ON TABLE service_request \
    TYPE option<array<string>>;
DEFINE FIELD transition_token ON TABLE service_request \
    TYPE option<string>;
DEFINE FIELD created_at ON TABLE service_request TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE service_request TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_service_request_client ON TABLE service_request \
    COLUMNS client_id;
DEFINE INDEX idx_service_request_professional ON TABLE service_request \
    COLUMNS professional_id;

-- =======================================================================
-- Open-request slots, keyed by client_professional
-- =======================================================================
DEFINE TABLE open_request SCHEMAFULL;
DEFINE FIELD request_id ON TABLE open_request TYPE string;
DEFINE FIELD created_at ON TABLE open_request TYPE datetime \
    DEFAULT time::now();

-- =======================================================================
-- Review prompts
-- =======================================================================
DEFINE TABLE review_prompt SCHEMAFULL;
DEFINE FIELD request_id ON TABLE review_prompt TYPE string;
DEFINE FIELD user_id ON TABLE review_prompt TYPE string;
DEFINE FIELD tags ON TABLE review_prompt TYPE array<string>;
DEFINE FIELD status ON TABLE review_prompt TYPE string \
    ASSERT $value IN ['Pending', 'Answered'];
DEFINE FIELD answered_at ON TABLE review_prompt TYPE option<datetime>;
DEFINE FIELD created_at ON TABLE review_prompt TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_review_prompt_request ON TABLE review_prompt \
    COLUMNS request_id UNIQUE;
DEFINE INDEX idx_review_prompt_user ON TABLE review_prompt \
    COLUMNS user_id;
";

/// Run all pending migrations against the given database.
///
/// Tracks applied versions in `_migration`; each migration runs at most
/// once.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version <= current_version {
            continue;
        }
        info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );
        db.query(migration.sql).await?.check().map_err(|e| {
            DbError::Migration(format!(
                "Migration v{} '{}' failed: {}",
                migration.version, migration.name, e,
            ))
        })?;

        db.query("CREATE _migration SET version = $version, name = $name")
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;

        info!(version = migration.version, "Migration applied");
    }

    Ok(())
}

/// Returns the raw schema DDL for version 1.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}
