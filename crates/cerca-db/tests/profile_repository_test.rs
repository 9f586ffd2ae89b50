//! Integration tests for the Profile repository using in-memory SurrealDB.

use cerca_core::models::profile::{CreateProfile, ProfileKind, ProfileQuery, Tier};
use cerca_core::repository::ProfileRepository;
use cerca_db::repository::SurrealProfileRepository;
use chrono::{Duration, Utc};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};

async fn setup() -> SurrealProfileRepository<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    cerca_db::run_migrations(&db).await.unwrap();
    SurrealProfileRepository::new(db)
}

fn profile(name: &str, kind: ProfileKind, tier: Tier, hours_ago: i64) -> CreateProfile {
    CreateProfile {
        display_name: name.into(),
        kind,
        latitude: Some(-33.45),
        longitude: Some(-70.66),
        tier,
        last_active_at: Some(Utc::now() - Duration::hours(hours_ago)),
        available_until: None,
    }
}

#[tokio::test]
async fn create_and_get_profile() {
    let repo = setup().await;
    let created = repo
        .create(profile("Camila", ProfileKind::Professional, Tier::Platinum, 1))
        .await
        .unwrap();

    let fetched = repo.get_by_id(created.id).await.unwrap();
    assert_eq!(fetched.display_name, "Camila");
    assert_eq!(fetched.tier, Tier::Platinum);
    assert_eq!(fetched.completed_services, 0);
    assert_eq!(fetched.latitude, Some(-33.45));
}

#[tokio::test]
async fn candidates_respect_kind_and_min_tier() {
    let repo = setup().await;
    repo.create(profile("Silver pro", ProfileKind::Professional, Tier::Silver, 1))
        .await
        .unwrap();
    repo.create(profile("Gold pro", ProfileKind::Professional, Tier::Gold, 2))
        .await
        .unwrap();
    repo.create(profile("Gold venue", ProfileKind::Venue, Tier::Gold, 3))
        .await
        .unwrap();

    let pros = repo
        .list_candidates(ProfileQuery {
            kind: Some(ProfileKind::Professional),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(pros.len(), 2);

    let gold_up = repo
        .list_candidates(ProfileQuery {
            min_tier: Some(Tier::Gold),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(gold_up.len(), 2);
    assert!(gold_up.iter().all(|p| p.tier >= Tier::Gold));

    let limited = repo
        .list_candidates(ProfileQuery {
            limit: 1,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].display_name, "Silver pro");
}

#[tokio::test]
async fn record_activity_updates_timestamp() {
    let repo = setup().await;
    let created = repo
        .create(profile("Sofia", ProfileKind::Shop, Tier::Silver, 100))
        .await
        .unwrap();

    let now = Utc::now();
    repo.record_activity(created.id, now).await.unwrap();
    let fetched = repo.get_by_id(created.id).await.unwrap();
    let at = fetched.last_active_at.unwrap();
    assert!((at - now).num_milliseconds().abs() < 1_000);
}

#[tokio::test]
async fn record_activity_on_missing_profile_is_not_found() {
    let repo = setup().await;
    let err = repo
        .record_activity(uuid::Uuid::new_v4(), Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        cerca_core::error::CercaError::NotFound { .. }
    ));
}
