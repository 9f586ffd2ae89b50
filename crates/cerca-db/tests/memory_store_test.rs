//! Tests for the in-process store's guarded writes.

use cerca_core::error::CercaError;
use cerca_core::models::profile::{CreateProfile, ProfileKind, Tier};
use cerca_core::models::review::CreateReviewPrompt;
use cerca_core::models::service_request::{
    BookingAction, CreateServiceRequest, NegotiatedTerms, RequestStatus, StatusChange,
};
use cerca_core::repository::{ProfileRepository, ReviewPromptRepository, ServiceRequestRepository};
use cerca_db::MemoryStore;
use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

fn new_request(client_id: Uuid, professional_id: Uuid) -> CreateServiceRequest {
    CreateServiceRequest {
        client_id,
        professional_id,
        requested_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        requested_time: NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
        agreed_location: "Hotel X".into(),
        client_comment: None,
    }
}

async fn professional(store: &MemoryStore) -> Uuid {
    store
        .create(CreateProfile {
            display_name: "Pro".into(),
            kind: ProfileKind::Professional,
            latitude: None,
            longitude: None,
            tier: Tier::Silver,
            last_active_at: None,
            available_until: None,
        })
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn duplicate_creation_returns_existing() {
    let store = MemoryStore::new();
    let pro = professional(&store).await;
    let client = Uuid::new_v4();

    let first = store
        .create_unless_open(new_request(client, pro))
        .await
        .unwrap()
        .into_inner();
    let second = store
        .create_unless_open(new_request(client, pro))
        .await
        .unwrap();

    assert!(!second.was_created());
    assert_eq!(second.into_inner().id, first.id);
    assert_eq!(store.request_count(client, pro).await, 1);
}

#[tokio::test]
async fn complete_without_profile_changes_nothing() {
    let store = MemoryStore::new();
    let ghost = Uuid::new_v4();
    let client = Uuid::new_v4();

    let request = store
        .create_unless_open(new_request(client, ghost))
        .await
        .unwrap()
        .into_inner();
    let approve = StatusChange::plan(
        RequestStatus::Requested,
        BookingAction::Approve,
        Some(NegotiatedTerms {
            price_amount: 1,
            duration_minutes: 30,
            provider_note: None,
        }),
    )
    .unwrap();
    store.transition(request.id, approve).await.unwrap().unwrap();
    let confirm =
        StatusChange::plan(RequestStatus::Approved, BookingAction::ClientConfirm, None).unwrap();
    store.transition(request.id, confirm).await.unwrap().unwrap();

    let err = store
        .complete(
            request.id,
            ghost,
            CreateReviewPrompt {
                user_id: client,
                tags: vec![],
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CercaError::NotFound { .. }));

    let current = ServiceRequestRepository::get_by_id(&store, request.id)
        .await
        .unwrap();
    assert_eq!(current.status, RequestStatus::Active);
    assert!(store.get_by_request(request.id).await.is_err());
}
