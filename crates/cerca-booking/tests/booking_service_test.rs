//! Integration tests for the booking service.

use std::sync::Arc;

use cerca_booking::config::BookingConfig;
use cerca_booking::service::{ApproveInput, BookingService, CreateRequestInput};
use cerca_core::error::CercaError;
use cerca_core::models::event::EventType;
use cerca_core::models::profile::{CreateProfile, ProfileKind, Tier};
use cerca_core::models::service_request::{Party, RequestStatus};
use cerca_core::repository::{Pagination, ProfileRepository, RequestFilter};
use cerca_db::MemoryStore;
use cerca_hub::{Hub, InProcessHub, Registration};
use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

type Service = BookingService<MemoryStore, MemoryStore, MemoryStore>;

struct Fixture {
    service: Arc<Service>,
    store: MemoryStore,
    hub: Arc<InProcessHub>,
    client: Uuid,
    professional: Uuid,
}

async fn setup() -> Fixture {
    let store = MemoryStore::new();
    let hub = Arc::new(InProcessHub::new());
    let professional = store
        .create(CreateProfile {
            display_name: "Valentina".into(),
            kind: ProfileKind::Professional,
            latitude: Some(-33.4489),
            longitude: Some(-70.6693),
            tier: Tier::Gold,
            last_active_at: None,
            available_until: None,
        })
        .await
        .unwrap()
        .id;

    let service = BookingService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        hub.clone(),
        BookingConfig::default(),
    );

    Fixture {
        service: Arc::new(service),
        store,
        hub,
        client: Uuid::new_v4(),
        professional,
    }
}

fn request_input(professional_id: Uuid) -> CreateRequestInput {
    CreateRequestInput {
        professional_id,
        requested_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        requested_time: NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
        agreed_location: "Hotel X".into(),
        client_comment: None,
    }
}

fn terms() -> ApproveInput {
    ApproveInput {
        price_amount: 60_000,
        duration_minutes: 60,
        provider_note: None,
    }
}

fn drain(registration: &mut Registration) -> Vec<EventType> {
    let mut seen = Vec::new();
    while let Ok(event) = registration.receiver.try_recv() {
        seen.push(event.event_type);
    }
    seen
}

async fn completed_services(fx: &Fixture) -> u64 {
    ProfileRepository::get_by_id(&fx.store, fx.professional)
        .await
        .unwrap()
        .completed_services
}

#[tokio::test]
async fn full_lifecycle_notifies_both_parties() {
    let fx = setup().await;
    let mut client_rx = fx.hub.register(fx.client);
    let mut pro_rx = fx.hub.register(fx.professional);

    let request = fx
        .service
        .create_request(fx.client, request_input(fx.professional))
        .await
        .unwrap();
    assert_eq!(request.status, RequestStatus::Requested);
    assert_eq!(drain(&mut client_rx), vec![EventType::RequestCreated]);
    assert_eq!(drain(&mut pro_rx), vec![EventType::RequestCreated]);

    let approved = fx
        .service
        .approve(request.id, fx.professional, terms())
        .await
        .unwrap();
    assert_eq!(approved.status, RequestStatus::Approved);
    let agreed = approved.terms.as_ref().unwrap();
    assert_eq!(agreed.price_amount, 60_000);
    assert_eq!(agreed.duration_minutes, 60);
    assert_eq!(drain(&mut client_rx), vec![EventType::RequestUpdated]);
    assert_eq!(drain(&mut pro_rx), vec![EventType::RequestUpdated]);

    let active = fx
        .service
        .client_confirm(request.id, fx.client)
        .await
        .unwrap();
    assert_eq!(active.status, RequestStatus::Active);
    drain(&mut client_rx);
    drain(&mut pro_rx);

    let before = completed_services(&fx).await;
    let finished = fx.service.finish(request.id, fx.professional).await.unwrap();
    assert_eq!(finished.request.status, RequestStatus::Finished);
    assert_eq!(
        finished.prompt.tags,
        vec!["#Puntual", "#IgualALaFoto", "#Discrecion"]
    );
    assert_eq!(completed_services(&fx).await, before + 1);

    assert_eq!(
        drain(&mut client_rx),
        vec![EventType::RequestUpdated, EventType::ReviewTagsRequested]
    );
    assert_eq!(drain(&mut pro_rx), vec![EventType::RequestUpdated]);

    let pending = fx.service.pending_prompts(fx.client).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].request_id, request.id);
}

#[tokio::test]
async fn invalid_terms_never_touch_the_request() {
    let fx = setup().await;
    let request = fx
        .service
        .create_request(fx.client, request_input(fx.professional))
        .await
        .unwrap();

    let zero_price = fx
        .service
        .approve(
            request.id,
            fx.professional,
            ApproveInput {
                price_amount: 0,
                ..terms()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(zero_price, CercaError::InvalidInput { .. }));

    let odd_duration = fx
        .service
        .approve(
            request.id,
            fx.professional,
            ApproveInput {
                duration_minutes: 45,
                ..terms()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(odd_duration, CercaError::InvalidInput { .. }));

    // Validation runs before authorization and the state machine.
    let stranger = fx
        .service
        .approve(
            request.id,
            Uuid::new_v4(),
            ApproveInput {
                price_amount: 0,
                ..terms()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(stranger, CercaError::InvalidInput { .. }));

    let current = fx
        .service
        .get_request(request.id, fx.client)
        .await
        .unwrap();
    assert_eq!(current.status, RequestStatus::Requested);
    assert!(current.terms.is_none());
}

#[tokio::test]
async fn only_the_right_party_may_act() {
    let fx = setup().await;
    let request = fx
        .service
        .create_request(fx.client, request_input(fx.professional))
        .await
        .unwrap();

    let client_approves = fx
        .service
        .approve(request.id, fx.client, terms())
        .await
        .unwrap_err();
    assert!(matches!(client_approves, CercaError::Forbidden { .. }));

    let stranger_rejects = fx
        .service
        .reject(request.id, Uuid::new_v4(), RequestStatus::Requested)
        .await
        .unwrap_err();
    assert!(matches!(stranger_rejects, CercaError::Forbidden { .. }));

    fx.service
        .approve(request.id, fx.professional, terms())
        .await
        .unwrap();

    let pro_confirms = fx
        .service
        .client_confirm(request.id, fx.professional)
        .await
        .unwrap_err();
    assert!(matches!(pro_confirms, CercaError::Forbidden { .. }));

    let stranger_reads = fx
        .service
        .get_request(request.id, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(stranger_reads.is_refresh_outcome());
}

#[tokio::test]
async fn illegal_transitions_are_invalid_state() {
    let fx = setup().await;
    let request = fx
        .service
        .create_request(fx.client, request_input(fx.professional))
        .await
        .unwrap();

    let early_finish = fx
        .service
        .finish(request.id, fx.professional)
        .await
        .unwrap_err();
    assert!(matches!(early_finish, CercaError::InvalidState { .. }));

    let early_cancel = fx
        .service
        .client_cancel(request.id, fx.client)
        .await
        .unwrap_err();
    assert!(matches!(early_cancel, CercaError::InvalidState { .. }));

    fx.service
        .reject(request.id, fx.professional, RequestStatus::Requested)
        .await
        .unwrap();
    let after_reject = fx
        .service
        .approve(request.id, fx.professional, terms())
        .await
        .unwrap_err();
    assert!(matches!(after_reject, CercaError::InvalidState { .. }));
}

#[tokio::test]
async fn cancelling_an_approved_request_clears_terms() {
    let fx = setup().await;
    let request = fx
        .service
        .create_request(fx.client, request_input(fx.professional))
        .await
        .unwrap();
    fx.service
        .approve(request.id, fx.professional, terms())
        .await
        .unwrap();

    let cancelled = fx
        .service
        .client_cancel(request.id, fx.client)
        .await
        .unwrap();
    assert_eq!(cancelled.status, RequestStatus::ClientCancelled);
    assert!(cancelled.terms.is_none());
}

#[tokio::test]
async fn reject_applies_only_to_the_status_it_saw() {
    let fx = setup().await;
    let request = fx
        .service
        .create_request(fx.client, request_input(fx.professional))
        .await
        .unwrap();
    fx.service
        .approve(request.id, fx.professional, terms())
        .await
        .unwrap();

    // Decided on the pending request, arrives after the approve.
    let stale = fx
        .service
        .reject(request.id, fx.professional, RequestStatus::Requested)
        .await
        .unwrap_err();
    assert!(matches!(stale, CercaError::InvalidState { .. }));

    let from_active = fx
        .service
        .reject(request.id, fx.professional, RequestStatus::Active)
        .await
        .unwrap_err();
    assert!(matches!(from_active, CercaError::InvalidState { .. }));

    let unchanged = fx
        .service
        .get_request(request.id, fx.client)
        .await
        .unwrap();
    assert_eq!(unchanged.status, RequestStatus::Approved);
    assert!(unchanged.terms.is_some());

    let rejected = fx
        .service
        .reject(request.id, fx.professional, RequestStatus::Approved)
        .await
        .unwrap();
    assert_eq!(rejected.status, RequestStatus::Rejected);
    assert!(rejected.terms.is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_approve_and_reject_has_one_winner() {
    const N: usize = 16;
    let fx = setup().await;
    let request = fx
        .service
        .create_request(fx.client, request_input(fx.professional))
        .await
        .unwrap();

    let request_id = request.id;
    let mut tasks = Vec::with_capacity(2 * N);
    for i in 0..2 * N {
        let service = Arc::clone(&fx.service);
        let professional = fx.professional;
        tasks.push(tokio::spawn(async move {
            if i % 2 == 0 {
                service.approve(request_id, professional, terms()).await
            } else {
                service
                    .reject(request_id, professional, RequestStatus::Requested)
                    .await
            }
        }));
    }

    let mut winners = Vec::new();
    for task in tasks {
        match task.await.unwrap() {
            Ok(updated) => winners.push(updated.status),
            Err(CercaError::InvalidState { .. }) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(winners.len(), 1);
    let stored = fx
        .service
        .get_request(request.id, fx.client)
        .await
        .unwrap();
    assert_eq!(stored.status, winners[0]);
    assert!(matches!(
        stored.status,
        RequestStatus::Approved | RequestStatus::Rejected
    ));
    assert_eq!(stored.terms.is_some(), stored.status == RequestStatus::Approved);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_finishes_increment_once() {
    const N: usize = 8;
    let fx = setup().await;
    let request = fx
        .service
        .create_request(fx.client, request_input(fx.professional))
        .await
        .unwrap();
    fx.service
        .approve(request.id, fx.professional, terms())
        .await
        .unwrap();
    fx.service
        .client_confirm(request.id, fx.client)
        .await
        .unwrap();
    let before = completed_services(&fx).await;

    let request_id = request.id;
    let tasks: Vec<_> = (0..N)
        .map(|_| {
            let service = Arc::clone(&fx.service);
            let professional = fx.professional;
            tokio::spawn(async move { service.finish(request_id, professional).await })
        })
        .collect();

    let mut successes = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => successes += 1,
            Err(err) => assert!(matches!(err, CercaError::InvalidState { .. })),
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(completed_services(&fx).await, before + 1);
    assert_eq!(fx.service.pending_prompts(fx.client).await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_creations_share_one_request() {
    const N: usize = 12;
    let fx = setup().await;

    let tasks: Vec<_> = (0..N)
        .map(|_| {
            let service = Arc::clone(&fx.service);
            let client = fx.client;
            let professional = fx.professional;
            tokio::spawn(async move {
                service
                    .create_request(client, request_input(professional))
                    .await
            })
        })
        .collect();

    let mut ids = Vec::new();
    for task in tasks {
        ids.push(task.await.unwrap().unwrap().id);
    }
    ids.dedup();
    assert_eq!(ids.len(), 1);
    assert_eq!(fx.store.request_count(fx.client, fx.professional).await, 1);
}

#[tokio::test]
async fn duplicate_creation_returns_the_open_request() {
    let fx = setup().await;
    let mut pro_rx = fx.hub.register(fx.professional);

    let first = fx
        .service
        .create_request(fx.client, request_input(fx.professional))
        .await
        .unwrap();
    fx.service
        .approve(first.id, fx.professional, terms())
        .await
        .unwrap();
    drain(&mut pro_rx);

    let second = fx
        .service
        .create_request(fx.client, request_input(fx.professional))
        .await
        .unwrap();
    assert_eq!(second.id, first.id);
    assert_eq!(second.status, RequestStatus::Approved);
    assert!(drain(&mut pro_rx).is_empty());

    // A terminal state frees the pair.
    fx.service
        .reject(first.id, fx.professional, RequestStatus::Approved)
        .await
        .unwrap();
    let third = fx
        .service
        .create_request(fx.client, request_input(fx.professional))
        .await
        .unwrap();
    assert_ne!(third.id, first.id);
    assert_eq!(fx.store.request_count(fx.client, fx.professional).await, 2);
}

#[tokio::test]
async fn creation_is_validated() {
    let fx = setup().await;

    let own = fx
        .service
        .create_request(fx.professional, request_input(fx.professional))
        .await
        .unwrap_err();
    assert!(matches!(own, CercaError::Forbidden { .. }));

    let blank = fx
        .service
        .create_request(
            fx.client,
            CreateRequestInput {
                agreed_location: "   ".into(),
                ..request_input(fx.professional)
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(blank, CercaError::InvalidInput { .. }));

    let long_comment = fx
        .service
        .create_request(
            fx.client,
            CreateRequestInput {
                client_comment: Some("x".repeat(501)),
                ..request_input(fx.professional)
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(long_comment, CercaError::InvalidInput { .. }));

    let unknown = fx
        .service
        .create_request(fx.client, request_input(Uuid::new_v4()))
        .await
        .unwrap_err();
    assert!(matches!(unknown, CercaError::NotFound { .. }));
}

#[tokio::test]
async fn review_tags_are_accepted_once_from_the_client() {
    let fx = setup().await;
    let request = fx
        .service
        .create_request(fx.client, request_input(fx.professional))
        .await
        .unwrap();

    let too_early = fx
        .service
        .submit_review_tags(request.id, fx.client, vec!["#Puntual".into()])
        .await
        .unwrap_err();
    assert!(matches!(too_early, CercaError::InvalidState { .. }));

    fx.service
        .approve(request.id, fx.professional, terms())
        .await
        .unwrap();
    fx.service
        .client_confirm(request.id, fx.client)
        .await
        .unwrap();
    fx.service.finish(request.id, fx.professional).await.unwrap();

    let unknown = fx
        .service
        .submit_review_tags(request.id, fx.client, vec!["#Tarde".into()])
        .await
        .unwrap_err();
    assert!(matches!(unknown, CercaError::InvalidInput { .. }));

    let empty = fx
        .service
        .submit_review_tags(request.id, fx.client, vec![])
        .await
        .unwrap_err();
    assert!(matches!(empty, CercaError::InvalidInput { .. }));

    let by_professional = fx
        .service
        .submit_review_tags(request.id, fx.professional, vec!["#Puntual".into()])
        .await
        .unwrap_err();
    assert!(matches!(by_professional, CercaError::Forbidden { .. }));

    let tagged = fx
        .service
        .submit_review_tags(
            request.id,
            fx.client,
            vec!["#Puntual".into(), "#Discrecion".into(), "#Puntual".into()],
        )
        .await
        .unwrap();
    assert_eq!(
        tagged.review_tags,
        Some(vec!["#Puntual".to_string(), "#Discrecion".to_string()])
    );
    assert!(fx.service.pending_prompts(fx.client).await.unwrap().is_empty());

    let again = fx
        .service
        .submit_review_tags(request.id, fx.client, vec!["#IgualALaFoto".into()])
        .await
        .unwrap_err();
    assert!(matches!(again, CercaError::InvalidState { .. }));
}

#[tokio::test]
async fn history_is_listed_per_role() {
    let fx = setup().await;
    let other_client = Uuid::new_v4();

    let first = fx
        .service
        .create_request(fx.client, request_input(fx.professional))
        .await
        .unwrap();
    fx.service
        .create_request(other_client, request_input(fx.professional))
        .await
        .unwrap();
    fx.service
        .reject(first.id, fx.professional, RequestStatus::Requested)
        .await
        .unwrap();

    let pro_history = fx
        .service
        .list_requests(
            fx.professional,
            RequestFilter {
                role: Some(Party::Professional),
                status: None,
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(pro_history.total, 2);

    let client_history = fx
        .service
        .list_requests(fx.client, RequestFilter::default(), Pagination::default())
        .await
        .unwrap();
    assert_eq!(client_history.total, 1);
    assert_eq!(client_history.items[0].status, RequestStatus::Rejected);

    let clamped = fx
        .service
        .list_requests(
            fx.professional,
            RequestFilter::default(),
            Pagination {
                offset: 0,
                limit: 10_000,
            },
        )
        .await
        .unwrap();
    assert_eq!(clamped.limit, 100);
}

#[tokio::test]
async fn pushes_without_live_channels_do_not_fail_transitions() {
    let fx = setup().await;
    assert_eq!(fx.hub.connection_count(fx.client), 0);

    let request = fx
        .service
        .create_request(fx.client, request_input(fx.professional))
        .await
        .unwrap();
    let approved = fx
        .service
        .approve(request.id, fx.professional, terms())
        .await
        .unwrap();
    assert_eq!(approved.status, RequestStatus::Approved);
}
