//! Shared application state.

use std::sync::Arc;
use std::time::Duration;

use cerca_booking::BookingService;
use cerca_core::clock::SystemClock;
use cerca_db::repository::{
    SurrealProfileRepository, SurrealReviewPromptRepository, SurrealServiceRequestRepository,
};
use cerca_discovery::DiscoveryService;
use cerca_hub::{Hub, InProcessHub};
use surrealdb::Surreal;
use surrealdb::engine::any::Any;

use crate::config::ServerConfig;

pub type Booking = BookingService<
    SurrealServiceRequestRepository<Any>,
    SurrealProfileRepository<Any>,
    SurrealReviewPromptRepository<Any>,
>;

pub type Discovery = DiscoveryService<SurrealProfileRepository<Any>>;

#[derive(Clone)]
pub struct AppState {
    pub booking: Arc<Booking>,
    pub discovery: Arc<Discovery>,
    pub hub: Arc<dyn Hub>,
    pub sse_keepalive: Duration,
}

impl AppState {
    pub fn new(db: Surreal<Any>, config: &ServerConfig) -> Self {
        let hub: Arc<dyn Hub> = Arc::new(InProcessHub::new());

        let booking = BookingService::new(
            SurrealServiceRequestRepository::new(db.clone()),
            SurrealProfileRepository::new(db.clone()),
            SurrealReviewPromptRepository::new(db.clone()),
            Arc::clone(&hub),
            config.booking.clone(),
        );
        let discovery = DiscoveryService::new(
            SurrealProfileRepository::new(db),
            Arc::new(SystemClock),
            config.discovery.clone(),
        );

        Self {
            booking: Arc::new(booking),
            discovery: Arc::new(discovery),
            hub,
            sse_keepalive: config.sse_keepalive,
        }
    }
}
