//! Server-sent events transport for the hub.
//!
//! Each open stream is one hub registration. The registration is released
//! when the stream is dropped, which is how a client disconnect reaches the
//! hub.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use cerca_core::error::CercaError;
use cerca_core::models::event::HubEvent;
use cerca_hub::{ChannelHandle, Hub, Registration};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::{Stream, StreamExt};

use crate::identity::Actor;
use crate::state::AppState;

/// A hub registration as a stream. Unregisters on drop.
pub struct HubStream {
    inner: UnboundedReceiverStream<HubEvent>,
    hub: Arc<dyn Hub>,
    handle: ChannelHandle,
}

impl HubStream {
    pub fn new(hub: Arc<dyn Hub>, registration: Registration) -> Self {
        Self {
            inner: UnboundedReceiverStream::new(registration.receiver),
            hub,
            handle: registration.handle,
        }
    }
}

impl Stream for HubStream {
    type Item = HubEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

impl Drop for HubStream {
    fn drop(&mut self) {
        self.hub.unregister(&self.handle);
        tracing::debug!(user_id = %self.handle.user_id, "event stream closed");
    }
}

fn to_sse(event: HubEvent) -> Result<Event, serde_json::Error> {
    let bytes = event.to_json_bytes()?;
    Ok(Event::default()
        .event(event.event_type.as_str())
        .data(String::from_utf8_lossy(&bytes)))
}

/// `GET /v1/events`
pub async fn events_handler(
    State(state): State<AppState>,
    Actor(user_id): Actor,
) -> Sse<impl Stream<Item = Result<Event, serde_json::Error>>> {
    let registration = state.hub.register(user_id);
    tracing::info!(
        %user_id,
        channels = state.hub.connection_count(user_id),
        "event stream opened"
    );

    // Users without a profile (plain clients) have no activity to record.
    match state.discovery.record_activity(user_id).await {
        Ok(()) | Err(CercaError::NotFound { .. }) => {}
        Err(e) => tracing::warn!(%user_id, error = %e, "failed to record activity"),
    }

    let stream = HubStream::new(Arc::clone(&state.hub), registration).map(to_sse);
    Sse::new(stream).keep_alive(KeepAlive::new().interval(state.sse_keepalive))
}
