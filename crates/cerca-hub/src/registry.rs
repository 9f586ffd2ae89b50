//! In-process hub backed by a mutex-guarded registry.
//!
//! Registrations in one process are invisible to another; a deployment with
//! more than one instance needs a shared pub/sub behind the [`Hub`] trait.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use cerca_core::models::event::HubEvent;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::Hub;

/// Opaque identity of one live channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelHandle {
    pub user_id: Uuid,
    pub channel_id: Uuid,
}

/// Returned by [`Hub::register`]. The transport drains `receiver` and calls
/// [`Hub::unregister`] with `handle` once the connection drops.
#[derive(Debug)]
pub struct Registration {
    pub handle: ChannelHandle,
    pub receiver: mpsc::UnboundedReceiver<HubEvent>,
}

#[derive(Debug)]
struct LiveConnection {
    sender: mpsc::UnboundedSender<HubEvent>,
    created_at: DateTime<Utc>,
}

type Registry = HashMap<Uuid, HashMap<Uuid, LiveConnection>>;

#[derive(Debug, Default)]
pub struct InProcessHub {
    connections: Mutex<Registry>,
}

impl InProcessHub {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave the map half-updated,
    // so a poisoned registry is still usable.
    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Creation time of a live channel, if it is still registered.
    pub fn connected_since(&self, handle: &ChannelHandle) -> Option<DateTime<Utc>> {
        self.lock()
            .get(&handle.user_id)
            .and_then(|channels| channels.get(&handle.channel_id))
            .map(|conn| conn.created_at)
    }
}

impl Hub for InProcessHub {
    fn register(&self, user_id: Uuid) -> Registration {
        let (sender, receiver) = mpsc::unbounded_channel();
        let handle = ChannelHandle {
            user_id,
            channel_id: Uuid::new_v4(),
        };

        let mut registry = self.lock();
        let channels = registry.entry(user_id).or_default();
        channels.insert(
            handle.channel_id,
            LiveConnection {
                sender,
                created_at: Utc::now(),
            },
        );
        tracing::debug!(%user_id, channels = channels.len(), "channel registered");

        Registration { handle, receiver }
    }

    fn unregister(&self, handle: &ChannelHandle) {
        let mut registry = self.lock();
        let Some(channels) = registry.get_mut(&handle.user_id) else {
            return;
        };
        if channels.remove(&handle.channel_id).is_some() {
            tracing::debug!(
                user_id = %handle.user_id,
                channels = channels.len(),
                "channel unregistered"
            );
        }
        if channels.is_empty() {
            registry.remove(&handle.user_id);
        }
    }

    fn push(&self, user_id: Uuid, event: HubEvent) -> usize {
        let mut registry = self.lock();
        let Some(channels) = registry.get_mut(&user_id) else {
            tracing::trace!(%user_id, event_type = %event.event_type, "no live channel, dropped");
            return 0;
        };

        let mut delivered = 0;
        channels.retain(|_, conn| match conn.sender.send(event.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            // Receiver dropped without unregistering.
            Err(_) => false,
        });

        tracing::debug!(
            %user_id,
            event_type = %event.event_type,
            delivered,
            "event pushed"
        );

        if channels.is_empty() {
            registry.remove(&user_id);
        }
        delivered
    }

    fn connection_count(&self, user_id: Uuid) -> usize {
        self.lock().get(&user_id).map_or(0, HashMap::len)
    }
}
