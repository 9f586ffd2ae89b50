//! Cerca Hub — best-effort delivery of events to a user's live connections.
//!
//! The hub keeps no buffer and no history. A user with no registered
//! channel simply misses the event and re-fetches state on reconnect.
//! Callers depend on the [`Hub`] trait only, so the state machine never
//! knows which transport carries the bytes.

pub mod registry;

pub use registry::{ChannelHandle, InProcessHub, Registration};

use cerca_core::models::event::HubEvent;
use uuid::Uuid;

/// Per-user fan-out of [`HubEvent`]s.
///
/// All methods are synchronous and must be safe to call from any number of
/// tasks at once.
pub trait Hub: Send + Sync {
    /// Open a new channel for `user_id`. A user may hold any number of
    /// channels; each receives every event pushed to that user.
    fn register(&self, user_id: Uuid) -> Registration;

    /// Close a channel. Unknown or already-closed handles are ignored.
    fn unregister(&self, handle: &ChannelHandle);

    /// Deliver `event` to every live channel of `user_id` and return how
    /// many channels accepted it. Never fails.
    fn push(&self, user_id: Uuid, event: HubEvent) -> usize;

    /// Live channels currently registered for `user_id`.
    fn connection_count(&self, user_id: Uuid) -> usize;
}
