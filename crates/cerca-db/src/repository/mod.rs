//! SurrealDB repository implementations.

mod profile;
mod review_prompt;
mod service_request;

pub use profile::SurrealProfileRepository;
pub use review_prompt::SurrealReviewPromptRepository;
pub use service_request::SurrealServiceRequestRepository;

use uuid::Uuid;

use crate::error::DbError;

pub(crate) fn parse_uuid(field: &str, raw: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(raw).map_err(|e| DbError::decode(&format!("invalid {field} UUID"), e))
}

/// Record id of the open-request slot for a (client, professional) pair.
pub(crate) fn open_slot_key(client_id: Uuid, professional_id: Uuid) -> String {
    format!("{client_id}_{professional_id}")
}
