//! Events pushed to live connections through the hub.
//!
//! Clients treat every event as "something changed, re-fetch"; payloads are
//! a convenience snapshot, not an ordered delta stream.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::review::ReviewPrompt;
use crate::models::service_request::ServiceRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "service_request.created")]
    RequestCreated,
    #[serde(rename = "service_request.updated")]
    RequestUpdated,
    #[serde(rename = "review.tags_requested")]
    ReviewTagsRequested,
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::RequestCreated => "service_request.created",
            EventType::RequestUpdated => "service_request.updated",
            EventType::ReviewTagsRequested => "review.tags_requested",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HubEvent {
    pub event_type: EventType,
    pub payload: serde_json::Value,
    pub emitted_at: DateTime<Utc>,
}

impl HubEvent {
    pub fn new(event_type: EventType, payload: serde_json::Value) -> Self {
        Self {
            event_type,
            payload,
            emitted_at: Utc::now(),
        }
    }

    pub fn request_created(request: &ServiceRequest) -> Result<Self, serde_json::Error> {
        Ok(Self::new(
            EventType::RequestCreated,
            serde_json::to_value(request)?,
        ))
    }

    pub fn request_updated(request: &ServiceRequest) -> Result<Self, serde_json::Error> {
        Ok(Self::new(
            EventType::RequestUpdated,
            serde_json::to_value(request)?,
        ))
    }

    pub fn review_tags_requested(prompt: &ReviewPrompt) -> Result<Self, serde_json::Error> {
        Ok(Self::new(
            EventType::ReviewTagsRequested,
            serde_json::to_value(prompt)?,
        ))
    }

    /// Wire encoding handed to the transport.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}
