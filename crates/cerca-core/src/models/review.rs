//! Quick-review prompts sent to the client when a booking finishes.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PromptStatus {
    Pending,
    Answered,
}

impl PromptStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PromptStatus::Pending => "Pending",
            PromptStatus::Answered => "Answered",
        }
    }
}

impl fmt::Display for PromptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PromptStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(PromptStatus::Pending),
            "Answered" => Ok(PromptStatus::Answered),
            other => Err(format!("unknown prompt status: {other}")),
        }
    }
}

/// "Please tag this experience" notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewPrompt {
    pub id: Uuid,
    pub request_id: Uuid,
    /// The client being asked.
    pub user_id: Uuid,
    /// Tags offered to the client.
    pub tags: Vec<String>,
    pub status: PromptStatus,
    pub created_at: DateTime<Utc>,
    pub answered_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReviewPrompt {
    pub user_id: Uuid,
    pub tags: Vec<String>,
}
