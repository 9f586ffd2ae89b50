//! Service request (booking) model and its transition table.
//!
//! ```text
//! Requested --approve--> Approved
//! Requested --reject---> Rejected*
//! Approved  --reject---> Rejected*
//! Approved  --confirm--> Active
//! Approved  --cancel---> ClientCancelled*
//! Active    --finish---> Finished*
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestStatus {
    Requested,
    Approved,
    Active,
    Finished,
    Rejected,
    ClientCancelled,
}

impl RequestStatus {
    /// States that hold the (client, professional) slot.
    pub const OPEN: [RequestStatus; 3] = [
        RequestStatus::Requested,
        RequestStatus::Approved,
        RequestStatus::Active,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Requested => "Requested",
            RequestStatus::Approved => "Approved",
            RequestStatus::Active => "Active",
            RequestStatus::Finished => "Finished",
            RequestStatus::Rejected => "Rejected",
            RequestStatus::ClientCancelled => "ClientCancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RequestStatus::Finished | RequestStatus::Rejected | RequestStatus::ClientCancelled
        )
    }

    pub fn is_open(self) -> bool {
        !self.is_terminal()
    }

    /// Whether negotiated terms must be present in this state.
    pub fn carries_terms(self) -> bool {
        matches!(
            self,
            RequestStatus::Approved | RequestStatus::Active | RequestStatus::Finished
        )
    }

    /// The state reached by applying `action`, or `None` if illegal.
    pub fn apply(self, action: BookingAction) -> Option<RequestStatus> {
        use BookingAction::*;
        use RequestStatus::*;

        match (self, action) {
            (Requested, Approve) => Some(Approved),
            (Requested | Approved, Reject) => Some(Rejected),
            (Approved, ClientConfirm) => Some(Active),
            (Approved, ClientCancel) => Some(ClientCancelled),
            (Active, Finish) => Some(Finished),
            _ => None,
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Requested" => Ok(RequestStatus::Requested),
            "Approved" => Ok(RequestStatus::Approved),
            "Active" => Ok(RequestStatus::Active),
            "Finished" => Ok(RequestStatus::Finished),
            "Rejected" => Ok(RequestStatus::Rejected),
            "ClientCancelled" => Ok(RequestStatus::ClientCancelled),
            other => Err(format!("unknown request status: {other}")),
        }
    }
}

/// Which side of a request an identity is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Party {
    Client,
    Professional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookingAction {
    Approve,
    Reject,
    ClientConfirm,
    ClientCancel,
    Finish,
}

impl BookingAction {
    /// The only party allowed to perform this action.
    pub fn actor(self) -> Party {
        match self {
            BookingAction::Approve | BookingAction::Reject | BookingAction::Finish => {
                Party::Professional
            }
            BookingAction::ClientConfirm | BookingAction::ClientCancel => Party::Client,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BookingAction::Approve => "approve",
            BookingAction::Reject => "reject",
            BookingAction::ClientConfirm => "client_confirm",
            BookingAction::ClientCancel => "client_cancel",
            BookingAction::Finish => "finish",
        }
    }
}

impl fmt::Display for BookingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Price and duration agreed when the professional approves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegotiatedTerms {
    /// Positive amount in the currency's minor unit.
    pub price_amount: u64,
    pub duration_minutes: u32,
    pub provider_note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceRequest {
    pub id: Uuid,
    pub client_id: Uuid,
    pub professional_id: Uuid,
    pub status: RequestStatus,
    /// Present exactly when `status.carries_terms()`.
    pub terms: Option<NegotiatedTerms>,
    pub requested_date: NaiveDate,
    pub requested_time: NaiveTime,
    pub agreed_location: String,
    pub client_comment: Option<String>,
    /// Quick-review tags submitted by the client after finishing.
    pub review_tags: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ServiceRequest {
    pub fn party_of(&self, actor_id: Uuid) -> Option<Party> {
        if actor_id == self.client_id {
            Some(Party::Client)
        } else if actor_id == self.professional_id {
            Some(Party::Professional)
        } else {
            None
        }
    }

    pub fn participants(&self) -> [Uuid; 2] {
        [self.client_id, self.professional_id]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateServiceRequest {
    pub client_id: Uuid,
    pub professional_id: Uuid,
    pub requested_date: NaiveDate,
    pub requested_time: NaiveTime,
    pub agreed_location: String,
    pub client_comment: Option<String>,
}

/// Result of an idempotent creation.
#[derive(Debug, Clone)]
pub enum CreateOutcome {
    Created(ServiceRequest),
    /// An open request for the same pair already existed and is returned
    /// unchanged.
    Existing(ServiceRequest),
}

impl CreateOutcome {
    pub fn was_created(&self) -> bool {
        matches!(self, CreateOutcome::Created(_))
    }

    pub fn into_inner(self) -> ServiceRequest {
        match self {
            CreateOutcome::Created(r) | CreateOutcome::Existing(r) => r,
        }
    }
}

/// What a transition does to the negotiated terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TermsChange {
    Keep,
    Set(NegotiatedTerms),
    Clear,
}

/// A guarded write: move from `expected` to `target` only if the stored
/// status still equals `expected`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub expected: RequestStatus,
    pub target: RequestStatus,
    pub terms: TermsChange,
}

impl StatusChange {
    /// Plan `action` from `current`. `terms` is only used when the target
    /// state introduces terms. `None` if the action is illegal.
    pub fn plan(
        current: RequestStatus,
        action: BookingAction,
        terms: Option<NegotiatedTerms>,
    ) -> Option<Self> {
        let target = current.apply(action)?;
        let terms = match (current.carries_terms(), target.carries_terms()) {
            (false, true) => TermsChange::Set(terms?),
            (true, false) => TermsChange::Clear,
            _ => TermsChange::Keep,
        };
        Some(Self {
            expected: current,
            target,
            terms,
        })
    }

    /// Terms after the write, given the stored ones.
    pub fn resulting_terms(&self, stored: Option<NegotiatedTerms>) -> Option<NegotiatedTerms> {
        match &self.terms {
            TermsChange::Keep => stored,
            TermsChange::Set(t) => Some(t.clone()),
            TermsChange::Clear => None,
        }
    }
}
