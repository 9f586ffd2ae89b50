//! Provider profile model.
//!
//! Profiles are owned by the profile-editing surface; the core only reads
//! them and bumps `completed_services` when a booking finishes.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::Coordinates;

/// Ordered provider ranking class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    Silver,
    Gold,
    Platinum,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Silver, Tier::Gold, Tier::Platinum];

    /// Raw ranking boost.
    pub fn boost(self) -> f64 {
        match self {
            Tier::Silver => 1.0,
            Tier::Gold => 1.8,
            Tier::Platinum => 2.6,
        }
    }

    /// Boost scaled into `[0, 1]` by the largest boost.
    pub fn normalized_boost(self) -> f64 {
        self.boost() / Tier::Platinum.boost()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Silver => "Silver",
            Tier::Gold => "Gold",
            Tier::Platinum => "Platinum",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Silver" | "silver" => Ok(Tier::Silver),
            "Gold" | "gold" => Ok(Tier::Gold),
            // Older listings call the top tier "Premium".
            "Platinum" | "platinum" | "Premium" | "premium" => Ok(Tier::Platinum),
            other => Err(format!("unknown tier: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProfileKind {
    Professional,
    Venue,
    Shop,
}

impl ProfileKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProfileKind::Professional => "Professional",
            ProfileKind::Venue => "Venue",
            ProfileKind::Shop => "Shop",
        }
    }
}

impl FromStr for ProfileKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Professional" | "professional" => Ok(ProfileKind::Professional),
            "Venue" | "venue" => Ok(ProfileKind::Venue),
            "Shop" | "shop" => Ok(ProfileKind::Shop),
            other => Err(format!("unknown profile kind: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub display_name: String,
    pub kind: ProfileKind,
    /// True position. Never serialized to viewers without obfuscation.
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub tier: Tier,
    pub last_active_at: Option<DateTime<Utc>>,
    /// The provider is taking bookings right now until this instant.
    pub available_until: Option<DateTime<Utc>>,
    pub profile_views: u64,
    pub completed_services: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn location(&self) -> Option<Coordinates> {
        Coordinates::from_parts(self.latitude, self.longitude)
    }

    pub fn is_available_at(&self, now: DateTime<Utc>) -> bool {
        self.available_until.is_some_and(|until| until > now)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProfile {
    pub display_name: String,
    pub kind: ProfileKind,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub tier: Tier,
    pub last_active_at: Option<DateTime<Utc>>,
    pub available_until: Option<DateTime<Utc>>,
}

/// Candidate-set query for discovery.
#[derive(Debug, Clone)]
pub struct ProfileQuery {
    pub kind: Option<ProfileKind>,
    pub min_tier: Option<Tier>,
    /// Upper bound on candidates fetched before scoring.
    pub limit: u64,
}

impl Default for ProfileQuery {
    fn default() -> Self {
        Self {
            kind: None,
            min_tier: None,
            limit: 500,
        }
    }
}

impl ProfileQuery {
    pub fn matches(&self, profile: &Profile) -> bool {
        self.kind.is_none_or(|k| k == profile.kind)
            && self.min_tier.is_none_or(|t| profile.tier >= t)
    }
}
