//! Discovery service: candidate fetch, obfuscation, scoring and paging.

use std::sync::Arc;

use cerca_core::clock::Clock;
use cerca_core::error::CercaResult;
use cerca_core::geo::{self, Coordinates};
use cerca_core::models::profile::{Profile, ProfileKind, ProfileQuery, Tier};
use cerca_core::ranking::{self, RankingInput};
use cerca_core::repository::ProfileRepository;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::DiscoveryConfig;
use crate::error::DiscoveryError;

/// Listing filters. Everything is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DiscoveryFilters {
    pub kind: Option<ProfileKind>,
    pub min_tier: Option<Tier>,
    /// Only providers whose availability window is open right now.
    pub available_now: bool,
    /// Requires a viewer location. Clamped to the configured maximum.
    pub max_distance_km: Option<f64>,
    pub offset: u64,
    /// `None` or `0` means the configured default page size.
    pub limit: Option<u64>,
}

/// One listing entry. Carries only the fuzzed location.
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveredProfile {
    pub id: Uuid,
    pub display_name: String,
    pub kind: ProfileKind,
    pub tier: Tier,
    pub location: Option<Coordinates>,
    /// Viewer to the fuzzed location, rounded to 0.1 km.
    pub distance_km: Option<f64>,
    pub available_now: bool,
    pub completed_services: u64,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryPage {
    pub items: Vec<DiscoveredProfile>,
    /// Matches before paging.
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

/// Read-only discovery over a profile store.
pub struct DiscoveryService<P: ProfileRepository> {
    profile_repo: P,
    clock: Arc<dyn Clock>,
    config: DiscoveryConfig,
}

impl<P: ProfileRepository> DiscoveryService<P> {
    pub fn new(profile_repo: P, clock: Arc<dyn Clock>, config: DiscoveryConfig) -> Self {
        Self {
            profile_repo,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Ordered, obfuscated listing for a viewer at `viewer` (if known).
    pub async fn discover(
        &self,
        viewer: Option<Coordinates>,
        filters: DiscoveryFilters,
    ) -> CercaResult<DiscoveryPage> {
        if let Some(v) = viewer {
            validate_viewer(v)?;
        }
        let max_distance_km = self.max_distance(viewer, filters.max_distance_km)?;
        let limit = match filters.limit {
            None | Some(0) => self.config.default_page_size,
            Some(n) => n.min(self.config.max_page_size),
        };

        let candidates = self
            .profile_repo
            .list_candidates(ProfileQuery {
                kind: filters.kind,
                min_tier: filters.min_tier,
                limit: self.config.candidate_limit,
            })
            .await?;
        let fetched = candidates.len();

        let now = self.clock.now();
        let mut matches: Vec<DiscoveredProfile> = candidates
            .into_iter()
            .map(|profile| self.present(profile, viewer, now))
            .filter(|p| !filters.available_now || p.available_now)
            .filter(|p| match max_distance_km {
                Some(max) => p.distance_km.is_some_and(|d| d <= max),
                None => true,
            })
            .collect();

        matches.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));

        let total = matches.len() as u64;
        let items: Vec<_> = matches
            .into_iter()
            .skip(usize::try_from(filters.offset).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .collect();

        tracing::debug!(
            fetched,
            total,
            returned = items.len(),
            has_viewer = viewer.is_some(),
            "discovery listing"
        );

        Ok(DiscoveryPage {
            items,
            total,
            offset: filters.offset,
            limit,
        })
    }

    /// Mark a profile as active now. Feeds the recency signal.
    pub async fn record_activity(&self, profile_id: Uuid) -> CercaResult<()> {
        self.profile_repo
            .record_activity(profile_id, self.clock.now())
            .await
    }

    fn max_distance(
        &self,
        viewer: Option<Coordinates>,
        requested: Option<f64>,
    ) -> Result<Option<f64>, DiscoveryError> {
        let Some(km) = requested else {
            return Ok(None);
        };
        if !km.is_finite() || km <= 0.0 {
            return Err(DiscoveryError::InvalidDistance);
        }
        if viewer.is_none() {
            return Err(DiscoveryError::DistanceWithoutViewer);
        }
        Ok(Some(km.min(self.config.max_distance_km)))
    }

    fn present(
        &self,
        profile: Profile,
        viewer: Option<Coordinates>,
        now: DateTime<Utc>,
    ) -> DiscoveredProfile {
        let key = profile.id.to_string();
        let location = geo::obfuscate(
            profile.latitude,
            profile.longitude,
            &key,
            self.config.obfuscation_radius_m,
        );
        let distance_km = viewer
            .zip(location)
            .map(|(from, to)| round_tenth(geo::haversine_km(from, to)));
        let available_now = profile.is_available_at(now);

        let score = ranking::score(
            &RankingInput {
                id: key,
                last_active_at: profile.last_active_at,
                profile_views: profile.profile_views,
                available_now,
                tier: profile.tier,
                distance_km,
            },
            now,
        );

        DiscoveredProfile {
            id: profile.id,
            display_name: profile.display_name,
            kind: profile.kind,
            tier: profile.tier,
            location,
            distance_km,
            available_now,
            completed_services: profile.completed_services,
            score,
        }
    }
}

fn validate_viewer(viewer: Coordinates) -> Result<(), DiscoveryError> {
    let ok = (-90.0..=90.0).contains(&viewer.latitude)
        && (-180.0..=180.0).contains(&viewer.longitude);
    if ok {
        Ok(())
    } else {
        Err(DiscoveryError::InvalidViewer {
            latitude: viewer.latitude,
            longitude: viewer.longitude,
        })
    }
}

fn round_tenth(km: f64) -> f64 {
    (km * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_to_a_tenth() {
        assert_eq!(round_tenth(3.14159), 3.1);
        assert_eq!(round_tenth(0.05), 0.1);
        assert_eq!(round_tenth(12.0), 12.0);
    }

    #[test]
    fn viewer_bounds() {
        assert!(validate_viewer(Coordinates::new(-33.4, -70.6)).is_ok());
        assert!(validate_viewer(Coordinates::new(91.0, 0.0)).is_err());
        assert!(validate_viewer(Coordinates::new(0.0, f64::NAN)).is_err());
    }
}
