//! Discovery ranking.
//!
//! A fixed weighted sum over recency, popularity, availability, tier and
//! distance, plus a small per-profile noise term that changes once per
//! calendar day (UTC). Within a day ordering is stable; across days it
//! shuffles enough that the same few profiles do not own page one forever.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::hashing::stable_hash64;
use crate::models::profile::Tier;

pub const RECENCY_WEIGHT: f64 = 0.20;
pub const POPULARITY_WEIGHT: f64 = 0.20;
pub const AVAILABILITY_WEIGHT: f64 = 0.25;
pub const TIER_WEIGHT: f64 = 0.25;
pub const DISTANCE_WEIGHT: f64 = 0.10;

/// Amplitude of the daily anti-stagnation noise.
pub const NOISE_FACTOR: f64 = 0.1;

/// Activity older than this contributes nothing to recency.
pub const RECENCY_HORIZON_HOURS: f64 = 168.0;
/// View count at which popularity saturates.
pub const POPULARITY_SATURATION_VIEWS: f64 = 500.0;
/// Distance at which the distance signal reaches zero.
pub const DISTANCE_HORIZON_KM: f64 = 50.0;
/// Distance signal when the viewer or the profile has no location.
pub const NEUTRAL_DISTANCE_SIGNAL: f64 = 0.5;

/// Signals for one candidate, computed per query and never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingInput {
    pub id: String,
    pub last_active_at: Option<DateTime<Utc>>,
    pub profile_views: u64,
    pub available_now: bool,
    pub tier: Tier,
    pub distance_km: Option<f64>,
}

fn recency_signal(last_active_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
    let hours = last_active_at
        .map(|at| (now - at).num_seconds().max(0) as f64 / 3600.0)
        .unwrap_or(RECENCY_HORIZON_HOURS);
    (1.0 - hours / RECENCY_HORIZON_HOURS).max(0.0)
}

fn popularity_signal(views: u64) -> f64 {
    (views as f64 / POPULARITY_SATURATION_VIEWS).min(1.0)
}

fn distance_signal(distance_km: Option<f64>) -> f64 {
    match distance_km {
        Some(km) if km.is_finite() => (1.0 - km.max(0.0) / DISTANCE_HORIZON_KM).max(0.0),
        _ => NEUTRAL_DISTANCE_SIGNAL,
    }
}

/// Deterministic noise in `[0, NOISE_FACTOR)` for `id` on the UTC day of `now`.
pub fn daily_noise(id: &str, now: DateTime<Utc>) -> f64 {
    let day = now.date_naive().format("%Y-%m-%d");
    let bucket = stable_hash64(&format!("{id}{day}")) % 1000;
    NOISE_FACTOR * bucket as f64 / 1000.0
}

/// Score without the noise term. Always in `[0, 1]`.
pub fn base_score(input: &RankingInput, now: DateTime<Utc>) -> f64 {
    let availability = if input.available_now { 1.0 } else { 0.0 };

    RECENCY_WEIGHT * recency_signal(input.last_active_at, now)
        + POPULARITY_WEIGHT * popularity_signal(input.profile_views)
        + AVAILABILITY_WEIGHT * availability
        + TIER_WEIGHT * input.tier.normalized_boost()
        + DISTANCE_WEIGHT * distance_signal(input.distance_km)
}

/// Full discovery score. Pure and cheap enough for a sort comparator.
pub fn score(input: &RankingInput, now: DateTime<Utc>) -> f64 {
    base_score(input, now) + daily_noise(&input.id, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 19, 0, 0).unwrap()
    }

    fn input() -> RankingInput {
        RankingInput {
            id: "profile-1".into(),
            last_active_at: Some(now() - Duration::hours(12)),
            profile_views: 120,
            available_now: false,
            tier: Tier::Gold,
            distance_km: Some(10.0),
        }
    }

    #[test]
    fn weights_sum_to_one() {
        let total =
            RECENCY_WEIGHT + POPULARITY_WEIGHT + AVAILABILITY_WEIGHT + TIER_WEIGHT + DISTANCE_WEIGHT;
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn missing_activity_is_fully_decayed() {
        assert_eq!(recency_signal(None, now()), 0.0);
        assert_eq!(recency_signal(Some(now() - Duration::hours(200)), now()), 0.0);
        assert!((recency_signal(Some(now() - Duration::hours(84)), now()) - 0.5).abs() < 1e-9);
        assert_eq!(recency_signal(Some(now()), now()), 1.0);
    }

    #[test]
    fn popularity_saturates() {
        assert_eq!(popularity_signal(0), 0.0);
        assert_eq!(popularity_signal(250), 0.5);
        assert_eq!(popularity_signal(10_000), 1.0);
    }

    #[test]
    fn missing_distance_is_neutral() {
        assert_eq!(distance_signal(None), 0.5);
        assert_eq!(distance_signal(Some(0.0)), 1.0);
        assert_eq!(distance_signal(Some(75.0)), 0.0);
    }

    #[test]
    fn maximal_profile_scores_one_before_noise() {
        let top = RankingInput {
            id: "top".into(),
            last_active_at: Some(now()),
            profile_views: 500,
            available_now: true,
            tier: Tier::Platinum,
            distance_km: Some(0.0),
        };
        assert!((base_score(&top, now()) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn availability_strictly_outranks() {
        let off = input();
        let on = RankingInput {
            available_now: true,
            ..input()
        };
        assert!(score(&on, now()) > score(&off, now()));
    }

    #[test]
    fn noise_is_stable_within_a_day_and_bounded() {
        let morning = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 1).unwrap();
        let night = Utc.with_ymd_and_hms(2024, 5, 1, 23, 59, 59).unwrap();
        assert_eq!(daily_noise("p", morning), daily_noise("p", night));
        for i in 0..500 {
            let n = daily_noise(&format!("p{i}"), morning);
            assert!((0.0..NOISE_FACTOR).contains(&n));
        }
    }

    #[test]
    fn noise_changes_across_days() {
        let changed = (0..50)
            .filter(|i| {
                let id = format!("p{i}");
                daily_noise(&id, now()) != daily_noise(&id, now() + Duration::days(1))
            })
            .count();
        assert!(changed > 40);
    }

    proptest! {
        #[test]
        fn closer_strictly_scores_higher(near in 0.0f64..49.0, gap in 0.01f64..1.0) {
            let far = (near + gap).min(50.0);
            prop_assume!(far > near);
            let a = RankingInput { distance_km: Some(near), ..input() };
            let b = RankingInput { distance_km: Some(far), ..input() };
            prop_assert!(score(&a, now()) > score(&b, now()));
        }

        #[test]
        fn higher_tier_never_scores_lower(views in 0u64..1_000) {
            let silver = RankingInput { tier: Tier::Silver, profile_views: views, ..input() };
            let platinum = RankingInput { tier: Tier::Platinum, profile_views: views, ..input() };
            prop_assert!(base_score(&platinum, now()) > base_score(&silver, now()));
        }
    }
}
