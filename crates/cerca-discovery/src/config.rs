//! Discovery configuration.

/// Configuration for the discovery service.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Maximum distance between a shown and a true location, in meters.
    pub obfuscation_radius_m: f64,
    pub default_page_size: u64,
    pub max_page_size: u64,
    /// Upper bound for the `max_distance_km` filter.
    pub max_distance_km: f64,
    /// Candidates fetched from the profile store before scoring.
    pub candidate_limit: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            obfuscation_radius_m: 500.0,
            default_page_size: 20,
            max_page_size: 100,
            max_distance_km: 50.0,
            candidate_limit: 500,
        }
    }
}
