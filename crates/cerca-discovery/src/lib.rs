//! Cerca Discovery — "near you" listings without exact positions.
//!
//! Each candidate's coordinates are replaced by a stable fuzzed point, the
//! viewer's distance is measured to that point, and results are ordered by
//! the ranking score.

pub mod config;
pub mod error;
pub mod service;

pub use config::DiscoveryConfig;
pub use error::DiscoveryError;
pub use service::{DiscoveredProfile, DiscoveryFilters, DiscoveryPage, DiscoveryService};
