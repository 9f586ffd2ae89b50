//! Cerca Core — domain types shared by every crate in the workspace.
//!
//! - [`error`]: the error taxonomy every operation reports through
//! - [`models`]: profiles, service requests, review prompts, hub events
//! - [`repository`]: persistence traits implemented by `cerca-db`
//! - [`geo`]: deterministic location obfuscation and distances
//! - [`ranking`]: discovery scoring with daily anti-stagnation noise

pub mod clock;
pub mod error;
pub mod geo;
pub mod hashing;
pub mod models;
pub mod ranking;
pub mod repository;
