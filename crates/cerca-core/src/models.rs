//! Domain models for cerca.

pub mod event;
pub mod profile;
pub mod review;
pub mod service_request;
