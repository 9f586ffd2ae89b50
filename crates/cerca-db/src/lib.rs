//! Cerca Database — persistence for profiles, service requests and review
//! prompts.
//!
//! This crate provides:
//! - Connection management ([`DbManager`], [`DbConfig`])
//! - Schema initialization and migrations ([`run_migrations`])
//! - SurrealDB repositories ([`repository`])
//! - An in-process store with the same guarantees ([`MemoryStore`])
//! - Error types ([`DbError`])

mod connection;
mod error;
pub mod memory;
pub mod repository;
mod schema;

pub use connection::{DbConfig, DbManager};
pub use error::DbError;
pub use memory::MemoryStore;
pub use schema::{run_migrations, schema_v1};
