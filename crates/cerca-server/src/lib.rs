//! Cerca Server — HTTP and server-sent events surface.

pub mod config;
pub mod error;
pub mod events;
pub mod identity;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use routes::build_router;
pub use state::AppState;
