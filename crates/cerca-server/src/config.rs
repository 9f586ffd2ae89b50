//! Server configuration from the environment.
//!
//! Unset or unparsable variables fall back to their defaults.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use cerca_booking::BookingConfig;
use cerca_db::DbConfig;
use cerca_discovery::DiscoveryConfig;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_SSE_KEEPALIVE_SECS: u64 = 15;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub db: DbConfig,
    pub booking: BookingConfig,
    pub discovery: DiscoveryConfig,
    /// Interval between keep-alive comments on idle event streams.
    pub sse_keepalive: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            db: DbConfig::default(),
            booking: BookingConfig::default(),
            discovery: DiscoveryConfig::default(),
            sse_keepalive: Duration::from_secs(DEFAULT_SSE_KEEPALIVE_SECS),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let db_defaults = defaults.db;

        let bind_addr = env_string("CERCA_BIND_ADDR", DEFAULT_BIND_ADDR)
            .parse()
            .unwrap_or_else(|_| {
                tracing::warn!("invalid CERCA_BIND_ADDR, using {DEFAULT_BIND_ADDR}");
                defaults.bind_addr
            });

        let radius = env_f64(
            "CERCA_OBFUSCATION_RADIUS_M",
            defaults.discovery.obfuscation_radius_m,
        );

        Self {
            bind_addr,
            db: DbConfig {
                url: env_string("CERCA_DB_URL", &db_defaults.url),
                namespace: env_string("CERCA_DB_NAMESPACE", &db_defaults.namespace),
                database: env_string("CERCA_DB_DATABASE", &db_defaults.database),
                username: env_string("CERCA_DB_USER", &db_defaults.username),
                password: env_string("CERCA_DB_PASSWORD", &db_defaults.password),
            },
            booking: defaults.booking,
            discovery: DiscoveryConfig {
                obfuscation_radius_m: if radius.is_finite() && radius >= 0.0 {
                    radius
                } else {
                    defaults.discovery.obfuscation_radius_m
                },
                ..defaults.discovery
            },
            sse_keepalive: Duration::from_secs(
                env_u64("CERCA_SSE_KEEPALIVE_SECS", DEFAULT_SSE_KEEPALIVE_SECS).max(1),
            ),
        }
    }
}

fn env_string(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_f64(name: &str, default: f64) -> f64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<f64>().ok())
        .unwrap_or(default)
}
