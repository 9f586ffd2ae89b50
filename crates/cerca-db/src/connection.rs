//! Opening the SurrealDB handle shared by every repository.
//!
//! The endpoint scheme picks the engine: `ws://`/`wss://` reach a running
//! server, `mem://` embeds a throwaway store in the process (tests and
//! single-node trials).

use surrealdb::Surreal;
use surrealdb::engine::any::{self, Any};
use surrealdb::opt::auth::Root;
use tracing::info;

use crate::error::DbError;

const EMBEDDED_SCHEMES: &[&str] = &["mem://"];

/// Where the store lives and which credentials open it.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub namespace: String,
    pub database: String,
    /// Ignored for embedded endpoints, which have no users.
    pub username: String,
    pub password: String,
}

impl DbConfig {
    /// Embedded stores run in-process and accept no sign-in.
    pub fn is_embedded(&self) -> bool {
        EMBEDDED_SCHEMES
            .iter()
            .any(|scheme| self.url.starts_with(scheme))
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8000".into(),
            namespace: "cerca".into(),
            database: "main".into(),
            username: "root".into(),
            password: "root".into(),
        }
    }
}

/// An open handle with namespace and database already selected.
#[derive(Clone)]
pub struct DbManager {
    db: Surreal<Any>,
}

impl DbManager {
    pub async fn connect(config: &DbConfig) -> Result<Self, DbError> {
        let embedded = config.is_embedded();
        info!(
            url = %config.url,
            namespace = %config.namespace,
            database = %config.database,
            embedded,
            "opening booking store"
        );

        let db = any::connect(config.url.as_str()).await?;
        if !embedded {
            db.signin(Root {
                username: config.username.clone(),
                password: config.password.clone(),
            })
            .await?;
        }
        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await?;

        info!(namespace = %config.namespace, "booking store ready");
        Ok(Self { db })
    }

    pub fn client(&self) -> &Surreal<Any> {
        &self.db
    }

    /// Hand the handle to the repositories. Clones share one connection.
    pub fn into_client(self) -> Surreal<Any> {
        self.db
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_memory_endpoints_are_embedded() {
        let mut config = DbConfig::default();
        assert!(!config.is_embedded());
        config.url = "mem://".into();
        assert!(config.is_embedded());
        config.url = "wss://db.example.com".into();
        assert!(!config.is_embedded());
    }
}
