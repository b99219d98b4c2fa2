//! Session registry: explicit ownership of connection, catalog and
//! registry, one unit per session.
//!
//! A session is created on connect (liveness ping, catalog build, metadata
//! reflection) and torn down on disconnect. The catalog is immutable for
//! the session's lifetime; a schema change mid-session requires reconnect.
//! In-flight operations on one session are serialized by an internal gate;
//! operations across sessions are independent.

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::collections::HashMap;
use std::sync::Arc;
use tabletalk_catalog::{TableRegistry, build_catalog, reflect_metadata};
use tabletalk_core::{
    CreatePlan, ExposedCatalog, GatewayError, ReadPlan, UpdatePlan,
};
use tokio::sync::{Mutex, RwLock};

use crate::{CreateOutcome, GuardedExecutor, RowMap, UpdateOutcome};

/// One connected database session: pool, catalog, registry and the
/// per-session operation gate.
#[derive(Debug)]
pub struct Session {
    pool: PgPool,
    catalog: ExposedCatalog,
    registry: TableRegistry,
    gate: Mutex<()>,
}

impl Session {
    /// Connect, ping, and build the catalog. A failed build fails the
    /// connect; a session never exists with a partial catalog.
    pub async fn connect(database_url: &str) -> Result<Self, GatewayError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        sqlx::query("SELECT 1").execute(&pool).await?;

        let catalog = build_catalog(&pool).await?;
        let registry = reflect_metadata(&catalog);

        Ok(Self {
            pool,
            catalog,
            registry,
            gate: Mutex::new(()),
        })
    }

    pub fn catalog(&self) -> &ExposedCatalog {
        &self.catalog
    }

    pub async fn read(&self, plan: &ReadPlan) -> Result<Vec<RowMap>, GatewayError> {
        let _in_flight = self.gate.lock().await;
        GuardedExecutor::new(&self.pool, &self.registry)
            .read(plan)
            .await
    }

    pub async fn create(&self, plan: &CreatePlan) -> Result<CreateOutcome, GatewayError> {
        let _in_flight = self.gate.lock().await;
        GuardedExecutor::new(&self.pool, &self.registry)
            .create(plan)
            .await
    }

    pub async fn preview_update(&self, plan: &UpdatePlan) -> Result<Vec<RowMap>, GatewayError> {
        let _in_flight = self.gate.lock().await;
        GuardedExecutor::new(&self.pool, &self.registry)
            .preview_update(plan)
            .await
    }

    pub async fn update(&self, plan: &UpdatePlan) -> Result<UpdateOutcome, GatewayError> {
        let _in_flight = self.gate.lock().await;
        GuardedExecutor::new(&self.pool, &self.registry)
            .update(plan)
            .await
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// All live sessions, keyed by caller-chosen id. Reconnecting under an
/// existing id discards the old session and its catalog.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn connect(
        &self,
        session_id: &str,
        database_url: &str,
    ) -> Result<Arc<Session>, GatewayError> {
        let session = Arc::new(Session::connect(database_url).await?);
        let previous = {
            let mut sessions = self.sessions.write().await;
            sessions.insert(session_id.to_string(), Arc::clone(&session))
        };
        if let Some(old) = previous {
            old.close().await;
        }
        tracing::info!(
            session = session_id,
            exposed = session.catalog.exposed_tables.len(),
            "session connected"
        );
        Ok(session)
    }

    pub async fn get(&self, session_id: &str) -> Result<Arc<Session>, GatewayError> {
        let sessions = self.sessions.read().await;
        sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| GatewayError::NotConnected(session_id.to_string()))
    }

    pub async fn disconnect(&self, session_id: &str) -> Result<(), GatewayError> {
        let removed = {
            let mut sessions = self.sessions.write().await;
            sessions.remove(session_id)
        };
        match removed {
            Some(session) => {
                session.close().await;
                tracing::info!(session = session_id, "session disconnected");
                Ok(())
            }
            None => Err(GatewayError::NotConnected(session_id.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_session_is_not_connected() {
        let registry = SessionRegistry::new();
        let err = registry.get("nobody").await.unwrap_err();
        assert!(matches!(err, GatewayError::NotConnected(id) if id == "nobody"));

        let err = registry.disconnect("nobody").await.unwrap_err();
        assert!(matches!(err, GatewayError::NotConnected(_)));
    }
}
