//! Database module - AppState and database operations
//!
//! This module is split into submodules for better separation of concerns:
//! - `carrier` - Carrier (transportadora) database operations
//! - `user` - Portal user database operations
//!
//! Fiscal documents go through the injected `DocumentRepository` instead of
//! living here; the export pipeline must not depend on ambient state.

mod carrier;
mod user;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use moka::future::Cache;
use sqlx::PgPool;

use crate::export::gateway::{DanfeGateway, GatewayConfig};
use crate::nfe::repository::{DocumentRepository, PgDocumentRepository};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub carrier_cache: Cache<String, Vec<crate::carrier::model::Carrier>>,
    pub documents: Arc<dyn DocumentRepository>,
    pub gateway: DanfeGateway,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file
        let gateway_config = GatewayConfig::from_env()?;
        Self::new_with_config(gateway_config).await
    }

    pub async fn new_with_config(gateway_config: GatewayConfig) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let database_url = std::env::var("PORTAL_DATABASE_URL")
            .context("PORTAL_DATABASE_URL must be set")?;

        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(50)
            .min_connections(5)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(900))
            .max_lifetime(Duration::from_secs(1800))
            .connect(&database_url)
            .await?;

        let documents: Arc<dyn DocumentRepository> =
            Arc::new(PgDocumentRepository::new(pool.clone()));
        let gateway = DanfeGateway::new(gateway_config)?;

        Ok(Self::assemble(pool, documents, gateway))
    }

    /// Wire an AppState over an existing pool and repository. Tests use
    /// this with a lazy pool and the in-memory repository.
    pub fn new_with_pool_and_repository(
        pool: PgPool,
        documents: Arc<dyn DocumentRepository>,
        gateway: DanfeGateway,
    ) -> Self {
        Self::assemble(pool, documents, gateway)
    }

    fn assemble(
        pool: PgPool,
        documents: Arc<dyn DocumentRepository>,
        gateway: DanfeGateway,
    ) -> Self {
        let carrier_cache = Cache::builder()
            .time_to_live(Duration::from_secs(10 * 60))
            .max_capacity(10)
            .build();

        AppState {
            pool,
            carrier_cache,
            documents,
            gateway,
        }
    }
}
