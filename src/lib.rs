pub mod config;
pub mod database;
pub mod redis_client;
pub mod cache;
pub mod error;
pub mod models;
pub mod store;
pub mod services;
pub mod controllers;

use anyhow::Context;
use std::sync::Arc;
use tracing::info;

use store::{PgStore, Store};

// Shared state для всего приложения
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub cache: Option<cache::CacheService>,
    pub config: config::Config,
}

impl AppState {
    /// Connects Postgres (running migrations) and, when configured, Redis.
    pub async fn new(config: config::Config) -> anyhow::Result<Arc<Self>> {
        let pool = database::connect(&config.database)
            .await
            .context("failed to connect to database")?;
        info!("Database connected");

        database::run_migrations(&pool)
            .await
            .context("failed to run migrations")?;

        let cache = match &config.redis.url {
            Some(url) => {
                let redis = redis_client::RedisClient::connect(url)
                    .await
                    .context("failed to connect to Redis")?;
                Some(cache::CacheService::new(redis, config.redis.seat_map_ttl_seconds))
            }
            None => {
                info!("REDIS_URL not set, seat map cache disabled");
                None
            }
        };

        Ok(Self::with_store(Arc::new(PgStore::new(pool)), cache, config))
    }

    pub fn with_store(
        store: Arc<dyn Store>,
        cache: Option<cache::CacheService>,
        config: config::Config,
    ) -> Arc<Self> {
        Arc::new(Self { store, cache, config })
    }
}
