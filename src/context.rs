/// Application context and dependency injection
use crate::{
    account::AccountManager,
    config::ServerConfig,
    db,
    error::AppResult,
    meetings::{MeetingReconciler, MeetingStore},
    oauth::{HandshakeCoordinator, TokenManager},
    provider::ProviderClient,
    rate_limit::RateLimiter,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub account_manager: Arc<AccountManager>,
    pub handshake: Arc<HandshakeCoordinator>,
    pub reconciler: Arc<MeetingReconciler>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> AppResult<Self> {
        config.validate()?;

        if !config.storage.data_directory.exists() {
            tokio::fs::create_dir_all(&config.storage.data_directory).await?;
        }

        let db = db::create_pool(&config.storage.database, db::DatabaseOptions::default()).await?;
        db::run_migrations(&db).await?;
        db::test_connection(&db).await?;

        Self::from_pool(config, db)
    }

    /// Wire services over an already migrated pool
    pub fn from_pool(config: ServerConfig, db: SqlitePool) -> AppResult<Self> {
        let provider_config = Arc::new(config.provider.clone());
        let provider = ProviderClient::new(Arc::clone(&provider_config))?;

        let account_manager = Arc::new(AccountManager::new(
            db.clone(),
            Arc::new(config.authentication.clone()),
        ));
        let token_manager = Arc::new(TokenManager::new(
            Arc::clone(&account_manager),
            provider.clone(),
        ));
        let handshake = Arc::new(HandshakeCoordinator::new(
            Arc::clone(&account_manager),
            Arc::clone(&token_manager),
            provider.clone(),
            provider_config,
        ));
        let reconciler = Arc::new(MeetingReconciler::new(
            Arc::clone(&token_manager),
            provider,
            MeetingStore::new(db.clone()),
        ));

        let rate_limiter = Arc::new(RateLimiter::new(&config.rate_limit));

        Ok(Self {
            config: Arc::new(config),
            db,
            account_manager,
            handshake,
            reconciler,
            rate_limiter,
        })
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
