/// Token Cache/Refresh Manager
///
/// Owns the provider credentials stored on each account and decides between
/// the cached access token, a refresh exchange, or sending the caller back to
/// a full authorization.
use crate::{
    account::{AccountManager, ProviderLink, RefreshedTokens},
    db::account::Account,
    error::{AppError, AppResult},
    provider::ProviderClient,
};
use chrono::{Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Lock map size above which idle entries are dropped
const LOCK_PRUNE_THRESHOLD: usize = 1024;

/// Per-account serialized access to provider tokens
pub struct TokenManager {
    accounts: Arc<AccountManager>,
    provider: ProviderClient,
    locks: DashMap<i64, Arc<Mutex<()>>>,
}

impl TokenManager {
    pub fn new(accounts: Arc<AccountManager>, provider: ProviderClient) -> Self {
        Self {
            accounts,
            provider,
            locks: DashMap::new(),
        }
    }

    /// Lock guarding the token fields of one account
    fn account_lock(&self, account_id: i64) -> Arc<Mutex<()>> {
        if self.locks.len() > LOCK_PRUNE_THRESHOLD {
            self.prune_idle_locks();
        }

        self.locks
            .entry(account_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Return a usable access token for the account
    ///
    /// A cached token whose expiry is still in the future is returned without
    /// any provider call. Otherwise the stored refresh token is exchanged.
    pub async fn obtain_access_token(&self, account_id: i64) -> AppResult<String> {
        let lock = self.account_lock(account_id);
        let _guard = lock.lock().await;

        // Read under the lock so a refresh finished by another task is seen
        let account = self.accounts.get_account(account_id).await?;

        if let Some(token) = account.cached_token_at(Utc::now()) {
            tracing::debug!("Using cached provider token for account {}", account_id);
            return Ok(token.to_string());
        }

        self.refresh_locked(&account).await
    }

    /// Refresh regardless of the cached expiry
    pub async fn force_refresh(&self, account_id: i64) -> AppResult<String> {
        let lock = self.account_lock(account_id);
        let _guard = lock.lock().await;

        let account = self.accounts.get_account(account_id).await?;
        self.refresh_locked(&account).await
    }

    /// Persist the result of an authorization-code exchange
    ///
    /// The identity check and the write happen under the account lock, so a
    /// refresh already in flight cannot overwrite the new token chain.
    pub async fn store_link(&self, account_id: i64, link: &ProviderLink) -> AppResult<()> {
        let lock = self.account_lock(account_id);
        let _guard = lock.lock().await;

        let account = self.accounts.get_account(account_id).await?;
        if let Some(linked) = account.remote_identity_id.as_deref().filter(|id| !id.is_empty()) {
            if linked != link.remote_identity_id {
                tracing::warn!(
                    "Account {} is linked to a different provider identity, rejecting link",
                    account_id
                );
                return Err(AppError::IdentityMismatch {
                    linked: linked.to_string(),
                    received: link.remote_identity_id.clone(),
                });
            }
        }

        self.accounts.link_remote(account_id, link).await
    }

    /// Drop locks nobody is holding or waiting on
    fn prune_idle_locks(&self) {
        // The map's own reference is the only one left on an idle lock
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    /// Whether the provider still accepts `token`
    pub async fn is_token_live(&self, token: &str) -> bool {
        self.provider.probe_token(token).await
    }

    /// Caller must hold the account lock
    async fn refresh_locked(&self, account: &Account) -> AppResult<String> {
        let refresh_token = account.usable_refresh_token().ok_or_else(|| {
            AppError::CredentialsUnavailable("no refresh token stored".to_string())
        })?;

        let requested_at = Utc::now();
        let response = self.provider.refresh(refresh_token).await.map_err(|e| {
            tracing::warn!("Token refresh failed for account {}: {}", account.id, e);
            AppError::CredentialsUnavailable(format!("refresh exchange failed: {}", e))
        })?;

        let tokens = RefreshedTokens {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expires_at: requested_at + Duration::seconds(response.expires_in),
            remote_account_id: response.account_id,
        };
        self.accounts.store_tokens(account.id, &tokens).await?;

        tracing::info!("Refreshed provider token for account {}", account.id);
        Ok(tokens.access_token)
    }
}
