/// OAuth Handshake Coordinator
///
/// Drives the authorization-code flow and binds the resulting provider
/// identity to exactly one local account.
use crate::{
    account::{AccountManager, ProviderLink},
    config::ProviderConfig,
    error::{AppError, AppResult},
    oauth::TokenManager,
    provider::ProviderClient,
};
use chrono::{Duration, Utc};
use std::sync::Arc;

/// Where the browser goes after a link request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkDecision {
    /// Stored token is still accepted by the provider
    AlreadyLinked { redirect: String },
    /// Stored token was stale and a refresh succeeded
    Refreshed { redirect: String },
    /// Full authorization with the provider is required
    Authorize { url: String },
}

impl LinkDecision {
    /// Target of the redirect
    pub fn location(&self) -> &str {
        match self {
            LinkDecision::AlreadyLinked { redirect } | LinkDecision::Refreshed { redirect } => {
                redirect
            }
            LinkDecision::Authorize { url } => url,
        }
    }
}

pub struct HandshakeCoordinator {
    accounts: Arc<AccountManager>,
    tokens: Arc<TokenManager>,
    provider: ProviderClient,
    config: Arc<ProviderConfig>,
}

impl HandshakeCoordinator {
    pub fn new(
        accounts: Arc<AccountManager>,
        tokens: Arc<TokenManager>,
        provider: ProviderClient,
        config: Arc<ProviderConfig>,
    ) -> Self {
        Self {
            accounts,
            tokens,
            provider,
            config,
        }
    }

    /// Decide how to satisfy a link request for the account
    pub async fn begin(&self, account_id: i64) -> AppResult<LinkDecision> {
        let account = self.accounts.get_account(account_id).await?;

        if !account.is_linked() {
            tracing::info!("Account {} is not linked, starting authorization", account_id);
            return self.authorize();
        }

        let cached = match account.access_token.as_deref().filter(|t| !t.is_empty()) {
            Some(token) => token,
            None => return self.authorize(),
        };

        if self.tokens.is_token_live(cached).await {
            tracing::debug!("Account {} already holds a live provider token", account_id);
            return Ok(LinkDecision::AlreadyLinked {
                redirect: self.config.post_link_redirect.clone(),
            });
        }

        match self.tokens.force_refresh(account_id).await {
            Ok(_) => Ok(LinkDecision::Refreshed {
                redirect: self.config.post_link_redirect.clone(),
            }),
            Err(e) => {
                tracing::info!(
                    "Refresh for account {} failed ({}), falling back to authorization",
                    account_id,
                    e
                );
                self.authorize()
            }
        }
    }

    /// Complete the flow with the code returned by the provider
    ///
    /// The account comes from the caller's session, never from the code.
    /// Returns the post-link redirect target.
    pub async fn complete(&self, account_id: i64, code: &str) -> AppResult<String> {
        if code.is_empty() {
            return Err(AppError::Validation("Missing authorization code".to_string()));
        }

        let requested_at = Utc::now();
        let tokens = self.provider.exchange_code(code).await?;

        // Resolve the session's account before spending the token on a profile call
        self.accounts.get_account(account_id).await?;
        let profile = self.provider.fetch_profile(&tokens.access_token).await?;

        let link = ProviderLink {
            remote_identity_id: profile.id,
            remote_account_id: profile.account_id.or(tokens.account_id),
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_at: requested_at + Duration::seconds(tokens.expires_in),
        };
        self.tokens.store_link(account_id, &link).await?;

        tracing::info!("Linked account {} to provider identity", account_id);
        Ok(self.config.post_link_redirect.clone())
    }

    fn authorize(&self) -> AppResult<LinkDecision> {
        Ok(LinkDecision::Authorize {
            url: self.provider.authorization_url()?,
        })
    }
}
