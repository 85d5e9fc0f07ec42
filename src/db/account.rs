/// Account database models
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// Account record in the database
#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    /// Provider user id, fixed by the first successful link
    pub remote_identity_id: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
    /// Provider account (organisation) id
    pub remote_account_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Cached access token that has not yet expired at `now`
    pub fn cached_token_at(&self, now: DateTime<Utc>) -> Option<&str> {
        match (self.access_token.as_deref(), self.token_expires_at) {
            (Some(token), Some(expires)) if !token.is_empty() && expires > now => Some(token),
            _ => None,
        }
    }

    /// Stored refresh token, if any
    pub fn usable_refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref().filter(|t| !t.is_empty())
    }

    /// Whether a provider identity is bound to this account
    pub fn is_linked(&self) -> bool {
        self.remote_identity_id
            .as_deref()
            .map_or(false, |id| !id.is_empty())
    }

    /// Public view without credentials
    pub fn profile(&self) -> AccountProfile {
        AccountProfile {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            remote_identity_id: self.remote_identity_id.clone(),
            remote_account_id: self.remote_account_id.clone(),
            token_expires_at: self.token_expires_at,
            created_at: self.created_at,
        }
    }
}

/// Account as exposed over the API
#[derive(Debug, Clone, Serialize)]
pub struct AccountProfile {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub remote_identity_id: Option<String>,
    pub remote_account_id: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
