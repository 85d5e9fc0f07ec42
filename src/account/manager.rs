/// Account manager implementation using runtime queries

use crate::{
    config::AuthConfig,
    db::account::Account,
    error::{AppError, AppResult},
};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;

const ACCOUNT_COLUMNS: &str = "id, name, email, password_hash, remote_identity_id, access_token,
    refresh_token, token_expires_at, remote_account_id, created_at, updated_at";

/// Claims carried by a session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Local account id
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Token pair produced by a refresh exchange
#[derive(Debug, Clone)]
pub struct RefreshedTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub remote_account_id: Option<String>,
}

/// Everything persisted when an account is linked to a provider identity
#[derive(Debug, Clone)]
pub struct ProviderLink {
    pub remote_identity_id: String,
    pub remote_account_id: Option<String>,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Account manager service
pub struct AccountManager {
    db: SqlitePool,
    auth: Arc<AuthConfig>,
}

impl AccountManager {
    /// Create a new account manager
    pub fn new(db: SqlitePool, auth: Arc<AuthConfig>) -> Self {
        Self { db, auth }
    }

    /// Create a new account
    pub async fn register(&self, name: &str, email: &str, password: &str) -> AppResult<Account> {
        let name = name.trim();
        let email = email.trim().to_lowercase();

        if name.is_empty() {
            return Err(AppError::Validation("Name cannot be empty".to_string()));
        }
        self.validate_email(&email)?;
        if password.len() < 8 {
            return Err(AppError::Validation(
                "Password must be at least 8 characters".to_string(),
            ));
        }

        if self.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let password_hash = hash_password(password)?;
        let now = Utc::now();

        let result = sqlx::query(
            "INSERT INTO account (name, email, password_hash, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(name)
        .bind(&email)
        .bind(&password_hash)
        .bind(now)
        .bind(now)
        .execute(&self.db)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict("Email already registered".to_string())
            }
            other => AppError::Database(other),
        })?;

        let id = result.last_insert_rowid();
        tracing::info!("Registered account {}", id);

        self.get_account(id).await
    }

    /// Verify credentials and return the account
    pub async fn login(&self, email: &str, password: &str) -> AppResult<Account> {
        let invalid = || AppError::Unauthenticated("Invalid email or password".to_string());

        let account = self
            .find_by_email(&email.trim().to_lowercase())
            .await?
            .ok_or_else(invalid)?;

        if !verify_password(password, &account.password_hash)? {
            return Err(invalid());
        }

        Ok(account)
    }

    /// Issue a signed session token for an account
    pub fn issue_session_token(&self, account_id: i64) -> AppResult<String> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: account_id.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(self.auth.session_ttl_secs)).timestamp(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.auth.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Failed to sign session token: {}", e)))
    }

    /// Validate a session token and return the account id it names
    pub fn validate_session_token(&self, token: &str) -> AppResult<i64> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = decode::<SessionClaims>(
            token,
            &DecodingKey::from_secret(self.auth.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| {
            tracing::debug!("Session token rejected: {}", e);
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    AppError::Unauthenticated("Token has expired".to_string())
                }
                _ => AppError::Unauthenticated("Invalid token".to_string()),
            }
        })?;

        data.claims
            .sub
            .parse()
            .map_err(|_| AppError::Unauthenticated("Invalid token subject".to_string()))
    }

    /// Get account by id
    pub async fn get_account(&self, id: i64) -> AppResult<Account> {
        sqlx::query_as::<_, Account>(&format!(
            "SELECT {} FROM account WHERE id = ?1",
            ACCOUNT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Account not found".to_string()))
    }

    /// Get account by email
    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {} FROM account WHERE email = ?1",
            ACCOUNT_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;

        Ok(account)
    }

    /// Persist a refreshed token pair in a single row update
    pub async fn store_tokens(&self, account_id: i64, tokens: &RefreshedTokens) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE account
             SET access_token = ?1,
                 refresh_token = ?2,
                 token_expires_at = ?3,
                 remote_account_id = COALESCE(?4, remote_account_id),
                 updated_at = ?5
             WHERE id = ?6",
        )
        .bind(&tokens.access_token)
        .bind(&tokens.refresh_token)
        .bind(tokens.expires_at)
        .bind(&tokens.remote_account_id)
        .bind(Utc::now())
        .bind(account_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Account not found".to_string()));
        }

        Ok(())
    }

    /// Bind a provider identity and its tokens to an account
    ///
    /// The update is conditional on the stored identity being absent or equal,
    /// so a concurrent link to a different identity cannot slip through.
    pub async fn link_remote(&self, account_id: i64, link: &ProviderLink) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE account
             SET remote_identity_id = ?1,
                 remote_account_id = COALESCE(?2, remote_account_id),
                 access_token = ?3,
                 refresh_token = ?4,
                 token_expires_at = ?5,
                 updated_at = ?6
             WHERE id = ?7
               AND (remote_identity_id IS NULL OR remote_identity_id = '' OR remote_identity_id = ?1)",
        )
        .bind(&link.remote_identity_id)
        .bind(&link.remote_account_id)
        .bind(&link.access_token)
        .bind(&link.refresh_token)
        .bind(link.expires_at)
        .bind(Utc::now())
        .bind(account_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            let account = self.get_account(account_id).await?;
            return Err(AppError::IdentityMismatch {
                linked: account.remote_identity_id.unwrap_or_default(),
                received: link.remote_identity_id.clone(),
            });
        }

        Ok(())
    }

    /// Basic email shape check
    fn validate_email(&self, email: &str) -> AppResult<()> {
        let valid = match email.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && domain.contains('.')
                    && !domain.starts_with('.')
                    && !domain.ends_with('.')
                    && !email.contains(char::is_whitespace)
            }
            None => false,
        };

        if !valid {
            return Err(AppError::Validation(format!("Invalid email address: {}", email)));
        }

        Ok(())
    }
}

fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

fn verify_password(password: &str, stored: &str) -> AppResult<bool> {
    let parsed = PasswordHash::new(stored)
        .map_err(|e| AppError::Internal(format!("Stored password hash is invalid: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    fn auth_config() -> Arc<AuthConfig> {
        Arc::new(AuthConfig {
            jwt_secret: "test-secret-that-is-at-least-32-chars!!".to_string(),
            session_ttl_secs: 3600,
            cookie_domain: None,
            cookie_secure: false,
        })
    }

    async fn manager() -> AccountManager {
        AccountManager::new(test_pool().await, auth_config())
    }

    #[tokio::test]
    async fn test_register_and_login() {
        let manager = manager().await;

        let account = manager
            .register("Ada", "Ada@Example.com", "correct horse")
            .await
            .unwrap();
        assert_eq!(account.email, "ada@example.com");
        assert!(account.password_hash.starts_with("$argon2"));
        assert!(!account.is_linked());

        let logged_in = manager.login("ada@example.com", "correct horse").await.unwrap();
        assert_eq!(logged_in.id, account.id);

        let err = manager.login("ada@example.com", "wrong password").await.unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated(_)));

        let err = manager.login("nobody@example.com", "correct horse").await.unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates_and_bad_input() {
        let manager = manager().await;
        manager.register("Ada", "ada@example.com", "password1").await.unwrap();

        let err = manager.register("Other", "ADA@example.com", "password1").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        assert!(matches!(
            manager.register("", "x@example.com", "password1").await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            manager.register("X", "not-an-email", "password1").await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            manager.register("X", "x@example.com", "short").await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_session_token_round_trip() {
        let manager = manager().await;
        let token = manager.issue_session_token(42).unwrap();
        assert_eq!(manager.validate_session_token(&token).unwrap(), 42);

        let err = manager.validate_session_token("garbage").unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn test_expired_session_token_is_rejected() {
        let manager = manager().await;
        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            sub: "1".to_string(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(auth_config().jwt_secret.as_bytes()),
        )
        .unwrap();

        let err = manager.validate_session_token(&token).unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated(ref m) if m.contains("expired")));
    }

    #[tokio::test]
    async fn test_store_tokens_updates_all_fields() {
        let manager = manager().await;
        let account = manager.register("Ada", "ada@example.com", "password1").await.unwrap();

        let expires_at = Utc::now() + Duration::hours(1);
        manager
            .store_tokens(
                account.id,
                &RefreshedTokens {
                    access_token: "access-2".to_string(),
                    refresh_token: "refresh-2".to_string(),
                    expires_at,
                    remote_account_id: Some("acct-9".to_string()),
                },
            )
            .await
            .unwrap();

        let stored = manager.get_account(account.id).await.unwrap();
        assert_eq!(stored.access_token.as_deref(), Some("access-2"));
        assert_eq!(stored.refresh_token.as_deref(), Some("refresh-2"));
        assert_eq!(stored.token_expires_at, Some(expires_at));
        assert_eq!(stored.remote_account_id.as_deref(), Some("acct-9"));
    }

    #[tokio::test]
    async fn test_link_remote_refuses_second_identity() {
        let manager = manager().await;
        let account = manager.register("Ada", "ada@example.com", "password1").await.unwrap();

        let link = |id: &str, token: &str| ProviderLink {
            remote_identity_id: id.to_string(),
            remote_account_id: None,
            access_token: token.to_string(),
            refresh_token: format!("{}-refresh", token),
            expires_at: Utc::now() + Duration::hours(1),
        };

        manager.link_remote(account.id, &link("R1", "first")).await.unwrap();
        // Relinking the same identity is allowed
        manager.link_remote(account.id, &link("R1", "second")).await.unwrap();

        let err = manager
            .link_remote(account.id, &link("R2", "third"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::IdentityMismatch { .. }));

        let stored = manager.get_account(account.id).await.unwrap();
        assert_eq!(stored.remote_identity_id.as_deref(), Some("R1"));
        assert_eq!(stored.access_token.as_deref(), Some("second"));
    }
}
