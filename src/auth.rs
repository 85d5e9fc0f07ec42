/// Authentication extractors
use crate::{
    api::middleware::extract_session_token,
    context::AppContext,
    db::account::Account,
    error::AppError,
};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

/// Authenticated context - the account owning the presented session token
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub account_id: i64,
    pub account: Account,
}

#[async_trait]
impl FromRequestParts<AppContext> for AuthContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_session_token(parts)
            .ok_or_else(|| AppError::Unauthenticated("Missing session token".to_string()))?;

        let account_id = state.account_manager.validate_session_token(&token)?;

        // A token for a deleted account is as good as no token
        let account = match state.account_manager.get_account(account_id).await {
            Ok(account) => account,
            Err(AppError::NotFound(_)) => {
                return Err(AppError::Unauthenticated("Account no longer exists".to_string()))
            }
            Err(e) => return Err(e),
        };

        Ok(AuthContext {
            account_id,
            account,
        })
    }
}
