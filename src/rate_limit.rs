/// Rate Limiting System
use crate::{
    api::middleware::{extract_bearer_token, extract_cookie_token},
    config::RateLimitSettings,
    context::AppContext,
    error::{AppError, AppResult},
};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovernorLimiter,
};
use std::{num::NonZeroU32, sync::Arc, time::Duration};

type DirectLimiter = GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Rate limiter manager
#[derive(Clone)]
pub struct RateLimiter {
    enabled: bool,
    authenticated: Arc<DirectLimiter>,
    unauthenticated: Arc<DirectLimiter>,
}

fn non_zero(value: u32) -> NonZeroU32 {
    NonZeroU32::new(value).unwrap_or(NonZeroU32::MIN)
}

impl RateLimiter {
    pub fn new(settings: &RateLimitSettings) -> Self {
        let auth_quota = Quota::per_second(non_zero(settings.authenticated_rps))
            .allow_burst(non_zero(settings.burst_size));

        // Anonymous traffic gets a fifth of the burst
        let unauth_quota = Quota::per_second(non_zero(settings.unauthenticated_rps))
            .allow_burst(non_zero(settings.burst_size / 5));

        Self {
            enabled: settings.enabled,
            authenticated: Arc::new(GovernorLimiter::direct(auth_quota)),
            unauthenticated: Arc::new(GovernorLimiter::direct(unauth_quota)),
        }
    }

    /// Check rate limit for a request carrying a session credential
    pub fn check_authenticated(&self) -> AppResult<()> {
        Self::check(self.enabled, &self.authenticated)
    }

    /// Check rate limit for an anonymous request
    pub fn check_unauthenticated(&self) -> AppResult<()> {
        Self::check(self.enabled, &self.unauthenticated)
    }

    fn check(enabled: bool, limiter: &DirectLimiter) -> AppResult<()> {
        if !enabled {
            return Ok(());
        }
        limiter.check().map_err(|_| AppError::RateLimitExceeded {
            retry_after: Duration::from_secs(1),
        })
    }
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(ctx): State<AppContext>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let has_credential = extract_bearer_token(request.headers()).is_some()
        || extract_cookie_token(request.headers()).is_some();

    if has_credential {
        ctx.rate_limiter.check_authenticated()?;
    } else {
        ctx.rate_limiter.check_unauthenticated()?;
    }

    Ok(next.run(request).await)
}
