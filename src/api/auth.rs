/// Account and provider-link endpoints
use crate::{
    account::{LoginRequest, RegisterRequest, SessionToken},
    api::middleware::session_cookie,
    auth::AuthContext,
    context::AppContext,
    db::account::AccountProfile,
    error::{AppError, AppResult},
};
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

/// Build auth routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
        .route("/auth/zoom", get(link_provider))
        .route("/auth/callback", get(provider_callback))
}

/// 302 to the given location
fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

async fn register(
    State(ctx): State<AppContext>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<Json<Value>> {
    let account = ctx
        .account_manager
        .register(&req.name, &req.email, &req.password)
        .await?;
    tracing::info!("register: Account {} created", account.id);

    Ok(Json(json!({ "message": "User registered" })))
}

async fn login(
    State(ctx): State<AppContext>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Response> {
    let account = ctx.account_manager.login(&req.email, &req.password).await?;
    let access_token = ctx.account_manager.issue_session_token(account.id)?;

    let auth = &ctx.config.authentication;
    let cookie = session_cookie(
        &access_token,
        auth.session_ttl_secs,
        auth.cookie_domain.as_deref(),
        auth.cookie_secure,
    );

    let session = SessionToken { access_token };
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "data": session })),
    )
        .into_response())
}

async fn me(auth: AuthContext) -> Json<AccountProfile> {
    Json(auth.account.profile())
}

/// Start, short-circuit or repair the provider link
async fn link_provider(State(ctx): State<AppContext>, auth: AuthContext) -> AppResult<Response> {
    let decision = ctx.handshake.begin(auth.account_id).await?;
    tracing::debug!("link_provider: account {} -> {:?}", auth.account_id, decision);
    Ok(found(decision.location()))
}

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

async fn provider_callback(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Query(params): Query<CallbackParams>,
) -> AppResult<Response> {
    if let Some(error) = params.error {
        tracing::warn!("provider_callback: Provider returned error {}", error);
        return Err(AppError::Validation(format!(
            "Authorization denied: {}",
            params.error_description.unwrap_or(error)
        )));
    }

    let code = params
        .code
        .ok_or_else(|| AppError::Validation("Missing authorization code".to_string()))?;

    let redirect = ctx.handshake.complete(auth.account_id, &code).await?;
    Ok(found(&redirect))
}
