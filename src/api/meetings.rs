/// Meeting endpoints backed by the reconciler
use crate::{
    auth::AuthContext,
    context::AppContext,
    error::AppResult,
    meetings::MeetingInput,
};
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};

/// Build meeting routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/meetings", get(list_meetings).post(create_meeting))
        .route(
            "/meetings/:id",
            get(get_meeting).put(update_meeting).delete(delete_meeting),
        )
}

async fn list_meetings(State(ctx): State<AppContext>, auth: AuthContext) -> AppResult<Json<Value>> {
    let meetings = ctx.reconciler.list_meetings(auth.account_id).await?;
    Ok(Json(json!({ "data": meetings })))
}

async fn get_meeting(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let meeting = ctx.reconciler.get_meeting(auth.account_id, &id).await?;
    Ok(Json(json!({ "data": meeting })))
}

async fn create_meeting(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Json(input): Json<MeetingInput>,
) -> AppResult<Json<Value>> {
    let meeting = ctx
        .reconciler
        .create_meeting(auth.account_id, &input.topic, input.start_time)
        .await?;
    Ok(Json(json!({ "data": meeting })))
}

async fn update_meeting(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
    Json(input): Json<MeetingInput>,
) -> AppResult<Json<Value>> {
    let meeting = ctx
        .reconciler
        .update_meeting(auth.account_id, &id, &input.topic, input.start_time)
        .await?;
    Ok(Json(json!({ "data": meeting })))
}

async fn delete_meeting(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    ctx.reconciler.delete_meeting(auth.account_id, &id).await?;
    Ok(Json(json!({ "message": "Meeting deleted" })))
}
