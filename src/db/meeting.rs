/// Meeting mirror database models
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// Local mirror of one provider meeting
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct MeetingRecord {
    /// Frontend keys list items by `ID`
    #[serde(rename = "ID")]
    pub id: i64,
    #[serde(skip_serializing)]
    pub account_id: i64,
    #[serde(rename = "zoom_id")]
    pub remote_id: String,
    pub topic: String,
    /// Start time in the local display convention
    pub start_time: DateTime<Utc>,
    pub join_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
