/// Meeting provider (Zoom) integration
///
/// `ProviderClient` is the only component that talks HTTP to the provider.
/// Meeting payloads come back as loosely typed JSON and are projected into
/// the typed structs below at this boundary.

mod client;

pub use client::ProviderClient;

use crate::error::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Token endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Lifetime of the access token in seconds
    pub expires_in: i64,
    #[serde(default)]
    pub account_id: Option<String>,
}

/// Provider user profile (`GET /users/me`)
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderProfile {
    pub id: String,
    pub email: Option<String>,
    pub account_id: Option<String>,
}

impl ProviderProfile {
    pub fn from_value(value: &Value) -> AppResult<Self> {
        Ok(Self {
            id: required_id(value, "id")?,
            email: optional_str(value, "email"),
            account_id: optional_str(value, "account_id"),
        })
    }
}

/// A meeting as read from the provider, in the provider's time reference
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteMeeting {
    pub id: String,
    pub topic: String,
    pub start_time: DateTime<Utc>,
    pub join_url: String,
}

impl RemoteMeeting {
    pub fn from_value(value: &Value) -> AppResult<Self> {
        let raw_start = required_str(value, "start_time")?;
        let start_time = DateTime::parse_from_rfc3339(&raw_start)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                AppError::UpstreamSchemaMismatch(format!(
                    "invalid start_time {:?}: {}",
                    raw_start, e
                ))
            })?;

        Ok(Self {
            id: required_id(value, "id")?,
            topic: required_str(value, "topic")?,
            start_time,
            join_url: required_str(value, "join_url")?,
        })
    }
}

/// Fields the provider assigns when a meeting is created
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedMeeting {
    pub id: String,
    pub join_url: String,
}

impl CreatedMeeting {
    pub fn from_value(value: &Value) -> AppResult<Self> {
        Ok(Self {
            id: required_id(value, "id")?,
            join_url: required_str(value, "join_url")?,
        })
    }
}

/// One page of `GET /users/me/meetings`
#[derive(Debug, Clone)]
pub struct MeetingPage {
    pub meetings: Vec<RemoteMeeting>,
    pub next_page_token: Option<String>,
}

impl MeetingPage {
    pub fn from_value(value: &Value) -> AppResult<Self> {
        let items = value
            .get("meetings")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                AppError::UpstreamSchemaMismatch("missing `meetings` array".to_string())
            })?;

        let meetings = items
            .iter()
            .map(RemoteMeeting::from_value)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Self {
            meetings,
            next_page_token: optional_str(value, "next_page_token").filter(|t| !t.is_empty()),
        })
    }
}

/// Body of a create or update request, already in the provider's time reference
#[derive(Debug, Clone, Serialize)]
pub struct MeetingPayload {
    pub topic: String,
    #[serde(rename = "type")]
    pub meeting_type: u8,
    pub start_time: String,
    pub duration: u32,
    pub timezone: String,
}

fn required_str(value: &Value, field: &str) -> AppResult<String> {
    value
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            AppError::UpstreamSchemaMismatch(format!("missing or non-string field `{}`", field))
        })
}

fn optional_str(value: &Value, field: &str) -> Option<String> {
    value.get(field).and_then(Value::as_str).map(str::to_string)
}

/// Provider ids are numeric for meetings and strings for users; accept both
fn required_id(value: &Value, field: &str) -> AppResult<String> {
    let missing =
        || AppError::UpstreamSchemaMismatch(format!("missing or invalid id field `{}`", field));

    match value.get(field) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(Value::Number(n)) => {
            if let Some(u) = n.as_u64() {
                Ok(u.to_string())
            } else if let Some(i) = n.as_i64() {
                Ok(i.to_string())
            } else {
                n.as_f64()
                    .filter(|f| f.is_finite() && f.fract() == 0.0)
                    .map(|f| format!("{:.0}", f))
                    .ok_or_else(missing)
            }
        }
        _ => Err(missing()),
    }
}
