/// Meeting mirror: local store and reconciliation against the provider
mod reconciler;
mod store;

pub use reconciler::MeetingReconciler;
pub use store::{MeetingStore, MirrorFields};

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Fixed offset between the provider's start times and the local display convention
pub const DISPLAY_OFFSET_HOURS: i64 = 7;
/// Scheduled meeting
pub const SCHEDULED_MEETING_TYPE: u8 = 2;
pub const DEFAULT_DURATION_MINUTES: u32 = 30;
pub const PROVIDER_TIMEZONE: &str = "Asia/Jakarta";

/// Provider start time to local display time
pub fn to_display_time(remote: DateTime<Utc>) -> DateTime<Utc> {
    remote + Duration::hours(DISPLAY_OFFSET_HOURS)
}

/// Local display time to the value transmitted to the provider
pub fn to_remote_time(display: DateTime<Utc>) -> DateTime<Utc> {
    display - Duration::hours(DISPLAY_OFFSET_HOURS)
}

/// RFC 3339 with a `Z` suffix and whole seconds
pub fn format_remote_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Body of create and update requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingInput {
    pub topic: String,
    pub start_time: DateTime<Utc>,
}
