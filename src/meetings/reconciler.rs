/// Remote Resource Reconciler
///
/// Every operation obtains a provider token first, talks to the provider,
/// and only then touches the local mirror. Local rows are written only when
/// a mirrored field actually changed.
use super::{
    format_remote_time, to_display_time, to_remote_time, MeetingStore, MirrorFields,
    DEFAULT_DURATION_MINUTES, PROVIDER_TIMEZONE, SCHEDULED_MEETING_TYPE,
};
use crate::{
    db::meeting::MeetingRecord,
    error::{AppError, AppResult},
    oauth::TokenManager,
    provider::{MeetingPayload, ProviderClient, RemoteMeeting},
};
use chrono::{DateTime, Utc};
use std::{collections::HashMap, sync::Arc};

/// Upper bound on followed pages, guards against a provider looping on tokens
const MAX_LIST_PAGES: usize = 50;

pub struct MeetingReconciler {
    tokens: Arc<TokenManager>,
    provider: ProviderClient,
    store: MeetingStore,
}

impl MeetingReconciler {
    pub fn new(tokens: Arc<TokenManager>, provider: ProviderClient, store: MeetingStore) -> Self {
        Self {
            tokens,
            provider,
            store,
        }
    }

    /// Sync the remote listing into the mirror and return the mirror rows
    ///
    /// Rows whose remote meeting disappeared are left in place.
    pub async fn list_meetings(&self, account_id: i64) -> AppResult<Vec<MeetingRecord>> {
        let token = self.access_token(account_id).await?;
        let remote = self.fetch_all(&token).await?;

        let local: HashMap<String, MeetingRecord> = self
            .store
            .list_for_account(account_id)
            .await?
            .into_iter()
            .map(|row| (row.remote_id.clone(), row))
            .collect();

        let mut written = 0usize;
        for meeting in &remote {
            if self.reconcile(account_id, local.get(&meeting.id), meeting).await?.1 {
                written += 1;
            }
        }
        tracing::debug!(
            "Reconciled {} remote meetings for account {} ({} rows written)",
            remote.len(),
            account_id,
            written
        );

        self.store.list_for_account(account_id).await
    }

    /// Sync one remote meeting into the mirror and return its row
    pub async fn get_meeting(&self, account_id: i64, remote_id: &str) -> AppResult<MeetingRecord> {
        let token = self.access_token(account_id).await?;
        let meeting = self.provider.get_meeting(&token, remote_id).await?;

        // The provider may canonicalize the id; the mirror keys on what it returns
        let existing = self.store.find(account_id, &meeting.id).await?;
        let (row, _) = self.reconcile(account_id, existing.as_ref(), &meeting).await?;
        Ok(row)
    }

    /// Create remotely, then mirror with the provider-assigned id and join URL
    pub async fn create_meeting(
        &self,
        account_id: i64,
        topic: &str,
        start_time: DateTime<Utc>,
    ) -> AppResult<MeetingRecord> {
        validate_topic(topic)?;
        let token = self.access_token(account_id).await?;

        let created = self
            .provider
            .create_meeting(&token, &write_payload(topic, start_time))
            .await?;

        let row = self
            .store
            .upsert(
                account_id,
                &created.id,
                &MirrorFields {
                    topic,
                    start_time,
                    join_url: &created.join_url,
                },
            )
            .await?;

        tracing::info!("Created meeting {} for account {}", created.id, account_id);
        Ok(row)
    }

    /// Update remotely, then overwrite the mirror row with the input
    pub async fn update_meeting(
        &self,
        account_id: i64,
        remote_id: &str,
        topic: &str,
        start_time: DateTime<Utc>,
    ) -> AppResult<MeetingRecord> {
        validate_topic(topic)?;
        let row = self.require_row(account_id, remote_id).await?;
        let token = self.access_token(account_id).await?;

        self.provider
            .update_meeting(&token, remote_id, &write_payload(topic, start_time))
            .await?;

        let updated = self
            .store
            .update(
                row.id,
                &MirrorFields {
                    topic,
                    start_time,
                    join_url: &row.join_url,
                },
            )
            .await?;

        tracing::info!("Updated meeting {} for account {}", remote_id, account_id);
        Ok(updated)
    }

    /// Delete remotely, then drop the mirror row
    pub async fn delete_meeting(&self, account_id: i64, remote_id: &str) -> AppResult<()> {
        let row = self.require_row(account_id, remote_id).await?;
        let token = self.access_token(account_id).await?;

        self.provider.delete_meeting(&token, remote_id).await?;
        self.store.delete(row.id).await?;

        tracing::info!("Deleted meeting {} for account {}", remote_id, account_id);
        Ok(())
    }

    async fn access_token(&self, account_id: i64) -> AppResult<String> {
        self.tokens
            .obtain_access_token(account_id)
            .await
            .map_err(|e| AppError::UpstreamUnavailable(format!("no usable provider token: {}", e)))
    }

    async fn require_row(&self, account_id: i64, remote_id: &str) -> AppResult<MeetingRecord> {
        self.store
            .find(account_id, remote_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Meeting {} not found", remote_id)))
    }

    /// Walk `next_page_token` until the listing is exhausted
    async fn fetch_all(&self, token: &str) -> AppResult<Vec<RemoteMeeting>> {
        let mut meetings = Vec::new();
        let mut next: Option<String> = None;

        for _ in 0..MAX_LIST_PAGES {
            let page = self
                .provider
                .list_meetings_page(token, next.as_deref())
                .await?;
            meetings.extend(page.meetings);

            match page.next_page_token {
                Some(token) => next = Some(token),
                None => return Ok(meetings),
            }
        }

        tracing::warn!("Meeting listing exceeded {} pages, truncating", MAX_LIST_PAGES);
        Ok(meetings)
    }

    /// Write-if-changed; returns the row and whether it was written
    async fn reconcile(
        &self,
        account_id: i64,
        existing: Option<&MeetingRecord>,
        remote: &RemoteMeeting,
    ) -> AppResult<(MeetingRecord, bool)> {
        let fields = MirrorFields {
            topic: &remote.topic,
            start_time: to_display_time(remote.start_time),
            join_url: &remote.join_url,
        };

        match existing {
            Some(row) if !differs(row, &fields) => Ok((row.clone(), false)),
            Some(row) => Ok((self.store.update(row.id, &fields).await?, true)),
            None => Ok((self.store.upsert(account_id, &remote.id, &fields).await?, true)),
        }
    }
}

fn differs(row: &MeetingRecord, fields: &MirrorFields<'_>) -> bool {
    row.topic != fields.topic
        || row.start_time != fields.start_time
        || row.join_url != fields.join_url
}

fn write_payload(topic: &str, display_start: DateTime<Utc>) -> MeetingPayload {
    MeetingPayload {
        topic: topic.to_string(),
        meeting_type: SCHEDULED_MEETING_TYPE,
        start_time: format_remote_time(to_remote_time(display_start)),
        duration: DEFAULT_DURATION_MINUTES,
        timezone: PROVIDER_TIMEZONE.to_string(),
    }
}

fn validate_topic(topic: &str) -> AppResult<()> {
    if topic.trim().is_empty() {
        return Err(AppError::Validation("Topic cannot be empty".to_string()));
    }
    Ok(())
}
