/// Meeting mirror persistence
use crate::{db::meeting::MeetingRecord, error::AppResult};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

const MEETING_COLUMNS: &str =
    "id, account_id, remote_id, topic, start_time, join_url, created_at, updated_at";

/// Fields written to a mirror row
#[derive(Debug, Clone, PartialEq)]
pub struct MirrorFields<'a> {
    pub topic: &'a str,
    pub start_time: DateTime<Utc>,
    pub join_url: &'a str,
}

/// Queries over the `meeting` table
#[derive(Clone)]
pub struct MeetingStore {
    db: SqlitePool,
}

impl MeetingStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// All mirror rows owned by an account
    pub async fn list_for_account(&self, account_id: i64) -> AppResult<Vec<MeetingRecord>> {
        let rows = sqlx::query_as::<_, MeetingRecord>(&format!(
            "SELECT {} FROM meeting WHERE account_id = ?1 ORDER BY id",
            MEETING_COLUMNS
        ))
        .bind(account_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// Mirror row for one remote meeting
    pub async fn find(&self, account_id: i64, remote_id: &str) -> AppResult<Option<MeetingRecord>> {
        let row = sqlx::query_as::<_, MeetingRecord>(&format!(
            "SELECT {} FROM meeting WHERE account_id = ?1 AND remote_id = ?2",
            MEETING_COLUMNS
        ))
        .bind(account_id)
        .bind(remote_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row)
    }

    /// Insert a mirror row, or overwrite the one already holding the key
    pub async fn upsert(
        &self,
        account_id: i64,
        remote_id: &str,
        fields: &MirrorFields<'_>,
    ) -> AppResult<MeetingRecord> {
        let now = Utc::now();
        let row = sqlx::query_as::<_, MeetingRecord>(&format!(
            "INSERT INTO meeting (account_id, remote_id, topic, start_time, join_url, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
             ON CONFLICT(account_id, remote_id) DO UPDATE SET
                 topic = excluded.topic,
                 start_time = excluded.start_time,
                 join_url = excluded.join_url,
                 updated_at = excluded.updated_at
             RETURNING {}",
            MEETING_COLUMNS
        ))
        .bind(account_id)
        .bind(remote_id)
        .bind(fields.topic)
        .bind(fields.start_time)
        .bind(fields.join_url)
        .bind(now)
        .fetch_one(&self.db)
        .await?;

        Ok(row)
    }

    /// Overwrite the mirrored fields of an existing row
    pub async fn update(&self, id: i64, fields: &MirrorFields<'_>) -> AppResult<MeetingRecord> {
        let row = sqlx::query_as::<_, MeetingRecord>(&format!(
            "UPDATE meeting
             SET topic = ?1, start_time = ?2, join_url = ?3, updated_at = ?4
             WHERE id = ?5
             RETURNING {}",
            MEETING_COLUMNS
        ))
        .bind(fields.topic)
        .bind(fields.start_time)
        .bind(fields.join_url)
        .bind(Utc::now())
        .bind(id)
        .fetch_one(&self.db)
        .await?;

        Ok(row)
    }

    pub async fn delete(&self, id: i64) -> AppResult<()> {
        sqlx::query("DELETE FROM meeting WHERE id = ?1")
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    async fn store_with_account() -> (MeetingStore, i64) {
        let pool = test_pool().await;
        let now = Utc::now();
        let id = sqlx::query(
            "INSERT INTO account (name, email, password_hash, created_at, updated_at)
             VALUES ('Ada', 'ada@example.com', 'x', ?1, ?1)",
        )
        .bind(now)
        .execute(&pool)
        .await
        .unwrap()
        .last_insert_rowid();

        (MeetingStore::new(pool), id)
    }

    #[tokio::test]
    async fn test_upsert_keeps_one_row_per_remote_id() {
        let (store, account_id) = store_with_account().await;
        let start = Utc::now();

        let first = store
            .upsert(
                account_id,
                "100",
                &MirrorFields {
                    topic: "A",
                    start_time: start,
                    join_url: "https://zoom.us/j/100",
                },
            )
            .await
            .unwrap();
        let second = store
            .upsert(
                account_id,
                "100",
                &MirrorFields {
                    topic: "B",
                    start_time: start,
                    join_url: "https://zoom.us/j/100",
                },
            )
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.topic, "B");
        assert_eq!(store.list_for_account(account_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_find_is_scoped_to_account() {
        let (store, account_id) = store_with_account().await;
        store
            .upsert(
                account_id,
                "100",
                &MirrorFields {
                    topic: "A",
                    start_time: Utc::now(),
                    join_url: "u",
                },
            )
            .await
            .unwrap();

        assert!(store.find(account_id, "100").await.unwrap().is_some());
        assert!(store.find(account_id + 1, "100").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let (store, account_id) = store_with_account().await;
        let row = store
            .upsert(
                account_id,
                "7",
                &MirrorFields {
                    topic: "Old",
                    start_time: Utc::now(),
                    join_url: "u",
                },
            )
            .await
            .unwrap();

        let updated = store
            .update(
                row.id,
                &MirrorFields {
                    topic: "New",
                    start_time: row.start_time,
                    join_url: &row.join_url,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.topic, "New");
        assert!(updated.updated_at >= row.updated_at);

        store.delete(row.id).await.unwrap();
        assert!(store.find(account_id, "7").await.unwrap().is_none());
    }
}
