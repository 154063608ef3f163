//! Record store for shared files.
//!
//! [`RecordStore`] is the persistence boundary the service talks to;
//! [`SqliteStore`] implements it on top of the shared rusqlite connection.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, types::Type, OptionalExtension, Row};

use crate::db::DbConnection;
use crate::error::Result;
use crate::models::{ShareFile, ShareFileSummary};

/// Per-record CRUD plus the two expiry range queries.
///
/// Every method is atomic with respect to a single record.
#[async_trait]
pub trait RecordStore: Send + Sync + 'static {
    /// Inserts a new record. Fails if the id is already taken.
    async fn put(&self, file: &ShareFile) -> Result<()>;

    async fn get(&self, id: &str) -> Result<Option<ShareFile>>;

    /// Like [`RecordStore::get`] without reading the payload.
    async fn get_summary(&self, id: &str) -> Result<Option<ShareFileSummary>>;

    /// Returns `true` if a record was removed. Deleting a missing id is not an error.
    async fn delete(&self, id: &str) -> Result<bool>;

    /// Records whose expiry is strictly after `t`, in upload order.
    ///
    /// Payloads are not read; only summaries are returned.
    async fn query_expiry_after(&self, t: DateTime<Utc>) -> Result<Vec<ShareFileSummary>>;

    /// Records whose expiry is at or before `t`, without payloads.
    async fn query_expiry_before(&self, t: DateTime<Utc>) -> Result<Vec<ShareFileSummary>>;

    /// Bumps the download counter of a record that is still active at `now`
    /// and returns the updated record, in one step.
    ///
    /// Returns `Ok(None)` when the id is missing or already expired.
    async fn increment_download_count(
        &self,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<ShareFile>>;

    /// Deletes all given ids in one transaction and returns how many existed.
    async fn delete_batch(&self, ids: &[String]) -> Result<usize>;
}

const COLUMNS: &str =
    "id, file_name, file_size, file_data, upload_time, expiry_time, download_count, description";

const SUMMARY_COLUMNS: &str =
    "id, file_name, file_size, upload_time, expiry_time, download_count, description";

pub(crate) fn format_time(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_time(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_share_file(row: &Row) -> rusqlite::Result<ShareFile> {
    Ok(ShareFile {
        id: row.get(0)?,
        file_name: row.get(1)?,
        file_size: row.get(2)?,
        file_data: row.get(3)?,
        upload_time: parse_time(row, 4)?,
        expiry_time: parse_time(row, 5)?,
        download_count: row.get(6)?,
        description: row.get(7)?,
    })
}

fn row_to_summary(row: &Row) -> rusqlite::Result<ShareFileSummary> {
    let id: String = row.get(0)?;
    Ok(ShareFileSummary {
        share_url: id.clone(),
        id,
        file_name: row.get(1)?,
        file_size: row.get(2)?,
        upload_time: parse_time(row, 3)?,
        expiry_time: parse_time(row, 4)?,
        download_count: row.get(5)?,
        description: row.get(6)?,
    })
}

#[derive(Clone)]
pub struct SqliteStore {
    conn: DbConnection,
}

impl SqliteStore {
    pub fn new(conn: DbConnection) -> Self {
        Self { conn }
    }

    async fn query_summaries(&self, sql: &str, t: DateTime<Utc>) -> Result<Vec<ShareFileSummary>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(sql)?;
        let files = stmt
            .query_map([format_time(t)], row_to_summary)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(files)
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn put(&self, file: &ShareFile) -> Result<()> {
        self.conn.lock().await.execute(
            "INSERT INTO share_files (id, file_name, file_size, file_data, upload_time, expiry_time, download_count, description) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                file.id,
                file.file_name,
                file.file_size,
                file.file_data,
                format_time(file.upload_time),
                format_time(file.expiry_time),
                file.download_count,
                file.description
            ],
        )?;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<ShareFile>> {
        let file = self
            .conn
            .lock()
            .await
            .query_row(
                &format!("SELECT {COLUMNS} FROM share_files WHERE id = ?"),
                [id],
                row_to_share_file,
            )
            .optional()?;
        Ok(file)
    }

    async fn get_summary(&self, id: &str) -> Result<Option<ShareFileSummary>> {
        let summary = self
            .conn
            .lock()
            .await
            .query_row(
                &format!("SELECT {SUMMARY_COLUMNS} FROM share_files WHERE id = ?"),
                [id],
                row_to_summary,
            )
            .optional()?;
        Ok(summary)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let removed = self
            .conn
            .lock()
            .await
            .execute("DELETE FROM share_files WHERE id = ?", [id])?;
        Ok(removed > 0)
    }

    async fn query_expiry_after(&self, t: DateTime<Utc>) -> Result<Vec<ShareFileSummary>> {
        self.query_summaries(
            &format!("SELECT {SUMMARY_COLUMNS} FROM share_files WHERE expiry_time > ? ORDER BY rowid"),
            t,
        )
        .await
    }

    async fn query_expiry_before(&self, t: DateTime<Utc>) -> Result<Vec<ShareFileSummary>> {
        self.query_summaries(
            &format!("SELECT {SUMMARY_COLUMNS} FROM share_files WHERE expiry_time <= ? ORDER BY rowid"),
            t,
        )
        .await
    }

    async fn increment_download_count(
        &self,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<ShareFile>> {
        let file = self
            .conn
            .lock()
            .await
            .query_row(
                &format!(
                    "UPDATE share_files SET download_count = download_count + 1 \
                     WHERE id = ? AND expiry_time > ? RETURNING {COLUMNS}"
                ),
                params![id, format_time(now)],
                row_to_share_file,
            )
            .optional()?;
        Ok(file)
    }

    async fn delete_batch(&self, ids: &[String]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        let mut removed = 0;
        {
            let mut stmt = tx.prepare("DELETE FROM share_files WHERE id = ?")?;
            for id in ids {
                removed += stmt.execute([id])?;
            }
        }
        tx.commit()?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;
    use chrono::{Duration, SubsecRound};

    fn record(id: &str, upload_time: DateTime<Utc>, days: i64) -> ShareFile {
        ShareFile {
            id: id.to_string(),
            file_name: Some(format!("{id}.bin")),
            file_size: 4,
            file_data: vec![1, 2, 3, 4],
            upload_time,
            expiry_time: upload_time + Duration::days(days),
            download_count: 0,
            description: String::new(),
        }
    }

    fn setup() -> SqliteStore {
        SqliteStore::new(open_in_memory().unwrap())
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let store = setup();
        let now = Utc::now().trunc_subsecs(6);
        let file = record("a", now, 3);

        store.put(&file).await.unwrap();

        assert_eq!(store.get("a").await.unwrap(), Some(file));
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_summary_reads_match_full_record() {
        let store = setup();
        let now = Utc::now().trunc_subsecs(6);
        let file = record("a", now, 3);
        store.put(&file).await.unwrap();

        assert_eq!(store.get_summary("a").await.unwrap(), Some(file.summary()));
        assert_eq!(store.get_summary("missing").await.unwrap(), None);
        assert_eq!(
            store.query_expiry_after(now).await.unwrap(),
            vec![file.summary()]
        );
    }

    #[tokio::test]
    async fn test_put_duplicate_id_fails() {
        let store = setup();
        let now = Utc::now();
        store.put(&record("a", now, 1)).await.unwrap();

        assert!(store.put(&record("a", now, 2)).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = setup();
        store.put(&record("a", Utc::now(), 1)).await.unwrap();

        assert!(store.delete("a").await.unwrap());
        assert!(!store.delete("a").await.unwrap());
    }

    #[tokio::test]
    async fn test_expiry_queries_split_at_boundary() {
        let store = setup();
        let now = Utc::now().trunc_subsecs(6);
        store.put(&record("old", now - Duration::days(5), 2)).await.unwrap();
        store.put(&record("fresh", now, 2)).await.unwrap();
        // Expires exactly at `now`, which counts as expired.
        store.put(&record("edge", now - Duration::days(1), 1)).await.unwrap();

        let active: Vec<_> = store
            .query_expiry_after(now)
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.id)
            .collect();
        let expired: Vec<_> = store
            .query_expiry_before(now)
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.id)
            .collect();

        assert_eq!(active, vec!["fresh"]);
        assert_eq!(expired, vec!["old", "edge"]);
    }

    #[tokio::test]
    async fn test_increment_skips_expired() {
        let store = setup();
        let now = Utc::now();
        store.put(&record("live", now, 1)).await.unwrap();
        store.put(&record("dead", now - Duration::days(3), 1)).await.unwrap();

        let live = store.increment_download_count("live", now).await.unwrap();
        assert_eq!(live.map(|f| f.download_count), Some(1));

        assert_eq!(store.increment_download_count("dead", now).await.unwrap(), None);
        assert_eq!(store.increment_download_count("nope", now).await.unwrap(), None);
        assert_eq!(store.get("dead").await.unwrap().unwrap().download_count, 0);
    }

    #[tokio::test]
    async fn test_delete_batch_counts_existing_only() {
        let store = setup();
        let now = Utc::now();
        store.put(&record("a", now, 1)).await.unwrap();
        store.put(&record("b", now, 1)).await.unwrap();

        let ids = vec!["a".to_string(), "b".to_string(), "ghost".to_string()];
        assert_eq!(store.delete_batch(&ids).await.unwrap(), 2);
        assert_eq!(store.delete_batch(&ids).await.unwrap(), 0);
        assert_eq!(store.delete_batch(&[]).await.unwrap(), 0);
    }
}
