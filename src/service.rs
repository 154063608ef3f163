//! File-lifecycle service.
//!
//! Enforces upload, expiry-aware reads, counted downloads, deletion and
//! cleanup on top of a [`RecordStore`]. No record state is kept in memory.

use std::sync::Arc;

use chrono::{DateTime, Datelike, SubsecRound, TimeDelta, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::FilesConfig;
use crate::error::{Result, ShareError};
use crate::models::{Download, ShareFile, ShareFileSummary, UploadRequest};
use crate::store::RecordStore;

pub struct FileShareService {
    store: Arc<dyn RecordStore>,
    default_expiry_days: i64,
    max_expiry_days: i64,
}

impl FileShareService {
    pub fn new(store: Arc<dyn RecordStore>, files: &FilesConfig) -> Self {
        Self {
            store,
            default_expiry_days: files.default_expiry_days,
            max_expiry_days: files.max_expiry_days,
        }
    }

    // Truncated to the precision the store keeps, so returned summaries
    // compare equal to what is read back later.
    fn now() -> DateTime<Utc> {
        Utc::now().trunc_subsecs(6)
    }

    /// Stores a new file and returns its summary.
    ///
    /// # Errors
    ///
    /// `InvalidInput` if the bytes are missing or `expiry_days` is outside
    /// `1..=max_expiry_days`; `StorageFailure` if the store rejects the write.
    pub async fn upload(&self, req: UploadRequest) -> Result<ShareFileSummary> {
        let file_data = req
            .file_data
            .ok_or_else(|| ShareError::InvalidInput("file is required".to_string()))?;

        let expiry_days = req.expiry_days.unwrap_or(self.default_expiry_days);
        if expiry_days < 1 {
            return Err(ShareError::InvalidInput(
                "expiryDays must be at least 1".to_string(),
            ));
        }
        if expiry_days > self.max_expiry_days {
            return Err(ShareError::InvalidInput(format!(
                "expiryDays must not exceed {}",
                self.max_expiry_days
            )));
        }

        let now = Self::now();
        // Stored timestamps are fixed-width only up to year 9999.
        let expiry_time = TimeDelta::try_days(expiry_days)
            .and_then(|delta| now.checked_add_signed(delta))
            .filter(|t| t.year() <= 9999)
            .ok_or_else(|| {
                ShareError::InvalidInput(format!("expiryDays {expiry_days} is out of range"))
            })?;

        let file = ShareFile {
            id: Uuid::new_v4().to_string(),
            file_name: req.file_name,
            file_size: file_data.len() as i64,
            file_data,
            upload_time: now,
            expiry_time,
            download_count: 0,
            description: req.description.unwrap_or_default(),
        };

        self.store.put(&file).await?;
        info!(id = %file.id, size = file.file_size, expiry_days, "File uploaded");

        Ok(file.summary())
    }

    /// Summaries of every file that has not expired yet.
    pub async fn list_active(&self) -> Result<Vec<ShareFileSummary>> {
        self.store.query_expiry_after(Self::now()).await
    }

    /// Summary of an active file. Expired records are left in place.
    pub async fn get_info(&self, id: &str) -> Result<Option<ShareFileSummary>> {
        let now = Self::now();
        let summary = self.store.get_summary(id).await?;
        Ok(summary.filter(|s| s.is_active_at(now)))
    }

    /// Returns the payload of an active file and counts the download.
    ///
    /// An expired record found here is deleted before `None` is returned.
    pub async fn download(&self, id: &str) -> Result<Option<Download>> {
        let now = Self::now();

        if let Some(file) = self.store.increment_download_count(id, now).await? {
            info!(id, downloads = file.download_count, "File downloaded");
            return Ok(Some(file.into()));
        }

        // The counter update only matches active records, so anything still
        // present is expired.
        if self.store.delete(id).await? {
            debug!(id, "Evicted expired file on download");
        }

        Ok(None)
    }

    /// Removes a file regardless of expiry. Returns whether it existed.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let removed = self.store.delete(id).await?;
        if removed {
            info!(id, "File deleted");
        }
        Ok(removed)
    }

    /// Deletes every expired file in one batch and returns how many were removed.
    pub async fn cleanup_expired(&self) -> Result<usize> {
        let expired = self.store.query_expiry_before(Self::now()).await?;
        let ids: Vec<String> = expired.into_iter().map(|f| f.id).collect();
        let removed = self.store.delete_batch(&ids).await?;
        info!(removed, "Cleaned up expired files");
        Ok(removed)
    }
}
