use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A shared file as persisted in the record store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareFile {
    pub id: String,
    pub file_name: Option<String>,
    pub file_size: i64,
    pub file_data: Vec<u8>,
    pub upload_time: DateTime<Utc>,
    pub expiry_time: DateTime<Utc>,
    pub download_count: i64,
    pub description: String,
}

impl ShareFile {
    /// A record is active while its expiry lies strictly in the future.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry_time > now
    }

    pub fn summary(&self) -> ShareFileSummary {
        ShareFileSummary {
            id: self.id.clone(),
            file_name: self.file_name.clone(),
            file_size: self.file_size,
            upload_time: self.upload_time,
            share_url: self.id.clone(),
            expiry_time: self.expiry_time,
            download_count: self.download_count,
            description: self.description.clone(),
        }
    }
}

/// Everything about a shared file except its bytes.
///
/// `share_url` is always the id; it is kept in the JSON for clients that
/// build share links from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareFileSummary {
    pub id: String,
    pub file_name: Option<String>,
    pub file_size: i64,
    pub upload_time: DateTime<Utc>,
    pub share_url: String,
    pub expiry_time: DateTime<Utc>,
    pub download_count: i64,
    pub description: String,
}

impl ShareFileSummary {
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry_time > now
    }
}

#[derive(Debug, Default)]
pub struct UploadRequest {
    pub file_name: Option<String>,
    pub file_data: Option<Vec<u8>>,
    pub description: Option<String>,
    pub expiry_days: Option<i64>,
}

/// Payload handed back by a successful download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub file_name: Option<String>,
    pub file_size: i64,
    pub file_data: Vec<u8>,
    pub download_count: i64,
}

impl From<ShareFile> for Download {
    fn from(file: ShareFile) -> Self {
        Self {
            file_name: file.file_name,
            file_size: file.file_size,
            file_data: file.file_data,
            download_count: file.download_count,
        }
    }
}
