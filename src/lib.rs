//! File-sharing backend: upload a file, share its id, download it until it
//! expires.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod service;
pub mod store;

pub use config::Config;
pub use error::{Result, ShareError};
pub use models::{Download, ShareFile, ShareFileSummary, UploadRequest};
pub use service::FileShareService;
pub use store::{RecordStore, SqliteStore};
