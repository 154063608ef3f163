use rusqlite::{Connection, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

pub type DbConnection = Arc<Mutex<Connection>>;

pub fn establish_connection(path: impl AsRef<Path>) -> Result<DbConnection> {
    let conn = Connection::open(path)?;
    init_schema(&conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}

pub fn open_in_memory() -> Result<DbConnection> {
    let conn = Connection::open_in_memory()?;
    init_schema(&conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}

// Timestamps are fixed-width RFC 3339 UTC text, so string order is time order.
fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS share_files (
            id TEXT PRIMARY KEY,
            file_name TEXT,
            file_size INTEGER NOT NULL CHECK (file_size >= 0),
            file_data BLOB NOT NULL,
            upload_time TEXT NOT NULL,
            expiry_time TEXT NOT NULL,
            download_count INTEGER NOT NULL DEFAULT 0,
            description TEXT NOT NULL DEFAULT '',
            CHECK (expiry_time > upload_time)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_share_files_expiry ON share_files (expiry_time)",
        [],
    )?;

    Ok(())
}
