use std::path::Path;
use std::sync::Arc;

use fileshare::{db, handlers, Config, FileShareService, SqliteStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("fileshare={},tower_http=info", config.logging.level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Some(parent) = Path::new(&config.database.path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    let conn = db::establish_connection(&config.database.path)?;
    tracing::info!("Database opened at {}", config.database.path);

    let store = Arc::new(SqliteStore::new(conn));
    let service = Arc::new(FileShareService::new(store, &config.files));
    let app = handlers::router(service, config.server.max_upload_size_mb * 1024 * 1024);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server running on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
