use std::sync::Arc;

use sqlx::sqlite::SqlitePoolOptions;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use catalog::api::router;
use catalog::config::{CatalogConfig, RemoteBackend};
use catalog::db::SqliteSessionStore;
use catalog::error::AppError;
use catalog::session::SessionStore;
use catalog::remote::{MemoryTables, PostgrestClient, RemoteTables};
use catalog::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "catalog=debug".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = CatalogConfig::new_from_env()?;

    let remote: Arc<dyn RemoteTables> = match (config.backend, config.remote.clone()) {
        (RemoteBackend::Postgrest, Some(remote_config)) => {
            info!("using hosted tables at {}", remote_config.url);
            Arc::new(PostgrestClient::new(remote_config)?)
        }
        (RemoteBackend::Postgrest, None) => {
            return Err(AppError::Config("remote configuration missing".to_string()).into());
        }
        (RemoteBackend::Memory, _) => {
            warn!("using in-memory tables; catalog data is lost on exit");
            Arc::new(MemoryTables::new())
        }
    };

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&config.session_database_url)
        .await?;
    let sessions = SqliteSessionStore::new(pool, config.session_ttl);
    sessions.migrate().await?;
    sessions.prune_expired().await?;

    let state = AppState {
        remote,
        sessions: Arc::new(sessions),
        admin_secret: Arc::from(config.admin_password.as_str()),
    };

    let app = router(state);

    info!("listening on http://{}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
