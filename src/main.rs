use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod state;

use minio_storage::{config, storage};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "minio_storage=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "minio-storage {} ({} build, {})",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_PROFILE"),
        env!("BUILD_TIME")
    );

    // Load configuration / 加载配置
    let app_config = config::init_config()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?
        .read()
        .clone();
    tracing::info!("Server will listen on {}", app_config.get_bind_address());

    let adapter = minio_storage::adapter_for(&app_config.storage.driver)?;

    // Invalid settings leave the adapter unconfigured until PUT /api/settings / 配置无效时等待后续更新
    if let Err(e) = adapter.apply_settings(&app_config.storage.minio) {
        tracing::warn!("Object store not configured: {}", e);
    }

    let adapter = storage::init_global(adapter)?;
    let state = Arc::new(AppState { adapter });

    let app = Router::new()
        .route("/api/health", get(api::server::health_check))
        .route("/api/settings", put(api::settings::update_settings))
        .route("/api/attachments", post(api::attachments::upload))
        .route("/api/attachments/:bucket/:key", get(api::attachments::download))
        .layer(DefaultBodyLimit::disable())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let bind_addr = app_config.get_bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    tracing::info!("Server running at http://{}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
