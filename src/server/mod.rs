//! HTTP access layer over the metrics store and aggregation engine.

pub mod error;
pub mod handlers;

use crate::config::Config;
use crate::error::MetricsError;
use crate::store::MetricsStore;
use anyhow::Context;
use axum::routing::get;
use axum::Router;
use error::ApiError;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared handler state: the one store client opened at startup.
#[derive(Clone)]
pub struct AppState {
    store: Arc<Mutex<MetricsStore>>,
}

impl AppState {
    pub fn new(store: MetricsStore) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
        }
    }

    pub fn store(&self) -> Result<MutexGuard<'_, MetricsStore>, ApiError> {
        self.store
            .lock()
            .map_err(|_| ApiError(MetricsError::Connection("store lock poisoned".to_string())))
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/commits", get(handlers::list_commits))
        .route("/commits/authors", get(handlers::author_totals))
        .route("/commits/search/author", get(handlers::search_author))
        .route("/commits/date-range", get(handlers::date_range))
        .route("/commits/stats/daily", get(handlers::daily_stats))
        .route("/commits/stats/hourly", get(handlers::hourly_stats))
        .route("/commits/stats/patterns", get(handlers::work_patterns))
        .route("/commits/top-contributors", get(handlers::top_contributors))
        .route("/commits/files-by-author", get(handlers::files_by_author))
        .route("/commits/stats/developers", get(handlers::developer_stats))
        .route("/commits/stats/developer-patterns", get(handlers::developer_patterns))
        .route("/commits/stats/heatmap", get(handlers::activity_heatmap))
        .route("/commits/collaboration", get(handlers::collaboration))
        .route("/commits/ownership", get(handlers::ownership))
        .route(
            "/commits/:id",
            get(handlers::get_commit)
                .put(handlers::replace_commit)
                .patch(handlers::patch_commit)
                .delete(handlers::delete_commit),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

pub async fn serve(store: MetricsStore, bind: &str) -> anyhow::Result<()> {
    let app = build_router(AppState::new(store));
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    info!("commitlens listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;
    Ok(())
}

/// Runs the server on a single-threaded runtime.
pub fn exec(config: &Config) -> anyhow::Result<()> {
    let store = MetricsStore::open(&config.database).context("Failed to open metrics store")?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    runtime.block_on(serve(store, &config.bind))
}
