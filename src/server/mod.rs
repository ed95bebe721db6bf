//! HTTP adapter over the gateway, directory, and session registry.
//!
//! Routes:
//! - `GET /health` - liveness
//! - `POST /register`, `POST /login`, `POST /logout` - accounts and sessions
//! - `GET /markers` - any logged-in account
//! - `POST /markers`, `DELETE /markers/:id` - operators only
//! - `POST /report` - unauthenticated automated-detection ingress

pub mod auth;
pub mod error;
pub mod handlers;

use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use axum::routing::{delete, get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::GeopotholeConfig;
use crate::gateway::IngestionGateway;
use crate::identity::{AccountDirectory, AccountRecord};
use crate::markers::{Marker, MarkerStore};
use crate::persist::{JsonFileSnapshot, SnapshotStore};
use crate::session::SessionRegistry;

/// Shared handles every handler may use.
#[derive(Clone)]
pub struct AppState {
    /// Marker ingestion and listing.
    pub gateway: IngestionGateway,
    /// Account directory.
    pub directory: Arc<AccountDirectory>,
    /// Login sessions.
    pub sessions: Arc<SessionRegistry>,
}

impl AppState {
    /// Bundle already-opened components.
    pub fn new(
        gateway: IngestionGateway,
        directory: Arc<AccountDirectory>,
        sessions: Arc<SessionRegistry>,
    ) -> Self {
        Self {
            gateway,
            directory,
            sessions,
        }
    }

    /// Open both snapshots under the configured data directory and seed the
    /// bootstrap operator if the directory is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be created, a snapshot
    /// is unreadable, or seeding fails.
    pub async fn from_config(config: &GeopotholeConfig) -> anyhow::Result<Self> {
        let data_dir = config.data_dir();
        tokio::fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("failed to create data dir {}", data_dir.display()))?;

        let marker_snapshot: Arc<dyn SnapshotStore<Marker>> =
            Arc::new(JsonFileSnapshot::new(config.markers_path()));
        let store = MarkerStore::open(marker_snapshot)
            .await
            .context("failed to open marker store")?;

        let account_snapshot: Arc<dyn SnapshotStore<AccountRecord>> =
            Arc::new(JsonFileSnapshot::new(config.accounts_path()));
        let directory = AccountDirectory::open(account_snapshot)
            .await
            .context("failed to open account directory")?;

        directory
            .seed_default_admin(
                &config.bootstrap.admin_identity,
                &config.bootstrap.admin_secret,
            )
            .await
            .context("failed to seed bootstrap operator")?;

        info!(
            markers = store.len().await,
            accounts = directory.len().await,
            data_dir = %data_dir.display(),
            "state opened"
        );

        Ok(Self::new(
            IngestionGateway::new(Arc::new(store)),
            Arc::new(directory),
            Arc::new(SessionRegistry::new(config.session_ttl())),
        ))
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/logout", post(handlers::logout))
        .route(
            "/markers",
            get(handlers::list_markers).post(handlers::create_marker),
        )
        .route("/markers/:id", delete(handlers::delete_marker))
        .route("/report", post(handlers::report))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve `state` on `listener` until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if the server fails while accepting connections.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "listening");
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("http server failed")
}
