//! Serve session: the dispatcher mounted in front of static delivery.

pub mod dispatcher;

pub use dispatcher::{DispatchDecision, DispatcherState, QUERY_OVERRIDE, decide, dispatch};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::middleware::from_fn_with_state;
use tokio::sync::broadcast::error::RecvError;
use tower_http::services::ServeDir;
use tracing::{info, warn};

use crate::events::{LifecycleBus, LifecycleEvent};

/// Configuration for the serve session.
pub struct ServerConfig {
    pub port: u16,
    pub dist_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            dist_path: PathBuf::from("dist"),
        }
    }
}

/// Mount the dispatch middleware and static fallback onto a router.
///
/// The dispatcher sees every request first; ineligible requests fall
/// through to `ServeDir` over the build output.
pub fn attach(router: Router, state: Arc<DispatcherState>, dist_path: &Path) -> Router {
    router
        .fallback_service(ServeDir::new(dist_path))
        .layer(from_fn_with_state(state, dispatch))
}

/// Build a standalone router serving the build output with dispatch.
pub fn build_router(state: Arc<DispatcherState>, dist_path: &Path) -> Router {
    attach(Router::new(), state, dist_path)
}

/// Subscribe to the lifecycle bus and reload the sandbox whenever a build
/// output becomes ready. A failed reload keeps the previous instance and
/// only logs; in-flight traffic is unaffected.
pub fn spawn_reload_listener(state: Arc<DispatcherState>, bus: &LifecycleBus) {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(LifecycleEvent::OutputReady) => {
                    if let Err(e) = state.reload_current().await {
                        warn!(error = %e, "sandbox reload after build failed, keeping previous instance");
                    }
                }
                Ok(LifecycleEvent::PostBuild) => {}
                Err(RecvError::Lagged(skipped)) => {
                    // Coalesced rebuild notifications; the next OutputReady
                    // reloads against the latest output anyway.
                    warn!(skipped, "lifecycle listener lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}

/// Install a global tracing subscriber honoring `RUST_LOG`.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

/// Start serving the build output with server-side rendering.
pub async fn serve(config: ServerConfig, state: Arc<DispatcherState>) -> Result<()> {
    init_tracing();
    let app = build_router(state, &config.dist_path);

    let addr = format!("127.0.0.1:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    let local_addr = listener.local_addr()?;
    info!(dist = %config.dist_path.display(), "serving at http://{}", local_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    info!("shutting down");
}
