//! Per-request dispatch: sandbox render or static pass-through.
//!
//! The dispatcher runs as axum middleware in front of static delivery of
//! the build output. Eligibility is computed fresh on every request; both
//! the process-wide disable flag and the query override can change between
//! requests within one process lifetime.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{Method, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tokio::sync::RwLock;
use tracing::{error, warn};

use crate::errors::SandboxError;
use crate::hooks::DISABLE_ENV_VAR;
use crate::sandbox::{RenderRequest, RenderedPage, SandboxManager};

/// Query parameter forcing pass-through for a single request.
pub const QUERY_OVERRIDE: &str = "fastboot";

/// Per-request outcome. No identity beyond one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchDecision {
    /// Route through the current sandbox instance.
    Render,
    /// Hand the request to the next handler unchanged.
    PassThrough,
}

/// Shared state behind the dispatch middleware.
///
/// Holds the lifecycle manager, the current build output path, and the
/// process-wide disable flag (seeded from `FASTBOOT_DISABLED`, flippable by
/// the host at any time).
pub struct DispatcherState {
    manager: Arc<SandboxManager>,
    dist_path: RwLock<PathBuf>,
    disabled: AtomicBool,
}

impl DispatcherState {
    pub fn new(dist_path: PathBuf, manager: Arc<SandboxManager>) -> Self {
        let disabled = std::env::var(DISABLE_ENV_VAR)
            .is_ok_and(|v| !v.is_empty() && v != "0" && v != "false");
        Self {
            manager,
            dist_path: RwLock::new(dist_path),
            disabled: AtomicBool::new(disabled),
        }
    }

    pub fn manager(&self) -> &Arc<SandboxManager> {
        &self.manager
    }

    pub fn disabled(&self) -> bool {
        self.disabled.load(Ordering::Relaxed)
    }

    pub fn set_disabled(&self, disabled: bool) {
        self.disabled.store(disabled, Ordering::Relaxed);
    }

    pub async fn dist_path(&self) -> PathBuf {
        self.dist_path.read().await.clone()
    }

    /// Point the dispatcher at a new build output and swap the sandbox.
    /// On construction failure the previous path and instance stay current.
    pub async fn reload(&self, dist_path: PathBuf) -> Result<(), SandboxError> {
        self.manager.reload(&dist_path).await?;
        *self.dist_path.write().await = dist_path;
        Ok(())
    }

    /// Rebuild the sandbox against the current path (in-place rebuilds).
    pub async fn reload_current(&self) -> Result<(), SandboxError> {
        let dist = self.dist_path().await;
        self.manager.reload(&dist).await.map(|_| ())
    }
}

/// Compute the per-request outcome. Checked per request, never cached.
pub fn decide(disabled: bool, req: &Request) -> DispatchDecision {
    if disabled {
        return DispatchDecision::PassThrough;
    }
    if req
        .uri()
        .query()
        .is_some_and(query_forces_pass_through)
    {
        return DispatchDecision::PassThrough;
    }
    if !is_base_page(req) {
        return DispatchDecision::PassThrough;
    }
    DispatchDecision::Render
}

fn query_forces_pass_through(query: &str) -> bool {
    query.split('&').any(|pair| {
        let mut kv = pair.splitn(2, '=');
        kv.next() == Some(QUERY_OVERRIDE) && kv.next() == Some("false")
    })
}

/// Whether the request targets the base page rather than a sub-resource.
///
/// A base-page candidate is a GET or HEAD whose `Accept` header (when
/// present) admits `text/html`, and whose final path segment carries no
/// extension. Asset and API URLs fall through to static delivery.
fn is_base_page(req: &Request) -> bool {
    if req.method() != Method::GET && req.method() != Method::HEAD {
        return false;
    }
    if let Some(accept) = req
        .headers()
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        && !accept.contains("text/html")
        && !accept.contains("*/*")
    {
        return false;
    }
    let last_segment = req.uri().path().rsplit('/').next().unwrap_or("");
    !last_segment.contains('.')
}

/// The dispatch middleware itself.
///
/// Render errors are surfaced per-request as a 500; a single failed render
/// never affects other requests or the current instance. Sandbox
/// construction failures fall through to static delivery so the site stays
/// up on the client-rendered path while the operator investigates.
pub async fn dispatch(
    State(state): State<Arc<DispatcherState>>,
    req: Request,
    next: Next,
) -> Response {
    if decide(state.disabled(), &req) == DispatchDecision::PassThrough {
        return next.run(req).await;
    }

    let dist = state.dist_path().await;
    let sandbox = match state.manager.ensure(&dist).await {
        Ok(sandbox) => sandbox,
        Err(e) => {
            error!(dist = %dist.display(), error = %e, "sandbox unavailable, falling through to static delivery");
            return next.run(req).await;
        }
    };

    let render_request = RenderRequest {
        method: req.method().to_string(),
        path_and_query: req
            .uri()
            .path_and_query()
            .map(|pq| pq.to_string())
            .unwrap_or_else(|| req.uri().path().to_string()),
        headers: req
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect(),
    };

    match sandbox.render(&render_request).await {
        Ok(page) => page_response(page),
        Err(e) => {
            error!(path = %render_request.path_and_query, error = %e, "render failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Server-side render failed").into_response()
        }
    }
}

fn page_response(page: RenderedPage) -> Response {
    let mut builder = Response::builder()
        .status(StatusCode::from_u16(page.status).unwrap_or(StatusCode::OK));
    for (name, value) in &page.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    match builder.body(Body::from(page.body)) {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %e, "rendered page carried invalid headers");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
