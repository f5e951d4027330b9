//! Sandboxed server-side execution of the composed bundle.
//!
//! A [`Sandbox`] is an isolated runtime context bound to exactly one build
//! output directory. The [`SandboxManager`] owns the single current
//! instance and is the only way to obtain or replace it.

pub mod instance;
pub mod manager;

pub use instance::{
    ArtifactSandbox, ArtifactSandboxFactory, BuildArtifact, LoadedArtifact, Renderer, Sandbox,
    SandboxFactory,
};
pub use manager::SandboxManager;

/// The subset of an incoming HTTP request handed to a sandbox render.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub method: String,
    /// Path plus query string, as received.
    pub path_and_query: String,
    pub headers: Vec<(String, String)>,
}

/// A rendered document produced by a sandbox.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RenderedPage {
    /// An OK page with an HTML body and no extra headers.
    pub fn html(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            headers: vec![("content-type".to_string(), "text/html".to_string())],
            body: body.into(),
        }
    }
}
