//! Sandbox instances and the build artifact they execute.
//!
//! Constructing an instance is expensive: the artifact is read, validated,
//! and handed to the renderer's runtime. Construction therefore happens at
//! most once per build output, driven by [`super::SandboxManager`]. An
//! instance is never mutated after construction; it is replaced wholesale.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::{RenderRequest, RenderedPage};
use crate::errors::SandboxError;
use crate::snapshot::CONFIG_SNAPSHOT_FILE;

/// A running server-side execution context bound to one build output.
#[async_trait]
pub trait Sandbox: Send + Sync {
    /// The build output directory this instance was constructed from.
    fn dist_path(&self) -> &Path;

    async fn render(&self, request: &RenderRequest) -> Result<RenderedPage, SandboxError>;
}

impl std::fmt::Debug for dyn Sandbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sandbox")
            .field("dist_path", &self.dist_path())
            .finish()
    }
}

/// Constructs sandbox instances from a build output directory.
#[async_trait]
pub trait SandboxFactory: Send + Sync {
    async fn create(&self, dist_path: &Path) -> Result<Arc<dyn Sandbox>, SandboxError>;
}

/// The final build output pair: compiled server bundle plus serialized
/// config snapshot. Owned by the build pipeline; read-only here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildArtifact {
    pub code_path: PathBuf,
    pub config_path: PathBuf,
}

impl BuildArtifact {
    /// Locate the artifact pair under a build output directory.
    ///
    /// The server bundle is the `assets/*-fastboot.js` asset; when several
    /// match (stale outputs), the lexicographically first is taken so
    /// discovery stays deterministic.
    pub fn discover(dist_path: &Path) -> Result<Self, SandboxError> {
        let assets = dist_path.join("assets");
        let mut candidates: Vec<PathBuf> = std::fs::read_dir(&assets)
            .map_err(|_| SandboxError::MissingBundle {
                path: dist_path.to_path_buf(),
            })?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with("-fastboot.js"))
            })
            .collect();
        candidates.sort();

        let code_path = candidates.into_iter().next().ok_or(SandboxError::MissingBundle {
            path: dist_path.to_path_buf(),
        })?;

        Ok(Self {
            code_path,
            config_path: dist_path.join(CONFIG_SNAPSHOT_FILE),
        })
    }
}

/// A fully loaded and validated build artifact, ready for execution.
#[derive(Debug, Clone)]
pub struct LoadedArtifact {
    pub artifact: BuildArtifact,
    pub code: String,
    pub config: Value,
}

impl LoadedArtifact {
    /// Load and validate the artifact under `dist_path`.
    ///
    /// A snapshot whose `APP.autoboot` is not `false` is rejected: booting
    /// such a bundle would start the application twice.
    pub fn load(dist_path: &Path) -> Result<Self, SandboxError> {
        let artifact = BuildArtifact::discover(dist_path)?;

        let code = std::fs::read_to_string(&artifact.code_path).map_err(|source| {
            SandboxError::BundleRead {
                path: artifact.code_path.clone(),
                source,
            }
        })?;

        let raw = std::fs::read_to_string(&artifact.config_path).map_err(|source| {
            SandboxError::SnapshotRead {
                path: artifact.config_path.clone(),
                source,
            }
        })?;
        let config: Value =
            serde_json::from_str(&raw).map_err(|source| SandboxError::SnapshotParse {
                path: artifact.config_path.clone(),
                source,
            })?;

        if config.pointer("/APP/autoboot") != Some(&Value::Bool(false)) {
            return Err(SandboxError::SnapshotInvalid {
                path: artifact.config_path.clone(),
                reason: "APP.autoboot must be false".to_string(),
            });
        }

        debug!(
            code = %artifact.code_path.display(),
            bytes = code.len(),
            "loaded build artifact"
        );

        Ok(Self {
            artifact,
            code,
            config,
        })
    }
}

/// Executes the loaded bundle for one request. The actual runtime (the
/// engine evaluating the server bundle) is host-supplied; this crate only
/// manages its lifecycle.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(
        &self,
        artifact: &LoadedArtifact,
        request: &RenderRequest,
    ) -> Result<RenderedPage, SandboxError>;
}

/// Default sandbox: a loaded artifact paired with a renderer.
pub struct ArtifactSandbox {
    dist_path: PathBuf,
    artifact: LoadedArtifact,
    renderer: Arc<dyn Renderer>,
}

impl ArtifactSandbox {
    pub fn artifact(&self) -> &LoadedArtifact {
        &self.artifact
    }
}

#[async_trait]
impl Sandbox for ArtifactSandbox {
    fn dist_path(&self) -> &Path {
        &self.dist_path
    }

    async fn render(&self, request: &RenderRequest) -> Result<RenderedPage, SandboxError> {
        self.renderer.render(&self.artifact, request).await
    }
}

/// Factory producing [`ArtifactSandbox`]es that share one renderer.
pub struct ArtifactSandboxFactory {
    renderer: Arc<dyn Renderer>,
}

impl ArtifactSandboxFactory {
    pub fn new(renderer: Arc<dyn Renderer>) -> Self {
        Self { renderer }
    }
}

#[async_trait]
impl SandboxFactory for ArtifactSandboxFactory {
    async fn create(&self, dist_path: &Path) -> Result<Arc<dyn Sandbox>, SandboxError> {
        let artifact = LoadedArtifact::load(dist_path)?;
        Ok(Arc::new(ArtifactSandbox {
            dist_path: dist_path.to_path_buf(),
            artifact,
            renderer: self.renderer.clone(),
        }))
    }
}
