//! Typed error hierarchy for the fastboot build and serve pipeline.
//!
//! Three top-level enums cover the three subsystems:
//! - `BuildError` — fragment collection and bundle composition failures
//! - `ConfigError` — environment configuration snapshot failures
//! - `SandboxError` — sandbox construction and render failures

use std::path::PathBuf;

use thiserror::Error;

/// Errors from fragment collection and bundle composition.
///
/// Any variant produced during a build is fatal to that build: a partial
/// server bundle must never reach the output tree.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Failed to read fragment at {path}: {source}")]
    FragmentRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Fragment at {path} is not valid UTF-8")]
    FragmentNotUtf8 { path: PathBuf },

    #[error("Failed to compile {path}: {message}")]
    Compile { path: String, message: String },

    #[error("Hook called before included(): app descriptor not captured")]
    NotInitialized,

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors from building the per-environment configuration snapshot.
///
/// These are never silently defaulted: shipping a snapshot with the wrong
/// `autoboot` value causes duplicate or missing application startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Environment config for '{env}' is not a JSON object")]
    NotAnObject { env: String },

    #[error("APP section in environment config for '{env}' is not a JSON object")]
    AppNotAnObject { env: String },

    #[error("Failed to serialize config snapshot: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Errors from sandbox construction and rendering.
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("Missing server bundle under {path}")]
    MissingBundle { path: PathBuf },

    #[error("Failed to read server bundle at {path}: {source}")]
    BundleRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read config snapshot at {path}: {source}")]
    SnapshotRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed config snapshot at {path}: {source}")]
    SnapshotParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid config snapshot at {path}: {reason}")]
    SnapshotInvalid { path: PathBuf, reason: String },

    #[error("Render failed: {0}")]
    Render(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
