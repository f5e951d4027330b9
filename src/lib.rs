//! Server-side rendering support for pre-built client application bundles.
//!
//! At build time, this crate assembles a server-runnable variant of the
//! application: server-code fragments contributed by the project and its
//! extensions are collected, merged last-writer-wins, compiled, and
//! concatenated into a single bundle asset, alongside an immutable config
//! snapshot with automatic startup forced off.
//!
//! At request time, a dispatcher mounted in front of static delivery
//! decides per request whether to render through a managed sandbox
//! instance bound to the current build output, lazily constructing that
//! instance on first use and atomically replacing it when a rebuild
//! completes.

pub mod capabilities;
pub mod errors;
pub mod events;
pub mod fragments;
pub mod hooks;
pub mod sandbox;
pub mod server;
pub mod snapshot;
pub mod tree;

pub use capabilities::HostCapabilities;
pub use errors::{BuildError, ConfigError, SandboxError};
pub use events::{LifecycleBus, LifecycleEvent};
pub use fragments::{Compiler, Fragment, compose};
pub use hooks::{Addon, AddonOptions, AppDescriptor, BuildHooks, BuildTarget, ContentKind, TreeKind};
pub use sandbox::{RenderRequest, RenderedPage, Sandbox, SandboxFactory, SandboxManager};
pub use server::{DispatchDecision, DispatcherState, ServerConfig};
pub use snapshot::ConfigSnapshot;
pub use tree::Tree;
