//! Build-time hook surface and the addon implementing it.
//!
//! The host build pipeline invokes each hook at a fixed point in its
//! pipeline; this crate does not control invocation order. [`BuildHooks`]
//! is the explicit capability interface, one method per hook; [`Addon`] is
//! the implementation wiring the fragment collector, bundle composer, and
//! config snapshot builder together and emitting lifecycle events.

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::capabilities::HostCapabilities;
use crate::errors::BuildError;
use crate::events::{LifecycleBus, LifecycleEvent};
use crate::fragments::{
    Compiler, ExtensionDescriptor, ProjectDescriptor, artifact_base_name, collect_fragments,
    compose,
};
use crate::sandbox::{SandboxFactory, SandboxManager};
use crate::server::{self, DispatcherState, ServerConfig};
use crate::snapshot::{CONFIG_SNAPSHOT_FILE, ConfigSnapshot};
use crate::tree::Tree;

/// Environment switch disabling server-bundle production at build time and
/// seeding the runtime dispatch flag.
pub const DISABLE_ENV_VAR: &str = "FASTBOOT_DISABLED";

/// Placeholder the sandbox replaces with the rendered body.
pub const BODY_PLACEHOLDER: &str = "<!-- FASTBOOT_BODY -->";

/// Placeholders the sandbox replaces with the rendered title and head.
pub const HEAD_PLACEHOLDER: &str = "<!-- FASTBOOT_TITLE --><!-- FASTBOOT_HEAD -->";

/// Replacement body for the config module in the server build: resolve
/// configuration at render time instead of baking in the browser copy.
pub const CONFIG_MODULE_BODY: &str = "return FastBoot.config();";

/// Document sections the host asks content for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Body,
    Head,
    AppBoot,
    ConfigModule,
}

/// Which tree a postprocess call covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeKind {
    App,
    Public,
    All,
}

/// Whether the host is producing the browser build or the server build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildTarget {
    Browser,
    Server,
}

/// What the host tells us about the application when the build starts.
#[derive(Debug, Clone)]
pub struct AppDescriptor {
    pub name: String,
    /// Host framework version string, resolved into capabilities once.
    pub host_version: String,
    /// Configured output path of the browser bundle; the server artifact
    /// name is derived from it so it tracks renames.
    pub browser_bundle_path: String,
    pub build_target: BuildTarget,
}

/// The build-time hook capability interface, one method per host hook.
pub trait BuildHooks {
    /// Called at the start of the build; captures the app descriptor.
    fn included(&mut self, app: &AppDescriptor);

    /// Environment config contribution for the current build target.
    fn config(&self, env: &str) -> Option<Value>;

    /// Content for a document section. `Some` replaces the host-provided
    /// default `contents` entirely; `None` leaves them untouched.
    fn content_for(&self, kind: ContentKind, config: &Value, contents: &[String])
    -> Option<String>;

    /// Merge the composed server bundle into the public tree.
    fn tree_for_public(&self, tree: Option<Tree>) -> Result<Tree, BuildError>;

    /// Post-process a completed tree; the final (`All`) tree gains the
    /// serialized config snapshot.
    fn postprocess_tree(&self, kind: TreeKind, tree: Tree) -> Result<Tree, BuildError>;

    /// Mount the request dispatcher in front of the host's static serving.
    fn server_middleware(&self, router: Router, options: &ServerConfig) -> Router;

    /// The build output directory is fully written.
    fn output_ready(&self);

    /// The host finished its entire build pass.
    fn post_build(&self);
}

/// Render the application-boot module from the fixed template.
///
/// The module defers booting to the host: it exposes a factory the sandbox
/// calls per render instead of starting the application on load.
pub fn boot_module(module_prefix: &str, app_config: &Value) -> String {
    let app = serde_json::to_string(app_config).unwrap_or_else(|_| "{}".to_string());
    format!(
        "define('~fastboot/app-factory', ['{prefix}/app', '{prefix}/config/environment'], function(App, config) {{\n  App = App['default'];\n  config = config['default'];\n\n  return {{\n    'default': function() {{\n      return App.create({app});\n    }}\n  }};\n}});",
        prefix = module_prefix,
    )
}

/// Construction options for [`Addon`].
pub struct AddonOptions {
    pub project_root: PathBuf,
    /// Installed extensions in host install order.
    pub extensions: Vec<ExtensionDescriptor>,
    /// Environment name the build targets.
    pub environment: String,
    /// The host's environment config object; never mutated.
    pub env_config: Value,
    pub compiler: Arc<dyn Compiler>,
    pub sandbox_factory: Arc<dyn SandboxFactory>,
}

/// The addon: implements [`BuildHooks`] over the composition pipeline and
/// owns the lifecycle bus for the session.
pub struct Addon {
    project_root: PathBuf,
    extensions: Vec<ExtensionDescriptor>,
    environment: String,
    env_config: Value,
    compiler: Arc<dyn Compiler>,
    sandbox_factory: Arc<dyn SandboxFactory>,
    bus: LifecycleBus,
    build_disabled: bool,
    app: Option<AppDescriptor>,
    capabilities: Option<HostCapabilities>,
}

impl Addon {
    pub fn new(options: AddonOptions) -> Self {
        let build_disabled = std::env::var(DISABLE_ENV_VAR)
            .is_ok_and(|v| !v.is_empty() && v != "0" && v != "false");
        Self {
            project_root: options.project_root,
            extensions: options.extensions,
            environment: options.environment,
            env_config: options.env_config,
            compiler: options.compiler,
            sandbox_factory: options.sandbox_factory,
            bus: LifecycleBus::new(),
            build_disabled,
            app: None,
            capabilities: None,
        }
    }

    /// The session's lifecycle bus, for subscribers beyond the serve layer.
    pub fn bus(&self) -> &LifecycleBus {
        &self.bus
    }

    pub fn capabilities(&self) -> Option<HostCapabilities> {
        self.capabilities
    }

    /// Override the build-time disable switch (normally seeded from the
    /// environment).
    pub fn set_build_disabled(&mut self, disabled: bool) {
        self.build_disabled = disabled;
    }

    fn app(&self) -> Result<&AppDescriptor, BuildError> {
        self.app.as_ref().ok_or(BuildError::NotInitialized)
    }
}

impl BuildHooks for Addon {
    fn included(&mut self, app: &AppDescriptor) {
        self.capabilities = Some(HostCapabilities::from_host_version(&app.host_version));
        info!(app = %app.name, version = %app.host_version, "build started");
        self.app = Some(app.clone());
    }

    fn config(&self, _env: &str) -> Option<Value> {
        match self.app.as_ref()?.build_target {
            BuildTarget::Server => Some(json!({ "APP": { "autoboot": false } })),
            BuildTarget::Browser => None,
        }
    }

    fn content_for(
        &self,
        kind: ContentKind,
        config: &Value,
        _contents: &[String],
    ) -> Option<String> {
        match kind {
            ContentKind::Body => Some(BODY_PLACEHOLDER.to_string()),
            ContentKind::Head => Some(HEAD_PLACEHOLDER.to_string()),
            ContentKind::AppBoot => {
                let prefix = config
                    .get("modulePrefix")
                    .and_then(Value::as_str)
                    .unwrap_or("app");
                let app_config = config.get("APP").cloned().unwrap_or_else(|| json!({}));
                Some(boot_module(prefix, &app_config))
            }
            ContentKind::ConfigModule => {
                // Only the server build swaps the baked-in config module
                // for the render-time lookup.
                match self.app.as_ref()?.build_target {
                    BuildTarget::Server => Some(CONFIG_MODULE_BODY.to_string()),
                    BuildTarget::Browser => None,
                }
            }
        }
    }

    fn tree_for_public(&self, tree: Option<Tree>) -> Result<Tree, BuildError> {
        let app = self.app()?;
        let project = ProjectDescriptor {
            root: self.project_root.clone(),
            app_name: app.name.clone(),
        };

        let fragments = collect_fragments(&project, &self.extensions)?;
        let base = artifact_base_name(&app.browser_bundle_path);
        let bundle = compose(&fragments, &app.name, &base, self.compiler.as_ref())?;
        debug!(asset = %bundle.asset_path, bytes = bundle.code.len(), "composed server bundle");

        let mut out = tree.unwrap_or_default();
        out.insert(bundle.asset_path, bundle.code);
        Ok(out)
    }

    fn postprocess_tree(&self, kind: TreeKind, mut tree: Tree) -> Result<Tree, BuildError> {
        if kind != TreeKind::All || self.build_disabled {
            return Ok(tree);
        }

        let snapshot = ConfigSnapshot::build(&self.environment, &self.env_config)?;
        tree.insert(CONFIG_SNAPSHOT_FILE, snapshot.to_json()?);
        Ok(tree)
    }

    fn server_middleware(&self, router: Router, options: &ServerConfig) -> Router {
        let manager = Arc::new(SandboxManager::new(self.sandbox_factory.clone()));
        let state = Arc::new(DispatcherState::new(options.dist_path.clone(), manager));
        server::spawn_reload_listener(state.clone(), &self.bus);
        server::attach(router, state, &options.dist_path)
    }

    fn output_ready(&self) {
        self.bus.emit(LifecycleEvent::OutputReady);
    }

    fn post_build(&self) {
        self.bus.emit(LifecycleEvent::PostBuild);
    }
}
