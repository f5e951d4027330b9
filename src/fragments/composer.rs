//! Bundle composition: merge, compile, concatenate.
//!
//! Composition is deterministic: identical fragment input always yields a
//! byte-identical bundle. Any compile failure aborts the whole composition;
//! a corrupt server bundle must never be shipped.

use std::collections::BTreeMap;

use tracing::debug;

use super::collector::Fragment;
use crate::errors::BuildError;

/// Fixed module namespace the compiler is parameterized with, so module
/// identifiers resolve consistently across sources.
pub const MODULE_NAMESPACE: &str = "/";

/// Seam to the host's registered compile/transpile step.
///
/// The real preprocessor registry is host-owned; this crate only defines
/// the call contract. Errors are plain messages because the registry's
/// error shape is opaque to us.
pub trait Compiler: Send + Sync {
    fn compile(
        &self,
        path: &str,
        source: &str,
        namespace: &str,
        app_name: &str,
    ) -> Result<String, String>;
}

/// Compiler for hosts whose registry performs no transformation.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughCompiler;

impl Compiler for PassthroughCompiler {
    fn compile(
        &self,
        _path: &str,
        source: &str,
        _namespace: &str,
        _app_name: &str,
    ) -> Result<String, String> {
        Ok(source.to_string())
    }
}

/// The compiled, concatenated server bundle for one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledBundle {
    /// Output-tree-relative asset path, `assets/<base>-fastboot.js`.
    pub asset_path: String,
    pub code: String,
}

/// Derive the server artifact's base name from the configured browser
/// bundle output path, so the server asset tracks renames of the browser
/// asset. `"assets/my-app.js"` yields `"my-app"`.
pub fn artifact_base_name(browser_bundle_path: &str) -> String {
    let file = browser_bundle_path
        .rsplit('/')
        .next()
        .unwrap_or(browser_bundle_path);
    file.strip_suffix(".js").unwrap_or(file).to_string()
}

/// Merge fragments last-writer-wins, compile each file, and concatenate
/// into the single server bundle asset.
///
/// Fragment order is collector order: a later fragment at the same logical
/// path replaces an earlier one before compilation, so shadowed content is
/// never compiled. Concatenation walks the merged set in sorted path order.
pub fn compose(
    fragments: &[Fragment],
    app_name: &str,
    artifact_base: &str,
    compiler: &dyn Compiler,
) -> Result<CompiledBundle, BuildError> {
    let mut merged: BTreeMap<&str, &Fragment> = BTreeMap::new();
    for fragment in fragments {
        merged.insert(fragment.path.as_str(), fragment);
    }
    debug!(
        fragments = fragments.len(),
        merged = merged.len(),
        app = app_name,
        "composing server bundle"
    );

    let mut parts = Vec::with_capacity(merged.len());
    for (path, fragment) in &merged {
        let compiled = compiler
            .compile(path, &fragment.content, MODULE_NAMESPACE, app_name)
            .map_err(|message| BuildError::Compile {
                path: (*path).to_string(),
                message,
            })?;
        parts.push(compiled);
    }

    let mut code = parts.join("\n");
    if !code.is_empty() {
        code.push('\n');
    }

    Ok(CompiledBundle {
        asset_path: format!("assets/{artifact_base}-fastboot.js"),
        code,
    })
}
