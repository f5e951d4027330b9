//! Fragment discovery across extensions and the project.
//!
//! Discovery is pure: it reads the filesystem but changes nothing. A source
//! without a fragment directory simply contributes no fragments.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::errors::BuildError;

/// Directory name a source exposes to contribute server-code fragments.
pub const FRAGMENT_DIR: &str = "fastboot";

/// Which source contributed a fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentOrigin {
    Extension(String),
    Project,
}

/// A single source-origin contribution of server-executable code.
///
/// Immutable once collected; `path` is already namespaced under
/// `<app>-fastboot/` so that module identifiers resolve consistently at
/// composition time.
#[derive(Debug, Clone)]
pub struct Fragment {
    pub origin: FragmentOrigin,
    pub path: String,
    pub content: String,
}

/// The project being built.
#[derive(Debug, Clone)]
pub struct ProjectDescriptor {
    pub root: PathBuf,
    pub app_name: String,
}

/// An installed extension, in host install order.
#[derive(Debug, Clone)]
pub struct ExtensionDescriptor {
    pub name: String,
    pub root: PathBuf,
}

/// Discover all server-code fragments for one build.
///
/// Extension fragments come first, in the given extension order; project
/// fragments come last so they shadow extension-provided files under the
/// composer's last-writer-wins merge. Files within one directory are
/// visited in sorted order so collection is deterministic.
pub fn collect_fragments(
    project: &ProjectDescriptor,
    extensions: &[ExtensionDescriptor],
) -> Result<Vec<Fragment>, BuildError> {
    let mut fragments = Vec::new();

    for ext in extensions {
        collect_dir(
            &ext.root.join(FRAGMENT_DIR),
            FragmentOrigin::Extension(ext.name.clone()),
            &project.app_name,
            &mut fragments,
        )?;
    }

    collect_dir(
        &project.root.join(FRAGMENT_DIR),
        FragmentOrigin::Project,
        &project.app_name,
        &mut fragments,
    )?;

    Ok(fragments)
}

fn collect_dir(
    dir: &Path,
    origin: FragmentOrigin,
    app_name: &str,
    out: &mut Vec<Fragment>,
) -> Result<(), BuildError> {
    // A missing directory is not an error: the source contributes nothing.
    if !dir.is_dir() {
        return Ok(());
    }

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf());
            BuildError::FragmentRead {
                path,
                source: e.into(),
            }
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let Ok(rel) = entry.path().strip_prefix(dir) else {
            continue;
        };
        let rel = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        let content = std::fs::read_to_string(entry.path()).map_err(|source| {
            if source.kind() == std::io::ErrorKind::InvalidData {
                BuildError::FragmentNotUtf8 {
                    path: entry.path().to_path_buf(),
                }
            } else {
                BuildError::FragmentRead {
                    path: entry.path().to_path_buf(),
                    source,
                }
            }
        })?;

        out.push(Fragment {
            origin: origin.clone(),
            path: format!("{app_name}-fastboot/{rel}"),
            content,
        });
    }

    Ok(())
}
