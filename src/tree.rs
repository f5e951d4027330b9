//! Minimal file-tree representation exchanged with the host build pipeline.
//!
//! The host owns a real tree engine; hooks in this crate receive and return
//! trees in this flattened `path -> content` form. Paths are relative,
//! `/`-separated, and unique within a tree.

use std::collections::BTreeMap;
use std::path::Path;

/// An ordered set of relative file paths and their contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    files: BTreeMap<String, String>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a file.
    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<String>) {
        self.files.insert(path.into(), content.into());
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Merge `other` into this tree with overwrite semantics: on a path
    /// collision `other`'s content wins.
    pub fn merge(&mut self, other: Tree) {
        self.files.extend(other.files);
    }

    /// Iterate files in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files.iter().map(|(p, c)| (p.as_str(), c.as_str()))
    }

    /// Materialize the tree under `root`, creating parent directories as
    /// needed. Used when the host hands output production back to us (and
    /// by tests to stage a dist directory).
    pub fn write_to(&self, root: &Path) -> std::io::Result<()> {
        for (path, content) in &self.files {
            let target = root.join(path);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&target, content)?;
        }
        Ok(())
    }
}

impl FromIterator<(String, String)> for Tree {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            files: iter.into_iter().collect(),
        }
    }
}
