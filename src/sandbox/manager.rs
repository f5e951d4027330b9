//! Sandbox lifecycle: lazy construction and atomic replacement.
//!
//! The manager holds the only mutable shared state between the build
//! completion notifier and concurrent request handlers: the "current
//! instance" reference. It is replaced by reference swap, never edited in
//! place, so concurrent readers always observe a fully constructed
//! instance. Requests in flight keep their own `Arc` and finish against
//! whichever instance they started with.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{error, info};

use super::instance::{Sandbox, SandboxFactory};
use crate::errors::SandboxError;

/// Owns zero-or-one current [`Sandbox`], keyed by a build output directory.
pub struct SandboxManager {
    factory: Arc<dyn SandboxFactory>,
    current: RwLock<Option<Arc<dyn Sandbox>>>,
}

impl SandboxManager {
    pub fn new(factory: Arc<dyn SandboxFactory>) -> Self {
        Self {
            factory,
            current: RwLock::new(None),
        }
    }

    /// The current instance, if one has been constructed.
    pub async fn current(&self) -> Option<Arc<dyn Sandbox>> {
        self.current.read().await.clone()
    }

    /// Return the current instance, constructing one bound to `dist_path`
    /// if none exists yet.
    ///
    /// Construction is expensive (it loads and evaluates the bundle) and
    /// happens at most once per build output: racing callers serialize on
    /// the write lock and the loser reuses the winner's instance.
    pub async fn ensure(&self, dist_path: &Path) -> Result<Arc<dyn Sandbox>, SandboxError> {
        if let Some(instance) = self.current.read().await.as_ref() {
            return Ok(instance.clone());
        }

        let mut slot = self.current.write().await;
        if let Some(instance) = slot.as_ref() {
            return Ok(instance.clone());
        }

        info!(dist = %dist_path.display(), "constructing sandbox instance");
        let instance = self.factory.create(dist_path).await?;
        *slot = Some(instance.clone());
        Ok(instance)
    }

    /// Replace the current instance with a fresh one bound to `dist_path`.
    ///
    /// The new instance is constructed fully before the swap, so no request
    /// ever observes a half-built instance. On construction failure the
    /// previous instance (if any) stays current and keeps serving in-flight
    /// traffic; the error is returned to the caller.
    pub async fn reload(&self, dist_path: &Path) -> Result<Arc<dyn Sandbox>, SandboxError> {
        info!(dist = %dist_path.display(), "reloading sandbox instance");
        let fresh = match self.factory.create(dist_path).await {
            Ok(instance) => instance,
            Err(e) => {
                error!(dist = %dist_path.display(), error = %e, "sandbox reload failed, keeping previous instance");
                return Err(e);
            }
        };

        *self.current.write().await = Some(fresh.clone());
        Ok(fresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::{RenderRequest, RenderedPage};
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Sandbox that remembers its dist path and construction ordinal.
    struct CountingSandbox {
        dist: PathBuf,
        ordinal: usize,
    }

    #[async_trait]
    impl Sandbox for CountingSandbox {
        fn dist_path(&self) -> &Path {
            &self.dist
        }

        async fn render(&self, _request: &RenderRequest) -> Result<RenderedPage, SandboxError> {
            Ok(RenderedPage::html(format!("instance {}", self.ordinal)))
        }
    }

    /// Factory counting constructions; fails for paths containing "broken".
    struct CountingFactory {
        constructed: AtomicUsize,
    }

    impl CountingFactory {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                constructed: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl SandboxFactory for CountingFactory {
        async fn create(&self, dist_path: &Path) -> Result<Arc<dyn Sandbox>, SandboxError> {
            if dist_path.to_string_lossy().contains("broken") {
                return Err(SandboxError::MissingBundle {
                    path: dist_path.to_path_buf(),
                });
            }
            let ordinal = self.constructed.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(CountingSandbox {
                dist: dist_path.to_path_buf(),
                ordinal,
            }))
        }
    }

    #[tokio::test]
    async fn test_ensure_constructs_lazily_and_once() {
        let factory = CountingFactory::new();
        let manager = SandboxManager::new(factory.clone());
        assert!(manager.current().await.is_none());

        let first = manager.ensure(Path::new("/dist")).await.unwrap();
        let second = manager.ensure(Path::new("/dist")).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(factory.constructed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_ensure_constructs_once() {
        let factory = CountingFactory::new();
        let manager = Arc::new(SandboxManager::new(factory.clone()));

        let tasks: Vec<_> = (0..10)
            .map(|_| {
                let manager = manager.clone();
                tokio::spawn(async move { manager.ensure(Path::new("/dist")).await.unwrap() })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(factory.constructed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_reload_swaps_to_new_path() {
        let factory = CountingFactory::new();
        let manager = SandboxManager::new(factory);

        let old = manager.ensure(Path::new("/dist1")).await.unwrap();
        manager.reload(Path::new("/dist2")).await.unwrap();

        let current = manager.ensure(Path::new("/dist1")).await.unwrap();
        assert!(!Arc::ptr_eq(&old, &current));
        assert_eq!(current.dist_path(), Path::new("/dist2"));
        // The old instance is still usable by whoever holds it.
        assert_eq!(old.dist_path(), Path::new("/dist1"));
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_previous_instance() {
        let factory = CountingFactory::new();
        let manager = SandboxManager::new(factory);

        let old = manager.ensure(Path::new("/dist1")).await.unwrap();
        let err = manager.reload(Path::new("/broken")).await.unwrap_err();
        assert!(matches!(err, SandboxError::MissingBundle { .. }));

        let current = manager.current().await.unwrap();
        assert!(Arc::ptr_eq(&old, &current));
    }

    #[tokio::test]
    async fn test_failed_first_construction_leaves_no_current() {
        let factory = CountingFactory::new();
        let manager = SandboxManager::new(factory);

        assert!(manager.ensure(Path::new("/broken")).await.is_err());
        assert!(manager.current().await.is_none());

        // A later ensure against a good path recovers.
        let instance = manager.ensure(Path::new("/dist")).await.unwrap();
        assert_eq!(instance.dist_path(), Path::new("/dist"));
    }

    #[tokio::test]
    async fn test_in_flight_render_completes_against_old_instance() {
        let factory = CountingFactory::new();
        let manager = SandboxManager::new(factory);

        let old = manager.ensure(Path::new("/dist1")).await.unwrap();
        manager.reload(Path::new("/dist2")).await.unwrap();

        let request = RenderRequest {
            method: "GET".to_string(),
            path_and_query: "/".to_string(),
            headers: vec![],
        };
        let page = old.render(&request).await.unwrap();
        assert_eq!(page.body, "instance 0");
    }
}
