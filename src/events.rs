//! Lifecycle notification bus for a build/serve session.
//!
//! The host's build pipeline reports lifecycle points through the addon's
//! `output_ready`/`post_build` hooks; interested parties (the serve session,
//! most importantly) subscribe here instead of reaching into the addon.

use tokio::sync::broadcast;

/// Events emitted over the course of one build/serve session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The build output directory is fully written and consistent.
    OutputReady,
    /// The host finished its entire build pass.
    PostBuild,
}

/// Process-lifetime broadcast bus for [`LifecycleEvent`]s.
///
/// Cloning is cheap and shares the underlying channel. Emitting with no
/// subscribers is not an error.
#[derive(Debug, Clone)]
pub struct LifecycleBus {
    tx: broadcast::Sender<LifecycleEvent>,
}

impl LifecycleBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: LifecycleEvent) {
        // A send error only means nobody is listening right now.
        let _ = self.tx.send(event);
    }
}

impl Default for LifecycleBus {
    fn default() -> Self {
        Self::new()
    }
}
