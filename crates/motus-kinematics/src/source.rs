//! Access to the robot-wide frame tree.
//!
//! The tree is published whole: a [`FrameSystemHandle`] swaps one
//! `Arc<FrameSystem>` for another, and every reader works on the snapshot it
//! cloned.  Per-call transform overrides are merged into a private copy.

use std::sync::{Arc, PoisonError, RwLock};

use motus_types::{LinkInFrame, MotusError};
use tracing::debug;

use crate::frame_system::FrameSystem;

/// Supplier of the robot-wide frame tree.
pub trait FrameSystemSource: Send + Sync {
    /// A read-only snapshot, with `transforms` attached as static frames.
    ///
    /// # Errors
    ///
    /// [`MotusError::Frame`] when a transform names an unknown parent or
    /// reuses an existing frame name.
    fn frame_system(&self, transforms: &[LinkInFrame]) -> Result<Arc<FrameSystem>, MotusError>;
}

/// Holder of the currently published tree.
#[derive(Debug)]
pub struct FrameSystemHandle {
    current: RwLock<Arc<FrameSystem>>,
}

impl FrameSystemHandle {
    pub fn new(frame_system: FrameSystem) -> Self {
        Self {
            current: RwLock::new(Arc::new(frame_system)),
        }
    }

    /// Replace the published tree.  Readers holding the previous snapshot
    /// keep it.
    pub fn publish(&self, frame_system: FrameSystem) {
        debug!(name = %frame_system.name(), frames = frame_system.len(), "publishing frame system");
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(frame_system);
    }

    pub fn snapshot(&self) -> Arc<FrameSystem> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }
}

impl FrameSystemSource for FrameSystemHandle {
    fn frame_system(&self, transforms: &[LinkInFrame]) -> Result<Arc<FrameSystem>, MotusError> {
        let snapshot = self.snapshot();
        if transforms.is_empty() {
            return Ok(snapshot);
        }
        Ok(Arc::new(snapshot.merge_transforms(transforms)?))
    }
}
