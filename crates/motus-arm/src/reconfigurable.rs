//! [`ReconfigurableArm`] – the stable handle the rest of the system holds.
//!
//! The handle owns the current driver behind a `tokio::sync::RwLock`.  Every
//! forwarded call holds the read side until the driver returns, so a long
//! move keeps the driver pinned; [`Reconfigurable::reconfigure`] takes the
//! write side and therefore waits for in-flight calls to finish before it
//! swaps drivers.
//!
//! Whether the driver can report motion is decided once in [`wrap`] and
//! recorded in the handle's shape.  A handle only accepts a replacement of
//! the same shape, so the capabilities callers discovered on it never change.

use std::any::Any;
use std::fmt;
use std::ptr;
use std::sync::Arc;

use async_trait::async_trait;
use motus_kinematics::{InputEnabled, Model, ModelFramer};
use motus_resource::{Generic, MovingCheckable, Reconfigurable, Resource};
use motus_types::{
    ComponentConfig, Extra, Input, JointPositions, MotusError, Pose, UpdateAction, WorldState,
};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::arm::{into_resource, Arm};

struct Delegate {
    actual: Arc<dyn Arm>,
    /// The driver as a [`MovingCheckable`]; `Some` iff the handle's shape
    /// includes it.
    moving: Option<Arc<dyn MovingCheckable>>,
}

/// Concurrency-safe, swappable arm handle.
pub struct ReconfigurableArm {
    delegate: RwLock<Delegate>,
    moving_checkable: bool,
}

impl fmt::Debug for ReconfigurableArm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReconfigurableArm")
            .field("shape", &self.shape())
            .finish_non_exhaustive()
    }
}

/// Wrap a driver in a [`ReconfigurableArm`].
///
/// A driver that already is a handle is returned as-is.
pub fn wrap_arm(arm: Arc<dyn Arm>) -> Arc<ReconfigurableArm> {
    if let Some(handle) = Arc::clone(&arm).as_reconfigurable() {
        return handle;
    }
    let moving = Arc::clone(&arm).moving_checkable();
    let moving_checkable = moving.is_some();
    debug!(moving_checkable, "wrapping arm");
    Arc::new(ReconfigurableArm {
        delegate: RwLock::new(Delegate { actual: arm, moving }),
        moving_checkable,
    })
}

/// Registry entry point: wrap an erased driver.
///
/// # Errors
///
/// [`MotusError::UnimplementedInterface`] when `resource` is not an arm.
pub fn wrap(resource: Resource) -> Result<Arc<dyn Reconfigurable>, MotusError> {
    let arm = resource
        .downcast::<dyn Arm>()
        .ok_or_else(|| MotusError::UnimplementedInterface {
            expected: "Arm".to_string(),
            actual: resource.type_name().to_string(),
        })?;
    Ok(wrap_arm(arm))
}

impl ReconfigurableArm {
    /// The driver currently behind the handle.
    pub async fn actual(&self) -> Arc<dyn Arm> {
        Arc::clone(&self.delegate.read().await.actual)
    }
}

#[async_trait]
impl Reconfigurable for ReconfigurableArm {
    async fn reconfigure(&self, new: Arc<dyn Reconfigurable>) -> Result<(), MotusError> {
        let Some(incoming) = new.as_any().downcast_ref::<ReconfigurableArm>() else {
            return Err(MotusError::ReconfigureType {
                expected: self.shape(),
                actual: new.shape(),
            });
        };
        if incoming.moving_checkable != self.moving_checkable {
            return Err(MotusError::ReconfigureType {
                expected: self.shape(),
                actual: incoming.shape(),
            });
        }
        if ptr::eq(self, incoming) {
            return Ok(());
        }

        let (actual, moving) = {
            let d = incoming.delegate.read().await;
            (Arc::clone(&d.actual), d.moving.clone())
        };

        let mut current = self.delegate.write().await;
        if let Err(e) = current.actual.close().await {
            error!(error = %e, "error closing old arm");
        }
        *current = Delegate { actual, moving };
        debug!("arm reconfigured");
        Ok(())
    }

    async fn close(&self) -> Result<(), MotusError> {
        self.delegate.read().await.actual.close().await
    }

    async fn update_action(&self, config: &ComponentConfig) -> UpdateAction {
        self.delegate.read().await.actual.update_action(config).await
    }

    fn shape(&self) -> String {
        if self.moving_checkable {
            "ReconfigurableArm+MovingCheckable".to_string()
        } else {
            "ReconfigurableArm".to_string()
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn resource(self: Arc<Self>) -> Resource {
        into_resource(self)
    }
}

#[async_trait]
impl Generic for ReconfigurableArm {
    async fn do_command(&self, cmd: Extra) -> Result<Extra, MotusError> {
        self.delegate.read().await.actual.do_command(cmd).await
    }
}

#[async_trait]
impl ModelFramer for ReconfigurableArm {
    async fn model_frame(&self) -> Arc<dyn Model> {
        self.delegate.read().await.actual.model_frame().await
    }
}

#[async_trait]
impl InputEnabled for ReconfigurableArm {
    async fn current_inputs(&self) -> Result<Vec<Input>, MotusError> {
        self.delegate.read().await.actual.current_inputs().await
    }

    async fn go_to_inputs(&self, goal: &[Input]) -> Result<(), MotusError> {
        self.delegate.read().await.actual.go_to_inputs(goal).await
    }
}

#[async_trait]
impl MovingCheckable for ReconfigurableArm {
    async fn is_moving(&self) -> Result<bool, MotusError> {
        match &self.delegate.read().await.moving {
            Some(moving) => moving.is_moving().await,
            None => Err(MotusError::UnimplementedCapability("IsMoving".to_string())),
        }
    }
}

#[async_trait]
impl Arm for ReconfigurableArm {
    async fn end_position(&self, extra: Extra) -> Result<Pose, MotusError> {
        self.delegate.read().await.actual.end_position(extra).await
    }

    async fn move_to_position(
        &self,
        pose: Pose,
        world_state: Option<WorldState>,
        extra: Extra,
        cancel: &CancellationToken,
    ) -> Result<(), MotusError> {
        self.delegate
            .read()
            .await
            .actual
            .move_to_position(pose, world_state, extra, cancel)
            .await
    }

    async fn move_to_joint_positions(&self, positions: JointPositions, extra: Extra) -> Result<(), MotusError> {
        self.delegate
            .read()
            .await
            .actual
            .move_to_joint_positions(positions, extra)
            .await
    }

    async fn joint_positions(&self, extra: Extra) -> Result<JointPositions, MotusError> {
        self.delegate.read().await.actual.joint_positions(extra).await
    }

    async fn stop(&self, extra: Extra) -> Result<(), MotusError> {
        self.delegate.read().await.actual.stop(extra).await
    }

    async fn close(&self) -> Result<(), MotusError> {
        Reconfigurable::close(self).await
    }

    async fn update_action(&self, config: &ComponentConfig) -> UpdateAction {
        Reconfigurable::update_action(self, config).await
    }

    fn moving_checkable(self: Arc<Self>) -> Option<Arc<dyn MovingCheckable>> {
        if self.moving_checkable {
            Some(self as Arc<dyn MovingCheckable>)
        } else {
            None
        }
    }

    fn as_reconfigurable(self: Arc<Self>) -> Option<Arc<ReconfigurableArm>> {
        Some(self)
    }
}
