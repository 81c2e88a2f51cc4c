//! The [`Arm`] capability interface and the helpers built on it.
//!
//! Drivers implement [`Arm`]; everything else in the system holds an arm as
//! an `Arc<dyn Arm>`, normally the [`ReconfigurableArm`] handle wrapping the
//! driver.
//!
//! # Example
//!
//! ```rust
//! use motus_arm::{position_grid_diff, position_rotation_diff};
//! use motus_types::{Pose, Quaternion, Vec3};
//!
//! let a = Pose::from_point(0.0, 0.0, 0.0);
//! let b = Pose::new(
//!     Vec3::new(30.0, 40.0, 0.0),
//!     Quaternion::from_axis_angle(Vec3::new(0.0, 0.0, 1.0), 0.5),
//! );
//! assert!((position_grid_diff(&a, &b) - 50.0).abs() < 1e-9);
//! assert!((position_rotation_diff(&a, &b) - 0.5).abs() < 1e-9);
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use motus_kinematics::{InputEnabled, ModelFramer};
use motus_resource::{resolve, Dependencies, Generic, MovingCheckable, Resource};
use motus_types::{
    ComponentConfig, Extra, JointPositions, MotusError, Pose, ResourceName, Subtype, UpdateAction,
    WorldState,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::reconfigurable::ReconfigurableArm;

/// Subtype name under which arms are registered.
pub const SUBTYPE_NAME: &str = "arm";

/// `rdk:component:arm`.
pub fn subtype() -> Subtype {
    Subtype::component(SUBTYPE_NAME)
}

/// The [`ResourceName`] of the arm called `name`.
pub fn named(name: impl Into<String>) -> ResourceName {
    subtype().named(name)
}

/// A robotic arm.
///
/// Positions are in millimetres, joint positions in degrees.  Every arm can
/// describe its kinematics ([`ModelFramer`]) and be driven directly in joint
/// space ([`InputEnabled`]).  Whether it can report motion is optional and
/// discovered once, through [`Arm::moving_checkable`], when it is wrapped.
#[async_trait]
pub trait Arm: Generic + ModelFramer + InputEnabled + Send + Sync + 'static {
    /// Current pose of the end effector relative to the arm's base.
    async fn end_position(&self, extra: Extra) -> Result<Pose, MotusError>;

    /// Move the end effector to `pose`, planning around `world_state`.
    ///
    /// Returns [`MotusError::Cancelled`] if `cancel` fires between waypoints.
    async fn move_to_position(
        &self,
        pose: Pose,
        world_state: Option<WorldState>,
        extra: Extra,
        cancel: &CancellationToken,
    ) -> Result<(), MotusError>;

    async fn move_to_joint_positions(&self, positions: JointPositions, extra: Extra) -> Result<(), MotusError>;

    async fn joint_positions(&self, extra: Extra) -> Result<JointPositions, MotusError>;

    async fn stop(&self, extra: Extra) -> Result<(), MotusError>;

    /// Release device resources.
    async fn close(&self) -> Result<(), MotusError> {
        Ok(())
    }

    /// How a changed config should be absorbed.
    async fn update_action(&self, _config: &ComponentConfig) -> UpdateAction {
        UpdateAction::Reconfigure
    }

    /// This arm as a [`MovingCheckable`], if it supports it.
    fn moving_checkable(self: Arc<Self>) -> Option<Arc<dyn MovingCheckable>> {
        None
    }

    /// Set only by [`ReconfigurableArm`], so wrapping a handle is idempotent.
    fn as_reconfigurable(self: Arc<Self>) -> Option<Arc<ReconfigurableArm>> {
        None
    }
}

/// Resolve the arm called `name` from a dependency set.
///
/// # Errors
///
/// [`MotusError::NotFound`] if absent, [`MotusError::TypeMismatch`] if the
/// dependency is not an arm.
pub fn from_dependencies(deps: &Dependencies, name: &str) -> Result<Arc<dyn Arm>, MotusError> {
    resolve::<dyn Arm>(deps, &named(name))
}

/// Erase an arm for storage in a dependency set or registry.
pub fn into_resource(arm: Arc<dyn Arm>) -> Resource {
    Resource::new(arm)
}

// ────────────────────────────────────────────────────────────────────────────
// Status
// ────────────────────────────────────────────────────────────────────────────

/// Snapshot reported by the arm status producer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArmStatus {
    pub end_position: Pose,
    pub joint_positions: JointPositions,
    pub is_moving: bool,
}

/// Collect the status of an arm resource.
///
/// # Errors
///
/// - [`MotusError::UnimplementedInterface`] – `resource` is not an arm.
/// - [`MotusError::UnimplementedCapability`] – the arm cannot report motion.
/// - Any error from the underlying queries.
pub async fn create_status(resource: &Resource) -> Result<ArmStatus, MotusError> {
    let arm = resource
        .downcast::<dyn Arm>()
        .ok_or_else(|| MotusError::UnimplementedInterface {
            expected: "Arm".to_string(),
            actual: resource.type_name().to_string(),
        })?;
    let moving = Arc::clone(&arm)
        .moving_checkable()
        .ok_or_else(|| MotusError::UnimplementedCapability("IsMoving".to_string()))?;

    Ok(ArmStatus {
        end_position: arm.end_position(Extra::new()).await?,
        joint_positions: arm.joint_positions(Extra::new()).await?,
        is_moving: moving.is_moving().await?,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Pose comparison
// ────────────────────────────────────────────────────────────────────────────

/// Euclidean distance between the two positions, in millimetres.
pub fn position_grid_diff(a: &Pose, b: &Pose) -> f64 {
    a.point.sub(b.point).norm()
}

/// Angle of the rotation taking one orientation to the other, in radians.
pub fn position_rotation_diff(a: &Pose, b: &Pose) -> f64 {
    a.orientation.angle_to(b.orientation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeArm;
    use motus_types::{Quaternion, Vec3};

    #[test]
    fn arm_names_use_arm_subtype() {
        assert_eq!(named("arm1").to_string(), "rdk:component:arm/arm1");
        assert_eq!(subtype().name(), "arm");
    }

    #[test]
    fn from_dependencies_resolves_arm() {
        let mut deps = Dependencies::new();
        let arm: Arc<dyn Arm> = Arc::new(FakeArm::new("arm1"));
        deps.insert(named("arm1"), into_resource(arm));
        assert!(from_dependencies(&deps, "arm1").is_ok());
    }

    #[test]
    fn from_dependencies_missing_is_not_found() {
        let err = from_dependencies(&Dependencies::new(), "arm1").err().unwrap();
        assert_eq!(err, MotusError::NotFound("rdk:component:arm/arm1".into()));
    }

    #[test]
    fn from_dependencies_wrong_type_is_type_mismatch() {
        let mut deps = Dependencies::new();
        deps.insert(named("arm1"), Resource::new(Arc::new("not an arm".to_string())));
        let err = from_dependencies(&deps, "arm1").err().unwrap();
        assert!(matches!(err, MotusError::TypeMismatch { ref name, .. } if name == "rdk:component:arm/arm1"));
    }

    #[tokio::test]
    async fn status_of_moving_checkable_arm() {
        let arm: Arc<dyn Arm> = Arc::new(FakeArm::new("arm1"));
        let status = create_status(&into_resource(arm)).await.unwrap();
        assert!(!status.is_moving);
        assert_eq!(status.joint_positions.values.len(), 3);
    }

    #[tokio::test]
    async fn status_requires_moving_checkable() {
        let arm: Arc<dyn Arm> = Arc::new(FakeArm::new("arm1").without_moving_check());
        let err = create_status(&into_resource(arm)).await.unwrap_err();
        assert!(matches!(err, MotusError::UnimplementedCapability(_)));
    }

    #[tokio::test]
    async fn status_of_non_arm_is_unimplemented_interface() {
        let err = create_status(&Resource::new(Arc::new(1_u32))).await.unwrap_err();
        assert!(matches!(err, MotusError::UnimplementedInterface { .. }));
    }

    #[test]
    fn pose_diffs() {
        let a = Pose::identity();
        let b = Pose::new(
            Vec3::new(0.0, 3.0, 4.0),
            Quaternion::from_axis_angle(Vec3::new(1.0, 0.0, 0.0), 0.25),
        );
        assert!((position_grid_diff(&a, &b) - 5.0).abs() < 1e-9);
        assert!((position_rotation_diff(&a, &b) - 0.25).abs() < 1e-9);
        assert_eq!(position_grid_diff(&b, &b), 0.0);
    }
}
