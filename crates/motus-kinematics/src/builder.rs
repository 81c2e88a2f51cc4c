//! Selection of the frame tree a motion request is planned against.
//!
//! The robot-wide tree is used whenever it already contains the actuator.
//! Otherwise a throwaway tree holding only [`WORLD`] and the actuator is built,
//! which is only sound when the request carries no world state: obstacles,
//! interaction spaces and transform overrides are all expressed relative to
//! frames the throwaway tree does not have.

use std::sync::Arc;

use motus_types::{MotusError, WorldState};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::frame_system::{FrameSystem, WORLD};
use crate::model::Model;

/// Suffix of the frame an actuator is mounted on in the robot-wide tree.
pub const ORIGIN_SUFFIX: &str = "_origin";

/// A tree plus the frame goals are expressed in for planning.
#[derive(Debug, Clone)]
pub struct PlanningFrames {
    pub frame_system: Arc<FrameSystem>,
    pub reference_frame: String,
}

/// Pick or build the tree for moving `actuator`.
///
/// - actuator present in `base`: `base` itself is returned (the same [`Arc`]),
///   and the reference frame is `<name>_origin` when the tree has one, else the
///   actuator's own frame;
/// - actuator absent, world state empty: a new two-frame tree
///   `world -> <actuator>` with `world` as the reference frame;
/// - actuator absent, any world state present: [`MotusError::Planning`].
///
/// # Errors
///
/// [`MotusError::Cancelled`] when `cancel` has already fired.
pub fn build(
    base: &Arc<FrameSystem>,
    actuator: &Arc<dyn Model>,
    world_state: Option<&WorldState>,
    cancel: &CancellationToken,
) -> Result<PlanningFrames, MotusError> {
    if cancel.is_cancelled() {
        return Err(MotusError::Cancelled);
    }

    let name = actuator.name();
    if base.contains(name) {
        let origin = format!("{name}{ORIGIN_SUFFIX}");
        let reference_frame = if base.contains(&origin) {
            origin
        } else {
            name.to_string()
        };
        debug!(actuator = %name, reference = %reference_frame, "planning in robot frame system");
        return Ok(PlanningFrames {
            frame_system: Arc::clone(base),
            reference_frame,
        });
    }

    let world_state_present = world_state.is_some_and(|ws| {
        !ws.obstacles.is_empty() || !ws.interaction_spaces.is_empty() || !ws.transforms.is_empty()
    });
    if world_state_present {
        return Err(MotusError::Planning(format!(
            "'{name}' must be in the frame system to plan with a world state"
        )));
    }

    let mut ephemeral = FrameSystem::new(format!("{name}-temp"));
    ephemeral
        .add_frame(Arc::clone(actuator), WORLD)
        .map_err(|e| MotusError::Planning(e.to_string()))?;
    debug!(actuator = %name, "planning in ephemeral frame system");
    Ok(PlanningFrames {
        frame_system: Arc::new(ephemeral),
        reference_frame: WORLD.to_string(),
    })
}
