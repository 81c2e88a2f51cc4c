//! Planner inputs, the [`Planner`] seam, and trajectory extraction.
//!
//! A planner works over the whole frame tree and answers with one
//! [`Waypoint`] per step, each naming every frame it moved.  [`invoke`] checks
//! the request against the tree, hands it over, and keeps only the inputs of
//! the actuator that was asked to move.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use motus_kinematics::{FrameSystem, Model};
use motus_types::{Extra, Input, MotusError, PoseInFrame, WorldState};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Frame name → joint inputs, for one step of a plan.
pub type Waypoint = HashMap<String, Vec<Input>>;

/// Ordered steps; the first element is executed first.
pub type PlanningResult = Vec<Waypoint>;

/// How the end effector may travel between start and goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MotionProfile {
    /// Straight-line motion of the end effector.
    #[default]
    Linear,
    /// Any collision-free path.
    Free,
}

/// Planner configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct PlannerOptions {
    #[serde(default)]
    pub motion_profile: MotionProfile,
    /// Planner-specific settings passed through untouched.
    #[serde(default)]
    pub extra: Extra,
}

impl PlannerOptions {
    pub fn with_profile(motion_profile: MotionProfile) -> Self {
        Self {
            motion_profile,
            extra: Extra::new(),
        }
    }
}

/// Everything a planner is given for one request.
#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub goal: PoseInFrame,
    /// The frame to be moved.
    pub actuator: Arc<dyn Model>,
    pub frame_system: Arc<FrameSystem>,
    /// Current inputs of every moving frame, used as the search seed.
    pub seed: Waypoint,
    pub world_state: Option<WorldState>,
    pub options: PlannerOptions,
}

impl PlanRequest {
    pub fn new(goal: PoseInFrame, actuator: Arc<dyn Model>, frame_system: Arc<FrameSystem>) -> Self {
        Self {
            goal,
            actuator,
            frame_system,
            seed: Waypoint::new(),
            world_state: None,
            options: PlannerOptions::default(),
        }
    }

    /// Seed the search with the actuator's current inputs.
    pub fn with_start(mut self, start: Vec<Input>) -> Self {
        self.seed.insert(self.actuator.name().to_string(), start);
        self
    }

    pub fn with_world_state(mut self, world_state: Option<WorldState>) -> Self {
        self.world_state = world_state;
        self
    }

    pub fn with_options(mut self, options: PlannerOptions) -> Self {
        self.options = options;
        self
    }
}

/// A motion planner.
///
/// Implementations may observe `cancel` during a long search and return
/// [`MotusError::Cancelled`]; they report an infeasible request as
/// [`MotusError::Planning`].
#[async_trait]
pub trait Planner: Send + Sync {
    async fn plan(&self, request: &PlanRequest, cancel: &CancellationToken) -> Result<PlanningResult, MotusError>;
}

/// Run `planner` on `request` and return the actuator's joint trajectory.
///
/// # Errors
///
/// - [`MotusError::Cancelled`] – `cancel` fired before the planner ran.
/// - [`MotusError::Planning`] – the goal or actuator frame is not in the
///   tree, or a planned step omits the actuator.
/// - Any error returned by the planner, unchanged.
pub async fn invoke(
    planner: &dyn Planner,
    request: PlanRequest,
    cancel: &CancellationToken,
) -> Result<Vec<Vec<Input>>, MotusError> {
    if cancel.is_cancelled() {
        return Err(MotusError::Cancelled);
    }
    let actuator = request.actuator.name().to_string();
    for frame in [request.goal.frame.as_str(), actuator.as_str()] {
        if !request.frame_system.contains(frame) {
            return Err(MotusError::Planning(format!(
                "frame '{frame}' is not in frame system '{}'",
                request.frame_system.name()
            )));
        }
    }

    debug!(
        actuator = %actuator,
        goal_frame = %request.goal.frame,
        profile = ?request.options.motion_profile,
        "invoking planner"
    );
    let steps = planner.plan(&request, cancel).await?;
    let trajectory = actuator_trajectory(steps, &actuator)?;
    info!(actuator = %actuator, waypoints = trajectory.len(), "plan ready");
    Ok(trajectory)
}

/// Extract the inputs of `actuator` from every step, in order.
///
/// An empty plan yields an empty trajectory.
pub fn actuator_trajectory(steps: PlanningResult, actuator: &str) -> Result<Vec<Vec<Input>>, MotusError> {
    steps
        .into_iter()
        .enumerate()
        .map(|(i, mut step)| {
            step.remove(actuator)
                .ok_or_else(|| MotusError::Planning(format!("step {i} of the plan has no inputs for '{actuator}'")))
        })
        .collect()
}
