//! [`FakeArm`] – an in-process arm for CI and tests.
//!
//! The fake keeps its joint inputs in memory and derives its end position
//! from a serial kinematic model, so the full planning pipeline can run
//! against it without hardware.  Builder methods inject the failure modes
//! and timings tests need.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use motus_kinematics::{
    within_limits, InputEnabled, Limit, Model, ModelFramer, RevoluteJoint, SerialModel, StaticFrame,
};
use motus_resource::{Constructor, Dependencies, Generic, MovingCheckable, Registry};
use motus_types::{
    ComponentConfig, Extra, Input, JointPositions, MotusError, Pose, UpdateAction, Vec3, WorldState,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::arm::{into_resource, subtype, Arm};
use crate::motion::{move_arm, MotionServices};

/// Model name the fake is registered under.
pub const MODEL: &str = "fake";

/// Attributes of a `fake` arm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FakeArmConfig {
    /// Number of revolute joints.
    #[serde(default = "default_joints")]
    pub joints: usize,

    /// Length of the link after each joint, in millimetres.
    #[serde(default = "default_link_length")]
    pub link_length_mm: f64,
}

fn default_joints() -> usize {
    3
}

fn default_link_length() -> f64 {
    100.0
}

impl Default for FakeArmConfig {
    fn default() -> Self {
        Self {
            joints: default_joints(),
            link_length_mm: default_link_length(),
        }
    }
}

/// Alternating yaw/pitch joints, each followed by a link along x.
fn serial_model(name: &str, config: &FakeArmConfig) -> Arc<dyn Model> {
    let limit = Limit::new(-std::f64::consts::PI, std::f64::consts::PI);
    let mut links: Vec<Arc<dyn Model>> = Vec::with_capacity(config.joints * 2);
    for j in 0..config.joints {
        let axis = if j % 2 == 0 {
            Vec3::new(0.0, 0.0, 1.0)
        } else {
            Vec3::new(0.0, 1.0, 0.0)
        };
        links.push(Arc::new(RevoluteJoint::new(format!("{name}:joint{j}"), axis, limit)));
        links.push(Arc::new(StaticFrame::new(
            format!("{name}:link{j}"),
            Pose::from_point(config.link_length_mm, 0.0, 0.0),
        )));
    }
    Arc::new(SerialModel::new(name, links))
}

/// Sets the moving flag for its lifetime, including when the move is dropped
/// mid-flight.
struct MovingFlag<'a>(&'a AtomicBool);

impl<'a> MovingFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for MovingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Simulated arm.
pub struct FakeArm {
    name: String,
    config: FakeArmConfig,
    model: Arc<dyn Model>,
    inputs: Mutex<Vec<Input>>,
    moving: AtomicBool,
    closed: AtomicBool,
    close_count: AtomicUsize,
    move_count: AtomicUsize,
    moves_after_close: AtomicUsize,
    moving_check: bool,
    move_delay: Option<Duration>,
    close_error: Option<String>,
    read_error: Option<String>,
    update_action: UpdateAction,
    motion: Option<MotionServices>,
}

impl FakeArm {
    /// A three-joint fake with default link lengths.
    pub fn new(name: impl Into<String>) -> Self {
        Self::from_config(name, FakeArmConfig::default())
    }

    pub fn from_config(name: impl Into<String>, config: FakeArmConfig) -> Self {
        let name = name.into();
        let model = serial_model(&name, &config);
        Self {
            inputs: Mutex::new(vec![Input::default(); config.joints]),
            name,
            config,
            model,
            moving: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            close_count: AtomicUsize::new(0),
            move_count: AtomicUsize::new(0),
            moves_after_close: AtomicUsize::new(0),
            moving_check: true,
            move_delay: None,
            close_error: None,
            read_error: None,
            update_action: UpdateAction::Reconfigure,
            motion: None,
        }
    }

    /// Plan pose moves through `motion`.  Without it, pose moves are
    /// unimplemented.
    pub fn with_motion(mut self, motion: Option<MotionServices>) -> Self {
        self.motion = motion;
        self
    }

    /// Do not advertise the moving-checkable extension.
    pub fn without_moving_check(mut self) -> Self {
        self.moving_check = false;
        self
    }

    /// Hold each joint move for `delay`.
    pub fn with_move_delay(mut self, delay: Duration) -> Self {
        self.move_delay = Some(delay);
        self
    }

    /// Fail every `close` with a device error carrying `details`.
    pub fn with_close_error(mut self, details: impl Into<String>) -> Self {
        self.close_error = Some(details.into());
        self
    }

    /// Fail `end_position` and `joint_positions` with a device error.
    pub fn with_read_error(mut self, details: impl Into<String>) -> Self {
        self.read_error = Some(details.into());
        self
    }

    fn check_read(&self) -> Result<(), MotusError> {
        match &self.read_error {
            Some(details) => Err(MotusError::device(&self.name, details.clone())),
            None => Ok(()),
        }
    }

    pub fn with_update_action(mut self, action: UpdateAction) -> Self {
        self.update_action = action;
        self
    }

    /// Start at `positions` (degrees) instead of all zeros.
    pub fn with_joint_positions(mut self, positions: &JointPositions) -> Self {
        self.inputs = Mutex::new(positions.to_inputs());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The kinematic model, for placing the arm in a frame system.
    pub fn model(&self) -> Arc<dyn Model> {
        Arc::clone(&self.model)
    }

    pub fn close_count(&self) -> usize {
        self.close_count.load(Ordering::SeqCst)
    }

    /// Joint moves completed so far.
    pub fn move_count(&self) -> usize {
        self.move_count.load(Ordering::SeqCst)
    }

    /// Joint moves started after the arm was closed.
    pub fn moves_after_close(&self) -> usize {
        self.moves_after_close.load(Ordering::SeqCst)
    }

    fn inputs(&self) -> Vec<Input> {
        self.inputs.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl Generic for FakeArm {
    /// Echoes the command back.
    async fn do_command(&self, cmd: Extra) -> Result<Extra, MotusError> {
        Ok(cmd)
    }
}

#[async_trait]
impl ModelFramer for FakeArm {
    async fn model_frame(&self) -> Arc<dyn Model> {
        self.model()
    }
}

#[async_trait]
impl InputEnabled for FakeArm {
    async fn current_inputs(&self) -> Result<Vec<Input>, MotusError> {
        Ok(self.inputs())
    }

    async fn go_to_inputs(&self, goal: &[Input]) -> Result<(), MotusError> {
        if !within_limits(self.model.as_ref(), goal) {
            return Err(MotusError::device(
                &self.name,
                format!("inputs {:?} outside joint limits", Input::to_floats(goal)),
            ));
        }
        if self.closed.load(Ordering::SeqCst) {
            self.moves_after_close.fetch_add(1, Ordering::SeqCst);
        }
        let _moving = MovingFlag::raise(&self.moving);
        if let Some(delay) = self.move_delay {
            tokio::time::sleep(delay).await;
        }
        *self.inputs.lock().unwrap_or_else(PoisonError::into_inner) = goal.to_vec();
        self.move_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl MovingCheckable for FakeArm {
    async fn is_moving(&self) -> Result<bool, MotusError> {
        Ok(self.moving.load(Ordering::SeqCst))
    }
}

#[async_trait]
impl Arm for FakeArm {
    async fn end_position(&self, _extra: Extra) -> Result<Pose, MotusError> {
        self.check_read()?;
        self.model.transform(&self.inputs())
    }

    async fn move_to_position(
        &self,
        pose: Pose,
        world_state: Option<WorldState>,
        _extra: Extra,
        cancel: &CancellationToken,
    ) -> Result<(), MotusError> {
        let motion = self
            .motion
            .as_ref()
            .ok_or_else(|| MotusError::UnimplementedCapability("MoveToPosition".to_string()))?;
        move_arm(self, motion, pose, world_state.as_ref(), cancel).await
    }

    async fn move_to_joint_positions(&self, positions: JointPositions, _extra: Extra) -> Result<(), MotusError> {
        self.go_to_inputs(&positions.to_inputs()).await
    }

    async fn joint_positions(&self, _extra: Extra) -> Result<JointPositions, MotusError> {
        self.check_read()?;
        Ok(JointPositions::from_radians(&self.inputs()))
    }

    async fn stop(&self, _extra: Extra) -> Result<(), MotusError> {
        self.moving.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> Result<(), MotusError> {
        self.close_count.fetch_add(1, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
        debug!(arm = %self.name, "fake arm closed");
        match &self.close_error {
            Some(details) => Err(MotusError::device(&self.name, details.clone())),
            None => Ok(()),
        }
    }

    /// A different joint count changes the model, which needs a new handle.
    async fn update_action(&self, config: &ComponentConfig) -> UpdateAction {
        match config.attributes_as::<FakeArmConfig>() {
            Ok(next) if next.joints != self.config.joints => UpdateAction::Rebuild,
            Ok(_) => self.update_action,
            Err(_) => UpdateAction::Rebuild,
        }
    }

    fn moving_checkable(self: Arc<Self>) -> Option<Arc<dyn MovingCheckable>> {
        if self.moving_check {
            Some(self as Arc<dyn MovingCheckable>)
        } else {
            None
        }
    }
}

/// Constructor for the `fake` model.
pub fn constructor(motion: Option<MotionServices>) -> Constructor {
    Arc::new(move |_deps: &Dependencies, config: &ComponentConfig| {
        let attrs: FakeArmConfig = config.attributes_as()?;
        info!(arm = %config.name, joints = attrs.joints, "constructing fake arm");
        let arm = FakeArm::from_config(config.name.clone(), attrs).with_motion(motion.clone());
        Ok(into_resource(Arc::new(arm)))
    })
}

/// Register the `fake` arm model.
pub fn register(registry: &mut Registry, motion: Option<MotionServices>) -> Result<(), MotusError> {
    registry.register_component(subtype(), MODEL, constructor(motion))
}
