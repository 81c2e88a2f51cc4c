//! Planning and moving an arm to a pose.
//!
//! [`plan`] chains the frame-system source, the frame builder and the planner;
//! [`move_arm`] then drives the arm through the result.  Drivers without their
//! own motion control call [`move_arm`] from [`Arm::move_to_position`].

use std::sync::Arc;

use motus_kinematics::{build, FrameSystemSource};
use motus_motion::{go_to_waypoints, invoke, MotionProfile, PlanRequest, Planner, PlannerOptions};
use motus_types::{Input, MotusError, Pose, PoseInFrame, WorldState};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::arm::Arm;

/// What an arm needs from the rest of the robot to plan a move.
#[derive(Clone)]
pub struct MotionServices {
    pub frames: Arc<dyn FrameSystemSource>,
    pub planner: Arc<dyn Planner>,
}

impl MotionServices {
    pub fn new(frames: Arc<dyn FrameSystemSource>, planner: Arc<dyn Planner>) -> Self {
        Self { frames, planner }
    }
}

/// Arms move in straight lines unless asked otherwise.
pub fn default_planner_options() -> PlannerOptions {
    PlannerOptions::with_profile(MotionProfile::Linear)
}

/// Plan a joint trajectory taking `arm` to `dst`.
///
/// `dst` is expressed in the arm's origin frame when the arm is part of the
/// robot-wide tree, and in `world` when a throwaway tree is used.
pub async fn plan<A: Arm + ?Sized>(
    arm: &A,
    services: &MotionServices,
    dst: Pose,
    world_state: Option<&WorldState>,
    cancel: &CancellationToken,
) -> Result<Vec<Vec<Input>>, MotusError> {
    let model = arm.model_frame().await;
    let transforms = world_state.map(|ws| ws.transforms.as_slice()).unwrap_or_default();
    let base = match services.frames.frame_system(transforms) {
        Ok(base) => base,
        Err(e) => {
            // Outside the robot tree any world state is a planning failure,
            // which the builder reports.
            let bare = services.frames.frame_system(&[])?;
            if bare.contains(model.name()) {
                return Err(e);
            }
            bare
        }
    };
    let frames = build(&base, &model, world_state, cancel)?;
    let start = arm.current_inputs().await?;

    let request = PlanRequest::new(
        PoseInFrame::new(frames.reference_frame, dst),
        model,
        frames.frame_system,
    )
    .with_start(start)
    .with_world_state(world_state.cloned())
    .with_options(default_planner_options());
    invoke(services.planner.as_ref(), request, cancel).await
}

/// [`plan`], then execute the trajectory.
pub async fn move_arm<A: Arm + ?Sized>(
    arm: &A,
    services: &MotionServices,
    dst: Pose,
    world_state: Option<&WorldState>,
    cancel: &CancellationToken,
) -> Result<(), MotusError> {
    let trajectory = plan(arm, services, dst, world_state, cancel).await?;
    info!(waypoints = trajectory.len(), "executing arm trajectory");
    go_to_waypoints(arm, &trajectory, cancel).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeArm;
    use async_trait::async_trait;
    use motus_kinematics::{FrameSystem, FrameSystemHandle, InputEnabled, StaticFrame, WORLD};
    use motus_motion::PlanningResult;
    use motus_types::{Extra, GeometriesInFrame, LinkInFrame};
    use std::sync::Mutex;

    /// Linear interpolation in joint space from the seed to a fixed goal.
    struct Interpolate {
        goal: Vec<f64>,
        steps: usize,
        seen: Mutex<Vec<PlanRequest>>,
    }

    impl Interpolate {
        fn new(goal: Vec<f64>, steps: usize) -> Self {
            Self {
                goal,
                steps,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Planner for Interpolate {
        async fn plan(&self, request: &PlanRequest, _cancel: &CancellationToken) -> Result<PlanningResult, MotusError> {
            self.seen.lock().unwrap().push(request.clone());
            let name = request.actuator.name().to_string();
            let start = Input::to_floats(&request.seed[&name]);
            Ok((1..=self.steps)
                .map(|i| {
                    let t = i as f64 / self.steps as f64;
                    let inputs: Vec<Input> = start
                        .iter()
                        .zip(&self.goal)
                        .map(|(s, g)| Input::new(s + (g - s) * t))
                        .collect();
                    [(name.clone(), inputs), ("camera".to_string(), vec![])].into_iter().collect()
                })
                .collect())
        }
    }

    fn services(planner: Arc<Interpolate>, fs: FrameSystem) -> MotionServices {
        MotionServices::new(Arc::new(FrameSystemHandle::new(fs)), planner)
    }

    #[tokio::test]
    async fn move_arm_reaches_planned_goal_through_ephemeral_tree() {
        let arm = FakeArm::new("arm1");
        let planner = Arc::new(Interpolate::new(vec![0.5, -0.5, 0.25], 4));
        let svc = services(planner.clone(), FrameSystem::new("robot"));

        move_arm(&arm, &svc, Pose::from_point(100.0, 0.0, 0.0), None, &CancellationToken::new())
            .await
            .unwrap();

        let reached = Input::to_floats(&arm.current_inputs().await.unwrap());
        assert_eq!(reached, vec![0.5, -0.5, 0.25]);
        assert_eq!(arm.move_count(), 4);

        let seen = planner.seen.lock().unwrap();
        assert_eq!(seen[0].goal.frame, WORLD);
        assert_eq!(seen[0].options.motion_profile, MotionProfile::Linear);
        assert_eq!(seen[0].frame_system.frame_names(), vec![WORLD, "arm1"]);
    }

    #[tokio::test]
    async fn plan_uses_origin_frame_of_robot_tree() {
        let arm = FakeArm::new("arm1");
        let mut fs = FrameSystem::new("robot");
        fs.add_frame(
            Arc::new(StaticFrame::new("arm1_origin", Pose::from_point(0.0, 0.0, 300.0))),
            WORLD,
        )
        .unwrap();
        fs.add_frame(arm.model(), "arm1_origin").unwrap();
        let planner = Arc::new(Interpolate::new(vec![0.0, 0.0, 0.0], 1));
        let svc = services(planner.clone(), fs);

        let ws = WorldState {
            obstacles: vec![GeometriesInFrame {
                reference_frame: WORLD.into(),
                geometries: vec![],
            }],
            ..Default::default()
        };
        let trajectory = plan(&arm, &svc, Pose::identity(), Some(&ws), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(trajectory.len(), 1);
        assert_eq!(planner.seen.lock().unwrap()[0].goal.frame, "arm1_origin");
    }

    #[tokio::test]
    async fn world_state_without_arm_in_tree_is_planning_error() {
        let arm = FakeArm::new("arm1");
        let planner = Arc::new(Interpolate::new(vec![0.0, 0.0, 0.0], 1));
        let svc = services(planner.clone(), FrameSystem::new("robot"));
        let ws = WorldState {
            interaction_spaces: vec![GeometriesInFrame {
                reference_frame: WORLD.into(),
                geometries: vec![],
            }],
            ..Default::default()
        };
        let err = move_arm(&arm, &svc, Pose::identity(), Some(&ws), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, MotusError::Planning(_)));
        assert!(planner.seen.lock().unwrap().is_empty());
        assert_eq!(arm.move_count(), 0);
    }

    #[tokio::test]
    async fn bad_transform_for_arm_outside_tree_is_planning_error() {
        let arm = FakeArm::new("arm1");
        let planner = Arc::new(Interpolate::new(vec![0.0, 0.0, 0.0], 1));
        let svc = services(planner.clone(), FrameSystem::new("robot"));
        let ws = WorldState {
            transforms: vec![LinkInFrame {
                name: "camera".into(),
                parent: "gantry".into(),
                pose: Pose::identity(),
            }],
            ..Default::default()
        };
        let err = plan(&arm, &svc, Pose::identity(), Some(&ws), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, MotusError::Planning(_)));
        assert!(planner.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn bad_transform_for_arm_in_tree_is_frame_error() {
        let arm = FakeArm::new("arm1");
        let mut fs = FrameSystem::new("robot");
        fs.add_frame(arm.model(), WORLD).unwrap();
        let svc = services(Arc::new(Interpolate::new(vec![0.0, 0.0, 0.0], 1)), fs);
        let ws = WorldState {
            transforms: vec![LinkInFrame {
                name: "camera".into(),
                parent: "gantry".into(),
                pose: Pose::identity(),
            }],
            ..Default::default()
        };
        let err = plan(&arm, &svc, Pose::identity(), Some(&ws), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, MotusError::Frame(_)));
    }

    #[tokio::test]
    async fn cancelled_move_commands_nothing() {
        let arm = FakeArm::new("arm1");
        let planner = Arc::new(Interpolate::new(vec![1.0, 1.0, 1.0], 3));
        let svc = services(planner, FrameSystem::new("robot"));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = move_arm(&arm, &svc, Pose::identity(), None, &cancel).await.unwrap_err();
        assert_eq!(err, MotusError::Cancelled);
        assert_eq!(arm.joint_positions(Extra::new()).await.unwrap().values, vec![0.0, 0.0, 0.0]);
    }
}
