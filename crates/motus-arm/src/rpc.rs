//! Arm server and client adapters.
//!
//! [`ArmServer`] turns an [`RpcRequest`] into a call on a local arm;
//! [`ArmClient`] implements [`Arm`] by sending requests over an [`RpcConn`].
//! Errors are carried as [`MotusError`] values, so a caller holding an
//! `Arc<dyn Arm>` cannot tell a remote arm from a local one by its errors.
//!
//! Cancelling a remote pose move sends a [`CANCEL`] request naming the move's
//! request id.  The server fires that move's own token, so the trajectory
//! stops at the next waypoint boundary exactly as a local call would, and the
//! client returns whatever the server's move finally returned.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use motus_kinematics::{InputEnabled, Model, ModelFramer, StaticFrame};
use motus_resource::{Generic, MovingCheckable, Resource, RpcConn, RpcRequest, RpcService, SubtypeService};
use motus_types::{Extra, Input, JointPositions, MotusError, Pose, WorldState};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::arm::{into_resource, named, subtype, Arm};

pub const END_POSITION: &str = "end_position";
pub const MOVE_TO_POSITION: &str = "move_to_position";
pub const MOVE_TO_JOINT_POSITIONS: &str = "move_to_joint_positions";
pub const JOINT_POSITIONS: &str = "joint_positions";
pub const STOP: &str = "stop";
pub const IS_MOVING: &str = "is_moving";
pub const DO_COMMAND: &str = "do_command";
pub const CANCEL: &str = "cancel";

#[derive(Debug, Default, Serialize, Deserialize)]
struct ExtraRequest {
    #[serde(default)]
    extra: Extra,
}

#[derive(Debug, Serialize, Deserialize)]
struct MoveToPositionRequest {
    pose: Pose,
    #[serde(default)]
    world_state: Option<WorldState>,
    #[serde(default)]
    extra: Extra,
}

#[derive(Debug, Serialize, Deserialize)]
struct MoveToJointPositionsRequest {
    positions: JointPositions,
    #[serde(default)]
    extra: Extra,
}

#[derive(Debug, Serialize, Deserialize)]
struct CancelRequest {
    id: Uuid,
}

fn decode<T: DeserializeOwned>(payload: Value) -> Result<T, MotusError> {
    serde_json::from_value(payload).map_err(|e| MotusError::Rpc(format!("invalid payload: {e}")))
}

fn encode<T: Serialize>(value: &T) -> Result<Value, MotusError> {
    serde_json::to_value(value).map_err(|e| MotusError::Rpc(format!("invalid response: {e}")))
}

// ────────────────────────────────────────────────────────────────────────────
// Server
// ────────────────────────────────────────────────────────────────────────────

type MoveTokens = Mutex<HashMap<Uuid, CancellationToken>>;

/// Drops a move's token from the table when the move ends.
struct InFlight<'a> {
    moves: &'a MoveTokens,
    id: Uuid,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.moves
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

/// Routes inbound arm calls to the named local arm.
pub struct ArmServer {
    service: SubtypeService,
    moves: MoveTokens,
}

impl ArmServer {
    pub fn new(service: SubtypeService) -> Self {
        Self {
            service,
            moves: Mutex::new(HashMap::new()),
        }
    }

    fn track(&self, id: Uuid) -> (CancellationToken, InFlight<'_>) {
        let token = CancellationToken::new();
        self.moves
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, token.clone());
        (token, InFlight { moves: &self.moves, id })
    }

    /// Fire the token of the move started by request `id`.  `false` when no
    /// such move is running.
    fn cancel(&self, id: Uuid) -> bool {
        match self.moves.lock().unwrap_or_else(PoisonError::into_inner).get(&id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    fn arm(&self, name: &str) -> Result<Arc<dyn Arm>, MotusError> {
        let resource = self
            .service
            .resource(name)
            .ok_or_else(|| MotusError::NotFound(named(name).to_string()))?;
        resource.downcast::<dyn Arm>().ok_or_else(|| MotusError::TypeMismatch {
            name: named(name).to_string(),
            expected: "Arm".to_string(),
            actual: resource.type_name().to_string(),
        })
    }
}

/// Registry entry point for the server adapter.
pub fn server(service: SubtypeService) -> Arc<dyn RpcService> {
    Arc::new(ArmServer::new(service))
}

#[async_trait]
impl RpcService for ArmServer {
    async fn handle(&self, request: RpcRequest) -> Result<Value, MotusError> {
        debug!(arm = %request.resource, method = %request.method, id = %request.id, "arm request");
        if request.method == CANCEL {
            let req: CancelRequest = decode(request.payload)?;
            return encode(&self.cancel(req.id));
        }
        let arm = self.arm(&request.resource)?;
        match request.method.as_str() {
            END_POSITION => {
                let req: ExtraRequest = decode(request.payload)?;
                encode(&arm.end_position(req.extra).await?)
            }
            MOVE_TO_POSITION => {
                let req: MoveToPositionRequest = decode(request.payload)?;
                let (cancel, _in_flight) = self.track(request.id);
                arm.move_to_position(req.pose, req.world_state, req.extra, &cancel)
                    .await?;
                Ok(Value::Null)
            }
            MOVE_TO_JOINT_POSITIONS => {
                let req: MoveToJointPositionsRequest = decode(request.payload)?;
                arm.move_to_joint_positions(req.positions, req.extra).await?;
                Ok(Value::Null)
            }
            JOINT_POSITIONS => {
                let req: ExtraRequest = decode(request.payload)?;
                encode(&arm.joint_positions(req.extra).await?)
            }
            STOP => {
                let req: ExtraRequest = decode(request.payload)?;
                arm.stop(req.extra).await?;
                Ok(Value::Null)
            }
            IS_MOVING => {
                let moving = Arc::clone(&arm)
                    .moving_checkable()
                    .ok_or_else(|| MotusError::UnimplementedCapability("IsMoving".to_string()))?;
                encode(&moving.is_moving().await?)
            }
            DO_COMMAND => {
                let cmd: Extra = decode(request.payload)?;
                encode(&arm.do_command(cmd).await?)
            }
            other => Err(MotusError::UnimplementedCapability(other.to_string())),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Client
// ────────────────────────────────────────────────────────────────────────────

/// An [`Arm`] whose calls are served elsewhere.
pub struct ArmClient {
    conn: Arc<dyn RpcConn>,
    name: String,
    model: Arc<dyn Model>,
}

impl ArmClient {
    pub fn new(conn: Arc<dyn RpcConn>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            conn,
            // The remote kinematics are not transferred; plan against a
            // frame with no degrees of freedom.
            model: Arc::new(StaticFrame::new(name.clone(), Pose::identity())),
            name,
        }
    }

    async fn call<Req: Serialize + Sync, Resp: DeserializeOwned>(
        &self,
        method: &str,
        payload: &Req,
    ) -> Result<Resp, MotusError> {
        let request = RpcRequest::new(self.name.clone(), method, encode(payload)?);
        let value = self.conn.call(&subtype(), request).await?;
        decode(value)
    }
}

/// Registry entry point for the client factory.
pub fn client(conn: Arc<dyn RpcConn>, name: &str) -> Resource {
    into_resource(Arc::new(ArmClient::new(conn, name)))
}

#[async_trait]
impl Generic for ArmClient {
    async fn do_command(&self, cmd: Extra) -> Result<Extra, MotusError> {
        self.call(DO_COMMAND, &cmd).await
    }
}

#[async_trait]
impl ModelFramer for ArmClient {
    async fn model_frame(&self) -> Arc<dyn Model> {
        Arc::clone(&self.model)
    }
}

#[async_trait]
impl InputEnabled for ArmClient {
    async fn current_inputs(&self) -> Result<Vec<Input>, MotusError> {
        Ok(self.joint_positions(Extra::new()).await?.to_inputs())
    }

    async fn go_to_inputs(&self, goal: &[Input]) -> Result<(), MotusError> {
        self.move_to_joint_positions(JointPositions::from_radians(goal), Extra::new())
            .await
    }
}

#[async_trait]
impl MovingCheckable for ArmClient {
    async fn is_moving(&self) -> Result<bool, MotusError> {
        self.call(IS_MOVING, &Value::Null).await
    }
}

#[async_trait]
impl Arm for ArmClient {
    async fn end_position(&self, extra: Extra) -> Result<Pose, MotusError> {
        self.call(END_POSITION, &ExtraRequest { extra }).await
    }

    async fn move_to_position(
        &self,
        pose: Pose,
        world_state: Option<WorldState>,
        extra: Extra,
        cancel: &CancellationToken,
    ) -> Result<(), MotusError> {
        if cancel.is_cancelled() {
            return Err(MotusError::Cancelled);
        }
        let req = MoveToPositionRequest {
            pose,
            world_state,
            extra,
        };
        let request = RpcRequest::new(self.name.clone(), MOVE_TO_POSITION, encode(&req)?);
        let id = request.id;
        let subtype = subtype();
        let mut call = self.conn.call(&subtype, request);
        tokio::select! {
            biased;
            res = &mut call => return res.map(|_| ()),
            _ = cancel.cancelled() => {}
        }

        debug!(arm = %self.name, %id, "cancelling remote move");
        if let Err(e) = self.call::<_, bool>(CANCEL, &CancelRequest { id }).await {
            warn!(arm = %self.name, %id, error = %e, "failed to cancel remote move");
        }
        call.await.map(|_| ())
    }

    async fn move_to_joint_positions(&self, positions: JointPositions, extra: Extra) -> Result<(), MotusError> {
        self.call::<_, Value>(MOVE_TO_JOINT_POSITIONS, &MoveToJointPositionsRequest { positions, extra })
            .await
            .map(|_| ())
    }

    async fn joint_positions(&self, extra: Extra) -> Result<JointPositions, MotusError> {
        self.call(JOINT_POSITIONS, &ExtraRequest { extra }).await
    }

    async fn stop(&self, extra: Extra) -> Result<(), MotusError> {
        self.call::<_, Value>(STOP, &ExtraRequest { extra }).await.map(|_| ())
    }

    fn moving_checkable(self: Arc<Self>) -> Option<Arc<dyn MovingCheckable>> {
        Some(self as Arc<dyn MovingCheckable>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arm::{position_grid_diff, position_rotation_diff};
    use crate::fake::FakeArm;
    use crate::motion::MotionServices;
    use crate::reconfigurable::wrap_arm;
    use motus_kinematics::{FrameSystem, FrameSystemHandle};
    use motus_motion::{PlanRequest, Planner, PlanningResult};
    use motus_resource::{LoopbackConn, Reconfigurable};
    use std::time::Duration;

    /// Three evenly spaced joint steps, whatever the goal.
    struct ThreeSteps;

    #[async_trait]
    impl Planner for ThreeSteps {
        async fn plan(&self, request: &PlanRequest, _cancel: &CancellationToken) -> Result<PlanningResult, MotusError> {
            let name = request.actuator.name().to_string();
            Ok((1..=3)
                .map(|i| {
                    let v = 0.1 * i as f64;
                    [(name.clone(), Input::from_floats(&[v, v, v]))].into_iter().collect()
                })
                .collect())
        }
    }

    fn motion() -> MotionServices {
        MotionServices::new(
            Arc::new(FrameSystemHandle::new(FrameSystem::new("robot"))),
            Arc::new(ThreeSteps),
        )
    }

    fn setup(arm: FakeArm) -> (Arc<FakeArm>, Arc<dyn Arm>) {
        let arm = Arc::new(arm);
        let service = SubtypeService::new();
        service.add(arm.name().to_string(), Reconfigurable::resource(wrap_arm(arm.clone())));
        let mut conn = LoopbackConn::new();
        conn.mount(subtype(), server(service));
        let remote = client(Arc::new(conn), arm.name())
            .downcast::<dyn Arm>()
            .unwrap();
        (arm, remote)
    }

    #[tokio::test]
    async fn remote_calls_reach_local_arm() {
        let (local, remote) = setup(FakeArm::new("arm1"));
        remote
            .move_to_joint_positions(JointPositions::new(vec![90.0, 0.0, 0.0]), Extra::new())
            .await
            .unwrap();

        let want = local.end_position(Extra::new()).await.unwrap();
        let got = remote.end_position(Extra::new()).await.unwrap();
        assert!(position_grid_diff(&want, &got) < 1e-9);
        assert!(position_rotation_diff(&want, &got) < 1e-6);

        let remote_jp = remote.joint_positions(Extra::new()).await.unwrap();
        let local_jp = local.joint_positions(Extra::new()).await.unwrap();
        for (r, l) in remote_jp.values.iter().zip(&local_jp.values) {
            assert!((r - l).abs() < 1e-9);
        }
        assert!(!remote.clone().moving_checkable().unwrap().is_moving().await.unwrap());
        remote.stop(Extra::new()).await.unwrap();
    }

    #[tokio::test]
    async fn errors_keep_their_variant_across_the_wire() {
        let (local, remote) = setup(FakeArm::new("arm1"));

        let local_err = local
            .move_to_joint_positions(JointPositions::new(vec![270.0, 0.0, 0.0]), Extra::new())
            .await
            .unwrap_err();
        let remote_err = remote
            .move_to_joint_positions(JointPositions::new(vec![270.0, 0.0, 0.0]), Extra::new())
            .await
            .unwrap_err();
        assert_eq!(local_err, remote_err);

        let unimplemented = remote
            .move_to_position(Pose::identity(), None, Extra::new(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(unimplemented, MotusError::UnimplementedCapability("MoveToPosition".into()));
    }

    #[tokio::test]
    async fn unknown_arm_is_not_found() {
        let service = SubtypeService::new();
        let mut conn = LoopbackConn::new();
        conn.mount(subtype(), server(service));
        let ghost = ArmClient::new(Arc::new(conn), "ghost");
        let err = ghost.end_position(Extra::new()).await.unwrap_err();
        assert_eq!(err, MotusError::NotFound("rdk:component:arm/ghost".into()));
    }

    #[tokio::test]
    async fn unknown_method_is_unimplemented() {
        let service = SubtypeService::new();
        service.add("arm1", into_resource(Arc::new(FakeArm::new("arm1"))));
        let srv = ArmServer::new(service);
        let err = srv
            .handle(RpcRequest::new("arm1", "grab", Value::Null))
            .await
            .unwrap_err();
        assert_eq!(err, MotusError::UnimplementedCapability("grab".into()));
    }

    #[tokio::test]
    async fn do_command_round_trips() {
        let (_local, remote) = setup(FakeArm::new("arm1"));
        let mut cmd = Extra::new();
        cmd.insert("home".into(), Value::Bool(true));
        assert_eq!(remote.do_command(cmd.clone()).await.unwrap(), cmd);
    }

    #[tokio::test]
    async fn cancelled_remote_move_returns_cancelled() {
        let (_local, remote) = setup(FakeArm::new("arm1"));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = remote
            .move_to_position(Pose::identity(), None, Extra::new(), &cancel)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn cancelling_remote_move_stops_at_waypoint_boundary() {
        let arm = FakeArm::new("arm1")
            .with_move_delay(Duration::from_millis(100))
            .with_motion(Some(motion()));
        let (local, remote) = setup(arm);
        let cancel = CancellationToken::new();
        let mover = {
            let remote = Arc::clone(&remote);
            let cancel = cancel.clone();
            tokio::spawn(async move {
                remote
                    .move_to_position(Pose::identity(), None, Extra::new(), &cancel)
                    .await
            })
        };

        while local.move_count() < 1 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        cancel.cancel();

        assert_eq!(mover.await.unwrap(), Err(MotusError::Cancelled));
        assert_eq!(local.move_count(), 2);
        assert!(!local.is_moving().await.unwrap());
        assert!(!remote.clone().moving_checkable().unwrap().is_moving().await.unwrap());
    }

    #[tokio::test]
    async fn remote_move_without_cancel_completes() {
        let (local, remote) = setup(FakeArm::new("arm1").with_motion(Some(motion())));
        remote
            .move_to_position(Pose::identity(), None, Extra::new(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(local.move_count(), 3);
    }

    #[tokio::test]
    async fn cancel_of_unknown_move_reports_nothing_running() {
        let srv = ArmServer::new(SubtypeService::new());
        let payload = encode(&CancelRequest { id: Uuid::new_v4() }).unwrap();
        let found = srv.handle(RpcRequest::new("arm1", CANCEL, payload)).await.unwrap();
        assert_eq!(found, Value::Bool(false));
        assert!(srv.moves.lock().unwrap().is_empty());
    }
}
