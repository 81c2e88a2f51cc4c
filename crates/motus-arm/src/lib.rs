//! `motus-arm` – the arm subtype.
//!
//! Defines the [`Arm`] capability interface, the [`ReconfigurableArm`] handle
//! that keeps references stable across hot swaps, and everything the resource
//! runtime needs to host arms: status, RPC adapters, data collectors, and a
//! simulated `fake` model.
//!
//! # Modules
//!
//! - [`arm`] – the [`Arm`] trait, dependency helpers, [`create_status`] and
//!   pose comparison.
//! - [`reconfigurable`] – [`ReconfigurableArm`], [`wrap`] and [`wrap_arm`].
//! - [`motion`] – [`plan`] and [`move_arm`]: pose goals through the frame
//!   builder, planner and waypoint executor.
//! - [`rpc`] – [`ArmServer`] and [`ArmClient`].
//! - [`collectors`] – `end_position` and `joint_positions` capture.
//! - [`fake`] – [`FakeArm`], an in-process arm for CI and tests.
//!
//! # Bootstrap
//!
//! ```rust
//! use motus_resource::Registry;
//!
//! let mut registry = Registry::new();
//! motus_arm::register(&mut registry).unwrap();
//! motus_arm::fake::register(&mut registry, None).unwrap();
//! assert!(registry.lookup_subtype(&motus_arm::subtype()).is_ok());
//! ```

use std::collections::HashMap;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use motus_resource::{Registry, Resource, SubtypeRegistration};
use motus_types::MotusError;
use serde_json::Value;

pub mod arm;
pub mod collectors;
pub mod fake;
pub mod motion;
pub mod reconfigurable;
pub mod rpc;

pub use arm::{
    create_status, from_dependencies, into_resource, named, position_grid_diff, position_rotation_diff,
    subtype, Arm, ArmStatus, SUBTYPE_NAME,
};
pub use fake::{FakeArm, FakeArmConfig};
pub use motion::{default_planner_options, move_arm, plan, MotionServices};
pub use reconfigurable::{wrap, wrap_arm, ReconfigurableArm};
pub use rpc::{ArmClient, ArmServer};

fn status(resource: &Resource) -> BoxFuture<'_, Result<Value, MotusError>> {
    async move {
        let status = create_status(resource).await?;
        serde_json::to_value(status).map_err(|e| MotusError::device("status", e.to_string()))
    }
    .boxed()
}

/// The arm subtype record.
pub fn registration() -> SubtypeRegistration {
    SubtypeRegistration {
        reconfigurable: wrap,
        status,
        rpc_server: rpc::server,
        rpc_client: rpc::client,
        collectors: collectors::methods()
            .into_iter()
            .map(|(method, factory)| (method.to_string(), factory))
            .collect::<HashMap<_, _>>(),
    }
}

/// Register the arm subtype.
///
/// # Errors
///
/// [`MotusError::DuplicateRegistration`] when called twice on one registry.
pub fn register(registry: &mut Registry) -> Result<(), MotusError> {
    registry.register_subtype(subtype(), registration())
}
