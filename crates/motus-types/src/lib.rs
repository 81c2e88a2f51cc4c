//! `motus-types` – shared vocabulary of the Motus resource runtime.
//!
//! Everything that crosses a crate boundary lives here: resource names, the
//! spatial primitives used by frames and goals, per-call world state, joint
//! inputs, component configuration, and the workspace-wide [`MotusError`].
//!
//! # Modules
//!
//! - [`name`] – [`Subtype`] and [`ResourceName`], the registry and
//!   dependency keys.
//! - [`spatial`] – [`Vec3`], [`Quaternion`], [`Pose`] and [`PoseInFrame`].
//! - [`world`] – [`WorldState`] and the geometry it carries.
//! - [`joints`] – [`Input`] and [`JointPositions`].
//! - [`config`] – [`ComponentConfig`] and [`UpdateAction`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod config;
pub mod joints;
pub mod name;
pub mod spatial;
pub mod world;

pub use config::{ComponentConfig, UpdateAction};
pub use joints::{Input, JointPositions};
pub use name::{ResourceKind, ResourceName, Subtype, NAMESPACE_RDK};
pub use spatial::{Pose, PoseInFrame, Quaternion, Vec3};
pub use world::{GeometriesInFrame, Geometry, GeometryKind, LinkInFrame, WorldState};

/// Free-form key/value arguments passed alongside every capability call.
pub type Extra = serde_json::Map<String, serde_json::Value>;

/// Global error type spanning dependency wiring, reconfiguration, planning,
/// cancellation and device failures.
///
/// The enum is serialisable so a failure raised behind an RPC server reaches
/// the remote caller as the same variant a local caller would have seen.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MotusError {
    /// A dependency or resource name is absent.
    #[error("Resource Not Found: {0}")]
    NotFound(String),

    /// The named dependency exists but does not provide the requested
    /// capability interface.
    #[error("Dependency \"{name}\" should implement {expected} but is {actual}")]
    TypeMismatch {
        name: String,
        expected: String,
        actual: String,
    },

    /// An object handed to a wrapper does not provide the minimum capability
    /// set of the subtype.
    #[error("Expected implementation of {expected} but got {actual}")]
    UnimplementedInterface { expected: String, actual: String },

    /// An optional capability was invoked on a resource that lacks it.
    #[error("{0} unimplemented")]
    UnimplementedCapability(String),

    /// `reconfigure` was handed a handle of a different wrapper shape.
    #[error("Reconfigure Type Error: expected {expected} but got {actual}")]
    ReconfigureType { expected: String, actual: String },

    /// No feasible path, or the request could not be related to the frame
    /// system.
    #[error("Planning Error: {0}")]
    Planning(String),

    /// The caller cancelled the operation.
    #[error("Operation Cancelled")]
    Cancelled,

    /// Opaque failure reported by an underlying capability call.
    #[error("Device Fault on {component}: {details}")]
    Device { component: String, details: String },

    /// A write-once registry slot was written twice.
    #[error("Duplicate Registration: {0}")]
    DuplicateRegistration(String),

    /// The kinematic tree could not be built or queried.
    #[error("Frame Error: {0}")]
    Frame(String),

    #[error("Config Error: {0}")]
    Config(String),

    /// Transport-level failure of a remote call.
    #[error("RPC Error: {0}")]
    Rpc(String),
}

impl MotusError {
    /// Shorthand for a [`MotusError::Device`] failure.
    pub fn device(component: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Device {
            component: component.into(),
            details: details.into(),
        }
    }

    /// `true` for [`MotusError::Cancelled`]; lets callers tell an abort they
    /// asked for apart from a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
