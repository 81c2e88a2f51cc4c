//! `motus-kinematics` – kinematic models and the frame tree.
//!
//! Turns named rigid bodies and joint inputs into poses, and assembles the
//! tree of frames a motion request is planned against.
//!
//! # Modules
//!
//! - [`model`] – the [`Model`] trait with static, revolute, prismatic and
//!   serial-chain implementations, plus the [`ModelFramer`] and
//!   [`InputEnabled`] capability traits.
//! - [`frame_system`] – [`FrameSystem`]: an arena of frames indexed by name,
//!   rooted at [`WORLD`], with forward kinematics through the tree.
//! - [`builder`] – [`build`]: selects the robot-wide tree or falls back to a
//!   minimal ephemeral one for a single actuator.
//! - [`source`] – [`FrameSystemSource`] and [`FrameSystemHandle`]: read-only
//!   snapshots of the published robot-wide tree.

pub mod builder;
pub mod frame_system;
pub mod model;
pub mod source;

pub use builder::{build, PlanningFrames, ORIGIN_SUFFIX};
pub use frame_system::{FrameSystem, WORLD};
pub use model::{
    within_limits, InputEnabled, Limit, Model, ModelFramer, PrismaticJoint, RevoluteJoint, SerialModel,
    StaticFrame,
};
pub use source::{FrameSystemHandle, FrameSystemSource};
