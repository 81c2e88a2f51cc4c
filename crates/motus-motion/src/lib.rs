//! `motus-motion` – from a goal pose to a driven trajectory.
//!
//! The search itself belongs to whatever implements [`Planner`]; this crate
//! only assembles what a planner is given, narrows what it returns to the one
//! actuator being moved, and walks the actuator through the result.
//!
//! # Modules
//!
//! - [`planner`] – [`PlannerOptions`], [`PlanRequest`], the [`Planner`] trait
//!   and [`invoke`], which filters a multi-frame plan down to one actuator.
//! - [`executor`] – [`go_to_waypoints`]: sequential execution with a
//!   cancellation check before every waypoint.

pub mod executor;
pub mod planner;

pub use executor::go_to_waypoints;
pub use planner::{
    actuator_trajectory, invoke, MotionProfile, PlanRequest, Planner, PlannerOptions, PlanningResult,
    Waypoint,
};
