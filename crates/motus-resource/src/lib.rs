//! `motus-resource` – resource plumbing shared by every subtype.
//!
//! Nothing in this crate knows what an arm or a motor is.  It provides the
//! type-erased [`Resource`] handle, the dependency resolver, the explicit
//! [`Registry`] populated once at bootstrap, the traits a reconfigurable
//! wrapper implements, and the subtype-agnostic halves of the RPC and data
//! capture layers.
//!
//! # Modules
//!
//! - [`resource`] – [`Resource`], [`Dependencies`] and [`resolve`]: turn a
//!   name into a typed, capability-checked handle or a
//!   `NotFound` / `TypeMismatch` error.
//! - [`registry`] – [`Registry`]: write-once subtype records and model
//!   constructors.
//! - [`reconfigurable`] – [`Reconfigurable`], [`Generic`] and
//!   [`MovingCheckable`].
//! - [`rpc`] – [`RpcRequest`], [`RpcService`], [`RpcConn`] and the in-process
//!   [`LoopbackConn`].
//! - [`collector`] – periodic [`Collector`]s that capture method results into
//!   [`CaptureRecord`]s.

pub mod collector;
pub mod reconfigurable;
pub mod registry;
pub mod resource;
pub mod rpc;

pub use collector::{CaptureFn, CaptureRecord, Collector, CollectorParams};
pub use reconfigurable::{Generic, MovingCheckable, Reconfigurable};
pub use registry::{
    ClientFactory, CollectorFactory, Constructor, Registry, ServerFactory, StatusFn, SubtypeRegistration,
    WrapFn,
};
pub use resource::{names_by_subtype, resolve, Dependencies, Resource};
pub use rpc::{LoopbackConn, RpcConn, RpcRequest, RpcService, SubtypeService};
