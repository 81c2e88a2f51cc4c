//! Data capture of arm methods.

use std::sync::Arc;

use futures_util::FutureExt;
use motus_resource::{CaptureFn, Collector, CollectorParams, Resource};
use motus_types::{Extra, MotusError};

use crate::arm::Arm;
use crate::rpc::{END_POSITION, JOINT_POSITIONS};

fn arm_of(resource: &Resource, params: &CollectorParams) -> Result<Arc<dyn Arm>, MotusError> {
    resource.downcast::<dyn Arm>().ok_or_else(|| MotusError::TypeMismatch {
        name: params.resource.to_string(),
        expected: "Arm".to_string(),
        actual: resource.type_name().to_string(),
    })
}

fn to_value<T: serde::Serialize>(value: T) -> Result<serde_json::Value, MotusError> {
    serde_json::to_value(value).map_err(|e| MotusError::device("collector", e.to_string()))
}

/// Periodic capture of [`Arm::end_position`].
pub fn end_position(resource: &Resource, params: CollectorParams) -> Result<Collector, MotusError> {
    let arm = arm_of(resource, &params)?;
    let capture: CaptureFn = Arc::new(move || {
        let arm = Arc::clone(&arm);
        async move { to_value(arm.end_position(Extra::new()).await?) }.boxed()
    });
    Ok(Collector::new(params, capture))
}

/// Periodic capture of [`Arm::joint_positions`].
pub fn joint_positions(resource: &Resource, params: CollectorParams) -> Result<Collector, MotusError> {
    let arm = arm_of(resource, &params)?;
    let capture: CaptureFn = Arc::new(move || {
        let arm = Arc::clone(&arm);
        async move { to_value(arm.joint_positions(Extra::new()).await?) }.boxed()
    });
    Ok(Collector::new(params, capture))
}

/// Method name → collector factory, as registered for the arm subtype.
pub fn methods() -> [(&'static str, motus_resource::CollectorFactory); 2] {
    [(END_POSITION, end_position), (JOINT_POSITIONS, joint_positions)]
}
