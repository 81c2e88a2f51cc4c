//! Kinematic models.
//!
//! A [`Model`] maps a slice of joint [`Input`]s (one per degree of freedom)
//! to the [`Pose`] of its far end relative to where it is attached.  Static
//! frames have no degrees of freedom; a [`SerialModel`] chains several models
//! and splits its inputs between them in order.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use motus_types::{Input, MotusError, Pose, Quaternion, Vec3};
use serde::{Deserialize, Serialize};

/// Allowed range of one degree of freedom.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Limit {
    pub min: f64,
    pub max: f64,
}

impl Limit {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// A named kinematic model contributing zero or more degrees of freedom.
pub trait Model: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// One [`Limit`] per degree of freedom.
    fn limits(&self) -> Vec<Limit>;

    /// Pose of the model's far end for `inputs`.
    ///
    /// # Errors
    ///
    /// [`MotusError::Frame`] when `inputs.len()` differs from the number of
    /// degrees of freedom.
    fn transform(&self, inputs: &[Input]) -> Result<Pose, MotusError>;

    fn dof(&self) -> usize {
        self.limits().len()
    }
}

fn check_len(model: &dyn Model, inputs: &[Input]) -> Result<(), MotusError> {
    let dof = model.dof();
    if inputs.len() != dof {
        return Err(MotusError::Frame(format!(
            "frame '{}' takes {dof} inputs, got {}",
            model.name(),
            inputs.len()
        )));
    }
    Ok(())
}

/// `true` when every input lies within the model's limits.
pub fn within_limits(model: &dyn Model, inputs: &[Input]) -> bool {
    let limits = model.limits();
    limits.len() == inputs.len() && limits.iter().zip(inputs).all(|(l, i)| l.contains(i.value))
}

// ────────────────────────────────────────────────────────────────────────────
// Capability traits
// ────────────────────────────────────────────────────────────────────────────

/// Resources that can describe their own kinematics.
///
/// Asynchronous because a reconfigurable handle has to take its lock to ask
/// the current implementation.
#[async_trait]
pub trait ModelFramer: Send + Sync {
    async fn model_frame(&self) -> Arc<dyn Model>;
}

/// Resources that can be driven directly in joint space.
#[async_trait]
pub trait InputEnabled: Send + Sync {
    async fn current_inputs(&self) -> Result<Vec<Input>, MotusError>;

    /// Move to `goal`, returning once the device has settled.
    async fn go_to_inputs(&self, goal: &[Input]) -> Result<(), MotusError>;
}

// ────────────────────────────────────────────────────────────────────────────
// StaticFrame
// ────────────────────────────────────────────────────────────────────────────

/// A fixed offset with no degrees of freedom.
#[derive(Debug, Clone)]
pub struct StaticFrame {
    name: String,
    pose: Pose,
}

impl StaticFrame {
    pub fn new(name: impl Into<String>, pose: Pose) -> Self {
        Self {
            name: name.into(),
            pose,
        }
    }
}

impl Model for StaticFrame {
    fn name(&self) -> &str {
        &self.name
    }

    fn limits(&self) -> Vec<Limit> {
        Vec::new()
    }

    fn transform(&self, inputs: &[Input]) -> Result<Pose, MotusError> {
        check_len(self, inputs)?;
        Ok(self.pose)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Joints
// ────────────────────────────────────────────────────────────────────────────

/// Rotation about `axis`; the input is an angle in radians.
#[derive(Debug, Clone)]
pub struct RevoluteJoint {
    name: String,
    axis: Vec3,
    limit: Limit,
}

impl RevoluteJoint {
    pub fn new(name: impl Into<String>, axis: Vec3, limit: Limit) -> Self {
        Self {
            name: name.into(),
            axis,
            limit,
        }
    }
}

impl Model for RevoluteJoint {
    fn name(&self) -> &str {
        &self.name
    }

    fn limits(&self) -> Vec<Limit> {
        vec![self.limit]
    }

    fn transform(&self, inputs: &[Input]) -> Result<Pose, MotusError> {
        check_len(self, inputs)?;
        Ok(Pose::new(
            Vec3::zero(),
            Quaternion::from_axis_angle(self.axis, inputs[0].value),
        ))
    }
}

/// Translation along `axis`; the input is a distance in millimetres.
#[derive(Debug, Clone)]
pub struct PrismaticJoint {
    name: String,
    axis: Vec3,
    limit: Limit,
}

impl PrismaticJoint {
    pub fn new(name: impl Into<String>, axis: Vec3, limit: Limit) -> Self {
        Self {
            name: name.into(),
            axis,
            limit,
        }
    }
}

impl Model for PrismaticJoint {
    fn name(&self) -> &str {
        &self.name
    }

    fn limits(&self) -> Vec<Limit> {
        vec![self.limit]
    }

    fn transform(&self, inputs: &[Input]) -> Result<Pose, MotusError> {
        check_len(self, inputs)?;
        let len = self.axis.norm();
        if len == 0.0 {
            return Err(MotusError::Frame(format!("prismatic joint '{}' has a zero axis", self.name)));
        }
        Ok(Pose::new(
            self.axis.scale(inputs[0].value / len),
            Quaternion::identity(),
        ))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SerialModel
// ────────────────────────────────────────────────────────────────────────────

/// A chain of models composed base-to-tip, e.g. an arm.
#[derive(Debug, Clone)]
pub struct SerialModel {
    name: String,
    links: Vec<Arc<dyn Model>>,
}

impl SerialModel {
    pub fn new(name: impl Into<String>, links: Vec<Arc<dyn Model>>) -> Self {
        Self {
            name: name.into(),
            links,
        }
    }
}

impl Model for SerialModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn limits(&self) -> Vec<Limit> {
        self.links.iter().flat_map(|l| l.limits()).collect()
    }

    fn transform(&self, inputs: &[Input]) -> Result<Pose, MotusError> {
        check_len(self, inputs)?;
        let mut pose = Pose::identity();
        let mut offset = 0;
        for link in &self.links {
            let dof = link.dof();
            pose = pose.compose(link.transform(&inputs[offset..offset + dof])?);
            offset += dof;
        }
        Ok(pose)
    }
}
