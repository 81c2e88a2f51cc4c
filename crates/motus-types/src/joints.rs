//! Joint-space values.
//!
//! [`Input`] is what kinematic models consume (radians for revolute joints,
//! millimetres for prismatic ones).  [`JointPositions`] is the user-facing
//! vector reported and accepted by arms, in degrees.

use serde::{Deserialize, Serialize};

/// A single numeric degree-of-freedom value.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Input {
    pub value: f64,
}

impl Input {
    pub fn new(value: f64) -> Self {
        Self { value }
    }

    pub fn from_floats(values: &[f64]) -> Vec<Input> {
        values.iter().copied().map(Input::new).collect()
    }

    pub fn to_floats(inputs: &[Input]) -> Vec<f64> {
        inputs.iter().map(|i| i.value).collect()
    }
}

/// Joint positions in degrees.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct JointPositions {
    pub values: Vec<f64>,
}

impl JointPositions {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// Convert model inputs in radians to degrees.
    pub fn from_radians(inputs: &[Input]) -> Self {
        Self::new(inputs.iter().map(|i| i.value.to_degrees()).collect())
    }

    /// Convert back to model inputs in radians.
    pub fn to_inputs(&self) -> Vec<Input> {
        self.values.iter().map(|d| Input::new(d.to_radians())).collect()
    }
}
