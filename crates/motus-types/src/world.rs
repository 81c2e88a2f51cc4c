//! Per-call environment description supplied with a motion request.

use serde::{Deserialize, Serialize};

use crate::spatial::Pose;

/// Shape of a [`Geometry`].  Dimensions are in millimetres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GeometryKind {
    Box { x: f64, y: f64, z: f64 },
    Sphere { radius: f64 },
    Point,
}

/// A labelled solid placed at `pose` within its enclosing frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    #[serde(default)]
    pub label: String,
    pub pose: Pose,
    pub kind: GeometryKind,
}

/// Geometries expressed in the frame called `reference_frame`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometriesInFrame {
    pub reference_frame: String,
    pub geometries: Vec<Geometry>,
}

/// A named static frame attached under `parent` at `pose`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkInFrame {
    pub name: String,
    pub parent: String,
    pub pose: Pose,
}

/// Obstacles, interaction spaces and transform overrides for one request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorldState {
    #[serde(default)]
    pub obstacles: Vec<GeometriesInFrame>,
    #[serde(default)]
    pub interaction_spaces: Vec<GeometriesInFrame>,
    #[serde(default)]
    pub transforms: Vec<LinkInFrame>,
}

impl WorldState {
    /// `true` when there are no obstacle groups, no interaction-space groups
    /// and no transforms.  Groups are counted, not the geometries inside them.
    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty() && self.interaction_spaces.is_empty() && self.transforms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_world_state_is_empty() {
        assert!(WorldState::default().is_empty());
    }

    #[test]
    fn any_single_section_makes_world_state_non_empty() {
        let group = GeometriesInFrame {
            reference_frame: "world".into(),
            geometries: vec![],
        };
        let with_obstacle = WorldState {
            obstacles: vec![group.clone()],
            ..Default::default()
        };
        let with_space = WorldState {
            interaction_spaces: vec![group],
            ..Default::default()
        };
        let with_transform = WorldState {
            transforms: vec![LinkInFrame {
                name: "camera".into(),
                parent: "world".into(),
                pose: Pose::identity(),
            }],
            ..Default::default()
        };
        assert!(!with_obstacle.is_empty());
        assert!(!with_space.is_empty());
        assert!(!with_transform.is_empty());
    }

    #[test]
    fn world_state_deserialises_with_missing_sections() {
        let ws: WorldState = serde_json::from_str(
            r#"{"obstacles":[{"reference_frame":"world","geometries":[
                {"pose":{"point":{"x":1.0,"y":0.0,"z":0.0},
                         "orientation":{"w":1.0,"x":0.0,"y":0.0,"z":0.0}},
                 "kind":{"type":"sphere","radius":20.0}}]}]}"#,
        )
        .unwrap();
        assert_eq!(ws.obstacles.len(), 1);
        assert!(ws.transforms.is_empty());
        assert_eq!(ws.obstacles[0].geometries[0].kind, GeometryKind::Sphere { radius: 20.0 });
    }
}
