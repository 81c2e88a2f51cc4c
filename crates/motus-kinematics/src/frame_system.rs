//! [`FrameSystem`] – the kinematic tree.
//!
//! Frames are stored in an arena and indexed by name; each record keeps the
//! index of its parent rather than a pointer to it.  Insertion requires the
//! parent to exist already and the name to be unused, so the tree always has
//! exactly one root ([`WORLD`]) and can never contain a cycle.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use motus_kinematics::{FrameSystem, StaticFrame, WORLD};
//! use motus_types::{Pose, PoseInFrame};
//!
//! let mut fs = FrameSystem::new("robot");
//! fs.add_frame(Arc::new(StaticFrame::new("base", Pose::from_point(1000.0, 0.0, 0.0))), WORLD)
//!     .unwrap();
//! fs.add_frame(Arc::new(StaticFrame::new("camera", Pose::from_point(500.0, 0.0, 0.0))), "base")
//!     .unwrap();
//!
//! let origin = PoseInFrame::new("camera", Pose::identity());
//! let in_world = fs.transform(&Default::default(), &origin, WORLD).unwrap();
//! assert!((in_world.pose.point.x - 1500.0).abs() < 1e-9);
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use motus_types::{Input, LinkInFrame, MotusError, Pose, PoseInFrame};

use crate::model::{Model, StaticFrame};

/// Name of the root frame of every [`FrameSystem`].
pub const WORLD: &str = "world";

#[derive(Debug, Clone)]
struct FrameRecord {
    frame: Arc<dyn Model>,
    parent: Option<usize>,
}

/// A rooted tree of frames.
///
/// Cloning is cheap: models are shared behind [`Arc`]s.
#[derive(Debug, Clone)]
pub struct FrameSystem {
    name: String,
    frames: Vec<FrameRecord>,
    index: HashMap<String, usize>,
}

impl FrameSystem {
    /// A tree containing only the [`WORLD`] root.
    pub fn new(name: impl Into<String>) -> Self {
        let root = FrameRecord {
            frame: Arc::new(StaticFrame::new(WORLD, Pose::identity())),
            parent: None,
        };
        Self {
            name: name.into(),
            frames: vec![root],
            index: HashMap::from([(WORLD.to_string(), 0)]),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the root frame.
    pub fn world(&self) -> &str {
        WORLD
    }

    /// Number of frames, including the root.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// A tree is never empty; it always holds the root.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn frame(&self, name: &str) -> Option<&Arc<dyn Model>> {
        self.index.get(name).map(|&i| &self.frames[i].frame)
    }

    /// Name of the parent of `name`; `None` for the root or an unknown frame.
    pub fn parent(&self, name: &str) -> Option<&str> {
        let &i = self.index.get(name)?;
        self.frames[i].parent.map(|p| self.frames[p].frame.name())
    }

    /// Every frame name in insertion order, root first.
    pub fn frame_names(&self) -> Vec<&str> {
        self.frames.iter().map(|r| r.frame.name()).collect()
    }

    /// Attach `frame` beneath `parent`.
    ///
    /// # Errors
    ///
    /// [`MotusError::Frame`] when the name is taken or `parent` is unknown.
    pub fn add_frame(&mut self, frame: Arc<dyn Model>, parent: &str) -> Result<(), MotusError> {
        let name = frame.name().to_string();
        if self.index.contains_key(&name) {
            return Err(MotusError::Frame(format!("frame '{name}' already exists")));
        }
        let &parent_idx = self
            .index
            .get(parent)
            .ok_or_else(|| MotusError::Frame(format!("parent frame '{parent}' not found")))?;
        self.index.insert(name, self.frames.len());
        self.frames.push(FrameRecord {
            frame,
            parent: Some(parent_idx),
        });
        Ok(())
    }

    /// A copy of this tree with each link attached as a static frame.
    ///
    /// Links may hang off frames added earlier in the same slice.  The
    /// receiver is left untouched.
    pub fn merge_transforms(&self, links: &[LinkInFrame]) -> Result<FrameSystem, MotusError> {
        let mut merged = self.clone();
        for link in links {
            merged.add_frame(Arc::new(StaticFrame::new(link.name.clone(), link.pose)), &link.parent)?;
        }
        Ok(merged)
    }

    /// Pose of the frame `name` expressed in [`WORLD`], for the given inputs.
    fn world_pose(&self, name: &str, inputs: &HashMap<String, Vec<Input>>) -> Result<Pose, MotusError> {
        let mut idx = *self
            .index
            .get(name)
            .ok_or_else(|| MotusError::Frame(format!("frame '{name}' not found")))?;

        // Walk leaf-to-root, then compose root-to-leaf.
        let mut chain = Vec::new();
        loop {
            let record = &self.frames[idx];
            chain.push(&record.frame);
            match record.parent {
                Some(p) => idx = p,
                None => break,
            }
        }

        let mut pose = Pose::identity();
        for frame in chain.into_iter().rev() {
            let frame_inputs: &[Input] = if frame.dof() == 0 {
                &[]
            } else {
                inputs.get(frame.name()).ok_or_else(|| {
                    MotusError::Frame(format!("no inputs supplied for frame '{}'", frame.name()))
                })?
            };
            pose = pose.compose(frame.transform(frame_inputs)?);
        }
        Ok(pose)
    }

    /// Re-express `src` in the frame called `dst`.
    ///
    /// `inputs` maps each moving frame to its joint inputs; frames without
    /// degrees of freedom need no entry.
    pub fn transform(
        &self,
        inputs: &HashMap<String, Vec<Input>>,
        src: &PoseInFrame,
        dst: &str,
    ) -> Result<PoseInFrame, MotusError> {
        let world_src = self.world_pose(&src.frame, inputs)?;
        let world_dst = self.world_pose(dst, inputs)?;
        let pose = world_dst.inverse().compose(world_src).compose(src.pose);
        Ok(PoseInFrame::new(dst, pose))
    }
}
