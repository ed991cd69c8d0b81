//! Render bindings
//!
//! A [`BindingTable`] maps each physical id to one caller-owned render
//! handle. The engine never looks inside a handle; on sync it hands the
//! handle and the current [`Pose`] to a [`PoseSink`].

use std::collections::BTreeMap;

use askit_math::Transform;
use askit_physics::{BodyId, FluidId, FluidSummary};
use bytemuck::{Pod, Zeroable};

/// Anything that can be bound to a render handle
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PhysicalId {
    Body(BodyId),
    Fluid(FluidId),
}

impl From<BodyId> for PhysicalId {
    fn from(id: BodyId) -> Self {
        PhysicalId::Body(id)
    }
}

impl From<FluidId> for PhysicalId {
    fn from(id: FluidId) -> Self {
        PhysicalId::Fluid(id)
    }
}

/// Pose pushed to a render handle
///
/// Single precision and `Pod`, so sinks can copy it straight into a buffer.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Pose {
    pub position: [f32; 3],
    /// Quaternion as `[x, y, z, w]`
    pub orientation: [f32; 4],
    pub scale: [f32; 3],
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            orientation: [0.0, 0.0, 0.0, 1.0],
            scale: [1.0; 3],
        }
    }
}

impl Pose {
    /// Pose of a rigid body with unit scale
    pub fn from_transform(transform: &Transform) -> Self {
        let p = transform.position;
        let q = transform.rotation;
        Self {
            position: [p.x as f32, p.y as f32, p.z as f32],
            orientation: [q.x as f32, q.y as f32, q.z as f32, q.w as f32],
            scale: [1.0; 3],
        }
    }

    /// Pose of a fluid block: centre of mass, scaled to the block's bounds
    pub fn from_fluid(summary: &FluidSummary) -> Self {
        let c = summary.center_of_mass;
        let scale = summary
            .bounds
            .map(|b| {
                let s = b.size();
                [s.x as f32, s.y as f32, s.z as f32]
            })
            .unwrap_or([0.0; 3]);
        Self {
            position: [c.x as f32, c.y as f32, c.z as f32],
            scale,
            ..Self::default()
        }
    }
}

/// Receives poses during a sync
pub trait PoseSink<H> {
    fn write_pose(&mut self, handle: &H, pose: &Pose);
}

impl<H, F> PoseSink<H> for F
where
    F: FnMut(&H, &Pose),
{
    fn write_pose(&mut self, handle: &H, pose: &Pose) {
        self(handle, pose)
    }
}

/// One-to-one map from physical ids to render handles
#[derive(Clone, Debug)]
pub struct BindingTable<H> {
    bindings: BTreeMap<PhysicalId, H>,
}

impl<H> Default for BindingTable<H> {
    fn default() -> Self {
        Self {
            bindings: BTreeMap::new(),
        }
    }
}

impl<H> BindingTable<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `id` to `handle`, returning the handle it replaces
    pub fn bind(&mut self, id: impl Into<PhysicalId>, handle: H) -> Option<H> {
        self.bindings.insert(id.into(), handle)
    }

    pub fn unbind(&mut self, id: impl Into<PhysicalId>) -> Option<H> {
        self.bindings.remove(&id.into())
    }

    pub fn is_bound(&self, id: impl Into<PhysicalId>) -> bool {
        self.bindings.contains_key(&id.into())
    }

    pub fn handle_of(&self, id: impl Into<PhysicalId>) -> Option<&H> {
        self.bindings.get(&id.into())
    }

    pub fn iter(&self) -> impl Iterator<Item = (PhysicalId, &H)> {
        self.bindings.iter().map(|(id, h)| (*id, h))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn clear(&mut self) {
        self.bindings.clear();
    }

    /// Push the pose of every bound id that `resolve` knows to `sink`
    ///
    /// Returns the number of handles written.
    pub fn sync_all<R, S>(&self, resolve: R, sink: &mut S) -> usize
    where
        R: Fn(PhysicalId) -> Option<Pose>,
        S: PoseSink<H> + ?Sized,
    {
        let mut written = 0;
        for (id, handle) in &self.bindings {
            if let Some(pose) = resolve(*id) {
                sink.write_pose(handle, &pose);
                written += 1;
            }
        }
        written
    }
}
