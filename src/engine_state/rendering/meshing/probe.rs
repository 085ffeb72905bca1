//! Neighbor lookups used to decide whether faces on a chunk boundary are visible.

use crate::engine_state::voxels::block::block_side::{Axis, BlockSide, Side};
use crate::engine_state::voxels::chunk::CHUNK_DIMENSION;
use crate::engine_state::voxels::octree::VoxelOctree;

/// Answers whether the voxel just across the chunk boundary is solid.
///
/// `(b, c)` are the plane coordinates of [`Axis::plane_axes`]; `side` picks the
/// boundary (`Negative` is the voxel at local `-1` along `axis`, `Positive` the
/// one at local `32`).
pub trait NeighborProbe {
    /// Whether the neighboring voxel is solid. Unloaded neighbors are not.
    fn is_solid(&self, axis: Axis, side: Side, b: usize, c: usize) -> bool;
}

impl<F> NeighborProbe for F
where
    F: Fn(Axis, Side, usize, usize) -> bool,
{
    fn is_solid(&self, axis: Axis, side: Side, b: usize, c: usize) -> bool {
        self(axis, side, b, c)
    }
}

/// Treats every neighbor as air.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoNeighbors;

impl NeighborProbe for NoNeighbors {
    fn is_solid(&self, _axis: Axis, _side: Side, _b: usize, _c: usize) -> bool {
        false
    }
}

/// The octrees of the six face-adjacent chunks, indexed by [`BlockSide`].
#[derive(Copy, Clone, Debug, Default)]
pub struct NeighborOctrees<'a> {
    neighbors: [Option<&'a VoxelOctree>; 6],
}

impl<'a> NeighborOctrees<'a> {
    /// No neighbors loaded.
    pub fn new() -> Self {
        NeighborOctrees::default()
    }

    /// Sets the chunk adjacent across `side`.
    pub fn set(&mut self, side: BlockSide, octree: Option<&'a VoxelOctree>) {
        self.neighbors[side as usize] = octree;
    }

    /// Builder form of [`NeighborOctrees::set`].
    pub fn with(mut self, side: BlockSide, octree: &'a VoxelOctree) -> Self {
        self.set(side, Some(octree));
        self
    }

    /// Number of loaded neighbors.
    pub fn loaded(&self) -> usize {
        self.neighbors.iter().flatten().count()
    }
}

impl NeighborProbe for NeighborOctrees<'_> {
    fn is_solid(&self, axis: Axis, side: Side, b: usize, c: usize) -> bool {
        let Some(octree) = self.neighbors[BlockSide::from_axis(axis, side) as usize] else {
            return false;
        };

        // The neighbor's voxel touching our boundary is on its opposite face.
        let a = match side {
            Side::Negative => CHUNK_DIMENSION - 1,
            Side::Positive => 0,
        };
        let [x, y, z] = axis.compose(a, b, c);
        octree.is_solid(x, y, z)
    }
}
