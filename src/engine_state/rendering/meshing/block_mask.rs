//! Per-axis occupancy bitmasks.
//!
//! For one axis, a chunk is 32 × 32 rows of 32 voxels. Each row is a `u64`
//! whose bit `i + 1` is set when voxel `i` along the axis is solid. Bit 0 and
//! bit 33 hold the neighboring chunks' boundary voxels, so a single shift
//! compares every voxel in the row with the one before or after it.

use super::mesh::Mesh;
use super::probe::NeighborProbe;
use crate::engine_state::voxels::block::block_side::{Axis, BlockSide, Side};
use crate::engine_state::voxels::chunk::{CHUNK_DIMENSION, CHUNK_PLANE_SIZE};
use crate::engine_state::voxels::octree::VoxelOctree;

/// Bit holding the neighbor voxel at local `-1`.
pub const NEGATIVE_NEIGHBOR_BIT: u64 = 1;
/// Bit holding the neighbor voxel at local `32`.
pub const POSITIVE_NEIGHBOR_BIT: u64 = 1 << (CHUNK_DIMENSION + 1);
const LOCAL_BITS: u64 = ((1 << CHUNK_DIMENSION) - 1) << 1;

/// Occupancy of a chunk along one axis, padded with the neighbor voxels.
pub struct BlockMask {
    axis: Axis,
    rows: Box<[u64]>,
}

impl BlockMask {
    /// Builds the mask of `octree` along `axis`.
    ///
    /// Solid leaves are written as whole runs of bits, so a big uniform leaf
    /// costs one OR per row it spans rather than one per voxel.
    pub fn build(octree: &VoxelOctree, axis: Axis, neighbors: &dyn NeighborProbe) -> Self {
        let mut rows = vec![0u64; CHUNK_PLANE_SIZE].into_boxed_slice();
        let (b_axis, c_axis) = axis.plane_axes();

        octree.for_each_leaf(|bounds, block_type| {
            if !block_type.is_solid() {
                return;
            }

            let origin: [u32; 3] = bounds.origin.into();
            let size = bounds.size as usize;
            let run = ((1u64 << size) - 1) << (origin[axis.index()] + 1);

            let b_start = origin[b_axis] as usize;
            let c_start = origin[c_axis] as usize;
            for c in c_start..c_start + size {
                for b in b_start..b_start + size {
                    rows[b + c * CHUNK_DIMENSION] |= run;
                }
            }
        });

        for c in 0..CHUNK_DIMENSION {
            for b in 0..CHUNK_DIMENSION {
                let row = &mut rows[b + c * CHUNK_DIMENSION];
                if neighbors.is_solid(axis, Side::Negative, b, c) {
                    *row |= NEGATIVE_NEIGHBOR_BIT;
                }
                if neighbors.is_solid(axis, Side::Positive, b, c) {
                    *row |= POSITIVE_NEIGHBOR_BIT;
                }
            }
        }

        BlockMask { axis, rows }
    }

    /// The axis rows run along.
    pub fn axis(&self) -> Axis {
        self.axis
    }

    /// The padded row at plane coordinates `(b, c)`.
    pub fn row(&self, b: usize, c: usize) -> u64 {
        self.rows[b + c * CHUNK_DIMENSION]
    }

    /// Voxels of row `(b, c)` with a visible face towards `side`, as bit `i`
    /// for voxel `i`.
    ///
    /// A face is visible where a solid voxel meets a non-solid one; only the
    /// solid voxel gets the face.
    pub fn visible_faces(&self, b: usize, c: usize, side: Side) -> u32 {
        let row = self.row(b, c);
        let exposed = match side {
            Side::Negative => row & !(row << 1),
            Side::Positive => row & !(row >> 1),
        };
        ((exposed & LOCAL_BITS) >> 1) as u32
    }

    /// Appends one face to `mesh` for every visible face towards `side`.
    pub fn emit_faces(&self, side: Side, mesh: &mut Mesh) {
        let block_side = BlockSide::from_axis(self.axis, side);
        let axis_index = self.axis.index();

        for c in 0..CHUNK_DIMENSION {
            for b in 0..CHUNK_DIMENSION {
                let mut faces = self.visible_faces(b, c, side);
                while faces != 0 {
                    let a = faces.trailing_zeros() as usize;
                    faces &= faces - 1;

                    let mut corner = self.axis.compose(a, b, c).map(|component| component as u32);
                    if side == Side::Positive {
                        corner[axis_index] += 1;
                    }
                    mesh.push_face(corner, block_side);
                }
            }
        }
    }
}
