//! Mesh generation for voxel rendering.
//!
//! This module turns a chunk's octree into the triangle list uploaded to the
//! GPU. Faces are culled with per-axis bitmasks: for every axis the solid
//! voxels of the chunk (plus the boundary voxels of its neighbors) are packed
//! into `u64` rows, and a shift-and-mask over each row yields every voxel face
//! that touches air.
//!
//! # Architecture
//! - `BlockMask`: occupancy rows for one axis, with neighbor padding bits
//! - `NeighborProbe`: how the mesher learns about voxels across the boundary
//! - `Mesh`: the packed vertex and normal streams
//!
//! # Performance Considerations
//! - Solid octree leaves are written as bit runs, never voxel by voxel
//! - A chunk whose root is a single air leaf is skipped without building masks
//! - Faces are not merged; every visible voxel face is two triangles

use log::trace;
use web_time::Instant;

use crate::engine_state::voxels::block::block_side::{Axis, Side};
use crate::engine_state::voxels::octree::VoxelOctree;

mod block_mask;
mod mesh;
mod probe;

pub use block_mask::BlockMask;
pub use mesh::*;
pub use probe::{NeighborOctrees, NeighborProbe, NoNeighbors};

/// Builds the mesh of `octree`, asking `neighbors` about voxels across the
/// chunk boundary.
///
/// Faces are emitted axis by axis (X, Y, Z), positive side before negative.
pub fn build_mesh(octree: &VoxelOctree, neighbors: &dyn NeighborProbe) -> Mesh {
    if octree.root_block().is_some_and(|block_type| !block_type.is_solid()) {
        return Mesh::new();
    }

    let start = Instant::now();
    let mut mesh = Mesh::new();

    for axis in Axis::ALL {
        let mask = BlockMask::build(octree, axis, neighbors);
        for side in Side::ALL {
            mask.emit_faces(side, &mut mesh);
        }
    }

    trace!(
        "Meshed {} leaves into {} faces in {:?}",
        octree.leaf_count(),
        mesh.quad_count(),
        start.elapsed()
    );

    mesh
}
