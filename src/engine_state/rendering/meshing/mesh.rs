//! Mesh data for one chunk, in the layout the GPU buffers expect.
//!
//! A mesh is two parallel `f32` streams with one entry per vertex:
//! - `vertices`: the vertex's lattice corner packed as `x + y * 33 + z * 33 * 33`
//! - `normals`: the face-normal code of the face the vertex belongs to
//!
//! Every face contributes two triangles (six vertices) and faces are never
//! merged.

use cgmath::Point3;

use crate::engine_state::voxels::block::block_side::{BlockSide, Side};
use crate::engine_state::voxels::chunk::CHUNK_DIMENSION;

/// Number of lattice corners along one edge of a chunk.
pub const PACKED_LATTICE_DIMENSION: u32 = CHUNK_DIMENSION as u32 + 1;

/// Vertices emitted per face.
pub const VERTICES_PER_FACE: usize = 6;

/// Packs a lattice corner (each component in `0..=32`) into one float.
///
/// Every packed value is below 2^24, so it is represented exactly.
pub fn pack_position(x: u32, y: u32, z: u32) -> f32 {
    debug_assert!(x < PACKED_LATTICE_DIMENSION);
    debug_assert!(y < PACKED_LATTICE_DIMENSION);
    debug_assert!(z < PACKED_LATTICE_DIMENSION);
    (x + y * PACKED_LATTICE_DIMENSION + z * PACKED_LATTICE_DIMENSION * PACKED_LATTICE_DIMENSION)
        as f32
}

/// Inverse of [`pack_position`].
pub fn unpack_position(packed: f32) -> Point3<u32> {
    let packed = packed as u32;
    Point3::new(
        packed % PACKED_LATTICE_DIMENSION,
        packed / PACKED_LATTICE_DIMENSION % PACKED_LATTICE_DIMENSION,
        packed / (PACKED_LATTICE_DIMENSION * PACKED_LATTICE_DIMENSION),
    )
}

/// The geometry of one chunk.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Mesh {
    /// Packed lattice positions, one per vertex.
    pub vertices: Vec<f32>,
    /// Face-normal codes, one per vertex.
    pub normals: Vec<f32>,
}

impl Mesh {
    /// Creates an empty mesh.
    pub fn new() -> Self {
        Mesh::default()
    }

    /// Creates an empty mesh with room for `faces` faces.
    pub fn with_face_capacity(faces: usize) -> Self {
        Mesh {
            vertices: Vec::with_capacity(faces * VERTICES_PER_FACE),
            normals: Vec::with_capacity(faces * VERTICES_PER_FACE),
        }
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of quads (faces).
    pub fn quad_count(&self) -> usize {
        self.vertices.len() / VERTICES_PER_FACE
    }

    /// Whether there is nothing to draw.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// The value written to the normal stream for faces of `side`.
    pub fn face_normal(side: BlockSide) -> f32 {
        side.normal_code() as f32
    }

    /// Appends the two triangles of the unit face of `side` whose lowest
    /// lattice corner is `corner`.
    ///
    /// `corner` lies on the face plane: for positive sides it is already one
    /// step past the voxel along the face axis. Triangles wind counter-clockwise
    /// when seen from outside the voxel.
    pub fn push_face(&mut self, corner: [u32; 3], side: BlockSide) {
        let [x, y, z] = corner;
        let [ax, ay, az] = side.axis().unit().map(|component| component as u32);

        let v1 = [x, y, z];
        let v2 = [x + 1 - ax, y + 1 - ay, z + 1 - az];
        let v3 = [x + az, y + ax, z + ay];
        let v4 = [x + ay, y + az, z + ax];

        let corners = match side.side() {
            Side::Positive => [v3, v2, v1, v2, v4, v1],
            Side::Negative => [v1, v2, v3, v1, v4, v2],
        };

        let normal = Self::face_normal(side);
        for [vx, vy, vz] in corners {
            self.vertices.push(pack_position(vx, vy, vz));
            self.normals.push(normal);
        }
    }

    /// Unpacked lattice corners, in vertex order.
    pub fn positions(&self) -> impl Iterator<Item = Point3<u32>> + '_ {
        self.vertices.iter().map(|&packed| unpack_position(packed))
    }

    /// Decoded face of each vertex, in vertex order.
    pub fn sides(&self) -> impl Iterator<Item = Option<BlockSide>> + '_ {
        self.normals
            .iter()
            .map(|&code| BlockSide::from_normal_code(code as u32))
    }
}
