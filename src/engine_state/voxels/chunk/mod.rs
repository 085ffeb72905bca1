//! # Chunk Module
//!
//! This module provides the `Chunk` struct: one slot of the world's chunk ring.
//! A chunk owns the octree describing its 32x32x32 blocks and the two GPU
//! buffers its mesh is uploaded to.
//!
//! ## Lifecycle
//!
//! ```text
//! Empty --generate--> Initializing --apply_mesh--> Ready
//!                          ^                         |
//!                          |                     reassign
//!                      generate                      |
//!                          |                         v
//!                          +------------------- Stale
//! ```
//!
//! A stale chunk has been moved to a new position but not rebuilt yet. Until a
//! new mesh is applied it keeps drawing the mesh it had at its previous
//! position, so the world never shows holes while the worker catches up.
//!
//! The GPU buffers are created once per slot and reused across reassignments.

use cgmath::Point3;

use super::octree::{ChunkGenerator, VoxelOctree};
use crate::engine_state::buffer_state::{BufferHandle, MeshUploader};
use crate::engine_state::rendering::meshing::{self, Mesh, NeighborProbe};
use crate::engine_state::rendering::renderer::ChunkDraw;

/// The dimension (width, height, depth) of a chunk in blocks.
pub const CHUNK_DIMENSION: usize = 32;
/// The number of blocks in a single 2D plane of a chunk (CHUNK_DIMENSION²).
pub const CHUNK_PLANE_SIZE: usize = CHUNK_DIMENSION * CHUNK_DIMENSION;
/// The total number of blocks in a chunk (CHUNK_DIMENSION³).
pub const CHUNK_SIZE: usize = CHUNK_PLANE_SIZE * CHUNK_DIMENSION;

/// Where a chunk is in its load/rebuild cycle.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ChunkState {
    /// Created, nothing generated yet.
    Empty,
    /// Reassigned to a new position; octree dropped, old mesh still drawn.
    Stale,
    /// Octree generated for the current position, mesh not uploaded yet.
    Initializing,
    /// The uploaded mesh matches the current position.
    Ready,
}

/// The pair of GPU buffers a chunk's mesh lives in.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ChunkBuffers {
    /// Packed vertex positions.
    pub vertex_buffer: BufferHandle,
    /// Face-normal codes, one per vertex.
    pub normal_buffer: BufferHandle,
}

impl ChunkBuffers {
    /// Reserves both buffers for ring slot `slot`.
    pub fn create(uploader: &mut dyn MeshUploader, slot: usize) -> Self {
        ChunkBuffers {
            vertex_buffer: uploader.create_buffer(&format!("Chunk Vertex Buffer {}", slot)),
            normal_buffer: uploader.create_buffer(&format!("Chunk Normal Buffer {}", slot)),
        }
    }
}

/// Represents a 32x32x32 collection of voxel blocks in the world.
pub struct Chunk {
    /// The position of this chunk in chunk coordinates (not block coordinates).
    pub position: Point3<i32>,
    octree: Option<VoxelOctree>,
    buffers: ChunkBuffers,
    mesh_size: u32,
    mesh_position: Point3<i32>,
    state: ChunkState,
}

impl Chunk {
    /// Creates a chunk at `position` with nothing generated.
    pub fn new(position: Point3<i32>, buffers: ChunkBuffers) -> Self {
        Chunk {
            position,
            octree: None,
            buffers,
            mesh_size: 0,
            mesh_position: position,
            state: ChunkState::Empty,
        }
    }

    /// Creates a chunk at `position` and builds its octree right away.
    pub fn init(
        position: Point3<i32>,
        buffers: ChunkBuffers,
        generator: &dyn ChunkGenerator,
    ) -> Self {
        let mut chunk = Chunk::new(position, buffers);
        chunk.generate(generator);
        chunk
    }

    /// Builds the octree for the current position if there is none.
    ///
    /// Returns whether anything was generated.
    pub fn generate(&mut self, generator: &dyn ChunkGenerator) -> bool {
        if self.octree.is_some() {
            return false;
        }

        self.octree = Some(VoxelOctree::build(self.position, generator));
        self.state = ChunkState::Initializing;
        true
    }

    /// Moves the chunk to `position`, dropping its octree.
    ///
    /// The mesh and buffers are kept so the previous geometry stays visible
    /// until [`Chunk::apply_mesh`] replaces it.
    pub fn reassign(&mut self, position: Point3<i32>) {
        self.position = position;
        self.octree = None;
        self.state = ChunkState::Stale;
    }

    /// Drops the octree. Buffers stay reserved for the slot.
    pub fn free(&mut self) {
        self.octree = None;
        self.mesh_size = 0;
        self.state = ChunkState::Empty;
    }

    /// Meshes the current octree, stitching boundary faces through `neighbors`.
    ///
    /// # Panics
    /// Panics if the chunk has not been generated since its last reassignment.
    pub fn build_mesh(&self, neighbors: &dyn NeighborProbe) -> Mesh {
        let Some(octree) = &self.octree else {
            panic!("chunk {:?} meshed before its octree was generated", self.position);
        };
        meshing::build_mesh(octree, neighbors)
    }

    /// Uploads `mesh` as this chunk's geometry at its current position.
    ///
    /// An empty mesh leaves the buffers untouched and only zeroes the size.
    pub fn apply_mesh(&mut self, mesh: &Mesh, uploader: &mut dyn MeshUploader) {
        if !mesh.is_empty() {
            uploader.upload(self.buffers.vertex_buffer, &mesh.vertices);
            uploader.upload(self.buffers.normal_buffer, &mesh.normals);
        }
        self.mesh_size = mesh.vertex_count() as u32;
        self.mesh_position = self.position;
        self.state = ChunkState::Ready;
    }

    /// The draw call for the currently uploaded mesh, if it has any vertices.
    pub fn draw_info(&self) -> Option<ChunkDraw> {
        (self.mesh_size > 0).then_some(ChunkDraw {
            position: self.mesh_position,
            vertex_buffer: self.buffers.vertex_buffer,
            normal_buffer: self.buffers.normal_buffer,
            mesh_size: self.mesh_size,
        })
    }

    /// The octree, if generated for the current position.
    pub fn octree(&self) -> Option<&VoxelOctree> {
        self.octree.as_ref()
    }

    /// Whether the octree has to be rebuilt before meshing.
    pub fn needs_generation(&self) -> bool {
        self.octree.is_none()
    }

    /// Vertex count of the uploaded mesh.
    pub fn mesh_size(&self) -> u32 {
        self.mesh_size
    }

    /// Position the uploaded mesh was built for.
    pub fn mesh_position(&self) -> Point3<i32> {
        self.mesh_position
    }

    /// The GPU buffers owned by this chunk.
    pub fn buffers(&self) -> ChunkBuffers {
        self.buffers
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ChunkState {
        self.state
    }
}
