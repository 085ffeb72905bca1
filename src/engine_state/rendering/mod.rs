//! Rendering system for the voxel engine.
//!
//! This module contains the CPU-side mesh generation and the wgpu draw path
//! for chunk meshes.

pub mod meshing;
pub mod renderer;

// Re-export commonly used types
pub use meshing::{build_mesh, Mesh, NeighborProbe, NoNeighbors};
pub use renderer::{ChunkDraw, ChunkDrawer, ChunkPipeline, ChunkRenderPass};
