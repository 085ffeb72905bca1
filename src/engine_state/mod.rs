//! # Engine State Module
//!
//! The core engine module holding the state and functionality of the voxel
//! engine.
//!
//! ## Key Components
//!
//! * `buffer_state` - GPU buffers chunk meshes are uploaded to
//! * `rendering` - mesh generation and the chunk draw path
//! * `task_management` - the background worker the world streams through
//! * `voxels` - blocks, octrees, chunks and the streamed world
//!
//! ## Threads
//!
//! Two threads touch engine state. The render thread polls the world, uploads
//! finished meshes and draws; the worker thread regenerates and meshes chunks.
//! GPU objects never leave the render thread.

pub mod buffer_state;
pub mod rendering;
pub mod task_management;
pub mod voxels;

#[cfg(test)]
pub(crate) mod testing;

/// Default edge length of the loaded cube of chunks.
pub const DEFAULT_RENDER_DISTANCE: usize = 8;
