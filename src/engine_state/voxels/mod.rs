//! # Voxel Engine Core
//!
//! This module contains the voxel data model and the streaming world built on
//! top of it.
//!
//! ## Architecture
//!
//! The voxel system is organized into several key components:
//!
//! * **Block**: block types and the axis/face vocabulary
//! * **Octree**: the sparse per-chunk storage and the generators that fill it
//! * **Chunk**: one 32³ slot of the world, owning an octree and its GPU buffers
//! * **World**: the ring of chunks kept around the viewer
//! * **Tasks**: the batch of chunk rebuilds run on the background worker
//!
//! ## Data Flow
//!
//! 1. The viewer crosses a chunk boundary
//! 2. The world reassigns the slots that left the window and marks them stale
//! 3. A batch task regenerates their octrees and meshes them
//! 4. The world uploads the meshes on the next poll
//!
//! ## Thread Safety
//!
//! Every chunk sits behind its own lock. The worker writes a chunk only while
//! regenerating it; the render thread only ever try-locks chunks for drawing.

pub mod block;
pub mod chunk;
pub mod octree;
pub mod tasks;
pub mod world;
