//! # Voxel Task System
//!
//! Tasks executed on the world's background worker. The only one is the
//! streaming batch that regenerates and remeshes chunks that entered the
//! render window.

pub mod mesh_batch_task;

pub use mesh_batch_task::{MeshBatchResult, MeshBatchTask};
