#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Octree Voxel Engine
//!
//! Sparse voxel storage, bitmask meshing and ring-buffered chunk streaming
//! for a wgpu voxel renderer.
//!
//! Each 32³ chunk stores its blocks in an arena octree. Meshes are built by
//! packing every row of voxels along an axis into a `u64` and finding exposed
//! faces with shifts and masks, with the boundary voxels of the six neighbor
//! chunks folded into the same rows so seams are culled too. A fixed cube of
//! chunks follows the viewer; chunks that leave the cube are recycled for the
//! positions entering it and rebuilt on a background worker while the render
//! thread keeps drawing.
//!
//! ## Key Modules
//!
//! * `config` - world settings loaded from JSON
//! * `core` - the shared lock cell chunks live in
//! * `engine_state` - voxels, meshing, the worker and the GPU side
//!
//! ## Usage
//!
//! ```no_run
//! use cgmath::Point3;
//! use octree_voxel_engine::config::WorldConfig;
//! use octree_voxel_engine::engine_state::buffer_state::BufferState;
//! use octree_voxel_engine::engine_state::voxels::world::World;
//!
//! # fn example(device: wgpu::Device, queue: wgpu::Queue) -> Result<(), Box<dyn std::error::Error>> {
//! octree_voxel_engine::init_logging();
//!
//! let config = WorldConfig::from_path("world.json")?;
//! let mut buffer_state = BufferState::new(device, queue);
//! let mut world = World::new(&config, &mut buffer_state)?;
//!
//! // Once per frame, before drawing.
//! world.poll(Point3::new(100.0, 20.0, -40.0), &mut buffer_state);
//! # Ok(())
//! # }
//! ```

use log::info;

pub mod config;
pub mod core;
pub mod engine_state;

pub use config::{ConfigError, GeneratorKind, WorldConfig};
pub use engine_state::voxels::world::{PollOutcome, RenderStats, World};

/// Installs the `env_logger` backend, filtered by `RUST_LOG`.
///
/// Calling it again after a logger is installed does nothing.
pub fn init_logging() {
    let mut log_builder = env_logger::Builder::new();
    let installed = log_builder
        .target(env_logger::Target::Stdout)
        .parse_env("RUST_LOG")
        .try_init()
        .is_ok();

    if installed {
        info!("Logger initialized");
    }
}
