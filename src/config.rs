//! # World Configuration
//!
//! Startup settings of the streamed world, loadable from JSON. Every field has
//! a default, so a partial document (or `{}`) is a valid configuration.
//!
//! ```
//! use octree_voxel_engine::config::{GeneratorKind, WorldConfig};
//!
//! let config = WorldConfig::from_json_str(r#"{ "render_distance": 4, "generator": "perlin" }"#)?;
//! assert_eq!(config.render_distance, 4);
//! assert_eq!(config.generator, GeneratorKind::Perlin);
//! assert_eq!(config.seed, 0);
//! # Ok::<(), octree_voxel_engine::config::ConfigError>(())
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine_state::voxels::block::block_type::BlockType;
use crate::engine_state::voxels::octree::{
    CheckerboardGenerator, ChunkGenerator, EmptyGenerator, PerlinGenerator, SolidGenerator,
    MAX_OCTREE_DEPTH,
};
use crate::engine_state::DEFAULT_RENDER_DISTANCE;

/// Errors raised while loading a [`WorldConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },

    /// The document is not valid JSON for a configuration.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// The document parsed but describes an unusable world.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Which built-in generator fills new chunks.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorKind {
    /// Alternating solid and air cells.
    #[default]
    Checkerboard,
    /// Perlin noise terrain.
    Perlin,
    /// Every chunk completely stone.
    Solid,
    /// Every chunk completely air.
    Empty,
}

/// Startup settings of the streamed world.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Edge length of the loaded cube of chunks.
    pub render_distance: usize,
    /// Generator used for every chunk.
    pub generator: GeneratorKind,
    /// Seed of the Perlin generator.
    pub seed: u32,
    /// Depth of the checkerboard cells; 1 gives 16³ cells.
    pub checkerboard_depth: u32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        WorldConfig {
            render_distance: DEFAULT_RENDER_DISTANCE,
            generator: GeneratorKind::default(),
            seed: 0,
            checkerboard_depth: 1,
        }
    }
}

impl WorldConfig {
    /// Parses and validates a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: WorldConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        WorldConfig::from_json_str(&json)
    }

    /// Rejects settings the world cannot be built with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.render_distance == 0 {
            return Err(ConfigError::Invalid(
                "render_distance must be at least 1".to_string(),
            ));
        }
        if !(1..=MAX_OCTREE_DEPTH).contains(&self.checkerboard_depth) {
            return Err(ConfigError::Invalid(format!(
                "checkerboard_depth must be between 1 and {}, got {}",
                MAX_OCTREE_DEPTH, self.checkerboard_depth
            )));
        }
        Ok(())
    }

    /// The generator these settings describe.
    pub fn build_generator(&self) -> Arc<dyn ChunkGenerator> {
        match self.generator {
            GeneratorKind::Checkerboard => {
                Arc::new(CheckerboardGenerator::new(self.checkerboard_depth))
            }
            kind => kind.build(self.seed),
        }
    }
}

impl GeneratorKind {
    /// Builds the generator with default parameters.
    pub fn build(self, seed: u32) -> Arc<dyn ChunkGenerator> {
        match self {
            GeneratorKind::Checkerboard => Arc::new(CheckerboardGenerator::default()),
            GeneratorKind::Perlin => Arc::new(PerlinGenerator::new(seed)),
            GeneratorKind::Solid => Arc::new(SolidGenerator(BlockType::STONE)),
            GeneratorKind::Empty => Arc::new(EmptyGenerator),
        }
    }
}
