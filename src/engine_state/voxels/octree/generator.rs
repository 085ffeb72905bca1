//! Procedural rules that decide, node by node, what an octree contains.
//!
//! A generator is asked once per visited node whether that node's cube is a
//! single block type or must be split into octants. Available strategies:
//! - Checkerboard: the alternating reference pattern, for testing
//! - Perlin noise: natural-looking terrain with caves and overhangs
//! - Solid / empty: a single root leaf

use cgmath::Point3;
use noise::{NoiseFn, Perlin};

use super::{OctantBounds, MAX_OCTREE_DEPTH};
use crate::engine_state::voxels::block::block_type::BlockType;
use crate::engine_state::voxels::chunk::CHUNK_DIMENSION;

/// Threshold above which Perlin noise is considered solid for terrain generation.
pub const PERLIN_POSITIVE_THRESHOLD: f64 = 0.2;
/// Threshold below which Perlin noise is considered solid for terrain generation.
pub const PERLIN_NEGATIVE_THRESHOLD: f64 = -0.2;
/// Scaling factor applied to world coordinates when sampling Perlin noise.
pub const PERLIN_SCALE_FACTOR: f64 = 0.02;

/// A generator's answer for one octree node.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Subdivision {
    /// The whole cube is this block type.
    Leaf(BlockType),
    /// Split the cube into eight octants and ask again for each.
    Subdivide,
}

/// A pure rule deciding the content of each octree node of a chunk.
///
/// Must answer [`Subdivision::Leaf`] for voxel-sized nodes (depth
/// [`MAX_OCTREE_DEPTH`]).
pub trait ChunkGenerator: Send + Sync {
    /// Decides the content of the node covering `bounds` in the chunk at
    /// `chunk_position` (world-grid chunk coordinates).
    fn generate(&self, chunk_position: Point3<i32>, bounds: OctantBounds) -> Subdivision;
}

impl<F> ChunkGenerator for F
where
    F: Fn(Point3<i32>, OctantBounds) -> Subdivision + Send + Sync,
{
    fn generate(&self, chunk_position: Point3<i32>, bounds: OctantBounds) -> Subdivision {
        self(chunk_position, bounds)
    }
}

/// Alternates solid and air cells in a 3-D checkerboard at a fixed depth.
///
/// At depth 1 this is the reference pattern: octants 0, 3, 5 and 6 are grass,
/// the rest air.
#[derive(Copy, Clone, Debug)]
pub struct CheckerboardGenerator {
    depth: u32,
}

impl CheckerboardGenerator {
    /// Checkerboard whose cells are the nodes at `depth`.
    ///
    /// # Panics
    /// Panics if `depth` is 0 or deeper than [`MAX_OCTREE_DEPTH`].
    pub fn new(depth: u32) -> Self {
        assert!(
            (1..=MAX_OCTREE_DEPTH).contains(&depth),
            "checkerboard depth {} out of range",
            depth
        );
        CheckerboardGenerator { depth }
    }
}

impl Default for CheckerboardGenerator {
    fn default() -> Self {
        CheckerboardGenerator::new(1)
    }
}

impl ChunkGenerator for CheckerboardGenerator {
    fn generate(&self, _chunk_position: Point3<i32>, bounds: OctantBounds) -> Subdivision {
        if bounds.depth < self.depth {
            return Subdivision::Subdivide;
        }

        let cell = bounds.origin / bounds.size;
        if (cell.x + cell.y + cell.z) % 2 == 0 {
            Subdivision::Leaf(BlockType::GRASS)
        } else {
            Subdivision::Leaf(BlockType::AIR)
        }
    }
}

/// Terrain from 3-D Perlin noise sampled at world voxel positions.
///
/// Solid voxels get a random solid block type drawn from a generator seeded by
/// the voxel's world position, so the same chunk always comes out the same.
#[derive(Clone)]
pub struct PerlinGenerator {
    perlin: Perlin,
    seed: u32,
}

impl PerlinGenerator {
    /// Creates a Perlin terrain generator.
    pub fn new(seed: u32) -> Self {
        PerlinGenerator {
            perlin: Perlin::new(seed),
            seed,
        }
    }

    fn world_voxel(chunk_position: Point3<i32>, local: Point3<u32>) -> Point3<i32> {
        let dimension = CHUNK_DIMENSION as i32;
        Point3::new(
            chunk_position.x * dimension + local.x as i32,
            chunk_position.y * dimension + local.y as i32,
            chunk_position.z * dimension + local.z as i32,
        )
    }

    fn to_perlin_pos(pos: Point3<i32>, scale_factor: f64) -> [f64; 3] {
        [
            pos.x as f64 * scale_factor,
            pos.y as f64 * scale_factor,
            pos.z as f64 * scale_factor,
        ]
    }

    fn voxel_seed(&self, pos: Point3<i32>) -> u64 {
        (pos.x as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
            ^ (pos.y as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F)
            ^ (pos.z as u64).wrapping_mul(0x1656_67B1_9E37_79F9)
            ^ self.seed as u64
    }
}

impl ChunkGenerator for PerlinGenerator {
    fn generate(&self, chunk_position: Point3<i32>, bounds: OctantBounds) -> Subdivision {
        if bounds.size > 1 {
            return Subdivision::Subdivide;
        }

        let voxel = Self::world_voxel(chunk_position, bounds.origin);
        let sample = self
            .perlin
            .get(Self::to_perlin_pos(voxel, PERLIN_SCALE_FACTOR));

        if (PERLIN_NEGATIVE_THRESHOLD..=PERLIN_POSITIVE_THRESHOLD).contains(&sample) {
            Subdivision::Leaf(BlockType::AIR)
        } else {
            let mut rng = fastrand::Rng::with_seed(self.voxel_seed(voxel));
            Subdivision::Leaf(BlockType::random_solid(&mut rng))
        }
    }
}

/// Fills every chunk with one block type.
#[derive(Copy, Clone, Debug)]
pub struct SolidGenerator(pub BlockType);

impl ChunkGenerator for SolidGenerator {
    fn generate(&self, _chunk_position: Point3<i32>, _bounds: OctantBounds) -> Subdivision {
        Subdivision::Leaf(self.0)
    }
}

/// Leaves every chunk empty.
#[derive(Copy, Clone, Debug, Default)]
pub struct EmptyGenerator;

impl ChunkGenerator for EmptyGenerator {
    fn generate(&self, _chunk_position: Point3<i32>, _bounds: OctantBounds) -> Subdivision {
        Subdivision::Leaf(BlockType::AIR)
    }
}
