//! # Block Type Module
//!
//! The closed catalog of block kinds. Block types are plain `Copy` values; an
//! octree leaf stores one by value and never owns anything through it.

use num_derive::FromPrimitive;
use num_traits::FromPrimitive as _;

use super::BlockTypeSize;

/// Enumerates all possible block types in the voxel world.
///
/// The discriminant is the block's stable numeric id.
#[repr(u16)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, FromPrimitive)]
pub enum BlockType {
    /// Empty space. The only non-solid block.
    AIR = 0,

    /// Grass, the block used by the reference alternating pattern.
    GRASS = 1,

    /// Plain dirt.
    DIRT = 2,

    /// Stone.
    STONE = 3,

    /// Wood.
    WOOD = 4,
}

/// Every solid block type, in id order.
pub const SOLID_BLOCK_TYPES: [BlockType; 4] = [
    BlockType::GRASS,
    BlockType::DIRT,
    BlockType::STONE,
    BlockType::WOOD,
];

impl BlockType {
    /// The stable numeric id of this block type.
    pub const fn id(self) -> BlockTypeSize {
        self as BlockTypeSize
    }

    /// Whether this block occludes its neighbors and produces faces.
    pub const fn is_solid(self) -> bool {
        !matches!(self, BlockType::AIR)
    }

    /// Looks a block type up by id.
    ///
    /// # Returns
    /// `None` if no block type has that id.
    pub fn from_id(id: BlockTypeSize) -> Option<Self> {
        Self::from_u16(id)
    }

    /// Picks a random solid block type (never AIR) from the given generator.
    pub fn random_solid(rng: &mut fastrand::Rng) -> Self {
        SOLID_BLOCK_TYPES[rng.usize(..SOLID_BLOCK_TYPES.len())]
    }
}
