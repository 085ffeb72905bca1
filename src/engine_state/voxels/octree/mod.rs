//! # Voxel Octree Module
//!
//! Per-chunk sparse storage of block types. A chunk is a 32³ cube stored as an
//! octree whose nodes live in a flat arena and refer to each other by index.
//! Large uniform regions collapse into a single shallow leaf, so a chunk of
//! all air costs one node rather than 32 768.
//!
//! ## Layout
//!
//! - Children of an interior node are ordered by octant index `x + y * 2 + z * 4`,
//!   where each component is 1 for the upper half of the parent along that axis.
//! - A node at depth `d` covers a cube of side `32 >> d`; depth 5 is the voxel level.
//! - Nodes are pushed in post-order, so dropping the arena frees the whole tree
//!   and no node is ever reachable from two parents.
//!
//! ## Performance Characteristics
//! - **Point lookup**: O(depth), at most 5 steps
//! - **Leaf walk**: proportional to the leaf count, which is what meshing uses

use cgmath::Point3;
use web_time::Instant;

use super::block::block_type::BlockType;
use super::chunk::CHUNK_DIMENSION;

mod generator;

pub use generator::*;

/// Depth of voxel-sized leaves (`32 >> 5 == 1`).
pub const MAX_OCTREE_DEPTH: u32 = 5;

/// Index of a node inside a [`VoxelOctree`] arena.
pub type NodeId = u32;

/// A node of the octree: either a leaf holding one block type for its whole
/// cube, or an interior node with exactly eight children.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VoxelNode {
    /// Uniform cube of a single block type.
    Leaf(BlockType),
    /// Eight children, one per octant.
    Interior([NodeId; 8]),
}

/// The cube covered by one octree node, in chunk-local voxel coordinates.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct OctantBounds {
    /// Depth of the node (0 is the chunk root).
    pub depth: u32,
    /// Lowest corner of the cube.
    pub origin: Point3<u32>,
    /// Edge length of the cube in voxels.
    pub size: u32,
}

impl OctantBounds {
    /// Bounds of the chunk root.
    pub fn root() -> Self {
        OctantBounds {
            depth: 0,
            origin: Point3::new(0, 0, 0),
            size: CHUNK_DIMENSION as u32,
        }
    }

    /// Bounds of child `index` (`x + y * 2 + z * 4`).
    pub fn octant(&self, index: usize) -> Self {
        debug_assert!(index < 8);
        let half = self.size / 2;
        OctantBounds {
            depth: self.depth + 1,
            origin: Point3::new(
                self.origin.x + (index & 1) as u32 * half,
                self.origin.y + ((index >> 1) & 1) as u32 * half,
                self.origin.z + ((index >> 2) & 1) as u32 * half,
            ),
            size: half,
        }
    }

    /// Whether the cube contains the local voxel `(x, y, z)`.
    pub fn contains(&self, x: u32, y: u32, z: u32) -> bool {
        (self.origin.x..self.origin.x + self.size).contains(&x)
            && (self.origin.y..self.origin.y + self.size).contains(&y)
            && (self.origin.z..self.origin.z + self.size).contains(&z)
    }
}

/// Sparse block storage for one chunk.
#[derive(Clone, Debug)]
pub struct VoxelOctree {
    nodes: Vec<VoxelNode>,
    root: NodeId,
}

impl VoxelOctree {
    /// Builds the tree for the chunk at `chunk_position` by asking `generator`
    /// about every node, starting from the root.
    ///
    /// An interior node whose eight children all come back as leaves of the
    /// same block type is collapsed into a single leaf.
    ///
    /// # Panics
    /// Panics if the generator asks to subdivide a voxel-sized node.
    pub fn build(chunk_position: Point3<i32>, generator: &dyn ChunkGenerator) -> Self {
        let start = Instant::now();
        let mut nodes = Vec::new();
        let root = Self::build_node(&mut nodes, chunk_position, generator, OctantBounds::root());

        log::trace!(
            "Built octree for chunk {:?}: {} nodes in {:?}",
            chunk_position,
            nodes.len(),
            start.elapsed()
        );

        VoxelOctree { nodes, root }
    }

    /// A tree consisting of a single root leaf.
    pub fn uniform(block_type: BlockType) -> Self {
        VoxelOctree {
            nodes: vec![VoxelNode::Leaf(block_type)],
            root: 0,
        }
    }

    fn build_node(
        nodes: &mut Vec<VoxelNode>,
        chunk_position: Point3<i32>,
        generator: &dyn ChunkGenerator,
        bounds: OctantBounds,
    ) -> NodeId {
        match generator.generate(chunk_position, bounds) {
            Subdivision::Leaf(block_type) => Self::push(nodes, VoxelNode::Leaf(block_type)),
            Subdivision::Subdivide => {
                assert!(
                    bounds.depth < MAX_OCTREE_DEPTH,
                    "generator asked to subdivide a voxel-sized node at {:?}",
                    bounds.origin
                );

                let first_child = nodes.len();
                let mut children: [NodeId; 8] = [0; 8];
                for (index, child) in children.iter_mut().enumerate() {
                    *child = Self::build_node(nodes, chunk_position, generator, bounds.octant(index));
                }

                match Self::uniform_leaf(nodes, &children) {
                    Some(block_type) => {
                        nodes.truncate(first_child);
                        Self::push(nodes, VoxelNode::Leaf(block_type))
                    }
                    None => Self::push(nodes, VoxelNode::Interior(children)),
                }
            }
        }
    }

    fn uniform_leaf(nodes: &[VoxelNode], children: &[NodeId; 8]) -> Option<BlockType> {
        let first = match nodes[children[0] as usize] {
            VoxelNode::Leaf(block_type) => block_type,
            VoxelNode::Interior(_) => return None,
        };

        children[1..]
            .iter()
            .all(|&child| nodes[child as usize] == VoxelNode::Leaf(first))
            .then_some(first)
    }

    fn push(nodes: &mut Vec<VoxelNode>, node: VoxelNode) -> NodeId {
        nodes.push(node);
        (nodes.len() - 1) as NodeId
    }

    /// Returns the block type at the local voxel `(x, y, z)`.
    ///
    /// Descends from the root, picking the octant by comparing each coordinate
    /// against half of the current cube, and stops at the first leaf.
    ///
    /// # Panics
    /// Panics if any coordinate is outside `0..32`.
    pub fn get_block(&self, x: usize, y: usize, z: usize) -> BlockType {
        assert!(
            x < CHUNK_DIMENSION && y < CHUNK_DIMENSION && z < CHUNK_DIMENSION,
            "local voxel coordinate ({}, {}, {}) outside the chunk",
            x,
            y,
            z
        );

        let mut node = self.root;
        let mut size = CHUNK_DIMENSION;
        loop {
            match self.nodes[node as usize] {
                VoxelNode::Leaf(block_type) => return block_type,
                VoxelNode::Interior(children) => {
                    let half = size / 2;
                    let octant = (x % size >= half) as usize
                        + (y % size >= half) as usize * 2
                        + (z % size >= half) as usize * 4;
                    node = children[octant];
                    size = half;
                }
            }
        }
    }

    /// Whether the block at the local voxel `(x, y, z)` is solid.
    pub fn is_solid(&self, x: usize, y: usize, z: usize) -> bool {
        self.get_block(x, y, z).is_solid()
    }

    /// The root's block type if the whole chunk is a single leaf.
    pub fn root_block(&self) -> Option<BlockType> {
        match self.nodes[self.root as usize] {
            VoxelNode::Leaf(block_type) => Some(block_type),
            VoxelNode::Interior(_) => None,
        }
    }

    /// Calls `visit` once per leaf with the cube it covers and its block type.
    pub fn for_each_leaf(&self, mut visit: impl FnMut(OctantBounds, BlockType)) {
        self.visit_node(self.root, OctantBounds::root(), &mut visit);
    }

    fn visit_node(
        &self,
        node: NodeId,
        bounds: OctantBounds,
        visit: &mut impl FnMut(OctantBounds, BlockType),
    ) {
        match self.nodes[node as usize] {
            VoxelNode::Leaf(block_type) => visit(bounds, block_type),
            VoxelNode::Interior(children) => {
                for (index, child) in children.into_iter().enumerate() {
                    self.visit_node(child, bounds.octant(index), visit);
                }
            }
        }
    }

    /// Total number of nodes in the arena.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of leaf nodes.
    pub fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| matches!(node, VoxelNode::Leaf(_)))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn origin() -> Point3<i32> {
        Point3::new(0, 0, 0)
    }

    fn dense_reference(
        chunk_position: Point3<i32>,
        generator: &dyn ChunkGenerator,
    ) -> Vec<BlockType> {
        let mut dense = vec![BlockType::AIR; CHUNK_DIMENSION.pow(3)];
        fill_dense(&mut dense, chunk_position, generator, OctantBounds::root());
        dense
    }

    fn fill_dense(
        dense: &mut [BlockType],
        chunk_position: Point3<i32>,
        generator: &dyn ChunkGenerator,
        bounds: OctantBounds,
    ) {
        match generator.generate(chunk_position, bounds) {
            Subdivision::Leaf(block_type) => {
                for z in bounds.origin.z..bounds.origin.z + bounds.size {
                    for y in bounds.origin.y..bounds.origin.y + bounds.size {
                        for x in bounds.origin.x..bounds.origin.x + bounds.size {
                            let index = x as usize
                                + y as usize * CHUNK_DIMENSION
                                + z as usize * CHUNK_DIMENSION * CHUNK_DIMENSION;
                            dense[index] = block_type;
                        }
                    }
                }
            }
            Subdivision::Subdivide => {
                for index in 0..8 {
                    fill_dense(dense, chunk_position, generator, bounds.octant(index));
                }
            }
        }
    }

    fn assert_matches_dense(chunk_position: Point3<i32>, generator: &dyn ChunkGenerator) {
        let octree = VoxelOctree::build(chunk_position, generator);
        let dense = dense_reference(chunk_position, generator);

        for z in 0..CHUNK_DIMENSION {
            for y in 0..CHUNK_DIMENSION {
                for x in 0..CHUNK_DIMENSION {
                    let expected = dense[x + y * CHUNK_DIMENSION + z * CHUNK_DIMENSION * CHUNK_DIMENSION];
                    assert_eq!(octree.get_block(x, y, z), expected, "at ({}, {}, {})", x, y, z);
                }
            }
        }
    }

    #[test]
    fn test_lookup_matches_dense_checkerboard() {
        for depth in 1..=MAX_OCTREE_DEPTH {
            assert_matches_dense(origin(), &CheckerboardGenerator::new(depth));
        }
    }

    #[test]
    fn test_lookup_matches_dense_perlin() {
        let generator = PerlinGenerator::new(3);
        assert_matches_dense(Point3::new(1, -2, 0), &generator);
    }

    #[test]
    fn test_lookup_matches_dense_mixed_depths() {
        // Solid floor below y = 8, one deep pillar, air elsewhere.
        let generator = |_: Point3<i32>, bounds: OctantBounds| {
            if bounds.origin.y + bounds.size <= 8 {
                Subdivision::Leaf(BlockType::STONE)
            } else if bounds.contains(5, 20, 9) && bounds.size > 1 {
                Subdivision::Subdivide
            } else if bounds.size == 1 && bounds.origin == Point3::new(5, 20, 9) {
                Subdivision::Leaf(BlockType::WOOD)
            } else if bounds.origin.y < 8 {
                Subdivision::Subdivide
            } else {
                Subdivision::Leaf(BlockType::AIR)
            }
        };
        assert_matches_dense(origin(), &generator);

        let octree = VoxelOctree::build(origin(), &generator);
        assert_eq!(octree.get_block(5, 20, 9), BlockType::WOOD);
        assert_eq!(octree.get_block(31, 0, 31), BlockType::STONE);
        assert_eq!(octree.get_block(0, 31, 0), BlockType::AIR);
    }

    #[test]
    fn test_reference_pattern_octants() {
        let octree = VoxelOctree::build(origin(), &CheckerboardGenerator::default());
        let expected = [
            BlockType::GRASS,
            BlockType::AIR,
            BlockType::AIR,
            BlockType::GRASS,
            BlockType::AIR,
            BlockType::GRASS,
            BlockType::GRASS,
            BlockType::AIR,
        ];
        for (index, block_type) in expected.into_iter().enumerate() {
            let origin = OctantBounds::root().octant(index).origin;
            assert_eq!(
                octree.get_block(origin.x as usize, origin.y as usize, origin.z as usize),
                block_type
            );
        }
        assert_eq!(octree.node_count(), 9);
        assert_eq!(octree.leaf_count(), 8);
    }

    #[test]
    fn test_uniform_children_collapse() {
        let generator = |_: Point3<i32>, bounds: OctantBounds| {
            if bounds.depth < 2 {
                Subdivision::Subdivide
            } else {
                Subdivision::Leaf(BlockType::DIRT)
            }
        };
        let octree = VoxelOctree::build(origin(), &generator);
        assert_eq!(octree.root_block(), Some(BlockType::DIRT));
        assert_eq!(octree.node_count(), 1);
    }

    #[test]
    fn test_generator_called_once_per_node() {
        let calls = AtomicUsize::new(0);
        let generator = |_: Point3<i32>, bounds: OctantBounds| {
            calls.fetch_add(1, Ordering::Relaxed);
            if bounds.depth < 2 {
                Subdivision::Subdivide
            } else if bounds.origin.x == 0 {
                Subdivision::Leaf(BlockType::GRASS)
            } else {
                Subdivision::Leaf(BlockType::AIR)
            }
        };
        VoxelOctree::build(origin(), &generator);
        assert_eq!(calls.load(Ordering::Relaxed), 1 + 8 + 64);
    }

    #[test]
    fn test_for_each_leaf_covers_chunk() {
        let octree = VoxelOctree::build(origin(), &CheckerboardGenerator::new(3));
        let mut volume = 0;
        let mut leaves = 0;
        octree.for_each_leaf(|bounds, _| {
            volume += bounds.size.pow(3);
            leaves += 1;
        });
        assert_eq!(volume as usize, CHUNK_DIMENSION.pow(3));
        assert_eq!(leaves, octree.leaf_count());
    }

    #[test]
    #[should_panic(expected = "outside the chunk")]
    fn test_out_of_range_lookup_panics() {
        VoxelOctree::uniform(BlockType::AIR).get_block(0, 32, 0);
    }

    #[test]
    #[should_panic(expected = "voxel-sized node")]
    fn test_subdividing_past_max_depth_panics() {
        let generator = |_: Point3<i32>, _: OctantBounds| Subdivision::Subdivide;
        VoxelOctree::build(origin(), &generator);
    }
}
