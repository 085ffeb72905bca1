//! # Mesh Batch Task
//!
//! This module defines the `MeshBatchTask`, the unit of streaming work the
//! world hands to its background worker. A batch is the set of ring slots that
//! were reassigned during one poll.

use std::sync::Arc;

use log::debug;
use web_time::Instant;

use crate::engine_state::rendering::meshing::Mesh;
use crate::engine_state::task_management::task::Task;
use crate::engine_state::voxels::octree::ChunkGenerator;
use crate::engine_state::voxels::world::ChunkRing;

/// Regenerates and remeshes a set of ring slots on the worker thread.
///
/// The batch runs in two passes:
/// 1. every stale slot gets its octree rebuilt, under that slot's write lock
/// 2. every slot is meshed, under read locks on itself and its neighbors
///
/// Generating everything first lets chunks that enter the window together
/// see each other as neighbors when their seams are meshed.
pub struct MeshBatchTask {
    ring: ChunkRing,
    generator: Arc<dyn ChunkGenerator>,
    slots: Vec<usize>,
}

/// The meshes produced by a [`MeshBatchTask`], keyed by ring slot.
pub struct MeshBatchResult {
    /// One mesh per slot of the batch, in batch order.
    pub meshes: Vec<(usize, Mesh)>,
}

impl MeshBatchTask {
    /// Creates a batch over `slots` of `ring`.
    pub fn new(ring: ChunkRing, generator: Arc<dyn ChunkGenerator>, slots: Vec<usize>) -> Self {
        MeshBatchTask {
            ring,
            generator,
            slots,
        }
    }

    /// Ring slots in this batch.
    pub fn slots(&self) -> &[usize] {
        &self.slots
    }
}

impl Task for MeshBatchTask {
    type Output = MeshBatchResult;

    fn process(self) -> MeshBatchResult {
        let start = Instant::now();

        let mut generated = 0;
        for &slot in &self.slots {
            if self.ring.slot(slot).get_mut().generate(&*self.generator) {
                generated += 1;
            }
        }

        let meshes = self
            .slots
            .iter()
            .map(|&slot| (slot, self.ring.build_mesh(slot)))
            .collect();

        debug!(
            "Batch of {} chunks ({} regenerated) processed in {:?}",
            self.slots.len(),
            generated,
            start.elapsed()
        );

        MeshBatchResult { meshes }
    }
}
