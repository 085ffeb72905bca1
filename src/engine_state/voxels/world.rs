//! # World Module
//!
//! This module provides the `World` struct, the streaming controller that keeps
//! a fixed cube of chunks loaded around a moving viewer.
//!
//! ## Architecture
//!
//! The world stores `render_distance³` chunk slots in a toroidal ring: world
//! chunk position `p` always lives in slot `p mod render_distance` per axis.
//! When the viewer crosses a chunk boundary, the slots that fall out of the
//! window on one side are reassigned to the positions entering it on the
//! other, and a single background worker regenerates and remeshes them.
//!
//! ## Frame Protocol
//!
//! 1. `poll` returns immediately while the worker is busy
//! 2. otherwise it uploads the finished batch, if any
//! 3. scans the shell of the window for slots holding the wrong position
//! 4. reassigns those and dispatches them as one batch
//!
//! `render` only ever try-locks chunks, so it never waits on the worker: a
//! chunk being rebuilt is skipped for that frame.
//!
//! If a batch panics the worker is gone for good. `poll` then reports
//! [`PollOutcome::Stopped`] and every chunk keeps the mesh it last had.
//!
//! ## Streaming Lag
//!
//! Only shell cells are examined per poll. When the viewer moves by more than
//! one cell between polls, interior cells of the new window may still hold
//! positions from the old one; they are corrected once later movement brings
//! them onto the shell. The ring invariant (slot congruence) holds regardless.

use std::sync::{Arc, RwLockReadGuard};

use cgmath::{Point3, Vector3};
use log::{debug, info, warn};
use web_time::Instant;

use crate::config::{ConfigError, WorldConfig};
use crate::core::MtResource;
use crate::engine_state::buffer_state::MeshUploader;
use crate::engine_state::rendering::meshing::{Mesh, NeighborOctrees};
use crate::engine_state::rendering::renderer::ChunkDrawer;
use crate::engine_state::task_management::TaskWorker;
use crate::engine_state::voxels::block::block_side::BlockSide;
use crate::engine_state::voxels::chunk::{Chunk, ChunkBuffers, CHUNK_DIMENSION};
use crate::engine_state::voxels::octree::ChunkGenerator;
use crate::engine_state::voxels::tasks::{MeshBatchResult, MeshBatchTask};

/// Name of the streaming worker thread.
pub const WORLD_WORKER_NAME: &str = "chunk-streaming";

/// The ring of chunk slots, shared between the world and its worker.
///
/// Cloning is cheap and yields a handle to the same slots.
#[derive(Clone)]
pub struct ChunkRing {
    render_distance: usize,
    slots: Arc<[MtResource<Chunk>]>,
}

impl ChunkRing {
    /// Edge length of the ring in chunks.
    pub fn render_distance(&self) -> usize {
        self.render_distance
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the ring has no slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The slot at `index`.
    pub fn slot(&self, index: usize) -> &MtResource<Chunk> {
        &self.slots[index]
    }

    /// All slots in index order.
    pub fn slots(&self) -> &[MtResource<Chunk>] {
        &self.slots
    }

    /// Per-axis slot coordinates of a world chunk position.
    pub fn slot_coordinates(&self, position: Point3<i32>) -> Point3<usize> {
        let rd = self.render_distance as i32;
        Point3::new(
            position.x.rem_euclid(rd) as usize,
            position.y.rem_euclid(rd) as usize,
            position.z.rem_euclid(rd) as usize,
        )
    }

    /// Index of the slot that holds world chunk position `position`.
    pub fn slot_index(&self, position: Point3<i32>) -> usize {
        let coordinates = self.slot_coordinates(position);
        self.index_of(coordinates)
    }

    fn index_of(&self, coordinates: Point3<usize>) -> usize {
        let rd = self.render_distance;
        coordinates.x + coordinates.y * rd + coordinates.z * rd * rd
    }

    /// Per-axis slot coordinates of slot `index`.
    pub fn coordinates_of(&self, index: usize) -> Point3<usize> {
        let rd = self.render_distance;
        Point3::new(index % rd, index / rd % rd, index / (rd * rd))
    }

    /// The position slot `index` should hold when the viewer is in `viewer_cell`.
    pub fn window_position(&self, viewer_cell: Point3<i32>, index: usize) -> Point3<i32> {
        let rd = self.render_distance as i32;
        let base = viewer_cell - Vector3::new(rd / 2, rd / 2, rd / 2);
        let coordinates = self.coordinates_of(index);
        let wrap = |base: i32, slot: usize| base + (slot as i32 - base).rem_euclid(rd);
        Point3::new(
            wrap(base.x, coordinates.x),
            wrap(base.y, coordinates.y),
            wrap(base.z, coordinates.z),
        )
    }

    /// Meshes the chunk in slot `index` with its loaded face neighbors.
    ///
    /// Takes read locks on the chunk and on each neighbor slot that currently
    /// holds the adjacent position. A neighbor that is missing or not generated
    /// counts as air.
    pub fn build_mesh(&self, index: usize) -> Mesh {
        let chunk = self.slots[index].get();
        let position = chunk.position;

        let mut guards: Vec<(usize, RwLockReadGuard<'_, Chunk>)> = Vec::with_capacity(6);
        for side in BlockSide::all() {
            let neighbor_slot = self.slot_index(position + Vector3::from(side.normal()));
            if neighbor_slot == index || guards.iter().any(|(slot, _)| *slot == neighbor_slot) {
                continue;
            }
            guards.push((neighbor_slot, self.slots[neighbor_slot].get()));
        }

        let mut neighbors = NeighborOctrees::new();
        for side in BlockSide::all() {
            let neighbor_position = position + Vector3::from(side.normal());
            let octree = guards
                .iter()
                .map(|(_, guard)| &**guard)
                .find(|neighbor| neighbor.position == neighbor_position)
                .and_then(Chunk::octree);
            neighbors.set(side, octree);
        }

        chunk.build_mesh(&neighbors)
    }

    /// Reassigns every shell slot whose position does not match the window
    /// around `viewer_cell` and returns the reassigned slot indices.
    fn reassign_shell(&self, viewer_cell: Point3<i32>) -> Vec<usize> {
        let rd = self.render_distance;
        let last = rd - 1;
        let half = (rd / 2) as i32;
        let mut stale = Vec::new();

        for x in 0..rd {
            for y in 0..rd {
                for z in 0..rd {
                    let on_shell = [x, y, z].iter().any(|&offset| offset == 0 || offset == last);
                    if !on_shell {
                        continue;
                    }

                    let target = Point3::new(
                        viewer_cell.x + x as i32 - half,
                        viewer_cell.y + y as i32 - half,
                        viewer_cell.z + z as i32 - half,
                    );
                    let slot = self.slot_index(target);
                    let mut chunk = self.slots[slot].get_mut();
                    if chunk.position != target {
                        debug!("Slot {} moves from {:?} to {:?}", slot, chunk.position, target);
                        chunk.reassign(target);
                        stale.push(slot);
                    }
                }
            }
        }

        stale
    }
}

/// What a call to [`World::poll`] did.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PollOutcome {
    /// The worker is still processing the previous batch.
    Busy,
    /// Every shell slot already holds its window position.
    Idle,
    /// A batch with this many chunks was handed to the worker.
    Dispatched(usize),
    /// The worker is gone (a batch panicked); nothing streams any more.
    Stopped,
}

/// Counts from one [`World::render`] call.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Chunks a draw call was issued for.
    pub drawn: usize,
    /// Chunks with nothing to draw.
    pub empty: usize,
    /// Chunks skipped because another thread held their lock.
    pub skipped: usize,
}

/// Represents the streamed voxel world around a viewer.
///
/// # Examples
///
/// ```no_run
/// # use octree_voxel_engine::engine_state::buffer_state::MeshUploader;
/// # use octree_voxel_engine::engine_state::rendering::ChunkDrawer;
/// # fn frame(
/// #     uploader: &mut dyn MeshUploader,
/// #     drawer: &mut dyn ChunkDrawer,
/// # ) -> Result<(), octree_voxel_engine::config::ConfigError> {
/// use cgmath::Point3;
/// use octree_voxel_engine::config::WorldConfig;
/// use octree_voxel_engine::engine_state::voxels::world::World;
///
/// let mut world = World::new(&WorldConfig::default(), uploader)?;
/// world.poll(Point3::new(40.0, 3.0, -12.0), uploader);
/// world.render(drawer);
/// world.shutdown();
/// # Ok(())
/// # }
/// ```
pub struct World {
    ring: ChunkRing,
    generator: Arc<dyn ChunkGenerator>,
    worker: TaskWorker<MeshBatchTask>,
    viewer_cell: Point3<i32>,
    stopped: bool,
}

impl World {
    /// Creates the world described by `config`.
    ///
    /// The config is validated first; nothing is allocated for an invalid one.
    pub fn new(
        config: &WorldConfig,
        uploader: &mut dyn MeshUploader,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(World::with_generator(
            config.render_distance,
            config.build_generator(),
            uploader,
        ))
    }

    /// Creates a world of `render_distance³` chunks around cell `(0, 0, 0)`.
    ///
    /// Every chunk is generated, meshed and uploaded before this returns.
    ///
    /// # Panics
    /// Panics if `render_distance` is 0.
    pub fn with_generator(
        render_distance: usize,
        generator: Arc<dyn ChunkGenerator>,
        uploader: &mut dyn MeshUploader,
    ) -> Self {
        assert!(render_distance > 0, "render distance must be at least 1");

        let start = Instant::now();
        let viewer_cell = Point3::new(0, 0, 0);
        let slot_count = render_distance.pow(3);

        let mut ring = ChunkRing {
            render_distance,
            slots: Arc::from(Vec::new()),
        };
        let slots: Vec<MtResource<Chunk>> = (0..slot_count)
            .map(|index| {
                let position = ring.window_position(viewer_cell, index);
                let buffers = ChunkBuffers::create(uploader, index);
                MtResource::new(Chunk::init(position, buffers, &*generator))
            })
            .collect();
        ring.slots = Arc::from(slots);

        for index in 0..slot_count {
            let mesh = ring.build_mesh(index);
            ring.slot(index).get_mut().apply_mesh(&mesh, uploader);
        }

        info!(
            "World initialized: {} chunks ({}³) in {:?}",
            slot_count,
            render_distance,
            start.elapsed()
        );

        World {
            ring,
            generator,
            worker: TaskWorker::new(WORLD_WORKER_NAME),
            viewer_cell,
            stopped: false,
        }
    }

    /// The chunk cell containing world position `position`.
    pub fn viewer_cell(position: Point3<f32>) -> Point3<i32> {
        let dimension = CHUNK_DIMENSION as f32;
        Point3::new(
            (position.x / dimension).floor() as i32,
            (position.y / dimension).floor() as i32,
            (position.z / dimension).floor() as i32,
        )
    }

    /// Advances streaming by one frame.
    ///
    /// Never blocks on the worker. Uploads happen here, on the caller's
    /// thread, before any of the uploaded chunks can be drawn with their new
    /// size.
    pub fn poll(&mut self, viewer: Point3<f32>, uploader: &mut dyn MeshUploader) -> PollOutcome {
        if self.worker.is_busy() {
            return PollOutcome::Busy;
        }

        if let Some(result) = self.worker.try_take_result() {
            self.upload_batch(result, uploader);
        }

        if !self.worker.is_alive() {
            self.mark_stopped();
            return PollOutcome::Stopped;
        }

        let viewer_cell = World::viewer_cell(viewer);
        if viewer_cell != self.viewer_cell {
            debug!("Viewer moved from cell {:?} to {:?}", self.viewer_cell, viewer_cell);
            self.viewer_cell = viewer_cell;
        }

        let stale = self.ring.reassign_shell(viewer_cell);
        if stale.is_empty() {
            return PollOutcome::Idle;
        }

        let count = stale.len();
        let task = MeshBatchTask::new(self.ring.clone(), self.generator.clone(), stale);
        match self.worker.try_publish(task) {
            Ok(()) => {
                info!("Dispatched batch of {} chunks around cell {:?}", count, viewer_cell);
                PollOutcome::Dispatched(count)
            }
            Err(task) => {
                warn!(
                    "Streaming worker unavailable, {} chunks left stale",
                    task.slots().len()
                );
                self.mark_stopped();
                PollOutcome::Stopped
            }
        }
    }

    fn mark_stopped(&mut self) {
        if !self.stopped {
            warn!(
                "Chunk streaming stopped around cell {:?}; stale chunks keep their last mesh",
                self.viewer_cell
            );
            self.stopped = true;
        }
    }

    /// Waits for the in-flight batch, if any, and uploads it.
    ///
    /// Returns whether a batch was uploaded. This blocks; the frame loop uses
    /// [`World::poll`] instead.
    pub fn flush(&mut self, uploader: &mut dyn MeshUploader) -> bool {
        match self.worker.wait_for_result() {
            Some(result) => {
                self.upload_batch(result, uploader);
                true
            }
            None => false,
        }
    }

    fn upload_batch(&mut self, result: MeshBatchResult, uploader: &mut dyn MeshUploader) {
        let count = result.meshes.len();
        for (slot, mesh) in result.meshes {
            let mut chunk = self.ring.slot(slot).get_mut();
            chunk.apply_mesh(&mesh, uploader);
            debug!(
                "Uploaded {} vertices for chunk {:?}",
                mesh.vertex_count(),
                chunk.position
            );
        }
        info!("Uploaded batch of {} chunks", count);
    }

    /// Issues a draw call for every chunk that has geometry and is not locked
    /// by the worker right now.
    pub fn render(&self, drawer: &mut dyn ChunkDrawer) -> RenderStats {
        let mut stats = RenderStats::default();

        for slot in self.ring.slots() {
            let drawn = slot.try_with(|chunk| match chunk.draw_info() {
                Some(draw) => {
                    drawer.draw_chunk(&draw);
                    true
                }
                None => false,
            });

            match drawn {
                Some(true) => stats.drawn += 1,
                Some(false) => stats.empty += 1,
                None => stats.skipped += 1,
            }
        }

        stats
    }

    /// Stops the worker, waiting for an in-flight batch to finish, and frees
    /// every chunk.
    pub fn shutdown(mut self) {
        self.worker.shutdown();
        for slot in self.ring.slots() {
            slot.get_mut().free();
        }
        info!("World shut down");
    }

    /// The slot currently holding `position`, if it does.
    ///
    /// Never blocks: a slot the worker is writing right now reports `None`.
    pub fn chunk_at(&self, position: Point3<i32>) -> Option<MtResource<Chunk>> {
        let slot = self.ring.slot(self.ring.slot_index(position));
        slot.try_with(|chunk| chunk.position == position)
            .unwrap_or(false)
            .then(|| slot.clone())
    }

    /// Positions held by every slot, in slot order.
    ///
    /// Waits on every slot the worker is writing, so this is for inspection
    /// between frames rather than for the frame loop.
    pub fn slot_positions(&self) -> Vec<Point3<i32>> {
        self.ring
            .slots()
            .iter()
            .map(|slot| slot.get().position)
            .collect()
    }

    /// The ring of chunk slots.
    pub fn ring(&self) -> &ChunkRing {
        &self.ring
    }

    /// The viewer cell seen by the last poll.
    pub fn current_viewer_cell(&self) -> Point3<i32> {
        self.viewer_cell
    }

    /// Whether streaming stopped because the worker died.
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Whether a streaming batch is being processed.
    pub fn is_busy(&self) -> bool {
        self.worker.is_busy()
    }

    /// Number of batches handed to the worker so far.
    pub fn batches_dispatched(&self) -> usize {
        self.worker.tasks_dispatched()
    }

    /// Edge length of the loaded cube in chunks.
    pub fn render_distance(&self) -> usize {
        self.ring.render_distance()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::testing::{RecordingDrawer, RecordingUploader};
    use crate::config::GeneratorKind;
    use crate::engine_state::voxels::block::block_type::BlockType;
    use crate::engine_state::voxels::chunk::{ChunkState, CHUNK_PLANE_SIZE};
    use crate::engine_state::voxels::octree::{
        CheckerboardGenerator, OctantBounds, SolidGenerator, Subdivision,
    };
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{mpsc, Barrier};
    use std::thread;
    use std::time::Duration;

    fn checkerboard_world(render_distance: usize, uploader: &mut RecordingUploader) -> World {
        World::with_generator(
            render_distance,
            Arc::new(CheckerboardGenerator::default()),
            uploader,
        )
    }

    fn viewer_in(cell: Point3<i32>) -> Point3<f32> {
        let dimension = CHUNK_DIMENSION as f32;
        Point3::new(
            cell.x as f32 * dimension + 16.0,
            cell.y as f32 * dimension + 16.0,
            cell.z as f32 * dimension + 16.0,
        )
    }

    fn assert_ring_invariant(world: &World) {
        let ring = world.ring();
        for (index, position) in world.slot_positions().into_iter().enumerate() {
            assert_eq!(
                ring.slot_coordinates(position),
                ring.coordinates_of(index),
                "slot {} holds {:?}",
                index,
                position
            );
        }
    }

    /// Polls at `cell` and uploads whatever gets dispatched until idle.
    fn settle(world: &mut World, cell: Point3<i32>, uploader: &mut RecordingUploader) {
        for _ in 0..8 {
            match world.poll(viewer_in(cell), uploader) {
                PollOutcome::Idle => return,
                PollOutcome::Busy | PollOutcome::Dispatched(_) => {
                    world.flush(uploader);
                }
                PollOutcome::Stopped => panic!("streaming stopped at {:?}", cell),
            }
        }
        panic!("world did not settle at {:?}", cell);
    }

    /// A generator that sleeps at every chunk root while `slow` is set.
    fn slow_generator(slow: Arc<AtomicBool>) -> Arc<dyn ChunkGenerator> {
        Arc::new(move |_: Point3<i32>, bounds: OctantBounds| {
            if bounds.depth == 0 && slow.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(50));
            }
            Subdivision::Leaf(BlockType::GRASS)
        })
    }

    #[test]
    fn test_init_fills_ring_around_origin() {
        let mut uploader = RecordingUploader::default();
        let world = checkerboard_world(3, &mut uploader);

        assert_ring_invariant(&world);
        let positions = world.slot_positions();
        assert_eq!(positions.len(), 27);
        for position in &positions {
            for component in [position.x, position.y, position.z] {
                assert!((-1..=1).contains(&component), "{:?}", position);
            }
        }
        assert_eq!(uploader.labels.len(), 2 * 27);

        let mut drawer = RecordingDrawer::default();
        let stats = world.render(&mut drawer);
        assert_eq!(stats.drawn, 27);
        assert_eq!(stats.skipped, 0);

        for slot in world.ring().slots() {
            assert_eq!(slot.get().state(), ChunkState::Ready);
        }
        world.shutdown();
    }

    #[test]
    fn test_even_render_distance_window() {
        let mut uploader = RecordingUploader::default();
        let world = checkerboard_world(4, &mut uploader);
        let mut xs: Vec<i32> = world.slot_positions().iter().map(|p| p.x).collect();
        xs.sort_unstable();
        xs.dedup();
        assert_eq!(xs, [-2, -1, 0, 1]);
    }

    #[test]
    fn test_solid_world_culls_shared_seams() {
        let mut uploader = RecordingUploader::default();
        let world = World::with_generator(3, Arc::new(SolidGenerator(BlockType::STONE)), &mut uploader);

        let face_vertices = 6 * CHUNK_PLANE_SIZE as u32;
        let center = world.chunk_at(Point3::new(0, 0, 0)).unwrap();
        assert_eq!(center.get().mesh_size(), 0);

        // A corner chunk only shows its three outward faces.
        let corner = world.chunk_at(Point3::new(-1, 1, -1)).unwrap();
        assert_eq!(corner.get().mesh_size(), 3 * face_vertices);

        // An edge-of-face chunk shows one.
        let face = world.chunk_at(Point3::new(1, 0, 0)).unwrap();
        assert_eq!(face.get().mesh_size(), face_vertices);
    }

    #[test]
    fn test_streamed_batch_culls_shared_seams() {
        let mut uploader = RecordingUploader::default();
        let mut world =
            World::with_generator(3, Arc::new(SolidGenerator(BlockType::STONE)), &mut uploader);

        assert_eq!(
            world.poll(viewer_in(Point3::new(1, 0, 0)), &mut uploader),
            PollOutcome::Dispatched(9)
        );
        assert!(world.flush(&mut uploader));

        // The new x = 2 layer was generated in one batch; its chunks only
        // show faces toward unloaded space.
        let face_vertices = 6 * CHUNK_PLANE_SIZE as u32;
        let middle = world.chunk_at(Point3::new(2, 0, 0)).unwrap();
        assert_eq!(middle.get().mesh_size(), face_vertices);
        let corner = world.chunk_at(Point3::new(2, 1, 1)).unwrap();
        assert_eq!(corner.get().mesh_size(), 3 * face_vertices);
    }

    #[test]
    fn test_ring_invariant_after_random_walk() {
        let mut uploader = RecordingUploader::default();
        let mut world = checkerboard_world(4, &mut uploader);
        let mut rng = fastrand::Rng::with_seed(7);
        let mut cell = Point3::new(0, 0, 0);

        for _ in 0..40 {
            cell.x += rng.i32(-2..=2);
            cell.y += rng.i32(-1..=1);
            cell.z += rng.i32(-3..=3);
            world.poll(viewer_in(cell), &mut uploader);
            assert_ring_invariant(&world);
            world.flush(&mut uploader);
            assert_ring_invariant(&world);
        }
    }

    #[test]
    fn test_single_cell_steps_keep_window_exact() {
        let mut uploader = RecordingUploader::default();
        let mut world = checkerboard_world(4, &mut uploader);
        let steps = [
            Point3::new(1, 0, 0),
            Point3::new(2, 0, 0),
            Point3::new(2, -1, 0),
            Point3::new(2, -1, 1),
            Point3::new(1, -1, 1),
        ];

        for cell in steps {
            settle(&mut world, cell, &mut uploader);
            for (index, position) in world.slot_positions().into_iter().enumerate() {
                assert_eq!(position, world.ring().window_position(cell, index));
            }
            assert_eq!(world.current_viewer_cell(), cell);
        }
    }

    #[test]
    fn test_teleport_converges_shell_first() {
        let mut uploader = RecordingUploader::default();
        let mut world = checkerboard_world(4, &mut uploader);
        let target = Point3::new(10, 0, 0);

        settle(&mut world, target, &mut uploader);
        assert_ring_invariant(&world);

        let ring = world.ring().clone();
        let mut interior_lagging = 0;
        for (index, position) in world.slot_positions().into_iter().enumerate() {
            if position == ring.window_position(target, index) {
                continue;
            }
            let coordinates = ring.coordinates_of(index);
            let offsets = [
                coordinates.x as i32 - (target.x - 2),
                coordinates.y as i32 - (target.y - 2),
                coordinates.z as i32 - (target.z - 2),
            ]
            .map(|offset| offset.rem_euclid(4));
            assert!(
                offsets.iter().all(|&offset| offset == 1 || offset == 2),
                "shell slot {} still holds {:?}",
                index,
                position
            );
            interior_lagging += 1;
        }
        assert!(interior_lagging > 0);
        assert_eq!(world.poll(viewer_in(target), &mut uploader), PollOutcome::Idle);
    }

    #[test]
    fn test_render_skips_chunk_locked_elsewhere() {
        let mut uploader = RecordingUploader::default();
        let world = checkerboard_world(2, &mut uploader);
        let locked = world.chunk_at(Point3::new(0, 0, 0)).unwrap();

        let barrier = Arc::new(Barrier::new(2));
        let (release, released) = mpsc::channel::<()>();
        let holder = {
            let barrier = barrier.clone();
            thread::spawn(move || {
                let _guard = locked.get_mut();
                barrier.wait();
                let _ = released.recv_timeout(Duration::from_secs(10));
            })
        };
        barrier.wait();

        let mut drawer = RecordingDrawer::default();
        let start = Instant::now();
        let stats = world.render(&mut drawer);
        assert!(start.elapsed() < Duration::from_millis(500));
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.drawn, 7);
        assert!(drawer.draws.iter().all(|draw| draw.position != Point3::new(0, 0, 0)));

        release.send(()).unwrap();
        holder.join().unwrap();

        let stats = world.render(&mut RecordingDrawer::default());
        assert_eq!(stats.drawn, 8);
    }

    #[test]
    fn test_poll_while_busy_does_not_dispatch() {
        let slow = Arc::new(AtomicBool::new(false));
        let mut uploader = RecordingUploader::default();
        let mut world = World::with_generator(2, slow_generator(slow.clone()), &mut uploader);
        slow.store(true, Ordering::SeqCst);

        assert_eq!(
            world.poll(viewer_in(Point3::new(1, 0, 0)), &mut uploader),
            PollOutcome::Dispatched(4)
        );
        assert!(world.is_busy());
        assert_eq!(
            world.poll(viewer_in(Point3::new(5, 5, 5)), &mut uploader),
            PollOutcome::Busy
        );
        assert_eq!(world.batches_dispatched(), 1);

        assert!(world.flush(&mut uploader));
        assert!(!world.is_busy());
        slow.store(false, Ordering::SeqCst);

        assert_eq!(
            world.poll(viewer_in(Point3::new(1, 0, 0)), &mut uploader),
            PollOutcome::Idle
        );
        assert_eq!(
            world.poll(viewer_in(Point3::new(2, 0, 0)), &mut uploader),
            PollOutcome::Dispatched(4)
        );
        assert_eq!(world.batches_dispatched(), 2);
        world.flush(&mut uploader);
    }

    #[test]
    fn test_stale_chunks_draw_old_mesh_until_upload() {
        let slow = Arc::new(AtomicBool::new(false));
        let mut uploader = RecordingUploader::default();
        let mut world = World::with_generator(2, slow_generator(slow.clone()), &mut uploader);
        slow.store(true, Ordering::SeqCst);

        world.poll(viewer_in(Point3::new(1, 0, 0)), &mut uploader);
        let mut drawer = RecordingDrawer::default();
        let stats = world.render(&mut drawer);
        assert!(stats.drawn >= 7);
        assert!(drawer.draws.iter().all(|draw| draw.position.x <= 0));

        world.flush(&mut uploader);
        let mut drawer = RecordingDrawer::default();
        assert_eq!(world.render(&mut drawer).drawn, 8);
        assert!(drawer.draws.iter().any(|draw| draw.position.x == 1));
        assert!(drawer.draws.iter().all(|draw| draw.position.x >= 0));
    }

    #[test]
    fn test_empty_mesh_stops_drawing() {
        let generator = |chunk_position: Point3<i32>, _: OctantBounds| {
            if chunk_position.x <= 0 {
                Subdivision::Leaf(BlockType::DIRT)
            } else {
                Subdivision::Leaf(BlockType::AIR)
            }
        };
        let mut uploader = RecordingUploader::default();
        let mut world = World::with_generator(2, Arc::new(generator), &mut uploader);
        assert_eq!(world.render(&mut RecordingDrawer::default()).drawn, 8);
        let writes_before = uploader.writes;

        settle(&mut world, Point3::new(1, 0, 0), &mut uploader);
        let stats = world.render(&mut RecordingDrawer::default());
        assert_eq!(stats.drawn, 4);
        assert_eq!(stats.empty, 4);
        assert_eq!(uploader.writes, writes_before);

        let emptied = world.chunk_at(Point3::new(1, 0, 0)).unwrap();
        assert_eq!(emptied.get().mesh_size(), 0);
        assert_eq!(emptied.get().state(), ChunkState::Ready);
    }

    #[test]
    fn test_viewer_cell_floors() {
        assert_eq!(
            World::viewer_cell(Point3::new(-0.5, 31.9, 64.0)),
            Point3::new(-1, 0, 2)
        );
        assert_eq!(
            World::viewer_cell(Point3::new(-32.0, -32.1, 0.0)),
            Point3::new(-1, -2, 0)
        );
    }

    #[test]
    fn test_chunk_at_checks_slot_position() {
        let mut uploader = RecordingUploader::default();
        let world = checkerboard_world(2, &mut uploader);
        assert!(world.chunk_at(Point3::new(-1, 0, -1)).is_some());
        assert!(world.chunk_at(Point3::new(1, 0, 0)).is_none());
        assert_eq!(world.render_distance(), 2);
    }

    #[test]
    fn test_chunk_at_does_not_wait_for_locked_slot() {
        let mut uploader = RecordingUploader::default();
        let world = checkerboard_world(2, &mut uploader);
        let locked = world.chunk_at(Point3::new(0, 0, 0)).unwrap();

        let barrier = Arc::new(Barrier::new(2));
        let (release, released) = mpsc::channel::<()>();
        let holder = {
            let barrier = barrier.clone();
            thread::spawn(move || {
                let _guard = locked.get_mut();
                barrier.wait();
                let _ = released.recv_timeout(Duration::from_secs(10));
            })
        };
        barrier.wait();

        let start = Instant::now();
        assert!(world.chunk_at(Point3::new(0, 0, 0)).is_none());
        assert!(world.chunk_at(Point3::new(-1, 0, 0)).is_some());
        assert!(start.elapsed() < Duration::from_millis(500));

        release.send(()).unwrap();
        holder.join().unwrap();
        assert!(world.chunk_at(Point3::new(0, 0, 0)).is_some());
    }

    #[test]
    fn test_panicking_worker_stops_streaming() {
        let generator = |chunk_position: Point3<i32>, bounds: OctantBounds| {
            if bounds.depth == 0 && chunk_position.x >= 1 {
                panic!("no terrain east of the origin");
            }
            Subdivision::Leaf(BlockType::GRASS)
        };
        let mut uploader = RecordingUploader::default();
        let mut world = World::with_generator(2, Arc::new(generator), &mut uploader);

        assert_eq!(
            world.poll(viewer_in(Point3::new(1, 0, 0)), &mut uploader),
            PollOutcome::Dispatched(4)
        );
        let mut outcome = PollOutcome::Busy;
        for _ in 0..200 {
            outcome = world.poll(viewer_in(Point3::new(1, 0, 0)), &mut uploader);
            if outcome != PollOutcome::Busy {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(outcome, PollOutcome::Stopped);
        assert!(world.is_stopped());
        assert!(!world.is_busy());

        // Stale chunks keep drawing their previous mesh, including the one
        // whose lock was poisoned by the panic.
        let stats = world.render(&mut RecordingDrawer::default());
        assert_eq!(stats.drawn, 8);
        assert_eq!(stats.skipped, 0);

        assert_eq!(
            world.poll(viewer_in(Point3::new(-4, 0, 0)), &mut uploader),
            PollOutcome::Stopped
        );
        assert_eq!(world.batches_dispatched(), 1);
        assert!(!world.flush(&mut uploader));

        let ring = world.ring().clone();
        world.shutdown();
        for slot in ring.slots() {
            assert_eq!(slot.get().state(), ChunkState::Empty);
        }
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut uploader = RecordingUploader::default();
        let config = WorldConfig {
            checkerboard_depth: 0,
            ..WorldConfig::default()
        };
        assert!(matches!(
            World::new(&config, &mut uploader),
            Err(ConfigError::Invalid(_))
        ));
        assert!(uploader.labels.is_empty());

        let config = WorldConfig {
            render_distance: 2,
            generator: GeneratorKind::Empty,
            ..WorldConfig::default()
        };
        let world = World::new(&config, &mut uploader).unwrap();
        assert_eq!(world.render_distance(), 2);
        assert_eq!(world.render(&mut RecordingDrawer::default()).empty, 8);
        world.shutdown();
    }

    #[test]
    fn test_shutdown_waits_for_batch() {
        let slow = Arc::new(AtomicBool::new(false));
        let mut uploader = RecordingUploader::default();
        let mut world = World::with_generator(2, slow_generator(slow.clone()), &mut uploader);
        slow.store(true, Ordering::SeqCst);

        world.poll(viewer_in(Point3::new(0, 1, 0)), &mut uploader);
        let ring = world.ring().clone();
        world.shutdown();
        for slot in ring.slots() {
            assert_eq!(slot.get().state(), ChunkState::Empty);
        }
    }

    #[test]
    #[should_panic(expected = "render distance")]
    fn test_zero_render_distance_panics() {
        let mut uploader = RecordingUploader::default();
        World::with_generator(0, Arc::new(CheckerboardGenerator::default()), &mut uploader);
    }
}
