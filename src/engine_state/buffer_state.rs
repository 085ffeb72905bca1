//! # Buffer State Module
//!
//! GPU buffer management for chunk meshes.
//!
//! Chunks never touch the GPU themselves: they hold [`BufferHandle`]s and hand
//! finished meshes to a [`MeshUploader`] on the render thread. [`BufferState`]
//! is the wgpu-backed uploader; tests substitute an in-memory one.
//!
//! ## Key Features
//!
//! * Buffers are referenced by opaque handles handed out at chunk creation
//! * Storage is created lazily on first upload and regrown when a mesh outgrows it
//! * Buffer usage analytics and memory tracking

use std::collections::HashMap;

use wgpu::{Buffer, Device, Queue};

/// Identifier of a GPU buffer owned by a [`MeshUploader`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(pub u32);

/// Render-thread sink for mesh data.
///
/// Only ever called from the thread that owns the GPU context.
pub trait MeshUploader {
    /// Reserves a new buffer and returns its handle.
    fn create_buffer(&mut self, label: &str) -> BufferHandle;

    /// Replaces the whole content of `handle` with `data`.
    fn upload(&mut self, handle: BufferHandle, data: &[f32]);
}

/// Analytics data for a GPU buffer
#[derive(Debug, Default, Clone, Copy)]
pub struct BufferAnalytics {
    /// Total memory allocated for the buffer in bytes
    pub allocated_memory: u64,
    /// Bytes written by the most recent upload
    pub used_memory: u64,
    /// Number of times the buffer has been written to
    pub times_written: u64,
}

struct ManagedBuffer {
    label: String,
    buffer: Option<Buffer>,
    analytics: BufferAnalytics,
}

/// wgpu-backed registry of chunk mesh buffers.
///
/// # Examples
///
/// ```no_run
/// # fn example(device: wgpu::Device, queue: wgpu::Queue) {
/// use octree_voxel_engine::engine_state::buffer_state::{BufferState, MeshUploader};
///
/// let mut buffer_state = BufferState::new(device, queue);
/// let handle = buffer_state.create_buffer("Chunk Vertex Buffer 0");
/// buffer_state.upload(handle, &[0.0, 1.0, 33.0]);
/// assert!(buffer_state.get_buffer(handle).is_some());
/// # }
/// ```
pub struct BufferState {
    device: Device,
    queue: Queue,
    buffers: HashMap<BufferHandle, ManagedBuffer>,
    next_handle: u32,
}

impl BufferState {
    /// Creates an empty buffer registry on the given device.
    pub fn new(device: Device, queue: Queue) -> Self {
        Self {
            device,
            queue,
            buffers: HashMap::new(),
            next_handle: 0,
        }
    }

    /// Gets the wgpu buffer behind `handle`, if anything was uploaded to it yet.
    pub fn get_buffer(&self, handle: BufferHandle) -> Option<&Buffer> {
        self.buffers
            .get(&handle)
            .and_then(|managed| managed.buffer.as_ref())
    }

    /// Usage analytics for `handle`.
    pub fn analytics(&self, handle: BufferHandle) -> Option<BufferAnalytics> {
        self.buffers.get(&handle).map(|managed| managed.analytics)
    }

    /// Gets the total allocated memory across all buffers, in bytes.
    pub fn get_total_allocated_memory(&self) -> u64 {
        self.buffers
            .values()
            .fold(0, |acc, managed| acc + managed.analytics.allocated_memory)
    }

    /// Gets the total used memory across all buffers, in bytes.
    pub fn get_total_used_memory(&self) -> u64 {
        self.buffers
            .values()
            .fold(0, |acc, managed| acc + managed.analytics.used_memory)
    }

    fn allocation_size(data_size: u64) -> u64 {
        data_size
            .next_power_of_two()
            .max(wgpu::COPY_BUFFER_ALIGNMENT)
    }
}

impl MeshUploader for BufferState {
    fn create_buffer(&mut self, label: &str) -> BufferHandle {
        let handle = BufferHandle(self.next_handle);
        self.next_handle += 1;

        self.buffers.insert(
            handle,
            ManagedBuffer {
                label: label.to_string(),
                buffer: None,
                analytics: BufferAnalytics::default(),
            },
        );

        handle
    }

    /// # Panics
    ///
    /// Panics if `handle` was not created by this registry.
    fn upload(&mut self, handle: BufferHandle, data: &[f32]) {
        let managed = self
            .buffers
            .get_mut(&handle)
            .unwrap_or_else(|| panic!("unknown buffer handle {:?}", handle));

        let bytes: &[u8] = bytemuck::cast_slice(data);
        let data_size = bytes.len() as u64;

        if data_size == 0 {
            managed.analytics.used_memory = 0;
            return;
        }

        let needs_allocation = managed
            .buffer
            .as_ref()
            .map_or(true, |buffer| buffer.size() < data_size);

        if needs_allocation {
            let size = Self::allocation_size(data_size);
            log::debug!("Allocating {} bytes for buffer '{}'", size, managed.label);

            managed.buffer = Some(self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(&managed.label),
                size,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
            managed.analytics.allocated_memory = size;
        }

        if let Some(buffer) = managed.buffer.as_ref() {
            self.queue.write_buffer(buffer, 0, bytes);
        }
        managed.analytics.used_memory = data_size;
        managed.analytics.times_written += 1;
    }
}
