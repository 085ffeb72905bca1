//! In-memory stand-ins for the GPU side, shared by unit tests.

use std::collections::HashMap;

use crate::engine_state::buffer_state::{BufferHandle, MeshUploader};
use crate::engine_state::rendering::renderer::{ChunkDraw, ChunkDrawer};

#[derive(Default)]
pub struct RecordingUploader {
    next: u32,
    pub labels: Vec<String>,
    pub uploads: HashMap<BufferHandle, Vec<f32>>,
    pub writes: usize,
}

impl MeshUploader for RecordingUploader {
    fn create_buffer(&mut self, label: &str) -> BufferHandle {
        self.labels.push(label.to_string());
        self.next += 1;
        BufferHandle(self.next - 1)
    }

    fn upload(&mut self, handle: BufferHandle, data: &[f32]) {
        assert!(handle.0 < self.next, "upload to unknown buffer {:?}", handle);
        self.writes += 1;
        self.uploads.insert(handle, data.to_vec());
    }
}

#[derive(Default)]
pub struct RecordingDrawer {
    pub draws: Vec<ChunkDraw>,
}

impl ChunkDrawer for RecordingDrawer {
    fn draw_chunk(&mut self, draw: &ChunkDraw) {
        self.draws.push(*draw);
    }
}
