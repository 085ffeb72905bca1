//! Chunk draw submission.
//!
//! Each loaded chunk is one non-indexed draw: its vertex buffer is bound to
//! slot 0, its normal buffer to slot 1, and its chunk position is pushed as a
//! vertex-stage push constant so the shader can offset the packed positions.
//!
//! # Architecture
//!
//! - `ChunkDraw`: everything needed to issue one chunk's draw call
//! - `ChunkDrawer`: the sink the world submits draws to
//! - `ChunkPipeline`: the wgpu render pipeline for chunk meshes
//! - `ChunkRenderPass`: a `ChunkDrawer` recording into a wgpu render pass

use bytemuck::{Pod, Zeroable};
use cgmath::Point3;
use wgpu::{
    BindGroupLayout, Device, PushConstantRange, RenderPass, RenderPipeline, ShaderStages,
    TextureFormat, VertexAttribute, VertexBufferLayout,
};

use crate::engine_state::buffer_state::{BufferHandle, BufferState};

/// Byte stride of both chunk vertex streams (one `f32` per vertex).
pub const CHUNK_VERTEX_STRIDE: u64 = std::mem::size_of::<f32>() as u64;

const POSITION_ATTRIBUTES: [VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32];
const NORMAL_ATTRIBUTES: [VertexAttribute; 1] = wgpu::vertex_attr_array![1 => Float32];

/// Push constant range holding a [`ChunkPositionConstant`].
pub const CHUNK_POSITION_PUSH_CONSTANT: PushConstantRange = PushConstantRange {
    stages: ShaderStages::VERTEX,
    range: 0..std::mem::size_of::<ChunkPositionConstant>() as u32,
};

/// One chunk's draw call.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ChunkDraw {
    /// Chunk-grid position the mesh was built for.
    pub position: Point3<i32>,
    /// Packed vertex positions.
    pub vertex_buffer: BufferHandle,
    /// Face-normal codes.
    pub normal_buffer: BufferHandle,
    /// Number of vertices to draw.
    pub mesh_size: u32,
}

/// Receives the draw calls of a frame.
pub trait ChunkDrawer {
    /// Issues one chunk's draw call.
    fn draw_chunk(&mut self, draw: &ChunkDraw);
}

/// Chunk position as laid out in the vertex push constant.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct ChunkPositionConstant {
    position: [i32; 3],
}

impl From<Point3<i32>> for ChunkPositionConstant {
    fn from(position: Point3<i32>) -> Self {
        ChunkPositionConstant {
            position: position.into(),
        }
    }
}

/// Vertex buffer layouts for slot 0 (positions) and slot 1 (normal codes).
pub fn chunk_vertex_layouts() -> [VertexBufferLayout<'static>; 2] {
    [
        VertexBufferLayout {
            array_stride: CHUNK_VERTEX_STRIDE,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &POSITION_ATTRIBUTES,
        },
        VertexBufferLayout {
            array_stride: CHUNK_VERTEX_STRIDE,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &NORMAL_ATTRIBUTES,
        },
    ]
}

/// Render pipeline for chunk meshes.
///
/// The shader module must expose `vs_main` and `fs_main` and read the chunk
/// position from a vertex push constant.
pub struct ChunkPipeline {
    render_pipeline: RenderPipeline,
}

impl ChunkPipeline {
    /// Creates the pipeline.
    ///
    /// `bind_group_layouts` are passed through unchanged (camera and whatever
    /// else the shader binds).
    pub fn new(
        device: &Device,
        shader_string: &str,
        texture_format: TextureFormat,
        bind_group_layouts: &[&BindGroupLayout],
        depth_stencil: Option<wgpu::DepthStencilState>,
    ) -> Self {
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Chunk Render Pipeline Layout"),
            bind_group_layouts,
            push_constant_ranges: &[CHUNK_POSITION_PUSH_CONSTANT],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Chunk Shader"),
            source: wgpu::ShaderSource::Wgsl(shader_string.into()),
        });

        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Chunk Render Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &chunk_vertex_layouts(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: texture_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil,
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });

        ChunkPipeline { render_pipeline }
    }

    /// Gets the render pipeline.
    pub fn get_render_pipeline(&self) -> &RenderPipeline {
        &self.render_pipeline
    }
}

/// Records chunk draws into an open render pass.
///
/// Binding the pipeline and bind groups is the caller's job; see
/// [`ChunkRenderPass::begin`].
pub struct ChunkRenderPass<'a, 'pass> {
    render_pass: &'a mut RenderPass<'pass>,
    buffer_state: &'a BufferState,
}

impl<'a, 'pass> ChunkRenderPass<'a, 'pass> {
    /// Binds `pipeline` on `render_pass` and wraps it for chunk draws.
    pub fn begin(
        render_pass: &'a mut RenderPass<'pass>,
        pipeline: &ChunkPipeline,
        buffer_state: &'a BufferState,
    ) -> Self {
        render_pass.set_pipeline(pipeline.get_render_pipeline());
        ChunkRenderPass {
            render_pass,
            buffer_state,
        }
    }
}

impl ChunkDrawer for ChunkRenderPass<'_, '_> {
    fn draw_chunk(&mut self, draw: &ChunkDraw) {
        let (Some(vertices), Some(normals)) = (
            self.buffer_state.get_buffer(draw.vertex_buffer),
            self.buffer_state.get_buffer(draw.normal_buffer),
        ) else {
            log::warn!("Chunk at {:?} has no GPU buffers, skipping draw", draw.position);
            return;
        };

        let byte_len = draw.mesh_size as u64 * CHUNK_VERTEX_STRIDE;
        let constant = ChunkPositionConstant::from(draw.position);

        self.render_pass
            .set_push_constants(ShaderStages::VERTEX, 0, bytemuck::bytes_of(&constant));
        self.render_pass
            .set_vertex_buffer(0, vertices.slice(..byte_len));
        self.render_pass
            .set_vertex_buffer(1, normals.slice(..byte_len));
        self.render_pass.draw(0..draw.mesh_size, 0..1);
    }
}
