//! Mock implementation of RenderContext for testing.
//!
//! This module provides a mock GPU context that records operations
//! without actually interacting with the GPU.

use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::{gpu_types::*, render_context::{ContextId, RenderContext}};
use parking_lot::Mutex;
use wgpu::*;

/// Records a GPU operation call for verification in tests.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCall {
    CreateBuffer {
        buffer_id: u64,
        size: u64,
        usage: BufferUsages,
    },
    WriteBuffer {
        buffer_id: u64,
        offset: u64,
        size: usize,
    },
    DestroyBuffer {
        buffer_id: u64,
    },
    BindGeometry {
        vertex_buffer_id: u64,
        index_buffer_id: u64,
        stride: u64,
        attributes: Vec<VertexAttribute>,
    },
    CreateTexture {
        texture_id: u64,
        width: u32,
        height: u32,
        format: TextureFormat,
    },
    BindTexture {
        texture_id: u64,
    },
    DestroyTexture {
        texture_id: u64,
    },
    SetBlendState {
        blend: Option<BlendState>,
    },
    CreateShaderModule {
        shader_id: u64,
        label: Option<String>,
    },
    DestroyShaderModule {
        shader_id: u64,
    },
    UseShader {
        shader_id: u64,
    },
    SetUniform {
        shader_id: u64,
        name: String,
        value: [f32; 2],
    },
    DrawIndexed {
        first_index: u32,
        index_count: u32,
    },
}

/// Mock implementation of RenderContext for testing.
///
/// # Borrow Checking Pattern: Interior Mutability
///
/// Methods take `&self` but need to mutate internal state (record calls).
/// Solution: Use `Mutex<Vec<RenderCall>>` for interior mutability.
///
/// `parking_lot::Mutex` is `Send + Sync` (required by `RenderContext`) and has
/// less overhead than `std::sync::Mutex`.
///
/// # Example
///
/// ```rust
/// use quadbatch_test_utils::{MockRenderContext, RenderContext};
///
/// let mock = MockRenderContext::new();
/// mock.draw_indexed(0..6);
///
/// assert_eq!(mock.draw_ranges(), vec![0..6]);
/// ```
pub struct MockRenderContext {
    id: ContextId,
    /// Recorded calls for verification
    calls: Mutex<Vec<RenderCall>>,
    lost: AtomicBool,
}

impl MockRenderContext {
    /// Create a new mock render context with a fresh context id.
    pub fn new() -> Self {
        Self {
            id: next_resource_id(),
            calls: Mutex::new(Vec::new()),
            lost: AtomicBool::new(false),
        }
    }

    /// Simulate a device loss. Later calls are still recorded.
    pub fn mark_lost(&self) {
        self.lost.store(true, Ordering::Release);
    }

    /// Get a copy of all recorded calls (for test assertions).
    pub fn calls(&self) -> Vec<RenderCall> {
        self.calls.lock().clone()
    }

    fn count(&self, predicate: impl Fn(&RenderCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|call| predicate(call)).count()
    }

    /// Count buffer creates.
    pub fn count_buffer_creates(&self) -> usize {
        self.count(|call| matches!(call, RenderCall::CreateBuffer { .. }))
    }

    /// Count buffer write operations.
    pub fn count_buffer_writes(&self) -> usize {
        self.count(|call| matches!(call, RenderCall::WriteBuffer { .. }))
    }

    /// Count buffer destroys.
    pub fn count_buffer_destroys(&self) -> usize {
        self.count(|call| matches!(call, RenderCall::DestroyBuffer { .. }))
    }

    /// Count geometry (vertex layout) bindings.
    pub fn count_geometry_binds(&self) -> usize {
        self.count(|call| matches!(call, RenderCall::BindGeometry { .. }))
    }

    /// Count texture creates.
    pub fn count_texture_creates(&self) -> usize {
        self.count(|call| matches!(call, RenderCall::CreateTexture { .. }))
    }

    /// Count texture binds.
    pub fn count_texture_binds(&self) -> usize {
        self.count(|call| matches!(call, RenderCall::BindTexture { .. }))
    }

    /// Count texture destroys.
    pub fn count_texture_destroys(&self) -> usize {
        self.count(|call| matches!(call, RenderCall::DestroyTexture { .. }))
    }

    /// Count blend state changes.
    pub fn count_blend_changes(&self) -> usize {
        self.count(|call| matches!(call, RenderCall::SetBlendState { .. }))
    }

    /// Count shader module creates.
    pub fn count_shader_creates(&self) -> usize {
        self.count(|call| matches!(call, RenderCall::CreateShaderModule { .. }))
    }

    /// Count shader module destroys.
    pub fn count_shader_destroys(&self) -> usize {
        self.count(|call| matches!(call, RenderCall::DestroyShaderModule { .. }))
    }

    /// Count shader binds.
    pub fn count_shader_binds(&self) -> usize {
        self.count(|call| matches!(call, RenderCall::UseShader { .. }))
    }

    /// Count draw calls.
    pub fn count_draws(&self) -> usize {
        self.count(|call| matches!(call, RenderCall::DrawIndexed { .. }))
    }

    /// Index ranges of every recorded draw, in submission order.
    pub fn draw_ranges(&self) -> Vec<Range<u32>> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                RenderCall::DrawIndexed {
                    first_index,
                    index_count,
                } => Some(*first_index..first_index + index_count),
                _ => None,
            })
            .collect()
    }

    /// Sizes of every recorded buffer write, in submission order.
    pub fn buffer_write_sizes(&self) -> Vec<usize> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                RenderCall::WriteBuffer { size, .. } => Some(*size),
                _ => None,
            })
            .collect()
    }

    /// Texture ids bound before each draw, in draw order.
    ///
    /// Tracks the most recent `BindTexture` and samples it at every draw.
    pub fn draw_textures(&self) -> Vec<Option<u64>> {
        let mut bound = None;
        let mut textures = Vec::new();
        for call in self.calls.lock().iter() {
            match call {
                RenderCall::BindTexture { texture_id } => bound = Some(*texture_id),
                RenderCall::DrawIndexed { .. } => textures.push(bound),
                _ => {}
            }
        }
        textures
    }

    /// Clear recorded calls (useful between test steps).
    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// Get total number of recorded calls.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    fn record(&self, call: RenderCall) {
        self.calls.lock().push(call);
    }
}

impl Default for MockRenderContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderContext for MockRenderContext {
    fn id(&self) -> ContextId {
        self.id
    }

    fn is_lost(&self) -> bool {
        self.lost.load(Ordering::Acquire)
    }

    fn create_buffer(&self, desc: &BufferDescriptor) -> GpuBuffer {
        let buffer_id = next_resource_id();
        self.record(RenderCall::CreateBuffer {
            buffer_id,
            size: desc.size,
            usage: desc.usage,
        });

        GpuBuffer::mock(buffer_id, desc.size)
    }

    fn write_buffer(&self, buffer: &GpuBuffer, offset: u64, data: &[u8]) {
        self.record(RenderCall::WriteBuffer {
            buffer_id: buffer.id(),
            offset,
            size: data.len(),
        });
    }

    fn destroy_buffer(&self, buffer: &GpuBuffer) {
        self.record(RenderCall::DestroyBuffer {
            buffer_id: buffer.id(),
        });
    }

    fn bind_geometry(&self, vertices: &GpuBuffer, indices: &GpuBuffer, layout: &VertexBufferLayout<'_>) {
        self.record(RenderCall::BindGeometry {
            vertex_buffer_id: vertices.id(),
            index_buffer_id: indices.id(),
            stride: layout.array_stride,
            attributes: layout.attributes.to_vec(),
        });
    }

    fn create_texture(&self, desc: &TextureDescriptor, _data: &[u8]) -> GpuTexture {
        let texture_id = next_resource_id();
        self.record(RenderCall::CreateTexture {
            texture_id,
            width: desc.size.width,
            height: desc.size.height,
            format: desc.format,
        });

        GpuTexture::mock(texture_id, desc.size.width, desc.size.height, desc.format)
    }

    fn bind_texture(&self, texture: &GpuTexture) {
        self.record(RenderCall::BindTexture {
            texture_id: texture.id(),
        });
    }

    fn destroy_texture(&self, texture: &GpuTexture) {
        self.record(RenderCall::DestroyTexture {
            texture_id: texture.id(),
        });
    }

    fn set_blend_state(&self, blend: Option<BlendState>) {
        self.record(RenderCall::SetBlendState { blend });
    }

    fn create_shader_module(&self, desc: &ShaderModuleDescriptor) -> GpuShaderModule {
        let shader_id = next_resource_id();
        self.record(RenderCall::CreateShaderModule {
            shader_id,
            label: desc.label.map(|s| s.to_string()),
        });

        GpuShaderModule::mock(shader_id)
    }

    fn destroy_shader_module(&self, shader: &GpuShaderModule) {
        self.record(RenderCall::DestroyShaderModule {
            shader_id: shader.id(),
        });
    }

    fn use_shader(&self, shader: &GpuShaderModule) {
        self.record(RenderCall::UseShader {
            shader_id: shader.id(),
        });
    }

    fn set_uniform_vec2(&self, shader: &GpuShaderModule, name: &str, value: [f32; 2]) {
        self.record(RenderCall::SetUniform {
            shader_id: shader.id(),
            name: name.to_string(),
            value,
        });
    }

    fn draw_indexed(&self, indices: Range<u32>) {
        self.record(RenderCall::DrawIndexed {
            first_index: indices.start,
            index_count: indices.end - indices.start,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_buffer_creation() {
        let mock = MockRenderContext::new();

        let buffer = mock.create_buffer(&BufferDescriptor {
            label: Some("test_buffer"),
            size: 1024,
            usage: BufferUsages::VERTEX,
            mapped_at_creation: false,
        });

        assert!(buffer.is_mock());
        assert_eq!(buffer.size(), 1024);
        assert_eq!(mock.count_buffer_creates(), 1);
    }

    #[test]
    fn test_mock_buffer_write() {
        let mock = MockRenderContext::new();

        let buffer = mock.create_buffer(&BufferDescriptor {
            label: None,
            size: 1024,
            usage: BufferUsages::VERTEX,
            mapped_at_creation: false,
        });

        let data = vec![0u8; 256];
        mock.write_buffer(&buffer, 0, &data);

        assert_eq!(mock.count_buffer_writes(), 1);
        assert_eq!(mock.buffer_write_sizes(), vec![256]);
    }

    #[test]
    fn test_mock_texture_creation() {
        let mock = MockRenderContext::new();

        let texture = mock.create_texture(
            &TextureDescriptor {
                label: Some("test_texture"),
                size: Extent3d {
                    width: 512,
                    height: 512,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: TextureDimension::D2,
                format: TextureFormat::Rgba8UnormSrgb,
                usage: TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            },
            &[],
        );

        assert!(texture.is_mock());
        assert_eq!(mock.count_texture_creates(), 1);
    }

    #[test]
    fn test_draw_textures_tracks_last_bind() {
        let mock = MockRenderContext::new();
        let a = GpuTexture::mock(100, 1, 1, TextureFormat::Rgba8Unorm);
        let b = GpuTexture::mock(200, 1, 1, TextureFormat::Rgba8Unorm);

        mock.draw_indexed(0..6);
        mock.bind_texture(&a);
        mock.draw_indexed(6..12);
        mock.draw_indexed(12..18);
        mock.bind_texture(&b);
        mock.draw_indexed(18..24);

        assert_eq!(mock.draw_textures(), vec![None, Some(100), Some(100), Some(200)]);
        assert_eq!(mock.draw_ranges(), vec![0..6, 6..12, 12..18, 18..24]);
    }

    #[test]
    fn test_mark_lost() {
        let mock = MockRenderContext::new();
        assert!(!mock.is_lost());
        mock.mark_lost();
        assert!(mock.is_lost());
    }

    #[test]
    fn test_destroys_are_recorded() {
        let mock = MockRenderContext::new();
        let texture = GpuTexture::mock(7, 1, 1, TextureFormat::Rgba8Unorm);
        let shader = GpuShaderModule::mock(8);

        mock.destroy_texture(&texture);
        mock.destroy_shader_module(&shader);

        assert_eq!(mock.count_texture_destroys(), 1);
        assert_eq!(mock.count_shader_destroys(), 1);
        assert_eq!(
            mock.calls(),
            vec![
                RenderCall::DestroyTexture { texture_id: 7 },
                RenderCall::DestroyShaderModule { shader_id: 8 },
            ]
        );
    }

    #[test]
    fn test_contexts_have_distinct_ids() {
        let a = MockRenderContext::new();
        let b = MockRenderContext::new();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_clear_calls() {
        let mock = MockRenderContext::new();

        mock.create_buffer(&BufferDescriptor {
            label: None,
            size: 1024,
            usage: BufferUsages::VERTEX,
            mapped_at_creation: false,
        });

        assert_eq!(mock.call_count(), 1);

        mock.clear_calls();
        assert_eq!(mock.call_count(), 0);
    }
}
