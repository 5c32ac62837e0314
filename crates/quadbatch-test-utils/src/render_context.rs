//! Trait abstracting GPU operations for testing.
//!
//! The `RenderContext` trait is the whole GPU surface the sprite batcher talks
//! to: buffer management, texture residency, blend and shader state, and
//! indexed draws. Both the wgpu backend and the mock implement it.

use std::ops::Range;

use crate::gpu_types::*;
use wgpu::{BlendState, BufferDescriptor, ShaderModuleDescriptor, TextureDescriptor, VertexBufferLayout};

/// Opaque identity of a GPU context.
///
/// A new id is handed out every time a context is (re)created, so per-context
/// caches (compiled shader variants, resident textures) can tell a restored
/// context apart from the one that was lost.
pub type ContextId = u64;

/// Trait abstracting GPU resource creation and command submission.
///
/// # Lifetime Considerations
///
/// This trait does NOT use lifetimes because:
/// 1. All returned types are owned (not borrowed from Device)
/// 2. GPU resources use reference counting internally
/// 3. Resources live until dropped
///
/// This makes the trait object-safe and easy to mock.
///
/// # Binding Model
///
/// Binding calls (`bind_geometry`, `bind_texture`, `set_blend_state`,
/// `use_shader`) change state that persists until the next call of the same
/// kind. `draw_indexed` draws with whatever is bound at that moment. Callers
/// own the ordering: nothing here reorders or deduplicates.
pub trait RenderContext: Send + Sync {
    /// Identity of this context.
    fn id(&self) -> ContextId;

    /// Whether the underlying device was lost. Resources created by a lost
    /// context are gone with it and must not be destroyed through it.
    fn is_lost(&self) -> bool;

    // Buffer operations

    /// Create a GPU buffer.
    ///
    /// Returns an owned `GpuBuffer` which can be either real or mock.
    fn create_buffer(&self, desc: &BufferDescriptor) -> GpuBuffer;

    /// Write data to a buffer.
    ///
    /// For real buffers, this maps to `queue.write_buffer()`.
    /// For mock buffers, this records the operation for test verification.
    fn write_buffer(&self, buffer: &GpuBuffer, offset: u64, data: &[u8]);

    /// Release a buffer's GPU memory. The handle must not be used afterwards.
    fn destroy_buffer(&self, buffer: &GpuBuffer);

    /// Bind a vertex buffer and a `u16` index buffer, and declare the vertex
    /// attribute layout the active shader reads from the vertex buffer.
    fn bind_geometry(&self, vertices: &GpuBuffer, indices: &GpuBuffer, layout: &VertexBufferLayout<'_>);

    // Texture operations

    /// Create a GPU texture and upload `data` as its first mip level.
    fn create_texture(&self, desc: &TextureDescriptor, data: &[u8]) -> GpuTexture;

    /// Bind a texture (and its sampler) for subsequent draws.
    fn bind_texture(&self, texture: &GpuTexture);

    /// Release a texture and anything the context cached for it.
    fn destroy_texture(&self, texture: &GpuTexture);

    // Fixed-function state

    /// Set the color blend state for subsequent draws. `None` disables blending.
    fn set_blend_state(&self, blend: Option<BlendState>);

    // Shader operations

    /// Create a shader module from source code.
    fn create_shader_module(&self, desc: &ShaderModuleDescriptor) -> GpuShaderModule;

    /// Release a shader module together with its pipelines and uniforms.
    fn destroy_shader_module(&self, shader: &GpuShaderModule);

    /// Make `shader` the active program for subsequent draws.
    fn use_shader(&self, shader: &GpuShaderModule);

    /// Set a `vec2<f32>` uniform of `shader` by name.
    fn set_uniform_vec2(&self, shader: &GpuShaderModule, name: &str, value: [f32; 2]);

    // Draw operations

    /// Draw an indexed triangle list over `indices` of the bound index buffer.
    fn draw_indexed(&self, indices: Range<u32>);
}
