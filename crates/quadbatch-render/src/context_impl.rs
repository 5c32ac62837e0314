//! Implementation of RenderContext trait for GraphicsContext.
//!
//! This allows GraphicsContext to be used polymorphically with the
//! RenderContext trait, enabling testing with MockRenderContext.

use std::ops::Range;

use quadbatch_test_utils::{ContextId, GpuBuffer, GpuShaderModule, GpuTexture, RenderContext};
use wgpu::{BlendState, BufferDescriptor, ShaderModuleDescriptor, TextureDescriptor, VertexBufferLayout};

use crate::context::{BoundGeometry, GraphicsContext, VertexLayoutKey};
use crate::shader::{OFFSET_VECTOR, PROJECTION_VECTOR};

impl RenderContext for GraphicsContext {
    fn id(&self) -> ContextId {
        self.context_id()
    }

    fn is_lost(&self) -> bool {
        self.device_lost()
    }

    fn create_buffer(&self, desc: &BufferDescriptor) -> GpuBuffer {
        let buffer = self.device.create_buffer(desc);
        GpuBuffer::from_wgpu(buffer)
    }

    fn write_buffer(&self, buffer: &GpuBuffer, offset: u64, data: &[u8]) {
        let mut backend = self.backend.lock();
        // Draws already recorded must see the old contents.
        if backend.is_read_by_pending(buffer) {
            backend.submit_pending(&self.device, &self.queue);
        }
        self.queue.write_buffer(buffer.as_wgpu(), offset, data);
    }

    fn destroy_buffer(&self, buffer: &GpuBuffer) {
        let mut backend = self.backend.lock();
        if backend.is_read_by_pending(buffer) {
            backend.submit_pending(&self.device, &self.queue);
        }
        if backend
            .geometry
            .as_ref()
            .is_some_and(|g| g.vertices.id() == buffer.id() || g.indices.id() == buffer.id())
        {
            backend.geometry = None;
        }
        buffer.as_wgpu().destroy();
    }

    fn bind_geometry(&self, vertices: &GpuBuffer, indices: &GpuBuffer, layout: &VertexBufferLayout<'_>) {
        self.backend.lock().geometry = Some(BoundGeometry {
            vertices: vertices.clone(),
            indices: indices.clone(),
            layout: VertexLayoutKey::from_layout(layout),
        });
    }

    fn create_texture(&self, desc: &TextureDescriptor, data: &[u8]) -> GpuTexture {
        let texture = self.device.create_texture(desc);

        if !data.is_empty() {
            let bytes_per_pixel = desc.format.block_copy_size(None).unwrap_or(4);
            self.queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                data,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(desc.size.width * bytes_per_pixel),
                    rows_per_image: Some(desc.size.height),
                },
                desc.size,
            );
        }

        let mut backend = self.backend.lock();
        let group = backend.texture_group(&self.device, &texture);
        let texture = GpuTexture::from_wgpu(texture);
        backend.texture_groups.insert(texture.id(), group);
        texture
    }

    fn bind_texture(&self, texture: &GpuTexture) {
        let mut backend = self.backend.lock();
        if !backend.texture_groups.contains_key(&texture.id()) {
            let group = backend.texture_group(&self.device, texture.as_wgpu());
            backend.texture_groups.insert(texture.id(), group);
        }
        backend.texture = Some(texture.id());
    }

    fn destroy_texture(&self, texture: &GpuTexture) {
        self.backend
            .lock()
            .evict_texture(&self.device, &self.queue, texture.id());
        texture.as_wgpu().destroy();
    }

    fn set_blend_state(&self, blend: Option<BlendState>) {
        self.backend.lock().blend = blend;
    }

    fn create_shader_module(&self, desc: &ShaderModuleDescriptor) -> GpuShaderModule {
        let module = self.device.create_shader_module(desc.clone());
        let shader = GpuShaderModule::from_wgpu(module.clone());
        self.backend.lock().shaders.insert(shader.id(), module);
        shader
    }

    fn destroy_shader_module(&self, shader: &GpuShaderModule) {
        self.backend
            .lock()
            .evict_shader(&self.device, &self.queue, shader.id());
    }

    fn use_shader(&self, shader: &GpuShaderModule) {
        let mut backend = self.backend.lock();
        if !backend.shaders.contains_key(&shader.id()) {
            backend.shaders.insert(shader.id(), shader.as_wgpu().clone());
        }
        backend.shader = Some(shader.id());
    }

    fn set_uniform_vec2(&self, shader: &GpuShaderModule, name: &str, value: [f32; 2]) {
        let mut backend = self.backend.lock();
        let globals = backend.uniforms.entry(shader.id()).or_default();
        match name {
            PROJECTION_VECTOR => globals.projection_vector = value,
            OFFSET_VECTOR => globals.offset_vector = value,
            _ => tracing::warn!(uniform = name, "Unknown sprite shader uniform"),
        }
    }

    fn draw_indexed(&self, indices: Range<u32>) {
        self.backend.lock().record_draw(&self.device, indices);
    }
}
