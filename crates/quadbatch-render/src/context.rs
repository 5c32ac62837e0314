//! wgpu-backed graphics context.

use std::num::NonZeroU64;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use ahash::HashMap;
use bytemuck::{Pod, Zeroable};
use parking_lot::Mutex;
use quadbatch_test_utils::{ContextId, GpuBuffer, next_resource_id};

/// Errors from creating a [`GraphicsContext`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphicsContextError {
    /// No adapter matched the requested options
    AdapterUnavailable,
    /// The adapter refused to create a device
    DeviceRequest(String),
}

impl std::fmt::Display for GraphicsContextError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AdapterUnavailable => write!(f, "No suitable GPU adapter found"),
            Self::DeviceRequest(msg) => write!(f, "Failed to create device: {}", msg),
        }
    }
}

impl std::error::Error for GraphicsContextError {}

/// Descriptor for configuring graphics context creation.
pub struct GraphicsContextDescriptor {
    /// GPU backends to use
    pub backends: wgpu::Backends,
    /// Power preference for adapter selection
    pub power_preference: wgpu::PowerPreference,
    /// Whether to force fallback adapter
    pub force_fallback_adapter: bool,
    /// Required device limits
    pub limits: wgpu::Limits,
    /// Optional label for debugging
    pub label: Option<&'static str>,
}

impl Default for GraphicsContextDescriptor {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            limits: wgpu::Limits::default(),
            label: None,
        }
    }
}

impl GraphicsContextDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the power preference.
    pub fn power_preference(mut self, preference: wgpu::PowerPreference) -> Self {
        self.power_preference = preference;
        self
    }

    /// Set the backends to use.
    pub fn backends(mut self, backends: wgpu::Backends) -> Self {
        self.backends = backends;
        self
    }

    /// Use the software fallback adapter.
    pub fn force_fallback_adapter(mut self, force: bool) -> Self {
        self.force_fallback_adapter = force;
        self
    }

    /// Set the device limits.
    pub fn limits(mut self, limits: wgpu::Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Set the debug label.
    pub fn label(mut self, label: &'static str) -> Self {
        self.label = Some(label);
        self
    }
}

/// A GPU context that sprite batchers draw through.
///
/// Implements [`RenderContext`](quadbatch_test_utils::RenderContext) on a
/// real device. Binding calls update tracked state and every `draw_indexed`
/// records a draw that snapshots it. Recorded draws go to the GPU in one render
/// pass when [`submit`](Self::submit) is called, or earlier when a buffer they
/// read is about to be rewritten.
///
/// ```rust,no_run
/// use quadbatch_render::GraphicsContext;
///
/// let ctx = GraphicsContext::new_sync()?; // Arc<GraphicsContext>
/// let ctx2 = ctx.clone(); // Cheap clone
/// # Ok::<(), quadbatch_render::GraphicsContextError>(())
/// ```
pub struct GraphicsContext {
    id: ContextId,
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    lost: Arc<AtomicBool>,
    pub(crate) backend: Mutex<Backend>,
}

impl GraphicsContext {
    pub async fn new() -> Result<Arc<Self>, GraphicsContextError> {
        Self::with_descriptor(GraphicsContextDescriptor::default()).await
    }

    /// Creates a new graphics context, blocking the current thread.
    pub fn new_sync() -> Result<Arc<Self>, GraphicsContextError> {
        pollster::block_on(Self::new())
    }

    pub async fn with_descriptor(
        descriptor: GraphicsContextDescriptor,
    ) -> Result<Arc<Self>, GraphicsContextError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: descriptor.backends,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: descriptor.power_preference,
                compatible_surface: None,
                force_fallback_adapter: descriptor.force_fallback_adapter,
            })
            .await
            .map_err(|err| {
                tracing::warn!("Adapter request failed: {err}");
                GraphicsContextError::AdapterUnavailable
            })?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                required_limits: descriptor.limits.clone(),
                label: descriptor.label,
                ..Default::default()
            })
            .await
            .map_err(|err| GraphicsContextError::DeviceRequest(err.to_string()))?;

        let backend = Backend::new(&device);
        let id = next_resource_id();

        let lost = Arc::new(AtomicBool::new(false));
        let flag = lost.clone();
        device.set_device_lost_callback(move |reason, message| {
            tracing::error!(context = id, ?reason, %message, "GPU device lost");
            flag.store(true, Ordering::Release);
        });

        tracing::info!(
            context = id,
            adapter = %adapter.get_info().name,
            "Created graphics context"
        );

        Ok(Arc::new(Self {
            id,
            instance,
            adapter,
            device,
            queue,
            lost,
            backend: Mutex::new(backend),
        }))
    }

    pub fn context_id(&self) -> ContextId {
        self.id
    }

    /// Whether the device reported itself lost.
    pub fn device_lost(&self) -> bool {
        self.lost.load(Ordering::Acquire)
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Get device info
    pub fn info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    /// Start drawing into `view`. With `clear`, the first pass of the frame
    /// clears the target; otherwise existing contents are kept.
    ///
    /// Draws recorded outside a frame are dropped.
    pub fn begin_frame(&self, view: &wgpu::TextureView, format: wgpu::TextureFormat, clear: Option<wgpu::Color>) {
        let mut backend = self.backend.lock();
        if backend.target.is_some() {
            tracing::warn!("begin_frame called with a frame in flight; submitting it first");
            backend.submit_pending(&self.device, &self.queue);
        }
        backend.target = Some(FrameTarget {
            view: view.clone(),
            format,
            clear,
        });
    }

    /// Submit every recorded draw and end the frame.
    pub fn submit(&self) {
        let mut backend = self.backend.lock();
        backend.submit_pending(&self.device, &self.queue);
        backend.target = None;
    }

    /// Draws recorded but not yet submitted.
    pub fn pending_draws(&self) -> usize {
        self.backend.lock().draws.len()
    }

    /// Number of cached render pipelines.
    pub fn pipeline_count(&self) -> usize {
        self.backend.lock().pipelines.len()
    }

    /// Number of cached texture bind groups.
    pub fn texture_group_count(&self) -> usize {
        self.backend.lock().texture_groups.len()
    }
}

/// Uniform block shared by sprite shaders.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub(crate) struct Globals {
    pub projection_vector: [f32; 2],
    pub offset_vector: [f32; 2],
}

const GLOBALS_SIZE: u64 = std::mem::size_of::<Globals>() as u64;

/// Vertex layout in an owned, hashable form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct VertexLayoutKey {
    pub stride: u64,
    pub step_mode: wgpu::VertexStepMode,
    pub attributes: Vec<wgpu::VertexAttribute>,
}

impl VertexLayoutKey {
    pub fn from_layout(layout: &wgpu::VertexBufferLayout<'_>) -> Self {
        Self {
            stride: layout.array_stride,
            step_mode: layout.step_mode,
            attributes: layout.attributes.to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct PipelineKey {
    pub shader: u64,
    pub blend: Option<wgpu::BlendState>,
    pub format: wgpu::TextureFormat,
    pub layout: VertexLayoutKey,
}

pub(crate) struct BoundGeometry {
    pub vertices: GpuBuffer,
    pub indices: GpuBuffer,
    pub layout: VertexLayoutKey,
}

pub(crate) struct FrameTarget {
    pub view: wgpu::TextureView,
    pub format: wgpu::TextureFormat,
    pub clear: Option<wgpu::Color>,
}

/// One recorded draw with the state it was issued under.
pub(crate) struct DrawCommand {
    pub pipeline: PipelineKey,
    pub vertices: GpuBuffer,
    pub indices: GpuBuffer,
    pub texture_id: u64,
    pub texture: wgpu::BindGroup,
    pub uniform_offset: u32,
    pub range: std::ops::Range<u32>,
}

impl DrawCommand {
    fn reads(&self, buffer: &GpuBuffer) -> bool {
        self.vertices.id() == buffer.id() || self.indices.id() == buffer.id()
    }
}

/// Mutable side of a [`GraphicsContext`].
pub(crate) struct Backend {
    pub texture_layout: wgpu::BindGroupLayout,
    globals_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    pub sampler: wgpu::Sampler,

    pub shaders: HashMap<u64, wgpu::ShaderModule>,
    pub pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    pub texture_groups: HashMap<u64, wgpu::BindGroup>,
    pub uniforms: HashMap<u64, Globals>,

    pub geometry: Option<BoundGeometry>,
    pub texture: Option<u64>,
    pub blend: Option<wgpu::BlendState>,
    pub shader: Option<u64>,

    pub target: Option<FrameTarget>,
    pub draws: Vec<DrawCommand>,
    uniform_data: Vec<u8>,
    uniform_alignment: usize,
    last_globals: Option<(Globals, u32)>,
    uniform_buffer: wgpu::Buffer,
    globals_group: wgpu::BindGroup,
}

impl Backend {
    const INITIAL_UNIFORM_SLOTS: u64 = 64;

    fn new(device: &wgpu::Device) -> Self {
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Sprite Texture Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let globals_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Sprite Globals Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(GLOBALS_SIZE),
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Sprite Pipeline Layout"),
            bind_group_layouts: &[&texture_layout, &globals_layout],
            push_constant_ranges: &[],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Sprite Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let uniform_alignment = device.limits().min_uniform_buffer_offset_alignment as usize;
        let uniform_buffer = create_uniform_buffer(
            device,
            uniform_alignment as u64 * Self::INITIAL_UNIFORM_SLOTS,
        );
        let globals_group = create_globals_group(device, &globals_layout, &uniform_buffer);

        Self {
            texture_layout,
            globals_layout,
            pipeline_layout,
            sampler,
            shaders: HashMap::default(),
            pipelines: HashMap::default(),
            texture_groups: HashMap::default(),
            uniforms: HashMap::default(),
            geometry: None,
            texture: None,
            blend: None,
            shader: None,
            target: None,
            draws: Vec::new(),
            uniform_data: Vec::new(),
            uniform_alignment,
            last_globals: None,
            uniform_buffer,
            globals_group,
        }
    }

    /// Bind group for a texture view with the shared sampler.
    pub fn texture_group(&self, device: &wgpu::Device, texture: &wgpu::Texture) -> wgpu::BindGroup {
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Sprite Texture Bind Group"),
            layout: &self.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        })
    }

    /// Whether any unsubmitted draw reads `buffer`.
    pub fn is_read_by_pending(&self, buffer: &GpuBuffer) -> bool {
        self.draws.iter().any(|draw| draw.reads(buffer))
    }

    /// Forget the bind group of a texture, submitting draws that still sample it.
    pub fn evict_texture(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, texture: u64) {
        if self.draws.iter().any(|draw| draw.texture_id == texture) {
            self.submit_pending(device, queue);
        }
        self.texture_groups.remove(&texture);
        if self.texture == Some(texture) {
            self.texture = None;
        }
    }

    /// Forget a shader module with its pipelines and uniforms, submitting
    /// draws that still use it.
    pub fn evict_shader(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, shader: u64) {
        if self.draws.iter().any(|draw| draw.pipeline.shader == shader) {
            self.submit_pending(device, queue);
        }
        self.shaders.remove(&shader);
        self.uniforms.remove(&shader);
        self.pipelines.retain(|key, _| key.shader != shader);
        if self.shader == Some(shader) {
            self.shader = None;
        }
    }

    /// Record a draw with the current bindings. Returns `false` if some
    /// binding is missing or no frame is active.
    pub fn record_draw(&mut self, device: &wgpu::Device, range: std::ops::Range<u32>) -> bool {
        let Some(format) = self.target.as_ref().map(|target| target.format) else {
            tracing::warn!("draw_indexed outside begin_frame/submit; dropped");
            return false;
        };
        let (Some(geometry), Some(texture), Some(shader)) = (&self.geometry, self.texture, self.shader) else {
            tracing::warn!("draw_indexed with incomplete bindings; dropped");
            return false;
        };
        let texture_id = texture;
        let Some(texture) = self.texture_groups.get(&texture).cloned() else {
            tracing::warn!(texture, "draw_indexed with unknown texture; dropped");
            return false;
        };

        let key = PipelineKey {
            shader,
            blend: self.blend,
            format,
            layout: geometry.layout.clone(),
        };
        let vertices = geometry.vertices.clone();
        let indices = geometry.indices.clone();

        if !self.pipelines.contains_key(&key) {
            let Some(module) = self.shaders.get(&shader) else {
                tracing::warn!(shader, "draw_indexed with unknown shader; dropped");
                return false;
            };
            let pipeline = create_pipeline(device, &self.pipeline_layout, module, &key);
            self.pipelines.insert(key.clone(), pipeline);
        }

        let globals = self.uniforms.get(&shader).copied().unwrap_or_default();
        let uniform_offset = self.push_globals(globals);

        self.draws.push(DrawCommand {
            pipeline: key,
            vertices,
            indices,
            texture_id,
            texture,
            uniform_offset,
            range,
        });
        true
    }

    fn push_globals(&mut self, globals: Globals) -> u32 {
        if let Some((last, offset)) = self.last_globals
            && last == globals
        {
            return offset;
        }

        let offset = self.uniform_data.len();
        self.uniform_data.extend_from_slice(bytemuck::bytes_of(&globals));
        let aligned = offset + self.uniform_alignment.max(GLOBALS_SIZE as usize);
        self.uniform_data.resize(aligned, 0);

        self.last_globals = Some((globals, offset as u32));
        offset as u32
    }

    fn ensure_uniform_capacity(&mut self, device: &wgpu::Device) {
        let needed = self.uniform_data.len() as u64;
        if needed <= self.uniform_buffer.size() {
            return;
        }
        let size = needed.next_power_of_two();
        tracing::debug!(size, "Growing sprite uniform buffer");
        self.uniform_buffer = create_uniform_buffer(device, size);
        self.globals_group = create_globals_group(device, &self.globals_layout, &self.uniform_buffer);
    }

    /// Encode and submit recorded draws in one render pass.
    pub fn submit_pending(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        let needs_clear = self.target.as_ref().is_some_and(|target| target.clear.is_some());
        if self.draws.is_empty() && !needs_clear {
            return;
        }

        self.ensure_uniform_capacity(device);
        if !self.uniform_data.is_empty() {
            queue.write_buffer(&self.uniform_buffer, 0, &self.uniform_data);
        }

        let Some(target) = self.target.as_mut() else {
            self.draws.clear();
            return;
        };

        let load = match target.clear.take() {
            Some(color) => wgpu::LoadOp::Clear(color),
            None => wgpu::LoadOp::Load,
        };

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Sprite Encoder"),
        });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Sprite Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            let mut last_pipeline: Option<&PipelineKey> = None;
            for draw in &self.draws {
                let Some(pipeline) = self.pipelines.get(&draw.pipeline) else {
                    continue;
                };
                if last_pipeline != Some(&draw.pipeline) {
                    pass.set_pipeline(pipeline);
                    last_pipeline = Some(&draw.pipeline);
                }
                pass.set_bind_group(0, &draw.texture, &[]);
                pass.set_bind_group(1, &self.globals_group, &[draw.uniform_offset]);
                pass.set_vertex_buffer(0, draw.vertices.as_wgpu().slice(..));
                pass.set_index_buffer(draw.indices.as_wgpu().slice(..), wgpu::IndexFormat::Uint16);
                pass.draw_indexed(draw.range.clone(), 0, 0..1);
            }
        }

        queue.submit(std::iter::once(encoder.finish()));

        self.draws.clear();
        self.uniform_data.clear();
        self.last_globals = None;
    }
}

fn create_uniform_buffer(device: &wgpu::Device, size: u64) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Sprite Globals Buffer"),
        size,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_globals_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Sprite Globals Bind Group"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer,
                offset: 0,
                size: NonZeroU64::new(GLOBALS_SIZE),
            }),
        }],
    })
}

fn create_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    module: &wgpu::ShaderModule,
    key: &PipelineKey,
) -> wgpu::RenderPipeline {
    tracing::debug!(shader = key.shader, format = ?key.format, "Creating sprite pipeline");

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Sprite Pipeline"),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: Some("vs_main"),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: key.layout.stride,
                step_mode: key.layout.step_mode,
                attributes: &key.layout.attributes,
            }],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: key.format,
                blend: key.blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
        cache: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_globals_layout() {
        assert_eq!(GLOBALS_SIZE, 16);
    }

    #[test]
    fn test_layout_key_captures_sprite_vertex() {
        let key = VertexLayoutKey::from_layout(&crate::SpriteVertex::layout());
        assert_eq!(key.stride, 20);
        assert_eq!(key.attributes.len(), 3);
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            GraphicsContextError::DeviceRequest("lost".into()).to_string(),
            "Failed to create device: lost"
        );
    }
}
