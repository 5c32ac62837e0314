//! The sprite batcher: accumulates quads and turns them into draw runs.

use std::sync::Arc;

use quadbatch_core::profiling::profile_function;
use quadbatch_test_utils::{GpuBuffer, RenderContext};

use crate::shader::SpriteShader;
use crate::sprite::Sprite;
use crate::state::RenderState;
use crate::texture::BaseTexture;
use crate::vertex::SpriteVertex;

use super::config::{BatchConfigError, SpriteBatchConfig};
use super::geometry::{GeometryBuffer, quad_indices};
use super::types::{BatchStats, PendingSprite, UploadMode};

/// GPU buffers owned by one batcher in one context.
#[derive(Debug)]
struct GpuBuffers {
    vertices: GpuBuffer,
    indices: GpuBuffer,
}

/// Batches sprites into as few draw calls as submission order allows.
///
/// Sprites are drawn in the order they are passed to [`render`](Self::render).
/// Adjacent sprites sharing texture, blend mode and shader are merged into
/// one indexed draw; nothing is ever reordered.
///
/// # Example
///
/// ```rust,ignore
/// let mut batcher = SpriteBatcher::new(context, SpriteBatchConfig::default())?;
/// let mut state = RenderState::for_viewport(1280.0, 720.0);
///
/// for sprite in &sprites {
///     batcher.render(&mut state, sprite);
/// }
/// batcher.flush(&mut state);
/// ```
pub struct SpriteBatcher {
    pub(super) context: Arc<dyn RenderContext>,
    config: SpriteBatchConfig,
    geometry: GeometryBuffer,
    pub(super) pending: Vec<PendingSprite>,
    buffers: GpuBuffers,
    default_shader: Arc<SpriteShader>,
    /// Vertex bindings must be re-established before the next upload.
    dirty: bool,
    /// Texture of the last emitted run, carried across flushes.
    pub(super) current_texture: Option<Arc<BaseTexture>>,
    /// Shader of the last run and the id of the module bound for it.
    pub(super) current_shader: Option<(Arc<SpriteShader>, u64)>,
    pub(super) stats: BatchStats,
}

impl SpriteBatcher {
    /// Create a batcher and its GPU buffers in `context`.
    pub fn new(context: Arc<dyn RenderContext>, config: SpriteBatchConfig) -> Result<Self, BatchConfigError> {
        profile_function!();
        config.validate()?;

        let geometry = GeometryBuffer::new(config.max_sprites);
        let default_shader = SpriteShader::default_sprite();
        let buffers = create_buffers(context.as_ref(), &geometry, &default_shader);

        tracing::debug!(
            context = context.id(),
            max_sprites = config.max_sprites,
            round_pixels = config.round_pixels,
            "Created sprite batcher"
        );

        Ok(Self {
            context,
            config,
            geometry,
            pending: Vec::with_capacity(config.max_sprites),
            buffers,
            default_shader,
            dirty: true,
            current_texture: None,
            current_shader: None,
            stats: BatchStats::default(),
        })
    }

    /// Accumulate one sprite.
    ///
    /// Flushes first if the buffer is full. Sprites whose texture UVs are not
    /// resolved yet are skipped without consuming a slot.
    pub fn render(&mut self, state: &mut RenderState, sprite: &Sprite) {
        profile_function!();

        if self.pending.len() >= self.config.max_sprites {
            self.stats.auto_flushes += 1;
            self.flush(state);
        }

        let Some(uvs) = sprite.texture.uvs() else {
            self.stats.sprites_skipped += 1;
            return;
        };

        let slot = self.pending.len();
        let corners = sprite.world_corners(self.config.round_pixels);
        self.geometry.write(slot, &corners, uvs, sprite.packed_color());

        self.pending.push(PendingSprite {
            texture: sprite.texture.base().clone(),
            blend_mode: sprite.blend_mode,
            shader: sprite
                .shader
                .clone()
                .unwrap_or_else(|| self.default_shader.clone()),
        });
        self.stats.sprites_submitted += 1;
    }

    /// Upload accumulated geometry and draw it. Does nothing when empty.
    pub fn flush(&mut self, state: &mut RenderState) {
        if self.pending.is_empty() {
            return;
        }
        profile_function!();

        if self.dirty {
            self.context
                .bind_geometry(&self.buffers.vertices, &self.buffers.indices, &SpriteVertex::layout());
            self.dirty = false;
        }

        let count = self.pending.len();
        let (mode, bytes) = self.geometry.upload_range(count);
        self.context.write_buffer(&self.buffers.vertices, 0, bytes);
        match mode {
            UploadMode::Full => self.stats.full_uploads += 1,
            UploadMode::Partial => self.stats.partial_uploads += 1,
        }

        let runs = self.emit_runs(state);
        self.stats.flushes += 1;

        tracing::trace!(sprites = count, runs, upload = ?mode, "Flushed sprite batch");
    }

    /// Flush and hand GPU state over to another renderer.
    pub fn stop(&mut self, state: &mut RenderState) {
        self.flush(state);
        self.mark_dirty();
    }

    /// Resume after another renderer changed GPU bindings.
    pub fn start(&mut self) {
        self.mark_dirty();
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
        self.current_texture = None;
        self.current_shader = None;
    }

    /// Move to a new or restored context.
    ///
    /// Releases the buffers and default shader variant held in the previous
    /// context, then recreates both buffers, uploads the static indices,
    /// compiles the default shader and forces every binding to be
    /// re-applied. A lost previous context is not touched: its handles died
    /// with it. Accumulated sprites are kept and drawn into the new context
    /// on the next flush.
    pub fn setup_context(&mut self, context: Arc<dyn RenderContext>, state: &mut RenderState) {
        profile_function!();

        let previous = self.context.clone();
        if previous.is_lost() {
            self.default_shader.forget_context(previous.id());
        } else {
            previous.destroy_buffer(&self.buffers.vertices);
            previous.destroy_buffer(&self.buffers.indices);
            if previous.id() != context.id() {
                self.default_shader.release(previous.as_ref());
            }
        }

        self.buffers = create_buffers(context.as_ref(), &self.geometry, &self.default_shader);
        tracing::debug!(
            previous = previous.id(),
            previous_lost = previous.is_lost(),
            context = context.id(),
            "Sprite batcher context set up"
        );

        self.context = context;
        self.mark_dirty();
        state.invalidate();
    }

    /// Release GPU buffers. Pending sprites are discarded.
    pub fn destroy(self) {
        self.context.destroy_buffer(&self.buffers.vertices);
        self.context.destroy_buffer(&self.buffers.indices);
        tracing::debug!(
            context = self.context.id(),
            discarded = self.pending.len(),
            "Destroyed sprite batcher"
        );
    }

    /// Sprites accumulated since the last flush.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Maximum sprites per batch.
    pub fn capacity(&self) -> usize {
        self.config.max_sprites
    }

    pub fn config(&self) -> &SpriteBatchConfig {
        &self.config
    }

    pub fn stats(&self) -> &BatchStats {
        &self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }

    pub fn geometry(&self) -> &GeometryBuffer {
        &self.geometry
    }

    /// Whether vertex bindings will be re-established on the next flush.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The shader used by sprites without an override.
    pub fn default_shader(&self) -> &Arc<SpriteShader> {
        &self.default_shader
    }

    pub fn context(&self) -> &Arc<dyn RenderContext> {
        &self.context
    }
}

fn create_buffers(
    context: &dyn RenderContext,
    geometry: &GeometryBuffer,
    default_shader: &SpriteShader,
) -> GpuBuffers {
    let vertices = context.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Sprite Vertex Buffer"),
        size: geometry.byte_size(),
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let index_data = quad_indices(geometry.capacity());
    let indices = context.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Sprite Index Buffer"),
        size: (index_data.len() * std::mem::size_of::<u16>()) as u64,
        usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    context.write_buffer(&indices, 0, bytemuck::cast_slice(&index_data));

    default_shader.variant(context);

    GpuBuffers { vertices, indices }
}
