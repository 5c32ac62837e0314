//! Sprite shader programs and their per-context compiled variants.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use ahash::HashMap;
use parking_lot::Mutex;
use quadbatch_test_utils::{ContextId, GpuShaderModule, RenderContext, next_resource_id};

/// Uniform holding half the viewport size, with y negated.
pub const PROJECTION_VECTOR: &str = "projection_vector";

/// Uniform holding a world-space offset added to every vertex.
pub const OFFSET_VECTOR: &str = "offset_vector";

/// A sprite shader program.
///
/// The object is context-independent; each GPU context gets its own compiled
/// module, created on first use and cached by context id. Sprites and the
/// batcher compare shaders by identity (`Arc::ptr_eq`), so two objects built
/// from the same source still count as different shaders.
///
/// Custom sources must keep the default binding interface: texture and sampler
/// in group 0, the `Globals` uniform in group 1, and the [`SpriteVertex`]
/// attribute locations.
///
/// [`SpriteVertex`]: crate::SpriteVertex
pub struct SpriteShader {
    id: u64,
    label: Cow<'static, str>,
    source: Cow<'static, str>,
    variants: Mutex<HashMap<ContextId, GpuShaderModule>>,
}

impl SpriteShader {
    pub fn new(label: impl Into<Cow<'static, str>>, source: impl Into<Cow<'static, str>>) -> Self {
        Self {
            id: next_resource_id(),
            label: label.into(),
            source: source.into(),
            variants: Mutex::new(HashMap::default()),
        }
    }

    /// A fresh instance of the built-in sprite shader.
    pub fn default_sprite() -> Arc<Self> {
        Arc::new(Self::new("sprite_shader", SPRITE_SHADER))
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// The module compiled for `context`, compiling it on first request.
    pub fn variant(&self, context: &dyn RenderContext) -> GpuShaderModule {
        let mut variants = self.variants.lock();
        variants
            .entry(context.id())
            .or_insert_with(|| {
                tracing::debug!(
                    shader = %self.label,
                    context = context.id(),
                    "Compiling sprite shader variant"
                );
                context.create_shader_module(&wgpu::ShaderModuleDescriptor {
                    label: Some(self.label.as_ref()),
                    source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(self.source.as_ref())),
                })
            })
            .clone()
    }

    pub fn has_variant(&self, context: ContextId) -> bool {
        self.variants.lock().contains_key(&context)
    }

    /// Drop the variant compiled for a lost context without touching the GPU.
    pub fn forget_context(&self, context: ContextId) {
        self.variants.lock().remove(&context);
    }

    /// Destroy the variant compiled for a live context.
    pub fn release(&self, context: &dyn RenderContext) {
        let variant = self.variants.lock().remove(&context.id());
        if let Some(module) = variant {
            context.destroy_shader_module(&module);
        }
    }
}

impl fmt::Debug for SpriteShader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpriteShader")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("variants", &self.variants.lock().len())
            .finish()
    }
}

/// Built-in WGSL for textured, tinted sprites.
pub const SPRITE_SHADER: &str = r#"
struct Globals {
    projection_vector: vec2<f32>,
    offset_vector: vec2<f32>,
}

@group(0) @binding(0)
var sprite_texture: texture_2d<f32>;
@group(0) @binding(1)
var sprite_sampler: sampler;

@group(1) @binding(0)
var<uniform> globals: Globals;

struct VertexInput {
    @location(0) position: vec2<f32>,
    @location(1) tex_coords: vec2<f32>,
    @location(2) color: vec4<f32>,
}

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) tex_coords: vec2<f32>,
    @location(1) color: vec4<f32>,
}

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var output: VertexOutput;

    // Pixels to clip space, y down.
    let pos = (input.position + globals.offset_vector) / globals.projection_vector + vec2<f32>(-1.0, 1.0);
    output.position = vec4<f32>(pos, 0.0, 1.0);
    output.tex_coords = input.tex_coords;
    output.color = vec4<f32>(input.color.rgb * input.color.a, input.color.a);

    return output;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(sprite_texture, sprite_sampler, input.tex_coords) * input.color;
}
"#;
