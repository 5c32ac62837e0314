//! Bookkeeping types for the sprite batcher.

use std::sync::Arc;

use crate::blend::BlendMode;
use crate::shader::SpriteShader;
use crate::texture::BaseTexture;

/// Draw state recorded for one accumulated sprite until the next flush.
#[derive(Debug, Clone)]
pub struct PendingSprite {
    pub texture: Arc<BaseTexture>,
    pub blend_mode: BlendMode,
    pub shader: Arc<SpriteShader>,
}

impl PendingSprite {
    /// Whether `self` can share a draw call with the given state.
    ///
    /// Textures and shaders compare by identity.
    pub fn same_state(
        &self,
        texture: Option<&Arc<BaseTexture>>,
        blend_mode: Option<BlendMode>,
        shader: Option<&Arc<SpriteShader>>,
    ) -> bool {
        texture.is_some_and(|t| Arc::ptr_eq(t, &self.texture))
            && blend_mode == Some(self.blend_mode)
            && shader.is_some_and(|s| Arc::ptr_eq(s, &self.shader))
    }
}

/// How a flush transfers the vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadMode {
    /// The whole buffer, used when more than half of it is occupied.
    Full,
    /// Only the written prefix.
    Partial,
}

/// Counters kept by a [`SpriteBatcher`](super::SpriteBatcher) across flushes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    /// Sprites accepted into the geometry buffer.
    pub sprites_submitted: u64,
    /// Sprites dropped because their UVs were unresolved.
    pub sprites_skipped: u64,
    /// Non-empty flushes.
    pub flushes: u64,
    /// Flushes triggered by a full buffer.
    pub auto_flushes: u64,
    /// Draw runs emitted.
    pub runs: u64,
    /// Blend mode changes issued.
    pub blend_switches: u64,
    /// Shader binds issued.
    pub shader_switches: u64,
    pub full_uploads: u64,
    pub partial_uploads: u64,
}

impl BatchStats {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
