//! Sprites and the quad geometry computed from them.

use std::sync::Arc;

use glam::{Affine2, Vec2};

use crate::blend::BlendMode;
use crate::shader::SpriteShader;
use crate::texture::Texture;
use crate::vertex::pack_color;

/// A textured, tinted quad with a world transform.
///
/// The transform is already composed by the caller; the batcher only reads it.
#[derive(Debug, Clone)]
pub struct Sprite {
    pub texture: Texture,
    /// World transform. The linear part is divided by the texture resolution
    /// before use.
    pub transform: Affine2,
    /// Local origin as a fraction of the frame, `(0, 0)` top left to `(1, 1)` bottom right.
    pub anchor: Vec2,
    /// Tint as `0xRRGGBB`.
    pub tint: u32,
    pub alpha: f32,
    pub blend_mode: BlendMode,
    /// Shader override. `None` uses the batcher's default shader.
    pub shader: Option<Arc<SpriteShader>>,
}

impl Sprite {
    pub fn new(texture: Texture) -> Self {
        Self {
            texture,
            transform: Affine2::IDENTITY,
            anchor: Vec2::ZERO,
            tint: 0xFFFFFF,
            alpha: 1.0,
            blend_mode: BlendMode::Normal,
            shader: None,
        }
    }

    pub fn with_transform(mut self, transform: Affine2) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_position(mut self, position: Vec2) -> Self {
        self.transform.translation = position;
        self
    }

    pub fn with_anchor(mut self, anchor: Vec2) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn with_tint(mut self, tint: u32) -> Self {
        self.tint = tint;
        self
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_blend_mode(mut self, blend_mode: BlendMode) -> Self {
        self.blend_mode = blend_mode;
        self
    }

    pub fn with_shader(mut self, shader: Arc<SpriteShader>) -> Self {
        self.shader = Some(shader);
        self
    }

    /// Tint and alpha as one vertex color word.
    pub fn packed_color(&self) -> u32 {
        pack_color(self.tint, self.alpha)
    }

    /// Local-space extents of the quad around the anchor.
    pub fn local_extents(&self) -> QuadExtents {
        let Vec2 { x: ax, y: ay } = self.anchor;

        match self.texture.trim() {
            Some(trim) => {
                let crop = self.texture.crop();
                let w1 = trim.x - ax * trim.width;
                let h1 = trim.y - ay * trim.height;
                QuadExtents {
                    w0: w1 + crop.width,
                    w1,
                    h0: h1 + crop.height,
                    h1,
                }
            }
            None => {
                let frame = self.texture.frame();
                QuadExtents {
                    w0: frame.width * (1.0 - ax),
                    w1: -frame.width * ax,
                    h0: frame.height * (1.0 - ay),
                    h1: -frame.height * ay,
                }
            }
        }
    }

    /// World-space corners in vertex order. With `round_pixels` each
    /// coordinate is truncated toward zero.
    pub fn world_corners(&self, round_pixels: bool) -> [[f32; 2]; 4] {
        let QuadExtents { w0, w1, h0, h1 } = self.local_extents();

        let resolution = self.texture.resolution();
        let Vec2 { x: a, y: b } = self.transform.matrix2.x_axis / resolution;
        let Vec2 { x: c, y: d } = self.transform.matrix2.y_axis / resolution;
        let Vec2 { x: tx, y: ty } = self.transform.translation;

        let corner = |lx: f32, ly: f32| {
            let x = a * lx + c * ly + tx;
            let y = d * ly + b * lx + ty;
            if round_pixels {
                [x.trunc(), y.trunc()]
            } else {
                [x, y]
            }
        };

        [corner(w1, h1), corner(w0, h1), corner(w0, h0), corner(w1, h0)]
    }
}

/// Local quad bounds: `w1..w0` horizontally and `h1..h0` vertically.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadExtents {
    pub w0: f32,
    pub w1: f32,
    pub h0: f32,
    pub h1: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::{BaseTexture, Rect, TextureSource};

    fn texture(width: u32, height: u32) -> Texture {
        let base = BaseTexture::new(TextureSource::rgba8(
            width,
            height,
            vec![0; (width * height * 4) as usize],
        ));
        Texture::from_base(Arc::new(base))
    }

    #[test]
    fn test_untrimmed_extents_top_left_anchor() {
        let sprite = Sprite::new(texture(10, 20));
        assert_eq!(
            sprite.local_extents(),
            QuadExtents {
                w0: 10.0,
                w1: 0.0,
                h0: 20.0,
                h1: 0.0
            }
        );
    }

    #[test]
    fn test_untrimmed_extents_centered() {
        let sprite = Sprite::new(texture(10, 20)).with_anchor(Vec2::splat(0.5));
        assert_eq!(
            sprite.local_extents(),
            QuadExtents {
                w0: 5.0,
                w1: -5.0,
                h0: 10.0,
                h1: -10.0
            }
        );
    }

    #[test]
    fn test_trimmed_extents() {
        // 6x4 pixels stored, placed at (2, 3) inside a 10x10 original frame.
        let base = Arc::new(BaseTexture::new(TextureSource::rgba8(16, 16, vec![0; 1024])));
        let tex = Texture::new(base, Rect::new(0.0, 0.0, 6.0, 4.0))
            .with_trim(Rect::new(2.0, 3.0, 10.0, 10.0));
        let sprite = Sprite::new(tex).with_anchor(Vec2::splat(0.5));

        assert_eq!(
            sprite.local_extents(),
            QuadExtents {
                w0: 3.0,
                w1: -3.0,
                h0: 2.0,
                h1: -2.0
            }
        );
    }

    #[test]
    fn test_world_corners_translate() {
        let sprite = Sprite::new(texture(10, 20)).with_position(Vec2::new(5.0, 7.0));
        assert_eq!(
            sprite.world_corners(false),
            [[5.0, 7.0], [15.0, 7.0], [15.0, 27.0], [5.0, 27.0]]
        );
    }

    #[test]
    fn test_world_corners_rotate() {
        let sprite = Sprite::new(texture(10, 20))
            .with_transform(Affine2::from_angle(std::f32::consts::FRAC_PI_2));
        let corners = sprite.world_corners(false);
        // (10, 0) rotates to (0, 10); (0, 20) rotates to (-20, 0).
        assert!((corners[1][0] - 0.0).abs() < 1e-4);
        assert!((corners[1][1] - 10.0).abs() < 1e-4);
        assert!((corners[3][0] + 20.0).abs() < 1e-4);
        assert!(corners[3][1].abs() < 1e-4);
    }

    #[test]
    fn test_resolution_scales_linear_part() {
        let base = Arc::new(BaseTexture::with_resolution(
            Some(TextureSource::rgba8(10, 20, vec![0; 800])),
            2.0,
        ));
        let sprite = Sprite::new(Texture::from_base(base)).with_position(Vec2::new(1.0, 1.0));
        assert_eq!(sprite.world_corners(false)[2], [6.0, 11.0]);
    }

    #[test]
    fn test_round_pixels_truncates() {
        let sprite = Sprite::new(texture(10, 20)).with_position(Vec2::new(1.7, -2.5));
        assert_eq!(sprite.world_corners(true)[0], [1.0, -2.0]);
        assert_eq!(sprite.world_corners(false)[0], [1.7, -2.5]);
    }

    #[test]
    fn test_default_tint_packs_white() {
        let sprite = Sprite::new(texture(1, 1)).with_alpha(0.5);
        assert_eq!(sprite.packed_color(), 0x80FFFFFF);
    }
}
