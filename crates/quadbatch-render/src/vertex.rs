//! Interleaved sprite vertex format.
//!
//! Every sprite is four [`SpriteVertex`] values in a fixed corner order, drawn
//! as two triangles `0-1-2, 0-2-3`. The byte layout is the shader input
//! contract and must not change:
//!
//! | offset | size | attribute | format |
//! |--------|------|-----------|--------|
//! | 0  | 8 | position   | `Float32x2` |
//! | 8  | 8 | tex_coords | `Float32x2` |
//! | 16 | 4 | color      | `Unorm8x4`  |

use bytemuck::{Pod, Zeroable};
use static_assertions::const_assert_eq;

/// One vertex of a sprite quad.
///
/// The color is a single `u32` so it is always written with one integer
/// store. Reading those bits back through a float view could canonicalize NaN
/// patterns and corrupt the color.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct SpriteVertex {
    /// World-space position.
    pub position: [f32; 2],
    /// Texture coordinates.
    pub tex_coords: [f32; 2],
    /// Tint and alpha packed by [`pack_color`].
    pub color: u32,
}

const_assert_eq!(std::mem::size_of::<SpriteVertex>(), 20);

impl SpriteVertex {
    /// Size of one vertex in bytes.
    pub const SIZE: u64 = std::mem::size_of::<Self>() as u64;

    /// Shader locations: 0 = position, 1 = tex_coords, 2 = color.
    pub const ATTRIBUTES: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x2,
        1 => Float32x2,
        // Consumed as four normalized unsigned bytes, lowest byte first.
        2 => Unorm8x4,
    ];

    /// Returns the wgpu vertex buffer layout for per-vertex rendering.
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: Self::SIZE,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Pack a `0xRRGGBB` tint and an alpha in `[0, 1]` into one vertex color word.
///
/// The red and blue bytes swap places so that, read as little-endian bytes by
/// a `Unorm8x4` attribute, the channels arrive as `r, g, b, a`. Alpha is
/// clamped, then rounded to the nearest step.
#[inline]
pub fn pack_color(tint: u32, alpha: f32) -> u32 {
    let alpha = (alpha.clamp(0.0, 1.0) * 255.0).round() as u32;
    ((tint >> 16) & 0xff) | (tint & 0xff00) | ((tint & 0xff) << 16) | (alpha << 24)
}
