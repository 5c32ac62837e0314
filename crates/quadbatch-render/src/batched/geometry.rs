//! Host-side quad storage and the static index layout.

use crate::texture::TextureUvs;
use crate::vertex::SpriteVertex;

use super::types::UploadMode;

pub const VERTICES_PER_QUAD: usize = 4;
pub const INDICES_PER_QUAD: usize = 6;

/// Indices for `capacity` quads: `[4i, 4i+1, 4i+2, 4i, 4i+2, 4i+3]` per quad.
///
/// `capacity * 4 - 1` must fit in a `u16`.
pub fn quad_indices(capacity: usize) -> Vec<u16> {
    let mut indices = Vec::with_capacity(capacity * INDICES_PER_QUAD);
    for quad in 0..capacity {
        let base = (quad * VERTICES_PER_QUAD) as u16;
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    indices
}

/// Fixed-capacity interleaved vertex storage for sprite quads.
///
/// Slot `i` occupies vertices `4i..4i + 4`. Slots past the last written one
/// hold stale data from earlier batches.
#[derive(Debug)]
pub struct GeometryBuffer {
    vertices: Vec<SpriteVertex>,
    capacity: usize,
}

impl GeometryBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            vertices: vec![SpriteVertex::default(); capacity * VERTICES_PER_QUAD],
            capacity,
        }
    }

    /// Capacity in quads.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Size of the whole buffer in bytes.
    pub fn byte_size(&self) -> u64 {
        self.vertices.len() as u64 * SpriteVertex::SIZE
    }

    /// Store one quad. All four vertices share `color`.
    ///
    /// # Panics
    /// Panics if `slot >= capacity`.
    #[inline]
    pub fn write(&mut self, slot: usize, corners: &[[f32; 2]; 4], uvs: &TextureUvs, color: u32) {
        let start = slot * VERTICES_PER_QUAD;
        let quad = &mut self.vertices[start..start + VERTICES_PER_QUAD];
        for ((vertex, position), tex_coords) in quad.iter_mut().zip(corners).zip(&uvs.0) {
            *vertex = SpriteVertex {
                position: *position,
                tex_coords: *tex_coords,
                color,
            };
        }
    }

    /// Vertices of the quad at `slot`.
    pub fn quad(&self, slot: usize) -> &[SpriteVertex] {
        let start = slot * VERTICES_PER_QUAD;
        &self.vertices[start..start + VERTICES_PER_QUAD]
    }

    /// Bytes to upload after writing `count` quads.
    ///
    /// Past half occupancy the whole buffer goes up in one transfer; below it
    /// only the written prefix does.
    pub fn upload_range(&self, count: usize) -> (UploadMode, &[u8]) {
        if count * 2 > self.capacity {
            (UploadMode::Full, bytemuck::cast_slice(&self.vertices))
        } else {
            let written = &self.vertices[..count * VERTICES_PER_QUAD];
            (UploadMode::Partial, bytemuck::cast_slice(written))
        }
    }
}
