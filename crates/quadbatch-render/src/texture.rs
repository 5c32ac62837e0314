//! Sprite textures: shared pixel sources and the frames cut from them.
//!
//! A [`BaseTexture`] owns pixel data and tracks which GPU contexts it is
//! resident in. A [`Texture`] is a cheap, clonable view of a rectangular
//! frame of a base texture, with the geometry the batcher needs: the frame,
//! the crop actually stored in the sheet, an optional trim rectangle, and the
//! resolved UV quad.

use std::fmt;
use std::sync::Arc;

use ahash::HashMap;
use parking_lot::{Mutex, RwLock};
use quadbatch_test_utils::{ContextId, GpuTexture, RenderContext, next_resource_id};

/// Axis-aligned rectangle in texture space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const EMPTY: Rect = Rect::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Whether the rectangle covers no area.
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Texture coordinates for the four corners of a sprite quad.
///
/// Corners are in vertex order: top-left, top-right, bottom-right, bottom-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureUvs(pub [[f32; 2]; 4]);

impl TextureUvs {
    /// UVs covering the whole texture.
    pub const FULL: TextureUvs = TextureUvs([[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]);

    /// Normalize `frame` against a `width` x `height` texture.
    pub fn from_frame(frame: &Rect, width: f32, height: f32) -> Self {
        let u0 = frame.x / width;
        let v0 = frame.y / height;
        let u1 = (frame.x + frame.width) / width;
        let v1 = (frame.y + frame.height) / height;
        TextureUvs([[u0, v0], [u1, v0], [u1, v1], [u0, v1]])
    }

    /// Mirror the quad left to right.
    pub fn flip_horizontal(&self) -> Self {
        let [a, b, c, d] = self.0;
        TextureUvs([b, a, d, c])
    }

    /// Mirror the quad top to bottom.
    pub fn flip_vertical(&self) -> Self {
        let [a, b, c, d] = self.0;
        TextureUvs([d, c, b, a])
    }
}

/// Pixel data backing a [`BaseTexture`].
#[derive(Clone)]
pub struct TextureSource {
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
    pub pixels: Vec<u8>,
}

impl TextureSource {
    /// Tightly packed RGBA8 pixels.
    pub fn rgba8(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(pixels.len(), (width * height * 4) as usize);
        Self {
            width,
            height,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            pixels,
        }
    }
}

impl fmt::Debug for TextureSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextureSource")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

/// A GPU copy and the source generation it was uploaded from.
#[derive(Debug)]
struct ResidentCopy {
    texture: GpuTexture,
    generation: u64,
}

#[derive(Debug, Default)]
struct Residency {
    /// Bumped by every `set_source`; older copies are stale.
    generation: u64,
    copies: HashMap<ContextId, ResidentCopy>,
}

/// Shared pixel source for any number of [`Texture`] frames.
///
/// Sprites compare base textures by identity: two bases with identical
/// pixels are still different textures for batching purposes.
pub struct BaseTexture {
    id: u64,
    resolution: f32,
    source: RwLock<Option<TextureSource>>,
    residency: Mutex<Residency>,
}

impl BaseTexture {
    /// A base texture with its pixels already available.
    pub fn new(source: TextureSource) -> Self {
        Self::with_resolution(Some(source), 1.0)
    }

    /// A base texture whose pixels are still loading.
    ///
    /// Frames cut from it have no UVs until [`set_source`](Self::set_source)
    /// is called and the frame is refreshed with [`Texture::update_uvs`].
    pub fn pending() -> Self {
        Self::with_resolution(None, 1.0)
    }

    /// A base texture authored at `resolution` device pixels per logical pixel.
    pub fn with_resolution(source: Option<TextureSource>, resolution: f32) -> Self {
        Self {
            id: next_resource_id(),
            resolution,
            source: RwLock::new(source),
            residency: Mutex::new(Residency::default()),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Device pixels per logical pixel.
    pub fn resolution(&self) -> f32 {
        self.resolution
    }

    /// Size in pixels, or `None` while loading.
    pub fn size(&self) -> Option<(u32, u32)> {
        self.source.read().as_ref().map(|source| (source.width, source.height))
    }

    pub fn is_loaded(&self) -> bool {
        self.size().is_some_and(|(w, h)| w > 0 && h > 0)
    }

    /// Replace the pixel data.
    ///
    /// Existing GPU copies go stale. Each is destroyed through its own
    /// context and replaced the next time that context makes the texture
    /// resident, or destroyed by [`release`](Self::release).
    pub fn set_source(&self, source: TextureSource) {
        *self.source.write() = Some(source);
        self.residency.lock().generation += 1;
    }

    /// Whether an up-to-date GPU copy exists in the given context.
    pub fn is_resident_in(&self, context: ContextId) -> bool {
        let residency = self.residency.lock();
        residency
            .copies
            .get(&context)
            .is_some_and(|copy| copy.generation == residency.generation)
    }

    /// Destroy the GPU copy held in a live context.
    pub fn release(&self, context: &dyn RenderContext) {
        let copy = self.residency.lock().copies.remove(&context.id());
        if let Some(copy) = copy {
            context.destroy_texture(&copy.texture);
        }
    }

    /// Drop the GPU copy held for a lost context without touching the GPU.
    pub fn forget_context(&self, context: ContextId) {
        self.residency.lock().copies.remove(&context);
    }

    /// The GPU copy of this texture in `context`, uploading it on first use
    /// and replacing a stale copy.
    pub fn make_resident(&self, context: &dyn RenderContext) -> GpuTexture {
        let mut residency = self.residency.lock();
        let generation = residency.generation;

        if let Some(copy) = residency.copies.get(&context.id())
            && copy.generation == generation
        {
            return copy.texture.clone();
        }

        if let Some(stale) = residency.copies.remove(&context.id()) {
            tracing::debug!(texture = self.id, context = context.id(), "Replacing stale sprite texture");
            context.destroy_texture(&stale.texture);
        }

        let texture = self.upload(context);
        residency.copies.insert(
            context.id(),
            ResidentCopy {
                texture: texture.clone(),
                generation,
            },
        );
        texture
    }

    fn upload(&self, context: &dyn RenderContext) -> GpuTexture {
        let source = self.source.read();
        let placeholder;
        let source = match source.as_ref() {
            Some(source) => source,
            None => {
                tracing::warn!(texture = self.id, "Uploading a base texture with no pixel data");
                placeholder = TextureSource::rgba8(1, 1, vec![0; 4]);
                &placeholder
            }
        };

        tracing::debug!(
            texture = self.id,
            context = context.id(),
            width = source.width,
            height = source.height,
            "Uploading sprite texture"
        );

        context.create_texture(
            &wgpu::TextureDescriptor {
                label: Some("Sprite Texture"),
                size: wgpu::Extent3d {
                    width: source.width,
                    height: source.height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: source.format,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            &source.pixels,
        )
    }
}

impl fmt::Debug for BaseTexture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaseTexture")
            .field("id", &self.id)
            .field("resolution", &self.resolution)
            .field("size", &self.size())
            .finish()
    }
}

/// A frame of a [`BaseTexture`], ready to be drawn by a sprite.
#[derive(Debug, Clone)]
pub struct Texture {
    base: Arc<BaseTexture>,
    frame: Rect,
    crop: Rect,
    trim: Option<Rect>,
    uvs: Option<TextureUvs>,
}

impl Texture {
    /// A frame covering the whole base texture.
    ///
    /// If the base is still loading the frame is picked up from its size on
    /// the first successful [`update_uvs`](Self::update_uvs).
    pub fn from_base(base: Arc<BaseTexture>) -> Self {
        Self::new(base, Rect::EMPTY)
    }

    /// A frame cut from `base`. The crop defaults to the frame.
    pub fn new(base: Arc<BaseTexture>, frame: Rect) -> Self {
        let mut texture = Self {
            base,
            frame,
            crop: frame,
            trim: None,
            uvs: None,
        };
        texture.update_uvs();
        texture
    }

    /// Mark this frame as trimmed out of a larger original.
    ///
    /// `trim.x`/`trim.y` place the stored pixels inside the original frame and
    /// `trim.width`/`trim.height` are the original frame's size.
    pub fn with_trim(mut self, trim: Rect) -> Self {
        self.trim = Some(trim);
        self
    }

    /// Set the region of the sheet that holds this frame's pixels.
    pub fn with_crop(mut self, crop: Rect) -> Self {
        self.crop = crop;
        self
    }

    /// Move the frame and recompute UVs.
    ///
    /// The crop is reset to the new frame and any trim is cleared, since it
    /// described the old frame. Re-apply one with [`with_trim`](Self::with_trim).
    pub fn set_frame(&mut self, frame: Rect) {
        self.frame = frame;
        self.crop = frame;
        self.trim = None;
        self.update_uvs();
    }

    /// Recompute the UV quad from the frame. Returns whether the UVs resolved.
    ///
    /// UVs stay unresolved while the base texture has no pixels.
    pub fn update_uvs(&mut self) -> bool {
        let Some((width, height)) = self.base.size().filter(|&(w, h)| w > 0 && h > 0) else {
            self.uvs = None;
            return false;
        };

        if self.frame.is_empty() {
            self.frame = Rect::new(0.0, 0.0, width as f32, height as f32);
            self.crop = self.frame;
        }

        self.uvs = Some(TextureUvs::from_frame(
            &self.frame,
            width as f32,
            height as f32,
        ));
        true
    }

    pub fn base(&self) -> &Arc<BaseTexture> {
        &self.base
    }

    pub fn frame(&self) -> Rect {
        self.frame
    }

    pub fn crop(&self) -> Rect {
        self.crop
    }

    pub fn trim(&self) -> Option<Rect> {
        self.trim
    }

    /// The UV quad, or `None` while unresolved.
    pub fn uvs(&self) -> Option<&TextureUvs> {
        self.uvs.as_ref()
    }

    pub fn resolution(&self) -> f32 {
        self.base.resolution()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quadbatch_test_utils::{MockRenderContext, RenderCall};

    fn base(width: u32, height: u32) -> Arc<BaseTexture> {
        Arc::new(BaseTexture::new(TextureSource::rgba8(
            width,
            height,
            vec![255; (width * height * 4) as usize],
        )))
    }

    #[test]
    fn test_uvs_from_frame() {
        let texture = Texture::new(base(128, 64), Rect::new(32.0, 16.0, 32.0, 16.0));
        let uvs = texture.uvs().expect("resolved");
        assert_eq!(uvs.0, [[0.25, 0.25], [0.5, 0.25], [0.5, 0.5], [0.25, 0.5]]);
    }

    #[test]
    fn test_from_base_covers_whole_texture() {
        let texture = Texture::from_base(base(8, 4));
        assert_eq!(texture.frame(), Rect::new(0.0, 0.0, 8.0, 4.0));
        assert_eq!(texture.uvs(), Some(&TextureUvs::FULL));
    }

    #[test]
    fn test_pending_base_leaves_uvs_unresolved() {
        let base = Arc::new(BaseTexture::pending());
        let mut texture = Texture::from_base(base.clone());
        assert!(texture.uvs().is_none());
        assert!(!base.is_loaded());

        base.set_source(TextureSource::rgba8(2, 2, vec![0; 16]));
        assert!(texture.update_uvs());
        assert_eq!(texture.uvs(), Some(&TextureUvs::FULL));
    }

    #[test]
    fn test_uv_flip() {
        let flipped = TextureUvs::FULL.flip_horizontal();
        assert_eq!(flipped.0[0], [1.0, 0.0]);
        assert_eq!(flipped.0[1], [0.0, 0.0]);

        let flipped = TextureUvs::FULL.flip_vertical();
        assert_eq!(flipped.0[0], [0.0, 1.0]);
        assert_eq!(flipped.0[2], [1.0, 0.0]);
    }

    #[test]
    fn test_make_resident_uploads_once_per_context() {
        let base = base(4, 4);
        let first = MockRenderContext::new();
        let second = MockRenderContext::new();

        let a = base.make_resident(&first);
        let b = base.make_resident(&first);
        assert_eq!(a.id(), b.id());
        assert_eq!(first.count_texture_creates(), 1);

        base.make_resident(&second);
        assert_eq!(second.count_texture_creates(), 1);
        assert!(base.is_resident_in(first.id()));

        base.forget_context(first.id());
        assert!(!base.is_resident_in(first.id()));
        base.make_resident(&first);
        assert_eq!(first.count_texture_creates(), 2);
        assert_eq!(first.count_texture_destroys(), 0);
    }

    #[test]
    fn test_release_destroys_gpu_copy() {
        let base = base(2, 2);
        let mock = MockRenderContext::new();
        let copy = base.make_resident(&mock);

        base.release(&mock);
        base.release(&mock);

        assert!(!base.is_resident_in(mock.id()));
        assert_eq!(
            mock.calls().last(),
            Some(&RenderCall::DestroyTexture {
                texture_id: copy.id()
            })
        );
        assert_eq!(mock.count_texture_destroys(), 1);
    }

    #[test]
    fn test_set_source_replaces_stale_copy() {
        let base = base(1, 1);
        let mock = MockRenderContext::new();
        let old = base.make_resident(&mock);

        base.set_source(TextureSource::rgba8(2, 1, vec![0; 8]));
        assert!(!base.is_resident_in(mock.id()));

        let new = base.make_resident(&mock);
        assert_ne!(old.id(), new.id());
        assert_eq!(new.size(), (2, 1));
        assert!(base.is_resident_in(mock.id()));
        assert!(mock.calls().contains(&RenderCall::DestroyTexture { texture_id: old.id() }));
        assert_eq!(mock.count_texture_destroys(), 1);
        assert_eq!(mock.count_texture_creates(), 2);
    }

    #[test]
    fn test_set_frame_clears_trim() {
        let mut texture = Texture::new(base(64, 64), Rect::new(0.0, 0.0, 16.0, 16.0))
            .with_trim(Rect::new(2.0, 2.0, 20.0, 20.0));
        assert!(texture.trim().is_some());

        texture.set_frame(Rect::new(16.0, 0.0, 16.0, 16.0));
        assert_eq!(texture.trim(), None);
        assert_eq!(texture.crop(), Rect::new(16.0, 0.0, 16.0, 16.0));
    }
}
