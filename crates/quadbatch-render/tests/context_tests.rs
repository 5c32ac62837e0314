//! Graphics context tests against a real adapter.

use std::sync::Arc;

use glam::Vec2;
use quadbatch_render::{
    BaseTexture, GraphicsContext, GraphicsContextError, RenderContext, RenderState, Sprite, SpriteBatchConfig,
    SpriteBatcher, Texture, TextureSource,
};

fn render_target(context: &GraphicsContext, width: u32, height: u32) -> wgpu::Texture {
    context.device().create_texture(&wgpu::TextureDescriptor {
        label: Some("Test Target"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    })
}

#[test]
#[ignore] // Requires GPU - run with: cargo test --test context_tests -- --ignored
fn test_context_creation_sync() {
    match GraphicsContext::new_sync() {
        Ok(ctx) => {
            assert_eq!(Arc::strong_count(&ctx), 1);
            assert!(ctx.device().limits().max_texture_dimension_2d > 0);
        }
        Err(e) => {
            // Allow test to pass if no GPU (CI environments)
            println!("GPU not available: {e}");
        }
    }
}

#[test]
#[ignore] // Requires GPU
fn test_multiple_flushes_in_one_frame() {
    let Ok(context) = GraphicsContext::new_sync() else {
        return;
    };
    let target = render_target(&context, 64, 64);
    let view = target.create_view(&wgpu::TextureViewDescriptor::default());

    let mut batcher = SpriteBatcher::new(context.clone(), SpriteBatchConfig::default().with_max_sprites(2)).unwrap();
    let mut state = RenderState::for_viewport(64.0, 64.0);
    let texture = Arc::new(BaseTexture::new(TextureSource::rgba8(2, 2, vec![255; 16])));

    context.begin_frame(&view, wgpu::TextureFormat::Rgba8Unorm, Some(wgpu::Color::BLACK));
    for i in 0..5 {
        let sprite = Sprite::new(Texture::from_base(texture.clone())).with_position(Vec2::new(i as f32 * 4.0, 0.0));
        batcher.render(&mut state, &sprite);
    }
    batcher.flush(&mut state);
    // Earlier flushes were submitted when the vertex buffer was rewritten.
    assert_eq!(context.pending_draws(), 1);

    context.submit();
    assert_eq!(context.pending_draws(), 0);
    assert_eq!(context.pipeline_count(), 1);
    assert_eq!(state.draw_count(), 3);
}

#[test]
#[ignore] // Requires GPU
fn test_draw_outside_frame_is_dropped() {
    let Ok(context) = GraphicsContext::new_sync() else {
        return;
    };
    context.draw_indexed(0..6);
    assert_eq!(context.pending_draws(), 0);
}

#[test]
#[ignore] // Requires GPU
fn test_released_texture_drops_bind_group() {
    let Ok(context) = GraphicsContext::new_sync() else {
        return;
    };
    assert!(!context.is_lost());

    let texture = BaseTexture::new(TextureSource::rgba8(2, 2, vec![255; 16]));
    texture.make_resident(&*context);
    assert_eq!(context.texture_group_count(), 1);

    texture.set_source(TextureSource::rgba8(4, 4, vec![255; 64]));
    texture.make_resident(&*context);
    assert_eq!(context.texture_group_count(), 1);

    texture.release(&*context);
    assert_eq!(context.texture_group_count(), 0);
}

#[test]
fn test_context_error_display() {
    let err = GraphicsContextError::AdapterUnavailable;
    assert_eq!(err.to_string(), "No suitable GPU adapter found");
}
