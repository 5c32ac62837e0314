//! Benchmarks for sprite accumulation and flushing

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use glam::{Affine2, Vec2};
use quadbatch_render::{
    BaseTexture, BlendMode, RenderState, Sprite, SpriteBatchConfig, SpriteBatcher, Texture, TextureSource,
};
use quadbatch_test_utils::MockRenderContext;

fn textures(count: usize) -> Vec<Arc<BaseTexture>> {
    (0..count)
        .map(|_| Arc::new(BaseTexture::new(TextureSource::rgba8(16, 16, vec![255; 16 * 16 * 4]))))
        .collect()
}

fn sprites(count: usize, textures: &[Arc<BaseTexture>]) -> Vec<Sprite> {
    (0..count)
        .map(|i| {
            let texture = &textures[(i / 8) % textures.len()];
            Sprite::new(Texture::from_base(texture.clone()))
                .with_transform(Affine2::from_scale_angle_translation(
                    Vec2::splat(1.5),
                    i as f32 * 0.01,
                    Vec2::new((i % 100) as f32 * 8.0, (i / 100) as f32 * 8.0),
                ))
                .with_anchor(Vec2::splat(0.5))
                .with_tint(0x336699)
                .with_alpha(0.8)
        })
        .collect()
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("sprite_render");

    for size in [100, 1000, 10000] {
        group.throughput(Throughput::Elements(size as u64));
        let textures = textures(4);
        let sprites = sprites(size, &textures);

        group.bench_with_input(BenchmarkId::new("render_flush", size), &sprites, |b, sprites| {
            let mock = Arc::new(MockRenderContext::new());
            let mut batcher = SpriteBatcher::new(mock.clone(), SpriteBatchConfig::default()).unwrap();
            let mut state = RenderState::for_viewport(1920.0, 1080.0);

            b.iter(|| {
                for sprite in sprites {
                    batcher.render(&mut state, black_box(sprite));
                }
                batcher.flush(&mut state);
                mock.clear_calls();
            });
        });

        group.bench_with_input(BenchmarkId::new("round_pixels", size), &sprites, |b, sprites| {
            let mock = Arc::new(MockRenderContext::new());
            let config = SpriteBatchConfig::default().with_round_pixels(true);
            let mut batcher = SpriteBatcher::new(mock.clone(), config).unwrap();
            let mut state = RenderState::for_viewport(1920.0, 1080.0);

            b.iter(|| {
                for sprite in sprites {
                    batcher.render(&mut state, black_box(sprite));
                }
                batcher.flush(&mut state);
                mock.clear_calls();
            });
        });
    }

    group.finish();
}

fn bench_partition(c: &mut Criterion) {
    let mut group = c.benchmark_group("sprite_partition");
    let textures = textures(2);

    // Alternating textures and blend modes: every sprite starts a run.
    let worst: Vec<Sprite> = (0..2000)
        .map(|i| {
            Sprite::new(Texture::from_base(textures[i % 2].clone())).with_blend_mode(if i % 3 == 0 {
                BlendMode::Add
            } else {
                BlendMode::Normal
            })
        })
        .collect();
    let best: Vec<Sprite> = (0..2000)
        .map(|_| Sprite::new(Texture::from_base(textures[0].clone())))
        .collect();

    for (name, sprites) in [("single_run", &best), ("run_per_sprite", &worst)] {
        group.throughput(Throughput::Elements(sprites.len() as u64));
        group.bench_function(name, |b| {
            let mock = Arc::new(MockRenderContext::new());
            let mut batcher = SpriteBatcher::new(mock.clone(), SpriteBatchConfig::default()).unwrap();
            let mut state = RenderState::for_viewport(1920.0, 1080.0);

            b.iter(|| {
                for sprite in sprites.iter() {
                    batcher.render(&mut state, sprite);
                }
                batcher.flush(&mut state);
                mock.clear_calls();
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_render, bench_partition);
criterion_main!(benches);
