//! Issuing one draw call per run.

use quadbatch_test_utils::RenderContext;

use crate::state::RenderState;
use crate::texture::BaseTexture;

use super::geometry::INDICES_PER_QUAD;

/// Draw `run_length` quads starting at quad `run_start` with `texture`.
///
/// Uploads the texture on its first use in `context`. Returns `false`
/// without touching the context for an empty run.
pub(super) fn emit_run(
    context: &dyn RenderContext,
    state: &mut RenderState,
    texture: &BaseTexture,
    run_length: usize,
    run_start: usize,
) -> bool {
    if run_length == 0 {
        return false;
    }

    let gpu_texture = texture.make_resident(context);
    context.bind_texture(&gpu_texture);

    let first = (run_start * INDICES_PER_QUAD) as u32;
    let count = (run_length * INDICES_PER_QUAD) as u32;
    context.draw_indexed(first..first + count);
    state.record_draw();
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::TextureSource;
    use quadbatch_test_utils::MockRenderContext;

    #[test]
    fn test_empty_run_is_noop() {
        let mock = MockRenderContext::new();
        let mut state = RenderState::default();
        let texture = BaseTexture::new(TextureSource::rgba8(1, 1, vec![0; 4]));

        assert!(!emit_run(&mock, &mut state, &texture, 0, 3));
        assert_eq!(mock.call_count(), 0);
        assert_eq!(state.draw_count(), 0);
    }

    #[test]
    fn test_run_draws_index_range() {
        let mock = MockRenderContext::new();
        let mut state = RenderState::default();
        let texture = BaseTexture::new(TextureSource::rgba8(1, 1, vec![0; 4]));

        assert!(emit_run(&mock, &mut state, &texture, 3, 2));
        assert!(emit_run(&mock, &mut state, &texture, 1, 5));

        assert_eq!(mock.draw_ranges(), vec![12..30, 30..36]);
        assert_eq!(mock.count_texture_creates(), 1);
        assert_eq!(mock.count_texture_binds(), 2);
        assert_eq!(state.draw_count(), 2);
    }
}
