//! GPU binding state shared by every renderer drawing into one context.
//!
//! Renderers borrow the state for the duration of their work and hand it back
//! through the `stop`/`start` protocol, so the blend mode, active shader and
//! draw counter are tracked in one place instead of in globals.

use glam::Vec2;
use quadbatch_test_utils::{ContextId, GpuShaderModule, RenderContext};

use crate::blend::{BlendMode, BlendModeManager};
use crate::shader::{OFFSET_VECTOR, PROJECTION_VECTOR};

#[derive(Debug)]
pub struct RenderState {
    /// Context the tracked blend mode and shader were applied to.
    context: Option<ContextId>,
    blend: BlendModeManager,
    active_shader: Option<u64>,
    /// Half the viewport size with y negated; maps pixels to clip space.
    pub projection: Vec2,
    /// Offset added to every vertex position before projection.
    pub offset: Vec2,
    draw_count: u64,
}

impl RenderState {
    pub fn new(projection: Vec2) -> Self {
        Self {
            context: None,
            blend: BlendModeManager::new(),
            active_shader: None,
            projection,
            offset: Vec2::ZERO,
            draw_count: 0,
        }
    }

    /// State for a `width` x `height` pixel viewport with the origin at the top left.
    pub fn for_viewport(width: f32, height: f32) -> Self {
        Self::new(Self::projection_for(width, height))
    }

    fn projection_for(width: f32, height: f32) -> Vec2 {
        Vec2::new(width / 2.0, -height / 2.0)
    }

    /// Resize the viewport. The active shader is forgotten so its uniforms are
    /// pushed again on the next bind.
    pub fn set_viewport(&mut self, width: f32, height: f32) {
        self.projection = Self::projection_for(width, height);
        self.active_shader = None;
    }

    /// Context the tracked state belongs to, if any has drawn yet.
    pub fn context(&self) -> Option<ContextId> {
        self.context
    }

    /// Point the tracked state at `context`. When it differs from the
    /// context last used, everything applied so far is forgotten so the new
    /// context receives its own blend mode and shader bindings.
    /// Returns whether the context changed.
    pub fn use_context(&mut self, context: &dyn RenderContext) -> bool {
        if self.context == Some(context.id()) {
            return false;
        }
        if let Some(previous) = self.context {
            tracing::trace!(previous, context = context.id(), "Render state switched context");
        }
        self.invalidate();
        self.context = Some(context.id());
        true
    }

    /// The blend mode currently applied to the context, if known.
    pub fn blend_mode(&self) -> Option<BlendMode> {
        self.blend.current()
    }

    /// Apply `mode` unless it is already active. Returns whether a change was issued.
    pub fn set_blend_mode(&mut self, context: &dyn RenderContext, mode: BlendMode) -> bool {
        self.blend.set_blend_mode(context, mode)
    }

    /// Id of the shader module bound through [`bind_shader`](Self::bind_shader), if any.
    pub fn active_shader(&self) -> Option<u64> {
        self.active_shader
    }

    /// Make `shader` the active program and push the projection and offset uniforms.
    pub fn bind_shader(&mut self, context: &dyn RenderContext, shader: &GpuShaderModule) {
        context.use_shader(shader);
        context.set_uniform_vec2(shader, PROJECTION_VECTOR, self.projection.to_array());
        context.set_uniform_vec2(shader, OFFSET_VECTOR, self.offset.to_array());
        self.active_shader = Some(shader.id());
    }

    /// Count one issued draw call.
    pub fn record_draw(&mut self) {
        self.draw_count += 1;
    }

    /// Draw calls issued since the last [`reset_frame_stats`](Self::reset_frame_stats).
    pub fn draw_count(&self) -> u64 {
        self.draw_count
    }

    pub fn reset_frame_stats(&mut self) {
        self.draw_count = 0;
    }

    /// Forget all applied state so the next use re-applies it, e.g. after the
    /// context was recreated.
    pub fn invalidate(&mut self) {
        self.blend.invalidate();
        self.active_shader = None;
    }
}

impl Default for RenderState {
    fn default() -> Self {
        Self::for_viewport(800.0, 600.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quadbatch_test_utils::{MockRenderContext, RenderCall};

    #[test]
    fn test_viewport_projection() {
        let state = RenderState::for_viewport(800.0, 600.0);
        assert_eq!(state.projection, Vec2::new(400.0, -300.0));
        assert_eq!(state.offset, Vec2::ZERO);
    }

    #[test]
    fn test_bind_shader_pushes_uniforms() {
        let mock = MockRenderContext::new();
        let module = mock.create_shader_module(&wgpu::ShaderModuleDescriptor {
            label: None,
            source: wgpu::ShaderSource::Wgsl("".into()),
        });
        mock.clear_calls();

        let mut state = RenderState::for_viewport(100.0, 50.0);
        state.offset = Vec2::new(3.0, 4.0);
        state.bind_shader(&mock, &module);

        assert_eq!(state.active_shader(), Some(module.id()));
        assert_eq!(
            mock.calls(),
            vec![
                RenderCall::UseShader {
                    shader_id: module.id()
                },
                RenderCall::SetUniform {
                    shader_id: module.id(),
                    name: PROJECTION_VECTOR.to_string(),
                    value: [50.0, -25.0],
                },
                RenderCall::SetUniform {
                    shader_id: module.id(),
                    name: OFFSET_VECTOR.to_string(),
                    value: [3.0, 4.0],
                },
            ]
        );
    }

    #[test]
    fn test_invalidate_forgets_applied_state() {
        let mock = MockRenderContext::new();
        let module = quadbatch_test_utils::GpuShaderModule::mock(42);
        let mut state = RenderState::default();

        state.set_blend_mode(&mock, BlendMode::Add);
        state.bind_shader(&mock, &module);
        state.invalidate();

        assert_eq!(state.blend_mode(), None);
        assert_eq!(state.active_shader(), None);
    }

    #[test]
    fn test_switching_context_reapplies_blend_mode() {
        let a = MockRenderContext::new();
        let b = MockRenderContext::new();
        let mut state = RenderState::default();

        assert!(state.use_context(&a));
        assert!(state.set_blend_mode(&a, BlendMode::Normal));
        assert!(!state.use_context(&a));
        assert!(!state.set_blend_mode(&a, BlendMode::Normal));

        assert!(state.use_context(&b));
        assert_eq!(state.context(), Some(b.id()));
        assert_eq!(state.blend_mode(), None);
        assert!(state.set_blend_mode(&b, BlendMode::Normal));
        assert_eq!(b.count_blend_changes(), 1);
    }

    #[test]
    fn test_draw_counter() {
        let mut state = RenderState::default();
        state.record_draw();
        state.record_draw();
        assert_eq!(state.draw_count(), 2);
        state.reset_frame_stats();
        assert_eq!(state.draw_count(), 0);
    }
}
