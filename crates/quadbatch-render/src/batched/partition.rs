//! Splitting a flushed batch into draw runs.

use crate::state::RenderState;

use super::batcher::SpriteBatcher;
use super::emit::emit_run;

impl SpriteBatcher {
    /// Walk the pending sprites once, emitting a draw each time texture,
    /// blend mode or shader changes, then the trailing run. Consumes the
    /// pending list and returns the number of runs drawn.
    ///
    /// State from the previous flush carries over, so a batch that continues
    /// with the same texture, blend mode and shader issues no state changes.
    pub(super) fn emit_runs(&mut self, state: &mut RenderState) -> usize {
        let context = self.context.clone();
        let context = context.as_ref();
        let pending = std::mem::take(&mut self.pending);

        // The state was last applied to another context.
        if state.use_context(context) {
            self.current_texture = None;
        }

        // Someone else bound a shader since our last run.
        if self
            .current_shader
            .as_ref()
            .is_some_and(|(_, module)| state.active_shader() != Some(*module))
        {
            self.current_shader = None;
        }

        let mut runs = 0;
        let mut run_start = 0;
        let mut run_length = 0;

        for (index, sprite) in pending.iter().enumerate() {
            if sprite.same_state(
                self.current_texture.as_ref(),
                state.blend_mode(),
                self.current_shader.as_ref().map(|(shader, _)| shader),
            ) {
                run_length += 1;
                continue;
            }

            if let Some(texture) = &self.current_texture
                && emit_run(context, state, texture, run_length, run_start)
            {
                runs += 1;
            }

            self.current_texture = Some(sprite.texture.clone());

            if state.set_blend_mode(context, sprite.blend_mode) {
                self.stats.blend_switches += 1;
            }

            let shader_changed = !self
                .current_shader
                .as_ref()
                .is_some_and(|(shader, _)| std::sync::Arc::ptr_eq(shader, &sprite.shader));
            if shader_changed {
                let module = sprite.shader.variant(context);
                state.bind_shader(context, &module);
                self.current_shader = Some((sprite.shader.clone(), module.id()));
                self.stats.shader_switches += 1;
            }

            run_start = index;
            run_length = 1;
        }

        if let Some(texture) = &self.current_texture
            && emit_run(context, state, texture, run_length, run_start)
        {
            runs += 1;
        }

        self.stats.runs += runs as u64;

        // Hand the allocation back for the next batch.
        self.pending = pending;
        self.pending.clear();
        runs
    }
}
