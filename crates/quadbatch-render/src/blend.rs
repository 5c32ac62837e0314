//! Blend modes and the tracker that avoids redundant blend state changes.

use quadbatch_test_utils::RenderContext;

/// Predefined blend modes for sprites.
///
/// Sprite colors leave the default shader with premultiplied alpha, so the
/// presets below are written for premultiplied sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    /// Standard blending for premultiplied sprites.
    ///
    /// Formula: `src.rgb + dst.rgb * (1 - src.a)`
    #[default]
    Normal,

    /// No blending - source completely replaces destination.
    Replace,

    /// Additive blending - colors are added together.
    ///
    /// Formula: `src.rgb + dst.rgb`
    ///
    /// Use for: Glow effects, particles, light sources.
    Add,

    /// Multiplicative blending.
    ///
    /// Formula: `src.rgb * dst.rgb + dst.rgb * (1 - src.a)`
    ///
    /// Use for: Shadows, color tinting.
    Multiply,

    /// Screen blending, the inverse of multiply.
    ///
    /// Formula: `src.rgb + dst.rgb * (1 - src.rgb)`
    Screen,

    /// Custom blend state for advanced use cases.
    Custom(wgpu::BlendState),
}

impl BlendMode {
    /// Convert to wgpu BlendState.
    pub fn to_blend_state(self) -> Option<wgpu::BlendState> {
        match self {
            BlendMode::Normal => Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
            BlendMode::Replace => Some(wgpu::BlendState::REPLACE),
            BlendMode::Add => Some(wgpu::BlendState {
                color: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::One,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
                alpha: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::One,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
            }),
            BlendMode::Multiply => Some(wgpu::BlendState {
                color: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::Dst,
                    dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
                    operation: wgpu::BlendOperation::Add,
                },
                alpha: wgpu::BlendComponent::OVER,
            }),
            BlendMode::Screen => Some(wgpu::BlendState {
                color: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::One,
                    dst_factor: wgpu::BlendFactor::OneMinusSrc,
                    operation: wgpu::BlendOperation::Add,
                },
                alpha: wgpu::BlendComponent::OVER,
            }),
            BlendMode::Custom(state) => Some(state),
        }
    }
}

impl From<BlendMode> for Option<wgpu::BlendState> {
    fn from(mode: BlendMode) -> Self {
        mode.to_blend_state()
    }
}

impl From<wgpu::BlendState> for BlendMode {
    fn from(state: wgpu::BlendState) -> Self {
        BlendMode::Custom(state)
    }
}

/// Remembers the blend mode last applied to a context.
///
/// Starts with no mode applied, so the first request always reaches the GPU.
#[derive(Debug, Default)]
pub struct BlendModeManager {
    current: Option<BlendMode>,
}

impl BlendModeManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// The blend mode currently applied, if any has been since the last invalidation.
    pub fn current(&self) -> Option<BlendMode> {
        self.current
    }

    /// Apply `mode` unless it is already active. Returns whether a state change was issued.
    pub fn set_blend_mode(&mut self, context: &dyn RenderContext, mode: BlendMode) -> bool {
        if self.current == Some(mode) {
            return false;
        }

        context.set_blend_state(mode.to_blend_state());
        self.current = Some(mode);
        true
    }

    /// Forget the applied mode, e.g. after the context was recreated or another
    /// renderer changed blend state behind our back.
    pub fn invalidate(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quadbatch_test_utils::{MockRenderContext, RenderCall};

    #[test]
    fn test_default_is_normal() {
        assert_eq!(BlendMode::default(), BlendMode::Normal);
        assert_eq!(
            BlendMode::Normal.to_blend_state(),
            Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING)
        );
    }

    #[test]
    fn test_custom_round_trips_state() {
        let mode: BlendMode = wgpu::BlendState::ALPHA_BLENDING.into();
        assert_eq!(mode.to_blend_state(), Some(wgpu::BlendState::ALPHA_BLENDING));
    }

    #[test]
    fn test_manager_skips_redundant_changes() {
        let mock = MockRenderContext::new();
        let mut manager = BlendModeManager::new();

        assert!(manager.set_blend_mode(&mock, BlendMode::Normal));
        assert!(!manager.set_blend_mode(&mock, BlendMode::Normal));
        assert!(manager.set_blend_mode(&mock, BlendMode::Add));
        assert_eq!(mock.count_blend_changes(), 2);
        assert_eq!(
            mock.calls().last(),
            Some(&RenderCall::SetBlendState {
                blend: BlendMode::Add.to_blend_state()
            })
        );
    }

    #[test]
    fn test_invalidate_forces_reapply() {
        let mock = MockRenderContext::new();
        let mut manager = BlendModeManager::new();

        manager.set_blend_mode(&mock, BlendMode::Screen);
        manager.invalidate();
        assert_eq!(manager.current(), None);
        assert!(manager.set_blend_mode(&mock, BlendMode::Screen));
        assert_eq!(mock.count_blend_changes(), 2);
    }
}
