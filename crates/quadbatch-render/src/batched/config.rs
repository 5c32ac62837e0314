//! Construction-time batcher configuration.

use super::geometry::VERTICES_PER_QUAD;

/// Largest capacity whose highest vertex index still fits in a `u16`.
pub const MAX_BATCH_SPRITES: usize = (u16::MAX as usize + 1) / VERTICES_PER_QUAD;

/// Configuration fixed for the lifetime of a [`SpriteBatcher`](super::SpriteBatcher).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpriteBatchConfig {
    /// Number of sprites the geometry buffer holds before an automatic flush.
    pub max_sprites: usize,
    /// Truncate vertex positions to whole pixels.
    pub round_pixels: bool,
}

impl Default for SpriteBatchConfig {
    fn default() -> Self {
        Self {
            max_sprites: 2000,
            round_pixels: false,
        }
    }
}

impl SpriteBatchConfig {
    pub fn with_max_sprites(mut self, max_sprites: usize) -> Self {
        self.max_sprites = max_sprites;
        self
    }

    pub fn with_round_pixels(mut self, round_pixels: bool) -> Self {
        self.round_pixels = round_pixels;
        self
    }

    /// Check the capacity against the `u16` index range.
    pub fn validate(&self) -> Result<(), BatchConfigError> {
        if self.max_sprites == 0 {
            return Err(BatchConfigError::ZeroCapacity);
        }
        if self.max_sprites > MAX_BATCH_SPRITES {
            return Err(BatchConfigError::CapacityExceedsIndexRange {
                requested: self.max_sprites,
                max: MAX_BATCH_SPRITES,
            });
        }
        Ok(())
    }
}

/// Invalid batcher configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchConfigError {
    /// A batch must hold at least one sprite
    ZeroCapacity,
    /// Vertex indices would overflow `u16`
    CapacityExceedsIndexRange { requested: usize, max: usize },
}

impl std::fmt::Display for BatchConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroCapacity => write!(f, "Sprite batch capacity must be at least 1"),
            Self::CapacityExceedsIndexRange { requested, max } => write!(
                f,
                "Sprite batch capacity {} exceeds the 16-bit index range (max {})",
                requested, max
            ),
        }
    }
}

impl std::error::Error for BatchConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SpriteBatchConfig::default();
        assert_eq!(config.max_sprites, 2000);
        assert!(!config.round_pixels);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_max_capacity_fits_u16() {
        assert_eq!(MAX_BATCH_SPRITES, 16384);
        assert_eq!(MAX_BATCH_SPRITES * 4 - 1, u16::MAX as usize);
        assert!(SpriteBatchConfig::default()
            .with_max_sprites(MAX_BATCH_SPRITES)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert_eq!(
            SpriteBatchConfig::default().with_max_sprites(0).validate(),
            Err(BatchConfigError::ZeroCapacity)
        );
        assert_eq!(
            SpriteBatchConfig::default()
                .with_max_sprites(MAX_BATCH_SPRITES + 1)
                .validate(),
            Err(BatchConfigError::CapacityExceedsIndexRange {
                requested: 16385,
                max: 16384
            })
        );
    }

    #[test]
    fn test_error_display() {
        let err = BatchConfigError::CapacityExceedsIndexRange {
            requested: 20000,
            max: 16384,
        };
        assert!(err.to_string().contains("20000"));
    }
}
