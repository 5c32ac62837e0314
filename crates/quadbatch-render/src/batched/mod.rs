//! Sprite batching.
//!
//! | Stage | Module | Role |
//! |-------|--------|------|
//! | Accumulate | `batcher` | Packs each sprite's quad into the next free slot |
//! | Store | `geometry` | Interleaved vertices plus the static `u16` index layout |
//! | Partition | `partition` | Splits a flush into order-preserving runs of equal state |
//! | Emit | `emit` | One texture bind and one indexed draw per run |
//!
//! A run is a maximal sequence of adjacent sprites sharing texture, blend mode
//! and shader. Runs are drawn in submission order.

mod batcher;
mod config;
mod emit;
mod geometry;
mod partition;
mod types;

pub use batcher::SpriteBatcher;
pub use config::{BatchConfigError, MAX_BATCH_SPRITES, SpriteBatchConfig};
pub use geometry::{GeometryBuffer, INDICES_PER_QUAD, VERTICES_PER_QUAD, quad_indices};
pub use types::{BatchStats, PendingSprite, UploadMode};
