//! Quadbatch Render - sprite batching for 2D renderers
//!
//! This crate provides:
//! - A byte-exact interleaved sprite vertex format with packed colors
//! - A fixed-capacity geometry buffer with a static quad index layout
//! - [`SpriteBatcher`], which turns sprites into the fewest order-preserving draw calls
//! - Texture frames with trim/crop support, blend modes and per-context shader variants
//! - A wgpu backend ([`GraphicsContext`]) behind the `RenderContext` trait
//!
//! # Example
//!
//! ```ignore
//! use quadbatch_render::*;
//!
//! let context = GraphicsContext::new_sync()?;
//! let mut batcher = SpriteBatcher::new(context.clone(), SpriteBatchConfig::default())?;
//! let mut state = RenderState::for_viewport(1280.0, 720.0);
//!
//! context.begin_frame(&view, format, Some(wgpu::Color::BLACK));
//! for sprite in &sprites {
//!     batcher.render(&mut state, sprite);
//! }
//! batcher.flush(&mut state);
//! context.submit();
//! ```

mod batched;
mod blend;
mod context;
mod context_impl;
mod shader;
mod sprite;
mod state;
mod texture;
mod vertex;

pub use batched::*;
pub use blend::*;
pub use context::{GraphicsContext, GraphicsContextDescriptor, GraphicsContextError};
pub use shader::*;
pub use sprite::*;
pub use state::*;
pub use texture::*;
pub use vertex::*;

pub use quadbatch_test_utils::{ContextId, RenderContext};
