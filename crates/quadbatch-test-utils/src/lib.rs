//! Test utilities for quadbatch.
//!
//! This crate provides the seam between the sprite batcher and the GPU:
//!
//! - [`RenderContext`] - Object-safe trait covering every GPU operation the batcher issues
//! - `MockRenderContext` - Recording implementation for testing (requires `mock` feature)
//! - GPU wrapper types (`GpuBuffer`, `GpuTexture`, `GpuShaderModule`) - Can be real or mock
//!
//! # Example
//!
//! ```rust
//! # #[cfg(feature = "mock")]
//! # {
//! use quadbatch_test_utils::{MockRenderContext, RenderContext};
//! use wgpu::*;
//!
//! let mock = MockRenderContext::new();
//!
//! let buffer = mock.create_buffer(&BufferDescriptor {
//!     label: Some("test_buffer"),
//!     size: 1024,
//!     usage: BufferUsages::VERTEX,
//!     mapped_at_creation: false,
//! });
//!
//! assert_eq!(mock.count_buffer_creates(), 1);
//! assert!(buffer.is_mock());
//! # }
//! ```
//!
//! # Design Philosophy
//!
//! ## 1. No Lifetimes
//!
//! All GPU wrapper types are owned and cheap to clone. Every wrapper carries a
//! process-unique id so callers can key caches on it without hashing wgpu handles.
//!
//! ## 2. Interior Mutability
//!
//! Implementations take `&self` and use `Mutex` internally, so one context can be
//! shared through an `Arc` by every renderer that draws with it.
//!
//! ## 3. Object Safety
//!
//! `RenderContext` is object-safe (`dyn RenderContext`), so the batcher works the
//! same against the wgpu backend and the mock.

pub mod gpu_types;
#[cfg(feature = "mock")]
pub mod mock_render;
pub mod render_context;

pub use gpu_types::*;
#[cfg(feature = "mock")]
pub use mock_render::*;
pub use render_context::*;
