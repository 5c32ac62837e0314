//! GPU resource wrappers that can be real or mock.
//!
//! These types wrap WGPU resources and allow for both real GPU operations
//! and mock implementations for testing.

use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_RESOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// Allocate a process-unique resource id.
///
/// Ids are never reused, so a cache keyed on them cannot alias a dropped resource.
pub fn next_resource_id() -> u64 {
    NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Wrapper around GPU buffer that can be real or mock.
///
/// # Design Pattern: Opaque Wrapper
///
/// This type hides whether it contains a real `wgpu::Buffer` or a mock.
/// Users hold owned `GpuBuffer`, which is cheap to clone (wgpu handles are
/// reference counted).
#[derive(Clone, Debug)]
pub struct GpuBuffer {
    id: u64,
    size: u64,
    inner: GpuBufferInner,
}

#[derive(Clone, Debug)]
enum GpuBufferInner {
    Real(wgpu::Buffer),
    #[cfg(feature = "mock")]
    Mock,
}

impl GpuBuffer {
    /// Create from real WGPU buffer
    pub fn from_wgpu(buffer: wgpu::Buffer) -> Self {
        Self {
            id: next_resource_id(),
            size: buffer.size(),
            inner: GpuBufferInner::Real(buffer),
        }
    }

    /// Create mock buffer (for testing)
    #[cfg(feature = "mock")]
    pub fn mock(id: u64, size: u64) -> Self {
        Self {
            id,
            size,
            inner: GpuBufferInner::Mock,
        }
    }

    /// Process-unique id of this buffer.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Size of the buffer in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Get the underlying wgpu::Buffer (if real)
    ///
    /// # Panics
    /// Panics if this is a mock buffer (test code should never call this)
    pub fn as_wgpu(&self) -> &wgpu::Buffer {
        match &self.inner {
            GpuBufferInner::Real(buffer) => buffer,
            #[cfg(feature = "mock")]
            GpuBufferInner::Mock => {
                panic!("Attempted to get wgpu::Buffer from mock buffer - this is a test-only buffer")
            }
        }
    }

    /// Check if this is a mock (useful in tests)
    #[cfg(feature = "mock")]
    pub fn is_mock(&self) -> bool {
        matches!(self.inner, GpuBufferInner::Mock)
    }
}

/// Wrapper around GPU texture that can be real or mock.
#[derive(Clone, Debug)]
pub struct GpuTexture {
    id: u64,
    width: u32,
    height: u32,
    inner: GpuTextureInner,
}

#[derive(Clone, Debug)]
enum GpuTextureInner {
    Real(wgpu::Texture),
    #[cfg(feature = "mock")]
    Mock { format: wgpu::TextureFormat },
}

impl GpuTexture {
    /// Create from real WGPU texture
    pub fn from_wgpu(texture: wgpu::Texture) -> Self {
        Self {
            id: next_resource_id(),
            width: texture.width(),
            height: texture.height(),
            inner: GpuTextureInner::Real(texture),
        }
    }

    /// Create mock texture (for testing)
    #[cfg(feature = "mock")]
    pub fn mock(id: u64, width: u32, height: u32, format: wgpu::TextureFormat) -> Self {
        Self {
            id,
            width,
            height,
            inner: GpuTextureInner::Mock { format },
        }
    }

    /// Process-unique id of this texture.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Texture size in pixels.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Get the underlying wgpu::Texture (if real)
    ///
    /// # Panics
    /// Panics if this is a mock texture
    pub fn as_wgpu(&self) -> &wgpu::Texture {
        match &self.inner {
            GpuTextureInner::Real(texture) => texture,
            #[cfg(feature = "mock")]
            GpuTextureInner::Mock { .. } => {
                panic!("Attempted to get wgpu::Texture from mock texture")
            }
        }
    }

    /// Check if this is a mock
    #[cfg(feature = "mock")]
    pub fn is_mock(&self) -> bool {
        matches!(self.inner, GpuTextureInner::Mock { .. })
    }

    /// Format recorded for a mock texture.
    #[cfg(feature = "mock")]
    pub fn mock_format(&self) -> Option<wgpu::TextureFormat> {
        match &self.inner {
            GpuTextureInner::Mock { format } => Some(*format),
            _ => None,
        }
    }
}

/// Wrapper around GPU shader module that can be real or mock.
#[derive(Clone, Debug)]
pub struct GpuShaderModule {
    id: u64,
    inner: GpuShaderModuleInner,
}

#[derive(Clone, Debug)]
enum GpuShaderModuleInner {
    Real(wgpu::ShaderModule),
    #[cfg(feature = "mock")]
    Mock,
}

impl GpuShaderModule {
    /// Create from real WGPU shader module
    pub fn from_wgpu(module: wgpu::ShaderModule) -> Self {
        Self {
            id: next_resource_id(),
            inner: GpuShaderModuleInner::Real(module),
        }
    }

    /// Create mock shader module (for testing)
    #[cfg(feature = "mock")]
    pub fn mock(id: u64) -> Self {
        Self {
            id,
            inner: GpuShaderModuleInner::Mock,
        }
    }

    /// Process-unique id of this shader module.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Get the underlying wgpu::ShaderModule (if real)
    pub fn as_wgpu(&self) -> &wgpu::ShaderModule {
        match &self.inner {
            GpuShaderModuleInner::Real(module) => module,
            #[cfg(feature = "mock")]
            GpuShaderModuleInner::Mock => {
                panic!("Attempted to get wgpu::ShaderModule from mock")
            }
        }
    }

    /// Check if this is a mock
    #[cfg(feature = "mock")]
    pub fn is_mock(&self) -> bool {
        matches!(self.inner, GpuShaderModuleInner::Mock)
    }
}
