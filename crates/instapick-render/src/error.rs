//! Rendering error types.

use thiserror::Error;

use instapick_core::InstapickError;

/// Errors that can occur on the GPU side of picking and shading.
#[derive(Error, Debug)]
pub enum RenderError {
    /// No adapter matched the request (e.g. no GPU in a CI container).
    #[error("failed to create graphics adapter: {0}")]
    AdapterCreationFailed(#[from] wgpu::RequestAdapterError),

    /// Failed to create wgpu device.
    #[error("failed to create graphics device: {0}")]
    DeviceCreationFailed(#[from] wgpu::RequestDeviceError),

    /// Mapping the readback buffer failed.
    #[error("pixel readback failed: {0}")]
    ReadbackFailed(#[from] wgpu::BufferAsyncError),

    /// The map callback never reported back.
    #[error("timeout waiting for GPU")]
    Timeout,

    /// Polling the device failed.
    #[error("device poll failed: {0}")]
    PollFailed(#[from] wgpu::PollError),

    /// The viewport has a zero dimension.
    #[error("invalid viewport size {width}x{height}")]
    InvalidViewport { width: u32, height: u32 },

    /// Writing an ID image failed.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// Error from the data model.
    #[error(transparent)]
    Core(#[from] InstapickError),
}

/// A specialized Result type for rendering operations.
pub type RenderResult<T> = std::result::Result<T, RenderError>;
