//! GPU device and queue.

use crate::error::RenderResult;

/// Owns the wgpu device and queue shared by the scene renderer and the
/// picker.
pub struct GpuContext {
    /// The wgpu device.
    pub device: wgpu::Device,
    /// The command queue.
    pub queue: wgpu::Queue,
    /// Information about the chosen adapter.
    pub adapter_info: wgpu::AdapterInfo,
}

impl GpuContext {
    /// Creates a context without a surface. All rendering goes to off-screen
    /// textures.
    pub async fn new_headless() -> RenderResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await?;
        let adapter_info = adapter.get_info();
        log::debug!("using adapter {} ({:?})", adapter_info.name, adapter_info.backend);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("instapick device (headless)"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::default(),
                experimental_features: wgpu::ExperimentalFeatures::default(),
            })
            .await?;

        Ok(Self {
            device,
            queue,
            adapter_info,
        })
    }

    /// Blocking variant of [`GpuContext::new_headless`].
    pub fn new_headless_blocking() -> RenderResult<Self> {
        pollster::block_on(Self::new_headless())
    }
}
