//! Off-screen target the identifier pass renders into.

use instapick_core::PixelBuffer;

use crate::error::{RenderError, RenderResult};
use crate::id_material::{PICK_COLOR_FORMAT, PICK_DEPTH_FORMAT};

/// Calculates bytes per row with proper alignment for wgpu buffer copies.
pub fn aligned_bytes_per_row(width: u32) -> u32 {
    let unaligned = width * 4;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unaligned.div_ceil(align) * align
}

/// Color and depth textures sized to the viewport, plus the staging buffer
/// the color texture is copied into for readback.
pub struct PickTarget {
    color_texture: wgpu::Texture,
    color_view: wgpu::TextureView,
    depth_view: wgpu::TextureView,
    staging_buffer: wgpu::Buffer,
    width: u32,
    height: u32,
}

impl PickTarget {
    /// Creates a target of the given size.
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> RenderResult<Self> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidViewport { width, height });
        }
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        let color_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("instapick pick color"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: PICK_COLOR_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let color_view = color_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let depth_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("instapick pick depth"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: PICK_DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let depth_view = depth_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let staging_buffer = create_staging_buffer(device, width, height, "instapick pick staging");

        log::debug!("pick target created at {width}x{height}");
        Ok(Self {
            color_texture,
            color_view,
            depth_view,
            staging_buffer,
            width,
            height,
        })
    }

    /// Returns the target dimensions.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// View of the color attachment.
    pub fn color_view(&self) -> &wgpu::TextureView {
        &self.color_view
    }

    /// View of the depth attachment.
    pub fn depth_view(&self) -> &wgpu::TextureView {
        &self.depth_view
    }

    /// Copies the color texture to the CPU and stores it in `pixels`.
    ///
    /// Blocks until the GPU has finished all submitted work.
    pub fn read_back(&self, device: &wgpu::Device, queue: &wgpu::Queue, pixels: &mut PixelBuffer) -> RenderResult<()> {
        read_texture(device, queue, &self.color_texture, &self.staging_buffer, |rows, padded| {
            pixels.store_padded_rows(rows, padded)
        })??;
        Ok(())
    }
}

/// Copies a 4-byte-per-pixel texture into `staging` (which must hold
/// `aligned_bytes_per_row(width) * height` bytes), maps it and hands the
/// padded rows, top row first, to `consume` together with the row stride.
pub(crate) fn read_texture<R>(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    staging: &wgpu::Buffer,
    consume: impl FnOnce(&[u8], usize) -> R,
) -> RenderResult<R> {
    let (width, height) = (texture.width(), texture.height());
    let bytes_per_row = aligned_bytes_per_row(width);

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("instapick texture readback"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: staging,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    queue.submit(std::iter::once(encoder.finish()));

    let slice = staging.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    device.poll(wgpu::PollType::wait_indefinitely())?;
    rx.recv().map_err(|_| RenderError::Timeout)??;

    let result = {
        let data = slice.get_mapped_range();
        consume(&data, bytes_per_row as usize)
    };
    staging.unmap();
    Ok(result)
}

/// Creates a staging buffer large enough for [`read_texture`].
pub(crate) fn create_staging_buffer(device: &wgpu::Device, width: u32, height: u32, label: &str) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: u64::from(aligned_bytes_per_row(width)) * u64::from(height),
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    })
}
