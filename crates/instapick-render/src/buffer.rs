//! GPU buffer helpers.

use std::marker::PhantomData;

use wgpu::util::DeviceExt;

/// Creates a vertex buffer initialized with `data`.
pub fn create_vertex_buffer<T: bytemuck::Pod>(
    device: &wgpu::Device,
    data: &[T],
    label: Option<&str>,
) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label,
        contents: bytemuck::cast_slice(data),
        usage: wgpu::BufferUsages::VERTEX,
    })
}

/// Creates an index buffer of `u32` indices.
pub fn create_index_buffer(device: &wgpu::Device, data: &[u32], label: Option<&str>) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label,
        contents: bytemuck::cast_slice(data),
        usage: wgpu::BufferUsages::INDEX,
    })
}

/// Creates a uniform buffer holding one value.
pub fn create_uniform_buffer<T: bytemuck::Pod>(
    device: &wgpu::Device,
    data: &T,
    label: Option<&str>,
) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label,
        contents: bytemuck::bytes_of(data),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

/// Rounds `size` up to a multiple of `align`.
pub fn align_to(size: u64, align: u64) -> u64 {
    size.div_ceil(align) * align
}

/// An array of uniform records addressed with dynamic offsets.
///
/// Each record sits in its own slot of `stride` bytes, where the stride is the
/// record size rounded up to the device's uniform offset alignment. The
/// buffer grows (and its bind group is rebuilt) when more records are written
/// than it can hold; it never shrinks.
pub struct DynamicUniformArray<T> {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    stride: u64,
    capacity: usize,
    label: &'static str,
    _marker: PhantomData<T>,
}

impl<T: bytemuck::Pod> DynamicUniformArray<T> {
    /// Creates an array with room for `capacity` records, bound at binding 0
    /// of `layout`.
    pub fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, capacity: usize, label: &'static str) -> Self {
        let align = u64::from(device.limits().min_uniform_buffer_offset_alignment);
        let stride = align_to(std::mem::size_of::<T>() as u64, align);
        let capacity = capacity.max(1);
        let (buffer, bind_group) = Self::allocate(device, layout, stride, capacity, label);
        Self {
            buffer,
            bind_group,
            stride,
            capacity,
            label,
            _marker: PhantomData,
        }
    }

    fn allocate(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        stride: u64,
        capacity: usize,
        label: &str,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: stride * capacity as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(std::mem::size_of::<T>() as u64),
                }),
            }],
        });
        (buffer, bind_group)
    }

    /// Uploads `records`, growing the buffer if needed.
    #[allow(clippy::cast_possible_truncation)]
    pub fn write(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, layout: &wgpu::BindGroupLayout, records: &[T]) {
        if records.len() > self.capacity {
            let capacity = records.len().next_power_of_two();
            log::debug!("{}: growing from {} to {} records", self.label, self.capacity, capacity);
            let (buffer, bind_group) = Self::allocate(device, layout, self.stride, capacity, self.label);
            self.buffer = buffer;
            self.bind_group = bind_group;
            self.capacity = capacity;
        }
        if records.is_empty() {
            return;
        }

        let stride = self.stride as usize;
        let mut staging = vec![0u8; stride * records.len()];
        for (slot, record) in staging.chunks_exact_mut(stride).zip(records) {
            let bytes = bytemuck::bytes_of(record);
            slot[..bytes.len()].copy_from_slice(bytes);
        }
        queue.write_buffer(&self.buffer, 0, &staging);
    }

    /// Bind group covering the whole array.
    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    /// Dynamic offset of record `index`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn offset(&self, index: usize) -> u32 {
        (self.stride * index as u64) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_to() {
        assert_eq!(align_to(0, 256), 0);
        assert_eq!(align_to(1, 256), 256);
        assert_eq!(align_to(128, 256), 256);
        assert_eq!(align_to(256, 256), 256);
        assert_eq!(align_to(257, 256), 512);
    }
}
