//! Uniform data and bind group layouts shared by the shaded and pick passes.
//!
//! Group 0 holds the per-frame camera and light; group 1 holds one
//! [`ObjectUniforms`] record per draw, selected by dynamic offset.

use glam::{Mat4, Vec3};

use instapick_core::{ShadingMaterial, ShadingModel, ShadingOptions};

use crate::buffer::{create_uniform_buffer, DynamicUniformArray};
use crate::camera::Camera;

/// Per-frame uniforms (112 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub camera_position: [f32; 4],
    /// xyz: normalized direction the light travels.
    pub light_direction: [f32; 4],
    /// x: ambient intensity.
    pub ambient: [f32; 4],
}

impl FrameUniforms {
    /// Builds the uniforms for a camera and lighting setup.
    pub fn new(camera: &Camera, shading: &ShadingOptions) -> Self {
        let light = shading.light_direction.try_normalize().unwrap_or(Vec3::NEG_Y);
        Self {
            view_proj: camera.view_projection_matrix().to_cols_array_2d(),
            camera_position: camera.position.extend(1.0).to_array(),
            light_direction: light.extend(0.0).to_array(),
            ambient: [shading.ambient, 0.0, 0.0, 0.0],
        }
    }
}

/// Per-draw uniforms (128 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ObjectUniforms {
    pub model: [[f32; 4]; 4],
    /// rgb color, a opacity.
    pub color: [f32; 4],
    pub emissive: [f32; 4],
    /// x: shininess, y: 1 for unlit, z: 1 for flat shading.
    pub params: [f32; 4],
    /// x: scalar pick identifier.
    pub pick: [u32; 4],
}

impl ObjectUniforms {
    /// Record for the visible pass.
    pub fn shaded(model: Mat4, material: &ShadingMaterial) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            color: material.color.extend(material.opacity).to_array(),
            emissive: material.emissive.extend(0.0).to_array(),
            params: [
                material.shininess,
                f32::from(u8::from(material.model == ShadingModel::Basic)),
                f32::from(u8::from(material.flat_shading)),
                0.0,
            ],
            pick: [0; 4],
        }
    }

    /// Record for the pick pass.
    pub fn pick(model: Mat4, pick_id: u32) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            color: [1.0; 4],
            emissive: [0.0; 4],
            params: [0.0; 4],
            pick: [pick_id, 0, 0, 0],
        }
    }
}

/// Bind group layouts plus the buffers bound to them.
pub struct SceneBindings {
    pub frame_layout: wgpu::BindGroupLayout,
    pub object_layout: wgpu::BindGroupLayout,
    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    objects: DynamicUniformArray<ObjectUniforms>,
}

impl SceneBindings {
    /// Creates the layouts and an initial object array.
    pub fn new(device: &wgpu::Device, label: &'static str) -> Self {
        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("instapick frame layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<FrameUniforms>() as u64),
                },
                count: None,
            }],
        });
        let object_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("instapick object layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<ObjectUniforms>() as u64),
                },
                count: None,
            }],
        });

        let frame_buffer = create_uniform_buffer(device, &<FrameUniforms as bytemuck::Zeroable>::zeroed(), Some(label));
        let frame_bind_group = Self::frame_bind_group(device, &frame_layout, &frame_buffer);
        let objects = DynamicUniformArray::new(device, &object_layout, 64, label);

        Self {
            frame_layout,
            object_layout,
            frame_buffer,
            frame_bind_group,
            objects,
        }
    }

    fn frame_bind_group(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, buffer: &wgpu::Buffer) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("instapick frame bind group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        })
    }

    /// Uploads the frame record and all object records for one pass.
    pub fn write(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, frame: &FrameUniforms, objects: &[ObjectUniforms]) {
        queue.write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(frame));
        self.objects.write(device, queue, &self.object_layout, objects);
    }

    /// Pipeline layout with both groups.
    pub fn pipeline_layout(&self, device: &wgpu::Device, label: &str) -> wgpu::PipelineLayout {
        device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(label),
            bind_group_layouts: &[&self.frame_layout, &self.object_layout],
            push_constant_ranges: &[],
        })
    }

    /// Binds the frame group and the object record at `index`.
    pub fn bind(&self, pass: &mut wgpu::RenderPass<'_>, index: usize) {
        pass.set_bind_group(0, &self.frame_bind_group, &[]);
        pass.set_bind_group(1, self.objects.bind_group(), &[self.objects.offset(index)]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_sizes_match_shaders() {
        assert_eq!(std::mem::size_of::<FrameUniforms>(), 112);
        assert_eq!(std::mem::size_of::<ObjectUniforms>(), 128);
    }

    #[test]
    fn test_shaded_record_flags() {
        let material = ShadingMaterial::basic(Vec3::X).with_opacity(0.5).with_flat_shading(true);
        let record = ObjectUniforms::shaded(Mat4::IDENTITY, &material);
        assert_eq!(record.color, [1.0, 0.0, 0.0, 0.5]);
        assert_eq!(record.params[1], 1.0);
        assert_eq!(record.params[2], 1.0);
        assert_eq!(record.pick[0], 0);
    }

    #[test]
    fn test_pick_record_carries_id() {
        let record = ObjectUniforms::pick(Mat4::IDENTITY, 4242);
        assert_eq!(record.pick, [4242, 0, 0, 0]);
    }

    #[test]
    fn test_zero_light_direction_falls_back() {
        let shading = ShadingOptions {
            light_direction: Vec3::ZERO,
            ..ShadingOptions::default()
        };
        let frame = FrameUniforms::new(&Camera::default(), &shading);
        assert_eq!(frame.light_direction, [0.0, -1.0, 0.0, 0.0]);
    }
}
