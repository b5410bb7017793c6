//! Render pipelines for the identifier materials.
//!
//! One pipeline per ([`IdMaterial`], [`Topology`]) pair. Both variants share
//! `shaders/pick_id.wgsl` and differ only in the vertex entry point and in
//! whether the per-instance vertex buffer is bound. Blending is disabled so
//! encoded colors land in the target unchanged.

use std::collections::HashMap;

use instapick_core::{IdMaterial, Topology};

use crate::gpu_geometry::{layouts, primitive_topology};
use crate::uniforms::SceneBindings;

/// Color format of the pick target. Unorm, not sRGB: channel bytes must equal
/// the encoded digits.
pub const PICK_COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Depth format of the pick target.
pub const PICK_DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

const TOPOLOGIES: [Topology; 3] = [Topology::Triangles, Topology::Lines, Topology::Points];

const OBJECT_BUFFERS: &[wgpu::VertexBufferLayout<'static>] = &[layouts::POSITION];
const INSTANCE_BUFFERS: &[wgpu::VertexBufferLayout<'static>] = &[layouts::POSITION, layouts::INSTANCE];

/// All identifier-material pipelines.
pub struct IdMaterialPipelines {
    pipelines: HashMap<(IdMaterial, Topology), wgpu::RenderPipeline>,
}

impl IdMaterialPipelines {
    /// Compiles the pick shader and builds every pipeline.
    pub fn new(device: &wgpu::Device, bindings: &SceneBindings) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("instapick pick id shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/pick_id.wgsl").into()),
        });
        let layout = bindings.pipeline_layout(device, "instapick pick id pipeline layout");

        let mut pipelines = HashMap::new();
        for material in [IdMaterial::PerObject, IdMaterial::PerInstance] {
            for topology in TOPOLOGIES {
                let pipeline = Self::create_pipeline(device, &shader, &layout, material, topology);
                pipelines.insert((material, topology), pipeline);
            }
        }
        Self { pipelines }
    }

    fn create_pipeline(
        device: &wgpu::Device,
        shader: &wgpu::ShaderModule,
        layout: &wgpu::PipelineLayout,
        material: IdMaterial,
        topology: Topology,
    ) -> wgpu::RenderPipeline {
        let (entry_point, buffers) = match material {
            IdMaterial::PerObject => ("vs_object", OBJECT_BUFFERS),
            IdMaterial::PerInstance => ("vs_instance", INSTANCE_BUFFERS),
        };

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&format!("instapick pick id {material:?} {topology:?}")),
            layout: Some(layout),
            vertex: wgpu::VertexState {
                module: shader,
                entry_point: Some(entry_point),
                buffers,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: PICK_COLOR_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: primitive_topology(topology),
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: PICK_DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
    }

    /// Returns the pipeline for a material and topology.
    pub fn get(&self, material: IdMaterial, topology: Topology) -> Option<&wgpu::RenderPipeline> {
        self.pipelines.get(&(material, topology))
    }
}
