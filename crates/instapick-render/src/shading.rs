//! Shaded rendering of the visible scene.
//!
//! Plain meshes and instance sets are drawn with `shaders/shading.wgsl`. The
//! instanced variant applies each instance's scale, rotation and translation
//! before the object's world transform and multiplies the material color by
//! the instance color. Transparent materials (opacity below 1) are drawn
//! after all opaque ones with alpha blending and without depth writes.

use std::collections::HashMap;

use glam::Mat4;

use instapick_core::{Scene, SceneGeometry, ShadingMaterial, ShadingOptions, Topology};

use crate::camera::Camera;
use crate::context::GpuContext;
use crate::error::{RenderError, RenderResult};
use crate::gpu_geometry::{layouts, primitive_topology, GeometryCache};
use crate::pick_target::{create_staging_buffer, read_texture};
use crate::uniforms::{FrameUniforms, ObjectUniforms, SceneBindings};

/// Color format of the visible target.
pub const SCENE_COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// Depth format of the visible target.
pub const SCENE_DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

const OBJECT_BUFFERS: &[wgpu::VertexBufferLayout<'static>] = &[layouts::POSITION, layouts::NORMAL];
const INSTANCE_BUFFERS: &[wgpu::VertexBufferLayout<'static>] =
    &[layouts::POSITION, layouts::NORMAL, layouts::INSTANCE];

/// Selects one shading pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShadingKey {
    /// Whether per-instance vertex data is bound.
    pub instanced: bool,
    /// Primitive assembly mode.
    pub topology: Topology,
    /// Whether alpha blending is enabled.
    pub transparent: bool,
}

impl ShadingKey {
    /// Key for drawing `geometry` with `material`.
    pub fn for_draw(geometry: &SceneGeometry, material: &ShadingMaterial) -> Self {
        Self {
            instanced: geometry.is_instanced(),
            topology: geometry.mesh().topology(),
            transparent: material.is_transparent(),
        }
    }
}

/// Shading pipelines, created on first use per [`ShadingKey`].
pub struct ShadingPipelines {
    shader: wgpu::ShaderModule,
    layout: wgpu::PipelineLayout,
    pipelines: HashMap<ShadingKey, wgpu::RenderPipeline>,
}

impl ShadingPipelines {
    /// Compiles the shading shader.
    pub fn new(device: &wgpu::Device, bindings: &SceneBindings) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("instapick shading shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/shading.wgsl").into()),
        });
        let layout = bindings.pipeline_layout(device, "instapick shading pipeline layout");
        Self {
            shader,
            layout,
            pipelines: HashMap::new(),
        }
    }

    /// Builds the pipeline for `key` if it does not exist yet.
    pub fn prepare(&mut self, device: &wgpu::Device, key: ShadingKey) {
        if self.pipelines.contains_key(&key) {
            return;
        }
        log::debug!("creating shading pipeline {key:?}");
        let pipeline = self.create_pipeline(device, key);
        self.pipelines.insert(key, pipeline);
    }

    /// Returns a prepared pipeline.
    pub fn get(&self, key: ShadingKey) -> Option<&wgpu::RenderPipeline> {
        self.pipelines.get(&key)
    }

    fn create_pipeline(&self, device: &wgpu::Device, key: ShadingKey) -> wgpu::RenderPipeline {
        let (entry_point, buffers) = if key.instanced {
            ("vs_instance", INSTANCE_BUFFERS)
        } else {
            ("vs_object", OBJECT_BUFFERS)
        };
        let blend = key.transparent.then_some(wgpu::BlendState::ALPHA_BLENDING);
        let cull_mode = (key.topology == Topology::Triangles && !key.transparent).then_some(wgpu::Face::Back);

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&format!("instapick shading {key:?}")),
            layout: Some(&self.layout),
            vertex: wgpu::VertexState {
                module: &self.shader,
                entry_point: Some(entry_point),
                buffers,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &self.shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: SCENE_COLOR_FORMAT,
                    blend,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: primitive_topology(key.topology),
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: SCENE_DEPTH_FORMAT,
                depth_write_enabled: !key.transparent,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
    }
}

struct Draw {
    geometry: SceneGeometry,
    key: ShadingKey,
    record: ObjectUniforms,
}

struct SceneTarget {
    color_texture: wgpu::Texture,
    color_view: wgpu::TextureView,
    depth_view: wgpu::TextureView,
    staging: wgpu::Buffer,
}

impl SceneTarget {
    fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let color_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("instapick scene color"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: SCENE_COLOR_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let depth_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("instapick scene depth"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: SCENE_DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        Self {
            color_view: color_texture.create_view(&wgpu::TextureViewDescriptor::default()),
            depth_view: depth_texture.create_view(&wgpu::TextureViewDescriptor::default()),
            staging: create_staging_buffer(device, width, height, "instapick scene staging"),
            color_texture,
        }
    }
}

/// Renders the visible scene into an off-screen color texture.
pub struct SceneRenderer {
    bindings: SceneBindings,
    pipelines: ShadingPipelines,
    geometry: GeometryCache,
    target: SceneTarget,
    size: (u32, u32),
    /// Light and clear color.
    pub options: ShadingOptions,
}

impl SceneRenderer {
    /// Creates a renderer with a target of the given size.
    pub fn new(device: &wgpu::Device, width: u32, height: u32, options: ShadingOptions) -> RenderResult<Self> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidViewport { width, height });
        }
        let bindings = SceneBindings::new(device, "instapick shading uniforms");
        let pipelines = ShadingPipelines::new(device, &bindings);
        Ok(Self {
            bindings,
            pipelines,
            geometry: GeometryCache::new(),
            target: SceneTarget::new(device, width, height),
            size: (width, height),
            options,
        })
    }

    /// Current target size.
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Reallocates the target if the size changed.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) -> RenderResult<()> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidViewport { width, height });
        }
        if self.size != (width, height) {
            self.target = SceneTarget::new(device, width, height);
            self.size = (width, height);
            log::debug!("scene target resized to {width}x{height}");
        }
        Ok(())
    }

    /// The color texture the scene is rendered into.
    pub fn color_texture(&self) -> &wgpu::Texture {
        &self.target.color_texture
    }

    /// Draws every visible drawable object of `scene`.
    pub fn render(&mut self, gpu: &GpuContext, scene: &Scene, camera: &Camera) {
        let mut draws = collect_draws(scene);
        // Stable sort keeps traversal order within each group.
        draws.sort_by_key(|d| d.key.transparent);

        for draw in &draws {
            self.geometry.prepare(&gpu.device, &draw.geometry);
            self.pipelines.prepare(&gpu.device, draw.key);
        }
        self.geometry.end_pass();

        let records: Vec<ObjectUniforms> = draws.iter().map(|d| d.record).collect();
        let frame = FrameUniforms::new(camera, &self.options);
        self.bindings.write(&gpu.device, &gpu.queue, &frame, &records);

        let bg = self.options.background_color;
        let mut encoder = gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("instapick scene encoder"),
        });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("instapick scene pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.target.color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: f64::from(bg.x),
                            g: f64::from(bg.y),
                            b: f64::from(bg.z),
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.target.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            for (index, draw) in draws.iter().enumerate() {
                let (Some(mesh), Some(pipeline)) = (self.geometry.mesh(&draw.geometry), self.pipelines.get(draw.key))
                else {
                    continue;
                };
                let instances = self.geometry.instances(&draw.geometry);
                if draw.key.instanced && instances.is_none() {
                    continue;
                }
                pass.set_pipeline(pipeline);
                self.bindings.bind(&mut pass, index);
                mesh.draw(&mut pass, true, instances);
            }
        }
        gpu.queue.submit(std::iter::once(encoder.finish()));
    }

    /// Reads the rendered image back as tightly packed RGBA rows, top row
    /// first. Blocks on the GPU.
    pub fn capture(&self, gpu: &GpuContext) -> RenderResult<Vec<u8>> {
        let (width, height) = self.size;
        let row_bytes = width as usize * 4;
        read_texture(
            &gpu.device,
            &gpu.queue,
            &self.target.color_texture,
            &self.target.staging,
            |rows, padded| {
                let mut out = Vec::with_capacity(row_bytes * height as usize);
                for row in rows.chunks(padded).take(height as usize) {
                    out.extend_from_slice(&row[..row_bytes]);
                }
                out
            },
        )
    }
}

fn collect_draws(scene: &Scene) -> Vec<Draw> {
    let mut draws = Vec::new();
    scene.traverse(|object, world: Mat4| {
        let instapick_core::ObjectKind::Mesh(mesh) = &object.kind else {
            return;
        };
        draws.push(Draw {
            geometry: mesh.geometry.clone(),
            key: ShadingKey::for_draw(&mesh.geometry, &mesh.material),
            record: ObjectUniforms::shaded(world, &mesh.material),
        });
    });
    draws
}
