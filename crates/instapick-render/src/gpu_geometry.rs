//! GPU copies of scene geometry.
//!
//! Vertex data is uploaded once per geometry and looked up by geometry uid.
//! Entries not touched during a pass are evicted when the pass ends, so
//! geometries dropped from the scene release their buffers.

use std::collections::{HashMap, HashSet};

use instapick_core::{InstanceRaw, InstancedGeometry, MeshGeometry, SceneGeometry, Topology};

use crate::buffer::{create_index_buffer, create_vertex_buffer};

/// Vertex buffer layouts. Instance data follows the last vertex slot in use.
pub mod layouts {
    /// Positions, `@location(0)`.
    pub const POSITION: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: 12,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &wgpu::vertex_attr_array![0 => Float32x3],
    };

    /// Normals, `@location(1)`.
    pub const NORMAL: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: 12,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &wgpu::vertex_attr_array![1 => Float32x3],
    };

    /// Per-instance attributes matching `InstanceRaw`, `@location(2..=6)`.
    pub const INSTANCE: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: 64,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &[
            wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x3,
                offset: 0,
                shader_location: 2,
            },
            wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Uint32,
                offset: 12,
                shader_location: 3,
            },
            wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x4,
                offset: 16,
                shader_location: 4,
            },
            wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x3,
                offset: 32,
                shader_location: 5,
            },
            wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x4,
                offset: 48,
                shader_location: 6,
            },
        ],
    };
}

/// Maps a geometry topology to the wgpu primitive topology.
pub fn primitive_topology(topology: Topology) -> wgpu::PrimitiveTopology {
    match topology {
        Topology::Triangles => wgpu::PrimitiveTopology::TriangleList,
        Topology::Lines => wgpu::PrimitiveTopology::LineList,
        Topology::Points => wgpu::PrimitiveTopology::PointList,
    }
}

/// Uploaded vertex data of one [`MeshGeometry`].
pub struct GpuMesh {
    positions: wgpu::Buffer,
    normals: wgpu::Buffer,
    indices: Option<wgpu::Buffer>,
    draw_count: u32,
    topology: Topology,
}

impl GpuMesh {
    fn upload(device: &wgpu::Device, mesh: &MeshGeometry) -> Self {
        let positions: Vec<[f32; 3]> = mesh.positions().iter().map(|p| p.to_array()).collect();
        let normals: Vec<[f32; 3]> = mesh.normals().iter().map(|n| n.to_array()).collect();
        let indices = (!mesh.indices().is_empty())
            .then(|| create_index_buffer(device, mesh.indices(), Some("instapick mesh indices")));
        Self {
            positions: create_vertex_buffer(device, &positions, Some("instapick mesh positions")),
            normals: create_vertex_buffer(device, &normals, Some("instapick mesh normals")),
            indices,
            draw_count: mesh.draw_count(),
            topology: mesh.topology(),
        }
    }

    /// Primitive assembly mode.
    pub fn topology(&self) -> Topology {
        self.topology
    }

    /// Binds the vertex buffers and issues the draw.
    ///
    /// Normals go to slot 1 when `with_normals` is set; instance data follows
    /// in the next slot. Empty meshes and empty instance sets draw nothing.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, with_normals: bool, instances: Option<&GpuInstances>) {
        if self.draw_count == 0 {
            return;
        }
        pass.set_vertex_buffer(0, self.positions.slice(..));
        if with_normals {
            pass.set_vertex_buffer(1, self.normals.slice(..));
        }
        let range = match instances {
            Some(set) => {
                let Some(buffer) = set.buffer() else {
                    return;
                };
                pass.set_vertex_buffer(if with_normals { 2 } else { 1 }, buffer.slice(..));
                0..set.count()
            }
            None => 0..1,
        };
        match &self.indices {
            Some(indices) => {
                pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..self.draw_count, 0, range);
            }
            None => pass.draw(0..self.draw_count, range),
        }
    }
}

/// Uploaded per-instance data of one [`InstancedGeometry`].
pub struct GpuInstances {
    buffer: Option<wgpu::Buffer>,
    count: u32,
}

impl GpuInstances {
    #[allow(clippy::cast_possible_truncation)]
    fn upload(device: &wgpu::Device, instances: &InstancedGeometry) -> Self {
        let raw: Vec<InstanceRaw> = instances.to_raw();
        let buffer = (!raw.is_empty()).then(|| create_vertex_buffer(device, &raw, Some("instapick instances")));
        Self {
            buffer,
            count: raw.len() as u32,
        }
    }

    /// Number of instances.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// The instance vertex buffer; `None` for empty sets.
    pub fn buffer(&self) -> Option<&wgpu::Buffer> {
        self.buffer.as_ref()
    }
}

/// Cache of uploaded geometry keyed by geometry uid.
#[derive(Default)]
pub struct GeometryCache {
    meshes: HashMap<u64, GpuMesh>,
    instances: HashMap<u64, GpuInstances>,
    touched: HashSet<u64>,
}

impl GeometryCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uploads `geometry` unless already cached, and marks it used in the
    /// current pass.
    pub fn prepare(&mut self, device: &wgpu::Device, geometry: &SceneGeometry) {
        let mesh = geometry.mesh();
        self.touched.insert(mesh.uid());
        self.meshes.entry(mesh.uid()).or_insert_with(|| {
            log::trace!("uploading geometry {}", mesh.uid());
            GpuMesh::upload(device, mesh)
        });

        if let Some(set) = geometry.as_instanced() {
            self.touched.insert(set.uid());
            self.instances.entry(set.uid()).or_insert_with(|| {
                log::trace!("uploading {} instances of set {}", set.count(), set.uid());
                GpuInstances::upload(device, set)
            });
        }
    }

    /// Returns the uploaded mesh for a geometry prepared in this pass.
    pub fn mesh(&self, geometry: &SceneGeometry) -> Option<&GpuMesh> {
        self.meshes.get(&geometry.mesh().uid())
    }

    /// Returns the uploaded instance data for an instance set prepared in
    /// this pass.
    pub fn instances(&self, geometry: &SceneGeometry) -> Option<&GpuInstances> {
        geometry.as_instanced().and_then(|set| self.instances.get(&set.uid()))
    }

    /// Evicts every entry not prepared since the previous call.
    pub fn end_pass(&mut self) {
        let before = self.meshes.len() + self.instances.len();
        self.meshes.retain(|uid, _| self.touched.contains(uid));
        self.instances.retain(|uid, _| self.touched.contains(uid));
        let evicted = before - self.meshes.len() - self.instances.len();
        if evicted > 0 {
            log::debug!("geometry cache: evicted {evicted} entries");
        }
        self.touched.clear();
    }

    /// Number of cached entries (meshes plus instance sets).
    pub fn len(&self) -> usize {
        self.meshes.len() + self.instances.len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_layout_matches_raw_struct() {
        assert_eq!(layouts::INSTANCE.array_stride, std::mem::size_of::<InstanceRaw>() as u64);
        assert_eq!(std::mem::offset_of!(InstanceRaw, pick_id), 12);
        assert_eq!(std::mem::offset_of!(InstanceRaw, orientation), 16);
        assert_eq!(std::mem::offset_of!(InstanceRaw, scale), 32);
        assert_eq!(std::mem::offset_of!(InstanceRaw, color), 48);
    }

    #[test]
    fn test_primitive_topology() {
        assert_eq!(primitive_topology(Topology::Lines), wgpu::PrimitiveTopology::LineList);
        assert_eq!(primitive_topology(Topology::Points), wgpu::PrimitiveTopology::PointList);
    }
}
