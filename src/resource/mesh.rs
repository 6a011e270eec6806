//! Vertex formats, combined geometry buffers and user meshes.

use crate::context::RenderingContext;
use crate::dimension::Dimension;
use crate::error::{OnyxError, Result};
use crate::resource::buffer::DeviceBuffer;
use crate::resource::BarrierBatch;
use bytemuck::{Pod, Zeroable};
use std::ops::Range;

/// Vertex of 2D geometry.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex2d {
    pub position: [f32; 2],
}

impl Vertex2d {
    const ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];

    /// Vertex buffer layout matching `@location(0) position: vec2<f32>`.
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Vertex of 3D geometry.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex3d {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl Vertex3d {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

    /// Vertex buffer layout matching `@location(0) position` and `@location(1) normal`.
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Host-side indexed triangle list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GeometryData<V> {
    pub vertices: Vec<V>,
    pub indices: Vec<u32>,
}

impl<V> GeometryData<V> {
    /// Checks that the data forms a valid triangle list.
    pub fn validate(&self) -> Result<()> {
        if self.vertices.is_empty() {
            return Err(OnyxError::InvalidMesh("no vertices"));
        }
        if self.indices.is_empty() || self.indices.len() % 3 != 0 {
            return Err(OnyxError::InvalidMesh(
                "index count must be a positive multiple of 3",
            ));
        }
        if self
            .indices
            .iter()
            .any(|i| *i as usize >= self.vertices.len())
        {
            return Err(OnyxError::InvalidMesh("index out of bounds"));
        }
        Ok(())
    }
}

/// Location of one piece of geometry inside combined vertex and index buffers.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PrimitiveDataLayout {
    /// Added to every index of the piece (the draw's base vertex).
    pub vertex_start: u32,
    pub index_start: u32,
    pub index_count: u32,
}

impl PrimitiveDataLayout {
    /// Index range to draw.
    pub fn indices(&self) -> Range<u32> {
        self.index_start..self.index_start + self.index_count
    }
}

/// Several pieces of geometry packed into one vertex and one index buffer.
///
/// Host copies are kept: appending geometry marks the buffers dirty and the next upload
/// replaces them as a whole.
pub struct GeometryBuffers<V: Pod> {
    host: GeometryData<V>,
    layouts: Vec<PrimitiveDataLayout>,
    vertices: Option<DeviceBuffer<V>>,
    indices: Option<DeviceBuffer<u32>>,
    dirty: bool,
}

impl<V: Pod> Default for GeometryBuffers<V> {
    fn default() -> Self {
        Self {
            host: GeometryData {
                vertices: Vec::new(),
                indices: Vec::new(),
            },
            layouts: Vec::new(),
            vertices: None,
            indices: None,
            dirty: false,
        }
    }
}

impl<V: Pod> GeometryBuffers<V> {
    /// Empty buffers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a piece of geometry and returns its position.
    pub fn append(&mut self, data: GeometryData<V>) -> usize {
        let layout = PrimitiveDataLayout {
            vertex_start: self.host.vertices.len() as u32,
            index_start: self.host.indices.len() as u32,
            index_count: data.indices.len() as u32,
        };

        self.host.vertices.extend(data.vertices);
        self.host.indices.extend(data.indices);
        self.layouts.push(layout);
        self.dirty = true;
        self.layouts.len() - 1
    }

    /// Layout of the piece at `index`.
    pub fn layout(&self, index: usize) -> Option<PrimitiveDataLayout> {
        self.layouts.get(index).copied()
    }

    /// Every layout, in insertion order.
    pub fn layouts(&self) -> &[PrimitiveDataLayout] {
        &self.layouts
    }

    /// Number of pieces.
    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }

    /// Whether appended geometry has not reached the GPU yet.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Uploads the combined buffers if geometry was appended since the last upload.
    pub fn upload(
        &mut self,
        ctx: &RenderingContext,
        encoder: &mut wgpu::CommandEncoder,
        label: &str,
        barriers: &mut BarrierBatch,
    ) -> Result<()> {
        if !self.dirty || self.host.vertices.is_empty() {
            return Ok(());
        }

        let vertices = DeviceBuffer::with_data(
            ctx,
            encoder,
            &format!("{label}_vertices"),
            wgpu::BufferUsages::VERTEX,
            &self.host.vertices,
        )?;
        let indices = DeviceBuffer::with_data(
            ctx,
            encoder,
            &format!("{label}_indices"),
            wgpu::BufferUsages::INDEX,
            &self.host.indices,
        )?;

        barriers.vertex_upload(vertices.label(), vertices.size_bytes());
        barriers.vertex_upload(indices.label(), indices.size_bytes());

        log::debug!(
            "uploaded {} geometry: {} vertices, {} indices",
            label,
            self.host.vertices.len(),
            self.host.indices.len()
        );

        self.vertices = Some(vertices);
        self.indices = Some(indices);
        self.dirty = false;
        Ok(())
    }

    /// Binds the combined buffers. Returns `false` if nothing was uploaded yet.
    pub fn bind(&self, pass: &mut wgpu::RenderPass) -> bool {
        match (&self.vertices, &self.indices) {
            (Some(vertices), Some(indices)) => {
                pass.set_vertex_buffer(0, vertices.buffer().slice(..));
                pass.set_index_buffer(indices.buffer().slice(..), wgpu::IndexFormat::Uint32);
                true
            }
            _ => false,
        }
    }
}

/// Handle to a mesh registered in a [`MeshRegistry`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Mesh(u32);

impl Mesh {
    /// Position of the mesh in its registry.
    pub fn id(self) -> u32 {
        self.0
    }
}

/// User meshes of one dimension, stored in shared geometry buffers.
pub struct MeshRegistry<D: Dimension> {
    geometry: GeometryBuffers<D::Vertex>,
}

impl<D: Dimension> Default for MeshRegistry<D> {
    fn default() -> Self {
        Self {
            geometry: GeometryBuffers::new(),
        }
    }
}

impl<D: Dimension> MeshRegistry<D> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an indexed triangle list. The data reaches the GPU with the next frame.
    pub fn register(&mut self, vertices: Vec<D::Vertex>, indices: Vec<u32>) -> Result<Mesh> {
        let data = GeometryData { vertices, indices };
        data.validate()?;
        Ok(Mesh(self.geometry.append(data) as u32))
    }

    /// Registers a non-indexed triangle list.
    pub fn register_vertices(&mut self, vertices: Vec<D::Vertex>) -> Result<Mesh> {
        let indices = (0..vertices.len() as u32).collect();
        self.register(vertices, indices)
    }

    /// Layout of a registered mesh.
    pub fn layout(&self, mesh: Mesh) -> Result<PrimitiveDataLayout> {
        self.geometry
            .layout(mesh.0 as usize)
            .ok_or(OnyxError::UnknownMesh(mesh))
    }

    /// Number of registered meshes.
    pub fn len(&self) -> usize {
        self.geometry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geometry.is_empty()
    }

    pub(crate) fn geometry(&self) -> &GeometryBuffers<D::Vertex> {
        &self.geometry
    }

    pub(crate) fn geometry_mut(&mut self) -> &mut GeometryBuffers<D::Vertex> {
        &mut self.geometry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimension::D2;

    fn quad() -> Vec<Vertex2d> {
        [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]
            .into_iter()
            .map(|position| Vertex2d { position })
            .collect()
    }

    #[test]
    fn test_layouts_accumulate() {
        let mut registry = MeshRegistry::<D2>::new();
        let a = registry.register(quad(), vec![0, 1, 2, 0, 2, 3]).unwrap();
        let b = registry.register_vertices(quad()[..3].to_vec()).unwrap();

        assert_eq!(
            registry.layout(a).unwrap(),
            PrimitiveDataLayout {
                vertex_start: 0,
                index_start: 0,
                index_count: 6
            }
        );
        let layout = registry.layout(b).unwrap();
        assert_eq!(layout.vertex_start, 4);
        assert_eq!(layout.indices(), 6..9);
        assert!(registry.geometry().is_dirty());
    }

    #[test]
    fn test_unknown_mesh() {
        let registry = MeshRegistry::<D2>::new();
        assert!(matches!(
            registry.layout(Mesh(3)),
            Err(OnyxError::UnknownMesh(Mesh(3)))
        ));
    }

    #[test]
    fn test_invalid_mesh_data() {
        let mut registry = MeshRegistry::<D2>::new();
        assert!(registry.register(Vec::new(), vec![0, 1, 2]).is_err());
        assert!(registry.register(quad(), vec![0, 1]).is_err());
        assert!(registry.register(quad(), vec![0, 1, 4]).is_err());
        assert!(registry.is_empty());
    }
}
