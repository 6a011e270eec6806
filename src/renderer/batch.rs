//! Host-side batches of the four shape kinds and the draw commands they produce.

use crate::dimension::Dimension;
use crate::error::{OnyxError, Result};
use crate::renderer::stencil::StencilPass;
use crate::resource::{
    FlatInstances, GeometryData, KeyedInstances, Mesh, Primitive, PrimitiveDataLayout,
};
use std::hash::Hash;
use std::ops::Range;

/// A single draw recorded into a render pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DrawCommand {
    /// Indexed draw against bound vertex and index buffers.
    Indexed {
        indices: Range<u32>,
        base_vertex: i32,
        instances: Range<u32>,
    },
    /// Non-indexed draw, vertices generated in the vertex shader.
    Vertices {
        vertices: Range<u32>,
        instances: Range<u32>,
    },
}

impl DrawCommand {
    /// Records the draw.
    pub fn record(&self, pass: &mut wgpu::RenderPass) {
        match self {
            DrawCommand::Indexed {
                indices,
                base_vertex,
                instances,
            } => pass.draw_indexed(indices.clone(), *base_vertex, instances.clone()),
            DrawCommand::Vertices {
                vertices,
                instances,
            } => pass.draw(vertices.clone(), instances.clone()),
        }
    }

    /// Number of instances drawn.
    pub fn instance_count(&self) -> u32 {
        match self {
            DrawCommand::Indexed { instances, .. } | DrawCommand::Vertices { instances, .. } => {
                instances.end - instances.start
            }
        }
    }
}

/// Instances of geometry stored in shared buffers, grouped by key so that every key costs one
/// instanced draw per pass.
#[derive(Clone, Debug)]
pub struct KeyedBatch<K, T> {
    passes: [KeyedInstances<K, T>; 4],
}

/// Mesh instances of one dimension.
pub type MeshBatch<D> = KeyedBatch<Mesh, <D as Dimension>::Instance>;
/// Primitive instances of one dimension.
pub type PrimitiveBatch<D> = KeyedBatch<Primitive, <D as Dimension>::Instance>;

impl<K, T> Default for KeyedBatch<K, T> {
    fn default() -> Self {
        Self {
            passes: Default::default(),
        }
    }
}

impl<K: Copy + Eq + Hash, T: Copy> KeyedBatch<K, T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, pass: StencilPass, key: K, instance: T) {
        self.passes[pass.index()].push(key, instance);
    }

    /// Instances of `pass`.
    pub fn instances(&self, pass: StencilPass) -> &KeyedInstances<K, T> {
        &self.passes[pass.index()]
    }

    /// One indexed draw per key, with instance ranges matching [`KeyedInstances::contiguous`].
    pub fn draw_commands(
        &self,
        pass: StencilPass,
        layout: impl Fn(K) -> Option<PrimitiveDataLayout>,
    ) -> Vec<DrawCommand> {
        self.passes[pass.index()]
            .batches()
            .filter_map(|batch| {
                let layout = layout(batch.key)?;
                Some(DrawCommand::Indexed {
                    indices: layout.indices(),
                    base_vertex: layout.vertex_start as i32,
                    instances: batch.first_instance..batch.first_instance + batch.count,
                })
            })
            .collect()
    }

    /// Total number of instances over every pass.
    pub fn len(&self) -> usize {
        self.passes.iter().map(|p| p.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.passes.iter_mut().for_each(KeyedInstances::clear);
    }
}

/// Fan-triangulates a convex polygon.
pub fn triangulate_fan(vertex_count: usize) -> Vec<u32> {
    (1..vertex_count.saturating_sub(1) as u32)
        .flat_map(|i| [0, i, i + 1])
        .collect()
}

/// User polygons. Each polygon appends its own geometry, so each instance is its own draw.
#[derive(Clone, Debug)]
pub struct PolygonBatch<D: Dimension> {
    geometry: GeometryData<D::Vertex>,
    passes: [(FlatInstances<D::Instance>, Vec<PrimitiveDataLayout>); 4],
}

impl<D: Dimension> Default for PolygonBatch<D> {
    fn default() -> Self {
        Self {
            geometry: GeometryData {
                vertices: Vec::new(),
                indices: Vec::new(),
            },
            passes: Default::default(),
        }
    }
}

impl<D: Dimension> PolygonBatch<D> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the fan-triangulated geometry of a convex polygon.
    pub fn push_geometry(&mut self, points: &[D::Vector]) -> Result<PrimitiveDataLayout> {
        if points.len() < 3 {
            return Err(OnyxError::InvalidPolygon {
                vertices: points.len(),
            });
        }

        let indices = triangulate_fan(points.len());
        let layout = PrimitiveDataLayout {
            vertex_start: self.geometry.vertices.len() as u32,
            index_start: self.geometry.indices.len() as u32,
            index_count: indices.len() as u32,
        };
        self.geometry.vertices.extend(D::polygon_vertices(points));
        self.geometry.indices.extend(indices);
        Ok(layout)
    }

    /// Adds an instance of geometry previously appended with [`PolygonBatch::push_geometry`].
    pub fn push(&mut self, pass: StencilPass, layout: PrimitiveDataLayout, instance: D::Instance) {
        let (instances, layouts) = &mut self.passes[pass.index()];
        instances.push(instance);
        layouts.push(layout);
    }

    /// Geometry of every polygon of the frame.
    pub fn geometry(&self) -> &GeometryData<D::Vertex> {
        &self.geometry
    }

    pub fn instances(&self, pass: StencilPass) -> &[D::Instance] {
        self.passes[pass.index()].0.as_slice()
    }

    /// One indexed draw per instance.
    pub fn draw_commands(&self, pass: StencilPass) -> Vec<DrawCommand> {
        self.passes[pass.index()]
            .1
            .iter()
            .enumerate()
            .map(|(i, layout)| DrawCommand::Indexed {
                indices: layout.indices(),
                base_vertex: layout.vertex_start as i32,
                instances: i as u32..i as u32 + 1,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.passes.iter().map(|(p, _)| p.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.geometry.vertices.clear();
        self.geometry.indices.clear();
        for (instances, layouts) in &mut self.passes {
            instances.clear();
            layouts.clear();
        }
    }
}

/// Circles and arcs, drawn as quads generated in the vertex shader.
#[derive(Clone, Debug)]
pub struct CircleBatch<D: Dimension> {
    passes: [FlatInstances<D::CircleInstance>; 4],
}

impl<D: Dimension> Default for CircleBatch<D> {
    fn default() -> Self {
        Self {
            passes: Default::default(),
        }
    }
}

impl<D: Dimension> CircleBatch<D> {
    /// Vertices of the quad every circle is rasterized on.
    pub const QUAD_VERTICES: Range<u32> = 0..6;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, pass: StencilPass, instance: D::CircleInstance) {
        self.passes[pass.index()].push(instance);
    }

    pub fn instances(&self, pass: StencilPass) -> &[D::CircleInstance] {
        self.passes[pass.index()].as_slice()
    }

    /// A single instanced draw per pass.
    pub fn draw_commands(&self, pass: StencilPass) -> Vec<DrawCommand> {
        let count = self.passes[pass.index()].len() as u32;
        if count == 0 {
            return Vec::new();
        }
        vec![DrawCommand::Vertices {
            vertices: Self::QUAD_VERTICES,
            instances: 0..count,
        }]
    }

    pub fn len(&self) -> usize {
        self.passes.iter().map(FlatInstances::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.passes.iter_mut().for_each(FlatInstances::clear);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimension::{D2, D3};
    use crate::renderer::instance::{InstanceData2d, InstanceData3d};
    use glamx::{Vec2, Vec3};

    fn layout(vertex_start: u32, index_start: u32, index_count: u32) -> PrimitiveDataLayout {
        PrimitiveDataLayout {
            vertex_start,
            index_start,
            index_count,
        }
    }

    #[test]
    fn test_one_command_per_key() {
        let mut batch = PrimitiveBatch::<D2>::new();
        let pass = StencilPass::NoStencilWriteDoFill;
        for _ in 0..3 {
            batch.push(pass, Primitive::SQUARE, InstanceData2d::default());
        }
        batch.push(pass, Primitive::TRIANGLE, InstanceData2d::default());
        batch.push(pass, Primitive::SQUARE, InstanceData2d::default());

        let commands = batch.draw_commands(pass, |p| {
            Some(if p == Primitive::TRIANGLE {
                layout(0, 0, 3)
            } else {
                layout(3, 3, 6)
            })
        });

        assert_eq!(
            commands,
            vec![
                DrawCommand::Indexed {
                    indices: 3..9,
                    base_vertex: 3,
                    instances: 0..4
                },
                DrawCommand::Indexed {
                    indices: 0..3,
                    base_vertex: 0,
                    instances: 4..5
                },
            ]
        );
        assert!(batch
            .draw_commands(StencilPass::DoStencilTestNoFill, |_| None)
            .is_empty());
    }

    #[test]
    fn test_passes_are_independent() {
        let mut batch = PrimitiveBatch::<D3>::new();
        batch.push(
            StencilPass::DoStencilWriteDoFill,
            Primitive::CUBE,
            InstanceData3d::default(),
        );
        batch.push(
            StencilPass::DoStencilTestNoFill,
            Primitive::CUBE,
            InstanceData3d::default(),
        );
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.instances(StencilPass::DoStencilWriteDoFill).len(), 1);
        assert!(batch.instances(StencilPass::NoStencilWriteDoFill).is_empty());

        batch.clear();
        assert!(batch.is_empty());
    }

    #[test]
    fn test_polygon_triangulation() {
        let mut batch = PolygonBatch::<D2>::new();
        let pentagon: Vec<Vec2> = (0..5)
            .map(|i| Vec2::from_angle(i as f32 * std::f32::consts::TAU / 5.0))
            .collect();
        let first = batch.push_geometry(&pentagon).unwrap();
        let second = batch.push_geometry(&pentagon[..3]).unwrap();

        assert_eq!(first, layout(0, 0, 9));
        assert_eq!(second, layout(5, 9, 3));
        assert_eq!(&batch.geometry().indices[..9], &[0, 1, 2, 0, 2, 3, 0, 3, 4]);
        assert_eq!(&batch.geometry().indices[9..], &[0, 1, 2]);

        let pass = StencilPass::NoStencilWriteDoFill;
        batch.push(pass, first, InstanceData2d::default());
        batch.push(pass, second, InstanceData2d::default());
        assert_eq!(
            batch.draw_commands(pass)[1],
            DrawCommand::Indexed {
                indices: 9..12,
                base_vertex: 5,
                instances: 1..2
            }
        );
    }

    #[test]
    fn test_degenerate_polygon_is_rejected() {
        let mut batch = PolygonBatch::<D3>::new();
        assert!(matches!(
            batch.push_geometry(&[Vec3::ZERO, Vec3::X]),
            Err(OnyxError::InvalidPolygon { vertices: 2 })
        ));
        assert!(batch.geometry().vertices.is_empty());
    }

    #[test]
    fn test_circles_draw_once_per_pass() {
        let mut batch = CircleBatch::<D2>::new();
        let pass = StencilPass::DoStencilWriteNoFill;
        assert!(batch.draw_commands(pass).is_empty());

        for _ in 0..7 {
            batch.push(pass, Default::default());
        }
        assert_eq!(
            batch.draw_commands(pass),
            vec![DrawCommand::Vertices {
                vertices: 0..6,
                instances: 0..7
            }]
        );
        assert_eq!(batch.draw_commands(pass)[0].instance_count(), 7);
    }

    #[test]
    fn test_clearing_twice_is_harmless() {
        let pass = StencilPass::DoStencilWriteDoFill;
        let mut polygons = PolygonBatch::<D2>::new();
        let triangle = polygons
            .push_geometry(&[Vec2::ZERO, Vec2::X, Vec2::Y])
            .unwrap();
        polygons.push(pass, triangle, InstanceData2d::default());
        let mut circles = CircleBatch::<D3>::new();
        circles.push(pass, Default::default());

        for _ in 0..2 {
            polygons.clear();
            circles.clear();
            assert!(polygons.is_empty());
            assert!(polygons.geometry().indices.is_empty());
            assert!(polygons.draw_commands(pass).is_empty());
            assert!(circles.is_empty());
            assert!(circles.draw_commands(pass).is_empty());
        }
    }
}
