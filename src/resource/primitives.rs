//! Built-in unit shapes.
//!
//! Every primitive fits the unit box centered at the origin: the square spans `[-0.5, 0.5]²`,
//! regular polygons and spheres have diameter 1 and the cylinder is oriented along Y.

use crate::context::RenderingContext;
use crate::dimension::Dimension;
use crate::error::{OnyxError, Result};
use crate::resource::mesh::{GeometryBuffers, GeometryData, PrimitiveDataLayout, Vertex3d};
use crate::resource::BarrierBatch;
use glamx::{Vec2, Vec3};
use std::f32::consts::{PI, TAU};

/// Handle to a built-in primitive.
///
/// Handles mean the same shape in both dimensions. The 3D-only handles are rejected by the 2D
/// [`Primitives`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Primitive(u32);

impl Primitive {
    pub const TRIANGLE: Primitive = Primitive(0);
    pub const SQUARE: Primitive = Primitive(1);
    /// 3D only.
    pub const CUBE: Primitive = Primitive(2);
    /// 3D only.
    pub const SPHERE: Primitive = Primitive(3);
    /// 3D only.
    pub const CYLINDER: Primitive = Primitive(4);

    /// Handle of the triangle n-gon; the other regular polygons follow by side count.
    const FIRST_NGON: u32 = 5;

    /// Raw handle value.
    pub fn index(self) -> u32 {
        self.0
    }
}

/// Triangulates a regular polygon of diameter 1 as a fan around its first vertex.
pub fn regular_polygon<D: Dimension>(sides: u32) -> GeometryData<D::Vertex> {
    let angle = TAU / sides as f32;
    let vertices = (0..sides)
        .map(|i| {
            let (sin, cos) = (angle * i as f32).sin_cos();
            D::flat_vertex(Vec2::new(0.5 * cos, 0.5 * sin))
        })
        .collect();

    let indices = (1..sides - 1).flat_map(|i| [0, i, i + 1]).collect();
    GeometryData { vertices, indices }
}

fn triangle<D: Dimension>() -> GeometryData<D::Vertex> {
    GeometryData {
        vertices: vec![
            D::flat_vertex(Vec2::new(-0.5, -0.5)),
            D::flat_vertex(Vec2::new(0.5, -0.5)),
            D::flat_vertex(Vec2::new(0.0, 0.5)),
        ],
        indices: vec![0, 1, 2],
    }
}

fn square<D: Dimension>() -> GeometryData<D::Vertex> {
    GeometryData {
        vertices: vec![
            D::flat_vertex(Vec2::new(-0.5, -0.5)),
            D::flat_vertex(Vec2::new(0.5, -0.5)),
            D::flat_vertex(Vec2::new(0.5, 0.5)),
            D::flat_vertex(Vec2::new(-0.5, 0.5)),
        ],
        indices: vec![0, 1, 2, 0, 2, 3],
    }
}

fn vertex(position: Vec3, normal: Vec3) -> Vertex3d {
    Vertex3d {
        position: position.to_array(),
        normal: normal.to_array(),
    }
}

/// Unit cube with flat-shaded faces.
pub fn cube() -> GeometryData<Vertex3d> {
    let mut data = GeometryData::default();

    for normal in [Vec3::X, -Vec3::X, Vec3::Y, -Vec3::Y, Vec3::Z, -Vec3::Z] {
        // Two axes spanning the face, oriented so that (u, v, normal) is right-handed.
        let u = if normal.x.abs() > 0.5 {
            Vec3::Y * normal.x.signum()
        } else if normal.y.abs() > 0.5 {
            Vec3::Z * normal.y.signum()
        } else {
            Vec3::X * normal.z.signum()
        };
        let v = normal.cross(u);

        let start = data.vertices.len() as u32;
        for (su, sv) in [(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)] {
            data.vertices
                .push(vertex(0.5 * normal + su * u + sv * v, normal));
        }
        data.indices
            .extend([start, start + 1, start + 2, start, start + 2, start + 3]);
    }

    data
}

/// UV sphere of diameter 1.
pub fn sphere(stacks: u32, slices: u32) -> GeometryData<Vertex3d> {
    let mut data = GeometryData::default();

    for stack in 0..=stacks {
        let phi = PI * stack as f32 / stacks as f32;
        let (sin_phi, cos_phi) = phi.sin_cos();
        for slice in 0..=slices {
            let theta = TAU * slice as f32 / slices as f32;
            let (sin_theta, cos_theta) = theta.sin_cos();
            let normal = Vec3::new(sin_phi * cos_theta, cos_phi, -sin_phi * sin_theta);
            data.vertices.push(vertex(0.5 * normal, normal));
        }
    }

    let row = slices + 1;
    for stack in 0..stacks {
        for slice in 0..slices {
            let a = stack * row + slice;
            let b = a + row;
            if stack != 0 {
                data.indices.extend([a, b, a + 1]);
            }
            if stack != stacks - 1 {
                data.indices.extend([a + 1, b, b + 1]);
            }
        }
    }

    data
}

/// Cylinder of diameter 1 and height 1 along the Y axis, capped on both ends.
pub fn cylinder(segments: u32) -> GeometryData<Vertex3d> {
    let mut data = GeometryData::default();
    let ring = |i: u32| {
        let (sin, cos) = (TAU * i as f32 / segments as f32).sin_cos();
        Vec3::new(cos, 0.0, -sin)
    };

    // Side: one ring per end, smooth normals.
    for i in 0..segments {
        let n = ring(i);
        data.vertices.push(vertex(0.5 * n - 0.5 * Vec3::Y, n));
        data.vertices.push(vertex(0.5 * n + 0.5 * Vec3::Y, n));
    }
    for i in 0..segments {
        let j = (i + 1) % segments;
        let (b0, t0, b1, t1) = (2 * i, 2 * i + 1, 2 * j, 2 * j + 1);
        data.indices.extend([b0, b1, t1, b0, t1, t0]);
    }

    // Caps: fans with flat normals.
    for (y, normal) in [(0.5, Vec3::Y), (-0.5, -Vec3::Y)] {
        let start = data.vertices.len() as u32;
        for i in 0..segments {
            data.vertices
                .push(vertex(0.5 * ring(i) + y * Vec3::Y, normal));
        }
        for i in 1..segments - 1 {
            if normal.y > 0.0 {
                data.indices.extend([start, start + i, start + i + 1]);
            } else {
                data.indices.extend([start, start + i + 1, start + i]);
            }
        }
    }

    data
}

/// Every built-in primitive of one dimension, packed in one vertex and one index buffer.
///
/// Geometry order: triangle, square, the dimension's own primitives (cube, sphere, cylinder in
/// 3D), then regular polygons from 3 to the configured maximum number of sides.
pub struct Primitives<D: Dimension> {
    geometry: GeometryBuffers<D::Vertex>,
    /// Geometry slot of the triangle n-gon.
    ngon_start: u32,
    max_sides: u32,
}

impl<D: Dimension> Primitives<D> {
    /// Builds the host geometry of every primitive.
    pub fn build(max_sides: u32) -> Self {
        let mut geometry = GeometryBuffers::new();
        geometry.append(triangle::<D>());
        geometry.append(square::<D>());
        for data in D::extra_primitives() {
            geometry.append(data);
        }

        let ngon_start = geometry.len() as u32;
        for sides in 3..=max_sides {
            geometry.append(regular_polygon::<D>(sides));
        }

        Self {
            geometry,
            ngon_start,
            max_sides,
        }
    }

    /// Builds every primitive and uploads them.
    pub fn new(ctx: &RenderingContext) -> Result<Self> {
        let mut primitives = Self::build(ctx.config().max_regular_polygon_sides);
        log::info!(
            "creating {} primitive vertex and index buffers ({} primitives)",
            D::NAME,
            primitives.geometry.len()
        );

        let mut encoder = ctx.create_command_encoder("onyx_primitive_upload");
        let mut barriers = BarrierBatch::new(false);
        primitives.geometry.upload(
            ctx,
            &mut encoder,
            &format!("onyx_primitives_{}", D::NAME),
            &mut barriers,
        )?;
        barriers.apply();
        ctx.submit(Some(encoder.finish()));

        Ok(primitives)
    }

    /// The regular polygon with the given number of sides.
    pub fn ngon(&self, sides: u32) -> Result<Primitive> {
        if !(3..=self.max_sides).contains(&sides) {
            return Err(OnyxError::InvalidSides {
                sides,
                max: self.max_sides,
            });
        }
        Ok(Primitive(Primitive::FIRST_NGON + sides - 3))
    }

    /// Geometry slot of a handle, `None` for handles of primitives this dimension lacks.
    fn slot(&self, primitive: Primitive) -> Option<usize> {
        let index = primitive.0;
        if index < Primitive::FIRST_NGON {
            (index < self.ngon_start).then_some(index as usize)
        } else {
            Some((self.ngon_start + index - Primitive::FIRST_NGON) as usize)
        }
    }

    /// Location of a primitive in the combined buffers.
    pub fn layout(&self, primitive: Primitive) -> Result<PrimitiveDataLayout> {
        self.slot(primitive)
            .and_then(|slot| self.geometry.layout(slot))
            .ok_or(OnyxError::InvalidPrimitive { index: primitive.0 })
    }

    /// Number of primitives.
    pub fn len(&self) -> usize {
        self.geometry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geometry.is_empty()
    }

    pub(crate) fn geometry(&self) -> &GeometryBuffers<D::Vertex> {
        &self.geometry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimension::{D2, D3};

    #[test]
    fn test_regular_polygon_fan() {
        let hexagon = regular_polygon::<D2>(6);
        assert_eq!(hexagon.vertices.len(), 6);
        assert_eq!(hexagon.indices.len(), 6 * 3 - 6);
        assert_eq!(&hexagon.indices[..6], &[0, 1, 2, 0, 2, 3]);
        assert!(hexagon
            .vertices
            .iter()
            .all(|v| (Vec2::from(v.position).length() - 0.5).abs() < 1.0e-6));
    }

    #[test]
    fn test_primitive_order_2d() {
        let primitives = Primitives::<D2>::build(8);
        assert_eq!(primitives.len(), 2 + 6);
        assert_eq!(primitives.ngon(3).unwrap(), Primitive(5));
        assert_eq!(primitives.ngon(8).unwrap(), Primitive(10));
        assert!(matches!(
            primitives.ngon(9),
            Err(OnyxError::InvalidSides { sides: 9, max: 8 })
        ));
        assert!(primitives.ngon(2).is_err());

        assert_eq!(primitives.layout(Primitive::SQUARE).unwrap().index_count, 6);
        let triangle_ngon = primitives.layout(primitives.ngon(3).unwrap()).unwrap();
        assert_eq!(triangle_ngon.vertex_start, 3 + 4);
        assert_eq!(primitives.layout(primitives.ngon(8).unwrap()).unwrap().index_count, 18);
        assert!(primitives.layout(Primitive(11)).is_err());
    }

    #[test]
    fn test_3d_handles_are_rejected_in_2d() {
        let primitives = Primitives::<D2>::build(8);
        for primitive in [Primitive::CUBE, Primitive::SPHERE, Primitive::CYLINDER] {
            assert!(matches!(
                primitives.layout(primitive),
                Err(OnyxError::InvalidPrimitive { index }) if index == primitive.index()
            ));
        }
    }

    #[test]
    fn test_primitive_order_3d() {
        let primitives = Primitives::<D3>::build(8);
        assert_eq!(primitives.len(), 5 + 6);
        assert_eq!(primitives.ngon(3).unwrap(), Primitive(5));
        assert_eq!(primitives.layout(Primitive::CUBE).unwrap().index_count, 36);
        assert_eq!(
            primitives.layout(primitives.ngon(4).unwrap()).unwrap().index_count,
            6
        );

        let square = primitives.layout(Primitive::SQUARE).unwrap();
        let cube = primitives.layout(Primitive::CUBE).unwrap();
        assert_eq!(cube.vertex_start, 3 + 4);
        assert_eq!(cube.index_start, square.index_start + square.index_count);
    }

    #[test]
    fn test_generated_meshes_are_valid() {
        for data in [cube(), sphere(16, 32), cylinder(32), cylinder(3)] {
            data.validate().unwrap();
        }
    }

    #[test]
    fn test_cube_faces_point_outwards() {
        let cube = cube();
        for triangle in cube.indices.chunks(3) {
            let [a, b, c] =
                [0, 1, 2].map(|k| Vec3::from(cube.vertices[triangle[k] as usize].position));
            let normal = Vec3::from(cube.vertices[triangle[0] as usize].normal);
            assert!((b - a).cross(c - a).dot(normal) > 0.0);
        }
    }

    #[test]
    fn test_sphere_vertices_on_surface() {
        assert!(sphere(8, 16)
            .vertices
            .iter()
            .all(|v| (Vec3::from(v.position).length() - 0.5).abs() < 1.0e-5));
    }
}
