//! Compile-time dimension markers.
//!
//! Everything that differs between the 2D and the 3D renderer (math types, vertex format,
//! instance record layout, shaders, lighting) hangs off the [`Dimension`] trait so the
//! renderers themselves are written once.

use crate::renderer::instance::{
    ArcData, CircleInstanceData2d, CircleInstanceData3d, InstanceData2d, InstanceData3d, Material,
};
use crate::resource::{GeometryData, Vertex2d, Vertex3d};
use bytemuck::Pod;
use glamx::{Mat3, Mat4, Quat, Vec2, Vec3, Vec4};
use std::fmt::Debug;
use std::ops::Mul;

const CIRCLE_PRELUDE: &str = include_str!("shaders/circle_common.wgsl");

/// Marker for the 2D renderer.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct D2;

/// Marker for the 3D renderer.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct D3;

/// Types and operations that depend on the rendering dimension.
pub trait Dimension: 'static + Copy + Clone + Debug + Default + Send + Sync {
    /// Position/direction vector.
    type Vector: Copy + Debug + PartialEq;
    /// Homogeneous affine transform (`Mat3` in 2D, `Mat4` in 3D).
    type Transform: Copy + Debug + PartialEq + Mul<Output = Self::Transform>;
    /// Rotation representation (an angle in 2D, a quaternion in 3D).
    type Rotation: Copy + Debug;
    /// Transform basis as stored in instance records.
    type Basis: Pod + Debug + PartialEq;
    /// Vertex layout of meshes, primitives and polygons.
    type Vertex: Pod + Debug + PartialEq;
    /// Instance record of meshes, primitives and polygons.
    type Instance: Pod + Debug + PartialEq;
    /// Instance record of circles and arcs.
    type CircleInstance: Pod + Debug + PartialEq;

    /// Human readable name, used in labels.
    const NAME: &'static str;
    /// Whether fill passes go through the lit shading path.
    const LIT: bool;
    /// Whether pipelines test and write depth.
    const DEPTH_TEST: bool;
    /// WGSL declarations shared by every pipeline of the dimension.
    const SHADER_PRELUDE: &'static str;
    /// WGSL source of the mesh-like pipelines.
    const MESH_SHADER: &'static str;
    /// WGSL source of the circle pipelines.
    const CIRCLE_SHADER: &'static str;

    /// Complete WGSL module of the mesh-like pipelines.
    fn mesh_shader() -> String {
        format!("{}\n{}", Self::SHADER_PRELUDE, Self::MESH_SHADER)
    }

    /// Complete WGSL module of the circle pipelines.
    fn circle_shader() -> String {
        format!(
            "{}\n{}\n{}",
            Self::SHADER_PRELUDE,
            CIRCLE_PRELUDE,
            Self::CIRCLE_SHADER
        )
    }

    /// The identity transform.
    fn identity() -> Self::Transform;
    /// A vector with every component set to `value`.
    fn splat(value: f32) -> Self::Vector;
    /// A vector in the XY plane; `z` is dropped in 2D.
    fn from_plane(xy: Vec2, z: f32) -> Self::Vector;
    /// Euclidean length.
    fn length(v: Self::Vector) -> f32;
    /// Translation matrix.
    fn from_translation(translation: Self::Vector) -> Self::Transform;
    /// Scaling matrix.
    fn from_scale(scale: Self::Vector) -> Self::Transform;
    /// Rotation matrix.
    fn from_rotation(rotation: Self::Rotation) -> Self::Transform;
    /// Rigid frame centered between `start` and `end` with its X axis along the segment, and
    /// the segment length.
    fn segment_frame(start: Self::Vector, end: Self::Vector) -> (Self::Transform, f32);

    /// Transform mapping the unit square `[-0.5, 0.5]²` onto a segment of the given thickness.
    fn line_transform(start: Self::Vector, end: Self::Vector, thickness: f32) -> Self::Transform {
        let (frame, length) = Self::segment_frame(start, end);
        frame * Self::from_scale(Self::from_plane(Vec2::new(length, thickness), thickness))
    }

    /// Decomposes a transform into the basis stored on the GPU, dropping the constant last row.
    fn encode_basis(transform: &Self::Transform) -> Self::Basis;
    /// Rebuilds the transform from its stored basis.
    fn decode_basis(basis: &Self::Basis) -> Self::Transform;

    /// Applies a scale in the transform's local frame.
    fn scale_intrinsic(transform: &Self::Transform, scale: Self::Vector) -> Self::Transform {
        *transform * Self::from_scale(scale)
    }

    /// Uniform local-frame scale applied to the silhouette of an outline pass.
    fn scale_outline(transform: &Self::Transform, factor: f32) -> Self::Transform {
        Self::scale_intrinsic(transform, Self::splat(factor))
    }

    /// Builds an instance record.
    fn instance(basis: Self::Basis, color: u32, extra: u32, material: Material) -> Self::Instance;
    /// Basis stored in an instance record.
    fn instance_basis(instance: &Self::Instance) -> Self::Basis;
    /// Packed color stored in an instance record.
    fn instance_color(instance: &Self::Instance) -> u32;
    /// Raw union word (texture index or outline width bits) of an instance record.
    fn instance_extra(instance: &Self::Instance) -> u32;

    /// Builds a circle record from its base record and arc parameters.
    fn circle_instance(base: Self::Instance, arc: ArcData) -> Self::CircleInstance;
    /// Arc parameters of a circle record.
    fn circle_arc(instance: &Self::CircleInstance) -> ArcData;

    /// A vertex lying in the XY plane.
    fn flat_vertex(position: Vec2) -> Self::Vertex;
    /// Vertices of a user polygon.
    fn polygon_vertices(points: &[Self::Vector]) -> Vec<Self::Vertex>;
    /// Vertex buffer layout of [`Dimension::Vertex`].
    fn vertex_layout() -> wgpu::VertexBufferLayout<'static>;
    /// Primitives that only exist in this dimension, in registration order.
    fn extra_primitives() -> Vec<GeometryData<Self::Vertex>>;
}

impl Dimension for D2 {
    type Vector = Vec2;
    type Transform = Mat3;
    type Rotation = f32;
    type Basis = [[f32; 2]; 3];
    type Vertex = Vertex2d;
    type Instance = InstanceData2d;
    type CircleInstance = CircleInstanceData2d;

    const NAME: &'static str = "2d";
    const LIT: bool = false;
    const DEPTH_TEST: bool = false;
    const SHADER_PRELUDE: &'static str = include_str!("shaders/common2d.wgsl");
    const MESH_SHADER: &'static str = include_str!("shaders/mesh2d.wgsl");
    const CIRCLE_SHADER: &'static str = include_str!("shaders/circle2d.wgsl");

    fn identity() -> Mat3 {
        Mat3::IDENTITY
    }

    fn splat(value: f32) -> Vec2 {
        Vec2::splat(value)
    }

    fn from_plane(xy: Vec2, _: f32) -> Vec2 {
        xy
    }

    fn length(v: Vec2) -> f32 {
        v.length()
    }

    fn from_translation(translation: Vec2) -> Mat3 {
        Mat3::from_translation(translation)
    }

    fn from_scale(scale: Vec2) -> Mat3 {
        Mat3::from_scale(scale)
    }

    fn from_rotation(angle: f32) -> Mat3 {
        Mat3::from_angle(angle)
    }

    fn segment_frame(start: Vec2, end: Vec2) -> (Mat3, f32) {
        let delta = end - start;
        let angle = delta.y.atan2(delta.x);
        let frame = Mat3::from_scale_angle_translation(Vec2::ONE, angle, 0.5 * (start + end));
        (frame, delta.length())
    }

    fn encode_basis(transform: &Mat3) -> [[f32; 2]; 3] {
        [
            transform.x_axis.truncate().to_array(),
            transform.y_axis.truncate().to_array(),
            transform.z_axis.truncate().to_array(),
        ]
    }

    fn decode_basis(basis: &[[f32; 2]; 3]) -> Mat3 {
        Mat3::from_cols(
            Vec2::from(basis[0]).extend(0.0),
            Vec2::from(basis[1]).extend(0.0),
            Vec2::from(basis[2]).extend(1.0),
        )
    }

    fn instance(basis: [[f32; 2]; 3], color: u32, extra: u32, _: Material) -> InstanceData2d {
        InstanceData2d {
            basis,
            color,
            extra,
        }
    }

    fn instance_basis(instance: &InstanceData2d) -> [[f32; 2]; 3] {
        instance.basis
    }

    fn instance_color(instance: &InstanceData2d) -> u32 {
        instance.color
    }

    fn instance_extra(instance: &InstanceData2d) -> u32 {
        instance.extra
    }

    fn circle_instance(base: InstanceData2d, arc: ArcData) -> CircleInstanceData2d {
        CircleInstanceData2d { base, arc }
    }

    fn circle_arc(instance: &CircleInstanceData2d) -> ArcData {
        instance.arc
    }

    fn flat_vertex(position: Vec2) -> Vertex2d {
        Vertex2d {
            position: position.to_array(),
        }
    }

    fn polygon_vertices(points: &[Vec2]) -> Vec<Vertex2d> {
        points.iter().map(|p| Self::flat_vertex(*p)).collect()
    }

    fn vertex_layout() -> wgpu::VertexBufferLayout<'static> {
        Vertex2d::layout()
    }

    fn extra_primitives() -> Vec<GeometryData<Vertex2d>> {
        Vec::new()
    }
}

impl Dimension for D3 {
    type Vector = Vec3;
    type Transform = Mat4;
    type Rotation = Quat;
    type Basis = [[f32; 4]; 3];
    type Vertex = Vertex3d;
    type Instance = InstanceData3d;
    type CircleInstance = CircleInstanceData3d;

    const NAME: &'static str = "3d";
    const LIT: bool = true;
    const DEPTH_TEST: bool = true;
    const SHADER_PRELUDE: &'static str = include_str!("shaders/common3d.wgsl");
    const MESH_SHADER: &'static str = include_str!("shaders/mesh3d.wgsl");
    const CIRCLE_SHADER: &'static str = include_str!("shaders/circle3d.wgsl");

    fn identity() -> Mat4 {
        Mat4::IDENTITY
    }

    fn splat(value: f32) -> Vec3 {
        Vec3::splat(value)
    }

    fn from_plane(xy: Vec2, z: f32) -> Vec3 {
        xy.extend(z)
    }

    fn length(v: Vec3) -> f32 {
        v.length()
    }

    fn from_translation(translation: Vec3) -> Mat4 {
        Mat4::from_translation(translation)
    }

    fn from_scale(scale: Vec3) -> Mat4 {
        Mat4::from_scale(scale)
    }

    fn from_rotation(rotation: Quat) -> Mat4 {
        Mat4::from_quat(rotation)
    }

    fn segment_frame(start: Vec3, end: Vec3) -> (Mat4, f32) {
        let delta = end - start;
        let length = delta.length();
        let rotation = if length > f32::EPSILON {
            Quat::from_rotation_arc(Vec3::X, delta / length)
        } else {
            Quat::IDENTITY
        };
        (
            Mat4::from_rotation_translation(rotation, 0.5 * (start + end)),
            length,
        )
    }

    fn encode_basis(transform: &Mat4) -> [[f32; 4]; 3] {
        [
            transform.row(0).to_array(),
            transform.row(1).to_array(),
            transform.row(2).to_array(),
        ]
    }

    fn decode_basis(basis: &[[f32; 4]; 3]) -> Mat4 {
        Mat4::from_cols(
            Vec4::from(basis[0]),
            Vec4::from(basis[1]),
            Vec4::from(basis[2]),
            Vec4::W,
        )
        .transpose()
    }

    fn instance(basis: [[f32; 4]; 3], color: u32, extra: u32, material: Material) -> InstanceData3d {
        InstanceData3d {
            basis,
            color,
            extra,
            diffuse: material.diffuse,
            specular: material.specular,
            sharpness: material.sharpness,
            _pad: [0; 3],
        }
    }

    fn instance_basis(instance: &InstanceData3d) -> [[f32; 4]; 3] {
        instance.basis
    }

    fn instance_color(instance: &InstanceData3d) -> u32 {
        instance.color
    }

    fn instance_extra(instance: &InstanceData3d) -> u32 {
        instance.extra
    }

    fn circle_instance(base: InstanceData3d, arc: ArcData) -> CircleInstanceData3d {
        CircleInstanceData3d { base, arc }
    }

    fn circle_arc(instance: &CircleInstanceData3d) -> ArcData {
        instance.arc
    }

    fn flat_vertex(position: Vec2) -> Vertex3d {
        Vertex3d {
            position: position.extend(0.0).to_array(),
            normal: Vec3::Z.to_array(),
        }
    }

    fn polygon_vertices(points: &[Vec3]) -> Vec<Vertex3d> {
        let normal = match points {
            [a, b, c, ..] => (*b - *a).cross(*c - *a).normalize_or(Vec3::Z),
            _ => Vec3::Z,
        };
        points
            .iter()
            .map(|p| Vertex3d {
                position: p.to_array(),
                normal: normal.to_array(),
            })
            .collect()
    }

    fn vertex_layout() -> wgpu::VertexBufferLayout<'static> {
        Vertex3d::layout()
    }

    fn extra_primitives() -> Vec<GeometryData<Vertex3d>> {
        vec![
            crate::resource::primitives::cube(),
            crate::resource::primitives::sphere(16, 32),
            crate::resource::primitives::cylinder(32),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn assert_mat3_eq(a: Mat3, b: Mat3) {
        assert!(a.abs_diff_eq(b, 1.0e-5), "{a:?} != {b:?}");
    }

    fn assert_mat4_eq(a: Mat4, b: Mat4) {
        assert!(a.abs_diff_eq(b, 1.0e-5), "{a:?} != {b:?}");
    }

    #[test]
    fn test_basis_round_trip_2d() {
        let mut rng = rand::rng();
        for _ in 0..64 {
            let transform = Mat3::from_scale_angle_translation(
                Vec2::new(rng.random_range(0.1..5.0), rng.random_range(0.1..5.0)),
                rng.random_range(-3.0..3.0),
                Vec2::new(rng.random_range(-10.0..10.0), rng.random_range(-10.0..10.0)),
            );
            assert_mat3_eq(D2::decode_basis(&D2::encode_basis(&transform)), transform);
        }
    }

    #[test]
    fn test_basis_round_trip_3d() {
        let mut rng = rand::rng();
        for _ in 0..64 {
            let axis = Vec3::new(
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
                rng.random_range(0.1..1.0),
            )
            .normalize();
            let transform = Mat4::from_scale_rotation_translation(
                Vec3::new(
                    rng.random_range(0.1..5.0),
                    rng.random_range(0.1..5.0),
                    rng.random_range(0.1..5.0),
                ),
                Quat::from_axis_angle(axis, rng.random_range(-3.0..3.0)),
                Vec3::new(rng.random_range(-10.0..10.0), 2.0, rng.random_range(-10.0..10.0)),
            );
            assert_mat4_eq(D3::decode_basis(&D3::encode_basis(&transform)), transform);
        }
    }

    #[test]
    fn test_basis_3d_stores_rows_with_translation_last() {
        let transform = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let basis = D3::encode_basis(&transform);
        assert_eq!(basis[0], [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(basis[1], [0.0, 1.0, 0.0, 2.0]);
        assert_eq!(basis[2], [0.0, 0.0, 1.0, 3.0]);
    }

    #[test]
    fn test_basis_2d_stores_translation_column_last() {
        let transform = Mat3::from_translation(Vec2::new(4.0, -1.0));
        assert_eq!(D2::encode_basis(&transform)[2], [4.0, -1.0]);
    }

    #[test]
    fn test_line_transform_maps_unit_segment() {
        let t = D2::line_transform(Vec2::new(0.0, 0.0), Vec2::new(0.0, 4.0), 0.5);
        let end = t.transform_point2(Vec2::new(0.5, 0.0));
        assert!(end.abs_diff_eq(Vec2::new(0.0, 4.0), 1.0e-5));

        let t = D3::line_transform(Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0), 0.1);
        let start = t.transform_point3(Vec3::new(-0.5, 0.0, 0.0));
        assert!(start.abs_diff_eq(Vec3::ZERO, 1.0e-5));
    }

    #[test]
    fn test_segment_frame_is_rigid() {
        let (frame, length) = D2::segment_frame(Vec2::new(1.0, 1.0), Vec2::new(1.0, 4.0));
        assert!((length - 3.0).abs() < 1.0e-6);
        assert!(frame
            .transform_point2(Vec2::ZERO)
            .abs_diff_eq(Vec2::new(1.0, 2.5), 1.0e-6));
        assert!(frame.transform_vector2(Vec2::X).abs_diff_eq(Vec2::Y, 1.0e-6));

        let (frame, length) = D3::segment_frame(Vec3::ZERO, Vec3::new(0.0, 0.0, -2.0));
        assert!((length - 2.0).abs() < 1.0e-6);
        assert!(frame
            .transform_vector3(Vec3::X)
            .abs_diff_eq(Vec3::NEG_Z, 1.0e-6));
        assert!((frame.transform_vector3(Vec3::Y).length() - 1.0).abs() < 1.0e-6);
    }

    #[test]
    fn test_polygon_normal_3d() {
        let vertices = D3::polygon_vertices(&[Vec3::ZERO, Vec3::X, Vec3::Y]);
        assert_eq!(vertices[0].normal, [0.0, 0.0, 1.0]);
    }
}
