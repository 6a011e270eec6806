//! Geometry of compound shapes.
//!
//! Stadiums and rounded squares are assembled from squares and quarter or half arcs, capsules
//! and rounded cubes from cubes, spheres and cylinders. Scaling the assembly uniformly would not
//! give an outline of constant width, so the outline copy is rebuilt with a larger radius and
//! submitted with explicit stencil passes.

use crate::dimension::{Dimension, D3};
use crate::renderer::DrawFlags;
use crate::resource::Primitive;
use glamx::{Mat4, Quat, Vec2, Vec3};
use std::f32::consts::{FRAC_PI_2, PI};

/// One piece of a compound shape, relative to the shape's own frame.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ShapePart<D: Dimension> {
    Primitive {
        transform: D::Transform,
        primitive: Primitive,
    },
    Arc {
        transform: D::Transform,
        lower_angle: f32,
        upper_angle: f32,
    },
}

impl<D: Dimension> ShapePart<D> {
    /// The same piece placed in `frame`.
    pub fn placed(&self, frame: &D::Transform) -> Self {
        match *self {
            ShapePart::Primitive {
                transform,
                primitive,
            } => ShapePart::Primitive {
                transform: *frame * transform,
                primitive,
            },
            ShapePart::Arc {
                transform,
                lower_angle,
                upper_angle,
            } => ShapePart::Arc {
                transform: *frame * transform,
                lower_angle,
                upper_angle,
            },
        }
    }
}

fn translate_scale<D: Dimension>(translation: Vec2, scale: Vec2) -> D::Transform {
    D::from_translation(D::from_plane(translation, 0.0)) * D::from_scale(D::from_plane(scale, 1.0))
}

fn arc<D: Dimension>(center: Vec2, diameter: f32, lower_angle: f32, upper_angle: f32) -> ShapePart<D> {
    ShapePart::Arc {
        transform: translate_scale::<D>(center, Vec2::new(diameter, diameter)),
        lower_angle,
        upper_angle,
    }
}

/// A rectangle of `length` by `diameter` capped by two half disks.
pub fn stadium_parts<D: Dimension>(length: f32, diameter: f32) -> Vec<ShapePart<D>> {
    let cap = 0.5 * length;
    vec![
        ShapePart::Primitive {
            transform: translate_scale::<D>(Vec2::ZERO, Vec2::new(length, diameter)),
            primitive: Primitive::SQUARE,
        },
        arc(Vec2::new(-cap, 0.0), diameter, FRAC_PI_2, 1.5 * PI),
        arc(Vec2::new(cap, 0.0), diameter, -FRAC_PI_2, FRAC_PI_2),
    ]
}

/// A `dimensions` rectangle whose sides are pushed out by `radius` and whose corners are
/// quarter disks of that radius.
pub fn rounded_square_parts<D: Dimension>(dimensions: Vec2, radius: f32) -> Vec<ShapePart<D>> {
    let half = 0.5 * dimensions;
    let padded = half + Vec2::splat(0.5 * radius);
    let diameter = 2.0 * radius;

    let mut parts = Vec::with_capacity(9);
    parts.push(ShapePart::Primitive {
        transform: translate_scale::<D>(Vec2::ZERO, dimensions),
        primitive: Primitive::SQUARE,
    });

    let mut corner = half;
    for i in 0..4 {
        let axis = i % 2;
        let sign = if i < 2 { 1.0 } else { -1.0 };

        let mut offset = Vec2::ZERO;
        offset[axis] = sign * padded[axis];
        let mut scale = dimensions;
        scale[axis] = radius;
        parts.push(ShapePart::Primitive {
            transform: translate_scale::<D>(offset, scale),
            primitive: Primitive::SQUARE,
        });

        let angle = i as f32 * FRAC_PI_2;
        parts.push(arc(corner, diameter, angle, angle + FRAC_PI_2));
        corner[axis] = -corner[axis];
    }
    parts
}

fn solid(primitive: Primitive, translation: Vec3, rotation: Quat, scale: Vec3) -> ShapePart<D3> {
    ShapePart::Primitive {
        transform: Mat4::from_scale_rotation_translation(scale, rotation, translation),
        primitive,
    }
}

/// Rotation taking the cylinder axis (Y) onto `axis`.
fn cylinder_rotation(axis: usize) -> Quat {
    match axis {
        0 => Quat::from_rotation_z(-FRAC_PI_2),
        1 => Quat::IDENTITY,
        _ => Quat::from_rotation_x(FRAC_PI_2),
    }
}

/// A cylinder of `length` along X capped by two spheres of `diameter`.
pub fn capsule_parts(length: f32, diameter: f32) -> Vec<ShapePart<D3>> {
    let cap = 0.5 * length;
    let ball = Vec3::splat(diameter);
    vec![
        solid(
            Primitive::CYLINDER,
            Vec3::ZERO,
            cylinder_rotation(0),
            Vec3::new(diameter, length, diameter),
        ),
        solid(Primitive::SPHERE, Vec3::new(-cap, 0.0, 0.0), Quat::IDENTITY, ball),
        solid(Primitive::SPHERE, Vec3::new(cap, 0.0, 0.0), Quat::IDENTITY, ball),
    ]
}

/// A `dimensions` box whose faces are pushed out by `radius`, with spheres on the corners and
/// cylinders along the edges.
pub fn rounded_cube_parts(dimensions: Vec3, radius: f32) -> Vec<ShapePart<D3>> {
    let half = 0.5 * dimensions;
    let padded = half + Vec3::splat(0.5 * radius);
    let diameter = 2.0 * radius;

    let mut parts = Vec::with_capacity(27);
    parts.push(solid(Primitive::CUBE, Vec3::ZERO, Quat::IDENTITY, dimensions));

    for axis in 0..3 {
        for sign in [1.0, -1.0] {
            let mut offset = Vec3::ZERO;
            offset[axis] = sign * padded[axis];
            let mut scale = dimensions;
            scale[axis] = radius;
            parts.push(solid(Primitive::CUBE, offset, Quat::IDENTITY, scale));
        }
    }

    for x in [1.0, -1.0] {
        for y in [1.0, -1.0] {
            for z in [1.0, -1.0] {
                let corner = half * Vec3::new(x, y, z);
                parts.push(solid(Primitive::SPHERE, corner, Quat::IDENTITY, Vec3::splat(diameter)));
            }
        }
    }

    for axis in 0..3 {
        let (u, v) = ((axis + 1) % 3, (axis + 2) % 3);
        let scale = Vec3::new(diameter, dimensions[axis], diameter);
        for su in [1.0, -1.0] {
            for sv in [1.0, -1.0] {
                let mut offset = Vec3::ZERO;
                offset[u] = su * half[u];
                offset[v] = sv * half[v];
                parts.push(solid(Primitive::CYLINDER, offset, cylinder_rotation(axis), scale));
            }
        }
    }
    parts
}

/// Flags of the fill copy and of the outline copy of a compound shape, or `None` when the
/// state draws nothing.
pub fn compound_flags(fill: bool, outline: bool) -> Option<(DrawFlags, Option<DrawFlags>)> {
    match (fill, outline) {
        (true, false) => Some((DrawFlags::NO_STENCIL_WRITE_DO_FILL, None)),
        (true, true) => Some((
            DrawFlags::DO_STENCIL_WRITE_DO_FILL,
            Some(DrawFlags::DO_STENCIL_TEST_NO_FILL),
        )),
        (false, true) => Some((
            DrawFlags::DO_STENCIL_WRITE_NO_FILL,
            Some(DrawFlags::DO_STENCIL_TEST_NO_FILL),
        )),
        (false, false) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimension::{D2, D3};
    use glamx::{Mat3, Vec3};

    fn translation_2d(part: &ShapePart<D2>) -> Vec2 {
        let transform: Mat3 = match part {
            ShapePart::Primitive { transform, .. } | ShapePart::Arc { transform, .. } => *transform,
        };
        transform.transform_point2(Vec2::ZERO)
    }

    #[test]
    fn test_stadium_caps_sit_on_the_ends() {
        let parts = stadium_parts::<D2>(4.0, 1.0);
        assert_eq!(parts.len(), 3);
        assert!(translation_2d(&parts[1]).abs_diff_eq(Vec2::new(-2.0, 0.0), 1.0e-6));
        assert!(translation_2d(&parts[2]).abs_diff_eq(Vec2::new(2.0, 0.0), 1.0e-6));

        match parts[1] {
            ShapePart::Arc {
                lower_angle,
                upper_angle,
                ..
            } => assert!((upper_angle - lower_angle - PI).abs() < 1.0e-6),
            _ => panic!("expected an arc"),
        }
    }

    #[test]
    fn test_stadium_body_scale() {
        let parts = stadium_parts::<D2>(3.0, 0.5);
        let ShapePart::Primitive { transform, primitive } = parts[0] else {
            panic!("expected the body first");
        };
        assert_eq!(primitive, Primitive::SQUARE);
        let corner = transform.transform_point2(Vec2::new(0.5, 0.5));
        assert!(corner.abs_diff_eq(Vec2::new(1.5, 0.25), 1.0e-6));
    }

    #[test]
    fn test_rounded_square_corners_and_edges() {
        let parts = rounded_square_parts::<D2>(Vec2::new(2.0, 1.0), 0.25);
        assert_eq!(parts.len(), 9);

        let corners: Vec<Vec2> = parts
            .iter()
            .filter(|p| matches!(p, ShapePart::Arc { .. }))
            .map(translation_2d)
            .collect();
        let expected = [
            Vec2::new(1.0, 0.5),
            Vec2::new(-1.0, 0.5),
            Vec2::new(-1.0, -0.5),
            Vec2::new(1.0, -0.5),
        ];
        for (corner, expected) in corners.iter().zip(expected) {
            assert!(corner.abs_diff_eq(expected, 1.0e-6), "{corner:?} != {expected:?}");
        }

        // Right edge: a strip of width `radius` next to the body.
        assert!(translation_2d(&parts[1]).abs_diff_eq(Vec2::new(1.125, 0.0), 1.0e-6));
        // Top edge.
        assert!(translation_2d(&parts[3]).abs_diff_eq(Vec2::new(0.0, 0.625), 1.0e-6));
    }

    #[test]
    fn test_parts_stay_in_plane_in_3d() {
        for part in rounded_square_parts::<D3>(Vec2::ONE, 0.5) {
            let transform = match part {
                ShapePart::Primitive { transform, .. } | ShapePart::Arc { transform, .. } => {
                    transform
                }
            };
            assert_eq!(transform.transform_point3(Vec3::ZERO).z, 0.0);
            assert_eq!(transform.transform_vector3(Vec3::Z), Vec3::Z);
        }
    }

    fn parts_of(parts: &[ShapePart<D3>], kind: Primitive) -> Vec<Mat4> {
        parts
            .iter()
            .filter_map(|part| match *part {
                ShapePart::Primitive {
                    transform,
                    primitive,
                } if primitive == kind => Some(transform),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_capsule_lies_along_x() {
        let parts = capsule_parts(3.0, 0.5);
        assert_eq!(parts.len(), 3);

        let body = parts_of(&parts, Primitive::CYLINDER)[0];
        assert!(body
            .transform_vector3(Vec3::Y)
            .abs_diff_eq(Vec3::new(3.0, 0.0, 0.0), 1.0e-5));
        assert!((body.transform_vector3(Vec3::X).length() - 0.5).abs() < 1.0e-5);

        let caps: Vec<Vec3> = parts_of(&parts, Primitive::SPHERE)
            .iter()
            .map(|t| t.transform_point3(Vec3::ZERO))
            .collect();
        assert_eq!(caps, vec![Vec3::new(-1.5, 0.0, 0.0), Vec3::new(1.5, 0.0, 0.0)]);
    }

    #[test]
    fn test_rounded_cube_pieces() {
        let dimensions = Vec3::new(2.0, 1.0, 4.0);
        let parts = rounded_cube_parts(dimensions, 0.25);
        assert_eq!(parts.len(), 1 + 6 + 8 + 12);

        let slabs = parts_of(&parts, Primitive::CUBE);
        assert_eq!(slabs.len(), 7);
        assert!(slabs[1]
            .transform_point3(Vec3::ZERO)
            .abs_diff_eq(Vec3::new(1.125, 0.0, 0.0), 1.0e-6));
        assert!(slabs[6]
            .transform_point3(Vec3::ZERO)
            .abs_diff_eq(Vec3::new(0.0, 0.0, -2.125), 1.0e-6));

        for corner in parts_of(&parts, Primitive::SPHERE) {
            let center = corner.transform_point3(Vec3::ZERO);
            assert!(center.abs().abs_diff_eq(Vec3::new(1.0, 0.5, 2.0), 1.0e-6));
        }

        let edges = parts_of(&parts, Primitive::CYLINDER);
        assert_eq!(edges.len(), 12);
        for (axis, group) in edges.chunks(4).enumerate() {
            for edge in group {
                let mut along = Vec3::ZERO;
                along[axis] = dimensions[axis];
                assert!(
                    edge.transform_vector3(Vec3::Y).abs().abs_diff_eq(along, 1.0e-5),
                    "edge {axis}: {edge:?}"
                );
            }
        }
    }

    #[test]
    fn test_compound_flags() {
        assert_eq!(
            compound_flags(true, false),
            Some((DrawFlags::NO_STENCIL_WRITE_DO_FILL, None))
        );
        assert_eq!(
            compound_flags(false, true),
            Some((
                DrawFlags::DO_STENCIL_WRITE_NO_FILL,
                Some(DrawFlags::DO_STENCIL_TEST_NO_FILL)
            ))
        );
        assert_eq!(compound_flags(false, false), None);
    }
}
