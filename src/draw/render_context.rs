//! Immediate-mode drawing on top of a [`Renderer`].

use crate::color::Color;
use crate::context::RenderingContext;
use crate::dimension::{Dimension, D2, D3};
use crate::draw::shapes::{
    capsule_parts, compound_flags, rounded_cube_parts, rounded_square_parts, stadium_parts,
    ShapePart,
};
use crate::draw::state::StateStack;
use crate::error::{OnyxError, Result};
use crate::frame::Frame;
use crate::light::{DirectionalLight, PointLight};
use crate::renderer::instance::{CircleOptions, Material};
use crate::renderer::{CameraInfo, DrawFlags, RenderState, Renderer};
use crate::resource::{Mesh, PipelineStages, Primitive};
use glamx::{Mat4, Vec2, Vec3};

/// Draws shapes with a stack of render states.
///
/// Transforms compose in the local frame: `translate` followed by `rotate` rotates the shape
/// around the translated origin. The axes are a second transform applied outside the first
/// one; they survive [`RenderContext::set_transform`] and also place the lights.
///
/// ```ignore
/// let mut draw = RenderContext::<D2>::new(&ctx)?;
/// draw.fill(color::RED);
/// draw.push();
/// draw.translate(Vec2::new(0.5, 0.0));
/// draw.outline(color::WHITE);
/// draw.circle()?;
/// draw.pop();
/// draw.square()?;
/// ```
pub struct RenderContext<D: Dimension> {
    renderer: Renderer<D>,
    states: StateStack<D>,
}

impl<D: Dimension> RenderContext<D> {
    pub fn new(ctx: &RenderingContext) -> Result<Self> {
        Ok(Self {
            renderer: Renderer::new(ctx)?,
            states: StateStack::new(),
        })
    }

    pub fn renderer(&self) -> &Renderer<D> {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut Renderer<D> {
        &mut self.renderer
    }

    /// The state the next shape is drawn with.
    pub fn state(&self) -> &RenderState<D> {
        self.states.current()
    }

    pub fn state_mut(&mut self) -> &mut RenderState<D> {
        self.states.current_mut()
    }

    /// Saves the current state.
    pub fn push(&mut self) {
        self.states.push();
    }

    /// Restores the last saved state. Unmatched pops are ignored.
    pub fn pop(&mut self) {
        self.states.pop();
    }

    /// Applies `transform` in the current local frame.
    pub fn transform(&mut self, transform: D::Transform) {
        self.states.transform(transform);
    }

    pub fn translate(&mut self, translation: D::Vector) {
        self.states.translate(translation);
    }

    pub fn scale(&mut self, scale: D::Vector) {
        self.states.scale(scale);
    }

    pub fn rotate(&mut self, rotation: D::Rotation) {
        self.states.rotate(rotation);
    }

    /// Replaces the current transform, keeping the axes.
    pub fn set_transform(&mut self, transform: D::Transform) {
        self.states.set_transform(transform);
    }

    /// Applies `axes` to the current coordinate system.
    pub fn transform_axes(&mut self, axes: D::Transform) {
        self.states.transform_axes(axes);
    }

    pub fn translate_axes(&mut self, translation: D::Vector) {
        self.states.translate_axes(translation);
    }

    pub fn scale_axes(&mut self, scale: D::Vector) {
        self.states.scale_axes(scale);
    }

    pub fn rotate_axes(&mut self, rotation: D::Rotation) {
        self.states.rotate_axes(rotation);
    }

    /// Enables fill with `color`.
    pub fn fill(&mut self, color: Color) {
        let state = self.states.current_mut();
        state.fill = true;
        state.fill_color = color;
    }

    pub fn no_fill(&mut self) {
        self.states.current_mut().fill = false;
    }

    /// Opacity of the fill color.
    pub fn alpha(&mut self, alpha: f32) {
        self.states.current_mut().fill_color.a = alpha;
    }

    /// Enables outlines with `color`.
    pub fn outline(&mut self, color: Color) {
        let state = self.states.current_mut();
        state.outline = true;
        state.outline_color = color;
    }

    pub fn outline_width(&mut self, width: f32) {
        self.states.current_mut().outline_width = width;
    }

    pub fn no_outline(&mut self) {
        self.states.current_mut().outline = false;
    }

    fn primitive(&mut self, primitive: Primitive) -> Result<()> {
        let state = *self.states.current();
        self.renderer
            .draw_primitive(&state, &D::identity(), primitive, DrawFlags::AUTO)
    }

    /// Unit triangle.
    pub fn triangle(&mut self) -> Result<()> {
        self.primitive(Primitive::TRIANGLE)
    }

    /// Unit square centered at the origin.
    pub fn square(&mut self) -> Result<()> {
        self.primitive(Primitive::SQUARE)
    }

    /// Regular polygon of diameter 1.
    pub fn ngon(&mut self, sides: u32) -> Result<()> {
        let primitive = self.renderer.primitives().ngon(sides)?;
        self.primitive(primitive)
    }

    /// Convex polygon given by its vertices in order.
    pub fn polygon(&mut self, vertices: &[D::Vector]) -> Result<()> {
        let state = *self.states.current();
        self.renderer
            .draw_polygon(&state, &D::identity(), vertices, DrawFlags::AUTO)
    }

    /// Disk of diameter 1.
    pub fn circle(&mut self) -> Result<()> {
        self.circle_with(&CircleOptions::default())
    }

    /// Arc of the unit disk between two angles in radians.
    pub fn arc(&mut self, lower_angle: f32, upper_angle: f32) -> Result<()> {
        self.circle_with(&CircleOptions::arc(lower_angle, upper_angle))
    }

    pub fn circle_with(&mut self, options: &CircleOptions) -> Result<()> {
        let state = *self.states.current();
        self.renderer
            .draw_circle_or_arc(&state, &D::identity(), options, DrawFlags::AUTO)
    }

    /// A registered mesh.
    pub fn mesh(&mut self, mesh: Mesh) -> Result<()> {
        let state = *self.states.current();
        self.renderer
            .draw_mesh(&state, &D::identity(), mesh, DrawFlags::AUTO)
    }

    /// Registers an indexed triangle list for later [`RenderContext::mesh`] calls.
    pub fn register_mesh(&mut self, vertices: Vec<D::Vertex>, indices: Vec<u32>) -> Result<Mesh> {
        self.renderer.register_mesh(vertices, indices)
    }

    /// A segment of the given thickness, drawn as a stretched square.
    pub fn line(&mut self, start: D::Vector, end: D::Vector, thickness: f32) -> Result<()> {
        let state = *self.states.current();
        let transform = D::line_transform(start, end, thickness);
        self.renderer
            .draw_primitive(&state, &transform, Primitive::SQUARE, DrawFlags::AUTO)
    }

    /// Consecutive segments through `points`.
    pub fn line_strip(&mut self, points: &[D::Vector], thickness: f32) -> Result<()> {
        check_line_strip(points.len())?;
        for segment in points.windows(2) {
            self.line(segment[0], segment[1], thickness)?;
        }
        Ok(())
    }

    /// A `length` long rectangle capped by half disks of `radius`, along X.
    pub fn stadium(&mut self, length: f32, radius: f32) -> Result<()> {
        let outline_width = self.states.current().outline_width;
        self.compound(
            &D::identity(),
            stadium_parts(length, 2.0 * radius),
            || stadium_parts(length, 2.0 * radius + outline_width),
        )
    }

    /// A `dimensions` rectangle grown by `radius` with rounded corners.
    pub fn rounded_square(&mut self, dimensions: Vec2, radius: f32) -> Result<()> {
        let outline_width = self.states.current().outline_width;
        self.compound(&D::identity(), rounded_square_parts(dimensions, radius), || {
            rounded_square_parts(dimensions, radius + 0.5 * outline_width)
        })
    }

    /// Draws the pieces of a compound shape placed in `frame`.
    ///
    /// The outline copy is built lazily, only when the state has outlines enabled.
    fn compound(
        &mut self,
        frame: &D::Transform,
        fill_parts: Vec<ShapePart<D>>,
        outline_parts: impl FnOnce() -> Vec<ShapePart<D>>,
    ) -> Result<()> {
        let state = *self.states.current();
        state.validate()?;
        let Some((fill_flags, outline_flags)) = compound_flags(state.fill, state.outline) else {
            return Ok(());
        };

        let fill_parts = placed(frame, &fill_parts);
        self.renderer.draw_parts(&state, &fill_parts, fill_flags)?;
        if let Some(flags) = outline_flags {
            let outline_parts = placed(frame, &outline_parts());
            self.renderer.draw_parts(&state, &outline_parts, flags)?;
        }
        Ok(())
    }

    /// Uploads the frame. See [`Renderer::prepare`].
    pub fn prepare(
        &mut self,
        ctx: &RenderingContext,
        frame: &mut Frame,
        cameras: &[CameraInfo],
    ) -> Result<PipelineStages> {
        let index = frame.index();
        self.renderer
            .prepare(ctx, index, frame.upload_encoder(), cameras)
    }

    /// Records the frame into an open render pass.
    pub fn render(&self, render_pass: &mut wgpu::RenderPass<'_>, frame_index: usize) {
        self.renderer.render(render_pass, frame_index);
    }

    /// Ends the frame: drops the queued shapes and resets the state stack.
    pub fn flush(&mut self) {
        self.states.reset();
        self.renderer.flush();
    }
}

fn placed<D: Dimension>(frame: &D::Transform, parts: &[ShapePart<D>]) -> Vec<ShapePart<D>> {
    parts.iter().map(|part| part.placed(frame)).collect()
}

fn check_line_strip(points: usize) -> Result<()> {
    if points < 2 {
        return Err(OnyxError::InvalidLineStrip { points });
    }
    Ok(())
}

impl RenderContext<D2> {
    /// A segment with round caps. `thickness` is the diameter of the caps.
    pub fn rounded_line(&mut self, start: Vec2, end: Vec2, thickness: f32) -> Result<()> {
        let outline_width = self.states.current().outline_width;
        let (frame, length) = D2::segment_frame(start, end);
        self.compound(&frame, stadium_parts(length, thickness), || {
            stadium_parts(length, thickness + outline_width)
        })
    }
}

impl RenderContext<D3> {
    /// Surface response of the next lit fills.
    pub fn material(&mut self, material: Material) {
        self.states.current_mut().material = material;
    }

    /// Weight of the diffuse term.
    pub fn diffuse_contribution(&mut self, contribution: f32) {
        self.states.current_mut().material.diffuse = contribution;
    }

    /// Weight of the specular term.
    pub fn specular_contribution(&mut self, contribution: f32) {
        self.states.current_mut().material.specular = contribution;
    }

    /// Specular exponent. Higher values give smaller highlights.
    pub fn specular_sharpness(&mut self, sharpness: f32) {
        self.states.current_mut().material.sharpness = sharpness;
    }

    /// Unit cube centered at the origin.
    pub fn cube(&mut self) -> Result<()> {
        self.primitive(Primitive::CUBE)
    }

    /// Sphere of diameter 1.
    pub fn sphere(&mut self) -> Result<()> {
        self.primitive(Primitive::SPHERE)
    }

    /// Cylinder of diameter and height 1 along Y.
    pub fn cylinder(&mut self) -> Result<()> {
        self.primitive(Primitive::CYLINDER)
    }

    /// A cylinder of `length` along X capped by spheres of `radius`.
    pub fn capsule(&mut self, length: f32, radius: f32) -> Result<()> {
        let outline_width = self.states.current().outline_width;
        self.compound(&Mat4::IDENTITY, capsule_parts(length, 2.0 * radius), || {
            capsule_parts(length, 2.0 * radius + outline_width)
        })
    }

    /// A `dimensions` box grown by `radius` with rounded edges and corners.
    pub fn rounded_cube(&mut self, dimensions: Vec3, radius: f32) -> Result<()> {
        let outline_width = self.states.current().outline_width;
        self.compound(&Mat4::IDENTITY, rounded_cube_parts(dimensions, radius), || {
            rounded_cube_parts(dimensions, radius + 0.5 * outline_width)
        })
    }

    /// A segment drawn as a capsule. `thickness` is the diameter of the capsule.
    pub fn rounded_line(&mut self, start: Vec3, end: Vec3, thickness: f32) -> Result<()> {
        let outline_width = self.states.current().outline_width;
        let (frame, length) = D3::segment_frame(start, end);
        self.compound(&frame, capsule_parts(length, thickness), || {
            capsule_parts(length, thickness + outline_width)
        })
    }

    /// Color of the lights added from now on.
    pub fn light_color(&mut self, color: Color) {
        self.states.current_mut().light_color = color;
    }

    /// Adds a directional light with the current light color.
    ///
    /// The direction goes through the axes and the transform.
    pub fn directional_light(&mut self, direction: Vec3, intensity: f32) -> Result<()> {
        let light = directional_light_in(self.states.current(), direction, intensity);
        self.renderer.add_directional_light(light)
    }

    /// Adds a point light at `position` in the current frame, with the current light color.
    pub fn point_light(&mut self, position: Vec3, intensity: f32, radius: f32) -> Result<()> {
        let light = point_light_in(self.states.current(), position, intensity, radius);
        self.renderer.add_point_light(light)
    }

    /// Ambient light; alpha is its intensity.
    pub fn ambient(&mut self, color: Color) {
        self.renderer.set_ambient_color(color);
    }

    /// Intensity of the ambient light, keeping its color.
    pub fn ambient_intensity(&mut self, intensity: f32) {
        let mut ambient = self.renderer.ambient_color();
        ambient.a = intensity;
        self.renderer.set_ambient_color(ambient);
    }
}

fn directional_light_in(
    state: &RenderState<D3>,
    direction: Vec3,
    intensity: f32,
) -> DirectionalLight {
    let frame = state.axes * state.transform;
    DirectionalLight {
        direction: frame.transform_vector3(direction).normalize_or(Vec3::NEG_Y),
        intensity,
        color: state.light_color,
    }
}

fn point_light_in(
    state: &RenderState<D3>,
    position: Vec3,
    intensity: f32,
    radius: f32,
) -> PointLight {
    let frame = state.axes * state.transform;
    PointLight {
        position: frame.transform_point3(position),
        intensity,
        radius,
        color: state.light_color,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color;
    use glamx::Quat;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_lights_follow_axes_and_transform() {
        let mut stack = StateStack::<D3>::new();
        stack.translate_axes(Vec3::new(0.0, 5.0, 0.0));
        stack.rotate_axes(Quat::from_rotation_z(FRAC_PI_2));
        stack.translate(Vec3::new(1.0, 0.0, 0.0));
        stack.current_mut().light_color = color::RED;

        let light = point_light_in(stack.current(), Vec3::ZERO, 2.0, 3.0);
        assert!(light.position.abs_diff_eq(Vec3::new(0.0, 6.0, 0.0), 1.0e-5));
        assert_eq!(light.color, color::RED);
        assert_eq!((light.intensity, light.radius), (2.0, 3.0));

        let light = directional_light_in(stack.current(), Vec3::new(2.0, 0.0, 0.0), 0.5);
        assert!(light.direction.abs_diff_eq(Vec3::Y, 1.0e-5));
        assert_eq!(light.color, color::RED);
    }

    #[test]
    fn test_degenerate_light_direction_points_down() {
        let light = directional_light_in(&RenderState::default(), Vec3::ZERO, 1.0);
        assert_eq!(light.direction, Vec3::NEG_Y);
        assert_eq!(light.color, color::WHITE);
    }

    #[test]
    fn test_line_strip_needs_two_points() {
        assert!(matches!(
            check_line_strip(1),
            Err(OnyxError::InvalidLineStrip { points: 1 })
        ));
        assert!(check_line_strip(2).is_ok());
    }

    #[test]
    fn test_rounded_line_caps_sit_on_the_endpoints() {
        let (frame, length) = D2::segment_frame(Vec2::new(1.0, 1.0), Vec2::new(1.0, 5.0));
        let parts = placed(&frame, &stadium_parts::<D2>(length, 0.5));
        let centers: Vec<Vec2> = parts[1..]
            .iter()
            .map(|part| match part {
                ShapePart::Arc { transform, .. } => transform.transform_point2(Vec2::ZERO),
                ShapePart::Primitive { .. } => unreachable!("stadium caps are arcs"),
            })
            .collect();
        assert!(centers[0].abs_diff_eq(Vec2::new(1.0, 1.0), 1.0e-5));
        assert!(centers[1].abs_diff_eq(Vec2::new(1.0, 5.0), 1.0e-5));

        let (frame, length) = D3::segment_frame(Vec3::ZERO, Vec3::new(0.0, 0.0, 4.0));
        let parts = placed(&frame, &capsule_parts(length, 0.5));
        let ShapePart::Primitive { transform, .. } = parts[2] else {
            unreachable!("capsule caps are spheres");
        };
        assert!(transform
            .transform_point3(Vec3::ZERO)
            .abs_diff_eq(Vec3::new(0.0, 0.0, 4.0), 1.0e-5));
    }
}
