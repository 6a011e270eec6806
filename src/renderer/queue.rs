//! The shapes queued during a frame.
//!
//! A [`ShapeQueue`] resolves every draw request into its stencil passes and stamps one instance
//! record per pass. It owns no GPU resource; the device renderers read its batches when the
//! frame is prepared.

use crate::dimension::Dimension;
use crate::draw::ShapePart;
use crate::error::Result;
use crate::renderer::batch::{CircleBatch, MeshBatch, PolygonBatch, PrimitiveBatch};
use crate::renderer::instance::CircleOptions;
use crate::renderer::stencil::{resolve_passes, DrawFlags, RenderState};
use crate::resource::{Mesh, Primitive};

/// Host batches of the four shape kinds.
#[derive(Clone, Debug)]
pub struct ShapeQueue<D: Dimension> {
    meshes: MeshBatch<D>,
    primitives: PrimitiveBatch<D>,
    polygons: PolygonBatch<D>,
    circles: CircleBatch<D>,
}

impl<D: Dimension> Default for ShapeQueue<D> {
    fn default() -> Self {
        Self {
            meshes: MeshBatch::<D>::new(),
            primitives: PrimitiveBatch::<D>::new(),
            polygons: PolygonBatch::new(),
            circles: CircleBatch::new(),
        }
    }
}

impl<D: Dimension> ShapeQueue<D> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `mesh` drawn with `transform` inside the state's frame.
    ///
    /// The handle is not checked here; unknown meshes produce no draw command.
    pub fn draw_mesh(
        &mut self,
        state: &RenderState<D>,
        transform: &D::Transform,
        mesh: Mesh,
        flags: DrawFlags,
    ) -> Result<()> {
        state.validate()?;
        let world = state.world(transform);
        for submission in resolve_passes(flags, state.fill, state.outline).iter() {
            self.meshes
                .push(submission.pass, mesh, state.stamp(&world, submission));
        }
        Ok(())
    }

    /// Queues a built-in primitive. Like meshes, the handle is checked by the caller.
    pub fn draw_primitive(
        &mut self,
        state: &RenderState<D>,
        transform: &D::Transform,
        primitive: Primitive,
        flags: DrawFlags,
    ) -> Result<()> {
        state.validate()?;
        let world = state.world(transform);
        for submission in resolve_passes(flags, state.fill, state.outline).iter() {
            self.primitives
                .push(submission.pass, primitive, state.stamp(&world, submission));
        }
        Ok(())
    }

    /// Queues a convex polygon. Its geometry is appended once and shared by its passes.
    pub fn draw_polygon(
        &mut self,
        state: &RenderState<D>,
        transform: &D::Transform,
        vertices: &[D::Vector],
        flags: DrawFlags,
    ) -> Result<()> {
        state.validate()?;
        let plan = resolve_passes(flags, state.fill, state.outline);
        if plan.is_empty() {
            return Ok(());
        }

        let layout = self.polygons.push_geometry(vertices)?;
        let world = state.world(transform);
        for submission in plan.iter() {
            self.polygons
                .push(submission.pass, layout, state.stamp(&world, submission));
        }
        Ok(())
    }

    /// Queues a circle or an arc. Outline passes ignore the fades.
    pub fn draw_circle_or_arc(
        &mut self,
        state: &RenderState<D>,
        transform: &D::Transform,
        options: &CircleOptions,
        flags: DrawFlags,
    ) -> Result<()> {
        state.validate()?;
        let world = state.world(transform);
        for submission in resolve_passes(flags, state.fill, state.outline).iter() {
            let arc = if submission.pass.is_fill() {
                options.arc_data()
            } else {
                options.without_fades().arc_data()
            };
            let instance = D::circle_instance(state.stamp(&world, submission), arc);
            self.circles.push(submission.pass, instance);
        }
        Ok(())
    }

    /// Queues the pieces of a compound shape with the same flags.
    pub fn draw_parts(
        &mut self,
        state: &RenderState<D>,
        parts: &[ShapePart<D>],
        flags: DrawFlags,
    ) -> Result<()> {
        for part in parts {
            match part {
                ShapePart::Primitive {
                    transform,
                    primitive,
                } => self.draw_primitive(state, transform, *primitive, flags)?,
                ShapePart::Arc {
                    transform,
                    lower_angle,
                    upper_angle,
                } => self.draw_circle_or_arc(
                    state,
                    transform,
                    &CircleOptions::arc(*lower_angle, *upper_angle),
                    flags,
                )?,
            }
        }
        Ok(())
    }

    pub fn meshes(&self) -> &MeshBatch<D> {
        &self.meshes
    }

    pub fn primitives(&self) -> &PrimitiveBatch<D> {
        &self.primitives
    }

    pub fn polygons(&self) -> &PolygonBatch<D> {
        &self.polygons
    }

    pub fn circles(&self) -> &CircleBatch<D> {
        &self.circles
    }

    /// Number of queued instances, over every kind and pass.
    pub fn len(&self) -> usize {
        self.meshes.len() + self.primitives.len() + self.polygons.len() + self.circles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every queued shape.
    pub fn clear(&mut self) {
        self.meshes.clear();
        self.primitives.clear();
        self.polygons.clear();
        self.circles.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{self, pack_color};
    use crate::dimension::{D2, D3};
    use crate::draw::{compound_flags, stadium_parts, StateStack};
    use crate::renderer::batch::DrawCommand;
    use crate::renderer::stencil::StencilPass;
    use crate::resource::{MeshRegistry, Primitives, Vertex2d};
    use glamx::{Mat3, Vec2};

    fn outlined() -> RenderState<D2> {
        RenderState {
            fill_color: color::BLUE,
            outline_color: color::RED,
            outline: true,
            outline_width: 0.5,
            ..Default::default()
        }
    }

    #[test]
    fn test_triangles_batch_into_one_draw() {
        let primitives = Primitives::<D2>::build(8);
        let mut queue = ShapeQueue::<D2>::new();
        let state = RenderState::default();
        for x in 0..3 {
            let transform = Mat3::from_translation(Vec2::new(x as f32, 0.0));
            queue
                .draw_primitive(&state, &transform, Primitive::TRIANGLE, DrawFlags::AUTO)
                .unwrap();
        }

        let pass = StencilPass::NoStencilWriteDoFill;
        let commands = queue
            .primitives()
            .draw_commands(pass, |p| primitives.layout(p).ok());
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].instance_count(), 3);
        assert_eq!(queue.len(), 3);
        for other in [
            StencilPass::DoStencilWriteDoFill,
            StencilPass::DoStencilWriteNoFill,
            StencilPass::DoStencilTestNoFill,
        ] {
            assert!(queue.primitives().instances(other).is_empty());
        }
    }

    #[test]
    fn test_outlined_draw_fills_then_tests() {
        let mut queue = ShapeQueue::<D2>::new();
        let state = outlined();
        let triangle = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]
            .into_iter()
            .map(|position| Vertex2d { position })
            .collect();
        let mesh = MeshRegistry::<D2>::new()
            .register_vertices(triangle)
            .unwrap();
        queue
            .draw_mesh(&state, &Mat3::IDENTITY, mesh, DrawFlags::AUTO)
            .unwrap();

        let fill = queue
            .meshes()
            .instances(StencilPass::DoStencilWriteDoFill)
            .contiguous();
        let outline = queue
            .meshes()
            .instances(StencilPass::DoStencilTestNoFill)
            .contiguous();
        assert_eq!((fill.len(), outline.len()), (1, 1));
        assert_eq!(fill[0].color, pack_color(color::BLUE));
        assert_eq!(outline[0].color, pack_color(color::RED));
        assert_eq!(outline[0].basis[0], [1.5, 0.0]);
        assert!(queue
            .meshes()
            .instances(StencilPass::NoStencilWriteDoFill)
            .is_empty());

        let mut queue = ShapeQueue::<D2>::new();
        let state = RenderState {
            fill: false,
            ..outlined()
        };
        queue
            .draw_mesh(&state, &Mat3::IDENTITY, mesh, DrawFlags::AUTO)
            .unwrap();
        assert_eq!(
            queue
                .meshes()
                .instances(StencilPass::DoStencilWriteNoFill)
                .len(),
            1
        );
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_outline_circles_drop_fades() {
        let mut queue = ShapeQueue::<D3>::new();
        let state = RenderState::<D3> {
            outline: true,
            ..Default::default()
        };
        let options = CircleOptions::default().with_fades(0.2, 0.3);
        queue
            .draw_circle_or_arc(&state, &D3::identity(), &options, DrawFlags::AUTO)
            .unwrap();

        let fill = queue.circles().instances(StencilPass::DoStencilWriteDoFill);
        let outline = queue.circles().instances(StencilPass::DoStencilTestNoFill);
        assert_eq!(fill[0].arc.inner_fade, 0.2);
        assert_eq!(fill[0].arc.outer_fade, 0.3);
        assert_eq!(outline[0].arc.inner_fade, 0.0);
        assert_eq!(outline[0].arc.outer_fade, 0.0);
    }

    #[test]
    fn test_polygon_geometry_is_shared_by_its_passes() {
        let mut queue = ShapeQueue::<D2>::new();
        let square = [
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
        ];
        queue
            .draw_polygon(&outlined(), &Mat3::IDENTITY, &square, DrawFlags::AUTO)
            .unwrap();
        assert_eq!(queue.polygons().geometry().vertices.len(), 4);
        assert_eq!(queue.polygons().len(), 2);

        let hidden = RenderState {
            fill: false,
            outline: false,
            ..outlined()
        };
        queue
            .draw_polygon(&hidden, &Mat3::IDENTITY, &square, DrawFlags::AUTO)
            .unwrap();
        assert_eq!(queue.polygons().geometry().vertices.len(), 4);
    }

    #[test]
    fn test_state_stack_transforms_reach_instances() {
        let mut stack = StateStack::<D2>::new();
        stack.translate_axes(Vec2::new(0.0, 10.0));
        stack.translate(Vec2::new(3.0, 0.0));
        stack.push();
        stack.scale(Vec2::splat(2.0));

        let mut queue = ShapeQueue::<D2>::new();
        let local = Mat3::from_translation(Vec2::new(1.0, 0.0));
        queue
            .draw_primitive(stack.current(), &local, Primitive::SQUARE, DrawFlags::AUTO)
            .unwrap();
        stack.pop();
        queue
            .draw_primitive(stack.current(), &local, Primitive::SQUARE, DrawFlags::AUTO)
            .unwrap();

        let instances = queue
            .primitives()
            .instances(StencilPass::NoStencilWriteDoFill)
            .contiguous();
        assert_eq!(instances[0].basis, [[2.0, 0.0], [0.0, 2.0], [5.0, 10.0]]);
        assert_eq!(instances[1].basis, [[1.0, 0.0], [0.0, 1.0], [4.0, 10.0]]);
    }

    #[test]
    fn test_compound_outline_uses_explicit_passes() {
        let mut queue = ShapeQueue::<D2>::new();
        let state = outlined();
        let (fill_flags, outline_flags) = compound_flags(state.fill, state.outline).unwrap();
        queue
            .draw_parts(&state, &stadium_parts(2.0, 1.0), fill_flags)
            .unwrap();
        queue
            .draw_parts(&state, &stadium_parts(2.0, 1.5), outline_flags.unwrap())
            .unwrap();

        let test_pass = StencilPass::DoStencilTestNoFill;
        let outline_body = queue.primitives().instances(test_pass).contiguous();
        // Explicit passes do not rescale: the outline copy keeps the geometry it was given.
        assert_eq!(outline_body[0].basis[1], [0.0, 1.5]);
        assert_eq!(queue.circles().instances(test_pass).len(), 2);
        assert_eq!(
            queue
                .circles()
                .instances(StencilPass::DoStencilWriteDoFill)
                .len(),
            2
        );
        assert_eq!(
            queue.circles().draw_commands(test_pass),
            vec![DrawCommand::Vertices {
                vertices: 0..6,
                instances: 0..2
            }]
        );
    }

    #[test]
    fn test_clear_twice_leaves_nothing() {
        let mut queue = ShapeQueue::<D2>::new();
        queue
            .draw_circle_or_arc(
                &outlined(),
                &Mat3::IDENTITY,
                &CircleOptions::default(),
                DrawFlags::AUTO,
            )
            .unwrap();
        assert!(!queue.is_empty());
        for _ in 0..2 {
            queue.clear();
            assert!(queue.is_empty());
        }
    }

    #[test]
    fn test_negative_width_queues_nothing() {
        let mut queue = ShapeQueue::<D2>::new();
        let state = RenderState {
            outline_width: -0.1,
            ..outlined()
        };
        assert!(queue
            .draw_primitive(&state, &Mat3::IDENTITY, Primitive::SQUARE, DrawFlags::AUTO)
            .is_err());
        assert!(queue.is_empty());
    }
}
