//! The per-dimension renderer and the cameras it draws with.

use crate::color::{self, Color};
use crate::context::RenderingContext;
use crate::dimension::{Dimension, D3};
use crate::draw::ShapePart;
use crate::error::Result;
use crate::light::{DeviceLightData, DirectionalLight, HostLightData, PointLight};
use crate::renderer::circle_renderer::CircleRenderer;
use crate::renderer::instance::CircleOptions;
use crate::renderer::mesh_renderer::{MeshRenderer, PrimitiveRenderer};
use crate::renderer::polygon_renderer::PolygonRenderer;
use crate::renderer::queue::ShapeQueue;
use crate::renderer::stencil::{DrawFlags, RenderState, StencilPass, STENCIL_REFERENCE};
use crate::resource::{
    BarrierBatch, DynamicUniformBuffer, Mesh, MeshRegistry, PipelineStages, Primitive, Primitives,
};
use bytemuck::{Pod, Zeroable};
use glamx::{Mat3, Mat4, Vec3, Vec4};

/// Device half of a shape kind. The host half lives in the [`ShapeQueue`].
///
/// Every frame goes through `grow_device_buffers`, `send_to_device`, one `render` per pass
/// and camera, then `flush`.
pub trait ShapeRenderer<D: Dimension> {
    /// Grows the frame slot's buffers so they hold the instances of `queue`.
    fn grow_device_buffers(
        &mut self,
        ctx: &RenderingContext,
        frame_index: usize,
        queue: &ShapeQueue<D>,
    ) -> Result<()>;

    /// Writes the instances of `queue` into the frame slot and records what the transfer
    /// touched.
    ///
    /// Static geometry copies are recorded on `encoder`.
    fn send_to_device(
        &mut self,
        ctx: &RenderingContext,
        frame_index: usize,
        queue: &ShapeQueue<D>,
        encoder: &mut wgpu::CommandEncoder,
        barriers: &mut BarrierBatch,
    ) -> Result<()>;

    /// Records the draws of `pass`. Frame constants (and lights in 3D) must be bound.
    fn render(
        &self,
        pass: StencilPass,
        frame_index: usize,
        render_pass: &mut wgpu::RenderPass<'_>,
    );

    /// Forgets the draws recorded for the frame.
    fn flush(&mut self);
}

/// Render target region of a camera, in pixels.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// The whole target.
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: width as f32,
            height: height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

/// Scissor rectangle of a camera, in pixels.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ScissorRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl ScissorRect {
    /// The whole target.
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }
}

/// Everything the renderer needs to know about a camera.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CameraInfo {
    pub projection_view: Mat4,
    /// Eye position, used by specular shading.
    pub view_position: Vec3,
    pub viewport: Viewport,
    pub scissor: ScissorRect,
}

impl CameraInfo {
    /// A camera covering the whole target.
    pub fn new(projection_view: Mat4, view_position: Vec3, width: u32, height: u32) -> Self {
        Self {
            projection_view,
            view_position,
            viewport: Viewport::full(width, height),
            scissor: ScissorRect::full(width, height),
        }
    }

    /// A 2D camera placed with `view`, showing two world units vertically.
    ///
    /// The horizontal extent follows the aspect ratio of the target.
    pub fn orthographic_2d(view: Mat3, width: u32, height: u32) -> Self {
        let position = view.z_axis.truncate().extend(0.0);
        Self::new(projection_view(view, width, height), position, width, height)
    }

    /// A right-handed perspective camera looking at `target`.
    pub fn perspective(eye: Vec3, target: Vec3, fov_y: f32, width: u32, height: u32) -> Self {
        let aspect = width.max(1) as f32 / height.max(1) as f32;
        let projection = Mat4::perspective_rh(fov_y, aspect, 0.1, 100.0);
        let view = Mat4::look_at_rh(eye, target, Vec3::Y);
        Self::new(projection * view, eye, width, height)
    }
}

/// Projection-view matrix of a 2D camera placed with `view`.
pub fn projection_view(view: Mat3, width: u32, height: u32) -> Mat4 {
    let aspect = height.max(1) as f32 / width.max(1) as f32;
    let inverse = view.inverse();
    let view = Mat4::from_cols(
        inverse.x_axis.extend(0.0),
        inverse.y_axis.extend(0.0),
        Vec4::Z,
        Vec4::new(inverse.z_axis.x, inverse.z_axis.y, 0.0, 1.0),
    );
    Mat4::from_scale(Vec3::new(aspect, 1.0, 1.0)) * view
}

/// Per-camera frame constants.
///
/// Layout must match `FrameConstants` in common2d.wgsl and common3d.wgsl.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct PushConstantData {
    pub projection_view: [[f32; 4]; 4],
    pub view_position: [f32; 4],
    /// rgb: color, a: intensity.
    pub ambient_color: [f32; 4],
    pub directional_light_count: u32,
    pub point_light_count: u32,
    pub _pad: [u32; 2],
}

impl PushConstantData {
    pub fn new(camera: &CameraInfo, ambient: Color, directional: usize, point: usize) -> Self {
        Self {
            projection_view: camera.projection_view.to_cols_array_2d(),
            view_position: camera.view_position.extend(1.0).to_array(),
            ambient_color: color::to_array(ambient),
            directional_light_count: directional as u32,
            point_light_count: point as u32,
            _pad: [0; 2],
        }
    }
}

struct LightSystem {
    host: HostLightData,
    device: DeviceLightData,
    ambient: Color,
}

/// Default ambient light: white at 40% intensity.
pub const DEFAULT_AMBIENT: Color = Color::new(1.0, 1.0, 1.0, 0.4);

/// Batches the shapes of one dimension and draws them with every camera of the frame.
///
/// Draw requests only touch host memory. [`Renderer::prepare`] moves the frame to the GPU,
/// [`Renderer::render`] records the draws and [`Renderer::flush`] starts the next frame.
pub struct Renderer<D: Dimension> {
    queue: ShapeQueue<D>,
    meshes: MeshRenderer<D>,
    primitives: PrimitiveRenderer<D>,
    polygons: PolygonRenderer<D>,
    circles: CircleRenderer<D>,
    lights: Option<LightSystem>,
    constants: DynamicUniformBuffer<PushConstantData>,
    constants_bind_group: wgpu::BindGroup,
    cameras: Vec<(CameraInfo, u32)>,
}

impl<D: Dimension> Renderer<D> {
    /// Builds the pipelines and the per-frame buffers of every shape kind.
    pub fn new(ctx: &RenderingContext) -> Result<Self> {
        log::info!("creating {} renderer", D::NAME);

        let lights = if D::LIT {
            let config = ctx.config();
            Some(LightSystem {
                host: HostLightData::new(config.max_directional_lights, config.max_point_lights),
                device: DeviceLightData::new(ctx)?,
                ambient: DEFAULT_AMBIENT,
            })
        } else {
            None
        };

        let constants = DynamicUniformBuffer::new(ctx, "onyx_frame_constants", 4)?;
        let constants_bind_group = Self::constants_bind_group(ctx, &constants);

        Ok(Self {
            queue: ShapeQueue::new(),
            meshes: MeshRenderer::new(ctx)?,
            primitives: PrimitiveRenderer::new(ctx)?,
            polygons: PolygonRenderer::new(ctx)?,
            circles: CircleRenderer::new(ctx)?,
            lights,
            constants,
            constants_bind_group,
            cameras: Vec::new(),
        })
    }

    fn constants_bind_group(
        ctx: &RenderingContext,
        constants: &DynamicUniformBuffer<PushConstantData>,
    ) -> wgpu::BindGroup {
        ctx.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("onyx_frame_constants"),
            layout: &ctx.layouts().frame_constants,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: constants.binding(),
            }],
        })
    }

    fn kinds(&self) -> [&dyn ShapeRenderer<D>; 4] {
        [&self.meshes, &self.primitives, &self.polygons, &self.circles]
    }

    fn kinds_mut(&mut self) -> [&mut dyn ShapeRenderer<D>; 4] {
        [
            &mut self.meshes,
            &mut self.primitives,
            &mut self.polygons,
            &mut self.circles,
        ]
    }

    /// Registers an indexed triangle list.
    pub fn register_mesh(&mut self, vertices: Vec<D::Vertex>, indices: Vec<u32>) -> Result<Mesh> {
        self.meshes.meshes_mut().register(vertices, indices)
    }

    /// The registered meshes.
    pub fn meshes(&self) -> &MeshRegistry<D> {
        self.meshes.meshes()
    }

    /// The built-in primitives.
    pub fn primitives(&self) -> &Primitives<D> {
        self.primitives.primitives()
    }

    /// Shapes queued this frame.
    pub fn queue(&self) -> &ShapeQueue<D> {
        &self.queue
    }

    /// Queues a registered mesh drawn with `transform` inside the state's frame.
    pub fn draw_mesh(
        &mut self,
        state: &RenderState<D>,
        transform: &D::Transform,
        mesh: Mesh,
        flags: DrawFlags,
    ) -> Result<()> {
        self.meshes.meshes().layout(mesh)?;
        self.queue.draw_mesh(state, transform, mesh, flags)
    }

    /// Queues a built-in primitive.
    pub fn draw_primitive(
        &mut self,
        state: &RenderState<D>,
        transform: &D::Transform,
        primitive: Primitive,
        flags: DrawFlags,
    ) -> Result<()> {
        self.primitives.primitives().layout(primitive)?;
        self.queue.draw_primitive(state, transform, primitive, flags)
    }

    /// Queues a convex polygon.
    pub fn draw_polygon(
        &mut self,
        state: &RenderState<D>,
        transform: &D::Transform,
        vertices: &[D::Vector],
        flags: DrawFlags,
    ) -> Result<()> {
        self.queue.draw_polygon(state, transform, vertices, flags)
    }

    /// Queues a circle or an arc.
    pub fn draw_circle_or_arc(
        &mut self,
        state: &RenderState<D>,
        transform: &D::Transform,
        options: &CircleOptions,
        flags: DrawFlags,
    ) -> Result<()> {
        self.queue
            .draw_circle_or_arc(state, transform, options, flags)
    }

    /// Queues the pieces of a compound shape after checking every primitive they use.
    pub fn draw_parts(
        &mut self,
        state: &RenderState<D>,
        parts: &[ShapePart<D>],
        flags: DrawFlags,
    ) -> Result<()> {
        for part in parts {
            if let ShapePart::Primitive { primitive, .. } = part {
                self.primitives.primitives().layout(*primitive)?;
            }
        }
        self.queue.draw_parts(state, parts, flags)
    }

    /// Number of instances queued this frame, over every kind and pass.
    pub fn instance_count(&self) -> usize {
        self.queue.len()
    }

    /// Uploads the frame: frame constants of every camera, instances, polygon geometry and
    /// lights.
    ///
    /// Must be called before the render pass of the frame is opened. Returns the stages the
    /// uploaded data must be visible to.
    pub fn prepare(
        &mut self,
        ctx: &RenderingContext,
        frame_index: usize,
        encoder: &mut wgpu::CommandEncoder,
        cameras: &[CameraInfo],
    ) -> Result<PipelineStages> {
        let (ambient, directional, point) = match &self.lights {
            Some(lights) => (
                lights.ambient,
                lights.host.directional().len(),
                lights.host.point().len(),
            ),
            None => (color::TRANSPARENT, 0, 0),
        };

        self.constants.clear();
        self.cameras.clear();
        for camera in cameras {
            let data = PushConstantData::new(camera, ambient, directional, point);
            let offset = self.constants.push(&data);
            self.cameras.push((*camera, offset));
        }
        if self.constants.flush(ctx)? {
            self.constants_bind_group = Self::constants_bind_group(ctx, &self.constants);
        }

        let mut barriers = BarrierBatch::new(ctx.config().separate_transfer);
        let queue = &self.queue;
        let mut kinds: [&mut dyn ShapeRenderer<D>; 4] = [
            &mut self.meshes,
            &mut self.primitives,
            &mut self.polygons,
            &mut self.circles,
        ];
        for kind in kinds.iter_mut() {
            kind.grow_device_buffers(ctx, frame_index, queue)?;
        }
        for kind in kinds.iter_mut() {
            kind.send_to_device(ctx, frame_index, queue, encoder, &mut barriers)?;
        }
        if let Some(lights) = &self.lights {
            lights
                .device
                .upload(ctx, frame_index, &lights.host, &mut barriers);
        }

        Ok(barriers.apply())
    }

    /// Records the frame once per camera passed to [`Renderer::prepare`].
    ///
    /// Fill passes of every kind go first so that outlines are tested against every silhouette
    /// of the frame.
    pub fn render(&self, render_pass: &mut wgpu::RenderPass<'_>, frame_index: usize) {
        for (camera, offset) in &self.cameras {
            let viewport = camera.viewport;
            render_pass.set_viewport(
                viewport.x,
                viewport.y,
                viewport.width,
                viewport.height,
                viewport.min_depth,
                viewport.max_depth,
            );
            let scissor = camera.scissor;
            render_pass.set_scissor_rect(scissor.x, scissor.y, scissor.width, scissor.height);
            render_pass.set_stencil_reference(STENCIL_REFERENCE);
            render_pass.set_bind_group(0, &self.constants_bind_group, &[*offset]);
            if let Some(lights) = &self.lights {
                render_pass.set_bind_group(2, lights.device.bind_group(frame_index), &[]);
            }

            for pass in StencilPass::FILL.into_iter().chain(StencilPass::OUTLINE) {
                for kind in self.kinds() {
                    kind.render(pass, frame_index, render_pass);
                }
            }
        }
    }

    /// Drops every instance and light of the frame. Calling it twice is harmless.
    pub fn flush(&mut self) {
        self.queue.clear();
        for kind in self.kinds_mut() {
            kind.flush();
        }
        if let Some(lights) = &mut self.lights {
            lights.host.clear();
        }
        self.cameras.clear();
    }
}

impl Renderer<D3> {
    /// Adds a directional light to the frame.
    pub fn add_directional_light(&mut self, light: DirectionalLight) -> Result<()> {
        match &mut self.lights {
            Some(lights) => lights.host.add_directional(light),
            None => Ok(()),
        }
    }

    /// Adds a point light to the frame.
    pub fn add_point_light(&mut self, light: PointLight) -> Result<()> {
        match &mut self.lights {
            Some(lights) => lights.host.add_point(light),
            None => Ok(()),
        }
    }

    /// Sets the ambient light; alpha is its intensity.
    pub fn set_ambient_color(&mut self, ambient: Color) {
        if let Some(lights) = &mut self.lights {
            lights.ambient = ambient;
        }
    }

    /// The ambient light.
    pub fn ambient_color(&self) -> Color {
        self.lights
            .as_ref()
            .map_or(DEFAULT_AMBIENT, |lights| lights.ambient)
    }
}
