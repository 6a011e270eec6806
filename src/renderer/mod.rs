//! Batched shape renderers.

pub use self::batch::{
    triangulate_fan, CircleBatch, DrawCommand, KeyedBatch, MeshBatch, PolygonBatch,
    PrimitiveBatch,
};
pub use self::circle_renderer::CircleRenderer;
pub use self::instance::{
    ArcData, CircleInstanceData2d, CircleInstanceData3d, CircleOptions, InstanceData2d,
    InstanceData3d, InstanceExtra, Material, NO_TEXTURE,
};
pub use self::mesh_renderer::{MeshRenderer, PrimitiveRenderer};
pub use self::pipeline::PipelineSet;
pub use self::polygon_renderer::PolygonRenderer;
pub use self::queue::ShapeQueue;
pub use self::renderer::{
    projection_view, CameraInfo, PushConstantData, Renderer, ScissorRect, ShapeRenderer,
    Viewport, DEFAULT_AMBIENT,
};
pub use self::stencil::{
    per_pass, resolve_passes, DrawFlags, PassPlan, PassSubmission, RenderState, StencilPass,
    STENCIL_REFERENCE,
};

mod batch;
mod circle_renderer;
pub mod instance;
mod mesh_renderer;
mod pass_data;
mod pipeline;
mod polygon_renderer;
mod queue;
mod renderer;
mod stencil;
