//! Instanced renderers of keyed geometry: user meshes and built-in primitives.
//!
//! Both kinds draw geometry that lives in one combined vertex/index buffer pair. The queue
//! groups instances by key, so a frame costs one indexed draw per key and pass.

use crate::context::RenderingContext;
use crate::dimension::Dimension;
use crate::error::Result;
use crate::renderer::pass_data::PassBuffers;
use crate::renderer::pipeline::PipelineSet;
use crate::renderer::queue::ShapeQueue;
use crate::renderer::renderer::ShapeRenderer;
use crate::renderer::stencil::StencilPass;
use crate::resource::{BarrierBatch, MeshRegistry, Primitives};

/// Draws instances of the meshes registered in its [`MeshRegistry`].
pub struct MeshRenderer<D: Dimension> {
    label: String,
    pipelines: PipelineSet,
    meshes: MeshRegistry<D>,
    buffers: PassBuffers<D::Instance>,
}

impl<D: Dimension> MeshRenderer<D> {
    pub fn new(ctx: &RenderingContext) -> Result<Self> {
        let label = format!("onyx_mesh_{}", D::NAME);
        let pipelines =
            PipelineSet::new::<D>(ctx, &label, &D::mesh_shader(), Some(D::vertex_layout()))?;
        let buffers = PassBuffers::new(ctx, &label)?;

        Ok(Self {
            label,
            pipelines,
            meshes: MeshRegistry::new(),
            buffers,
        })
    }

    /// The registered meshes.
    pub fn meshes(&self) -> &MeshRegistry<D> {
        &self.meshes
    }

    /// The registry new meshes are added to.
    pub fn meshes_mut(&mut self) -> &mut MeshRegistry<D> {
        &mut self.meshes
    }
}

impl<D: Dimension> ShapeRenderer<D> for MeshRenderer<D> {
    fn grow_device_buffers(
        &mut self,
        ctx: &RenderingContext,
        frame_index: usize,
        queue: &ShapeQueue<D>,
    ) -> Result<()> {
        for pass in StencilPass::ALL {
            let required = queue.meshes().instances(pass).len();
            self.buffers.grow(ctx, frame_index, pass, required)?;
        }
        Ok(())
    }

    fn send_to_device(
        &mut self,
        ctx: &RenderingContext,
        frame_index: usize,
        queue: &ShapeQueue<D>,
        encoder: &mut wgpu::CommandEncoder,
        barriers: &mut BarrierBatch,
    ) -> Result<()> {
        self.meshes
            .geometry_mut()
            .upload(ctx, encoder, &self.label, barriers)?;

        let meshes = &self.meshes;
        let batch = queue.meshes();
        for pass in StencilPass::ALL {
            let instances = batch.instances(pass).contiguous();
            let commands = batch.draw_commands(pass, |mesh| meshes.layout(mesh).ok());
            self.buffers
                .upload(ctx, frame_index, pass, &instances, commands, barriers);
        }
        Ok(())
    }

    fn render(
        &self,
        pass: StencilPass,
        frame_index: usize,
        render_pass: &mut wgpu::RenderPass<'_>,
    ) {
        if !self.buffers.has_draws(pass) {
            return;
        }

        render_pass.set_pipeline(self.pipelines.get(pass));
        if self.meshes.geometry().bind(render_pass) {
            self.buffers.record(pass, frame_index, render_pass);
        }
    }

    fn flush(&mut self) {
        self.buffers.clear();
    }
}

/// Draws instances of the built-in primitives.
pub struct PrimitiveRenderer<D: Dimension> {
    pipelines: PipelineSet,
    primitives: Primitives<D>,
    buffers: PassBuffers<D::Instance>,
}

impl<D: Dimension> PrimitiveRenderer<D> {
    pub fn new(ctx: &RenderingContext) -> Result<Self> {
        let label = format!("onyx_primitive_{}", D::NAME);
        let pipelines =
            PipelineSet::new::<D>(ctx, &label, &D::mesh_shader(), Some(D::vertex_layout()))?;

        Ok(Self {
            pipelines,
            primitives: Primitives::new(ctx)?,
            buffers: PassBuffers::new(ctx, &label)?,
        })
    }

    /// The built-in primitives.
    pub fn primitives(&self) -> &Primitives<D> {
        &self.primitives
    }
}

impl<D: Dimension> ShapeRenderer<D> for PrimitiveRenderer<D> {
    fn grow_device_buffers(
        &mut self,
        ctx: &RenderingContext,
        frame_index: usize,
        queue: &ShapeQueue<D>,
    ) -> Result<()> {
        for pass in StencilPass::ALL {
            let required = queue.primitives().instances(pass).len();
            self.buffers.grow(ctx, frame_index, pass, required)?;
        }
        Ok(())
    }

    fn send_to_device(
        &mut self,
        ctx: &RenderingContext,
        frame_index: usize,
        queue: &ShapeQueue<D>,
        _encoder: &mut wgpu::CommandEncoder,
        barriers: &mut BarrierBatch,
    ) -> Result<()> {
        let primitives = &self.primitives;
        let batch = queue.primitives();
        for pass in StencilPass::ALL {
            let instances = batch.instances(pass).contiguous();
            let commands =
                batch.draw_commands(pass, |primitive| primitives.layout(primitive).ok());
            self.buffers
                .upload(ctx, frame_index, pass, &instances, commands, barriers);
        }
        Ok(())
    }

    fn render(
        &self,
        pass: StencilPass,
        frame_index: usize,
        render_pass: &mut wgpu::RenderPass<'_>,
    ) {
        if !self.buffers.has_draws(pass) {
            return;
        }

        render_pass.set_pipeline(self.pipelines.get(pass));
        if self.primitives.geometry().bind(render_pass) {
            self.buffers.record(pass, frame_index, render_pass);
        }
    }

    fn flush(&mut self) {
        self.buffers.clear();
    }
}
