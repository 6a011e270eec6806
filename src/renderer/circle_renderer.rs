//! Circles and arcs, rasterized on a quad and cut in the fragment shader.

use crate::context::RenderingContext;
use crate::dimension::Dimension;
use crate::error::Result;
use crate::renderer::pass_data::PassBuffers;
use crate::renderer::pipeline::PipelineSet;
use crate::renderer::queue::ShapeQueue;
use crate::renderer::renderer::ShapeRenderer;
use crate::renderer::stencil::StencilPass;
use crate::resource::BarrierBatch;

/// Draws circles and arcs without any vertex buffer.
pub struct CircleRenderer<D: Dimension> {
    pipelines: PipelineSet,
    buffers: PassBuffers<D::CircleInstance>,
}

impl<D: Dimension> CircleRenderer<D> {
    pub fn new(ctx: &RenderingContext) -> Result<Self> {
        let label = format!("onyx_circle_{}", D::NAME);
        Ok(Self {
            pipelines: PipelineSet::new::<D>(ctx, &label, &D::circle_shader(), None)?,
            buffers: PassBuffers::new(ctx, &label)?,
        })
    }
}

impl<D: Dimension> ShapeRenderer<D> for CircleRenderer<D> {
    fn grow_device_buffers(
        &mut self,
        ctx: &RenderingContext,
        frame_index: usize,
        queue: &ShapeQueue<D>,
    ) -> Result<()> {
        for pass in StencilPass::ALL {
            let required = queue.circles().instances(pass).len();
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
        let batch = queue.circles();
        for pass in StencilPass::ALL {
            let commands = batch.draw_commands(pass);
            self.buffers.upload(
                ctx,
                frame_index,
                pass,
                batch.instances(pass),
                commands,
                barriers,
            );
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
        self.buffers.record(pass, frame_index, render_pass);
    }

    fn flush(&mut self) {
        self.buffers.clear();
    }
}
