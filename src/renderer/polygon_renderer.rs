//! Convex polygons with geometry rebuilt every frame.

use crate::config::BufferGrowth;
use crate::context::RenderingContext;
use crate::dimension::Dimension;
use crate::error::Result;
use crate::renderer::pass_data::PassBuffers;
use crate::renderer::pipeline::PipelineSet;
use crate::renderer::queue::ShapeQueue;
use crate::renderer::renderer::ShapeRenderer;
use crate::renderer::stencil::StencilPass;
use crate::resource::{BarrierBatch, DeviceBuffer};

struct GeometrySlot<V: bytemuck::Pod> {
    vertices: DeviceBuffer<V>,
    indices: DeviceBuffer<u32>,
}

/// Draws user polygons. Their vertices and indices live in per-frame buffers that grow like
/// the instance buffers.
pub struct PolygonRenderer<D: Dimension> {
    pipelines: PipelineSet,
    buffers: PassBuffers<D::Instance>,
    geometry: Vec<GeometrySlot<D::Vertex>>,
    growth: BufferGrowth,
}

impl<D: Dimension> PolygonRenderer<D> {
    pub fn new(ctx: &RenderingContext) -> Result<Self> {
        let label = format!("onyx_polygon_{}", D::NAME);
        let growth = ctx.config().buffer_growth;
        let pipelines =
            PipelineSet::new::<D>(ctx, &label, &D::mesh_shader(), Some(D::vertex_layout()))?;

        let geometry = (0..ctx.frames_in_flight())
            .map(|frame| {
                Ok(GeometrySlot {
                    vertices: DeviceBuffer::new(
                        ctx,
                        &format!("{label}_vertices_{frame}"),
                        wgpu::BufferUsages::VERTEX,
                        growth.initial_capacity,
                    )?,
                    indices: DeviceBuffer::new(
                        ctx,
                        &format!("{label}_indices_{frame}"),
                        wgpu::BufferUsages::INDEX,
                        growth.initial_capacity,
                    )?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            pipelines,
            buffers: PassBuffers::new(ctx, &label)?,
            geometry,
            growth,
        })
    }
}

impl<D: Dimension> ShapeRenderer<D> for PolygonRenderer<D> {
    fn grow_device_buffers(
        &mut self,
        ctx: &RenderingContext,
        frame_index: usize,
        queue: &ShapeQueue<D>,
    ) -> Result<()> {
        let batch = queue.polygons();
        let geometry = batch.geometry();
        let slot = &mut self.geometry[frame_index];
        slot.vertices
            .grow_if_needed(ctx, &self.growth, geometry.vertices.len())?;
        slot.indices
            .grow_if_needed(ctx, &self.growth, geometry.indices.len())?;

        for pass in StencilPass::ALL {
            let required = batch.instances(pass).len();
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
        let batch = queue.polygons();
        let geometry = batch.geometry();
        if !geometry.vertices.is_empty() {
            let slot = &self.geometry[frame_index];
            slot.vertices.write(ctx, &geometry.vertices);
            slot.indices.write(ctx, &geometry.indices);
            barriers.vertex_write(
                slot.vertices.label(),
                std::mem::size_of_val(geometry.vertices.as_slice()) as u64,
            );
            barriers.vertex_write(
                slot.indices.label(),
                std::mem::size_of_val(geometry.indices.as_slice()) as u64,
            );
        }

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

        let slot = &self.geometry[frame_index];
        render_pass.set_pipeline(self.pipelines.get(pass));
        render_pass.set_vertex_buffer(0, slot.vertices.buffer().slice(..));
        render_pass.set_index_buffer(slot.indices.buffer().slice(..), wgpu::IndexFormat::Uint32);
        self.buffers.record(pass, frame_index, render_pass);
    }

    fn flush(&mut self) {
        self.buffers.clear();
    }
}
