//! Per-pass device storage shared by every shape kind.

use crate::context::RenderingContext;
use crate::error::Result;
use crate::renderer::batch::DrawCommand;
use crate::renderer::stencil::{per_pass, StencilPass};
use crate::resource::{BarrierBatch, DeviceInstanceData};
use bytemuck::Pod;

/// Instance storage of the four passes of a shape kind, plus the draw commands computed when
/// the frame's instances were sent to the device.
pub struct PassBuffers<T: Pod> {
    device: [DeviceInstanceData<T>; 4],
    commands: [Vec<DrawCommand>; 4],
}

impl<T: Pod> PassBuffers<T> {
    pub fn new(ctx: &RenderingContext, label: &str) -> Result<Self> {
        let device = per_pass(|pass| {
            DeviceInstanceData::new(ctx, &format!("{label}_{}", pass.label()))
        })?;

        Ok(Self {
            device,
            commands: Default::default(),
        })
    }

    /// Ensures the frame slot of `pass` holds `required` instances.
    pub fn grow(
        &mut self,
        ctx: &RenderingContext,
        frame_index: usize,
        pass: StencilPass,
        required: usize,
    ) -> Result<()> {
        self.device[pass.index()].grow(ctx, frame_index, required)?;
        Ok(())
    }

    /// Writes the instances of `pass` and keeps the commands that draw them.
    pub fn upload(
        &mut self,
        ctx: &RenderingContext,
        frame_index: usize,
        pass: StencilPass,
        instances: &[T],
        commands: Vec<DrawCommand>,
        barriers: &mut BarrierBatch,
    ) {
        self.device[pass.index()].upload(ctx, frame_index, instances, barriers);
        self.commands[pass.index()] = commands;
    }

    /// Whether `pass` has anything to draw this frame.
    pub fn has_draws(&self, pass: StencilPass) -> bool {
        !self.commands[pass.index()].is_empty()
    }

    /// Binds the instance storage of `pass` and records its draws.
    ///
    /// The pipeline and the geometry must already be bound.
    pub fn record(
        &self,
        pass: StencilPass,
        frame_index: usize,
        render_pass: &mut wgpu::RenderPass<'_>,
    ) {
        render_pass.set_bind_group(1, self.device[pass.index()].bind_group(frame_index), &[]);
        for command in &self.commands[pass.index()] {
            command.record(render_pass);
        }
    }

    /// Drops the cached commands.
    pub fn clear(&mut self) {
        self.commands.iter_mut().for_each(Vec::clear);
    }
}
