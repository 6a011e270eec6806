//! Per-frame instance storage on the GPU.

use crate::config::BufferGrowth;
use crate::context::RenderingContext;
use crate::error::Result;
use crate::resource::buffer::DeviceBuffer;
use crate::resource::BarrierBatch;
use bytemuck::Pod;

struct FrameSlot<T: Pod> {
    buffer: DeviceBuffer<T>,
    bind_group: wgpu::BindGroup,
}

/// One instance storage buffer and its bind group per frame in flight.
///
/// A frame slot is only written while the GPU no longer reads it, so growing a slot never
/// disturbs the frames still in flight.
pub struct DeviceInstanceData<T: Pod> {
    slots: Vec<FrameSlot<T>>,
    growth: BufferGrowth,
}

impl<T: Pod> DeviceInstanceData<T> {
    /// Allocates every frame slot with the configured initial capacity.
    pub fn new(ctx: &RenderingContext, label: &str) -> Result<Self> {
        let growth = ctx.config().buffer_growth;
        let slots = (0..ctx.frames_in_flight())
            .map(|frame| {
                let buffer = DeviceBuffer::new(
                    ctx,
                    &format!("{label}_{frame}"),
                    wgpu::BufferUsages::STORAGE,
                    growth.initial_capacity,
                )?;
                let bind_group = Self::bind_group_for(ctx, &buffer);
                Ok(FrameSlot { buffer, bind_group })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { slots, growth })
    }

    fn bind_group_for(ctx: &RenderingContext, buffer: &DeviceBuffer<T>) -> wgpu::BindGroup {
        ctx.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(buffer.label()),
            layout: &ctx.layouts().instances,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.buffer().as_entire_binding(),
            }],
        })
    }

    /// Ensures the slot of `frame_index` holds `required` instances.
    ///
    /// Returns `true` when the slot was reallocated; its bind group is rebuilt.
    pub fn grow(
        &mut self,
        ctx: &RenderingContext,
        frame_index: usize,
        required: usize,
    ) -> Result<bool> {
        let slot = &mut self.slots[frame_index];
        if !slot.buffer.grow_if_needed(ctx, &self.growth, required)? {
            return Ok(false);
        }

        slot.bind_group = Self::bind_group_for(ctx, &slot.buffer);
        Ok(true)
    }

    /// Writes the instances of a frame and records the graphics-side acquire.
    pub fn upload(
        &self,
        ctx: &RenderingContext,
        frame_index: usize,
        instances: &[T],
        barriers: &mut BarrierBatch,
    ) {
        if instances.is_empty() {
            return;
        }

        let buffer = &self.slots[frame_index].buffer;
        buffer.write(ctx, instances);
        barriers.storage_write(
            buffer.label(),
            std::mem::size_of_val(instances) as u64,
        );
    }

    /// Bind group of the slot of `frame_index`.
    pub fn bind_group(&self, frame_index: usize) -> &wgpu::BindGroup {
        &self.slots[frame_index].bind_group
    }

    /// Capacity, in instances, of the slot of `frame_index`.
    pub fn capacity(&self, frame_index: usize) -> usize {
        self.slots[frame_index].buffer.capacity()
    }
}
