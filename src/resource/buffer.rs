//! Typed GPU buffers with geometric growth.

use crate::config::BufferGrowth;
use crate::context::RenderingContext;
use crate::error::Result;
use bytemuck::Pod;
use std::marker::PhantomData;
use std::mem;

fn byte_size<T>(capacity: usize) -> u64 {
    let size = (capacity.max(1) * mem::size_of::<T>()) as u64;
    size.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT)
}

/// A wgpu buffer holding up to `capacity` elements of `T`.
///
/// The buffer is never mapped by the renderer: host data reaches it through queue writes or,
/// for static geometry, through a staging copy recorded on the transfer encoder.
pub struct DeviceBuffer<T: Pod> {
    buffer: wgpu::Buffer,
    capacity: usize,
    usage: wgpu::BufferUsages,
    label: String,
    _marker: PhantomData<T>,
}

impl<T: Pod> DeviceBuffer<T> {
    /// Allocates an uninitialized buffer.
    ///
    /// # Arguments
    /// * `ctx` - The rendering context
    /// * `label` - Debug label, also used in log messages
    /// * `usage` - Buffer usage; `COPY_DST` is always added
    /// * `capacity` - Number of elements
    pub fn new(
        ctx: &RenderingContext,
        label: &str,
        usage: wgpu::BufferUsages,
        capacity: usize,
    ) -> Result<Self> {
        let usage = usage | wgpu::BufferUsages::COPY_DST;
        let buffer = ctx.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: byte_size::<T>(capacity),
            usage,
            mapped_at_creation: false,
        })?;

        Ok(Self {
            buffer,
            capacity,
            usage,
            label: label.to_string(),
            _marker: PhantomData,
        })
    }

    /// Allocates a device-local buffer filled with `data`.
    ///
    /// The data goes through a mapped staging buffer; the copy is recorded on `encoder`, so it
    /// becomes visible once that encoder is submitted.
    pub fn with_data(
        ctx: &RenderingContext,
        encoder: &mut wgpu::CommandEncoder,
        label: &str,
        usage: wgpu::BufferUsages,
        data: &[T],
    ) -> Result<Self> {
        let device_buffer = Self::new(ctx, label, usage, data.len())?;
        if data.is_empty() {
            return Ok(device_buffer);
        }

        let size = byte_size::<T>(data.len());
        let staging = ctx.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{label}_staging")),
            size,
            usage: wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: true,
        })?;

        let bytes: &[u8] = bytemuck::cast_slice(data);
        staging.slice(..).get_mapped_range_mut()[..bytes.len()].copy_from_slice(bytes);
        staging.unmap();

        encoder.copy_buffer_to_buffer(&staging, 0, &device_buffer.buffer, 0, size);
        Ok(device_buffer)
    }

    /// Reallocates the buffer if it cannot hold `required` elements.
    ///
    /// Returns `true` when the buffer was replaced; its previous content is lost and every bind
    /// group referencing it must be rebuilt.
    pub fn grow_if_needed(
        &mut self,
        ctx: &RenderingContext,
        growth: &BufferGrowth,
        required: usize,
    ) -> Result<bool> {
        let Some(capacity) = growth.grow_capacity(self.capacity, required) else {
            return Ok(false);
        };

        log::debug!(
            "growing '{}' from {} to {} instances ({} bytes)",
            self.label,
            self.capacity,
            capacity,
            byte_size::<T>(capacity)
        );

        let buffer = ctx.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&self.label),
            size: byte_size::<T>(capacity),
            usage: self.usage,
            mapped_at_creation: false,
        })?;

        let old = mem::replace(&mut self.buffer, buffer);
        old.destroy();
        self.capacity = capacity;
        Ok(true)
    }

    /// Writes `data` at the start of the buffer.
    pub fn write(&self, ctx: &RenderingContext, data: &[T]) {
        if data.is_empty() {
            return;
        }

        debug_assert!(
            data.len() <= self.capacity,
            "'{}' holds {} elements, {} written",
            self.label,
            self.capacity,
            data.len()
        );
        ctx.write_buffer(&self.buffer, 0, bytemuck::cast_slice(data));
    }

    /// The underlying wgpu buffer.
    #[inline]
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Number of elements the buffer can hold.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Size of the buffer in bytes.
    #[inline]
    pub fn size_bytes(&self) -> u64 {
        self.buffer.size()
    }

    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::instance::{InstanceData2d, InstanceData3d};

    #[test]
    fn test_byte_size_is_copy_aligned() {
        assert_eq!(byte_size::<u32>(3), 12);
        assert_eq!(byte_size::<u16>(3), 8);
        assert_eq!(byte_size::<InstanceData3d>(15), 15 * 80);
    }

    #[test]
    fn test_empty_buffers_are_not_zero_sized() {
        assert_eq!(byte_size::<InstanceData2d>(0), 32);
    }
}
