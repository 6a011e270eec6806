//! Dynamic uniform buffer for batched GPU writes.
//!
//! Entries are accumulated in CPU memory, each aligned to the device's minimum uniform
//! offset alignment, and flushed with a single `write_buffer` call. Render passes select an
//! entry with a dynamic offset.

use crate::context::RenderingContext;
use crate::error::Result;
use bytemuck::Pod;
use std::mem;

/// A dynamic uniform buffer that batches writes.
///
/// # Usage
///
/// ```ignore
/// let mut buffer = DynamicUniformBuffer::<MyUniforms>::new(&ctx, "my_uniforms", 4)?;
///
/// // In render loop:
/// buffer.clear();
/// for camera in cameras {
///     offsets.push(buffer.push(&camera.uniforms));
/// }
/// if buffer.flush(&ctx)? {
///     // recreate bind groups
/// }
/// ```
pub struct DynamicUniformBuffer<T: Pod> {
    /// CPU-side data accumulator
    data: Vec<u8>,
    buffer: wgpu::Buffer,
    /// Current capacity in bytes
    capacity: u64,
    /// Size of each entry, padded to the offset alignment
    aligned_size: u64,
    count: usize,
    label: &'static str,
    _marker: std::marker::PhantomData<T>,
}

impl<T: Pod> DynamicUniformBuffer<T> {
    /// Creates a dynamic uniform buffer.
    ///
    /// # Arguments
    /// * `ctx` - The rendering context
    /// * `label` - Debug label for the GPU buffer
    /// * `initial_capacity` - Initial number of entries to allocate space for
    pub fn new(
        ctx: &RenderingContext,
        label: &'static str,
        initial_capacity: usize,
    ) -> Result<Self> {
        let alignment = ctx.device.limits().min_uniform_buffer_offset_alignment as u64;
        let aligned_size = aligned_entry_size(mem::size_of::<T>() as u64, alignment);
        let capacity = aligned_size * initial_capacity.max(1) as u64;

        let buffer = ctx.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: capacity,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })?;

        Ok(Self {
            data: Vec::with_capacity(capacity as usize),
            buffer,
            capacity,
            aligned_size,
            count: 0,
            label,
            _marker: std::marker::PhantomData,
        })
    }

    /// Returns the aligned size of each entry.
    #[inline]
    pub fn aligned_size(&self) -> u64 {
        self.aligned_size
    }

    /// Returns the number of entries currently in the buffer.
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns true if the buffer contains no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Clears the entries without releasing memory.
    pub fn clear(&mut self) {
        self.data.clear();
        self.count = 0;
    }

    /// Pushes an entry and returns its dynamic offset.
    ///
    /// `flush()` must be called after all pushes and before rendering.
    pub fn push(&mut self, value: &T) -> u32 {
        let offset = (self.count as u64 * self.aligned_size) as u32;

        let bytes = bytemuck::bytes_of(value);
        self.data.extend_from_slice(bytes);
        let padding = self.aligned_size as usize - bytes.len();
        self.data.extend(std::iter::repeat_n(0u8, padding));

        self.count += 1;
        offset
    }

    /// Uploads the accumulated entries.
    ///
    /// Returns `true` if the buffer was reallocated, in which case bind groups referencing it
    /// must be recreated.
    pub fn flush(&mut self, ctx: &RenderingContext) -> Result<bool> {
        if self.data.is_empty() {
            return Ok(false);
        }

        let required_size = self.data.len() as u64;
        let reallocated = if required_size > self.capacity {
            self.grow(ctx, required_size)?;
            true
        } else {
            false
        };

        ctx.write_buffer(&self.buffer, 0, &self.data);
        Ok(reallocated)
    }

    fn grow(&mut self, ctx: &RenderingContext, required_size: u64) -> Result<()> {
        let mut new_capacity = self.capacity;
        while new_capacity < required_size {
            new_capacity *= 2;
        }

        log::debug!(
            "growing '{}' from {} to {} bytes",
            self.label,
            self.capacity,
            new_capacity
        );

        self.buffer = ctx.create_buffer(&wgpu::BufferDescriptor {
            label: Some(self.label),
            size: new_capacity,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })?;
        self.capacity = new_capacity;
        Ok(())
    }

    /// Binding resource covering a single entry, to be combined with a dynamic offset.
    pub fn binding(&self) -> wgpu::BindingResource<'_> {
        wgpu::BindingResource::Buffer(wgpu::BufferBinding {
            buffer: &self.buffer,
            offset: 0,
            size: wgpu::BufferSize::new(mem::size_of::<T>() as u64),
        })
    }

    /// Returns a reference to the underlying GPU buffer.
    #[inline]
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Returns the current capacity of the buffer in bytes.
    #[inline]
    pub fn capacity(&self) -> u64 {
        self.capacity
    }
}

fn aligned_entry_size(size: u64, alignment: u64) -> u64 {
    size.div_ceil(alignment) * alignment
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_are_padded_to_alignment() {
        assert_eq!(aligned_entry_size(96, 256), 256);
        assert_eq!(aligned_entry_size(256, 256), 256);
        assert_eq!(aligned_entry_size(300, 256), 512);
    }
}
