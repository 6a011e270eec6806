//! Renderer configuration.

use crate::color::{self, Color};
use crate::error::{OnyxError, Result};

/// Growth policy of every per-frame GPU buffer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BufferGrowth {
    /// Capacity, in instances, of freshly created buffers.
    pub initial_capacity: usize,
    /// Factor applied to the required instance count when a buffer must grow.
    pub growth_factor: f32,
}

impl Default for BufferGrowth {
    fn default() -> Self {
        Self {
            initial_capacity: 4,
            growth_factor: 1.5,
        }
    }
}

impl BufferGrowth {
    /// Returns the capacity a buffer must be reallocated to, or `None` if `current` already
    /// holds `required` instances.
    ///
    /// The new capacity is `ceil(growth_factor * required)` and never less than `required`.
    pub fn grow_capacity(&self, current: usize, required: usize) -> Option<usize> {
        if required <= current {
            return None;
        }

        let grown = (self.growth_factor as f64 * required as f64).ceil() as usize;
        Some(grown.max(required))
    }
}

/// Parameters shared by the rendering context, the renderers and the frame scheduler.
#[derive(Clone, Debug)]
pub struct RendererConfig {
    /// Number of frames the CPU may record ahead of the GPU.
    pub frames_in_flight: u32,
    /// Storage buffer growth policy.
    pub buffer_growth: BufferGrowth,
    /// Maximum number of directional lights per frame.
    pub max_directional_lights: usize,
    /// Maximum number of point lights per frame.
    pub max_point_lights: usize,
    /// Largest side count of the built-in regular polygons.
    pub max_regular_polygon_sides: u32,
    /// Present mode requested for the swapchain.
    pub present_mode: wgpu::PresentMode,
    /// Render pass clear color.
    pub background: Color,
    /// Record uploads on a dedicated transfer encoder and track queue ownership transfers.
    pub separate_transfer: bool,
    /// Present on a background worker instead of the recording thread.
    pub async_present: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            frames_in_flight: 2,
            buffer_growth: BufferGrowth::default(),
            max_directional_lights: 8,
            max_point_lights: 64,
            max_regular_polygon_sides: 8,
            present_mode: wgpu::PresentMode::Fifo,
            background: color::DARK_GRAY,
            separate_transfer: false,
            async_present: cfg!(not(target_arch = "wasm32")),
        }
    }
}

impl RendererConfig {
    /// Sets the number of frames in flight.
    pub fn with_frames_in_flight(mut self, frames: u32) -> Self {
        self.frames_in_flight = frames;
        self
    }

    /// Sets the buffer growth policy.
    pub fn with_buffer_growth(mut self, initial_capacity: usize, growth_factor: f32) -> Self {
        self.buffer_growth = BufferGrowth {
            initial_capacity,
            growth_factor,
        };
        self
    }

    /// Sets the light capacities.
    pub fn with_max_lights(mut self, directional: usize, point: usize) -> Self {
        self.max_directional_lights = directional;
        self.max_point_lights = point;
        self
    }

    /// Sets the initial present mode.
    pub fn with_present_mode(mut self, mode: wgpu::PresentMode) -> Self {
        self.present_mode = mode;
        self
    }

    /// Sets the clear color.
    pub fn with_background(mut self, background: Color) -> Self {
        self.background = background;
        self
    }

    /// Enables the dedicated transfer path.
    pub fn with_separate_transfer(mut self, separate: bool) -> Self {
        self.separate_transfer = separate;
        self
    }

    /// Enables or disables the background present worker.
    pub fn with_async_present(mut self, enabled: bool) -> Self {
        self.async_present = enabled;
        self
    }

    /// Checks that the configuration can be used to build a renderer.
    pub fn validate(&self) -> Result<()> {
        if !(1..=3).contains(&self.frames_in_flight) {
            return Err(OnyxError::InvalidConfig("frames_in_flight must be 1, 2 or 3"));
        }
        if self.buffer_growth.initial_capacity == 0 {
            return Err(OnyxError::InvalidConfig("initial buffer capacity must be positive"));
        }
        if self.buffer_growth.growth_factor.is_nan() || self.buffer_growth.growth_factor <= 1.0 {
            return Err(OnyxError::InvalidConfig("growth factor must be greater than 1"));
        }
        if self.max_regular_polygon_sides < 3 {
            return Err(OnyxError::InvalidConfig(
                "regular polygons need at least 3 sides",
            ));
        }
        Ok(())
    }
}
