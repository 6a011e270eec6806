//! Lights of the 3D renderer.
//!
//! Lights are immediate mode like every other draw call: they are added during the frame,
//! uploaded with it and forgotten by `flush`. The per-frame counts are fixed by
//! [`RendererConfig`](crate::config::RendererConfig) and adding past them is an error.

use crate::color::{self, pack_color, Color};
use crate::context::RenderingContext;
use crate::error::{OnyxError, Result};
use crate::resource::{BarrierBatch, DeviceBuffer};
use bytemuck::{Pod, Zeroable};
use glamx::Vec3;

/// A light with parallel rays, like the sun.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DirectionalLight {
    /// Direction the light travels in.
    pub direction: Vec3,
    pub intensity: f32,
    pub color: Color,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            direction: Vec3::new(-1.0, -1.0, -1.0).normalize(),
            intensity: 0.8,
            color: color::WHITE,
        }
    }
}

/// A light emitting equally in all directions from a point.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub intensity: f32,
    /// Distance at which the contribution of the light reaches zero.
    pub radius: f32,
    pub color: Color,
}

impl Default for PointLight {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            intensity: 0.8,
            radius: 1.0,
            color: color::WHITE,
        }
    }
}

/// GPU record of a directional light. Layout must match `DirectionalLight` in mesh3d.wgsl.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct DirectionalLightData {
    pub direction: [f32; 3],
    pub intensity: f32,
    pub color: u32,
    pub _pad: [u32; 3],
}

/// GPU record of a point light. Layout must match `PointLight` in mesh3d.wgsl.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct PointLightData {
    pub position: [f32; 3],
    pub intensity: f32,
    pub radius: f32,
    pub color: u32,
    pub _pad: [u32; 2],
}

impl From<DirectionalLight> for DirectionalLightData {
    fn from(light: DirectionalLight) -> Self {
        Self {
            direction: light.direction.normalize_or(Vec3::NEG_Y).to_array(),
            intensity: light.intensity,
            color: pack_color(light.color),
            _pad: [0; 3],
        }
    }
}

impl From<PointLight> for PointLightData {
    fn from(light: PointLight) -> Self {
        Self {
            position: light.position.to_array(),
            intensity: light.intensity,
            radius: light.radius,
            color: pack_color(light.color),
            _pad: [0; 2],
        }
    }
}

/// Lights added during the current frame.
#[derive(Clone, Debug)]
pub struct HostLightData {
    directional: Vec<DirectionalLightData>,
    point: Vec<PointLightData>,
    max_directional: usize,
    max_point: usize,
}

impl HostLightData {
    pub fn new(max_directional: usize, max_point: usize) -> Self {
        Self {
            directional: Vec::with_capacity(max_directional),
            point: Vec::with_capacity(max_point),
            max_directional,
            max_point,
        }
    }

    /// Adds a directional light, failing once the configured maximum is reached.
    pub fn add_directional(&mut self, light: DirectionalLight) -> Result<()> {
        if self.directional.len() >= self.max_directional {
            return Err(OnyxError::CapacityExceeded {
                what: "directional light",
                capacity: self.max_directional,
            });
        }
        self.directional.push(light.into());
        Ok(())
    }

    /// Adds a point light, failing once the configured maximum is reached.
    pub fn add_point(&mut self, light: PointLight) -> Result<()> {
        if self.point.len() >= self.max_point {
            return Err(OnyxError::CapacityExceeded {
                what: "point light",
                capacity: self.max_point,
            });
        }
        self.point.push(light.into());
        Ok(())
    }

    pub fn directional(&self) -> &[DirectionalLightData] {
        &self.directional
    }

    pub fn point(&self) -> &[PointLightData] {
        &self.point
    }

    pub fn clear(&mut self) {
        self.directional.clear();
        self.point.clear();
    }
}

struct LightSlot {
    directional: DeviceBuffer<DirectionalLightData>,
    point: DeviceBuffer<PointLightData>,
    bind_group: wgpu::BindGroup,
}

/// Light storage buffers, one pair per frame in flight.
///
/// The buffers are sized for the configured maxima and never grow.
pub struct DeviceLightData {
    slots: Vec<LightSlot>,
}

impl DeviceLightData {
    pub fn new(ctx: &RenderingContext) -> Result<Self> {
        let config = ctx.config();
        let slots = (0..ctx.frames_in_flight())
            .map(|frame| {
                let directional = DeviceBuffer::new(
                    ctx,
                    &format!("onyx_directional_lights_{frame}"),
                    wgpu::BufferUsages::STORAGE,
                    config.max_directional_lights.max(1),
                )?;
                let point = DeviceBuffer::new(
                    ctx,
                    &format!("onyx_point_lights_{frame}"),
                    wgpu::BufferUsages::STORAGE,
                    config.max_point_lights.max(1),
                )?;
                let bind_group = ctx.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("onyx_lights"),
                    layout: &ctx.layouts().lights,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: directional.buffer().as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: point.buffer().as_entire_binding(),
                        },
                    ],
                });
                Ok(LightSlot {
                    directional,
                    point,
                    bind_group,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { slots })
    }

    /// Uploads the lights of the frame.
    pub fn upload(
        &self,
        ctx: &RenderingContext,
        frame_index: usize,
        lights: &HostLightData,
        barriers: &mut BarrierBatch,
    ) {
        let slot = &self.slots[frame_index];
        if !lights.directional().is_empty() {
            slot.directional.write(ctx, lights.directional());
            barriers.storage_write(
                slot.directional.label(),
                std::mem::size_of_val(lights.directional()) as u64,
            );
        }
        if !lights.point().is_empty() {
            slot.point.write(ctx, lights.point());
            barriers.storage_write(
                slot.point.label(),
                std::mem::size_of_val(lights.point()) as u64,
            );
        }
    }

    pub fn bind_group(&self, frame_index: usize) -> &wgpu::BindGroup {
        &self.slots[frame_index].bind_group
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_light_layouts_match_shaders() {
        assert_eq!(std::mem::size_of::<DirectionalLightData>(), 32);
        assert_eq!(std::mem::size_of::<PointLightData>(), 32);
    }

    #[test]
    fn test_light_capacity_is_enforced() {
        let mut lights = HostLightData::new(1, 2);
        lights.add_directional(DirectionalLight::default()).unwrap();
        assert!(matches!(
            lights.add_directional(DirectionalLight::default()),
            Err(OnyxError::CapacityExceeded { capacity: 1, .. })
        ));

        lights.add_point(PointLight::default()).unwrap();
        lights.add_point(PointLight::default()).unwrap();
        assert!(lights.add_point(PointLight::default()).is_err());
        assert_eq!(lights.point().len(), 2);

        lights.clear();
        assert!(lights.directional().is_empty());
        lights.add_directional(DirectionalLight::default()).unwrap();
    }

    #[test]
    fn test_directional_light_is_normalized() {
        let data = DirectionalLightData::from(DirectionalLight {
            direction: Vec3::new(0.0, 0.0, -4.0),
            ..Default::default()
        });
        assert_eq!(data.direction, [0.0, 0.0, -1.0]);
        assert_eq!(data.color, u32::MAX);
    }
}
