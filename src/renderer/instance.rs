//! GPU instance records.
//!
//! Every record is uploaded verbatim into a storage buffer and indexed with
//! `@builtin(instance_index)` in the shaders, so the layouts below must match the WGSL
//! structs byte for byte (std430 rules).

use bytemuck::{Pod, Zeroable};
use std::f32::consts::{PI, TAU};

/// Value of the union word of fill instances: no texture or material override.
pub const NO_TEXTURE: u32 = u32::MAX;

/// Instance record of 2D meshes, primitives and polygons.
///
/// Layout must match `InstanceData` in mesh2d.wgsl and circle2d.wgsl.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct InstanceData2d {
    /// Columns of the 2D affine transform; the third one is the translation.
    pub basis: [[f32; 2]; 3],
    /// Packed RGBA8 color.
    pub color: u32,
    /// Texture index for fill passes, outline width bits for outline passes.
    pub extra: u32,
}

/// Instance record of 3D meshes, primitives and polygons.
///
/// Layout must match `InstanceData` in mesh3d.wgsl and circle3d.wgsl.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct InstanceData3d {
    /// First three rows of the 3D affine transform; the fourth column is the translation.
    pub basis: [[f32; 4]; 3],
    /// Packed RGBA8 color.
    pub color: u32,
    /// Texture index for fill passes, outline width bits for outline passes.
    pub extra: u32,
    /// Diffuse contribution of the lit path.
    pub diffuse: f32,
    /// Specular contribution of the lit path.
    pub specular: f32,
    /// Specular exponent of the lit path.
    pub sharpness: f32,
    pub _pad: [u32; 3],
}

/// Arc parameters shared by the 2D and 3D circle records.
///
/// Angles are stored as cosine/sine pairs so the fragment shader only evaluates two
/// half-plane tests.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ArcData {
    pub lower_cos: f32,
    pub lower_sin: f32,
    pub upper_cos: f32,
    pub upper_sin: f32,
    /// 1 when the arc spans more than π; the half-plane tests are then OR-ed.
    pub angle_overflow: u32,
    pub hollowness: f32,
    pub inner_fade: f32,
    pub outer_fade: f32,
}

/// Instance record of 2D circles and arcs.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct CircleInstanceData2d {
    pub base: InstanceData2d,
    pub arc: ArcData,
}

/// Instance record of 3D circles and arcs.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct CircleInstanceData3d {
    pub base: InstanceData3d,
    pub arc: ArcData,
}

/// Interpretation of the 32-bit union word of an instance record.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum InstanceExtra {
    /// Fill passes: texture or material index, [`NO_TEXTURE`] when unused.
    TextureIndex(u32),
    /// Outline passes: outline width.
    OutlineWidth(f32),
}

impl InstanceExtra {
    /// Raw bits stored in the record.
    pub fn to_bits(self) -> u32 {
        match self {
            InstanceExtra::TextureIndex(index) => index,
            InstanceExtra::OutlineWidth(width) => width.to_bits(),
        }
    }
}

/// Surface response of 3D fills under the lit pipelines.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Material {
    pub diffuse: f32,
    pub specular: f32,
    pub sharpness: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            diffuse: 0.8,
            specular: 0.2,
            sharpness: 32.0,
        }
    }
}

/// Shape parameters of a circle or arc.
///
/// The unit circle has diameter 1 and is centered at the origin of its transform.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CircleOptions {
    /// Start angle in radians, counterclockwise from +X.
    pub lower_angle: f32,
    /// End angle in radians.
    pub upper_angle: f32,
    /// Inner radius as a fraction of the outer radius; 0 is a disk, close to 1 a thin ring.
    pub hollowness: f32,
    /// Width of the inner alpha ramp, as a fraction of the radius.
    pub inner_fade: f32,
    /// Width of the outer alpha ramp, as a fraction of the radius.
    pub outer_fade: f32,
}

impl Default for CircleOptions {
    fn default() -> Self {
        Self {
            lower_angle: 0.0,
            upper_angle: TAU,
            hollowness: 0.0,
            inner_fade: 0.0,
            outer_fade: 0.0,
        }
    }
}

impl CircleOptions {
    /// An arc between two angles.
    pub fn arc(lower_angle: f32, upper_angle: f32) -> Self {
        Self {
            lower_angle,
            upper_angle,
            ..Default::default()
        }
    }

    /// Sets the hollowness.
    pub fn with_hollowness(mut self, hollowness: f32) -> Self {
        self.hollowness = hollowness;
        self
    }

    /// Sets both fades.
    pub fn with_fades(mut self, inner_fade: f32, outer_fade: f32) -> Self {
        self.inner_fade = inner_fade;
        self.outer_fade = outer_fade;
        self
    }

    /// The same shape without fades, used for outline silhouettes.
    pub fn without_fades(self) -> Self {
        Self {
            inner_fade: 0.0,
            outer_fade: 0.0,
            ..self
        }
    }

    /// GPU arc parameters.
    pub fn arc_data(&self) -> ArcData {
        let (lower_sin, lower_cos) = self.lower_angle.sin_cos();
        let (upper_sin, upper_cos) = self.upper_angle.sin_cos();
        ArcData {
            lower_cos,
            lower_sin,
            upper_cos,
            upper_sin,
            angle_overflow: ((self.upper_angle - self.lower_angle).abs() > PI) as u32,
            hollowness: self.hollowness,
            inner_fade: self.inner_fade,
            outer_fade: self.outer_fade,
        }
    }
}
