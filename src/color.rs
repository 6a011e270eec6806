//! Colors and their packed GPU representation.
//!
//! Instance records store colors as a single `u32` with the red channel in the lowest byte,
//! which is the layout WGSL's `unpack4x8unorm` expects.

pub use rgb::Rgba;

/// The color type used throughout onyx. RGBA with f32 components in [0.0, 1.0].
pub type Color = Rgba<f32>;

/// Opaque black.
pub const BLACK: Color = Color::new(0.0, 0.0, 0.0, 1.0);
/// Opaque white.
pub const WHITE: Color = Color::new(1.0, 1.0, 1.0, 1.0);
/// Opaque red.
pub const RED: Color = Color::new(1.0, 0.0, 0.0, 1.0);
/// Opaque green.
pub const GREEN: Color = Color::new(0.0, 1.0, 0.0, 1.0);
/// Opaque blue.
pub const BLUE: Color = Color::new(0.0, 0.0, 1.0, 1.0);
/// Opaque yellow.
pub const YELLOW: Color = Color::new(1.0, 1.0, 0.0, 1.0);
/// Opaque orange.
pub const ORANGE: Color = Color::new(1.0, 0.64705884, 0.0, 1.0);
/// Fully transparent black.
pub const TRANSPARENT: Color = Color::new(0.0, 0.0, 0.0, 0.0);
/// Dark gray used as the default background.
pub const DARK_GRAY: Color = Color::new(0.1, 0.1, 0.1, 1.0);

fn to_byte(c: f32) -> u32 {
    (c.clamp(0.0, 1.0) * 255.0).round() as u32
}

/// Packs a color into `r | g << 8 | b << 16 | a << 24`.
pub fn pack_color(color: Color) -> u32 {
    to_byte(color.r) | to_byte(color.g) << 8 | to_byte(color.b) << 16 | to_byte(color.a) << 24
}

/// Inverse of [`pack_color`], up to 8-bit quantization.
pub fn unpack_color(packed: u32) -> Color {
    let channel = |shift: u32| ((packed >> shift) & 0xFF) as f32 / 255.0;
    Color::new(channel(0), channel(8), channel(16), channel(24))
}

/// Converts a color to the `[f32; 4]` layout used by uniform blocks.
pub fn to_array(color: Color) -> [f32; 4] {
    [color.r, color.g, color.b, color.a]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_color_channel_order() {
        assert_eq!(pack_color(RED), 0xFF00_00FF);
        assert_eq!(pack_color(GREEN), 0xFF00_FF00);
        assert_eq!(pack_color(BLUE), 0xFFFF_0000);
        assert_eq!(pack_color(TRANSPARENT), 0);
    }

    #[test]
    fn test_pack_color_clamps() {
        let c = Color::new(2.0, -1.0, 0.5, 1.0);
        let unpacked = unpack_color(pack_color(c));
        assert_eq!(unpacked.r, 1.0);
        assert_eq!(unpacked.g, 0.0);
        assert!((unpacked.b - 0.5).abs() < 1.0 / 255.0);
    }
}
