//! The wgpu device, queue and the bind group layouts shared by every renderer.

pub use self::context::{RenderingContext, SharedLayouts};

mod context;
