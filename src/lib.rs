/*!
# Onyx

Instanced 2D and 3D shape rendering with stencil outlines, on top of wgpu.

User code records shapes during the frame: meshes, built-in primitives, convex polygons and
circles or arcs, optionally outlined. Nothing touches the GPU while recording. Once per frame
the renderer uploads every instance into the storage buffers of the current frame slot and
issues **one draw call per (shape, stencil pass) pair**, however many instances were drawn.

## Features

* 2D and 3D share one code path, parameterized by [`dimension::D2`] and [`dimension::D3`].
* Outlines of constant width through a four-pass stencil technique.
* Frames in flight with per-slot buffers that grow on demand.
* Directional and point lights with Blinn-Phong shading in 3D.
* Swapchain recreation on resize, and presentation on a background thread on native targets.

Drawing a red disk with a white outline next to a blue square:

```no_run
use onyx::prelude::*;

fn draw(draw: &mut RenderContext<D2>) -> onyx::error::Result<()> {
    draw.push();
    draw.translate(Vec2::new(-0.5, 0.0));
    draw.fill(RED);
    draw.outline(WHITE);
    draw.circle()?;
    draw.pop();

    draw.translate(Vec2::new(0.5, 0.0));
    draw.fill(BLUE);
    draw.square()
}
```

A frame then goes through [`frame::FrameScheduler::begin_frame`], [`draw::RenderContext::prepare`],
[`draw::RenderContext::render`] inside the frame's render pass, [`frame::FrameScheduler::end_frame`]
and finally [`draw::RenderContext::flush`].
*/
#![allow(clippy::module_inception)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]

#[macro_use]
extern crate bitflags;

pub use glamx;

#[cfg(not(target_arch = "wasm32"))]
#[doc(hidden)]
pub use pollster;

pub mod color;
pub mod config;
pub mod context;
pub mod dimension;
pub mod draw;
pub mod error;
pub mod frame;
pub mod light;
pub mod logging;
pub mod renderer;
pub mod resource;

pub mod prelude {
    pub use crate::color::*;
    pub use crate::config::*;
    pub use crate::context::*;
    pub use crate::dimension::{Dimension, D2, D3};
    pub use crate::draw::RenderContext;
    pub use crate::error::{OnyxError, Result};
    pub use crate::frame::*;
    pub use crate::light::{DirectionalLight, PointLight};
    pub use crate::logging::*;
    pub use crate::renderer::instance::{CircleOptions, Material};
    pub use crate::renderer::{CameraInfo, DrawFlags, RenderState, Renderer};
    pub use crate::resource::{Mesh, Primitive};
    pub use glamx::{Mat3, Mat4, Quat, Vec2, Vec3, Vec4};
}
