//! Error types returned by the renderer.
//!
//! Creation failures (buffers, pipelines, the device itself) and API misuse that can be
//! detected at the call site are reported through [`OnyxError`]. A stale swapchain is not an
//! error: [`FrameScheduler::begin_frame`](crate::frame::FrameScheduler::begin_frame) reports it
//! as `Ok(None)` after recreating the surface.

use crate::resource::Mesh;
use thiserror::Error;

/// Errors that can occur while creating or driving the renderer.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum OnyxError {
    /// A GPU buffer or texture could not be allocated.
    #[error("failed to allocate '{label}' ({size} bytes): {message}")]
    Allocation {
        /// Debug label of the resource.
        label: String,
        /// Requested size in bytes.
        size: u64,
        /// Message reported by the device.
        message: String,
    },
    /// A shader module or render pipeline could not be created.
    #[error("failed to create pipeline '{label}': {message}")]
    PipelineCreation {
        /// Debug label of the pipeline.
        label: String,
        /// Message reported by the device.
        message: String,
    },
    /// Failed to create a surface for the target window.
    #[error("couldn't create wgpu surface")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    /// No adapter is compatible with the surface.
    #[error("couldn't find a compatible GPU adapter")]
    NoCompatibleAdapter,
    /// The adapter refused to create a device.
    #[error("couldn't create wgpu device")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    /// The surface exposes no usable color format.
    #[error("surface exposes no supported texture format")]
    UnsupportedSurfaceFormat,
    /// The surface ran out of memory while acquiring a frame.
    #[error("surface ran out of memory")]
    SurfaceOutOfMemory,
    /// Non-recoverable surface failure.
    #[error("surface error: {0}")]
    Surface(wgpu::SurfaceError),
    /// The background present thread could not be started.
    #[error("couldn't spawn the present worker")]
    PresentWorker(#[source] std::io::Error),
    /// A fixed-capacity list is full.
    #[error("{what} capacity exceeded (maximum {capacity})")]
    CapacityExceeded {
        /// What overflowed.
        what: &'static str,
        /// The configured maximum.
        capacity: usize,
    },
    /// A polygon needs at least three vertices.
    #[error("a polygon needs at least 3 vertices, got {vertices}")]
    InvalidPolygon {
        /// Number of vertices provided.
        vertices: usize,
    },
    /// A line strip needs at least two points.
    #[error("a line strip needs at least 2 points, got {points}")]
    InvalidLineStrip {
        /// Number of points provided.
        points: usize,
    },
    /// Mesh data that cannot be drawn as a triangle list.
    #[error("invalid mesh: {0}")]
    InvalidMesh(&'static str),
    /// The mesh handle does not belong to the registry.
    #[error("unknown mesh {0:?}")]
    UnknownMesh(Mesh),
    /// The primitive index is out of range.
    #[error("unknown primitive index {index}")]
    InvalidPrimitive {
        /// The offending index.
        index: u32,
    },
    /// Regular polygons support `3..=max` sides.
    #[error("regular polygons must have between 3 and {max} sides, got {sides}")]
    InvalidSides {
        /// Requested side count.
        sides: u32,
        /// Configured maximum.
        max: u32,
    },
    /// Outline widths must be non-negative.
    #[error("outline width must be non-negative, got {0}")]
    NegativeOutlineWidth(f32),
    /// The renderer configuration is inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

/// Result alias used throughout the crate.
pub type Result<T, E = OnyxError> = std::result::Result<T, E>;
