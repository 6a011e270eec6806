//! Swapchain ownership and the per-frame command encoders.

use crate::color::Color;
use crate::context::RenderingContext;
use crate::error::{OnyxError, Result};
#[cfg(not(target_arch = "wasm32"))]
use crate::frame::present::{PendingPresent, PresentWorker};
use winit::dpi::PhysicalSize;

/// Index of the frame slot following `index`.
pub fn next_frame_index(index: usize, frames_in_flight: usize) -> usize {
    (index + 1) % frames_in_flight.max(1)
}

/// Surface changes requested since the last swapchain recreation.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PendingSurfaceChanges {
    size: Option<PhysicalSize<u32>>,
    present_mode: Option<wgpu::PresentMode>,
    recreate: bool,
}

impl PendingSurfaceChanges {
    /// Requests a new size. A zero-sized surface cannot be configured, so it is ignored.
    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        if size.width > 0 && size.height > 0 {
            self.size = Some(size);
        }
    }

    pub fn set_present_mode(&mut self, mode: wgpu::PresentMode) {
        self.present_mode = Some(mode);
    }

    /// Requests a recreation with the current parameters.
    pub fn invalidate(&mut self) {
        self.recreate = true;
    }

    /// Whether the swapchain must be recreated before the next acquire.
    pub fn is_pending(&self) -> bool {
        self.recreate || self.size.is_some() || self.present_mode.is_some()
    }

    /// Applies the pending changes to `config`. Returns whether the swapchain must be
    /// recreated.
    pub fn apply(&mut self, config: &mut wgpu::SurfaceConfiguration) -> bool {
        let pending = self.is_pending();
        if let Some(size) = self.size.take() {
            config.width = size.width;
            config.height = size.height;
        }
        if let Some(mode) = self.present_mode.take() {
            config.present_mode = mode;
        }
        self.recreate = false;
        pending
    }
}

/// A frame being recorded.
///
/// Obtained from [`FrameScheduler::begin_frame`] and handed back to
/// [`FrameScheduler::end_frame`].
pub struct Frame {
    index: usize,
    texture: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
    encoder: wgpu::CommandEncoder,
    transfer: Option<wgpu::CommandEncoder>,
}

impl Frame {
    /// Frame slot the per-frame buffers of this frame live in.
    pub fn index(&self) -> usize {
        self.index
    }

    /// View of the acquired surface texture.
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    /// The graphics encoder.
    pub fn encoder(&mut self) -> &mut wgpu::CommandEncoder {
        &mut self.encoder
    }

    /// The encoder uploads are recorded on: the transfer encoder when the dedicated transfer
    /// path is enabled, the graphics encoder otherwise.
    pub fn upload_encoder(&mut self) -> &mut wgpu::CommandEncoder {
        match &mut self.transfer {
            Some(transfer) => transfer,
            None => &mut self.encoder,
        }
    }

    /// Whether uploads go through a separate transfer encoder.
    pub fn has_transfer(&self) -> bool {
        self.transfer.is_some()
    }
}

/// Drives the frame loop of one window: acquire, record, submit, present.
pub struct FrameScheduler {
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    depth_stencil_view: wgpu::TextureView,
    changes: PendingSurfaceChanges,
    frame_index: usize,
    frames_in_flight: usize,
    background: Color,
    separate_transfer: bool,
    minimized: bool,
    #[cfg(not(target_arch = "wasm32"))]
    worker: Option<PresentWorker>,
    #[cfg(not(target_arch = "wasm32"))]
    pending_present: Option<PendingPresent>,
}

impl FrameScheduler {
    /// Configures `surface` and creates the depth-stencil target.
    ///
    /// # Arguments
    /// * `ctx` - The rendering context the surface was created with
    /// * `surface` - The window surface
    /// * `size` - Drawable size in physical pixels
    pub fn new(
        ctx: &RenderingContext,
        surface: wgpu::Surface<'static>,
        size: PhysicalSize<u32>,
    ) -> Result<Self> {
        let renderer_config = ctx.config();
        let caps = surface.get_capabilities(&ctx.adapter);
        let width = size.width.max(1);
        let height = size.height.max(1);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: ctx.surface_format,
            width,
            height,
            present_mode: renderer_config.present_mode,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: renderer_config.frames_in_flight,
        };
        surface.configure(&ctx.device, &config);
        let (_, depth_stencil_view) = ctx.create_depth_stencil_texture(width, height)?;

        #[cfg(not(target_arch = "wasm32"))]
        let worker = if renderer_config.async_present {
            Some(PresentWorker::for_surface()?)
        } else {
            None
        };

        log::info!(
            "frame scheduler ready: {}x{}, {:?}, {} frames in flight",
            width,
            height,
            config.present_mode,
            renderer_config.frames_in_flight
        );

        Ok(Self {
            surface,
            config,
            depth_stencil_view,
            changes: PendingSurfaceChanges::default(),
            frame_index: 0,
            frames_in_flight: ctx.frames_in_flight(),
            background: renderer_config.background,
            separate_transfer: renderer_config.separate_transfer,
            minimized: size.width == 0 || size.height == 0,
            #[cfg(not(target_arch = "wasm32"))]
            worker,
            #[cfg(not(target_arch = "wasm32"))]
            pending_present: None,
        })
    }

    /// Slot of the next frame.
    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    /// Present mode of the current swapchain.
    pub fn present_mode(&self) -> wgpu::PresentMode {
        self.config.present_mode
    }

    /// Current swapchain size.
    pub fn size(&self) -> PhysicalSize<u32> {
        PhysicalSize::new(self.config.width, self.config.height)
    }

    /// Sets the clear color.
    pub fn set_background(&mut self, background: Color) {
        self.background = background;
    }

    /// Requests a new swapchain size, applied at the next [`FrameScheduler::begin_frame`].
    ///
    /// A zero size pauses rendering until a non-zero size comes in.
    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        self.minimized = size.width == 0 || size.height == 0;
        self.changes.resize(size);
    }

    /// Requests a present mode, applied at the next swapchain recreation.
    pub fn set_present_mode(&mut self, mode: wgpu::PresentMode) {
        self.changes.set_present_mode(mode);
    }

    fn recreate_swapchain(&mut self, ctx: &RenderingContext) -> Result<()> {
        log::debug!(
            "recreating swapchain: {}x{}, {:?}",
            self.config.width,
            self.config.height,
            self.config.present_mode
        );
        self.surface.configure(&ctx.device, &self.config);
        let (_, view) = ctx.create_depth_stencil_texture(self.config.width, self.config.height)?;
        self.depth_stencil_view = view;
        Ok(())
    }

    fn wait_for_present(&mut self) {
        #[cfg(not(target_arch = "wasm32"))]
        if let Some(pending) = self.pending_present.take() {
            pending.wait();
        }
    }

    /// Acquires the next surface texture and opens the frame's encoders.
    ///
    /// Returns `Ok(None)` when no frame can be drawn right now: the window is minimized, the
    /// swapchain was stale and has been recreated, or the acquire timed out.
    ///
    /// The previous frame's present is joined first, whatever slot it used. This is stricter
    /// than waiting on the slot being reused and keeps at most one present queued.
    pub fn begin_frame(&mut self, ctx: &RenderingContext) -> Result<Option<Frame>> {
        self.wait_for_present();

        if self.minimized {
            return Ok(None);
        }
        if self.changes.apply(&mut self.config) {
            self.recreate_swapchain(ctx)?;
        }

        let texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost) => {
                log::debug!("swapchain is stale, recreating it");
                self.recreate_swapchain(ctx)?;
                return Ok(None);
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("timed out acquiring a surface texture, skipping frame");
                return Ok(None);
            }
            Err(wgpu::SurfaceError::OutOfMemory) => return Err(OnyxError::SurfaceOutOfMemory),
            Err(error) => return Err(OnyxError::Surface(error)),
        };

        if texture.suboptimal {
            self.changes.invalidate();
        }

        let view = texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let encoder = ctx.create_command_encoder("onyx_graphics");
        let transfer = self
            .separate_transfer
            .then(|| ctx.create_command_encoder("onyx_transfer"));

        Ok(Some(Frame {
            index: self.frame_index,
            texture,
            view,
            encoder,
            transfer,
        }))
    }

    /// Opens the frame's render pass: color cleared to the background, depth to 1 and
    /// stencil to 0.
    pub fn begin_render_pass<'a>(&'a self, frame: &'a mut Frame) -> wgpu::RenderPass<'a> {
        let background = self.background;
        frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("onyx_frame"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &frame.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: background.r as f64,
                        g: background.g as f64,
                        b: background.b as f64,
                        a: background.a as f64,
                    }),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_stencil_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(0),
                    store: wgpu::StoreOp::Store,
                }),
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        })
    }

    /// Ends a render pass opened with [`FrameScheduler::begin_render_pass`].
    pub fn end_render_pass(&self, render_pass: wgpu::RenderPass<'_>) {
        drop(render_pass);
    }

    /// Submits the transfer commands, then the graphics commands, then presents.
    pub fn end_frame(&mut self, ctx: &RenderingContext, frame: Frame) -> Result<()> {
        let Frame {
            index,
            texture,
            view,
            encoder,
            transfer,
        } = frame;
        drop(view);

        let mut command_buffers = Vec::with_capacity(2);
        if let Some(transfer) = transfer {
            command_buffers.push(transfer.finish());
        }
        command_buffers.push(encoder.finish());
        ctx.submit(command_buffers);

        self.present(texture);
        self.frame_index = next_frame_index(index, self.frames_in_flight);
        Ok(())
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn present(&mut self, texture: wgpu::SurfaceTexture) {
        match &self.worker {
            Some(worker) => self.pending_present = Some(worker.submit(texture)),
            None => texture.present(),
        }
    }

    #[cfg(target_arch = "wasm32")]
    fn present(&mut self, texture: wgpu::SurfaceTexture) {
        texture.present();
    }
}

impl Drop for FrameScheduler {
    fn drop(&mut self) {
        self.wait_for_present();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface_config() -> wgpu::SurfaceConfiguration {
        wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: wgpu::TextureFormat::Bgra8Unorm,
            width: 800,
            height: 600,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        }
    }

    #[test]
    fn test_frame_index_cycles() {
        let mut index = 0;
        let visited: Vec<usize> = (0..7)
            .map(|_| {
                let current = index;
                index = next_frame_index(index, 3);
                current
            })
            .collect();
        assert_eq!(visited, vec![0, 1, 2, 0, 1, 2, 0]);
        assert_eq!(next_frame_index(0, 1), 0);
    }

    #[test]
    fn test_resize_is_deferred_until_applied() {
        let mut config = surface_config();
        let mut changes = PendingSurfaceChanges::default();
        assert!(!changes.apply(&mut config));

        changes.resize(PhysicalSize::new(1024, 768));
        assert!(changes.is_pending());
        assert_eq!(config.width, 800);

        assert!(changes.apply(&mut config));
        assert_eq!((config.width, config.height), (1024, 768));
        assert!(!changes.is_pending());
    }

    #[test]
    fn test_zero_size_is_ignored() {
        let mut config = surface_config();
        let mut changes = PendingSurfaceChanges::default();
        changes.resize(PhysicalSize::new(0, 600));
        assert!(!changes.apply(&mut config));
        assert_eq!(config.width, 800);
    }

    #[test]
    fn test_present_mode_change_recreates() {
        let mut config = surface_config();
        let mut changes = PendingSurfaceChanges::default();
        changes.set_present_mode(wgpu::PresentMode::Mailbox);
        assert!(changes.apply(&mut config));
        assert_eq!(config.present_mode, wgpu::PresentMode::Mailbox);
    }

    #[test]
    fn test_invalidate_recreates_once() {
        let mut config = surface_config();
        let mut changes = PendingSurfaceChanges::default();
        changes.invalidate();
        assert!(changes.apply(&mut config));
        assert!(!changes.apply(&mut config));
    }
}
