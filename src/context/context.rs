//! wgpu rendering context.
//!
//! A [`RenderingContext`] is created once per device and passed by reference to every
//! renderer. It is cheap to clone: all wgpu handles are reference counted.

use crate::config::RendererConfig;
use crate::error::{OnyxError, Result};
use crate::renderer::PushConstantData;
use std::mem;
use std::num::NonZeroU64;
use std::sync::Arc;

/// Bind group layouts every pipeline is built against.
///
/// * group 0: per-camera frame constants (uniform, dynamic offset).
/// * group 1: per-pass instance storage.
/// * group 2: directional and point lights (3D only).
pub struct SharedLayouts {
    /// Layout of the frame constants bind group.
    pub frame_constants: wgpu::BindGroupLayout,
    /// Layout of an instance storage bind group.
    pub instances: wgpu::BindGroupLayout,
    /// Layout of the light storage bind group.
    pub lights: wgpu::BindGroupLayout,
}

impl SharedLayouts {
    fn new(device: &wgpu::Device) -> Self {
        let frame_constants = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("onyx_frame_constants_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(mem::size_of::<PushConstantData>() as u64),
                },
                count: None,
            }],
        });

        let instances = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("onyx_instances_layout"),
            entries: &[storage_entry(
                0,
                wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            )],
        });

        let lights = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("onyx_lights_layout"),
            entries: &[
                storage_entry(0, wgpu::ShaderStages::FRAGMENT),
                storage_entry(1, wgpu::ShaderStages::FRAGMENT),
            ],
        });

        Self {
            frame_constants,
            instances,
            lights,
        }
    }
}

fn storage_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: true },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// The wgpu device and everything the renderers share.
#[derive(Clone)]
pub struct RenderingContext {
    /// The wgpu instance used for creating surfaces.
    pub instance: Arc<wgpu::Instance>,
    /// The adapter the device was created from.
    pub adapter: Arc<wgpu::Adapter>,
    /// The wgpu device used for creating GPU resources.
    pub device: Arc<wgpu::Device>,
    /// The wgpu queue used for submitting commands.
    pub queue: Arc<wgpu::Queue>,
    /// Color format of the swapchain.
    pub surface_format: wgpu::TextureFormat,
    config: RendererConfig,
    layouts: Arc<SharedLayouts>,
}

impl RenderingContext {
    /// Creates the wgpu instance, adapter and device for a window and returns the surface
    /// created along the way.
    ///
    /// # Arguments
    /// * `target` - The window (or any other surface target) frames are presented to
    /// * `config` - Renderer configuration, validated before anything is created
    pub async fn new(
        target: impl Into<wgpu::SurfaceTarget<'static>>,
        config: RendererConfig,
    ) -> Result<(Self, wgpu::Surface<'static>)> {
        config.validate()?;

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(target)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| OnyxError::NoCompatibleAdapter)?;

        // Instance data lives in storage buffers, which WebGL2 does not have.
        #[cfg(target_arch = "wasm32")]
        let limits = wgpu::Limits::downlevel_defaults();
        #[cfg(not(target_arch = "wasm32"))]
        let limits = wgpu::Limits::default();

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("onyx device"),
                required_features: wgpu::Features::empty(),
                required_limits: limits,
                memory_hints: wgpu::MemoryHints::default(),
                ..Default::default()
            })
            .await?;

        // Colors are written as-is by the shaders, so a linear format is preferred.
        let caps = surface.get_capabilities(&adapter);
        let surface_format = caps
            .formats
            .iter()
            .find(|f| !f.is_srgb())
            .or_else(|| caps.formats.first())
            .copied()
            .ok_or(OnyxError::UnsupportedSurfaceFormat)?;

        log::info!(
            "created rendering context on {} ({:?}), surface format {:?}",
            adapter.get_info().name,
            adapter.get_info().backend,
            surface_format
        );

        let context = Self::from_parts(instance, adapter, device, queue, surface_format, config)?;
        Ok((context, surface))
    }

    /// Builds a context around an existing device.
    pub fn from_parts(
        instance: wgpu::Instance,
        adapter: wgpu::Adapter,
        device: wgpu::Device,
        queue: wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        config: RendererConfig,
    ) -> Result<Self> {
        config.validate()?;
        let layouts = SharedLayouts::new(&device);

        Ok(Self {
            instance: Arc::new(instance),
            adapter: Arc::new(adapter),
            device: Arc::new(device),
            queue: Arc::new(queue),
            surface_format,
            config,
            layouts: Arc::new(layouts),
        })
    }

    /// The renderer configuration.
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Bind group layouts shared by every pipeline.
    pub fn layouts(&self) -> &SharedLayouts {
        &self.layouts
    }

    /// Number of frame slots.
    pub fn frames_in_flight(&self) -> usize {
        self.config.frames_in_flight as usize
    }

    /// Format of the depth-stencil attachment.
    pub fn depth_stencil_format() -> wgpu::TextureFormat {
        wgpu::TextureFormat::Depth24PlusStencil8
    }

    fn push_error_scopes(&self) {
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn pop_error_scopes(&self) -> Option<wgpu::Error> {
        let validation = pollster::block_on(self.device.pop_error_scope());
        let out_of_memory = pollster::block_on(self.device.pop_error_scope());
        validation.or(out_of_memory)
    }

    // Errors surface through the uncaptured error handler on the web.
    #[cfg(target_arch = "wasm32")]
    fn pop_error_scopes(&self) -> Option<wgpu::Error> {
        drop(self.device.pop_error_scope());
        drop(self.device.pop_error_scope());
        None
    }

    /// Creates a new buffer on the GPU, reporting allocation failures.
    ///
    /// # Arguments
    /// * `desc` - Buffer descriptor
    pub fn create_buffer(&self, desc: &wgpu::BufferDescriptor) -> Result<wgpu::Buffer> {
        self.push_error_scopes();
        let buffer = self.device.create_buffer(desc);

        match self.pop_error_scopes() {
            None => Ok(buffer),
            Some(error) => Err(OnyxError::Allocation {
                label: desc.label.unwrap_or("unnamed").to_string(),
                size: desc.size,
                message: error.to_string(),
            }),
        }
    }

    /// Writes data to a buffer.
    ///
    /// # Arguments
    /// * `buffer` - The buffer to write to
    /// * `offset` - Byte offset into the buffer
    /// * `data` - The data to write
    pub fn write_buffer(&self, buffer: &wgpu::Buffer, offset: u64, data: &[u8]) {
        self.queue.write_buffer(buffer, offset, data);
    }

    /// Creates the depth-stencil attachment of a surface.
    pub fn create_depth_stencil_texture(
        &self,
        width: u32,
        height: u32,
    ) -> Result<(wgpu::Texture, wgpu::TextureView)> {
        let desc = wgpu::TextureDescriptor {
            label: Some("onyx_depth_stencil"),
            size: wgpu::Extent3d {
                // wgpu rejects empty textures.
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::depth_stencil_format(),
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        };

        self.push_error_scopes();
        let texture = self.device.create_texture(&desc);
        if let Some(error) = self.pop_error_scopes() {
            return Err(OnyxError::Allocation {
                label: "onyx_depth_stencil".to_string(),
                size: width as u64 * height as u64 * 4,
                message: error.to_string(),
            });
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok((texture, view))
    }

    /// Creates a new bind group.
    ///
    /// # Arguments
    /// * `desc` - Bind group descriptor
    pub fn create_bind_group(&self, desc: &wgpu::BindGroupDescriptor) -> wgpu::BindGroup {
        self.device.create_bind_group(desc)
    }

    /// Creates a new pipeline layout.
    ///
    /// # Arguments
    /// * `desc` - Pipeline layout descriptor
    pub fn create_pipeline_layout(
        &self,
        desc: &wgpu::PipelineLayoutDescriptor,
    ) -> wgpu::PipelineLayout {
        self.device.create_pipeline_layout(desc)
    }

    /// Creates a shader module from WGSL source, reporting compilation errors.
    ///
    /// # Arguments
    /// * `label` - Debug label for the shader
    /// * `source` - WGSL shader source code
    pub fn create_shader_module(&self, label: &str, source: &str) -> Result<wgpu::ShaderModule> {
        self.push_error_scopes();
        let module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });

        match self.pop_error_scopes() {
            None => Ok(module),
            Some(error) => Err(OnyxError::PipelineCreation {
                label: label.to_string(),
                message: error.to_string(),
            }),
        }
    }

    /// Creates a render pipeline, reporting creation errors.
    ///
    /// # Arguments
    /// * `desc` - Render pipeline descriptor
    pub fn create_render_pipeline(
        &self,
        desc: &wgpu::RenderPipelineDescriptor,
    ) -> Result<wgpu::RenderPipeline> {
        self.push_error_scopes();
        let pipeline = self.device.create_render_pipeline(desc);

        match self.pop_error_scopes() {
            None => Ok(pipeline),
            Some(error) => Err(OnyxError::PipelineCreation {
                label: desc.label.unwrap_or("unnamed").to_string(),
                message: error.to_string(),
            }),
        }
    }

    /// Creates a new command encoder.
    ///
    /// # Arguments
    /// * `label` - Debug label for the encoder
    pub fn create_command_encoder(&self, label: &str) -> wgpu::CommandEncoder {
        self.device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) })
    }

    /// Submits command buffers to the GPU queue.
    ///
    /// # Arguments
    /// * `command_buffers` - Iterator of command buffers to submit
    pub fn submit<I: IntoIterator<Item = wgpu::CommandBuffer>>(&self, command_buffers: I) {
        let _ = self.queue.submit(command_buffers);
    }
}
