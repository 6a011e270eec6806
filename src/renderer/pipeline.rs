//! The four pipeline variants of a shape kind.

use crate::context::RenderingContext;
use crate::dimension::Dimension;
use crate::error::Result;
use crate::renderer::stencil::{per_pass, StencilPass};

/// One render pipeline per [`StencilPass`], all built from the same shader.
pub struct PipelineSet {
    pipelines: [wgpu::RenderPipeline; 4],
}

impl PipelineSet {
    /// Builds the four pipelines of a shape kind.
    ///
    /// # Arguments
    /// * `ctx` - The rendering context
    /// * `label` - Prefix of the pipeline labels
    /// * `source` - WGSL source exposing `vs_main`, `fs_unlit` and, for lit dimensions, `fs_lit`
    /// * `vertex_layout` - Vertex buffer layout, `None` for shapes generated in the vertex shader
    pub fn new<D: Dimension>(
        ctx: &RenderingContext,
        label: &str,
        source: &str,
        vertex_layout: Option<wgpu::VertexBufferLayout<'static>>,
    ) -> Result<Self> {
        let shader = ctx.create_shader_module(label, source)?;

        let layouts = ctx.layouts();
        let mut bind_group_layouts = vec![&layouts.frame_constants, &layouts.instances];
        if D::LIT {
            bind_group_layouts.push(&layouts.lights);
        }
        let pipeline_layout = ctx.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(label),
            bind_group_layouts: &bind_group_layouts,
            push_constant_ranges: &[],
        });

        let buffers: Vec<wgpu::VertexBufferLayout> = vertex_layout.into_iter().collect();

        let pipelines = per_pass(|pass| {
            let pipeline_label = format!("{label}_{}", pass.label());
            let fragment_entry = if D::LIT && pass.is_lit() {
                "fs_lit"
            } else {
                "fs_unlit"
            };

            ctx.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(&pipeline_label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &buffers,
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some(fragment_entry),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: ctx.surface_format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: pass.color_writes(),
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    // Mirrored transforms are legal.
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: Some(pass.depth_stencil_state(
                    RenderingContext::depth_stencil_format(),
                    D::DEPTH_TEST,
                )),
                multisample: wgpu::MultisampleState {
                    count: 1,
                    mask: !0,
                    alpha_to_coverage_enabled: false,
                },
                multiview: None,
                cache: None,
            })
        })?;

        log::debug!("created {label} pipelines");
        Ok(Self { pipelines })
    }

    /// The pipeline of `pass`.
    #[inline]
    pub fn get(&self, pass: StencilPass) -> &wgpu::RenderPipeline {
        &self.pipelines[pass.index()]
    }
}
