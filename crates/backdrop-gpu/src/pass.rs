use backdrop_core::{
    DrawableSize, FrameState, UniformBlock, FULLSCREEN_INSTANCE_COUNT, FULLSCREEN_VERTEX_COUNT,
};
use wgpu::{BindGroup, BindGroupLayout, Buffer, Device, Queue, RenderPipeline, TextureView};

use crate::error::InitError;

/// WGSL for the effect: `vs_main` emits 6 clip-space vertices from
/// `vertex_index`, `fs_main` reads the `Uniforms` block at group 0 binding 0.
pub const QUAD_WGSL: &str = include_str!("../shaders/quad.wgsl");

pub const VERTEX_ENTRY: &str = "vs_main";
pub const FRAGMENT_ENTRY: &str = "fs_main";

// ---------------------------------------------------------------------------
// ColorAttachmentTemplate
// ---------------------------------------------------------------------------

/// Everything about the single color attachment except its view, which is
/// swapped for the current drawable every frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorAttachmentTemplate {
    pub clear: wgpu::Color,
    pub store: wgpu::StoreOp,
}

impl Default for ColorAttachmentTemplate {
    fn default() -> Self {
        Self {
            clear: wgpu::Color::WHITE,
            store: wgpu::StoreOp::Store,
        }
    }
}

impl ColorAttachmentTemplate {
    pub fn attach<'a>(&self, view: &'a TextureView) -> wgpu::RenderPassColorAttachment<'a> {
        wgpu::RenderPassColorAttachment {
            view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(self.clear),
                store: self.store,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// FullscreenPass
// ---------------------------------------------------------------------------

/// Owns every GPU resource of the effect: pipeline, the one uniform buffer,
/// and the bind group tying the two together. Nothing is reallocated after
/// construction; a resize only changes what is written into the buffer.
pub struct FullscreenPass {
    pipeline: RenderPipeline,
    bind_group_layout: BindGroupLayout,
    uniform_buf: Buffer,
    bind_group: BindGroup,
    attachment: ColorAttachmentTemplate,
    state: FrameState,
}

impl FullscreenPass {
    /// Build the pass for surfaces of `format`. Shader or pipeline validation
    /// errors are returned as `InitError::ShaderCompilation`.
    pub fn new(
        device: &Device,
        format: wgpu::TextureFormat,
        size: DrawableSize,
    ) -> Result<Self, InitError> {
        Self::with_shader(device, format, size, QUAD_WGSL)
    }

    /// Same as `new` with caller-supplied WGSL honoring the same contract.
    pub fn with_shader(
        device: &Device,
        format: wgpu::TextureFormat,
        size: DrawableSize,
        wgsl: &str,
    ) -> Result<Self, InitError> {
        // binding 0 : Uniforms, fragment stage only
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("fullscreen_bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(UniformBlock::SIZE),
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("fullscreen_pl"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("quad"),
            source: wgpu::ShaderSource::Wgsl(wgsl.into()),
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("fullscreen_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: VERTEX_ENTRY,
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: FRAGMENT_ENTRY,
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(InitError::ShaderCompilation(err.to_string()));
        }

        let uniform_buf = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("fullscreen_uniforms"),
            size: UniformBlock::SIZE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("fullscreen_bg"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buf.as_entire_binding(),
            }],
        });

        log::info!(
            "Fullscreen pass ready: {:?}, {}×{}",
            format,
            size.width,
            size.height
        );

        Ok(Self {
            pipeline,
            bind_group_layout,
            uniform_buf,
            bind_group,
            attachment: ColorAttachmentTemplate::default(),
            state: FrameState::new(size),
        })
    }

    /// Drawable size the next frame will encode.
    pub fn size(&self) -> DrawableSize {
        self.state.size()
    }

    /// CPU copy of what was last written to the uniform buffer.
    pub fn uniforms(&self) -> &UniformBlock {
        self.state.uniforms()
    }

    pub fn bind_group_layout(&self) -> &BindGroupLayout {
        &self.bind_group_layout
    }

    pub fn attachment(&self) -> &ColorAttachmentTemplate {
        &self.attachment
    }

    /// Update the cached size used for subsequent frames. No GPU resource
    /// is touched.
    pub fn on_resize(&mut self, size: DrawableSize) {
        self.state.on_resize(size);
    }

    /// Upload this frame's uniforms and record the fullscreen draw into
    /// `encoder`, targeting `target`.
    ///
    /// The buffer write goes through the queue, so it lands before any
    /// command buffer submitted after it, including the one `encoder` becomes.
    pub fn record_frame(
        &mut self,
        queue: &Queue,
        encoder: &mut wgpu::CommandEncoder,
        target: &TextureView,
        timestamp_secs: f32,
    ) {
        let uniforms = self.state.prepare(timestamp_secs);
        queue.write_buffer(&self.uniform_buf, 0, bytemuck::bytes_of(uniforms));

        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("fullscreen-pass"),
            color_attachments: &[Some(self.attachment.attach(target))],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, &self.bind_group, &[]);
        // two triangles, no vertex buffer
        rpass.draw(0..FULLSCREEN_VERTEX_COUNT, 0..FULLSCREEN_INSTANCE_COUNT);
    }
}
