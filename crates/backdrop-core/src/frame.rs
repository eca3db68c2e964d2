use crate::DrawableSize;

/// Vertices emitted by the fullscreen draw: two triangles generated in the
/// vertex stage from `vertex_index`, no vertex buffer bound.
pub const FULLSCREEN_VERTEX_COUNT: u32 = 6;
pub const FULLSCREEN_INSTANCE_COUNT: u32 = 1;

// ---------------------------------------------------------------------------
// UniformBlock
// ---------------------------------------------------------------------------

/// Per-frame data uploaded to the GPU as one 16-byte uniform buffer.
/// Must match the `Uniforms` struct in `quad.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct UniformBlock {
    pub width: f32,
    pub height: f32,
    /// Elapsed effect time in seconds.
    pub time: f32,
    /// `width / height`
    pub aspect: f32,
}

impl UniformBlock {
    pub const SIZE: u64 = std::mem::size_of::<Self>() as u64;

    pub fn new(size: DrawableSize, time: f32) -> Self {
        Self {
            width: size.width as f32,
            height: size.height as f32,
            time,
            aspect: size.aspect(),
        }
    }

    pub fn as_array(&self) -> [f32; 4] {
        [self.width, self.height, self.time, self.aspect]
    }
}

// ---------------------------------------------------------------------------
// FrameState — CPU half of the fullscreen pass
// ---------------------------------------------------------------------------

/// Cached drawable size plus the uniform record that is rewritten in place
/// every frame. Only `prepare` mutates the record.
#[derive(Debug, Clone)]
pub struct FrameState {
    size: DrawableSize,
    uniforms: UniformBlock,
}

impl FrameState {
    pub fn new(size: DrawableSize) -> Self {
        Self {
            size,
            uniforms: UniformBlock::new(size, 0.0),
        }
    }

    pub fn size(&self) -> DrawableSize {
        self.size
    }

    /// Contents of the last prepared upload.
    pub fn uniforms(&self) -> &UniformBlock {
        &self.uniforms
    }

    /// Record a new drawable size for subsequent frames. Empty sizes are
    /// ignored so the aspect ratio never degenerates while minimised.
    pub fn on_resize(&mut self, size: DrawableSize) {
        if size.is_empty() {
            log::debug!("ignoring empty drawable size {}x{}", size.width, size.height);
            return;
        }
        self.size = size;
    }

    /// Rewrite all four fields for `timestamp_secs` and return the record to upload.
    pub fn prepare(&mut self, timestamp_secs: f32) -> &UniformBlock {
        self.uniforms.width = self.size.width as f32;
        self.uniforms.height = self.size.height as f32;
        self.uniforms.time = timestamp_secs;
        self.uniforms.aspect = self.size.aspect();
        &self.uniforms
    }
}
