pub mod clock;
pub mod driver;
pub mod frame;

pub use clock::EffectClock;
pub use driver::{DriverState, FrameDriver, FrameScheduler, FrameStats, FrameTarget, TickOutcome};
pub use frame::{FrameState, UniformBlock, FULLSCREEN_INSTANCE_COUNT, FULLSCREEN_VERTEX_COUNT};

// ---------------------------------------------------------------------------
// DrawableSize — pixel dimensions of the presentation surface
// ---------------------------------------------------------------------------

/// Physical pixel size of the current drawable (device-pixel-ratio applied).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrawableSize {
    pub width: u32,
    pub height: u32,
}

impl DrawableSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A zero-area drawable (e.g. a minimised window) cannot be presented to.
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// `width / height` in `f32`, or `0.0` for an empty drawable.
    pub fn aspect(self) -> f32 {
        if self.height == 0 {
            return 0.0;
        }
        self.width as f32 / self.height as f32
    }
}

impl From<(u32, u32)> for DrawableSize {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}
