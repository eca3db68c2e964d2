pub mod context;
pub mod error;
pub mod pass;
pub mod renderer;

pub use context::{request_headless_device, DeviceContext, SurfaceFrame, SurfaceOptions};
pub use error::{FrameError, InitError, SubmissionError};
pub use pass::{ColorAttachmentTemplate, FullscreenPass, QUAD_WGSL};
pub use renderer::FrameRenderer;
