use backdrop_core::FrameTarget;

use crate::context::{DeviceContext, SurfaceFrame};
use crate::error::FrameError;
use crate::pass::FullscreenPass;

/// Borrows the device context and the pass for one driver tick.
pub struct FrameRenderer<'a> {
    context: &'a mut DeviceContext,
    pass: &'a mut FullscreenPass,
}

impl<'a> FrameRenderer<'a> {
    pub fn new(context: &'a mut DeviceContext, pass: &'a mut FullscreenPass) -> Self {
        Self { context, pass }
    }
}

impl FrameTarget for FrameRenderer<'_> {
    type Frame = SurfaceFrame;
    type Error = FrameError;

    fn acquire(&mut self) -> Result<Option<SurfaceFrame>, FrameError> {
        // Minimised: nothing to present to.
        if self.context.size().is_empty() {
            return Ok(None);
        }
        match self.context.current_drawable_view() {
            Ok(frame) => Ok(Some(frame)),
            Err(err) if err.is_recoverable() => {
                log::warn!("skipping frame: {err}");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    fn record(&mut self, frame: &mut SurfaceFrame, timestamp_secs: f32) {
        self.pass.record_frame(
            self.context.queue(),
            &mut frame.encoder,
            &frame.view,
            timestamp_secs,
        );
    }

    fn submit(&mut self, frame: SurfaceFrame) -> Result<(), FrameError> {
        self.context.submit(frame)?;
        Ok(())
    }
}
