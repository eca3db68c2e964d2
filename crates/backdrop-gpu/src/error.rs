/// Fatal errors raised while bringing up the device, surface or pipeline.
/// None of these are retried; startup aborts and no frame is scheduled.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("no compatible GPU adapter found")]
    NoAdapter,
    #[error("failed to create presentation surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("failed to create GPU device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("surface reports no supported formats for this adapter")]
    NoSurfaceFormat,
    #[error("drawable has zero size ({width}x{height})")]
    ZeroSize { width: u32, height: u32 },
    #[error("shader compilation failed: {0}")]
    ShaderCompilation(String),
}

/// Errors reported by the device after commands were handed to the queue.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("validation error during frame: {0}")]
    Validation(String),
    #[error("out of GPU memory during frame: {0}")]
    OutOfMemory(String),
    #[error("GPU device lost: {0}")]
    DeviceLost(String),
}

/// Per-frame failures. Only `SurfaceLost` is recoverable.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("drawable view unavailable: {0}")]
    SurfaceLost(#[source] wgpu::SurfaceError),
    #[error("out of memory acquiring the next surface texture")]
    OutOfMemory,
    #[error(transparent)]
    Submission(#[from] SubmissionError),
}

impl FrameError {
    /// Whether the host should simply try again on the next refresh.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, FrameError::SurfaceLost(_))
    }
}

impl From<wgpu::SurfaceError> for FrameError {
    fn from(err: wgpu::SurfaceError) -> Self {
        match err {
            wgpu::SurfaceError::OutOfMemory => FrameError::OutOfMemory,
            other => FrameError::SurfaceLost(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lost_and_outdated_are_recoverable() {
        for err in [
            wgpu::SurfaceError::Lost,
            wgpu::SurfaceError::Outdated,
            wgpu::SurfaceError::Timeout,
        ] {
            assert!(FrameError::from(err).is_recoverable());
        }
    }

    #[test]
    fn out_of_memory_is_fatal() {
        let err = FrameError::from(wgpu::SurfaceError::OutOfMemory);
        assert!(matches!(err, FrameError::OutOfMemory));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn submission_errors_are_fatal() {
        let err = FrameError::from(SubmissionError::DeviceLost("reset".into()));
        assert!(!err.is_recoverable());
        assert_eq!(err.to_string(), "GPU device lost: reset");
    }
}
