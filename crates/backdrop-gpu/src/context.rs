use std::sync::{Arc, Mutex};

use backdrop_core::DrawableSize;

use crate::error::{FrameError, InitError, SubmissionError};

// ---------------------------------------------------------------------------
// SurfaceOptions
// ---------------------------------------------------------------------------

/// How the presentation surface is set up.
#[derive(Debug, Clone)]
pub struct SurfaceOptions {
    /// Pick an sRGB format when the surface offers one. Otherwise the first
    /// format the platform reports (its preferred one) is used.
    pub prefer_srgb: bool,
    /// FIFO presents at display refresh cadence.
    pub present_mode: wgpu::PresentMode,
    /// Falls back to the first supported mode when unsupported.
    pub alpha_mode: wgpu::CompositeAlphaMode,
    pub power_preference: wgpu::PowerPreference,
    pub desired_maximum_frame_latency: u32,
}

impl Default for SurfaceOptions {
    fn default() -> Self {
        Self {
            prefer_srgb: false,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: wgpu::CompositeAlphaMode::Opaque,
            power_preference: wgpu::PowerPreference::HighPerformance,
            desired_maximum_frame_latency: 2,
        }
    }
}

// ---------------------------------------------------------------------------
// SurfaceFrame
// ---------------------------------------------------------------------------

/// One acquired frame: the surface texture, a view of it, and the encoder
/// commands for it are recorded into. Must be handed back to
/// `DeviceContext::submit`; holding it blocks acquisition of the next texture.
pub struct SurfaceFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
    pub encoder: wgpu::CommandEncoder,
}

// ---------------------------------------------------------------------------
// DeviceContext
// ---------------------------------------------------------------------------

/// Owns the device, queue and presentation surface. The surface format is
/// chosen once at creation and never changes.
pub struct DeviceContext {
    surface: wgpu::Surface<'static>,
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: DrawableSize,
    device_lost: Arc<Mutex<Option<String>>>,
}

impl DeviceContext {
    /// Create a device bound to `target` and configure the surface for `size`.
    ///
    /// The window behind `target` is typically an `Arc<winit::window::Window>`
    /// so the surface can hold it for `'static`.
    pub async fn new(
        target: impl Into<wgpu::SurfaceTarget<'static>>,
        size: DrawableSize,
        options: &SurfaceOptions,
    ) -> Result<Self, InitError> {
        if size.is_empty() {
            return Err(InitError::ZeroSize {
                width: size.width,
                height: size.height,
            });
        }

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance.create_surface(target)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: options.power_preference,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(InitError::NoAdapter)?;

        let info = adapter.get_info();
        log::info!("GPU adapter: {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("backdrop device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        let device_lost = Arc::new(Mutex::new(None));
        let lost = Arc::clone(&device_lost);
        device.set_device_lost_callback(move |reason, message| {
            if is_teardown(&reason) {
                log::debug!("device released ({reason:?}): {message}");
                return;
            }
            log::error!("device lost ({reason:?}): {message}");
            if let Ok(mut slot) = lost.lock() {
                *slot = Some(message);
            }
        });

        let caps = surface.get_capabilities(&adapter);
        let format = choose_surface_format(&caps, options.prefer_srgb)
            .ok_or(InitError::NoSurfaceFormat)?;
        let alpha_mode = choose_alpha_mode(&caps, options.alpha_mode);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width,
            height: size.height,
            present_mode: options.present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: options.desired_maximum_frame_latency,
        };

        surface.configure(&device, &config);
        log::info!(
            "Surface configured: {}×{} {:?} {:?}",
            config.width,
            config.height,
            format,
            config.present_mode
        );

        Ok(Self {
            surface,
            adapter,
            device,
            queue,
            config,
            size,
            device_lost,
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    /// Fixed for the lifetime of the context.
    pub fn format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Last drawable size reported by the host, possibly empty.
    pub fn size(&self) -> DrawableSize {
        self.size
    }

    /// Apply a new drawable size to the surface. A zero-sized drawable is
    /// recorded but configuration is deferred until it becomes non-empty.
    pub fn configure_surface(&mut self, size: DrawableSize) {
        self.size = size;
        if size.is_empty() {
            log::debug!("surface hidden ({}x{}); deferring configure", size.width, size.height);
            return;
        }
        self.config.width = size.width;
        self.config.height = size.height;
        self.surface.configure(&self.device, &self.config);
        log::debug!("Surface resized to {}×{}", size.width, size.height);
    }

    /// Acquire the next drawable and open an encoder for it.
    ///
    /// Lost/outdated surfaces are reconfigured before the error is returned,
    /// so the caller only has to retry on the next refresh.
    pub fn current_drawable_view(&mut self) -> Result<SurfaceFrame, FrameError> {
        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(err) => {
                if matches!(err, wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)
                    && !self.size.is_empty()
                {
                    self.surface.configure(&self.device, &self.config);
                }
                return Err(err.into());
            }
        };

        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        // Popped in `submit`, after the queue has seen this frame's commands.
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame-encoder"),
            });

        Ok(SurfaceFrame {
            surface_texture,
            view,
            encoder,
        })
    }

    /// Submit the frame's commands and present it.
    pub fn submit(&self, frame: SurfaceFrame) -> Result<(), SubmissionError> {
        let SurfaceFrame {
            surface_texture,
            view,
            encoder,
        } = frame;

        self.queue.submit(std::iter::once(encoder.finish()));
        drop(view);
        surface_texture.present();

        let validation = pollster::block_on(self.device.pop_error_scope());
        let out_of_memory = pollster::block_on(self.device.pop_error_scope());

        if let Some(message) = self.device_lost.lock().ok().and_then(|slot| slot.clone()) {
            return Err(SubmissionError::DeviceLost(message));
        }
        if let Some(err) = out_of_memory {
            return Err(SubmissionError::OutOfMemory(err.to_string()));
        }
        if let Some(err) = validation {
            return Err(SubmissionError::Validation(err.to_string()));
        }
        Ok(())
    }
}

/// Device and queue without a surface, for off-screen tests and tools.
pub async fn request_headless_device() -> Result<(wgpu::Device, wgpu::Queue), InitError> {
    let instance = wgpu::Instance::default();

    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await
        .ok_or(InitError::NoAdapter)?;

    let device = adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: Some("backdrop headless device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults(),
                memory_hints: Default::default(),
            },
            None,
        )
        .await?;
    Ok(device)
}

/// Loss reasons raised by our own drop/destroy rather than a GPU fault.
fn is_teardown(reason: &wgpu::DeviceLostReason) -> bool {
    matches!(reason, wgpu::DeviceLostReason::Destroyed | wgpu::DeviceLostReason::Dropped)
}

fn choose_surface_format(
    caps: &wgpu::SurfaceCapabilities,
    prefer_srgb: bool,
) -> Option<wgpu::TextureFormat> {
    let first = caps.formats.first().copied()?;
    if prefer_srgb {
        if let Some(srgb) = caps.formats.iter().copied().find(|f| f.is_srgb()) {
            return Some(srgb);
        }
    }
    Some(first)
}

fn choose_alpha_mode(
    caps: &wgpu::SurfaceCapabilities,
    requested: wgpu::CompositeAlphaMode,
) -> wgpu::CompositeAlphaMode {
    if caps.alpha_modes.contains(&requested) {
        return requested;
    }
    caps.alpha_modes
        .first()
        .copied()
        .unwrap_or(wgpu::CompositeAlphaMode::Auto)
}
