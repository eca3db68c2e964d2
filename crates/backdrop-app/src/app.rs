use std::cell::Cell;
use std::sync::Arc;
use std::time::{Duration, Instant};

use backdrop_core::{DrawableSize, FrameDriver, FrameScheduler, FrameStats, TickOutcome};
use backdrop_gpu::{
    DeviceContext, FrameError, FrameRenderer, FullscreenPass, InitError, SurfaceOptions,
};
use winit::window::Window;

// ---------------------------------------------------------------------------
// Simple FPS counter — logs once per second
// ---------------------------------------------------------------------------

struct FpsCounter {
    frames: u32,
    last_report: Instant,
}

impl FpsCounter {
    fn new() -> Self {
        Self {
            frames: 0,
            last_report: Instant::now(),
        }
    }

    /// Count a drawn frame. Returns the FPS value once a full second has
    /// elapsed since the last report.
    fn tick(&mut self, now: Instant) -> Option<f32> {
        self.frames += 1;
        let elapsed = now.duration_since(self.last_report).as_secs_f32();
        if elapsed >= 1.0 {
            let fps = self.frames as f32 / elapsed;
            self.frames = 0;
            self.last_report = now;
            Some(fps)
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Redraw scheduling
// ---------------------------------------------------------------------------

/// Refresh interval assumed when the monitor does not report one.
const FALLBACK_REFRESH: Duration = Duration::from_micros(16_667);

/// One refresh period for a monitor running at `millihertz`.
fn refresh_interval(millihertz: Option<u32>) -> Duration {
    match millihertz {
        Some(mhz) if mhz > 0 => Duration::from_secs_f64(1000.0 / mhz as f64),
        _ => FALLBACK_REFRESH,
    }
}

/// When to retry after a skipped tick. A hidden drawable waits for the next
/// resize instead of retrying on a timer.
fn retry_deadline(size: DrawableSize, now: Instant, interval: Duration) -> Option<Instant> {
    if size.is_empty() {
        None
    } else {
        Some(now + interval)
    }
}

/// A drawable coming back from zero size has no pending retry to wake it.
fn wakes_on_resize(old: DrawableSize, new: DrawableSize) -> bool {
    old.is_empty() && !new.is_empty()
}

/// Drawn frames redraw right away (FIFO present paces them); skipped ones
/// only record that a retry is wanted.
struct RedrawScheduler<'a> {
    window: &'a Window,
    retry: Cell<bool>,
}

impl FrameScheduler for RedrawScheduler<'_> {
    fn request_frame(&self) {
        self.window.request_redraw();
    }

    fn retry_later(&self) {
        self.retry.set(true);
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

/// Window + device + the fullscreen pass, driven one frame per redraw.
pub struct App {
    window: Arc<Window>,
    context: DeviceContext,
    pass: FullscreenPass,
    driver: FrameDriver,
    fps: FpsCounter,
    refresh: Duration,
    retry_at: Option<Instant>,
}

impl App {
    /// Bring up wgpu for `window`. Any failure here is fatal.
    pub fn new(window: Arc<Window>, options: &SurfaceOptions) -> Result<Self, InitError> {
        let size = drawable_size(&window);

        let context = pollster::block_on(DeviceContext::new(Arc::clone(&window), size, options))?;
        let pass = FullscreenPass::new(context.device(), context.format(), size)?;

        let refresh = refresh_interval(
            window
                .current_monitor()
                .and_then(|monitor| monitor.refresh_rate_millihertz()),
        );
        log::debug!("refresh interval {:?}", refresh);

        Ok(Self {
            window,
            context,
            pass,
            driver: FrameDriver::new(),
            fps: FpsCounter::new(),
            refresh,
            retry_at: None,
        })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn stats(&self) -> FrameStats {
        self.driver.stats()
    }

    /// Reconfigure the surface and hand the new size to the pass. Coming
    /// back from a hidden drawable restarts the redraw loop.
    pub fn resize(&mut self, size: DrawableSize) {
        let old = self.context.size();
        self.context.configure_surface(size);
        self.pass.on_resize(size);

        if wakes_on_resize(old, size) && !self.driver.is_stopped() {
            self.retry_at = None;
            self.window.request_redraw();
        }
    }

    /// Fire a due retry. Returns the pending deadline, if any, for the event
    /// loop to wait on.
    pub fn poll_retry(&mut self, now: Instant) -> Option<Instant> {
        let at = self.retry_at?;
        if now < at {
            return Some(at);
        }
        self.retry_at = None;
        self.window.request_redraw();
        None
    }

    /// Stop scheduling frames; the next redraw becomes a no-op.
    pub fn stop(&mut self) {
        self.driver.request_stop();
    }

    /// One frame: acquire, record, submit, and ask for the next redraw.
    pub fn redraw(&mut self) -> Result<(), FrameError> {
        let now = Instant::now();
        let scheduler = RedrawScheduler {
            window: &self.window,
            retry: Cell::new(false),
        };

        let mut target = FrameRenderer::new(&mut self.context, &mut self.pass);
        let outcome = self.driver.tick(&mut target, &scheduler, now)?;

        self.retry_at = if scheduler.retry.get() {
            retry_deadline(self.context.size(), now, self.refresh)
        } else {
            None
        };

        if let TickOutcome::Drawn { timestamp_secs } = outcome {
            if let Some(fps) = self.fps.tick(now) {
                let stats = self.driver.stats();
                log::debug!(
                    "FPS: {:.1}  t: {:.2}s  drawn: {}  skipped: {}",
                    fps,
                    timestamp_secs,
                    stats.drawn,
                    stats.skipped,
                );
            }
        }
        Ok(())
    }
}

/// Physical (device-pixel-ratio adjusted) size of the window's drawable.
pub fn drawable_size(window: &Window) -> DrawableSize {
    let size = window.inner_size();
    DrawableSize::new(size.width, size.height)
}
