use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

mod app;
mod cli;
mod logging;

use app::App;
use cli::Cli;

// ---------------------------------------------------------------------------
// Handler — winit ApplicationHandler
// ---------------------------------------------------------------------------

struct Handler {
    cli: Cli,
    app: Option<App>,
    /// First fatal error; returned from `main` after the loop exits.
    fatal: Option<anyhow::Error>,
}

impl Handler {
    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        if let Some(app) = &mut self.app {
            app.stop();
        }
        self.fatal.get_or_insert(err);
        event_loop.exit();
    }
}

impl ApplicationHandler for Handler {
    /// Creates the window, the device and the pass, then requests the
    /// first redraw. Later frames are requested by the frame driver.
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.app.is_some() {
            return;
        }

        let window_attrs = Window::default_attributes()
            .with_title(self.cli.title.clone())
            .with_inner_size(winit::dpi::LogicalSize::new(self.cli.width, self.cli.height));

        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                let err = anyhow::Error::new(err).context("failed to create window");
                return self.fail(event_loop, err);
            }
        };
        let size = window.inner_size();
        log::info!("Window created ({}×{} physical)", size.width, size.height);

        match App::new(Arc::clone(&window), &self.cli.surface_options()) {
            Ok(app) => {
                app.window().request_redraw();
                self.app = Some(app);
            }
            Err(err) => {
                let err = anyhow::Error::new(err).context("failed to initialise renderer");
                self.fail(event_loop, err);
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested — exiting");
                if let Some(app) = &mut self.app {
                    app.stop();
                }
                event_loop.exit();
            }

            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::KeyQ | KeyCode::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => {
                log::info!("Q/Escape pressed — exiting");
                if let Some(app) = &mut self.app {
                    app.stop();
                }
                event_loop.exit();
            }

            WindowEvent::Resized(new_size) => {
                if let Some(app) = &mut self.app {
                    app.resize((new_size.width, new_size.height).into());
                }
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(app) = &mut self.app {
                    let size = app::drawable_size(app.window());
                    app.resize(size);
                }
            }

            WindowEvent::RedrawRequested => {
                let result = match &mut self.app {
                    Some(app) => app.redraw(),
                    None => Ok(()),
                };
                if let Err(err) = result {
                    let err = anyhow::Error::new(err).context("frame submission failed");
                    self.fail(event_loop, err);
                }
            }

            _ => {}
        }
    }

    /// Skipped frames are retried one refresh later rather than immediately.
    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let deadline = self
            .app
            .as_mut()
            .and_then(|app| app.poll_retry(Instant::now()));
        match deadline {
            Some(at) => event_loop.set_control_flow(ControlFlow::WaitUntil(at)),
            None => event_loop.set_control_flow(ControlFlow::Wait),
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(app) = &self.app {
            let stats = app.stats();
            log::info!("Exiting after {} frames ({} skipped)", stats.drawn, stats.skipped);
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.log.as_deref());

    let event_loop = EventLoop::new().context("failed to create event loop")?;
    // Frames are paced by redraw requests, not by polling.
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut handler = Handler {
        cli,
        app: None,
        fatal: None,
    };
    event_loop.run_app(&mut handler).context("event loop error")?;

    match handler.fatal {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
