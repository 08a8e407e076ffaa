//! Triangle - Main Entry Point
//!
//! Opens a window and draws a single triangle with Vulkan, one frame in
//! flight, until the window is closed or a frame fails.

mod cli;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::{debug, error, info};
use winit::application::ApplicationHandler;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowId;

use triangle_core::{Config, FrameTimer};
use triangle_platform::Window;
use triangle_renderer::Renderer;

use crate::cli::Cli;

struct App {
    config: Config,
    // Dropped before the window it renders to.
    renderer: Option<Renderer>,
    window: Option<Window>,
    timer: FrameTimer,
    failed: bool,
}

impl App {
    fn new(config: Config) -> Self {
        Self {
            config,
            renderer: None,
            window: None,
            timer: FrameTimer::default(),
            failed: false,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop) {
        self.failed = true;
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window = match Window::new(event_loop, &self.config.window) {
            Ok(window) => window,
            Err(e) => {
                error!("Failed to create window: {}", e);
                self.fail(event_loop);
                return;
            }
        };

        match Renderer::new(&window, &self.config.renderer) {
            Ok(renderer) => {
                info!("Initialization complete, entering main loop");
                self.renderer = Some(renderer);
                self.window = Some(window);
            }
            Err(e) => {
                error!("Failed to create renderer: {}", e);
                self.fail(event_loop);
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => {
                info!("Close requested, shutting down");
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => {
                let Some(renderer) = self.renderer.as_mut() else {
                    return;
                };

                if let Err(e) = renderer.render_frame() {
                    error!("Fatal render error: {}", e);
                    self.fail(event_loop);
                    return;
                }

                if let Some(stats) = self.timer.frame() {
                    debug!(
                        "{:.1} fps ({:.2} ms/frame, {} frames)",
                        stats.fps, stats.frame_time_ms, stats.total_frames
                    );
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.failed {
            return;
        }
        if let Some(window) = &self.window {
            window.request_redraw();
        } else {
            event_loop.set_control_flow(ControlFlow::Wait);
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config().context("Failed to load configuration")?;

    triangle_core::init_logging(&config.log.filter);
    info!("Starting triangle");
    debug!("{:?}", config);

    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop.run_app(&mut app).context("Event loop error")?;

    let frames = app.timer.total_frames();
    let failed = app.failed;
    // Tear down Vulkan before the window goes away.
    app.renderer = None;
    app.window = None;

    if failed {
        bail!("Rendering stopped after a fatal error ({} frames presented)", frames);
    }

    info!("Exited cleanly after {} frames", frames);
    Ok(())
}
