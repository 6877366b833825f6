// =============================================================================
// TRIANGLE ENGINE - Vulkan rendering context bring-up
// =============================================================================
//
// ARCHITECTURE OVERVIEW:
// ┌─────────────────────────────────────────────────────────────────┐
// │  winit event loop (window, close events)                        │
// │    └── RenderContext                                            │
// │          └── Instance + Surface                                 │
// │                └── Selected GPU -> Logical Device + Queues      │
// │                      └── Swapchain + Image Views                │
// │                            └── Render Pass -> Pipeline          │
// └─────────────────────────────────────────────────────────────────┘
//
// The context is built once when the window appears and torn down once when
// the window closes. No frames are drawn yet.
//
// =============================================================================

mod backend;
mod config;
mod window;

use anyhow::{Context, Result};
use backend::{ContextError, FileShaderSource, RenderContext};
use config::Config;
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowAttributes},
};

// =============================================================================
// ENTRY POINT
// =============================================================================

fn main() -> Result<()> {
    let config = Config::load();

    env_logger::Builder::new()
        .filter_level(config.log_level())
        .parse_default_env()
        .init();

    log::info!("Starting {}", config.window.title);
    log::info!("Window: {}x{}", config.window.width, config.window.height);

    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::new(config);
    event_loop.run_app(&mut app).context("Event loop failed")?;

    match app.init_error.take() {
        Some(e) => Err(anyhow::Error::new(e).context("Render context initialization failed")),
        None => Ok(()),
    }
}

// =============================================================================
// APPLICATION STATE
// =============================================================================

/// Field order matters for Drop: the context must go before the window it
/// presents to.
struct App {
    config: Config,
    context: Option<RenderContext>,
    window: Option<Window>,
    init_error: Option<ContextError>,
}

impl App {
    fn new(config: Config) -> Self {
        Self {
            config,
            context: None,
            window: None,
            init_error: None,
        }
    }

    fn init_context(&self, window: &Window) -> Result<RenderContext, ContextError> {
        let context_config = self.config.context_config();
        let shaders = FileShaderSource::new(&self.config.shaders.directory);

        let context = RenderContext::initialize(&context_config, window, &shaders)?;
        log_summary(&context)?;
        Ok(context)
    }

    fn shutdown(&mut self) {
        if let Some(mut context) = self.context.take() {
            if let Err(e) = context.shutdown() {
                log::warn!("Shutdown: {}", e);
            }
        }
    }
}

fn log_summary(context: &RenderContext) -> Result<(), ContextError> {
    let device = context.device()?;
    let swapchain = context.swapchain()?;
    let swapchain_config = context.swapchain_config()?;

    log::info!(
        "GPU {:?} ({:?}): graphics queue {:?} (family {}), present queue {:?} (family {})",
        device.physical_device,
        device.properties.device_type,
        device.graphics_queue,
        device.queues.graphics,
        device.present_queue,
        device.queues.present
    );
    log::info!(
        "Swapchain {:?}: {} images of {:?} at {}x{}, {:?}",
        swapchain.swapchain,
        swapchain.image_count(),
        swapchain.format,
        swapchain.extent.width,
        swapchain.extent.height,
        swapchain_config.present_mode
    );
    log::debug!(
        "Render pass {:?}, pipeline {:?} (layout {:?}), {} framebuffers",
        context.render_pass()?.handle,
        context.pipeline()?.pipeline,
        context.pipeline()?.layout,
        context.framebuffers()?.handles.len()
    );
    Ok(())
}

// =============================================================================
// EVENT HANDLING
// =============================================================================

impl ApplicationHandler for App {
    /// Called when the application is ready to create windows.
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() || self.init_error.is_some() {
            return;
        }

        let window_attributes = WindowAttributes::default()
            .with_title(&self.config.window.title)
            .with_inner_size(winit::dpi::PhysicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ))
            .with_resizable(false);

        let window = match event_loop.create_window(window_attributes) {
            Ok(w) => w,
            Err(e) => {
                log::error!("Failed to create window: {:?}", e);
                event_loop.exit();
                return;
            }
        };

        match self.init_context(&window) {
            Ok(context) => {
                self.context = Some(context);
                self.window = Some(window);
            }
            Err(e) => {
                log::error!(
                    "Initialization failed at stage '{}' ({}): {}",
                    e.stage(),
                    e.code().map_or_else(|| "no driver code".to_string(), |c| format!("{:?}", c)),
                    e
                );
                self.init_error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        if let WindowEvent::CloseRequested = event {
            log::info!("Close requested, shutting down...");
            self.shutdown();
            event_loop.exit();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.shutdown();
    }
}
