// Render context - ordered bring-up and teardown
//
// initialize(): instance + surface -> device selection -> queue resolution
//               -> logical device -> swapchain negotiation -> swapchain
//               -> render pass -> pipeline -> framebuffers
//
// shutdown():   framebuffers -> pipeline -> pipeline layout -> render pass
//               -> image views -> swapchain -> logical device -> surface
//               -> instance
//
// Every failure aborts the whole sequence; whatever was built so far is
// released by the owners' Drop impls in reverse order.

use std::path::PathBuf;
use std::sync::Arc;

use super::error::{ContextError, ContextResult};
use super::instance::VulkanInstance;
use super::pipeline::{Framebuffers, GraphicsPipeline, RenderPass};
use super::selection::select_physical_device;
use super::shader::{load_spirv, ShaderModule, ShaderSource};
use super::surface::{negotiate, SwapchainConfig};
use super::swapchain::Swapchain;
use super::VulkanDevice;
use crate::window::PresentationTarget;

/// Immutable settings for bringing up a context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextConfig {
    pub app_name: String,
    pub enable_validation: bool,
    /// Resource paths handed to the `ShaderSource`.
    pub vertex_shader: PathBuf,
    pub fragment_shader: PathBuf,
}

/// Everything derived from the logical device.
///
/// Fields drop top to bottom, which is the required teardown order. The
/// device goes last and takes the surface and instance with it.
struct ContextResources {
    framebuffers: Framebuffers,
    pipeline: GraphicsPipeline,
    render_pass: RenderPass,
    swapchain: Swapchain,
    swapchain_config: SwapchainConfig,
    device: Arc<VulkanDevice>,
}

pub struct RenderContext {
    resources: Option<ContextResources>,
}

impl RenderContext {
    /// Bring up everything needed to issue triangle draws into `target`.
    pub fn initialize(
        config: &ContextConfig,
        target: &dyn PresentationTarget,
        shaders: &dyn ShaderSource,
    ) -> ContextResult<Self> {
        log::info!("Initializing Vulkan...");

        let instance = VulkanInstance::new(config, target)?;

        let candidate = select_physical_device(&instance)?;
        let queues = candidate.queue_families.resolve()?;

        let device = VulkanDevice::new(instance, &candidate, queues)?;

        let support = candidate
            .surface_support
            .as_ref()
            .ok_or(ContextError::Negotiation("selected GPU has no queried surface support"))?;
        let swapchain_config = negotiate(support, queues, target.framebuffer_size())?;

        let swapchain = Swapchain::new(device.clone(), &swapchain_config)?;
        let render_pass = RenderPass::new(device.clone(), swapchain.format)?;

        let vertex_code = load_spirv(shaders, &config.vertex_shader)?;
        let fragment_code = load_spirv(shaders, &config.fragment_shader)?;

        let vertex = ShaderModule::new(&device.device, &vertex_code)?;
        let fragment = ShaderModule::new(&device.device, &fragment_code)?;
        let pipeline = GraphicsPipeline::new(device.clone(), render_pass.handle, &vertex, &fragment);
        // Shader modules are transient: gone before the result is inspected.
        drop(fragment);
        drop(vertex);
        let pipeline = pipeline?;

        let framebuffers = Framebuffers::new(device.clone(), &render_pass, &swapchain)?;

        log::info!(
            "Vulkan initialized successfully! ({} framebuffers)",
            framebuffers.handles.len()
        );

        Ok(Self {
            resources: Some(ContextResources {
                framebuffers,
                pipeline,
                render_pass,
                swapchain,
                swapchain_config,
                device,
            }),
        })
    }

    /// Release every object in reverse dependency order.
    ///
    /// A second call returns `AlreadyShutdown` and touches nothing.
    pub fn shutdown(&mut self) -> ContextResult<()> {
        let resources = release(&mut self.resources)?;
        log::info!("Shutting down render context...");

        if let Err(e) = resources.device.wait_idle() {
            log::warn!("Device wait failed before shutdown: {}", e);
        }
        drop(resources);

        log::info!("Render context shut down");
        Ok(())
    }

    pub fn is_shut_down(&self) -> bool {
        self.resources.is_none()
    }

    fn resources(&self) -> ContextResult<&ContextResources> {
        self.resources.as_ref().ok_or(ContextError::AlreadyShutdown)
    }

    pub fn device(&self) -> ContextResult<&Arc<VulkanDevice>> {
        Ok(&self.resources()?.device)
    }

    pub fn swapchain(&self) -> ContextResult<&Swapchain> {
        Ok(&self.resources()?.swapchain)
    }

    pub fn swapchain_config(&self) -> ContextResult<&SwapchainConfig> {
        Ok(&self.resources()?.swapchain_config)
    }

    pub fn render_pass(&self) -> ContextResult<&RenderPass> {
        Ok(&self.resources()?.render_pass)
    }

    pub fn pipeline(&self) -> ContextResult<&GraphicsPipeline> {
        Ok(&self.resources()?.pipeline)
    }

    pub fn framebuffers(&self) -> ContextResult<&Framebuffers> {
        Ok(&self.resources()?.framebuffers)
    }
}

impl Drop for RenderContext {
    fn drop(&mut self) {
        if !self.is_shut_down() {
            let _ = self.shutdown();
        }
    }
}

/// Take ownership out of `slot` exactly once.
fn release<T>(slot: &mut Option<T>) -> ContextResult<T> {
    slot.take().ok_or(ContextError::AlreadyShutdown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Tracked {
        name: &'static str,
        log: Rc<RefCell<Vec<&'static str>>>,
    }

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.log.borrow_mut().push(self.name);
        }
    }

    #[test]
    fn second_release_is_already_shutdown() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut slot = Some(Tracked {
            name: "context",
            log: log.clone(),
        });

        drop(release(&mut slot).unwrap());
        assert!(matches!(release(&mut slot), Err(ContextError::AlreadyShutdown)));
        assert_eq!(*log.borrow(), vec!["context"]);
    }

    #[test]
    fn owners_drop_in_declaration_order() {
        // Same shape as ContextResources: dependents first, device last.
        struct Resources {
            _framebuffers: Tracked,
            _pipeline: Tracked,
            _render_pass: Tracked,
            _swapchain: Tracked,
            _device: Tracked,
        }

        let log = Rc::new(RefCell::new(Vec::new()));
        let track = |name| Tracked {
            name,
            log: log.clone(),
        };
        let mut slot = Some(Resources {
            _device: track("device"),
            _swapchain: track("swapchain"),
            _render_pass: track("render pass"),
            _pipeline: track("pipeline"),
            _framebuffers: track("framebuffers"),
        });

        drop(release(&mut slot).unwrap());
        assert_eq!(
            *log.borrow(),
            vec!["framebuffers", "pipeline", "render pass", "swapchain", "device"]
        );
        assert!(release(&mut slot).is_err());
        assert_eq!(log.borrow().len(), 5);
    }
}
