// Backend module - Vulkan bring-up
//
// Design: thin owners around ash handles; each destroys what it created and
// keeps its parent alive through an Arc, so teardown order is structural.

pub mod context;
pub mod device;
pub mod error;
pub mod instance;
pub mod pipeline;
pub mod queues;
pub mod selection;
pub mod shader;
pub mod surface;
pub mod swapchain;

pub use context::{ContextConfig, RenderContext};
pub use device::VulkanDevice;
pub use error::{ContextError, ContextResult};
pub use shader::FileShaderSource;
