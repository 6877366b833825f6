// Error taxonomy for context bring-up
//
// Every variant aborts initialization. `stage()` names the step that failed
// and `code()` exposes the driver's result code when there is one.

use ash::vk;
use std::path::PathBuf;
use thiserror::Error;

pub type ContextResult<T> = std::result::Result<T, ContextError>;

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("failed to load the Vulkan library: {0}")]
    Loading(#[from] ash::LoadingError),

    #[error("validation layers requested, but {0} is not available")]
    ValidationLayersUnavailable(&'static str),

    #[error("failed to create Vulkan instance: {0}")]
    InstanceCreation(vk::Result),

    #[error("failed to create window surface: {0}")]
    SurfaceCreation(vk::Result),

    #[error("failed to enumerate {what}: {source}")]
    Enumeration {
        what: &'static str,
        source: vk::Result,
    },

    #[error("failed to find GPUs with Vulkan support")]
    NoCapableDevice,

    #[error("failed to find a suitable GPU")]
    NoSuitableDevice,

    #[error("selected GPU lacks a {missing} queue family")]
    IncompleteQueueLayout { missing: &'static str },

    #[error("surface negotiation failed: {0}")]
    Negotiation(&'static str),

    #[error("failed to create logical device: {0}")]
    DeviceCreation(vk::Result),

    #[error("failed to create swapchain: {0}")]
    SwapchainCreation(vk::Result),

    #[error("failed to create swapchain image view: {0}")]
    ImageViewCreation(vk::Result),

    #[error(transparent)]
    ShaderLoad(#[from] ShaderLoadError),

    #[error("failed to create shader module: {0}")]
    ShaderModuleCreation(vk::Result),

    #[error("failed to create render pass: {0}")]
    RenderPassCreation(vk::Result),

    #[error("failed to create pipeline layout: {0}")]
    PipelineLayout(vk::Result),

    #[error("failed to create graphics pipeline: {0}")]
    PipelineCreation(vk::Result),

    #[error("failed to create framebuffer: {0}")]
    FramebufferCreation(vk::Result),

    #[error("render context was already shut down")]
    AlreadyShutdown,
}

impl ContextError {
    /// Initialization stage this error belongs to, for user-facing reports.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Loading(_) | Self::ValidationLayersUnavailable(_) | Self::InstanceCreation(_) => {
                "instance"
            }
            Self::SurfaceCreation(_) => "surface",
            Self::Enumeration { .. } | Self::NoCapableDevice | Self::NoSuitableDevice => {
                "device selection"
            }
            Self::IncompleteQueueLayout { .. } => "queue resolution",
            Self::DeviceCreation(_) => "logical device",
            Self::Negotiation(_) => "swapchain negotiation",
            Self::SwapchainCreation(_) | Self::ImageViewCreation(_) => "swapchain",
            Self::ShaderLoad(_) | Self::ShaderModuleCreation(_) => "shader modules",
            Self::RenderPassCreation(_) => "render pass",
            Self::PipelineLayout(_) | Self::PipelineCreation(_) => "graphics pipeline",
            Self::FramebufferCreation(_) => "framebuffers",
            Self::AlreadyShutdown => "shutdown",
        }
    }

    /// Backend-provided diagnostic code, if the driver produced one.
    pub fn code(&self) -> Option<vk::Result> {
        match *self {
            Self::InstanceCreation(r)
            | Self::SurfaceCreation(r)
            | Self::DeviceCreation(r)
            | Self::SwapchainCreation(r)
            | Self::ImageViewCreation(r)
            | Self::ShaderModuleCreation(r)
            | Self::RenderPassCreation(r)
            | Self::PipelineLayout(r)
            | Self::PipelineCreation(r)
            | Self::FramebufferCreation(r) => Some(r),
            Self::Enumeration { source, .. } => Some(source),
            _ => None,
        }
    }

    pub(crate) fn enumeration(what: &'static str) -> impl FnOnce(vk::Result) -> Self {
        move |source| Self::Enumeration { what, source }
    }
}

/// Failures of the shader-bytecode loader.
#[derive(Debug, Error)]
pub enum ShaderLoadError {
    #[error("shader not found: {0}")]
    ResourceNotFound(PathBuf),

    #[error("failed to read shader {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{path} is not valid SPIR-V: {source}")]
    InvalidBytecode {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_errors_report_stage_and_code() {
        let err = ContextError::SwapchainCreation(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY);
        assert_eq!(err.stage(), "swapchain");
        assert_eq!(err.code(), Some(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY));

        let err = ContextError::enumeration("physical devices")(vk::Result::ERROR_INITIALIZATION_FAILED);
        assert_eq!(err.stage(), "device selection");
        assert_eq!(err.code(), Some(vk::Result::ERROR_INITIALIZATION_FAILED));
        assert!(err.to_string().contains("physical devices"));
    }

    #[test]
    fn selection_errors_carry_no_code() {
        assert_eq!(ContextError::NoSuitableDevice.code(), None);
        assert_eq!(ContextError::AlreadyShutdown.stage(), "shutdown");
        let err = ContextError::IncompleteQueueLayout { missing: "present" };
        assert_eq!(err.to_string(), "selected GPU lacks a present queue family");
    }
}
