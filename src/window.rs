// Window glue - the narrow interface the backend needs from the windowing layer

use ash::vk;
use raw_window_handle::{HasRawDisplayHandle, HasRawWindowHandle, RawDisplayHandle, RawWindowHandle};

/// Anything that can host a Vulkan surface.
pub trait PresentationTarget {
    /// Platform handles used to create the surface and pick instance extensions.
    fn surface_handles(&self) -> (RawDisplayHandle, RawWindowHandle);

    /// Current drawable size in physical pixels.
    fn framebuffer_size(&self) -> vk::Extent2D;
}

impl PresentationTarget for winit::window::Window {
    fn surface_handles(&self) -> (RawDisplayHandle, RawWindowHandle) {
        (self.raw_display_handle(), self.raw_window_handle())
    }

    fn framebuffer_size(&self) -> vk::Extent2D {
        let size = self.inner_size();
        vk::Extent2D {
            width: size.width,
            height: size.height,
        }
    }
}
