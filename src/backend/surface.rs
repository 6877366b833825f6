// Presentation negotiation
//
// Turns what a device reports for the surface (capabilities, formats,
// present modes) into one concrete swapchain configuration. Everything in
// here except `SurfaceSupport::query` is pure.

use ash::vk;

use super::error::{ContextError, ContextResult};
use super::instance::VulkanInstance;
use super::queues::ResolvedQueues;

/// Surface support as reported by one physical device.
#[derive(Debug, Clone, Default)]
pub struct SurfaceSupport {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SurfaceSupport {
    pub fn query(instance: &VulkanInstance, physical_device: vk::PhysicalDevice) -> ContextResult<Self> {
        let loader = &instance.surface_loader;
        let surface = instance.surface;

        unsafe {
            Ok(Self {
                capabilities: loader
                    .get_physical_device_surface_capabilities(physical_device, surface)
                    .map_err(ContextError::enumeration("surface capabilities"))?,
                formats: loader
                    .get_physical_device_surface_formats(physical_device, surface)
                    .map_err(ContextError::enumeration("surface formats"))?,
                present_modes: loader
                    .get_physical_device_surface_present_modes(physical_device, surface)
                    .map_err(ContextError::enumeration("present modes"))?,
            })
        }
    }

    /// A swapchain can only be built with at least one format and one mode.
    pub fn is_adequate(&self) -> bool {
        !self.formats.is_empty() && !self.present_modes.is_empty()
    }
}

/// How swapchain images are shared between queue families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSharing {
    Exclusive,
    /// Concurrent access over exactly the graphics and present families.
    Concurrent([u32; 2]),
}

impl ImageSharing {
    pub fn for_queues(queues: ResolvedQueues) -> Self {
        if queues.is_shared() {
            Self::Exclusive
        } else {
            Self::Concurrent([queues.graphics, queues.present])
        }
    }

    pub fn mode(&self) -> vk::SharingMode {
        match self {
            Self::Exclusive => vk::SharingMode::EXCLUSIVE,
            Self::Concurrent(_) => vk::SharingMode::CONCURRENT,
        }
    }

    pub fn queue_family_indices(&self) -> &[u32] {
        match self {
            Self::Exclusive => &[],
            Self::Concurrent(families) => families,
        }
    }
}

/// Negotiated swapchain parameters. Stale once the surface or window changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainConfig {
    pub format: vk::SurfaceFormatKHR,
    pub present_mode: vk::PresentModeKHR,
    pub extent: vk::Extent2D,
    pub image_count: u32,
    pub sharing: ImageSharing,
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
}

/// Derive the swapchain configuration for `support`.
pub fn negotiate(
    support: &SurfaceSupport,
    queues: ResolvedQueues,
    framebuffer_size: vk::Extent2D,
) -> ContextResult<SwapchainConfig> {
    let format = choose_surface_format(&support.formats)
        .ok_or(ContextError::Negotiation("device reports no surface formats"))?;
    if support.present_modes.is_empty() {
        return Err(ContextError::Negotiation("device reports no present modes"));
    }

    let caps = &support.capabilities;
    let config = SwapchainConfig {
        format,
        present_mode: choose_present_mode(&support.present_modes),
        extent: choose_extent(caps, framebuffer_size),
        image_count: choose_image_count(caps),
        sharing: ImageSharing::for_queues(queues),
        pre_transform: caps.current_transform,
    };

    log::info!(
        "Negotiated swapchain: {:?}/{:?}, {:?}, {}x{}, {} images, {:?}",
        config.format.format,
        config.format.color_space,
        config.present_mode,
        config.extent.width,
        config.extent.height,
        config.image_count,
        config.sharing.mode()
    );

    Ok(config)
}

/// BGRA8 sRGB with the non-linear sRGB color space if offered, else whatever
/// the device lists first.
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    formats
        .iter()
        .find(|f| {
            f.format == vk::Format::B8G8R8A8_SRGB && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        })
        .or_else(|| formats.first())
        .copied()
}

/// MAILBOX when available, otherwise FIFO (the only mode guaranteed to exist).
pub fn choose_present_mode(present_modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    present_modes
        .iter()
        .copied()
        .find(|&mode| mode == vk::PresentModeKHR::MAILBOX)
        .unwrap_or(vk::PresentModeKHR::FIFO)
}

/// The surface dictates the extent unless it reports `u32::MAX`, in which
/// case the framebuffer size is clamped to the supported range per axis.
pub fn choose_extent(caps: &vk::SurfaceCapabilitiesKHR, framebuffer_size: vk::Extent2D) -> vk::Extent2D {
    if caps.current_extent.width != u32::MAX {
        return caps.current_extent;
    }

    vk::Extent2D {
        width: framebuffer_size
            .width
            .clamp(caps.min_image_extent.width, caps.max_image_extent.width),
        height: framebuffer_size
            .height
            .clamp(caps.min_image_extent.height, caps.max_image_extent.height),
    }
}

/// One image above the minimum; a maximum of 0 means unbounded.
pub fn choose_image_count(caps: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let count = caps.min_image_count + 1;
    if caps.max_image_count > 0 {
        count.min(caps.max_image_count)
    } else {
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BGRA_SRGB: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
        format: vk::Format::B8G8R8A8_SRGB,
        color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
    };
    const RGBA_UNORM: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
        format: vk::Format::R8G8B8A8_UNORM,
        color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
    };

    fn caps(min: u32, max: u32) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            min_image_count: min,
            max_image_count: max,
            current_extent: vk::Extent2D { width: u32::MAX, height: u32::MAX },
            min_image_extent: vk::Extent2D { width: 1, height: 1 },
            max_image_extent: vk::Extent2D { width: 4096, height: 4096 },
            current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
            ..Default::default()
        }
    }

    fn support() -> SurfaceSupport {
        SurfaceSupport {
            capabilities: caps(2, 0),
            formats: vec![RGBA_UNORM, BGRA_SRGB],
            present_modes: vec![vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX],
        }
    }

    #[test]
    fn preferred_format_wins_regardless_of_order() {
        assert_eq!(choose_surface_format(&[RGBA_UNORM, BGRA_SRGB]), Some(BGRA_SRGB));
        assert_eq!(choose_surface_format(&[BGRA_SRGB, RGBA_UNORM]), Some(BGRA_SRGB));
    }

    #[test]
    fn format_falls_back_to_first_entry() {
        let linear_bgra = vk::SurfaceFormatKHR {
            format: vk::Format::B8G8R8A8_SRGB,
            color_space: vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT,
        };
        assert_eq!(choose_surface_format(&[RGBA_UNORM, linear_bgra]), Some(RGBA_UNORM));
        assert_eq!(choose_surface_format(&[]), None);
    }

    #[test]
    fn mailbox_preferred_over_fifo() {
        let modes = [vk::PresentModeKHR::IMMEDIATE, vk::PresentModeKHR::MAILBOX];
        assert_eq!(choose_present_mode(&modes), vk::PresentModeKHR::MAILBOX);

        let modes = [vk::PresentModeKHR::IMMEDIATE, vk::PresentModeKHR::FIFO_RELAXED];
        assert_eq!(choose_present_mode(&modes), vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn sentinel_extent_clamps_each_axis() {
        let extent = choose_extent(&caps(2, 0), vk::Extent2D { width: 8000, height: 10 });
        assert_eq!(extent, vk::Extent2D { width: 4096, height: 10 });

        let extent = choose_extent(&caps(2, 0), vk::Extent2D { width: 0, height: 0 });
        assert_eq!(extent, vk::Extent2D { width: 1, height: 1 });
    }

    #[test]
    fn fixed_extent_is_used_verbatim() {
        let mut fixed = caps(2, 0);
        fixed.current_extent = vk::Extent2D { width: 800, height: 600 };
        let extent = choose_extent(&fixed, vk::Extent2D { width: 1920, height: 1080 });
        assert_eq!(extent, vk::Extent2D { width: 800, height: 600 });
    }

    #[test]
    fn image_count_respects_maximum() {
        assert_eq!(choose_image_count(&caps(2, 0)), 3);
        assert_eq!(choose_image_count(&caps(2, 2)), 2);
        assert_eq!(choose_image_count(&caps(1, 8)), 2);
    }

    #[test]
    fn shared_family_negotiates_exclusive_sharing() {
        let queues = ResolvedQueues { graphics: 0, present: 0 };
        let config = negotiate(&support(), queues, vk::Extent2D { width: 800, height: 600 }).unwrap();

        assert_eq!(config.sharing, ImageSharing::Exclusive);
        assert_eq!(config.sharing.mode(), vk::SharingMode::EXCLUSIVE);
        assert!(config.sharing.queue_family_indices().is_empty());
        assert_eq!(config.format, BGRA_SRGB);
        assert_eq!(config.present_mode, vk::PresentModeKHR::MAILBOX);
        assert_eq!(config.extent, vk::Extent2D { width: 800, height: 600 });
        assert_eq!(config.image_count, 3);
    }

    #[test]
    fn distinct_families_negotiate_concurrent_sharing() {
        let queues = ResolvedQueues { graphics: 0, present: 2 };
        let config = negotiate(&support(), queues, vk::Extent2D { width: 800, height: 600 }).unwrap();

        assert_eq!(config.sharing.mode(), vk::SharingMode::CONCURRENT);
        assert_eq!(config.sharing.queue_family_indices(), &[0, 2]);
    }

    #[test]
    fn empty_lists_fail_negotiation() {
        let queues = ResolvedQueues { graphics: 0, present: 0 };
        let size = vk::Extent2D { width: 800, height: 600 };

        let mut no_formats = support();
        no_formats.formats.clear();
        assert!(!no_formats.is_adequate());
        assert!(matches!(negotiate(&no_formats, queues, size), Err(ContextError::Negotiation(_))));

        let mut no_modes = support();
        no_modes.present_modes.clear();
        assert!(!no_modes.is_adequate());
        assert!(matches!(negotiate(&no_modes, queues, size), Err(ContextError::Negotiation(_))));
    }
}
