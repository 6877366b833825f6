// Physical device selection
//
// Every enumerated GPU is probed once into a `DeviceCandidate` and scored:
// discrete GPUs get a flat bonus, and the largest supported 2D image size is
// added on top. A candidate missing anything we cannot run without scores 0.
// The highest score wins; ties go to the first device enumerated.

use ash::vk;
use std::ffi::CStr;

use super::error::{ContextError, ContextResult};
use super::instance::VulkanInstance;
use super::queues::{find_queue_families, QueueFamilyIndices};
use super::surface::SurfaceSupport;

/// Device extensions a candidate must expose to present to a surface.
pub const REQUIRED_DEVICE_EXTENSIONS: &[&CStr] = &[c"VK_KHR_swapchain"];

const DISCRETE_GPU_BONUS: u32 = 1000;

/// Everything we learned about one physical device. Read-only after probing.
#[derive(Debug, Clone)]
pub struct DeviceCandidate {
    pub handle: vk::PhysicalDevice,
    pub name: String,
    pub properties: vk::PhysicalDeviceProperties,
    pub features: vk::PhysicalDeviceFeatures,
    pub queue_families: QueueFamilyIndices,
    pub extensions_supported: bool,
    /// Only queried once the required extensions are confirmed.
    pub surface_support: Option<SurfaceSupport>,
}

impl DeviceCandidate {
    /// Query `handle` for everything scoring needs.
    pub fn probe(instance: &VulkanInstance, handle: vk::PhysicalDevice) -> ContextResult<Self> {
        let vk_instance = &instance.instance;

        let properties = unsafe { vk_instance.get_physical_device_properties(handle) };
        let features = unsafe { vk_instance.get_physical_device_features(handle) };
        let families = unsafe { vk_instance.get_physical_device_queue_family_properties(handle) };

        let queue_families = find_queue_families(&families, |index| unsafe {
            instance
                .surface_loader
                .get_physical_device_surface_support(handle, index, instance.surface)
        })
        .map_err(ContextError::enumeration("surface support"))?;

        let available = unsafe { vk_instance.enumerate_device_extension_properties(handle) }
            .map_err(ContextError::enumeration("device extensions"))?;
        let available: Vec<&CStr> = available
            .iter()
            .map(|ext| unsafe { CStr::from_ptr(ext.extension_name.as_ptr()) })
            .collect();
        let extensions_supported = supports_required_extensions(&available);

        let surface_support = if extensions_supported {
            Some(SurfaceSupport::query(instance, handle)?)
        } else {
            None
        };

        let name = unsafe { CStr::from_ptr(properties.device_name.as_ptr()) }
            .to_string_lossy()
            .into_owned();

        Ok(Self {
            handle,
            name,
            properties,
            features,
            queue_families,
            extensions_supported,
            surface_support,
        })
    }

    /// Suitability score; 0 means the device cannot be used at all.
    pub fn score(&self) -> u32 {
        if self.features.geometry_shader != vk::TRUE
            || !self.queue_families.is_complete()
            || !self.extensions_supported
        {
            return 0;
        }

        match &self.surface_support {
            Some(support) if support.is_adequate() => {}
            _ => return 0,
        }

        let mut score = 0u32;
        if self.properties.device_type == vk::PhysicalDeviceType::DISCRETE_GPU {
            score += DISCRETE_GPU_BONUS;
        }
        score.saturating_add(self.properties.limits.max_image_dimension2_d)
    }
}

/// True when every entry of `REQUIRED_DEVICE_EXTENSIONS` is in `available`.
pub fn supports_required_extensions(available: &[&CStr]) -> bool {
    REQUIRED_DEVICE_EXTENSIONS
        .iter()
        .all(|required| available.contains(required))
}

/// Index of the best-scoring candidate.
pub fn pick_best(candidates: &[DeviceCandidate]) -> ContextResult<usize> {
    if candidates.is_empty() {
        return Err(ContextError::NoCapableDevice);
    }

    let mut best: Option<(usize, u32)> = None;
    for (index, candidate) in candidates.iter().enumerate() {
        let score = candidate.score();
        log::debug!(
            "GPU candidate {}: {} ({:?}) scored {}",
            index,
            candidate.name,
            candidate.properties.device_type,
            score
        );

        // Strictly greater keeps the first device on ties.
        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((index, score));
        }
    }

    match best {
        Some((index, score)) if score > 0 => Ok(index),
        _ => Err(ContextError::NoSuitableDevice),
    }
}

/// Enumerate, probe and score every GPU, returning the winner.
pub fn select_physical_device(instance: &VulkanInstance) -> ContextResult<DeviceCandidate> {
    let handles = unsafe { instance.instance.enumerate_physical_devices() }
        .map_err(ContextError::enumeration("physical devices"))?;

    if handles.is_empty() {
        return Err(ContextError::NoCapableDevice);
    }

    let mut candidates = handles
        .into_iter()
        .map(|handle| DeviceCandidate::probe(instance, handle))
        .collect::<ContextResult<Vec<_>>>()?;

    let index = pick_best(&candidates)?;
    let chosen = candidates.swap_remove(index);

    log::info!("Selected GPU: {} (score {})", chosen.name, chosen.score());
    log::info!(
        "API Version: {}.{}.{}",
        vk::api_version_major(chosen.properties.api_version),
        vk::api_version_minor(chosen.properties.api_version),
        vk::api_version_patch(chosen.properties.api_version)
    );

    Ok(chosen)
}
