// Vulkan Device - logical device and queues
//
// Responsibilities:
// - One queue per unique family (graphics, present)
// - VK_KHR_swapchain enabled
// - Queue handle retrieval
//
// Holds the instance alive: the device is destroyed before the last
// reference to the instance (and with it the surface) goes away.

use ash::prelude::VkResult;
use ash::vk;
use std::sync::Arc;

use super::error::{ContextError, ContextResult};
use super::instance::{VulkanInstance, VALIDATION_LAYER};
use super::queues::ResolvedQueues;
use super::selection::{DeviceCandidate, REQUIRED_DEVICE_EXTENSIONS};

pub struct VulkanDevice {
    pub device: ash::Device,
    pub physical_device: vk::PhysicalDevice,
    pub properties: vk::PhysicalDeviceProperties,

    // Queue handles
    pub queues: ResolvedQueues,
    pub graphics_queue: vk::Queue,
    pub present_queue: vk::Queue,

    pub instance: Arc<VulkanInstance>,
}

impl VulkanDevice {
    pub fn new(
        instance: Arc<VulkanInstance>,
        candidate: &DeviceCandidate,
        queues: ResolvedQueues,
    ) -> ContextResult<Arc<Self>> {
        log::info!(
            "Creating logical device on {} (graphics family {}, present family {})",
            candidate.name,
            queues.graphics,
            queues.present
        );

        let queue_priorities = [1.0];
        let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = queues
            .unique_families()
            .into_iter()
            .map(|family| {
                vk::DeviceQueueCreateInfo::builder()
                    .queue_family_index(family)
                    .queue_priorities(&queue_priorities)
                    .build()
            })
            .collect();

        let extensions: Vec<_> = REQUIRED_DEVICE_EXTENSIONS.iter().map(|ext| ext.as_ptr()).collect();

        // Device layers are ignored by current loaders but older ones still read them.
        let layer_names = if instance.validation_enabled() {
            vec![VALIDATION_LAYER.as_ptr()]
        } else {
            vec![]
        };

        // No optional features are turned on yet.
        let features = vk::PhysicalDeviceFeatures::default();

        let create_info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&extensions)
            .enabled_layer_names(&layer_names)
            .enabled_features(&features);

        let device = unsafe {
            instance
                .instance
                .create_device(candidate.handle, &create_info, None)
        }
        .map_err(ContextError::DeviceCreation)?;

        let graphics_queue = unsafe { device.get_device_queue(queues.graphics, 0) };
        let present_queue = unsafe { device.get_device_queue(queues.present, 0) };

        Ok(Arc::new(Self {
            device,
            physical_device: candidate.handle,
            properties: candidate.properties,
            queues,
            graphics_queue,
            present_queue,
            instance,
        }))
    }

    /// Wait for device to be idle (e.g., before cleanup)
    pub fn wait_idle(&self) -> VkResult<()> {
        unsafe { self.device.device_wait_idle() }
    }
}

impl Drop for VulkanDevice {
    fn drop(&mut self) {
        log::info!("Destroying logical device...");

        if let Err(e) = self.wait_idle() {
            log::warn!("Device wait failed during teardown: {}", e);
        }

        unsafe {
            self.device.destroy_device(None);
        }
    }
}
