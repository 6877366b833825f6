// Vulkan Instance - loader, instance, validation and the window surface
//
// Responsibilities:
// - Instance creation with the window-system extensions
// - Validation layer check + debug messenger (optional)
// - Surface creation for the presentation target
//
// Dropped last: the surface goes first, then the messenger, then the instance.

use ash::extensions::{ext::DebugUtils, khr::Surface};
use ash::{vk, Entry};
use std::ffi::{CStr, CString};
use std::sync::Arc;

use super::context::ContextConfig;
use super::error::{ContextError, ContextResult};
use crate::window::PresentationTarget;

pub const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

pub struct VulkanInstance {
    pub surface: vk::SurfaceKHR,
    pub surface_loader: Surface,
    debug_utils: Option<(DebugUtils, vk::DebugUtilsMessengerEXT)>,
    pub instance: ash::Instance,
    validation: bool,
    entry: Entry,
}

impl VulkanInstance {
    pub fn new(config: &ContextConfig, target: &dyn PresentationTarget) -> ContextResult<Arc<Self>> {
        log::info!("Creating Vulkan instance: {}", config.app_name);

        let entry = unsafe { Entry::load() }?;

        if config.enable_validation && !Self::validation_layer_supported(&entry)? {
            return Err(ContextError::ValidationLayersUnavailable(
                "VK_LAYER_KHRONOS_validation",
            ));
        }

        let (display_handle, window_handle) = target.surface_handles();
        let instance = Self::create_instance(&entry, config, display_handle)?;
        let surface_loader = Surface::new(&entry, &instance);

        // From here on every early return goes through Drop.
        let mut this = Self {
            surface: vk::SurfaceKHR::null(),
            surface_loader,
            debug_utils: None,
            instance,
            validation: config.enable_validation,
            entry,
        };

        if config.enable_validation {
            this.debug_utils = Some(this.setup_debug_messenger()?);
        }

        this.surface = unsafe {
            ash_window::create_surface(
                &this.entry,
                &this.instance,
                display_handle,
                window_handle,
                None,
            )
        }
        .map_err(ContextError::SurfaceCreation)?;

        Ok(Arc::new(this))
    }

    /// Whether validation layers were enabled on this instance.
    pub fn validation_enabled(&self) -> bool {
        self.validation
    }

    fn validation_layer_supported(entry: &Entry) -> ContextResult<bool> {
        let layers = entry
            .enumerate_instance_layer_properties()
            .map_err(ContextError::enumeration("instance layers"))?;

        let found = layers
            .iter()
            .any(|layer| unsafe { CStr::from_ptr(layer.layer_name.as_ptr()) } == VALIDATION_LAYER);
        Ok(found)
    }

    fn create_instance(
        entry: &Entry,
        config: &ContextConfig,
        display_handle: raw_window_handle::RawDisplayHandle,
    ) -> ContextResult<ash::Instance> {
        // Interior NULs cannot be represented; fall back to an empty name.
        let app_name = CString::new(config.app_name.as_str()).unwrap_or_default();

        let app_info = vk::ApplicationInfo::builder()
            .application_name(&app_name)
            .application_version(vk::make_api_version(0, 1, 0, 0))
            .engine_name(c"No Engine")
            .engine_version(vk::make_api_version(0, 1, 0, 0))
            .api_version(vk::API_VERSION_1_0);

        let mut extensions = ash_window::enumerate_required_extensions(display_handle)
            .map_err(ContextError::enumeration("window-system extensions"))?
            .to_vec();
        if config.enable_validation {
            extensions.push(DebugUtils::name().as_ptr());
        }

        let layer_names = if config.enable_validation {
            vec![VALIDATION_LAYER.as_ptr()]
        } else {
            vec![]
        };

        let create_info = vk::InstanceCreateInfo::builder()
            .application_info(&app_info)
            .enabled_extension_names(&extensions)
            .enabled_layer_names(&layer_names);

        unsafe { entry.create_instance(&create_info, None) }.map_err(ContextError::InstanceCreation)
    }

    fn setup_debug_messenger(&self) -> ContextResult<(DebugUtils, vk::DebugUtilsMessengerEXT)> {
        let debug_utils = DebugUtils::new(&self.entry, &self.instance);

        let create_info = vk::DebugUtilsMessengerCreateInfoEXT::builder()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
                    | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(debug_callback));

        let messenger = unsafe { debug_utils.create_debug_utils_messenger(&create_info, None) }
            .map_err(ContextError::InstanceCreation)?;

        Ok((debug_utils, messenger))
    }
}

impl Drop for VulkanInstance {
    fn drop(&mut self) {
        log::info!("Destroying surface and Vulkan instance...");

        unsafe {
            // Destroying a null surface is a no-op.
            self.surface_loader.destroy_surface(self.surface, None);

            if let Some((debug_utils, messenger)) = self.debug_utils.take() {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }

            self.instance.destroy_instance(None);
        }
    }
}

// Debug callback for validation layers
unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    _message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _p_user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() || (*p_callback_data).p_message.is_null() {
        return vk::FALSE;
    }
    let message = CStr::from_ptr((*p_callback_data).p_message);

    match message_severity {
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR => {
            log::error!("[Vulkan] {}", message.to_string_lossy());
        }
        vk::DebugUtilsMessageSeverityFlagsEXT::WARNING => {
            log::warn!("[Vulkan] {}", message.to_string_lossy());
        }
        _ => {
            log::debug!("[Vulkan] {}", message.to_string_lossy());
        }
    }

    vk::FALSE
}
