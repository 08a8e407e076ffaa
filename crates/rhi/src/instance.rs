//! Vulkan instance management.
//!
//! This module handles VkInstance creation, extension and layer support
//! checks, and the debug messenger that forwards validation output to
//! `tracing`.
//!
//! # Example
//!
//! ```no_run
//! use triangle_rhi::instance::Instance;
//!
//! # fn example() -> Result<(), triangle_rhi::RhiError> {
//! let surface_extensions = [ash::khr::surface::NAME];
//! let instance = Instance::new(cfg!(debug_assertions), &surface_extensions)?;
//! let vk_instance = instance.handle();
//! # Ok(())
//! # }
//! ```

use std::borrow::Cow;
use std::ffi::{CStr, c_char};

use ash::{Entry, vk};
use tracing::{debug, error, info, trace, warn};

use crate::error::{RhiError, RhiResult};

/// The Khronos validation layer name.
pub const VALIDATION_LAYER_NAME: &CStr = c"VK_LAYER_KHRONOS_validation";

const APPLICATION_NAME: &CStr = c"Hello Triangle";
const ENGINE_NAME: &CStr = c"No Engine";

/// Vulkan instance with optional validation support.
///
/// Owns the loader entry, the instance and, when validation is on, the debug
/// messenger. Dropping destroys the messenger before the instance.
pub struct Instance {
    entry: Entry,
    instance: ash::Instance,
    debug_utils: Option<ash::ext::debug_utils::Instance>,
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
}

impl Instance {
    /// Creates a Vulkan 1.0 instance.
    ///
    /// # Arguments
    ///
    /// * `enable_validation` - Enable `VK_LAYER_KHRONOS_validation` and the
    ///   debug messenger
    /// * `surface_extensions` - Instance extensions required by the window
    ///   system
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the Vulkan library cannot be loaded
    /// - a required extension is not available ([`RhiError::MissingExtensions`])
    /// - validation is requested but the layer is not installed
    ///   ([`RhiError::MissingLayer`])
    /// - instance or debug messenger creation fails
    pub fn new(enable_validation: bool, surface_extensions: &[&CStr]) -> RhiResult<Self> {
        // SAFETY: the loaded library stays alive inside `Entry` for as long as
        // this instance exists.
        let entry = unsafe { Entry::load()? };

        let mut required: Vec<&CStr> = surface_extensions.to_vec();
        if enable_validation {
            required.push(ash::ext::debug_utils::NAME);
        }

        let available = unsafe { entry.enumerate_instance_extension_properties(None)? };
        let available_names: Vec<&CStr> = available
            .iter()
            .filter_map(|ext| ext.extension_name_as_c_str().ok())
            .collect();

        debug!("Available instance extensions:");
        for name in &available_names {
            debug!("\t{}", name.to_string_lossy());
        }

        let missing = missing_names(&required, &available_names);
        if !missing.is_empty() {
            return Err(RhiError::MissingExtensions(missing));
        }
        info!("Instance extension support validated");

        if enable_validation {
            let layers = unsafe { entry.enumerate_instance_layer_properties()? };
            let layer_names: Vec<&CStr> = layers
                .iter()
                .filter_map(|layer| layer.layer_name_as_c_str().ok())
                .collect();
            if !missing_names(&[VALIDATION_LAYER_NAME], &layer_names).is_empty() {
                return Err(RhiError::MissingLayer(
                    VALIDATION_LAYER_NAME.to_string_lossy().into_owned(),
                ));
            }
            info!("Validation layer support validated");
        }

        let app_info = vk::ApplicationInfo::default()
            .application_name(APPLICATION_NAME)
            .application_version(vk::make_api_version(0, 1, 0, 0))
            .engine_name(ENGINE_NAME)
            .engine_version(vk::make_api_version(0, 1, 0, 0))
            .api_version(vk::API_VERSION_1_0);

        let extension_ptrs: Vec<*const c_char> = required.iter().map(|name| name.as_ptr()).collect();
        let layer_ptrs: Vec<*const c_char> = if enable_validation {
            vec![VALIDATION_LAYER_NAME.as_ptr()]
        } else {
            Vec::new()
        };

        // Chained into instance creation so create/destroy are covered too.
        let mut messenger_info = debug_messenger_create_info();

        let mut create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_extension_names(&extension_ptrs)
            .enabled_layer_names(&layer_ptrs);
        if enable_validation {
            create_info = create_info.push_next(&mut messenger_info);
        }

        let instance = unsafe { entry.create_instance(&create_info, None)? };

        info!("Vulkan instance created (API version 1.0)");

        let (debug_utils, debug_messenger) = if enable_validation {
            let debug_utils = ash::ext::debug_utils::Instance::new(&entry, &instance);
            let messenger_info = debug_messenger_create_info();
            let messenger =
                match unsafe { debug_utils.create_debug_utils_messenger(&messenger_info, None) } {
                    Ok(messenger) => messenger,
                    Err(e) => {
                        unsafe { instance.destroy_instance(None) };
                        return Err(e.into());
                    }
                };
            info!("Debug messenger created");
            (Some(debug_utils), Some(messenger))
        } else {
            (None, None)
        };

        Ok(Self {
            entry,
            instance,
            debug_utils,
            debug_messenger,
        })
    }

    /// Returns the Vulkan instance handle.
    #[inline]
    pub fn handle(&self) -> &ash::Instance {
        &self.instance
    }

    /// Returns the Vulkan entry point loader.
    #[inline]
    pub fn entry(&self) -> &Entry {
        &self.entry
    }

    /// Returns whether the debug messenger is active.
    #[inline]
    pub fn has_validation(&self) -> bool {
        self.debug_messenger.is_some()
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        unsafe {
            if let (Some(debug_utils), Some(messenger)) = (&self.debug_utils, self.debug_messenger)
            {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }
            self.instance.destroy_instance(None);
        }
        info!("Vulkan instance destroyed");
    }
}

/// Names from `required` that do not appear in `available`, in order.
pub fn missing_names(required: &[&CStr], available: &[&CStr]) -> Vec<String> {
    required
        .iter()
        .filter(|name| !available.contains(name))
        .map(|name| name.to_string_lossy().into_owned())
        .collect()
}

fn debug_messenger_create_info<'a>() -> vk::DebugUtilsMessengerCreateInfoEXT<'a> {
    vk::DebugUtilsMessengerCreateInfoEXT::default()
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
        .pfn_user_callback(Some(debug_callback))
}

fn message_type_name(message_type: vk::DebugUtilsMessageTypeFlagsEXT) -> &'static str {
    if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION) {
        "Validation"
    } else if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
        "Performance"
    } else if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::GENERAL) {
        "General"
    } else {
        "Unknown"
    }
}

/// Forwards validation layer messages to `tracing`.
///
/// # Safety
///
/// Called by the Vulkan loader with a callback data pointer that is either
/// null or valid for the duration of the call.
unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() {
        return vk::FALSE;
    }

    let callback_data = unsafe { &*p_callback_data };
    let message = if callback_data.p_message.is_null() {
        Cow::Borrowed("(no message)")
    } else {
        unsafe { CStr::from_ptr(callback_data.p_message).to_string_lossy() }
    };

    let type_str = message_type_name(message_type);

    match message_severity {
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR => error!("[Vulkan {}] {}", type_str, message),
        vk::DebugUtilsMessageSeverityFlagsEXT::WARNING => warn!("[Vulkan {}] {}", type_str, message),
        vk::DebugUtilsMessageSeverityFlagsEXT::INFO => info!("[Vulkan {}] {}", type_str, message),
        _ => trace!("[Vulkan {}] {}", type_str, message),
    }

    vk::FALSE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_names_none_missing() {
        let available = [c"VK_KHR_surface", c"VK_KHR_xlib_surface", c"VK_EXT_debug_utils"];
        let required = [c"VK_KHR_surface", c"VK_EXT_debug_utils"];
        assert!(missing_names(&required, &available).is_empty());
    }

    #[test]
    fn test_missing_names_reports_in_order() {
        let available = [c"VK_KHR_surface"];
        let required = [c"VK_KHR_wayland_surface", c"VK_KHR_surface", c"VK_EXT_debug_utils"];
        assert_eq!(
            missing_names(&required, &available),
            vec!["VK_KHR_wayland_surface", "VK_EXT_debug_utils"]
        );
    }

    #[test]
    fn test_missing_validation_layer() {
        let layers = [c"VK_LAYER_MESA_device_select"];
        assert_eq!(
            missing_names(&[VALIDATION_LAYER_NAME], &layers),
            vec!["VK_LAYER_KHRONOS_validation"]
        );
    }

    #[test]
    fn test_message_type_name() {
        assert_eq!(
            message_type_name(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION),
            "Validation"
        );
        assert_eq!(
            message_type_name(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE
            ),
            "Performance"
        );
        assert_eq!(
            message_type_name(vk::DebugUtilsMessageTypeFlagsEXT::empty()),
            "Unknown"
        );
    }

    #[test]
    fn test_instance_creation_without_validation() {
        // Needs a Vulkan loader and driver; skipped when either is absent.
        match Instance::new(false, &[]) {
            Ok(instance) => assert!(!instance.has_validation()),
            Err(RhiError::LoadingError(_)) | Err(RhiError::VulkanError(_)) => {
                eprintln!("Skipping test: Vulkan not available");
            }
            Err(e) => panic!("Unexpected error: {:?}", e),
        }
    }
}
