//! Physical device (GPU) selection.
//!
//! A device qualifies when it has:
//! 1. a graphics queue family and a family that can present to the surface
//! 2. the `VK_KHR_swapchain` device extension
//! 3. at least one surface format and one present mode for the surface
//!
//! Among qualifying devices, discrete GPUs win over integrated ones.

use std::ffi::CStr;

use ash::vk;
use tracing::{debug, info, warn};

use crate::error::{RhiError, RhiResult};
use crate::instance::missing_names;
use crate::swapchain::SwapchainSupportDetails;

/// Device extensions every selected GPU must support.
pub const REQUIRED_DEVICE_EXTENSIONS: [&CStr; 1] = [ash::khr::swapchain::NAME];

/// Queue family indices used by the renderer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    /// Family that supports graphics operations.
    pub graphics_family: Option<u32>,
    /// Family that can present to the surface.
    pub present_family: Option<u32>,
}

impl QueueFamilyIndices {
    /// Picks graphics and present families from a device's family list.
    ///
    /// A family that does both is preferred, so graphics and present share
    /// one queue whenever the hardware allows it.
    pub fn find(
        families: &[vk::QueueFamilyProperties],
        supports_present: impl Fn(u32) -> bool,
    ) -> Self {
        let mut indices = Self::default();

        for (i, family) in families.iter().enumerate() {
            let i = i as u32;
            if family.queue_count == 0 {
                continue;
            }

            let graphics = family.queue_flags.contains(vk::QueueFlags::GRAPHICS);
            let present = supports_present(i);

            if graphics && present {
                return Self {
                    graphics_family: Some(i),
                    present_family: Some(i),
                };
            }
            if graphics && indices.graphics_family.is_none() {
                indices.graphics_family = Some(i);
            }
            if present && indices.present_family.is_none() {
                indices.present_family = Some(i);
            }
        }

        indices
    }

    /// True when both graphics and present families were found.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.graphics_family.is_some() && self.present_family.is_some()
    }

    /// Distinct family indices, graphics first.
    pub fn unique_families(&self) -> Vec<u32> {
        let mut families = Vec::with_capacity(2);

        if let Some(graphics) = self.graphics_family {
            families.push(graphics);
        }
        if let Some(present) = self.present_family
            && !families.contains(&present)
        {
            families.push(present);
        }

        families
    }
}

/// A selected GPU and the queue families the renderer will use.
#[derive(Clone)]
pub struct PhysicalDeviceInfo {
    /// Vulkan physical device handle.
    pub device: vk::PhysicalDevice,
    /// Device properties (name, limits, API version, etc.).
    pub properties: vk::PhysicalDeviceProperties,
    /// Queue families chosen for graphics and present.
    pub queue_families: QueueFamilyIndices,
}

impl PhysicalDeviceInfo {
    /// Returns the device name as a string.
    pub fn device_name(&self) -> &str {
        self.properties
            .device_name_as_c_str()
            .ok()
            .and_then(|name| name.to_str().ok())
            .unwrap_or("Unknown Device")
    }

    /// Returns a human-readable string for the device type.
    pub fn device_type_name(&self) -> &'static str {
        match self.properties.device_type {
            vk::PhysicalDeviceType::DISCRETE_GPU => "Discrete GPU",
            vk::PhysicalDeviceType::INTEGRATED_GPU => "Integrated GPU",
            vk::PhysicalDeviceType::VIRTUAL_GPU => "Virtual GPU",
            vk::PhysicalDeviceType::CPU => "CPU",
            _ => "Other",
        }
    }

    /// Returns the Vulkan API version supported by the device.
    pub fn api_version(&self) -> (u32, u32, u32) {
        let version = self.properties.api_version;
        (
            vk::api_version_major(version),
            vk::api_version_minor(version),
            vk::api_version_patch(version),
        )
    }
}

impl std::fmt::Debug for PhysicalDeviceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (major, minor, patch) = self.api_version();
        f.debug_struct("PhysicalDeviceInfo")
            .field("name", &self.device_name())
            .field("type", &self.device_type_name())
            .field("api_version", &format!("{}.{}.{}", major, minor, patch))
            .field("queue_families", &self.queue_families)
            .finish()
    }
}

/// Selects the most suitable physical device for presenting to `surface`.
///
/// # Errors
///
/// Returns [`RhiError::NoSuitableGpu`] if no GPU meets the requirements.
pub fn select_physical_device(
    instance: &ash::Instance,
    surface: vk::SurfaceKHR,
    surface_loader: &ash::khr::surface::Instance,
) -> RhiResult<PhysicalDeviceInfo> {
    let devices = unsafe { instance.enumerate_physical_devices()? };

    if devices.is_empty() {
        warn!("No Vulkan-capable GPUs found");
        return Err(RhiError::NoSuitableGpu);
    }

    info!("Found {} GPU(s)", devices.len());

    let selected = devices
        .into_iter()
        .filter_map(|device| check_device_suitability(instance, device, surface, surface_loader))
        .max_by_key(|info| device_type_score(info.properties.device_type))
        .ok_or_else(|| {
            warn!("No suitable GPU found with required capabilities");
            RhiError::NoSuitableGpu
        })?;

    let (major, minor, patch) = selected.api_version();
    info!(
        "GPU: '{}' ({}) - Vulkan {}.{}.{}",
        selected.device_name(),
        selected.device_type_name(),
        major,
        minor,
        patch
    );

    Ok(selected)
}

fn check_device_suitability(
    instance: &ash::Instance,
    device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    surface_loader: &ash::khr::surface::Instance,
) -> Option<PhysicalDeviceInfo> {
    let properties = unsafe { instance.get_physical_device_properties(device) };
    let device_name = properties
        .device_name_as_c_str()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "Unknown".to_string());

    let family_properties = unsafe { instance.get_physical_device_queue_family_properties(device) };
    debug!(
        "GPU '{}': {} queue families",
        device_name,
        family_properties.len()
    );

    let queue_families = QueueFamilyIndices::find(&family_properties, |i| unsafe {
        surface_loader
            .get_physical_device_surface_support(device, i, surface)
            .unwrap_or(false)
    });

    if !queue_families.is_complete() {
        debug!(
            "GPU '{}' skipped: missing required queue families (graphics={}, present={})",
            device_name,
            queue_families.graphics_family.is_some(),
            queue_families.present_family.is_some()
        );
        return None;
    }

    let extensions = match unsafe { instance.enumerate_device_extension_properties(device) } {
        Ok(extensions) => extensions,
        Err(e) => {
            debug!("GPU '{}' skipped: cannot enumerate extensions: {}", device_name, e);
            return None;
        }
    };
    let extension_names: Vec<&CStr> = extensions
        .iter()
        .filter_map(|ext| ext.extension_name_as_c_str().ok())
        .collect();
    let missing = missing_names(&REQUIRED_DEVICE_EXTENSIONS, &extension_names);
    if !missing.is_empty() {
        debug!(
            "GPU '{}' skipped: missing extensions {:?}",
            device_name, missing
        );
        return None;
    }

    match SwapchainSupportDetails::query(device, surface, surface_loader) {
        Ok(support) if support.is_adequate() => {}
        Ok(_) => {
            debug!("GPU '{}' skipped: no surface formats or present modes", device_name);
            return None;
        }
        Err(e) => {
            debug!("GPU '{}' skipped: surface query failed: {}", device_name, e);
            return None;
        }
    }

    Some(PhysicalDeviceInfo {
        device,
        properties,
        queue_families,
    })
}

/// Preference order for device types; higher is better.
fn device_type_score(device_type: vk::PhysicalDeviceType) -> u32 {
    match device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => 4,
        vk::PhysicalDeviceType::INTEGRATED_GPU => 3,
        vk::PhysicalDeviceType::VIRTUAL_GPU => 2,
        vk::PhysicalDeviceType::CPU => 1,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family(flags: vk::QueueFlags, count: u32) -> vk::QueueFamilyProperties {
        vk::QueueFamilyProperties {
            queue_flags: flags,
            queue_count: count,
            ..Default::default()
        }
    }

    #[test]
    fn test_queue_family_indices_default() {
        let indices = QueueFamilyIndices::default();
        assert!(indices.graphics_family.is_none());
        assert!(indices.present_family.is_none());
        assert!(!indices.is_complete());
    }

    #[test]
    fn test_find_shared_family() {
        let families = [
            family(vk::QueueFlags::TRANSFER, 2),
            family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE, 16),
        ];
        let indices = QueueFamilyIndices::find(&families, |_| true);
        assert_eq!(indices.graphics_family, Some(1));
        assert_eq!(indices.present_family, Some(1));
        assert_eq!(indices.unique_families(), vec![1]);
    }

    #[test]
    fn test_find_prefers_family_doing_both() {
        // Family 0 graphics only, family 1 present only, family 2 both.
        let families = [
            family(vk::QueueFlags::GRAPHICS, 1),
            family(vk::QueueFlags::COMPUTE, 1),
            family(vk::QueueFlags::GRAPHICS, 1),
        ];
        let indices = QueueFamilyIndices::find(&families, |i| i != 0);
        assert_eq!(indices.graphics_family, Some(2));
        assert_eq!(indices.present_family, Some(2));
    }

    #[test]
    fn test_find_separate_families() {
        let families = [
            family(vk::QueueFlags::GRAPHICS, 1),
            family(vk::QueueFlags::TRANSFER, 1),
        ];
        let indices = QueueFamilyIndices::find(&families, |i| i == 1);
        assert!(indices.is_complete());
        assert_eq!(indices.unique_families(), vec![0, 1]);
    }

    #[test]
    fn test_find_skips_empty_families() {
        let families = [
            family(vk::QueueFlags::GRAPHICS, 0),
            family(vk::QueueFlags::GRAPHICS, 4),
        ];
        let indices = QueueFamilyIndices::find(&families, |_| true);
        assert_eq!(indices.graphics_family, Some(1));
    }

    #[test]
    fn test_find_without_present_is_incomplete() {
        let families = [family(vk::QueueFlags::GRAPHICS, 1)];
        let indices = QueueFamilyIndices::find(&families, |_| false);
        assert_eq!(indices.graphics_family, Some(0));
        assert!(!indices.is_complete());
    }

    #[test]
    fn test_device_type_preference() {
        assert!(
            device_type_score(vk::PhysicalDeviceType::DISCRETE_GPU)
                > device_type_score(vk::PhysicalDeviceType::INTEGRATED_GPU)
        );
        assert!(
            device_type_score(vk::PhysicalDeviceType::INTEGRATED_GPU)
                > device_type_score(vk::PhysicalDeviceType::CPU)
        );
        assert_eq!(device_type_score(vk::PhysicalDeviceType::OTHER), 0);
    }

    #[test]
    fn test_required_extensions_contains_swapchain() {
        assert_eq!(REQUIRED_DEVICE_EXTENSIONS[0], c"VK_KHR_swapchain");
    }
}
