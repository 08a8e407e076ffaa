//! Vulkan logical device and queue management.
//!
//! The [`Device`] owns the `VkDevice` plus the graphics and present queues.
//! It is shared through `Arc` by every object that needs to destroy itself
//! against the device, so the device outlives all of them.
//!
//! # Example
//!
//! ```no_run
//! use triangle_rhi::device::Device;
//! use triangle_rhi::instance::Instance;
//! use triangle_rhi::physical_device::select_physical_device;
//! use ash::vk;
//!
//! # fn example(instance: &Instance, surface: vk::SurfaceKHR) -> Result<(), triangle_rhi::RhiError> {
//! let surface_loader = ash::khr::surface::Instance::new(instance.entry(), instance.handle());
//! let gpu = select_physical_device(instance.handle(), surface, &surface_loader)?;
//! let device = Device::new(instance, &gpu)?;
//!
//! let graphics_queue = device.graphics_queue();
//! let present_queue = device.present_queue();
//! # Ok(())
//! # }
//! ```

use std::ffi::c_char;
use std::sync::Arc;

use ash::prelude::VkResult;
use ash::vk;
use tracing::{debug, info};

use crate::error::{RhiError, RhiResult};
use crate::instance::Instance;
use crate::physical_device::{PhysicalDeviceInfo, QueueFamilyIndices, REQUIRED_DEVICE_EXTENSIONS};

/// Vulkan logical device wrapper.
///
/// # Thread Safety
///
/// Designed to be shared across threads using `Arc`. Queue submission is
/// not internally synchronized; the renderer only submits from one thread.
pub struct Device {
    /// Vulkan logical device handle.
    device: ash::Device,
    /// Physical device handle.
    physical_device: vk::PhysicalDevice,
    /// Graphics queue handle.
    graphics_queue: vk::Queue,
    /// Presentation queue handle (may equal the graphics queue).
    present_queue: vk::Queue,
    /// Queue family indices.
    queue_families: QueueFamilyIndices,
}

impl Device {
    /// Creates the logical device with one queue per unique family and the
    /// swapchain extension enabled.
    ///
    /// # Errors
    ///
    /// Returns an error if the selected GPU lacks a graphics or present
    /// family, or if device creation fails.
    pub fn new(instance: &Instance, physical_device_info: &PhysicalDeviceInfo) -> RhiResult<Arc<Self>> {
        let queue_families = physical_device_info.queue_families;
        let (Some(graphics_family), Some(present_family)) =
            (queue_families.graphics_family, queue_families.present_family)
        else {
            return Err(RhiError::NoSuitableGpu);
        };

        let unique_families = queue_families.unique_families();
        let queue_priorities = [1.0f32];

        let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = unique_families
            .iter()
            .map(|&family| {
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(family)
                    .queue_priorities(&queue_priorities)
            })
            .collect();

        debug!(
            "Creating {} queue(s) for families: {:?}",
            queue_create_infos.len(),
            unique_families
        );

        let extension_ptrs: Vec<*const c_char> = REQUIRED_DEVICE_EXTENSIONS
            .iter()
            .map(|name| name.as_ptr())
            .collect();
        let features = vk::PhysicalDeviceFeatures::default();

        let create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&extension_ptrs)
            .enabled_features(&features);

        let device = unsafe {
            instance
                .handle()
                .create_device(physical_device_info.device, &create_info, None)?
        };

        let graphics_queue = unsafe { device.get_device_queue(graphics_family, 0) };
        let present_queue = unsafe { device.get_device_queue(present_family, 0) };

        info!(
            "Logical device created on '{}' (graphics family {}, present family {})",
            physical_device_info.device_name(),
            graphics_family,
            present_family
        );

        Ok(Arc::new(Self {
            device,
            physical_device: physical_device_info.device,
            graphics_queue,
            present_queue,
            queue_families,
        }))
    }

    /// Returns the ash device.
    #[inline]
    pub fn handle(&self) -> &ash::Device {
        &self.device
    }

    /// Returns the physical device this device was created from.
    #[inline]
    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    #[inline]
    pub fn graphics_queue(&self) -> vk::Queue {
        self.graphics_queue
    }

    #[inline]
    pub fn present_queue(&self) -> vk::Queue {
        self.present_queue
    }

    #[inline]
    pub fn queue_families(&self) -> &QueueFamilyIndices {
        &self.queue_families
    }

    /// Graphics family index. Always present on a constructed device.
    #[inline]
    pub fn graphics_family(&self) -> u32 {
        self.queue_families.graphics_family.unwrap_or_default()
    }

    /// Blocks until every queue on the device is idle.
    pub fn wait_idle(&self) -> VkResult<()> {
        unsafe { self.device.device_wait_idle() }
    }

    /// Submits work to the graphics queue.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    /// - All command buffers are valid and fully recorded
    /// - Referenced semaphores and the fence belong to this device
    /// - The fence is unsignaled and not used by another pending submission
    pub unsafe fn submit_graphics(&self, submit_infos: &[vk::SubmitInfo], fence: vk::Fence) -> VkResult<()> {
        unsafe { self.device.queue_submit(self.graphics_queue, submit_infos, fence) }
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        unsafe {
            if let Err(e) = self.device.device_wait_idle() {
                tracing::error!("Failed to wait for device idle during drop: {:?}", e);
            }
            self.device.destroy_device(None);
        }
        info!("Logical device destroyed");
    }
}
