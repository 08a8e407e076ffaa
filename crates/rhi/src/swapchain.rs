//! Swapchain management.
//!
//! This module handles VkSwapchainKHR creation, image acquisition and
//! presentation. The swapchain is created once with a fixed extent; it is
//! never recreated.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use triangle_rhi::device::Device;
//! use triangle_rhi::instance::Instance;
//! use triangle_rhi::swapchain::Swapchain;
//! use ash::vk;
//!
//! # fn example(instance: &Instance, device: Arc<Device>, surface: vk::SurfaceKHR) -> Result<(), triangle_rhi::RhiError> {
//! let surface_loader = ash::khr::surface::Instance::new(instance.entry(), instance.handle());
//! let swapchain = Swapchain::new(instance, device, surface, &surface_loader, 800, 600, true)?;
//! println!("{} images at {:?}", swapchain.image_count(), swapchain.extent());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use ash::prelude::VkResult;
use ash::vk;
use tracing::{debug, info};

use crate::device::Device;
use crate::error::{RhiError, RhiResult};
use crate::instance::Instance;

/// What a surface supports for swapchain creation.
#[derive(Debug, Clone)]
pub struct SwapchainSupportDetails {
    /// Surface capabilities (min/max image count, extents, transforms, etc.)
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    /// Supported surface formats (format and color space combinations)
    pub formats: Vec<vk::SurfaceFormatKHR>,
    /// Supported present modes (FIFO, MAILBOX, IMMEDIATE, etc.)
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SwapchainSupportDetails {
    /// Queries swapchain support for a physical device and surface.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the queries fail.
    pub fn query(
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        surface_loader: &ash::khr::surface::Instance,
    ) -> RhiResult<Self> {
        let capabilities = unsafe {
            surface_loader.get_physical_device_surface_capabilities(physical_device, surface)?
        };
        let formats =
            unsafe { surface_loader.get_physical_device_surface_formats(physical_device, surface)? };
        let present_modes = unsafe {
            surface_loader.get_physical_device_surface_present_modes(physical_device, surface)?
        };

        debug!(
            "Swapchain support: {} formats, {} present modes, image count: {}-{}",
            formats.len(),
            present_modes.len(),
            capabilities.min_image_count,
            if capabilities.max_image_count == 0 {
                "unlimited".to_string()
            } else {
                capabilities.max_image_count.to_string()
            }
        );

        Ok(Self {
            capabilities,
            formats,
            present_modes,
        })
    }

    /// True when at least one format and one present mode are available.
    #[inline]
    pub fn is_adequate(&self) -> bool {
        !self.formats.is_empty() && !self.present_modes.is_empty()
    }
}

/// Concrete swapchain parameters picked from [`SwapchainSupportDetails`].
#[derive(Debug, Clone, Copy)]
pub struct SwapchainSettings {
    pub surface_format: vk::SurfaceFormatKHR,
    pub present_mode: vk::PresentModeKHR,
    pub extent: vk::Extent2D,
    pub image_count: u32,
}

impl SwapchainSettings {
    /// Picks format, present mode, extent and image count.
    ///
    /// - Format: B8G8R8A8_SRGB with SRGB_NONLINEAR, else the first offered.
    /// - Present mode: FIFO with `vsync`; otherwise MAILBOX when offered,
    ///   falling back to FIFO (always supported).
    /// - Extent: the surface's current extent, or the window size clamped
    ///   to the supported range when the surface leaves it to us.
    /// - Image count: one more than the minimum, capped by the maximum.
    ///
    /// Returns `None` when the surface offers no formats.
    pub fn select(support: &SwapchainSupportDetails, width: u32, height: u32, vsync: bool) -> Option<Self> {
        let surface_format = support
            .formats
            .iter()
            .copied()
            .find(|f| {
                f.format == vk::Format::B8G8R8A8_SRGB
                    && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
            })
            .or_else(|| support.formats.first().copied())?;

        let present_mode = if !vsync && support.present_modes.contains(&vk::PresentModeKHR::MAILBOX) {
            vk::PresentModeKHR::MAILBOX
        } else {
            vk::PresentModeKHR::FIFO
        };

        let caps = &support.capabilities;
        let extent = if caps.current_extent.width != u32::MAX {
            caps.current_extent
        } else {
            vk::Extent2D {
                width: width.clamp(caps.min_image_extent.width, caps.max_image_extent.width),
                height: height.clamp(caps.min_image_extent.height, caps.max_image_extent.height),
            }
        };

        let mut image_count = caps.min_image_count + 1;
        if caps.max_image_count > 0 {
            image_count = image_count.min(caps.max_image_count);
        }

        Some(Self {
            surface_format,
            present_mode,
            extent,
            image_count,
        })
    }
}

/// Vulkan swapchain and its image views.
///
/// Images are owned by the swapchain; image views are created and
/// destroyed here.
pub struct Swapchain {
    device: Arc<Device>,
    swapchain_loader: ash::khr::swapchain::Device,
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    format: vk::Format,
    extent: vk::Extent2D,
    present_mode: vk::PresentModeKHR,
}

impl Swapchain {
    /// Creates the swapchain for `surface`.
    ///
    /// # Arguments
    ///
    /// * `width`, `height` - Window size, used when the surface does not
    ///   dictate an extent
    /// * `vsync` - Prefer FIFO presentation
    ///
    /// # Errors
    ///
    /// Returns an error if the surface offers no formats or present modes,
    /// or if any Vulkan call fails.
    pub fn new(
        instance: &Instance,
        device: Arc<Device>,
        surface: vk::SurfaceKHR,
        surface_loader: &ash::khr::surface::Instance,
        width: u32,
        height: u32,
        vsync: bool,
    ) -> RhiResult<Self> {
        let support = SwapchainSupportDetails::query(device.physical_device(), surface, surface_loader)?;
        if !support.is_adequate() {
            return Err(RhiError::SwapchainError(
                "Inadequate swapchain support (no formats or present modes)".to_string(),
            ));
        }

        let settings = SwapchainSettings::select(&support, width, height, vsync)
            .ok_or_else(|| RhiError::SwapchainError("Surface offers no formats".to_string()))?;

        info!(
            "Creating swapchain: {}x{}, format {:?}, present mode {:?}, {} images",
            settings.extent.width,
            settings.extent.height,
            settings.surface_format.format,
            settings.present_mode,
            settings.image_count
        );

        let queue_families = device.queue_families();
        let family_indices: Vec<u32> = queue_families.unique_families();
        let sharing_mode = if family_indices.len() > 1 {
            debug!("Using CONCURRENT sharing mode for families {:?}", family_indices);
            vk::SharingMode::CONCURRENT
        } else {
            debug!("Using EXCLUSIVE sharing mode");
            vk::SharingMode::EXCLUSIVE
        };
        let shared_families: &[u32] = if sharing_mode == vk::SharingMode::CONCURRENT {
            &family_indices
        } else {
            &[]
        };

        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface)
            .min_image_count(settings.image_count)
            .image_format(settings.surface_format.format)
            .image_color_space(settings.surface_format.color_space)
            .image_extent(settings.extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(sharing_mode)
            .queue_family_indices(shared_families)
            .pre_transform(support.capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(settings.present_mode)
            .clipped(true);

        let swapchain_loader = ash::khr::swapchain::Device::new(instance.handle(), device.handle());
        let swapchain = unsafe { swapchain_loader.create_swapchain(&create_info, None)? };

        // Build the struct before creating views so a failure below still
        // destroys whatever exists.
        let mut this = Self {
            device,
            swapchain_loader,
            swapchain,
            images: Vec::new(),
            image_views: Vec::new(),
            format: settings.surface_format.format,
            extent: settings.extent,
            present_mode: settings.present_mode,
        };

        this.images = unsafe { this.swapchain_loader.get_swapchain_images(swapchain)? };
        info!("Swapchain created with {} images", this.images.len());

        for (i, &image) in this.images.iter().enumerate() {
            let view_info = vk::ImageViewCreateInfo::default()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(this.format)
                .components(vk::ComponentMapping::default())
                .subresource_range(
                    vk::ImageSubresourceRange::default()
                        .aspect_mask(vk::ImageAspectFlags::COLOR)
                        .level_count(1)
                        .layer_count(1),
                );
            let view = unsafe { this.device.handle().create_image_view(&view_info, None) }.map_err(
                |e| RhiError::SwapchainError(format!("Failed to create image view {}: {:?}", i, e)),
            )?;
            this.image_views.push(view);
        }
        debug!("Created {} image views", this.image_views.len());

        Ok(this)
    }

    /// Acquires the next presentable image, signaling `semaphore`.
    ///
    /// Returns `(image_index, suboptimal)`. `ERROR_OUT_OF_DATE_KHR` and every
    /// other failure are returned unchanged.
    pub fn acquire_next_image(&self, semaphore: vk::Semaphore, timeout: u64) -> VkResult<(u32, bool)> {
        unsafe {
            self.swapchain_loader
                .acquire_next_image(self.swapchain, timeout, semaphore, vk::Fence::null())
        }
    }

    /// Queues `image_index` for presentation on the device's present queue
    /// once `wait_semaphore` is signaled.
    ///
    /// Returns `true` when the swapchain is suboptimal.
    pub fn present(&self, image_index: u32, wait_semaphore: vk::Semaphore) -> VkResult<bool> {
        let swapchains = [self.swapchain];
        let image_indices = [image_index];
        let wait_semaphores = [wait_semaphore];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        unsafe {
            self.swapchain_loader
                .queue_present(self.device.present_queue(), &present_info)
        }
    }

    #[inline]
    pub fn handle(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    #[inline]
    pub fn format(&self) -> vk::Format {
        self.format
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    #[inline]
    pub fn present_mode(&self) -> vk::PresentModeKHR {
        self.present_mode
    }

    /// Number of images the driver actually created.
    #[inline]
    pub fn image_count(&self) -> u32 {
        self.images.len() as u32
    }

    /// One view per swapchain image, in image index order.
    #[inline]
    pub fn image_views(&self) -> &[vk::ImageView] {
        &self.image_views
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            for &view in &self.image_views {
                self.device.handle().destroy_image_view(view, None);
            }
            self.swapchain_loader.destroy_swapchain(self.swapchain, None);
        }
        info!(
            "Swapchain destroyed (was {}x{}, {} images)",
            self.extent.width,
            self.extent.height,
            self.images.len()
        );
    }
}
