//! Synchronization primitives.
//!
//! - [`Semaphore`] - binary semaphore ordering work between queue operations
//! - [`Fence`] - lets the host wait for submitted work to finish
//!
//! Both destroy their handle on drop. Neither may be destroyed while a
//! pending queue operation still references it; owners wait for the device
//! to go idle first.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use triangle_rhi::device::Device;
//! use triangle_rhi::sync::{Fence, Semaphore};
//!
//! # fn example(device: Arc<Device>) -> Result<(), triangle_rhi::RhiError> {
//! let image_available = Semaphore::new(device.clone())?;
//! // Signaled so the first wait returns immediately.
//! let in_flight = Fence::new(device.clone(), true)?;
//!
//! in_flight.wait(u64::MAX)?;
//! in_flight.reset()?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use ash::prelude::VkResult;
use ash::vk;
use tracing::debug;

use crate::device::Device;
use crate::error::RhiResult;

/// Binary semaphore, created unsignaled.
pub struct Semaphore {
    device: Arc<Device>,
    semaphore: vk::Semaphore,
}

impl Semaphore {
    /// Creates an unsignaled binary semaphore.
    ///
    /// # Errors
    ///
    /// Returns an error if semaphore creation fails.
    pub fn new(device: Arc<Device>) -> RhiResult<Self> {
        let create_info = vk::SemaphoreCreateInfo::default();
        let semaphore = unsafe { device.handle().create_semaphore(&create_info, None)? };

        debug!("Created semaphore");

        Ok(Self { device, semaphore })
    }

    #[inline]
    pub fn handle(&self) -> vk::Semaphore {
        self.semaphore
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_semaphore(self.semaphore, None);
        }
        debug!("Destroyed semaphore");
    }
}

/// Host-waitable fence.
pub struct Fence {
    device: Arc<Device>,
    fence: vk::Fence,
}

impl Fence {
    /// Creates a fence.
    ///
    /// # Arguments
    ///
    /// * `device` - The logical device
    /// * `signaled` - Start in the signaled state, so that a wait issued
    ///   before the first submission returns immediately
    ///
    /// # Errors
    ///
    /// Returns an error if fence creation fails.
    pub fn new(device: Arc<Device>, signaled: bool) -> RhiResult<Self> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };

        let create_info = vk::FenceCreateInfo::default().flags(flags);
        let fence = unsafe { device.handle().create_fence(&create_info, None)? };

        debug!(
            "Created fence ({})",
            if signaled { "signaled" } else { "unsignaled" }
        );

        Ok(Self { device, fence })
    }

    #[inline]
    pub fn handle(&self) -> vk::Fence {
        self.fence
    }

    /// Blocks until the fence is signaled or `timeout` nanoseconds pass.
    ///
    /// `u64::MAX` waits forever. A timeout surfaces as `vk::Result::TIMEOUT`.
    pub fn wait(&self, timeout: u64) -> VkResult<()> {
        unsafe {
            self.device
                .handle()
                .wait_for_fences(std::slice::from_ref(&self.fence), true, timeout)
        }
    }

    /// Returns the fence to the unsignaled state.
    pub fn reset(&self) -> VkResult<()> {
        unsafe {
            self.device
                .handle()
                .reset_fences(std::slice::from_ref(&self.fence))
        }
    }

    /// Polls the fence without blocking.
    pub fn is_signaled(&self) -> VkResult<bool> {
        unsafe { self.device.handle().get_fence_status(self.fence) }
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_fence(self.fence, None);
        }
        debug!("Destroyed fence");
    }
}
