//! Single-frame-in-flight present loop.
//!
//! Each [`FramePresenter::render_frame`] call runs one full cycle:
//!
//! 1. wait for the in-flight fence (the previous frame's work is done)
//! 2. reset the fence
//! 3. acquire a swapchain image, signaling `image_available`
//! 4. re-record the command buffer for that image
//! 5. submit, waiting on `image_available` and signaling `render_finished`
//!    plus the fence
//! 6. present, waiting on `render_finished`
//!
//! Only one submission is ever outstanding, so the command buffer is never
//! reset while the GPU may still read it. Any failure is fatal: the
//! presenter moves to [`FrameState::Failed`] and refuses further frames.

use std::fmt;

use tracing::{debug, error, trace, warn};

use crate::backend::{FrameCommands, IMAGE_WAIT_STAGE, PresentBackend};
use crate::error::PresentError;

/// Where the presenter is within the current cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// Between frames.
    Idle,
    FenceWaited,
    ImageAcquired,
    Recorded,
    Submitted,
    Presented,
    /// A frame failed. Terminal.
    Failed,
}

impl FrameState {
    /// The state a successful step moves to. `Failed` has no successor.
    pub fn successor(self) -> Option<FrameState> {
        match self {
            FrameState::Idle => Some(FrameState::FenceWaited),
            FrameState::FenceWaited => Some(FrameState::ImageAcquired),
            FrameState::ImageAcquired => Some(FrameState::Recorded),
            FrameState::Recorded => Some(FrameState::Submitted),
            FrameState::Submitted => Some(FrameState::Presented),
            FrameState::Presented => Some(FrameState::Idle),
            FrameState::Failed => None,
        }
    }
}

impl fmt::Display for FrameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FrameState::Idle => "idle",
            FrameState::FenceWaited => "fence waited",
            FrameState::ImageAcquired => "image acquired",
            FrameState::Recorded => "recorded",
            FrameState::Submitted => "submitted",
            FrameState::Presented => "presented",
            FrameState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Owns the per-frame GPU objects and runs the present cycle.
///
/// Fields drop in declaration order, after [`Drop::drop`] has waited for
/// the device to go idle: command buffer, semaphores, fence, then backend.
pub struct FramePresenter<B: PresentBackend> {
    command_buffer: B::CommandBuffer,
    image_available: B::Semaphore,
    render_finished: B::Semaphore,
    in_flight: B::Fence,
    state: FrameState,
    frames_presented: u64,
    backend: B,
}

impl<B: PresentBackend> FramePresenter<B> {
    /// Creates the fence (signaled, so the first wait returns at once), both
    /// semaphores and the command buffer.
    ///
    /// # Errors
    ///
    /// Returns [`PresentError::Setup`] if any object cannot be created.
    /// Objects created before the failure are released.
    pub fn new(backend: B) -> Result<Self, PresentError> {
        let in_flight = backend.create_fence(true)?;
        let image_available = backend.create_semaphore()?;
        let render_finished = backend.create_semaphore()?;
        let command_buffer = backend.allocate_command_buffer()?;

        debug!(
            "Frame presenter created for {} swapchain images",
            backend.image_count()
        );

        Ok(Self {
            command_buffer,
            image_available,
            render_finished,
            in_flight,
            state: FrameState::Idle,
            frames_presented: 0,
            backend,
        })
    }

    /// Runs one wait, acquire, record, submit, present cycle.
    ///
    /// Returns the index of the presented swapchain image.
    ///
    /// # Errors
    ///
    /// Any error is fatal. After the first one, every call returns
    /// [`PresentError::Halted`] without touching the device.
    pub fn render_frame(&mut self) -> Result<u32, PresentError> {
        if self.state == FrameState::Failed {
            return Err(PresentError::Halted);
        }

        match self.run_cycle() {
            Ok(image_index) => {
                self.advance(FrameState::Idle);
                self.frames_presented += 1;
                Ok(image_index)
            }
            Err(err) => {
                error!("Frame {} failed in state '{}': {}", self.frames_presented, self.state, err);
                self.state = FrameState::Failed;
                Err(err)
            }
        }
    }

    fn run_cycle(&mut self) -> Result<u32, PresentError> {
        self.backend
            .wait_for_fence(&self.in_flight, u64::MAX)
            .map_err(PresentError::Fence)?;
        self.advance(FrameState::FenceWaited);

        self.backend
            .reset_fence(&self.in_flight)
            .map_err(PresentError::Fence)?;

        let (image_index, suboptimal) = self
            .backend
            .acquire_next_image(&self.image_available, u64::MAX)
            .map_err(PresentError::Swapchain)?;
        if suboptimal {
            warn!("Swapchain is suboptimal for the surface (acquire)");
        }

        let image_count = self.backend.image_count();
        if image_index >= image_count {
            return Err(PresentError::InvalidImageIndex {
                index: image_index,
                image_count,
            });
        }
        self.advance(FrameState::ImageAcquired);

        let commands = FrameCommands::triangle(image_index, self.backend.extent());
        self.backend
            .record(&self.command_buffer, &commands)
            .map_err(PresentError::CommandRecording)?;
        self.advance(FrameState::Recorded);

        self.backend
            .submit(
                &self.command_buffer,
                &self.image_available,
                IMAGE_WAIT_STAGE,
                &self.render_finished,
                &self.in_flight,
            )
            .map_err(PresentError::Submit)?;
        self.advance(FrameState::Submitted);

        let suboptimal = self
            .backend
            .present(image_index, &self.render_finished)
            .map_err(PresentError::Swapchain)?;
        if suboptimal {
            warn!("Swapchain is suboptimal for the surface (present)");
        }
        self.advance(FrameState::Presented);

        Ok(image_index)
    }

    fn advance(&mut self, next: FrameState) {
        debug_assert_eq!(
            self.state.successor(),
            Some(next),
            "illegal frame state transition"
        );
        trace!("Frame {}: {} -> {}", self.frames_presented, self.state, next);
        self.state = next;
    }

    #[inline]
    pub fn state(&self) -> FrameState {
        self.state
    }

    /// Number of completed cycles.
    #[inline]
    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    #[inline]
    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: PresentBackend> Drop for FramePresenter<B> {
    fn drop(&mut self) {
        if let Err(e) = self.backend.wait_idle() {
            error!("Failed to wait for device idle before teardown: {}", e);
        }
        debug!(
            "Frame presenter destroyed after {} frames",
            self.frames_presented
        );
    }
}
