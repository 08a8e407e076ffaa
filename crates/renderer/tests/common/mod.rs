//! Scripted [`PresentBackend`] for driving `FramePresenter` without a GPU.
//!
//! The mock models one fence and any number of binary semaphores, logs
//! every call, and records a violation whenever the presenter breaks a
//! synchronization rule (resetting an unsignaled fence, recording while a
//! submission is pending, waiting on a semaphore nobody signaled).

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use triangle_renderer::{FrameCommands, PresentBackend};
use triangle_rhi::{RhiError, RhiResult, VkResult, vk};

/// Something the presenter owns and releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Object {
    Fence,
    Semaphore(u32),
    CommandBuffer,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    WaitFence,
    ResetFence,
    Acquire {
        image_index: u32,
        signal: u32,
    },
    Record(FrameCommands),
    Submit {
        wait: u32,
        wait_stage: vk::PipelineStageFlags,
        signal: u32,
    },
    Present {
        image_index: u32,
        wait: u32,
    },
    /// A call that returned an injected error.
    Failed(&'static str, vk::Result),
    WaitIdle,
    Released(Object),
    BackendDropped,
}

impl Event {
    /// Short name used when comparing call sequences.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::WaitFence => "wait",
            Event::ResetFence => "reset",
            Event::Acquire { .. } => "acquire",
            Event::Record(_) => "record",
            Event::Submit { .. } => "submit",
            Event::Present { .. } => "present",
            Event::Failed(..) => "failed",
            Event::WaitIdle => "wait_idle",
            Event::Released(_) => "released",
            Event::BackendDropped => "backend_dropped",
        }
    }
}

pub type EventLog = Rc<RefCell<Vec<Event>>>;

/// The calls of one successful frame, in order.
pub const CYCLE: [&str; 6] = ["wait", "reset", "acquire", "record", "submit", "present"];

pub struct MockFence {
    log: EventLog,
}

impl Drop for MockFence {
    fn drop(&mut self) {
        self.log.borrow_mut().push(Event::Released(Object::Fence));
    }
}

pub struct MockSemaphore {
    id: u32,
    log: EventLog,
}

impl Drop for MockSemaphore {
    fn drop(&mut self) {
        self.log
            .borrow_mut()
            .push(Event::Released(Object::Semaphore(self.id)));
    }
}

pub struct MockCommandBuffer {
    log: EventLog,
}

impl Drop for MockCommandBuffer {
    fn drop(&mut self) {
        self.log
            .borrow_mut()
            .push(Event::Released(Object::CommandBuffer));
    }
}

#[derive(Default)]
struct GpuState {
    fence_signaled: bool,
    pending_submission: bool,
    signaled_semaphores: HashSet<u32>,
    next_image: u32,
    next_semaphore_id: u32,
    semaphore_limit: Option<u32>,
    violations: Vec<String>,

    acquire_failure: Option<vk::Result>,
    acquire_index: Option<u32>,
    acquire_suboptimal: bool,
    record_failure: Option<vk::Result>,
    submit_failure: Option<vk::Result>,
    present_failure: Option<vk::Result>,
    present_suboptimal: bool,
}

pub struct MockBackend {
    image_count: u32,
    extent: vk::Extent2D,
    log: EventLog,
    gpu: RefCell<GpuState>,
}

impl MockBackend {
    /// A healthy swapchain with `image_count` images handed out round-robin.
    pub fn new(image_count: u32) -> Self {
        Self {
            image_count,
            extent: vk::Extent2D {
                width: 800,
                height: 600,
            },
            log: Rc::new(RefCell::new(Vec::new())),
            gpu: RefCell::new(GpuState::default()),
        }
    }

    pub fn with_extent(mut self, width: u32, height: u32) -> Self {
        self.extent = vk::Extent2D { width, height };
        self
    }

    /// Semaphore creation fails once `count` semaphores exist.
    pub fn with_semaphore_limit(self, count: u32) -> Self {
        self.gpu.borrow_mut().semaphore_limit = Some(count);
        self
    }

    pub fn fail_next_acquire(&self, result: vk::Result) {
        self.gpu.borrow_mut().acquire_failure = Some(result);
    }

    pub fn fail_next_record(&self, result: vk::Result) {
        self.gpu.borrow_mut().record_failure = Some(result);
    }

    pub fn fail_next_submit(&self, result: vk::Result) {
        self.gpu.borrow_mut().submit_failure = Some(result);
    }

    pub fn fail_next_present(&self, result: vk::Result) {
        self.gpu.borrow_mut().present_failure = Some(result);
    }

    /// The next acquire returns `index` instead of the round-robin one.
    pub fn next_acquire_returns(&self, index: u32) {
        self.gpu.borrow_mut().acquire_index = Some(index);
    }

    pub fn suboptimal_next_acquire(&self) {
        self.gpu.borrow_mut().acquire_suboptimal = true;
    }

    pub fn suboptimal_next_present(&self) {
        self.gpu.borrow_mut().present_suboptimal = true;
    }

    /// Shared handle to the event log; stays readable after the backend is
    /// dropped.
    pub fn log(&self) -> EventLog {
        self.log.clone()
    }

    pub fn events(&self) -> Vec<Event> {
        self.log.borrow().clone()
    }

    pub fn violations(&self) -> Vec<String> {
        self.gpu.borrow().violations.clone()
    }

    pub fn submit_count(&self) -> usize {
        count(&self.events(), "submit")
    }

    pub fn presented(&self) -> Vec<u32> {
        presented_indices(&self.events())
    }

    fn push(&self, event: Event) {
        self.log.borrow_mut().push(event);
    }

    fn fail(&self, call: &'static str, result: vk::Result) -> vk::Result {
        self.push(Event::Failed(call, result));
        result
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.push(Event::BackendDropped);
    }
}

impl PresentBackend for MockBackend {
    type Fence = MockFence;
    type Semaphore = MockSemaphore;
    type CommandBuffer = MockCommandBuffer;

    fn create_fence(&self, signaled: bool) -> RhiResult<MockFence> {
        self.gpu.borrow_mut().fence_signaled = signaled;
        Ok(MockFence {
            log: self.log.clone(),
        })
    }

    fn create_semaphore(&self) -> RhiResult<MockSemaphore> {
        let mut gpu = self.gpu.borrow_mut();
        if gpu.semaphore_limit == Some(gpu.next_semaphore_id) {
            return Err(RhiError::VulkanError(vk::Result::ERROR_OUT_OF_HOST_MEMORY));
        }
        let id = gpu.next_semaphore_id;
        gpu.next_semaphore_id += 1;
        Ok(MockSemaphore {
            id,
            log: self.log.clone(),
        })
    }

    fn allocate_command_buffer(&self) -> RhiResult<MockCommandBuffer> {
        Ok(MockCommandBuffer {
            log: self.log.clone(),
        })
    }

    fn image_count(&self) -> u32 {
        self.image_count
    }

    fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    fn wait_for_fence(&self, _fence: &MockFence, _timeout: u64) -> VkResult<()> {
        self.push(Event::WaitFence);
        let mut gpu = self.gpu.borrow_mut();
        // The GPU finishes the outstanding submission while the host waits.
        if gpu.pending_submission {
            gpu.pending_submission = false;
            gpu.fence_signaled = true;
        }
        if !gpu.fence_signaled {
            gpu.violations
                .push("waited on a fence that can never signal".to_string());
            return Err(vk::Result::TIMEOUT);
        }
        Ok(())
    }

    fn reset_fence(&self, _fence: &MockFence) -> VkResult<()> {
        self.push(Event::ResetFence);
        let mut gpu = self.gpu.borrow_mut();
        if !gpu.fence_signaled {
            gpu.violations.push("reset an unsignaled fence".to_string());
        }
        gpu.fence_signaled = false;
        Ok(())
    }

    fn acquire_next_image(&self, signal: &MockSemaphore, _timeout: u64) -> VkResult<(u32, bool)> {
        let mut gpu = self.gpu.borrow_mut();
        if let Some(result) = gpu.acquire_failure.take() {
            return Err(self.fail("acquire", result));
        }

        let image_index = match gpu.acquire_index.take() {
            Some(index) => index,
            None => {
                let index = gpu.next_image;
                gpu.next_image = (gpu.next_image + 1) % self.image_count;
                index
            }
        };
        if !gpu.signaled_semaphores.insert(signal.id) {
            gpu.violations
                .push(format!("acquire signaled semaphore {} twice", signal.id));
        }
        let suboptimal = std::mem::take(&mut gpu.acquire_suboptimal);

        self.push(Event::Acquire {
            image_index,
            signal: signal.id,
        });
        Ok((image_index, suboptimal))
    }

    fn record(&self, _command_buffer: &MockCommandBuffer, commands: &FrameCommands) -> VkResult<()> {
        let mut gpu = self.gpu.borrow_mut();
        if gpu.pending_submission {
            gpu.violations
                .push("recorded while the previous submission was pending".to_string());
        }
        if let Some(result) = gpu.record_failure.take() {
            return Err(self.fail("record", result));
        }
        self.push(Event::Record(*commands));
        Ok(())
    }

    fn submit(
        &self,
        _command_buffer: &MockCommandBuffer,
        wait: &MockSemaphore,
        wait_stage: vk::PipelineStageFlags,
        signal: &MockSemaphore,
        _fence: &MockFence,
    ) -> VkResult<()> {
        let mut gpu = self.gpu.borrow_mut();
        if let Some(result) = gpu.submit_failure.take() {
            return Err(self.fail("submit", result));
        }
        if gpu.fence_signaled {
            gpu.violations.push("submitted with a signaled fence".to_string());
        }
        if !gpu.signaled_semaphores.remove(&wait.id) {
            gpu.violations
                .push(format!("submit waits on unsignaled semaphore {}", wait.id));
        }
        if !gpu.signaled_semaphores.insert(signal.id) {
            gpu.violations
                .push(format!("submit signaled semaphore {} twice", signal.id));
        }
        gpu.pending_submission = true;

        self.push(Event::Submit {
            wait: wait.id,
            wait_stage,
            signal: signal.id,
        });
        Ok(())
    }

    fn present(&self, image_index: u32, wait: &MockSemaphore) -> VkResult<bool> {
        let mut gpu = self.gpu.borrow_mut();
        if let Some(result) = gpu.present_failure.take() {
            return Err(self.fail("present", result));
        }
        if !gpu.signaled_semaphores.remove(&wait.id) {
            gpu.violations
                .push(format!("present waits on unsignaled semaphore {}", wait.id));
        }
        let suboptimal = std::mem::take(&mut gpu.present_suboptimal);

        self.push(Event::Present {
            image_index,
            wait: wait.id,
        });
        Ok(suboptimal)
    }

    fn wait_idle(&self) -> VkResult<()> {
        self.push(Event::WaitIdle);
        let mut gpu = self.gpu.borrow_mut();
        if gpu.pending_submission {
            gpu.pending_submission = false;
            gpu.fence_signaled = true;
        }
        Ok(())
    }
}

pub fn count(events: &[Event], kind: &str) -> usize {
    events.iter().filter(|e| e.kind() == kind).count()
}

pub fn kinds(events: &[Event]) -> Vec<&'static str> {
    events.iter().map(Event::kind).collect()
}

pub fn presented_indices(events: &[Event]) -> Vec<u32> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::Present { image_index, .. } => Some(*image_index),
            _ => None,
        })
        .collect()
}

pub fn recorded(events: &[Event]) -> Vec<FrameCommands> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::Record(commands) => Some(*commands),
            _ => None,
        })
        .collect()
}
