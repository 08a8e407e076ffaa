//! Present-cycle ordering, image index handling and fatal error behavior.

mod common;

use common::{CYCLE, Event, MockBackend, count, kinds, presented_indices, recorded};
use triangle_renderer::{
    FrameCommands, FramePresenter, FrameState, IMAGE_WAIT_STAGE, PresentError, TRIANGLE_VERTEX_COUNT,
    VulkanBackend,
};
use triangle_rhi::vk;

fn presenter(image_count: u32) -> FramePresenter<MockBackend> {
    FramePresenter::new(MockBackend::new(image_count)).expect("mock presenter")
}

fn assert_no_violations(presenter: &FramePresenter<MockBackend>) {
    let violations = presenter.backend().violations();
    assert!(violations.is_empty(), "synchronization violations: {:?}", violations);
}

#[test]
fn test_n_frames_run_n_cycles_in_order() {
    let mut presenter = presenter(3);

    for _ in 0..7 {
        presenter.render_frame().unwrap();
    }

    let kinds = kinds(&presenter.backend().events());
    assert_eq!(kinds.len(), 7 * CYCLE.len());
    for (frame, cycle) in kinds.chunks(CYCLE.len()).enumerate() {
        assert_eq!(cycle, CYCLE.as_slice(), "frame {}", frame);
    }
    assert_eq!(presenter.frames_presented(), 7);
    assert_eq!(presenter.state(), FrameState::Idle);
    assert_no_violations(&presenter);
}

#[test]
fn test_fence_waited_before_every_reset() {
    let mut presenter = presenter(2);

    for _ in 0..4 {
        presenter.render_frame().unwrap();
    }

    let events = presenter.backend().events();
    for (i, event) in events.iter().enumerate() {
        if *event == Event::ResetFence {
            assert!(i > 0, "reset before any wait");
            assert_eq!(events[i - 1], Event::WaitFence, "reset at {} not preceded by a wait", i);
        }
    }
    // The mock flags resetting an unsignaled fence and submitting with a
    // signaled one.
    assert_no_violations(&presenter);
}

#[test]
fn test_acquired_index_in_range_and_recorded() {
    let mut presenter = presenter(3);

    for _ in 0..10 {
        let index = presenter.render_frame().unwrap();
        assert!(index < 3);
    }

    let events = presenter.backend().events();
    let mut acquired = None;
    for event in &events {
        match event {
            Event::Acquire { image_index, .. } => {
                assert!(*image_index < 3);
                acquired = Some(*image_index);
            }
            Event::Record(commands) => {
                assert_eq!(Some(commands.framebuffer_index), acquired);
            }
            Event::Present { image_index, .. } => {
                assert_eq!(Some(*image_index), acquired);
            }
            _ => {}
        }
    }
}

#[test]
fn test_semaphores_chain_acquire_submit_present() {
    let mut presenter = presenter(2);
    presenter.render_frame().unwrap();

    let events = presenter.backend().events();
    let [
        _,
        _,
        Event::Acquire { signal: acquired, .. },
        _,
        Event::Submit {
            wait,
            wait_stage,
            signal: finished,
        },
        Event::Present { wait: present_wait, .. },
    ] = events.as_slice()
    else {
        panic!("unexpected call sequence: {:?}", events);
    };

    assert_eq!(wait, acquired);
    assert_eq!(*wait_stage, IMAGE_WAIT_STAGE);
    assert_eq!(*wait_stage, vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT);
    assert_eq!(present_wait, finished);
    assert_ne!(acquired, finished);
}

#[test]
fn test_recording_is_identical_for_identical_state() {
    let mut presenter = FramePresenter::new(MockBackend::new(2).with_extent(1024, 768)).unwrap();

    for _ in 0..6 {
        presenter.render_frame().unwrap();
    }

    let commands = recorded(&presenter.backend().events());
    assert_eq!(commands.len(), 6);
    for (frame, recorded) in commands.iter().enumerate() {
        let expected = FrameCommands::triangle(
            recorded.framebuffer_index,
            vk::Extent2D {
                width: 1024,
                height: 768,
            },
        );
        assert_eq!(*recorded, expected, "frame {}", frame);
    }
    // Same image, same command stream.
    assert_eq!(commands[0], commands[2]);
    assert_eq!(commands[1], commands[3]);
}

#[test]
fn test_draw_is_fixed_triangle_on_black() {
    let mut presenter = presenter(2);
    presenter.render_frame().unwrap();

    let commands = recorded(&presenter.backend().events());
    let draw = commands[0];
    assert_eq!(draw.vertex_count, TRIANGLE_VERTEX_COUNT);
    assert_eq!(draw.vertex_count, 3);
    assert_eq!(draw.instance_count, 1);
    assert_eq!(draw.clear_color, [0.0, 0.0, 0.0, 1.0]);
    assert_eq!((draw.width, draw.height), (800, 600));
}

#[test]
fn test_two_images_five_frames_alternate() {
    let mut presenter = presenter(2);

    let returned: Vec<u32> = (0..5).map(|_| presenter.render_frame().unwrap()).collect();

    let presented = presenter.backend().presented();
    assert_eq!(presented.len(), 5);
    assert_eq!(presented, [0, 1, 0, 1, 0]);
    assert_eq!(returned, presented);
    assert!(presented.windows(2).all(|pair| pair[0] != pair[1]));
    assert_no_violations(&presenter);
}

#[test]
fn test_out_of_date_acquire_is_fatal_without_submit() {
    let mut presenter = presenter(2);
    presenter.render_frame().unwrap();
    presenter.render_frame().unwrap();
    let submits_before = presenter.backend().submit_count();
    let records_before = count(&presenter.backend().events(), "record");

    presenter
        .backend()
        .fail_next_acquire(vk::Result::ERROR_OUT_OF_DATE_KHR);
    let err = presenter.render_frame().unwrap_err();

    assert!(matches!(err, PresentError::Swapchain(vk::Result::ERROR_OUT_OF_DATE_KHR)));
    assert_eq!(err.code(), Some(vk::Result::ERROR_OUT_OF_DATE_KHR));
    assert_eq!(presenter.backend().submit_count(), submits_before);
    assert_eq!(count(&presenter.backend().events(), "record"), records_before);
    assert_eq!(presenter.state(), FrameState::Failed);
    assert_eq!(presenter.frames_presented(), 2);
}

#[test]
fn test_out_of_date_on_first_frame() {
    let mut presenter = presenter(2);
    presenter
        .backend()
        .fail_next_acquire(vk::Result::ERROR_OUT_OF_DATE_KHR);

    assert!(matches!(
        presenter.render_frame(),
        Err(PresentError::Swapchain(vk::Result::ERROR_OUT_OF_DATE_KHR))
    ));
    assert_eq!(presenter.backend().submit_count(), 0);
    assert!(presenter.backend().presented().is_empty());
}

#[test]
fn test_failed_presenter_halts() {
    let mut presenter = presenter(2);
    presenter
        .backend()
        .fail_next_acquire(vk::Result::ERROR_SURFACE_LOST_KHR);
    presenter.render_frame().unwrap_err();
    let events_after_failure = presenter.backend().events().len();

    for _ in 0..3 {
        assert!(matches!(presenter.render_frame(), Err(PresentError::Halted)));
    }

    assert_eq!(presenter.backend().events().len(), events_after_failure);
    assert_eq!(presenter.state(), FrameState::Failed);
}

#[test]
fn test_recording_failure_is_fatal_without_submit() {
    let mut presenter = presenter(2);
    presenter
        .backend()
        .fail_next_record(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY);

    let err = presenter.render_frame().unwrap_err();

    assert!(matches!(
        err,
        PresentError::CommandRecording(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY)
    ));
    assert_eq!(presenter.backend().submit_count(), 0);
    assert_eq!(presenter.state(), FrameState::Failed);
}

#[test]
fn test_submit_failure_is_fatal_without_present() {
    let mut presenter = presenter(2);
    presenter.render_frame().unwrap();
    presenter
        .backend()
        .fail_next_submit(vk::Result::ERROR_DEVICE_LOST);

    let err = presenter.render_frame().unwrap_err();

    assert!(matches!(err, PresentError::Submit(vk::Result::ERROR_DEVICE_LOST)));
    assert_eq!(presenter.backend().presented(), [0]);
    assert_eq!(presenter.frames_presented(), 1);
}

#[test]
fn test_out_of_date_present_is_fatal() {
    let mut presenter = presenter(2);
    presenter
        .backend()
        .fail_next_present(vk::Result::ERROR_OUT_OF_DATE_KHR);

    let err = presenter.render_frame().unwrap_err();

    assert!(matches!(err, PresentError::Swapchain(vk::Result::ERROR_OUT_OF_DATE_KHR)));
    // The work was submitted before presentation failed.
    assert_eq!(presenter.backend().submit_count(), 1);
    assert!(presenter.backend().presented().is_empty());
    assert_eq!(presenter.frames_presented(), 0);
}

#[test]
fn test_suboptimal_swapchain_keeps_rendering() {
    let mut presenter = presenter(2);
    presenter.backend().suboptimal_next_acquire();
    assert_eq!(presenter.render_frame().unwrap(), 0);

    presenter.backend().suboptimal_next_present();
    assert_eq!(presenter.render_frame().unwrap(), 1);

    assert_eq!(presenter.frames_presented(), 2);
    assert_eq!(presenter.state(), FrameState::Idle);
    assert_no_violations(&presenter);
}

#[test]
fn test_out_of_range_index_rejected_before_recording() {
    let mut presenter = presenter(2);
    presenter.backend().next_acquire_returns(5);

    let err = presenter.render_frame().unwrap_err();

    assert!(matches!(
        err,
        PresentError::InvalidImageIndex {
            index: 5,
            image_count: 2
        }
    ));
    let events = presenter.backend().events();
    assert_eq!(count(&events, "record"), 0);
    assert_eq!(count(&events, "submit"), 0);
    assert!(presented_indices(&events).is_empty());
}

#[test]
fn test_presenter_is_send_with_vulkan_backend() {
    fn assert_send<T: Send>() {}
    assert_send::<FramePresenter<VulkanBackend>>();
}
