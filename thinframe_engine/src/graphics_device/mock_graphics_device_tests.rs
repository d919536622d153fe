//! Tests for the mock device itself, so renderer tests can rely on its protocol checks

use crate::graphics_device::mock_graphics_device::{MockGpu, MockEvent, MockFailure, mock_spirv};
use crate::graphics_device::{
    AcquireOutcome, PresentMode, ShaderDesc, ShaderStage, Submission, SwapchainDesc, TextureFormat,
    Extent2D,
};
use crate::error::Error;

fn swapchain_desc() -> SwapchainDesc {
    SwapchainDesc {
        extent: Extent2D::new(800, 600),
        present_mode: PresentMode::Fifo,
        preferred_format: TextureFormat::B8G8R8A8_SRGB,
    }
}

#[test]
fn test_live_counts_follow_drops() {
    let gpu = MockGpu::new();
    let device = gpu.device();
    let semaphore = device.create_semaphore().unwrap();
    let fence = device.create_fence(true).unwrap();
    assert_eq!(gpu.live("semaphore"), 1);
    assert_eq!(gpu.live("fence"), 1);

    drop(semaphore);
    drop(fence);
    drop(device);
    assert_eq!(gpu.total_live(), 0);
    assert_eq!(gpu.count(|e| matches!(e, MockEvent::Release(_))), 3);
}

#[test]
fn test_unsignaled_fence_wait_is_an_error() {
    let gpu = MockGpu::new();
    let device = gpu.device();
    let fence = device.create_fence(false).unwrap();
    assert!(device.wait_for_fence(fence.as_ref()).is_err());

    let signaled = device.create_fence(true).unwrap();
    assert!(device.wait_for_fence(signaled.as_ref()).is_ok());
    device.reset_fence(signaled.as_ref()).unwrap();
    assert!(device.wait_for_fence(signaled.as_ref()).is_err());
}

#[test]
fn test_submit_requires_signaled_wait_semaphore_and_recorded_list() {
    let gpu = MockGpu::new();
    let device = gpu.device();
    let mut swapchain = device.create_swapchain(&swapchain_desc()).unwrap();
    let mut pool = device.create_command_pool().unwrap();
    let mut lists = pool.allocate(1).unwrap();
    let available = device.create_semaphore().unwrap();
    let finished = device.create_semaphore().unwrap();
    let fence = device.create_fence(false).unwrap();

    let submit = |list: &dyn crate::graphics_device::CommandList| {
        device.submit(&Submission {
            command_list: list,
            wait_semaphore: available.as_ref(),
            signal_semaphore: finished.as_ref(),
            fence: fence.as_ref(),
        })
    };

    // Not recorded yet
    assert!(submit(lists[0].as_ref()).is_err());

    lists[0].begin().unwrap();
    lists[0].end().unwrap();
    // Nobody signaled `available`
    assert!(submit(lists[0].as_ref()).is_err());

    let outcome = swapchain.acquire_next_image(available.as_ref()).unwrap();
    assert_eq!(outcome, AcquireOutcome::Ready { image_index: 0, suboptimal: false });
    assert!(submit(lists[0].as_ref()).is_ok());

    assert!(swapchain.present(0, finished.as_ref()).is_ok());
    // `finished` was consumed by the present
    assert!(swapchain.present(0, finished.as_ref()).is_err());
}

#[test]
fn test_acquire_rotates_through_images() {
    let gpu = MockGpu::new();
    let device = gpu.device();
    let mut swapchain = device.create_swapchain(&swapchain_desc()).unwrap();
    assert_eq!(swapchain.image_count(), 3);

    let mut seen = Vec::new();
    for _ in 0..4 {
        let semaphore = device.create_semaphore().unwrap();
        match swapchain.acquire_next_image(semaphore.as_ref()).unwrap() {
            AcquireOutcome::Ready { image_index, .. } => seen.push(image_index),
            AcquireOutcome::OutOfDate => panic!("unexpected out of date"),
        }
    }
    assert_eq!(seen, vec![0, 1, 2, 0]);
}

#[test]
fn test_shader_validation_and_injected_failure() {
    let gpu = MockGpu::new();
    let device = gpu.device();
    let code = mock_spirv();
    let desc = ShaderDesc { code: &code, stage: ShaderStage::Vertex, entry_point: "main" };
    assert!(device.create_shader(&desc).is_ok());
    assert_eq!(gpu.shader_compilations(), 1);

    let bad = ShaderDesc { code: &[1, 2, 3], ..desc };
    assert!(matches!(device.create_shader(&bad), Err(Error::ModuleCompile(_))));

    gpu.fail(MockFailure::Shader);
    assert!(device.create_shader(&desc).is_err());
    gpu.recover(MockFailure::Shader);
    assert!(device.create_shader(&desc).is_ok());
    assert_eq!(gpu.shader_compilations(), 2);
}

#[test]
fn test_draw_requires_bound_pipeline() {
    let gpu = MockGpu::new();
    let device = gpu.device();
    let mut pool = device.create_command_pool().unwrap();
    let mut lists = pool.allocate(1).unwrap();
    lists[0].begin().unwrap();
    assert!(lists[0].draw(3, 1, 0, 0).is_err());
}
