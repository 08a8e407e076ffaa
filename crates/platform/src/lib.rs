//! Platform layer for the triangle renderer.
//!
//! - Window creation via winit (fixed size, not resizable)
//! - Vulkan surface creation and required instance extensions via ash-window

mod window;

pub use window::{Surface, Window};
