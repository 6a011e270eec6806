//! Frame scheduling: swapchain acquisition, command submission and presentation.

#[cfg(not(target_arch = "wasm32"))]
pub use self::present::{PendingPresent, PresentWorker};
pub use self::scheduler::{next_frame_index, Frame, FrameScheduler, PendingSurfaceChanges};

#[cfg(not(target_arch = "wasm32"))]
mod present;
mod scheduler;
