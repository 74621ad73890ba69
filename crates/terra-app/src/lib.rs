//! Terra globe viewer application.
//!
//! Creates the window, uploads the Earth scene to the GPU and drives it with
//! a self-rescheduling frame loop.

pub mod assets;
pub mod frame_loop;
pub mod renderer;
pub mod window;

pub use frame_loop::{DriverState, FrameClock, FrameError, FrameLoop, MAX_FRAME_TIME};
pub use renderer::{RendererError, SceneRenderer};
pub use window::{AppState, run_with_config};
