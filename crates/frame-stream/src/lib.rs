//! frame-stream: pull frames from a camera on a background thread and hand
//! the latest one to any number of readers without blocking.
//!
//! Backends implement [`CameraSource`]. The default build enables a `mock`
//! backend so binaries and tests run on any host; the `opencv` feature adds a
//! `VideoCapture` backend.

mod types;
pub use types::{DeviceSpec, Frame, PixelFormat};

mod error;
pub use error::{Error, Result};

mod traits;
pub use traits::{BoxedSource, CameraSource};

mod config;
pub use config::{StreamConfig, DEFAULT_STREAM_NAME};

mod stats;
pub use stats::StatsSnapshot;

mod stream;
pub use stream::{FrameStream, StreamState};

#[cfg(feature = "mock")]
pub mod mock;
#[cfg(feature = "mock")]
pub use mock::MockCamera;

#[cfg(feature = "opencv")]
mod opencv_backend;
#[cfg(feature = "opencv")]
pub use opencv_backend::OpenCvCamera;
