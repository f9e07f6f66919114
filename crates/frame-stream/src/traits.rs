use crate::{Frame, Result, StreamConfig};

/// A blocking camera device. One implementation per device kind.
pub trait CameraSource {
    /// Open a camera source by device index or path string.
    fn open(spec: &str) -> Result<Self>
    where
        Self: Sized;

    /// Read a single frame, blocking until the device delivers it.
    fn read(&mut self) -> Result<Frame>;

    /// Apply backend-specific settings from `config`. Called once after
    /// `open`, before the first read.
    fn configure(&mut self, _config: &StreamConfig) {}

    /// Release the underlying device. Dropping the source releases it as well.
    fn release(&mut self) -> Result<()> {
        Ok(())
    }

    /// Human readable identity for logs.
    fn describe(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }
}

/// A source whose backend is chosen at runtime.
pub type BoxedSource = Box<dyn CameraSource + Send>;

impl CameraSource for BoxedSource {
    fn open(_spec: &str) -> Result<Self> {
        Err(crate::Error::Unsupported(
            "open a concrete backend and box it instead",
        ))
    }

    fn read(&mut self) -> Result<Frame> {
        (**self).read()
    }

    fn configure(&mut self, config: &StreamConfig) {
        (**self).configure(config)
    }

    fn release(&mut self) -> Result<()> {
        (**self).release()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
