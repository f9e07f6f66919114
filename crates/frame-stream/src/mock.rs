use crate::{CameraSource, DeviceSpec, Error, Frame, PixelFormat, Result, StreamConfig};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;
use time::OffsetDateTime;

/// Number of synthetic devices (`0..MOCK_DEVICE_COUNT`).
pub const MOCK_DEVICE_COUNT: u32 = 16;
pub const MOCK_WIDTH: u32 = 320;
pub const MOCK_HEIGHT: u32 = 240;
pub const MOCK_DEFAULT_FPS: u32 = 60;

// Indices currently held by an open MockCamera.
static HELD: Mutex<Vec<u32>> = Mutex::new(Vec::new());

fn claim(index: u32) -> bool {
    let mut held = HELD.lock().unwrap_or_else(|e| e.into_inner());
    if held.contains(&index) {
        return false;
    }
    held.push(index);
    true
}

fn unclaim(index: u32) {
    let mut held = HELD.lock().unwrap_or_else(|e| e.into_inner());
    held.retain(|&i| i != index);
}

/// Synthetic camera that behaves like an exclusively owned USB device.
///
/// Frames are paced at the configured rate and carry a gray ramp shifted by
/// the frame counter, so consecutive frames differ.
pub struct MockCamera {
    index: u32,
    counter: u64,
    interval: Duration,
    fail_every: Option<u64>,
    held: bool,
}

impl MockCamera {
    pub fn open_index(index: u32) -> Result<Self> {
        if index >= MOCK_DEVICE_COUNT {
            return Err(Error::device_open(
                index.to_string(),
                format!("no mock device (have {MOCK_DEVICE_COUNT})"),
            ));
        }
        if !claim(index) {
            return Err(Error::device_open(index.to_string(), "device busy"));
        }
        tracing::debug!(device = index, "mock camera opened");
        Ok(Self {
            index,
            counter: 0,
            interval: fps_interval(MOCK_DEFAULT_FPS),
            fail_every: None,
            held: true,
        })
    }

    /// Pace reads at `fps` frames per second. Zero disables pacing.
    pub fn with_fps(mut self, fps: u32) -> Self {
        self.interval = fps_interval(fps);
        self
    }

    /// Make every `n`-th read fail with [`Error::Capture`].
    pub fn fail_every(mut self, n: u64) -> Self {
        self.fail_every = (n > 0).then_some(n);
        self
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    /// Whether some open MockCamera currently holds `index`.
    pub fn is_held(index: u32) -> bool {
        HELD.lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&index)
    }
}

fn fps_interval(fps: u32) -> Duration {
    if fps == 0 {
        Duration::ZERO
    } else {
        Duration::from_micros(1_000_000 / fps as u64)
    }
}

fn parse_mock_spec(spec: &str) -> Result<u32> {
    let trimmed = spec.trim();
    let raw = trimmed.strip_prefix("mock://").unwrap_or(trimmed);
    match raw.parse::<DeviceSpec>()? {
        DeviceSpec::Index(idx) => Ok(idx),
        DeviceSpec::Path(_) => Err(Error::device_open(spec, "not a mock device")),
    }
}

impl CameraSource for MockCamera {
    fn open(spec: &str) -> Result<Self> {
        Self::open_index(parse_mock_spec(spec)?)
    }

    fn read(&mut self) -> Result<Frame> {
        if !self.held {
            return Err(Error::Capture("device released".into()));
        }
        if !self.interval.is_zero() {
            thread::sleep(self.interval);
        }
        self.counter += 1;
        if let Some(n) = self.fail_every {
            if self.counter % n == 0 {
                return Err(Error::Capture(format!(
                    "mock{} injected failure at read {}",
                    self.index, self.counter
                )));
            }
        }

        let width = MOCK_WIDTH;
        let height = MOCK_HEIGHT;
        let shift = self.counter as u32;
        let mut data = vec![0u8; (width * height) as usize];
        for y in 0..height {
            for x in 0..width {
                let idx = (y * width + x) as usize;
                data[idx] = ((x + y + shift) % 256) as u8;
            }
        }
        Ok(Frame {
            seq: 0,
            width,
            height,
            pixel_format: PixelFormat::Gray8,
            data,
            ts: Some(OffsetDateTime::now_utc()),
        })
    }

    fn configure(&mut self, config: &StreamConfig) {
        self.interval = fps_interval(config.mock_fps);
    }

    fn release(&mut self) -> Result<()> {
        if self.held {
            unclaim(self.index);
            self.held = false;
            tracing::debug!(device = self.index, "mock camera released");
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("mock://{}", self.index)
    }
}

impl Drop for MockCamera {
    fn drop(&mut self) {
        let _ = self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_rejects_unknown_device() {
        assert!(matches!(
            MockCamera::open("999"),
            Err(Error::DeviceOpen { .. })
        ));
        assert!(matches!(
            MockCamera::open("/dev/video0"),
            Err(Error::DeviceOpen { .. })
        ));
    }

    #[test]
    fn test_exclusive_open_and_release() {
        let mut cam = MockCamera::open("mock://15").unwrap();
        assert_eq!(cam.index(), 15);
        assert!(MockCamera::is_held(15));
        assert!(matches!(
            MockCamera::open("15"),
            Err(Error::DeviceOpen { .. })
        ));

        cam.release().unwrap();
        assert!(!MockCamera::is_held(15));
        assert!(cam.read().is_err());

        let again = MockCamera::open("15").unwrap();
        drop(again);
        assert!(!MockCamera::is_held(15));
    }

    #[test]
    fn test_frames_change_between_reads() {
        let mut cam = MockCamera::open("14").unwrap().with_fps(0);
        let a = cam.read().unwrap();
        let b = cam.read().unwrap();
        assert_eq!(a.expected_len(), a.data.len());
        assert_eq!(a.pixel_format, PixelFormat::Gray8);
        assert_ne!(a.data, b.data);
    }

    #[test]
    fn test_configure_sets_frame_rate() {
        let mut cam = MockCamera::open("12").unwrap();
        assert_eq!(cam.interval, fps_interval(MOCK_DEFAULT_FPS));
        let config = StreamConfig {
            mock_fps: 5,
            ..StreamConfig::default()
        };
        cam.configure(&config);
        assert_eq!(cam.interval, Duration::from_millis(200));
    }

    #[test]
    fn test_fail_every() {
        let mut cam = MockCamera::open("13").unwrap().with_fps(0).fail_every(2);
        assert!(cam.read().is_ok());
        assert!(matches!(cam.read(), Err(Error::Capture(_))));
        assert!(cam.read().is_ok());
    }
}
