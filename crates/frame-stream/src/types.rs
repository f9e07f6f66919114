use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;

use crate::Error;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PixelFormat {
    Bgr8,
    Rgb8,
    Gray8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Bgr8 | PixelFormat::Rgb8 => 3,
            PixelFormat::Gray8 => 1,
        }
    }
}

/// One captured image.
///
/// `seq` is assigned by [`crate::FrameStream`] when the frame is published;
/// sources leave it at zero.
#[derive(Clone, Debug)]
pub struct Frame {
    pub seq: u64,
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
    pub data: Vec<u8>,
    pub ts: Option<OffsetDateTime>,
}

impl Frame {
    pub fn is_empty(&self) -> bool {
        self.data.is_empty() || self.width == 0 || self.height == 0
    }

    /// Byte length implied by the dimensions and pixel format.
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * self.pixel_format.bytes_per_pixel()
    }
}

/// Identifies a capture device: a numeric index or a backend-specific path.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum DeviceSpec {
    Index(u32),
    Path(String),
}

impl FromStr for DeviceSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::DeviceOpen {
                spec: String::new(),
                reason: "empty device spec".into(),
            });
        }
        if s.bytes().all(|b| b.is_ascii_digit()) {
            let idx = s.parse::<u32>().map_err(|e| Error::DeviceOpen {
                spec: s.to_string(),
                reason: e.to_string(),
            })?;
            return Ok(DeviceSpec::Index(idx));
        }
        Ok(DeviceSpec::Path(s.to_string()))
    }
}

impl fmt::Display for DeviceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceSpec::Index(idx) => write!(f, "{idx}"),
            DeviceSpec::Path(path) => f.write_str(path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_spec_parse() {
        assert_eq!("0".parse::<DeviceSpec>().unwrap(), DeviceSpec::Index(0));
        assert_eq!(" 12 ".parse::<DeviceSpec>().unwrap(), DeviceSpec::Index(12));
        assert_eq!(
            "/dev/video2".parse::<DeviceSpec>().unwrap(),
            DeviceSpec::Path("/dev/video2".into())
        );
        assert_eq!(
            "-1".parse::<DeviceSpec>().unwrap(),
            DeviceSpec::Path("-1".into())
        );
        assert!(matches!(
            "".parse::<DeviceSpec>(),
            Err(Error::DeviceOpen { .. })
        ));
        assert!("99999999999".parse::<DeviceSpec>().is_err());
    }

    #[test]
    fn test_device_spec_display() {
        assert_eq!(DeviceSpec::Index(3).to_string(), "3");
        assert_eq!(DeviceSpec::Path("mock://4".into()).to_string(), "mock://4");
    }

    #[test]
    fn test_frame_expected_len() {
        let frame = Frame {
            seq: 0,
            width: 4,
            height: 2,
            pixel_format: PixelFormat::Rgb8,
            data: vec![0; 24],
            ts: None,
        };
        assert_eq!(frame.expected_len(), 24);
        assert!(!frame.is_empty());
    }
}
