use crate::{CameraSource, DeviceSpec, Error, Frame, PixelFormat, Result};
use opencv::prelude::*;
use opencv::{core, imgproc, videoio};
use time::OffsetDateTime;

/// Camera backed by OpenCV's `VideoCapture` (USB index, file or URL).
pub struct OpenCvCamera {
    cap: videoio::VideoCapture,
    spec: DeviceSpec,
    released: bool,
}

impl CameraSource for OpenCvCamera {
    fn open(spec: &str) -> Result<Self> {
        let parsed: DeviceSpec = spec.parse()?;
        let cap = match &parsed {
            DeviceSpec::Index(idx) => videoio::VideoCapture::new(*idx as i32, videoio::CAP_ANY),
            DeviceSpec::Path(path) => videoio::VideoCapture::from_file(path, videoio::CAP_ANY),
        }
        .map_err(|e| Error::device_open(spec, e))?;
        let opened =
            videoio::VideoCapture::is_opened(&cap).map_err(|e| Error::device_open(spec, e))?;
        if !opened {
            return Err(Error::device_open(spec, "device not found or busy"));
        }
        tracing::info!(device = %parsed, "opencv capture opened");
        Ok(Self {
            cap,
            spec: parsed,
            released: false,
        })
    }

    fn read(&mut self) -> Result<Frame> {
        if self.released {
            return Err(Error::Capture("device released".into()));
        }
        let mut mat = core::Mat::default();
        let grabbed = self
            .cap
            .read(&mut mat)
            .map_err(|e| Error::Capture(e.to_string()))?;
        if !grabbed || mat.empty() {
            return Err(Error::Capture("empty frame".into()));
        }

        let width = mat.cols() as u32;
        let height = mat.rows() as u32;

        let mut rgb = core::Mat::default();
        imgproc::cvt_color(&mat, &mut rgb, imgproc::COLOR_BGR2RGB, 0)
            .map_err(|e| Error::Capture(e.to_string()))?;

        let data = rgb
            .data_bytes()
            .map_err(|e| Error::Capture(e.to_string()))?
            .to_vec();
        Ok(Frame {
            seq: 0,
            width,
            height,
            pixel_format: PixelFormat::Rgb8,
            data,
            ts: Some(OffsetDateTime::now_utc()),
        })
    }

    fn release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        self.cap
            .release()
            .map_err(|e| Error::Io(format!("release {}: {e}", self.spec)))
    }

    fn describe(&self) -> String {
        format!("opencv:{}", self.spec)
    }
}
