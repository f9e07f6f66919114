//! Background capture with a latest-value-wins frame handoff.
//!
//! One thread owns the [`CameraSource`] and publishes every frame it reads
//! into an [`ArcSwap`]. Readers load the current `Arc<Frame>` without locking
//! and never observe a partially written frame.

use crate::stats::CaptureStats;
use crate::{CameraSource, Error, Frame, Result, StatsSnapshot, StreamConfig};
use arc_swap::ArcSwap;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

const WAIT_POLL: Duration = Duration::from_millis(1);

const CREATED: u8 = 0;
const STARTED: u8 = 1;
const STOPPED: u8 = 2;

/// Lifecycle of a [`FrameStream`]. Transitions only move forward.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StreamState {
    Created,
    Started,
    Stopped,
}

impl StreamState {
    fn from_u8(v: u8) -> Self {
        match v {
            CREATED => StreamState::Created,
            STARTED => StreamState::Started,
            _ => StreamState::Stopped,
        }
    }
}

struct Shared {
    latest: ArcSwap<Frame>,
    running: AtomicBool,
    stats: CaptureStats,
}

/// Continuously refreshes the latest frame of a capture device.
pub struct FrameStream<S: CameraSource + Send + 'static> {
    name: String,
    device: String,
    max_consecutive_failures: Option<u32>,
    shared: Arc<Shared>,
    state: AtomicU8,
    // Held here until `start` hands it to the capture thread.
    source: Mutex<Option<S>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl<S: CameraSource + Send + 'static> FrameStream<S> {
    /// Open `spec` with default settings.
    pub fn open(spec: &str) -> Result<Self> {
        Self::with_config(StreamConfig {
            device: spec.to_string(),
            ..StreamConfig::default()
        })
    }

    /// Open `config.device`, apply backend settings from `config` and
    /// capture the first frame synchronously.
    pub fn with_config(config: StreamConfig) -> Result<Self> {
        config.validate()?;
        let mut source = S::open(&config.device).map_err(|e| match e {
            Error::DeviceOpen { .. } => e,
            other => Error::device_open(config.device.as_str(), other),
        })?;
        source.configure(&config);
        Self::from_source(source, config)
    }

    /// Wrap an already opened source. The first frame is read before this
    /// returns; if that fails the source is released and construction fails.
    pub fn from_source(mut source: S, config: StreamConfig) -> Result<Self> {
        if let Err(e) = config.validate() {
            let _ = source.release();
            return Err(e);
        }
        let device = source.describe();
        let mut first = match source.read() {
            Ok(frame) => frame,
            Err(e) => {
                let _ = source.release();
                return Err(Error::device_open(device, format!("initial frame: {e}")));
            }
        };
        first.seq = 0;

        let name = config.thread_name().to_string();
        info!(
            stream = %name,
            device = %device,
            width = first.width,
            height = first.height,
            "stream opened"
        );

        let shared = Shared {
            latest: ArcSwap::from_pointee(first),
            running: AtomicBool::new(true),
            stats: CaptureStats::default(),
        };
        shared.stats.record_frame();

        Ok(Self {
            name,
            device,
            max_consecutive_failures: config.max_consecutive_failures,
            shared: Arc::new(shared),
            state: AtomicU8::new(CREATED),
            source: Mutex::new(Some(source)),
            worker: Mutex::new(None),
        })
    }

    /// Spawn the capture thread. Returns `self` so it can be chained after
    /// construction.
    pub fn start(&self) -> Result<&Self> {
        match self
            .state
            .compare_exchange(CREATED, STARTED, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {}
            Err(STARTED) => return Err(Error::AlreadyStarted),
            Err(_) => return Err(Error::Stopped),
        }
        // Held until the handle is stored so a concurrent stop joins it.
        let mut worker = lock(&self.worker);
        // A concurrent stop may have released the source already.
        let source = lock(&self.source).take().ok_or(Error::Stopped)?;

        let shared = Arc::clone(&self.shared);
        let name = self.name.clone();
        let max_failures = self.max_consecutive_failures;
        let handle = thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || capture_loop(source, &shared, &name, max_failures))
            .map_err(|e| {
                self.shared.running.store(false, Ordering::Release);
                self.state.store(STOPPED, Ordering::Release);
                Error::Spawn(e.to_string())
            })?;
        *worker = Some(handle);
        info!(stream = %self.name, device = %self.device, "capture started");
        Ok(self)
    }

    /// The most recently published frame. Never blocks.
    pub fn read(&self) -> Arc<Frame> {
        self.shared.latest.load_full()
    }

    /// Sequence number of the most recently published frame.
    pub fn latest_seq(&self) -> u64 {
        self.shared.latest.load().seq
    }

    /// Block until a frame newer than `after_seq` is published.
    pub fn wait_for_frame(&self, after_seq: u64, timeout: Duration) -> Result<Arc<Frame>> {
        let deadline = Instant::now() + timeout;
        loop {
            let frame = self.read();
            if frame.seq > after_seq {
                return Ok(frame);
            }
            match self.state() {
                StreamState::Created => return Err(Error::NotStarted),
                StreamState::Stopped => return Err(Error::Stopped),
                StreamState::Started => {}
            }
            if !self.shared.running.load(Ordering::Acquire) {
                return Err(Error::Stopped);
            }
            if Instant::now() >= deadline {
                return Err(Error::Timeout(timeout));
            }
            thread::sleep(WAIT_POLL);
        }
    }

    /// Signal the capture thread to exit and wait until it has released the
    /// device. Safe to call from any thread and more than once.
    pub fn stop(&self) {
        self.shared.running.store(false, Ordering::Release);
        let prev = self.state.swap(STOPPED, Ordering::AcqRel);

        if let Some(mut source) = lock(&self.source).take() {
            if let Err(e) = source.release() {
                warn!(stream = %self.name, error = %e, "device release failed");
            }
        }

        // Held across the join so a concurrent stop also waits for release.
        let mut worker = lock(&self.worker);
        if let Some(handle) = worker.take() {
            if handle.join().is_err() {
                error!(stream = %self.name, "capture thread panicked");
            }
        }

        if prev != STOPPED {
            info!(stream = %self.name, device = %self.device, "stream stopped");
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> StreamState {
        StreamState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// True while the capture thread is pulling frames.
    pub fn is_running(&self) -> bool {
        self.state() == StreamState::Started && self.shared.running.load(Ordering::Acquire)
    }

    /// Snapshot of the capture counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Capture thread name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Backend description of the device, e.g. `mock://3`.
    pub fn device(&self) -> &str {
        &self.device
    }
}

impl<S: CameraSource + Send + 'static> Drop for FrameStream<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn capture_loop<S: CameraSource>(
    mut source: S,
    shared: &Shared,
    name: &str,
    max_failures: Option<u32>,
) {
    let mut seq = shared.latest.load().seq;
    debug!(stream = name, "capture loop running");

    while shared.running.load(Ordering::Acquire) {
        match source.read() {
            Ok(mut frame) => {
                seq += 1;
                frame.seq = seq;
                shared.latest.store(Arc::new(frame));
                shared.stats.record_frame();
            }
            Err(e) => {
                let streak = shared.stats.record_error(&e);
                if streak == 1 {
                    warn!(stream = name, seq, error = %e, "capture failed, retrying");
                } else {
                    debug!(stream = name, streak, error = %e, "capture still failing");
                }
                if max_failures.is_some_and(|max| streak >= max) {
                    error!(
                        stream = name,
                        streak, "too many consecutive capture failures, giving up"
                    );
                    break;
                }
            }
        }
    }

    shared.running.store(false, Ordering::Release);
    if let Err(e) = source.release() {
        warn!(stream = name, error = %e, "device release failed");
    }
    drop(source);
    info!(stream = name, frames = seq, "capture loop exited, device released");
}
