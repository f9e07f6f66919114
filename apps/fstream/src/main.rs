use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use frame_stream::{BoxedSource, CameraSource, FrameStream, StreamConfig};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "fstream",
    version,
    about = "Threaded camera frame stream demo",
    disable_help_subcommand = true
)]
struct Cli {
    /// YAML stream config (missing file means defaults)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List compiled-in camera backends
    List,
    /// Open a device, print the synchronously captured first frame, close it
    Probe {
        /// Device spec: index like 0 or a path
        #[arg(long)]
        device: Option<String>,
        /// Use OpenCV backend if available; otherwise mock
        #[arg(long, action = ArgAction::SetTrue)]
        opencv: bool,
    },
    /// Stream a device and periodically report the latest frame until Ctrl-C
    Watch {
        /// Device spec: index like 0 or a path
        #[arg(long)]
        device: Option<String>,
        /// Use OpenCV backend if available; otherwise mock
        #[arg(long, action = ArgAction::SetTrue)]
        opencv: bool,
        /// Capture thread name
        #[arg(long)]
        name: Option<String>,
        /// Warm-up delay before the first report
        #[arg(long, default_value_t = 2000u64)]
        warmup_ms: u64,
        /// Report interval
        #[arg(long, default_value_t = 500u64)]
        interval_ms: u64,
        /// Exit after this many distinct frames were reported
        #[arg(long)]
        max_frames: Option<u64>,
        /// Print reports as JSON lines
        #[arg(long, action = ArgAction::SetTrue)]
        json: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    setup_tracing();
    let cli = Cli::parse();
    let base = match &cli.config {
        Some(path) => StreamConfig::load(path)
            .map_err(|e| anyhow::anyhow!("config load failed: {e}"))?,
        None => StreamConfig::default(),
    };

    match cli.command {
        Commands::List => list(),
        Commands::Probe { device, opencv } => {
            let config = StreamConfig {
                device: device.unwrap_or(base.device.clone()),
                ..base
            };
            probe(config, opencv)
        }
        Commands::Watch {
            device,
            opencv,
            name,
            warmup_ms,
            interval_ms,
            max_frames,
            json,
        } => {
            let config = StreamConfig {
                device: device.unwrap_or(base.device.clone()),
                name: name.or(base.name.clone()),
                ..base
            };
            let opts = WatchOpts {
                warmup: Duration::from_millis(warmup_ms),
                interval: Duration::from_millis(interval_ms.max(1)),
                max_frames,
                json,
            };
            watch(config, opencv, opts).await
        }
    }
}

fn setup_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn list() -> Result<()> {
    #[cfg(not(feature = "opencv"))]
    println!("camera backends: mock (enable opencv via cargo features)");
    #[cfg(feature = "opencv")]
    println!("camera backends: mock, opencv");
    println!("hint: use 'fstream watch --device 0 --opencv' to stream a USB camera");
    Ok(())
}

fn open_source(config: &StreamConfig, opencv: bool) -> Result<BoxedSource> {
    if opencv {
        #[cfg(feature = "opencv")]
        {
            let cam = frame_stream::OpenCvCamera::open(&config.device)
                .map_err(|e| anyhow::anyhow!("opencv open failed: {e}"))?;
            return Ok(Box::new(cam));
        }
        #[cfg(not(feature = "opencv"))]
        {
            warn!("OpenCV backend not enabled at compile time; using mock");
        }
    }
    let cam = frame_stream::MockCamera::open(&config.device)
        .map_err(|e| anyhow::anyhow!("mock open failed: {e}"))?;
    Ok(Box::new(cam))
}

fn open_stream(config: StreamConfig, opencv: bool) -> Result<FrameStream<BoxedSource>> {
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("bad config: {e}"))?;
    let mut source = open_source(&config, opencv)?;
    source.configure(&config);
    FrameStream::from_source(source, config).map_err(|e| anyhow::anyhow!("stream open failed: {e}"))
}

fn probe(config: StreamConfig, opencv: bool) -> Result<()> {
    let stream = open_stream(config, opencv)?;
    let f = stream.read();
    println!(
        "{}: seq={} {}x{} {:?} ts={:?}",
        stream.device(),
        f.seq,
        f.width,
        f.height,
        f.pixel_format,
        f.ts
    );
    stream.stop();
    Ok(())
}

struct WatchOpts {
    warmup: Duration,
    interval: Duration,
    max_frames: Option<u64>,
    json: bool,
}

async fn watch(config: StreamConfig, opencv: bool, opts: WatchOpts) -> Result<()> {
    let stream = open_stream(config, opencv)?;
    stream
        .start()
        .map_err(|e| anyhow::anyhow!("stream start failed: {e}"))?;

    info!(device = %stream.device(), "warming up");
    tokio::time::sleep(opts.warmup).await;
    info!("streaming; press Ctrl-C to stop");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut ticker = tokio::time::interval(opts.interval);
    let mut last_seq = None;
    let mut reported = 0u64;
    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("interrupted");
                break;
            }
            _ = ticker.tick() => {
                if !stream.is_running() {
                    warn!("capture loop exited");
                    break;
                }
                let frame = stream.read();
                if last_seq == Some(frame.seq) {
                    continue;
                }
                last_seq = Some(frame.seq);
                reported += 1;
                let stats = stream.stats();
                if opts.json {
                    let line = serde_json::json!({
                        "seq": frame.seq,
                        "width": frame.width,
                        "height": frame.height,
                        "format": format!("{:?}", frame.pixel_format),
                        "stats": stats,
                    });
                    println!("{line}");
                } else {
                    println!(
                        "seq={} {}x{} {:?} captured={} errors={}",
                        frame.seq,
                        frame.width,
                        frame.height,
                        frame.pixel_format,
                        stats.frames_captured,
                        stats.capture_errors
                    );
                }
                if opts.max_frames.is_some_and(|max| reported >= max) {
                    break;
                }
            }
        }
    }

    stream.stop();
    let stats = stream.stats();
    info!(
        frames = stats.frames_captured,
        errors = stats.capture_errors,
        "stream shut down"
    );
    Ok(())
}
