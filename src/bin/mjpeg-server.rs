//! MJPEG server demo
//!
//! Streams a fixed set of JPEG files in a loop, standing in for a camera.
//!
//! ```text
//! mjpeg-server --auth basic --credentials users.txt frame1.jpg frame2.jpg
//! ```
//!
//! Then open http://localhost:8090/ in a browser. The credentials file holds
//! one `username:password` per line.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use bytes::Bytes;
use clap::Parser;

use mjpeg_rs::server::config::{DEFAULT_MAX_CLIENTS, DEFAULT_PORT};
use mjpeg_rs::{AuthScheme, Credentials, MjpegServer, ServerConfig};

#[derive(Parser, Debug)]
#[command(name = "mjpeg-server")]
#[command(about = "Serve JPEG files as a live MJPEG stream")]
struct Args {
    /// Port to listen on
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Address to bind to
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    bind: IpAddr,

    /// Authentication scheme: none, basic or digest
    #[arg(long, default_value_t = AuthScheme::Digest)]
    auth: AuthScheme,

    /// Realm announced to browsers
    #[arg(long, default_value = mjpeg_rs::auth::DEFAULT_REALM)]
    realm: String,

    /// File with one `username:password` per line
    #[arg(long)]
    credentials: Option<PathBuf>,

    /// Maximum concurrent viewers (0 = unlimited)
    #[arg(long, default_value_t = DEFAULT_MAX_CLIENTS)]
    max_clients: usize,

    /// Frames buffered before the oldest are dropped
    #[arg(long, default_value_t = mjpeg_rs::media::queue::DEFAULT_CAPACITY)]
    max_frames: usize,

    /// Frames produced per second
    #[arg(long, default_value_t = 10)]
    fps: u32,

    /// JPEG files to stream, repeated in order
    #[arg(required = true)]
    frames: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mjpeg_rs=info".parse()?)
                .add_directive("mjpeg_server=info".parse()?),
        )
        .init();

    let frames = load_frames(&args.frames)?;

    let credentials = match &args.credentials {
        Some(path) => Credentials::load(path)
            .with_context(|| format!("failed to load credentials from {}", path.display()))?,
        None => Credentials::new(),
    };
    if args.auth != AuthScheme::None && credentials.is_empty() {
        bail!("--auth {} requires --credentials", args.auth);
    }

    let config = ServerConfig::with_addr(SocketAddr::new(args.bind, args.port))
        .auth_scheme(args.auth)
        .realm(args.realm)
        .max_clients(args.max_clients)
        .max_queued_frames(args.max_frames);

    let server = Arc::new(MjpegServer::new(config, credentials));
    let addr = server.start().await.context("failed to start server")?;

    tracing::info!(%addr, frames = frames.len(), fps = args.fps, "Streaming; press Ctrl+C to stop");

    let running = Arc::new(AtomicBool::new(true));
    let capture = {
        let server = Arc::clone(&server);
        let running = Arc::clone(&running);
        let interval = Duration::from_secs(1) / args.fps.max(1);

        std::thread::spawn(move || {
            for frame in frames.iter().cycle() {
                if !running.load(Ordering::Relaxed) {
                    break;
                }
                server.put_frame(frame.clone());
                std::thread::sleep(interval);
            }
        })
    };

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");

    running.store(false, Ordering::Relaxed);
    server.stop().await?;

    if capture.join().is_err() {
        tracing::error!("Capture thread panicked");
    }

    let stats = server.stats().await;
    tracing::info!(
        frames_broadcast = stats.frames_broadcast,
        frames_dropped = stats.frames_dropped,
        viewers_admitted = stats.viewers_admitted,
        bytes_sent = stats.bytes_sent,
        "Final statistics"
    );

    Ok(())
}

fn load_frames(paths: &[PathBuf]) -> anyhow::Result<Vec<Bytes>> {
    paths
        .iter()
        .map(|path| {
            let data = std::fs::read(path)
                .with_context(|| format!("failed to read frame {}", path.display()))?;
            if data.is_empty() {
                bail!("frame {} is empty", path.display());
            }
            Ok(Bytes::from(data))
        })
        .collect()
}
