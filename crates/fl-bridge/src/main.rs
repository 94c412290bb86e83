use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use fl_core::{OutputPixelFormat, TransportKind};
use fl_transport::TransportFactory;

mod bridge;
mod config;
mod metrics;
mod pattern;

use bridge::{report, Bridge};
use config::Config;
use pattern::Pattern;

#[derive(Parser, Debug)]
#[command(name = "framelink")]
#[command(about = "Send and receive uncompressed video frames over the network", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "framelink.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Print statistics as JSON lines on stdout
    #[arg(long)]
    json_stats: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Announce a source and stream a test pattern
    Send {
        /// Source name (overrides config)
        #[arg(short, long)]
        name: Option<String>,

        /// UDP target address; switches the transport to UDP
        #[arg(short, long)]
        target: Option<String>,

        /// Send 16-bit 4:2:2 instead of BGRA
        #[arg(long)]
        p210: bool,

        #[arg(long, value_enum)]
        pattern: Option<Pattern>,

        /// Stop after this many frames
        #[arg(long)]
        frames: Option<u64>,
    },

    /// Open a source and consume its frames
    Receive {
        /// `<scheme>://<source name>`
        url: String,

        /// Stop after this many samples
        #[arg(long)]
        frames: Option<u64>,
    },

    /// Run sender and receiver in one process over the loopback transport
    Loopback {
        #[arg(long, value_enum)]
        pattern: Option<Pattern>,

        #[arg(long)]
        p210: bool,

        #[arg(long)]
        frames: Option<u64>,
    },

    /// List the sources the configured transport can see
    ListSources,

    /// Write the effective configuration to a file
    WriteConfig {
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    if args.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }

    info!("framelink v{}", env!("CARGO_PKG_VERSION"));

    let mut config = if args.config.exists() {
        info!("Loading configuration from: {}", args.config.display());
        Config::from_file(&args.config)?
    } else {
        warn!("Config file not found, using defaults");
        Config::default()
    };

    match &args.command {
        Command::Send { name, target, p210, pattern, .. } => {
            if let Some(name) = name {
                config.capture.source_name = name.clone();
            }
            if let Some(target) = target {
                config.transport.kind = TransportKind::Udp;
                config.transport.target = Some(target.clone());
            }
            if *p210 {
                config.capture.output_pixel_format = OutputPixelFormat::P210;
            }
            if let Some(pattern) = pattern {
                config.run.pattern = *pattern;
            }
        }
        Command::Loopback { pattern, p210, .. } => {
            config.transport.kind = TransportKind::Loopback;
            if *p210 {
                config.capture.output_pixel_format = OutputPixelFormat::P210;
            }
            if let Some(pattern) = pattern {
                config.run.pattern = *pattern;
            }
        }
        _ => {}
    }

    config.validate()?;

    if let Command::WriteConfig { path } = &args.command {
        config.to_file(path)?;
        info!("Configuration written to {}", path.display());
        return Ok(());
    }

    let (transport, finder) = TransportFactory::create(&config.transport)
        .context("Failed to create transport")?;

    info!("Configuration:");
    info!("  Transport: {:?}", config.transport.kind);
    info!(
        "  Capture: {:?} as {:?} at {} fps",
        config.capture.source_name, config.capture.output_pixel_format, config.capture.frame_rate
    );

    let mut bridge = Bridge::new(config.clone());

    match &args.command {
        Command::Send { frames, .. } => {
            bridge.start_sender(transport, *frames)?;
        }
        Command::Receive { url, frames } => {
            bridge.start_receiver(transport, finder, url, *frames)?;
        }
        Command::Loopback { frames, .. } => {
            bridge.start_sender(transport.clone(), *frames)?;
            let url = format!("{}://{}", config.player.scheme, config.capture.source_name);
            bridge.start_receiver(transport, finder, &url, *frames)?;
        }
        Command::ListSources => {
            let sources = finder.current_sources();
            println!("{} sources:", sources.len());
            for source in sources {
                println!("  {}", source);
            }
            return Ok(());
        }
        Command::WriteConfig { .. } => return Ok(()),
    }

    bridge.start_reporter(args.json_stats);
    info!("   Press Ctrl+C to stop");

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to install Ctrl+C handler")?;
            info!("Received Ctrl+C, shutting down...");
        }
        _ = bridge.wait() => {
            info!("All pipelines finished");
        }
    }

    let snapshot = bridge.stop().await;
    info!("Final statistics:");
    report(&snapshot, args.json_stats);
    info!("  Uptime: {:.1} seconds", snapshot.uptime_secs);

    Ok(())
}
