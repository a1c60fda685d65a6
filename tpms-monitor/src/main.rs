use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::WrapErr;
use tokio_util::sync::CancellationToken;
use tpms_core::{Analyzer, extract_log};
use tpms_monitor::transport::serial::{available_ports, port_type_name};
use tpms_monitor::{
    ByteSource, CaptureLog, Config, FrameReader, LiveEvent, SerialSource, SimulatedSource,
    TransportConfig, present, spawn_decoder,
};
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(name = "tpms-monitor")]
#[command(about = "Decode and analyze TPMS receiver traffic")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "tpms-monitor.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decode frames from the configured transport until Ctrl+C
    Monitor,
    /// Analyze a capture log offline
    Analyze {
        /// Capture log written by `monitor`
        log: PathBuf,
        /// Ambient temperature in °F to correlate the temperature byte against
        #[arg(long)]
        ambient: Option<f64>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
        /// Number of frames to show per-hypothesis checksum results for
        #[arg(long, default_value_t = tpms_core::report::DEFAULT_SAMPLE_LIMIT)]
        samples: usize,
    },
    /// List serial ports
    Ports,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "tpms_monitor=info,tpms_core=info".to_owned());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = if cli.config.exists() {
        info!(path = ?cli.config, "Loading configuration");
        Config::load(&cli.config)?
    } else {
        info!("No configuration file found, using defaults");
        Config::default()
    };

    match cli.command {
        Command::Monitor => monitor(config).await,
        Command::Analyze {
            log,
            ambient,
            json,
            samples,
        } => analyze(&config, &log, ambient, json, samples),
        Command::Ports => ports(),
    }
}

async fn monitor(config: Config) -> color_eyre::Result<()> {
    match &config.transport {
        TransportConfig::Serial { port, baud_rate } => {
            info!(port, baud_rate, "Using serial transport");
            let source = SerialSource::open(port, *baud_rate)
                .wrap_err_with(|| format!("failed to open serial port {port}"))?;
            run_monitor(source, &config).await
        }
        TransportConfig::Simulated { interval_ms, seed } => {
            info!(interval_ms, ?seed, "Using simulated transport");
            let interval = Duration::from_millis(*interval_ms);
            let source = match seed {
                Some(seed) => SimulatedSource::seeded(interval, *seed),
                None => SimulatedSource::new(interval),
            };
            run_monitor(source, &config).await
        }
    }
}

async fn run_monitor<S: ByteSource>(source: S, config: &Config) -> color_eyre::Result<()> {
    let cancel = CancellationToken::new();

    let mut reader = FrameReader::new(source, config.decoder.poll_interval());
    if let Some(path) = &config.capture.log_path {
        let capture = CaptureLog::open(path)
            .wrap_err_with(|| format!("failed to open capture log {}", path.display()))?;
        info!(path = ?path, "Capturing received bytes");
        reader = reader.with_capture(capture);
    }

    let classifier = config.classifier();
    info!(
        layout = ?classifier.layout(),
        sensors = classifier.registry().iter().count(),
        "Classifier ready"
    );
    for (id, label) in classifier.registry().iter() {
        debug!(id, label, "Sensor location");
    }

    let (mut rx, handle) = spawn_decoder(
        reader,
        classifier,
        cancel.clone(),
        config.decoder.channel_capacity,
    );

    info!("Monitoring, press Ctrl+C to stop");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                cancel.cancel();
                break;
            }
            event = rx.recv() => match event {
                Some(LiveEvent::Decoded { packet, received_at }) => {
                    println!("[{received_at}]");
                    println!("{}", present::render_packet(&packet));
                }
                Some(LiveEvent::Rejected { frame, error, .. }) => {
                    warn!(%frame, %error, "Frame rejected");
                }
                None => break,
            }
        }
    }

    drop(rx);
    handle.await??;

    info!("tpms-monitor shut down complete");
    Ok(())
}

fn analyze(
    config: &Config,
    log: &Path,
    ambient: Option<f64>,
    json: bool,
    samples: usize,
) -> color_eyre::Result<()> {
    let text = std::fs::read_to_string(log)
        .wrap_err_with(|| format!("failed to read capture log {}", log.display()))?;
    let extraction = extract_log(&text);

    let mut analyzer = Analyzer::new(config.classifier()).with_sample_limit(samples);
    if let Some(ambient) = ambient {
        analyzer = analyzer.with_reference(ambient);
    }

    let report = analyzer.analyze(extraction)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", present::render_report(&report));
    }

    Ok(())
}

fn ports() -> color_eyre::Result<()> {
    let ports = available_ports()?;
    if ports.is_empty() {
        println!("No serial ports found");
    }

    for port in &ports {
        println!("{} ({})", port.port_name, port_type_name(port));
    }

    Ok(())
}
