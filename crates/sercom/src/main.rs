//! # SERCOM Bridge
//!
//! Runs the sensor link and prints every frame it acquires.
//!
//! ## Usage
//!
//! ```bash
//! # Against the built-in simulated peer, dropping every 4th response
//! sercom_bridge --simulate --overrun-every 4 --frames 20
//!
//! # Against real hardware (build with --features serial)
//! sercom_bridge --port /dev/ttyUSB0 --speed-a 300 --speed-b 300 --leds 1,0,1
//!
//! # Settings from a file, more logging
//! RUST_LOG=sercom_core=trace sercom_bridge --config bridge.toml --simulate
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use sercom_core::{
    link_pair, ActuatorCommand, BridgeConfig, NoAuxInput, PeerConditions, SensorBridge,
    SensorFrame, SimulatedPeer,
};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Number of payload bytes shown per frame.
const PREVIEW_BYTES: usize = 16;

/// Double-buffered sensor bridge
#[derive(Parser, Debug)]
#[command(name = "sercom_bridge")]
#[command(version)]
#[command(about = "Polls a sensor peer over a fixed-frame serial link")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serial port, overrides the config file
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate, overrides the config file
    #[arg(short, long)]
    baud: Option<u32>,

    /// Use the in-process simulated peer instead of a serial port
    #[arg(long)]
    simulate: bool,

    /// Frames to acquire before exiting (0 runs forever)
    #[arg(short = 'n', long, default_value_t = 10)]
    frames: u64,

    /// Simulated peer: append stray bytes to every Nth response
    #[arg(long, default_value_t = 0)]
    overrun_every: u32,

    /// Simulated peer: truncate every Nth response
    #[arg(long, default_value_t = 0)]
    short_every: u32,

    /// Motor speed A
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    speed_a: i16,

    /// Motor speed B
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    speed_b: i16,

    /// LED values, comma separated
    #[arg(long, value_delimiter = ',', default_values_t = [0u8, 0, 0])]
    leds: Vec<u8>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(&cli)?;

    println!("═══════════════════════════════════════════════════════════════════");
    println!("                      SERCOM BRIDGE v{}", env!("CARGO_PKG_VERSION"));
    println!("═══════════════════════════════════════════════════════════════════");
    println!();
    if cli.simulate {
        println!("  Link:     simulated peer");
    } else {
        println!("  Link:     {} @ {} baud", config.port, config.baud_rate);
    }
    println!("  T1:       {} ms", config.response_timeout_ms);
    println!("  T2:       {} ms", config.drain_timeout_ms);
    println!();

    let (mut bridge, _peer) = if cli.simulate {
        let (link, port) = link_pair();
        let conditions = PeerConditions {
            overrun_every: cli.overrun_every,
            short_every: cli.short_every,
            ..PeerConditions::default()
        };
        let peer = SimulatedPeer::spawn(port, conditions);
        (SensorBridge::initialize(link, NoAuxInput, &config)?, Some(peer))
    } else {
        (open_uart(&config)?, None)
    };

    let leds: [u8; 3] = cli
        .leds
        .as_slice()
        .try_into()
        .context("exactly three LED values are required")?;
    bridge.apply(&ActuatorCommand {
        speed_a: cli.speed_a,
        speed_b: cli.speed_b,
        leds,
    });

    let start = Instant::now();
    let mut count = 0u64;
    while cli.frames == 0 || count < cli.frames {
        let frame = bridge.acquire_latest_sensor_frame();
        count += 1;
        print_frame(count, frame);
    }

    let elapsed = start.elapsed();
    #[allow(clippy::cast_precision_loss)]
    let rate = count as f64 / elapsed.as_secs_f64().max(f64::EPSILON);
    println!();
    println!("  {count} frames in {elapsed:.2?} ({rate:.1} frames/s)");
    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli) -> Result<BridgeConfig> {
    let mut config = match &cli.config {
        Some(path) => BridgeConfig::load(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => BridgeConfig::default(),
    };
    if let Some(port) = &cli.port {
        config.port.clone_from(port);
    }
    if let Some(baud) = cli.baud {
        config.baud_rate = baud;
    }
    config.validate()?;
    tracing::debug!(?config, "bridge configuration");
    Ok(config)
}

#[cfg(feature = "serial")]
fn open_uart(config: &BridgeConfig) -> Result<SensorBridge> {
    let link = sercom_core::UartLink::open(config)
        .with_context(|| format!("failed to open {}", config.port))?;
    Ok(SensorBridge::initialize(link, NoAuxInput, config)?)
}

#[cfg(not(feature = "serial"))]
fn open_uart(_config: &BridgeConfig) -> Result<SensorBridge> {
    anyhow::bail!("built without serial support: rebuild with --features serial or pass --simulate")
}

fn print_frame(count: u64, frame: &SensorFrame) {
    let preview: Vec<String> = frame.payload()[..PREVIEW_BYTES]
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect();
    println!(
        "  #{count:<6} [{} ..] button={}",
        preview.join(" "),
        if frame.aux_active() { "down" } else { "up" }
    );
}
