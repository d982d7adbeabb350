//! BinSim command line
//!
//! Usage:
//!   binsim --config binsim.cfg play              - Render to the audio device, OSC control
//!   binsim --config binsim.cfg render -o out.wav - Render offline to a WAV file
//!   binsim devices                               - List output devices
//!   binsim --config binsim.cfg --print-config    - Show the resolved configuration

use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use binsim_audio::{AudioConfig, OutputStream, list_output_devices, render_to_wav};
use binsim_control::{ControlListener, ControlTargets};
use binsim_core::BinSimConfig;
use binsim_engine::BinSim;

/// How often `play` checks whether rendering has ended
const WAIT_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Parser)]
#[command(name = "binsim", version, about = "Real-time binaural renderer")]
struct Cli {
    /// Configuration file
    #[arg(short, long, global = true, default_value = "binsim.cfg")]
    config: PathBuf,

    /// Print the resolved configuration as JSON and exit
    #[arg(long)]
    print_config: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render to an audio device, controlled over OSC
    Play {
        /// Output device name (default device if omitted)
        #[arg(short, long)]
        device: Option<String>,
    },
    /// Render offline to a 32-bit float WAV file
    Render {
        /// Output WAV file
        #[arg(short, long)]
        output: PathBuf,

        /// Stop after this many blocks
        #[arg(long)]
        max_blocks: Option<usize>,
    },
    /// List audio output devices
    Devices,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    if cli.print_config {
        let config = load_config(&cli.config)?;
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    match cli.command {
        Some(Commands::Play { device }) => play(&cli.config, device),
        Some(Commands::Render { output, max_blocks }) => render(&cli.config, &output, max_blocks),
        Some(Commands::Devices) => devices(),
        None => bail!("No command given, see --help"),
    }
}

fn load_config(path: &Path) -> Result<BinSimConfig> {
    BinSimConfig::from_file(path)
        .with_context(|| format!("Failed to read configuration {}", path.display()))
}

fn play(config_path: &Path, device: Option<String>) -> Result<()> {
    let config = load_config(config_path)?;
    let session = BinSim::new(config.clone()).context("Failed to load session")?;

    let (player, loader) = session.sound_player().context("Failed to load sound file")?;
    let render = session.render_loop(player)?;

    let _listener = ControlListener::spawn(
        &config.osc_host,
        config.osc_port,
        ControlTargets {
            selection: session.selection().clone(),
            loader: Some(loader),
            stop: session.stop_handle().clone(),
        },
    )
    .context("Failed to start OSC listener")?;

    let stream = OutputStream::open(
        render,
        AudioConfig {
            sample_rate: config.sampling_rate,
            buffer_frames: Some(config.block_size as u32),
            device,
        },
    )
    .context("Failed to open audio output")?;
    stream.start()?;

    log::info!(
        "Playing on '{}', send {} to end",
        stream.device_name(),
        binsim_control::STOP_ADDRESS
    );
    while !stream.is_finished() {
        thread::sleep(WAIT_INTERVAL);
    }

    stream.stop()?;
    Ok(())
}

fn render(config_path: &Path, output: &Path, max_blocks: Option<usize>) -> Result<()> {
    let config = load_config(config_path)?;
    if max_blocks.is_none() && (config.loop_sound || config.sound_files().is_empty()) {
        bail!("Rendering a looping or empty playlist needs --max-blocks");
    }

    let session = BinSim::new(config.clone()).context("Failed to load session")?;
    let (player, _loader) = session.sound_player().context("Failed to load sound file")?;
    let mut render = session.render_loop(player)?;

    let report = render_to_wav(&mut render, output, config.sampling_rate, max_blocks)
        .with_context(|| format!("Failed to render to {}", output.display()))?;

    println!(
        "{} blocks, {} frames ({:.2} s) written to {}",
        report.blocks,
        report.frames,
        report.frames as f64 / config.sampling_rate as f64,
        output.display()
    );
    Ok(())
}

fn devices() -> Result<()> {
    let devices = list_output_devices().context("Failed to enumerate audio devices")?;
    if devices.is_empty() {
        println!("No output devices found");
        return Ok(());
    }

    for device in devices {
        println!(
            "{}{} ({} ch, {:?} Hz)",
            if device.is_default { "* " } else { "  " },
            device.name,
            device.output_channels,
            device.sample_rates
        );
    }
    Ok(())
}
