use anyhow::{Context, Result};
use clap::Parser;
use geofuse::session::write_event;
use geofuse::simulation::{DriveConfig, generate_drive};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "generate_session")]
#[command(about = "Generate a synthetic drive session for replay with geofuse")]
struct Args {
    /// TOML drive configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output file (stdout if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Seed for reproducibility
    #[arg(short, long)]
    seed: Option<u64>,

    /// Session duration in seconds (CLI override)
    #[arg(short, long)]
    duration: Option<f64>,

    /// Driving speed in m/s (CLI override)
    #[arg(long)]
    speed: Option<f64>,

    /// Sensor sample rate in Hz (CLI override)
    #[arg(long)]
    sample_rate: Option<f64>,

    /// Disable the coarse network provider
    #[arg(long)]
    no_network: bool,

    /// Probability of a magnetometer/accelerometer spike per sample
    #[arg(long)]
    spikes: Option<f32>,
}

fn load_toml_config(path: &PathBuf) -> Result<DriveConfig> {
    let content = fs::read_to_string(path).context("Failed to read config file")?;
    toml::from_str(&content).context("Failed to parse config file")
}

fn build_config(args: &Args) -> Result<DriveConfig> {
    let mut config = match &args.config {
        Some(path) => load_toml_config(path)?,
        None => DriveConfig::default(),
    };

    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(duration) = args.duration {
        config.duration_secs = duration;
    }
    if let Some(speed) = args.speed {
        config.speed_mps = speed;
    }
    if let Some(rate) = args.sample_rate {
        config.sample_rate_hz = rate;
    }
    if let Some(probability) = args.spikes {
        config.noise.spike_probability = probability;
    }
    if args.no_network {
        config.network_interval_secs = 0.0;
    }

    Ok(config)
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let config = build_config(&args)?;

    let events = generate_drive(&config)?;
    log::info!("Generated {} events", events.len());

    let mut writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(std::io::stdout().lock())),
    };

    writeln!(
        writer,
        "# synthetic drive: seed {:?}, {} s, {} m/s",
        config.seed, config.duration_secs, config.speed_mps
    )?;
    for event in &events {
        write_event(&mut writer, event)?;
    }
    writer.flush()?;

    if let Some(path) = &args.output {
        eprintln!("Wrote {} events to {}", events.len(), path.display());
    }

    Ok(())
}
