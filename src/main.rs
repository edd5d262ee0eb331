use clap::Parser;
use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use rolling_stats::Stats;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use chrono::Utc;
use geofuse::config::{DisplayRotation, FusionConfig};
use geofuse::coordinator::{FusionCoordinator, FusionListener, ManualClock, PassiveProvider};
use geofuse::error::LocationError;
use geofuse::heading::CompassReading;
use geofuse::location::{LocationFix, ProviderKind};
use geofuse::output::{FusionEvent, OutputFormat, create_formatter};
use geofuse::session::{SessionEvent, SessionReader};

#[derive(Parser, Debug)]
#[command(name = "geofuse")]
#[command(about = "Replay a recorded location and sensor session through the fusion coordinator", long_about = None)]
struct Args {
    /// Session file (one JSON event per line)
    session: PathBuf,

    /// Output format: text, json, csv
    #[arg(short = 'f', long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// TOML configuration file
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Acceptance policy: native, aggregated
    #[arg(short = 'p', long, value_enum, default_value = "native")]
    provider: ProviderKind,

    /// Display rotation applied to compass output (e.g. "90", "270deg")
    #[arg(short = 'r', long)]
    rotation: Option<DisplayRotation>,

    /// Print accuracy and heading statistics at the end
    #[arg(long)]
    stats: bool,

    /// Increase output verbosity
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Forwards coordinator callbacks to the output loop
struct ChannelListener {
    tx: Sender<FusionEvent>,
}

impl FusionListener for ChannelListener {
    fn on_location_updated(&self, fix: &LocationFix) {
        let _ = self.tx.send(FusionEvent::Location(fix.clone()));
    }

    fn on_compass_updated(&self, reading: &CompassReading) {
        let _ = self.tx.send(FusionEvent::Compass(*reading));
    }

    fn on_location_error(&self, error: LocationError) {
        let _ = self.tx.send(FusionEvent::Error(error));
    }
}

struct ReplayStats {
    accuracy: Stats<f64>,
    heading_step: Stats<f64>,
    last_heading: Option<f64>,
    locations: usize,
    readings: usize,
    errors: usize,
}

impl ReplayStats {
    fn new() -> Self {
        Self {
            accuracy: Stats::new(),
            heading_step: Stats::new(),
            last_heading: None,
            locations: 0,
            readings: 0,
            errors: 0,
        }
    }

    fn update(&mut self, event: &FusionEvent) {
        match event {
            FusionEvent::Location(fix) => {
                self.locations += 1;
                self.accuracy.update(fix.accuracy);
            }
            FusionEvent::Compass(reading) => {
                self.readings += 1;
                let heading = reading.true_heading.to_degrees();
                if let Some(last) = self.last_heading {
                    let step = (heading - last).rem_euclid(360.0);
                    self.heading_step.update(step.min(360.0 - step));
                }
                self.last_heading = Some(heading);
            }
            FusionEvent::Error(_) => self.errors += 1,
        }
    }

    fn print(&self) {
        println!();
        println!("=== Replay statistics ===");
        println!("Accepted locations: {}", self.locations);
        if self.accuracy.count > 0 {
            println!(
                "  accuracy: mean {:.1} m, std {:.1} m, min {:.1} m, max {:.1} m",
                self.accuracy.mean, self.accuracy.std_dev, self.accuracy.min, self.accuracy.max
            );
        }
        println!("Compass readings: {}", self.readings);
        if self.heading_step.count > 0 {
            println!(
                "  heading step: mean {:.2}°, std {:.2}°, max {:.2}°",
                self.heading_step.mean, self.heading_step.std_dev, self.heading_step.max
            );
        }
        println!("Errors: {}", self.errors);
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => FusionConfig::load(path)?,
        None => FusionConfig::default(),
    };

    if args.verbose > 0 {
        eprintln!("=== geofuse ===");
        eprintln!("Session: {}", args.session.display());
        eprintln!("Provider policy: {:?}", args.provider);
        if let Some(rotation) = args.rotation {
            eprintln!("Display rotation: {}", rotation);
        }
        eprintln!(
            "Declination rebuild distance: {} m",
            config.declination.rebuild_distance_m
        );
        eprintln!(
            "Travel heading above {} m/s, noise threshold {}°",
            config.heading.min_travel_speed_mps, config.heading.noise_threshold_degrees
        );
        eprintln!();
    }

    let (session_tx, session_rx) = bounded(64);
    let session_path = args.session.clone();
    let reader = thread::spawn(move || -> geofuse::Result<()> {
        for event in SessionReader::open(&session_path)? {
            if session_tx.send(event?).is_err() {
                break;
            }
        }
        Ok(())
    });

    run_replay(session_rx, config, &args);

    reader
        .join()
        .map_err(|_| anyhow::anyhow!("session reader panicked"))??;

    Ok(())
}

fn run_replay(session_rx: Receiver<SessionEvent>, config: FusionConfig, args: &Args) {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let coordinator = FusionCoordinator::builder(config)
        .provider(Box::new(PassiveProvider::new(args.provider)))
        .clock(clock.clone())
        .build();

    let (event_tx, event_rx) = unbounded();
    let listener: Arc<dyn FusionListener> = Arc::new(ChannelListener { tx: event_tx });

    let formatter = create_formatter(args.format, args.verbose > 0);
    if let Some(header) = formatter.header() {
        println!("{}", header);
    }

    let mut stats = ReplayStats::new();
    let mut started = false;

    for event in session_rx.iter() {
        match event {
            SessionEvent::Fix { fix, received_at } => {
                clock.set_wall(received_at.unwrap_or(fix.time));
                if fix.elapsed_realtime_nanos.is_some() {
                    clock.set_monotonic(fix.elapsed_realtime_nanos);
                }
                // Subscribe once the clock reflects the recording
                if !started {
                    coordinator.start_updates(listener.clone());
                    started = true;
                }
                coordinator.submit_location(fix);
            }
            SessionEvent::Sample(sample) => {
                if !started {
                    coordinator.start_updates(listener.clone());
                    started = true;
                }
                coordinator.submit_sensor_sample(sample);
            }
        }

        for event in event_rx.try_iter() {
            let event = match (event, args.rotation) {
                (FusionEvent::Compass(reading), Some(rotation)) => {
                    FusionEvent::Compass(rotate_reading(&coordinator, reading, rotation))
                }
                (event, _) => event,
            };
            stats.update(&event);
            println!("{}", formatter.format(&event));
        }
    }

    coordinator.stop_updates(&listener);
    log::debug!("Session finished");

    if args.stats {
        stats.print();
    }
}

fn rotate_reading(
    coordinator: &FusionCoordinator,
    reading: CompassReading,
    rotation: DisplayRotation,
) -> CompassReading {
    let mut angles = [reading.magnetic_heading, reading.true_heading];
    coordinator.correct_for_display_orientation(&mut angles, rotation);
    CompassReading {
        magnetic_heading: angles[0],
        true_heading: angles[1],
        ..reading
    }
}
