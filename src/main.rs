mod cancel;
mod channel;
mod config;
mod motion;
mod plan;
mod planner;
mod scan;
mod spectrum;
mod tracker;
mod web;

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use std::thread;

use crate::cancel::CancelFlag;
use crate::channel::{ChannelBand, ChannelTable};
use crate::config::Config;
use crate::motion::sim::SimulatedRig;
use crate::motion::{LineTransport, MotionController, SerialTransport};
use crate::plan::{Plan, PlanRunner};
use crate::scan::{event_channel, Orchestrator, ScanEvent, StatusBoard};
use crate::spectrum::{Segmenter, SpectrumSensor};
use crate::tracker::SignalTracker;

#[derive(Parser)]
#[command(name = "scan-o-mat")]
#[command(about = "Antenna gimbal RF emitter scanner")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP command surface
    Serve {
        #[arg(long)]
        config: String,
        /// Drive an in-process simulated gimbal instead of the serial port
        #[arg(long)]
        simulate: bool,
    },
    /// Execute a plan file without the HTTP surface
    Run {
        #[arg(long)]
        config: String,
        plan: String,
        #[arg(long)]
        simulate: bool,
    },
    /// Validate a plan file
    Validate { plan: String },
    /// Print the channel reference table, or one channel
    Bands { channel: Option<String> },
}

type Engine = Orchestrator<Box<dyn LineTransport>, Box<dyn SpectrumSensor>>;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, simulate } => serve(&config, simulate),
        Commands::Run {
            config,
            plan,
            simulate,
        } => run(&config, &plan, simulate),
        Commands::Validate { plan } => validate(&plan),
        Commands::Bands { channel } => bands(channel.as_deref()),
    }
}

fn load_config(path: &str) -> Option<Config> {
    match Config::from_file(path) {
        Ok(c) => Some(c),
        Err(e) => {
            eprintln!("Config error: {}", e);
            None
        }
    }
}

fn open_transport(config: &Config, simulate: bool) -> Option<Box<dyn LineTransport>> {
    if simulate {
        let rest = config.motion.forward;
        log::info!("Using simulated gimbal");
        return Some(Box::new(SimulatedRig::new(rest.azimuth, rest.elevation)));
    }
    let serial = &config.serial;
    match SerialTransport::open(&serial.port, serial.baud_rate, serial.timeout) {
        Ok(t) => Some(Box::new(t)),
        Err(e) => {
            eprintln!("Failed to open {}: {}", serial.port, e);
            None
        }
    }
}

fn build_engine(
    config: &Config,
    simulate: bool,
    events: scan::EventSender,
) -> Option<Engine> {
    if let Some(name) = &config.station.name {
        log::info!("Station {}", name);
    }
    let transport = open_transport(config, simulate)?;
    let sensor = match spectrum::from_config(&config.sensor) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Sensor error: {}", e);
            return None;
        }
    };
    let motion = MotionController::new(transport, config.motion.clone(), CancelFlag::new());
    Some(Orchestrator::new(
        motion,
        sensor,
        Segmenter::new(config.segmenter.clone()),
        SignalTracker::new(&config.tracker),
        config.sweep.clone(),
        events,
    ))
}

fn serve(config_path: &str, simulate: bool) -> ExitCode {
    let Some(config) = load_config(config_path) else {
        return ExitCode::FAILURE;
    };

    let (events, event_rx) = event_channel(config.sweep.event_queue);
    let Some(engine) = build_engine(&config, simulate, events) else {
        return ExitCode::FAILURE;
    };

    let status = StatusBoard::new();
    let started = scan::spawn(engine).and_then(|(handle, _)| {
        status.spawn_collector(event_rx)?;
        Ok(handle)
    });
    let handle = match started {
        Ok(h) => h,
        Err(e) => {
            eprintln!("Failed to start scan engine: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(web::run_server(config, handle, status)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Server error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(config_path: &str, plan_path: &str, simulate: bool) -> ExitCode {
    let Some(config) = load_config(config_path) else {
        return ExitCode::FAILURE;
    };
    let plan = match Plan::from_file(plan_path) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Plan error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let (events, event_rx) = event_channel(config.sweep.event_queue);
    let Some(mut engine) = build_engine(&config, simulate, events) else {
        return ExitCode::FAILURE;
    };

    let logger = thread::spawn(move || {
        for event in event_rx.iter() {
            log_event(&event);
        }
    });

    if let Err(e) = engine.wait_ready() {
        eprintln!("Servos not ready: {}", e);
        return ExitCode::FAILURE;
    }

    let start_time = chrono::Utc::now();
    println!("Starting plan at {}", start_time);

    let result = PlanRunner {
        plan: &plan,
        orchestrator: &mut engine,
    }
    .run();
    let tracks = engine.tracks();

    // The logger ends once the last sender is gone.
    drop(engine);
    let _ = logger.join();

    match result {
        Ok(done) => {
            println!(
                "Plan finished: {}/{} steps, {} tracks",
                done,
                plan.steps.len(),
                tracks.len()
            );
            for track in &tracks {
                let label = track
                    .channel
                    .as_ref()
                    .and_then(|c| c.exact_name())
                    .unwrap_or("-");
                println!(
                    "  #{} {:.1} MHz {:.1} dB at {}/{} [{}]",
                    track.id,
                    track.peak_mhz,
                    track.peak_power_db,
                    track.best_position.azimuth,
                    track.best_position.elevation,
                    label
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Plan failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn log_event(event: &ScanEvent) {
    match event {
        ScanEvent::Measurement(report) => log::debug!(
            "#{} at {}/{}: {} detections, {} tracks",
            report.sequence,
            report.position.azimuth,
            report.position.elevation,
            report.detections.len(),
            report.tracks.len()
        ),
        ScanEvent::Refined {
            track_id,
            position,
            improved,
            ..
        } => log::info!(
            "Track {} refined to {}/{} (improved: {})",
            track_id,
            position.azimuth,
            position.elevation,
            improved
        ),
        ScanEvent::Failed { error, .. } => log::error!("Run failed: {}", error),
        other => log::debug!("{:?}", other),
    }
}

fn validate(path: &str) -> ExitCode {
    match Plan::from_file(path) {
        Ok(plan) => {
            println!("Plan is valid ({} steps)", plan.steps.len());
            if !plan.variables.is_empty() {
                let mut names: Vec<&String> = plan.variables.keys().collect();
                names.sort();
                println!(
                    "  variables: {}",
                    names.iter().map(|n| n.as_str()).collect::<Vec<_>>().join(", ")
                );
            }
            for (i, step) in plan.steps.iter().enumerate() {
                let pause = match step.after {
                    Some(d) => format!(", then wait {}", humantime::format_duration(d)),
                    None => String::new(),
                };
                println!("  {}: {}{}", i + 1, step.command, pause);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Parse error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn bands(channel: Option<&str>) -> ExitCode {
    let table = ChannelTable::standard();
    let bands: Vec<&ChannelBand> = match channel {
        Some(name) => match table.find(&name.to_uppercase()) {
            Some(band) => vec![band],
            None => {
                eprintln!("Unknown channel {}", name);
                return ExitCode::FAILURE;
            }
        },
        None => table.bands().iter().collect(),
    };
    for band in bands {
        println!(
            "{:<4} {:>5} MHz  ({}-{})",
            band.name(),
            band.center_mhz,
            band.start_mhz,
            band.end_mhz
        );
    }
    ExitCode::SUCCESS
}
