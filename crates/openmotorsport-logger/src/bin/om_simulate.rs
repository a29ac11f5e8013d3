//! om-simulate - drive the capture machine with a synthetic session
//!
//! Generates a deterministic stream of host callbacks (a car lapping a
//! circular track) and feeds it to a [`CaptureMachine`] writing `.om` files,
//! which makes it easy to inspect the output of the logger without a
//! simulator.

#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

use anyhow::{Context, Result, bail};
use clap::Parser;
use openmotorsport_logger::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "om-simulate")]
#[command(about = "Log a synthetic driving session to OpenMotorsport files")]
#[command(version)]
struct Cli {
    /// Logger configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Override the output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Override the sampling interval (milliseconds)
    #[arg(long)]
    interval_ms: Option<u32>,

    /// Sample on a dedicated worker thread
    #[arg(long)]
    queued: bool,

    /// Discard sessions without a completed lap
    #[arg(long)]
    require_one_lap: bool,

    /// Timed laps after the out-lap
    #[arg(long, default_value_t = 2)]
    laps: u32,

    /// Lap time in seconds
    #[arg(long, default_value_t = 60)]
    lap_time: u32,

    /// Physics frame rate (Hz)
    #[arg(long, default_value_t = 50)]
    frame_rate: u32,

    /// Raw game phase when entering the car (0-8)
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u8).range(0..=8))]
    entry_phase: u8,

    /// Driver name written to the session
    #[arg(long, default_value = "Test Driver")]
    driver: String,

    /// Track name written to the session
    #[arg(long, default_value = "Synthetic Oval")]
    track: String,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn logger_config(&self) -> Result<LoggerConfig> {
        let mut config = LoggerConfig::load(&self.config)
            .with_context(|| format!("loading {}", self.config.display()))?;

        if let Some(dir) = &self.output_dir {
            config.output_directory = dir.clone();
        }
        if let Some(interval_ms) = self.interval_ms {
            config.sampling_interval_ms = interval_ms.max(1);
        }
        if self.queued {
            config.sampling_mode = SamplingMode::Queued;
        }
        if self.require_one_lap {
            config.require_completed_lap = true;
        }
        Ok(config)
    }

    fn run(&self) -> Result<SyntheticRun> {
        let Some(phase) = GamePhase::from_raw(self.entry_phase) else {
            bail!("unknown game phase {}", self.entry_phase);
        };

        Ok(SyntheticRun::new()
            .laps(self.laps)
            .lap_time_s(self.lap_time)
            .frame_rate_hz(self.frame_rate)
            .entry_phase(phase)
            .driver(self.driver.as_str())
            .track(self.track.as_str()))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    format!("openmotorsport={log_level},om_simulate={log_level}").into()
                }),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config = cli.logger_config()?;
    if cli.print_config {
        let xml = quick_xml::se::to_string_with_root("configuration", &config)
            .context("serializing configuration")?;
        println!("{xml}");
        return Ok(());
    }

    let events = cli.run()?.generate();
    info!(events = events.len(), "Synthetic session generated");

    let mut machine = CaptureMachine::new(config, Arc::new(ContainerFileSink::new()));
    dispatch(&events, &mut machine);

    let mut failures = 0usize;
    for outcome in machine.wait_for_pending_saves() {
        match outcome {
            SaveOutcome::Saved(path) => println!("saved    {}", path.display()),
            SaveOutcome::Skipped { laps_completed } => {
                println!("skipped  ({laps_completed} laps completed)");
            }
            SaveOutcome::Failed { path, error } => {
                failures += 1;
                println!("failed   {}: {error}", path.display());
            }
            SaveOutcome::Abandoned => {
                failures += 1;
                println!("abandoned");
            }
        }
    }

    if failures > 0 {
        bail!("{failures} session(s) could not be saved");
    }
    Ok(())
}
