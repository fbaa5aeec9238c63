//! Joint range-of-motion measurement from recorded keypoint streams.

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{info, warn};
use rom_measurement::app::{AppConfig, ReplayApp};
use rom_measurement::config::Config;
use rom_measurement::joints::{BodySide, JointKey, JointRegistry, JointType, MovementType};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Recorded frames, one JSON frame per line
    #[arg(short, long)]
    frames: Option<PathBuf>,

    /// Joint to measure (knee, shoulder, hip, elbow, ankle, wrist)
    #[arg(short, long, default_value = "knee")]
    joint: JointType,

    /// Body side (left, right)
    #[arg(short, long, default_value = "left")]
    side: BodySide,

    /// Movement to measure (flexion, extension, abduction, ...)
    #[arg(short, long, default_value = "flexion")]
    movement: MovementType,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<PathBuf>,

    /// Append confirmed measurements to this JSON-lines file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Confirm the reading automatically once it freezes
    #[arg(long)]
    auto_confirm: bool,

    /// Spacing of frames recorded without timestamps
    #[arg(long, default_value = "33")]
    frame_interval_ms: u64,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,

    /// Print all measurable joint movements and exit
    #[arg(long)]
    list_joints: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    if args.list_joints {
        for (key, joint) in JointRegistry::standard().iter() {
            let (min, max) = joint.normal_range;
            println!("{key:<32} {:<28} normal {min}°..{max}°", joint.label);
        }
        return Ok(());
    }

    let Some(frames_path) = args.frames else {
        bail!("--frames is required unless --list-joints is given");
    };

    let engine = if let Some(config_path) = &args.config {
        info!("Loading configuration from: {}", config_path.display());
        match Config::from_file(config_path) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!("Failed to load config file: {e}. Using defaults.");
                Config::default()
            }
        }
    } else {
        Config::default()
    };

    let config = AppConfig {
        frames_path,
        key: JointKey::new(args.joint, args.side, args.movement),
        engine,
        output: args.output,
        auto_confirm: args.auto_confirm,
        frame_interval_ms: args.frame_interval_ms,
    };

    let mut app = ReplayApp::new(config).context("Cannot start measurement")?;
    let summary = app.run().context("Replay failed")?;

    println!("Frames:      {}", summary.frames);
    println!("Final state: {}", summary.final_state());
    if let Some(status) = &summary.last_status {
        println!("Angle:       {:.1}°", status.current_angle);
        if let Some(condition) = status.validation_error {
            println!("Warning:     {condition}");
        }
    }
    if let Some(measurement) = &summary.measurement {
        println!("Measurement: {} ({})", measurement.neutral_zero_format, measurement.id);
    }
    if let Some(assessment) = summary.assessment {
        println!("Normal range: {assessment:?}");
    }
    if let Some(alert) = &summary.alert {
        println!("Alert ({:?}): {alert}", alert.severity());
    }

    Ok(())
}
