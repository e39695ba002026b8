//! Offline estimation CLI.
//!
//! Runs the burst measurement pipeline over JPEG captures on disk, using
//! the built-in edge-based card detector and the fake landmark backend
//! (real landmark models live outside this crate and plug in through the
//! `HandLandmarker` trait).

use anyhow::{bail, Context, Result};
use ringgauge::config::RingGaugeConfig;
use ringgauge::report::MeasurementReport;
use ringgauge::testing::FakeHandLandmarker;
use ringgauge::types::FramePacket;
use ringgauge::RingSizeEstimator;
use std::env;
use std::fs;

fn main() -> Result<()> {
    ringgauge::init_logging();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: ringgauge-cli <command> [args]");
        eprintln!("Commands:");
        eprintln!("  estimate <frame.jpg>... [--config <path>] [--json]  run the burst pipeline");
        eprintln!("  default-config                                      print the default TOML config");
        std::process::exit(1);
    }

    match args[1].as_str() {
        "estimate" => cmd_estimate(&args[2..]),
        "default-config" => cmd_default_config(),
        other => {
            eprintln!("Unknown command: {}", other);
            std::process::exit(1);
        }
    }
}

fn cmd_estimate(args: &[String]) -> Result<()> {
    let mut paths = Vec::new();
    let mut config_path = None;
    let mut json = false;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                i += 1;
                config_path = Some(
                    args.get(i)
                        .context("--config requires a path")?
                        .to_string(),
                );
            }
            "--json" => json = true,
            path => paths.push(path.to_string()),
        }
        i += 1;
    }

    if paths.is_empty() {
        bail!("estimate requires at least one frame path");
    }

    let config = match config_path {
        Some(path) => RingGaugeConfig::load_from_file(&path)
            .with_context(|| format!("loading config from {}", path))?,
        None => RingGaugeConfig::default(),
    };
    config.validate().context("validating config")?;

    let session_id = chrono::Utc::now().timestamp_millis();
    let frames = load_frames(&paths)?;
    let estimator = RingSizeEstimator::from_config(&config, FakeHandLandmarker);
    let result = estimator.estimate(&frames);
    let report = MeasurementReport::from_size_result(session_id.to_string(), &result);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Session {}", report.session_id);
        println!("  size:       {}", report.ring_size);
        println!("  width:      {:.2} mm", report.finger_width_mm);
        println!(
            "  confidence: {:.2} ({:?})",
            report.confidence, report.confidence_level
        );
        if !report.warnings.is_empty() {
            println!("  warnings:   {:?}", report.warnings);
        }
    }
    Ok(())
}

fn cmd_default_config() -> Result<()> {
    let config = RingGaugeConfig::default();
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

fn load_frames(paths: &[String]) -> Result<Vec<FramePacket>> {
    let now_ms = chrono::Utc::now().timestamp_millis() as u64;
    paths
        .iter()
        .map(|path| {
            let bytes = fs::read(path).with_context(|| format!("reading {}", path))?;
            Ok(FramePacket::from_jpeg(now_ms, 1.0, bytes))
        })
        .collect()
}
