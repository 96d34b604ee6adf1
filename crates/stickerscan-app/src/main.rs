// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stickerscan: scan a marks sticker, rectify it and hand it to OCR.
//
// Entry point. Initialises logging, loads the persisted configuration and
// runs one command.

mod services;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use stickerscan_bridge::{FrameCapturer, ReplayCamera, live_camera};
use stickerscan_core::error::Result;
use stickerscan_core::humanize_error;

use services::config_store;
use services::scan_service::ScanService;

/// How long startup waits for the engine before scanning anyway.
const READY_TIMEOUT: Duration = Duration::from_secs(10);

/// Stickerscan - rectify a photographed marks sticker and read its score
#[derive(Parser, Debug)]
#[command(name = "stickerscan", version)]
struct Cli {
    /// Config file (default: $XDG_DATA_HOME/stickerscan/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one scan event. Frames are replayed as camera captures, in order;
    /// without frames the live camera is used.
    Scan {
        frames: Vec<PathBuf>,

        /// Write rectified.jpg and marks.jpg here
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Skip the OCR upload even if an endpoint is configured
        #[arg(long)]
        no_ocr: bool,
    },
    /// Print the effective configuration
    Config {
        /// Also persist it to the config file
        #[arg(long)]
        write: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::info!("Stickerscan starting");

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "stickerscan failed");
            let human = humanize_error(&e);
            eprintln!("{}\n{}", human.message, human.suggestion);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.unwrap_or_else(config_store::default_config_path);
    let config = config_store::load_config(&config_path);

    match cli.command {
        Command::Config { write } => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            if write {
                config_store::persist_config(&config_path, &config)?;
            }
            Ok(())
        }
        Command::Scan {
            frames,
            out_dir,
            no_ocr,
        } => {
            let camera: Box<dyn FrameCapturer> = if frames.is_empty() {
                live_camera()
            } else {
                Box::new(ReplayCamera::open(&frames)?)
            };

            let quality = config.ocr.jpeg_quality;
            let service = ScanService::start(config, !no_ocr)?;
            if let Err(e) = service.wait_ready(READY_TIMEOUT).await {
                tracing::warn!(error = %e, "Engine not ready; scan will fall back to center crop");
            }

            let result = service.scan(camera.as_ref()).await;
            service.shutdown();
            let output = result?;

            if let Some(dir) = out_dir {
                output.save_images(&dir, quality)?;
            }
            println!("{}", serde_json::to_string_pretty(&output.report)?);
            Ok(())
        }
    }
}
