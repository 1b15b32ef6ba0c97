use std::path::PathBuf;

extern crate serde_json;
extern crate toml;
#[macro_use]
extern crate serde_derive;

extern crate chrono;
#[macro_use]
extern crate log;
extern crate fern;

mod web;
mod data_handler;
mod error;
mod config;

use anyhow::{anyhow, Context};
use clap::Parser;
use crossbeam_channel::{bounded, select, unbounded};
use fern::colors::{Color, ColoredLevelConfig};

use crate::config::Config;
use crate::web::{Endpoint, Ingest};

/// End system server: collects sensor batches pushed by end systems.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// TOML config file, built in defaults are used when omitted
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn setup_logger(level: log::LevelFilter) -> Result<(), fern::InitError> {
    fern::Dispatch::new()
        // Perform allocation-free log formatting
        .format(|out, message, record| {
            let colors = ColoredLevelConfig::default()
                .trace(Color::BrightBlue)
                .debug(Color::Cyan)
                .info(Color::Green)
                .warn(Color::Yellow)
                .error(Color::Red);

            out.finish(format_args!(
                "[{}][{}] {}",
                chrono::Local::now().format("%H:%M:%S"),
                colors.color(record.level()),
                message
            ))
        })
        .level(level)
        // Request logging stays quiet, only received batches are shown
        .level_for("tiny_http", log::LevelFilter::Warn)
        .chain(std::io::stderr())
        .apply()?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => config::read_config(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => Config::default(),
    };
    setup_logger(config.log_level.parse().unwrap_or(log::LevelFilter::Info))?;

    let (observer_tx, observer_rx) = unbounded();
    data_handler::run_observer(observer_rx);

    let endpoint = Endpoint::start(
        &config.http_address,
        config.http_port,
        Ingest {
            mode: config.ingest_mode,
            observer: observer_tx,
            max_body_bytes: config.max_body_bytes,
        },
    )?;
    info!("ESS Server listening on {}:{}", config.http_address, config.http_port);
    info!("Waiting for sensor data ({:?} ingest)", config.ingest_mode);

    let (shutdown_tx, shutdown_rx) = bounded(1);
    ctrlc::set_handler(move || {
        let _ = shutdown_tx.try_send(());
    })
    .context("installing interrupt handler")?;

    // The accept loop only ends on shutdown, anything else is fatal
    let stopped = endpoint.stopped();
    select! {
        recv(shutdown_rx) -> _ => {
            info!("ESS Server shutting down.");
            endpoint.shutdown();
            Ok(())
        }
        recv(stopped) -> _ => Err(anyhow!(
            "listener on {}:{} stopped",
            config.http_address,
            config.http_port
        )),
    }
}
