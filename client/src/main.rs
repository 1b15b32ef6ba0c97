#[macro_use]
extern crate log;

use std::io::{self, BufReader};
use std::path::PathBuf;
use std::thread;

use anyhow::Context;
use clap::Parser;
use crossbeam_channel::bounded;
use fern::colors::{Color, ColoredLevelConfig};

use client::config::{self, Config};
use client::control::{self, Prompted, StopReason};
use client::session::{Session, StopOutcome};
use client::transmit::HttpTransmitter;

/// End system: streams simulated vital signs to the collector.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// TOML config file, built in defaults are used when omitted
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn setup_logger(level: log::LevelFilter) -> Result<(), fern::InitError> {
    fern::Dispatch::new()
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
        .level_for("ureq", log::LevelFilter::Warn)
        .level_for("rustls", log::LevelFilter::Warn)
        .chain(io::stderr())
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
    let level = config.log_level.parse().unwrap_or(log::LevelFilter::Info);
    setup_logger(level)?;

    let settings = config.session_settings()?;

    println!("=== ES (End System) Client ===");
    println!("Sensor send interval: {:?}", settings.interval);
    println!("ESS target: {}\n", config.collector_url);

    // Installed before prompting so an interrupt at the prompt exits cleanly
    let (stop_tx, stop_rx) = bounded(2);
    {
        let stop_tx = stop_tx.clone();
        ctrlc::set_handler(move || {
            let _ = stop_tx.try_send(StopReason::Interrupt);
        })
        .context("installing interrupt handler")?;
    }

    let (answer_tx, answer_rx) = bounded(1);
    thread::spawn(move || {
        let answer = control::prompt_subject(io::stdin().lock(), io::stdout());
        let _ = answer_tx.send(answer);
    });
    let subject = match control::wait_for_subject(&answer_rx, &stop_rx)? {
        Prompted::Subject(subject) => subject,
        Prompted::Declined => return Ok(()),
        Prompted::Interrupted => {
            println!("\nExiting.");
            return Ok(());
        }
    };

    println!("\nUser detected on ES '{}'. Starting sensor readings.", subject);
    println!("Type 'stop' and press Enter to stop and exit.\n");

    let transmitter = HttpTransmitter::new(&config.collector_url, config.request_timeout());
    let mut session = Session::start(subject.as_str(), settings, transmitter)?;

    control::spawn_command_reader(BufReader::new(io::stdin()), stop_tx);

    let reason = stop_rx.recv().unwrap_or(StopReason::EndOfInput);
    debug!("Stop requested: {:?}", reason);

    println!("\nStopping sensor readings for '{}'...", session.subject());
    if session.stop() == StopOutcome::TimedOut {
        warn!("Exiting while the last delivery is still in flight");
    }
    println!("ES client exited.");
    Ok(())
}
