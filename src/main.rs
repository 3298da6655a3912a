#[macro_use]
extern crate lazy_static;

extern crate clap;

mod app;
mod args;
mod logging;

use args::Args;
use clap::Parser;
use logging::Logging;
use slog::*;
use slog_gke::hook::Hooks;
use slog_gke::Level as LineLevel;
use std::{process, result::Result, sync::Arc, time::Duration};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;

// Panics bypass slog, so they are handed to the hooks directly before the default handler
// prints them.
fn install_panic_hook(hooks: Arc<Hooks>) {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        hooks.fire_panic(&info.to_string());
        default_hook(info);
    }));
}

fn log_line(log: &Logger, level: LineLevel, line: &str) {
    match level {
        LineLevel::Panic | LineLevel::Fatal => crit!(log, "{}", line),
        LineLevel::Error => error!(log, "{}", line),
        LineLevel::Warn => warn!(log, "{}", line),
        LineLevel::Info => info!(log, "{}", line),
        LineLevel::Debug => debug!(log, "{}", line),
        LineLevel::Trace => trace!(log, "{}", line),
    }
}

// How long the shipper gets to deliver what is still queued when the process ends.
const SHIPPER_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

async fn pipe_lines<R>(log: Logger, level: LineLevel, reader: R) -> Result<(), String>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| format!("could not read from stdin: {}", e))?
    {
        log_line(&log, level, &line);
    }
    Ok(())
}

// Releases the hooks so the shipper sees its queue close, then gives it a bounded amount of
// time to deliver what is left.
async fn flush_shipper(
    hooks: &Hooks,
    shipper: Option<JoinHandle<()>>,
    timeout: Duration,
) -> Result<(), String> {
    hooks.clear();
    if let Some(shipper) = shipper {
        match tokio::time::timeout(timeout, shipper).await {
            Ok(result) => {
                result.map_err(|e| format!("the Google Cloud Logging shipper failed: {}", e))?
            }
            Err(_) => eprintln!("Gave up waiting for the Google Cloud Logging shipper"),
        }
    }
    Ok(())
}

async fn run(args: Args) -> Result<(), String> {
    let Logging { root, hooks, guard } = logging::create_logger(&args);
    let log = root.new(o!("module" => "main"));

    // Panics on the pipe task are flushed below. Anywhere else the panic entry is only
    // queued and may not reach Google before the process ends.
    install_panic_hook(hooks.clone());

    let shipper = match slog_gke::init(&hooks).await {
        Ok(Some(activation)) => {
            let identity = activation.identity();
            debug!(log, "Forwarding to Google Cloud Logging";
                "project" => &identity.project_id,
                "cluster" => &identity.cluster,
                "namespace" => &identity.namespace,
                "component" => &identity.component,
            );
            activation
                .take_shipper()
                .map(|shipper| tokio::spawn(shipper.run_log_shipper()))
        }
        Ok(None) => None,
        Err(e) => return Err(format!("could not set up Google Cloud Logging: {}", e)),
    };

    let piped = tokio::spawn(pipe_lines(
        log,
        args.line_level,
        BufReader::new(tokio::io::stdin()),
    ))
    .await;

    // Flush the async drain so every line reaches the hooks before they are released.
    drop(root);
    drop(guard);
    flush_shipper(&hooks, shipper, SHIPPER_FLUSH_TIMEOUT).await?;

    piped.map_err(|e| format!("reading stdin failed: {}", e))?
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    if let Err(e) = run(args).await {
        eprintln!("\nError: {}", e);
        process::exit(1);
    };
}
