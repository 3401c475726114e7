use anyhow::Context;
use printlink::{
    default_config_path, init_logging, Config, EventFilter, Printer, PrinterEvent, QueueFlavor,
    BUILD_DATE, VERSION,
};
use std::io::BufRead;
use std::path::PathBuf;

fn main() -> anyhow::Result<()> {
    init_logging()?;
    tracing::info!("printlink {} (built {})", VERSION, BUILD_DATE);

    let path = match std::env::args_os().nth(1) {
        Some(path) => PathBuf::from(path),
        None => default_config_path()?,
    };
    let config = Config::load_or_default(&path)
        .with_context(|| format!("loading settings from {}", path.display()))?;

    let printer = Printer::open(&config.serial, config.engine.clone())
        .with_context(|| format!("opening printer on {}", config.serial.device))?;

    printer.subscribe(EventFilter::All, log_event);

    let queue = printer.command_queue(QueueFlavor::GCode)?;
    for line in std::io::stdin().lock().lines() {
        let line = line.context("reading stdin")?;
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if let Err(e) = queue.enqueue_compile(text, config.command_style) {
            tracing::warn!("Command {} rejected: {}", text, e);
        }
    }

    tracing::info!("Input closed, shutting down");
    printer.close();
    Ok(())
}

fn log_event(event: &PrinterEvent) {
    match event {
        PrinterEvent::FatalError { cause, .. } => tracing::error!("{}", cause),
        PrinterEvent::CommandFailed { .. } => tracing::warn!("{}", event.description()),
        _ => tracing::info!("{}", event.description()),
    }
}
