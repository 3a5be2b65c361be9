use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;
use std::fs::OpenOptions;
use std::path::Path;

/// Where log records go.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogTarget<'a> {
    Stdout,
    File(&'a Path),
}

pub fn setup_logger(level: LevelFilter, target: LogTarget<'_>) -> Result<(), log::SetLoggerError> {
    if level == LevelFilter::Off {
        log::set_max_level(LevelFilter::Off);
        return Ok(());
    }

    let process_id = std::process::id();
    let base_config = match target {
        LogTarget::Stdout => {
            let colors = ColoredLevelConfig::new()
                .trace(Color::BrightBlack)
                .debug(Color::BrightBlue)
                .info(Color::Green)
                .warn(Color::Yellow)
                .error(Color::Red);
            fern::Dispatch::new().format(move |out, message, record| {
                out.finish(format_args!(
                    "[{} {} {}] {}",
                    chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                    colors.color(record.level()),
                    record.target(),
                    message
                ))
            })
        }
        LogTarget::File(_) => fern::Dispatch::new().format(move |out, message, record| {
            out.finish(format_args!(
                "[{} azure-ha[{process_id}] {}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                message
            ))
        }),
    }
    .level(level);

    match target {
        LogTarget::Stdout => base_config.chain(std::io::stdout()).apply(),
        LogTarget::File(path) => match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => base_config.chain(file).apply(),
            Err(e) => {
                // Stdout is reserved for the monitor verdict.
                eprintln!(
                    "Warning: Failed to open log file '{}': {e}",
                    path.display()
                );
                base_config.chain(std::io::stderr()).apply()
            }
        },
    }
}
