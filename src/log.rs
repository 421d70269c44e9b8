//! Logging configuration.
//!
//! Messages go to stdout with coloured levels and, when an output directory is known, to a log
//! file alongside the results.
use anyhow::{Context, Result};
use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;
use std::path::Path;
use std::sync::OnceLock;

/// The default program log level
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Environment variable overriding the configured log level
const LOG_LEVEL_ENV_VAR: &str = "MESPLAN_LOG_LEVEL";

/// The file name for log output inside the output directory
const LOG_FILE_NAME: &str = "mesplan.log";

/// Set once the logger has been initialised
static LOGGER_INITIALISED: OnceLock<()> = OnceLock::new();

/// Whether [`init`] has already succeeded in this process
pub fn is_logger_initialised() -> bool {
    LOGGER_INITIALISED.get().is_some()
}

/// Initialise the program logger.
///
/// The log level is taken from the `MESPLAN_LOG_LEVEL` environment variable if set, otherwise
/// from `log_level`. When `output_path` is provided, the log is also written to a file there.
/// The logger can only be initialised once per process.
pub fn init(log_level: &str, output_path: Option<&Path>) -> Result<()> {
    let log_level = std::env::var(LOG_LEVEL_ENV_VAR).unwrap_or_else(|_| log_level.to_string());
    let level: LevelFilter = log_level
        .parse()
        .with_context(|| format!("Unknown log level: {log_level}"))?;

    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue);

    let mut dispatch = fern::Dispatch::new().level(level).chain(
        fern::Dispatch::new()
            .format(move |out, message, record| {
                out.finish(format_args!(
                    "[{} {}] {}",
                    chrono::Local::now().format("%H:%M:%S"),
                    colors.color(record.level()),
                    message
                ))
            })
            .chain(std::io::stdout()),
    );

    if let Some(output_path) = output_path {
        dispatch = dispatch.chain(
            fern::Dispatch::new()
                .format(|out, message, record| {
                    out.finish(format_args!(
                        "[{} {}] {}",
                        chrono::Local::now().format("%Y-%m-%dT%H:%M:%S"),
                        record.level(),
                        message
                    ))
                })
                .chain(fern::log_file(output_path.join(LOG_FILE_NAME))?),
        );
    }

    dispatch.apply()?;
    let _ = LOGGER_INITIALISED.set(());

    Ok(())
}
