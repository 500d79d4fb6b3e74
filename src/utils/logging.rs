use crate::error::{InstallerError, Result};
use std::fmt::Display;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// Initialises `env_logger`. `RUST_LOG` wins over `verbose`; with a log file
/// the records are appended there instead of going to stderr.
pub fn init(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let default_level = if verbose { "debug" } else { "warn" };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level));

    if let Some(path) = log_file {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            crate::utils::fs::ensure_dir_exists(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| InstallerError::from_io(e, path))?;
        builder
            .filter_level(if verbose {
                log::LevelFilter::Debug
            } else {
                log::LevelFilter::Info
            })
            .parse_env(env_logger::Env::default())
            .target(env_logger::Target::Pipe(Box::new(file)))
            .format(|buf, record| {
                let line = file_line(buf.timestamp_seconds(), record);
                writeln!(buf, "{line}")
            });
    }

    builder.try_init().map_err(|e| InstallerError::Config {
        message: format!("logger already initialised: {e}"),
    })
}

/// One log-file line: `<timestamp> - <LEVEL> - <message>`.
fn file_line(timestamp: impl Display, record: &log::Record) -> String {
    format!("{timestamp} - {} - {}", record.level(), record.args())
}
