//! Logger initialisation
//!
//! Libraries only use the `log` facade; executables call `logger_init` once at startup. Records go
//! to two sinks: the terminal, with coloured level tags, and the session log file as plain text.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use colored::{ColoredString, Colorize};
use log::{info, Level, Record};
use std::fmt::Arguments;
use thiserror::Error;

// Internal imports
use crate::session;

// Re-exports
pub use log::LevelFilter;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Targets which log every tick, and the most verbose level shown for them on the terminal.
const TERMINAL_QUIET_TARGETS: [(&str, LevelFilter); 2] = [
    ("drive_lib::sim", LevelFilter::Info),
    ("drive_lib::limiter", LevelFilter::Debug),
];

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with initialising the logger.
#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("Expected a log level of at least `INFO`, found `{0}`")]
    InvalidMinLogLevel(LevelFilter),

    #[error("Could not open the log file: {0}")]
    LogFileInitError(std::io::Error),

    #[error("A logger has already been set: {0}")]
    FernInitError(log::SetLoggerError),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Initialise the logger for this execution.
///
/// `min_level` applies to both sinks and must include `Info`. Per-tick diagnostics from the
/// simulation and the limiters are kept off the terminal but still reach the log file.
///
/// Must only be called once.
pub fn logger_init(
    min_level: LevelFilter,
    session: &session::Session,
) -> Result<(), LoggerInitError> {
    if min_level < Level::Info {
        return Err(LoggerInitError::InvalidMinLogLevel(min_level));
    }

    let log_file = fern::log_file(&session.log_file_path)
        .map_err(LoggerInitError::LogFileInitError)?;

    let mut terminal = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}",
                format_line(record, level_tag(record.level()), message)
            ))
        })
        .level(min_level)
        .chain(std::io::stdout());
    for &(target, level) in TERMINAL_QUIET_TARGETS.iter() {
        terminal = terminal.level_for(target, level.min(min_level));
    }

    let file = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}",
                format_line(record, record.level().as_str(), message)
            ))
        })
        .level(min_level)
        .chain(log_file);

    fern::Dispatch::new()
        .chain(terminal)
        .chain(file)
        .apply()
        .map_err(LoggerInitError::FernInitError)?;

    info!("Logging initialised");
    info!("    Session epoch: {}", session::get_epoch());
    info!("    Log level: {:?}", min_level);
    info!("    Log file path: {:?}", session.log_file_path);

    Ok(())
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Format one line, with the target for anything more verbose than info.
fn format_line<T: std::fmt::Display>(record: &Record, tag: T, message: &Arguments) -> String {
    if record.level() > Level::Info {
        format!(
            "[{:10.6} {}] {}: {}",
            session::get_elapsed_seconds(),
            tag,
            record.target(),
            message
        )
    } else {
        format!(
            "[{:10.6} {}] {}",
            session::get_elapsed_seconds(),
            tag,
            message
        )
    }
}

/// Coloured tag for the terminal.
fn level_tag(level: Level) -> ColoredString {
    match level {
        Level::Trace => "TRC".dimmed().italic(),
        Level::Debug => "DBG".dimmed(),
        Level::Info => "INF".normal(),
        Level::Warn => "WRN".yellow(),
        Level::Error => "ERR".red().bold(),
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;

    #[test]
    fn test_logger_init() {
        let root = std::env::temp_dir().join(format!("swerve_logger_{}", std::process::id()));
        fs::create_dir_all(&root).unwrap();
        std::env::set_var(crate::host::SW_ROOT_ENV_VAR, &root);

        let session = session::Session::new("logger_test", "sessions").unwrap();

        // Below info is rejected before anything is set up
        assert!(matches!(
            logger_init(LevelFilter::Warn, &session),
            Err(LoggerInitError::InvalidMinLogLevel(_))
        ));

        logger_init(LevelFilter::Debug, &session).unwrap();
        log::debug!(target: "drive_lib::sim", "sim tick detail");
        log::warn!("battery low");
        log::logger().flush();

        // The file gets plain tags and the target of verbose records
        let contents = fs::read_to_string(&session.log_file_path).unwrap();
        assert!(contents.contains("WARN] battery low"));
        assert!(contents.contains("DEBUG] drive_lib::sim: sim tick detail"));
        assert!(!contents.contains('\u{1b}'));

        // A second logger cannot be installed
        assert!(matches!(
            logger_init(LevelFilter::Info, &session),
            Err(LoggerInitError::FernInitError(_))
        ));

        fs::remove_dir_all(&root).ok();
    }
}
