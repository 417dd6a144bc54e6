//! Logging initialization for the `doctask` binary.
//!
//! Logs go to `./doctask.log` in the current working directory, to the
//! terminal's stderr, or both.

use std::fs::File;
use std::path::PathBuf;

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

const LOG_FILENAME: &str = "./doctask.log";

/// Destination for log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogDestination {
    /// Write to ./doctask.log in current directory.
    File,
    /// Write to the terminal (stderr, so command output stays clean).
    Terminal,
    /// Write to both file and terminal.
    Both,
}

impl LogDestination {
    /// File logging keeps the terminal quiet unless debug output was asked for.
    pub fn choose(log_to_file: bool, verbose: bool) -> Self {
        match (log_to_file, verbose) {
            (true, true) => LogDestination::Both,
            (true, false) => LogDestination::File,
            (false, _) => LogDestination::Terminal,
        }
    }
}

pub fn initialize(destination: LogDestination, verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let config = build_config();

    let loggers: Vec<Box<dyn SharedLogger>> = match destination {
        LogDestination::File => match create_file_logger(level, config) {
            Some(file_logger) => vec![file_logger],
            None => return,
        },
        LogDestination::Terminal => vec![term_logger(level, config)],
        LogDestination::Both => {
            let mut loggers: Vec<Box<dyn SharedLogger>> =
                vec![term_logger(level, config.clone())];
            if let Some(file_logger) = create_file_logger(level, config) {
                loggers.push(file_logger);
            }
            loggers
        }
    };

    let _ = CombinedLogger::init(loggers);
}

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .add_filter_allow_str("extraction_")
        .add_filter_allow_str("pipeline_")
        .build()
}

fn term_logger(level: LevelFilter, config: Config) -> Box<TermLogger> {
    TermLogger::new(level, config, TerminalMode::Stderr, ColorChoice::Auto)
}

fn create_file_logger(level: LevelFilter, config: Config) -> Option<Box<WriteLogger<File>>> {
    let log_path = PathBuf::from(LOG_FILENAME);
    match File::create(&log_path) {
        Ok(file) => Some(WriteLogger::new(level, config, file)),
        Err(err) => {
            eprintln!("Warning: Could not create log file at {:?}: {}", log_path, err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::LogDestination;

    #[test]
    fn verbose_file_logging_also_prints() {
        assert_eq!(LogDestination::choose(true, true), LogDestination::Both);
        assert_eq!(LogDestination::choose(true, false), LogDestination::File);
        assert_eq!(LogDestination::choose(false, true), LogDestination::Terminal);
    }
}
