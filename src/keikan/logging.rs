use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::path::Path;
use thiserror::Error;

const PATTERN: &str = "{d(%H:%M:%S%.3f)} {h({l:5})} [{T}] {t} - {m}{n}";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to load log configuration {path}: {message}")]
    File { path: String, message: String },
    #[error("invalid log configuration: {0}")]
    Config(#[from] log4rs::config::runtime::ConfigErrors),
    #[error(transparent)]
    Install(#[from] log::SetLoggerError),
}

/// Colored console output with thread names.
pub fn console_config(level: log::LevelFilter) -> Result<Config, LoggingError> {
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(level))?;
    Ok(config)
}

/// Installs log4rs from a YAML file when given, otherwise the console
/// configuration at `level`.
pub fn init(level: log::LevelFilter, config_file: Option<&Path>) -> Result<(), LoggingError> {
    match config_file {
        Some(path) => {
            log4rs::init_file(path, Default::default()).map_err(|e| LoggingError::File {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        }
        None => {
            log4rs::init_config(console_config(level)?)?;
        }
    }
    log::debug!("logging initialized");
    Ok(())
}
