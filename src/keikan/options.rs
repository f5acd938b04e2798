use crate::gpu::PresentMode;
use crate::platform::window::WindowSettings;
use crate::renderer::RendererConfig;
use clap::{App, Arg};
use std::ffi::OsString;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OptionsError {
    #[error(transparent)]
    Cli(#[from] clap::Error),
    #[error("invalid value {value:?} for --{option}: {reason}")]
    Invalid {
        option: &'static str,
        value: String,
        reason: &'static str,
    },
}

impl OptionsError {
    /// `--help` and `--version` surface as errors carrying their output.
    pub fn is_informational(&self) -> bool {
        match self {
            OptionsError::Cli(e) => matches!(
                e.kind,
                clap::ErrorKind::HelpDisplayed | clap::ErrorKind::VersionDisplayed
            ),
            OptionsError::Invalid { .. } => false,
        }
    }
}

/// Command line of the `sanpo` binary, parsed once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub fullscreen: bool,
    pub present_mode: Option<PresentMode>,
    pub statistics: bool,
    pub width: u32,
    pub height: u32,
    /// Zero means uncapped.
    pub fps_cap: u32,
    pub heightmap: Option<PathBuf>,
    pub heightmap_size: (u32, u32),
    pub log_level: log::LevelFilter,
    pub log_config: Option<PathBuf>,
}

fn invalid(option: &'static str, value: &str, reason: &'static str) -> OptionsError {
    OptionsError::Invalid {
        option,
        value: value.to_owned(),
        reason,
    }
}

pub fn parse_present_mode(value: &str) -> Option<PresentMode> {
    match value.to_ascii_lowercase().as_str() {
        "immediate" | "0" => Some(PresentMode::Immediate),
        "mailbox" | "1" => Some(PresentMode::Mailbox),
        "fifo" | "2" => Some(PresentMode::Fifo),
        "fifo-relaxed" | "relaxed" | "3" => Some(PresentMode::FifoRelaxed),
        _ => None,
    }
}

fn parse_number(option: &'static str, value: &str) -> Result<u32, OptionsError> {
    value
        .parse()
        .map_err(|_| invalid(option, value, "expected a non-negative integer"))
}

fn parse_size(option: &'static str, value: &str) -> Result<(u32, u32), OptionsError> {
    let mut parts = value.splitn(2, |c| c == 'x' || c == 'X');
    match (parts.next(), parts.next()) {
        (Some(w), Some(d)) => Ok((parse_number(option, w)?, parse_number(option, d)?)),
        _ => Err(invalid(option, value, "expected WIDTHxDEPTH")),
    }
}

fn app() -> App<'static, 'static> {
    App::new("sanpo")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Walks a lit terrain scene rendered with Vulkan")
        .arg(
            Arg::with_name("fullscreen")
                .short("f")
                .long("fullscreen")
                .help("Open a borderless fullscreen window"),
        )
        .arg(
            Arg::with_name("vsync")
                .short("v")
                .long("vsync")
                .takes_value(true)
                .value_name("MODE")
                .help("Present mode: immediate, mailbox, fifo, fifo-relaxed or 0-3"),
        )
        .arg(
            Arg::with_name("stats")
                .short("s")
                .long("stats")
                .help("Print pipeline statistics every frame"),
        )
        .arg(
            Arg::with_name("width")
                .short("W")
                .long("width")
                .takes_value(true)
                .default_value("500"),
        )
        .arg(
            Arg::with_name("height")
                .short("H")
                .long("height")
                .takes_value(true)
                .default_value("500"),
        )
        .arg(
            Arg::with_name("fps-cap")
                .short("c")
                .long("fps-cap")
                .takes_value(true)
                .value_name("FPS")
                .default_value("0")
                .help("Frame rate limit, 0 for none"),
        )
        .arg(
            Arg::with_name("heightmap")
                .long("heightmap")
                .takes_value(true)
                .value_name("PATH")
                .help("Raw 8-bit height field; a generated terrain is used when absent"),
        )
        .arg(
            Arg::with_name("heightmap-size")
                .long("heightmap-size")
                .takes_value(true)
                .value_name("WxD")
                .default_value("128x128"),
        )
        .arg(
            Arg::with_name("log-level")
                .long("log-level")
                .takes_value(true)
                .default_value("info")
                .possible_values(&["off", "error", "warn", "info", "debug", "trace"]),
        )
        .arg(
            Arg::with_name("log-config")
                .long("log-config")
                .takes_value(true)
                .value_name("PATH")
                .help("log4rs YAML configuration, overrides --log-level"),
        )
}

impl Options {
    pub fn from_args<I, T>(args: I) -> Result<Self, OptionsError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = app().get_matches_from_safe(args)?;

        let present_mode = match matches.value_of("vsync") {
            Some(value) => Some(
                parse_present_mode(value).ok_or_else(|| invalid("vsync", value, "unknown mode"))?,
            ),
            None => None,
        };
        let number = |option: &'static str| -> Result<u32, OptionsError> {
            parse_number(option, matches.value_of(option).unwrap_or("0"))
        };
        let width = number("width")?;
        let height = number("height")?;
        if width == 0 || height == 0 {
            return Err(invalid("width", &format!("{}x{}", width, height), "window must not be empty"));
        }
        let log_level = matches
            .value_of("log-level")
            .unwrap_or("info")
            .parse()
            .unwrap_or(log::LevelFilter::Info);

        Ok(Options {
            fullscreen: matches.is_present("fullscreen"),
            present_mode,
            statistics: matches.is_present("stats"),
            width,
            height,
            fps_cap: number("fps-cap")?,
            heightmap: matches.value_of_os("heightmap").map(PathBuf::from),
            heightmap_size: parse_size(
                "heightmap-size",
                matches.value_of("heightmap-size").unwrap_or("128x128"),
            )?,
            log_level,
            log_config: matches.value_of_os("log-config").map(PathBuf::from),
        })
    }

    pub fn renderer_config(&self) -> RendererConfig {
        RendererConfig {
            statistics: self.statistics,
            fps_cap: self.fps_cap,
            present_mode: self.present_mode,
            ..RendererConfig::default()
        }
    }

    pub fn window_settings(&self) -> WindowSettings {
        WindowSettings {
            title: "sanpo".into(),
            width: self.width,
            height: self.height,
            fullscreen: self.fullscreen,
        }
    }
}
