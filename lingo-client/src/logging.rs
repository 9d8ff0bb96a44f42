use log::LevelFilter;
use simplelog::*;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Where and how much the client logs.
///
/// Output goes to a file; stdout belongs to the CLI.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub enabled: bool,
    pub log_file: PathBuf,
    /// Truncate `log_file` on startup
    pub clear_on_startup: bool,
    pub features: LogFeatures,
    pub level: LevelFilter,
}

/// Per-category switches checked by the `log_*!` macros
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFeatures {
    pub api_calls: bool,
    pub mutations: bool,
    pub wizard: bool,
    pub windowing: bool,
    pub general: bool,
}

impl LogFeatures {
    fn all(on: bool) -> Self {
        Self {
            api_calls: on,
            mutations: on,
            wizard: on,
            windowing: on,
            general: on,
        }
    }
}

impl Default for LogFeatures {
    fn default() -> Self {
        Self {
            windowing: false,
            ..Self::all(true)
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_file: PathBuf::from("lingo.log"),
            clear_on_startup: true,
            features: LogFeatures::default(),
            level: LevelFilter::Info,
        }
    }
}

impl LogConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Warnings and errors only
    pub fn minimal() -> Self {
        Self {
            level: LevelFilter::Warn,
            features: LogFeatures::all(false),
            ..Default::default()
        }
    }

    pub fn verbose() -> Self {
        Self {
            level: LevelFilter::Trace,
            features: LogFeatures::all(true),
            ..Default::default()
        }
    }

    /// Picks a preset from `LINGO_LOG` (`off`, `minimal`, `verbose`, or a
    /// level name such as `debug`). `LINGO_LOG_FILE` overrides the path.
    pub fn from_env() -> Self {
        let mut config = match std::env::var("LINGO_LOG") {
            Ok(value) => Self::from_preset(&value),
            Err(_) => Self::default(),
        };
        if let Ok(path) = std::env::var("LINGO_LOG_FILE") {
            if !path.trim().is_empty() {
                config.log_file = PathBuf::from(path.trim());
            }
        }
        config
    }

    fn from_preset(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "off" | "none" | "0" => Self::disabled(),
            "minimal" | "quiet" => Self::minimal(),
            "verbose" | "all" => Self::verbose(),
            other => match other.parse::<LevelFilter>() {
                Ok(level) => Self {
                    level,
                    ..Default::default()
                },
                Err(_) => Self::default(),
            },
        }
    }

    /// Moves the log file into `dir`, keeping its file name
    pub fn in_dir(mut self, dir: impl AsRef<Path>) -> Self {
        if self.log_file.is_relative() {
            self.log_file = dir.as_ref().join(&self.log_file);
        }
        self
    }
}

/// Installs the global file logger. Safe to call once per process.
pub fn init_logging(config: &LogConfig) -> anyhow::Result<()> {
    if !config.enabled {
        let _ = WriteLogger::init(LevelFilter::Off, Config::default(), std::io::sink());
        return Ok(());
    }

    if let Some(parent) = config.log_file.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    if config.clear_on_startup {
        File::create(&config.log_file)?;
    }
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)?;

    // hyper and reqwest are chatty at debug level
    let format = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .add_filter_ignore_str("hyper")
        .add_filter_ignore_str("reqwest")
        .set_time_offset_to_local()
        .unwrap_or_else(|builder| builder)
        .build();

    WriteLogger::init(config.level, format, log_file)?;
    log::info!(
        "logging to {} at {:?} ({:?})",
        config.log_file.display(),
        config.level,
        config.features
    );
    Ok(())
}

/// HTTP requests and responses
#[macro_export]
macro_rules! log_api_call {
    ($config:expr, $($arg:tt)*) => {
        if $config.enabled && $config.features.api_calls {
            log::debug!(target: "api_calls", $($arg)*);
        }
    };
}

/// Optimistic apply, commit and rollback
#[macro_export]
macro_rules! log_mutation {
    ($config:expr, $($arg:tt)*) => {
        if $config.enabled && $config.features.mutations {
            log::debug!(target: "mutations", $($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_wizard {
    ($config:expr, $($arg:tt)*) => {
        if $config.enabled && $config.features.wizard {
            log::debug!(target: "wizard", $($arg)*);
        }
    };
}

/// Window growth and resets, at trace level
#[macro_export]
macro_rules! log_windowing {
    ($config:expr, $($arg:tt)*) => {
        if $config.enabled && $config.features.windowing {
            log::trace!(target: "windowing", $($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_debug {
    ($config:expr, $($arg:tt)*) => {
        if $config.enabled && $config.features.general {
            log::debug!(target: "general", $($arg)*);
        }
    };
}
