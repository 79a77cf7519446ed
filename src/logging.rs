//! Logging System
//!
//! Structured logging through the `tracing` crate. Level, format and
//! destination come from the `[logging]` config table, overridable via
//! environment and commandline. Logs go to stderr by default since stdout
//! carries the rendered job script.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Install a subscriber at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Log level: trace, debug, info, warn, error, off
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: json, text
    #[serde(default = "default_format")]
    pub format: String,

    /// Output destination: stderr, stdout, file, file+stderr
    #[serde(default = "default_output")]
    pub output: String,

    /// Log file path (if output includes "file")
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Enable colored output (text format, terminal outputs only)
    #[serde(default = "default_true")]
    pub color: bool,

    /// Module-specific log levels
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

fn default_output() -> String {
    "stderr".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            level: default_log_level(),
            format: default_format(),
            output: default_output(),
            file: None,
            color: default_true(),
            modules: HashMap::new(),
        }
    }
}

/// Log file used when output includes "file" and no path is configured
pub fn default_log_file(submit_dir: &Path) -> PathBuf {
    submit_dir.join("sendscript.log")
}

/// Initialize the logging system
///
/// Priority order (highest to lowest):
/// 1. CLI arguments (already folded into `config` by the caller)
/// 2. Environment variables (SENDSCRIPT_LOG, SENDSCRIPT_LOG_FORMAT, ...)
/// 3. Configuration file
/// 4. Defaults
pub fn init_logging(config: Option<&LoggingConfig>) -> Result<(), ConfigError> {
    if let Some(config) = config {
        if !config.enabled {
            return Ok(());
        }
    }

    let filter = build_env_filter(config)?;
    let format = determine_format(config)?;
    let output = determine_output(config)?;
    let use_color = config.map(|c| c.color).unwrap_or(true);

    let writer = match output {
        OutputDestination::Stderr => BoxMakeWriter::new(std::io::stderr),
        OutputDestination::Stdout => BoxMakeWriter::new(std::io::stdout),
        OutputDestination::File => BoxMakeWriter::new(Mutex::new(open_log_file(config)?)),
        OutputDestination::FileAndStderr => {
            BoxMakeWriter::new(Mutex::new(open_log_file(config)?).and(std::io::stderr))
        }
    };
    let ansi = use_color
        && matches!(output, OutputDestination::Stderr | OutputDestination::Stdout);

    let base_subscriber = Registry::default().with(filter);
    let result = if format == "json" {
        base_subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(writer),
            )
            .try_init()
    } else {
        base_subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(ansi)
                    .with_writer(writer),
            )
            .try_init()
    };

    result.map_err(|e| ConfigError::Logging(e.to_string()))
}

fn open_log_file(config: Option<&LoggingConfig>) -> Result<std::fs::File, ConfigError> {
    let log_file = config
        .and_then(|c| c.file.clone())
        .unwrap_or_else(|| default_log_file(Path::new(".")));

    if let Some(parent) = log_file.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file)
        .map_err(|source| ConfigError::Io {
            path: log_file.clone(),
            source,
        })
}

fn invalid(key: &str, value: &str, expected: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        expected: expected.to_string(),
    }
}

/// Build environment filter from config or environment variables
fn build_env_filter(config: Option<&LoggingConfig>) -> Result<EnvFilter, ConfigError> {
    if let Ok(filter) = EnvFilter::try_from_env("SENDSCRIPT_LOG") {
        return Ok(filter);
    }

    let level = config.map(|c| c.level.as_str()).unwrap_or("warn");
    if level == "off" {
        return Ok(EnvFilter::new("off"));
    }

    let mut filter = EnvFilter::try_new(level)
        .map_err(|_| invalid("logging.level", level, "Should be one of trace, debug, info, warn, error, off"))?;

    if let Some(config) = config {
        for (module, module_level) in &config.modules {
            let directive = format!("{}={}", module, module_level);
            filter = filter.add_directive(
                directive
                    .parse()
                    .map_err(|_| invalid("logging.modules", &directive, "Should be module=level"))?,
            );
        }
    }

    if let Ok(modules_str) = std::env::var("SENDSCRIPT_LOG_MODULES") {
        for module_spec in modules_str.split(',') {
            if let Some((module, module_level)) = module_spec.split_once('=') {
                let directive = format!("{}={}", module.trim(), module_level.trim());
                filter = filter.add_directive(directive.parse().map_err(|_| {
                    invalid("SENDSCRIPT_LOG_MODULES", &directive, "Should be module=level,...")
                })?);
            }
        }
    }

    Ok(filter)
}

/// Determine output format from config or environment
fn determine_format(config: Option<&LoggingConfig>) -> Result<String, ConfigError> {
    if let Ok(format) = std::env::var("SENDSCRIPT_LOG_FORMAT") {
        if format == "json" || format == "text" {
            return Ok(format);
        }
    }

    let format = config.map(|c| c.format.as_str()).unwrap_or("text");
    if format != "json" && format != "text" {
        return Err(invalid("logging.format", format, "Should be 'json' or 'text'"));
    }
    Ok(format.to_string())
}

/// Where log events are written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputDestination {
    Stderr,
    Stdout,
    File,
    FileAndStderr,
}

/// Determine the output destination from environment or config
fn determine_output(config: Option<&LoggingConfig>) -> Result<OutputDestination, ConfigError> {
    if let Ok(output) = std::env::var("SENDSCRIPT_LOG_OUTPUT") {
        return parse_output_destination(&output);
    }
    parse_output_destination(config.map(|c| c.output.as_str()).unwrap_or("stderr"))
}

fn parse_output_destination(output: &str) -> Result<OutputDestination, ConfigError> {
    match output {
        "stderr" => Ok(OutputDestination::Stderr),
        "stdout" => Ok(OutputDestination::Stdout),
        "file" => Ok(OutputDestination::File),
        "file+stderr" | "both" => Ok(OutputDestination::FileAndStderr),
        _ => Err(invalid(
            "logging.output",
            output,
            "Should be 'stderr', 'stdout', 'file' or 'file+stderr'",
        )),
    }
}
