//! Error types for job specification resolution and script synthesis.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the structural merger
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    #[error("Types of receiver and sender do not match: cannot merge {sender} into {receiver}")]
    TypeMismatch {
        receiver: &'static str,
        sender: &'static str,
    },

    #[error("Could not merge field {field}: both sides are set to different values")]
    FieldConflict { field: String },
}

impl MergeError {
    /// Name of the conflicting field, if this is a field conflict
    pub fn field(&self) -> Option<&str> {
        match self {
            MergeError::FieldConflict { field } => Some(field),
            MergeError::TypeMismatch { .. } => None,
        }
    }
}

/// Kind of literal a [`LiteralError`] was raised for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    Time,
    Size,
    Bool,
    Integer,
}

impl std::fmt::Display for LiteralKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LiteralKind::Time => "time",
            LiteralKind::Size => "size",
            LiteralKind::Bool => "boolean",
            LiteralKind::Integer => "integer",
        };
        f.write_str(name)
    }
}

/// A time, size or boolean literal could not be interpreted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("\"{raw}\" is not a valid {kind} value: {reason}")]
pub struct LiteralError {
    pub kind: LiteralKind,
    pub raw: String,
    pub reason: String,
}

impl LiteralError {
    pub fn new(kind: LiteralKind, raw: &str, reason: impl Into<String>) -> Self {
        Self {
            kind,
            raw: raw.to_string(),
            reason: reason.into(),
        }
    }
}

/// Persisted configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Error while parsing the configuration ({location}): {message}")]
    Parse { location: String, message: String },

    #[error("Cannot interpret config value of {key}: {value}. {expected}")]
    InvalidValue {
        key: String,
        value: String,
        expected: String,
    },

    #[error("Config file already exists: {0}. Use --force to overwrite it.")]
    Exists(PathBuf),

    #[error("Cannot determine the configuration directory: neither XDG_CONFIG_HOME nor HOME is set")]
    NoConfigHome,

    #[error("Failed to initialize logging: {0}")]
    Logging(String),

    #[error("Config I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::Parse {
            location: "layered configuration".to_string(),
            message: err.to_string(),
        }
    }
}

/// Top-level error for resolving a job specification and rendering its script
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Merge failed: {0}")]
    Merge(#[from] MergeError),

    #[error("The explicitly provided queuing system arguments and the other arguments conflict: {0}")]
    OverrideConflict(#[source] MergeError),

    #[error("Could not parse value \"{value}\" of {key}: {source}")]
    MalformedValue {
        key: String,
        value: String,
        #[source]
        source: LiteralError,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Not ready to build the job script: {0}")]
    NotReady(String),

    #[error("Invalid queuing system arguments: {0}")]
    InvalidOverride(String),

    #[error("Unknown queuing system: {0} (known: pbs)")]
    UnknownQueuingSystem(String),

    #[error("Submission via {command} failed ({status}): {stderr}")]
    Submit {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize output: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ScriptError {
    /// Build a malformed-value error for a recognized key
    pub fn malformed(key: impl Into<String>, value: impl Into<String>, source: LiteralError) -> Self {
        ScriptError::MalformedValue {
            key: key.into(),
            value: value.into(),
            source,
        }
    }

    pub fn not_ready(reason: impl Into<String>) -> Self {
        ScriptError::NotReady(reason.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ScriptError::Io {
            path: path.into(),
            source,
        }
    }
}
