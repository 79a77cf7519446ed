//! Loading and initializing the persisted configuration.

use super::merge::merge_policy::{builder_with_defaults, current_user};
use super::sources::{global_file, workspace_file};
use super::{default_config_toml, SendscriptConfig};
use crate::error::ConfigError;
use config::{Environment, File, FileFormat};
use std::path::{Path, PathBuf};
use tracing::info;

/// Entry points for reading and creating configuration files
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load the layered configuration for jobs submitted from `submit_dir`.
    ///
    /// Layers, lowest first: built-in defaults, global file, submit
    /// directory file, `SENDSCRIPT__<TABLE>__<KEY>` environment variables.
    pub fn load(submit_dir: &Path) -> Result<SendscriptConfig, ConfigError> {
        let user = current_user();
        let builder = builder_with_defaults(user.as_deref())?;
        let builder = global_file::add_to_builder(builder);
        let builder = workspace_file::add_to_builder(builder, submit_dir);
        let builder = builder.add_source(
            Environment::with_prefix("SENDSCRIPT")
                .prefix_separator("__")
                .separator("__"),
        );

        let locations = Self::locations(submit_dir);
        builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| ConfigError::Parse {
                location: locations,
                message: e.to_string(),
            })
    }

    /// Load built-in defaults overlaid with exactly one file.
    pub fn load_from_file(path: &Path) -> Result<SendscriptConfig, ConfigError> {
        let user = current_user();
        builder_with_defaults(user.as_deref())?
            .add_source(File::from(path).format(FileFormat::Toml).required(true))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| ConfigError::Parse {
                location: path.display().to_string(),
                message: e.to_string(),
            })
    }

    /// Path of the global config file
    pub fn xdg_config_path() -> Option<PathBuf> {
        global_file::global_config_path()
    }

    /// Write the commented default configuration to `path` (the global
    /// config file if `None`). Refuses to overwrite unless `force`.
    pub fn write_default(path: Option<&Path>, force: bool) -> Result<PathBuf, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::xdg_config_path().ok_or(ConfigError::NoConfigHome)?,
        };
        if path.exists() && !force {
            return Err(ConfigError::Exists(path));
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let user = current_user();
        std::fs::write(&path, default_config_toml(user.as_deref())).map_err(|source| {
            ConfigError::Io {
                path: path.clone(),
                source,
            }
        })?;

        info!(config_path = %path.display(), "wrote default configuration");
        Ok(path)
    }

    fn locations(submit_dir: &Path) -> String {
        let mut locations = Vec::new();
        if let Some(global) = Self::xdg_config_path().filter(|p| p.is_file()) {
            locations.push(global.display().to_string());
        }
        let local = workspace_file::workspace_config_path(submit_dir);
        if local.is_file() {
            locations.push(local.display().to_string());
        }
        locations.push("SENDSCRIPT__* environment".to_string());
        locations.join(", ")
    }
}
