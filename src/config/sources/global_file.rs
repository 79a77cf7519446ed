//! Global config file source: $XDG_CONFIG_HOME/sendscript/config.toml or ~/.config/sendscript/config.toml

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::File;
use config::FileFormat;
use std::path::PathBuf;
use tracing::debug;

/// Path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    let config_home = std::env::var("XDG_CONFIG_HOME")
        .ok()
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var("HOME")
                .ok()
                .filter(|home| !home.is_empty())
                .map(|home| PathBuf::from(home).join(".config"))
        })?;
    Some(config_home.join("sendscript").join("config.toml"))
}

/// Add the global config file source to builder if it exists.
pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    match global_config_path() {
        Some(path) if path.is_file() => {
            let canonical = path.canonicalize().unwrap_or_else(|_| path.clone());
            debug!(config_path = %canonical.display(), "using global configuration");
            builder.add_source(File::from(canonical).format(FileFormat::Toml).required(false))
        }
        Some(path) => {
            debug!(
                config_path = %path.display(),
                "No global configuration file. Run `sendscript config init` to create one."
            );
            builder
        }
        None => builder,
    }
}
