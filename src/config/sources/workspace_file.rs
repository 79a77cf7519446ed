//! Submit directory config file source: <submit_dir>/.sendscript.toml

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::File;
use config::FileFormat;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const WORKSPACE_CONFIG_FILE: &str = ".sendscript.toml";

pub fn workspace_config_path(submit_dir: &Path) -> PathBuf {
    submit_dir.join(WORKSPACE_CONFIG_FILE)
}

/// Add the submit directory's config file to builder if it exists.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    submit_dir: &Path,
) -> ConfigBuilder<DefaultState> {
    let path = workspace_config_path(submit_dir);
    if !path.is_file() {
        return builder;
    }
    debug!(config_path = %path.display(), "using submit directory configuration");
    builder.add_source(File::from(path).format(FileFormat::Toml).required(false))
}
