//! CLI help: command names used in log events.

use crate::cli::parse::{Commands, ConfigCommands};

/// Command name string for log events (e.g. "build", "config.init").
pub fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Build { .. } => "build",
        Commands::Submit { .. } => "submit",
        Commands::Show { .. } => "show",
        Commands::Directives => "directives",
        Commands::Config { command } => match command {
            ConfigCommands::Init { .. } => "config.init",
            ConfigCommands::Path => "config.path",
        },
    }
}
