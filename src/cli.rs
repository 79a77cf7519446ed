//! CLI domain: parse, route, help, output, and presentation only.
//! No resolution logic; a single route table dispatches to the script builder.

mod help;
mod output;
mod parse;
mod presentation;
mod route;

pub use help::command_name;
pub use output::map_error;
pub use parse::{Cli, Commands, ConfigCommands, JobArgs, PayloadArgs};
pub use presentation::{format_spec_json, format_spec_text};
pub use route::RunContext;
