//! CLI parse: clap types for sendscript. No behavior; definitions only.

use crate::literal::{parse_bool, parse_size, parse_time};
use crate::script::JobFlags;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Sendscript CLI - batch job script synthesis
#[derive(Parser)]
#[command(name = "sendscript")]
#[command(about = "Resolve layered job specifications and write queuing system job scripts")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory the job is submitted from
    #[arg(long, default_value = ".")]
    pub submit_dir: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Queuing system to generate scripts for (default: config, then autodetect)
    #[arg(long)]
    pub qsys: Option<String>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Disable logging entirely
    #[arg(long, short = 'q')]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stderr, stdout, file, file+stderr)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render a job script and print it (or write it to --output)
    Build {
        #[command(flatten)]
        job: JobArgs,
        #[command(flatten)]
        payload: PayloadArgs,
        /// Write the script to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Render a job script, write it and hand it to the submit command
    Submit {
        #[command(flatten)]
        job: JobArgs,
        #[command(flatten)]
        payload: PayloadArgs,
        /// Script file (default: <job name>.sh in the submit directory)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Show the resolved job specification without rendering a script
    Show {
        #[command(flatten)]
        job: JobArgs,
        /// Input file to scan for directives
        #[arg(long)]
        input: Option<PathBuf>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// List the directives recognized in input files
    Directives,
    /// Configuration file commands
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Write a commented default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the path of the global configuration file
    Path,
}

/// Job specification flags. Each flag that is given overwrites config and directives.
#[derive(Args, Debug, Clone, Default)]
pub struct JobArgs {
    /// Job name
    #[arg(long)]
    pub name: Option<String>,

    /// Walltime, integer[suffix] or [[[days:]hours:]minutes:]seconds
    #[arg(long = "wt", value_parser = time_arg)]
    pub walltime: Option<u64>,

    /// Physical and virtual memory, integer[suffix] like 4gb
    #[arg(long = "mem", value_parser = size_arg)]
    pub memory: Option<u64>,

    /// Virtual memory, integer[suffix]
    #[arg(long = "vmem", value_parser = size_arg)]
    pub virtual_memory: Option<u64>,

    /// Request a single node with this many processors
    #[arg(long = "np", value_parser = clap::value_parser!(u32).range(1..))]
    pub processors: Option<u32>,

    /// Mail address for job notifications
    #[arg(long)]
    pub mail: Option<String>,

    /// Job priority
    #[arg(long, allow_negative_numbers = true)]
    pub priority: Option<i32>,

    /// Queue (queue or queue@server)
    #[arg(long)]
    pub queue: Option<String>,

    /// Merge stdout and stderr (true or false)
    #[arg(long, value_parser = bool_arg)]
    pub merge_stdout_stderr: Option<bool>,

    /// Send mail when the job ends (true or false)
    #[arg(long, value_parser = bool_arg)]
    pub send_email_end: Option<bool>,

    /// Send mail when the job begins (true or false)
    #[arg(long, value_parser = bool_arg)]
    pub send_email_begin: Option<bool>,

    /// Send mail when the job is aborted (true or false)
    #[arg(long, value_parser = bool_arg)]
    pub send_email_error: Option<bool>,

    /// Node working directory (default: <workdir_base>/<job name>_<job id>)
    #[arg(long)]
    pub workdir: Option<String>,

    /// Node scratch directory (default: <scratchdir_base>/<job name>_<job id>)
    #[arg(long)]
    pub scratchdir: Option<String>,

    /// Raw queuing system arguments, e.g. "-l nodes=2:ppn=4,walltime=3600"
    #[arg(long, allow_hyphen_values = true)]
    pub qsys_args: Option<String>,
}

impl From<&JobArgs> for JobFlags {
    fn from(args: &JobArgs) -> Self {
        JobFlags {
            name: args.name.clone(),
            walltime: args.walltime,
            memory: args.memory,
            virtual_memory: args.virtual_memory,
            processors: args.processors,
            mail: args.mail.clone(),
            priority: args.priority,
            queue: args.queue.clone(),
            merge_stdout_stderr: args.merge_stdout_stderr,
            send_email_end: args.send_email_end,
            send_email_begin: args.send_email_begin,
            send_email_error: args.send_email_error,
            workdir: args.workdir.clone(),
            scratchdir: args.scratchdir.clone(),
            qsys_args: args.qsys_args.clone(),
        }
    }
}

/// What the job runs and which files travel with it
#[derive(Args, Debug, Clone, Default)]
pub struct PayloadArgs {
    /// Program input file: scanned for directives and copied to the node
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Command line to run on the node
    #[arg(long)]
    pub command: Option<String>,

    /// Directory prepended to PATH before running the command
    #[arg(long)]
    pub path_prefix: Option<String>,

    /// Environment module to load (repeatable)
    #[arg(long = "module")]
    pub modules: Vec<String>,

    /// Additional file to copy to the node working directory (repeatable)
    #[arg(long = "copy-in")]
    pub copy_in: Vec<String>,

    /// File to copy back after the command finished (repeatable)
    #[arg(long = "copy-out")]
    pub copy_out: Vec<String>,

    /// File to copy back if the job is terminated early (repeatable)
    #[arg(long = "copy-on-error")]
    pub copy_on_error: Vec<String>,

    /// Output file checked for the success marker
    #[arg(long, requires = "success_marker")]
    pub check_output: Option<String>,

    /// Text whose absence from --check-output marks the job as failed
    #[arg(long, requires = "check_output")]
    pub success_marker: Option<String>,
}

fn time_arg(raw: &str) -> Result<u64, String> {
    parse_time(raw).map_err(|e| e.to_string())
}

fn size_arg(raw: &str) -> Result<u64, String> {
    parse_size(raw).map_err(|e| e.to_string())
}

fn bool_arg(raw: &str) -> Result<bool, String> {
    parse_bool(raw).map_err(|e| e.to_string())
}
