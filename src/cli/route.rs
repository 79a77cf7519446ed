//! CLI route: single route table and run context. Dispatches to the script
//! builder, the config loader and presentation.

use crate::cli::command_name;
use crate::cli::parse::{Commands, ConfigCommands, JobArgs, PayloadArgs};
use crate::cli::presentation::{format_spec_json, format_spec_text};
use crate::config::{ConfigLoader, SendscriptConfig};
use crate::directive::{describe_directives, DirectiveParser};
use crate::error::{ConfigError, ScriptError};
use crate::hooks::{CopyIn, CopyOut, CopySource, RunCommand};
use crate::qsys::{backend_by_name, guess_queuing_system, QueuingSystem};
use crate::script::{JobFlags, JobScriptBuilder};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Hook priorities of the stock payload
const COPY_IN_PRIORITY: i32 = 0;
const COMMAND_PRIORITY: i32 = 10;
const COPY_OUT_PRIORITY: i32 = 20;

/// Runtime context for CLI execution: submit directory, config location and
/// queuing system choice.
pub struct RunContext {
    submit_dir: PathBuf,
    config_path: Option<PathBuf>,
    qsys: Option<String>,
}

impl RunContext {
    pub fn new(submit_dir: PathBuf, config_path: Option<PathBuf>, qsys: Option<String>) -> Self {
        Self {
            submit_dir,
            config_path,
            qsys,
        }
    }

    pub fn submit_dir(&self) -> &Path {
        &self.submit_dir
    }

    /// Load the configuration. Only commands that need it call this, so
    /// `config init` works even if an existing file is broken.
    pub fn load_config(&self) -> Result<SendscriptConfig, ConfigError> {
        match &self.config_path {
            Some(path) => ConfigLoader::load_from_file(path),
            None => ConfigLoader::load(&self.submit_dir),
        }
    }

    /// Commandline choice, then config, then autodetection.
    fn backend(&self, config: &SendscriptConfig) -> Result<Box<dyn QueuingSystem>, ScriptError> {
        match self.qsys.as_deref().or(config.queuing_system.as_deref()) {
            Some(name) => backend_by_name(name),
            None => Ok(guess_queuing_system()),
        }
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> Result<String, ScriptError> {
        let started = Instant::now();
        let name = command_name(command);
        debug!(command = name, "command started");
        let result = self.execute_inner(command);
        info!(
            command = name,
            ok = result.is_ok(),
            duration_ms = started.elapsed().as_millis() as u64,
            "command finished"
        );
        result
    }

    fn execute_inner(&self, command: &Commands) -> Result<String, ScriptError> {
        match command {
            Commands::Build {
                job,
                payload,
                output,
            } => {
                let (_, script) = self.render(job, payload)?;
                match output {
                    Some(path) => {
                        let path = self.submit_dir.join(path);
                        write_script(&path, &script)?;
                        Ok(format!("Wrote job script to {}", path.display()))
                    }
                    None => Ok(script.trim_end_matches('\n').to_string()),
                }
            }
            Commands::Submit {
                job,
                payload,
                output,
            } => self.handle_submit(job, payload, output.as_deref()),
            Commands::Show { job, input, format } => {
                let config = self.load_config()?;
                let mut builder = JobScriptBuilder::new(self.backend(&config)?);
                let input = input.as_ref().map(|p| self.submit_dir.join(p));
                let warnings = builder.resolve(&config.job, input.as_deref(), &JobFlags::from(job))?;
                builder.ensure_nodes();
                if format == "json" {
                    format_spec_json(builder.spec(), &warnings)
                } else {
                    Ok(format_spec_text(builder.spec(), &warnings))
                }
            }
            Commands::Directives => {
                let parser = DirectiveParser::default();
                Ok(format!(
                    "Directives recognized anywhere in input files:\n{}",
                    describe_directives(&parser, "  ").trim_end_matches('\n')
                ))
            }
            Commands::Config { command } => self.handle_config(command),
        }
    }

    fn handle_submit(
        &self,
        job: &JobArgs,
        payload: &PayloadArgs,
        output: Option<&Path>,
    ) -> Result<String, ScriptError> {
        let (builder, script) = self.render(job, payload)?;
        let path = match output {
            Some(path) => self.submit_dir.join(path),
            None => {
                let name = builder.spec().job_name.as_deref().unwrap_or("job");
                self.submit_dir.join(format!("{}.sh", name))
            }
        };
        write_script(&path, &script)?;
        // the submit command runs inside the submit directory
        let path = std::fs::canonicalize(&path).map_err(|e| ScriptError::io(&path, e))?;
        let job_id = builder.qsys().submit(&path, &self.submit_dir)?;
        Ok(job_id.trim().to_string())
    }

    fn handle_config(&self, command: &ConfigCommands) -> Result<String, ScriptError> {
        match command {
            ConfigCommands::Init { force } => {
                let path = ConfigLoader::write_default(self.config_path.as_deref(), *force)?;
                Ok(format!("Wrote default configuration to {}", path.display()))
            }
            ConfigCommands::Path => {
                let path = match &self.config_path {
                    Some(path) => path.clone(),
                    None => ConfigLoader::xdg_config_path().ok_or(ConfigError::NoConfigHome)?,
                };
                Ok(path.display().to_string())
            }
        }
    }

    /// Resolve the specification, register the stock payload hooks and render.
    fn render(
        &self,
        job: &JobArgs,
        payload: &PayloadArgs,
    ) -> Result<(JobScriptBuilder, String), ScriptError> {
        let config = self.load_config()?;
        let mut builder = JobScriptBuilder::new(self.backend(&config)?);
        let input = payload.input.as_ref().map(|p| self.submit_dir.join(p));
        builder.resolve(&config.job, input.as_deref(), &JobFlags::from(job))?;

        let command = payload
            .command
            .as_deref()
            .ok_or_else(|| ScriptError::not_ready("No command to run given (use --command)"))?;

        // copied relative to the submit directory, as given on the commandline
        let mut copy_in: Vec<String> = payload
            .input
            .as_deref()
            .map(|p| p.strip_prefix(&self.submit_dir).unwrap_or(p))
            .map(|p| p.to_string_lossy().into_owned())
            .into_iter()
            .collect();
        copy_in.extend(payload.copy_in.iter().cloned());
        if !copy_in.is_empty() {
            builder.add_payload_hook(CopyIn::new(copy_in), COPY_IN_PRIORITY);
        }

        let mut run = RunCommand::new(command).with_modules(payload.modules.iter().cloned());
        if let Some(dir) = &payload.path_prefix {
            run = run.with_path_prefix(dir.clone());
        }
        if let (Some(file), Some(marker)) = (&payload.check_output, &payload.success_marker) {
            run = run.with_success_marker(file.clone(), marker.clone());
        }
        builder.add_payload_hook(run, COMMAND_PRIORITY);

        if !payload.copy_out.is_empty() {
            builder.add_payload_hook(
                CopyOut::new(payload.copy_out.iter().cloned(), CopySource::Work),
                COPY_OUT_PRIORITY,
            );
        }
        if !payload.copy_on_error.is_empty() {
            builder.add_error_hook(
                CopyOut::new(payload.copy_on_error.iter().cloned(), CopySource::Work),
                COPY_OUT_PRIORITY,
            );
        }

        let script = builder.build_script()?;
        Ok((builder, script))
    }
}

fn write_script(path: &Path, script: &str) -> Result<(), ScriptError> {
    std::fs::write(path, script).map_err(|e| ScriptError::io(path, e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
            .map_err(|e| ScriptError::io(path, e))?;
    }
    info!(script = %path.display(), "wrote job script");
    Ok(())
}
