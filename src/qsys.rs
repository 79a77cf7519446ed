//! Queuing System Backends
//!
//! Pluggable translation between a [`JobSpec`] and a concrete queuing
//! system: directive header, environment variable names, override argument
//! parsing, readiness rules and the submit/abort commands.

use crate::error::ScriptError;
use crate::job::JobSpec;
use std::path::Path;
use std::process::Command;
use tracing::{debug, info};

pub mod detect;
pub mod environment;
pub mod pbs;

pub use detect::guess_queuing_system;
pub use environment::EnvironmentBindings;
pub use pbs::Pbs;

/// Contract implemented once per queuing system
pub trait QueuingSystem {
    /// Human-readable name of the queuing system
    fn name(&self) -> &'static str;

    /// Translate a raw argument string (as it would be handed to the submit
    /// command) into a partial specification.
    fn translate_override_args(&self, raw: &str) -> Result<JobSpec, ScriptError>;

    /// Directive header for a script, without shebang. Fails if the
    /// specification is not ready for submission.
    fn render_header(&self, spec: &JobSpec) -> Result<String, ScriptError>;

    /// Command that submits a job script
    fn submit_command(&self) -> &'static str;

    /// Command that aborts a submitted job
    fn abort_command(&self) -> &'static str;

    /// `Err(reason)` if the specification lacks something required for submission
    fn readiness(&self, spec: &JobSpec) -> Result<(), String>;

    fn is_ready(&self, spec: &JobSpec) -> bool {
        self.readiness(spec).is_ok()
    }

    /// Shell variables this queuing system provides inside a running job
    fn environment_bindings(&self) -> EnvironmentBindings;

    /// Submit `script` from `submit_dir` and return the submit command's
    /// standard output (usually the job id). Failures are reported verbatim.
    ///
    /// The command runs with `submit_dir` as working directory, which the
    /// queuing system records as the job's submit directory.
    fn submit(&self, script: &Path, submit_dir: &Path) -> Result<String, ScriptError> {
        let command = self.submit_command();
        debug!(
            command,
            script = %script.display(),
            submit_dir = %submit_dir.display(),
            "submitting job script"
        );

        let output = Command::new(command)
            .arg(script)
            .current_dir(submit_dir)
            .output()
            .map_err(|e| ScriptError::Submit {
                command: command.to_string(),
                status: "not started".to_string(),
                stderr: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(ScriptError::Submit {
                command: command.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
            });
        }

        let job_id = String::from_utf8_lossy(&output.stdout).trim().to_string();
        info!(command, job_id = %job_id, "job submitted");
        Ok(job_id)
    }
}

/// Select a backend by name (case-insensitive).
pub fn backend_by_name(name: &str) -> Result<Box<dyn QueuingSystem>, ScriptError> {
    match name.trim().to_ascii_lowercase().as_str() {
        "pbs" | "torque" => Ok(Box::new(Pbs::new())),
        _ => Err(ScriptError::UnknownQueuingSystem(name.to_string())),
    }
}
