//! Payload hook running a program.

use super::{escape_double_quoted, CalculationEnvironment, Hook};
use crate::job::JobSpec;
use crate::qsys::EnvironmentBindings;

/// Run a command line inside the working directory and record its exit code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunCommand {
    command: String,
    path_prefix: Option<String>,
    modules: Vec<String>,
    success_check: Option<SuccessCheck>,
}

/// Output file which must contain a marker for the run to count as successful
#[derive(Debug, Clone, PartialEq, Eq)]
struct SuccessCheck {
    file: String,
    marker: String,
}

impl RunCommand {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            path_prefix: None,
            modules: Vec::new(),
            success_check: None,
        }
    }

    /// Prepend `dir` to `PATH` before running
    pub fn with_path_prefix(mut self, dir: impl Into<String>) -> Self {
        self.path_prefix = Some(dir.into());
        self
    }

    /// `module load` the given environment modules before running
    pub fn with_modules<I, S>(mut self, modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.modules.extend(modules.into_iter().map(Into::into));
        self
    }

    /// Mark the run as failed unless `file` contains `marker`
    pub fn with_success_marker(mut self, file: impl Into<String>, marker: impl Into<String>) -> Self {
        self.success_check = Some(SuccessCheck {
            file: file.into(),
            marker: marker.into(),
        });
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

fn double_quoted(s: &str) -> String {
    format!("\"{}\"", escape_double_quoted(s))
}

impl Hook for RunCommand {
    fn generate(
        &self,
        _: &JobSpec,
        _: &EnvironmentBindings,
        calc: &CalculationEnvironment,
    ) -> String {
        let mut out = String::new();

        if let Some(dir) = &self.path_prefix {
            out.push_str(&format!("export PATH=\"{}:$PATH\"\n", escape_double_quoted(dir)));
        }
        for module in &self.modules {
            out.push_str(&format!("module load {}\n", module));
        }
        if self.path_prefix.is_some() || !self.modules.is_empty() {
            out.push('\n');
        }

        out.push_str(&self.command);
        out.push('\n');
        out.push_str(&format!("{}=$?\n", calc.return_value));

        if let Some(check) = &self.success_check {
            out.push_str(&format!(
                "\n# check if job terminated successfully\n\
                 if ! grep -qF -- {} {}; then\n\
                 \x20   {}=1\n\
                 fi\n",
                double_quoted(&check.marker),
                double_quoted(&check.file),
                calc.return_value
            ));
        }
        out
    }
}
