//! Job script builder
//!
//! Resolves one [`JobSpec`] from its layers in fixed precedence order and
//! renders the job script:
//!
//! 1. persisted configuration (lowest)
//! 2. input file directives (fill gaps only)
//! 3. commandline flags (overwrite)
//! 4. explicit queuing system arguments (overwrite, fatal on conflict)
//!
//! A builder renders one script per set of registered hooks: building drains
//! both hook pipelines.

use super::flags::JobFlags;
use super::template::{self, ScriptParts};
use crate::config::ConfigSource;
use crate::directive::{DirectiveParser, DirectiveWarning};
use crate::error::{ConfigError, LiteralError, ScriptError};
use crate::hooks::{CalculationEnvironment, Hook, HookPipeline};
use crate::job::{JobSpec, NodeRequest};
use crate::literal::{parse_bool, parse_size, parse_time};
use crate::merge::{merge, MergePolicy};
use crate::qsys::QueuingSystem;
use std::path::Path;
use tracing::{debug, info, warn};

/// Builds job scripts for one queuing system
pub struct JobScriptBuilder {
    qsys: Box<dyn QueuingSystem>,
    spec: JobSpec,
    directive_parser: DirectiveParser,
    workdir_base: Option<String>,
    scratchdir_base: Option<String>,
    force_workdir: Option<String>,
    force_scratchdir: Option<String>,
    payload_hooks: HookPipeline,
    error_hooks: HookPipeline,
}

fn invalid_config(key: &str, value: &str, err: LiteralError, expected: &str) -> ScriptError {
    debug!(key, value, error = %err, "invalid config value");
    ScriptError::Config(ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        expected: expected.to_string(),
    })
}

const BOOL_EXPECTED: &str = "Should be true or false";
const SIZE_EXPECTED: &str = "Should be of the form integer[suffix] like 4gb";
const TIME_EXPECTED: &str =
    "Should be of the form integer[suffix] or [[[days:]hours:]minutes:]seconds";

impl JobScriptBuilder {
    pub fn new(qsys: Box<dyn QueuingSystem>) -> Self {
        Self {
            qsys,
            spec: JobSpec::new(),
            directive_parser: DirectiveParser::default(),
            workdir_base: None,
            scratchdir_base: None,
            force_workdir: None,
            force_scratchdir: None,
            payload_hooks: HookPipeline::new(),
            error_hooks: HookPipeline::new(),
        }
    }

    /// Use `parser` to find input file directives
    pub fn with_directive_parser(mut self, parser: DirectiveParser) -> Self {
        self.directive_parser = parser;
        self
    }

    pub fn qsys(&self) -> &dyn QueuingSystem {
        self.qsys.as_ref()
    }

    pub fn spec(&self) -> &JobSpec {
        &self.spec
    }

    pub fn spec_mut(&mut self) -> &mut JobSpec {
        &mut self.spec
    }

    pub fn directive_parser(&self) -> &DirectiveParser {
        &self.directive_parser
    }

    /// Seed the specification from persisted job defaults.
    ///
    /// Config values sit below everything already in the specification.
    pub fn apply_config(&mut self, source: &dyn ConfigSource) -> Result<(), ScriptError> {
        let mut seeded = JobSpec::new();

        if let Some(base) = source.get("workdir_base") {
            self.workdir_base.get_or_insert(base);
        }
        if let Some(base) = source.get("scratchdir_base") {
            self.scratchdir_base.get_or_insert(base);
        }
        seeded.email = source.get("mail");
        seeded.job_name = source.get("jobname");
        seeded.queue_name = source.get("queue");

        let flag = |key: &str| -> Result<Option<bool>, ScriptError> {
            source
                .get(key)
                .map(|v| parse_bool(&v).map_err(|e| invalid_config(key, &v, e, BOOL_EXPECTED)))
                .transpose()
        };
        seeded.merge_stdout_stderr = flag("merge_stdout_stderr")?;
        seeded.send_email_on.end = flag("send_email_end")?;
        seeded.send_email_on.begin = flag("send_email_begin")?;
        seeded.send_email_on.error = flag("send_email_error")?;

        let size = |key: &str| -> Result<Option<u64>, ScriptError> {
            source
                .get(key)
                .map(|v| parse_size(&v).map_err(|e| invalid_config(key, &v, e, SIZE_EXPECTED)))
                .transpose()
        };
        if let Some(memory) = size("memory")? {
            seeded.physical_memory = Some(memory);
            seeded.virtual_memory = Some(memory);
        }
        if let Some(vmem) = size("virtual_memory")? {
            seeded.virtual_memory = Some(vmem);
        }

        seeded.walltime = source
            .get("walltime")
            .map(|v| parse_time(&v).map_err(|e| invalid_config("walltime", &v, e, TIME_EXPECTED)))
            .transpose()?;

        merge(&mut seeded, &self.spec, MergePolicy::OVERRIDE)?;
        self.spec = seeded;
        debug!(spec = ?self.spec, "applied configuration");
        Ok(())
    }

    /// Fill unset fields from directives found in `lines`.
    pub fn apply_directives<'a, I>(&mut self, lines: I) -> Result<Vec<DirectiveWarning>, ScriptError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.directive_parser.apply_directives(lines, &mut self.spec)
    }

    /// Read `path` and apply its directives.
    pub fn apply_input_file(&mut self, path: &Path) -> Result<Vec<DirectiveWarning>, ScriptError> {
        let text = std::fs::read_to_string(path).map_err(|e| ScriptError::io(path, e))?;
        let warnings = self.apply_directives(text.lines())?;
        debug!(input = %path.display(), warnings = warnings.len(), "scanned input file");
        Ok(warnings)
    }

    /// Apply commandline flags, then merge the explicit queuing system
    /// arguments on top. A conflict there is fatal.
    pub fn apply_flags(&mut self, flags: &JobFlags) -> Result<(), ScriptError> {
        flags.apply_to(&mut self.spec);

        if let Some(dir) = &flags.workdir {
            self.force_workdir = Some(dir.clone());
        }
        if let Some(dir) = &flags.scratchdir {
            self.force_scratchdir = Some(dir.clone());
        }

        if let Some(args) = &flags.qsys_args {
            self.apply_override_args(args)?;
        }
        Ok(())
    }

    /// Translate `args` with the backend and merge the result with updates allowed.
    pub fn apply_override_args(&mut self, args: &str) -> Result<(), ScriptError> {
        let fragment = self.qsys.translate_override_args(args)?;
        merge(&mut self.spec, &fragment, MergePolicy::OVERRIDE)
            .map_err(ScriptError::OverrideConflict)?;
        debug!(args, "merged explicit queuing system arguments");
        Ok(())
    }

    /// Name the job after `input` (without `.in`/`.inp`) unless a name is set.
    pub fn default_job_name(&mut self, input: &Path) {
        if self.spec.job_name.is_some() {
            return;
        }
        let Some(file_name) = input.file_name().and_then(|n| n.to_str()) else {
            return;
        };
        let name = [".inp", ".in"]
            .iter()
            .find_map(|ext| file_name.strip_suffix(ext).filter(|stem| !stem.is_empty()))
            .unwrap_or(file_name);
        self.spec.job_name = Some(name.to_string());
    }

    /// Run all layers in precedence order.
    pub fn resolve(
        &mut self,
        config: &dyn ConfigSource,
        input: Option<&Path>,
        flags: &JobFlags,
    ) -> Result<Vec<DirectiveWarning>, ScriptError> {
        self.apply_config(config)?;
        let warnings = match input {
            Some(path) => self.apply_input_file(path)?,
            None => Vec::new(),
        };
        self.apply_flags(flags)?;
        if let Some(path) = input {
            self.default_job_name(path);
        }
        Ok(warnings)
    }

    /// Add a single node, single processor request if no node is requested.
    pub fn ensure_nodes(&mut self) {
        if self.spec.nodes.is_empty() {
            warn!("No node request found, requesting a single node with a single processor");
            self.spec.add_node(NodeRequest::default());
        }
    }

    pub fn set_workdir_base(&mut self, base: impl Into<String>) {
        self.workdir_base = Some(base.into());
    }

    pub fn set_scratchdir_base(&mut self, base: impl Into<String>) {
        self.scratchdir_base = Some(base.into());
    }

    /// Enqueue a payload hook for the next build; lower priorities run earlier.
    pub fn add_payload_hook(&mut self, hook: impl Hook + 'static, priority: i32) {
        self.payload_hooks.add(hook, priority);
    }

    /// Enqueue a hook run when the job is terminated early.
    pub fn add_error_hook(&mut self, hook: impl Hook + 'static, priority: i32) {
        self.error_hooks.add(hook, priority);
    }

    pub fn clear_hooks(&mut self) {
        self.payload_hooks.clear();
        self.error_hooks.clear();
    }

    fn resolve_dir(
        &self,
        forced: &Option<String>,
        base: &Option<String>,
        what: &str,
        config_key: &str,
    ) -> Result<String, ScriptError> {
        if let Some(dir) = forced {
            return Ok(dir.clone());
        }
        match (base, &self.spec.job_name) {
            (Some(base), Some(name)) => Ok(format!(
                "{}/{}_${{{}}}",
                base.trim_end_matches('/'),
                name,
                self.qsys.environment_bindings().job_id
            )),
            _ => Err(ScriptError::not_ready(format!(
                "{} not set. Either specify it on the commandline or add a {} in the config file and a job name on the command line.",
                what, config_key
            ))),
        }
    }

    /// Render the job script. Drains both hook pipelines.
    pub fn build_script(&mut self) -> Result<String, ScriptError> {
        self.ensure_nodes();
        self.qsys
            .readiness(&self.spec)
            .map_err(ScriptError::NotReady)?;

        let workdir = self.resolve_dir(&self.force_workdir, &self.workdir_base, "work_dir", "workdir_base")?;
        let scratchdir = self.resolve_dir(
            &self.force_scratchdir,
            &self.scratchdir_base,
            "scratch_dir",
            "scratchdir_base",
        )?;

        if self.spec.walltime.is_none() {
            warn!("Walltime not set. Queuing systems default will be used.");
        }
        if self.spec.physical_memory.is_none() {
            warn!("Physical memory not set. Queuing systems default will be used.");
        }
        if self.spec.virtual_memory.is_none() {
            warn!("Virtual memory not set. Queuing systems default will be used.");
        }

        let header = self.qsys.render_header(&self.spec)?;
        let bindings = self.qsys.environment_bindings();
        let calc = CalculationEnvironment::default();
        let payload = self.payload_hooks.drain_and_render(&self.spec, &bindings, &calc);
        let error = self.error_hooks.drain_and_render(&self.spec, &bindings, &calc);

        let script = template::render(&ScriptParts {
            header: &header,
            bindings: &bindings,
            calc: &calc,
            workdir: &workdir,
            scratchdir: &scratchdir,
            payload: &payload,
            error: &error,
        });
        info!(
            qsys = self.qsys.name(),
            job_name = self.spec.job_name.as_deref().unwrap_or(""),
            bytes = script.len(),
            "built job script"
        );
        Ok(script)
    }
}
