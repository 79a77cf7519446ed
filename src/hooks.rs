//! Hook Pipeline
//!
//! Hooks generate the shell code of a job script's payload and error
//! sections. Each pipeline is an ordered collection drained once per build:
//! fragments are rendered by ascending priority, equal priorities in
//! insertion order.

use crate::job::JobSpec;
use crate::qsys::EnvironmentBindings;
use std::fmt;
use tracing::debug;

pub mod command;
pub mod copy;

pub use command::RunCommand;
pub use copy::{CopyFromTo, CopyIn, CopyOut, CopySource};

/// Shell variables the job script itself defines for hooks to use
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalculationEnvironment {
    /// Directory in which the calculation runs on the node
    pub node_work_dir: &'static str,
    /// Node-local scratch directory
    pub node_scratch_dir: &'static str,
    /// Variable receiving the payload's return value, which becomes the script's exit code
    pub return_value: &'static str,
}

impl Default for CalculationEnvironment {
    fn default() -> Self {
        Self {
            node_work_dir: "NODE_WORKDIR",
            node_scratch_dir: "NODE_SCRATCHDIR",
            return_value: "RETURN_VALUE",
        }
    }
}

/// Escape `s` for use inside a double-quoted shell word
pub(crate) fn escape_double_quoted(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '"' | '\\' | '$' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Generator of a shell code fragment
pub trait Hook {
    fn generate(
        &self,
        spec: &JobSpec,
        bindings: &EnvironmentBindings,
        calc: &CalculationEnvironment,
    ) -> String;
}

impl<F> Hook for F
where
    F: Fn(&JobSpec, &EnvironmentBindings, &CalculationEnvironment) -> String,
{
    fn generate(
        &self,
        spec: &JobSpec,
        bindings: &EnvironmentBindings,
        calc: &CalculationEnvironment,
    ) -> String {
        self(spec, bindings, calc)
    }
}

/// Priority-ordered hooks awaiting the next build
#[derive(Default)]
pub struct HookPipeline {
    hooks: Vec<(i32, Box<dyn Hook>)>,
}

impl fmt::Debug for HookPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let priorities: Vec<i32> = self.hooks.iter().map(|(p, _)| *p).collect();
        f.debug_struct("HookPipeline")
            .field("priorities", &priorities)
            .finish()
    }
}

impl HookPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue `hook`; lower priorities render earlier.
    pub fn add(&mut self, hook: impl Hook + 'static, priority: i32) {
        self.add_boxed(Box::new(hook), priority);
    }

    pub fn add_boxed(&mut self, hook: Box<dyn Hook>, priority: i32) {
        self.hooks.push((priority, hook));
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub fn clear(&mut self) {
        self.hooks.clear();
    }

    /// Render every queued hook, each fragment followed by a newline, and
    /// leave the pipeline empty.
    pub fn drain_and_render(
        &mut self,
        spec: &JobSpec,
        bindings: &EnvironmentBindings,
        calc: &CalculationEnvironment,
    ) -> String {
        let mut hooks = std::mem::take(&mut self.hooks);
        hooks.sort_by_key(|(priority, _)| *priority);
        debug!(count = hooks.len(), "rendering hooks");

        let mut out = String::new();
        for (_, hook) in hooks {
            out.push_str(&hook.generate(spec, bindings, calc));
            out.push('\n');
        }
        out
    }
}
