//! Commandline flag values for a job.

use crate::job::{JobSpec, NodeRequest};
use tracing::debug;

/// Values given on the commandline. Every flag that is present overwrites
/// what config and input file directives established.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobFlags {
    pub name: Option<String>,
    /// Seconds
    pub walltime: Option<u64>,
    /// Bytes, sets physical and virtual memory
    pub memory: Option<u64>,
    /// Bytes, takes precedence over `memory` for virtual memory
    pub virtual_memory: Option<u64>,
    /// Replaces the node list by one node with this many processors
    pub processors: Option<u32>,
    pub mail: Option<String>,
    pub priority: Option<i32>,
    pub queue: Option<String>,
    pub merge_stdout_stderr: Option<bool>,
    pub send_email_end: Option<bool>,
    pub send_email_begin: Option<bool>,
    pub send_email_error: Option<bool>,
    /// Node working directory, overrides the configured base
    pub workdir: Option<String>,
    /// Node scratch directory, overrides the configured base
    pub scratchdir: Option<String>,
    /// Raw queuing system arguments, merged last
    pub qsys_args: Option<String>,
}

impl JobFlags {
    /// Overwrite the fields of `spec` for which a flag is present.
    ///
    /// Directories and queuing system arguments are not part of the
    /// specification and are handled by the builder.
    pub fn apply_to(&self, spec: &mut JobSpec) {
        if let Some(name) = &self.name {
            spec.job_name = Some(name.clone());
        }
        if let Some(walltime) = self.walltime {
            spec.walltime = Some(walltime);
        }
        if let Some(memory) = self.memory {
            spec.physical_memory = Some(memory);
            spec.virtual_memory = Some(memory);
        }
        if let Some(vmem) = self.virtual_memory {
            spec.virtual_memory = Some(vmem);
        }
        if let Some(processors) = self.processors {
            spec.nodes = vec![NodeRequest::with_processors(processors)];
        }
        if let Some(mail) = &self.mail {
            spec.email = Some(mail.clone());
        }
        if let Some(priority) = self.priority {
            spec.priority = Some(priority);
        }
        if let Some(queue) = &self.queue {
            spec.queue_name = Some(queue.clone());
        }
        if let Some(merge) = self.merge_stdout_stderr {
            spec.merge_stdout_stderr = Some(merge);
        }
        if let Some(end) = self.send_email_end {
            spec.send_email_on.end = Some(end);
        }
        if let Some(begin) = self.send_email_begin {
            spec.send_email_on.begin = Some(begin);
        }
        if let Some(error) = self.send_email_error {
            spec.send_email_on.error = Some(error);
        }
        debug!(?spec, "applied commandline flags");
    }
}
