//! Shell variables a queuing system exposes to a running job.

use serde::Serialize;

/// Names of the shell variables through which a queuing system tells a job
/// where and how it runs. Values are variable names (without `$`), except
/// `nodes`, which is a shell expression yielding the node list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvironmentBindings {
    /// Host the job was submitted from
    pub submit_host: &'static str,
    /// Server the job was submitted to
    pub submit_server: &'static str,
    /// Queue the job was submitted to
    pub submit_queue: &'static str,
    /// Working directory of the submission command
    pub submit_workdir: &'static str,
    pub job_id: &'static str,
    pub job_name: &'static str,
    /// Queue the job executes in
    pub queue: &'static str,
    /// Original `PATH` at submission
    pub path: &'static str,
    /// Original `HOME` at submission
    pub home: &'static str,
    /// Source of the node list
    pub nodes: &'static str,
}

impl EnvironmentBindings {
    /// `(script variable, backend expression)` pairs in copy-in order
    pub fn copy_in_order(&self) -> [(&'static str, &'static str); 10] {
        [
            ("SUBMIT_HOST", self.submit_host),
            ("SUBMIT_SERVER", self.submit_server),
            ("SUBMIT_QUEUE", self.submit_queue),
            ("SUBMIT_WORKDIR", self.submit_workdir),
            ("JOBID", self.job_id),
            ("JOBNAME", self.job_name),
            ("QUEUE", self.queue),
            ("O_PATH", self.path),
            ("O_HOME", self.home),
            ("NODES", self.nodes),
        ]
    }
}
