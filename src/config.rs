//! Configuration System
//!
//! Persisted defaults for job scripts, layered from built-in defaults, the
//! user's global config file, a config file in the submit directory and
//! `SENDSCRIPT__*` environment variables. The script builder only sees the
//! `[job]` table through [`ConfigSource`].

use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;
pub use merge::merge_policy::builder_with_defaults;
pub use sources::global_file::global_config_path;
pub use sources::workspace_file::{workspace_config_path, WORKSPACE_CONFIG_FILE};

/// Keywords of the `[job]` table with their help text
pub const JOB_KEYWORDS: [(&str, &str); 12] = [
    ("workdir_base", "The base directory in which calculations are done"),
    ("scratchdir_base", "The base directory in which data local to the node is stored"),
    ("mail", "Mail address to send mail to. If empty, no mail is sent."),
    ("jobname", "The default jobname"),
    ("queue", "The default queue to use"),
    ("merge_stdout_stderr", "Merge stdout and stderr streams, valid are \"true\" and \"false\""),
    ("send_email_end", "Send an email if the job ends, valid are \"true\" and \"false\""),
    ("send_email_begin", "Send an email if the job begins, valid are \"true\" and \"false\""),
    ("send_email_error", "Send an email if the job has an error, valid are \"true\" and \"false\""),
    ("memory", "Default physical memory in the format integer[suffix]"),
    ("virtual_memory", "Default virtual memory in the format integer[suffix] (Default: what was set for memory)"),
    ("walltime", "Default walltime in the format integer[suffix] or [[[days:]hours:]minutes:]seconds"),
];

/// Read access to persisted job defaults. Empty values count as unset.
pub trait ConfigSource {
    fn get(&self, key: &str) -> Option<String>;
}

impl ConfigSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).filter(|v| !v.is_empty()).cloned()
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendscriptConfig {
    /// Queuing system to generate scripts for (autodetected if unset)
    #[serde(default)]
    pub queuing_system: Option<String>,

    /// Job defaults
    #[serde(default)]
    pub job: JobDefaults,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// The `[job]` table. All values are literals as typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct JobDefaults {
    pub workdir_base: String,
    pub scratchdir_base: String,
    pub mail: String,
    pub jobname: String,
    pub queue: String,
    pub merge_stdout_stderr: String,
    pub send_email_end: String,
    pub send_email_begin: String,
    pub send_email_error: String,
    pub memory: String,
    pub virtual_memory: String,
    pub walltime: String,
}

impl JobDefaults {
    fn value(&self, key: &str) -> Option<&str> {
        let value = match key {
            "workdir_base" => &self.workdir_base,
            "scratchdir_base" => &self.scratchdir_base,
            "mail" => &self.mail,
            "jobname" => &self.jobname,
            "queue" => &self.queue,
            "merge_stdout_stderr" => &self.merge_stdout_stderr,
            "send_email_end" => &self.send_email_end,
            "send_email_begin" => &self.send_email_begin,
            "send_email_error" => &self.send_email_error,
            "memory" => &self.memory,
            "virtual_memory" => &self.virtual_memory,
            "walltime" => &self.walltime,
            _ => return None,
        };
        Some(value.as_str())
    }
}

impl ConfigSource for JobDefaults {
    fn get(&self, key: &str) -> Option<String> {
        self.value(key)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }
}

/// Commented default config file, as written by `config init`
pub fn default_config_toml(user: Option<&str>) -> String {
    let mut out = String::from(
        "# sendscript configuration\n\
         #\n\
         # Values are strings; an empty string leaves the setting unset.\n\
         \n\
         # Queuing system to generate scripts for (default: autodetect)\n\
         # queuing_system = \"pbs\"\n\
         \n\
         [job]\n",
    );
    for (key, help) in JOB_KEYWORDS {
        let value = match (key, user) {
            ("workdir_base", Some(user)) => format!("/scratch/{}", user),
            ("scratchdir_base", Some(user)) => format!("/lscratch/{}", user),
            ("merge_stdout_stderr" | "send_email_end" | "send_email_error", _) => "true".to_string(),
            _ => String::new(),
        };
        out.push_str(&format!("# {}\n{} = \"{}\"\n\n", help, key, value));
    }
    out.push_str(
        "[logging]\n\
         # trace, debug, info, warn, error, off\n\
         level = \"warn\"\n\
         # text or json\n\
         format = \"text\"\n\
         # stderr, stdout, file or file+stderr\n\
         output = \"stderr\"\n",
    );
    out
}
