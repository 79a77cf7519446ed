//! PBS / Torque backend
//!
//! Reference: `pbs_resources(7)` and `qsub(1)`.

use super::{EnvironmentBindings, QueuingSystem};
use crate::error::{LiteralError, LiteralKind, ScriptError};
use crate::job::{JobSpec, NodeRequest, PRIORITY_MAX, PRIORITY_MIN};
use crate::literal::{parse_size_with_words, parse_time};
use std::fmt::Write as _;
use tracing::debug;

/// Resources which are typed fields of [`JobSpec`] and thus need a value
const TYPED_RESOURCES: [&str; 4] = ["walltime", "mem", "vmem", "nodes"];

/// The PBS queuing system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pbs {
    word_bytes: u64,
}

impl Default for Pbs {
    fn default() -> Self {
        Self {
            word_bytes: std::mem::size_of::<usize>() as u64,
        }
    }
}

impl Pbs {
    /// PBS with the native word size for `w`-suffixed sizes
    pub fn new() -> Self {
        Self::default()
    }

    /// PBS with an explicit number of bytes per word
    pub fn with_word_size(word_bytes: u64) -> Self {
        Self { word_bytes }
    }

    pub fn word_bytes(&self) -> u64 {
        self.word_bytes
    }

    /// Interpret a PBS size (`integer[b|w|kb|kw|mb|mw|gb|gw|...]`) as bytes.
    pub fn parse_size(&self, raw: &str) -> Result<u64, LiteralError> {
        parse_size_with_words(raw, self.word_bytes)
    }

    fn apply_resource(&self, resource: &str, spec: &mut JobSpec) -> Result<(), ScriptError> {
        let (key, value) = match resource.split_once('=') {
            Some((key, value)) => (key, value),
            None => (resource, ""),
        };
        if key.is_empty() {
            return Err(ScriptError::InvalidOverride(format!(
                "empty resource name in \"-l {}\"",
                resource
            )));
        }

        if TYPED_RESOURCES.contains(&key) && value.is_empty() {
            return Err(ScriptError::InvalidOverride(
                "The PBS resources walltime, mem, vmem, nodes need an argument following them after an '='."
                    .to_string(),
            ));
        }

        let malformed = |source| ScriptError::malformed(format!("resource {}", key), value, source);
        match key {
            "walltime" => spec.walltime = Some(parse_walltime(value).map_err(malformed)?),
            "mem" => spec.physical_memory = Some(self.parse_size(value).map_err(malformed)?),
            "vmem" => spec.virtual_memory = Some(self.parse_size(value).map_err(malformed)?),
            "nodes" => spec.nodes = parse_nodes(value).map_err(malformed)?,
            _ => spec.extra_resources.insert(key, value),
        }
        Ok(())
    }
}

/// Interpret a walltime as seconds. Accepts the general time grammar
/// (`[[[days:]hours:]minutes:]seconds` or an integer with one of the
/// suffixes `s,m,h,d,w,y`) and the PBS form `[[hours:]minutes:]seconds` with
/// an optional `.milliseconds` tail, which is ignored.
pub fn parse_walltime(raw: &str) -> Result<u64, LiteralError> {
    let s = raw.trim();
    let time = match s.rsplit_once('.') {
        Some((head, millis)) if !millis.is_empty() && millis.bytes().all(|b| b.is_ascii_digit()) => {
            head
        }
        _ => s,
    };
    parse_time(time).map_err(|e| LiteralError::new(LiteralKind::Time, raw, e.reason))
}

fn parse_positive(raw: &str, what: &str) -> Result<u32, LiteralError> {
    match raw.parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(LiteralError::new(
            LiteralKind::Integer,
            raw,
            format!("{} must be a positive integer", what),
        )),
    }
}

/// Parse a node specification `count[:name][:ppn=N][:feature...]+...`.
///
/// A leading token that is not a number is taken as the node name with a
/// count of one.
pub fn parse_nodes(raw: &str) -> Result<Vec<NodeRequest>, LiteralError> {
    raw.split('+').map(|part| parse_node(raw, part)).collect()
}

fn parse_node(raw: &str, part: &str) -> Result<NodeRequest, LiteralError> {
    let mut node = NodeRequest::default();
    let mut tokens = part.split(':').peekable();

    match tokens.next() {
        Some(first) if !first.is_empty() && first.bytes().all(|b| b.is_ascii_digit()) => {
            node.count = parse_positive(first, "node count")?;
            if let Some(name) = tokens.next_if(|t| !t.is_empty() && !t.starts_with("ppn=")) {
                node.name = Some(name.to_string());
            }
        }
        Some(first) if !first.is_empty() && !first.starts_with("ppn=") => {
            node.name = Some(first.to_string());
        }
        _ => {
            return Err(LiteralError::new(
                LiteralKind::Integer,
                raw,
                format!("node request \"{}\" lacks a count or name", part),
            ))
        }
    }

    for token in tokens {
        if let Some(ppn) = token.strip_prefix("ppn=") {
            node.processors_per_node = parse_positive(ppn, "ppn")?;
        } else if token.is_empty() {
            return Err(LiteralError::new(
                LiteralKind::Integer,
                raw,
                format!("empty feature in node request \"{}\"", part),
            ));
        } else {
            node.add_extra_feature(token);
        }
    }
    Ok(node)
}

fn render_node(node: &NodeRequest) -> String {
    let mut out = node.count.to_string();
    if let Some(name) = &node.name {
        out.push(':');
        out.push_str(name);
    }
    let _ = write!(out, ":ppn={}", node.processors_per_node);
    for feature in &node.extra_features {
        out.push(':');
        out.push_str(feature);
    }
    out
}

impl QueuingSystem for Pbs {
    fn name(&self) -> &'static str {
        "PBS"
    }

    fn translate_override_args(&self, raw: &str) -> Result<JobSpec, ScriptError> {
        let mut fragment = JobSpec::fragment();
        let mut tokens = raw.split_whitespace();

        while let Some(token) = tokens.next() {
            let resources = match token {
                "-l" => tokens.next().ok_or_else(|| {
                    ScriptError::InvalidOverride("-l needs a resource list".to_string())
                })?,
                t if t.starts_with("-l") => &t[2..],
                other => {
                    return Err(ScriptError::InvalidOverride(format!(
                        "parsing \"{}\" is not supported, only -l resource lists are",
                        other
                    )))
                }
            };

            for resource in resources.split(',').filter(|r| !r.is_empty()) {
                self.apply_resource(resource, &mut fragment)?;
            }
        }

        debug!(args = raw, "translated queuing system arguments");
        Ok(fragment)
    }

    fn render_header(&self, spec: &JobSpec) -> Result<String, ScriptError> {
        self.readiness(spec).map_err(ScriptError::NotReady)?;

        let mut header = String::new();
        if let Some(name) = &spec.job_name {
            header.push_str(&format!("#PBS -N {}\n", name));
        }
        if spec.merge_stdout_stderr == Some(true) {
            header.push_str("#PBS -j oe\n");
        }
        if let Some(walltime) = spec.walltime {
            header.push_str(&format!("#PBS -l walltime={}\n", walltime));
        }
        if let Some(queue) = &spec.queue_name {
            header.push_str(&format!("#PBS -q {}\n", queue));
        }
        if let Some(mem) = spec.physical_memory {
            header.push_str(&format!("#PBS -l mem={}b\n", mem));
        }
        if let Some(vmem) = spec.virtual_memory {
            header.push_str(&format!("#PBS -l vmem={}b\n", vmem));
        }
        for (key, value) in spec.extra_resources.iter() {
            if value.is_empty() {
                header.push_str(&format!("#PBS -l {}\n", key));
            } else {
                header.push_str(&format!("#PBS -l {}={}\n", key, value));
            }
        }

        match &spec.email {
            Some(email) => {
                header.push_str(&format!("#PBS -M {}\n", email));
                let events = &spec.send_email_on;
                if events.any_set() {
                    let mut flags = String::new();
                    if events.error == Some(true) {
                        flags.push('a');
                    }
                    if events.begin == Some(true) {
                        flags.push('b');
                    }
                    if events.end == Some(true) {
                        flags.push('e');
                    }
                    if flags.is_empty() {
                        flags.push('n');
                    }
                    header.push_str(&format!("#PBS -m {}\n", flags));
                }
            }
            None => header.push_str("#PBS -m n\n"),
        }

        if let Some(priority) = spec.priority {
            header.push_str(&format!("#PBS -p {}\n", priority));
        }

        let nodes: Vec<String> = spec.nodes.iter().map(render_node).collect();
        header.push_str("#PBS -l nodes=");
        header.push_str(&nodes.join("+"));
        Ok(header)
    }

    fn submit_command(&self) -> &'static str {
        "qsub"
    }

    fn abort_command(&self) -> &'static str {
        "qdel"
    }

    fn readiness(&self, spec: &JobSpec) -> Result<(), String> {
        if spec.total_nodes() == 0 {
            return Err("No nodes found in nodes list".to_string());
        }
        if let Some(priority) = spec.priority {
            if !(PRIORITY_MIN..=PRIORITY_MAX).contains(&priority) {
                return Err(format!(
                    "priority {} has the wrong range (expected between {} and {})",
                    priority, PRIORITY_MIN, PRIORITY_MAX
                ));
            }
        }
        Ok(())
    }

    fn environment_bindings(&self) -> EnvironmentBindings {
        EnvironmentBindings {
            submit_host: "PBS_O_HOST",
            submit_server: "PBS_SERVER",
            submit_queue: "PBS_O_QUEUE",
            submit_workdir: "PBS_O_WORKDIR",
            job_id: "PBS_JOBID",
            job_name: "PBS_JOBNAME",
            queue: "PBS_QUEUE",
            path: "PBS_O_PATH",
            home: "PBS_O_HOME",
            nodes: "(< $PBS_NODEFILE)",
        }
    }
}
