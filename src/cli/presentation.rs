//! CLI presentation: text and json formatters for resolved job specifications.

use crate::directive::DirectiveWarning;
use crate::error::ScriptError;
use crate::job::{JobSpec, NodeRequest};
use serde_json::json;

fn or_unset<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "(unset)".to_string())
}

fn format_node(node: &NodeRequest) -> String {
    let mut s = format!(
        "{} x {} processor{}",
        node.count,
        node.processors_per_node,
        if node.processors_per_node == 1 { "" } else { "s" }
    );
    if let Some(name) = &node.name {
        s.push_str(&format!(" on {}", name));
    }
    if !node.extra_features.is_empty() {
        s.push_str(&format!(" [{}]", node.extra_features.join(", ")));
    }
    s
}

fn format_mail_events(spec: &JobSpec) -> String {
    let events = &spec.send_email_on;
    let set: Vec<&str> = [
        ("begin", events.begin),
        ("end", events.end),
        ("error", events.error),
    ]
    .into_iter()
    .filter(|(_, on)| *on == Some(true))
    .map(|(name, _)| name)
    .collect();
    if set.is_empty() {
        "none".to_string()
    } else {
        set.join(", ")
    }
}

pub fn format_spec_text(spec: &JobSpec, warnings: &[DirectiveWarning]) -> String {
    let mut s = String::from("Job specification:");
    s.push_str(&format!("\n  Name: {}", or_unset(spec.job_name.as_deref())));
    s.push_str(&format!("\n  Queue: {}", or_unset(spec.queue_name.as_deref())));
    s.push_str(&format!(
        "\n  Walltime: {}",
        or_unset(spec.walltime.map(|w| format!("{} s", w)))
    ));
    s.push_str(&format!(
        "\n  Physical memory: {}",
        or_unset(spec.physical_memory.map(|m| format!("{} bytes", m)))
    ));
    s.push_str(&format!(
        "\n  Virtual memory: {}",
        or_unset(spec.virtual_memory.map(|m| format!("{} bytes", m)))
    ));
    s.push_str(&format!(
        "\n  Nodes: {} ({} processors)",
        spec.total_nodes(),
        spec.total_processors()
    ));
    for node in &spec.nodes {
        s.push_str(&format!("\n    - {}", format_node(node)));
    }
    s.push_str(&format!("\n  Mail: {}", or_unset(spec.email.as_deref())));
    s.push_str(&format!("\n  Mail on: {}", format_mail_events(spec)));
    s.push_str(&format!(
        "\n  Merge stdout/stderr: {}",
        or_unset(spec.merge_stdout_stderr)
    ));
    s.push_str(&format!("\n  Priority: {}", or_unset(spec.priority)));
    if !spec.extra_resources.is_empty() {
        s.push_str("\n  Extra resources:");
        for (key, value) in spec.extra_resources.iter() {
            if value.is_empty() {
                s.push_str(&format!("\n    {}", key));
            } else {
                s.push_str(&format!("\n    {}={}", key, value));
            }
        }
    }
    if !warnings.is_empty() {
        s.push_str(&format!("\n\nDirective warnings ({}):", warnings.len()));
        for w in warnings {
            s.push_str(&format!("\n  - {}", w));
        }
    }
    s
}

pub fn format_spec_json(spec: &JobSpec, warnings: &[DirectiveWarning]) -> Result<String, ScriptError> {
    let out = json!({
        "spec": spec,
        "total_nodes": spec.total_nodes(),
        "total_processors": spec.total_processors(),
        "warnings": warnings.iter().map(|w| w.to_string()).collect::<Vec<_>>(),
    });
    Ok(serde_json::to_string_pretty(&out)?)
}
