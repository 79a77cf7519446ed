//! Job Specification Model
//!
//! The canonical description of a batch job's resource and behavioral
//! requirements, filled in layer by layer (config, input-file directives,
//! commandline flags, explicit queuing system overrides).

use crate::error::MergeError;
use crate::merge::{FieldMerger, Mergeable, Schema, Slot};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Schema of a complete job specification.
pub static JOB_SPEC: Schema = Schema::root("JobSpec");

/// Schema of a partial specification translated from queuing system
/// arguments. Extends [`JOB_SPEC`], so fragments merge into full specs but
/// not the other way round.
pub static OVERRIDE_FRAGMENT: Schema = Schema::extending("OverrideFragment", &JOB_SPEC);

static MAIL_EVENTS: Schema = Schema::root("MailEvents");

/// Lower bound of the valid priority range
pub const PRIORITY_MIN: i32 = -1024;
/// Upper bound of the valid priority range
pub const PRIORITY_MAX: i32 = 1023;

/// A request for `count` machines of one kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeRequest {
    pub name: Option<String>,
    pub count: u32,
    pub processors_per_node: u32,
    pub extra_features: Vec<String>,
}

impl Default for NodeRequest {
    fn default() -> Self {
        Self {
            name: None,
            count: 1,
            processors_per_node: 1,
            extra_features: Vec::new(),
        }
    }
}

impl NodeRequest {
    /// One node with `processors` processors
    pub fn with_processors(processors: u32) -> Self {
        Self {
            processors_per_node: processors,
            ..Self::default()
        }
    }

    pub fn add_extra_feature(&mut self, feature: impl Into<String>) {
        self.extra_features.push(feature.into());
    }

    pub fn total_processors(&self) -> u64 {
        u64::from(self.count) * u64::from(self.processors_per_node)
    }
}

/// When to send mail. Each event is unset, on or off.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MailEvents {
    pub begin: Option<bool>,
    pub end: Option<bool>,
    pub error: Option<bool>,
}

impl MailEvents {
    pub fn any_set(&self) -> bool {
        self.begin.is_some() || self.end.is_some() || self.error.is_some()
    }
}

impl Mergeable for MailEvents {
    fn schema(&self) -> &'static Schema {
        &MAIL_EVENTS
    }

    fn merge_fields(&mut self, sender: &Self, merger: &mut FieldMerger) -> Result<(), MergeError> {
        merger.scalar("begin", &mut self.begin, &sender.begin)?;
        merger.scalar("end", &mut self.end, &sender.end)?;
        merger.scalar("error", &mut self.error, &sender.error)
    }
}

/// Insertion-ordered string map of additional queuing system resources.
///
/// Re-inserting an existing key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtraResources {
    entries: Vec<(String, String)>,
}

impl ExtraResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// An empty map counts as unset.
impl Slot for ExtraResources {
    fn is_unset(&self) -> bool {
        self.is_empty()
    }
}

impl Serialize for ExtraResources {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// The resolved description of a batch job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobSpec {
    #[serde(skip)]
    schema: &'static Schema,

    pub job_name: Option<String>,
    pub merge_stdout_stderr: Option<bool>,
    /// Seconds
    pub walltime: Option<u64>,
    /// `queue` or `queue@server`
    pub queue_name: Option<String>,
    /// Bytes of working set memory
    pub physical_memory: Option<u64>,
    /// Bytes of memory including swap
    pub virtual_memory: Option<u64>,
    /// In submission order
    pub nodes: Vec<NodeRequest>,
    pub email: Option<String>,
    pub send_email_on: MailEvents,
    /// Valid range is only enforced by the readiness check
    pub priority: Option<i32>,
    pub extra_resources: ExtraResources,
}

impl Default for JobSpec {
    fn default() -> Self {
        Self::with_schema(&JOB_SPEC)
    }
}

impl JobSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty specification marked as a partial override fragment
    pub fn fragment() -> Self {
        Self::with_schema(&OVERRIDE_FRAGMENT)
    }

    fn with_schema(schema: &'static Schema) -> Self {
        Self {
            schema,
            job_name: None,
            merge_stdout_stderr: None,
            walltime: None,
            queue_name: None,
            physical_memory: None,
            virtual_memory: None,
            nodes: Vec::new(),
            email: None,
            send_email_on: MailEvents::default(),
            priority: None,
            extra_resources: ExtraResources::default(),
        }
    }

    pub fn add_node(&mut self, node: NodeRequest) {
        self.nodes.push(node);
    }

    /// Sum of `count` over all node requests
    pub fn total_nodes(&self) -> u64 {
        self.nodes.iter().map(|n| u64::from(n.count)).sum()
    }

    /// Sum of `count * processors_per_node` over all node requests
    pub fn total_processors(&self) -> u64 {
        self.nodes.iter().map(NodeRequest::total_processors).sum()
    }
}

impl Mergeable for JobSpec {
    fn schema(&self) -> &'static Schema {
        self.schema
    }

    fn merge_fields(&mut self, sender: &Self, merger: &mut FieldMerger) -> Result<(), MergeError> {
        merger.scalar("job_name", &mut self.job_name, &sender.job_name)?;
        merger.scalar(
            "merge_stdout_stderr",
            &mut self.merge_stdout_stderr,
            &sender.merge_stdout_stderr,
        )?;
        merger.scalar("walltime", &mut self.walltime, &sender.walltime)?;
        merger.scalar("queue_name", &mut self.queue_name, &sender.queue_name)?;
        merger.scalar(
            "physical_memory",
            &mut self.physical_memory,
            &sender.physical_memory,
        )?;
        merger.scalar(
            "virtual_memory",
            &mut self.virtual_memory,
            &sender.virtual_memory,
        )?;
        merger.sequence("nodes", &mut self.nodes, &sender.nodes)?;
        merger.scalar("email", &mut self.email, &sender.email)?;
        merger.nested("send_email_on", &mut self.send_email_on, &sender.send_email_on)?;
        merger.scalar("priority", &mut self.priority, &sender.priority)?;
        merger.scalar(
            "extra_resources",
            &mut self.extra_resources,
            &sender.extra_resources,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::{is_mergeable, merge, MergePolicy};

    #[test]
    fn test_new_spec_is_unset() {
        let spec = JobSpec::new();
        assert!(spec.job_name.is_none());
        assert!(spec.walltime.is_none());
        assert!(spec.nodes.is_empty());
        assert!(!spec.send_email_on.any_set());
        assert!(spec.extra_resources.is_empty());
    }

    #[test]
    fn test_totals() {
        let mut spec = JobSpec::new();
        spec.add_node(NodeRequest {
            count: 4,
            processors_per_node: 2,
            ..NodeRequest::default()
        });
        spec.add_node(NodeRequest {
            count: 2,
            processors_per_node: 3,
            ..NodeRequest::default()
        });
        assert_eq!(spec.total_nodes(), 6);
        assert_eq!(spec.total_processors(), 14);
    }

    #[test]
    fn test_extra_resources_keep_insertion_order() {
        let mut extra = ExtraResources::new();
        extra.insert("intel", "");
        extra.insert("gres", "gpu");
        extra.insert("arch", "x86");
        extra.insert("gres", "gpu:2");

        let keys: Vec<&str> = extra.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["intel", "gres", "arch"]);
        assert_eq!(extra.get("gres"), Some("gpu:2"));
    }

    #[test]
    fn test_fragment_merges_into_spec_but_not_back() {
        let mut spec = JobSpec::new();
        let mut fragment = JobSpec::fragment();
        fragment.walltime = Some(60);

        assert!(!is_mergeable(&fragment, &spec, MergePolicy::OVERRIDE));
        merge(&mut spec, &fragment, MergePolicy::OVERRIDE).unwrap();
        assert_eq!(spec.walltime, Some(60));
    }

    #[test]
    fn test_mail_events_merge_field_by_field() {
        let mut spec = JobSpec::new();
        spec.send_email_on.end = Some(true);
        let mut other = JobSpec::new();
        other.send_email_on.begin = Some(true);

        merge(&mut spec, &other, MergePolicy::FILL_GAPS).unwrap();
        assert_eq!(spec.send_email_on.begin, Some(true));
        assert_eq!(spec.send_email_on.end, Some(true));

        other.send_email_on.end = Some(false);
        let err = merge(&mut spec, &other, MergePolicy::FILL_GAPS).unwrap_err();
        assert_eq!(err.field(), Some("send_email_on.end"));
    }

    #[test]
    fn test_serializes_extra_resources_as_map() {
        let mut spec = JobSpec::new();
        spec.extra_resources.insert("intel", "");
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["extra_resources"]["intel"], "");
        assert!(json.get("schema").is_none());
    }
}
