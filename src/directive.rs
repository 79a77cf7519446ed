//! Input-file directives
//!
//! Programs' input files may carry inline annotations such as
//!
//! ```text
//! ! some program input   #QSYS wt=2h np=4 mem=8gb
//! ```
//!
//! Everything before `<comment marker><keyword>` is ignored, the remainder is
//! read as `key=value` pairs. Directives only fill fields that are still
//! unset: whatever an earlier layer (config, commandline) already decided wins.

use crate::error::{LiteralError, LiteralKind, ScriptError};
use crate::job::{JobSpec, NodeRequest};
use crate::literal::{parse_size, parse_time};
use std::fmt;
use tracing::{debug, warn};

/// The closed set of recognized directive keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    Walltime,
    Processors,
    PhysicalMemory,
    VirtualMemory,
}

impl Directive {
    pub const ALL: [Directive; 4] = [
        Directive::Walltime,
        Directive::Processors,
        Directive::PhysicalMemory,
        Directive::VirtualMemory,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Directive::Walltime => "wt",
            Directive::Processors => "np",
            Directive::PhysicalMemory => "mem",
            Directive::VirtualMemory => "vmem",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Directive::Walltime => "job walltime",
            Directive::Processors => "number of processors",
            Directive::PhysicalMemory => "physical memory",
            Directive::VirtualMemory => "virtual memory",
        }
    }

    pub fn from_key(key: &str) -> Option<Directive> {
        Directive::ALL.into_iter().find(|d| d.key() == key)
    }

    fn is_set(self, spec: &JobSpec) -> bool {
        match self {
            Directive::Walltime => spec.walltime.is_some(),
            Directive::Processors => !spec.nodes.is_empty(),
            Directive::PhysicalMemory => spec.physical_memory.is_some(),
            Directive::VirtualMemory => spec.virtual_memory.is_some(),
        }
    }

    fn assign(self, spec: &mut JobSpec, value: &str) -> Result<(), LiteralError> {
        match self {
            Directive::Walltime => spec.walltime = Some(parse_time(value)?),
            Directive::PhysicalMemory => spec.physical_memory = Some(parse_size(value)?),
            Directive::VirtualMemory => spec.virtual_memory = Some(parse_size(value)?),
            Directive::Processors => {
                let processors: u32 = value.trim().parse().map_err(|_| {
                    LiteralError::new(LiteralKind::Integer, value, "expected a positive integer")
                })?;
                if processors == 0 {
                    return Err(LiteralError::new(
                        LiteralKind::Integer,
                        value,
                        "expected a positive integer",
                    ));
                }
                spec.add_node(NodeRequest::with_processors(processors));
            }
        }
        Ok(())
    }
}

/// Non-fatal findings while applying directives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectiveWarning {
    /// The key is not one of the recognized directives
    Unrecognized { key: String, value: String },
    /// The field was already set by an earlier layer
    AlreadySet {
        directive: Directive,
        value: String,
        keyword: String,
    },
}

impl fmt::Display for DirectiveWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectiveWarning::Unrecognized { key, value } => {
                write!(f, "Ignoring unknown directive {} (== {}).", key, value)
            }
            DirectiveWarning::AlreadySet {
                directive,
                value,
                keyword,
            } => write!(
                f,
                "Ignoring {} (== {}) specified in input file via \"{} {}=\", \
                 since already provided (probably via the commandline or config).",
                directive.description(),
                value,
                keyword,
                directive.key()
            ),
        }
    }
}

/// Finds directive lines and applies them to a [`JobSpec`]
#[derive(Debug, Clone)]
pub struct DirectiveParser {
    comment_markers: Vec<String>,
    keywords: Vec<String>,
}

impl Default for DirectiveParser {
    fn default() -> Self {
        Self {
            comment_markers: vec!["#".to_string()],
            keywords: vec!["QSYS".to_string()],
        }
    }
}

impl DirectiveParser {
    pub fn new<M, K>(comment_markers: M, keywords: K) -> Self
    where
        M: IntoIterator,
        M::Item: Into<String>,
        K: IntoIterator,
        K::Item: Into<String>,
    {
        Self {
            comment_markers: comment_markers.into_iter().map(Into::into).collect(),
            keywords: keywords.into_iter().map(Into::into).collect(),
        }
    }

    /// `#QSYS`, `# QSYS`, ... in marker-major order
    fn start_strings(&self) -> Vec<String> {
        let mut starts = Vec::new();
        for marker in &self.comment_markers {
            for keyword in &self.keywords {
                starts.push(format!("{}{}", marker, keyword));
                starts.push(format!("{} {}", marker, keyword));
            }
        }
        starts
    }

    /// Locate the directive payload in `line`, returning it with the start string that matched.
    fn find_payload<'l>(&self, line: &'l str) -> Option<(String, &'l str)> {
        self.start_strings().into_iter().find_map(|start| {
            line.find(&start)
                .map(|pos| (start.clone(), &line[pos + start.len()..]))
        })
    }

    /// Apply all directives found in `lines`.
    ///
    /// Returns the warnings for ignored directives; a malformed value for a
    /// recognized, still unset key is fatal.
    pub fn apply_directives<'a, I>(
        &self,
        lines: I,
        spec: &mut JobSpec,
    ) -> Result<Vec<DirectiveWarning>, ScriptError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut warnings = Vec::new();
        for line in lines {
            self.apply_line(line, spec, &mut warnings)?;
        }
        Ok(warnings)
    }

    /// Apply the directives of a single line.
    pub fn apply_line(
        &self,
        line: &str,
        spec: &mut JobSpec,
        warnings: &mut Vec<DirectiveWarning>,
    ) -> Result<(), ScriptError> {
        let Some((start, payload)) = self.find_payload(line) else {
            return Ok(());
        };
        let keyword = start.trim_start_matches(|c: char| !c.is_alphanumeric()).to_string();

        for (key, value) in key_value_pairs(payload) {
            let Some(directive) = Directive::from_key(&key) else {
                warn!(key = %key, value = %value, "ignoring unknown directive");
                warnings.push(DirectiveWarning::Unrecognized { key, value });
                continue;
            };

            if directive.is_set(spec) {
                let warning = DirectiveWarning::AlreadySet {
                    directive,
                    value,
                    keyword: keyword.clone(),
                };
                warn!("{}", warning);
                warnings.push(warning);
                continue;
            }

            directive
                .assign(spec, &value)
                .map_err(|source| ScriptError::malformed(format!("directive {}", key), &value, source))?;
            debug!(key = %key, value = %value, "applied directive");
        }
        Ok(())
    }
}

/// Split `a = 1 b=2 c` into `[(a, 1), (b, 2)]`.
///
/// Whitespace around `=` is dropped; tokens without exactly one `=` are skipped.
fn key_value_pairs(payload: &str) -> Vec<(String, String)> {
    let mut normalized = String::with_capacity(payload.len());
    let mut chars = payload.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '=' {
            let trimmed = normalized.trim_end().len();
            normalized.truncate(trimmed);
            normalized.push('=');
            while chars.peek().is_some_and(|c| c.is_whitespace()) {
                chars.next();
            }
        } else {
            normalized.push(c);
        }
    }

    normalized
        .split_whitespace()
        .filter_map(|token| {
            let mut parts = token.split('=');
            match (parts.next(), parts.next(), parts.next()) {
                (Some(k), Some(v), None) if !k.is_empty() => Some((k.to_string(), v.to_string())),
                _ => None,
            }
        })
        .collect()
}

/// Help table listing every directive for every marker/keyword combination.
pub fn describe_directives(parser: &DirectiveParser, indent: &str) -> String {
    let key_width = Directive::ALL.iter().map(|d| d.key().len()).max().unwrap_or(0);

    let mut out = String::new();
    for directive in Directive::ALL {
        for marker in &parser.comment_markers {
            for keyword in &parser.keywords {
                out.push_str(&format!(
                    "{}{:<6} {:<width$} = <value>     {}\n",
                    indent,
                    format!("{}{}", marker, keyword),
                    directive.key(),
                    directive.description(),
                    width = key_width
                ));
            }
        }
    }
    out
}
