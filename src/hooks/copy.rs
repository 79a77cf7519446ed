//! Hooks copying files between the submit directory and the node directories.
//!
//! Relative paths are kept: `sub/file` is copied from `FROM/sub/file` to
//! `TO/sub/file`, creating `TO/sub` if needed. Directories are copied
//! recursively and links are dereferenced. Missing files are skipped.

use super::{escape_double_quoted, CalculationEnvironment, Hook};
use crate::job::JobSpec;
use crate::qsys::EnvironmentBindings;

/// Copy `files` from the directory in shell variable `from` to the one in `to`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyFromTo {
    from: String,
    to: String,
    files: Vec<String>,
}

impl CopyFromTo {
    pub fn new<I, S>(from: impl Into<String>, to: impl Into<String>, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            from: from.into(),
            to: to.into(),
            files: files.into_iter().map(Into::into).collect(),
        }
    }

    fn render(&self) -> String {
        self.files
            .iter()
            .map(|file| copy_file(&self.from, &self.to, file))
            .collect()
    }
}

fn copy_file(from: &str, to: &str, file: &str) -> String {
    let file = escape_double_quoted(file);
    format!(
        "if [ -r \"${from}/{file}\" ]; then\n\
         \x20   CPARGS=\"--dereference\"\n\
         \x20   [ -d \"${from}/{file}\" ] && CPARGS=\"--recursive\"\n\
         \x20   DIR=$(dirname \"{file}\")\n\
         \x20   mkdir -p \"${to}/$DIR\"\n\
         \x20   cp $CPARGS \"${from}/{file}\" \"${to}/$DIR\"\n\
         fi\n"
    )
}

impl Hook for CopyFromTo {
    fn generate(&self, _: &JobSpec, _: &EnvironmentBindings, _: &CalculationEnvironment) -> String {
        self.render()
    }
}

/// Copy files from the submit directory into the node's working directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyIn {
    files: Vec<String>,
}

impl CopyIn {
    pub fn new<I, S>(files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            files: files.into_iter().map(Into::into).collect(),
        }
    }
}

impl Hook for CopyIn {
    fn generate(
        &self,
        _: &JobSpec,
        bindings: &EnvironmentBindings,
        calc: &CalculationEnvironment,
    ) -> String {
        CopyFromTo::new(bindings.submit_workdir, calc.node_work_dir, self.files.clone()).render()
    }
}

/// Node directory [`CopyOut`] copies from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CopySource {
    #[default]
    Work,
    Scratch,
}

/// Copy files from a node directory back into the submit directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyOut {
    files: Vec<String>,
    source: CopySource,
}

impl CopyOut {
    pub fn new<I, S>(files: I, source: CopySource) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            files: files.into_iter().map(Into::into).collect(),
            source,
        }
    }
}

impl Hook for CopyOut {
    fn generate(
        &self,
        _: &JobSpec,
        bindings: &EnvironmentBindings,
        calc: &CalculationEnvironment,
    ) -> String {
        let from = match self.source {
            CopySource::Work => calc.node_work_dir,
            CopySource::Scratch => calc.node_scratch_dir,
        };
        CopyFromTo::new(from, bindings.submit_workdir, self.files.clone()).render()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qsys::{Pbs, QueuingSystem};

    fn generate(hook: &dyn Hook) -> String {
        hook.generate(
            &JobSpec::new(),
            &Pbs::new().environment_bindings(),
            &CalculationEnvironment::default(),
        )
    }

    #[test]
    fn test_copy_from_to_code() {
        let hook = CopyFromTo::new("A", "B", ["sub/file"]);
        assert_eq!(
            generate(&hook),
            "if [ -r \"$A/sub/file\" ]; then\n    CPARGS=\"--dereference\"\n    [ -d \"$A/sub/file\" ] && CPARGS=\"--recursive\"\n    DIR=$(dirname \"sub/file\")\n    mkdir -p \"$B/$DIR\"\n    cp $CPARGS \"$A/sub/file\" \"$B/$DIR\"\nfi\n"
        );
    }

    #[test]
    fn test_copy_in_uses_submit_and_work_dir() {
        let code = generate(&CopyIn::new(["input.in", "basis"]));
        assert!(code.contains("cp $CPARGS \"$PBS_O_WORKDIR/input.in\" \"$NODE_WORKDIR/$DIR\""));
        assert!(code.contains("\"$PBS_O_WORKDIR/basis\""));
        assert_eq!(code.matches("fi\n").count(), 2);
    }

    #[test]
    fn test_copy_out_sources() {
        let work = generate(&CopyOut::new(["out"], CopySource::Work));
        assert!(work.contains("cp $CPARGS \"$NODE_WORKDIR/out\" \"$PBS_O_WORKDIR/$DIR\""));

        let scratch = generate(&CopyOut::new(["out"], CopySource::Scratch));
        assert!(scratch.contains("\"$NODE_SCRATCHDIR/out\""));
    }

    #[test]
    fn test_file_names_are_escaped() {
        let code = generate(&CopyIn::new(["a \"b\" $HOME `x`.inp"]));
        assert!(code.contains("\"$PBS_O_WORKDIR/a \\\"b\\\" \\$HOME \\`x\\`.inp\""));
        assert!(code.contains("DIR=$(dirname \"a \\\"b\\\" \\$HOME \\`x\\`.inp\")"));
        assert!(!code.contains(" $HOME"));
    }

    #[test]
    fn test_empty_file_list_generates_nothing() {
        assert_eq!(generate(&CopyIn::new(Vec::<String>::new())), "");
    }
}
