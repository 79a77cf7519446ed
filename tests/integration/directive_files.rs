//! Integration tests for directives read from program input files

use sendscript::directive::{DirectiveParser, DirectiveWarning};
use sendscript::error::ScriptError;
use sendscript::qsys::Pbs;
use sendscript::script::JobScriptBuilder;
use tempfile::TempDir;

use crate::integration::test_utils::write_file;

fn builder() -> JobScriptBuilder {
    JobScriptBuilder::new(Box::new(Pbs::new()))
}

#[test]
fn test_input_file_fills_unset_fields() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("benzene.in");
    write_file(
        &input,
        "! RI-MP2 def2-TZVP   #QSYS wt=1d mem=16gb\n\
         %pal nprocs 4 end    #QSYS np=4\n\
         * xyzfile 0 1 benzene.xyz\n",
    );

    let mut builder = builder();
    let warnings = builder.apply_input_file(&input).unwrap();
    assert!(warnings.is_empty());

    let spec = builder.spec();
    assert_eq!(spec.walltime, Some(86400));
    assert_eq!(spec.physical_memory, Some(16 * 1024 * 1024 * 1024));
    assert_eq!(spec.total_processors(), 4);
}

#[test]
fn test_earlier_layers_win_over_input_file() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("job.in");
    write_file(&input, "#QSYS wt=2h gpus=2\n#QSYS wt=3h\n");

    let mut builder = builder();
    builder.spec_mut().walltime = Some(60);
    let warnings = builder.apply_input_file(&input).unwrap();

    assert_eq!(builder.spec().walltime, Some(60));
    assert_eq!(warnings.len(), 3);
    assert!(warnings.contains(&DirectiveWarning::Unrecognized {
        key: "gpus".to_string(),
        value: "2".to_string(),
    }));
    assert!(warnings[0].to_string().contains("since already provided"));
}

#[test]
fn test_malformed_directive_is_fatal() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("bad.in");
    write_file(&input, "# QSYS mem=lots\n");

    let err = builder().apply_input_file(&input).unwrap_err();
    match err {
        ScriptError::MalformedValue { key, value, .. } => {
            assert_eq!(key, "directive mem");
            assert_eq!(value, "lots");
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_missing_input_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let err = builder()
        .apply_input_file(&dir.path().join("missing.in"))
        .unwrap_err();
    assert!(matches!(err, ScriptError::Io { .. }));
}

#[test]
fn test_custom_directive_parser() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("job.com");
    write_file(&input, "%mem=1gb\n!ORCA wt=30m\n#QSYS wt=5h\n");

    let mut builder = builder().with_directive_parser(DirectiveParser::new(["!"], ["ORCA"]));
    builder.apply_input_file(&input).unwrap();
    assert_eq!(builder.spec().walltime, Some(1800));
}
