//! End-to-end tests: layered resolution through script rendering

use sendscript::cli::{Cli, RunContext};
use sendscript::config::{ConfigLoader, WORKSPACE_CONFIG_FILE};
use sendscript::error::{MergeError, ScriptError};
use sendscript::hooks::{CalculationEnvironment, CopyIn, RunCommand};
use sendscript::job::JobSpec;
use sendscript::qsys::{EnvironmentBindings, Pbs};
use sendscript::script::{JobFlags, JobScriptBuilder};
use clap::Parser;
use tempfile::TempDir;

use crate::integration::test_utils::{with_isolated_env, write_file};

fn pbs_builder() -> JobScriptBuilder {
    JobScriptBuilder::new(Box::new(Pbs::with_word_size(8)))
}

#[test]
fn test_full_precedence_chain() {
    let test_dir = TempDir::new().unwrap();
    let submit_dir = TempDir::new().unwrap();
    let input = submit_dir.path().join("water.inp");
    write_file(&input, "$molecule\n  ! #QSYS wt=10h np=8 mem=2gb\n$end\n");

    let script = with_isolated_env(&test_dir, |_| {
        write_file(
            &submit_dir.path().join(WORKSPACE_CONFIG_FILE),
            "[job]\nmail = \"me@example.org\"\nwalltime = \"1h\"\nqueue = \"short\"\n",
        );
        let config = ConfigLoader::load(submit_dir.path()).unwrap();

        let mut builder = pbs_builder();
        let flags = JobFlags {
            queue: Some("long".to_string()),
            qsys_args: Some("-l mem=4gb".to_string()),
            ..JobFlags::default()
        };
        let warnings = builder.resolve(&config.job, Some(&input), &flags).unwrap();
        assert_eq!(warnings.len(), 1, "walltime comes from config, directive is ignored");

        let spec = builder.spec();
        assert_eq!(spec.job_name.as_deref(), Some("water"));
        assert_eq!(spec.walltime, Some(3600));
        assert_eq!(spec.queue_name.as_deref(), Some("long"));
        assert_eq!(spec.physical_memory, Some(4 * 1024 * 1024 * 1024));
        assert_eq!(spec.virtual_memory, None, "mem directives only set physical memory");
        assert_eq!(spec.total_processors(), 8);

        builder.add_payload_hook(CopyIn::new(["water.inp"]), 0);
        builder.add_payload_hook(RunCommand::new("prog water.inp > water.out"), 10);
        builder.build_script().unwrap()
    });

    assert!(script.starts_with(
        "#!/bin/bash\n\
         #\n\
         #PBS -N water\n\
         #PBS -j oe\n\
         #PBS -l walltime=3600\n\
         #PBS -q long\n\
         #PBS -l mem=4294967296b\n\
         #PBS -M me@example.org\n\
         #PBS -m ae\n\
         #PBS -l nodes=1:ppn=8\n"
    ));
    assert!(script.contains("NODE_WORKDIR=\"/scratch/tester/water_${PBS_JOBID}\"\n"));
    assert!(script.contains("NODE_SCRATCHDIR=\"/lscratch/tester/water_${PBS_JOBID}\"\n"));
    assert!(script.contains("trap 'handle_error' 2 9 15\n"));
}

#[test]
fn test_override_nodes_fill_or_replace_node_list() {
    let mut builder = pbs_builder();
    builder
        .apply_flags(&JobFlags {
            walltime: Some(60),
            qsys_args: Some("-l nodes=2:ppn=2".to_string()),
            ..JobFlags::default()
        })
        .unwrap();
    assert_eq!(builder.spec().total_processors(), 4);

    let mut builder = pbs_builder();
    builder.spec_mut().add_node(Default::default());
    builder.spec_mut().add_node(Default::default());
    builder.apply_override_args("-l nodes=4").unwrap();
    assert_eq!(builder.spec().nodes.len(), 1);
    assert_eq!(builder.spec().total_nodes(), 4);
}

#[test]
fn test_hooks_render_in_priority_then_insertion_order() {
    let mut builder = pbs_builder();
    builder.set_workdir_base("/w");
    builder.set_scratchdir_base("/s");
    builder.spec_mut().job_name = Some("order".to_string());

    let tag = |text: &'static str| {
        move |_: &JobSpec, _: &EnvironmentBindings, _: &CalculationEnvironment| text.to_string()
    };
    builder.add_payload_hook(tag("echo third"), 5);
    builder.add_payload_hook(tag("echo first"), -1);
    builder.add_payload_hook(tag("echo second"), 0);
    builder.add_payload_hook(tag("echo fourth"), 5);
    builder.add_error_hook(tag("echo cleanup"), 0);

    let script = builder.build_script().unwrap();
    assert!(script.contains(
        "payload_hooks() {\n:\necho first\necho second\necho third\necho fourth\n}\n"
    ));
    assert!(script.contains("error_hooks() {\n:\necho cleanup\n}\n"));
}

#[test]
fn test_priority_out_of_range_is_not_ready() {
    let mut builder = pbs_builder();
    builder.set_workdir_base("/w");
    builder.set_scratchdir_base("/s");
    builder
        .apply_flags(&JobFlags {
            name: Some("job".to_string()),
            priority: Some(-2000),
            ..JobFlags::default()
        })
        .unwrap();

    match builder.build_script() {
        Err(ScriptError::NotReady(reason)) => assert!(reason.contains("wrong range")),
        other => panic!("expected NotReady, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_conflicting_fragment_is_rejected_atomically() {
    let mut spec = JobSpec::new();
    spec.walltime = Some(60);
    spec.queue_name = Some("short".to_string());
    let before = spec.clone();

    let mut fragment = JobSpec::fragment();
    fragment.queue_name = Some("long".to_string());
    fragment.walltime = Some(120);

    let err = sendscript::merge::merge(&mut spec, &fragment, sendscript::merge::MergePolicy::FILL_GAPS)
        .unwrap_err();
    assert!(matches!(err, MergeError::FieldConflict { .. }));
    assert_eq!(spec, before);
}

#[test]
fn test_cli_build_uses_workspace_config() {
    let test_dir = TempDir::new().unwrap();
    let submit_dir = TempDir::new().unwrap();

    let out = with_isolated_env(&test_dir, |_| {
        write_file(
            &submit_dir.path().join(WORKSPACE_CONFIG_FILE),
            "queuing_system = \"PBS\"\n[job]\nworkdir_base = \"/data/work\"\n",
        );
        let cli = Cli::try_parse_from([
            "sendscript",
            "--submit-dir",
            submit_dir.path().to_str().unwrap(),
            "build",
            "--name",
            "cli",
            "--np",
            "2",
            "--command",
            "run",
            "--module",
            "prog/1.0",
        ])
        .unwrap();
        let ctx = RunContext::new(cli.submit_dir.clone(), cli.config.clone(), cli.qsys.clone());
        ctx.execute(&cli.command).unwrap()
    });

    assert!(out.contains("#PBS -l nodes=1:ppn=2\n"));
    assert!(out.contains("NODE_WORKDIR=\"/data/work/cli_${PBS_JOBID}\"\n"));
    assert!(out.contains("module load prog/1.0\n\nrun\nRETURN_VALUE=$?\n"));
}
