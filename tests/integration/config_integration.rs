//! Integration tests for the layered configuration

use sendscript::config::{global_config_path, ConfigLoader, ConfigSource, WORKSPACE_CONFIG_FILE};
use sendscript::error::ConfigError;
use tempfile::TempDir;

use crate::integration::test_utils::{with_isolated_env, write_file};

#[test]
fn test_builtin_defaults_use_user_name() {
    let test_dir = TempDir::new().unwrap();
    let submit_dir = TempDir::new().unwrap();

    let config = with_isolated_env(&test_dir, |_| ConfigLoader::load(submit_dir.path()).unwrap());

    assert_eq!(config.job.get("workdir_base").as_deref(), Some("/scratch/tester"));
    assert_eq!(config.job.get("scratchdir_base").as_deref(), Some("/lscratch/tester"));
    assert_eq!(config.job.get("merge_stdout_stderr").as_deref(), Some("true"));
    assert_eq!(config.job.get("send_email_end").as_deref(), Some("true"));
    assert_eq!(config.job.get("send_email_begin"), None);
    assert!(config.queuing_system.is_none());
}

#[test]
fn test_workspace_file_overrides_global_file() {
    let test_dir = TempDir::new().unwrap();
    let submit_dir = TempDir::new().unwrap();

    let config = with_isolated_env(&test_dir, |global| {
        write_file(
            &global,
            "queuing_system = \"pbs\"\n[job]\nqueue = \"long\"\nwalltime = \"2h\"\n",
        );
        write_file(
            &submit_dir.path().join(WORKSPACE_CONFIG_FILE),
            "[job]\nwalltime = \"30m\"\n",
        );
        ConfigLoader::load(submit_dir.path()).unwrap()
    });

    assert_eq!(config.queuing_system.as_deref(), Some("pbs"));
    assert_eq!(config.job.get("queue").as_deref(), Some("long"));
    assert_eq!(config.job.get("walltime").as_deref(), Some("30m"));
}

#[test]
fn test_environment_overrides_files() {
    let test_dir = TempDir::new().unwrap();
    let submit_dir = TempDir::new().unwrap();

    let config = with_isolated_env(&test_dir, |global| {
        write_file(&global, "[job]\nmail = \"file@example.org\"\n");
        std::env::set_var("SENDSCRIPT__JOB__MAIL", "env@example.org");
        let config = ConfigLoader::load(submit_dir.path());
        std::env::remove_var("SENDSCRIPT__JOB__MAIL");
        config.unwrap()
    });

    assert_eq!(config.job.get("mail").as_deref(), Some("env@example.org"));
}

#[test]
fn test_unknown_keyword_names_file() {
    let test_dir = TempDir::new().unwrap();
    let submit_dir = TempDir::new().unwrap();

    let err = with_isolated_env(&test_dir, |global| {
        write_file(&global, "[job]\nwallclock = \"1h\"\n");
        ConfigLoader::load(submit_dir.path()).unwrap_err()
    });

    match err {
        ConfigError::Parse { location, message } => {
            assert!(location.contains("config.toml"), "location: {}", location);
            assert!(message.contains("wallclock"), "message: {}", message);
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_write_default_then_load() {
    let test_dir = TempDir::new().unwrap();
    let submit_dir = TempDir::new().unwrap();

    with_isolated_env(&test_dir, |global| {
        assert_eq!(global_config_path(), Some(global.clone()));

        let written = ConfigLoader::write_default(None, false).unwrap();
        assert_eq!(written, global);

        let config = ConfigLoader::load(submit_dir.path()).unwrap();
        assert_eq!(config.job.get("workdir_base").as_deref(), Some("/scratch/tester"));
        assert_eq!(config.logging.output, "stderr");

        assert!(matches!(
            ConfigLoader::write_default(None, false),
            Err(ConfigError::Exists(_))
        ));
        assert!(ConfigLoader::write_default(None, true).is_ok());
    });
}
