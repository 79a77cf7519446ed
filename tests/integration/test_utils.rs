//! Shared test utilities for integration tests
//!
//! Centralizes isolation of the environment variables configuration loading
//! reads (HOME, XDG_CONFIG_HOME, USER, LOGNAME).

use std::path::PathBuf;
use std::sync::Mutex;
use tempfile::TempDir;

/// Global mutex to serialize environment variable access across all tests
static ENV_MUTEX: Mutex<()> = Mutex::new(());

const ISOLATED_VARS: [&str; 4] = ["HOME", "XDG_CONFIG_HOME", "USER", "LOGNAME"];

/// Environment variable state to restore after test
struct EnvState {
    saved: Vec<(&'static str, Option<String>)>,
}

impl EnvState {
    fn capture() -> Self {
        Self {
            saved: ISOLATED_VARS
                .iter()
                .map(|var| (*var, std::env::var(var).ok()))
                .collect(),
        }
    }

    fn restore(self) {
        for (var, value) in self.saved {
            match value {
                Some(orig) => std::env::set_var(var, orig),
                None => std::env::remove_var(var),
            }
        }
    }
}

/// Run `f` with HOME and XDG_CONFIG_HOME inside `test_dir` and USER set to
/// `tester`; the original environment is restored afterwards.
///
/// Returns the path of the global config file inside the sandbox.
pub fn with_isolated_env<F, R>(test_dir: &TempDir, f: F) -> R
where
    F: FnOnce(PathBuf) -> R,
{
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let env_state = EnvState::capture();

    let config_home = test_dir.path().join("config");
    let home = test_dir.path().join("home");
    std::fs::create_dir_all(&config_home).unwrap();
    std::fs::create_dir_all(&home).unwrap();

    std::env::set_var("HOME", home.to_str().unwrap());
    std::env::set_var("XDG_CONFIG_HOME", config_home.to_str().unwrap());
    std::env::set_var("USER", "tester");
    std::env::remove_var("LOGNAME");

    let global = config_home.join("sendscript").join("config.toml");
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| f(global)));

    env_state.restore();

    match result {
        Ok(result) => result,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}

/// Write `contents` to `path`, creating parent directories
pub fn write_file(path: &std::path::Path, contents: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}
