//! Guess which queuing system is installed on this machine.

use super::{Pbs, QueuingSystem};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Find an executable named `program` on `PATH`.
pub fn find_on_path(program: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// PBS if its submit command is available, otherwise PBS as fallback with a warning.
pub fn guess_queuing_system() -> Box<dyn QueuingSystem> {
    let pbs = Pbs::new();
    match find_on_path(pbs.submit_command()) {
        Some(path) => debug!(submit = %path.display(), "detected PBS"),
        None => warn!(
            fallback = pbs.name(),
            "Could not autodetermine the queuing system on this machine, using fallback"
        ),
    }
    Box::new(pbs)
}
