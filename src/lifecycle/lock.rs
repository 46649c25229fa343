//! Per-name advisory lock for mutating commands
//!
//! flock-style: held for the duration of install/update/remove and released
//! by the kernel on process exit, including crashes. Two wam invocations
//! racing on the same package name are refused, not serialized.

use crate::config::Settings;
use crate::error::WamError;
use anyhow::{Context, Result};
use nix::fcntl::{Flock, FlockArg};
use std::fs::{self, File};

pub struct PackageLock {
    _flock: Flock<File>,
}

impl std::fmt::Debug for PackageLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageLock").finish_non_exhaustive()
    }
}

/// Take the exclusive non-blocking lock for a package name.
/// The lock file lives inside the metadata directory and is never deleted;
/// only the flock on it matters.
pub fn acquire(settings: &Settings, name: &str) -> Result<PackageLock> {
    let dir = settings.installed_dir();
    fs::create_dir_all(&dir)
        .with_context(|| format!("creating record directory {}", dir.display()))?;

    let path = dir.join(format!(".{name}.lock"));
    let file = File::create(&path)
        .with_context(|| format!("opening lock file {}", path.display()))?;

    match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
        Ok(flock) => Ok(PackageLock { _flock: flock }),
        Err((_, nix::errno::Errno::EWOULDBLOCK)) => {
            Err(WamError::LockHeld(name.to_string()).into())
        }
        Err((_, errno)) => {
            Err(anyhow::anyhow!(errno).context(format!("locking {}", path.display())))
        }
    }
}
