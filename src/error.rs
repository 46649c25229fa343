use std::path::PathBuf;
use thiserror::Error;

/// Hard failure taxonomy for wam commands.
///
/// Every variant aborts the current command with a non-zero exit. Soft
/// conditions (pull failure during update, empty asset directories, info
/// misses) are warnings through the ui layer and never appear here.
#[derive(Debug, Error)]
pub enum WamError {
    #[error("required executable '{0}' not found in PATH")]
    MissingDependency(String),

    #[error("package '{0}' not found in the index")]
    UnresolvedPackage(String),

    #[error("'{0}' is not a usable package name")]
    InvalidPackageName(String),

    #[error("invalid manifest for '{name}': {reason}")]
    InvalidManifest { name: String, reason: String },

    #[error("failed to clone {url}")]
    CloneFailed { url: String },

    #[error("failed to fetch {0}")]
    FetchFailed(String),

    #[error("dependency installation failed in {0}")]
    DependencyInstallFailed(PathBuf),

    #[error("build failed in {0}")]
    BuildFailed(PathBuf),

    #[error("build verification failed: {0}")]
    BuildVerificationFailed(String),

    #[error("package '{0}' is not installed")]
    NotInstalled(String),

    #[error("another wam operation is already running for '{0}'")]
    LockHeld(String),
}
