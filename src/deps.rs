//! Preflight checks for external executables
//!
//! Checked before any network or build work so a missing toolchain fails
//! fast instead of after a clone.

use crate::error::WamError;
use anyhow::Result;

/// Executables the build driver shells out to
pub const BUILD_TOOLS: &[&str] = &["node", "npm"];

/// Verify that every named executable is reachable in PATH
pub fn require(executables: &[&str]) -> Result<()> {
    for exe in executables {
        if which::which(exe).is_err() {
            return Err(WamError::MissingDependency(exe.to_string()).into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_requirement_list_passes() {
        assert!(require(&[]).is_ok());
    }

    #[test]
    fn missing_executable_is_reported_by_name() {
        let err = require(&["wam-test-no-such-binary"]).unwrap_err();
        let wam = err.downcast_ref::<WamError>().unwrap();
        assert!(matches!(wam, WamError::MissingDependency(name) if name == "wam-test-no-such-binary"));
    }
}
