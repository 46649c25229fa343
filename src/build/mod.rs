//! Build driver: npm dependency install, build, and output verification
//!
//! Both steps run as blocking child processes; their exit status is the sole
//! success signal. wam runs in strict mode: a failing build aborts the
//! install, and every build is followed by output verification.

use crate::error::WamError;
use crate::progress;
use crate::ui::prelude::*;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Directories accepted as the build output root, in preference order
const OUTPUT_DIR_CANDIDATES: &[&str] = &["dist", "build"];

/// Subdirectories expected to hold static assets
const ASSET_DIR_CANDIDATES: &[&str] = &["static", "assets"];

/// How many trailing log lines to surface when an npm step fails
const LOG_TAIL_LINES: usize = 20;

#[derive(Debug, Default)]
pub struct BuildReport {
    /// Soft findings from verification; the build still counts as successful
    pub warnings: Vec<String>,
}

/// Run `npm install` then `npm run build` in the source tree, then verify
/// the output. Returns the verification warnings on success.
pub fn build(source_dir: &Path) -> Result<BuildReport> {
    run_npm_step(source_dir, &["install"], "Installing dependencies").map_err(|e| {
        e.context(WamError::DependencyInstallFailed(source_dir.to_path_buf()))
    })?;

    run_npm_step(source_dir, &["run", "build"], "Building")
        .map_err(|e| e.context(WamError::BuildFailed(source_dir.to_path_buf())))?;

    let warnings = verify_output(source_dir)?;
    for w in &warnings {
        emit(
            Level::Warn,
            "build.verify.warning",
            &format!("{} {w}", char::from(NerdFont::Warning)),
            None,
        );
    }

    Ok(BuildReport { warnings })
}

fn run_npm_step(dir: &Path, args: &[&str], label: &str) -> Result<()> {
    let pb = progress::spinner(format!("{label}..."));

    let output = duct::cmd("npm", args.iter().copied())
        .dir(dir)
        .stderr_to_stdout()
        .stdout_capture()
        .unchecked()
        .run()
        .with_context(|| format!("running npm {}", args.join(" ")))?;

    if output.status.success() {
        progress::finish_success(pb, label.to_string());
        return Ok(());
    }

    progress::finish_quiet(pb);
    let log = String::from_utf8_lossy(&output.stdout);
    Err(anyhow::anyhow!(
        "npm {} exited with {:?}:\n{}",
        args.join(" "),
        output.status.code(),
        log_tail(&log)
    ))
}

fn log_tail(log: &str) -> String {
    let lines: Vec<&str> = log.lines().collect();
    let start = lines.len().saturating_sub(LOG_TAIL_LINES);
    lines[start..].join("\n")
}

/// Post-build verification. A missing output directory or entry HTML file is
/// a hard failure; a missing or empty static-assets directory is only a
/// warning, returned to the caller.
pub fn verify_output(source_dir: &Path) -> Result<Vec<String>> {
    let output_dir = find_first_dir(source_dir, OUTPUT_DIR_CANDIDATES).ok_or_else(|| {
        WamError::BuildVerificationFailed(format!(
            "no build output directory ({}) in {}",
            OUTPUT_DIR_CANDIDATES.join(" or "),
            source_dir.display()
        ))
    })?;

    let entry = output_dir.join("index.html");
    if !entry.is_file() {
        return Err(WamError::BuildVerificationFailed(format!(
            "missing entry file {}",
            entry.display()
        ))
        .into());
    }

    let mut warnings = Vec::new();
    match find_first_dir(&output_dir, ASSET_DIR_CANDIDATES) {
        Some(assets) if dir_is_empty(&assets)? => {
            warnings.push(format!("asset directory {} is empty", assets.display()));
        }
        Some(_) => {}
        None => {
            warnings.push(format!(
                "no static asset directory ({}) under {}",
                ASSET_DIR_CANDIDATES.join(" or "),
                output_dir.display()
            ));
        }
    }

    Ok(warnings)
}

fn find_first_dir(base: &Path, candidates: &[&str]) -> Option<PathBuf> {
    candidates
        .iter()
        .map(|c| base.join(c))
        .find(|p| p.is_dir())
}

fn dir_is_empty(dir: &Path) -> Result<bool> {
    let mut entries = fs::read_dir(dir)
        .with_context(|| format!("reading directory {}", dir.display()))?;
    Ok(entries.next().is_none())
}
