//! Best-effort reader for a package's own `package.json`
//!
//! Used for the record's version field and the launcher's display strings.
//! A missing or unreadable manifest never fails an install; callers fall
//! back to sentinels.

use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Deserialize, Debug, Default, Clone)]
pub struct AppManifest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

/// Load `<dir>/package.json` if it exists and parses; None otherwise
pub fn load(dir: &Path) -> Option<AppManifest> {
    let path = dir.join("package.json");
    let s = fs::read_to_string(path).ok()?;
    serde_json::from_str(&s).ok()
}

/// The version recorded for an install, falling back to the sentinel
pub fn version_or_unknown(dir: &Path) -> String {
    load(dir)
        .and_then(|m| m.version)
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| crate::store::UNKNOWN_VERSION.to_string())
}
