//! Startup configuration for wam
//!
//! All paths are resolved exactly once at process start into an immutable
//! [`Settings`] value that is passed by reference into every component.
//! Layering: built-in defaults, then the system config file, then the user
//! config file; later layers override earlier ones field-wise.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_INDEX_URL: &str =
    "https://raw.githubusercontent.com/instantOS/wam-index/main/index.json";

const SYSTEM_CONFIG_PATH: &str = "/etc/wam/config.toml";

/// Default staleness threshold for the cached package index
const INDEX_CACHE_MAX_AGE: Duration = Duration::from_secs(60 * 60);

/// Optional overrides as they appear in a config file on disk
#[derive(Deserialize, Debug, Default, Clone)]
pub struct ConfigFile {
    pub install_root: Option<PathBuf>,
    pub state_root: Option<PathBuf>,
    pub desktop_dir: Option<PathBuf>,
    pub index_url: Option<String>,
    pub index_cache_max_age_secs: Option<u64>,
}

impl ConfigFile {
    /// Parse a config file if it exists. A missing file is not an error.
    pub fn from_path(path: &Path) -> Result<Option<ConfigFile>> {
        if !path.exists() {
            return Ok(None);
        }
        let s = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let c: ConfigFile = toml::from_str(&s)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(Some(c))
    }

    /// Overlay `other` on top of self, keeping self where `other` is unset
    fn merged_with(self, other: ConfigFile) -> ConfigFile {
        ConfigFile {
            install_root: other.install_root.or(self.install_root),
            state_root: other.state_root.or(self.state_root),
            desktop_dir: other.desktop_dir.or(self.desktop_dir),
            index_url: other.index_url.or(self.index_url),
            index_cache_max_age_secs: other
                .index_cache_max_age_secs
                .or(self.index_cache_max_age_secs),
        }
    }
}

/// Resolved, immutable runtime configuration
#[derive(Debug, Clone)]
pub struct Settings {
    /// Per-package source trees live under `<install_root>/<name>`
    pub install_root: PathBuf,
    /// Package records and the index cache live under here
    pub state_root: PathBuf,
    /// Where generated .desktop files go
    pub desktop_dir: PathBuf,
    pub index_url: String,
    pub index_cache_max_age: Duration,
}

impl Settings {
    /// Build settings for the current process: defaults for the effective
    /// user, overridden by the system config file, then the user config file.
    pub fn load() -> Result<Settings> {
        let privileged = matches!(
            sudo::check(),
            sudo::RunningAs::Root | sudo::RunningAs::Suid
        );

        let mut layered = ConfigFile::default();
        if let Some(system) = ConfigFile::from_path(Path::new(SYSTEM_CONFIG_PATH))? {
            layered = layered.merged_with(system);
        }
        if let Some(user_path) = user_config_path()
            && let Some(user) = ConfigFile::from_path(&user_path)?
        {
            layered = layered.merged_with(user);
        }

        Settings::from_overrides(privileged, layered)
    }

    /// Apply overrides on top of the defaults for the given privilege level
    pub fn from_overrides(privileged: bool, overrides: ConfigFile) -> Result<Settings> {
        let (install_root, state_root, desktop_dir) = if privileged {
            (
                PathBuf::from("/opt/wam"),
                PathBuf::from("/var/lib/wam"),
                PathBuf::from("/usr/share/applications"),
            )
        } else {
            let data = dirs::data_dir()
                .context("unable to determine user data directory")?;
            (
                data.join("wam").join("apps"),
                data.join("wam"),
                data.join("applications"),
            )
        };

        Ok(Settings {
            install_root: overrides.install_root.unwrap_or(install_root),
            state_root: overrides.state_root.unwrap_or(state_root),
            desktop_dir: overrides.desktop_dir.unwrap_or(desktop_dir),
            index_url: overrides
                .index_url
                .unwrap_or_else(|| DEFAULT_INDEX_URL.to_string()),
            index_cache_max_age: overrides
                .index_cache_max_age_secs
                .map(Duration::from_secs)
                .unwrap_or(INDEX_CACHE_MAX_AGE),
        })
    }

    /// Directory holding one JSON record per installed package
    pub fn installed_dir(&self) -> PathBuf {
        self.state_root.join("installed")
    }

    /// Directory for the cached index and transient manifest fetches
    pub fn cache_dir(&self) -> PathBuf {
        self.state_root.join("cache")
    }

    /// Install directory for a named package
    pub fn package_dir(&self, name: &str) -> PathBuf {
        self.install_root.join(name)
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("wam").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_layer_overrides_system_layer() {
        let system = ConfigFile {
            install_root: Some(PathBuf::from("/srv/apps")),
            index_url: Some("https://example.test/system.json".to_string()),
            ..Default::default()
        };
        let user = ConfigFile {
            index_url: Some("https://example.test/user.json".to_string()),
            ..Default::default()
        };

        let merged = ConfigFile::default().merged_with(system).merged_with(user);
        assert_eq!(merged.install_root, Some(PathBuf::from("/srv/apps")));
        assert_eq!(
            merged.index_url.as_deref(),
            Some("https://example.test/user.json")
        );
    }

    #[test]
    fn privileged_defaults_use_system_roots() {
        let settings = Settings::from_overrides(true, ConfigFile::default()).unwrap();
        assert_eq!(settings.install_root, PathBuf::from("/opt/wam"));
        assert_eq!(settings.installed_dir(), PathBuf::from("/var/lib/wam/installed"));
        assert_eq!(settings.cache_dir(), PathBuf::from("/var/lib/wam/cache"));
    }

    #[test]
    fn overrides_win_over_defaults() {
        let overrides = ConfigFile {
            state_root: Some(PathBuf::from("/tmp/wam-state")),
            index_cache_max_age_secs: Some(5),
            ..Default::default()
        };
        let settings = Settings::from_overrides(true, overrides).unwrap();
        assert_eq!(settings.state_root, PathBuf::from("/tmp/wam-state"));
        assert_eq!(settings.index_cache_max_age, Duration::from_secs(5));
        assert_eq!(settings.install_root, PathBuf::from("/opt/wam"));
    }

    #[test]
    fn missing_config_file_is_not_an_error() {
        let loaded = ConfigFile::from_path(Path::new("/nonexistent/wam.toml")).unwrap();
        assert!(loaded.is_none());
    }
}
