//! Remote package index client
//!
//! The index is a single JSON document mapping package names to repository
//! URLs. It is cached on disk and refreshed when the cache file's
//! modification age exceeds the configured threshold. Policy on refresh
//! failure: fall back to an existing cache (even a stale one) with a warning;
//! error hard only when no cache exists at all.

use crate::config::Settings;
use crate::error::WamError;
use crate::ui::is_debug_enabled;
use crate::ui::prelude::*;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const INDEX_CACHE_FILE: &str = "index.json";

#[derive(Deserialize, Debug, Clone)]
pub struct IndexEntry {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub repository: String,
    #[serde(default)]
    pub version: Option<String>,
}

pub struct IndexClient<'a> {
    settings: &'a Settings,
}

impl<'a> IndexClient<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    fn cache_path(&self) -> PathBuf {
        self.settings.cache_dir().join(INDEX_CACHE_FILE)
    }

    /// Resolve an exact package name to its index entry
    pub fn resolve(&self, name: &str) -> Result<IndexEntry> {
        let entries = self.entries(false)?;
        let entry = entries
            .into_iter()
            .find(|e| e.name == name)
            .ok_or_else(|| WamError::UnresolvedPackage(name.to_string()))?;

        if entry.repository.is_empty() {
            return Err(WamError::InvalidManifest {
                name: name.to_string(),
                reason: "index entry has no repository URL".to_string(),
            }
            .into());
        }
        Ok(entry)
    }

    /// All entries whose name contains the query as a substring.
    /// Search always attempts a refresh first so results reflect the
    /// current index, subject to the stale-fallback policy.
    pub fn search(&self, query: &str) -> Result<Vec<IndexEntry>> {
        let entries = self.entries(true)?;
        Ok(search_entries(entries, query))
    }

    fn entries(&self, force_refresh: bool) -> Result<Vec<IndexEntry>> {
        let cache = self.cache_path();

        let needs_fetch = force_refresh
            || !cache_is_fresh(&cache, self.settings.index_cache_max_age);

        if needs_fetch {
            match self.refresh_cache(&cache) {
                Ok(()) => {}
                Err(e) if cache.exists() => {
                    emit(
                        Level::Warn,
                        "index.refresh.stale_fallback",
                        &format!(
                            "{} Index refresh failed ({e:#}); using cached copy",
                            char::from(NerdFont::Warning)
                        ),
                        None,
                    );
                }
                Err(e) => {
                    return Err(e.context(WamError::FetchFailed(
                        self.settings.index_url.clone(),
                    )));
                }
            }
        }

        let s = fs::read_to_string(&cache)
            .with_context(|| format!("reading index cache {}", cache.display()))?;
        parse_index(&s)
    }

    fn refresh_cache(&self, cache: &Path) -> Result<()> {
        if let Some(parent) = cache.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating cache directory {}", parent.display()))?;
        }

        if is_debug_enabled() {
            emit(
                Level::Debug,
                "index.refresh",
                &format!("Fetching index from {}", self.settings.index_url),
                None,
            );
        }

        let client = reqwest::blocking::Client::builder()
            .user_agent(format!("wam/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .context("building HTTP client")?;

        let response = client
            .get(&self.settings.index_url)
            .send()
            .with_context(|| format!("fetching index from {}", self.settings.index_url))?;

        if !response.status().is_success() {
            anyhow::bail!("index server returned status {}", response.status());
        }

        let body = response.text().context("reading index response body")?;
        // Validate before replacing the cache so a bad response cannot
        // clobber a good cached index.
        parse_index(&body)?;
        fs::write(cache, body)
            .with_context(|| format!("writing index cache {}", cache.display()))?;
        Ok(())
    }
}

/// A cache is fresh when it exists and its mtime age is within the threshold
pub fn cache_is_fresh(path: &Path, max_age: Duration) -> bool {
    let Ok(meta) = fs::metadata(path) else {
        return false;
    };
    let Ok(modified) = meta.modified() else {
        return false;
    };
    match modified.elapsed() {
        Ok(age) => age <= max_age,
        // mtime in the future; treat as fresh
        Err(_) => true,
    }
}

pub fn parse_index(s: &str) -> Result<Vec<IndexEntry>> {
    serde_json::from_str(s).context("parsing package index document")
}

fn search_entries(entries: Vec<IndexEntry>, query: &str) -> Vec<IndexEntry> {
    entries
        .into_iter()
        .filter(|e| e.name.contains(query))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const INDEX: &str = r#"[
        {"name": "my-app", "repository": "https://example.test/my-app.git",
         "description": "A test app", "version": "1.0.0"},
        {"name": "my-other-app", "repository": "https://example.test/other.git"},
        {"name": "dashboard", "repository": "https://example.test/dash.git"}
    ]"#;

    #[test]
    fn parses_entries_with_optional_fields() {
        let entries = parse_index(INDEX).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].version.as_deref(), Some("1.0.0"));
        assert!(entries[1].version.is_none());
        assert!(entries[1].description.is_none());
    }

    #[test]
    fn search_is_case_sensitive_substring() {
        let entries = parse_index(INDEX).unwrap();
        let hits = search_entries(entries.clone(), "my-");
        assert_eq!(hits.len(), 2);

        let miss = search_entries(entries, "MY-");
        assert!(miss.is_empty());
    }

    #[test]
    fn fresh_cache_detection() {
        let dir = tempdir().unwrap();
        let cache = dir.path().join("index.json");

        assert!(!cache_is_fresh(&cache, Duration::from_secs(3600)));

        fs::write(&cache, INDEX).unwrap();
        assert!(cache_is_fresh(&cache, Duration::from_secs(3600)));
        assert!(!cache_is_fresh(&cache, Duration::from_secs(0)));
    }

    #[test]
    fn malformed_index_is_rejected() {
        assert!(parse_index("{\"not\": \"an array\"}").is_err());
        assert!(parse_index("[{\"name\": \"x\"}]").is_err());
    }
}
