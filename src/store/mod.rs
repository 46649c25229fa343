//! Durable per-package metadata records
//!
//! One JSON document per installed package under `<state_root>/installed/`.
//! Record presence is the sole authority for "installed": no record means not
//! installed, regardless of what is left on disk in the install root.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Version sentinel when the app manifest carries no usable version
pub const UNKNOWN_VERSION: &str = "unknown";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PackageRecord {
    pub name: String,
    pub installed_at: DateTime<Utc>,
    pub directory: PathBuf,
    /// None for ad-hoc installs that never went through the index
    pub repository: Option<String>,
    pub version: String,
}

pub struct RecordStore {
    dir: PathBuf,
}

impl RecordStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn record_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    pub fn get(&self, name: &str) -> Result<Option<PackageRecord>> {
        let path = self.record_path(name);
        if !path.exists() {
            return Ok(None);
        }
        let s = fs::read_to_string(&path)
            .with_context(|| format!("reading package record {}", path.display()))?;
        let record = serde_json::from_str(&s)
            .with_context(|| format!("parsing package record {}", path.display()))?;
        Ok(Some(record))
    }

    /// Atomic replace: the record is written to a temp file in the same
    /// directory and renamed into place, so readers never observe a torn
    /// record even if the process dies mid-write.
    pub fn put(&self, record: &PackageRecord) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating record directory {}", self.dir.display()))?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)
            .context("creating temporary record file")?;
        let json = serde_json::to_string_pretty(record).context("serializing package record")?;
        tmp.write_all(json.as_bytes())
            .context("writing package record")?;

        let path = self.record_path(&record.name);
        tmp.persist(&path)
            .with_context(|| format!("renaming record into place at {}", path.display()))?;
        Ok(())
    }

    /// Idempotent: deleting a record that does not exist is not an error
    pub fn delete(&self, name: &str) -> Result<()> {
        let path = self.record_path(name);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                Err(e).with_context(|| format!("deleting package record {}", path.display()))
            }
        }
    }

    /// All records, in no particular order. An empty or nonexistent store
    /// yields an empty list.
    pub fn list(&self) -> Result<Vec<PackageRecord>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut records = Vec::new();
        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("reading record directory {}", self.dir.display()))?
        {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(record) = self.parse_entry(&path) {
                records.push(record);
            }
        }
        Ok(records)
    }

    fn parse_entry(&self, path: &Path) -> Option<PackageRecord> {
        let s = fs::read_to_string(path).ok()?;
        match serde_json::from_str(&s) {
            Ok(record) => Some(record),
            Err(e) => {
                crate::ui::emit(
                    crate::ui::Level::Warn,
                    "store.record.invalid",
                    &format!("Skipping unreadable record {}: {}", path.display(), e),
                    None,
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(name: &str) -> PackageRecord {
        PackageRecord {
            name: name.to_string(),
            installed_at: Utc::now(),
            directory: PathBuf::from("/opt/wam").join(name),
            repository: Some(format!("https://example.test/{name}.git")),
            version: "1.2.3".to_string(),
        }
    }

    #[test]
    fn get_missing_record_is_none() {
        let dir = tempdir().unwrap();
        let store = RecordStore::new(dir.path().to_path_buf());
        assert!(store.get("ghost-app").unwrap().is_none());
    }

    #[test]
    fn put_then_get_round_trips() {
        let dir = tempdir().unwrap();
        let store = RecordStore::new(dir.path().to_path_buf());
        let rec = record("my-app");
        store.put(&rec).unwrap();
        assert_eq!(store.get("my-app").unwrap().unwrap(), rec);
    }

    #[test]
    fn put_replaces_existing_record() {
        let dir = tempdir().unwrap();
        let store = RecordStore::new(dir.path().to_path_buf());
        let mut rec = record("my-app");
        store.put(&rec).unwrap();

        rec.version = "2.0.0".to_string();
        store.put(&rec).unwrap();

        assert_eq!(store.get("my-app").unwrap().unwrap().version, "2.0.0");
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn put_leaves_no_temp_files_behind() {
        let dir = tempdir().unwrap();
        let store = RecordStore::new(dir.path().to_path_buf());
        store.put(&record("my-app")).unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["my-app.json".to_string()]);
    }

    #[test]
    fn list_on_missing_directory_is_empty() {
        let dir = tempdir().unwrap();
        let store = RecordStore::new(dir.path().join("never-created"));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn delete_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = RecordStore::new(dir.path().to_path_buf());
        store.put(&record("my-app")).unwrap();

        store.delete("my-app").unwrap();
        assert!(store.get("my-app").unwrap().is_none());
        // second delete of the same name must also succeed
        store.delete("my-app").unwrap();
    }

    #[test]
    fn list_skips_unparsable_records() {
        let dir = tempdir().unwrap();
        let store = RecordStore::new(dir.path().to_path_buf());
        store.put(&record("good-app")).unwrap();
        fs::write(dir.path().join("broken.json"), "{not json").unwrap();

        let records = store.list().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "good-app");
    }
}
