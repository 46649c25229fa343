//! Package lifecycle orchestration
//!
//! Composes index, fetcher, build driver, launcher and record store into the
//! install/update/remove/list/info/search commands. The record store only
//! ever observes a package as absent or installed; every intermediate state
//! lives inside a single command invocation, and any failure before the
//! final record write leaves no record behind.

pub mod lock;
pub mod prompt;

use crate::build;
use crate::config::Settings;
use crate::deps;
use crate::error::WamError;
use crate::fetch::{self, SourceRef};
use crate::index::IndexClient;
use crate::launcher;
use crate::manifest;
use crate::progress;
use crate::store::{PackageRecord, RecordStore};
use crate::ui::prelude::*;
use anyhow::{Context, Result};
use chrono::Utc;
use colored::Colorize;
use comfy_table::{Table, presets::UTF8_FULL_CONDENSED};
use self::prompt::Prompter;
use std::fs;
use std::path::Path;

pub struct Lifecycle<'a> {
    settings: &'a Settings,
    store: RecordStore,
}

impl<'a> Lifecycle<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        let store = RecordStore::new(settings.installed_dir());
        Self { settings, store }
    }

    /// Install from a bare name (resolved through the index) or a direct
    /// repository URL. A declined reinstall is a user choice, not an error.
    pub fn install(&self, target: &str, prompter: &dyn Prompter) -> Result<()> {
        let source = SourceRef::parse(target);

        // The name keys every path this command touches, so it is validated
        // before anything on disk is looked at or modified.
        let name = match &source {
            SourceRef::Url(url) => fetch::derived_name(url),
            SourceRef::Name(name) => name.clone(),
        };
        fetch::validate_package_name(&name)?;

        let _lock = lock::acquire(self.settings, &name)?;

        let existing = self.store.get(&name)?;
        if existing.is_some() {
            let question = format!("'{name}' is already installed. Remove and reinstall?");
            if !prompter.confirm(&question)? {
                emit(
                    Level::Info,
                    "install.declined",
                    &format!(
                        "{} Keeping existing installation of '{name}'",
                        char::from(NerdFont::Info)
                    ),
                    None,
                );
                return Ok(());
            }
        }

        deps::require(deps::BUILD_TOOLS)?;

        let repo_url = match source {
            SourceRef::Url(url) => url,
            SourceRef::Name(name) => {
                IndexClient::new(self.settings).resolve(&name)?.repository
            }
        };

        // The old install is only removed once resolution has succeeded, so
        // a confirmed reinstall of an unresolvable name keeps what it has.
        if let Some(existing) = existing {
            self.remove_artifacts(&existing.name, &existing.directory)?;
        }

        let dir = self.settings.package_dir(&name);
        if dir.exists() {
            // leftover from an earlier failed install; the record store is
            // the authority, so an unrecorded directory is safe to discard
            fs::remove_dir_all(&dir)
                .with_context(|| format!("clearing stale directory {}", dir.display()))?;
        }
        fs::create_dir_all(&self.settings.install_root).with_context(|| {
            format!(
                "creating install root {}",
                self.settings.install_root.display()
            )
        })?;

        let pb = progress::spinner(format!("Cloning {repo_url}..."));
        match fetch::clone(&repo_url, &dir) {
            Ok(_) => progress::finish_success(pb, format!("Cloned {repo_url}")),
            Err(e) => {
                progress::finish_quiet(pb);
                return Err(e);
            }
        }

        build::build(&dir)?;
        launcher::register(self.settings, &name, &dir)?;

        let record = PackageRecord {
            name: name.clone(),
            installed_at: Utc::now(),
            version: manifest::version_or_unknown(&dir),
            repository: Some(repo_url),
            directory: dir,
        };
        self.store.put(&record)?;

        emit(
            Level::Success,
            "install.complete",
            &format!(
                "{} Installed '{name}' ({})",
                char::from(NerdFont::Check),
                record.version
            ),
            None,
        );
        Ok(())
    }

    /// Update an installed package: best-effort source pull, strict rebuild
    /// and reverify, then rewrite the record's timestamp and version.
    pub fn update(&self, name: &str) -> Result<()> {
        // Lock before the record lookup; a concurrent remove must not slip
        // in between reading the record and acting on it.
        let _lock = lock::acquire(self.settings, name)?;

        let record = self
            .store
            .get(name)?
            .ok_or_else(|| WamError::NotInstalled(name.to_string()))?;

        deps::require(deps::BUILD_TOOLS)?;

        match fetch::pull_latest(&record.directory) {
            Ok(branch) => emit(
                Level::Info,
                "update.pulled",
                &format!(
                    "{} Updated source from origin/{branch}",
                    char::from(NerdFont::Refresh)
                ),
                None,
            ),
            // stale source still builds; continue with what is on disk
            Err(e) => emit(
                Level::Warn,
                "update.pull_failed",
                &format!(
                    "{} Could not update source ({e:#}); rebuilding existing checkout",
                    char::from(NerdFont::Warning)
                ),
                None,
            ),
        }

        build::build(&record.directory)?;
        launcher::register(self.settings, name, &record.directory)?;

        let updated = PackageRecord {
            installed_at: Utc::now(),
            version: manifest::version_or_unknown(&record.directory),
            ..record
        };
        self.store.put(&updated)?;

        emit(
            Level::Success,
            "update.complete",
            &format!(
                "{} Updated '{name}' ({})",
                char::from(NerdFont::Check),
                updated.version
            ),
            None,
        );
        Ok(())
    }

    /// Remove the install directory, the launcher descriptor and the record.
    /// Each step is idempotent so an interrupted remove can simply be rerun.
    pub fn remove(&self, name: &str) -> Result<()> {
        let _lock = lock::acquire(self.settings, name)?;

        let record = self
            .store
            .get(name)?
            .ok_or_else(|| WamError::NotInstalled(name.to_string()))?;

        self.remove_artifacts(name, &record.directory)?;

        emit(
            Level::Success,
            "remove.complete",
            &format!("{} Removed '{name}'", char::from(NerdFont::Trash)),
            None,
        );
        Ok(())
    }

    /// Artifacts first, record last: the record keeps reporting "installed"
    /// until everything else is gone, so a crash here leaves a retryable
    /// state instead of an orphaned directory that wam no longer knows about.
    fn remove_artifacts(&self, name: &str, dir: &Path) -> Result<()> {
        if dir.exists() {
            fs::remove_dir_all(dir)
                .with_context(|| format!("removing install directory {}", dir.display()))?;
        }
        launcher::unregister(self.settings, name)?;
        self.store.delete(name)?;
        Ok(())
    }

    pub fn list(&self) -> Result<()> {
        let mut records = self.store.list()?;
        if records.is_empty() {
            emit(
                Level::Info,
                "list.empty",
                &format!("{} No packages installed", char::from(NerdFont::Info)),
                None,
            );
            return Ok(());
        }
        records.sort_by(|a, b| a.name.cmp(&b.name));

        if get_output_format() == OutputFormat::Json {
            emit(
                Level::Info,
                "list.packages",
                "installed packages",
                Some(serde_json::to_value(&records).context("serializing package list")?),
            );
            return Ok(());
        }

        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec!["Name", "Version", "Installed"]);
        for record in &records {
            table.add_row(vec![
                record.name.clone(),
                record.version.clone(),
                record.installed_at.format("%Y-%m-%d %H:%M").to_string(),
            ]);
        }
        println!("{table}");
        Ok(())
    }

    /// Show the installed record for a name, falling back to index metadata.
    /// A name matching neither is a warning, not a hard error.
    pub fn info(&self, name: &str) -> Result<()> {
        if let Some(record) = self.store.get(name)? {
            println!("{}: {}", "Name".bold(), record.name);
            println!("{}: {}", "Version".bold(), record.version);
            println!(
                "{}: {}",
                "Installed".bold(),
                record.installed_at.format("%Y-%m-%d %H:%M:%S")
            );
            println!("{}: {}", "Directory".bold(), record.directory.display());
            if let Some(repo) = &record.repository {
                println!("{}: {}", "Repository".bold(), repo);
            }
            return Ok(());
        }

        match IndexClient::new(self.settings).resolve(name) {
            Ok(entry) => {
                println!("{}: {} (not installed)", "Name".bold(), entry.name);
                if let Some(desc) = &entry.description {
                    println!("{}: {}", "Description".bold(), desc);
                }
                println!("{}: {}", "Repository".bold(), entry.repository);
                if let Some(version) = &entry.version {
                    println!("{}: {}", "Version".bold(), version);
                }
                Ok(())
            }
            Err(e)
                if matches!(
                    e.downcast_ref::<WamError>(),
                    Some(WamError::UnresolvedPackage(_))
                ) =>
            {
                emit(
                    Level::Warn,
                    "info.unknown",
                    &format!(
                        "{} '{name}' is neither installed nor in the index",
                        char::from(NerdFont::Warning)
                    ),
                    None,
                );
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    pub fn search(&self, query: &str) -> Result<()> {
        let hits = IndexClient::new(self.settings).search(query)?;
        if hits.is_empty() {
            emit(
                Level::Info,
                "search.empty",
                &format!(
                    "{} No packages matching '{query}'",
                    char::from(NerdFont::Search)
                ),
                None,
            );
            return Ok(());
        }
        for entry in hits {
            let version = entry
                .version
                .map(|v| format!(" ({v})"))
                .unwrap_or_default();
            println!(
                "{}{} - {}",
                entry.name.bold(),
                version,
                entry.description.as_deref().unwrap_or("no description")
            );
        }
        Ok(())
    }
}
