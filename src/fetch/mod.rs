//! Source fetcher: git clone and update of package source trees
//!
//! All git work goes through libgit2; wam never shells out to a git binary.

use crate::error::WamError;
use anyhow::{Context, Result};
use git2::{
    FetchOptions, Repository,
    build::{CheckoutBuilder, RepoBuilder},
};
use std::path::Path;

/// Branches tried in order when updating a package, before falling back to
/// whatever is currently checked out.
const UPDATE_BRANCH_CANDIDATES: &[&str] = &["main", "master"];

/// What the user handed to `wam install`
#[derive(Debug, Clone, PartialEq)]
pub enum SourceRef {
    /// A direct repository URL; the package name is derived from it
    Url(String),
    /// A bare name to be resolved through the package index
    Name(String),
}

impl SourceRef {
    /// Direct URLs are detected by scheme prefix; everything else is treated
    /// as an index name.
    pub fn parse(input: &str) -> SourceRef {
        if input.starts_with("http://")
            || input.starts_with("https://")
            || input.starts_with("git@")
        {
            SourceRef::Url(input.to_string())
        } else {
            SourceRef::Name(input.to_string())
        }
    }
}

/// Derive the package name from a repository URL: the final path segment
/// with a trailing `.git` suffix stripped. Handles ssh-style URLs
/// (`git@host:org/repo.git`) where the path follows a colon.
pub fn derived_name(url: &str) -> String {
    let s = url.trim_end_matches('/').trim_end_matches(".git");
    s.rsplit(['/', ':'])
        .next()
        .map(|p| p.to_string())
        .unwrap_or_else(|| s.to_string())
}

/// Package names key records, lock files and the install directory, so they
/// must be safe as a single path component: non-empty, not a dot name, no
/// separators, no leading dot. Degenerate URLs like `https://` or
/// `https://host/..` derive names that fail this check.
pub fn validate_package_name(name: &str) -> Result<(), WamError> {
    let safe = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if safe {
        Ok(())
    } else {
        Err(WamError::InvalidPackageName(name.to_string()))
    }
}

/// Clean clone into a fresh target directory
pub fn clone(url: &str, target: &Path) -> Result<Repository> {
    let mut fetch_options = FetchOptions::new();
    fetch_options.remote_callbacks(git2::RemoteCallbacks::new());

    let mut builder = RepoBuilder::new();
    builder.fetch_options(fetch_options);

    let repo = builder.clone(url, target).map_err(|e| {
        anyhow::Error::new(e).context(WamError::CloneFailed {
            url: url.to_string(),
        })
    })?;

    Ok(repo)
}

/// Get the current checked out branch name
fn current_branch(repo: &Repository) -> Result<String> {
    let head = repo.head().context("getting HEAD reference")?;
    let head_name = head
        .shorthand()
        .ok_or_else(|| anyhow::anyhow!("HEAD is detached"))?;
    Ok(head_name.to_string())
}

/// Bring an existing checkout up to date with its origin.
///
/// Tries each branch candidate in order (`main`, then `master`, then the
/// branch currently checked out); the first one that can be fetched and
/// reset to wins. Returns the branch that was updated. Exhausting all
/// candidates is an error the caller treats as soft: the on-disk source
/// stays usable.
pub fn pull_latest(dir: &Path) -> Result<String> {
    let repo = Repository::open(dir)
        .with_context(|| format!("opening repository at {}", dir.display()))?;

    let mut candidates: Vec<String> = UPDATE_BRANCH_CANDIDATES
        .iter()
        .map(|b| b.to_string())
        .collect();
    if let Ok(current) = current_branch(&repo)
        && !candidates.contains(&current)
    {
        candidates.push(current);
    }

    let mut last_err = None;
    for branch in &candidates {
        match fetch_and_reset(&repo, branch) {
            Ok(()) => return Ok(branch.clone()),
            Err(e) => last_err = Some(e),
        }
    }

    Err(last_err
        .unwrap_or_else(|| anyhow::anyhow!("no update branch candidates"))
        .context(format!(
            "updating source in {} (tried branches: {})",
            dir.display(),
            candidates.join(", ")
        )))
}

/// Fetch one branch from origin and hard-reset the working tree onto it.
/// Local modifications to the source tree are discarded; the install root
/// is wam's territory, not a development checkout.
fn fetch_and_reset(repo: &Repository, branch: &str) -> Result<()> {
    let mut remote = repo.find_remote("origin").context("finding origin remote")?;

    let mut fetch_options = FetchOptions::new();
    fetch_options.remote_callbacks(git2::RemoteCallbacks::new());
    remote
        .fetch(&[branch], Some(&mut fetch_options), None)
        .with_context(|| format!("fetching branch {branch}"))?;

    let remote_ref = repo
        .find_reference(&format!("refs/remotes/origin/{branch}"))
        .with_context(|| format!("origin/{branch} not found after fetch"))?;
    let remote_commit = remote_ref
        .peel_to_commit()
        .context("peeling remote branch to commit")?;

    repo.set_head(&format!("refs/heads/{branch}"))
        .context("setting HEAD")?;
    let mut checkout = CheckoutBuilder::new();
    checkout.force().remove_untracked(true);
    repo.reset(
        &remote_commit.into_object(),
        git2::ResetType::Hard,
        Some(&mut checkout),
    )
    .context("resetting to remote commit")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_urls_are_detected_by_scheme() {
        assert_eq!(
            SourceRef::parse("https://example.test/foo.git"),
            SourceRef::Url("https://example.test/foo.git".to_string())
        );
        assert_eq!(
            SourceRef::parse("http://example.test/foo"),
            SourceRef::Url("http://example.test/foo".to_string())
        );
        assert_eq!(
            SourceRef::parse("git@example.test:org/foo.git"),
            SourceRef::Url("git@example.test:org/foo.git".to_string())
        );
        assert_eq!(
            SourceRef::parse("my-app"),
            SourceRef::Name("my-app".to_string())
        );
        // a name that merely contains a scheme-like substring is still a name
        assert_eq!(
            SourceRef::parse("not-https://weird"),
            SourceRef::Name("not-https://weird".to_string())
        );
    }

    #[test]
    fn degenerate_names_are_rejected() {
        assert!(validate_package_name("my-app").is_ok());
        assert!(validate_package_name("My_App.2").is_ok());

        assert!(validate_package_name("").is_err());
        assert!(validate_package_name(".").is_err());
        assert!(validate_package_name("..").is_err());
        assert!(validate_package_name(".hidden").is_err());
        assert!(validate_package_name("a/b").is_err());
        assert!(validate_package_name("a b").is_err());

        // what degenerate URLs derive must never pass
        assert!(validate_package_name(&derived_name("https://")).is_err());
        assert!(validate_package_name(&derived_name("https://host/..")).is_err());
    }

    #[test]
    fn name_derivation_strips_suffix_and_path() {
        assert_eq!(derived_name("https://example.test/foo.git"), "foo");
        assert_eq!(derived_name("https://example.test/org/foo"), "foo");
        assert_eq!(derived_name("https://example.test/org/foo/"), "foo");
        assert_eq!(derived_name("git@example.test:org/bar.git"), "bar");
        assert_eq!(derived_name("git@example.test:baz.git"), "baz");
    }
}
