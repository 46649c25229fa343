//! End-to-end tests against the built binary
//!
//! Each test runs in its own temporary home with all roots redirected via the
//! user config file, and the index URL pointed at an unroutable address so no
//! test ever touches the network. Index behavior is exercised through a
//! pre-seeded cache file.

use anyhow::Result;
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

const INDEX: &str = r#"[
    {"name": "my-app", "repository": "https://example.test/my-app.git",
     "description": "A test app", "version": "1.0.0"},
    {"name": "my-other-app", "repository": "https://example.test/other.git"}
]"#;

struct TestEnvironment {
    home: TempDir,
}

impl TestEnvironment {
    fn new() -> Result<Self> {
        let home = TempDir::new()?;
        let env = Self { home };

        fs::create_dir_all(env.config_dir().join("wam"))?;
        fs::write(
            env.config_dir().join("wam").join("config.toml"),
            format!(
                "install_root = \"{root}/apps\"\n\
                 state_root = \"{root}/state\"\n\
                 desktop_dir = \"{root}/applications\"\n\
                 index_url = \"http://127.0.0.1:9/index.json\"\n",
                root = env.home.path().display()
            ),
        )?;
        Ok(env)
    }

    fn config_dir(&self) -> PathBuf {
        self.home.path().join(".config")
    }

    fn data_dir(&self) -> PathBuf {
        self.home.path().join(".local/share")
    }

    fn state_root(&self) -> PathBuf {
        self.home.path().join("state")
    }

    /// Seed a fresh index cache so index commands work without a network
    fn seed_index_cache(&self) -> Result<()> {
        let cache = self.state_root().join("cache");
        fs::create_dir_all(&cache)?;
        fs::write(cache.join("index.json"), INDEX)?;
        Ok(())
    }

    /// Plant an installed-package record plus its install directory
    fn seed_install(&self, name: &str) -> Result<PathBuf> {
        let dir = self.home.path().join("apps").join(name);
        fs::create_dir_all(&dir)?;
        fs::write(dir.join("package.json"), r#"{"version": "1.0.0"}"#)?;

        let installed = self.state_root().join("installed");
        fs::create_dir_all(&installed)?;
        fs::write(
            installed.join(format!("{name}.json")),
            format!(
                r#"{{"name": "{name}", "installed_at": "2026-08-01T12:00:00Z",
                     "directory": "{}", "repository": "https://example.test/{name}.git",
                     "version": "1.0.0"}}"#,
                dir.display()
            ),
        )?;
        Ok(dir)
    }

    fn run(&self, args: &[&str]) -> Result<Output> {
        let output = Command::new(env!("CARGO_BIN_EXE_wam"))
            .args(args)
            .env("HOME", self.home.path())
            .env("XDG_CONFIG_HOME", self.config_dir())
            .env("XDG_DATA_HOME", self.data_dir())
            .output()?;
        Ok(output)
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn list_on_empty_store_exits_zero_with_message() -> Result<()> {
    let env = TestEnvironment::new()?;
    let output = env.run(&["list"])?;

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("No packages installed"));
    Ok(())
}

#[test]
fn list_shows_seeded_install() -> Result<()> {
    let env = TestEnvironment::new()?;
    env.seed_install("my-app")?;

    let output = env.run(&["list"])?;
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("my-app"));
    assert!(out.contains("1.0.0"));
    Ok(())
}

#[test]
fn remove_unknown_package_is_a_hard_error() -> Result<()> {
    let env = TestEnvironment::new()?;
    let output = env.run(&["remove", "ghost-app"])?;

    assert!(!output.status.success());
    assert!(stderr(&output).contains("not installed"));
    Ok(())
}

#[test]
fn remove_deletes_record_directory_and_descriptor() -> Result<()> {
    let env = TestEnvironment::new()?;
    let dir = env.seed_install("my-app")?;
    let descriptor = env.home.path().join("applications/wam-my-app.desktop");
    fs::create_dir_all(descriptor.parent().unwrap())?;
    fs::write(&descriptor, "[Desktop Entry]\n")?;

    let output = env.run(&["remove", "my-app"])?;
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    assert!(!dir.exists());
    assert!(!descriptor.exists());
    assert!(!env.state_root().join("installed/my-app.json").exists());

    // a second remove now reports not installed
    let output = env.run(&["remove", "my-app"])?;
    assert!(!output.status.success());
    Ok(())
}

#[test]
fn update_unknown_package_is_a_hard_error() -> Result<()> {
    let env = TestEnvironment::new()?;
    let output = env.run(&["update", "ghost-app"])?;

    assert!(!output.status.success());
    assert!(stderr(&output).contains("not installed"));
    assert!(!env.state_root().join("installed/ghost-app.json").exists());
    Ok(())
}

#[test]
fn info_prefers_installed_record() -> Result<()> {
    let env = TestEnvironment::new()?;
    env.seed_install("my-app")?;

    let output = env.run(&["info", "my-app"])?;
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("my-app"));
    assert!(out.contains("1.0.0"));
    assert!(out.contains("apps/my-app"));
    Ok(())
}

#[test]
fn info_falls_back_to_index_metadata() -> Result<()> {
    let env = TestEnvironment::new()?;
    env.seed_index_cache()?;

    let output = env.run(&["info", "my-app"])?;
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("not installed"));
    assert!(out.contains("https://example.test/my-app.git"));
    Ok(())
}

#[test]
fn info_on_unknown_name_warns_but_exits_zero() -> Result<()> {
    let env = TestEnvironment::new()?;
    env.seed_index_cache()?;

    let output = env.run(&["info", "ghost-app"])?;
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("neither installed nor in the index"));
    Ok(())
}

#[test]
fn search_falls_back_to_cache_when_refresh_fails() -> Result<()> {
    let env = TestEnvironment::new()?;
    env.seed_index_cache()?;

    let output = env.run(&["search", "my-"])?;
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("my-app"));
    assert!(out.contains("my-other-app"));
    Ok(())
}

#[test]
fn search_without_cache_or_network_is_a_hard_error() -> Result<()> {
    let env = TestEnvironment::new()?;
    let output = env.run(&["search", "my-"])?;
    assert!(!output.status.success());
    Ok(())
}

#[test]
fn install_by_name_without_index_is_a_hard_error() -> Result<()> {
    let env = TestEnvironment::new()?;
    // resolution happens before any clone; with no cache and no network the
    // command must fail hard and leave no record behind
    let output = env.run(&["install", "my-app"])?;
    assert!(!output.status.success());
    assert!(!env.state_root().join("installed/my-app.json").exists());
    Ok(())
}

#[test]
fn unknown_subcommand_exits_nonzero() -> Result<()> {
    let env = TestEnvironment::new()?;
    let output = env.run(&["frobnicate"])?;
    assert!(!output.status.success());
    Ok(())
}

#[test]
fn no_arguments_prints_usage_and_exits_zero() -> Result<()> {
    let env = TestEnvironment::new()?;
    let output = env.run(&[])?;
    assert!(output.status.success());
    assert!(stdout(&output).contains("Usage"));
    Ok(())
}
