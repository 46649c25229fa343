//! Launcher registrar: generated .desktop entries for installed packages
//!
//! One descriptor per package, regenerated wholesale on install and update.
//! Derived data only; nothing here is read back, so removal is best-effort.

use crate::config::Settings;
use crate::manifest;
use anyhow::{Context, Result};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

const GENERIC_DESCRIPTION: &str = "Locally installed web application";

/// Command run inside the install directory to start the app
const START_COMMAND: &str = "npm start";

fn descriptor_path(settings: &Settings, name: &str) -> PathBuf {
    settings.desktop_dir.join(format!("wam-{name}.desktop"))
}

/// Write the .desktop file for a package. Display name and description come
/// from the app's own manifest when readable; manifest problems fall back to
/// the package name and never fail the install.
pub fn register(settings: &Settings, name: &str, install_dir: &Path) -> Result<PathBuf> {
    let manifest = manifest::load(install_dir).unwrap_or_default();
    let display_name = manifest.name.filter(|n| !n.is_empty());
    let description = manifest.description.filter(|d| !d.is_empty());

    let content = render_descriptor(
        display_name.as_deref().unwrap_or(name),
        description.as_deref().unwrap_or(GENERIC_DESCRIPTION),
        install_dir,
    );

    fs::create_dir_all(&settings.desktop_dir).with_context(|| {
        format!(
            "creating desktop entry directory {}",
            settings.desktop_dir.display()
        )
    })?;

    let path = descriptor_path(settings, name);
    fs::write(&path, content)
        .with_context(|| format!("writing desktop entry {}", path.display()))?;

    let mut perms = fs::metadata(&path)
        .with_context(|| format!("reading permissions of {}", path.display()))?
        .permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms)
        .with_context(|| format!("marking {} executable", path.display()))?;

    Ok(path)
}

/// Idempotent: removing a descriptor that does not exist is not an error
pub fn unregister(settings: &Settings, name: &str) -> Result<()> {
    let path = descriptor_path(settings, name);
    match fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("removing desktop entry {}", path.display())),
    }
}

fn render_descriptor(display_name: &str, description: &str, install_dir: &Path) -> String {
    format!(
        "[Desktop Entry]\n\
         Type=Application\n\
         Name={display_name}\n\
         Comment={description}\n\
         Exec=sh -c \"cd '{dir}' && {START_COMMAND}\"\n\
         Path={dir}\n\
         Terminal=false\n\
         Categories=Network;WebBrowser;\n",
        dir = install_dir.display()
    )
}
