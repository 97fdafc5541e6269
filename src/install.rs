// src/install.rs

//! Installer (§4.I)
//!
//! Unpacks a `.ppkg` archive into a temp directory, parses its
//! `CONTROL/meta`, copies every other top-level entry into the target
//! root, registers the package, and runs `ldconfig` on a best-effort
//! basis.

use std::fs;
use std::path::Path;
use std::process::Command;

use tracing::{info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::package::parse_meta;

/// Install a `.ppkg` archive into `config.root`.
pub fn install(archive_path: &Path, config: &Config) -> Result<String> {
    let temp_dir = tempfile::tempdir().map_err(Error::Io)?;
    extract_archive(archive_path, temp_dir.path())?;

    let meta_path = temp_dir.path().join("CONTROL/meta");
    let meta = parse_meta(&fs::read_to_string(&meta_path).map_err(|e| {
        Error::Pack(format!("archive missing {}: {e}", meta_path.display()))
    })?)?;

    let manifest_path = temp_dir.path().join("CONTROL/manifest");
    let manifest = fs::read_to_string(&manifest_path)
        .map_err(|e| Error::Pack(format!("archive missing {}: {e}", manifest_path.display())))?;

    copy_payload_into_root(temp_dir.path(), &config.root)?;

    let post_remove = fs::read_to_string(temp_dir.path().join("CONTROL/post-remove")).ok();

    crate::registry::register(config, &meta, &manifest, post_remove.as_deref())?;

    run_ldconfig(config);

    info!(package = %meta.name, "installed package");
    Ok(meta.name)
}

fn extract_archive(archive_path: &Path, dest: &Path) -> Result<()> {
    let status = Command::new("tar")
        .arg("-xf")
        .arg(archive_path)
        .arg("-C")
        .arg(dest)
        .status()
        .map_err(|e| Error::Pack(format!("failed to invoke tar: {e}")))?;
    if !status.success() {
        return Err(Error::Pack(format!("tar exited with status {status} while unpacking {}", archive_path.display())));
    }
    Ok(())
}

/// Copy every top-level entry of the extracted archive at `extracted`
/// except `CONTROL` into `root`, preserving symlinks and overwriting any
/// existing files at the destination.
fn copy_payload_into_root(extracted: &Path, root: &Path) -> Result<()> {
    if !extracted.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(root)?;
    for entry in fs::read_dir(extracted)? {
        let entry = entry?;
        if entry.file_name() == "CONTROL" {
            continue;
        }
        copy_tree_into_root(&entry.path(), extracted, root)?;
    }
    Ok(())
}

fn copy_tree_into_root(path: &Path, extracted: &Path, root: &Path) -> Result<()> {
    for entry in walkdir::WalkDir::new(path) {
        let entry = entry.map_err(|e| Error::Pack(e.to_string()))?;
        let rel = entry.path().strip_prefix(extracted).expect("walkdir yields paths under extracted");
        let target = root.join(rel);

        let meta = fs::symlink_metadata(entry.path())?;
        if meta.file_type().is_symlink() {
            let link = fs::read_link(entry.path())?;
            let _ = fs::remove_file(&target);
            #[cfg(unix)]
            std::os::unix::fs::symlink(&link, &target)?;
        } else if meta.is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Regenerate the shared library cache, if `ldconfig` is available. Absence
/// or failure is logged, never fatal (§4.I).
fn run_ldconfig(config: &Config) {
    if which::which("ldconfig").is_err() {
        return;
    }
    match Command::new("ldconfig").arg("-r").arg(&config.root).status() {
        Ok(status) if status.success() => info!("refreshed shared library cache"),
        Ok(status) => warn!("ldconfig exited with status {status}"),
        Err(e) => warn!("failed to invoke ldconfig: {e}"),
    }
}
