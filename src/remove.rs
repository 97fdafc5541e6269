// src/remove.rs

//! Remover (§4.J)
//!
//! Unlinks every file and symlink a package's manifest names, then prunes
//! any directory left empty by that removal, runs the package's own
//! post-remove hook followed by any global hook for that package name, and
//! deregisters it.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{info, warn};

use crate::config::Config;
use crate::error::Result;

/// Remove an installed package by name.
pub fn remove(config: &Config, name: &str) -> Result<String> {
    let entry = crate::registry::lookup(config, name)?;

    let mut removed_dirs = Vec::new();
    for line in entry.manifest.lines() {
        if let Some(dir) = remove_entry(config, line) {
            removed_dirs.push(dir);
        }
    }
    prune_empty_dirs(config, removed_dirs);

    run_post_remove_hook(entry.post_remove.as_deref(), &entry.meta.name, config);
    run_post_remove_hook(
        fs::read_to_string(config.global_post_remove(&entry.meta.name)).ok().as_deref(),
        &entry.meta.name,
        config,
    );

    crate::registry::unregister(config, name)?;
    run_ldconfig(config);

    info!(package = %name, "removed package");
    Ok(name.to_string())
}

/// Unlink one manifest line (a bare `./`-prefixed file or symlink path).
/// Returns the entry's parent directory so the caller can prune it once
/// every sibling has been considered.
fn remove_entry(config: &Config, line: &str) -> Option<PathBuf> {
    let rel = line.strip_prefix("./").unwrap_or(line);
    if rel.is_empty() {
        return None;
    }
    let target = config.root.join(rel);
    let parent = target.parent().map(Path::to_path_buf);

    match fs::remove_file(&target) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %target.display(), "failed to remove: {e}"),
    }
    parent
}

/// Prune directories left empty by removal, deepest first, so a parent is
/// only considered once everything under it has had a chance to go. A
/// directory still holding files from another package simply fails to
/// remove and is left alone.
fn prune_empty_dirs(config: &Config, mut dirs: Vec<PathBuf>) {
    dirs.sort_by_key(|d| std::cmp::Reverse(d.components().count()));
    dirs.dedup();

    for dir in dirs {
        let mut current = dir;
        loop {
            if current == config.root || !current.starts_with(&config.root) {
                break;
            }
            match fs::remove_dir(&current) {
                Ok(()) => {
                    let Some(parent) = current.parent() else { break };
                    current = parent.to_path_buf();
                }
                // Not empty: another package still owns files under this
                // shared prefix directory. Not found: already gone.
                Err(e) if e.raw_os_error() == Some(39) || e.kind() == std::io::ErrorKind::NotFound => break,
                Err(e) => {
                    warn!(path = %current.display(), "failed to prune directory: {e}");
                    break;
                }
            }
        }
    }
}

fn run_post_remove_hook(script: Option<&str>, package_name: &str, config: &Config) {
    let Some(script) = script else { return };
    info!(package = package_name, "running post-remove hook");
    let result = Command::new("sh").arg("-c").arg(script).env("MBUILD_ROOT", &config.root).status();
    match result {
        Ok(status) if status.success() => {}
        Ok(status) => warn!(package = package_name, "post-remove hook exited with status {status}"),
        Err(e) => warn!(package = package_name, "failed to run post-remove hook: {e}"),
    }
}

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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::Compression;
    use crate::config::ToolchainProfile;
    use crate::error::Error;
    use crate::package::ParsedMeta;

    fn test_config(base: &Path) -> Config {
        Config {
            base: base.to_path_buf(),
            root: base.join("root"),
            prefix: PathBuf::from("/usr"),
            jobs: 1,
            pkg_comp: Compression::None,
            toolchain: ToolchainProfile::System,
            strip: false,
            download_retries: 1,
        }
    }

    #[test]
    fn remove_unlinks_files_and_prunes_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        config.init_layout().unwrap();

        fs::create_dir_all(config.root.join("usr/bin")).unwrap();
        fs::write(config.root.join("usr/bin/hello"), b"hi").unwrap();

        let meta = ParsedMeta {
            name: "hello".into(),
            version: "1.0".into(),
            release: "1".into(),
            arch: "x86_64".into(),
            prefix: PathBuf::from("/usr"),
        };
        let manifest = "./usr/bin/hello\n";
        crate::registry::register(&config, &meta, manifest, None).unwrap();

        remove(&config, "hello").unwrap();

        assert!(!config.root.join("usr/bin/hello").exists());
        assert!(!config.root.join("usr/bin").exists());
        assert!(crate::registry::lookup(&config, "hello").is_err());
    }

    #[test]
    fn remove_leaves_directory_shared_with_another_package() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        config.init_layout().unwrap();

        fs::create_dir_all(config.root.join("usr/bin")).unwrap();
        fs::write(config.root.join("usr/bin/hello"), b"hi").unwrap();
        fs::write(config.root.join("usr/bin/other"), b"hi").unwrap();

        let meta = ParsedMeta {
            name: "hello".into(),
            version: "1.0".into(),
            release: "1".into(),
            arch: "x86_64".into(),
            prefix: PathBuf::from("/usr"),
        };
        crate::registry::register(&config, &meta, "./usr/bin/hello\n", None).unwrap();

        remove(&config, "hello").unwrap();

        assert!(!config.root.join("usr/bin/hello").exists());
        assert!(config.root.join("usr/bin/other").exists());
    }

    #[test]
    fn remove_unknown_package_is_not_installed_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        config.init_layout().unwrap();

        let err = remove(&config, "nope").unwrap_err();
        assert!(matches!(err, Error::NotInstalled(_)));
    }
}
