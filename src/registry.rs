// src/registry.rs

//! Installed-package registry (§4.K)
//!
//! A directory-per-package store under `state/pkgs/<name>/`, holding the
//! package's `meta` and `manifest` files, plus a flat `state/installed.index`
//! append log used for quick enumeration. Every write is whole-file: a
//! record is written to a temp file in the same directory and renamed into
//! place, so a crash can never leave a half-written record behind.

use std::fs;
use std::io::Write as _;
use std::path::PathBuf;

use tracing::info;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::package::ParsedMeta;

/// A registered package's on-disk record.
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    pub meta: ParsedMeta,
    pub manifest: String,
    /// The package's own post-remove hook, if its archive carried one.
    pub post_remove: Option<String>,
}

/// Register a newly installed package: write its directory under
/// `state/pkgs/<name>/` and append its name to `installed.index`.
pub fn register(config: &Config, meta: &ParsedMeta, manifest: &str, post_remove: Option<&str>) -> Result<()> {
    let dir = config.pkgs_dir().join(&meta.name);
    fs::create_dir_all(&dir)?;

    write_atomic(&dir.join("meta"), &render_meta(meta))?;
    write_atomic(&dir.join("manifest"), manifest)?;
    if let Some(script) = post_remove {
        write_atomic(&dir.join("post-remove"), script)?;
        make_executable(&dir.join("post-remove"))?;
    }

    append_index(config, &meta.name)?;
    info!(package = %meta.name, "registered package");
    Ok(())
}

#[cfg(unix)]
fn make_executable(path: &std::path::Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(perms.mode() | 0o111);
    fs::set_permissions(path, perms)?;
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &std::path::Path) -> Result<()> {
    Ok(())
}

/// Remove a package's registry directory and prune it from the index.
pub fn unregister(config: &Config, name: &str) -> Result<()> {
    let dir = config.pkgs_dir().join(name);
    if !dir.exists() {
        return Err(Error::NotInstalled(name.to_string()));
    }
    fs::remove_dir_all(&dir)?;
    prune_index(config, name)?;
    info!(package = %name, "unregistered package");
    Ok(())
}

/// Look up a registered package by its bare name.
pub fn lookup(config: &Config, name: &str) -> Result<RegistryEntry> {
    let dir = config.pkgs_dir().join(name);
    if !dir.is_dir() {
        return Err(Error::NotInstalled(name.to_string()));
    }
    let meta = crate::package::parse_meta(&fs::read_to_string(dir.join("meta"))?)?;
    let manifest = fs::read_to_string(dir.join("manifest"))?;
    let post_remove = fs::read_to_string(dir.join("post-remove")).ok();
    Ok(RegistryEntry { meta, manifest, post_remove })
}

/// Enumerate every registered package name, from the index file (falling
/// back to a directory scan if the index is missing).
pub fn list(config: &Config) -> Result<Vec<String>> {
    let index = config.installed_index();
    if index.is_file() {
        let content = fs::read_to_string(&index)?;
        return Ok(content.lines().map(str::to_string).filter(|l| !l.is_empty()).collect());
    }

    let pkgs_dir = config.pkgs_dir();
    if !pkgs_dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut names: Vec<String> = fs::read_dir(pkgs_dir)?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .filter_map(|e| e.file_name().to_str().map(str::to_string))
        .collect();
    names.sort();
    Ok(names)
}

fn append_index(config: &Config, name: &str) -> Result<()> {
    let index = config.installed_index();
    if let Some(parent) = index.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut existing = if index.is_file() { fs::read_to_string(&index)? } else { String::new() };
    if existing.lines().any(|l| l == name) {
        return Ok(());
    }
    if !existing.is_empty() && !existing.ends_with('\n') {
        existing.push('\n');
    }
    existing.push_str(name);
    existing.push('\n');
    write_atomic(&index, &existing)
}

fn prune_index(config: &Config, name: &str) -> Result<()> {
    let index = config.installed_index();
    if !index.is_file() {
        return Ok(());
    }
    let content = fs::read_to_string(&index)?;
    let remaining: Vec<&str> = content.lines().filter(|l| *l != name).collect();
    let mut rendered = remaining.join("\n");
    if !rendered.is_empty() {
        rendered.push('\n');
    }
    write_atomic(&index, &rendered)
}

fn render_meta(meta: &ParsedMeta) -> String {
    format!(
        "name={}\nversion={}\nrelease={}\narch={}\nprefix={}\n",
        meta.name,
        meta.version,
        meta.release,
        meta.arch,
        meta.prefix.display(),
    )
}

/// Write `content` to `path` via a temp-file-then-rename in the same
/// directory, so a reader never observes a partially written file.
fn write_atomic(path: &std::path::Path, content: &str) -> Result<()> {
    let parent = path.parent().ok_or_else(|| Error::Pack("write target has no parent directory".to_string()))?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(Error::Io)?;
    tmp.write_all(content.as_bytes()).map_err(Error::Io)?;
    tmp.flush().map_err(Error::Io)?;
    let final_path: PathBuf = path.to_path_buf();
    tmp.persist(&final_path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::Compression;
    use crate::config::ToolchainProfile;

    fn test_config(base: &std::path::Path) -> Config {
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

    fn test_meta() -> ParsedMeta {
        ParsedMeta {
            name: "hello".into(),
            version: "1.0".into(),
            release: "1".into(),
            arch: "x86_64".into(),
            prefix: PathBuf::from("/usr"),
        }
    }

    #[test]
    fn register_then_lookup_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        config.init_layout().unwrap();

        register(&config, &test_meta(), "./bin/hello\n", None).unwrap();
        let entry = lookup(&config, "hello").unwrap();
        assert_eq!(entry.meta.name, "hello");
        assert_eq!(entry.manifest, "./bin/hello\n");
    }

    #[test]
    fn list_reflects_registered_packages() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        config.init_layout().unwrap();

        register(&config, &test_meta(), "", None).unwrap();
        assert_eq!(list(&config).unwrap(), vec!["hello".to_string()]);
    }

    #[test]
    fn unregister_removes_from_index_and_store() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        config.init_layout().unwrap();

        register(&config, &test_meta(), "", None).unwrap();
        unregister(&config, "hello").unwrap();

        assert!(list(&config).unwrap().is_empty());
        assert!(lookup(&config, "hello").is_err());
    }

    #[test]
    fn unregister_missing_package_is_not_installed_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        config.init_layout().unwrap();

        let err = unregister(&config, "nope").unwrap_err();
        assert!(matches!(err, Error::NotInstalled(_)));
    }
}
