// src/package/archive.rs

//! Packager (§4.H)
//!
//! Assembles a staged install tree plus recipe metadata into a `.ppkg`
//! archive: a compressed tar of `CONTROL/meta`, `CONTROL/manifest`, an
//! optional `CONTROL/post-remove` hook, and the staged tree's own
//! top-level entries sitting alongside `CONTROL` at the archive root.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::info;

use crate::compression::Compression;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::recipe::Recipe;

use super::manifest::{build_manifest, render_manifest};

/// Package metadata written to `CONTROL/meta`: exactly the keys `name`,
/// `version`, `release`, `arch`, `prefix`.
pub struct Meta<'a> {
    pub name: &'a str,
    pub version: &'a str,
    pub release: &'a str,
    pub arch: String,
    pub prefix: &'a Path,
}

/// A parsed `CONTROL/meta` file, owning its strings (unlike [`Meta`], which
/// borrows from a [`Recipe`] at package-build time).
#[derive(Debug, Clone)]
pub struct ParsedMeta {
    pub name: String,
    pub version: String,
    pub release: String,
    pub arch: String,
    pub prefix: PathBuf,
}

impl ParsedMeta {
    pub fn stem(&self) -> String {
        format!("{}-{}-{}", self.name, self.version, self.release)
    }
}

/// Parse a `CONTROL/meta` file's `key=value` lines.
pub fn parse_meta(content: &str) -> Result<ParsedMeta> {
    let mut fields = std::collections::HashMap::new();
    for line in content.lines() {
        if let Some((key, value)) = line.split_once('=') {
            fields.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    let get = |key: &str| -> Result<String> {
        fields.get(key).cloned().ok_or_else(|| Error::Pack(format!("CONTROL/meta missing field: {key}")))
    };
    Ok(ParsedMeta {
        name: get("name")?,
        version: get("version")?,
        release: get("release")?,
        arch: get("arch")?,
        prefix: PathBuf::from(get("prefix")?),
    })
}

impl<'a> Meta<'a> {
    fn render(&self) -> String {
        format!(
            "name={}\nversion={}\nrelease={}\narch={}\nprefix={}\n",
            self.name,
            self.version,
            self.release,
            self.arch,
            self.prefix.display(),
        )
    }
}

/// Build a `.ppkg` archive from `stage_dir` for `recipe`, writing it under
/// `config.packages_dir()`. Returns the archive's path.
pub fn build_package(stage_dir: &Path, recipe: &Recipe, recipe_dir: &Path, config: &Config) -> Result<PathBuf> {
    let assembly_dir = tempfile::tempdir().map_err(Error::Io)?;
    let control_dir = assembly_dir.path().join("CONTROL");
    fs::create_dir_all(&control_dir)?;

    let manifest = build_manifest(stage_dir)?;
    fs::write(control_dir.join("manifest"), render_manifest(&manifest))?;

    let meta = Meta {
        name: &recipe.package.name,
        version: &recipe.package.version,
        release: &recipe.package.release,
        arch: recipe.effective_arch(),
        prefix: &config.prefix,
    };
    fs::write(control_dir.join("meta"), meta.render())?;

    let post_remove_src = recipe_dir.join("post-remove");
    if post_remove_src.is_file() {
        fs::copy(&post_remove_src, control_dir.join("post-remove"))?;
        set_executable(&control_dir.join("post-remove"))?;
    }

    // Merge the staged tree's own top-level entries directly into the
    // assembly root, alongside CONTROL, so the payload sits at the
    // archive's top level rather than under a synthetic data/ directory.
    let mut payload_entries = Vec::new();
    if stage_dir.is_dir() {
        for entry in fs::read_dir(stage_dir)? {
            let entry = entry?;
            let name = entry.file_name();
            copy_tree(&entry.path(), &assembly_dir.path().join(&name))?;
            if let Some(name) = name.to_str() {
                payload_entries.push(name.to_string());
            }
        }
    }
    payload_entries.sort();

    fs::create_dir_all(config.packages_dir())?;
    let archive_path = config.packages_dir().join(recipe.archive_filename());
    assemble_tar(assembly_dir.path(), &archive_path, config.pkg_comp, &payload_entries)?;

    info!(archive = %archive_path.display(), "built package archive");
    Ok(archive_path)
}

fn assemble_tar(assembly_dir: &Path, archive_path: &Path, compression: Compression, payload_entries: &[String]) -> Result<()> {
    let mut cmd = Command::new("tar");
    if let Some(flag) = compression.tar_flag() {
        cmd.arg(flag);
    }
    cmd.arg("-cf").arg(archive_path).arg("-C").arg(assembly_dir).arg("CONTROL");
    cmd.args(payload_entries);
    let status = cmd.status().map_err(|e| Error::Pack(format!("failed to invoke tar: {e}")))?;
    if !status.success() {
        return Err(Error::Pack(format!("tar exited with status {status}")));
    }
    Ok(())
}

fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    let meta = fs::symlink_metadata(src)?;
    if meta.file_type().is_symlink() {
        let link = fs::read_link(src)?;
        #[cfg(unix)]
        std::os::unix::fs::symlink(&link, dst)?;
    } else if meta.is_dir() {
        fs::create_dir_all(dst)?;
        for entry in fs::read_dir(src)? {
            let entry = entry?;
            copy_tree(&entry.path(), &dst.join(entry.file_name()))?;
        }
    } else {
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(src, dst)?;
    }
    Ok(())
}

#[cfg(unix)]
fn set_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(perms.mode() | 0o111);
    fs::set_permissions(path, perms)?;
    Ok(())
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> Result<()> {
    Ok(())
}
