// src/extract.rs

//! Extractor (§4.D)
//!
//! Unpacks a fetched source archive into the build area, shelling out to
//! `tar` (and `unzip`/`zstd` for the formats `tar` itself can't always
//! handle), then resolves the canonical source directory.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::compression::ArchiveKind;
use crate::error::{Error, Result};

/// Extract `archive` into `dest_dir`, creating it if needed.
pub fn extract(archive: &Path, dest_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dest_dir)?;
    let filename = archive.file_name().and_then(|f| f.to_str()).unwrap_or_default();
    let kind = ArchiveKind::from_filename(filename);

    debug!(archive = %archive.display(), ?kind, "extracting source archive");

    match kind {
        ArchiveKind::Zip => extract_zip(archive, dest_dir),
        ArchiveKind::TarZstd => extract_tar_zstd(archive, dest_dir),
        _ => extract_tar(archive, dest_dir, kind.tar_flag()),
    }
}

fn extract_tar(archive: &Path, dest_dir: &Path, flag: Option<&str>) -> Result<()> {
    let mut cmd = Command::new("tar");
    if let Some(flag) = flag {
        cmd.arg(flag);
    }
    cmd.arg("-xf").arg(archive).arg("-C").arg(dest_dir);
    run_extractor(cmd)
}

/// Extract a `.tar.zst` archive. Prefers `tar --zstd`, falling back to a
/// two-stage `zstd -d | tar -x` pipeline when the installed `tar` doesn't
/// support the flag.
fn extract_tar_zstd(archive: &Path, dest_dir: &Path) -> Result<()> {
    let mut cmd = Command::new("tar");
    cmd.arg("--zstd").arg("-xf").arg(archive).arg("-C").arg(dest_dir);
    if run_extractor(cmd).is_ok() {
        return Ok(());
    }

    debug!("tar --zstd unsupported, falling back to standalone zstd decompressor");
    let tar_path = dest_dir.join(".mbuild-decompressed.tar");
    let status = Command::new("zstd")
        .arg("-d")
        .arg("-f")
        .arg("-o")
        .arg(&tar_path)
        .arg(archive)
        .status()
        .map_err(|e| Error::Extract(format!("failed to invoke zstd: {e}")))?;
    if !status.success() {
        return Err(Error::Extract(format!("zstd exited with status {status}")));
    }
    let result = extract_tar(&tar_path, dest_dir, None);
    let _ = std::fs::remove_file(&tar_path);
    result
}

fn extract_zip(archive: &Path, dest_dir: &Path) -> Result<()> {
    let status = Command::new("unzip")
        .arg("-q")
        .arg("-o")
        .arg(archive)
        .arg("-d")
        .arg(dest_dir)
        .status()
        .map_err(|e| Error::Extract(format!("failed to invoke unzip: {e}")))?;
    if !status.success() {
        return Err(Error::Extract(format!("unzip exited with status {status}")));
    }
    Ok(())
}

fn run_extractor(mut cmd: Command) -> Result<()> {
    let status = cmd.status().map_err(|e| Error::Extract(format!("failed to invoke tar: {e}")))?;
    if !status.success() {
        return Err(Error::Extract(format!("tar exited with status {status}")));
    }
    Ok(())
}

/// Resolve the canonical source directory after extraction: the recipe's
/// expected `<name>-<version>` directory if present, otherwise the single
/// top-level entry the archive unpacked into (§4.D).
pub fn resolve_source_dir(dest_dir: &Path, recipe: &crate::recipe::Recipe) -> Result<PathBuf> {
    let expected = dest_dir.join(recipe.source_dir_name());
    if expected.is_dir() {
        return Ok(expected);
    }

    let mut entries: Vec<PathBuf> = std::fs::read_dir(dest_dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    entries.sort();

    match entries.len() {
        0 => Err(Error::Extract(format!(
            "no source directory found under {} after extraction",
            dest_dir.display()
        ))),
        1 => Ok(entries.remove(0)),
        _ => {
            let prefix = format!("{}-", recipe.package.name);
            entries
                .into_iter()
                .find(|p| p.file_name().and_then(|n| n.to_str()).is_some_and(|n| n.starts_with(&prefix)))
                .ok_or_else(|| {
                    Error::Extract(format!(
                        "multiple top-level directories under {} and none match '{prefix}*'",
                        dest_dir.display()
                    ))
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::{PackageSection, PhasesSection, Recipe, SourceSection};

    fn recipe(name: &str, version: &str) -> Recipe {
        Recipe {
            package: PackageSection { name: name.into(), version: version.into(), release: "1".into(), arch: None },
            source: SourceSection::default(),
            patches: Vec::new(),
            phases: PhasesSection::default(),
        }
    }

    #[test]
    fn resolves_expected_directory_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("hello-1.0")).unwrap();
        let resolved = resolve_source_dir(dir.path(), &recipe("hello", "1.0")).unwrap();
        assert_eq!(resolved, dir.path().join("hello-1.0"));
    }

    #[test]
    fn falls_back_to_sole_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("hello-source")).unwrap();
        let resolved = resolve_source_dir(dir.path(), &recipe("hello", "1.0")).unwrap();
        assert_eq!(resolved, dir.path().join("hello-source"));
    }

    #[test]
    fn errors_on_ambiguous_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("unrelated-a")).unwrap();
        std::fs::create_dir(dir.path().join("unrelated-b")).unwrap();
        assert!(resolve_source_dir(dir.path(), &recipe("hello", "1.0")).is_err());
    }
}
