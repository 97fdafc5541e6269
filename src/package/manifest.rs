// src/package/manifest.rs

//! Stage tree manifest (§4.H)
//!
//! Walks a staged install tree depth-first, visiting each directory's
//! children in lexicographic order, producing a manifest whose ordering is
//! deterministic and reproducible across machines and runs. Directories
//! themselves are not owned entries; only the files and symlinks a package
//! installs are recorded, as plain `./`-prefixed paths.

use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::Result;

/// What kind of filesystem entry a manifest entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Symlink,
}

/// One entry in a package manifest, describing a path relative to the
/// install root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub path: PathBuf,
    pub kind: EntryKind,
    /// SHA-256 of file contents; present only for `EntryKind::File`.
    pub hash: Option<String>,
    /// Symlink target; present only for `EntryKind::Symlink`.
    pub link_target: Option<PathBuf>,
}

/// Build the manifest for `stage_dir`, with every path relative to it.
/// Directories are walked to reach their contents but are not themselves
/// recorded.
pub fn build_manifest(stage_dir: &Path) -> Result<Vec<ManifestEntry>> {
    let mut entries = Vec::new();
    walk(stage_dir, Path::new(""), &mut entries)?;
    Ok(entries)
}

fn walk(root: &Path, rel: &Path, out: &mut Vec<ManifestEntry>) -> Result<()> {
    let dir = root.join(rel);
    let mut children: Vec<_> = fs::read_dir(&dir)?.filter_map(|e| e.ok()).collect();
    children.sort_by_key(|e| e.file_name());

    for child in children {
        let child_rel = rel.join(child.file_name());
        let meta = fs::symlink_metadata(root.join(&child_rel))?;

        if meta.file_type().is_symlink() {
            let target = fs::read_link(root.join(&child_rel))?;
            out.push(ManifestEntry { path: child_rel, kind: EntryKind::Symlink, hash: None, link_target: Some(target) });
        } else if meta.is_dir() {
            walk(root, &child_rel, out)?;
        } else {
            let hash = hash_file(&root.join(&child_rel))?;
            out.push(ManifestEntry { path: child_rel, kind: EntryKind::File, hash: Some(hash), link_target: None });
        }
    }
    Ok(())
}

fn hash_file(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    let digest = Sha256::digest(&bytes);
    Ok(digest.iter().map(|b| format!("{b:02x}")).collect())
}

/// Render the manifest in the `CONTROL/manifest` text format: one
/// `./`-prefixed path per line, files and symlinks only.
pub fn render_manifest(entries: &[ManifestEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        out.push_str("./");
        out.push_str(&entry.path.display().to_string());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_is_depth_first_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("b")).unwrap();
        fs::create_dir_all(dir.path().join("a/sub")).unwrap();
        fs::write(dir.path().join("a/file.txt"), b"x").unwrap();
        fs::write(dir.path().join("a/sub/deep.txt"), b"y").unwrap();
        fs::write(dir.path().join("b/file.txt"), b"z").unwrap();

        let entries = build_manifest(dir.path()).unwrap();
        let paths: Vec<String> = entries.iter().map(|e| e.path.display().to_string()).collect();

        assert_eq!(paths, vec!["a/file.txt", "a/sub/deep.txt", "b/file.txt"]);
    }

    #[test]
    fn file_entries_carry_sha256() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("hello.txt"), b"hello").unwrap();
        let entries = build_manifest(dir.path()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, EntryKind::File);
        assert!(entries[0].hash.is_some());
    }

    #[test]
    fn render_format_is_bare_dot_slash_paths() {
        let entries = vec![
            ManifestEntry { path: PathBuf::from("bin/hello"), kind: EntryKind::File, hash: Some("abc123".into()), link_target: None },
            ManifestEntry { path: PathBuf::from("lib/libhello.so"), kind: EntryKind::Symlink, hash: None, link_target: Some(PathBuf::from("libhello.so.1")) },
        ];
        let rendered = render_manifest(&entries);
        assert_eq!(rendered, "./bin/hello\n./lib/libhello.so\n");
    }
}
