// src/strip.rs

//! Post-stage processor (§4.G)
//!
//! Walks the staged tree after `package` and strips debug symbols from ELF
//! binaries and shared objects, when stripping is enabled. A file is
//! considered strippable only if it carries the executable permission bit
//! *and* parses as an ELF executable or shared object (`goblin`), so
//! non-executable relocatable objects (`.o`, `.ko`) and non-ELF files
//! (scripts, data) are never handed to `strip`.

use std::path::Path;
use std::process::Command;

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::Result;

/// Strip every ELF regular file under `stage_dir`. Best-effort: a file that
/// `strip` refuses (e.g. a static archive misdetected as ELF) is logged and
/// skipped rather than aborting the whole pass.
pub fn strip_tree(stage_dir: &Path) -> Result<usize> {
    let mut stripped = 0;
    for entry in WalkDir::new(stage_dir).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        if !entry.file_type().is_file() {
            continue;
        }
        if !is_executable(path) {
            continue;
        }
        if !is_elf(path) {
            continue;
        }
        match strip_file(path) {
            Ok(()) => stripped += 1,
            Err(e) => warn!(file = %path.display(), "failed to strip: {e}"),
        }
    }
    Ok(stripped)
}

/// Whether `path` carries the executable permission bit for its owner,
/// group, or other (§4.G: permission bit plus file-type probe).
#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path).map(|m| m.permissions().mode() & 0o111 != 0).unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> bool {
    true
}

/// Probe whether `path` is an ELF executable or shared object, parsed with
/// `goblin`. Relocatable objects (`ET_REL`, e.g. `.o`/`.ko`) are excluded:
/// they're never meant to run standalone and stripping them the same way
/// as a binary can break later linking.
fn is_elf(path: &Path) -> bool {
    let Ok(bytes) = std::fs::read(path) else { return false };
    let Ok(elf) = goblin::elf::Elf::parse(&bytes) else { return false };
    matches!(elf.header.e_type, goblin::elf::header::ET_EXEC | goblin::elf::header::ET_DYN)
}

fn strip_file(path: &Path) -> Result<()> {
    debug!(file = %path.display(), "stripping debug symbols");
    let status = Command::new("strip").arg("--strip-unneeded").arg(path).status()?;
    if !status.success() {
        return Err(crate::error::Error::Phase {
            phase: "package".to_string(),
            reason: format!("strip exited with status {status} for {}", path.display()),
        });
    }
    Ok(())
}
