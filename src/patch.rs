// src/patch.rs

//! Patcher (§4.E)
//!
//! Applies the recipe's local patches, in order, against the resolved
//! source directory by shelling out to `patch`.

use std::path::Path;
use std::process::Command;

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::recipe::PatchEntry;

/// Apply every patch in order against `source_dir`. A missing patch file is
/// the recipe author's choice, not an error, and is silently skipped
/// (§4.E, §7). Stops at the first patch that fails to *apply* (§4.E hard
/// failure).
pub fn apply_all(source_dir: &Path, recipe_dir: &Path, patches: &[PatchEntry]) -> Result<()> {
    for patch in patches {
        let path = crate::config::resolve_relative(&patch.path, recipe_dir);
        apply_one(source_dir, &path)?;
    }
    Ok(())
}

fn apply_one(source_dir: &Path, patch_path: &Path) -> Result<()> {
    if !patch_path.is_file() {
        warn!(patch = %patch_path.display(), "patch file not found, skipping");
        return Ok(());
    }

    info!(patch = %patch_path.display(), "applying patch");

    let status = Command::new("patch")
        .arg("-p1")
        .arg("-i")
        .arg(patch_path)
        .current_dir(source_dir)
        .status()
        .map_err(|e| Error::Patch(format!("failed to invoke patch: {e}")))?;

    if !status.success() {
        return Err(Error::Patch(format!("{} failed to apply (status {status})", patch_path.display())));
    }
    Ok(())
}
