// src/build.rs

//! Build pipeline orchestration (§4.B)
//!
//! Drives a recipe through fetch → extract → patch → prepare → build →
//! check → package → strip, reporting each stage through a
//! [`StatusReporter`]. This is the engine behind the `run` subcommand.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::recipe::{PhaseKind, Recipe};
use crate::status::StatusReporter;

/// Everything the pipeline produced, for callers that want to inspect it
/// (tests, `pack`).
pub struct BuildOutcome {
    pub source_dir: PathBuf,
    pub stage_dir: PathBuf,
    pub archive_path: PathBuf,
    pub stripped_files: usize,
}

/// Run the full pipeline for `recipe`, whose file lives in `recipe_dir`.
///
/// The build tree and stage tree are destroyed and recreated at the start
/// of every run (§3), so a retried build never inherits files left over
/// from a prior attempt.
pub fn run(recipe: &Recipe, recipe_dir: &Path, config: &Config, reporter: &dyn StatusReporter) -> Result<BuildOutcome> {
    config.init_layout()?;

    let extract_dest = config.build_dir();
    let stage_dir = config.stage_dir().join(recipe.package_stem());
    reset_dir(&extract_dest)?;
    reset_dir(&stage_dir)?;

    reporter.begin_stage("fetch");
    let sources = crate::fetch::fetch_all(&config.sources_dir(), recipe, config.download_retries)?;
    for source in &sources {
        if !source.verified {
            reporter.message(&format!("warning: {} fetched without verification", source.url));
        }
    }
    reporter.finish_stage("fetch");

    reporter.begin_stage("extract");
    for source in &sources {
        crate::extract::extract(&source.path, &extract_dest)?;
    }
    let source_dir = crate::extract::resolve_source_dir(&extract_dest, recipe)?;
    reporter.finish_stage("extract");

    reporter.begin_stage("patch");
    crate::patch::apply_all(&source_dir, recipe_dir, &recipe.patches)?;
    reporter.finish_stage("patch");

    let log_path = config.logs_dir().join(format!("{}.log", recipe.package_stem()));

    for kind in [PhaseKind::Prepare, PhaseKind::Build, PhaseKind::Check, PhaseKind::Package] {
        reporter.begin_stage(kind.name());
        match crate::phase::run_phase(kind, recipe, config, &source_dir, &stage_dir, &log_path) {
            Ok(()) => reporter.finish_stage(kind.name()),
            Err(e) => {
                reporter.fail_stage(kind.name(), &e.to_string());
                return Err(e);
            }
        }
    }

    let stripped_files = if config.strip {
        reporter.begin_stage("strip");
        let count = crate::strip::strip_tree(&stage_dir)?;
        reporter.finish_stage("strip");
        count
    } else {
        0
    };

    reporter.begin_stage("pack");
    let archive_path = crate::package::build_package(&stage_dir, recipe, recipe_dir, config)?;
    reporter.finish_stage("pack");

    info!(archive = %archive_path.display(), "build complete");

    Ok(BuildOutcome { source_dir, stage_dir, archive_path, stripped_files })
}

/// Remove `dir` if it exists and recreate it empty.
fn reset_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        std::fs::remove_dir_all(dir)?;
    }
    std::fs::create_dir_all(dir)?;
    Ok(())
}
