// src/phase.rs

//! Phase runner (§4.F)
//!
//! Runs one of the four build phases, either the recipe's own script or
//! the engine's default action for that phase, inside the source
//! directory, with the toolchain and staging environment exported.
//! Output is captured to a per-build log file; soft phases (`prepare`,
//! `check`) log and continue on failure, hard phases (`build`, `package`)
//! abort the pipeline.

use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::Path;
use std::process::{Command, Stdio};

use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::recipe::{PhaseAction, PhaseKind, Recipe};

/// Run `kind` for `recipe` inside `source_dir`, appending captured output
/// to `log_path`. `stage_dir` is only meaningful for the `package` phase.
pub fn run_phase(
    kind: PhaseKind,
    recipe: &Recipe,
    config: &Config,
    source_dir: &Path,
    stage_dir: &Path,
    log_path: &Path,
) -> Result<()> {
    let action = recipe.phases.action(kind);
    let script = match &action {
        PhaseAction::Custom(script) => script.clone(),
        PhaseAction::Default => default_script(kind, config),
    };

    info!(phase = kind.name(), "running phase");

    let mut command = Command::new("sh");
    command
        .arg("-c")
        .arg(&script)
        .current_dir(source_dir)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    for (key, value) in config.toolchain_env() {
        command.env(key, value);
    }
    command.env("JOBS", config.jobs.to_string());
    command.env("PREFIX", &config.prefix);
    command.env("DESTDIR", stage_dir);
    command.env("CFLAGS", std::env::var("CFLAGS").unwrap_or_default());
    command.env("LDFLAGS", std::env::var("LDFLAGS").unwrap_or_default());

    let output = command
        .output()
        .map_err(|e| Error::Phase { phase: kind.name().to_string(), reason: format!("failed to spawn shell: {e}") })?;

    log_output(log_path, kind, &script, &output)?;

    if output.status.success() {
        return Ok(());
    }

    let reason = format!("exited with status {}", output.status);
    if kind.is_soft() {
        warn!(phase = kind.name(), "{reason}; continuing (soft phase)");
        Ok(())
    } else {
        error!(phase = kind.name(), "{reason}");
        Err(Error::Phase { phase: kind.name().to_string(), reason })
    }
}

/// The engine's default action for a phase when the recipe doesn't
/// override it.
fn default_script(kind: PhaseKind, config: &Config) -> String {
    match kind {
        PhaseKind::Prepare => "true".to_string(),
        PhaseKind::Build => format!(
            "if [ -x ./configure ]; then ./configure --prefix={}; fi && make -j{}",
            config.prefix.display(),
            config.jobs
        ),
        PhaseKind::Check => "make -k check".to_string(),
        PhaseKind::Package => "make DESTDIR=\"$DESTDIR\" install".to_string(),
    }
}

fn log_output(log_path: &Path, kind: PhaseKind, script: &str, output: &std::process::Output) -> Result<()> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(log_path)?;
    writeln!(file, "=== phase: {} ===", kind.name())?;
    writeln!(file, "--- script ---\n{script}")?;
    writeln!(file, "--- stdout ---\n{}", String::from_utf8_lossy(&output.stdout))?;
    writeln!(file, "--- stderr ---\n{}", String::from_utf8_lossy(&output.stderr))?;
    writeln!(file, "--- status: {} ---\n", output.status)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::Compression;
    use crate::config::ToolchainProfile;
    use crate::recipe::{PackageSection, PhasesSection, SourceSection};

    fn test_config(base: &Path) -> Config {
        Config {
            base: base.to_path_buf(),
            root: base.join("root"),
            prefix: base.join("usr"),
            jobs: 1,
            pkg_comp: Compression::None,
            toolchain: ToolchainProfile::System,
            strip: false,
            download_retries: 1,
        }
    }

    fn test_recipe(phases: PhasesSection) -> Recipe {
        Recipe {
            package: PackageSection { name: "hello".into(), version: "1.0".into(), release: "1".into(), arch: None },
            source: SourceSection::default(),
            patches: Vec::new(),
            phases,
        }
    }

    #[test]
    fn custom_script_runs_and_logs() {
        let dir = tempfile::tempdir().unwrap();
        let source_dir = dir.path().join("src");
        std::fs::create_dir_all(&source_dir).unwrap();
        let stage_dir = dir.path().join("stage");
        let log_path = dir.path().join("log.txt");

        let recipe = test_recipe(PhasesSection {
            prepare: Some("echo hi > marker.txt".into()),
            ..Default::default()
        });
        let config = test_config(dir.path());

        run_phase(PhaseKind::Prepare, &recipe, &config, &source_dir, &stage_dir, &log_path).unwrap();
        assert!(source_dir.join("marker.txt").exists());
        assert!(log_path.exists());
    }

    #[test]
    fn soft_phase_swallows_failure() {
        let dir = tempfile::tempdir().unwrap();
        let source_dir = dir.path().join("src");
        std::fs::create_dir_all(&source_dir).unwrap();
        let stage_dir = dir.path().join("stage");
        let log_path = dir.path().join("log.txt");

        let recipe = test_recipe(PhasesSection { check: Some("exit 1".into()), ..Default::default() });
        let config = test_config(dir.path());

        assert!(run_phase(PhaseKind::Check, &recipe, &config, &source_dir, &stage_dir, &log_path).is_ok());
    }

    #[test]
    fn hard_phase_propagates_failure() {
        let dir = tempfile::tempdir().unwrap();
        let source_dir = dir.path().join("src");
        std::fs::create_dir_all(&source_dir).unwrap();
        let stage_dir = dir.path().join("stage");
        let log_path = dir.path().join("log.txt");

        let recipe = test_recipe(PhasesSection { build: Some("exit 1".into()), ..Default::default() });
        let config = test_config(dir.path());

        let err = run_phase(PhaseKind::Build, &recipe, &config, &source_dir, &stage_dir, &log_path).unwrap_err();
        assert!(matches!(err, Error::Phase { .. }));
    }
}
