// src/recipe/format.rs

//! Recipe file format definitions (§3, §4.B)
//!
//! Recipes are TOML files describing how to build a package from source.

use serde::{Deserialize, Serialize};

/// A complete recipe for building a package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub package: PackageSection,

    #[serde(default)]
    pub source: SourceSection,

    #[serde(default, rename = "patches")]
    pub patches: Vec<PatchEntry>,

    #[serde(default)]
    pub phases: PhasesSection,
}

/// Package metadata section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageSection {
    /// Package name. Required, non-empty.
    pub name: String,

    /// Package version. Required, non-empty.
    pub version: String,

    /// Release number (for rebuilds of the same version).
    #[serde(default = "default_release")]
    pub release: String,

    /// Target architecture; defaults to the host machine tag if absent.
    #[serde(default)]
    pub arch: Option<String>,
}

fn default_release() -> String {
    "1".to_string()
}

/// Source archives and their integrity hashes.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SourceSection {
    /// Ordered source URLs; at least one is required once the recipe is
    /// validated (§4.B).
    #[serde(default)]
    pub urls: Vec<String>,

    /// Hex SHA-256 hashes aligned positionally with `urls`. An empty
    /// string at a given index means "unverified" for that source. The
    /// whole list may also be shorter than `urls` or entirely absent,
    /// which means every source is unverified.
    #[serde(default)]
    pub hashes: Vec<String>,
}

impl SourceSection {
    /// The hash for the i-th source, if the recipe provided one.
    pub fn hash_for(&self, index: usize) -> Option<&str> {
        self.hashes.get(index).map(String::as_str).filter(|h| !h.is_empty())
    }
}

/// A single patch entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchEntry {
    /// Local path to the patch file, relative to the recipe file's directory
    /// unless absolute.
    pub path: String,
}

/// The four build phases, bound either to a user script or a default
/// (§4.F, Design Notes "Dynamic phase dispatch").
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PhasesSection {
    #[serde(default)]
    pub prepare: Option<String>,
    #[serde(default)]
    pub build: Option<String>,
    #[serde(default)]
    pub check: Option<String>,
    #[serde(default)]
    pub package: Option<String>,
}

/// Which of the four phases is being run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseKind {
    Prepare,
    Build,
    Check,
    Package,
}

impl PhaseKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Prepare => "prepare",
            Self::Build => "build",
            Self::Check => "check",
            Self::Package => "package",
        }
    }

    /// Soft phases swallow a non-zero exit; hard phases abort the pipeline.
    pub fn is_soft(&self) -> bool {
        matches!(self, Self::Prepare | Self::Check)
    }
}

/// A phase action: either the recipe's own script, or the engine's default
/// for that phase. Defaults and user-supplied scripts are two variants of
/// the same type, per the Design Notes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseAction {
    Default,
    Custom(String),
}

impl PhasesSection {
    pub fn action(&self, kind: PhaseKind) -> PhaseAction {
        let script = match kind {
            PhaseKind::Prepare => &self.prepare,
            PhaseKind::Build => &self.build,
            PhaseKind::Check => &self.check,
            PhaseKind::Package => &self.package,
        };
        match script {
            Some(s) => PhaseAction::Custom(s.clone()),
            None => PhaseAction::Default,
        }
    }
}

impl Recipe {
    /// The package's archive base name, e.g. `hello-1.0-1`.
    pub fn package_stem(&self) -> String {
        format!("{}-{}-{}", self.package.name, self.package.version, self.package.release)
    }

    /// The effective architecture tag: the recipe's override, or the host
    /// machine tag.
    pub fn effective_arch(&self) -> String {
        self.package.arch.clone().unwrap_or_else(|| crate::config::host_arch().to_string())
    }

    /// The package archive filename: `<name>-<version>-<release>.<arch>.ppkg`.
    pub fn archive_filename(&self) -> String {
        format!("{}.{}.ppkg", self.package_stem(), self.effective_arch())
    }

    /// The canonical source directory name under the build area:
    /// `<name>-<version>`.
    pub fn source_dir_name(&self) -> String {
        format!("{}-{}", self.package.name, self.package.version)
    }
}
