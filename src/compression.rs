// src/compression.rs

//! Package archive compression (§4.H, Design Notes "Archive format dispatch")
//!
//! Supported compressions are a closed enumeration; each maps to a `tar`
//! flag at compile time rather than being dispatched dynamically. Unknown
//! configuration values degrade to [`Compression::None`] with a warning at
//! configuration load time, not at package time.

use tracing::warn;

/// Supported package archive compressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    None,
    Gzip,
    Bzip2,
    Xz,
    #[default]
    Zstd,
}

impl Compression {
    /// Parse a `pkg_comp` configuration value, degrading unknown values to
    /// `None` with a logged warning (resolved at config time per the
    /// Design Notes, not when a package is actually assembled).
    pub fn from_config_value(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "none" | "" => Self::None,
            "gz" | "gzip" => Self::Gzip,
            "bz2" | "bzip2" => Self::Bzip2,
            "xz" => Self::Xz,
            "zst" | "zstd" => Self::Zstd,
            other => {
                warn!("unknown package compression '{other}', falling back to no compression");
                Self::None
            }
        }
    }

    /// The `tar` flag selecting this compression when creating or
    /// extracting an archive, honoring the subprocess contract of §6.
    pub fn tar_flag(&self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Gzip => Some("-z"),
            Self::Bzip2 => Some("-j"),
            Self::Xz => Some("-J"),
            Self::Zstd => Some("--zstd"),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Gzip => "gzip",
            Self::Bzip2 => "bzip2",
            Self::Xz => "xz",
            Self::Zstd => "zstd",
        }
    }
}

impl std::fmt::Display for Compression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Archive extension dispatch for the extractor (§4.D). Each case maps to
/// how the source archive must be unpacked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    TarGzip,
    TarBzip2,
    TarXz,
    TarZstd,
    Tar,
    Zip,
}

impl ArchiveKind {
    /// Detect archive kind from a source filename. Falls back to plain
    /// `tar` when no recognized compression suffix is present.
    pub fn from_filename(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Self::TarGzip
        } else if lower.ends_with(".tar.bz2") || lower.ends_with(".tbz2") {
            Self::TarBzip2
        } else if lower.ends_with(".tar.xz") || lower.ends_with(".txz") {
            Self::TarXz
        } else if lower.ends_with(".tar.zst") || lower.ends_with(".tzst") {
            Self::TarZstd
        } else if lower.ends_with(".zip") {
            Self::Zip
        } else {
            Self::Tar
        }
    }

    pub fn tar_flag(&self) -> Option<&'static str> {
        match self {
            Self::TarGzip => Some("-z"),
            Self::TarBzip2 => Some("-j"),
            Self::TarXz => Some("-J"),
            Self::TarZstd => Some("--zstd"),
            Self::Tar => None,
            Self::Zip => None,
        }
    }
}
