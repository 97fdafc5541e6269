// src/config.rs

//! Config & layout (§4.A)
//!
//! Resolves the single base directory and every path derived from it, and
//! picks the toolchain profile. Built once at process start into an
//! immutable record and threaded explicitly through the engine — there is
//! no process-global configuration state.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Compiler toolchain profile selecting defaults for `CC`/`CXX`/`AR`/`RANLIB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolchainProfile {
    #[default]
    System,
    Llvm,
    Musl,
}

impl ToolchainProfile {
    pub fn name(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Llvm => "llvm",
            Self::Musl => "musl",
        }
    }

    /// Default `(CC, CXX, AR, RANLIB)` for this profile. User environment
    /// variables always take precedence over these (see [`Config::toolchain_env`]).
    pub fn defaults(&self) -> [(&'static str, &'static str); 4] {
        match self {
            Self::System => [("CC", "cc"), ("CXX", "c++"), ("AR", "ar"), ("RANLIB", "ranlib")],
            Self::Llvm => [("CC", "clang"), ("CXX", "clang++"), ("AR", "llvm-ar"), ("RANLIB", "llvm-ranlib")],
            Self::Musl => [
                ("CC", "musl-gcc"),
                ("CXX", "musl-g++"),
                ("AR", "ar"),
                ("RANLIB", "ranlib"),
            ],
        }
    }
}

impl std::str::FromStr for ToolchainProfile {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "system" => Ok(Self::System),
            "llvm" => Ok(Self::Llvm),
            "musl" => Ok(Self::Musl),
            other => Err(crate::error::Error::Usage(format!(
                "unknown toolchain profile: {other}"
            ))),
        }
    }
}

/// Resolved configuration for a single invocation.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root of all storage under the engine's control.
    pub base: PathBuf,
    /// Target root for install/remove.
    pub root: PathBuf,
    /// Installation prefix baked into `CONTROL/meta` and passed to `configure`.
    pub prefix: PathBuf,
    /// Parallelism for `make -j`.
    pub jobs: u32,
    /// Compression used when assembling a package archive.
    pub pkg_comp: crate::compression::Compression,
    pub toolchain: ToolchainProfile,
    pub strip: bool,
    pub download_retries: u32,
}

impl Config {
    /// Assemble configuration from the environment, applying defaults for
    /// anything unset (§6).
    pub fn from_env() -> Self {
        let base = env::var("MBUILD_BASE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| env::current_dir().unwrap_or_default().join("mbuild"));

        let root = env::var("MBUILD_ROOT").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("/"));

        let prefix = env::var("MBUILD_PREFIX").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("/usr"));

        let jobs = env::var("MBUILD_JOBS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(|| std::thread::available_parallelism().map(|p| p.get() as u32).unwrap_or(1));

        let pkg_comp = env::var("MBUILD_PKG_COMP")
            .ok()
            .map(|v| crate::compression::Compression::from_config_value(&v))
            .unwrap_or(crate::compression::Compression::Zstd);

        let toolchain = env::var("MBUILD_TOOLCHAIN")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_default();

        let strip = env::var("MBUILD_STRIP").map(|v| v != "0").unwrap_or(true);

        let download_retries = env::var("MBUILD_DOWNLOAD_RETRIES").ok().and_then(|v| v.parse().ok()).unwrap_or(3);

        Self {
            base,
            root,
            prefix,
            jobs,
            pkg_comp,
            toolchain,
            strip,
            download_retries,
        }
    }

    pub fn sources_dir(&self) -> PathBuf {
        self.base.join("sources")
    }

    pub fn build_dir(&self) -> PathBuf {
        self.base.join("build")
    }

    pub fn stage_dir(&self) -> PathBuf {
        self.base.join("stage")
    }

    pub fn packages_dir(&self) -> PathBuf {
        self.base.join("packages")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.base.join("logs")
    }

    pub fn state_dir(&self) -> PathBuf {
        self.base.join("state")
    }

    pub fn recipes_dir(&self) -> PathBuf {
        self.base.join("recipes")
    }

    pub fn hooks_dir(&self) -> PathBuf {
        self.base.join("hooks")
    }

    pub fn pkgs_dir(&self) -> PathBuf {
        self.state_dir().join("pkgs")
    }

    pub fn installed_index(&self) -> PathBuf {
        self.state_dir().join("installed.index")
    }

    pub fn global_post_remove(&self, name: &str) -> PathBuf {
        self.hooks_dir().join("post-remove").join(name)
    }

    /// Create every derived directory, idempotently (`init`, §6).
    pub fn init_layout(&self) -> Result<()> {
        for dir in [
            self.sources_dir(),
            self.build_dir(),
            self.stage_dir(),
            self.packages_dir(),
            self.logs_dir(),
            self.state_dir(),
            self.recipes_dir(),
            self.hooks_dir(),
            self.pkgs_dir(),
            self.hooks_dir().join("post-remove"),
        ] {
            fs::create_dir_all(&dir)?;
        }
        Ok(())
    }

    /// `CC`/`CXX`/`AR`/`RANLIB` for the active toolchain profile, with user
    /// environment overrides winning over the profile defaults.
    pub fn toolchain_env(&self) -> HashMap<String, String> {
        let mut env_vars = HashMap::new();
        for (key, default) in self.toolchain.defaults() {
            let value = env::var(key).unwrap_or_else(|_| default.to_string());
            env_vars.insert(key.to_string(), value);
        }
        env_vars
    }

    pub fn arch(&self) -> String {
        env::var("MBUILD_ARCH").unwrap_or_else(|_| host_arch().to_string())
    }
}

/// Best-effort host architecture tag, used as the recipe's default `arch`.
pub fn host_arch() -> &'static str {
    std::env::consts::ARCH
}

/// Resolve a path that may be absolute or relative to `base`.
pub fn resolve_relative(path: &str, base: &Path) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base.join(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toolchain_profile_parses() {
        assert_eq!("system".parse::<ToolchainProfile>().unwrap(), ToolchainProfile::System);
        assert_eq!("llvm".parse::<ToolchainProfile>().unwrap(), ToolchainProfile::Llvm);
        assert_eq!("musl".parse::<ToolchainProfile>().unwrap(), ToolchainProfile::Musl);
        assert!("bogus".parse::<ToolchainProfile>().is_err());
    }

    #[test]
    fn derived_paths_nest_under_base() {
        let cfg = Config {
            base: PathBuf::from("/tmp/mbuild-test"),
            root: PathBuf::from("/"),
            prefix: PathBuf::from("/usr"),
            jobs: 1,
            pkg_comp: crate::compression::Compression::None,
            toolchain: ToolchainProfile::System,
            strip: true,
            download_retries: 3,
        };
        assert_eq!(cfg.sources_dir(), PathBuf::from("/tmp/mbuild-test/sources"));
        assert_eq!(cfg.pkgs_dir(), PathBuf::from("/tmp/mbuild-test/state/pkgs"));
        assert_eq!(cfg.installed_index(), PathBuf::from("/tmp/mbuild-test/state/installed.index"));
    }

    #[test]
    fn resolve_relative_keeps_absolute() {
        let base = Path::new("/base");
        assert_eq!(resolve_relative("/abs/path", base), PathBuf::from("/abs/path"));
        assert_eq!(resolve_relative("rel/path", base), PathBuf::from("/base/rel/path"));
    }
}
