// src/cli.rs

//! Command-line surface (§4.M, §6)

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::status::CliReporter;

#[derive(Parser)]
#[command(name = "mbuild", version, about = "Minimalist source-to-binary package manager")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create the base directory layout under MBUILD_BASE.
    Init,

    /// Run the full build pipeline for a recipe and produce a package archive.
    Run {
        /// Path to the recipe's TOML file.
        recipe: PathBuf,
    },

    /// Repackage an already-staged build without re-running any phase.
    Pack {
        /// Path to the recipe's TOML file.
        recipe: PathBuf,
    },

    /// Install a `.ppkg` archive into the target root.
    Install {
        /// Path to the package archive.
        archive: PathBuf,
    },

    /// Remove an installed package by name.
    Remove {
        /// Package name.
        name: String,
    },
}

/// Dispatch a parsed command, returning the process exit code.
pub fn dispatch(cli: Cli) -> i32 {
    let config = Config::from_env();
    match run(cli, &config) {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!("{e}");
            e.exit_code()
        }
    }
}

fn run(cli: Cli, config: &Config) -> Result<()> {
    match cli.command {
        Command::Init => {
            config.init_layout()?;
            println!("initialized {}", config.base.display());
            Ok(())
        }
        Command::Run { recipe } => {
            let recipe_path = recipe;
            let recipe_dir = parent_dir(&recipe_path)?;
            let parsed = crate::recipe::load_recipe(&recipe_path)?;
            let reporter = CliReporter::new();
            let outcome = crate::build::run(&parsed, &recipe_dir, config, &reporter)?;
            println!("built {}", outcome.archive_path.display());
            Ok(())
        }
        Command::Pack { recipe } => {
            let recipe_path = recipe;
            let recipe_dir = parent_dir(&recipe_path)?;
            let parsed = crate::recipe::load_recipe(&recipe_path)?;
            let stage_dir = config.stage_dir().join(parsed.package_stem());
            if !stage_dir.is_dir() {
                return Err(Error::Pack(format!(
                    "no staged tree at {}; run the build first",
                    stage_dir.display()
                )));
            }
            let archive = crate::package::build_package(&stage_dir, &parsed, &recipe_dir, config)?;
            println!("packed {}", archive.display());
            Ok(())
        }
        Command::Install { archive } => {
            let name = crate::install::install(&archive, config)?;
            println!("installed {name}");
            Ok(())
        }
        Command::Remove { name } => {
            let name = crate::remove::remove(config, &name)?;
            println!("removed {name}");
            Ok(())
        }
    }
}

fn parent_dir(recipe_path: &std::path::Path) -> Result<PathBuf> {
    recipe_path
        .parent()
        .map(|p| if p.as_os_str().is_empty() { PathBuf::from(".") } else { p.to_path_buf() })
        .ok_or_else(|| Error::Usage(format!("cannot determine directory of {}", recipe_path.display())))
}
