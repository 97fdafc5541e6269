// src/recipe/mod.rs

//! Recipe format and loading (§3, §4.B).

mod format;
mod parser;

pub use format::{PackageSection, PatchEntry, PhaseAction, PhaseKind, PhasesSection, Recipe, SourceSection};
pub use parser::{load_recipe, parse_recipe, patch_path, validate_recipe};
