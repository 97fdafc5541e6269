// src/recipe/parser.rs

//! Recipe loading and validation (§4.B)

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

use super::format::Recipe;

/// Parse a recipe from raw TOML content.
pub fn parse_recipe(content: &str) -> Result<Recipe> {
    toml::from_str(content).map_err(|e| Error::Recipe(format!("malformed recipe: {e}")))
}

/// Load and validate a recipe from disk.
pub fn load_recipe(path: &Path) -> Result<Recipe> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Recipe(format!("cannot read recipe {}: {e}", path.display())))?;
    let recipe = parse_recipe(&content)?;
    validate_recipe(&recipe)?;
    Ok(recipe)
}

/// Validate the recipe's required fields and shape, matching the data
/// model's field requirements (§3).
pub fn validate_recipe(recipe: &Recipe) -> Result<()> {
    if recipe.package.name.trim().is_empty() {
        return Err(Error::Recipe("missing required field: name".to_string()));
    }
    if recipe.package.version.trim().is_empty() {
        return Err(Error::Recipe("missing required field: version".to_string()));
    }
    if recipe.package.release.trim().is_empty() {
        return Err(Error::Recipe("release must not be empty".to_string()));
    }
    if recipe.package.release.parse::<u32>().is_err() {
        return Err(Error::Recipe(format!(
            "release must be a positive integer, got '{}'",
            recipe.package.release
        )));
    }
    if recipe.source.urls.is_empty() {
        return Err(Error::Recipe("missing required field: source.urls (at least one source is required)".to_string()));
    }
    if !recipe.source.hashes.is_empty() && recipe.source.hashes.len() > recipe.source.urls.len() {
        return Err(Error::Recipe(
            "source.hashes has more entries than source.urls".to_string(),
        ));
    }
    for hash in recipe.source.hashes.iter().filter(|h| !h.is_empty()) {
        if hash.len() != 64 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::Recipe(format!("malformed sha256 hash: '{hash}'")));
        }
    }
    Ok(())
}

/// Resolve a patch entry's path relative to the recipe file's own directory.
pub fn patch_path(recipe_dir: &Path, patch: &super::format::PatchEntry) -> PathBuf {
    crate::config::resolve_relative(&patch.path, recipe_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_toml() -> &'static str {
        r#"
        [package]
        name = "hello"
        version = "1.0"

        [source]
        urls = ["https://example.org/hello-1.0.tar.gz"]
        "#
    }

    #[test]
    fn parses_minimal_recipe() {
        let recipe = parse_recipe(minimal_toml()).unwrap();
        assert_eq!(recipe.package.name, "hello");
        assert_eq!(recipe.package.release, "1");
        assert!(validate_recipe(&recipe).is_ok());
    }

    #[test]
    fn missing_name_is_rejected() {
        let toml = r#"
        [package]
        name = ""
        version = "1.0"

        [source]
        urls = ["https://example.org/x.tar.gz"]
        "#;
        let recipe = parse_recipe(toml).unwrap();
        let err = validate_recipe(&recipe).unwrap_err();
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn missing_sources_is_rejected() {
        let toml = r#"
        [package]
        name = "hello"
        version = "1.0"
        "#;
        let recipe = parse_recipe(toml).unwrap();
        let err = validate_recipe(&recipe).unwrap_err();
        assert!(err.to_string().contains("source"));
    }

    #[test]
    fn malformed_hash_is_rejected() {
        let toml = r#"
        [package]
        name = "hello"
        version = "1.0"

        [source]
        urls = ["https://example.org/hello-1.0.tar.gz"]
        hashes = ["not-a-hash"]
        "#;
        let recipe = parse_recipe(toml).unwrap();
        assert!(validate_recipe(&recipe).is_err());
    }

    #[test]
    fn non_numeric_release_is_rejected() {
        let toml = r#"
        [package]
        name = "hello"
        version = "1.0"
        release = "rc1"

        [source]
        urls = ["https://example.org/hello-1.0.tar.gz"]
        "#;
        let recipe = parse_recipe(toml).unwrap();
        assert!(validate_recipe(&recipe).is_err());
    }
}
