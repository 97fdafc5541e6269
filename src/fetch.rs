// src/fetch.rs

//! Fetcher (§4.C)
//!
//! Downloads recipe sources into the content-addressed source cache,
//! verifying integrity in-process via SHA-256. A source with no declared
//! hash is fetched and used as-is, with a logged warning naming the URL
//! (§9, Open Question resolution).

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::error::{Error, Result};

/// A single fetched source, located on disk after a successful fetch.
#[derive(Debug, Clone)]
pub struct FetchedSource {
    pub url: String,
    pub path: PathBuf,
    pub verified: bool,
}

/// Fetch every declared source for a recipe into `sources_dir`, retrying
/// transient failures up to `retries` times with linear backoff.
pub fn fetch_all(sources_dir: &Path, recipe: &crate::recipe::Recipe, retries: u32) -> Result<Vec<FetchedSource>> {
    fs::create_dir_all(sources_dir)?;
    let mut fetched = Vec::with_capacity(recipe.source.urls.len());
    for (index, url) in recipe.source.urls.iter().enumerate() {
        let expected_hash = recipe.source.hash_for(index);
        let dest = sources_dir.join(source_filename(url));
        let source = fetch_one(url, &dest, expected_hash, retries)?;
        fetched.push(source);
    }
    Ok(fetched)
}

/// Fetch a single source URL to `dest`, honoring the content-addressed
/// cache: if `dest` already exists, no download occurs, full stop. A cached
/// file whose hash doesn't match the recipe's declared hash is an integrity
/// failure, not a cue to re-download (§4.C, §8).
fn fetch_one(url: &str, dest: &Path, expected_hash: Option<&str>, retries: u32) -> Result<FetchedSource> {
    if dest.exists() {
        if let Some(hash) = expected_hash {
            let actual = sha256_file(dest)?;
            if actual != hash {
                return Err(Error::Integrity(format!(
                    "cached source for {url} does not match declared hash: expected {hash}, got {actual}"
                )));
            }
            info!(%url, "using cached source (hash match)");
            return Ok(FetchedSource { url: url.to_string(), path: dest.to_path_buf(), verified: true });
        }
        info!(%url, "using cached source (unverified)");
        return Ok(FetchedSource { url: url.to_string(), path: dest.to_path_buf(), verified: false });
    }

    let mut last_err = None;
    for attempt in 1..=retries.max(1) {
        match download(url, dest) {
            Ok(()) => {
                last_err = None;
                break;
            }
            Err(e) => {
                warn!(%url, attempt, retries, "download attempt failed: {e}");
                last_err = Some(e);
                if attempt < retries {
                    std::thread::sleep(Duration::from_secs(attempt as u64));
                }
            }
        }
    }
    if let Some(e) = last_err {
        return Err(Error::Fetch(format!("failed to fetch {url} after {retries} attempts: {e}")));
    }

    match expected_hash {
        Some(hash) => {
            let actual = sha256_file(dest)?;
            if actual != hash {
                return Err(Error::Integrity(format!(
                    "hash mismatch for {url}: expected {hash}, got {actual}"
                )));
            }
            Ok(FetchedSource { url: url.to_string(), path: dest.to_path_buf(), verified: true })
        }
        None => {
            warn!(%url, "source fetched without a declared hash; integrity is unverified");
            Ok(FetchedSource { url: url.to_string(), path: dest.to_path_buf(), verified: false })
        }
    }
}

/// Download `url` to `dest`. Supports `file://` URLs (a plain copy, used by
/// tests and local mirrors) in addition to `http(s)://`.
fn download(url: &str, dest: &Path) -> Result<()> {
    if let Some(path) = url.strip_prefix("file://") {
        fs::copy(path, dest).map_err(|e| Error::Fetch(format!("local copy failed: {e}")))?;
        return Ok(());
    }

    let response = reqwest::blocking::get(url).map_err(|e| Error::Fetch(e.to_string()))?;
    if !response.status().is_success() {
        return Err(Error::Fetch(format!("HTTP {} for {url}", response.status())));
    }
    let bytes = response.bytes().map_err(|e| Error::Fetch(e.to_string()))?;
    fs::write(dest, bytes)?;
    Ok(())
}

/// Compute the SHA-256 digest of a file's contents, as lowercase hex.
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 65536];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex_encode(&hasher.finalize()))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// The filename a source URL is cached under: its final path segment.
fn source_filename(url: &str) -> String {
    url.rsplit('/').next().filter(|s| !s.is_empty()).unwrap_or("source").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn source_filename_takes_last_segment() {
        assert_eq!(source_filename("https://example.org/pkg/hello-1.0.tar.gz"), "hello-1.0.tar.gz");
        assert_eq!(source_filename("https://example.org/trailing/"), "source");
    }

    #[test]
    fn sha256_matches_known_vector() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty");
        fs::File::create(&path).unwrap();
        assert_eq!(
            sha256_file(&path).unwrap(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b85"
        );
    }

    #[test]
    fn file_url_fetch_without_hash_is_unverified() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.txt");
        let mut f = fs::File::create(&src).unwrap();
        f.write_all(b"hello").unwrap();

        let dest = dir.path().join("dest.txt");
        let url = format!("file://{}", src.display());
        let result = fetch_one(&url, &dest, None, 1).unwrap();
        assert!(!result.verified);
        assert_eq!(fs::read(&dest).unwrap(), b"hello");
    }

    #[test]
    fn file_url_fetch_with_matching_hash_is_verified() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.txt");
        fs::write(&src, b"hello").unwrap();
        let hash = sha256_file(&src).unwrap();

        let dest = dir.path().join("dest.txt");
        let url = format!("file://{}", src.display());
        let result = fetch_one(&url, &dest, Some(hash.as_str()), 1).unwrap();
        assert!(result.verified);
    }

    #[test]
    fn file_url_fetch_with_mismatched_hash_fails() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.txt");
        fs::write(&src, b"hello").unwrap();

        let dest = dir.path().join("dest.txt");
        let url = format!("file://{}", src.display());
        let err = fetch_one(&url, &dest, Some("0".repeat(64).as_str()), 1).unwrap_err();
        assert!(matches!(err, Error::Integrity(_)));
    }

    #[test]
    fn cached_file_with_mismatched_hash_errors_without_redownloading() {
        let dir = tempfile::tempdir().unwrap();
        // No source file exists at all: if fetch_one fell through into the
        // download loop it would fail to find `src.txt` and return a Fetch
        // error instead, so an Integrity error here proves no download was
        // attempted.
        let src = dir.path().join("src.txt");
        let dest = dir.path().join("dest.txt");
        fs::write(&dest, b"stale cached contents").unwrap();

        let url = format!("file://{}", src.display());
        let err = fetch_one(&url, &dest, Some("0".repeat(64).as_str()), 1).unwrap_err();
        assert!(matches!(err, Error::Integrity(_)));
    }
}
