// src/lib.rs

//! mbuild: a minimalist source-to-binary package manager.
//!
//! A recipe describes how to fetch, extract, patch and build a piece of
//! software; the engine turns that recipe into a relocatable package
//! archive, and can install or remove that archive against a target root.

pub mod build;
pub mod cli;
pub mod compression;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod install;
pub mod package;
pub mod patch;
pub mod phase;
pub mod recipe;
pub mod registry;
pub mod remove;
pub mod status;
pub mod strip;

pub use error::{Error, Result};
