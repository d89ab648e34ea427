//! pyport-lib: building portable Python runtime distributions
//!
//! This crate provides the pieces the `pyport` CLI drives:
//! - `config`: typed build configuration and the base/variant merge
//! - `acquire`: per-package binary/source/skip decisions and downloads
//! - `consolidate`: bundling and relocating native shared libraries
//! - `build`: the pipeline threading one immutable context through each step

pub mod acquire;
pub mod build;
pub mod checker;
pub mod config;
pub mod consolidate;
pub mod layout;
pub mod package;
pub mod platform;
pub mod policy;
pub mod process;
pub mod util;
