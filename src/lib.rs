//! codesync - change detection, per-file changelogs and remote mirroring
//!
//! This crate provides the core functionality for the `codesync` CLI tool.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface using clap
//! - [`sync`] - Fingerprints, diffs, changelogs and the sync loop
//! - [`remote`] - Remote stores (local mirror, HTTP)
//! - [`config`] - Configuration management and the PID marker
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod remote;
pub mod sync;

pub use error::{Error, Result};
