//! Core types for the cordon VM task isolation driver.
//!
//! Defines the pure domain pieces: directory-mount records and their
//! spec parser, the instance naming scheme, the per-task run configuration,
//! and the guest working-directory conventions. No I/O happens here.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod config;
pub mod error;
pub mod mount;
pub mod naming;
pub mod platform;

pub use config::RunConfig;
pub use error::CoreError;
pub use mount::{parse_mount_spec, parse_mount_specs, DirectoryMount};
pub use naming::{NamingScheme, DEFAULT_NAME_PREFIX};
