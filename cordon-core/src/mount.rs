//! Directory-mount records and the mount-spec parser.
//!
//! User-facing syntax is `name:path[:ro|rw]`. A two-field spec defaults to
//! read-write. Malformed specs are configuration errors: the caller must not
//! start a VM with a partial or wrong mount list.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// One host directory exposed to the guest under a named share tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryMount {
    /// Tag by which the guest exposes the mount.
    pub name: String,

    /// Host filesystem path. Existence is not checked at parse time;
    /// a missing path surfaces when the VM is started.
    pub path: PathBuf,

    /// Whether the guest sees the share read-only.
    pub read_only: bool,
}

impl DirectoryMount {
    /// Create a mount record directly, bypassing spec parsing.
    #[must_use]
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, read_only: bool) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            read_only,
        }
    }
}

/// Parse a list of raw mount specs, failing on the first malformed entry.
///
/// # Errors
/// Returns a [`CoreError`] describing the offending spec. No partial result
/// is produced.
pub fn parse_mount_specs(specs: &[String]) -> Result<Vec<DirectoryMount>, CoreError> {
    specs.iter().map(|spec| parse_mount_spec(spec)).collect()
}

/// Parse a single `name:path[:ro|rw]` spec.
///
/// # Errors
/// Returns [`CoreError::MalformedMountSpec`] for a wrong field count,
/// [`CoreError::UnknownMountMode`] for a third field other than `ro`/`rw`,
/// and [`CoreError::EmptyMountField`] for an empty name or path.
pub fn parse_mount_spec(spec: &str) -> Result<DirectoryMount, CoreError> {
    let fields: Vec<&str> = spec.split(':').collect();

    let (name, path, mode) = match fields.as_slice() {
        [name, path] => (*name, *path, None),
        [name, path, mode] => (*name, *path, Some(*mode)),
        _ => {
            return Err(CoreError::MalformedMountSpec {
                spec: spec.to_owned(),
            })
        }
    };

    if name.is_empty() {
        return Err(CoreError::EmptyMountField {
            spec: spec.to_owned(),
            field: "name",
        });
    }
    if path.is_empty() {
        return Err(CoreError::EmptyMountField {
            spec: spec.to_owned(),
            field: "path",
        });
    }

    let read_only = match mode {
        None | Some("rw") => false,
        Some("ro") => true,
        Some(other) => {
            return Err(CoreError::UnknownMountMode {
                spec: spec.to_owned(),
                mode: other.to_owned(),
            })
        }
    };

    Ok(DirectoryMount {
        name: name.to_owned(),
        path: PathBuf::from(path),
        read_only,
    })
}
