//! Per-task run configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Caller-owned description of one task run.
///
/// The driver reads this; it never mutates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct RunConfig {
    /// Identifier of the task, embedded in the temporary instance name.
    pub task_id: String,

    /// Host project directory to expose to the guest, if any.
    pub project_dir: Option<PathBuf>,

    /// Dirty mode: bind-mount the project directory into the guest instead
    /// of copying a snapshot. The guest sees host edits live.
    pub dirty_mode: bool,

    /// Raw `name:path[:ro|rw]` mount specs supplied by the user.
    pub mount_specs: Vec<String>,

    /// Let the hypervisor pull the base image lazily during clone.
    pub lazy_pull: bool,
}

impl RunConfig {
    /// Create a config for `task_id` with no project directory, no extra
    /// mounts, dirty mode off, and eager image pulling.
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            project_dir: None,
            dirty_mode: false,
            mount_specs: Vec::new(),
            lazy_pull: false,
        }
    }
}
