//! Project directory synchronization into the guest.
//!
//! Runs as a post-handshake hook when a project directory is configured and
//! dirty mode is off. The local tree is mirrored over the collaborator's
//! secure file-transfer session onto the guest's canonical working
//! directory, preserving tree shape. Non-regular entries (symlinks,
//! devices, sockets) are skipped silently.

use std::io;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use cordon_core::platform;

use crate::handshake::{AgentHook, AgentSession};
use crate::IsolateError;

/// Secure file-transfer session under a POSIX-style remote filesystem.
#[async_trait]
pub trait TransferSession: Send + Sync {
    /// Create `path` and all missing ancestors.
    async fn create_dir_all(&self, path: &str) -> io::Result<()>;

    /// Create or overwrite the remote file with the full byte content.
    async fn write_file(&self, path: &str, contents: &[u8]) -> io::Result<()>;
}

/// Hook that mirrors the local project tree into the guest working
/// directory once the handshake succeeds.
pub struct ProjectDirSync {
    project_dir: PathBuf,
    remote_root: String,
}

impl ProjectDirSync {
    /// Mirror `project_dir` onto the canonical guest working directory.
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            remote_root: platform::GENERIC_WORKING_DIR.to_owned(),
        }
    }

    /// Override the destination root.
    #[must_use]
    pub fn with_remote_root(mut self, root: impl Into<String>) -> Self {
        self.remote_root = root.into();
        self
    }
}

#[async_trait]
impl AgentHook for ProjectDirSync {
    async fn apply(&self, session: &dyn AgentSession) -> Result<(), IsolateError> {
        let transfer = session
            .open_transfer()
            .await
            .map_err(|e| IsolateError::SyncFailed {
                reason: e.to_string(),
            })?;

        sync_tree(transfer.as_ref(), &self.project_dir, &self.remote_root)
            .await
            .map_err(|e| IsolateError::SyncFailed {
                reason: e.to_string(),
            })?;

        info!(
            local = %self.project_dir.display(),
            remote = %self.remote_root,
            "project directory synced"
        );
        Ok(())
    }
}

/// Mirror the tree rooted at `local_root` onto `remote_root`.
///
/// Directories are created (with ancestors) before their contents; regular
/// files are copied whole; anything else is skipped. Entries are visited in
/// name order within each directory. The first I/O error aborts the walk.
pub(crate) async fn sync_tree(
    transfer: &dyn TransferSession,
    local_root: &Path,
    remote_root: &str,
) -> io::Result<()> {
    transfer.create_dir_all(remote_root).await?;

    let mut pending = vec![local_root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let mut entries = Vec::new();
        let mut read_dir = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = read_dir.next_entry().await? {
            entries.push(entry);
        }
        entries.sort_by_key(tokio::fs::DirEntry::file_name);

        for entry in entries {
            let path = entry.path();
            let relative = path
                .strip_prefix(local_root)
                .map_err(|e| io::Error::other(format!("path escaped walk root: {e}")))?;
            let remote_path = join_remote(remote_root, relative);

            // file_type does not follow symlinks, so a link to a directory
            // is skipped rather than traversed.
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                transfer.create_dir_all(&remote_path).await?;
                pending.push(path);
            } else if file_type.is_file() {
                let contents = tokio::fs::read(&path).await?;
                transfer.write_file(&remote_path, &contents).await?;
            } else {
                debug!(path = %path.display(), "skipping non-regular entry");
            }
        }
    }

    Ok(())
}

/// Join a host-relative path onto a remote POSIX root.
fn join_remote(root: &str, relative: &Path) -> String {
    let mut out = root.trim_end_matches('/').to_owned();
    for component in relative.components() {
        if let Component::Normal(part) = component {
            out.push('/');
            out.push_str(&part.to_string_lossy());
        }
    }
    out
}
