//! Guest filesystem conventions.

/// Canonical in-guest working directory. Tasks execute here and the project
/// tree is mirrored here when dirty mode is off.
pub const GENERIC_WORKING_DIR: &str = "/tmp/cordon-build";

/// Root under which macOS guests auto-mount host directory shares.
pub const AUTOMOUNT_ROOT: &str = "/Volumes/My Shared Files";

/// Share tag under which the project directory is exported in dirty mode.
pub const WORKING_DIR_TAG: &str = "working-dir";

/// The working directory the guest should use for a task.
///
/// In dirty mode the project directory is exposed live through the
/// platform's auto-mounted shared folder instead of being copied, so the
/// working directory resolves to the automount path.
#[must_use]
pub fn working_directory(dirty_mode: bool) -> String {
    if dirty_mode {
        format!("{AUTOMOUNT_ROOT}/{WORKING_DIR_TAG}")
    } else {
        GENERIC_WORKING_DIR.to_owned()
    }
}
