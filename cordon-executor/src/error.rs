//! Error types for the executor crate.

use std::time::Duration;

/// Errors that can occur while isolating a task in an ephemeral VM.
///
/// Everything except [`IsolateError::Config`] happens after provisioning has
/// begun; the driver guarantees the instance is deleted before any of these
/// reach the caller. [`IsolateError::SyncFailed`] is kept distinct so callers
/// can tell "the VM never became usable" from "the VM was usable but the
/// project copy failed".
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum IsolateError {
    /// Configuration-tier failure. Nothing was provisioned.
    #[error(transparent)]
    Config(#[from] cordon_core::CoreError),

    /// The base image could not be cloned or configured.
    #[error("isolation failed: could not create VM cloned from '{image}': {reason}")]
    CloneFailed { image: String, reason: String },

    /// A hypervisor command exited non-zero.
    #[error("hypervisor command '{command}' exited with status {status}: {stderr}")]
    Hypervisor {
        command: String,
        status: i32,
        stderr: String,
    },

    /// The hypervisor produced output this driver could not interpret.
    #[error("could not parse output of hypervisor command '{command}': {reason}")]
    UnparsableOutput { command: String, reason: String },

    /// The guest failed fatally after its asynchronous start.
    #[error("isolation failed: VM '{vm}' reported a fatal error: {reason}")]
    VmFailed { vm: String, reason: String },

    /// The guest has no routable address yet. Expected and retryable; the
    /// readiness poller logs it at debug and probes again.
    #[error("VM '{vm}' has no address yet: {reason}")]
    AddressUnavailable { vm: String, reason: String },

    /// The readiness deadline elapsed before an address was assigned.
    #[error("isolation failed: VM '{vm}' did not obtain an address within {waited:?}")]
    BootTimedOut { vm: String, waited: Duration },

    /// The remote-agent handshake failed.
    #[error("isolation failed: agent handshake with {addr} failed: {reason}")]
    HandshakeFailed { addr: String, reason: String },

    /// Project directory synchronization failed after the VM became usable.
    #[error("failed to sync project directory: {reason}")]
    SyncFailed { reason: String },

    /// The run was cancelled from outside.
    #[error("run cancelled")]
    Cancelled,

    /// Underlying I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
